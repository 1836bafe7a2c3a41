use std::io::Error;
use std::sync::Arc;
use std::time::Duration;

use poem::{Route, Server, listener::TcpListener};
use poem_openapi::OpenApiService;
use sqlx::postgres::PgPoolOptions;
use tokio::main;
use tracing::{error, info};

use crate::{
    application::{
        services::sender::SenderGateway,
        usecases::{
            enqueue_message::{EnqueueMessageConfig, EnqueueMessageUseCase},
            get_message::GetMessageUseCase,
            requeue_stale::{RequeueStaleConfig, RequeueStaleUseCase},
            retry_message::RetryMessageUseCase,
            run_dispatch_cycle::{DispatchCycleConfig, DispatchSource, RunDispatchCycleUseCase},
            set_paused::SetPausedUseCase,
        },
    },
    config::Config,
    infrastructure::{
        messaging::{evolution::EvolutionClient, zapi::ZApiClient},
        repositories::postgres::{
            PostgresChannelRepository, PostgresMessageQueueRepository, PostgresOrderRepository,
            PostgresSettingsRepository,
        },
    },
    presentation::http::endpoints::{
        dispatch::DispatchEndpoints, health::HealthEndpoints, messages::MessagesEndpoints,
        root::ApiState,
    },
};

mod application;
mod config;
mod domain;
mod infrastructure;
mod presentation;

#[main]
async fn main() -> Result<(), Error> {
    let config = Config::try_parse().map_err(Error::other)?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .map_err(Error::other)?;
    sqlx::migrate!().run(&pool).await.map_err(Error::other)?;

    let settings_repo = PostgresSettingsRepository::new(pool.clone());
    let channel_repo = PostgresChannelRepository::new(pool.clone());
    let queue_repo = PostgresMessageQueueRepository::new(pool.clone());
    let order_repo = PostgresOrderRepository::new(pool.clone());

    let gateway = SenderGateway::new(vec![EvolutionClient::new(), ZApiClient::new()]);

    let run_dispatch_cycle_usecase = Arc::new(RunDispatchCycleUseCase::new(
        settings_repo.clone(),
        channel_repo.clone(),
        queue_repo.clone(),
        order_repo.clone(),
        gateway,
        DispatchCycleConfig {
            batch_size: config.dispatch.batch_size,
            retry_backoff_secs: config.dispatch.retry_backoff_secs,
            same_recipient_delay_secs: config.dispatch.same_recipient_delay_secs,
        },
    ));
    let requeue_stale_usecase = Arc::new(RequeueStaleUseCase::new(
        queue_repo.clone(),
        RequeueStaleConfig {
            stale_after_secs: config.dispatch.stale_processing_secs,
        },
    ));

    let state = Arc::new(ApiState {
        run_dispatch_cycle_usecase: run_dispatch_cycle_usecase.clone(),
        enqueue_message_usecase: Arc::new(EnqueueMessageUseCase::new(
            queue_repo.clone(),
            EnqueueMessageConfig {
                default_max_attempts: config.dispatch.default_max_attempts,
            },
        )),
        get_message_usecase: Arc::new(GetMessageUseCase::new(queue_repo.clone())),
        retry_message_usecase: Arc::new(RetryMessageUseCase::new(queue_repo.clone())),
        requeue_stale_usecase: requeue_stale_usecase.clone(),
        set_paused_usecase: Arc::new(SetPausedUseCase::new(settings_repo.clone())),
    });

    if config.dispatch.dispatch_interval_secs > 0 {
        spawn_dispatch_ticker(
            run_dispatch_cycle_usecase,
            requeue_stale_usecase,
            config.dispatch.dispatch_interval_secs,
        );
    }

    let server_url = format!("{}://{}:{}", config.scheme, config.host, config.port);

    info!("starting server at {}", server_url);

    let api_service = OpenApiService::new(
        (
            DispatchEndpoints::new(state.clone()),
            MessagesEndpoints::new(state.clone()),
            HealthEndpoints,
        ),
        "Courier API",
        "0.1.0",
    )
    .server(format!("{}/api", server_url));
    let ui = api_service.swagger_ui();
    let app = Route::new().nest("/api", api_service).nest("/", ui);

    Server::new(TcpListener::bind(format!("localhost:{}", config.port)))
        .run(app)
        .await
}

fn spawn_dispatch_ticker(
    cycle: Arc<RunDispatchCycleUseCase>,
    sweep: Arc<RequeueStaleUseCase>,
    interval_secs: u64,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;

            if let Err(err) = sweep.execute().await {
                error!(error = %err, "stale sweep failed");
            }

            if let Err(err) = cycle.execute(DispatchSource::Cron).await {
                error!(error = %err, "scheduled dispatch cycle failed");
            }
        }
    });
}
