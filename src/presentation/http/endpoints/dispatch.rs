use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{OpenApi, param::Query, payload::Json};

use crate::{
    application::usecases::run_dispatch_cycle::DispatchSource,
    presentation::{
        http::{
            endpoints::root::{ApiState, EndpointsTags, internal_error},
            requests::SetPausedRequestDto,
            responses::{DispatchCycleResponseDto, SetPausedResponseDto, SweepResponseDto},
        },
        models::DispatchSourceDto,
    },
};

#[derive(Clone)]
pub struct DispatchEndpoints {
    state: Arc<ApiState>,
}

impl DispatchEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl DispatchEndpoints {
    /// Runs one dispatch cycle. Gated and empty-queue outcomes are still a
    /// success; only infrastructure failures produce an error status.
    #[oai(
        path = "/dispatch/run",
        method = "post",
        tag = EndpointsTags::Dispatch,
    )]
    pub async fn run(
        &self,
        source: Query<Option<DispatchSourceDto>>,
    ) -> PoemResult<Json<DispatchCycleResponseDto>> {
        let source = source.0.map(Into::into).unwrap_or(DispatchSource::Manual);

        let report = self
            .state
            .run_dispatch_cycle_usecase
            .execute(source)
            .await
            .map_err(internal_error)?;

        Ok(Json(DispatchCycleResponseDto {
            success: true,
            processed: report.processed,
            sent: report.sent,
            failed: report.failed,
            message: report.message,
        }))
    }

    #[oai(
        path = "/dispatch/pause",
        method = "post",
        tag = EndpointsTags::Dispatch,
    )]
    pub async fn pause(
        &self,
        request: Json<SetPausedRequestDto>,
    ) -> PoemResult<Json<SetPausedResponseDto>> {
        self.state
            .set_paused_usecase
            .execute(request.paused)
            .await
            .map_err(internal_error)?;

        Ok(Json(SetPausedResponseDto {
            success: true,
            paused: request.paused,
        }))
    }

    /// Returns messages stuck in processing to the eligible pool.
    #[oai(
        path = "/dispatch/sweep",
        method = "post",
        tag = EndpointsTags::Dispatch,
    )]
    pub async fn sweep(&self) -> PoemResult<Json<SweepResponseDto>> {
        let response = self
            .state
            .requeue_stale_usecase
            .execute()
            .await
            .map_err(internal_error)?;

        Ok(Json(SweepResponseDto {
            success: true,
            requeued: response.requeued,
        }))
    }
}
