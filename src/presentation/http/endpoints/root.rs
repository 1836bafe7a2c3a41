use std::sync::Arc;

use poem_openapi::Tags;

use crate::application::usecases::{
    enqueue_message::EnqueueMessageUseCase, get_message::GetMessageUseCase,
    requeue_stale::RequeueStaleUseCase, retry_message::RetryMessageUseCase,
    run_dispatch_cycle::RunDispatchCycleUseCase, set_paused::SetPausedUseCase,
};

#[derive(Clone)]
pub struct ApiState {
    pub run_dispatch_cycle_usecase: Arc<RunDispatchCycleUseCase>,
    pub enqueue_message_usecase: Arc<EnqueueMessageUseCase>,
    pub get_message_usecase: Arc<GetMessageUseCase>,
    pub retry_message_usecase: Arc<RetryMessageUseCase>,
    pub requeue_stale_usecase: Arc<RequeueStaleUseCase>,
    pub set_paused_usecase: Arc<SetPausedUseCase>,
}

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Health,
    Dispatch,
    Messages,
}

pub fn internal_error(err: anyhow::Error) -> poem::Error {
    poem::Error::from_string(err.to_string(), poem::http::StatusCode::INTERNAL_SERVER_ERROR)
}
