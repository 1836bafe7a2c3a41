use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{OpenApi, param::Path, payload::Json};

use crate::{
    application::usecases::enqueue_message::EnqueueMessageRequest,
    domain::models::MediaAttachment,
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags, internal_error},
        mappers::map_message,
        requests::EnqueueMessageRequestDto,
        responses::{EnqueueMessageResponseDto, QueuedMessageDto, RetryMessageResponseDto},
    },
};

#[derive(Clone)]
pub struct MessagesEndpoints {
    state: Arc<ApiState>,
}

impl MessagesEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl MessagesEndpoints {
    #[oai(
        path = "/messages",
        method = "post",
        tag = EndpointsTags::Messages,
    )]
    pub async fn enqueue_message(
        &self,
        request: Json<EnqueueMessageRequestDto>,
    ) -> PoemResult<Json<EnqueueMessageResponseDto>> {
        let media = match (&request.media_url, request.media_type) {
            (Some(url), Some(kind)) => Some(MediaAttachment {
                url: url.clone(),
                kind: kind.into(),
                caption: request.media_caption.clone(),
            }),
            (None, None) => None,
            _ => {
                return Err(poem::Error::from_string(
                    "media_url and media_type must be provided together",
                    poem::http::StatusCode::BAD_REQUEST,
                ));
            }
        };

        let payload = EnqueueMessageRequest {
            recipient: request.recipient.clone(),
            body: request.body.clone(),
            media,
            order_id: request.order_id,
            scheduled_at: request.scheduled_at,
            max_attempts: request.max_attempts,
        };

        let response = self
            .state
            .enqueue_message_usecase
            .execute(payload)
            .await
            .map_err(|e| {
                if e.to_string().contains("Validation") {
                    poem::Error::from_string(e.to_string(), poem::http::StatusCode::BAD_REQUEST)
                } else {
                    internal_error(e)
                }
            })?;

        Ok(Json(EnqueueMessageResponseDto {
            message_id: response.message_id,
        }))
    }

    #[oai(
        path = "/messages/:message_id",
        method = "get",
        tag = EndpointsTags::Messages,
    )]
    pub async fn get_message(
        &self,
        message_id: Path<uuid::Uuid>,
    ) -> PoemResult<Json<QueuedMessageDto>> {
        let message = self
            .state
            .get_message_usecase
            .execute(message_id.0)
            .await
            .map_err(|e| {
                if e.to_string().contains("not found") {
                    poem::Error::from_string("message not found", poem::http::StatusCode::NOT_FOUND)
                } else {
                    internal_error(e)
                }
            })?;

        Ok(Json(map_message(&message)))
    }

    /// Manual retry of a terminally failed message.
    #[oai(
        path = "/messages/:message_id/retry",
        method = "post",
        tag = EndpointsTags::Messages,
    )]
    pub async fn retry_message(
        &self,
        message_id: Path<uuid::Uuid>,
    ) -> PoemResult<Json<RetryMessageResponseDto>> {
        self.state
            .retry_message_usecase
            .execute(message_id.0)
            .await
            .map_err(|e| {
                if e.to_string().contains("not found") {
                    poem::Error::from_string("message not found", poem::http::StatusCode::NOT_FOUND)
                } else if e.to_string().contains("Validation") {
                    poem::Error::from_string(e.to_string(), poem::http::StatusCode::BAD_REQUEST)
                } else {
                    internal_error(e)
                }
            })?;

        Ok(Json(RetryMessageResponseDto { success: true }))
    }
}
