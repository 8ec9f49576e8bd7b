use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Success half of the `{success, data}` envelope. Failures go through
/// `AppError`'s `IntoResponse`.
#[derive(Debug, Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            success: true,
            data: self.data,
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

pub fn message(message: &'static str) -> ApiResponse<Message> {
    ApiResponse::ok(Message { message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn created_wraps_data_in_envelope() {
        let response = ApiResponse::created(json!({ "id": "p1" })).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({ "success": true, "data": { "id": "p1" } }));
    }

    #[tokio::test]
    async fn message_is_200() {
        let response = message("Post deleted successfully").into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
