// --- File: crates/fanout_common/src/http.rs ---
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{FanoutError, HttpStatusCode};

pub mod client;

impl IntoResponse for FanoutError {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = Json(json!({
            "success": false,
            "error": {
                "message": self.to_string(),
                "code": status_code.as_u16(),
            }
        }));

        (status_code, body).into_response()
    }
}

/// Converts a domain result into a JSON response, mapping the error with `f`.
pub fn map_json_error<T, E, F>(result: Result<T, E>, f: F) -> Result<Json<T>, Response>
where
    T: serde::Serialize,
    F: FnOnce(E) -> FanoutError,
{
    result.map(Json).map_err(|err| f(err).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::validation_error;

    #[test]
    fn test_error_response_status() {
        let response = validation_error("missing address").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = FanoutError::NoTargetsError("no selected tokens".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_map_json_error() {
        let ok = map_json_error(Ok::<_, String>(3usize), validation_error);
        assert!(matches!(ok, Ok(Json(3))));

        let err = map_json_error(Err::<usize, _>("bad".to_string()), validation_error);
        assert_eq!(err.unwrap_err().status(), StatusCode::BAD_REQUEST);
    }
}
