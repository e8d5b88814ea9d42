use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::Validate;

/// JSON body that has passed its `validator` rules.
///
/// Malformed JSON (bad dates, wrong types, missing fields) is a 400; rule
/// violations are a 422.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Json parse error: {}", e.body_text())))?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse, routing::post, Router};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize, Validate)]
    struct Plate {
        #[validate(length(min = 1))]
        plate: String,
    }

    async fn echo(ValidatedJson(body): ValidatedJson<Plate>) -> impl IntoResponse {
        body.plate
    }

    async fn status_for(body: &'static str) -> StatusCode {
        Router::new()
            .route("/", post(echo))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn valid_body_passes() {
        assert_eq!(status_for(r#"{"plate":"HH-AB-1"}"#).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        assert_eq!(status_for(r#"{"plate":12}"#).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rule_violation_is_unprocessable() {
        assert_eq!(status_for(r#"{"plate":""}"#).await, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
