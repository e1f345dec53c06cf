//! Validated JSON extractor.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use common::{AppError, HttpException, ValidationIssue};

/// JSON extractor that validates the payload before the handler runs.
///
/// Malformed bodies and failed validation are answered with
/// `422 Unprocessable Entity`. Other rejections keep their own status,
/// e.g. `415` for a missing content type or `413` for an oversized body.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_error)?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

fn rejection_error(rejection: JsonRejection) -> AppError {
    let kind = match &rejection {
        JsonRejection::JsonSyntaxError(_) => "json_invalid",
        JsonRejection::JsonDataError(_) => "value_error",
        _ => return HttpException::new(rejection.status(), rejection.body_text()).into(),
    };
    AppError::RequestValidation(vec![ValidationIssue::new(
        vec!["body".to_string()],
        rejection.body_text(),
        kind,
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct NewItem {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
    }

    fn json_request(body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body() {
        let ValidatedJson(item) = ValidatedJson::<NewItem>::from_request(json_request(r#"{"name":"hammer"}"#), &())
            .await
            .unwrap();
        assert_eq!(item.name, "hammer");
    }

    #[tokio::test]
    async fn test_failed_validation_is_422() {
        let err = ValidatedJson::<NewItem>::from_request(json_request(r#"{"name":""}"#), &())
            .await
            .err()
            .unwrap();
        match &err {
            AppError::RequestValidation(issues) => {
                assert_eq!(issues[0].loc, vec!["body", "name"]);
                assert_eq!(issues[0].msg, "Name is required");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_malformed_body_is_422() {
        let err = ValidatedJson::<NewItem>::from_request(json_request("{"), &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_missing_content_type_keeps_its_status() {
        let request = axum::http::Request::builder()
            .method("POST")
            .body(Body::from(r#"{"name":"hammer"}"#))
            .unwrap();
        let err = ValidatedJson::<NewItem>::from_request(request, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
