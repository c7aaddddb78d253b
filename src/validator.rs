use anyhow::anyhow;
use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, request::Parts},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use siges_core::errors::{FieldErrors, NON_FIELD_ERRORS};
use siges_core::AppError;

const DATA_ERROR_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// Turns a serde data error into `(field, message)`.
///
/// axum reports data errors as `<prefix><path>: <message> at line L column C`.
fn split_data_error(text: &str) -> (String, String) {
    if let Some(field) = text
        .split("missing field `")
        .nth(1)
        .and_then(|s| s.split('`').next())
    {
        return (field.to_string(), "This field is required.".to_string());
    }

    let detail = text.strip_prefix(DATA_ERROR_PREFIX).unwrap_or(text);
    let detail = detail
        .rsplit_once(" at line ")
        .map(|(head, _)| head)
        .unwrap_or(detail);

    match detail.split_once(": ") {
        Some((path, message))
            if !path.is_empty()
                && path
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']')) =>
        {
            let field = path.split(['.', '[']).next().unwrap_or(path);
            (field.to_string(), message.to_string())
        }
        _ => (NON_FIELD_ERRORS.to_string(), detail.to_string()),
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let (field, message) = split_data_error(&err.body_text());
            AppError::field(field, message)
        }
        JsonRejection::JsonSyntaxError(_) => {
            AppError::field(NON_FIELD_ERRORS, "JSON parse error.")
        }
        JsonRejection::MissingJsonContentType(_) => AppError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            anyhow!("Missing 'Content-Type: application/json' header"),
        ),
        other => AppError::bad_request(anyhow!("Invalid request body: {}", other.body_text())),
    }
}

/// JSON body extractor that also runs `validator` rules.
///
/// Both deserialization and validation failures become a 400 with a
/// field-to-messages body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;

        value
            .validate()
            .map_err(|errors| AppError::from_validation(&errors))?;

        Ok(ValidatedJson(value))
    }
}

/// `axum::extract::Path` whose rejection is a JSON `{"detail": ...}` 400.
#[derive(Debug, Clone, Copy, Default)]
pub struct Path<T>(pub T);

impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(value)) => Ok(Path(value)),
            Err(PathRejection::FailedToDeserializePathParams(err)) => {
                Err(AppError::bad_request(anyhow!("Malformed identifier in URL: {}", err.body_text())))
            }
            Err(other) => Err(AppError::internal(anyhow!(other.body_text()))),
        }
    }
}

/// `axum::extract::Query` whose rejection is a JSON `{"detail": ...}` 400.
#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        axum::extract::Query::<T>::from_request_parts(parts, state)
            .await
            .map(|axum::extract::Query(value)| Query(value))
            .map_err(|rejection: QueryRejection| {
                AppError::bad_request(anyhow!("Invalid query string: {}", rejection.body_text()))
            })
    }
}

/// Rejects a body whose nullable fields failed their hand-written checks.
pub fn reject_field_errors(errors: Vec<(&'static str, &'static str)>) -> Result<(), AppError> {
    if errors.is_empty() {
        return Ok(());
    }
    let mut fields = FieldErrors::new();
    for (field, message) in errors {
        fields
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }
    Err(AppError::validation(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_is_required() {
        let (field, message) = split_data_error(
            "Failed to deserialize the JSON body into the target type: missing field `cycle` at line 1 column 15",
        );
        assert_eq!(field, "cycle");
        assert_eq!(message, "This field is required.");
    }

    #[test]
    fn path_prefix_becomes_field() {
        let (field, message) = split_data_error(
            "Failed to deserialize the JSON body into the target type: gender: unknown variant `male`, expected one of `MALE`, `FEMALE`, `OTHER` at line 1 column 17",
        );
        assert_eq!(field, "gender");
        assert!(message.starts_with("unknown variant `male`"));
    }

    #[test]
    fn nested_path_reports_top_level_field() {
        let (field, _) = split_data_error(
            "Failed to deserialize the JSON body into the target type: parents[0]: UUID parsing failed at line 1 column 20",
        );
        assert_eq!(field, "parents");
    }

    #[test]
    fn unrecognised_text_is_non_field() {
        let (field, message) = split_data_error("invalid type: map, expected a string");
        assert_eq!(field, NON_FIELD_ERRORS);
        assert_eq!(message, "invalid type: map, expected a string");
    }

    #[test]
    fn field_errors_are_grouped() {
        assert!(reject_field_errors(Vec::new()).is_ok());

        let err = reject_field_errors(vec![("photo_url", "a"), ("photo_url", "b")]).unwrap_err();
        assert_eq!(err.status.as_u16(), 400);
        assert_eq!(err.fields.unwrap()["photo_url"], vec!["a", "b"]);
    }
}
