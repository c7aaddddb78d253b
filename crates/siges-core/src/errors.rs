//! Application error type and its HTTP representation.
//!
//! Every handler returns `Result<_, AppError>`. Errors render in one of two
//! shapes:
//!
//! - Validation failures (400) render a field-to-messages map:
//!   `{"name": ["This field is required."]}`
//! - Everything else renders `{"detail": "..."}`. Server errors never leak
//!   their cause; it is logged instead.

use std::collections::BTreeMap;

use anyhow::{Error, anyhow};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;
use validator::ValidationErrors;

/// Field name to list of messages, as returned for validation failures.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
    pub fields: Option<FieldErrors>,
}

impl AppError {
    pub fn new<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
            fields: None,
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::NOT_FOUND, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, err)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, anyhow!(message.into()))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, anyhow!(message.into()))
    }

    /// Deleting or re-parenting would orphan dependent rows.
    pub fn referential_constraint(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, anyhow!(message.into()))
    }

    /// A 400 carrying a field-to-messages map.
    pub fn validation(fields: FieldErrors) -> Self {
        let summary = fields
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            status: StatusCode::BAD_REQUEST,
            error: anyhow!(summary),
            fields: Some(fields),
        }
    }

    /// A 400 for a single offending field.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), vec![message.into()]);
        Self::validation(fields)
    }

    pub fn from_validation(errors: &ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();

        for (field, errors) in errors.field_errors() {
            let messages = fields.entry(field.to_string()).or_default();
            for error in errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|msg| msg.to_string())
                    .unwrap_or_else(|| default_message(&error.code));
                messages.push(message);
            }
        }

        if fields.is_empty() {
            fields.insert(
                NON_FIELD_ERRORS.to_string(),
                vec!["Invalid input.".to_string()],
            );
        }

        Self::validation(fields)
    }

    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }
}

fn default_message(code: &str) -> String {
    match code {
        "required" => "This field is required.".to_string(),
        "length" => "Ensure this field has a valid length.".to_string(),
        "email" => "Enter a valid email address.".to_string(),
        "url" => "Enter a valid URL.".to_string(),
        "range" => "Ensure this value is within the allowed range.".to_string(),
        other => format!("Invalid value ({}).", other),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(fields) = self.fields {
            return (self.status, Json(fields)).into_response();
        }

        if self.is_server_error() {
            error!(error = %self.error, status = %self.status.as_u16(), "Unhandled server error");
            let body = Json(json!({ "detail": "Internal server error" }));
            return (self.status, body).into_response();
        }

        let body = Json(json!({
            "detail": self.error.to_string()
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        AppError::internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "Name cannot be blank."))]
        name: String,
        #[validate(email)]
        email: String,
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn detail_body_for_forbidden() {
        let response = AppError::forbidden("nope").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await, json!({ "detail": "nope" }));
    }

    #[tokio::test]
    async fn server_errors_hide_their_cause() {
        let response = AppError::internal(anyhow!("connection refused")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "detail": "Internal server error" })
        );
    }

    #[tokio::test]
    async fn field_error_renders_map() {
        let response = AppError::field("director", "User is not a director.").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "director": ["User is not a director."] })
        );
    }

    #[test]
    fn validation_errors_keep_custom_and_default_messages() {
        let payload = Payload {
            name: String::new(),
            email: "not-an-email".to_string(),
        };
        let errors = payload.validate().unwrap_err();
        let app_error = AppError::from_validation(&errors);

        assert_eq!(app_error.status, StatusCode::BAD_REQUEST);
        let fields = app_error.fields.unwrap();
        assert_eq!(fields["name"], vec!["Name cannot be blank.".to_string()]);
        assert_eq!(
            fields["email"],
            vec!["Enter a valid email address.".to_string()]
        );
    }

    #[test]
    fn referential_constraint_is_conflict() {
        let err = AppError::referential_constraint("class still has students");
        assert_eq!(err.status, StatusCode::CONFLICT);
    }
}
