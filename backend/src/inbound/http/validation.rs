//! Shared validation helpers for inbound HTTP adapters.

use serde_json::json;

use crate::domain::{
    Error, GroupId, LoginValidationError, PageValidationError, PasswordValidationError,
    ProfileValidationError, UserId,
};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidUuid,
    EmptyUsername,
    EmptyPassword,
    PasswordTooShort,
    PasswordTooLong,
    LimitOutOfRange,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::EmptyUsername => "empty_username",
            ErrorCode::EmptyPassword => "empty_password",
            ErrorCode::PasswordTooShort => "password_too_short",
            ErrorCode::PasswordTooLong => "password_too_long",
            ErrorCode::LimitOutOfRange => "limit_out_of_range",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Builder for validation errors with field context.
struct ValidationError {
    field: &'static str,
    message: String,
}

impl ValidationError {
    fn new(field: FieldName, message: impl Into<String>) -> Self {
        Self {
            field: field.as_str(),
            message: message.into(),
        }
    }

    fn with_code(self, code: &str) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "code": code,
        }))
    }

    fn with_value(self, code: &str, value: impl Into<String>) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "value": value.into(),
            "code": code,
        }))
    }
}

pub(crate) fn invalid_uuid_error(field: FieldName, value: &str) -> Error {
    ValidationError::new(field, format!("{} must be a valid UUID", field.as_str()))
        .with_value(ErrorCode::InvalidUuid.as_str(), value)
}

pub(crate) fn parse_user_id(value: &str, field: FieldName) -> Result<UserId, Error> {
    UserId::new(value).map_err(|_| invalid_uuid_error(field, value))
}

pub(crate) fn parse_group_id(value: &str, field: FieldName) -> Result<GroupId, Error> {
    GroupId::new(value).map_err(|_| invalid_uuid_error(field, value))
}

pub(crate) fn map_login_validation_error(err: LoginValidationError) -> Error {
    match err {
        LoginValidationError::EmptyUsername => ValidationError::new(
            FieldName::new("username"),
            "username must not be empty",
        )
        .with_code(ErrorCode::EmptyUsername.as_str()),
        LoginValidationError::EmptyPassword => ValidationError::new(
            FieldName::new("password"),
            "password must not be empty",
        )
        .with_code(ErrorCode::EmptyPassword.as_str()),
    }
}

pub(crate) fn map_password_validation_error(err: PasswordValidationError) -> Error {
    let code = match err {
        PasswordValidationError::TooShort { .. } => ErrorCode::PasswordTooShort,
        PasswordValidationError::TooLong { .. } => ErrorCode::PasswordTooLong,
    };
    ValidationError::new(FieldName::new("password"), err.to_string()).with_code(code.as_str())
}

pub(crate) fn map_profile_validation_error(err: ProfileValidationError) -> Error {
    let message = err.to_string();
    match err.field() {
        Some(field) => ValidationError::new(FieldName::new(field), message).with_code(err.code()),
        None => Error::invalid_request(message).with_details(json!({ "code": err.code() })),
    }
}

pub(crate) fn map_page_validation_error(err: PageValidationError) -> Error {
    ValidationError::new(FieldName::new("limit"), err.to_string())
        .with_code(ErrorCode::LimitOutOfRange.as_str())
}
