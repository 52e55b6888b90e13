//! Result envelope returned by every repository operation.
//!
//! An [`Envelope`] carries the outcome of one data-access call: success flag,
//! an HTTP-style [`StatusCode`], an [`ErrorType`] classification decoupled from
//! transport semantics, an optional payload, and an optional message.
//!
//! The constructors on [`Envelope`] are the only place the status code and
//! error type are paired, so every repository reports outcomes with the same
//! mapping:
//!
//! | constructor      | status | error type      | success |
//! |------------------|--------|-----------------|---------|
//! | `ok`             | 200    | `Success`       | yes     |
//! | `created`        | 201    | `Success`       | yes     |
//! | `no_content`     | 204    | `EmptyResult`   | yes     |
//! | `bad_request`    | 400    | `Validation`    | no      |
//! | `not_found`      | 404    | `NotFound`      | no      |
//! | `conflict`       | 404    | `Conflict`      | no      |
//! | `error`          | 500    | `Exception`     | no      |
//! | `database_error` | 500    | `DatabaseError` | no      |
//!
//! Envelopes are built fresh per call and never mutated afterwards.

use std::fmt;

use serde::de::Error as _;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// HTTP-style outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum StatusCode {
    /// 200: query or command succeeded.
    Ok,
    /// 201: a record was created.
    Created,
    /// 204: the query succeeded and matched nothing.
    NoContent,
    /// 400: the caller supplied malformed input.
    BadRequest,
    /// 404: no matching record.
    NotFound,
    /// 500: the store failed.
    InternalServerError,
}

impl StatusCode {
    /// Numeric HTTP status.
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
            Self::NoContent => 204,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::InternalServerError => 500,
        }
    }

    /// True for 200, 201 and 204.
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::Created | Self::NoContent)
    }

    const fn reason(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Created => "Created",
            Self::NoContent => "No Content",
            Self::BadRequest => "Bad Request",
            Self::NotFound => "Not Found",
            Self::InternalServerError => "Internal Server Error",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason())
    }
}

impl From<StatusCode> for u16 {
    fn from(value: StatusCode) -> Self {
        value.as_u16()
    }
}

/// Raised when a numeric status has no envelope meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported envelope status code {0}")]
pub struct UnsupportedStatusCode(pub u16);

impl TryFrom<u16> for StatusCode {
    type Error = UnsupportedStatusCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            200 => Ok(Self::Ok),
            201 => Ok(Self::Created),
            204 => Ok(Self::NoContent),
            400 => Ok(Self::BadRequest),
            404 => Ok(Self::NotFound),
            500 => Ok(Self::InternalServerError),
            other => Err(UnsupportedStatusCode(other)),
        }
    }
}

/// Transport-agnostic outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The operation succeeded.
    Success,
    /// Caller input was malformed (zero id, absent entity).
    Validation,
    /// No record matched.
    NotFound,
    /// The targeted record changed or vanished while the write ran.
    Conflict,
    /// The operation failed outside the store (for example, cancellation).
    Exception,
    /// The store reported a failure.
    DatabaseError,
    /// The query succeeded with zero rows.
    EmptyResult,
}

impl ErrorType {
    /// Canonical status for this classification.
    ///
    /// `Success` maps to 200; `created` envelopes pair it with 201 instead.
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::Success => StatusCode::Ok,
            Self::EmptyResult => StatusCode::NoContent,
            Self::Validation => StatusCode::BadRequest,
            Self::NotFound | Self::Conflict => StatusCode::NotFound,
            Self::Exception | Self::DatabaseError => StatusCode::InternalServerError,
        }
    }

    /// True for the classifications used on success paths.
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::EmptyResult)
    }
}

/// The outcome of one data operation.
///
/// ## Invariants
/// - `is_success()` is true iff the status is 200, 201 or 204.
/// - Failures always carry a non-empty message and never carry data.
///
/// # Examples
/// ```
/// use datastore::domain::{Envelope, ErrorType, StatusCode};
///
/// let found = Envelope::ok(7).with_message("Entity found.");
/// assert!(found.is_success());
/// assert_eq!(found.data(), Some(&7));
///
/// let missing: Envelope<u32> = Envelope::not_found("Entity not found.");
/// assert_eq!(missing.status_code(), StatusCode::NotFound);
/// assert_eq!(missing.error_type(), ErrorType::NotFound);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<T> {
    status_code: StatusCode,
    error_type: ErrorType,
    data: Option<T>,
    message: Option<String>,
}

impl<T> Envelope<T> {
    const fn success(status_code: StatusCode, error_type: ErrorType, data: Option<T>) -> Self {
        Self {
            status_code,
            error_type,
            data,
            message: None,
        }
    }

    fn failure(error_type: ErrorType, message: impl Into<String>) -> Self {
        let status_code = error_type.status_code();
        let message = message.into();
        let message = if message.trim().is_empty() {
            status_code.reason().to_owned()
        } else {
            message
        };
        Self {
            status_code,
            error_type,
            data: None,
            message: Some(message),
        }
    }

    /// 200 carrying `data`.
    pub const fn ok(data: T) -> Self {
        Self::success(StatusCode::Ok, ErrorType::Success, Some(data))
    }

    /// 201 echoing the created `data`.
    pub const fn created(data: T) -> Self {
        Self::success(StatusCode::Created, ErrorType::Success, Some(data))
    }

    /// 204: the query succeeded and returned nothing.
    pub const fn no_content() -> Self {
        Self::success(StatusCode::NoContent, ErrorType::EmptyResult, None)
    }

    /// 400: malformed caller input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::failure(ErrorType::Validation, message)
    }

    /// 404: no record matched.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::failure(ErrorType::NotFound, message)
    }

    /// 404: the record vanished or changed while a write ran.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::failure(ErrorType::Conflict, message)
    }

    /// 500: the operation failed outside the store.
    pub fn error(message: impl Into<String>) -> Self {
        Self::failure(ErrorType::Exception, message)
    }

    /// 500: the store reported a failure.
    pub fn database_error(message: impl Into<String>) -> Self {
        Self::failure(ErrorType::DatabaseError, message)
    }

    /// Attach an explanatory message while building the envelope.
    ///
    /// Failure messages are fixed by their constructor; this only replaces
    /// them when `message` is non-empty.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        if !message.trim().is_empty() {
            self.message = Some(message);
        }
        self
    }

    /// True iff the status is 200, 201 or 204.
    pub const fn is_success(&self) -> bool {
        self.status_code.is_success()
    }

    /// HTTP-style status.
    pub const fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// Transport-agnostic classification.
    pub const fn error_type(&self) -> ErrorType {
        self.error_type
    }

    /// Payload, present only on success paths that return data.
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Consume the envelope, returning the payload.
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Human-readable explanation.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Transform the payload, keeping status and message.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            status_code: self.status_code,
            error_type: self.error_type,
            data: self.data.map(f),
            message: self.message,
        }
    }

    /// Convert into a `Result` so callers can propagate failures with `?`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeFailure`] for every non-success envelope.
    pub fn into_result(self) -> Result<Option<T>, EnvelopeFailure> {
        if self.is_success() {
            return Ok(self.data);
        }
        Err(EnvelopeFailure {
            status_code: self.status_code,
            error_type: self.error_type,
            message: self.message.unwrap_or_default(),
        })
    }
}

/// A failed envelope lifted into the `Error` trait.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status_code}: {message}")]
pub struct EnvelopeFailure {
    /// Failure status.
    pub status_code: StatusCode,
    /// Failure classification.
    pub error_type: ErrorType,
    /// Explanation carried by the envelope.
    pub message: String,
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 3 + usize::from(self.data.is_some()) + usize::from(self.message.is_some());
        let mut state = serializer.serialize_struct("Envelope", len)?;
        state.serialize_field("isSuccess", &self.is_success())?;
        state.serialize_field("statusCode", &self.status_code)?;
        state.serialize_field("errorType", &self.error_type)?;
        if let Some(data) = &self.data {
            state.serialize_field("data", data)?;
        }
        if let Some(message) = &self.message {
            state.serialize_field("message", message)?;
        }
        state.end()
    }
}

/// Reasons a serialised envelope is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeDecodeError {
    /// `isSuccess` disagrees with the status code.
    #[error("isSuccess={is_success} contradicts status {status_code}")]
    SuccessMismatch {
        /// Decoded success flag.
        is_success: bool,
        /// Decoded status.
        status_code: StatusCode,
    },
    /// The error type belongs to the opposite outcome.
    #[error("error type {error_type:?} contradicts status {status_code}")]
    ErrorTypeMismatch {
        /// Decoded classification.
        error_type: ErrorType,
        /// Decoded status.
        status_code: StatusCode,
    },
    /// Failures must explain themselves.
    #[error("failed envelope is missing its message")]
    MissingMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeDto<T> {
    is_success: bool,
    status_code: StatusCode,
    error_type: ErrorType,
    data: Option<T>,
    message: Option<String>,
}

impl<T> TryFrom<EnvelopeDto<T>> for Envelope<T> {
    type Error = EnvelopeDecodeError;

    fn try_from(value: EnvelopeDto<T>) -> Result<Self, Self::Error> {
        let EnvelopeDto {
            is_success,
            status_code,
            error_type,
            data,
            message,
        } = value;

        if is_success != status_code.is_success() {
            return Err(EnvelopeDecodeError::SuccessMismatch {
                is_success,
                status_code,
            });
        }
        if error_type.is_success() != status_code.is_success() {
            return Err(EnvelopeDecodeError::ErrorTypeMismatch {
                error_type,
                status_code,
            });
        }
        if is_success {
            return Ok(Self {
                status_code,
                error_type,
                data,
                message,
            });
        }

        match message {
            Some(message) if !message.trim().is_empty() => Ok(Self {
                status_code,
                error_type,
                data: None,
                message: Some(message),
            }),
            _ => Err(EnvelopeDecodeError::MissingMessage),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Envelope<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dto = EnvelopeDto::<T>::deserialize(deserializer)?;
        Self::try_from(dto).map_err(D::Error::custom)
    }
}
