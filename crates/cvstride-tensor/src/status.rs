use thiserror::Error;

/// Status code reported by operators and streams.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// The operation completed.
    Success,
    /// An argument is out of range or inconsistent with the others.
    ErrorInvalidArgument,
    /// The image or tensor format is not supported by the operation.
    ErrorInvalidImageFormat,
    /// The operation is not allowed in the current state.
    ErrorInvalidOperation,
    /// The operands are not compatible with each other.
    ErrorNotCompatible,
    /// Memory could not be allocated.
    ErrorOutOfMemory,
    /// Unexpected failure inside the library.
    ErrorInternal,
}

impl Status {
    /// Returns the canonical name of the status.
    pub fn name(&self) -> &'static str {
        match self {
            Status::Success => "SUCCESS",
            Status::ErrorInvalidArgument => "ERROR_INVALID_ARGUMENT",
            Status::ErrorInvalidImageFormat => "ERROR_INVALID_IMAGE_FORMAT",
            Status::ErrorInvalidOperation => "ERROR_INVALID_OPERATION",
            Status::ErrorNotCompatible => "ERROR_NOT_COMPATIBLE",
            Status::ErrorOutOfMemory => "ERROR_OUT_OF_MEMORY",
            Status::ErrorInternal => "ERROR_INTERNAL",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed [`Status`] with a human readable message.
///
/// # Example
///
/// ```
/// use cvstride_tensor::status::{Status, StatusError};
///
/// let err = StatusError::invalid_argument("Input must be a 4D tensor");
/// assert_eq!(err.status(), Status::ErrorInvalidArgument);
/// assert_eq!(err.to_string(), "ERROR_INVALID_ARGUMENT: Input must be a 4D tensor");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct StatusError {
    status: Status,
    message: String,
}

impl StatusError {
    /// Creates an error with the given status and message.
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Creates an [`Status::ErrorInvalidArgument`] error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Status::ErrorInvalidArgument, message)
    }

    /// Creates an [`Status::ErrorInvalidImageFormat`] error.
    pub fn invalid_image_format(message: impl Into<String>) -> Self {
        Self::new(Status::ErrorInvalidImageFormat, message)
    }

    /// Creates an [`Status::ErrorInternal`] error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Status::ErrorInternal, message)
    }

    /// Returns the status code.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns the message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<crate::tensor::TensorError> for StatusError {
    fn from(err: crate::tensor::TensorError) -> Self {
        use crate::tensor::TensorError;
        let status = match &err {
            TensorError::StorageError(_) => Status::ErrorOutOfMemory,
            TensorError::InvalidDataType(_) => Status::ErrorInvalidImageFormat,
            TensorError::InvalidShape(_) | TensorError::InvalidLayout(_) => {
                Status::ErrorInvalidArgument
            }
        };
        Self::new(status, err.to_string())
    }
}
