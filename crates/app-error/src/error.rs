//! The layered application error.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::frame::{ErrorFrame, Layer};

const FALLBACK_MESSAGE: &str = "An unexpected error occurred";
const PROPAGATED_MESSAGE: &str = "Propagated error";
const UNEXPECTED_CODE: &str = "unexpected_error";

/// Broad failure category, fixed when the error is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The store returned a different number of identifiers than rows sent.
    LengthMismatch,
    /// The store rejected the write.
    WriteFailed,
    /// Caller-supplied data failed validation.
    InvalidInput,
    /// Anything that did not originate as an `AppError`.
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LengthMismatch => "length_mismatch",
            Self::WriteFailed => "write_failed",
            Self::InvalidInput => "invalid_input",
            Self::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error carrying one frame per layer it crossed, innermost first.
///
/// The most recent frame is the user-facing one: [`AppError::code`] and
/// [`AppError::user_message`] read from it.
#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    frames: Vec<ErrorFrame>,
    origin: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(kind: ErrorKind, frame: ErrorFrame) -> Self {
        Self {
            kind,
            frames: vec![frame],
            origin: None,
        }
    }

    /// Wrap a foreign error as [`ErrorKind::Unexpected`].
    ///
    /// The frame message is the error's own message and the error is kept
    /// as the origin.
    pub fn unexpected<E>(layer: Layer, operation: &str, origin: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let origin = origin.into();
        let frame = ErrorFrame::new(layer, UNEXPECTED_CODE)
            .message(origin.to_string())
            .context("operation", operation);
        Self::new(ErrorKind::Unexpected, frame).with_origin(origin)
    }

    pub fn with_origin<E>(mut self, origin: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.origin = Some(origin.into());
        self
    }

    /// Append an outer frame.
    pub fn push(mut self, frame: ErrorFrame) -> Self {
        self.frames.push(frame);
        self
    }

    /// Append an outer frame that repeats the current user-facing message.
    pub fn propagate(self, layer: Layer, code: impl Into<String>) -> Self {
        let message = self
            .latest()
            .message
            .clone()
            .unwrap_or_else(|| PROPAGATED_MESSAGE.to_string());
        self.push(ErrorFrame::new(layer, code).message(message))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Frames in the order they were recorded, innermost first.
    pub fn frames(&self) -> &[ErrorFrame] {
        &self.frames
    }

    pub fn latest(&self) -> &ErrorFrame {
        // frames is never empty: every constructor seeds one frame
        &self.frames[self.frames.len() - 1]
    }

    pub fn code(&self) -> &str {
        &self.latest().code
    }

    pub fn user_message(&self) -> &str {
        self.latest().message.as_deref().unwrap_or(FALLBACK_MESSAGE)
    }

    /// Message of the innermost frame.
    pub fn dev_message(&self) -> Option<&str> {
        self.frames[0].message.as_deref()
    }

    pub fn origin(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.origin.as_deref()
    }

    /// Client payload. Frames and origin are only included when `dev` is set.
    pub fn to_client(&self, dev: bool) -> ClientError {
        ClientError {
            code: self.code().to_string(),
            message: self.user_message().to_string(),
            kind: self.kind,
            frames: dev.then(|| self.frames.clone()),
            origin: if dev {
                self.origin.as_ref().map(|e| e.to_string())
            } else {
                None
            },
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.user_message(), self.code())?;
        if f.alternate() {
            for frame in self.frames.iter().rev() {
                write!(f, "\n  at {} {}", frame.layer, frame.code)?;
                if let Some(message) = &frame.message {
                    write!(f, ": {message}")?;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.origin
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Error shape sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientError {
    pub code: String,
    pub message: String,
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<Vec<ErrorFrame>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// `{ success, data, error }` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ClientError>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn from_error(err: &AppError, dev: bool) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_client(dev)),
        }
    }
}

/// Attach frames to `Result`s on the way out of a layer.
pub trait FrameExt<T> {
    /// Push the frame built by `f` if the result is an error.
    fn with_frame<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> ErrorFrame;
}

impl<T> FrameExt<T> for Result<T, AppError> {
    fn with_frame<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> ErrorFrame,
    {
        self.map_err(|err| err.push(f()))
    }
}
