//! Layered error reporting for catalog-sync.
//!
//! A failure starts as an [`AppError`] with one [`ErrorFrame`] and a fixed
//! [`ErrorKind`]. Each layer it crosses on the way out (data access, service,
//! request handler) appends its own frame, so the chain reads innermost
//! first and the most recent frame carries the user-facing code and message.
//!
//! # Example
//!
//! ```rust
//! use app_error::{AppError, ErrorFrame, ErrorKind, FrameExt, Layer};
//!
//! fn dal() -> Result<(), AppError> {
//!     Err(AppError::new(
//!         ErrorKind::WriteFailed,
//!         ErrorFrame::new(Layer::DataAccess, "upsert_products_failed")
//!             .message("Failed to upsert products")
//!             .context("count", 3),
//!     ))
//! }
//!
//! fn service() -> Result<(), AppError> {
//!     dal().with_frame(|| {
//!         ErrorFrame::new(Layer::Service, "upsert_products_service_failed")
//!             .message("Product upsert service failed")
//!     })
//! }
//!
//! let err = service().unwrap_err();
//! assert_eq!(err.code(), "upsert_products_service_failed");
//! assert_eq!(err.frames().len(), 2);
//! ```

mod error;
mod frame;


pub use error::{ApiResponse, AppError, ClientError, ErrorKind, FrameExt};
pub use frame::{ErrorFrame, Layer};
