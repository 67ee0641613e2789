use thiserror::Error;

/// Errors returned by the validation and signature helpers. Body reads have
/// their own [`crate::BodyError`].
#[derive(Debug, Error)]
pub enum OdiadevError {
    #[error("{field}: {message}")]
    Validation {
        field: String,
        code: &'static str,
        message: String,
    },

    #[error("invalid signature")]
    InvalidSignature,
}
