use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unsupported value shape: {0}")]
    UnsupportedShape(String),
}
