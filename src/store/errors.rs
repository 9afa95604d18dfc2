use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Wrong value type at key '{key}': expected {expected}")]
    WrongType { key: String, expected: &'static str },

    #[error("Non-numeric scalar at key '{key}'")]
    NotNumeric { key: String },
}
