use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown setting name: {0}")]
    UnknownSetting(String),

    #[error("invalid boolean value {value:?} for setting {name}")]
    InvalidBool { name: String, value: String },
}

pub type ModelResult<T> = Result<T, ModelError>;
