use thiserror::Error;

#[derive(Error, Debug)]
pub enum StationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown handler category '{category}' bound to item '{item}'")]
    InvalidBinding { item: String, category: String },

    #[error("Recipe catalog error: {0}")]
    RecipeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, StationError>;
