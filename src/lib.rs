pub mod alphabet;
pub mod comm;
pub mod config;
pub mod corpus;
pub mod exchange;
pub mod kernel;
pub mod pool;
pub mod runner;
pub mod words;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemperError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Exchange Protocol Error: {0}")]
    Protocol(String),
}

pub type TpResult<T> = Result<T, TemperError>;
