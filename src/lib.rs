use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolboxError>;

#[derive(Error, Debug)]
pub enum ToolboxError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<config::ConfigError> for ToolboxError {
    #[inline]
    fn from(error: config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

pub mod commands;
pub mod config;
pub mod mcp;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;
