use thiserror::Error;

/// Unified error type for the shardlb engine
#[derive(Error, Debug)]
pub enum ShardError {
    #[error("No proxies available")]
    NoProxiesAvailable,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for shardlb operations
pub type Result<T> = std::result::Result<T, ShardError>;
