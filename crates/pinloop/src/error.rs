//! Error types for executor construction

/// Error creating a [`crate::ThreadExecutor`]
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    /// The executor name was empty
    #[error("executor name must not be empty")]
    EmptyName,

    /// The OS could not create the worker thread (resource exhaustion)
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
