use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("Panel login failed: {reason}")]
    Auth { reason: String },

    #[error("Certificate fetch failed: {reason}")]
    Fetch { reason: String },

    #[error("Node registration failed (status {status}): {body}")]
    Register { status: u16, body: String },

    #[error("SSH authentication failed for {user}@{host}")]
    SshAuth { user: String, host: String },

    #[error("SSH connection to {host}:{port} failed: {reason}")]
    SshConnect {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Remote command exited with status {exit_code}: {command}")]
    Command {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Validation error: {field}: {reason}")]
    ValidationError { field: String, reason: String },
}

impl EnrollError {
    /// Process exit code for this failure. Configuration problems get their
    /// own code so wrapper scripts can tell "fix your flags" apart from
    /// "the panel or the node host rejected us".
    pub fn exit_code(&self) -> i32 {
        match self {
            EnrollError::ConfigError { .. } | EnrollError::ValidationError { .. } => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, EnrollError>;
