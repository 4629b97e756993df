//! Hosted model invocation.
//!
//! [`TextGenerator`] is the seam the estimation pipeline calls through;
//! [`VertexGenerator`] implements it against Vertex AI `generateContent`.

pub mod credentials;
pub mod parts;
pub mod vertex;

use std::{error::Error, fmt};

use async_trait::async_trait;

pub use credentials::{CachedCredential, CredentialError, CredentialSource};
pub use parts::Fragment;
pub use vertex::{VertexConfig, VertexGenerator};

#[derive(Debug)]
pub enum GenerateError {
    Credentials(CredentialError),
    Status { status: u16, body: String },
    Transport(reqwest::Error),
    Decode(String),
    EmptyResponse { finish_reason: Option<String> },
}

impl GenerateError {
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credentials(err) => write!(f, "{err}"),
            Self::Status { status, body } => {
                write!(f, "generateContent failed ({status}): {body}")
            }
            Self::Transport(err) => write!(f, "model request failed: {err}"),
            Self::Decode(message) => write!(f, "unreadable model response: {message}"),
            Self::EmptyResponse { finish_reason } => match finish_reason {
                Some(reason) => write!(f, "model returned no content (finish reason: {reason})"),
                None => f.write_str("model returned no content"),
            },
        }
    }
}

impl Error for GenerateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Credentials(err) => Some(err),
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CredentialError> for GenerateError {
    fn from(err: CredentialError) -> Self {
        Self::Credentials(err)
    }
}

impl From<reqwest::Error> for GenerateError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err)
    }
}

/// Single-shot text generation: a system instruction plus one user document.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system_instruction: &str,
        user_text: &str,
    ) -> Result<String, GenerateError>;
}
