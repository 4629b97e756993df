use std::{error::Error, fmt, sync::Arc};

use sdlc_store::DecodeError;

use crate::model::GenerateError;
use crate::store::{RecordStore, StoreError};

pub mod estimation;
pub mod projects;

pub use projects::{ArtifactView, ProjectSummary, ScreenInventory};

#[derive(Debug)]
pub enum ControlError {
    NotFound { project_id: String },
    MissingPrerequisites(Vec<&'static str>),
    InvalidInput(String),
    Store(StoreError),
    Generate(GenerateError),
}

impl ControlError {
    /// HTTP status of an upstream failure, when there was one.
    #[must_use]
    pub const fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Store(err) => err.status(),
            Self::Generate(err) => err.status(),
            _ => None,
        }
    }
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { project_id } => write!(f, "No project found with ID {project_id}"),
            Self::MissingPrerequisites(missing) => write!(
                f,
                "Missing required artifacts. Generate these first: {}",
                missing.join(", ")
            ),
            Self::InvalidInput(message) => write!(f, "{message}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Generate(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ControlError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Generate(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ControlError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<DecodeError> for ControlError {
    fn from(err: DecodeError) -> Self {
        Self::Store(StoreError::Decode(err))
    }
}

impl From<GenerateError> for ControlError {
    fn from(err: GenerateError) -> Self {
        Self::Generate(err)
    }
}

/// Read and estimation operations over a record store.
#[derive(Clone)]
pub struct SdlcControlPlane {
    store: Arc<dyn RecordStore>,
}

impl SdlcControlPlane {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }
}

pub(crate) fn require_project_id(project_id: &str) -> Result<&str, ControlError> {
    let trimmed = project_id.trim();
    if trimmed.is_empty() {
        return Err(ControlError::InvalidInput("project_id is required".to_string()));
    }
    Ok(trimmed)
}
