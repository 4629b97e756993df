//! Lazily constructed, process-wide services.
//!
//! The store gateway and the model client are built on first use and then
//! shared. Concurrent first callers wait on a single construction; a failed
//! construction is not cached, so a later call tries again.

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::control::SdlcControlPlane;
use crate::model::TextGenerator;
use crate::store::RecordStore;

pub type BuildFuture<T> = Pin<Box<dyn Future<Output = Result<T, RegistryError>> + Send + 'static>>;
pub type BuildStoreFn = Arc<dyn Fn() -> BuildFuture<Arc<dyn RecordStore>> + Send + Sync + 'static>;
pub type BuildGeneratorFn =
    Arc<dyn Fn() -> BuildFuture<Arc<dyn TextGenerator>> + Send + Sync + 'static>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    BuildFailed(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuildFailed(message) => f.write_str(message),
        }
    }
}

impl Error for RegistryError {}

/// Builders for the registry's services.
#[derive(Clone)]
pub struct ServiceRegistryConfig {
    pub build_store: BuildStoreFn,
    pub build_generator: BuildGeneratorFn,
}

impl ServiceRegistryConfig {
    pub fn new(build_store: BuildStoreFn, build_generator: BuildGeneratorFn) -> Self {
        Self {
            build_store,
            build_generator,
        }
    }
}

#[derive(Clone)]
pub struct ServiceRegistry {
    inner: Arc<ServiceRegistryInner>,
}

struct ServiceRegistryInner {
    config: ServiceRegistryConfig,
    control: OnceCell<SdlcControlPlane>,
    generator: OnceCell<Arc<dyn TextGenerator>>,
}

impl ServiceRegistry {
    pub fn new(config: ServiceRegistryConfig) -> Self {
        Self {
            inner: Arc::new(ServiceRegistryInner {
                config,
                control: OnceCell::new(),
                generator: OnceCell::new(),
            }),
        }
    }

    /// A registry over ready-made services.
    pub fn from_parts(store: Arc<dyn RecordStore>, generator: Arc<dyn TextGenerator>) -> Self {
        let build_store: BuildStoreFn = Arc::new(move || -> BuildFuture<Arc<dyn RecordStore>> {
            let store = store.clone();
            Box::pin(async move { Ok(store) })
        });
        let build_generator: BuildGeneratorFn =
            Arc::new(move || -> BuildFuture<Arc<dyn TextGenerator>> {
                let generator = generator.clone();
                Box::pin(async move { Ok(generator) })
            });
        Self::new(ServiceRegistryConfig::new(build_store, build_generator))
    }

    /// # Errors
    /// Returns `RegistryError::BuildFailed` when the store cannot be built.
    pub async fn control(&self) -> Result<SdlcControlPlane, RegistryError> {
        let build = self.inner.config.build_store.clone();
        let control = self
            .inner
            .control
            .get_or_try_init(|| async move { (build)().await.map(SdlcControlPlane::new) })
            .await?;
        Ok(control.clone())
    }

    /// # Errors
    /// Returns `RegistryError::BuildFailed` when the model client cannot be built.
    pub async fn generator(&self) -> Result<Arc<dyn TextGenerator>, RegistryError> {
        let build = self.inner.config.build_generator.clone();
        let generator = self
            .inner
            .generator
            .get_or_try_init(|| (build)())
            .await?;
        Ok(generator.clone())
    }
}
