use std::sync::Arc;
use std::time::Duration;

use sdlc_core::model::{CachedCredential, CredentialSource, TextGenerator, VertexGenerator};
use sdlc_core::services::{
    BuildFuture,
    BuildGeneratorFn,
    BuildStoreFn,
    RegistryError,
    ServiceRegistry,
    ServiceRegistryConfig,
};
use sdlc_core::store::{PostgrestStore, RecordStore};
use tracing::info;

use crate::config::SdlcConfig;

const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

pub fn build_registry(config: &SdlcConfig) -> ServiceRegistry {
    ServiceRegistry::new(ServiceRegistryConfig::new(
        build_store(config),
        build_generator(config),
    ))
}

fn build_store(config: &SdlcConfig) -> BuildStoreFn {
    let config = config.clone();
    Arc::new(move || -> BuildFuture<Arc<dyn RecordStore>> {
        let config = config.clone();
        Box::pin(async move {
            let url = config
                .supabase_url
                .as_deref()
                .ok_or_else(|| missing("SUPABASE_URL"))?;
            let key = config
                .supabase_service_role_key
                .as_deref()
                .ok_or_else(|| missing("SUPABASE_SERVICE_ROLE_KEY"))?;

            let store = PostgrestStore::new(url, key, config.store_timeout).map_err(map_build_error)?;
            info!(rest_url = store.rest_url(), "record store ready");
            let store: Arc<dyn RecordStore> = Arc::new(store);
            Ok(store)
        })
    })
}

fn build_generator(config: &SdlcConfig) -> BuildGeneratorFn {
    let vertex = config.vertex.clone();
    Arc::new(move || -> BuildFuture<Arc<dyn TextGenerator>> {
        let vertex = vertex.clone();
        Box::pin(async move {
            let source = CredentialSource::discover().map_err(map_build_error)?;
            let client = reqwest::Client::builder()
                .timeout(TOKEN_TIMEOUT)
                .build()
                .map_err(map_build_error)?;
            let credential = Arc::new(CachedCredential::new(source, client));

            let generator = VertexGenerator::new(vertex, credential).map_err(map_build_error)?;
            info!(
                model = %generator.config().model,
                location = %generator.config().location,
                "model client ready"
            );
            let generator: Arc<dyn TextGenerator> = Arc::new(generator);
            Ok(generator)
        })
    })
}

fn missing(name: &str) -> RegistryError {
    RegistryError::BuildFailed(format!("{name} environment variable is required"))
}

fn map_build_error(err: impl std::fmt::Display) -> RegistryError {
    RegistryError::BuildFailed(err.to_string())
}
