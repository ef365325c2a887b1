//! Capture source registry.

use std::sync::Arc;
use std::time::Duration;

use super::backend::{CaptureBackend, EnumerateOptions};
use super::types::{CaptureSource, RegistryError};
use crate::config::CaptureConfig;

/// Lists the windows and screens available for capture.
#[derive(Clone)]
pub struct CaptureSourceRegistry {
    backend: Arc<dyn CaptureBackend>,
    config: CaptureConfig,
}

impl CaptureSourceRegistry {
    pub fn new(backend: Arc<dyn CaptureBackend>, config: CaptureConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> Arc<dyn CaptureBackend> {
        Arc::clone(&self.backend)
    }

    /// Enumerate sources on the blocking pool, bounded by
    /// `enumerate_timeout_ms`.
    pub async fn list_sources(&self) -> Result<Vec<CaptureSource>, RegistryError> {
        let backend = Arc::clone(&self.backend);
        let options = EnumerateOptions {
            thumbnail_width: self.config.thumbnail_width,
            include_screens: self.config.include_screens,
        };
        let timeout_ms = u64::from(self.config.enumerate_timeout_ms);

        let task = tokio::task::spawn_blocking(move || backend.enumerate(&options));
        let result = match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(RegistryError::Enumeration(format!(
                "enumeration task failed: {}",
                join_err
            ))),
            Err(_) => Err(RegistryError::Timeout { millis: timeout_ms }),
        };

        match &result {
            Ok(sources) => log::info!("[REGISTRY] {} capture sources", sources.len()),
            Err(e) => log::warn!("[REGISTRY] {}", e),
        }
        result
    }
}
