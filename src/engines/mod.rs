//! OCR engine implementations
//!
//! This module contains implementations of the OcrEngine trait for different
//! OCR backends. Engines are conditionally compiled based on feature flags.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-tesseract")]
pub mod tesseract;

#[cfg(feature = "model-download")]
#[cfg_attr(
    not(any(feature = "engine-ocrs", feature = "engine-tesseract")),
    allow(dead_code)
)]
mod models;

#[cfg_attr(not(feature = "engine-tesseract"), allow(dead_code))]
mod tsv;

use crate::config::Config;
use crate::engine::OcrEngine;
use crate::error::OcrError;
use serde::Serialize;
use std::sync::Arc;

/// Information about an available engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
}

/// Registry of available OCR engines, each initialized exactly once
pub struct EngineRegistry {
    engines: Vec<Arc<dyn OcrEngine>>,
    default_engine: String,
}

impl EngineRegistry {
    /// Create a new engine registry with all compiled engines initialized.
    /// The configured engine becomes the default, otherwise the first one.
    #[allow(unused_mut)]
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        let mut engines: Vec<Arc<dyn OcrEngine>> = Vec::new();

        #[cfg(feature = "engine-ocrs")]
        {
            if wanted(config, "ocrs") {
                tracing::info!("Initializing ocrs engine...");
                engines.push(Arc::new(ocrs::OcrsEngine::new(config)?));
            }
        }

        #[cfg(feature = "engine-tesseract")]
        {
            if wanted(config, "tesseract") {
                tracing::info!("Initializing tesseract engine...");
                engines.push(Arc::new(tesseract::TesseractEngine::new(config)?));
            }
        }

        if let Some(name) = &config.engine {
            if !engines.iter().any(|e| e.name() == name) {
                return Err(OcrError::UnknownEngine(format!(
                    "{} (compiled engines: {})",
                    name,
                    compiled_engines().join(", ")
                )));
            }
        }

        let default_engine = match &config.engine {
            Some(name) => name.clone(),
            None => engines
                .first()
                .map(|e| e.name().to_string())
                .unwrap_or_default(),
        };

        Self::with_engines(engines, &default_engine)
    }

    /// Build a registry from already constructed engines
    pub fn with_engines(
        engines: Vec<Arc<dyn OcrEngine>>,
        default_engine: &str,
    ) -> Result<Self, OcrError> {
        if engines.is_empty() {
            return Err(OcrError::InitializationError(
                "No OCR engines available. Build with --features engine-ocrs or --features engine-tesseract".to_string(),
            ));
        }
        if !engines.iter().any(|e| e.name() == default_engine) {
            return Err(OcrError::UnknownEngine(default_engine.to_string()));
        }

        Ok(Self {
            engines,
            default_engine: default_engine.to_string(),
        })
    }

    /// Get an engine by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn OcrEngine>> {
        self.engines.iter().find(|e| e.name() == name).cloned()
    }

    /// Get the default engine
    pub fn default(&self) -> Option<Arc<dyn OcrEngine>> {
        self.get(&self.default_engine)
    }

    /// Get the default engine name
    pub fn default_name(&self) -> &str {
        &self.default_engine
    }

    /// List all available engine names
    pub fn list(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Get info about all available engines
    pub fn info(&self) -> Vec<EngineInfo> {
        self.engines
            .iter()
            .map(|e| EngineInfo {
                name: e.name(),
                description: e.description(),
            })
            .collect()
    }
}

/// Engines compiled into this binary
pub fn compiled_engines() -> Vec<&'static str> {
    let mut names = Vec::new();
    if cfg!(feature = "engine-ocrs") {
        names.push("ocrs");
    }
    if cfg!(feature = "engine-tesseract") {
        names.push("tesseract");
    }
    names
}

/// When the server runs, every engine is loaded so requests can pick one;
/// otherwise only the requested engine, or the first compiled one
#[cfg(any(feature = "engine-ocrs", feature = "engine-tesseract"))]
fn wanted(config: &Config, name: &str) -> bool {
    if config.load_all_engines {
        return true;
    }
    let requested = config
        .engine
        .as_deref()
        .or_else(|| compiled_engines().first().copied());
    requested == Some(name)
}
