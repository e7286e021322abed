use crate::config::{Config, ServerConfig};
use crate::engine::TextRegion;
use crate::engines::{EngineInfo, EngineRegistry};
use crate::error::OcrError;
use crate::extract::{self, Extractor};
use crate::loader;
use crate::preprocessing::PreprocessConfig;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and the other form fields on top of the file
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    extractors: Arc<HashMap<&'static str, Arc<Extractor>>>,
    engines: Arc<Vec<EngineInfo>>,
    default_engine: String,
    config: Arc<Config>,
    server: Arc<ServerConfig>,
}

impl AppState {
    /// One extractor per registered engine, all sharing the same settings
    pub fn new(
        registry: &EngineRegistry,
        config: Config,
        server: ServerConfig,
    ) -> Result<Self, OcrError> {
        let mut extractors = HashMap::new();
        for name in registry.list() {
            if let Some(engine) = registry.get(name) {
                let extractor = Extractor::new(engine.clone(), &config)?;
                extractors.insert(engine.name(), Arc::new(extractor));
            }
        }

        Ok(Self {
            extractors: Arc::new(extractors),
            engines: Arc::new(registry.info()),
            default_engine: registry.default_name().to_string(),
            config: Arc::new(config),
            server: Arc::new(server),
        })
    }

    fn extractor(&self, engine: Option<&str>) -> Result<Arc<Extractor>, OcrError> {
        let name = engine.unwrap_or(&self.default_engine);
        self.extractors
            .get(name)
            .cloned()
            .ok_or_else(|| OcrError::UnknownEngine(name.to_string()))
    }
}

/// Extraction response
#[derive(Serialize)]
pub struct ExtractResponse {
    pub target_line: Option<String>,
    pub raw_text: String,
    pub rotation_used: u16,
    pub skew_angle: f32,
    pub ocr_avg_confidence: f32,
    /// Recognized tokens containing a `1` or an `_`
    pub highlights: Vec<TextRegion>,
    pub engine: String,
    pub processing_time_ms: u64,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub default_engine: String,
    pub engines: Vec<EngineInfo>,
    pub supported_formats: Vec<String>,
    pub max_file_size_bytes: usize,
    pub preprocessing: PreprocessConfig,
    pub selector: String,
    pub score: String,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.server.max_file_size + MULTIPART_OVERHEAD;

    Router::new()
        .route("/extract", post(handle_extract))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    registry: &EngineRegistry,
    config: Config,
    server: ServerConfig,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", server.host, server.port);
    let state = AppState::new(registry, config, server)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Handle extraction requests
async fn handle_extract(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, OcrError> {
    let start = Instant::now();
    let max = state.server.max_file_size;

    let mut file_data: Option<Bytes> = None;
    let mut file_name: Option<String> = None;
    let mut engine: Option<String> = None;

    // Parse multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_data = Some(field.bytes().await.map_err(|e| multipart_error(e, max))?);
            }
            "engine" => {
                let value = field.text().await.map_err(|e| multipart_error(e, max))?;
                let value = value.trim();
                if !value.is_empty() {
                    engine = Some(value.to_string());
                }
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let data = file_data.ok_or(OcrError::MissingFile)?;
    if data.is_empty() {
        return Err(OcrError::MissingFile);
    }
    if data.len() > max {
        return Err(OcrError::ImageTooLarge {
            size: data.len(),
            max,
        });
    }

    if let Some(name) = &file_name {
        let path = Path::new(name);
        if path.extension().is_some() && !loader::is_supported_image(path) {
            return Err(OcrError::UnsupportedFormat(name.clone()));
        }
    }

    let extractor = state.extractor(engine.as_deref())?;
    let engine_name = extractor.engine_name().to_string();

    // Recognition is CPU bound
    let extraction = tokio::task::spawn_blocking(move || {
        let image = loader::load_image_from_memory(&data)?;
        extractor.run(&image)
    })
    .await
    .map_err(|e| OcrError::Internal(format!("Extraction task failed: {}", e)))??;

    if let Some(basename) = file_name.as_deref().and_then(upload_basename) {
        let dir = &state.server.results_dir;
        std::fs::create_dir_all(dir)?;
        let path = extract::write_result(dir, &basename, &extraction.result())?;
        tracing::debug!("Saved result to {:?}", path);
    }

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        "Extraction completed in {}ms with {} (rotation {}, target {:?})",
        processing_time_ms,
        engine_name,
        extraction.rotation_used(),
        extraction.target_line
    );

    Ok(Json(ExtractResponse {
        highlights: extraction.highlights().into_iter().cloned().collect(),
        rotation_used: extraction.rotation_used(),
        skew_angle: extraction.skew_angle,
        ocr_avg_confidence: extraction.avg_confidence(),
        target_line: extraction.target_line,
        raw_text: extraction.raw_text,
        engine: engine_name,
        processing_time_ms,
    }))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        default_engine: state.default_engine.clone(),
        engines: state.engines.as_ref().clone(),
        supported_formats: loader::SUPPORTED_EXTENSIONS
            .iter()
            .map(|ext| ext.to_string())
            .collect(),
        max_file_size_bytes: state.server.max_file_size,
        preprocessing: state.config.preprocess.clone(),
        selector: state.config.selector.as_str().to_string(),
        score: state.config.score.as_str().to_string(),
    })
}

fn multipart_error(e: MultipartError, max: usize) -> OcrError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        OcrError::UploadTooLarge { max }
    } else {
        OcrError::InvalidRequest(format!("Failed to parse multipart: {}", e))
    }
}

/// Stem of the uploaded filename with any directories dropped
fn upload_basename(name: &str) -> Option<String> {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_basename() {
        assert_eq!(
            upload_basename("163233702292313922_1_.jpg").as_deref(),
            Some("163233702292313922_1_")
        );
        assert_eq!(upload_basename("../../etc/scan.png").as_deref(), Some("scan"));
        assert_eq!(upload_basename(""), None);
    }
}
