use crate::cli::{Cli, Command, OcrArgs};
use crate::preprocessing::PreprocessConfig;
use crate::rotation::ScoreStrategy;
use crate::selector::SelectionStrategy;
use std::path::PathBuf;

/// Runtime configuration shared by every entry point
#[derive(Debug, Clone)]
pub struct Config {
    /// Requested engine; `None` picks the first compiled one
    pub engine: Option<String>,
    pub language: String,
    pub tessdata_path: Option<String>,
    /// Initialize every compiled engine, not just the requested one
    pub load_all_engines: bool,
    pub preprocess: PreprocessConfig,
    pub selector: SelectionStrategy,
    pub score: ScoreStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: None,
            language: "eng".to_string(),
            tessdata_path: None,
            load_all_engines: false,
            preprocess: PreprocessConfig::default(),
            selector: SelectionStrategy::default(),
            score: ScoreStrategy::default(),
        }
    }
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        let args = &cli.ocr;
        Self {
            engine: args.engine.clone(),
            language: args.language.clone(),
            tessdata_path: args.tessdata_path.clone(),
            load_all_engines: matches!(cli.command, Command::Serve { .. }),
            preprocess: preprocess_config(args),
            selector: args.selector,
            score: args.score,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    /// Where per-upload result JSON is written
    pub results_dir: PathBuf,
}

/// Start from the preset and apply every explicitly given override
fn preprocess_config(args: &OcrArgs) -> PreprocessConfig {
    let mut config = args.preset.config();

    if let Some(dim) = args.target_max_dim {
        config.target_max_dim = dim;
    }
    if let Some(policy) = args.resize_policy {
        config.resize_policy = policy;
    }
    if let Some(denoise) = args.denoise {
        config.denoise = denoise;
    }
    if let Some(sharpen) = args.sharpen {
        config.sharpen = sharpen;
    }
    if let Some(method) = args.threshold_method {
        config.threshold.method = method;
    }
    if let Some(block_size) = args.block_size {
        config.threshold.block_size = block_size;
    }
    if let Some(offset) = args.threshold_offset {
        config.threshold.offset = offset;
    }
    if let Some(close) = args.close {
        config.close = close;
    }
    if let Some(deskew) = args.deskew {
        config.deskew = deskew;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{DenoiseStrategy, Preset};
    use clap::Parser;

    fn config(args: &[&str]) -> Config {
        let cli = Cli::try_parse_from(args).unwrap();
        Config::from(&cli)
    }

    #[test]
    fn test_defaults_match_standard_preset() {
        let config = config(&["waybill-ocr", "evaluate"]);
        assert_eq!(config.preprocess, Preset::Standard.config());
        assert_eq!(config.engine, None);
        assert_eq!(config.language, "eng");
        assert!(!config.load_all_engines);
    }

    #[test]
    fn test_overrides_apply_on_top_of_preset() {
        let config = config(&[
            "waybill-ocr",
            "--preset",
            "sharpen",
            "--block-size",
            "21",
            "--denoise",
            "median",
            "--deskew",
            "true",
            "evaluate",
        ]);
        assert!(config.preprocess.sharpen);
        assert_eq!(config.preprocess.threshold.block_size, 21);
        assert_eq!(config.preprocess.threshold.offset, 5.0);
        assert_eq!(config.preprocess.denoise, DenoiseStrategy::Median);
        assert!(config.preprocess.deskew);
        assert!(!config.preprocess.close);
    }

    #[test]
    fn test_serve_loads_every_engine() {
        let config = config(&["waybill-ocr", "serve", "--port", "0"]);
        assert!(config.load_all_engines);
    }
}
