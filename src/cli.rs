use crate::preprocessing::{DenoiseStrategy, Preset, ResizePolicy, ThresholdMethod};
use crate::rotation::ScoreStrategy;
use crate::selector::SelectionStrategy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "waybill-ocr")]
#[command(about = "Extracts the `_1_` waybill ID line from photographed waybills")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub ocr: OcrArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct OcrArgs {
    /// OCR engine to use (defaults to the first compiled engine)
    #[arg(long, env = "WAYBILL_ENGINE", global = true)]
    pub engine: Option<String>,

    /// Recognition language for Tesseract (e.g. "eng")
    #[arg(long, env = "WAYBILL_LANGUAGE", default_value = "eng", global = true)]
    pub language: String,

    /// Path to tessdata directory (downloads trained data if not set)
    #[arg(long, env = "TESSDATA_PREFIX", global = true)]
    pub tessdata_path: Option<String>,

    /// Preprocessing preset; the options below override single fields
    #[arg(long, env = "WAYBILL_PRESET", value_enum, default_value_t = Preset::Standard, global = true)]
    pub preset: Preset,

    /// Size of the larger image dimension after resizing
    #[arg(long, global = true)]
    pub target_max_dim: Option<u32>,

    #[arg(long, value_enum, global = true)]
    pub resize_policy: Option<ResizePolicy>,

    #[arg(long, value_enum, global = true)]
    pub denoise: Option<DenoiseStrategy>,

    /// Apply a Laplacian sharpening kernel before thresholding
    #[arg(long, value_name = "BOOL", global = true)]
    pub sharpen: Option<bool>,

    #[arg(long, value_enum, global = true)]
    pub threshold_method: Option<ThresholdMethod>,

    /// Adaptive threshold neighbourhood size (odd, at least 3)
    #[arg(long, global = true)]
    pub block_size: Option<u32>,

    /// Constant subtracted from the local mean before thresholding
    #[arg(long, allow_negative_numbers = true, global = true)]
    pub threshold_offset: Option<f32>,

    /// Morphological closing after thresholding
    #[arg(long, value_name = "BOOL", global = true)]
    pub close: Option<bool>,

    #[arg(long, value_name = "BOOL", global = true)]
    pub deskew: Option<bool>,

    /// Line selection heuristic
    #[arg(long, env = "WAYBILL_SELECTOR", value_enum, default_value_t = SelectionStrategy::Tiered, global = true)]
    pub selector: SelectionStrategy,

    /// How rotation candidates are scored
    #[arg(long, env = "WAYBILL_SCORE", value_enum, default_value_t = ScoreStrategy::Confidence, global = true)]
    pub score: ScoreStrategy,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the extraction over a labeled sample directory and report accuracy
    Evaluate {
        /// Directory of sample images named after their expected line
        #[arg(long, env = "WAYBILL_SAMPLES_DIR", default_value = "samples")]
        samples_dir: PathBuf,

        /// Where the JSON reports are written
        #[arg(long, env = "WAYBILL_RESULTS_DIR", default_value = "results")]
        results_dir: PathBuf,

        /// Also score every selector strategy on the same OCR output
        #[arg(long)]
        compare_selectors: bool,
    },

    /// Extract the target line from a single image
    Extract {
        image: PathBuf,

        /// Where the result JSON and images are written
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Serve extraction over HTTP
    Serve {
        /// Host address to bind to
        #[arg(long, env = "WAYBILL_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, env = "WAYBILL_PORT", default_value = "9292")]
        port: u16,

        /// Maximum upload size in bytes (default: 20MB)
        #[arg(long, env = "WAYBILL_MAX_FILE_SIZE", default_value = "20971520")]
        max_file_size: usize,

        /// Where per-upload result JSON is written
        #[arg(long, env = "WAYBILL_RESULTS_DIR", default_value = "results")]
        results_dir: PathBuf,
    },
}
