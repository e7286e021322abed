use anyhow::Context;
use clap::Parser;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waybill_ocr::cli::{Cli, Command};
use waybill_ocr::config::{Config, ServerConfig};
use waybill_ocr::engines::EngineRegistry;
use waybill_ocr::extract::Extractor;
use waybill_ocr::{evaluate, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from(&cli);

    tracing::info!("Starting waybill-ocr v{}", env!("CARGO_PKG_VERSION"));

    let registry = EngineRegistry::new(&config).context("Failed to initialize OCR engines")?;
    tracing::info!(
        "Engines: {} (default: {})",
        registry.list().join(", "),
        registry.default_name()
    );

    match cli.command {
        Command::Evaluate {
            samples_dir,
            results_dir,
            compare_selectors,
        } => {
            let extractor = default_extractor(&registry, &config)?;
            let report = evaluate::run(&extractor, &samples_dir, compare_selectors)
                .with_context(|| format!("Failed to evaluate {}", samples_dir.display()))?;
            evaluate::write_report(&report, &results_dir)?;
        }
        Command::Extract { image, output_dir } => {
            let extractor = default_extractor(&registry, &config)?;
            extract_one(&extractor, &image, &output_dir)?;
        }
        Command::Serve {
            host,
            port,
            max_file_size,
            results_dir,
        } => {
            tracing::info!("Binding to {}:{}", host, port);
            let server_config = ServerConfig {
                host,
                port,
                max_file_size,
                results_dir,
            };
            server::run(&registry, config, server_config).await?;
        }
    }

    Ok(())
}

fn default_extractor(registry: &EngineRegistry, config: &Config) -> anyhow::Result<Extractor> {
    let engine = registry
        .default()
        .context("Default OCR engine is not registered")?;
    Ok(Extractor::new(engine, config)?)
}

fn extract_one(extractor: &Extractor, image: &Path, output_dir: &Path) -> anyhow::Result<()> {
    let extraction = extractor
        .process_file(image)
        .with_context(|| format!("Failed to process {}", image.display()))?;

    let basename = image
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let artifacts = extraction.save_artifacts(output_dir, &basename)?;

    tracing::info!(
        "Rotation {} deg, skew {:.2} deg, avg confidence {:.2}",
        extraction.rotation_used(),
        extraction.skew_angle,
        extraction.avg_confidence()
    );
    tracing::info!(
        "Saved {:?}, {:?}, {:?}",
        artifacts.result,
        artifacts.preprocessed,
        artifacts.annotated
    );

    match &extraction.target_line {
        Some(line) => println!("{}", line),
        None => println!("No target line found"),
    }

    Ok(())
}
