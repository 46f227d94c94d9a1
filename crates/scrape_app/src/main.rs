mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use engine_logging::{engine_info, engine_warn};
use scrape_core::RunSummary;
use scrape_engine::{ensure_output_dir, ExtractionPipeline, HttpRenderer, Orchestrator, Renderer};

use config::{RendererKind, RunConfig, DEFAULT_CONFIG_PATH};

fn main() -> ExitCode {
    match run() {
        Ok(summary) if summary.all_succeeded() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> anyhow::Result<RunSummary> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = RunConfig::load(&config_path)?;

    engine_logging::initialize(config.log_destination(), config.log_level()?);

    let pipeline_config = Arc::new(config.pipeline_config()?);
    ensure_output_dir(&pipeline_config.output_directory)?;
    engine_info!("Output directory: {:?}", pipeline_config.output_directory);
    for title in config.duplicate_titles() {
        engine_warn!(
            "Title {:?} is used by several targets; the last one to finish wins",
            title
        );
    }

    let renderer = build_renderer(config.renderer)?;
    let orchestrator = Orchestrator::new(ExtractionPipeline::new(pipeline_config, renderer));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting tokio runtime")?;
    let report = runtime.block_on(orchestrator.run_all(config.targets(), config.max_workers));

    println!("\n{}\n", report.summary);
    Ok(report.summary)
}

fn build_renderer(kind: RendererKind) -> anyhow::Result<Arc<dyn Renderer>> {
    match kind {
        RendererKind::Http => Ok(Arc::new(HttpRenderer::default())),
        #[cfg(feature = "chrome")]
        RendererKind::Chrome => Ok(Arc::new(scrape_engine::ChromeRenderer::default())),
        #[cfg(not(feature = "chrome"))]
        RendererKind::Chrome => {
            anyhow::bail!("renderer Chrome requires building scrape_app with the `chrome` feature")
        }
    }
}
