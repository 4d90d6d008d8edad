use clap::{Parser, Subcommand};
use log::info;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use plantscan::{
    Config, FileImageLoader, Pipeline, RawDetection, ReplayDetector, Report, build_detections,
};

#[derive(Parser)]
#[command(name = "plantscan")]
#[command(about = "Detect findings in plant images and draw them by severity")]
struct Cli {
    /// TOML configuration file (defaults to $PLANTSCAN_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run detection on an image and print the detections as JSON
    Detect {
        /// Recorded detector output to replay (JSON array of raw detections)
        #[arg(long, value_name = "FILE")]
        model: PathBuf,

        /// Path to input image file
        #[arg(long, value_name = "IMAGE")]
        image: PathBuf,

        /// Confidence threshold, overrides the configured one
        #[arg(long)]
        conf: Option<f64>,

        /// Also save an annotated copy of the image here
        #[arg(long, value_name = "OUT")]
        visualize: Option<PathBuf>,
    },

    /// Draw detections onto an image
    Visualize {
        /// Path to input image file
        #[arg(long, value_name = "IMAGE")]
        image: PathBuf,

        /// JSON array of detections, each with bbox, confidence and an optional label/disease
        #[arg(long, value_name = "JSON")]
        detections: String,

        /// Path of the annotated output image
        #[arg(long, value_name = "OUT")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the JSON result
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = Report::from_anyhow(&e).write_to(io::stdout().lock());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Detect {
            model,
            image,
            conf,
            visualize,
        } => {
            let threshold = conf.unwrap_or(config.confidence_threshold);
            let mut pipeline =
                Pipeline::new(config.renderer()).with_confidence_threshold(threshold)?;
            if let Some(output) = visualize {
                pipeline = pipeline.with_visualization(output)?;
            }

            let output =
                pipeline.run(|| ReplayDetector::open(&model), &FileImageLoader::new(image))?;

            let classifier = pipeline.context().renderer.classifier();
            if let Some(tier) = classifier.highest(&output.detections) {
                info!("highest severity: {}", tier);
            }
            if let Some(path) = &output.rendered {
                info!("annotated image: {}", path.display());
            }

            Report::detections(&output.detections).write_to(io::stdout().lock())?;
        }
        Command::Visualize {
            image,
            detections,
            output,
        } => {
            let raw: Vec<RawDetection> =
                serde_json::from_str(&detections).context("invalid detections JSON")?;
            let detections = build_detections(raw);

            config
                .renderer()
                .render_file(&image, &detections, &output)?;
            info!("drew {} detections onto {}", detections.len(), output.display());
        }
    }

    Ok(())
}
