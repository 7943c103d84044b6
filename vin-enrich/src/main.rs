//! VIN Enrichment (vin-enrich) - Main entry point
//!
//! Runs one pipeline stage per invocation so an external scheduler can
//! sequence them with artifacts in between, or all three with `run`.
//! Exit status 0 means the stage succeeded; anything else is a failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vin_common::config::load_toml_config;
use vin_enrich::config::{ConfigOverrides, EnrichConfig};
use vin_enrich::services::{RegistryClient, TokioClock};
use vin_enrich::types::VehicleReport;
use vin_enrich::validators::validate;
use vin_enrich::workflow::artifacts::{
    append_stage_outputs, load_basic, load_enhanced, save_basic, save_enhanced, save_report,
    stage_outputs,
};
use vin_enrich::workflow::{cancel_after, Pipeline, BASIC_DATA_FILE, ENHANCED_DATA_FILE};
use vin_enrich::PipelineError;

/// Command-line arguments for vin-enrich
#[derive(Parser, Debug)]
#[command(name = "vin-enrich")]
#[command(about = "Enrich a VIN into a consolidated vehicle report using NHTSA vPIC")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/vin-enrich/config.toml)
    #[arg(long, global = true, env = "VIN_ENRICH_CONFIG")]
    config: Option<PathBuf>,

    /// Registry base URL (overrides NHTSA_API_BASE and config)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Directory receiving the final report
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Wall-clock budget per stage in seconds (0 disables)
    #[arg(long, global = true)]
    stage_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stage 1: validate and decode a VIN
    Decode {
        /// Vehicle Identification Number
        vin: String,

        /// Basic data artifact to write
        #[arg(long, default_value = BASIC_DATA_FILE)]
        output: PathBuf,

        /// Scheduler outputs file to append key=value lines to
        #[arg(long, env = "GITHUB_OUTPUT")]
        outputs_file: Option<PathBuf>,
    },

    /// Stage 2: collect enhancement data for a decoded VIN
    Enhance {
        /// Basic data artifact from the decode stage
        #[arg(long, default_value = BASIC_DATA_FILE)]
        basic_data: PathBuf,

        /// Enhanced data artifact to write
        #[arg(long, default_value = ENHANCED_DATA_FILE)]
        output: PathBuf,
    },

    /// Stage 3: score and consolidate into the final report
    Finalize {
        /// Expected VIN; both artifacts must belong to it
        #[arg(long)]
        vin: Option<String>,

        #[arg(long, default_value = BASIC_DATA_FILE)]
        basic_data: PathBuf,

        #[arg(long, default_value = ENHANCED_DATA_FILE)]
        enhanced_data: PathBuf,
    },

    /// All three stages in one process
    Run {
        /// Vehicle Identification Number
        vin: String,

        /// Also write the intermediate artifacts to the output directory
        #[arg(long)]
        keep_artifacts: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing starts so its log level can apply
    let loaded = load_toml_config(args.config.as_deref())?;
    let toml_config = &loaded.config;

    let overrides = ConfigOverrides {
        api_base: args.api_base.clone(),
        output_dir: args.output_dir.clone(),
        stage_timeout_secs: args.stage_timeout_secs,
        log_level: args.log_level.clone(),
    };

    init_tracing(overrides.log_level.as_deref().unwrap_or(&toml_config.logging.level));

    info!("Starting vin-enrich v{}", env!("CARGO_PKG_VERSION"));
    loaded.log_source();

    let config = EnrichConfig::resolve(toml_config, &overrides)
        .context("Failed to resolve configuration")?;

    let client = RegistryClient::production(&config.api_base, config.call_spacing)
        .context("Failed to create registry client")?
        .with_retry_policy(config.retry_policy())
        .with_request_timeout(config.request_timeout);
    let pipeline = Pipeline::new(
        Arc::new(client),
        Arc::new(TokioClock),
        config.pipeline_config(),
    );
    let cancel = cancel_after(config.stage_timeout);

    match args.command {
        Command::Decode {
            vin,
            output,
            outputs_file,
        } => {
            let basic = pipeline.decode_stage(vin.trim(), &cancel).await?;
            save_basic(&basic, &output).context("Failed to write basic data")?;

            if let Some(path) = outputs_file {
                append_stage_outputs(&path, &stage_outputs(&basic))
                    .context("Failed to write scheduler outputs")?;
            }

            println!("VIN {} decoded successfully", basic.vin);
            println!("Results saved to {}", output.display());
        }

        Command::Enhance { basic_data, output } => {
            let basic = load_basic(&basic_data).context("Failed to read basic data")?;
            let enhanced = pipeline.enhance_stage(&basic, &cancel).await;
            save_enhanced(&enhanced, &output).context("Failed to write enhanced data")?;

            println!(
                "Enhanced with {}/{} API endpoints",
                enhanced.enhanced_data.success_count(),
                enhanced.enhanced_data.len()
            );
            println!("Results saved to {}", output.display());
        }

        Command::Finalize {
            vin,
            basic_data,
            enhanced_data,
        } => {
            let basic = load_basic(&basic_data).context("Failed to read basic data")?;
            let enhanced = load_enhanced(&enhanced_data).context("Failed to read enhanced data")?;

            if let Some(expected) = vin {
                let expected = validate(expected.trim())?;
                if expected != basic.vin {
                    return Err(PipelineError::ArtifactMismatch(format!(
                        "expected VIN {} but basic data is for {}",
                        expected, basic.vin
                    ))
                    .into());
                }
            }

            let report = pipeline.finalize_stage(&basic, &enhanced)?;
            write_report(&report, &config.output_dir)?;
        }

        Command::Run {
            vin,
            keep_artifacts,
        } => {
            let outcome = pipeline.run(vin.trim(), &cancel).await?;

            if keep_artifacts {
                save_basic(&outcome.basic, &config.output_dir.join(BASIC_DATA_FILE))
                    .context("Failed to write basic data")?;
                save_enhanced(&outcome.enhanced, &config.output_dir.join(ENHANCED_DATA_FILE))
                    .context("Failed to write enhanced data")?;
            }

            write_report(&outcome.report, &config.output_dir)?;
        }
    }

    cancel.cancel();
    Ok(())
}

/// Initialize tracing; RUST_LOG wins over the configured level
fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("vin_enrich={},vin_common={}", level, level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn write_report(report: &VehicleReport, output_dir: &Path) -> Result<()> {
    let path = save_report(report, output_dir).context("Failed to write final report")?;
    let summary = &report.vehicle_summary;
    let processing = &report.processing_information;

    println!(
        "Vehicle: {} {} {}",
        summary.model_year.as_deref().unwrap_or("Unknown"),
        summary.make.as_deref().unwrap_or("Unknown"),
        summary.model.as_deref().unwrap_or("Unknown")
    );
    println!(
        "Data quality score: {:.1}/100",
        processing.data_quality_score.overall
    );
    println!("API success rate: {}", processing.api_success_rate);
    println!("Final report saved to {}", path.display());
    Ok(())
}
