//! stepglb CLI - convert STEP files to GLB through a background worker

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use stepglb_engine::{init_logging, StepToGlbLoader};
use stepglb_worker::{ModuleSource, WorkerConfig, WorkerEvent, WorkerHandle};

#[derive(Parser)]
#[command(name = "stepglb")]
#[command(about = "Convert STEP models to binary glTF", long_about = None)]
struct Cli {
    /// Worker config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Engine manifest to load instead of the built-in engine
    #[arg(long, global = true)]
    module: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one STEP file
    Convert {
        /// Input STEP file (.step or .stp)
        input: PathBuf,
        /// Output GLB file (default: input with a .glb extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert several STEP files through one worker
    Batch {
        /// Input STEP files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Directory for the GLB files
        #[arg(long)]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(Some(log_filter(cli.verbose)));

    let config = worker_config(cli.config.as_deref(), cli.module)?;
    let loader = StepToGlbLoader::new(config.module.clone());
    let mut worker = WorkerHandle::spawn(loader, &config)?;
    worker.ready().await.context("conversion engine failed to start")?;

    let outcome = match cli.command {
        Commands::Convert { input, output } => {
            let output = output.unwrap_or_else(|| input.with_extension("glb"));
            convert(&mut worker, &input, &output).await
        }
        Commands::Batch { inputs, out_dir } => batch(&mut worker, &inputs, &out_dir).await,
    };

    let stats = worker.shutdown().await?;
    tracing::debug!(
        received = stats.received,
        replied = stats.replied,
        faulted = stats.faulted,
        "worker finished"
    );
    outcome
}

fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Config file (or defaults), then `STEPGLB_MODULE`, then `--module`.
fn worker_config(path: Option<&Path>, module: Option<PathBuf>) -> Result<WorkerConfig> {
    let mut config = match path {
        Some(path) => WorkerConfig::from_file(path)?,
        None => WorkerConfig::default(),
    }
    .with_env_overrides();
    if let Some(module) = module {
        config.module = ModuleSource::Manifest(module);
    }
    Ok(config)
}

async fn convert(worker: &mut WorkerHandle, input: &Path, output: &Path) -> Result<()> {
    let step = tokio::fs::read(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;
    worker.post(step).await?;

    let event = next_event(worker).await?;
    let glb = event
        .into_result()
        .with_context(|| format!("failed to convert {}", input.display()))?;
    tokio::fs::write(output, glb.as_bytes())
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("{} -> {} ({} bytes)", input.display(), output.display(), glb.as_bytes().len());
    Ok(())
}

/// Post every input, then collect replies in the same order.
async fn batch(worker: &mut WorkerHandle, inputs: &[PathBuf], out_dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut outputs = Vec::with_capacity(inputs.len());
    let mut failed = 0usize;
    for input in inputs {
        match tokio::fs::read(input).await {
            Ok(step) => {
                worker.post(step).await?;
                outputs.push(Some(output_path(input, out_dir)));
            }
            Err(err) => {
                eprintln!("{}: {err}", input.display());
                outputs.push(None);
                failed += 1;
            }
        }
    }

    for (input, output) in inputs.iter().zip(outputs) {
        let Some(output) = output else { continue };
        match next_event(worker).await?.into_result() {
            Ok(glb) => {
                tokio::fs::write(&output, glb.as_bytes())
                    .await
                    .with_context(|| format!("failed to write {}", output.display()))?;
                println!("{} -> {}", input.display(), output.display());
            }
            Err(fault) => {
                eprintln!("{}: {}", input.display(), fault.source);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} files failed", inputs.len());
    }
    Ok(())
}

async fn next_event(worker: &mut WorkerHandle) -> Result<WorkerEvent> {
    match worker.next_event().await {
        Some(event) => Ok(event),
        None => bail!("conversion worker exited unexpectedly"),
    }
}

fn output_path(input: &Path, out_dir: &Path) -> PathBuf {
    let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_os_string();
    name.push(".glb");
    out_dir.join(name)
}
