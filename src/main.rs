use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;
use wardrobe_intake::api::HttpBatchApi;
use wardrobe_intake::config::{self, IntakeConfig};
use wardrobe_intake::imaging::{
    CompressSettings, Normalizer, RustBackend, compress_all, get_dimensions, normalize,
};
use wardrobe_intake::output;
use wardrobe_intake::queue::{PendingSelection, StagingQueue};
use wardrobe_intake::submit::Submitter;
use wardrobe_intake::types::{SourceFile, WarmthTag, file_extension};
use wardrobe_intake::validate::{ALLOWED_EXTENSIONS, RawSelection, ValidationError, Validator};

#[derive(Parser)]
#[command(name = "wardrobe-intake")]
#[command(about = "Stage clothing photos and upload them to the wardrobe backend")]
#[command(long_about = "\
Stage clothing photos and upload them to the wardrobe backend

Photos are grouped by how warm the garment is. Each group is resized to fit
the configured box (800x800 by default), re-encoded as JPEG and uploaded in a
single request. HEIC/HEIF photos are converted to JPEG first when possible.

  wardrobe-intake upload --thin shirts/ --thick coat.jpg --user 3f1c
  wardrobe-intake check ~/Pictures/closet
  wardrobe-intake gen-config > intake.toml

Directories are walked for .jpg, .jpeg, .png, .webp, .heic and .heif files.
Set RUST_LOG=wardrobe_intake=debug for diagnostics.")]
#[command(version)]
struct Cli {
    /// Config file (optional; stock defaults when missing)
    #[arg(long, default_value = "intake.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate, stage and upload photos
    Upload {
        /// Photos or directories of thin garments
        #[arg(long = "thin", value_name = "PATH")]
        thin: Vec<PathBuf>,
        /// Photos or directories of moderately warm garments
        #[arg(long = "moderate", value_name = "PATH")]
        moderate: Vec<PathBuf>,
        /// Photos or directories of thick garments
        #[arg(long = "thick", value_name = "PATH")]
        thick: Vec<PathBuf>,
        /// Session identifier (overrides config and INTAKE_USER_ID)
        #[arg(long)]
        user: Option<String>,
    },
    /// Validate and compress photos locally without uploading
    Check {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,
    },
    /// Print a stock intake.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Upload {
            thin,
            moderate,
            thick,
            user,
        } => {
            let config = load_config(&cli.config)?;
            init_thread_pool(&config.processing);
            let groups = [
                (WarmthTag::Thin, thin),
                (WarmthTag::Moderate, moderate),
                (WarmthTag::Thick, thick),
            ];
            upload(&config, groups, user).await?;
        }
        Command::Check { paths } => {
            let config = load_config(&cli.config)?;
            init_thread_pool(&config.processing);
            check(&config, &paths)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<IntakeConfig, config::ConfigError> {
    let mut config = config::load_config(path)?;
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. Users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Expand files and directories into selections. Directories contribute only
/// files with an accepted image extension; explicit files are always passed
/// on so validation can report them.
fn collect_selections(paths: &[PathBuf]) -> std::io::Result<Vec<RawSelection>> {
    let mut selections = Vec::new();
    for path in paths {
        if !path.is_dir() {
            selections.push(RawSelection::from_path(path)?);
            continue;
        }
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
        {
            let name = entry.file_name().to_string_lossy();
            let is_image = file_extension(&name)
                .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));
            if is_image {
                selections.push(RawSelection::from_path(entry.path())?);
            }
        }
    }
    Ok(selections)
}

/// Validate and read a set of paths. Returns loaded files and rejections.
fn intake(
    validator: &Validator,
    paths: &[PathBuf],
) -> std::io::Result<(Vec<SourceFile>, Vec<(RawSelection, ValidationError)>)> {
    let (accepted, rejected) = validator.partition(collect_selections(paths)?);
    let files = accepted
        .into_iter()
        .map(RawSelection::load)
        .collect::<std::io::Result<Vec<_>>>()?;
    Ok((files, rejected))
}

async fn upload(
    config: &IntakeConfig,
    groups: [(WarmthTag, Vec<PathBuf>); 3],
    user: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let validator = Validator::from_config(&config.limits);
    let mut queue = StagingQueue::from_config(&config.limits);
    let mut rejected = Vec::new();

    for (tag, paths) in groups {
        if paths.is_empty() {
            continue;
        }
        let (files, mut skipped) = intake(&validator, &paths)?;
        rejected.append(&mut skipped);
        let mut pending = PendingSelection::from_files(files);
        if let Err(e) = queue.confirm(&mut pending, tag) {
            output::print_rejections(&rejected);
            return Err(format!(
                "cannot stage {} {} photos: {} ({} already staged)",
                pending.len(),
                tag,
                e,
                queue.len()
            )
            .into());
        }
    }

    output::print_rejections(&rejected);
    if queue.is_empty() {
        println!("Nothing to upload");
        return Ok(());
    }
    output::print_queue(&queue);

    let user_id = user
        .or_else(|| config.backend.user_id.clone())
        .unwrap_or_default();
    let api = HttpBatchApi::from_config(&config.backend)?;
    tracing::debug!(url = api.url(), "backend");

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_submit_event(&event) {
                println!("{}", line);
            }
        }
    });

    let submitter = Submitter::new(Arc::new(RustBackend::new()), api, user_id)
        .configured(config)
        .with_sink(tx);
    let outcome = submitter.submit(&mut queue).await;
    // Dropping the submitter closes the channel so the printer can finish.
    drop(submitter);
    printer.join().map_err(|_| "output thread panicked")?;

    let result = outcome?;
    output::print_summary(&result);
    if result.total_success == 0 && result.total_fail > 0 {
        return Err("no photos were uploaded".into());
    }
    Ok(())
}

fn check(config: &IntakeConfig, paths: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    let validator = Validator::from_config(&config.limits);
    let (files, rejected) = intake(&validator, paths)?;
    output::print_rejections(&rejected);

    let backend = RustBackend::new();
    let normalizer = Normalizer::from_config(&config.normalize);
    let settings = CompressSettings::from_config(&config.images);

    let originals: Vec<(String, usize)> =
        files.iter().map(|f| (f.name.clone(), f.len())).collect();
    let normalized: Vec<SourceFile> = files
        .into_par_iter()
        .map(|file| normalize(&backend, &normalizer, file))
        .collect();
    let dims: Vec<_> = normalized
        .par_iter()
        .map(|file| get_dimensions(&backend, &file.bytes).ok())
        .collect();
    let results: Vec<_> = compress_all(&backend, &normalized, &settings)
        .into_iter()
        .zip(originals)
        .zip(dims)
        .map(|((result, (name, original_size)), dims)| {
            let result = result.map(|mut img| {
                img.original_size = original_size;
                img
            });
            (name, dims, result)
        })
        .collect();

    let mut failed = 0;
    for (name, dims, result) in &results {
        if result.is_err() {
            failed += 1;
        }
        output::print_check_result(name, *dims, result);
    }
    println!(
        "Checked {} files: {} ok, {} failed",
        results.len(),
        results.len() - failed,
        failed
    );
    Ok(())
}
