use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use converter::{
    config::{AppConfig, RawConfig},
    gallery::{Gallery, GalleryEntry},
    job::{BatchRunner, BatchSummary, ConversionInput, ConversionResult},
    profile::resolve,
    scan, CwebpCodec, JsonSidecarStore, OutputArea,
};
use humansize::{format_size, DECIMAL};
use log::{debug, info};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

/// Convert images to WebP and manage the converted gallery
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (JSON or TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert files (directories expand to the images inside them)
    Convert(ConvertArgs),
    /// List converted images, newest first
    List {
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a converted image and its metadata
    Delete {
        path: PathBuf,
    },
    /// Create the output folder if needed and print its location
    Where,
}

#[derive(clap::Args, Debug)]
struct ConvertArgs {
    /// Image files or directories
    paths: Vec<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Also read one image from stdin, under this file name
    #[arg(long, value_name = "NAME")]
    stdin_name: Option<String>,

    /// Lossy quality, 0-100
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    quality: Option<u8>,

    /// Encode losslessly
    #[arg(long)]
    lossless: bool,

    /// Encoder effort, 0 (fast) to 6 (small)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=6))]
    effort: Option<u8>,

    /// Apply an explicit alpha plane quality (defaults to --quality)
    #[arg(long)]
    alpha_quality: bool,

    /// Alpha plane quality, 0-100; implies --alpha-quality
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    alpha_quality_level: Option<u8>,

    /// Disable sharp RGB to YUV conversion
    #[arg(long)]
    no_smart_subsample: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

impl ConvertArgs {
    /// Layer command-line flags over the configured encode options
    fn apply_to(&self, raw: &mut RawConfig) {
        if let Some(q) = self.quality {
            raw.quality = Some(f64::from(q));
        }
        if self.lossless {
            raw.compression_type = Some("lossless".to_string());
        }
        if let Some(e) = self.effort {
            raw.effort = Some(f64::from(e));
        }
        if let Some(level) = self.alpha_quality_level {
            raw.alpha_quality_level = Some(f64::from(level));
            raw.alpha_quality = Some(true);
        }
        if self.alpha_quality {
            raw.alpha_quality = Some(true);
        }
        if self.no_smart_subsample {
            raw.smart_subsampling = Some(false);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise info, or debug with --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();

    let cfg = AppConfig::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;
    debug!("Configuration: {:?}", cfg);

    match args.command {
        Commands::Convert(convert) => run_convert(&cfg, convert).await,
        Commands::List { json } => run_list(&cfg, json),
        Commands::Delete { path } => run_delete(&cfg, &path),
        Commands::Where => {
            let area = OutputArea::from_config(&cfg);
            let dir = area
                .ensure()
                .with_context(|| format!("Failed to create output folder: {}", area.output_dir().display()))?;
            println!("{}", dir.display());
            Ok(())
        }
    }
}

async fn run_convert(cfg: &AppConfig, args: ConvertArgs) -> Result<()> {
    let mut raw = cfg.encode.clone();
    args.apply_to(&mut raw);
    let profile = resolve(&raw);

    let mut inputs = scan::collect_inputs(&args.paths, args.recursive);

    if let Some(name) = &args.stdin_name {
        let mut bytes = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut bytes)
            .await
            .context("Failed to read image from stdin")?;
        info!("Read {} bytes from stdin as {}", bytes.len(), name);
        inputs.push(ConversionInput::from_buffer(name.clone(), bytes));
    }

    if inputs.is_empty() {
        bail!("Nothing to convert: pass image files, directories, or --stdin-name");
    }

    let codec = CwebpCodec::new(&cfg.cwebp_bin, &cfg.staging_dir)
        .await
        .context("cwebp is required for conversion")?;
    let area = OutputArea::from_config(cfg);
    let runner = BatchRunner::new(codec, JsonSidecarStore::for_area(&area), area);

    let results = runner.run_batch(inputs, &profile).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            println!("{}", format_result(result));
        }
        println!("{}", format_summary(&BatchSummary::from_results(&results)));
    }

    Ok(())
}

fn run_list(cfg: &AppConfig, json: bool) -> Result<()> {
    let area = OutputArea::from_config(cfg);
    let gallery = Gallery::new(area.clone(), JsonSidecarStore::for_area(&area));
    let entries = gallery.list();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No converted images in {}", area.output_dir().display());
        return Ok(());
    }

    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    Ok(())
}

fn run_delete(cfg: &AppConfig, path: &std::path::Path) -> Result<()> {
    let area = OutputArea::from_config(cfg);
    let gallery = Gallery::new(area.clone(), JsonSidecarStore::for_area(&area));
    gallery.delete_output(path)?;
    println!("Deleted {}", path.display());
    Ok(())
}

fn format_result(result: &ConversionResult) -> String {
    match (&result.output_path, &result.error_description) {
        (Some(output), _) => format!("ok    {} -> {}", result.source_name, output.display()),
        (None, Some(error)) => format!("fail  {}: {}", result.source_name, error),
        (None, None) => format!("fail  {}", result.source_name),
    }
}

fn format_summary(summary: &BatchSummary) -> String {
    let plural = |n: usize| if n == 1 { "" } else { "s" };
    if summary.failed == 0 {
        format!(
            "Successfully converted {} image{} to WebP format.",
            summary.succeeded,
            plural(summary.succeeded)
        )
    } else {
        format!(
            "Converted {} of {} image{}; {} failed.",
            summary.succeeded,
            summary.total(),
            plural(summary.total()),
            summary.failed
        )
    }
}

fn format_entry(entry: &GalleryEntry) -> String {
    let original = entry
        .original_size_bytes
        .map(|b| format_size(b, DECIMAL))
        .unwrap_or_else(|| "?".to_string());
    let savings = entry
        .savings_percent()
        .map(|p| format!("{:+.1}%", -p))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{}  {:>10} -> {:>10}  {:>7}  {}",
        entry.created_at.format("%Y-%m-%d %H:%M"),
        original,
        format_size(entry.size_bytes, DECIMAL),
        savings,
        entry.name
    )
}
