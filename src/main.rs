use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use neclatent::plugin::Abbreviations;
use neclatent::plugins::neclatent::NecLatentInitializer;
use neclatent::{config, matcher, storage, Initializer, LatentSdk, PluginContext, Registry};

#[derive(Parser)]
#[command(name = "neclatent")]
#[command(
    version,
    about = "NEC latent and tenprint fingerprint enrollment and comparison"
)]
struct Cli {
    /// Config file (defaults to the compiled-in path)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered algorithm abbreviations
    List,
    /// Enroll fingerprint images into templates
    Enroll {
        /// Abbreviation (e.g. NECLatentELFT) or algorithm expression
        algorithm: String,
        /// Images to enroll
        #[arg(required = true)]
        images: Vec<String>,
        /// Output directory (defaults to the configured template directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare a probe template against gallery templates
    Compare {
        /// Abbreviation or expression; must match the one used to enroll
        algorithm: String,
        /// Probe template
        probe: PathBuf,
        /// Gallery templates or directories of templates (defaults to the configured template directory)
        gallery: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::List => list(),
        Commands::Enroll {
            algorithm,
            images,
            output,
        } => {
            let dir = output.unwrap_or_else(|| cfg.template_dir.clone());
            enroll(&registry(&cfg)?, &algorithm, &images, &dir)
        }
        Commands::Compare {
            algorithm,
            probe,
            gallery,
        } => {
            let gallery = if gallery.is_empty() {
                vec![cfg.template_dir.clone()]
            } else {
                gallery
            };
            compare(&registry(&cfg)?, &algorithm, &probe, &gallery)
        }
    }
}

fn registry(cfg: &config::Config) -> Result<Registry> {
    let mut registry = Registry::with_builtins(PluginContext::new(vendor_sdk()?, cfg));
    registry.initialize();
    Ok(registry)
}

#[cfg(feature = "nec-sdk")]
fn vendor_sdk() -> Result<Arc<dyn LatentSdk>> {
    Ok(Arc::new(neclatent_sdk::NecLatentSdk::new()))
}

#[cfg(not(feature = "nec-sdk"))]
fn vendor_sdk() -> Result<Arc<dyn LatentSdk>> {
    anyhow::bail!("built without the NEC Latent SDK; rebuild with --features nec-sdk")
}

fn list() -> Result<()> {
    let mut abbreviations = Abbreviations::new();
    NecLatentInitializer.initialize(&mut abbreviations);
    for (name, expression) in &abbreviations {
        println!("{:<18} {}", name, expression);
    }
    Ok(())
}

fn enroll(registry: &Registry, algorithm: &str, images: &[String], dir: &Path) -> Result<()> {
    let pipeline = registry
        .pipeline(algorithm)
        .with_context(|| format!("resolving algorithm {}", algorithm))?;

    let mut failed = 0;
    for image in images {
        let template = pipeline.enroll_file(image);
        if template.failed_to_extract() {
            warn!("Failed to extract {}", image);
            failed += 1;
        }
        let path = storage::template_path(dir, image);
        storage::save_template(&path, &template).context("Failed to save template")?;
        info!("{} -> {} ({} bytes)", image, path.display(), template.m.data.len());
    }

    info!("Enrolled {} image(s), {} failed to extract", images.len(), failed);
    Ok(())
}

fn compare(
    registry: &Registry,
    algorithm: &str,
    probe: &Path,
    gallery: &[PathBuf],
) -> Result<()> {
    let pipeline = registry
        .pipeline(algorithm)
        .with_context(|| format!("resolving algorithm {}", algorithm))?;
    let distance = pipeline
        .distance()
        .with_context(|| format!("algorithm {} has no distance", algorithm))?;

    let probe = storage::load_template(probe).context("Failed to load probe template")?;

    let mut targets = Vec::new();
    for path in gallery {
        if path.is_dir() {
            targets.extend(storage::load_gallery(path)?);
        } else {
            targets.push(storage::load_template(path)?);
        }
    }

    if targets.is_empty() {
        anyhow::bail!("No gallery templates found. Run 'enroll' first.");
    }

    info!("Comparing {} against {} template(s)", probe.file.name, targets.len());
    for (target, score) in matcher::rank(distance.as_ref(), &targets, &probe) {
        println!("{}\t{}", score, target.file.name);
    }
    Ok(())
}
