//! strapfit: command-line front end for the strap preview engine.
//!
//! Detects dials, cleans dial photos, composites strap previews and
//! stacks part images, writing PNG output. Useful for tuning engine
//! parameters against real photos without a UI.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin strapfit -- detect watch.jpg
//! cargo run --release --bin strapfit -- compose watch.jpg --top a.png --bottom b.png
//! cargo run --release --bin strapfit -- compose watch.jpg --variant leather-brown --assets public
//! ```
//!
//! Verbosity follows `RUST_LOG` (default `info`).

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use strapfit_engine::catalog::tint_preset;
use strapfit_engine::raster::load_path;
use strapfit_engine::segment::MaskStrategy;
use strapfit_engine::{
    CleanupMode, EngineConfig, PixelBuffer, Rgb, Session, SessionConfig, StrapCatalog, Tint,
    detect_dial, enhanced_clean, segment, stack_parts,
};

/// Watch strap preview tools.
#[derive(Parser)]
#[command(name = "strapfit", version)]
struct Cli {
    /// Full `EngineConfig` as JSON. Omitted fields keep their defaults.
    #[arg(long, global = true, value_name = "JSON")]
    config_json: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find the dial in a photo and print its position.
    Detect {
        /// Dial photo (PNG, JPEG, BMP, WebP).
        image: PathBuf,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Remove the background around a dial and crop to it.
    Clean {
        /// Dial photo.
        image: PathBuf,

        /// Output PNG path.
        #[arg(short, long)]
        output: PathBuf,

        /// Cleanup method.
        #[arg(long, value_enum, default_value_t = Cleanup::Simple)]
        cleanup: Cleanup,
    },

    /// Composite two strap parts onto a dial photo.
    Compose(ComposeArgs),

    /// Combine the two part images into one, top above bottom.
    Stack {
        /// Top part image.
        top: PathBuf,

        /// Bottom part image.
        bottom: PathBuf,

        /// Output PNG path.
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(clap::Args)]
struct ComposeArgs {
    /// Dial photo.
    dial: PathBuf,

    /// Output PNG path.
    #[arg(short, long, default_value = strapfit_export::DEFAULT_FILENAME)]
    output: PathBuf,

    /// Top part image. Requires --bottom; overrides --variant.
    #[arg(long, requires = "bottom")]
    top: Option<PathBuf>,

    /// Bottom part image. Requires --top.
    #[arg(long, requires = "top")]
    bottom: Option<PathBuf>,

    /// Catalog variant id to draw.
    #[arg(long, conflicts_with = "top")]
    variant: Option<String>,

    /// Catalog JSON file. Defaults to the built-in sample catalog.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Directory that catalog image paths are relative to.
    #[arg(long, default_value = "assets")]
    assets: PathBuf,

    /// Cleanup applied to the dial photo.
    #[arg(long, value_enum, default_value_t = Cleanup::Simple)]
    cleanup: Cleanup,

    /// Tint: a preset name (e.g. "Brown Leather") or a hex colour.
    #[arg(long)]
    tint: Option<String>,

    /// Tint strength (0-1). Defaults to the preset's, or 0.3 for a colour.
    #[arg(long)]
    tint_alpha: Option<f64>,

    /// Centre-to-centre distance between the parts.
    #[arg(long)]
    gap: Option<f64>,

    /// Average part scale in percent.
    #[arg(long)]
    strap_size: Option<f64>,

    /// Dial size multiplier.
    #[arg(long, default_value_t = 1.0)]
    dial_scale: f64,

    /// Whole-view zoom.
    #[arg(long, default_value_t = 1.0)]
    zoom: f64,
}

/// Dial cleanup selection.
#[derive(Clone, Copy, ValueEnum)]
enum Cleanup {
    /// Use the photo as is.
    None,
    /// Flat corner-colour mask.
    Simple,
    /// Dial detection plus radial fade.
    Enhanced,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Engine configuration from `--config-json`, or the defaults.
fn engine_config(cli: &Cli) -> Result<EngineConfig, String> {
    cli.config_json.as_ref().map_or_else(
        || Ok(EngineConfig::default()),
        |json| serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}")),
    )
}

/// Resolve `--tint` / `--tint-alpha`.
fn parse_tint(spec: &str, alpha: Option<f64>) -> Result<Tint, String> {
    let tint = if let Some(preset) = tint_preset(spec) {
        preset
    } else {
        let color: Rgb = spec
            .parse()
            .map_err(|e| format!("--tint must be a preset name or hex colour: {e}"))?;
        Tint { color, alpha: 0.3 }
    };
    Ok(Tint {
        alpha: alpha.unwrap_or(tint.alpha).clamp(0.0, 1.0),
        ..tint
    })
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn run_detect(
    config: &EngineConfig,
    image: &Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let photo = load_path(image)?;
    eprintln!("Detecting dial in {}x{} image", photo.width(), photo.height());
    let detection = detect_dial(&photo, &config.detector);

    if json {
        let value = serde_json::json!({
            "rect": detection.rect,
            "center": detection.center,
            "radius": detection.radius,
            "confident": detection.confident,
            "candidate": detection.candidate,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!(
            "centre: ({:.1}, {:.1})  radius: {:.1}  confident: {}",
            detection.center.x, detection.center.y, detection.radius, detection.confident,
        );
        println!(
            "rect: x={:.1} y={:.1} w={:.1} h={:.1}",
            detection.rect.x, detection.rect.y, detection.rect.width, detection.rect.height,
        );
        if let Some(c) = detection.candidate {
            println!("score: {:.3}", c.score);
        }
    }
    Ok(())
}

fn run_clean(
    config: &EngineConfig,
    image: &Path,
    output: &Path,
    cleanup: Cleanup,
) -> Result<(), Box<dyn std::error::Error>> {
    let photo = load_path(image)?;
    let cleaned = match cleanup {
        Cleanup::None => photo.clone(),
        Cleanup::Simple => segment(&photo, &MaskStrategy::Flat, &config.segment),
        Cleanup::Enhanced => enhanced_clean(&photo, &config.segment, &config.detector),
    };
    eprintln!(
        "Cleaned {}x{} -> {}x{}",
        photo.width(),
        photo.height(),
        cleaned.width(),
        cleaned.height(),
    );
    write_png(&cleaned, output)
}

fn run_compose(config: EngineConfig, args: &ComposeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = match &args.catalog {
        Some(path) => StrapCatalog::from_json(&std::fs::read_to_string(path)?)?,
        None => StrapCatalog::sample(),
    };
    let mut session = Session::new(SessionConfig {
        engine: config,
        catalog,
        asset_root: args.assets.clone(),
        cleanup: match args.cleanup {
            Cleanup::Enhanced => CleanupMode::Enhanced,
            Cleanup::None | Cleanup::Simple => CleanupMode::Simple,
        },
        ..SessionConfig::default()
    });

    eprintln!("Reading dial from {}", args.dial.display());
    match args.cleanup {
        Cleanup::None => session.set_dial(load_path(&args.dial)?),
        Cleanup::Simple | Cleanup::Enhanced => {
            session.ingest_dial(&args.dial.clone().into())?;
        }
    }

    if let (Some(top), Some(bottom)) = (&args.top, &args.bottom) {
        session.set_part_images(load_path(top)?, load_path(bottom)?);
    } else {
        let id = args.variant.as_deref().unwrap_or("leather-classic");
        if !session.select_variant(id)? {
            return Err(format!("unknown variant {id:?}").into());
        }
        eprintln!("Variant: {id} ({})", session.filter());
    }

    if let Some(spec) = &args.tint {
        session.set_tint(Some(parse_tint(spec, args.tint_alpha)?));
    }
    if let Some(gap) = args.gap {
        session.set_gap(gap);
    }
    if let Some(size) = args.strap_size {
        session.set_strap_size(size);
    }
    session.set_dial_scale(args.dial_scale);
    session.set_view_zoom(args.zoom);

    let parts = session.parts();
    eprintln!(
        "Parts: top scale {:.1} y {:.1}, bottom scale {:.1} y {:.1}",
        parts.top.scale, parts.top.y, parts.bottom.scale, parts.bottom.y,
    );

    session.render()?;
    let frame = session.frame().ok_or("render produced no frame")?;
    write_png(frame, &args.output)
}

fn run_stack(top: &Path, bottom: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let stacked = stack_parts(&load_path(top)?, &load_path(bottom)?)?;
    eprintln!("Stacked parts into {}x{}", stacked.width(), stacked.height());
    write_png(&stacked, output)
}

fn write_png(image: &PixelBuffer, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = strapfit_export::to_png(image)?;
    std::fs::write(output, &bytes)?;
    eprintln!("Saved {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = engine_config(&cli)?;

    match &cli.command {
        Command::Detect { image, json } => run_detect(&config, image, *json),
        Command::Clean {
            image,
            output,
            cleanup,
        } => run_clean(&config, image, output, *cleanup),
        Command::Compose(args) => run_compose(config, args),
        Command::Stack {
            top,
            bottom,
            output,
        } => run_stack(top, bottom, output),
    }
}
