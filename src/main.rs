use anyhow::Context;
use clap::{Parser, Subcommand};
use creature_scan::config::{Config, ScanArgs, ServeArgs, ServerConfig, WatchArgs};
use creature_scan::engines::EngineRegistry;
use creature_scan::preprocessing::{Pipeline, Variant};
use creature_scan::{server, CaptureRegion, ConfirmedDetection, FileGrabber, Scanner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "creature-scan")]
#[command(about = "Recognize creature names in game screenshots")]
#[command(version)]
pub struct Args {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API
    Serve(ServeArgs),

    /// Identify the creatures in an image file and print the result as JSON
    Analyze {
        /// Image to analyze
        image: PathBuf,
    },

    /// Watch the capture region and print every confirmed detection
    Watch {
        #[command(flatten)]
        timing: WatchArgs,

        /// Region to watch instead of the saved one (left,top,width,height)
        #[arg(long)]
        region: Option<String>,
    },

    /// Write the preprocessing variants of an image for inspection
    Variants {
        /// Image to preprocess
        image: PathBuf,

        /// Output directory
        #[arg(long, default_value = "variants")]
        out: PathBuf,
    },

    /// Show the saved capture region, or save a new one
    Region {
        /// New region as left,top,width,height
        region: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from(args.scan);

    match args.command {
        Command::Serve(serve) => {
            let server_config = ServerConfig::from(serve);
            tracing::info!("Starting creature-scan v{}", env!("CARGO_PKG_VERSION"));
            tracing::info!("Binding to {}:{}", server_config.host, server_config.port);

            let scanner = build_scanner(&config)?;
            server::run(scanner, server_config).await
        }
        Command::Analyze { image } => analyze(&config, &image),
        Command::Watch { timing, region } => watch(&config, timing, region).await,
        Command::Variants { image, out } => write_variants(&image, &out),
        Command::Region { region } => show_or_save_region(&config, region),
    }
}

fn build_scanner(config: &Config) -> anyhow::Result<Arc<Scanner>> {
    let registry = EngineRegistry::new(config)?;
    let recognizer = registry.select(config.engine.as_deref())?;
    let grabber = Arc::new(FileGrabber::new(&config.screen_file));

    Ok(Arc::new(Scanner::from_config(config, recognizer, grabber)?))
}

fn analyze(config: &Config, path: &Path) -> anyhow::Result<()> {
    let image = image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let scanner = build_scanner(config)?;

    let result = scanner.analyze_single_image(&image, config.max_entities, config.confidence_threshold);

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn watch(config: &Config, timing: WatchArgs, region: Option<String>) -> anyhow::Result<()> {
    let scanner = build_scanner(config)?;
    if let Some(region) = region {
        scanner.set_region(CaptureRegion::parse(&region)?);
    }

    let started = scanner.start_loop(
        timing.interval,
        |detection: ConfirmedDetection| {
            let line = serde_json::json!({
                "tick": detection.tick,
                "key": detection.key,
                "result": detection.result,
            });
            println!("{}", line);
        },
        timing.sensitivity,
        config.confidence_threshold,
    );
    if !started {
        anyhow::bail!(
            "Capture loop not started: save a region first with `creature-scan region LEFT,TOP,WIDTH,HEIGHT`"
        );
    }

    tracing::info!("Watching {}; press Ctrl-C to stop", config.screen_file.display());
    tokio::signal::ctrl_c().await?;

    let scanner = Arc::clone(&scanner);
    tokio::task::spawn_blocking(move || scanner.stop_loop()).await?;
    Ok(())
}

fn write_variants(path: &Path, out: &Path) -> anyhow::Result<()> {
    let image = image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    std::fs::create_dir_all(out).with_context(|| format!("Failed to create {}", out.display()))?;

    let pipeline = Pipeline::new();
    for variant in Variant::PRIORITY {
        let rendered = pipeline.render(variant, &image)?;
        let target = out.join(format!("{}.png", variant.as_str()));
        rendered
            .image
            .save(&target)
            .with_context(|| format!("Failed to write {}", target.display()))?;

        println!("{}", serde_json::to_string(&rendered)?);
    }

    Ok(())
}

fn show_or_save_region(config: &Config, region: Option<String>) -> anyhow::Result<()> {
    match region {
        Some(region) => {
            let region = CaptureRegion::parse(&region)?;
            region.save(&config.region_file)?;
            println!("{}", serde_json::to_string_pretty(&region)?);
        }
        None => match CaptureRegion::load(&config.region_file)? {
            Some(region) => println!("{}", serde_json::to_string_pretty(&region)?),
            None => println!("No region saved in {}", config.region_file.display()),
        },
    }
    Ok(())
}
