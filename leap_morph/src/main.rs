//! leap_morph — interactive entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use leap_morph::app::run;
use leap_morph::config::MorphConfig;

const DEFAULT_CONFIG: &str = "leap_morph.toml";
const DEFAULT_LOG_FILTER: &str = "leap_morph=info,hand_signal=info";

#[derive(Debug, Parser)]
#[command(name = "leap_morph", version, about = "Morph a particle tree into a sphere with your hand")]
struct Cli {
    /// TOML config file (missing default file is ignored).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the particle count.
    #[arg(long)]
    particles: Option<usize>,

    /// Override the particle layout seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Skip the config file and start with stock tuning.
    #[arg(long)]
    quick: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<MorphConfig> {
    let mut cfg = if cli.quick {
        MorphConfig::default()
    } else {
        match &cli.config {
            Some(path) => MorphConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None if PathBuf::from(DEFAULT_CONFIG).exists() => MorphConfig::load(DEFAULT_CONFIG)
                .with_context(|| format!("loading {}", DEFAULT_CONFIG))?,
            None => MorphConfig::default(),
        }
    };

    if let Some(n) = cli.particles { cfg.particles.count = n; }
    if let Some(s) = cli.seed      { cfg.particles.seed = s; }
    cfg.validate().context("invalid configuration")?;
    Ok(cfg)
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let cfg = load_config(&cli)?;

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        Leap Morph — gesture-driven tree / sphere field       ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Mode: LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    println!("  Mode: Mouse simulation  (use --features leap for hardware)");
    println!("  Fist → tree   Open hand → sphere   1/2 override   Q quit");
    println!();

    info!(
        particles = cfg.particles.count,
        seed = cfg.particles.seed,
        closed_below = cfg.gesture.closed_below,
        open_above = cfg.gesture.open_above,
        "starting"
    );

    if let Err(e) = run(cfg) {
        error!(reason = e.reason(), error = %e, "session failed");
        eprintln!("Error ({}): {}", e.reason(), e);
        std::process::exit(1);
    }
    Ok(())
}
