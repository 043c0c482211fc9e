//! hive CLI - run Lua scripts on the hive process runtime.
//!
//! # Configuration
//!
//! Configuration is layered, highest priority first:
//!
//! 1. CLI arguments (`--pool-size`, `--debug`)
//! 2. Environment variables (`HIVE_POOL_SIZE`, `HIVE_DEBUG`)
//! 3. Config file (`--config <file.toml>`)
//! 4. Defaults (pool sized to the hardware parallelism)
//!
//! The script runs in a host environment with the `hive.*` modules
//! installed; when it returns, the runtime drains and joins the
//! default pool before exiting.

use anyhow::{bail, Context as _, Result};
use clap::Parser;
use hive_lua::HostEnv;
use hive_runtime::{runtime, RuntimeConfig};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Run Lua scripts on the hive process runtime.
#[derive(Parser, Debug)]
#[command(name = "hive")]
#[command(version, about, long_about = None)]
struct Args {
    /// Lua script to execute.
    script: Option<PathBuf>,

    /// Inline Lua chunk to execute instead of a script file.
    #[arg(short = 'e', long = "eval", value_name = "CHUNK", conflicts_with = "script")]
    eval: Option<String>,

    /// Worker count of the default pool.
    #[arg(long, value_name = "N")]
    pool_size: Option<usize>,

    /// Configuration file (TOML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,
}

fn load_config(args: &Args) -> Result<RuntimeConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            RuntimeConfig::from_toml(&raw)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => RuntimeConfig::new(),
    };
    config = config.with_env_overrides();
    if let Some(size) = args.pool_size {
        config.pool_size = size;
    }
    if args.debug {
        config.debug = true;
    }
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let lua = HostEnv::new().create_lua()?;

    if let Some(chunk) = &args.eval {
        lua.load(chunk.as_str()).set_name("=eval").exec()?;
        return Ok(());
    }

    let Some(script) = &args.script else {
        bail!("nothing to run: pass a script path or --eval");
    };
    let source = std::fs::read_to_string(script)
        .with_context(|| format!("reading {}", script.display()))?;
    lua.load(source)
        .set_name(format!("@{}", script.display()))
        .exec()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let default_directive = if config.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    fmt().with_env_filter(filter).with_target(false).init();

    runtime::init(&config)?;
    debug!(pool_size = config.pool_size, "runtime up, executing script");

    let result = run(&args);

    // Drain queued work and join the workers before reporting.
    runtime::shutdown();
    result
}
