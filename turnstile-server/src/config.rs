//! Server configuration and CLI argument parsing
//!
//! Configuration follows this precedence order:
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (with TURNSTILE_ prefix)
//! 3. Default values (lowest priority)
//!
//! # Example Usage
//!
//! ```bash
//! # Using CLI arguments
//! turnstile --port 9090 --min-interval-ms 250
//!
//! # Using environment variables
//! export TURNSTILE_PORT=9090
//! export TURNSTILE_STORE=capped
//! turnstile
//!
//! # Mixed (CLI overrides env)
//! export TURNSTILE_PORT=8080
//! turnstile --port 9090  # Uses port 9090
//! ```

use anyhow::{Result, anyhow};
use clap::Parser;
use std::time::Duration;

/// Main configuration structure for the server
#[derive(Debug, Clone)]
pub struct Config {
    /// Listener configuration
    pub server: ServerConfig,
    /// Minimum interval between admitted requests per client
    pub min_interval: Duration,
    /// Throttle state store configuration
    pub store: StoreConfig,
    /// Honor X-Forwarded-For from a trusted reverse proxy
    pub trust_forwarded: bool,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

/// Throttle state store configuration
///
/// Both store types are bounded:
/// - **Sweep**: periodically removes entries idle past the retention horizon
/// - **Capped**: hard capacity, evicts the stalest entry when full
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Type of store to use
    pub store_type: StoreType,
    /// Expected (sweep) or maximum (capped) number of tracked client keys
    pub capacity: usize,
    /// Idle retention horizon for the sweep store
    pub retention: Duration,
    /// Interval between sweeps for the sweep store
    pub sweep_interval: Duration,
    /// Number of lock shards (0 = derive from available cores)
    pub shards: usize,
}

/// Available throttle store types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    /// Periodic sweep of idle entries
    Sweep,
    /// Hard capacity with stalest-first eviction
    Capped,
}

impl std::str::FromStr for StoreType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sweep" => Ok(StoreType::Sweep),
            "capped" => Ok(StoreType::Capped),
            _ => Err(anyhow!(
                "Invalid store type: {}. Valid options are: sweep, capped",
                s
            )),
        }
    }
}

/// Command-line arguments for the server
///
/// All arguments can also be set via environment variables with the
/// TURNSTILE_ prefix. CLI arguments take precedence over environment
/// variables.
#[derive(Parser, Debug)]
#[command(
    name = "turnstile",
    about = "HTTP server with per-client request admission control",
    long_about = "An HTTP host application gated by per-client admission control.\n\nEach client is admitted at most once per configured interval; requests inside the window receive 429 Too Many Requests.\n\nEnvironment variables with TURNSTILE_ prefix are supported. CLI arguments take precedence over environment variables."
)]
pub struct Args {
    // Listener
    #[arg(
        long,
        value_name = "HOST",
        help = "Host to bind to",
        default_value = "127.0.0.1",
        env = "TURNSTILE_HOST"
    )]
    pub host: String,
    #[arg(
        long,
        value_name = "PORT",
        help = "Port to listen on",
        default_value_t = 8080,
        env = "TURNSTILE_PORT"
    )]
    pub port: u16,

    // Admission policy
    #[arg(
        long,
        value_name = "MS",
        help = "Minimum interval between admitted requests per client (milliseconds)",
        default_value_t = 100,
        env = "TURNSTILE_MIN_INTERVAL_MS"
    )]
    pub min_interval_ms: u64,

    // Store configuration
    #[arg(
        long,
        value_name = "TYPE",
        help = "Store type: sweep, capped",
        default_value = "sweep",
        env = "TURNSTILE_STORE"
    )]
    pub store: StoreType,
    #[arg(
        long,
        value_name = "SIZE",
        help = "Store capacity (tracked client keys)",
        default_value_t = 100_000,
        env = "TURNSTILE_STORE_CAPACITY"
    )]
    pub store_capacity: usize,
    #[arg(
        long,
        value_name = "SECS",
        help = "Idle retention horizon for the sweep store (seconds)",
        default_value_t = 60,
        env = "TURNSTILE_STORE_RETENTION"
    )]
    pub store_retention: u64,
    #[arg(
        long,
        value_name = "SECS",
        help = "Interval between sweeps for the sweep store (seconds)",
        default_value_t = 60,
        env = "TURNSTILE_STORE_SWEEP_INTERVAL"
    )]
    pub store_sweep_interval: u64,
    #[arg(
        long,
        value_name = "N",
        help = "Number of store lock shards (0 = derive from available cores)",
        default_value_t = 0,
        env = "TURNSTILE_STORE_SHARDS"
    )]
    pub store_shards: usize,

    // Client identity
    #[arg(
        long,
        help = "Honor X-Forwarded-For from a trusted reverse proxy",
        env = "TURNSTILE_TRUST_FORWARDED"
    )]
    pub trust_forwarded: bool,

    // General options
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "TURNSTILE_LOG_LEVEL"
    )]
    pub log_level: String,
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid (zero interval,
    /// zero capacity, or a retention horizon shorter than the interval).
    pub fn from_env_and_args() -> Result<Self> {
        // Clap handles env fallback with CLI taking precedence.
        let args = Args::parse();
        Self::from_args(args)
    }

    fn from_args(args: Args) -> Result<Self> {
        let config = Config {
            server: ServerConfig {
                host: args.host,
                port: args.port,
            },
            min_interval: Duration::from_millis(args.min_interval_ms),
            store: StoreConfig {
                store_type: args.store,
                capacity: args.store_capacity,
                retention: Duration::from_secs(args.store_retention),
                sweep_interval: Duration::from_secs(args.store_sweep_interval),
                shards: args.store_shards,
            },
            trust_forwarded: args.trust_forwarded,
            log_level: args.log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.min_interval.is_zero() {
            return Err(anyhow!(
                "--min-interval-ms must be greater than zero; throttling with an empty window admits everything"
            ));
        }

        if self.store.capacity == 0 {
            return Err(anyhow!("--store-capacity must be greater than zero"));
        }

        // A retention horizon shorter than the window would let the sweep
        // evict an active entry and re-admit a throttled client early.
        if self.store.store_type == StoreType::Sweep && self.store.retention < self.min_interval {
            return Err(anyhow!(
                "--store-retention ({:?}) must be at least --min-interval-ms ({:?})",
                self.store.retention,
                self.min_interval
            ));
        }

        Ok(())
    }
}
