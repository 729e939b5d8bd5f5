//! Benchmark configuration and CLI argument parsing.
//!
//! # Configuration Priority
//!
//! The configuration system follows this precedence order:
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (with WATTRAMP_ prefix)
//! 3. Default values (lowest priority)
//!
//! # Example Usage
//!
//! ```bash
//! # Using CLI arguments
//! wattramp --load-step 10 --repeat 20
//!
//! # Using environment variables
//! export WATTRAMP_LOAD_STEP=10
//! export WATTRAMP_REPEAT=20
//! wattramp
//!
//! # Mixed (CLI overrides env)
//! export WATTRAMP_REPEAT=20
//! wattramp --repeat 5  # Uses 5 measures per level
//! ```

use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::Parser;
use serde::Deserialize;

/// Immutable configuration for one benchmark run.
///
/// Built once at startup from CLI arguments and environment variables, then
/// passed by reference through the run; nothing mutates it afterwards. The
/// starting load level is not part of the configuration, it is chosen per
/// test phase (0 for the CPU ramp, 100 for the fixed-load tests).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Load increment between levels, 1 to 100
    pub load_step: u32,
    /// Wait between load start and the first sample
    pub settle: Duration,
    /// Number of load threads
    pub threads: u32,
    /// Sampler columns to read; the order defines the output column order
    pub metrics: Vec<String>,
    /// Samples per load level; the reported value is their mean
    pub repeat: u32,
    /// Sampler window of one measure
    pub interval: Duration,
    /// Load generator CPU method
    pub method: String,
    /// Dump /proc/cpuinfo to the result stream before the header row
    pub cpu_info: bool,
    /// Run the ipsec phase after the CPU ramp
    pub ipsec: bool,
    /// Run the VM phase
    pub vm: bool,
    /// Run the maximize phase
    pub maximize: bool,
    /// Fail when a requested metric is missing from sampler output instead
    /// of reporting it as zero
    pub strict_metrics: bool,
    /// Load generator program
    pub stress_ng: String,
    /// Telemetry sampler program
    pub turbostat: String,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

/// Command-line arguments
///
/// All arguments can also be set via environment variables with the
/// WATTRAMP_ prefix. CLI arguments take precedence over environment
/// variables.
#[derive(Parser, Debug)]
#[command(
    name = "wattramp",
    about = "Generates stepped CPU load and reports power metrics per level",
    long_about = "Generates load and outputs computer power metrics for this load.\n\n\
        Reading the metrics requires adequate privileges (CAP_SYS_RAWIO, or simply run as root).\n\n\
        CPU load generation uses `stress-ng` and power metrics come from `turbostat`. For each\n\
        load step from 0 to 100 a matching CPU load is started and the requested metrics are\n\
        measured several times; the reported value per metric is the mean of those measures.\n\
        Further tests exercise advanced CPU instructions (ipsec), virtual memory and maximized\n\
        stressor values.\n\n\
        Progression messages are written to stderr while results are written to stdout, so the\n\
        two can be separated to build a CSV file while watching the progression:\n\
        wattramp | tee results.csv"
)]
pub struct Args {
    #[arg(
        long,
        value_name = "PERCENT",
        help = "Increment the load from the start level to 100 by this value",
        default_value_t = 25,
        env = "WATTRAMP_LOAD_STEP"
    )]
    pub load_step: u32,
    #[arg(
        long,
        value_name = "SECS",
        help = "Wait between load start and the first measure",
        default_value_t = 5,
        env = "WATTRAMP_SETTLE_SECS"
    )]
    pub settle_secs: u64,
    #[arg(
        long,
        value_name = "N",
        help = "Number of threads to use for the load, defaults to the number of threads on the system",
        default_value_t = default_threads(),
        env = "WATTRAMP_THREADS"
    )]
    pub threads: u32,
    #[arg(
        long,
        value_name = "NAMES",
        help = "Sampler columns to read, order defines the output columns",
        value_delimiter = ',',
        default_values_t = default_metrics(),
        env = "WATTRAMP_METRICS"
    )]
    pub metrics: Vec<String>,
    #[arg(
        long,
        value_name = "N",
        help = "Measures are repeated this many times per level and the mean is reported",
        default_value_t = 10,
        env = "WATTRAMP_REPEAT"
    )]
    pub repeat: u32,
    #[arg(
        long,
        value_name = "SECS",
        help = "Sampler window of one measure",
        default_value_t = 1,
        env = "WATTRAMP_INTERVAL_SECS"
    )]
    pub interval_secs: u64,
    #[arg(
        long,
        value_name = "METHOD",
        help = "Method used to generate the CPU load, see the stress-ng cpu-method flag",
        default_value = "all",
        env = "WATTRAMP_METHOD"
    )]
    pub method: String,
    #[arg(
        long,
        help = "Skip the cpuinfo dump before results",
        env = "WATTRAMP_NO_CPU_INFO"
    )]
    pub no_cpu_info: bool,
    #[arg(
        long,
        help = "Skip the ipsec test that exercises advanced CPU instructions",
        env = "WATTRAMP_SKIP_IPSEC"
    )]
    pub skip_ipsec: bool,
    #[arg(long, help = "Skip the VM test", env = "WATTRAMP_SKIP_VM")]
    pub skip_vm: bool,
    #[arg(
        long,
        help = "Skip the test maximizing stressor values",
        env = "WATTRAMP_SKIP_MAXIMIZE"
    )]
    pub skip_maximize: bool,
    #[arg(
        long,
        help = "Fail when a requested metric is missing from sampler output",
        env = "WATTRAMP_STRICT_METRICS"
    )]
    pub strict_metrics: bool,
    #[arg(
        long,
        value_name = "PATH",
        help = "Load generator program",
        default_value = "stress-ng",
        env = "WATTRAMP_STRESS_NG"
    )]
    pub stress_ng: String,
    #[arg(
        long,
        value_name = "PATH",
        help = "Telemetry sampler program",
        default_value = "turbostat",
        env = "WATTRAMP_TURBOSTAT"
    )]
    pub turbostat: String,
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "WATTRAMP_LOG_LEVEL"
    )]
    pub log_level: String,

    // Utility options
    #[arg(
        long,
        help = "List all environment variables and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub list_env_vars: bool,
}

fn default_threads() -> u32 {
    std::thread::available_parallelism()
        .map(|threads| threads.get() as u32)
        .unwrap_or(1)
}

fn default_metrics() -> Vec<String> {
    vec![
        "PkgWatt".to_string(),
        "RAMWatt".to_string(),
        "PkgTmp".to_string(),
    ]
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration values are invalid.
    pub fn from_env_and_args() -> Result<Self> {
        // Clap handles environment variables with the precedence:
        // 1. CLI arguments (highest priority)
        // 2. Environment variables
        // 3. Default values (lowest priority)
        let args = Args::parse();

        // Handle --list-env-vars
        if args.list_env_vars {
            Self::print_env_vars();
            std::process::exit(0);
        }

        let config = Config {
            load_step: args.load_step,
            settle: Duration::from_secs(args.settle_secs),
            threads: args.threads,
            metrics: args.metrics,
            repeat: args.repeat,
            interval: Duration::from_secs(args.interval_secs),
            method: args.method,
            cpu_info: !args.no_cpu_info,
            ipsec: !args.skip_ipsec,
            vm: !args.skip_vm,
            maximize: !args.skip_maximize,
            strict_metrics: args.strict_metrics,
            stress_ng: args.stress_ng,
            turbostat: args.turbostat,
            log_level: args.log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of its documented range.
    fn validate(&self) -> Result<()> {
        if self.load_step == 0 || self.load_step > 100 {
            return Err(anyhow!(
                "--load-step must be between 1 and 100, got {}",
                self.load_step
            ));
        }
        if self.threads == 0 {
            return Err(anyhow!("--threads must be at least 1"));
        }
        if self.repeat == 0 {
            return Err(anyhow!("--repeat must be at least 1"));
        }
        if self.interval < Duration::from_secs(1) {
            return Err(anyhow!("--interval-secs must be at least 1"));
        }
        if self.metrics.is_empty() {
            return Err(anyhow!("--metrics must name at least one sampler column"));
        }
        if self.metrics.iter().any(|name| name.trim().is_empty()) {
            return Err(anyhow!("--metrics must not contain empty names"));
        }
        Ok(())
    }

    /// Print all available environment variables and their descriptions
    fn print_env_vars() {
        println!("wattramp Environment Variables");
        println!("==============================");
        println!();
        println!("All environment variables use the WATTRAMP_ prefix.");
        println!("CLI arguments take precedence over environment variables.");
        println!();
        println!("  WATTRAMP_LOAD_STEP=<percent>        Load increment per level [default: 25]");
        println!("  WATTRAMP_SETTLE_SECS=<secs>         Wait between load start and measures [default: 5]");
        println!("  WATTRAMP_THREADS=<n>                Load threads [default: all system threads]");
        println!("  WATTRAMP_METRICS=<names>            Sampler columns, comma separated [default: PkgWatt,RAMWatt,PkgTmp]");
        println!("  WATTRAMP_REPEAT=<n>                 Measures per level [default: 10]");
        println!("  WATTRAMP_INTERVAL_SECS=<secs>       Window of one measure [default: 1]");
        println!("  WATTRAMP_METHOD=<method>            Load generator CPU method [default: all]");
        println!("  WATTRAMP_NO_CPU_INFO=true|false     Skip the cpuinfo dump");
        println!("  WATTRAMP_SKIP_IPSEC=true|false      Skip the ipsec test");
        println!("  WATTRAMP_SKIP_VM=true|false         Skip the VM test");
        println!("  WATTRAMP_SKIP_MAXIMIZE=true|false   Skip the maximize test");
        println!("  WATTRAMP_STRICT_METRICS=true|false  Fail on metrics missing from sampler output");
        println!("  WATTRAMP_STRESS_NG=<path>           Load generator program [default: stress-ng]");
        println!("  WATTRAMP_TURBOSTAT=<path>           Sampler program [default: turbostat]");
        println!("  WATTRAMP_LOG_LEVEL=<level>          error, warn, info, debug, trace [default: info]");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            load_step: 25,
            settle: Duration::from_secs(5),
            threads: 4,
            metrics: default_metrics(),
            repeat: 10,
            interval: Duration::from_secs(1),
            method: "all".to_string(),
            cpu_info: true,
            ipsec: true,
            vm: true,
            maximize: true,
            strict_metrics: false,
            stress_ng: "stress-ng".to_string(),
            turbostat: "turbostat".to_string(),
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn default_shape_is_valid() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn zero_load_step_is_rejected() {
        let mut config = base_config();
        config.load_step = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_step_above_100_is_rejected() {
        let mut config = base_config();
        config.load_step = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_threads_are_rejected() {
        let mut config = base_config();
        config.threads = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_repeat_is_rejected() {
        let mut config = base_config();
        config.repeat = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn subsecond_interval_is_rejected() {
        let mut config = base_config();
        config.interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_metric_list_is_rejected() {
        let mut config = base_config();
        config.metrics.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_metric_name_is_rejected() {
        let mut config = base_config();
        config.metrics.push(" ".to_string());
        assert!(config.validate().is_err());
    }
}
