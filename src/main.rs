mod bench;
mod config;
mod error;
mod load;
mod ramp;
mod sampler;
mod writer;

use std::io::Write;

use anyhow::Result;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env_and_args()?;

    // Progression and sub-process output go to stderr; stdout carries only
    // the result rows so it can be piped into a CSV file.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("wattramp={}", config.log_level).parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut stdout = std::io::stdout().lock();

    if config.cpu_info {
        let info = cpu_info()?;
        write!(stdout, "{info}\n#---\n")?;
        stdout.flush()?;
    }

    bench::run(&config, stdout).await?;
    Ok(())
}

fn cpu_info() -> std::io::Result<String> {
    std::fs::read_to_string("/proc/cpuinfo")
}
