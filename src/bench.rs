//! Benchmark driver: sequences the test phases.

use std::io::Write;

use crate::config::Config;
use crate::error::BenchError;
use crate::load::LoadKind;
use crate::ramp::Ramp;
use crate::writer::RowWriter;

/// Load level the fixed-load tests run at.
const FULL_LOAD: u32 = 100;

/// Run every enabled test phase, writing the header and one row per
/// committed load level to `out`.
///
/// Phases run strictly in sequence. The first failure aborts the whole run
/// and later phases do not execute; the result stream then ends after the
/// last fully committed row.
pub async fn run<W: Write>(config: &Config, out: W) -> Result<(), BenchError> {
    let mut writer = RowWriter::new(out);

    let mut header = vec![
        "test".to_string(),
        "threads".to_string(),
        "load".to_string(),
    ];
    header.extend(config.metrics.iter().cloned());
    writer.write_row(&header)?;

    let ramp = Ramp::new(config);

    ramp.run("CPUStress", LoadKind::Cpu, 0, &mut writer).await?;

    if config.ipsec {
        ramp.run("ipsec", LoadKind::Ipsec, FULL_LOAD, &mut writer)
            .await?;
    }
    if config.vm {
        ramp.run("VMStress", LoadKind::Vm, FULL_LOAD, &mut writer)
            .await?;
    }
    if config.maximize {
        ramp.run("maximize", LoadKind::Maximize, FULL_LOAD, &mut writer)
            .await?;
    }

    Ok(())
}
