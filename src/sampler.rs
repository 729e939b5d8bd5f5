//! Telemetry sampling via an external counter reader.
//!
//! Each call spawns one `turbostat` invocation for a single measurement
//! window restricted to package-level counters, then parses its two-line
//! tab-delimited output (header, values). The sampler's own stderr goes to
//! the diagnostic stream.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::BenchError;

/// Take one telemetry reading over `interval`.
///
/// Blocks until the sampler exits. Returns one value per requested metric,
/// in the requested order. A requested metric absent from the sampler's
/// header yields `0.0` unless `strict` is set, in which case the call fails.
pub async fn sample(
    program: &str,
    metrics: &[String],
    interval: Duration,
    strict: bool,
) -> Result<Vec<f64>, BenchError> {
    let interval_arg = format!("{:.6}", interval.as_secs_f64());
    let show_arg = metrics.join(",");
    let args = [
        "-q",
        "-c",
        "package",
        "--num_iterations",
        "1",
        "--interval",
        &interval_arg,
        "--show",
        &show_arg,
    ];
    tracing::info!("$ {} {}", program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .await
        .map_err(|source| BenchError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(BenchError::SamplerFailed {
            program: program.to_string(),
            code: output.status.code(),
        });
    }

    let text = String::from_utf8_lossy(&output.stdout);
    parse_output(&text, metrics, strict)
}

/// Parse the header/value lines into requested-metric order.
///
/// Every value field must be numeric, including columns the caller did not
/// ask for. Extra columns are otherwise ignored.
fn parse_output(raw: &str, metrics: &[String], strict: bool) -> Result<Vec<f64>, BenchError> {
    let mut lines = raw.lines();
    let (Some(header), Some(values)) = (lines.next(), lines.next()) else {
        return Err(BenchError::SamplerOutput {
            output: raw.to_string(),
        });
    };

    let names: Vec<&str> = header.split('\t').collect();
    let mut readings = HashMap::new();
    for (index, field) in values.split('\t').enumerate() {
        let value: f64 = field
            .trim()
            .parse()
            .map_err(|_| BenchError::BadValue {
                field: field.to_string(),
            })?;
        if let Some(name) = names.get(index) {
            readings.insert(*name, value);
        }
    }

    metrics
        .iter()
        .map(|name| match readings.get(name.as_str()) {
            Some(value) => Ok(*value),
            None if strict => Err(BenchError::MissingMetric { name: name.clone() }),
            None => Ok(0.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn values_follow_requested_order() {
        let raw = "PkgTmp\tPkgWatt\n50.0\t10.5\n";
        let values = parse_output(raw, &metrics(&["PkgWatt", "PkgTmp"]), false).unwrap();
        assert_eq!(values, [10.5, 50.0]);
    }

    #[test]
    fn missing_metric_defaults_to_zero() {
        let raw = "PkgWatt\n10.5\n";
        let values = parse_output(raw, &metrics(&["PkgWatt", "RAMWatt"]), false).unwrap();
        assert_eq!(values, [10.5, 0.0]);
    }

    #[test]
    fn missing_metric_fails_in_strict_mode() {
        let raw = "PkgWatt\n10.5\n";
        let err = parse_output(raw, &metrics(&["PkgWatt", "RAMWatt"]), true).unwrap_err();
        assert!(matches!(err, BenchError::MissingMetric { name } if name == "RAMWatt"));
    }

    #[test]
    fn single_line_output_is_rejected() {
        let err = parse_output("PkgWatt\n", &metrics(&["PkgWatt"]), false).unwrap_err();
        assert!(matches!(err, BenchError::SamplerOutput { .. }));
    }

    #[test]
    fn empty_output_is_rejected() {
        let err = parse_output("", &metrics(&["PkgWatt"]), false).unwrap_err();
        assert!(matches!(err, BenchError::SamplerOutput { .. }));
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let err = parse_output("PkgWatt\nn/a\n", &metrics(&["PkgWatt"]), false).unwrap_err();
        assert!(matches!(err, BenchError::BadValue { field } if field == "n/a"));
    }

    #[test]
    fn unrequested_non_numeric_column_still_fails() {
        let raw = "PkgWatt\tBusy%\n10.5\t-\n";
        let err = parse_output(raw, &metrics(&["PkgWatt"]), false).unwrap_err();
        assert!(matches!(err, BenchError::BadValue { .. }));
    }

    #[test]
    fn extra_numeric_columns_are_ignored() {
        let raw = "PkgWatt\tRAMWatt\tPkgTmp\n10.5\t3.2\t48.0\n";
        let values = parse_output(raw, &metrics(&["PkgTmp"]), false).unwrap();
        assert_eq!(values, [48.0]);
    }
}
