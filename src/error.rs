//! Error types for a benchmark run.
//!
//! Every error here aborts the whole run. There are no retries: the repeat
//! count exists to average measurements, not to recover from failures, and a
//! half-measured load level must never reach the result stream.

use std::error::Error;
use std::fmt;
use std::io;

/// Errors produced while driving the load generator and the sampler.
#[derive(Debug)]
pub enum BenchError {
    /// An external process could not be started
    Spawn { program: String, source: io::Error },
    /// The load process died before the end of its measurement window
    PrematureExit { program: String },
    /// The load process was already dead when termination was requested
    UnexpectedExit { program: String, code: Option<i32> },
    /// The load process was terminated but did not die from a signal
    NotSignaled { program: String, code: Option<i32> },
    /// The sampler exited with a non-zero status
    SamplerFailed { program: String, code: Option<i32> },
    /// The sampler produced fewer than two lines of output
    SamplerOutput { output: String },
    /// A sampler value field was not numeric
    BadValue { field: String },
    /// A requested metric was absent from the sampler header (strict mode)
    MissingMetric { name: String },
    /// Result stream or process I/O failed
    Io(io::Error),
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchError::Spawn { program, source } => {
                write!(f, "cannot start {program}: {source}")
            }
            BenchError::PrematureExit { program } => {
                write!(
                    f,
                    "{program} gone before end of measures, see its output for details"
                )
            }
            BenchError::UnexpectedExit { program, code } => {
                write!(
                    f,
                    "{program} exited on its own before it was told to stop, exit code: {}",
                    fmt_code(*code)
                )
            }
            BenchError::NotSignaled { program, code } => {
                write!(
                    f,
                    "{program} was not terminated by a signal, exit code: {}",
                    fmt_code(*code)
                )
            }
            BenchError::SamplerFailed { program, code } => {
                write!(f, "{program} failed, exit code: {}", fmt_code(*code))
            }
            BenchError::SamplerOutput { output } => {
                write!(f, "could not parse sampler output: {output}")
            }
            BenchError::BadValue { field } => {
                write!(f, "sampler value is not numeric: {field:?}")
            }
            BenchError::MissingMetric { name } => {
                write!(f, "metric {name} missing from sampler output")
            }
            BenchError::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl Error for BenchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BenchError::Spawn { source, .. } => Some(source),
            BenchError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for BenchError {
    fn from(err: io::Error) -> Self {
        BenchError::Io(err)
    }
}

fn fmt_code(code: Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "unknown".to_string(),
    }
}
