//! # wattramp
//!
//! Generates stepped CPU/VM load and reports power and thermal telemetry for
//! each load level.
//!
//! ## Purpose
//!
//! Answering "how many watts does this machine draw under 25%, 50%, 100%
//! load?" takes two tools running in lockstep: a load generator holding the
//! machine at a target utilization and a counter reader sampling the package
//! power and temperature sensors. wattramp drives both: it combines CPU load
//! generation using `stress-ng` with power metrics measurement using
//! `turbostat`, stepping the load from 0 to 100 and averaging several
//! telemetry samples at every step.
//!
//! Reading the metrics requires adequate privileges (CAP_SYS_RAWIO, or
//! simply run as root).
//!
//! ## Output
//!
//! Results are comma-delimited rows on stdout, one per committed load level:
//!
//! ```text
//! test,threads,load,PkgWatt,RAMWatt,PkgTmp
//! CPUStress,8,0,3.81,1.02,41.00
//! CPUStress,8,25,21.40,1.33,55.10
//! ...
//! ```
//!
//! Progression messages go to stderr, so the two streams can be separated:
//!
//! ```bash
//! wattramp | tee results.csv
//! ```
//!
//! ## Test phases
//!
//! - **CPUStress**: ramps CPU load from 0 to 100 by `--load-step`
//! - **ipsec**: IPsec multi-buffer workload at full load, exercising
//!   advanced CPU instructions (AVX and so on)
//! - **VMStress**: virtual-memory workload at full load
//! - **maximize**: CPU plus VM workload with stressor values maximized
//!
//! A row is only written after its load level was measured completely and
//! the load generator was confirmed torn down; any failure aborts the whole
//! run without emitting a partial row.

pub mod bench;
pub mod config;
pub mod error;
pub mod load;
pub mod ramp;
pub mod sampler;
pub mod writer;
