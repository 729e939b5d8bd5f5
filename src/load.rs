//! Load-generator process control.
//!
//! One [`LoadRun`] wraps one long-running `stress-ng` invocation. The
//! generator is expected to burn CPU (or memory) until it is told to stop;
//! the only acceptable way for it to end is the termination signal sent by
//! [`LoadRun::terminate`]. Everything it prints is routed to the diagnostic
//! stream so it can never corrupt result rows.

use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};

use crate::error::BenchError;

/// What kind of stress workload to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// Variable-intensity CPU load
    Cpu,
    /// IPsec multi-buffer workload, exercises AVX and similar instructions
    Ipsec,
    /// Virtual-memory workload
    Vm,
    /// CPU plus VM workload with stressor values maximized
    Maximize,
}

/// Parameters for one load-generator invocation.
#[derive(Debug, Clone)]
pub struct LoadProfile {
    pub kind: LoadKind,
    /// Target CPU utilization percentage, only meaningful for [`LoadKind::Cpu`]
    pub load: u32,
    pub threads: u32,
    /// stress-ng CPU method, only meaningful for [`LoadKind::Cpu`]
    pub method: String,
}

impl LoadProfile {
    fn args(&self) -> Vec<String> {
        let threads = self.threads.to_string();
        match self.kind {
            LoadKind::Cpu => vec![
                "-l".to_string(),
                self.load.to_string(),
                "-c".to_string(),
                threads,
                "--cpu-method".to_string(),
                self.method.clone(),
            ],
            LoadKind::Ipsec => vec!["--ipsec-mb".to_string(), threads],
            LoadKind::Vm => vec!["--vm".to_string(), threads],
            LoadKind::Maximize => vec![
                "--cpu".to_string(),
                threads.clone(),
                "--vm".to_string(),
                threads,
                "--maximize".to_string(),
            ],
        }
    }
}

/// How a load process ended.
#[derive(Debug, Clone, Copy)]
pub struct ExitInfo {
    /// True when the process died from a signal
    pub signaled: bool,
    /// Exit code of a natural exit, `None` for a signal death
    pub code: Option<i32>,
}

impl ExitInfo {
    fn from_status(status: ExitStatus) -> Self {
        ExitInfo {
            signaled: status.signal().is_some(),
            code: status.code(),
        }
    }
}

/// Handle to one in-flight load-generator process.
///
/// Owned by the ramp controller for the duration of one load level. The
/// child is spawned with `kill_on_drop` so it cannot outlive its handle on
/// any exit path; the controller still terminates it explicitly so it can
/// verify how the process died.
pub struct LoadRun {
    child: Child,
    program: String,
}

impl LoadRun {
    /// Spawn the load generator for the given profile.
    pub fn spawn(program: &str, profile: &LoadProfile) -> Result<Self, BenchError> {
        let args = profile.args();
        tracing::info!("$ {} {}", program, args.join(" "));

        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BenchError::Spawn {
                program: program.to_string(),
                source,
            })?;

        // Forward the generator's stdout to stderr in the background so it
        // never mixes with result rows.
        if let Some(mut stdout) = child.stdout.take() {
            tokio::spawn(async move {
                let _ = tokio::io::copy(&mut stdout, &mut tokio::io::stderr()).await;
            });
        }

        Ok(LoadRun {
            child,
            program: program.to_string(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Non-blocking liveness check.
    pub fn is_alive(&mut self) -> Result<bool, BenchError> {
        Ok(self.child.try_wait().map_err(BenchError::Io)?.is_none())
    }

    /// Completion event, resolves when the process exits for any reason.
    ///
    /// Cancel safe, so it can be raced against a timer.
    pub async fn wait(&mut self) -> Result<ExitInfo, BenchError> {
        let status = self.child.wait().await.map_err(BenchError::Io)?;
        Ok(ExitInfo::from_status(status))
    }

    /// Kill the process and reap it.
    ///
    /// Fails with [`BenchError::UnexpectedExit`] when the process turns out
    /// to have exited on its own before termination was requested.
    pub async fn terminate(&mut self) -> Result<ExitInfo, BenchError> {
        if let Some(status) = self.child.try_wait().map_err(BenchError::Io)? {
            return Err(BenchError::UnexpectedExit {
                program: self.program.clone(),
                code: status.code(),
            });
        }
        self.child.start_kill().map_err(BenchError::Io)?;
        let status = self.child.wait().await.map_err(BenchError::Io)?;
        Ok(ExitInfo::from_status(status))
    }

    /// Best-effort kill on an abort path.
    ///
    /// Failures are logged rather than returned so they cannot mask the
    /// error that triggered the abort.
    pub async fn abandon(&mut self) {
        match self.child.try_wait() {
            Ok(Some(_)) => {}
            _ => {
                if let Err(err) = self.child.kill().await {
                    tracing::warn!("failed to stop {}: {}", self.program, err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(kind: LoadKind) -> LoadProfile {
        LoadProfile {
            kind,
            load: 40,
            threads: 8,
            method: "all".to_string(),
        }
    }

    #[test]
    fn cpu_args_carry_load_threads_and_method() {
        let args = profile(LoadKind::Cpu).args();
        assert_eq!(args, ["-l", "40", "-c", "8", "--cpu-method", "all"]);
    }

    #[test]
    fn ipsec_args_carry_threads_only() {
        assert_eq!(profile(LoadKind::Ipsec).args(), ["--ipsec-mb", "8"]);
    }

    #[test]
    fn vm_args_carry_threads_only() {
        assert_eq!(profile(LoadKind::Vm).args(), ["--vm", "8"]);
    }

    #[test]
    fn maximize_args_combine_cpu_and_vm() {
        let args = profile(LoadKind::Maximize).args();
        assert_eq!(args, ["--cpu", "8", "--vm", "8", "--maximize"]);
    }

    #[test]
    fn signal_death_is_reported_as_signaled() {
        // Raw wait status 9 encodes death by SIGKILL
        let info = ExitInfo::from_status(ExitStatus::from_raw(9));
        assert!(info.signaled);
        assert_eq!(info.code, None);
    }

    #[test]
    fn natural_exit_keeps_its_code() {
        // Raw wait status 3 << 8 encodes a natural exit with code 3
        let info = ExitInfo::from_status(ExitStatus::from_raw(3 << 8));
        assert!(!info.signaled);
        assert_eq!(info.code, Some(3));
    }
}
