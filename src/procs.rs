use async_trait::async_trait;
use itertools::Itertools;
use once_cell::sync::Lazy;
use std::sync::Mutex;
use std::time::Duration;
use sysinfo::ProcessesToUpdate;
#[cfg(unix)]
use sysinfo::Signal;

/// Read/terminate access to OS processes, behind a seam so the conflict
/// engine can run against a scripted fake in tests.
#[async_trait]
pub trait ProcessControl: Send + Sync {
    /// PIDs listening on the port. Empty when nothing listens or when the
    /// platform offers no socket introspection; a missing diagnostic is
    /// "no known listeners", not an error.
    fn listening_pids(&self, port: u16) -> Vec<u32>;

    /// Best-effort human-readable command line for a process.
    fn describe(&self, pid: u32) -> String;

    /// Escalating terminate: interrupt, then terminate, then kill. A no-op
    /// under `dry_run`. Absence of the process is success.
    async fn terminate(&self, pid: u32, dry_run: bool);
}

pub struct Procs {
    system: Mutex<sysinfo::System>,
}

pub static PROCS: Lazy<Procs> = Lazy::new(Procs::new);

impl Default for Procs {
    fn default() -> Self {
        Self::new()
    }
}

impl Procs {
    pub fn new() -> Self {
        let procs = Self {
            system: Mutex::new(sysinfo::System::new()),
        };
        procs.refresh_processes();
        procs
    }

    fn lock_system(&self) -> std::sync::MutexGuard<'_, sysinfo::System> {
        self.system.lock().unwrap_or_else(|poisoned| {
            warn!("System mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn is_running(&self, pid: u32) -> bool {
        self.lock_system()
            .process(sysinfo::Pid::from_u32(pid))
            .is_some()
    }

    pub fn refresh_processes(&self) {
        self.lock_system()
            .refresh_processes(ProcessesToUpdate::All, true);
    }

    /// Poll until the process disappears or the window elapses. Termination
    /// signals are asynchronous; this bounds how long we give each one.
    fn wait_gone(&self, pid: u32, window: Duration) -> bool {
        let deadline = std::time::Instant::now() + window;
        loop {
            self.refresh_processes();
            if !self.is_running(pid) {
                return true;
            }
            if std::time::Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    #[cfg(unix)]
    fn terminate_blocking(&self, pid: u32) {
        for signal in [Signal::Interrupt, Signal::Term, Signal::Kill] {
            self.refresh_processes();
            let sent = {
                let system = self.lock_system();
                match system.process(sysinfo::Pid::from_u32(pid)) {
                    Some(process) => {
                        debug!("sending {signal:?} to pid {pid}");
                        process.kill_with(signal).unwrap_or_else(|| process.kill())
                    }
                    None => return,
                }
            };
            if !sent {
                debug!("could not send {signal:?} to pid {pid}, it may already be gone");
            }
            if signal == Signal::Kill {
                return;
            }
            if self.wait_gone(pid, Duration::from_millis(500)) {
                return;
            }
        }
    }

    #[cfg(windows)]
    fn terminate_blocking(&self, pid: u32) {
        self.refresh_processes();
        if let Some(process) = self.lock_system().process(sysinfo::Pid::from_u32(pid)) {
            debug!("killing pid {pid}");
            process.kill();
        }
    }
}

#[async_trait]
impl ProcessControl for Procs {
    fn listening_pids(&self, port: u16) -> Vec<u32> {
        let pids = match listeners::get_processes_by_port(port) {
            Ok(processes) => processes.into_iter().map(|p| p.pid).sorted().collect(),
            Err(e) => {
                debug!("socket introspection unavailable for port {port}: {e}");
                vec![]
            }
        };
        if !pids.is_empty() {
            // pick up the listeners before anyone asks to describe them
            self.refresh_processes();
        }
        pids
    }

    fn describe(&self, pid: u32) -> String {
        let system = self.lock_system();
        let Some(process) = system.process(sysinfo::Pid::from_u32(pid)) else {
            return "(unknown)".to_string();
        };
        let cmd = process
            .cmd()
            .iter()
            .map(|part| part.to_string_lossy())
            .join(" ");
        if !cmd.trim().is_empty() {
            return cmd;
        }
        let name = process.name().to_string_lossy().to_string();
        if name.is_empty() {
            "(unknown)".to_string()
        } else {
            name
        }
    }

    async fn terminate(&self, pid: u32, dry_run: bool) {
        if dry_run {
            info!("dry-run: would terminate pid {pid}");
            return;
        }
        if let Err(e) = tokio::task::spawn_blocking(move || PROCS.terminate_blocking(pid)).await {
            warn!("terminate task for pid {pid} panicked: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_unknown_pid() {
        // PID u32::MAX is not a real process on any supported platform
        assert_eq!(PROCS.describe(u32::MAX - 1), "(unknown)");
    }

    #[tokio::test]
    async fn test_terminate_dry_run_leaves_process_alone() {
        let pid = std::process::id();
        PROCS.terminate(pid, true).await;
        PROCS.refresh_processes();
        assert!(PROCS.is_running(pid));
    }

    #[tokio::test]
    async fn test_terminate_missing_pid_is_success() {
        // must return without error for a pid that does not exist
        PROCS.terminate(u32::MAX - 2, false).await;
    }
}
