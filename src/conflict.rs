//! Port-conflict model and collector.
//!
//! A [`PortBinding`] declares that a named service wants a port; a
//! [`Conflict`] is a binding with at least one OS process already listening.
//! Conflicts are owned by the resolution pass that created them: listeners
//! are recomputed on every collection and never cached across passes, since
//! a process may die and respawn between steps.

use crate::procs::ProcessControl;

/// A declared desire to use a specific network port for a named service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    pub port: u16,
    pub service: String,
    /// Whether a substitute port is acceptable.
    pub flexible: bool,
    /// Option key a reassigned port is written back under.
    pub option: Option<String>,
}

impl PortBinding {
    pub fn new(port: u16, service: impl Into<String>) -> Self {
        Self {
            port,
            service: service.into(),
            flexible: false,
            option: None,
        }
    }
}

/// A process currently listening on a conflicted port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub pid: u32,
    pub command: String,
}

/// A port binding with live listeners. `new_port` is written at most once
/// by the resolver when the user reassigns, and folded into the run's
/// option values by the driver before hand-off.
#[derive(Debug, Clone)]
pub struct Conflict {
    pub port: u16,
    pub service: String,
    pub flexible: bool,
    pub option: Option<String>,
    pub listeners: Vec<Listener>,
    pub new_port: Option<u16>,
}

impl Conflict {
    fn new(binding: &PortBinding, listeners: Vec<Listener>) -> Self {
        Self {
            port: binding.port,
            service: binding.service.clone(),
            flexible: binding.flexible,
            option: binding.option.clone(),
            listeners,
            new_port: None,
        }
    }
}

/// Inspect every binding in plan order and keep the ones with live
/// listeners. Output order matches input order; bindings with no listeners
/// are dropped.
pub fn collect_port_conflicts(
    plan: &[PortBinding],
    procs: &dyn ProcessControl,
) -> Vec<Conflict> {
    plan.iter()
        .filter_map(|binding| {
            let listeners: Vec<Listener> = procs
                .listening_pids(binding.port)
                .into_iter()
                .map(|pid| Listener {
                    pid,
                    command: procs.describe(pid),
                })
                .collect();
            if listeners.is_empty() {
                None
            } else {
                debug!(
                    "port {} ({}) is in use by {} process(es)",
                    binding.port,
                    binding.service,
                    listeners.len()
                );
                Some(Conflict::new(binding, listeners))
            }
        })
        .collect()
}
