#![allow(dead_code)]

use async_trait::async_trait;
use portside_cli::Result;
use portside_cli::procs::ProcessControl;
use portside_cli::stack::StackCommands;
use portside_cli::ui::prompt::Prompt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Shared event log asserting relative ordering across the fakes.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn index_of(log: &EventLog, event: &str) -> Option<usize> {
    log.lock().unwrap().iter().position(|e| e == event)
}

/// Scripted stand-in for the OS process layer.
pub struct FakeProcs {
    listeners: Mutex<HashMap<u16, Vec<(u32, String)>>>,
    immortal: Vec<u32>,
    pub killed: Mutex<Vec<u32>>,
    log: EventLog,
}

impl FakeProcs {
    pub fn new(log: EventLog) -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            immortal: vec![],
            killed: Mutex::new(vec![]),
            log,
        }
    }

    pub fn listen(self, port: u16, pid: u32, command: &str) -> Self {
        self.listeners
            .lock()
            .unwrap()
            .entry(port)
            .or_default()
            .push((pid, command.to_string()));
        self
    }

    /// A listener that survives every termination signal.
    pub fn immortal(mut self, pid: u32) -> Self {
        self.immortal.push(pid);
        self
    }
}

#[async_trait]
impl ProcessControl for FakeProcs {
    fn listening_pids(&self, port: u16) -> Vec<u32> {
        self.listeners
            .lock()
            .unwrap()
            .get(&port)
            .map(|l| l.iter().map(|(pid, _)| *pid).collect())
            .unwrap_or_default()
    }

    fn describe(&self, pid: u32) -> String {
        self.listeners
            .lock()
            .unwrap()
            .values()
            .flatten()
            .find(|(p, _)| *p == pid)
            .map(|(_, command)| command.clone())
            .unwrap_or_else(|| "(unknown)".to_string())
    }

    async fn terminate(&self, pid: u32, dry_run: bool) {
        self.log.lock().unwrap().push(format!("kill:{pid}"));
        if dry_run || self.immortal.contains(&pid) {
            return;
        }
        self.killed.lock().unwrap().push(pid);
        for listeners in self.listeners.lock().unwrap().values_mut() {
            listeners.retain(|(p, _)| *p != pid);
        }
    }
}

/// Scripted terminal: pops pre-seeded answers, records every prompt.
pub struct ScriptedPrompt {
    interactive: bool,
    selects: Mutex<VecDeque<usize>>,
    confirms: Mutex<VecDeque<bool>>,
    ports: Mutex<VecDeque<u16>>,
    log: EventLog,
}

impl ScriptedPrompt {
    pub fn interactive(log: EventLog) -> Self {
        Self {
            interactive: true,
            selects: Mutex::new(VecDeque::new()),
            confirms: Mutex::new(VecDeque::new()),
            ports: Mutex::new(VecDeque::new()),
            log,
        }
    }

    pub fn unattended(log: EventLog) -> Self {
        Self {
            interactive: false,
            ..Self::interactive(log)
        }
    }

    pub fn with_selects(self, answers: impl IntoIterator<Item = usize>) -> Self {
        self.selects.lock().unwrap().extend(answers);
        self
    }

    pub fn with_confirms(self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.confirms.lock().unwrap().extend(answers);
        self
    }

    pub fn with_ports(self, answers: impl IntoIterator<Item = u16>) -> Self {
        self.ports.lock().unwrap().extend(answers);
        self
    }
}

impl Prompt for ScriptedPrompt {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn select(&self, prompt: &str, _items: &[String]) -> Result<usize> {
        self.log.lock().unwrap().push(format!("select:{prompt}"));
        Ok(self.selects.lock().unwrap().pop_front().unwrap_or(0))
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        self.log.lock().unwrap().push(format!("confirm:{prompt}"));
        if !self.interactive {
            return Ok(default);
        }
        Ok(self.confirms.lock().unwrap().pop_front().unwrap_or(default))
    }

    fn input_port(&self, prompt: &str, default: u16) -> Result<u16> {
        self.log.lock().unwrap().push(format!("input:{prompt}"));
        Ok(self.ports.lock().unwrap().pop_front().unwrap_or(default))
    }
}

/// Recording stack routines; optionally binds a real listener on start so
/// post-start liveness waits succeed immediately.
pub struct FakeStack {
    log: EventLog,
    bind_on_start: Option<u16>,
}

impl FakeStack {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            bind_on_start: None,
        }
    }

    pub fn binds_on_start(mut self, port: u16) -> Self {
        self.bind_on_start = Some(port);
        self
    }
}

#[async_trait]
impl StackCommands for FakeStack {
    async fn start(&self) -> Result<()> {
        self.log.lock().unwrap().push("stack:start".to_string());
        if let Some(port) = self.bind_on_start {
            let listener = std::net::TcpListener::bind(("127.0.0.1", port)).unwrap();
            // keep the socket open for the rest of the test process
            std::mem::forget(listener);
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.log.lock().unwrap().push("stack:stop".to_string());
        Ok(())
    }

    fn has_stop(&self) -> bool {
        true
    }
}

/// Reserve a port that nothing is listening on.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
