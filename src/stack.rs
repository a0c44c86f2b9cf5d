//! Local stack coordination.
//!
//! The shared backend stack is started and stopped independently of any
//! product. The coordinator decides reuse vs. restart for a stack that is
//! already up, and for a cold start resolves stray listeners squatting on
//! the stack's own ports before invoking the start command: a stale,
//! incompatible process must not pass for "the stack is already up".
//!
//! Callers resolve all product-level conflicts before calling in here: the
//! stack start command emits unstructured output immediately, which would
//! corrupt any interactive prompt still in progress.

use crate::conflict::{PortBinding, collect_port_conflicts};
use crate::context::{RunContext, RunMode};
use crate::error::StackError;
use crate::procs::ProcessControl;
use crate::resolve::{ResolveOptions, resolve_port_conflicts_interactively};
use crate::ui::prompt::Prompt;
use crate::{Result, env, probe};
use async_trait::async_trait;
use std::collections::HashSet;

/// The stack's external start/stop routines.
#[async_trait]
pub trait StackCommands: Send + Sync {
    async fn start(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
    fn has_stop(&self) -> bool;
}

/// Production [`StackCommands`]: shell out, inheriting stdio so stack
/// output flows straight to the terminal.
pub struct ShellStackCommands {
    start: String,
    stop: Option<String>,
}

impl ShellStackCommands {
    pub fn new(stack: &crate::config::Stack) -> Self {
        Self {
            start: stack.start.clone(),
            stop: stack.stop.clone(),
        }
    }
}

#[async_trait]
impl StackCommands for ShellStackCommands {
    async fn start(&self) -> Result<()> {
        run_shell("start", &self.start).await
    }

    async fn stop(&self) -> Result<()> {
        match &self.stop {
            Some(command) => run_shell("stop", command).await,
            None => Ok(()),
        }
    }

    fn has_stop(&self) -> bool {
        self.stop.is_some()
    }
}

async fn run_shell(action: &str, command: &str) -> Result<()> {
    info!("stack {action}: {command}");
    let status = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .await
        .map_err(|e| StackError::SpawnFailed {
            action: action.to_string(),
            source: e,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(StackError::CommandFailed {
            action: action.to_string(),
            code: status.code(),
            help: None,
        }
        .into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
enum StackState {
    NotChecked,
    Reuse,
    Restart,
    FreshStart,
    Done,
}

pub struct LocalStackOpts<'a> {
    pub commands: Option<&'a dyn StackCommands>,
    pub ctx: &'a RunContext,
    pub stack_ports: &'a [PortBinding],
    pub procs: &'a dyn ProcessControl,
    pub prompt: &'a dyn Prompt,
}

#[derive(Debug)]
pub struct StackOutcome {
    /// Ports owned by the stack; product-level collection excluded these
    /// upstream, and the hand-off leaves them alone.
    pub ignore_ports: HashSet<u16>,
}

/// Bring the local stack into a usable state for this run.
pub async fn handle_local_stack(opts: LocalStackOpts<'_>) -> Result<StackOutcome> {
    let LocalStackOpts {
        commands,
        ctx,
        stack_ports,
        procs,
        prompt,
    } = opts;

    let Some(commands) = commands else {
        return Ok(StackOutcome {
            ignore_ports: HashSet::new(),
        });
    };
    if ctx.mode != RunMode::Local {
        return Ok(StackOutcome {
            ignore_ports: HashSet::new(),
        });
    }

    let ignore_ports: HashSet<u16> = stack_ports.iter().map(|b| b.port).collect();

    let mut state = StackState::NotChecked;
    debug!("local stack: {state}");

    let mut any_open = false;
    for binding in stack_ports {
        if probe::is_open(
            &env::PORTSIDE_PROBE_HOST,
            binding.port,
            *env::PORTSIDE_PROBE_TIMEOUT,
        )
        .await
        {
            debug!("stack port {} ({}) is open", binding.port, binding.service);
            any_open = true;
            break;
        }
    }

    if !any_open {
        state = StackState::FreshStart;
        debug!("local stack: {state}");
        if ctx.yes {
            info!("no local stack detected, starting it");
        } else {
            let start = prompt.confirm("no local stack detected, start it?", true)?;
            if !start {
                return Err(StackError::StartDeclined.into());
            }
        }
        // a stray listener on a stack port is not "the stack already up"
        resolve_stack_conflicts(stack_ports, ctx, procs, prompt).await?;
        start_stack(commands, ctx, stack_ports).await?;
    } else if !prompt.is_interactive() {
        // conservative default: an unattended run never kills a shared
        // development stack
        state = StackState::Reuse;
        debug!("local stack: {state}");
        info!("reusing the running local stack");
    } else {
        let choice = prompt.select(
            "the local stack is already running",
            &[
                "Reuse the running stack".to_string(),
                "Restart the stack".to_string(),
            ],
        )?;
        if choice == 0 {
            state = StackState::Reuse;
            debug!("local stack: {state}");
            info!("reusing the running local stack");
        } else {
            state = StackState::Restart;
            debug!("local stack: {state}");
            if ctx.dry_run {
                info!("dry-run: would restart the local stack");
            } else {
                if commands.has_stop() {
                    commands.stop().await?;
                }
                // listeners that survived the stop command refuse to die;
                // hand them to the resolver
                resolve_stack_conflicts(stack_ports, ctx, procs, prompt).await?;
                start_stack(commands, ctx, stack_ports).await?;
            }
        }
    }

    state = StackState::Done;
    debug!("local stack: {state}");
    Ok(StackOutcome { ignore_ports })
}

async fn resolve_stack_conflicts(
    stack_ports: &[PortBinding],
    ctx: &RunContext,
    procs: &dyn ProcessControl,
    prompt: &dyn Prompt,
) -> Result<()> {
    let mut conflicts = collect_port_conflicts(stack_ports, procs);
    resolve_port_conflicts_interactively(&mut conflicts, ResolveOptions::from(ctx), procs, prompt)
        .await
}

async fn start_stack(
    commands: &dyn StackCommands,
    ctx: &RunContext,
    stack_ports: &[PortBinding],
) -> Result<()> {
    if ctx.dry_run {
        info!("dry-run: would start the local stack");
        return Ok(());
    }
    commands.start().await?;
    if let Some(first) = stack_ports.first() {
        let up = probe::wait_for_open(
            &env::PORTSIDE_PROBE_HOST,
            first.port,
            *env::PORTSIDE_STACK_TIMEOUT,
            *env::PORTSIDE_PROBE_INTERVAL,
        )
        .await;
        if !up {
            warn!(
                "stack start command returned but port {} ({}) never opened",
                first.port, first.service
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_state_display() {
        assert_eq!(StackState::NotChecked.to_string(), "not-checked");
        assert_eq!(StackState::FreshStart.to_string(), "fresh-start");
        assert_eq!(StackState::Done.to_string(), "done");
    }
}
