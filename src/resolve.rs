//! Conflict resolution policy.
//!
//! Conflicts are resolved strictly one at a time: interactive selection is
//! inherently serial, and killing one port's listeners must not race with
//! inspecting another. Every fatal outcome unwinds the whole run; a process
//! killed before an abort stays dead.

use crate::Result;
use crate::conflict::Conflict;
use crate::context::RunContext;
use crate::error::ConflictError;
use crate::procs::ProcessControl;
use crate::ui::prompt::Prompt;
use crate::ui::table::print_conflict_summary;

#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Forced-kill mode: kill every conflict's listeners without asking.
    pub kill: bool,
    /// Blanket auto-confirm.
    pub yes: bool,
    pub dry_run: bool,
}

impl From<&RunContext> for ResolveOptions {
    fn from(ctx: &RunContext) -> Self {
        Self {
            kill: ctx.kill,
            yes: ctx.yes,
            dry_run: ctx.dry_run,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Kill,
    Reassign,
    Abort,
}

/// Decide and execute an action for each conflict: kill its listeners,
/// reassign to a new port (flexible bindings only, written to
/// `conflict.new_port`), or abort the run. Raises on: forced-kill without
/// confirmation in a non-interactive session, an explicit abort, a declined
/// kill, or a port still occupied after kill attempts.
pub async fn resolve_port_conflicts_interactively(
    conflicts: &mut [Conflict],
    opts: ResolveOptions,
    procs: &dyn ProcessControl,
    prompt: &dyn Prompt,
) -> Result<()> {
    if conflicts.is_empty() {
        return Ok(());
    }

    if !prompt.is_interactive() {
        // Without a terminal there is no per-conflict choice: the run must
        // be in forced-kill mode, and killing still needs blanket consent.
        if !opts.kill {
            return Err(ConflictError::NoTerminal.into());
        }
        if !opts.yes {
            return Err(ConflictError::KillNotConfirmed.into());
        }
    }

    print_conflict_summary(conflicts)?;

    for conflict in conflicts.iter_mut() {
        if opts.kill {
            kill_listeners(conflict, opts, procs).await?;
            continue;
        }

        match choose_action(conflict, prompt)? {
            Action::Kill => {
                if !opts.yes {
                    let confirmed = prompt.confirm(
                        &format!(
                            "kill {} process(es) using port {}?",
                            conflict.listeners.len(),
                            conflict.port
                        ),
                        false,
                    )?;
                    if !confirmed {
                        return Err(ConflictError::KillDeclined {
                            port: conflict.port,
                        }
                        .into());
                    }
                }
                kill_listeners(conflict, opts, procs).await?;
            }
            Action::Reassign => {
                let new_port = prompt.input_port(
                    &format!("new port for {}", conflict.service),
                    conflict.port.saturating_add(1),
                )?;
                // deliberately not re-inspected for conflicts of its own;
                // the product fails fast on bind if the pick was bad
                conflict.new_port = Some(new_port);
                info!("{} will use port {new_port}", conflict.service);
            }
            Action::Abort => return Err(ConflictError::Aborted.into()),
        }
    }

    Ok(())
}

fn choose_action(conflict: &Conflict, prompt: &dyn Prompt) -> Result<Action> {
    let mut actions = vec![(
        Action::Kill,
        format!(
            "Kill the {} process(es) using port {}",
            conflict.listeners.len(),
            conflict.port
        ),
    )];
    if conflict.flexible {
        actions.push((
            Action::Reassign,
            format!("Use a different port for {}", conflict.service),
        ));
    }
    actions.push((Action::Abort, "Abort".to_string()));

    let items: Vec<String> = actions.iter().map(|(_, label)| label.clone()).collect();
    let choice = prompt.select(
        &format!("port {} is in use ({})", conflict.port, conflict.service),
        &items,
    )?;
    Ok(actions[choice].0)
}

/// Terminate every listener, then re-inspect. Signals are asynchronous and
/// best-effort, so the re-inspection is mandatory: a surviving listener
/// means the product would be handed a port it cannot bind.
async fn kill_listeners(
    conflict: &Conflict,
    opts: ResolveOptions,
    procs: &dyn ProcessControl,
) -> Result<()> {
    for listener in &conflict.listeners {
        info!(
            "terminating pid {} ({}) on port {}",
            listener.pid, listener.command, conflict.port
        );
        procs.terminate(listener.pid, opts.dry_run).await;
    }

    if opts.dry_run {
        return Ok(());
    }

    let remaining = procs.listening_pids(conflict.port);
    if remaining.is_empty() {
        Ok(())
    } else {
        Err(ConflictError::PortStillInUse {
            port: conflict.port,
            listeners: remaining.into_iter().map(|pid| procs.describe(pid)).collect(),
        }
        .into())
    }
}
