//! The startup driver: one stateless negotiation ending in a hand-off.
//!
//! Sequencing is the load-bearing part. Product-level conflicts are fully
//! resolved before the local stack is touched, because the stack start
//! command emits background output immediately and an interactive prompt
//! must never have output injected into it. Stack-owned ports are excluded
//! from the product pass up front; the stack coordinator re-collects them
//! itself.

use crate::Result;
use crate::config::Product;
use crate::conflict::{PortBinding, collect_port_conflicts};
use crate::context::RunContext;
use crate::error::{ConfigError, StartupError};
use crate::procs::ProcessControl;
use crate::resolve::{ResolveOptions, resolve_port_conflicts_interactively};
use crate::stack::{LocalStackOpts, StackCommands, handle_local_stack};
use crate::ui::prompt::Prompt;
use itertools::Itertools;
use std::collections::HashSet;

pub struct LaunchOpts<'a> {
    pub product_name: &'a str,
    pub product: &'a Product,
    /// Ports owned by the local stack for this run (empty outside `local`
    /// mode).
    pub stack_ports: Vec<PortBinding>,
    pub stack_commands: Option<&'a dyn StackCommands>,
    pub ctx: &'a mut RunContext,
    pub procs: &'a dyn ProcessControl,
    pub prompt: &'a dyn Prompt,
}

/// The fully-negotiated product start command, ready to execute.
#[derive(Debug, Clone)]
pub struct Handoff {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl Handoff {
    pub fn command_line(&self) -> String {
        shell_words::join(std::iter::once(&self.program).chain(self.args.iter()))
    }

    /// Run the product's dev server, inheriting stdio, and report its exit
    /// code.
    pub async fn exec(self) -> Result<i32> {
        info!("starting {}", self.command_line());
        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .status()
            .await
            .map_err(|e| StartupError::SpawnFailed {
                program: self.program.clone(),
                source: e,
            })?;
        Ok(status.code().unwrap_or(1))
    }
}

/// Negotiate ports and the local stack for one product run.
pub async fn launch(opts: LaunchOpts<'_>) -> Result<Handoff> {
    let LaunchOpts {
        product_name,
        product,
        stack_ports,
        stack_commands,
        ctx,
        procs,
        prompt,
    } = opts;

    if !product.supports_mode(ctx.mode) {
        return Err(ConfigError::UnsupportedMode {
            product: product_name.to_string(),
            mode: ctx.mode.to_string(),
            supported: product.supported_modes(),
        }
        .into());
    }

    // stack-owned ports are the stack coordinator's to negotiate, never
    // product-level conflicts
    let stack_owned: HashSet<u16> = stack_ports.iter().map(|b| b.port).collect();
    let plan: Vec<PortBinding> = product
        .port_plan(ctx)?
        .into_iter()
        .filter(|binding| !stack_owned.contains(&binding.port))
        .collect();

    let mut conflicts = collect_port_conflicts(&plan, procs);
    resolve_port_conflicts_interactively(
        &mut conflicts,
        ResolveOptions::from(&*ctx),
        procs,
        prompt,
    )
    .await?;

    // fold reassignments back into the run's option values, once each
    for conflict in &conflicts {
        if let (Some(new_port), Some(key)) = (conflict.new_port, conflict.option.as_deref()) {
            ctx.set_option(key, new_port.to_string());
        }
    }

    let outcome = handle_local_stack(LocalStackOpts {
        commands: stack_commands,
        ctx,
        stack_ports: &stack_ports,
        procs,
        prompt,
    })
    .await?;
    if !outcome.ignore_ports.is_empty() {
        debug!(
            "stack owns port(s) {}",
            outcome.ignore_ports.iter().sorted().join(", ")
        );
    }

    build_handoff(product_name, product, ctx)
}

fn build_handoff(product_name: &str, product: &Product, ctx: &RunContext) -> Result<Handoff> {
    let argv = shell_words::split(&product.run).map_err(|e| ConfigError::InvalidRunCommand {
        product: product_name.to_string(),
        details: Some(e.to_string()),
    })?;
    let Some((program, args)) = argv.split_first() else {
        return Err(ConfigError::InvalidRunCommand {
            product: product_name.to_string(),
            details: Some("run command is empty".to_string()),
        }
        .into());
    };

    let mut env = vec![("PORTSIDE_MODE".to_string(), ctx.mode.to_string())];
    for (key, value) in &ctx.options {
        env.push((env_key(key), value.clone()));
    }

    Ok(Handoff {
        program: program.clone(),
        args: args.to_vec(),
        env,
    })
}

/// `port` → `PORT`, `api-url` → `API_URL`
fn env_key(option: &str) -> String {
    option.to_uppercase().replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunMode;

    fn product(run: &str) -> Product {
        toml::from_str(&format!("run = {run:?}")).unwrap()
    }

    #[test]
    fn test_build_handoff_injects_options_as_env() {
        let product = product("pnpm --filter web dev");
        let mut ctx = RunContext::default();
        ctx.mode = RunMode::Dev;
        ctx.set_option("port", "3890");
        ctx.set_option("api-url", "http://localhost:9099");

        let handoff = build_handoff("web", &product, &ctx).unwrap();
        assert_eq!(handoff.program, "pnpm");
        assert_eq!(handoff.args, vec!["--filter", "web", "dev"]);
        assert!(handoff.env.contains(&("PORTSIDE_MODE".to_string(), "dev".to_string())));
        assert!(handoff.env.contains(&("PORT".to_string(), "3890".to_string())));
        assert!(
            handoff
                .env
                .contains(&("API_URL".to_string(), "http://localhost:9099".to_string()))
        );
    }

    #[test]
    fn test_build_handoff_rejects_empty_run() {
        let product = product("");
        let ctx = RunContext::default();
        let err = build_handoff("web", &product, &ctx).unwrap_err();
        assert!(err.to_string().contains("web"));
    }

    #[test]
    fn test_command_line_quotes_arguments() {
        let handoff = Handoff {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo hi there".to_string()],
            env: vec![],
        };
        assert_eq!(handoff.command_line(), "sh -c 'echo hi there'");
    }
}
