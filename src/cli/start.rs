use crate::config::PortsideToml;
use crate::context::{RunContext, RunMode, parse_option_overrides};
use crate::procs::PROCS;
use crate::stack::{ShellStackCommands, StackCommands};
use crate::startup::{LaunchOpts, launch};
use crate::ui::prompt::{Prompt, TtyPrompt};
use crate::Result;
use miette::ensure;

/// Starts a product from a portside.toml file
#[derive(Debug, clap::Args)]
#[clap(
    visible_alias = "s",
    verbatim_doc_comment,
    long_about = "\
Starts a product from a portside.toml file

Detects port conflicts against already-running processes and negotiates a
resolution (kill, reassign, or abort) before anything starts emitting
output. In local mode the shared backend stack is brought up (or reused)
first, then the product's own dev server takes over the terminal.

Examples:
  portside start                  Pick a product interactively
  portside start web              Start the 'web' product in local mode
  portside start web --mode dev   Target the shared dev backend
  portside start web -k -y        Kill conflicting listeners unattended
  portside start web -o port=3890 Override the 'port' option up front
  portside start web --dry-run    Negotiate only; kill and start nothing"
)]
pub struct Start {
    /// Name of the product in portside.toml to start
    product: Option<String>,
    /// Run mode to start the product in
    #[clap(long, short, value_enum, default_value_t = RunMode::Local, env = "PORTSIDE_MODE")]
    mode: RunMode,
    /// Kill conflicting listeners without per-conflict prompting
    #[clap(long, short)]
    kill: bool,
    /// Answer yes to every confirmation
    #[clap(long, short)]
    yes: bool,
    /// Negotiate conflicts but do not kill processes or run commands
    #[clap(long)]
    dry_run: bool,
    /// Option overrides passed to the product (key=value)
    #[clap(short = 'o', long = "option", value_name = "KEY=VALUE")]
    options: Vec<String>,
}

impl Start {
    pub async fn run(&self) -> Result<()> {
        let config = PortsideToml::load()?;
        let prompt = TtyPrompt;

        let product_name = self.pick_product(&config, &prompt)?;
        let product = config.product(&product_name)?;

        let mut ctx = RunContext {
            mode: self.mode,
            kill: self.kill,
            yes: self.yes,
            dry_run: self.dry_run,
            options: parse_option_overrides(&self.options)?,
        };

        let stack_ports = config.stack_ports(&ctx);
        let shell_commands = config.stack.as_ref().map(ShellStackCommands::new);
        let stack_commands = shell_commands
            .as_ref()
            .map(|commands| commands as &dyn StackCommands);

        let handoff = launch(LaunchOpts {
            product_name: &product_name,
            product,
            stack_ports,
            stack_commands,
            ctx: &mut ctx,
            procs: &*PROCS,
            prompt: &prompt,
        })
        .await?;

        if self.dry_run {
            info!("dry-run: would start {}", handoff.command_line());
            for (key, value) in &handoff.env {
                info!("dry-run:   {key}={value}");
            }
            return Ok(());
        }

        let code = handoff.exec().await?;
        if code != 0 {
            std::process::exit(code);
        }
        Ok(())
    }

    fn pick_product(&self, config: &PortsideToml, prompt: &dyn Prompt) -> Result<String> {
        if let Some(product) = &self.product {
            return Ok(product.clone());
        }
        let names: Vec<String> = config.products.keys().cloned().collect();
        if names.is_empty() {
            return Err(crate::error::ConfigError::NoProducts {
                path: config.path.display().to_string(),
            }
            .into());
        }
        ensure!(
            prompt.is_interactive(),
            "a product name is required in non-interactive sessions"
        );
        let choice = prompt.select("select a product", &names)?;
        Ok(names[choice].clone())
    }
}
