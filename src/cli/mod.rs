use crate::Result;
use clap::Parser;

mod list;
mod start;

#[derive(Debug, clap::Parser)]
#[clap(name = "portside", version, about = "Monorepo product startup with DX")]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    List(list::List),
    Start(start::Start),
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    match args.command {
        Command::List(list) => list.run().await,
        Command::Start(start) => start.run().await,
    }
}
