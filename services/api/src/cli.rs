use crate::demo::{run_demo, run_items_list, DemoArgs, ItemsListArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use lostfound::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Community Lost & Found",
    about = "Run the community lost-and-found service or inspect its items from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect items stored in the configured database
    Items {
        #[command(subcommand)]
        command: ItemsCommand,
    },
    /// Walk an item through submission, approval, claim and unclaim in memory
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum ItemsCommand {
    /// List items newest first, optionally filtered by status
    List(ItemsListArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Items {
            command: ItemsCommand::List(args),
        } => run_items_list(args),
        Command::Demo(args) => run_demo(args),
    }
}
