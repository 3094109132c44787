use crate::demo::{run_catalog, run_demo, run_report, DemoArgs, ReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use faculty_appraisal::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Faculty Appraisal",
    about = "Run the faculty performance appraisal service and its reporting tools",
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
    /// Print the appraisal sections and their criteria
    Catalog,
    /// Print per-section completion for a stored submission record
    Report(ReportArgs),
    /// Walk through signup, submission and reviewer scoring in-process
    Demo(DemoArgs),
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
        Command::Catalog => {
            run_catalog();
            Ok(())
        }
        Command::Report(args) => run_report(args),
        Command::Demo(args) => run_demo(args),
    }
}
