use crate::infra::parse_seed;
use crate::server;
use crate::simulate::{run_simulation, SimulateArgs};
use clap::{Args, Parser, Subcommand};
use program_allocation::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Program Allocation",
    about = "Collect ranked program choices and allocate applicants within capacity",
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
    /// Generate synthetic applicants, allocate once, and verify the placements
    Simulate(SimulateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Pin the allocation tie-break seed for reproducible runs
    #[arg(long, value_parser = parse_seed)]
    pub(crate) seed: Option<u64>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Simulate(args) => run_simulation(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["program-allocation-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn serve_accepts_overrides() {
        let cli = Cli::try_parse_from([
            "program-allocation-api",
            "serve",
            "--port",
            "8080",
            "--seed",
            "42",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.port, Some(8080));
                assert_eq!(args.seed, Some(42));
                assert!(args.host.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn simulate_uses_defaults() {
        let cli = Cli::try_parse_from(["program-allocation-api", "simulate", "--csv", "out.csv"])
            .expect("parses");

        match cli.command {
            Some(Command::Simulate(args)) => {
                assert_eq!(args.students, 100);
                assert_eq!(args.resubmissions, 10);
                assert!(args.seed.is_none());
                assert_eq!(args.csv.as_deref(), Some(std::path::Path::new("out.csv")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_non_numeric_seed() {
        let parsed = Cli::try_parse_from(["program-allocation-api", "serve", "--seed", "abc"]);
        assert!(parsed.is_err());
    }
}
