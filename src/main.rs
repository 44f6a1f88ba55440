use clap::{Parser, Subcommand};
use std::process;
use tracing::error;

mod cmd;

#[derive(Parser, Debug)]
#[command(author, version, about = "Parallel-tempering MCMC: cipher-key search and 2D Ising sampling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Recover a substitution-cipher key by replica-exchange MCMC.
    Decipher(cmd::decipher::DecipherArgs),
    /// Sample a 2D Ising lattice with a tempered chain pool.
    Ising(cmd::ising::IsingArgs),
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Decipher(args) => cmd::decipher::run(args),
        Commands::Ising(args) => cmd::ising::run(args),
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}
