mod coregenome;
mod rarefaction;

use anyhow::Result;
use clap::Command;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PKG_NAME: &str = "pangrs";
    pub const BIN_NAME: &str = "pangrs";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .author("Databio")
        .about("Pangenome rarefaction curves, Heaps' law fits, and probabilistic core-genome estimation from gene presence/absence matrices.")
        .subcommand_required(true)
        .subcommand(rarefaction::cli::create_rarefaction_cli())
        .subcommand(coregenome::cli::create_coregenome_cli())
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    match matches.subcommand() {
        //
        // RAREFACTION
        //
        Some((rarefaction::cli::RAREFACTION_CMD, matches)) => {
            rarefaction::handlers::run_rarefaction(matches)?;
        }

        //
        // CORE GENOME
        //
        Some((coregenome::cli::COREGENOME_CMD, matches)) => {
            coregenome::handlers::run_coregenome(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}
