use clap::{Arg, Command, arg};

pub const COREGENOME_CMD: &str = "coregenome";
pub const DEFAULT_OUT: &str = "core_genes.tsv.gz";

pub fn create_coregenome_cli() -> Command {
    Command::new(COREGENOME_CMD)
        .author("Databio")
        .about("Determine a core-genome gene set robust to missed gene calls via a Bernoulli capture-probability grid search.")
        .arg(Arg::new("matrix").help(
            "Prefix of a persisted presence matrix (expects <prefix>_matrix.mtx.gz plus the gene and genome label files)",
        ))
        .arg(arg!(--"min-prob" <min>).help("Lower bound of the capture-probability search interval"))
        .arg(arg!(--"max-prob" <max>).help("Upper bound of the capture-probability search interval"))
        .arg(arg!(--init <init>).help("Initial capture-probability guess seeding the search"))
        .arg(arg!(--steps <steps>).help("Number of grid intervals spanning the bounds"))
        .arg(arg!(--output <output>))
        .arg(arg!(--trace <trace>).help("Write the full grid-search trace as JSON for auditing"))
}
