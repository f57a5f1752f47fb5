use clap::{Arg, Command, arg};

pub const RAREFACTION_CMD: &str = "rarefaction";
pub const DEFAULT_OUT: &str = "pan_core_curve.csv.gz";

pub fn create_rarefaction_cli() -> Command {
    Command::new(RAREFACTION_CMD)
        .author("Databio")
        .about("Estimate pangenome and core-genome size curves over random genome orderings.")
        .arg(Arg::new("matrix").help(
            "Prefix of a persisted presence matrix (expects <prefix>_matrix.mtx.gz plus the gene and genome label files)",
        ))
        .arg(arg!(--iterations <n>).help("Number of independent random genome permutations"))
        .arg(arg!(--seed <seed>).help("Seed the random source for reproducible curves"))
        .arg(arg!(--output <output>))
        .arg(
            arg!(--fit <fit>)
                .help("Also fit Heaps' law per iteration plus the mean curve, writing the report here"),
        )
}
