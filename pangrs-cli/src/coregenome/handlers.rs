use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::Result;
use clap::ArgMatches;
use flate2::Compression;
use flate2::write::GzEncoder;

use pangrs_core::read_matrix_market;
use pangrs_coregenome::{BernoulliGridParams, compute_bernoulli_grid_core_genome};

pub fn run_coregenome(matches: &ArgMatches) -> Result<()> {
    // get arguments from CLI
    let matrix_prefix = matches
        .get_one::<String>("matrix")
        .expect("A presence matrix prefix is required.");

    let defaults = BernoulliGridParams::default();
    let params = BernoulliGridParams {
        prob_bounds: (
            parse_or(matches, "min-prob", defaults.prob_bounds.0)?,
            parse_or(matches, "max-prob", defaults.prob_bounds.1)?,
        ),
        init_capture_prob: parse_or(matches, "init", defaults.init_capture_prob)?,
        grid_steps: match matches.get_one::<String>("steps") {
            Some(s) => s.parse()?,
            None => defaults.grid_steps,
        },
    };

    let default_out = super::cli::DEFAULT_OUT.to_string();
    let output = matches.get_one::<String>("output").unwrap_or(&default_out);

    let matrix = read_matrix_market(matrix_prefix)?;
    let selection = compute_bernoulli_grid_core_genome(&matrix, &params, None)?;

    let file = File::create(output)?;
    let mut writer = BufWriter::new(GzEncoder::new(file, Compression::default()));
    for gene in &selection.core_genes {
        writeln!(writer, "{gene}")?;
    }
    writer.flush()?;

    if let Some(trace_out) = matches.get_one::<String>("trace") {
        let mut trace_writer = BufWriter::new(File::create(trace_out)?);
        serde_json::to_writer_pretty(&mut trace_writer, &selection)?;
        trace_writer.flush()?;
    }

    println!(
        "Selected capture probability {:.4} (objective {:.4}): {} of {} genes are core",
        selection.threshold,
        selection.objective,
        selection.core_genes.len(),
        matrix.num_genes()
    );

    Ok(())
}

fn parse_or(matches: &ArgMatches, id: &str, default: f64) -> Result<f64> {
    Ok(match matches.get_one::<String>(id) {
        Some(value) => value.parse()?,
        None => default,
    })
}
