use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::ArgMatches;
use flate2::Compression;
use flate2::write::GzEncoder;
use indicatif::{ProgressBar, ProgressStyle};

use pangrs_core::read_matrix_market;
use pangrs_rarefaction::{
    FitError, PanCoreCurve, consts, estimate_pan_core_size, fit_heaps_by_iteration, fit_heaps_mean,
};

pub fn run_rarefaction(matches: &ArgMatches) -> Result<()> {
    // get arguments from CLI
    let matrix_prefix = matches
        .get_one::<String>("matrix")
        .expect("A presence matrix prefix is required.");

    let iterations = match matches.get_one::<String>("iterations") {
        Some(n) => n.parse::<u32>()?,
        None => consts::DEFAULT_ITERATIONS,
    };
    let seed = matches
        .get_one::<String>("seed")
        .map(|s| s.parse::<u64>())
        .transpose()?;

    let default_out = super::cli::DEFAULT_OUT.to_string();
    let output = matches.get_one::<String>("output").unwrap_or(&default_out);

    let matrix = read_matrix_market(matrix_prefix)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed}] {msg}")
            .unwrap()
            .tick_strings(&["-", "\\", "|", "/"]),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!(
        "Sampling {iterations} orderings of {} genomes x {} genes...",
        matrix.num_genomes(),
        matrix.num_genes()
    ));

    let curve = estimate_pan_core_size(&matrix, iterations, seed)?;
    spinner.finish_with_message(format!("Wrote {} curve rows", curve.records().len()));

    curve.write_csv(output)?;

    if let Some(fit_out) = matches.get_one::<String>("fit") {
        write_fit_report(&curve, fit_out)?;
    }

    Ok(())
}

/// One row per fitted group plus a final row for the mean curve. Failed
/// groups keep their row with empty parameter fields and a status word,
/// so a batch is never silently shortened.
fn write_fit_report(curve: &PanCoreCurve, path: &str) -> Result<()> {
    let path_ref = Path::new(path);
    let file = File::create(path_ref)?;
    let mut writer: Box<dyn Write> = if path_ref.extension().is_some_and(|e| e == "gz") {
        Box::new(BufWriter::new(GzEncoder::new(file, Compression::default())))
    } else {
        Box::new(BufWriter::new(file))
    };

    writeln!(writer, "group,kappa,alpha,r_squared,status")?;
    for fit in fit_heaps_by_iteration(curve) {
        write_fit_row(&mut writer, &fit.iteration.to_string(), &fit.outcome)?;
    }
    write_fit_row(&mut writer, "mean", &fit_heaps_mean(curve))?;
    writer.flush()?;

    Ok(())
}

fn write_fit_row(
    writer: &mut dyn Write,
    group: &str,
    outcome: &Result<pangrs_rarefaction::HeapsFit, FitError>,
) -> Result<()> {
    match outcome {
        Ok(fit) => writeln!(
            writer,
            "{group},{},{},{},converged",
            fit.kappa, fit.alpha, fit.r_squared
        )?,
        Err(FitError::NotFittable(_)) => writeln!(writer, "{group},,,,not_fittable")?,
        Err(FitError::Convergence(_)) => writeln!(writer, "{group},,,,not_converged")?,
    }
    Ok(())
}
