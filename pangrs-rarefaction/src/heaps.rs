//! Heaps'-law fitting of pangenome growth curves.
//!
//! The model is the two-parameter power law P(N) ≈ κ·N^α. An open
//! pangenome is expected to show α in (0, 1); values outside [0, 1] are
//! reported as-is and left for callers to flag, since they usually mean
//! the model fits the curve poorly.

use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use thiserror::Error;

use crate::consts::{FIT_GRAD_TOL, FIT_STEP_TOL, MAX_FIT_ITERATIONS};
use crate::curve::PanCoreCurve;

/// A fitted power-law growth model for one curve.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeapsFit {
    /// Scale coefficient κ.
    pub kappa: f64,
    /// Growth exponent α. Not clamped to [0, 1].
    pub alpha: f64,
    /// Coefficient of determination on the original (not log) scale.
    pub r_squared: f64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FitError {
    /// The curve cannot support a two-parameter fit at all; no fit was
    /// attempted.
    #[error("curve is not fittable: {0}")]
    NotFittable(&'static str),

    /// A fit was attempted but the optimizer did not converge within its
    /// iteration budget. The unconverged estimate is discarded.
    #[error("fit did not converge within {0} iterations")]
    Convergence(usize),
}

/// Per-iteration fit outcome. Failed groups never abort the batch;
/// callers inspect each outcome independently.
#[derive(Debug, Clone)]
pub struct IterationFit {
    pub iteration: u32,
    pub outcome: Result<HeapsFit, FitError>,
}

/// Fit Heaps' law to each iteration's pangenome-size curve
/// independently. Returns one outcome per iteration id, in iteration
/// order; no information is shared across groups.
pub fn fit_heaps_by_iteration(curve: &PanCoreCurve) -> Vec<IterationFit> {
    let mut groups: BTreeMap<u32, Vec<(f64, f64)>> = BTreeMap::new();
    for record in curve.records() {
        groups
            .entry(record.iteration)
            .or_default()
            .push((record.genomes_sampled as f64, record.pan_size as f64));
    }
    let groups: Vec<(u32, Vec<(f64, f64)>)> = groups.into_iter().collect();

    let fit_group = |(iteration, points): (u32, Vec<(f64, f64)>)| IterationFit {
        iteration,
        outcome: fit_power_law(&points),
    };

    #[cfg(feature = "parallel")]
    let fits: Vec<IterationFit> = groups.into_par_iter().map(fit_group).collect();
    #[cfg(not(feature = "parallel"))]
    let fits: Vec<IterationFit> = groups.into_iter().map(fit_group).collect();
    fits
}

/// Fit Heaps' law to the across-iteration mean pangenome curve.
pub fn fit_heaps_mean(curve: &PanCoreCurve) -> Result<HeapsFit, FitError> {
    let points: Vec<(f64, f64)> = curve
        .mean_pan_sizes()
        .into_iter()
        .map(|(n, pan)| (n as f64, pan))
        .collect();
    fit_power_law(&points)
}

/// Nonlinear least-squares fit of P(N) = κ·N^α.
///
/// Initialized by log-linear least squares over the P > 0 points, then
/// refined by damped Gauss-Newton on the untransformed residuals.
fn fit_power_law(points: &[(f64, f64)]) -> Result<HeapsFit, FitError> {
    if distinct_x(points) < 2 {
        return Err(FitError::NotFittable("fewer than two distinct sample sizes"));
    }
    if points.iter().all(|&(_, y)| y == 0.0) {
        return Err(FitError::NotFittable("pangenome sizes are all zero"));
    }

    let log_points: Vec<(f64, f64)> = points
        .iter()
        .filter(|&&(_, y)| y > 0.0)
        .map(|&(x, y)| (x.ln(), y.ln()))
        .collect();
    if distinct_x(&log_points) < 2 {
        return Err(FitError::NotFittable(
            "fewer than two distinct sample sizes with nonzero pangenome",
        ));
    }

    let (intercept, slope) = linear_least_squares(&log_points);
    let mut kappa = intercept.exp();
    let mut alpha = slope;
    let mut sse = sum_squared_error(points, kappa, alpha);

    let mut converged = false;
    for _ in 0..MAX_FIT_ITERATIONS {
        // 2x2 normal equations of the Gauss-Newton step
        let (mut jtj00, mut jtj01, mut jtj11) = (0.0f64, 0.0f64, 0.0f64);
        let (mut jtr0, mut jtr1) = (0.0f64, 0.0f64);
        for &(x, y) in points {
            let nx = x.powf(alpha);
            let residual = y - kappa * nx;
            let j0 = nx;
            let j1 = kappa * nx * x.ln();
            jtj00 += j0 * j0;
            jtj01 += j0 * j1;
            jtj11 += j1 * j1;
            jtr0 += j0 * residual;
            jtr1 += j1 * residual;
        }

        let grad_norm = (jtr0 * jtr0 + jtr1 * jtr1).sqrt();
        if grad_norm <= FIT_GRAD_TOL * (1.0 + sse) {
            converged = true;
            break;
        }

        let det = jtj00 * jtj11 - jtj01 * jtj01;
        if !det.is_finite() || det.abs() < f64::MIN_POSITIVE {
            break;
        }
        let delta_kappa = (jtj11 * jtr0 - jtj01 * jtr1) / det;
        let delta_alpha = (jtj00 * jtr1 - jtj01 * jtr0) / det;

        // step halving keeps κ positive and the error non-increasing
        let mut scale = 1.0;
        let mut improved = false;
        for _ in 0..30 {
            let kappa_try = kappa + scale * delta_kappa;
            let alpha_try = alpha + scale * delta_alpha;
            if kappa_try > 0.0 {
                let sse_try = sum_squared_error(points, kappa_try, alpha_try);
                if sse_try <= sse {
                    kappa = kappa_try;
                    alpha = alpha_try;
                    sse = sse_try;
                    improved = true;
                    break;
                }
            }
            scale *= 0.5;
        }
        if !improved {
            break;
        }

        let step = (scale * delta_kappa / kappa.abs().max(f64::MIN_POSITIVE))
            .abs()
            .max((scale * delta_alpha).abs());
        if step < FIT_STEP_TOL {
            converged = true;
            break;
        }
    }

    if !converged {
        return Err(FitError::Convergence(MAX_FIT_ITERATIONS));
    }

    Ok(HeapsFit {
        kappa,
        alpha,
        r_squared: r_squared(points, sse),
    })
}

fn distinct_x(points: &[(f64, f64)]) -> usize {
    let mut xs: Vec<f64> = points.iter().map(|&(x, _)| x).collect();
    xs.sort_by(f64::total_cmp);
    xs.dedup();
    xs.len()
}

/// Closed-form simple linear regression, returning (intercept, slope).
/// Callers guarantee at least two distinct x values.
fn linear_least_squares(points: &[(f64, f64)]) -> (f64, f64) {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|&(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|&(_, y)| y).sum::<f64>() / n;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for &(x, y) in points {
        sxx += (x - mean_x) * (x - mean_x);
        sxy += (x - mean_x) * (y - mean_y);
    }
    let slope = sxy / sxx;
    (mean_y - slope * mean_x, slope)
}

fn sum_squared_error(points: &[(f64, f64)], kappa: f64, alpha: f64) -> f64 {
    points
        .iter()
        .map(|&(x, y)| {
            let residual = y - kappa * x.powf(alpha);
            residual * residual
        })
        .sum()
}

fn r_squared(points: &[(f64, f64)], sse: f64) -> f64 {
    let n = points.len() as f64;
    let mean_y = points.iter().map(|&(_, y)| y).sum::<f64>() / n;
    let sst: f64 = points
        .iter()
        .map(|&(_, y)| (y - mean_y) * (y - mean_y))
        .sum();
    if sst == 0.0 {
        // flat curve: an exact fit is perfect, anything else explains
        // nothing
        if sse < 1e-9 { 1.0 } else { 0.0 }
    } else {
        1.0 - sse / sst
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::curve::{CurveRecord, PanCoreCurve};
    use pretty_assertions::assert_eq;

    fn curve_from_pan(groups: &[(u32, &[u64])]) -> PanCoreCurve {
        let mut records = Vec::new();
        for &(iteration, pans) in groups {
            for (k, &pan) in pans.iter().enumerate() {
                records.push(CurveRecord {
                    iteration,
                    genomes_sampled: (k + 1) as u32,
                    pan_size: pan,
                    core_size: 0,
                });
            }
        }
        PanCoreCurve::new(records)
    }

    #[test]
    fn constant_curve_fits_zero_exponent() {
        let curve = curve_from_pan(&[(0, &[40, 40, 40, 40, 40])]);
        let fits = fit_heaps_by_iteration(&curve);
        assert_eq!(fits.len(), 1);
        let fit = fits[0].outcome.as_ref().expect("constant curve should fit");
        assert!(fit.alpha.abs() < 1e-6, "alpha = {}", fit.alpha);
        assert!((fit.kappa - 40.0).abs() < 1e-6, "kappa = {}", fit.kappa);
        assert!(fit.r_squared > 0.999);
    }

    #[test]
    fn linear_curve_fits_unit_exponent() {
        let curve = curve_from_pan(&[(0, &[2, 4, 6, 8, 10])]);
        let fit = fit_heaps_mean(&curve).expect("linear curve should fit");
        assert!((fit.alpha - 1.0).abs() < 1e-6, "alpha = {}", fit.alpha);
        assert!((fit.kappa - 2.0).abs() < 1e-6, "kappa = {}", fit.kappa);
        assert!(fit.r_squared > 0.999);
    }

    #[test]
    fn recovers_known_power_law() {
        let points: Vec<u64> = (1..=20)
            .map(|n| (3.0 * (n as f64).powf(0.6)).round() as u64)
            .collect();
        let curve = curve_from_pan(&[(0, &points)]);
        let fit = fit_heaps_mean(&curve).expect("power-law curve should fit");
        assert!((fit.alpha - 0.6).abs() < 0.05, "alpha = {}", fit.alpha);
        assert!(fit.r_squared > 0.99);
    }

    #[test]
    fn single_sample_size_is_not_fittable_but_other_groups_still_fit() {
        let curve = curve_from_pan(&[(0, &[17]), (1, &[2, 4, 6, 8])]);
        let fits = fit_heaps_by_iteration(&curve);
        assert_eq!(fits.len(), 2);

        assert_eq!(fits[0].iteration, 0);
        assert!(matches!(
            fits[0].outcome,
            Err(FitError::NotFittable("fewer than two distinct sample sizes"))
        ));

        assert_eq!(fits[1].iteration, 1);
        let fit = fits[1].outcome.as_ref().expect("group 1 should fit");
        assert!((fit.alpha - 1.0).abs() < 1e-6);
    }

    #[test]
    fn all_zero_curve_is_not_fittable() {
        let curve = curve_from_pan(&[(0, &[0, 0, 0])]);
        let fits = fit_heaps_by_iteration(&curve);
        assert!(matches!(
            fits[0].outcome,
            Err(FitError::NotFittable("pangenome sizes are all zero"))
        ));
    }

    #[test]
    fn empty_curve_yields_no_groups() {
        let fits = fit_heaps_by_iteration(&PanCoreCurve::default());
        assert!(fits.is_empty());
    }
}
