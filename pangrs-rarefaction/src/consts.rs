/// Default number of random genome permutations.
pub const DEFAULT_ITERATIONS: u32 = 10;

/// Gauss-Newton refinement budget for one power-law fit.
pub const MAX_FIT_ITERATIONS: usize = 50;

/// Relative parameter-step tolerance for fit convergence.
pub const FIT_STEP_TOL: f64 = 1e-10;

/// Gradient-norm tolerance for fit convergence.
pub const FIT_GRAD_TOL: f64 = 1e-12;
