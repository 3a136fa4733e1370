//! Linear Regression
//!
//! Ordinary Least Squares with two exact solvers: Householder QR on the
//! design matrix and Cholesky on the normal equations. A rank-deficient
//! design is reported as an error rather than regularized away.

use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::metrics::regression::RegressionMetrics;

/// Errors that can occur during linear regression
#[derive(Error, Debug)]
pub enum LinearRegressionError {
    #[error("Matrix is singular and cannot be inverted")]
    SingularMatrix,

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Insufficient samples: need at least {needed}, got {got}")]
    InsufficientSamples { needed: usize, got: usize },

    #[error("Model has not been fitted yet")]
    NotFitted,
}

/// Least squares solver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Solver {
    /// Householder QR decomposition of the design matrix
    #[default]
    Qr,
    /// Cholesky decomposition of X'X
    NormalEquations,
}

/// Linear Regression model using Ordinary Least Squares
#[derive(Debug, Clone)]
pub struct LinearRegression {
    /// Coefficients (weights) for each feature
    pub coefficients: Option<Array1<f64>>,
    /// Intercept (bias) term
    pub intercept: Option<f64>,
    /// Whether to fit an intercept
    fit_intercept: bool,
    /// Solver used by `fit`
    solver: Solver,
    /// R-squared on the training data
    pub r_squared: Option<f64>,
    /// Feature names
    pub feature_names: Option<Vec<String>>,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LinearRegression {
    /// Create a new LinearRegression model
    ///
    /// # Arguments
    /// * `fit_intercept` - Whether to calculate the intercept
    pub fn new(fit_intercept: bool) -> Self {
        Self {
            coefficients: None,
            intercept: None,
            fit_intercept,
            solver: Solver::default(),
            r_squared: None,
            feature_names: None,
        }
    }

    /// Choose the least squares solver
    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    /// Set feature names for interpretation
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    /// Fit the model by minimizing the sum of squared residuals.
    ///
    /// With an intercept, features and target are centered first and the
    /// intercept is recovered as `mean(y) - mean(x) . beta`.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), LinearRegressionError> {
        if x.nrows() != y.len() {
            return Err(LinearRegressionError::DimensionMismatch {
                expected: x.nrows(),
                got: y.len(),
            });
        }

        let n_params = x.ncols() + usize::from(self.fit_intercept);
        if x.nrows() < n_params.max(1) {
            return Err(LinearRegressionError::InsufficientSamples {
                needed: n_params.max(1),
                got: x.nrows(),
            });
        }

        let (beta, intercept) = if self.fit_intercept {
            let x_mean = x.mean_axis(Axis(0)).ok_or(LinearRegressionError::InsufficientSamples {
                needed: 1,
                got: 0,
            })?;
            let y_mean = y.mean().unwrap_or(0.0);

            let x_centered = x - &x_mean;
            let y_centered = y - y_mean;

            let beta = self.solve(&x_centered, &y_centered)?;
            let intercept = y_mean - x_mean.dot(&beta);
            (beta, intercept)
        } else {
            (self.solve(x, y)?, 0.0)
        };

        debug!(
            "Fitted {} coefficients with {:?} solver, intercept {:.6}",
            beta.len(),
            self.solver,
            intercept
        );

        self.coefficients = Some(beta);
        self.intercept = Some(intercept);

        let predictions = self.predict(x)?;
        self.r_squared = Some(RegressionMetrics::r_squared(y, &predictions));

        Ok(())
    }

    fn solve(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<Array1<f64>, LinearRegressionError> {
        if x.ncols() == 0 {
            return Ok(Array1::zeros(0));
        }
        match self.solver {
            Solver::Qr => qr_solve(x, y),
            Solver::NormalEquations => {
                let xt = x.t();
                cholesky_solve(&xt.dot(x), &xt.dot(y))
            }
        }
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, LinearRegressionError> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(LinearRegressionError::NotFitted)?;
        let intercept = self.intercept.ok_or(LinearRegressionError::NotFitted)?;

        if x.ncols() != coefficients.len() {
            return Err(LinearRegressionError::DimensionMismatch {
                expected: coefficients.len(),
                got: x.ncols(),
            });
        }

        let predictions = x.dot(coefficients) + intercept;
        Ok(predictions)
    }

    /// Get model summary
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str("Linear Regression Summary\n");
        s.push_str("=========================\n\n");

        if let Some(ref coef) = self.coefficients {
            s.push_str(&format!("Intercept: {:.6}\n\n", self.intercept.unwrap_or(0.0)));
            s.push_str("Coefficients:\n");

            if let Some(ref names) = self.feature_names {
                for (i, (name, &c)) in names.iter().zip(coef.iter()).enumerate() {
                    s.push_str(&format!("  {:3}. {:20}: {:>12.6}\n", i + 1, name, c));
                }
            } else {
                for (i, &c) in coef.iter().enumerate() {
                    s.push_str(&format!("  {:3}. Feature {:2}: {:>12.6}\n", i + 1, i, c));
                }
            }

            s.push_str(&format!("\nR-squared: {:.6}\n", self.r_squared.unwrap_or(0.0)));
        } else {
            s.push_str("Model not fitted yet.\n");
        }

        s
    }
}

/// Relative tolerance below which a pivot counts as zero
fn rank_tolerance(max_pivot: f64, rows: usize, cols: usize) -> f64 {
    max_pivot * f64::EPSILON * rows.max(cols) as f64
}

/// Least squares via Householder QR: reduce `[X | y]` to `[R | Q'y]` and
/// back-substitute.
fn qr_solve(x: &Array2<f64>, y: &Array1<f64>) -> Result<Array1<f64>, LinearRegressionError> {
    let (n, p) = x.dim();
    let mut a = x.to_owned();
    let mut b = y.to_owned();

    for k in 0..p {
        let norm = a.slice(s![k.., k]).dot(&a.slice(s![k.., k])).sqrt();
        if norm == 0.0 {
            continue;
        }

        let alpha = if a[[k, k]] > 0.0 { -norm } else { norm };
        let mut v = a.slice(s![k.., k]).to_owned();
        v[0] -= alpha;
        let v_norm_sq = v.dot(&v);
        if v_norm_sq == 0.0 {
            continue;
        }

        for j in k..p {
            let f = 2.0 * v.dot(&a.slice(s![k.., j])) / v_norm_sq;
            a.slice_mut(s![k.., j]).scaled_add(-f, &v);
        }
        let f = 2.0 * v.dot(&b.slice(s![k..])) / v_norm_sq;
        b.slice_mut(s![k..]).scaled_add(-f, &v);
    }

    let diag: Vec<f64> = (0..p).map(|k| a[[k, k]].abs()).collect();
    let max_pivot = diag.iter().cloned().fold(0.0, f64::max);
    let tol = rank_tolerance(max_pivot, n, p);
    if max_pivot == 0.0 || diag.iter().any(|&d| d <= tol) {
        return Err(LinearRegressionError::SingularMatrix);
    }

    Ok(back_substitute(&a, b.slice(s![..p])))
}

/// Solve upper-triangular `R beta = z` using the leading `p x p` block of `r`
fn back_substitute(r: &Array2<f64>, z: ArrayView1<f64>) -> Array1<f64> {
    let p = z.len();
    let mut beta = Array1::<f64>::zeros(p);
    for i in (0..p).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..p {
            sum += r[[i, j]] * beta[j];
        }
        beta[i] = (z[i] - sum) / r[[i, i]];
    }
    beta
}

/// Solve the normal equations `A beta = b` with Cholesky `A = L L'`
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, LinearRegressionError> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    let max_diag = a.diag().iter().cloned().fold(0.0, f64::max);
    let tol = rank_tolerance(max_diag, n, n);

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= tol {
                    return Err(LinearRegressionError::SingularMatrix);
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Solve L * z = b (forward substitution)
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * z[j];
        }
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // Solve L' * beta = z (backward substitution)
    Ok(back_substitute(&l.t().to_owned(), z.view()))
}
