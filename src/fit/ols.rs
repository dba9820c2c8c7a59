//! Ordinary least squares with marginal and sequential inference.
//!
//! The design matrix is `[1, x, z, xz]`. Normal equations are solved by
//! Cholesky; a factorization failure means the design is rank deficient,
//! which surfaces as a fitting error rather than a panic.

use nalgebra::{Cholesky, DMatrix, DVector};

use super::dist;
use super::TermTests;
use crate::design::SimulatedDataset;
use crate::error::{PowerError, PowerResult};

/// One fitted least-squares model.
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// Coefficients, intercept first.
    pub coefficients: Vec<f64>,
    /// Standard errors, intercept first.
    pub standard_errors: Vec<f64>,
    /// Residual sum of squares.
    pub rss: f64,
    /// Residual degrees of freedom.
    pub df: f64,
}

/// Build the design matrix with a leading intercept column.
fn design_matrix(n: usize, columns: &[&[f64]]) -> DMatrix<f64> {
    let p = columns.len() + 1;
    DMatrix::from_fn(n, p, |i, j| if j == 0 { 1.0 } else { columns[j - 1][i] })
}

/// Fit a least-squares regression of `y` on the given predictor columns.
///
/// # Errors
///
/// Returns a fitting error when there are too few observations or the
/// design matrix is rank deficient.
pub fn fit_ols(y: &[f64], columns: &[&[f64]]) -> PowerResult<OlsFit> {
    let n = y.len();
    let p = columns.len() + 1;
    if n <= p {
        return Err(PowerError::fit(format!(
            "need more than {p} observations to fit {p} coefficients, got {n}"
        )));
    }

    let x = design_matrix(n, columns);
    let yv = DVector::from_column_slice(y);

    let xtx = x.transpose() * &x;
    let xty = x.transpose() * &yv;

    let chol = Cholesky::new(xtx)
        .ok_or_else(|| PowerError::fit("design matrix is rank deficient"))?;

    // A tiny Cholesky pivot means near-collinear columns that slipped past
    // the positive-definiteness check on rounding alone.
    let l = chol.l();
    let max_pivot = (0..p).map(|j| l[(j, j)]).fold(0.0_f64, f64::max);
    let min_pivot = (0..p).map(|j| l[(j, j)]).fold(f64::INFINITY, f64::min);
    if min_pivot <= 1e-8 * max_pivot {
        return Err(PowerError::fit("design matrix is rank deficient"));
    }

    let beta = chol.solve(&xty);

    let residuals = &yv - &x * &beta;
    let rss = residuals.norm_squared();
    let df = (n - p) as f64;
    let sigma2 = rss / df;

    let xtx_inv = chol.inverse();
    let standard_errors = (0..p)
        .map(|j| (sigma2 * xtx_inv[(j, j)]).sqrt())
        .collect();

    Ok(OlsFit {
        coefficients: beta.iter().copied().collect(),
        standard_errors,
        rss,
        df,
    })
}

/// Marginal (simultaneous) t-tests: each term controls for the other two.
///
/// # Errors
///
/// Propagates fitting errors from the full-model fit.
pub fn simultaneous_tests(data: &SimulatedDataset) -> PowerResult<TermTests> {
    let fit = fit_ols(&data.y, &[&data.x, &data.z, &data.xz])?;

    let p_of = |j: usize| {
        let t = fit.coefficients[j] / fit.standard_errors[j];
        dist::student_t_two_sided(t, fit.df)
    };

    Ok(TermTests {
        x: p_of(1),
        z: p_of(2),
        xz: p_of(3),
    })
}

/// Sequential (type-I) F-tests in the fixed order X, Z, XZ.
///
/// Each term's sum of squares is its reduction in residual variance over
/// the model containing the earlier-listed terms, tested against the
/// full-model mean square. Shared variance goes to earlier terms; the
/// last-listed term's test coincides with its marginal test.
///
/// # Errors
///
/// Propagates fitting errors from the nested model fits.
pub fn sequential_tests(data: &SimulatedDataset) -> PowerResult<TermTests> {
    let y = &data.y;
    let n = y.len() as f64;

    // Intercept-only residual: total corrected sum of squares
    let mean = y.iter().sum::<f64>() / n;
    let rss0 = y.iter().map(|v| (v - mean).powi(2)).sum::<f64>();

    let fit1 = fit_ols(y, &[&data.x])?;
    let fit2 = fit_ols(y, &[&data.x, &data.z])?;
    let fit3 = fit_ols(y, &[&data.x, &data.z, &data.xz])?;

    let mse = fit3.rss / fit3.df;
    let p_of = |ss: f64| dist::f_upper_tail(ss / mse, 1.0, fit3.df);

    Ok(TermTests {
        x: p_of(rss0 - fit1.rss),
        z: p_of(fit1.rss - fit2.rss),
        xz: p_of(fit2.rss - fit3.rss),
    })
}
