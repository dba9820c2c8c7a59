//! Random-intercept linear mixed model.
//!
//! Fits `y = Xb + u[subject] + e` with `u ~ N(0, s_u^2)` and
//! `e ~ N(0, s_e^2)` by profiled REML: the variance ratio
//! `theta = s_u^2 / s_e^2` is the only free parameter, optimized by
//! golden-section search, with the fixed effects and residual scale
//! profiled out in closed form.
//!
//! Within one subject the marginal covariance is compound symmetric,
//! `V_g = I + theta * J`, whose inverse and determinant have closed forms:
//!
//! ```text
//! V_g^{-1} = I - (theta / (1 + theta * m_g)) * J
//! |V_g|    = 1 + theta * m_g
//! ```
//!
//! so no per-iteration matrix factorization beyond the 4x4 GLS system is
//! needed.

use nalgebra::{Cholesky, DMatrix, DVector};

use super::dist;
use super::TermTests;
use crate::design::{GroupingPlan, SimulatedDataset};
use crate::error::{PowerError, PowerResult};

/// Number of fixed-effect columns (intercept, x, z, xz).
const P: usize = 4;

/// Upper bound of the variance-ratio search interval.
const THETA_MAX: f64 = 50.0;

/// Golden-section iterations; narrows the interval below 1e-9.
const GOLDEN_ITERS: usize = 80;

/// Per-subject sufficient statistics, computed once per fit.
struct GroupStats {
    /// Number of observations for this subject.
    m: f64,
    /// `X_g' X_g`.
    xtx: DMatrix<f64>,
    /// Column sums of `X_g`.
    xsum: DVector<f64>,
    /// `X_g' y_g`.
    xty: DVector<f64>,
    /// Sum of `y_g`.
    ysum: f64,
    /// `y_g' y_g`.
    yty: f64,
}

fn group_stats(data: &SimulatedDataset, grouping: &GroupingPlan) -> Vec<GroupStats> {
    let mut rows_of = vec![Vec::new(); grouping.n_subjects];
    for (row, &s) in grouping.subject_of.iter().enumerate() {
        rows_of[s].push(row);
    }

    rows_of
        .iter()
        .map(|rows| {
            let mut xtx = DMatrix::zeros(P, P);
            let mut xsum = DVector::zeros(P);
            let mut xty = DVector::zeros(P);
            let mut ysum = 0.0;
            let mut yty = 0.0;
            for &r in rows {
                let xr = [1.0, data.x[r], data.z[r], data.xz[r]];
                let yr = data.y[r];
                for i in 0..P {
                    xsum[i] += xr[i];
                    xty[i] += xr[i] * yr;
                    for j in 0..P {
                        xtx[(i, j)] += xr[i] * xr[j];
                    }
                }
                ysum += yr;
                yty += yr * yr;
            }
            GroupStats {
                m: rows.len() as f64,
                xtx,
                xsum,
                xty,
                ysum,
                yty,
            }
        })
        .collect()
}

/// GLS solution and REML criterion at a fixed variance ratio.
///
/// Returns `(criterion, beta, weighted_rss, xtvx_inverse)`.
fn profile_at(
    theta: f64,
    groups: &[GroupStats],
    n: f64,
) -> PowerResult<(f64, DVector<f64>, f64, DMatrix<f64>)> {
    let mut a = DMatrix::zeros(P, P);
    let mut b = DVector::zeros(P);
    let mut log_det_v = 0.0;

    for g in groups {
        let w = theta / (1.0 + theta * g.m);
        a += &g.xtx - (&g.xsum * g.xsum.transpose()) * w;
        b += &g.xty - &g.xsum * (w * g.ysum);
        log_det_v += (1.0 + theta * g.m).ln();
    }

    let chol = Cholesky::new(a)
        .ok_or_else(|| PowerError::fit("GLS system is rank deficient"))?;
    let beta = chol.solve(&b);

    // Weighted residual sum of squares via the same closed-form inverse
    let mut q = 0.0;
    for g in groups {
        let w = theta / (1.0 + theta * g.m);
        let bxy = beta.dot(&g.xty);
        let bxxb = (g.xtx.clone() * &beta).dot(&beta);
        let resid_sum = g.ysum - g.xsum.dot(&beta);
        q += (g.yty - 2.0 * bxy + bxxb) - w * resid_sum * resid_sum;
    }
    if q <= 0.0 || !q.is_finite() {
        return Err(PowerError::fit("non-positive weighted residual variance"));
    }

    let log_det_a = 2.0 * (0..P).map(|j| chol.l()[(j, j)].ln()).sum::<f64>();
    let criterion = (n - P as f64) * q.ln() + log_det_v + log_det_a;

    Ok((criterion, beta, q, chol.inverse()))
}

/// Fit the random-intercept model and return per-fixed-effect p-values.
///
/// Wald t-statistics use the containment degrees of freedom for
/// within-subject effects, `n - groups - 3`.
///
/// # Errors
///
/// Returns a fitting error when the GLS system is rank deficient, the
/// profiled variance is non-positive, or too few degrees of freedom
/// remain for inference.
pub fn fit_random_intercept(
    data: &SimulatedDataset,
    grouping: &GroupingPlan,
) -> PowerResult<TermTests> {
    let n = data.len();
    let df = n as f64 - grouping.n_subjects as f64 - 3.0;
    if df < 1.0 {
        return Err(PowerError::fit(format!(
            "not enough residual degrees of freedom: {n} observations, {} subjects",
            grouping.n_subjects
        )));
    }

    let groups = group_stats(data, grouping);
    let nf = n as f64;

    // Golden-section minimization of the profiled REML criterion
    let phi = (5.0_f64.sqrt() - 1.0) / 2.0;
    let mut lo = 0.0;
    let mut hi = THETA_MAX;
    let mut c = hi - phi * (hi - lo);
    let mut d = lo + phi * (hi - lo);
    let mut fc = profile_at(c, &groups, nf)?.0;
    let mut fd = profile_at(d, &groups, nf)?.0;

    for _ in 0..GOLDEN_ITERS {
        if fc < fd {
            hi = d;
            d = c;
            fd = fc;
            c = hi - phi * (hi - lo);
            fc = profile_at(c, &groups, nf)?.0;
        } else {
            lo = c;
            c = d;
            fc = fd;
            d = lo + phi * (hi - lo);
            fd = profile_at(d, &groups, nf)?.0;
        }
    }

    let theta = 0.5 * (lo + hi);
    let (_, beta, q, a_inv) = profile_at(theta, &groups, nf)?;
    let sigma2 = q / (nf - P as f64);

    let p_of = |j: usize| {
        let se = (sigma2 * a_inv[(j, j)]).sqrt();
        dist::student_t_two_sided(beta[j] / se, df)
    };

    Ok(TermTests {
        x: p_of(1),
        z: p_of(2),
        xz: p_of(3),
    })
}
