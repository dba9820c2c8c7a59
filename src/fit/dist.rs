//! Tail probabilities for the Student-t and Fisher F distributions.
//!
//! Both reduce to the regularized incomplete beta function, evaluated by
//! continued fraction with a Lanczos log-gamma. Accuracy is ~1e-12 over
//! the degree-of-freedom ranges that occur in power studies, far below
//! Monte Carlo resolution.

/// Lanczos approximation coefficients (g = 7, n = 9).
const LANCZOS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_13,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];

/// Natural log of the gamma function.
#[must_use]
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection formula for the left half-plane
        let pi = std::f64::consts::PI;
        (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut acc = LANCZOS[0];
        for (i, &c) in LANCZOS.iter().enumerate().skip(1) {
            acc += c / (x + i as f64);
        }
        let t = x + 7.5;
        0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
    }
}

const MAX_ITER: usize = 300;
const EPS: f64 = 3.0e-14;
const FPMIN: f64 = 1.0e-300;

/// Continued fraction for the incomplete beta function (Lentz's method).
fn beta_cont_frac(a: f64, b: f64, x: f64) -> f64 {
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < FPMIN {
        d = FPMIN;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        // Even step
        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        h *= d * c;

        // Odd step
        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;

        if (del - 1.0).abs() < EPS {
            break;
        }
    }

    h
}

/// Regularized incomplete beta function `I_x(a, b)`.
#[must_use]
pub fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    // Use the symmetry relation to keep the continued fraction convergent
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_cont_frac(a, b, x) / a
    } else {
        1.0 - front * beta_cont_frac(b, a, 1.0 - x) / b
    }
}

/// Two-sided p-value for a Student-t statistic with `df` degrees of freedom.
#[must_use]
pub fn student_t_two_sided(t: f64, df: f64) -> f64 {
    if !t.is_finite() || df <= 0.0 {
        return f64::NAN;
    }
    let x = df / (df + t * t);
    regularized_incomplete_beta(df / 2.0, 0.5, x)
}

/// Upper-tail p-value for an F statistic with `(df1, df2)` degrees of freedom.
#[must_use]
pub fn f_upper_tail(f: f64, df1: f64, df2: f64) -> f64 {
    if !f.is_finite() || df1 <= 0.0 || df2 <= 0.0 {
        return f64::NAN;
    }
    if f <= 0.0 {
        return 1.0;
    }
    let x = df2 / (df2 + df1 * f);
    regularized_incomplete_beta(df2 / 2.0, df1 / 2.0, x)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-8;

    #[test]
    fn test_ln_gamma_known_values() {
        // Gamma(5) = 24, Gamma(0.5) = sqrt(pi)
        assert!((ln_gamma(5.0) - 24.0_f64.ln()).abs() < TOL);
        assert!((ln_gamma(0.5) - std::f64::consts::PI.sqrt().ln()).abs() < TOL);
        assert!(ln_gamma(1.0).abs() < TOL);
        assert!(ln_gamma(2.0).abs() < TOL);
    }

    #[test]
    fn test_incomplete_beta_boundaries() {
        assert_eq!(regularized_incomplete_beta(2.0, 3.0, 0.0), 0.0);
        assert_eq!(regularized_incomplete_beta(2.0, 3.0, 1.0), 1.0);
    }

    #[test]
    fn test_incomplete_beta_symmetry() {
        // I_x(a, b) = 1 - I_{1-x}(b, a)
        let v1 = regularized_incomplete_beta(2.5, 4.0, 0.3);
        let v2 = 1.0 - regularized_incomplete_beta(4.0, 2.5, 0.7);
        assert!((v1 - v2).abs() < TOL);
    }

    #[test]
    fn test_incomplete_beta_uniform() {
        // I_x(1, 1) = x
        for x in [0.1, 0.25, 0.5, 0.9] {
            assert!((regularized_incomplete_beta(1.0, 1.0, x) - x).abs() < TOL);
        }
    }

    #[test]
    fn test_student_t_two_sided_reference() {
        // |t| = 2.228 is the 97.5% quantile at df = 10
        let p = student_t_two_sided(2.228_138_85, 10.0);
        assert!((p - 0.05).abs() < 1e-6, "p = {p}");

        // t = 0 is no evidence at all
        assert!((student_t_two_sided(0.0, 10.0) - 1.0).abs() < TOL);
    }

    #[test]
    fn test_student_t_symmetry() {
        let p_pos = student_t_two_sided(1.7, 23.0);
        let p_neg = student_t_two_sided(-1.7, 23.0);
        assert!((p_pos - p_neg).abs() < TOL);
    }

    #[test]
    fn test_f_upper_tail_reference() {
        // F(1, 10) 95% quantile is 4.9646
        let p = f_upper_tail(4.964_602_7, 1.0, 10.0);
        assert!((p - 0.05).abs() < 1e-6, "p = {p}");

        assert_eq!(f_upper_tail(0.0, 1.0, 10.0), 1.0);
    }

    #[test]
    fn test_f_matches_squared_t() {
        // F(1, df) upper tail of t^2 equals the two-sided t p-value
        let t = 1.9_f64;
        let df = 36.0;
        let p_t = student_t_two_sided(t, df);
        let p_f = f_upper_tail(t * t, 1.0, df);
        assert!((p_t - p_f).abs() < 1e-10);
    }

    #[test]
    fn test_non_finite_inputs() {
        assert!(student_t_two_sided(f64::NAN, 10.0).is_nan());
        assert!(f_upper_tail(f64::INFINITY, 1.0, 10.0).is_nan());
    }
}
