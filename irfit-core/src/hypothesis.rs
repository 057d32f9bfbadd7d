//! Hypothesis tests used by the reports: Shapiro-Wilk normality, a
//! two-sample t-test and an F-test on a regression F0.
//!
//! All distribution lookups go through a [`DistributionProvider`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::distribution::{two_sided_t_critical, DistributionProvider, StatrsProvider};
use crate::error::{ensure_finite, AnalysisError, Result};
use crate::statistics::{mean, variance};

/// Outcome of a test against its null hypothesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// The data are consistent with H0 at the chosen level
    FailToReject,
    Reject,
}

impl Verdict {
    pub fn is_reject(&self) -> bool {
        matches!(self, Verdict::Reject)
    }
}

/// Shapiro-Wilk statistic and p-value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityTest {
    pub w: f64,
    pub p_value: f64,
    pub alpha: f64,
    pub verdict: Verdict,
}

impl NormalityTest {
    /// True when normality is not rejected
    pub fn is_normal(&self) -> bool {
        self.verdict == Verdict::FailToReject
    }
}

/// Two-sample t statistic against its two-sided critical value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTest {
    pub statistic: f64,
    pub critical_value: f64,
    pub degrees_of_freedom: f64,
    pub alpha: f64,
    pub verdict: Verdict,
}

/// Upper-tail F probability of an observed F0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FTest {
    pub value: f64,
    pub p_value: f64,
    pub alpha: f64,
    /// `Reject` means the regression is significant
    pub verdict: Verdict,
}

/// `true` when the Shapiro-Wilk test does not reject normality at `alpha`
pub fn shapiro_normality(sample: &[f64], alpha: f64) -> Result<bool> {
    Ok(shapiro_wilk(sample, alpha, &StatrsProvider)?.is_normal())
}

/// `(statistic, critical value)` of the two-sample t-test
pub fn two_sample_t_test(a: &[f64], b: &[f64], alpha: f64) -> Result<(f64, f64)> {
    let test = t_test(a, b, alpha, &StatrsProvider)?;
    Ok((test.statistic, test.critical_value))
}

/// Upper-tail p-value `1 - F_cdf(value; df1, df2)`
pub fn f_test(value: f64, df1: usize, df2: usize, alpha: f64) -> Result<f64> {
    Ok(f_significance(value, df1, df2, alpha, &StatrsProvider)?.p_value)
}

/// Shapiro-Wilk test using Royston's approximation (AS R94), 3 <= n <= 5000
pub fn shapiro_wilk<D: DistributionProvider + ?Sized>(
    sample: &[f64],
    alpha: f64,
    provider: &D,
) -> Result<NormalityTest> {
    let n = sample.len();
    if !(3..=5000).contains(&n) {
        return Err(AnalysisError::InvalidInput(format!(
            "Shapiro-Wilk needs between 3 and 5000 values, got {}",
            n
        )));
    }
    ensure_finite("sample", sample)?;

    let mut x = sample.to_vec();
    x.sort_by(|a, b| a.total_cmp(b));
    if x[n - 1] - x[0] <= 0.0 {
        return Err(AnalysisError::DegenerateInput(
            "all values are identical".to_string(),
        ));
    }

    let (w, p_value) = if n == 3 {
        shapiro_wilk_n3(&x)
    } else {
        let a = sw_coefficients(n, provider)?;
        let w = sw_statistic(&x, &a).min(1.0);
        (w, sw_p_value(w, n, provider)?)
    };
    let p_value = p_value.clamp(0.0, 1.0);

    let verdict = if p_value > alpha {
        Verdict::FailToReject
    } else {
        Verdict::Reject
    };
    debug!(n, w, p_value, ?verdict, "Shapiro-Wilk test");

    Ok(NormalityTest {
        w,
        p_value,
        alpha,
        verdict,
    })
}

// n = 3 has exact coefficients and an exact p-value
fn shapiro_wilk_n3(x: &[f64]) -> (f64, f64) {
    let m = mean(x);
    let ss: f64 = x.iter().map(|v| (v - m).powi(2)).sum();
    let numerator = std::f64::consts::FRAC_1_SQRT_2 * (x[2] - x[0]);
    let w = ((numerator * numerator) / ss).clamp(0.75, 1.0);
    let p = 1.0 - (6.0 / std::f64::consts::PI) * w.sqrt().acos();
    (w, p)
}

const SW_C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.07119, 4.434685, -2.706056];
const SW_C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const SW_C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
const SW_C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const SW_C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const SW_C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const SW_G: [f64; 2] = [-2.273, 0.459];

fn poly(c: &[f64], x: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, &ci| acc * x + ci)
}

// Half the antisymmetric coefficient vector, largest first
fn sw_coefficients<D: DistributionProvider + ?Sized>(n: usize, provider: &D) -> Result<Vec<f64>> {
    let half = n / 2;
    let nf = n as f64;

    // Expected normal order statistics, Blom's plotting positions
    let m = (0..half)
        .map(|i| provider.normal_quantile((i as f64 + 1.0 - 0.375) / (nf + 0.25)))
        .collect::<Result<Vec<f64>>>()?;
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / nf.sqrt();

    let a1 = poly(&SW_C1, rsn) - m[0] / ssumm2;
    let corrected = if n > 5 { 2 } else { 1 };

    let mut a = vec![0.0; half];
    a[0] = a1;
    let (fac_sq, one_minus) = if corrected == 2 {
        let a2 = -m[1] / ssumm2 + poly(&SW_C2, rsn);
        a[1] = a2;
        (
            summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1],
            1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2,
        )
    } else {
        (summ2 - 2.0 * m[0] * m[0], 1.0 - 2.0 * a1 * a1)
    };
    if fac_sq <= 0.0 || one_minus <= 0.0 {
        return Err(AnalysisError::Distribution(
            "Shapiro-Wilk coefficients are undefined for this sample size".to_string(),
        ));
    }
    let fac = (fac_sq / one_minus).sqrt();
    for i in corrected..half {
        a[i] = -m[i] / fac;
    }
    Ok(a)
}

fn sw_statistic(x: &[f64], a: &[f64]) -> f64 {
    let n = x.len();
    let numerator: f64 = a
        .iter()
        .enumerate()
        .map(|(i, ai)| ai * (x[n - 1 - i] - x[i]))
        .sum();
    let m = mean(x);
    let ss: f64 = x.iter().map(|v| (v - m).powi(2)).sum();
    (numerator * numerator) / ss
}

fn sw_p_value<D: DistributionProvider + ?Sized>(w: f64, n: usize, provider: &D) -> Result<f64> {
    let nf = n as f64;
    let w1 = 1.0 - w;
    if w1 <= 0.0 {
        return Ok(1.0);
    }
    let y = w1.ln();

    let z = if n <= 11 {
        let gamma = poly(&SW_G, nf);
        if y >= gamma {
            return Ok(0.0);
        }
        let y2 = -(gamma - y).ln();
        (y2 - poly(&SW_C3, nf)) / poly(&SW_C4, nf).exp()
    } else {
        let ln_n = nf.ln();
        (y - poly(&SW_C5, ln_n)) / poly(&SW_C6, ln_n).exp()
    };
    Ok(1.0 - provider.normal_cdf(z)?)
}

/// Two-sample t-test
///
/// The denominator is `sqrt(sa²/(na-1) + sb²/(nb-1))` and the critical value
/// uses `na + nb - 2` degrees of freedom; H0 (equal means) is rejected when
/// the statistic exceeds the critical value.
pub fn t_test<D: DistributionProvider + ?Sized>(
    a: &[f64],
    b: &[f64],
    alpha: f64,
    provider: &D,
) -> Result<TTest> {
    if a.len() < 2 || b.len() < 2 {
        return Err(AnalysisError::InvalidInput(format!(
            "t-test needs at least 2 values per sample, got {} and {}",
            a.len(),
            b.len()
        )));
    }
    ensure_finite("first sample", a)?;
    ensure_finite("second sample", b)?;

    let na = a.len() as f64;
    let nb = b.len() as f64;
    let denominator = (variance(a) / (na - 1.0) + variance(b) / (nb - 1.0)).sqrt();
    if denominator == 0.0 {
        return Err(AnalysisError::DegenerateInput(
            "both samples have zero variance".to_string(),
        ));
    }
    let statistic = (mean(a) - mean(b)).abs() / denominator;

    let degrees_of_freedom = na + nb - 2.0;
    let critical_value = two_sided_t_critical(provider, alpha, degrees_of_freedom)?;
    let verdict = if statistic > critical_value {
        Verdict::Reject
    } else {
        Verdict::FailToReject
    };

    Ok(TTest {
        statistic,
        critical_value,
        degrees_of_freedom,
        alpha,
        verdict,
    })
}

/// F-test of a regression F0 against `F(df1, df2)`
pub fn f_significance<D: DistributionProvider + ?Sized>(
    value: f64,
    df1: usize,
    df2: usize,
    alpha: f64,
    provider: &D,
) -> Result<FTest> {
    if df1 == 0 || df2 == 0 {
        return Err(AnalysisError::InvalidInput(
            "F-test degrees of freedom must be positive".to_string(),
        ));
    }
    let p_value = if value.is_infinite() && value > 0.0 {
        0.0
    } else {
        1.0 - provider.fisher_f_cdf(value, df1 as f64, df2 as f64)?
    };
    let verdict = if p_value < alpha {
        Verdict::Reject
    } else {
        Verdict::FailToReject
    };

    Ok(FTest {
        value,
        p_value,
        alpha,
        verdict,
    })
}
