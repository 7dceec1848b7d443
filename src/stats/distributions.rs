//! Statistical probability distributions
//!
//! Thin wrappers over `statrs` behind a common [`Distribution`] trait, plus the
//! studentized range distribution used by Tukey's HSD, which `statrs` does not
//! provide.

use std::f64::consts::PI;

use statrs::distribution::{
    ChiSquared as StatrsChiSquared, Continuous, ContinuousCDF, FisherSnedecor, StudentsT,
};
use statrs::function::erf::{erfc, erfc_inv};
use statrs::function::gamma::ln_gamma;

use crate::core::error::{Error, Result};

/// Trait for probability distributions
pub trait Distribution {
    /// Probability density function (PDF)
    fn pdf(&self, x: f64) -> f64;

    /// Cumulative distribution function (CDF)
    fn cdf(&self, x: f64) -> f64;

    /// Survival function, 1 - CDF
    fn sf(&self, x: f64) -> f64 {
        1.0 - self.cdf(x)
    }

    /// Inverse CDF (quantile function)
    fn inverse_cdf(&self, p: f64) -> f64;
}

/// Standard normal distribution N(0,1)
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardNormal;

impl StandardNormal {
    pub fn new() -> Self {
        StandardNormal
    }
}

impl Distribution for StandardNormal {
    fn pdf(&self, x: f64) -> f64 {
        (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
    }

    fn cdf(&self, x: f64) -> f64 {
        0.5 * erfc(-x / std::f64::consts::SQRT_2)
    }

    fn sf(&self, x: f64) -> f64 {
        0.5 * erfc(x / std::f64::consts::SQRT_2)
    }

    fn inverse_cdf(&self, p: f64) -> f64 {
        if p <= 0.0 {
            return f64::NEG_INFINITY;
        }
        if p >= 1.0 {
            return f64::INFINITY;
        }
        -std::f64::consts::SQRT_2 * erfc_inv(2.0 * p)
    }
}

/// Student's t-distribution
#[derive(Debug, Clone)]
pub struct TDistribution {
    pub degrees_of_freedom: f64,
    inner: StudentsT,
}

impl TDistribution {
    pub fn new(degrees_of_freedom: f64) -> Result<Self> {
        let inner = StudentsT::new(0.0, 1.0, degrees_of_freedom).map_err(|e| {
            Error::InvalidValue(format!(
                "Invalid t distribution (df = {}): {}",
                degrees_of_freedom, e
            ))
        })?;
        Ok(TDistribution {
            degrees_of_freedom,
            inner,
        })
    }
}

impl Distribution for TDistribution {
    fn pdf(&self, x: f64) -> f64 {
        self.inner.pdf(x)
    }

    fn cdf(&self, x: f64) -> f64 {
        self.inner.cdf(x)
    }

    fn sf(&self, x: f64) -> f64 {
        // symmetric around zero; avoids cancellation in the upper tail
        self.inner.cdf(-x)
    }

    fn inverse_cdf(&self, p: f64) -> f64 {
        self.inner.inverse_cdf(p)
    }
}

/// Chi-square distribution
#[derive(Debug, Clone)]
pub struct ChiSquared {
    pub degrees_of_freedom: f64,
    inner: StatrsChiSquared,
}

impl ChiSquared {
    pub fn new(degrees_of_freedom: f64) -> Result<Self> {
        let inner = StatrsChiSquared::new(degrees_of_freedom).map_err(|e| {
            Error::InvalidValue(format!(
                "Invalid chi-square distribution (df = {}): {}",
                degrees_of_freedom, e
            ))
        })?;
        Ok(ChiSquared {
            degrees_of_freedom,
            inner,
        })
    }
}

impl Distribution for ChiSquared {
    fn pdf(&self, x: f64) -> f64 {
        if x < 0.0 {
            return 0.0;
        }
        self.inner.pdf(x)
    }

    fn cdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        self.inner.cdf(x)
    }

    fn sf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 1.0;
        }
        self.inner.sf(x)
    }

    fn inverse_cdf(&self, p: f64) -> f64 {
        if p <= 0.0 {
            return 0.0;
        }
        if p >= 1.0 {
            return f64::INFINITY;
        }
        self.inner.inverse_cdf(p)
    }
}

/// F-distribution
#[derive(Debug, Clone)]
pub struct FDistribution {
    pub df1: f64,
    pub df2: f64,
    inner: FisherSnedecor,
}

impl FDistribution {
    pub fn new(df1: f64, df2: f64) -> Result<Self> {
        let inner = FisherSnedecor::new(df1, df2).map_err(|e| {
            Error::InvalidValue(format!(
                "Invalid F distribution (df1 = {}, df2 = {}): {}",
                df1, df2, e
            ))
        })?;
        Ok(FDistribution { df1, df2, inner })
    }
}

impl Distribution for FDistribution {
    fn pdf(&self, x: f64) -> f64 {
        if x < 0.0 {
            return 0.0;
        }
        self.inner.pdf(x)
    }

    fn cdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        self.inner.cdf(x)
    }

    fn sf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 1.0;
        }
        self.inner.sf(x)
    }

    fn inverse_cdf(&self, p: f64) -> f64 {
        self.inner.inverse_cdf(p)
    }
}

/// Studentized range distribution for `groups` means and `df` error degrees
/// of freedom. Only the CDF and its complement are available.
///
/// Integration follows Copenhaver & Holland (1988): Gauss-Legendre quadrature
/// over the range of a normal sample, then over the chi distribution of the
/// error term.
#[derive(Debug, Clone)]
pub struct StudentizedRange {
    pub groups: f64,
    pub df: f64,
}

const LEGENDRE_12_X: [f64; 6] = [
    0.981560634246719250690549090149,
    0.904117256370474856678465866119,
    0.769902674194304687036893833213,
    0.587317954286617447296702418941,
    0.367831498998180193752691536644,
    0.125233408511468915472441369464,
];

const LEGENDRE_12_W: [f64; 6] = [
    0.047175336386511827194615961485,
    0.106939325995318430960254718194,
    0.160078328543346226334652529543,
    0.203167426723065921749064455810,
    0.233492536538354808760849898925,
    0.249147045813402785000562436043,
];

const LEGENDRE_16_X: [f64; 8] = [
    0.989400934991649932596154173450,
    0.944575023073232576077988415535,
    0.865631202387831743880467897712,
    0.755404408355003033895101194847,
    0.617876244402643748446671764049,
    0.458016777657227386342419442984,
    0.281603550779258913230460501460,
    0.950125098376374401853193354250e-1,
];

const LEGENDRE_16_W: [f64; 8] = [
    0.271524594117540948517805724560e-1,
    0.622535239386478928628438369944e-1,
    0.951585116824927848099251076022e-1,
    0.124628971255533872052476282192,
    0.149595988816576732081501730547,
    0.169156519395002538189312079030,
    0.182603415044923588866763667969,
    0.189450610455068496285396723208,
];

impl StudentizedRange {
    pub fn new(groups: usize, df: f64) -> Result<Self> {
        if groups < 2 {
            return Err(Error::InvalidValue(
                "Studentized range needs at least two groups".into(),
            ));
        }
        if !(df >= 2.0) {
            return Err(Error::InvalidValue(format!(
                "Studentized range needs df >= 2, got {}",
                df
            )));
        }
        Ok(StudentizedRange {
            groups: groups as f64,
            df,
        })
    }

    /// P(Q <= q)
    pub fn cdf(&self, q: f64) -> f64 {
        if q <= 0.0 {
            return 0.0;
        }
        let df = self.df;
        if df > 25_000.0 {
            return range_probability(q, self.groups);
        }

        let f2 = df * 0.5;
        let f21 = f2 - 1.0;
        let ff4 = df * 0.25;
        let ulen: f64 = if df <= 100.0 {
            1.0
        } else if df <= 800.0 {
            0.5
        } else if df <= 5000.0 {
            0.25
        } else {
            0.125
        };
        let f2lf = f2 * df.ln() - df * std::f64::consts::LN_2 - ln_gamma(f2) + ulen.ln();

        let mut ans = 0.0;
        for i in 1..=50 {
            let mut otsum = 0.0;
            let twa1 = (2 * i - 1) as f64 * ulen;

            for jj in 1..=16 {
                let (t1, point) = if jj > 8 {
                    let x = LEGENDRE_16_X[jj - 9] * ulen;
                    (
                        f2lf + f21 * (twa1 + x).ln() - (x + twa1) * ff4,
                        (jj - 9, twa1 + x),
                    )
                } else {
                    let x = LEGENDRE_16_X[jj - 1] * ulen;
                    (
                        f2lf + f21 * (twa1 - x).ln() + (x - twa1) * ff4,
                        (jj - 1, twa1 - x),
                    )
                };
                if t1 >= -30.0 {
                    let qsqz = q * (point.1 * 0.5).sqrt();
                    let wprb = range_probability(qsqz, self.groups);
                    otsum += wprb * LEGENDRE_16_W[point.0] * t1.exp();
                }
            }

            if i as f64 * ulen >= 1.0 && otsum <= 1e-14 {
                break;
            }
            ans += otsum;
        }

        ans.min(1.0)
    }

    /// P(Q > q)
    pub fn sf(&self, q: f64) -> f64 {
        (1.0 - self.cdf(q)).clamp(0.0, 1.0)
    }
}

/// Probability that the range of `cc` standard normal draws is below `w`.
fn range_probability(w: f64, cc: f64) -> f64 {
    let qsqz = w * 0.5;
    if qsqz >= 8.0 {
        return 1.0;
    }

    let n = StandardNormal;
    let mut pr_w = 2.0 * n.cdf(qsqz) - 1.0;
    pr_w = if pr_w >= (-50.0 / cc).exp() {
        pr_w.powf(cc)
    } else {
        0.0
    };

    let wincr = if w > 3.0 { 2 } else { 3 };
    let mut blb = qsqz;
    let binc = (8.0 - qsqz) / wincr as f64;
    let mut bub = blb + binc;
    let mut einsum = 0.0;
    let cc1 = cc - 1.0;

    for _ in 0..wincr {
        let mut elsum = 0.0;
        let a = 0.5 * (bub + blb);
        let b = 0.5 * (bub - blb);

        for jj in 1..=12 {
            let (j, xx) = if jj > 6 {
                let j = 12 - jj;
                (j, LEGENDRE_12_X[j])
            } else {
                let j = jj - 1;
                (j, -LEGENDRE_12_X[j])
            };
            let ac = a + b * xx;
            let qexpo = ac * ac;
            if qexpo > 60.0 {
                break;
            }
            let pplus = 2.0 * n.cdf(ac);
            let pminus = 2.0 * n.cdf(ac - w);
            let rinsum = pplus * 0.5 - pminus * 0.5;
            if rinsum >= (-30.0 / cc1).exp() {
                elsum += LEGENDRE_12_W[j] * (-0.5 * qexpo).exp() * rinsum.powf(cc1);
            }
        }
        elsum *= 2.0 * b * cc / (2.0 * PI).sqrt();
        einsum += elsum;
        blb = bub;
        bub += binc;
    }

    pr_w += einsum;
    if pr_w <= (-30.0f64).exp() {
        return 0.0;
    }
    pr_w.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_normal() {
        let dist = StandardNormal::new();

        assert!((dist.pdf(0.0) - 0.3989422804014327).abs() < 1e-12);
        assert!((dist.cdf(0.0) - 0.5).abs() < 1e-12);
        assert!((dist.cdf(1.959963984540054) - 0.975).abs() < 1e-9);
        assert!((dist.inverse_cdf(0.975) - 1.959963984540054).abs() < 1e-9);
    }

    #[test]
    fn test_t_distribution() {
        let dist = TDistribution::new(10.0).unwrap();
        // two-sided 5% critical value for 10 df
        assert!((dist.inverse_cdf(0.975) - 2.228138851986274).abs() < 1e-6);
        assert!((dist.sf(2.228138851986274) - 0.025).abs() < 1e-8);
    }

    #[test]
    fn test_chi_squared() {
        let dist = ChiSquared::new(1.0).unwrap();
        assert_eq!(dist.pdf(-1.0), 0.0);
        assert!((dist.sf(3.841458820694124) - 0.05).abs() < 1e-8);
        assert!((dist.inverse_cdf(0.95) - 3.841458820694124).abs() < 1e-6);
    }

    #[test]
    fn test_f_distribution() {
        let dist = FDistribution::new(2.0, 27.0).unwrap();
        // critical value F(0.95; 2, 27) = 3.354131
        assert!((dist.sf(3.354131) - 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_studentized_range() {
        // qtukey(0.95, 3, 20) = 3.577935
        let dist = StudentizedRange::new(3, 20.0).unwrap();
        assert!((dist.cdf(3.577935) - 0.95).abs() < 1e-4);
        // qtukey(0.95, 4, 60) = 3.737
        let dist = StudentizedRange::new(4, 60.0).unwrap();
        assert!((dist.cdf(3.737) - 0.95).abs() < 2e-3);
        assert_eq!(dist.cdf(0.0), 0.0);
        // qtukey(0.95, 3, 120) = 3.356, integrated on the narrower grid
        let dist = StudentizedRange::new(3, 120.0).unwrap();
        assert!((dist.cdf(3.356) - 0.95).abs() < 2e-3);
    }
}
