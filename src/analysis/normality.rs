//! Shapiro-Wilk normality test
//!
//! Royston's approximation (Applied Statistics algorithm AS R94) of the W statistic
//! and its p-value. Valid for samples of 3 to 5000 values; larger samples still get a
//! result but its p-value accuracy is not guaranteed.

use statrs::function::erf::{erfc, erfc_inv};

/// Smallest sample the test is defined for
pub const MIN_SAMPLE_SIZE: usize = 3;

/// Largest sample the approximation is calibrated for
pub const MAX_CALIBRATED_SAMPLE_SIZE: usize = 5000;

/// Ranges below this are treated as a constant sample
const SMALL: f64 = 1e-19;

const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.07119, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

const SQRT_HALF: f64 = std::f64::consts::FRAC_1_SQRT_2;
/// 6 / pi
const PI6: f64 = 1.909_859_317_102_744;
/// pi / 3
const STQR: f64 = std::f64::consts::FRAC_PI_3;

/// Result of a Shapiro-Wilk test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapiroWilk {
    /// W statistic, in (0, 1]
    pub w: f64,
    pub p_value: f64,
}

/// Runs the Shapiro-Wilk test
///
/// Returns `None` for samples smaller than [`MIN_SAMPLE_SIZE`]. A sample with zero range
/// yields `W = 1` and `p = 1`.
pub fn shapiro_wilk(values: &[f64]) -> Option<ShapiroWilk> {
    let n = values.len();
    if n < MIN_SAMPLE_SIZE {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let range = sorted[n - 1] - sorted[0];
    if range < SMALL {
        return Some(ShapiroWilk {
            w: 1.0,
            p_value: 1.0,
        });
    }

    let coefficients = coefficients(n);
    let w = w_statistic(&sorted, &coefficients);
    Some(ShapiroWilk {
        w,
        p_value: p_value(n, w),
    })
}

/// Evaluates `cc[0] + cc[1] x + cc[2] x^2 + ...`
fn poly(cc: &[f64], x: f64) -> f64 {
    cc.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Standard normal quantile function
fn normal_quantile(p: f64) -> f64 {
    -std::f64::consts::SQRT_2 * erfc_inv(2.0 * p)
}

/// Standard normal upper tail, `P(Z > z)`
fn normal_upper_tail(z: f64) -> f64 {
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

/// First half of the antisymmetric coefficient vector, largest first
fn coefficients(n: usize) -> Vec<f64> {
    let half = n / 2;
    let mut a = vec![0.0; half];

    if n == 3 {
        a[0] = SQRT_HALF;
        return a;
    }

    let an = n as f64;
    let m: Vec<f64> = (1..=half)
        .map(|i| normal_quantile((i as f64 - 0.375) / (an + 0.25)))
        .collect();

    let summ2 = 2.0 * m.iter().map(|value| value * value).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / an.sqrt();
    let a1 = poly(&C1, rsn) - m[0] / ssumm2;

    let (first, fac) = if n > 5 {
        let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
        let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1])
            / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
            .sqrt();
        a[1] = a2;
        (2, fac)
    } else {
        let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
        (1, fac)
    };

    a[0] = a1;
    for i in first..half {
        a[i] = -m[i] / fac;
    }

    a
}

/// W as the squared correlation between the ordered sample and the coefficients
fn w_statistic(sorted: &[f64], half: &[f64]) -> f64 {
    let n = sorted.len();
    let full: Vec<f64> = (0..n)
        .map(|i| {
            let mirror = n - 1 - i;
            if i < half.len() {
                -half[i]
            } else if mirror < half.len() {
                half[mirror]
            } else {
                0.0
            }
        })
        .collect();

    let mean = sorted.iter().sum::<f64>() / n as f64;
    let ssa: f64 = full.iter().map(|a| a * a).sum();
    let ssx: f64 = sorted.iter().map(|x| (x - mean) * (x - mean)).sum();
    let sax: f64 = full.iter().zip(sorted).map(|(a, x)| a * (x - mean)).sum();

    ((sax * sax) / (ssa * ssx)).min(1.0)
}

fn p_value(n: usize, w: f64) -> f64 {
    if n == 3 {
        return (PI6 * (w.sqrt().asin() - STQR)).max(0.0);
    }

    let w1 = 1.0 - w;
    if w1 <= 0.0 {
        return 1.0;
    }

    let an = n as f64;
    let mut y = w1.ln();
    let (m, s) = if n <= 11 {
        let gamma = poly(&G, an);
        if y >= gamma {
            return 1e-99;
        }
        y = -(gamma - y).ln();
        (poly(&C3, an), poly(&C4, an).exp())
    } else {
        let xx = an.ln();
        (poly(&C5, xx), poly(&C6, xx).exp())
    };

    normal_upper_tail((y - m) / s)
}
