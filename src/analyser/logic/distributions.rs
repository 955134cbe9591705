//! Special functions and distribution tails used by the inference routines.
//!
//! Gamma and beta functions follow the classic Lanczos / continued-fraction
//! formulations; the normal quantile is Acklam's rational approximation with
//! one Halley refinement step. Accuracy is close to machine precision across
//! the ranges the tests exercise.

use std::f64::consts::PI;

const EPS: f64 = 1e-15;
const FPMIN: f64 = 1e-300;
const MAX_ITER: usize = 1000;

const LANCZOS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Natural log of the gamma function for `x > 0`.
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        return (PI / (PI * x).sin().abs()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let t = x + 7.5;
    let series = LANCZOS
        .iter()
        .enumerate()
        .skip(1)
        .fold(LANCZOS[0], |acc, (i, c)| acc + c / (x + i as f64));
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}

fn gamma_series(a: f64, x: f64) -> f64 {
    let mut ap = a;
    let mut sum = 1.0 / a;
    let mut del = sum;
    for _ in 0..MAX_ITER {
        ap += 1.0;
        del *= x / ap;
        sum += del;
        if del.abs() < sum.abs() * EPS {
            break;
        }
    }
    sum * (-x + a * x.ln() - ln_gamma(a)).exp()
}

fn gamma_continued_fraction(a: f64, x: f64) -> f64 {
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / FPMIN;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..MAX_ITER {
        let an = -(i as f64) * (i as f64 - a);
        b += 2.0;
        d = guard(an * d + b);
        c = guard(b + an / c);
        d = 1.0 / d;
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < EPS {
            break;
        }
    }
    (-x + a * x.ln() - ln_gamma(a)).exp() * h
}

fn guard(v: f64) -> f64 {
    if v.abs() < FPMIN { FPMIN } else { v }
}

/// Regularized lower incomplete gamma `P(a, x)`.
pub fn gamma_p(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else if x < a + 1.0 {
        gamma_series(a, x)
    } else {
        1.0 - gamma_continued_fraction(a, x)
    }
}

/// Regularized upper incomplete gamma `Q(a, x)`.
pub fn gamma_q(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        1.0
    } else if x < a + 1.0 {
        1.0 - gamma_series(a, x)
    } else {
        gamma_continued_fraction(a, x)
    }
}

pub fn erfc(x: f64) -> f64 {
    if x >= 0.0 {
        gamma_q(0.5, x * x)
    } else {
        1.0 + gamma_p(0.5, x * x)
    }
}

pub fn erf(x: f64) -> f64 {
    let p = gamma_p(0.5, x * x);
    if x >= 0.0 { p } else { -p }
}

pub fn normal_pdf(x: f64, mean: f64, std: f64) -> f64 {
    let z = (x - mean) / std;
    (-0.5 * z * z).exp() / (std * (2.0 * PI).sqrt())
}

/// Standard normal CDF.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}

/// Standard normal upper tail, `1 - Φ(z)` without cancellation.
pub fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

/// `ln Φ(z)`, finite far into the lower tail.
pub fn normal_log_cdf(z: f64) -> f64 {
    let p = normal_cdf(z);
    if p > 0.0 {
        return p.ln();
    }
    // Mills-ratio asymptote
    -0.5 * z * z - (-z).ln() - 0.5 * (2.0 * PI).ln()
}

pub fn normal_log_sf(z: f64) -> f64 {
    normal_log_cdf(-z)
}

const ACKLAM_A: [f64; 6] = [
    -3.969_683_028_665_376e1,
    2.209_460_984_245_205e2,
    -2.759_285_104_469_687e2,
    1.383_577_518_672_69e2,
    -3.066_479_806_614_716e1,
    2.506_628_277_459_239,
];
const ACKLAM_B: [f64; 5] = [
    -5.447_609_879_822_406e1,
    1.615_858_368_580_409e2,
    -1.556_989_798_598_866e2,
    6.680_131_188_771_972e1,
    -1.328_068_155_288_572e1,
];
const ACKLAM_C: [f64; 6] = [
    -7.784_894_002_430_293e-3,
    -3.223_964_580_411_365e-1,
    -2.400_758_277_161_838,
    -2.549_732_539_343_734,
    4.374_664_141_464_968,
    2.938_163_982_698_783,
];
const ACKLAM_D: [f64; 4] = [
    7.784_695_709_041_462e-3,
    3.224_671_290_700_398e-1,
    2.445_134_137_142_996,
    3.754_408_661_907_416,
];

fn horner(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().fold(0.0, |acc, c| acc * x + c)
}

/// Standard normal quantile. Returns ±inf at 0 and 1, NaN outside `[0, 1]`.
pub fn normal_ppf(p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    const P_LOW: f64 = 0.024_25;
    let tail = |q: f64| horner(&ACKLAM_C, q) / (horner(&ACKLAM_D, q) * q + 1.0);
    let x = if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        horner(&ACKLAM_A, r) * q / (horner(&ACKLAM_B, r) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    };

    let e = normal_cdf(x) - p;
    let u = e * (2.0 * PI).sqrt() * (x * x / 2.0).exp();
    x - u / (1.0 + x * u / 2.0)
}

/// Regularized incomplete beta `I_x(a, b)`.
pub fn incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let front =
        (ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln()).exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - qab * x / qap);
    let mut h = d;
    for m in 1..MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;
        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        h *= d * c;
        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Student's t CDF with `df` degrees of freedom.
pub fn student_t_cdf(t: f64, df: f64) -> f64 {
    if t.is_nan() {
        return f64::NAN;
    }
    let tail = 0.5 * incomplete_beta(df / 2.0, 0.5, df / (df + t * t));
    if t > 0.0 { 1.0 - tail } else { tail }
}

/// Two-tailed p-value `P(|T| >= |t|)`.
pub fn student_t_two_tailed(t: f64, df: f64) -> f64 {
    if t.is_nan() {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    incomplete_beta(df / 2.0, 0.5, df / (df + t * t))
}

/// Student's t quantile, by bisection on the CDF.
pub fn student_t_ppf(p: f64, df: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) || df <= 0.0 {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }
    if p == 0.5 {
        return 0.0;
    }

    let (mut lo, mut hi) = (-1.0f64, 1.0f64);
    while student_t_cdf(lo, df) > p && lo > -1e300 {
        lo *= 2.0;
    }
    while student_t_cdf(hi, df) < p && hi < 1e300 {
        hi *= 2.0;
    }
    for _ in 0..400 {
        let mid = 0.5 * (lo + hi);
        if student_t_cdf(mid, df) < p {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= EPS * mid.abs().max(1.0) {
            break;
        }
    }
    0.5 * (lo + hi)
}

/// Upper tail of the F distribution with `(d1, d2)` degrees of freedom.
pub fn f_sf(f: f64, d1: f64, d2: f64) -> f64 {
    if f.is_nan() {
        return f64::NAN;
    }
    if f <= 0.0 {
        return 1.0;
    }
    if f.is_infinite() {
        return 0.0;
    }
    incomplete_beta(d2 / 2.0, d1 / 2.0, d2 / (d2 + d1 * f))
}

/// Asymptotic Kolmogorov survival function `Q(λ) = 2 Σ (-1)^(j-1) exp(-2 j² λ²)`.
pub fn kolmogorov_sf(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    if lambda < 0.2 {
        // Q(λ) is 1 to f64 precision
        return 1.0;
    }
    let mut sum = 0.0;
    for j in 1..=100u32 {
        let jf = f64::from(j);
        let term = (-2.0 * jf * jf * lambda * lambda).exp();
        sum += if j % 2 == 1 { term } else { -term };
        if term < 1e-17 {
            break;
        }
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

/// Largest sample size for which the exact matrix method is used.
const KS_EXACT_MAX_N: usize = 1000;

/// Two-sided one-sample Kolmogorov-Smirnov p-value `P(D_n >= d)`.
///
/// Exact for moderate `n` (Marsaglia, Tsang and Wang 2003, including their
/// fast tail approximation); larger samples use the asymptotic distribution
/// with Stephens' small-sample correction.
pub fn ks_two_sided_sf(d: f64, n: usize) -> f64 {
    if n == 0 || d.is_nan() {
        return f64::NAN;
    }
    if d <= 0.0 {
        return 1.0;
    }
    if d >= 1.0 {
        return 0.0;
    }
    let nf = n as f64;
    if n > KS_EXACT_MAX_N {
        let sqrt_n = nf.sqrt();
        return kolmogorov_sf((sqrt_n + 0.12 + 0.11 / sqrt_n) * d);
    }

    let s = d * d * nf;
    if s > 7.24 || (s > 3.76 && n > 99) {
        let p = 2.0 * (-(2.000_071 + 0.331 / nf.sqrt() + 1.409 / nf) * s).exp();
        return p.clamp(0.0, 1.0);
    }
    (1.0 - mtw_cdf(n, d)).clamp(0.0, 1.0)
}

/// `P(D_n < d)` by the Marsaglia-Tsang-Wang matrix power.
fn mtw_cdf(n: usize, d: f64) -> f64 {
    let nd = n as f64 * d;
    let k = nd.floor() as usize + 1;
    let m = 2 * k - 1;
    let h = k as f64 - nd;

    let mut hm = vec![0.0; m * m];
    for i in 0..m {
        for j in 0..m {
            hm[i * m + j] = if i + 1 >= j { 1.0 } else { 0.0 };
        }
    }
    for i in 0..m {
        hm[i * m] -= h.powi(i as i32 + 1);
        hm[(m - 1) * m + i] -= h.powi((m - i) as i32);
    }
    if 2.0 * h - 1.0 > 0.0 {
        hm[(m - 1) * m] += (2.0 * h - 1.0).powi(m as i32);
    }
    for i in 0..m {
        for j in 0..m {
            if i + 1 > j {
                for g in 1..=(i + 1 - j) {
                    hm[i * m + j] /= g as f64;
                }
            }
        }
    }

    let (q, mut exponent) = matrix_power(&hm, m, n);
    let mut s = q[(k - 1) * m + k - 1];
    for i in 1..=n {
        s = s * i as f64 / n as f64;
        if s < 1e-140 {
            s *= 1e140;
            exponent -= 140;
        }
    }
    s * 10f64.powi(exponent)
}

fn matrix_multiply(a: &[f64], b: &[f64], m: usize) -> Vec<f64> {
    let mut out = vec![0.0; m * m];
    for i in 0..m {
        for k in 0..m {
            let aik = a[i * m + k];
            if aik == 0.0 {
                continue;
            }
            for j in 0..m {
                out[i * m + j] += aik * b[k * m + j];
            }
        }
    }
    out
}

/// `a^n` with a decimal exponent kept aside to avoid overflow.
fn matrix_power(a: &[f64], m: usize, n: usize) -> (Vec<f64>, i32) {
    if n == 1 {
        return (a.to_vec(), 0);
    }
    let (half, half_exp) = matrix_power(a, m, n / 2);
    let mut out = matrix_multiply(&half, &half, m);
    let mut exponent = 2 * half_exp;
    if n % 2 == 1 {
        out = matrix_multiply(a, &out, m);
    }
    if out[(m / 2) * m + m / 2] > 1e140 {
        for v in &mut out {
            *v *= 1e-140;
        }
        exponent += 140;
    }
    (out, exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_ln_gamma() {
        assert!(close(ln_gamma(0.5), PI.sqrt().ln(), 1e-13));
        assert!(close(ln_gamma(5.0), 24f64.ln(), 1e-12));
        assert!(close(ln_gamma(1.0), 0.0, 1e-14));
    }

    #[test]
    fn test_normal_cdf_and_ppf() {
        assert!(close(normal_cdf(1.96), 0.975_002_104_851_779_6, 1e-14));
        assert!(close(normal_cdf(0.0), 0.5, 1e-15));
        assert!(close(normal_ppf(0.975), 1.959_963_984_540_054, 1e-12));
        assert!(close(normal_ppf(1e-5), -4.264_890_793_922_825_6, 1e-10));
        assert!(close(normal_ppf(normal_cdf(-0.7)), -0.7, 1e-12));
        assert_eq!(normal_ppf(0.0), f64::NEG_INFINITY);
        assert!(normal_ppf(1.5).is_nan());
    }

    #[test]
    fn test_erf_pairs() {
        assert!(close(erf(0.5) + erfc(0.5), 1.0, 1e-15));
        assert!(close(erfc(5.0), 1.537_459_794_428_035e-12, 1e-24));
        assert!(close(erf(-1.0), -0.842_700_792_949_714_9, 1e-14));
    }

    #[test]
    fn test_normal_log_cdf_far_tail() {
        assert!(close(normal_log_cdf(0.0), 0.5f64.ln(), 1e-15));
        let far = normal_log_cdf(-40.0);
        assert!(far.is_finite() && far < -800.0);
    }

    #[test]
    fn test_student_t() {
        assert!(close(student_t_two_tailed(2.0, 10.0), 0.073_388_034_770_740_6, 1e-10));
        assert!(close(student_t_cdf(1.0, 1.0), 0.75, 1e-12));
        assert!(close(student_t_ppf(0.975, 4.0), 2.776_445_105_197_799, 1e-9));
        assert!(close(student_t_ppf(0.025, 4.0), -2.776_445_105_197_799, 1e-9));
        assert_eq!(student_t_two_tailed(f64::INFINITY, 3.0), 0.0);
    }

    #[test]
    fn test_f_sf_closed_form() {
        // with d1 = 2 the tail is (1 + 2f/d2)^(-d2/2)
        assert!(close(f_sf(3.0, 2.0, 10.0), 1.6f64.powi(-5), 1e-12));
        assert_eq!(f_sf(0.0, 3.0, 4.0), 1.0);
    }

    #[test]
    fn test_kolmogorov_tables() {
        // n = 1: P(D >= d) = 2 - 2d on [0.5, 1]
        assert!(close(ks_two_sided_sf(0.75, 1), 0.5, 1e-12));
        assert!(close(kolmogorov_sf(1.358), 0.05, 1e-3));
        assert_eq!(ks_two_sided_sf(0.0, 10), 1.0);
    }
}
