//! Butterworth coefficient synthesis
//!
//! Direct digital-domain pole placement for low-pass, high-pass,
//! band-pass and band-stop responses of order 1 to 15. The denominator
//! is assembled by multiplying per-pole binomials (or per-pole-pair
//! trinomials for the band forms) over complex coefficients, the
//! numerator is a binomial expansion times a scaling factor that pins
//! passband gain to unity.

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::error::{Result, WavescopeError};

pub const MAX_BUTTERWORTH_ORDER: usize = 15;

const MIN_DIGITAL_FREQ: f64 = 0.01;
const MAX_DIGITAL_FREQ: f64 = 0.99;

/// Transfer-function coefficients ready for [`super::IirFilter`]
#[derive(Debug, Clone)]
pub struct FilterParams {
    pub a: Vec<f64>,
    pub b: Vec<f64>,
}

impl FilterParams {
    /// One-side responses have `order + 1` coefficients per vector,
    /// two-side responses `2 * order + 1`.
    pub fn size(&self) -> usize {
        self.a.len()
    }
}

fn check_order(order: usize) -> Result<()> {
    if order == 0 || order > MAX_BUTTERWORTH_ORDER {
        return Err(WavescopeError::InvalidFilter {
            reason: format!(
                "butterworth order must be in [1, {MAX_BUTTERWORTH_ORDER}], got {order}"
            ),
        });
    }
    Ok(())
}

fn digital_freq(sample_rate: u32, freq: f64) -> f64 {
    (2.0 * freq / f64::from(sample_rate)).clamp(MIN_DIGITAL_FREQ, MAX_DIGITAL_FREQ)
}

/// Multiply out `prod (x + r_i)`, returning real parts of all
/// coefficients in descending powers of x, leading 1 included.
fn expand_binomials(roots: &[Complex64]) -> Vec<f64> {
    let mut poly = vec![Complex64::new(1.0, 0.0)];
    for &r in roots {
        poly.push(Complex64::new(0.0, 0.0));
        for i in (1..poly.len()).rev() {
            let prev = poly[i - 1];
            poly[i] += r * prev;
        }
    }
    poly.into_iter().map(|c| c.re).collect()
}

/// Multiply out `prod (x^2 + t_i x + r_i)`
fn expand_trinomials(lin: &[Complex64], cst: &[Complex64]) -> Vec<f64> {
    let mut poly = vec![Complex64::new(1.0, 0.0)];
    for (&t, &r) in lin.iter().zip(cst) {
        poly.push(Complex64::new(0.0, 0.0));
        poly.push(Complex64::new(0.0, 0.0));
        for i in (2..poly.len()).rev() {
            let p1 = poly[i - 1];
            let p2 = poly[i - 2];
            poly[i] += t * p1 + r * p2;
        }
        let p0 = poly[0];
        poly[1] += t * p0;
    }
    poly.into_iter().map(|c| c.re).collect()
}

fn binomial_coefficients(order: usize) -> Vec<f64> {
    let mut c = vec![0.0; order + 1];
    c[0] = 1.0;
    for i in 1..=order {
        c[i] = c[i - 1] * (order - i + 1) as f64 / i as f64;
    }
    c
}

pub fn butterworth_low_pass(order: usize, sample_rate: u32, cutoff: f64) -> Result<FilterParams> {
    check_order(order)?;
    let fcf = digital_freq(sample_rate, cutoff);
    let theta = PI * fcf;
    let (st, ct) = theta.sin_cos();

    let roots: Vec<Complex64> = (0..order)
        .map(|k| {
            let parg = PI * (2 * k + 1) as f64 / (2 * order) as f64;
            let scale = 1.0 + st * parg.sin();
            Complex64::new(-ct / scale, -st * parg.cos() / scale)
        })
        .collect();
    let a = expand_binomials(&roots);

    // Numerator (1 + z^-1)^order, scaled to unit gain at DC
    let sf = low_pass_scaling(order, fcf);
    let b = binomial_coefficients(order)
        .into_iter()
        .map(|c| c * sf)
        .collect();

    Ok(FilterParams { a, b })
}

pub fn butterworth_high_pass(order: usize, sample_rate: u32, cutoff: f64) -> Result<FilterParams> {
    check_order(order)?;
    let fcf = digital_freq(sample_rate, cutoff);

    // Same pole set as the low-pass of the same cutoff
    let a = butterworth_low_pass(order, sample_rate, cutoff)?.a;

    let sf = high_pass_scaling(order, fcf);
    let b = binomial_coefficients(order)
        .into_iter()
        .enumerate()
        .map(|(i, c)| if i % 2 == 0 { c * sf } else { -c * sf })
        .collect();

    Ok(FilterParams { a, b })
}

pub fn butterworth_band_pass(
    order: usize,
    sample_rate: u32,
    freq_low: f64,
    freq_high: f64,
) -> Result<FilterParams> {
    check_order(order)?;
    let (f1, f2) = band_edges(sample_rate, freq_low, freq_high)?;

    let (lin, cst) = band_pole_factors(order, f1, f2, false);
    let a = expand_trinomials(&lin, &cst);

    // Numerator (1 - z^-2)^order: high-pass binomial interleaved with zeros
    let sf = band_pass_scaling(order, f1, f2);
    let mut b = vec![0.0; 2 * order + 1];
    for (i, c) in binomial_coefficients(order).into_iter().enumerate() {
        b[2 * i] = if i % 2 == 0 { c * sf } else { -c * sf };
    }

    Ok(FilterParams { a, b })
}

pub fn butterworth_band_stop(
    order: usize,
    sample_rate: u32,
    freq_low: f64,
    freq_high: f64,
) -> Result<FilterParams> {
    check_order(order)?;
    let (f1, f2) = band_edges(sample_rate, freq_low, freq_high)?;

    let (lin, cst) = band_pole_factors(order, f1, f2, true);
    let a = expand_trinomials(&lin, &cst);

    // Numerator (1 - 2 cos(w0) z^-1 + z^-2)^order with the prewarped
    // center cos(w0) = cos(pi (f2+f1)/2) / cos(pi (f2-f1)/2)
    let cp = (PI * (f2 + f1) / 2.0).cos();
    let ct = (PI * (f2 - f1) / 2.0).cos();
    let sf = band_stop_scaling(order, f1, f2);
    let lin_n = vec![Complex64::new(-2.0 * cp / ct, 0.0); order];
    let cst_n = vec![Complex64::new(1.0, 0.0); order];
    let b = expand_trinomials(&lin_n, &cst_n)
        .into_iter()
        .map(|c| c * sf)
        .collect();

    Ok(FilterParams { a, b })
}

fn band_edges(sample_rate: u32, freq_low: f64, freq_high: f64) -> Result<(f64, f64)> {
    let f1 = digital_freq(sample_rate, freq_low);
    let f2 = digital_freq(sample_rate, freq_high);
    if f1 >= f2 {
        return Err(WavescopeError::InvalidFilter {
            reason: format!("band edges must be ordered, got [{freq_low}, {freq_high}]"),
        });
    }
    Ok((f1, f2))
}

/// Trinomial factors of the denominator for the band responses
fn band_pole_factors(
    order: usize,
    f1: f64,
    f2: f64,
    stop: bool,
) -> (Vec<Complex64>, Vec<Complex64>) {
    let theta = PI * (f2 - f1) / 2.0;
    let cp = (PI * (f2 + f1) / 2.0).cos();
    let (st, ct) = theta.sin_cos();
    let s2t = 2.0 * st * ct;
    let c2t = 2.0 * ct * ct - 1.0;

    let mut lin = Vec::with_capacity(order);
    let mut cst = Vec::with_capacity(order);
    for k in 0..order {
        let parg = PI * (2 * k + 1) as f64 / (2 * order) as f64;
        let (sparg, cparg) = parg.sin_cos();
        let scale = 1.0 + s2t * sparg;
        let im_sign = if stop { -1.0 } else { 1.0 };
        cst.push(Complex64::new(c2t / scale, im_sign * s2t * cparg / scale));
        lin.push(Complex64::new(
            -2.0 * cp * (ct + st * sparg) / scale,
            im_sign * -2.0 * cp * st * cparg / scale,
        ));
    }
    (lin, cst)
}

fn low_pass_scaling(order: usize, fcf: f64) -> f64 {
    let omega = PI * fcf;
    let fomega = omega.sin();
    let mut sf = 1.0;
    for k in 0..order / 2 {
        let parg = PI * (2 * k + 1) as f64 / (2 * order) as f64;
        sf *= 1.0 + fomega * parg.sin();
    }
    let half = (omega / 2.0).sin();
    if order % 2 == 1 {
        sf *= half + (omega / 2.0).cos();
    }
    half.powi(order as i32) / sf
}

fn high_pass_scaling(order: usize, fcf: f64) -> f64 {
    let omega = PI * fcf;
    let fomega = omega.sin();
    let mut sf = 1.0;
    for k in 0..order / 2 {
        let parg = PI * (2 * k + 1) as f64 / (2 * order) as f64;
        sf *= 1.0 + fomega * parg.sin();
    }
    let half = (omega / 2.0).cos();
    if order % 2 == 1 {
        sf *= half + (omega / 2.0).sin();
    }
    half.powi(order as i32) / sf
}

fn band_pass_scaling(order: usize, f1: f64, f2: f64) -> f64 {
    let ctt = 1.0 / (PI * (f2 - f1) / 2.0).tan();
    band_scaling(order, ctt)
}

fn band_stop_scaling(order: usize, f1: f64, f2: f64) -> f64 {
    let ctt = (PI * (f2 - f1) / 2.0).tan();
    band_scaling(order, ctt)
}

fn band_scaling(order: usize, ctt: f64) -> f64 {
    let mut prod = Complex64::new(1.0, 0.0);
    for k in 0..order {
        let parg = PI * (2 * k + 1) as f64 / (2 * order) as f64;
        prod *= Complex64::new(ctt + parg.sin(), parg.cos());
    }
    1.0 / prod.re
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{Filter, IirFilter};
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    // RMS-based amplitude estimate; sample peaks systematically
    // undershoot for tones near Nyquist
    fn response_at(params: &FilterParams, sample_rate: u32, freq: f64) -> f64 {
        let mut filter = IirFilter::new(params.a.clone(), params.b.clone());
        let step = 2.0 * PI * freq / f64::from(sample_rate);
        let n = sample_rate as usize;
        let mut sum_sq = 0.0;
        for i in 0..n {
            let y = filter.process_sample((step * i as f64).sin());
            if i >= n / 2 {
                sum_sq += y * y;
            }
        }
        (2.0 * sum_sq / (n - n / 2) as f64).sqrt()
    }

    #[test_case(1)]
    #[test_case(2)]
    #[test_case(5)]
    #[test_case(10)]
    fn test_low_pass_passband_and_stopband(order: usize) {
        let params = butterworth_low_pass(order, 48_000, 1000.0).unwrap();
        assert_eq!(params.size(), order + 1);
        let pass = response_at(&params, 48_000, 50.0);
        let stop = response_at(&params, 48_000, 12_000.0);
        // a first-order slope only reaches about -24 dB at 12x cutoff
        let stop_limit = if order == 1 { 0.1 } else { 0.05 };
        assert_abs_diff_eq!(pass, 1.0, epsilon = 0.05);
        assert!(stop < stop_limit, "order {order} stopband leak: {stop}");
    }

    #[test_case(1)]
    #[test_case(4)]
    #[test_case(9)]
    fn test_high_pass_passband_and_stopband(order: usize) {
        let params = butterworth_high_pass(order, 48_000, 4000.0).unwrap();
        assert_eq!(params.size(), order + 1);
        let pass = response_at(&params, 48_000, 16_000.0);
        let stop = response_at(&params, 48_000, 200.0);
        let stop_limit = if order == 1 { 0.1 } else { 0.05 };
        assert_abs_diff_eq!(pass, 1.0, epsilon = 0.05);
        assert!(stop < stop_limit, "order {order} stopband leak: {stop}");
    }

    #[test]
    fn test_band_pass_shape() {
        let params = butterworth_band_pass(3, 48_000, 800.0, 1200.0).unwrap();
        assert_eq!(params.size(), 2 * 3 + 1);
        let center = response_at(&params, 48_000, 1000.0);
        let below = response_at(&params, 48_000, 100.0);
        let above = response_at(&params, 48_000, 10_000.0);
        assert_abs_diff_eq!(center, 1.0, epsilon = 0.05);
        assert!(below < 0.05);
        assert!(above < 0.05);
    }

    #[test]
    fn test_band_stop_shape() {
        let params = butterworth_band_stop(3, 48_000, 800.0, 1200.0).unwrap();
        assert_eq!(params.size(), 2 * 3 + 1);
        let notch = response_at(&params, 48_000, 1000.0);
        let below = response_at(&params, 48_000, 100.0);
        let above = response_at(&params, 48_000, 10_000.0);
        assert!(notch < 0.05, "notch leak: {notch}");
        assert_abs_diff_eq!(below, 1.0, epsilon = 0.05);
        assert_abs_diff_eq!(above, 1.0, epsilon = 0.05);
    }

    #[test_case(1)]
    #[test_case(3)]
    #[test_case(5)]
    fn test_band_stop_unity_gain_at_band_edges(order: usize) {
        let params = butterworth_band_stop(order, 48_000, 800.0, 1200.0).unwrap();
        // H(1) = sum(b) / sum(a), H(-1) = alternating sums
        let dc: f64 = params.b.iter().sum::<f64>() / params.a.iter().sum::<f64>();
        let alt = |c: &[f64]| -> f64 {
            c.iter()
                .enumerate()
                .map(|(i, &v)| if i % 2 == 0 { v } else { -v })
                .sum()
        };
        let nyquist = alt(&params.b) / alt(&params.a);
        assert_abs_diff_eq!(dc, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(nyquist, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_order_limits() {
        assert!(butterworth_low_pass(0, 48_000, 1000.0).is_err());
        assert!(butterworth_low_pass(16, 48_000, 1000.0).is_err());
        assert!(butterworth_low_pass(15, 48_000, 1000.0).is_ok());
    }

    #[test]
    fn test_band_edges_order() {
        assert!(butterworth_band_pass(2, 48_000, 2000.0, 1000.0).is_err());
    }
}
