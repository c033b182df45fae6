//! Locally weighted scatterplot smoothing.

#[inline]
fn tricube(d: f64) -> f64 {
    if d >= 1.0 {
        0.0
    } else {
        let t = 1.0 - d * d * d;
        t * t * t
    }
}

#[inline]
fn bisquare(r: f64) -> f64 {
    if r.abs() >= 1.0 {
        0.0
    } else {
        let t = 1.0 - r * r;
        t * t
    }
}

fn median(values: &[f64]) -> f64 {
    super::quantile(values, 0.5)
}

/// Weighted least-squares line through `(x, y)` evaluated at `x0`.
fn local_fit(x: &[f64], y: &[f64], w: &[f64], x0: f64) -> f64 {
    let sw: f64 = w.iter().sum();
    if sw <= 0.0 {
        return f64::NAN;
    }
    let mx = x.iter().zip(w).map(|(a, b)| a * b).sum::<f64>() / sw;
    let my = y.iter().zip(w).map(|(a, b)| a * b).sum::<f64>() / sw;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for ((&xi, &yi), &wi) in x.iter().zip(y).zip(w) {
        sxx += wi * (xi - mx) * (xi - mx);
        sxy += wi * (xi - mx) * (yi - my);
    }
    let range = x.last().copied().unwrap_or(0.0) - x.first().copied().unwrap_or(0.0);
    if sxx <= 1e-12 * range.max(1.0).powi(2) * sw {
        return my;
    }
    my + sxy / sxx * (x0 - mx)
}

/// Fits `y` on `x` with a neighbourhood of `frac * n` points and `iters`
/// robustifying passes. Returns `(x, fitted)` sorted by `x`.
pub fn lowess(x: &[f64], y: &[f64], frac: f64, iters: usize) -> Vec<(f64, f64)> {
    let mut pairs: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    let n = pairs.len();
    if n == 0 {
        return Vec::new();
    }
    let xs: Vec<f64> = pairs.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    let k = ((frac * n as f64 + 1e-10) as usize).clamp(2.min(n), n);

    let mut robust = vec![1.0; n];
    let mut fitted = vec![0.0; n];
    let mut weights = vec![0.0; n];
    let mut dists = vec![0.0; n];

    for pass in 0..=iters {
        for i in 0..n {
            let x0 = xs[i];
            for (d, &xj) in dists.iter_mut().zip(&xs) {
                *d = (xj - x0).abs();
            }
            let mut sorted = dists.clone();
            sorted.sort_by(|a, b| a.total_cmp(b));
            let h = sorted[k - 1];
            for j in 0..n {
                let base = if h > 0.0 {
                    tricube(dists[j] / h)
                } else if dists[j] == 0.0 {
                    1.0
                } else {
                    0.0
                };
                weights[j] = base * robust[j];
            }
            let f = local_fit(&xs, &ys, &weights, x0);
            fitted[i] = if f.is_nan() { ys[i] } else { f };
        }

        if pass == iters {
            break;
        }
        let residuals: Vec<f64> = ys.iter().zip(&fitted).map(|(a, b)| a - b).collect();
        let abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
        let s = median(&abs);
        let scale = ys.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        // Residuals at rounding level: the fit is already exact.
        if s <= 1e-10 * scale.max(1.0) {
            break;
        }
        for (w, r) in robust.iter_mut().zip(&residuals) {
            *w = bisquare(r / (6.0 * s));
        }
    }

    xs.into_iter().zip(fitted).collect()
}
