use std::ops::Range;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

pub mod compare;
pub mod dynamics;
pub mod fit;
pub mod stems;

pub use compare::{render_infection_comparison, render_plaque_comparison, Scale};
pub use dynamics::{render_dynamics, render_sweep, DynamicsOptions};
pub use fit::{render_combined, render_peak_fit};
pub use stems::{render_stems, StemOptions};

#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error("unsupported figure format for {0} (expected .png or .svg)")]
    UnsupportedFormat(String),
    #[error("drawing failed: {0}")]
    Draw(String),
    #[error("nothing to plot")]
    NoData,
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for PlotError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        PlotError::Draw(err.to_string())
    }
}

/// Output encoding, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Png,
    Svg,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self, PlotError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "png" => Ok(Format::Png),
            "svg" => Ok(Format::Svg),
            _ => Err(PlotError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// A figure that can be drawn onto any plotters backend.
pub(crate) trait Figure {
    fn size(&self) -> (u32, u32);
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), PlotError>;
}

pub(crate) fn save<F: Figure>(figure: &F, path: &Path) -> Result<(), PlotError> {
    match Format::from_path(path)? {
        Format::Png => {
            let root = BitMapBackend::new(path, figure.size()).into_drawing_area();
            root.fill(&WHITE)?;
            figure.draw(&root)?;
            root.present()?;
        }
        Format::Svg => {
            let root = SVGBackend::new(path, figure.size()).into_drawing_area();
            root.fill(&WHITE)?;
            figure.draw(&root)?;
            root.present()?;
        }
    }
    tracing::info!(path = %path.display(), "saved figure");
    Ok(())
}

pub(crate) const STEEL_BLUE: RGBColor = RGBColor(70, 130, 180);
pub(crate) const DARK_GREEN: RGBColor = RGBColor(0, 128, 0);
pub(crate) const GREY: RGBColor = RGBColor(128, 128, 128);

const BLUES: [(f64, RGBColor); 3] = [
    (0.0, RGBColor(247, 251, 255)),
    (0.5, RGBColor(107, 174, 214)),
    (1.0, RGBColor(8, 48, 107)),
];

/// Sequential light-to-dark blue at `t` in `[0, 1]`.
pub fn blue_ramp(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let (lo, hi) = if t <= BLUES[1].0 {
        (BLUES[0], BLUES[1])
    } else {
        (BLUES[1], BLUES[2])
    };
    let f = (t - lo.0) / (hi.0 - lo.0);
    let (RGBColor(r0, g0, b0), RGBColor(r1, g1, b1)) = (lo.1, hi.1);
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * f).round() as u8;
    RGBColor(mix(r0, r1), mix(g0, g1), mix(b0, b1))
}

/// `n` ramp colours spread over `[0.3, 1.0]` so the lightest stays visible.
pub fn ramp_colors(n: usize) -> Vec<RGBColor> {
    match n {
        0 => Vec::new(),
        1 => vec![blue_ramp(1.0)],
        _ => (0..n)
            .map(|i| blue_ramp(0.3 + 0.7 * i as f64 / (n - 1) as f64))
            .collect(),
    }
}

/// Range covering the finite `values`, widened by `frac` of its span.
pub(crate) fn padded_range<I: IntoIterator<Item = f64>>(values: I, frac: f64) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return 0.0..1.0;
    }
    let span = hi - lo;
    let pad = if span > 0.0 {
        span * frac
    } else {
        lo.abs().max(1.0) * frac
    };
    (lo - pad)..(hi + pad)
}

/// Linear interpolation along an x-sorted polyline.
fn interpolate(points: &[(f64, f64)], x: f64) -> f64 {
    let i = points.partition_point(|p| p.0 < x);
    if i == 0 {
        return points[0].1;
    }
    if i == points.len() {
        return points[i - 1].1;
    }
    let (x0, y0) = points[i - 1];
    let (x1, y1) = points[i];
    if x1 == x0 {
        y1
    } else {
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}

/// Splits an x-sorted polyline into `n` dashes of equal x extent separated
/// by equal gaps.
pub(crate) fn dash_segments(points: &[(f64, f64)], n: usize) -> Vec<Vec<(f64, f64)>> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Vec::new();
    };
    if n == 0 || last.0 <= first.0 {
        return vec![points.to_vec()];
    }
    let step = (last.0 - first.0) / (2 * n) as f64;
    (0..n)
        .map(|k| {
            let a = first.0 + (2 * k) as f64 * step;
            let b = a + step;
            let mut dash = vec![(a, interpolate(points, a))];
            dash.extend(points.iter().copied().filter(|p| p.0 > a && p.0 < b));
            dash.push((b, interpolate(points, b)));
            dash
        })
        .collect()
}
