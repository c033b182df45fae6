use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::{padded_range, save, Figure, PlotError};

#[derive(Debug, Clone)]
pub struct StemOptions {
    pub caption: String,
    pub x_desc: String,
    pub y_desc: String,
}

impl Default for StemOptions {
    fn default() -> Self {
        Self {
            caption: "Peak IFN by DIP Burst Size".to_string(),
            x_desc: "DIP Burst Size".to_string(),
            y_desc: "Max IFN".to_string(),
        }
    }
}

/// Index of the largest finite value; ties keep the first.
fn max_index(points: &[(f64, f64)]) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.1.is_finite())
        .fold(None, |best: Option<(usize, f64)>, (i, p)| match best {
            Some((_, v)) if v >= p.1 => best,
            _ => Some((i, p.1)),
        })
        .map(|(i, _)| i)
}

pub(crate) fn draw_stems<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    points: &[(f64, f64)],
    opts: &StemOptions,
) -> Result<(), PlotError> {
    let top = max_index(points).ok_or(PlotError::NoData)?;
    let x_range = padded_range(points.iter().map(|p| p.0), 0.05);
    let y_range = padded_range(
        points.iter().map(|p| p.1).chain(std::iter::once(0.0)),
        0.08,
    );

    let mut chart = ChartBuilder::on(area)
        .caption(&opts.caption, ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc(opts.x_desc.as_str())
        .y_desc(opts.y_desc.as_str())
        .draw()?;

    let finite = points.iter().enumerate().filter(|(_, p)| p.1.is_finite());
    chart.draw_series(finite.clone().map(|(i, &(x, y))| {
        let style = if i == top {
            RED.stroke_width(3)
        } else {
            BLACK.stroke_width(1)
        };
        PathElement::new(vec![(x, 0.0), (x, y)], style)
    }))?;
    chart.draw_series(finite.map(|(i, &(x, y))| {
        if i == top {
            Circle::new((x, y), 6, RED.filled())
        } else {
            Circle::new((x, y), 4, BLACK.filled())
        }
    }))?;
    Ok(())
}

struct StemFigure<'a> {
    points: &'a [(f64, f64)],
    opts: &'a StemOptions,
}

impl Figure for StemFigure<'_> {
    fn size(&self) -> (u32, u32) {
        (1200, 800)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), PlotError> {
        draw_stems(root, self.points, self.opts)
    }
}

/// One stem per `(x, value)` pair; the largest value is drawn in red.
pub fn render_stems(
    path: &Path,
    points: &[(f64, f64)],
    opts: &StemOptions,
) -> Result<(), PlotError> {
    save(&StemFigure { points, opts }, path)
}
