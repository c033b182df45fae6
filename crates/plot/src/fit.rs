use std::path::Path;

use dipfig_analysis::peak::GroupDynamics;
use dipfig_analysis::PeakAnalysis;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::dynamics::{draw_dynamics, DynamicsOptions};
use crate::{dash_segments, padded_range, save, Figure, PlotError, DARK_GREEN, GREY, STEEL_BLUE};

const LOESS_DASHES: usize = 40;

pub(crate) fn draw_peak_fit<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    analysis: &PeakAnalysis,
) -> Result<(), PlotError> {
    if analysis.x.is_empty() {
        return Err(PlotError::NoData);
    }
    let band = analysis
        .curve
        .band
        .iter()
        .flat_map(|&(lo, hi)| [lo, hi]);
    let x_range = padded_range(analysis.x.iter().copied(), 0.04);
    let y_range = padded_range(analysis.y.iter().copied().chain(band), 0.05);

    let mut chart = ChartBuilder::on(area)
        .caption("Peak IFN vs Relative DIP Yield", ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range.clone())?;

    chart
        .configure_mesh()
        .x_desc("Relative DIP Yield (DIP / Virion Burst Size)")
        .y_desc("Peak IFN Concentration")
        .draw()?;

    if let Some(ci) = &analysis.bootstrap {
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(ci.lo, y_range.start), (ci.hi, y_range.end)],
                GREY.mix(0.2).filled(),
            )))?
            .label(format!("Bootstrap CI [{:.1}, {:.1}]", ci.lo, ci.hi))
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], GREY.mix(0.2).filled()));
    }

    chart
        .draw_series(
            analysis
                .x
                .iter()
                .zip(&analysis.y)
                .map(|(&x, &y)| Circle::new((x, y), 4, STEEL_BLUE.mix(0.3).filled())),
        )?
        .label("Runs")
        .legend(|(x, y)| Circle::new((x + 10, y), 4, STEEL_BLUE.filled()));

    let curve = &analysis.curve;
    let mut band_poly: Vec<(f64, f64)> = curve
        .grid
        .iter()
        .zip(&curve.band)
        .map(|(&x, &(_, hi))| (x, hi))
        .collect();
    band_poly.extend(
        curve
            .grid
            .iter()
            .zip(&curve.band)
            .rev()
            .map(|(&x, &(lo, _))| (x, lo)),
    );
    if !band_poly.is_empty() && band_poly.iter().all(|p| p.1.is_finite()) {
        chart.draw_series(std::iter::once(Polygon::new(band_poly, RED.mix(0.2).filled())))?;
    }

    chart
        .draw_series(LineSeries::new(
            curve.grid.iter().copied().zip(curve.fit.iter().copied()),
            RED.stroke_width(3),
        ))?
        .label(format!("GAM fit (edf = {:.1})", analysis.edf))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(3)));

    let loess_style = DARK_GREEN.stroke_width(2);
    chart
        .draw_series(
            dash_segments(&analysis.lowess, LOESS_DASHES)
                .into_iter()
                .map(|dash| PathElement::new(dash, loess_style)),
        )?
        .label("LOESS")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 8, y)], loess_style));

    chart
        .draw_series(LineSeries::new(
            [(analysis.optimum, y_range.start), (analysis.optimum, y_range.end)],
            BLACK.stroke_width(2),
        ))?
        .label(format!("Optimum Yield = {:.1}", analysis.optimum))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

struct PeakFitFigure<'a> {
    analysis: &'a PeakAnalysis,
}

impl Figure for PeakFitFigure<'_> {
    fn size(&self) -> (u32, u32) {
        (1400, 1000)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), PlotError> {
        draw_peak_fit(root, self.analysis)
    }
}

/// Peak of every run against relative yield with the smooth fit, its band,
/// the LOESS curve, the optimum and its bootstrap interval.
pub fn render_peak_fit(path: &Path, analysis: &PeakAnalysis) -> Result<(), PlotError> {
    save(&PeakFitFigure { analysis }, path)
}

struct CombinedFigure<'a> {
    groups: &'a [GroupDynamics],
    highlight: Option<u32>,
    opts: &'a DynamicsOptions,
    analysis: &'a PeakAnalysis,
}

impl Figure for CombinedFigure<'_> {
    fn size(&self) -> (u32, u32) {
        (2400, 1000)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), PlotError> {
        let panels = root.split_evenly((1, 2));
        draw_dynamics(&panels[0], self.groups, self.highlight, self.opts)?;
        draw_peak_fit(&panels[1], self.analysis)
    }
}

/// Dynamics and peak-fit panels side by side.
pub fn render_combined(
    path: &Path,
    groups: &[GroupDynamics],
    highlight: Option<u32>,
    opts: &DynamicsOptions,
    analysis: &PeakAnalysis,
) -> Result<(), PlotError> {
    save(
        &CombinedFigure {
            groups,
            highlight,
            opts,
            analysis,
        },
        path,
    )
}
