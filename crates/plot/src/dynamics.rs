use std::path::Path;

use dipfig_analysis::peak::GroupDynamics;
use dipfig_shared::config::{DYNAMICS_X_MAX, DYNAMICS_Y_MAX, VIRION_BURST_SIZE};
use dipfig_shared::table::format_value;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::stems::{draw_stems, StemOptions};
use crate::{padded_range, ramp_colors, save, Figure, PlotError};

#[derive(Debug, Clone)]
pub struct DynamicsOptions {
    pub virion_burst_size: f64,
    pub x_max: f64,
    /// Fixed upper y limit; `None` fits the data.
    pub y_max: Option<f64>,
    pub caption: String,
}

impl Default for DynamicsOptions {
    fn default() -> Self {
        Self {
            virion_burst_size: VIRION_BURST_SIZE,
            x_max: DYNAMICS_X_MAX,
            y_max: Some(DYNAMICS_Y_MAX),
            caption: "IFN Dynamics by Relative DIP Yield".to_string(),
        }
    }
}

/// Legend text for a group: its relative yield.
fn yield_label(key: u32, virion_burst_size: f64) -> String {
    format_value(key as f64 / virion_burst_size)
}

pub(crate) fn draw_dynamics<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    groups: &[GroupDynamics],
    highlight: Option<u32>,
    opts: &DynamicsOptions,
) -> Result<(), PlotError> {
    if groups.is_empty() {
        return Err(PlotError::NoData);
    }
    let y_max = opts.y_max.unwrap_or_else(|| {
        padded_range(groups.iter().flat_map(|g| g.mean.iter().copied()), 0.05)
            .end
            .max(1e-9)
    });

    let mut chart = ChartBuilder::on(area)
        .caption(&opts.caption, ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..opts.x_max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Time")
        .y_desc("IFN Concentration")
        .draw()?;

    // The highlighted group goes last so it is drawn on top.
    let colors = ramp_colors(groups.len());
    let mut order: Vec<usize> = (0..groups.len()).collect();
    order.sort_by_key(|&i| highlight == Some(groups[i].key));

    for i in order {
        let group = &groups[i];
        let style = if highlight == Some(group.key) {
            RED.stroke_width(5)
        } else {
            colors[i].stroke_width(2)
        };
        let points: Vec<(f64, f64)> = group
            .time
            .iter()
            .zip(&group.mean)
            .filter(|(t, v)| **t <= opts.x_max && v.is_finite())
            .map(|(&t, &v)| (t, v.min(y_max)))
            .collect();
        chart
            .draw_series(LineSeries::new(points, style))?
            .label(yield_label(group.key, opts.virion_burst_size))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

struct DynamicsFigure<'a> {
    groups: &'a [GroupDynamics],
    highlight: Option<u32>,
    opts: &'a DynamicsOptions,
}

impl Figure for DynamicsFigure<'_> {
    fn size(&self) -> (u32, u32) {
        (1400, 1000)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), PlotError> {
        draw_dynamics(root, self.groups, self.highlight, self.opts)
    }
}

/// Averaged time course of every group; `highlight` is drawn red and thicker.
pub fn render_dynamics(
    path: &Path,
    groups: &[GroupDynamics],
    highlight: Option<u32>,
    opts: &DynamicsOptions,
) -> Result<(), PlotError> {
    save(
        &DynamicsFigure {
            groups,
            highlight,
            opts,
        },
        path,
    )
}

struct SweepFigure<'a> {
    dynamics: DynamicsFigure<'a>,
    maxima: &'a [(f64, f64)],
    stems: &'a StemOptions,
}

impl Figure for SweepFigure<'_> {
    fn size(&self) -> (u32, u32) {
        (2200, 900)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), PlotError> {
        let (left, right) = root.split_horizontally(1200);
        self.dynamics.draw(&left)?;
        draw_stems(&right, self.maxima, self.stems)
    }
}

/// Sweep figure: run dynamics on the left, maximum per burst size as stems
/// on the right.
pub fn render_sweep(
    path: &Path,
    groups: &[GroupDynamics],
    highlight: Option<u32>,
    opts: &DynamicsOptions,
    maxima: &[(f64, f64)],
    stems: &StemOptions,
) -> Result<(), PlotError> {
    save(
        &SweepFigure {
            dynamics: DynamicsFigure {
                groups,
                highlight,
                opts,
            },
            maxima,
            stems,
        },
        path,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yield_label() {
        assert_eq!(yield_label(700, 50.0), "14");
        assert_eq!(yield_label(125, 50.0), "2.5");
    }
}
