use std::path::Path;

use dipfig_analysis::compare::{InfectionCounts, PlaqueSeries};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::{dash_segments, padded_range, save, Figure, PlotError};

/// Vertical scale of the infection comparison. `Log` plots `ln(max(count, 1))`
/// on a linear axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Linear,
    Log,
}

impl Scale {
    fn label(self) -> &'static str {
        match self {
            Scale::Linear => "Linear",
            Scale::Log => "Log",
        }
    }

    fn y_desc(self) -> &'static str {
        match self {
            Scale::Linear => "Cell Count",
            Scale::Log => "Log(Cell Count)",
        }
    }
}

const PANEL_COLORS: [RGBColor; 4] = [
    RGBColor(214, 39, 40),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(0, 0, 0),
];

const SIMULATION_DASHES: usize = 12;

struct PlaqueFigure<'a> {
    series: &'a PlaqueSeries,
}

impl Figure for PlaqueFigure<'_> {
    fn size(&self) -> (u32, u32) {
        (1000, 800)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), PlotError> {
        let s = self.series;
        if s.time.is_empty() {
            return Err(PlotError::NoData);
        }
        let x_range = padded_range(s.time.iter().copied(), 0.05);
        let y_range = padded_range(
            s.simulated
                .iter()
                .chain(&s.experiment)
                .copied()
                .chain(std::iter::once(0.0)),
            0.08,
        );
        let mut chart = ChartBuilder::on(root)
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)?;
        chart
            .configure_mesh()
            .x_desc("Time (hours)")
            .y_desc("Dead Cell, %")
            .draw()?;

        let sim_line = RED.mix(0.6).stroke_width(5);
        let simulated: Vec<(f64, f64)> = s
            .time
            .iter()
            .copied()
            .zip(s.simulated.iter().copied())
            .filter(|p| p.1.is_finite())
            .collect();
        chart.draw_series(LineSeries::new(simulated.clone(), sim_line))?;
        chart
            .draw_series(
                simulated
                    .iter()
                    .map(|&p| TriangleMarker::new(p, 10, RED.filled())),
            )?
            .label("Simulation Result")
            .legend(move |(x, y)| {
                EmptyElement::at((x, y))
                    + PathElement::new(vec![(0, 0), (20, 0)], sim_line)
                    + TriangleMarker::new((10, 0), 8, RED.filled())
            });

        chart
            .draw_series(
                s.time
                    .iter()
                    .zip(&s.experiment)
                    .filter(|(_, v)| v.is_finite())
                    .map(|(&t, &v)| {
                        EmptyElement::at((t, v))
                            + Polygon::new(vec![(-9, -9), (9, -9), (0, 9)], BLACK.filled())
                    }),
            )?
            .label("Experiment")
            .legend(|(x, y)| {
                EmptyElement::at((x + 10, y))
                    + Polygon::new(vec![(-7, -7), (7, -7), (0, 7)], BLACK.filled())
            });

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    }
}

/// Simulated against experimental dead-cell percentage.
pub fn render_plaque_comparison(path: &Path, series: &PlaqueSeries) -> Result<(), PlotError> {
    save(&PlaqueFigure { series }, path)
}

struct InfectionFigure<'a> {
    experiment: &'a InfectionCounts,
    simulation: &'a InfectionCounts,
    scale: Scale,
}

impl Figure for InfectionFigure<'_> {
    fn size(&self) -> (u32, u32) {
        (1800, 1400)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), PlotError> {
        let (experiment, simulation) = match self.scale {
            Scale::Linear => (self.experiment.clone(), self.simulation.clone()),
            Scale::Log => (self.experiment.ln_clamped(), self.simulation.ln_clamped()),
        };
        let title = format!(
            "Experimental Data vs Simulation Results - {} Scale Comparison",
            self.scale.label()
        );
        let root = root.titled(&title, ("sans-serif", 30))?;
        let panels = root.split_evenly((2, 2));

        for (((panel, (name, exp)), (_, sim)), color) in panels
            .iter()
            .zip(experiment.panels())
            .zip(simulation.panels())
            .zip(PANEL_COLORS)
        {
            let exp_points: Vec<(f64, f64)> = experiment
                .time
                .iter()
                .copied()
                .zip(exp.iter().copied())
                .filter(|p| p.1.is_finite())
                .collect();
            let sim_points: Vec<(f64, f64)> = simulation
                .time
                .iter()
                .copied()
                .zip(sim.iter().copied())
                .filter(|p| p.1.is_finite())
                .collect();
            let x_range = padded_range(
                exp_points.iter().chain(&sim_points).map(|p| p.0),
                0.05,
            );
            let y_range = padded_range(
                exp_points.iter().chain(&sim_points).map(|p| p.1),
                0.1,
            );

            let mut chart = ChartBuilder::on(panel)
                .caption(
                    format!("{} ({})", name, self.scale.label()),
                    ("sans-serif", 24),
                )
                .margin(15)
                .x_label_area_size(45)
                .y_label_area_size(70)
                .build_cartesian_2d(x_range, y_range)?;
            chart
                .configure_mesh()
                .x_desc("Time (hours)")
                .y_desc(self.scale.y_desc())
                .draw()?;

            let solid = color.stroke_width(3);
            chart
                .draw_series(LineSeries::new(exp_points.clone(), solid))?
                .label("Experiment")
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], solid));
            chart.draw_series(
                exp_points
                    .iter()
                    .map(|&p| Circle::new(p, 5, color.filled())),
            )?;

            chart
                .draw_series(
                    dash_segments(&sim_points, SIMULATION_DASHES)
                        .into_iter()
                        .map(|dash| PathElement::new(dash, solid)),
                )?
                .label("Simulation")
                .legend(move |(x, y)| {
                    EmptyElement::at((x, y))
                        + PathElement::new(vec![(0, 0), (8, 0)], solid)
                        + PathElement::new(vec![(12, 0), (20, 0)], solid)
                });
            chart.draw_series(
                sim_points
                    .iter()
                    .map(|&p| TriangleMarker::new(p, 6, color.filled())),
            )?;

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }
        Ok(())
    }
}

/// Four panels (virion, DIP, dual infected, susceptible) with the experiment
/// solid and the simulation dashed.
pub fn render_infection_comparison(
    path: &Path,
    experiment: &InfectionCounts,
    simulation: &InfectionCounts,
    scale: Scale,
) -> Result<(), PlotError> {
    save(
        &InfectionFigure {
            experiment,
            simulation,
            scale,
        },
        path,
    )
}
