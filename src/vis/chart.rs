//! Chart specifications
//!
//! A [`Chart`] holds everything needed to draw it, so charts can be
//! collected first and rendered later onto any plotters backend.

use crate::core::error::Result;
use crate::stats::descriptive::kernel_density;
use crate::vis::config::PlotSettings;

/// Points evaluated per density curve
pub const DENSITY_POINTS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    /// One bar per category
    Bar {
        settings: PlotSettings,
        categories: Vec<String>,
        values: Vec<f64>,
    },
    /// For every category, one bar per series
    GroupedBar {
        settings: PlotSettings,
        categories: Vec<String>,
        series: Vec<(String, Vec<f64>)>,
    },
    /// One box per group
    Box {
        settings: PlotSettings,
        groups: Vec<(String, Vec<f64>)>,
    },
    /// Kernel density curves, one per group
    Density {
        settings: PlotSettings,
        series: Vec<(String, Vec<(f64, f64)>)>,
    },
}

impl Chart {
    pub fn bar(settings: PlotSettings, categories: Vec<String>, values: Vec<f64>) -> Self {
        Chart::Bar {
            settings,
            categories,
            values,
        }
    }

    pub fn grouped_bar(
        settings: PlotSettings,
        categories: Vec<String>,
        series: Vec<(String, Vec<f64>)>,
    ) -> Self {
        Chart::GroupedBar {
            settings,
            categories,
            series,
        }
    }

    /// Box plot; NaN values are dropped and empty groups skipped
    pub fn boxes(settings: PlotSettings, groups: Vec<(String, Vec<f64>)>) -> Self {
        let groups = groups
            .into_iter()
            .map(|(label, values)| (label, values.into_iter().filter(|v| !v.is_nan()).collect::<Vec<_>>()))
            .filter(|(_, values)| !values.is_empty())
            .collect();
        Chart::Box { settings, groups }
    }

    /// Density chart from raw samples
    pub fn density(settings: PlotSettings, samples: &[(String, Vec<f64>)]) -> Result<Self> {
        let series = samples
            .iter()
            .map(|(label, values)| Ok((label.clone(), kernel_density(values, DENSITY_POINTS)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Chart::Density { settings, series })
    }

    pub fn settings(&self) -> &PlotSettings {
        match self {
            Chart::Bar { settings, .. }
            | Chart::GroupedBar { settings, .. }
            | Chart::Box { settings, .. }
            | Chart::Density { settings, .. } => settings,
        }
    }

    pub fn title(&self) -> &str {
        &self.settings().title
    }

    /// Pixel size of the rendered chart
    pub fn size(&self) -> (u32, u32) {
        let settings = self.settings();
        (settings.width, settings.height)
    }
}
