//! Configuration for chart rendering

use crate::config::PlotDefaults;

/// Default palette, cycled across groups and series
pub const DEFAULT_PALETTE: [(u8, u8, u8); 8] = [
    (0, 123, 255),  // Blue
    (255, 99, 71),  // Red
    (46, 204, 113), // Green
    (255, 193, 7),  // Yellow
    (142, 68, 173), // Purple
    (52, 152, 219), // Cyan
    (243, 156, 18), // Orange
    (211, 84, 0),   // Brown
];

/// Plot settings shared by every chart kind
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSettings {
    /// Title
    pub title: String,
    /// X-axis label
    pub x_label: String,
    /// Y-axis label
    pub y_label: String,
    /// Width of the graph (pixels)
    pub width: u32,
    /// Height of the graph (pixels)
    pub height: u32,
    /// Show legend
    pub show_legend: bool,
    /// Show grid
    pub show_grid: bool,
    /// Color palette
    pub color_palette: Vec<(u8, u8, u8)>,
}

impl Default for PlotSettings {
    fn default() -> Self {
        PlotSettings {
            title: "Plot".to_string(),
            x_label: String::new(),
            y_label: String::new(),
            width: 1000,
            height: 600,
            show_legend: true,
            show_grid: true,
            color_palette: DEFAULT_PALETTE.to_vec(),
        }
    }
}

impl PlotSettings {
    pub fn new(title: impl Into<String>, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        PlotSettings {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            ..Default::default()
        }
    }

    /// Take the size from the run configuration
    pub fn sized(mut self, defaults: &PlotDefaults) -> Self {
        self.width = defaults.width;
        self.height = defaults.height;
        self
    }

    /// Palette color for series `idx`
    pub fn color(&self, idx: usize) -> (u8, u8, u8) {
        if self.color_palette.is_empty() {
            return DEFAULT_PALETTE[idx % DEFAULT_PALETTE.len()];
        }
        self.color_palette[idx % self.color_palette.len()]
    }
}
