//! Module providing chart construction and export
//!
//! Charts are described by [`Chart`] values, drawn with plotters, and
//! gathered by a [`FigureCollector`] into a single PDF per run.

pub mod chart;
pub mod collector;
pub mod config;
pub mod plotters;

pub use self::chart::Chart;
pub use self::collector::{write_pdf_pages, FigureCollector, PageImage};
pub use self::config::PlotSettings;
pub use self::plotters::{draw_chart, render_rgb, save_png};
