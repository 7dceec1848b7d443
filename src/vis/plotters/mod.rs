//! Chart rendering with Plotters
//!
//! Every [`Chart`] is drawn through [`draw_chart`] onto any plotters
//! drawing area, so the same code produces PNG files and the in-memory
//! bitmaps that become PDF pages.

use std::fs;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::core::error::{Error, Result};
use crate::vis::chart::Chart;
use crate::vis::config::PlotSettings;

fn rgb((r, g, b): (u8, u8, u8)) -> RGBColor {
    RGBColor(r, g, b)
}

/// Category name for a segment, empty outside the axis
fn segment_label(value: &SegmentValue<usize>, categories: &[String]) -> String {
    match value {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
            categories.get(*i).cloned().unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    }
}

/// Category name under the middle bar of each group of `slots` segments
fn slot_label(value: &SegmentValue<usize>, categories: &[String], slots: usize) -> String {
    match value {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) if i % slots == slots / 2 => {
            categories.get(i / slots).cloned().unwrap_or_default()
        }
        _ => String::new(),
    }
}

fn finite_max(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
        Some(m) if m >= v => Some(m),
        _ => Some(v),
    })
}

fn upper_bound(max: Option<f64>) -> f64 {
    match max {
        Some(m) if m > 0.0 => m * 1.1,
        _ => 1.0,
    }
}

/// Draw `chart` onto `root`
pub fn draw_chart<DB>(root: &DrawingArea<DB, Shift>, chart: &Chart) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    match chart {
        Chart::Bar {
            settings,
            categories,
            values,
        } => draw_bar(root, settings, categories, values),
        Chart::GroupedBar {
            settings,
            categories,
            series,
        } => draw_grouped_bar(root, settings, categories, series),
        Chart::Box { settings, groups } => draw_box(root, settings, groups),
        Chart::Density { settings, series } => draw_density(root, settings, series),
    }
}

fn draw_bar<DB>(
    root: &DrawingArea<DB, Shift>,
    settings: &PlotSettings,
    categories: &[String],
    values: &[f64],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if categories.is_empty() {
        return Err(Error::Visualization("No data to plot".to_string()));
    }
    let n = categories.len();
    let y_max = upper_bound(finite_max(values.iter().copied()));

    let mut chart = ChartBuilder::on(root)
        .caption(&settings.title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n).into_segmented(), 0f64..y_max)?;

    let x_label = |v: &SegmentValue<usize>| segment_label(v, categories);
    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&x_label)
        .x_desc(settings.x_label.as_str())
        .y_desc(settings.y_label.as_str());
    if !settings.show_grid {
        mesh.disable_y_mesh();
    }
    mesh.draw()?;

    let color = rgb(settings.color(0));
    chart.draw_series(
        Histogram::vertical(&chart)
            .style(color.filled())
            .margin(10)
            .data(
                values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.is_finite())
                    .map(|(i, v)| (i, *v)),
            ),
    )?;

    Ok(())
}

fn draw_grouped_bar<DB>(
    root: &DrawingArea<DB, Shift>,
    settings: &PlotSettings,
    categories: &[String],
    series: &[(String, Vec<f64>)],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if categories.is_empty() || series.is_empty() {
        return Err(Error::Visualization("No data to plot".to_string()));
    }
    // every category gets one slot per series plus a spacer
    let slots = series.len() + 1;
    let n = categories.len() * slots;
    let y_max = upper_bound(finite_max(series.iter().flat_map(|(_, v)| v.iter().copied())));

    let mut chart = ChartBuilder::on(root)
        .caption(&settings.title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n).into_segmented(), 0f64..y_max)?;

    let x_label = |v: &SegmentValue<usize>| slot_label(v, categories, slots);
    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&x_label)
        .x_desc(settings.x_label.as_str())
        .y_desc(settings.y_label.as_str());
    if !settings.show_grid {
        mesh.disable_y_mesh();
    }
    mesh.draw()?;

    for (s, (name, values)) in series.iter().enumerate() {
        let color = rgb(settings.color(s));
        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(color.filled())
                    .margin(1)
                    .data(
                        values
                            .iter()
                            .enumerate()
                            .filter(|(_, v)| v.is_finite())
                            .map(|(c, v)| (c * slots + s, *v)),
                    ),
            )?
            .label(name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    if settings.show_legend {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    Ok(())
}

fn draw_box<DB>(
    root: &DrawingArea<DB, Shift>,
    settings: &PlotSettings,
    groups: &[(String, Vec<f64>)],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if groups.is_empty() {
        return Err(Error::Visualization("No data to plot".to_string()));
    }
    let labels: Vec<String> = groups.iter().map(|(l, _)| l.clone()).collect();
    let values = groups.iter().flat_map(|(_, v)| v.iter().copied()).filter(|v| v.is_finite());
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() {
        return Err(Error::Visualization("No data to plot".to_string()));
    }
    let pad = if hi > lo { (hi - lo) * 0.1 } else { 1.0 };
    let n = groups.len();

    let mut chart = ChartBuilder::on(root)
        .caption(&settings.title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n).into_segmented(), (lo - pad) as f32..(hi + pad) as f32)?;

    let x_label = |v: &SegmentValue<usize>| segment_label(v, &labels);
    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&x_label)
        .x_desc(settings.x_label.as_str())
        .y_desc(settings.y_label.as_str());
    if !settings.show_grid {
        mesh.disable_y_mesh();
    }
    mesh.draw()?;

    chart.draw_series(groups.iter().enumerate().map(|(i, (_, values))| {
        let quartiles = Quartiles::new(values);
        Boxplot::new_vertical(SegmentValue::CenterOf(i), &quartiles)
            .width(30)
            .whisker_width(0.5)
            .style(rgb(settings.color(i)))
    }))?;

    Ok(())
}

fn draw_density<DB>(
    root: &DrawingArea<DB, Shift>,
    settings: &PlotSettings,
    series: &[(String, Vec<(f64, f64)>)],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let points = || series.iter().flat_map(|(_, pts)| pts.iter());
    let (x_lo, x_hi) = points().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (x, _)| {
        (lo.min(*x), hi.max(*x))
    });
    if !(x_hi > x_lo) {
        return Err(Error::Visualization("No data to plot".to_string()));
    }
    let y_max = upper_bound(finite_max(points().map(|(_, y)| *y)));

    let mut chart = ChartBuilder::on(root)
        .caption(&settings.title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, 0f64..y_max)?;

    let mut mesh = chart.configure_mesh();
    mesh.x_desc(settings.x_label.as_str())
        .y_desc(settings.y_label.as_str());
    if !settings.show_grid {
        mesh.disable_mesh();
    }
    mesh.draw()?;

    for (i, (name, pts)) in series.iter().enumerate() {
        let color = rgb(settings.color(i));
        chart
            .draw_series(AreaSeries::new(pts.iter().copied(), 0.0, color.mix(0.2)).border_style(color.stroke_width(2)))?
            .label(name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    if settings.show_legend {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    Ok(())
}

/// Render a chart to a PNG file, creating parent directories
pub fn save_png<P: AsRef<Path>>(chart: &Chart, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let root = BitMapBackend::new(path, chart.size()).into_drawing_area();
    draw_chart(&root, chart)?;
    root.present()?;
    log::debug!("Saved chart '{}' to {}", chart.title(), path.display());
    Ok(())
}

/// Render a chart to packed 8-bit RGB pixels, row by row from the top
pub fn render_rgb(chart: &Chart) -> Result<Vec<u8>> {
    let (width, height) = chart.size();
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw_chart(&root, chart)?;
        root.present()?;
    }
    Ok(buffer)
}
