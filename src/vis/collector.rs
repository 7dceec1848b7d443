//! Figure collection and PDF export
//!
//! Analyses push their charts into a [`FigureCollector`]; at the end of a
//! run the collector renders every chart to a bitmap and writes them as
//! consecutive pages of one PDF document.

use std::fs;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::core::error::Result;
use crate::vis::chart::Chart;
use crate::vis::plotters::{render_rgb, save_png};

/// A rendered page: width, height and packed RGB pixels
#[derive(Debug, Clone)]
pub struct PageImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// Accumulates charts in the order they were produced
#[derive(Debug, Default)]
pub struct FigureCollector {
    charts: Vec<Chart>,
}

impl FigureCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, chart: Chart) {
        self.charts.push(chart);
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    pub fn charts(&self) -> &[Chart] {
        &self.charts
    }

    /// Save one chart as PNG without collecting it
    pub fn save_png<P: AsRef<Path>>(&self, chart: &Chart, path: P) -> Result<()> {
        save_png(chart, path)
    }

    /// Write every collected chart as one PDF page, in order, then clear
    ///
    /// Returns the number of pages written. With nothing collected no file
    /// is created.
    pub fn flush_pdf<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        if self.charts.is_empty() {
            log::info!("No figures to export");
            return Ok(0);
        }

        let pages = self
            .charts
            .iter()
            .map(|chart| {
                let (width, height) = chart.size();
                Ok(PageImage {
                    width,
                    height,
                    rgb: render_rgb(chart)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let count = write_pdf_pages(&pages, path.as_ref())?;
        log::info!("Exported {} figures to {}", count, path.as_ref().display());
        self.charts.clear();
        Ok(count)
    }
}

/// Write images as full-bleed PDF pages, one image per page
pub fn write_pdf_pages(pages: &[PageImage], path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());

    for page in pages {
        let width = i64::from(page.width);
        let height = i64::from(page.height);

        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            page.rgb.clone(),
        );
        let image_id = doc.add_object(image);

        // scale the unit image square to the page
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width.into(),
                        0.into(),
                        0.into(),
                        height.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let resources_id = doc.add_object(dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        });

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    doc.save(path)?;

    Ok(pages.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vis::config::PlotSettings;
    use tempfile::tempdir;

    fn blank_page(width: u32, height: u32) -> PageImage {
        PageImage {
            width,
            height,
            rgb: vec![255; (width * height * 3) as usize],
        }
    }

    #[test]
    fn test_write_pdf_pages_keeps_page_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("figures.pdf");

        let written = write_pdf_pages(&[blank_page(20, 10), blank_page(10, 10)], &path).unwrap();
        assert_eq!(written, 2);

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_empty_flush_creates_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("figures.pdf");

        let mut collector = FigureCollector::new();
        assert_eq!(collector.flush_pdf(&path).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_collector_keeps_order() {
        let mut collector = FigureCollector::new();
        for title in ["first", "second"] {
            collector.add(Chart::bar(
                PlotSettings::new(title, "x", "y"),
                vec!["a".to_string()],
                vec![1.0],
            ));
        }
        assert_eq!(collector.len(), 2);
        let titles: Vec<&str> = collector.charts().iter().map(|c| c.title()).collect();
        assert_eq!(titles, vec!["first", "second"]);
    }
}
