use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;

use image::ImageReader;
use solquote_core::ChartLayout;
use tracing::warn;

use crate::canvas::{Font, PageCanvas, PdfWriter, Rgb, A4_HEIGHT};
use crate::chart_cache::ChartCache;
use crate::error::PdfError;
use crate::images::{prepare_for_slot, PreparedImage};
use crate::layout::{CONTENT_WIDTH, MARGIN};
use crate::logger::ExtendedPdfLogger;

const COMPONENT: &str = "charts";
const GRID_TOP: f32 = A4_HEIGHT - MARGIN - 30.0;
const GRID_BOTTOM: f32 = MARGIN + 20.0;
const GUTTER: f32 = 14.0;
const CAPTION_HEIGHT: f32 = 16.0;

/// Rectangle on the page, origin bottom left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slot {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Chart slots of one page for `layout`, top to bottom then left to right.
pub fn slots(layout: ChartLayout) -> Vec<Slot> {
    let grid_height = GRID_TOP - GRID_BOTTOM;
    let (columns, rows) = match layout {
        ChartLayout::OnePerPage => (1, 1),
        ChartLayout::TwoPerPage => (1, 2),
        ChartLayout::FourPerPage => (2, 2),
    };
    let width = (CONTENT_WIDTH - GUTTER * (columns - 1) as f32) / columns as f32;
    let height = (grid_height - GUTTER * (rows - 1) as f32) / rows as f32;

    let mut result = Vec::with_capacity(columns * rows);
    for row in 0..rows {
        for column in 0..columns {
            result.push(Slot {
                x: MARGIN + column as f32 * (width + GUTTER),
                y: GRID_TOP - (row + 1) as f32 * height - row as f32 * GUTTER,
                width,
                height,
            });
        }
    }
    result
}

/// Reads every PNG/JPEG in `dir` into an analysis map keyed by file stem.
pub fn load_chart_dir(dir: &Path) -> Result<BTreeMap<String, Vec<u8>>, PdfError> {
    let mut charts = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| matches!(extension.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"));
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        if is_image && path.is_file() {
            charts.insert(stem.to_string(), std::fs::read(&path)?);
        }
    }
    Ok(charts)
}

pub fn chart_title(key: &str) -> String {
    let spaced = key.replace(['_', '-'], " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Renders the selected charts found in `analysis`, `layout.charts_per_page()`
/// per page. Returns empty bytes when none of them is available.
pub fn charts_section(
    analysis: &BTreeMap<String, Vec<u8>>,
    selected: &[String],
    layout: ChartLayout,
    cache: Option<&Mutex<ChartCache>>,
    logger: &mut ExtendedPdfLogger,
) -> Result<Vec<u8>, PdfError> {
    let page_slots = slots(layout);
    let image_height = page_slots[0].height - CAPTION_HEIGHT;
    let image_width = page_slots[0].width;

    let mut prepared = Vec::new();
    for key in selected {
        let Some(data) = analysis.get(key) else {
            logger.warning(COMPONENT, format!("Diagramm `{key}` liegt nicht vor"));
            continue;
        };
        match prepare_chart(key, data, layout, image_width, image_height, cache) {
            Ok(image) => prepared.push((key.as_str(), image)),
            Err(error) => {
                logger.warning(COMPONENT, format!("Diagramm `{key}` ist nicht lesbar: {error}"))
            }
        }
    }
    if prepared.is_empty() {
        return Ok(Vec::new());
    }

    let mut writer = PdfWriter::new();
    for page in prepared.chunks(page_slots.len()) {
        let mut canvas = PageCanvas::default();
        canvas.text(MARGIN, A4_HEIGHT - MARGIN - 16.0, 16.0, Font::Bold, "Auswertungen");
        for ((key, image), slot) in page.iter().zip(&page_slots) {
            let handle = writer.add_jpeg(image.jpeg.clone(), image.width_px, image.height_px);
            let (width, height) = image.fit(slot.width, slot.height - CAPTION_HEIGHT);
            let x = slot.x + (slot.width - width) / 2.0;
            let y = slot.y + (slot.height - CAPTION_HEIGHT - height) / 2.0;
            canvas.text_colored(
                slot.x,
                slot.y + slot.height - 11.0,
                10.0,
                Font::Bold,
                Rgb::GREY,
                &chart_title(key),
            );
            canvas.image(&handle, x, y, width, height);
        }
        writer.add_page(canvas)?;
    }

    logger.info(
        COMPONENT,
        format!(
            "{} Diagramme auf {} Seiten eingefügt",
            prepared.len(),
            layout.page_count(prepared.len())
        ),
    );
    writer.finish()
}

fn prepare_chart(
    key: &str,
    data: &[u8],
    layout: ChartLayout,
    width: f32,
    height: f32,
    cache: Option<&Mutex<ChartCache>>,
) -> Result<PreparedImage, PdfError> {
    let cache_key = format!("{key}@{}", layout.charts_per_page());

    if let Some(jpeg) = cache.and_then(|cache| with_cache(cache, |c| c.get(&cache_key, data)).flatten()) {
        let (width_px, height_px) =
            ImageReader::new(Cursor::new(&jpeg)).with_guessed_format()?.into_dimensions()?;
        return Ok(PreparedImage { jpeg, width_px, height_px });
    }

    let image = prepare_for_slot(data, width, height)?;
    if let Some(cache) = cache {
        with_cache(cache, |c| c.put(&cache_key, data, image.jpeg.clone()));
    }
    Ok(image)
}

/// Runs `f` on the locked cache. A poisoned lock disables caching for the call.
fn with_cache<T>(cache: &Mutex<ChartCache>, f: impl FnOnce(&mut ChartCache) -> T) -> Option<T> {
    match cache.lock() {
        Ok(mut guard) => Some(f(&mut guard)),
        Err(_) => {
            warn!(event_name = "pdf.chart_cache.poisoned", "chart cache lock poisoned");
            None
        }
    }
}
