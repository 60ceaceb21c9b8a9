//! Chart rendering for the scored spreadsheet.
//!
//! | File | Needs | Plot |
//! |------|-------|------|
//! | `PDCAAS_by_SAMPLE.png` | `SAMPLE`, `PDCAAS` | bar, mean PDCAAS per sample |
//! | `PDCAAS_by_TPD.png`    | `TPD`, `PDCAAS`    | scatter, TPD (x) vs PDCAAS (y) |
//! | `ASS_by_PDCAAS.png`    | `ASS`, `PDCAAS`    | scatter, ASS (x) vs PDCAAS (y) |
//!
//! A chart whose columns are missing is silently skipped. Rows without a
//! numeric value are left out of the plot.
//!
//! Plots are drawn with `plotters` into an in-memory RGB buffer and saved
//! as PNG through the `image` crate. Text uses the DejaVu Sans face bundled
//! under `assets/`, so rendering never depends on system fonts.

use crate::error::PdcaasError;
use crate::persist::write_atomic;
use crate::pipeline::score::{ASS, PDCAAS, TPD};
use crate::table::Table;
use image::{ImageFormat, RgbImage};
use once_cell::sync::Lazy;
use plotters::backend::BitMapBackend;
use plotters::prelude::*;
use plotters::style::register_font;
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SAMPLE: &str = "SAMPLE";

pub const BAR_CHART_FILE: &str = "PDCAAS_by_SAMPLE.png";
pub const TPD_SCATTER_FILE: &str = "PDCAAS_by_TPD.png";
pub const ASS_SCATTER_FILE: &str = "ASS_by_PDCAAS.png";

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const MARGIN: u32 = 20;
const X_LABEL_AREA: u32 = 60;
const Y_LABEL_AREA: u32 = 70;
const MARKER_RADIUS: i32 = 4;

const SERIES: RGBColor = RGBColor(31, 119, 180);

const FONT_FAMILY: &str = "sans-serif";
static FONT_BYTES: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Registered once per process; `false` if the bundled face fails to parse.
static FONT_READY: Lazy<bool> =
    Lazy::new(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok());

type DrawResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Title and axis descriptions of one chart. Empty strings are not drawn.
#[derive(Debug, Clone, Copy)]
pub struct ChartText<'a> {
    pub title: &'a str,
    pub x_desc: &'a str,
    pub y_desc: &'a str,
}

pub const BAR_CHART_TEXT: ChartText<'static> = ChartText {
    title: "PDCAAS by SAMPLE",
    x_desc: "Sample",
    y_desc: "PDCAAS",
};

pub const TPD_SCATTER_TEXT: ChartText<'static> = ChartText {
    title: "PDCAAS by TPD",
    x_desc: "TPD",
    y_desc: "PDCAAS",
};

pub const ASS_SCATTER_TEXT: ChartText<'static> = ChartText {
    title: "ASS by PDCAAS",
    x_desc: "ASS",
    y_desc: "PDCAAS",
};

// ── Data preparation ─────────────────────────────────────────────────────

/// Mean of `value` per distinct `group` label, ordered by label.
///
/// Groups with no numeric value are dropped.
pub fn group_means(table: &Table, group: &str, value: &str) -> Option<Vec<(String, f64)>> {
    let groups = table.column(group)?;
    let values = table.column(value)?;

    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for (g, v) in groups.into_iter().zip(values) {
        if g.is_empty() {
            continue;
        }
        let Some(v) = v.as_number() else { continue };
        let entry = sums.entry(g.to_string()).or_insert((0.0, 0));
        entry.0 += v;
        entry.1 += 1;
    }

    Some(
        sums.into_iter()
            .map(|(label, (sum, n))| (label, sum / n as f64))
            .collect(),
    )
}

/// `(x, y)` pairs for rows where both columns are numeric.
pub fn numeric_pairs(table: &Table, x: &str, y: &str) -> Option<Vec<(f64, f64)>> {
    let xs = table.column(x)?;
    let ys = table.column(y)?;
    Some(
        xs.into_iter()
            .zip(ys)
            .filter_map(|(x, y)| Some((x.as_number()?, y.as_number()?)))
            .collect(),
    )
}

// ── Axis ranges ──────────────────────────────────────────────────────────

/// Data range padded by 5% so extreme points do not sit on the axes.
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (mut min, mut max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        (min, max) = (0.0, 1.0);
    }
    if (max - min).abs() < f64::EPSILON {
        min -= 1.0;
        max += 1.0;
    }
    let pad = (max - min) * 0.05;
    (min - pad)..(max + pad)
}

/// Range anchored at zero, for bar heights.
fn zero_based_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let max = if max - min < f64::EPSILON { min + 1.0 } else { max };
    min..(max + (max - min) * 0.05)
}

// ── Drawing ──────────────────────────────────────────────────────────────

fn ensure_font() -> DrawResult<()> {
    if *FONT_READY {
        Ok(())
    } else {
        Err("bundled chart font could not be parsed".into())
    }
}

fn blank_buffer() -> Vec<u8> {
    vec![0; (WIDTH * HEIGHT * 3) as usize]
}

fn into_image(buf: Vec<u8>) -> DrawResult<RgbImage> {
    RgbImage::from_raw(WIDTH, HEIGHT, buf).ok_or_else(|| "chart buffer has the wrong size".into())
}

/// Bar chart with one labelled bar per `(name, value)` pair.
fn bar_chart(bars: &[(String, f64)], text: &ChartText<'_>) -> DrawResult<RgbImage> {
    ensure_font()?;
    let mut buf = blank_buffer();
    {
        let root = BitMapBackend::with_buffer(&mut buf, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut builder = ChartBuilder::on(&root);
        builder
            .margin(MARGIN)
            .x_label_area_size(X_LABEL_AREA)
            .y_label_area_size(Y_LABEL_AREA);
        if !text.title.is_empty() {
            builder.caption(text.title, (FONT_FAMILY, 24));
        }

        let slots = bars.len().max(1) as u32;
        let mut chart = builder.build_cartesian_2d(
            (0u32..slots).into_segmented(),
            zero_based_range(bars.iter().map(|(_, v)| *v)),
        )?;

        let name_of = |v: &SegmentValue<u32>| match v {
            SegmentValue::CenterOf(i) => bars
                .get(*i as usize)
                .map(|(name, _)| name.clone())
                .unwrap_or_default(),
            _ => String::new(),
        };
        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh()
            .x_labels(bars.len() + 1)
            .x_label_formatter(&name_of);
        if !text.x_desc.is_empty() {
            mesh.x_desc(text.x_desc);
        }
        if !text.y_desc.is_empty() {
            mesh.y_desc(text.y_desc);
        }
        mesh.draw()?;

        chart.draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
            let i = i as u32;
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *value)],
                SERIES.filled(),
            );
            bar.set_margin(0, 0, 8, 8);
            bar
        }))?;

        root.present()?;
    }
    into_image(buf)
}

/// Scatter plot of `(x, y)` points.
fn scatter_chart(points: &[(f64, f64)], text: &ChartText<'_>) -> DrawResult<RgbImage> {
    ensure_font()?;
    let mut buf = blank_buffer();
    {
        let root = BitMapBackend::with_buffer(&mut buf, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut builder = ChartBuilder::on(&root);
        builder
            .margin(MARGIN)
            .x_label_area_size(X_LABEL_AREA)
            .y_label_area_size(Y_LABEL_AREA);
        if !text.title.is_empty() {
            builder.caption(text.title, (FONT_FAMILY, 24));
        }

        let mut chart = builder.build_cartesian_2d(
            padded_range(points.iter().map(|p| p.0)),
            padded_range(points.iter().map(|p| p.1)),
        )?;

        let mut mesh = chart.configure_mesh();
        if !text.x_desc.is_empty() {
            mesh.x_desc(text.x_desc);
        }
        if !text.y_desc.is_empty() {
            mesh.y_desc(text.y_desc);
        }
        mesh.draw()?;

        chart.draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), MARKER_RADIUS, SERIES.filled())),
        )?;

        root.present()?;
    }
    into_image(buf)
}

fn save_png(img: &RgbImage, path: &Path) -> Result<(), PdcaasError> {
    write_atomic(path, |tmp| {
        img.save_with_format(tmp, ImageFormat::Png)
            .map_err(|e| PdcaasError::ChartWriteFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })
    })
}

// ── Entry point ──────────────────────────────────────────────────────────

/// Render every chart whose columns exist in `table` into `out_dir`.
///
/// Returns the paths written, in the order of the table above.
pub fn render_charts(table: &Table, out_dir: &Path) -> Result<Vec<PathBuf>, PdcaasError> {
    let mut written = Vec::new();

    let mut emit = |name: &str, drawn: Option<DrawResult<RgbImage>>| -> Result<(), PdcaasError> {
        let path = out_dir.join(name);
        let img = match drawn {
            None => {
                debug!("Skipping {name}: required columns missing");
                return Ok(());
            }
            Some(Err(e)) => {
                return Err(PdcaasError::ChartWriteFailed {
                    path,
                    detail: e.to_string(),
                })
            }
            Some(Ok(img)) => img,
        };
        save_png(&img, &path)?;
        info!("Chart saved: {}", path.display());
        written.push(path);
        Ok(())
    };

    emit(
        BAR_CHART_FILE,
        group_means(table, SAMPLE, PDCAAS).map(|bars| bar_chart(&bars, &BAR_CHART_TEXT)),
    )?;
    emit(
        TPD_SCATTER_FILE,
        numeric_pairs(table, TPD, PDCAAS).map(|pts| scatter_chart(&pts, &TPD_SCATTER_TEXT)),
    )?;
    emit(
        ASS_SCATTER_FILE,
        numeric_pairs(table, ASS, PDCAAS).map(|pts| scatter_chart(&pts, &ASS_SCATTER_TEXT)),
    )?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    const NO_TEXT: ChartText<'static> = ChartText {
        title: "",
        x_desc: "",
        y_desc: "",
    };

    fn scored() -> Table {
        Table::new(
            ["SAMPLE", "ASS", "TPD", "PDCAAS"].map(String::from).to_vec(),
            vec![
                vec!["soy".into(), 80.0.into(), 50.0.into(), 40.0.into()],
                vec!["soy".into(), 90.0.into(), 60.0.into(), 54.0.into()],
                vec!["pea".into(), 70.0.into(), Cell::Empty, Cell::Empty],
                vec!["oat".into(), Cell::text("n.d."), 80.0.into(), 20.0.into()],
            ],
        )
    }

    /// Near-black pixels inside a rectangle; text is the only near-black
    /// content away from the axes.
    fn dark_pixels(img: &RgbImage, rows: Range<u32>, cols: Range<u32>) -> usize {
        rows.flat_map(|y| cols.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| img.get_pixel(x, y).0.iter().all(|&c| c < 100))
            .count()
    }

    const TITLE_ROWS: Range<u32> = MARGIN..MARGIN + 30;
    const TITLE_COLS: Range<u32> = 300..500;
    const X_LABEL_ROWS: Range<u32> = HEIGHT - MARGIN - X_LABEL_AREA + 8..HEIGHT - MARGIN;
    const PLOT_COLS: Range<u32> = MARGIN + Y_LABEL_AREA + 10..WIDTH - MARGIN - 10;

    #[test]
    fn group_means_skip_missing_values() {
        let means = group_means(&scored(), SAMPLE, PDCAAS).unwrap();
        assert_eq!(
            means,
            vec![("oat".to_string(), 20.0), ("soy".to_string(), 47.0)]
        );
    }

    #[test]
    fn pairs_need_both_numbers() {
        let pts = numeric_pairs(&scored(), ASS, PDCAAS).unwrap();
        assert_eq!(pts, vec![(80.0, 40.0), (90.0, 54.0)]);
        assert!(numeric_pairs(&scored(), "IVPD", PDCAAS).is_none());
    }

    #[test]
    fn ranges_pad_and_never_collapse() {
        let r = padded_range([0.0, 100.0].into_iter());
        assert!(r.start < 0.0 && r.end > 100.0);

        let flat = padded_range(std::iter::once(5.0));
        assert!(flat.start < 5.0 && flat.end > 5.0);

        let empty = padded_range(std::iter::empty());
        assert!(empty.end > empty.start);

        let bars = zero_based_range([20.0, 47.0].into_iter());
        assert_eq!(bars.start, 0.0);
        assert!(bars.end > 47.0);
    }

    #[test]
    fn bundled_font_registers() {
        assert!(*FONT_READY);
    }

    #[test]
    fn titles_and_axis_text_are_drawn() {
        let bars = vec![("oat".to_string(), 20.0), ("soy".to_string(), 47.0)];
        let labelled = bar_chart(&bars, &BAR_CHART_TEXT).unwrap();
        let bare = bar_chart(&bars, &NO_TEXT).unwrap();
        assert_ne!(labelled.as_raw(), bare.as_raw());
        assert!(dark_pixels(&labelled, TITLE_ROWS, TITLE_COLS) > 0);
        assert_eq!(dark_pixels(&bare, TITLE_ROWS, TITLE_COLS), 0);

        let pts = vec![(50.0, 40.0), (60.0, 54.0)];
        let labelled = scatter_chart(&pts, &TPD_SCATTER_TEXT).unwrap();
        let bare = scatter_chart(&pts, &NO_TEXT).unwrap();
        assert!(dark_pixels(&labelled, TITLE_ROWS, TITLE_COLS) > 0);
        assert_eq!(dark_pixels(&bare, TITLE_ROWS, TITLE_COLS), 0);
    }

    #[test]
    fn every_bar_gets_its_sample_name() {
        let named = vec![("oat".to_string(), 20.0), ("soy".to_string(), 47.0)];
        let unnamed = vec![(String::new(), 20.0), (String::new(), 47.0)];
        let with_names = bar_chart(&named, &NO_TEXT).unwrap();
        let without = bar_chart(&unnamed, &NO_TEXT).unwrap();

        let with_count = dark_pixels(&with_names, X_LABEL_ROWS, PLOT_COLS);
        let without_count = dark_pixels(&without, X_LABEL_ROWS, PLOT_COLS);
        assert!(
            with_count > without_count,
            "sample names add no text under the bars ({with_count} vs {without_count})"
        );
    }

    #[test]
    fn renders_all_three_charts() {
        let dir = tempfile::tempdir().unwrap();
        let written = render_charts(&scored(), dir.path()).unwrap();

        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec![BAR_CHART_FILE, TPD_SCATTER_FILE, ASS_SCATTER_FILE]);

        let img = image::open(&written[0]).unwrap();
        assert_eq!((img.width(), img.height()), (WIDTH, HEIGHT));
    }

    #[test]
    fn missing_columns_are_skipped_silently() {
        let dir = tempfile::tempdir().unwrap();
        let t = Table::new(
            vec!["ASS".into(), "PDCAAS".into()],
            vec![vec![80.0.into(), 40.0.into()]],
        );
        let written = render_charts(&t, dir.path()).unwrap();
        assert_eq!(written, vec![dir.path().join(ASS_SCATTER_FILE)]);
        assert!(!dir.path().join(BAR_CHART_FILE).exists());
    }

    #[test]
    fn empty_series_still_renders_axes() {
        let dir = tempfile::tempdir().unwrap();
        let t = Table::new(vec!["TPD".into(), "PDCAAS".into()], vec![]);
        let written = render_charts(&t, dir.path()).unwrap();
        assert_eq!(written.len(), 1);

        let empty_bars = bar_chart(&[], &BAR_CHART_TEXT).unwrap();
        assert_eq!(empty_bars.dimensions(), (WIDTH, HEIGHT));
    }
}
