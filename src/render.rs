use crate::kind::ChartKind;
use crate::palette::Color as PaletteColor;
use crate::series::ChartData;
use crate::OutputFormat;
use anyhow::{Context, Result};
use image::ImageEncoder;
use log::debug;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, TextStr};
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use std::ops::Range;

const FONT: &str = "sans-serif";

/// Largest bitmap a canvas will allocate, in pixels
pub const MAX_CANVAS_PIXELS: u64 = 64 * 1024 * 1024;

/// Samples per segment of a smoothed line
const CURVE_STEPS: usize = 16;

/// Bound on either end of the value axis; keeps the axis span finite
const AXIS_LIMIT: f64 = f64::MAX / 4.0;

/// Drawing surface for prepared chart data.
///
/// A surface holds at most one chart; `teardown` must be called before
/// drawing into it again.
pub trait Renderer {
    fn draw(&mut self, chart: &ChartData, title: &str) -> Result<()>;

    fn teardown(&mut self);

    fn is_drawn(&self) -> bool;
}

impl From<PaletteColor> for RGBColor {
    fn from(c: PaletteColor) -> Self {
        RGBColor(c.r, c.g, c.b)
    }
}

/// Bitmap canvas backed by plotters
pub struct Canvas {
    buffer: Vec<u8>,
    width: u32,
    height: u32,
    scene: Option<(ChartData, String)>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixels = u64::from(width) * u64::from(height);
        if pixels > MAX_CANVAS_PIXELS {
            anyhow::bail!(
                "Canvas size {}x{} exceeds the limit of {} pixels",
                width,
                height,
                MAX_CANVAS_PIXELS
            );
        }
        let len = usize::try_from(pixels * 3).context("Canvas size does not fit in memory")?;

        Ok(Canvas {
            buffer: vec![0u8; len],
            width,
            height,
            scene: None,
        })
    }

    /// Serialize the drawn chart as PNG, SVG or PDF
    pub fn export(&self, format: OutputFormat) -> Result<Vec<u8>> {
        let (chart, title) = self
            .scene
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Nothing to export: draw a chart first"))?;

        match format {
            OutputFormat::Png => self.encode_png(),
            OutputFormat::Pdf => self.encode_pdf(title),
            OutputFormat::Svg => {
                let mut svg = String::new();
                {
                    let root = SVGBackend::with_string(&mut svg, (self.width, self.height))
                        .into_drawing_area();
                    draw_chart(&root, chart, title)?;
                    root.present().context("Failed to present SVG drawing")?;
                }
                Ok(svg.into_bytes())
            }
        }
    }

    fn encode_png(&self) -> Result<Vec<u8>> {
        let mut png_bytes = Vec::new();
        {
            let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
            encoder
                .write_image(
                    &self.buffer,
                    self.width,
                    self.height,
                    image::ColorType::Rgb8,
                )
                .context("Failed to encode PNG")?;
        }

        Ok(png_bytes)
    }

    /// Single page the size of the canvas holding the bitmap as a JPEG image
    fn encode_pdf(&self, title: &str) -> Result<Vec<u8>> {
        let mut jpeg = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 90)
            .write_image(
                &self.buffer,
                self.width,
                self.height,
                image::ColorType::Rgb8,
            )
            .context("Failed to encode chart image for PDF")?;

        let catalog_id = Ref::new(1);
        let page_tree_id = Ref::new(2);
        let page_id = Ref::new(3);
        let image_id = Ref::new(4);
        let content_id = Ref::new(5);
        let info_id = Ref::new(6);
        let image_name = Name(b"Chart");
        let (w, h) = (self.width as f32, self.height as f32);

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.pages(page_tree_id).kids([page_id]).count(1);

        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, w, h));
        page.parent(page_tree_id);
        page.contents(content_id);
        page.resources().x_objects().pair(image_name, image_id);
        page.finish();

        let mut xobject = pdf.image_xobject(image_id, &jpeg);
        xobject.filter(Filter::DctDecode);
        xobject.width(self.width as i32);
        xobject.height(self.height as i32);
        xobject.color_space().device_rgb();
        xobject.bits_per_component(8);
        xobject.finish();

        // Image space is the unit square; stretch it over the page
        let mut content = Content::new();
        content.save_state();
        content.transform([w, 0.0, 0.0, h, 0.0, 0.0]);
        content.x_object(image_name);
        content.restore_state();
        pdf.stream(content_id, &content.finish());

        pdf.document_info(info_id).title(TextStr(title));
        Ok(pdf.finish())
    }
}

impl Renderer for Canvas {
    fn draw(&mut self, chart: &ChartData, title: &str) -> Result<()> {
        if self.scene.is_some() {
            anyhow::bail!("Canvas already holds a chart; tear it down before drawing again");
        }
        if chart.colors.len() != chart.series.len() {
            anyhow::bail!(
                "Colors and values must have the same length (colors: {}, values: {})",
                chart.colors.len(),
                chart.series.len()
            );
        }

        {
            let root = BitMapBackend::with_buffer(&mut self.buffer, (self.width, self.height))
                .into_drawing_area();
            draw_chart(&root, chart, title)?;
            root.present().context("Failed to present drawing")?;
        }

        debug!("drew {} chart with {} points", chart.kind, chart.series.len());
        self.scene = Some((chart.clone(), title.to_string()));
        Ok(())
    }

    fn teardown(&mut self) {
        if self.scene.take().is_some() {
            debug!("tearing down canvas");
        }
        self.buffer.fill(0);
    }

    fn is_drawn(&self) -> bool {
        self.scene.is_some()
    }
}

fn draw_chart<DB>(root: &DrawingArea<DB, Shift>, chart: &ChartData, title: &str) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;

    match chart.kind {
        ChartKind::Pie => draw_pie(root, chart, title),
        ChartKind::Bar | ChartKind::Line | ChartKind::Scatter => draw_axis(root, chart, title),
    }
}

/// Y range that always includes zero, padded by 5% of the span.
///
/// Both ends stay within `AXIS_LIMIT` so the span is finite even for
/// values near `f64::MAX`.
fn value_range(values: &[f64]) -> Range<f64> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let min = finite.clone().fold(0.0, f64::min).max(-AXIS_LIMIT);
    let max = finite.fold(0.0, f64::max).min(AXIS_LIMIT);

    if min == max {
        (min - 1.0)..(max + 1.0)
    } else {
        let padding = max * 0.05 - min * 0.05;
        let lower = if min < 0.0 {
            (min - padding).max(-AXIS_LIMIT)
        } else {
            min
        };
        lower..(max + padding).min(AXIS_LIMIT)
    }
}

fn draw_axis<DB>(root: &DrawingArea<DB, Shift>, chart: &ChartData, title: &str) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let labels = chart.series.label_texts();
    let values = &chart.series.values;
    let num_categories = labels.len().max(1);
    let x_range = 0.0..(num_categories as f64);
    let y_range = value_range(values);

    let mut builder = ChartBuilder::on(root);
    builder
        .margin(10)
        .caption(title, (FONT, 20))
        .x_label_area_size(40)
        .y_label_area_size(50);
    let y_span = y_range.end - y_range.start;
    let mut ctx = builder
        .build_cartesian_2d(x_range, y_range)
        .context("Failed to build chart")?;

    let label_at = |x: &f64| labels.get(x.floor() as usize).cloned().unwrap_or_default();
    {
        let mut mesh = ctx.configure_mesh();
        mesh.x_labels(num_categories).x_label_formatter(&label_at);
        if let Some(label) = &chart.dataset_label {
            mesh.y_desc(label.as_str());
        }
        mesh.draw().context("Failed to draw mesh")?;
    }

    let border = RGBColor::from(chart.border_color);
    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, &y)| (i as f64 + 0.5, y))
        .collect();

    match chart.kind {
        ChartKind::Bar => {
            let bar_width = 0.8;
            for (&(x_center, y_val), &color) in points.iter().zip(&chart.colors) {
                let fill = RGBColor::from(color);
                let corners = [
                    (x_center - bar_width / 2.0, 0.0),
                    (x_center + bar_width / 2.0, y_val),
                ];
                ctx.draw_series(std::iter::once(Rectangle::new(corners, fill.filled())))
                    .context("Failed to draw bar")?;
                ctx.draw_series(std::iter::once(Rectangle::new(
                    corners,
                    border.stroke_width(chart.border_width),
                )))
                .context("Failed to draw bar border")?;
            }
        }
        ChartKind::Line => {
            let (plot_w, plot_h) = ctx.plotting_area().dim_in_pixel();
            let unit = (
                num_categories as f64 / f64::from(plot_w.max(1)),
                y_span / f64::from(plot_h.max(1)),
            );
            ctx.draw_series(LineSeries::new(
                smooth_path(&points, chart.tension, unit),
                border.stroke_width(chart.border_width),
            ))
            .context("Failed to draw line series")?;
            ctx.draw_series(markers(&points, &chart.colors, 3))
                .context("Failed to draw point series")?;
        }
        ChartKind::Scatter => {
            ctx.draw_series(markers(&points, &chart.colors, 5))
                .context("Failed to draw point series")?;
        }
        ChartKind::Pie => unreachable!("pie charts are drawn without axes"),
    }

    Ok(())
}

/// Cubic Bezier path through `points`, sampled for drawing.
///
/// Each point gets control points along the line joining its neighbours,
/// scaled by `tension` and split by the distance to either neighbour.
/// Distances are measured in `unit` (data units per pixel on each axis).
fn smooth_path(points: &[(f64, f64)], tension: f64, unit: (f64, f64)) -> Vec<(f64, f64)> {
    let drawable = points.iter().all(|p| p.0.is_finite() && p.1.is_finite());
    if tension <= 0.0 || points.len() < 3 || !drawable {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let dist = |a: (f64, f64), b: (f64, f64)| ((b.0 - a.0) / unit.0).hypot((b.1 - a.1) / unit.1);
    let controls: Vec<((f64, f64), (f64, f64))> = (0..points.len())
        .map(|i| {
            let cur = points[i];
            let prev = points[i.saturating_sub(1)];
            let next = points[(i + 1).min(last)];
            let (d01, d12) = (dist(prev, cur), dist(cur, next));
            let total = d01 + d12;
            if total == 0.0 || !total.is_finite() {
                return (cur, cur);
            }
            let (fa, fb) = (tension * d01 / total, tension * d12 / total);
            let (dx, dy) = (next.0 - prev.0, next.1 - prev.1);
            (
                (cur.0 - fa * dx, cur.1 - fa * dy),
                (cur.0 + fb * dx, cur.1 + fb * dy),
            )
        })
        .collect();

    let mut path = Vec::with_capacity(last * CURVE_STEPS + 1);
    path.push(points[0]);
    for i in 0..last {
        let (p0, p1, p2, p3) = (points[i], controls[i].1, controls[i + 1].0, points[i + 1]);
        for step in 1..=CURVE_STEPS {
            let t = step as f64 / CURVE_STEPS as f64;
            path.push((
                bezier(t, p0.0, p1.0, p2.0, p3.0),
                bezier(t, p0.1, p1.1, p2.1, p3.1),
            ));
        }
    }
    path
}

fn bezier(t: f64, a: f64, b: f64, c: f64, d: f64) -> f64 {
    let u = 1.0 - t;
    u * u * u * a + 3.0 * u * u * t * b + 3.0 * u * t * t * c + t * t * t * d
}

/// One filled circle per point, colored per point
fn markers<'a>(
    points: &'a [(f64, f64)],
    colors: &'a [PaletteColor],
    size: i32,
) -> impl Iterator<Item = Circle<(f64, f64), i32>> + 'a {
    points
        .iter()
        .zip(colors)
        .map(move |(&(x, y), &c)| Circle::new((x, y), size, RGBColor::from(c).filled()))
}

fn draw_pie<DB>(root: &DrawingArea<DB, Shift>, chart: &ChartData, title: &str) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let area = root
        .titled(title, (FONT, 20))
        .context("Failed to draw title")?;

    // Negative slices cannot be drawn; they count as empty
    let sizes: Vec<f64> = chart.series.values.iter().map(|v| v.max(0.0)).collect();
    let largest = sizes.iter().copied().fold(0.0, f64::max);
    if largest <= 0.0 || !sizes.iter().all(|v| v.is_finite()) {
        debug!("pie chart has no drawable slices");
        return Ok(());
    }
    // Relative to the largest slice so the total cannot overflow
    let sizes: Vec<f64> = sizes.iter().map(|v| v / largest).collect();

    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = (w.min(h) as f64 / 2.0) * 0.75;
    let colors: Vec<RGBColor> = chart.colors.iter().map(|&c| c.into()).collect();
    let labels = chart.series.label_texts();

    let mut pie = Pie::new(&center, &radius, &sizes[..], &colors[..], &labels[..]);
    pie.start_angle(-90.0);
    pie.label_style((FONT, 14).into_font().color(&BLACK));
    area.draw(&pie).context("Failed to draw pie chart")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TabularPreview;
    use crate::selection::{Role, RoleAssignment};
    use crate::series;
    use serde_json::json;

    fn sample(kind: ChartKind) -> ChartData {
        let preview = TabularPreview::from_json(
            &json!([
                {"name": "a", "score": 3},
                {"name": "b", "score": -1},
                {"name": "c", "score": 7},
            ]),
            None,
        )
        .unwrap();
        let selection = RoleAssignment::new()
            .with(Role::X, "name")
            .with(Role::Y, "score")
            .with(Role::Label, "name")
            .with(Role::Value, "score");
        series::prepare(&preview, &selection, kind, "rainbow")
    }

    #[test]
    fn test_value_range_includes_zero() {
        let range = value_range(&[3.0, 7.0]);
        assert_eq!(range.start, 0.0);
        assert!(range.end > 7.0);

        let range = value_range(&[-4.0, 2.0]);
        assert!(range.start < -4.0);

        let range = value_range(&[]);
        assert_eq!(range, -1.0..1.0);
    }

    #[test]
    fn test_draw_requires_teardown() {
        let mut canvas = Canvas::new(200, 150).unwrap();
        let chart = sample(ChartKind::Bar);
        canvas.draw(&chart, "Scores").unwrap();
        assert!(canvas.is_drawn());
        assert!(canvas.draw(&chart, "Scores").is_err());

        canvas.teardown();
        assert!(!canvas.is_drawn());
        canvas.draw(&sample(ChartKind::Line), "Scores").unwrap();
    }

    #[test]
    fn test_export_png_signature() {
        let mut canvas = Canvas::new(200, 150).unwrap();
        assert!(canvas.export(OutputFormat::Png).is_err());

        canvas.draw(&sample(ChartKind::Scatter), "Scores").unwrap();
        let bytes = canvas.export(OutputFormat::Png).unwrap();
        assert_eq!(&bytes[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    }

    #[test]
    fn test_export_svg_pie() {
        let mut canvas = Canvas::new(300, 300).unwrap();
        canvas.draw(&sample(ChartKind::Pie), "Share").unwrap();
        let svg = String::from_utf8(canvas.export(OutputFormat::Svg).unwrap()).unwrap();
        assert!(svg.starts_with("<svg"));
    }

    #[test]
    fn test_empty_series_draws() {
        let mut canvas = Canvas::new(200, 150).unwrap();
        let chart = series::prepare(
            &TabularPreview::default(),
            &RoleAssignment::new(),
            ChartKind::Bar,
            "default",
        );
        canvas.draw(&chart, "Empty").unwrap();
        assert!(canvas.export(OutputFormat::Png).is_ok());
    }

    #[test]
    fn test_extreme_values_keep_axis_finite() {
        let range = value_range(&[1e308, -1e308]);
        assert!((range.end - range.start).is_finite());
        assert!(range.start < 0.0 && range.end > 0.0);

        let preview = TabularPreview::from_json(
            &json!([{"x": "a", "y": 1e308}, {"x": "b", "y": -1e308}]),
            None,
        )
        .unwrap();
        let selection = RoleAssignment::new().with(Role::X, "x").with(Role::Y, "y");
        for kind in [ChartKind::Bar, ChartKind::Line, ChartKind::Scatter] {
            let chart = series::prepare(&preview, &selection, kind, "default");
            let mut canvas = Canvas::new(200, 150).unwrap();
            canvas.draw(&chart, "Extremes").unwrap();
        }
    }

    #[test]
    fn test_huge_pie_slices_draw() {
        let preview = TabularPreview::from_json(
            &json!([{"l": "a", "v": 1e308}, {"l": "b", "v": 1e308}]),
            None,
        )
        .unwrap();
        let selection = RoleAssignment::new().with(Role::Label, "l").with(Role::Value, "v");
        let chart = series::prepare(&preview, &selection, ChartKind::Pie, "default");
        let mut canvas = Canvas::new(200, 200).unwrap();
        canvas.draw(&chart, "Halves").unwrap();
    }

    #[test]
    fn test_canvas_size_limit() {
        assert!(Canvas::new(70000, 70000).is_err());
        assert!(Canvas::new(u32::MAX, u32::MAX).is_err());
        assert!(Canvas::new(8192, 8193).is_err());
        assert!(Canvas::new(1024, 768).is_ok());
    }

    #[test]
    fn test_export_pdf_signature() {
        let mut canvas = Canvas::new(320, 240).unwrap();
        canvas.draw(&sample(ChartKind::Bar), "Scores").unwrap();
        let bytes = canvas.export(OutputFormat::Pdf).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(String::from_utf8_lossy(&bytes).contains("/DCTDecode"));
    }

    #[test]
    fn test_smooth_path_passes_through_points() {
        let points = [(0.5, 3.0), (1.5, -1.0), (2.5, 7.0), (3.5, 2.0)];
        let path = smooth_path(&points, 0.4, (0.01, 0.05));
        assert_eq!(path.len(), (points.len() - 1) * CURVE_STEPS + 1);
        for (i, point) in points.iter().enumerate() {
            assert_eq!(path[i * CURVE_STEPS], *point);
        }
        assert!(path.iter().all(|p| p.0.is_finite() && p.1.is_finite()));
    }

    #[test]
    fn test_smooth_path_straight_without_tension() {
        let points = [(0.5, 1.0), (1.5, 2.0), (2.5, 0.0)];
        assert_eq!(smooth_path(&points, 0.0, (1.0, 1.0)), points.to_vec());
        assert_eq!(smooth_path(&points[..2], 0.4, (1.0, 1.0)), points[..2].to_vec());

        let with_infinite = [(0.5, 1.0), (1.5, f64::INFINITY), (2.5, 0.0)];
        assert_eq!(smooth_path(&with_infinite, 0.4, (1.0, 1.0)).len(), 3);
    }

    #[test]
    fn test_mismatched_colors_rejected() {
        let mut chart = sample(ChartKind::Bar);
        chart.colors.pop();
        assert!(Canvas::new(100, 100).unwrap().draw(&chart, "x").is_err());
    }
}
