use std::f64::consts::PI;

use anyhow::Result;
use plotters::prelude::*;
use tracing::debug;

use crate::dataset::Dataset;
use crate::types::{AppError, AppResult};

use super::data::{chart_data, Bin, ChartData};
use super::{ChartRenderer, ChartRequest, RenderedChart};

const CAPTION_SIZE: u32 = 24;
const LEGEND_ENTRIES: usize = 20;

/// Renders charts to SVG with plotters.
pub struct PlottersRenderer {
    width: u32,
    height: u32,
}

impl PlottersRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self::new(800, 500)
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render(&self, dataset: &Dataset, request: &ChartRequest) -> AppResult<RenderedChart> {
        let data = chart_data(dataset, request)?;
        let size = (self.width, self.height);
        let mut svg = String::new();

        let drawn = match &data {
            ChartData::Bars(bars) => draw_bars(&mut svg, size, &request.title, bars),
            ChartData::Series { points, x_labels } => {
                draw_line(&mut svg, size, &request.title, points, x_labels.as_deref())
            }
            ChartData::Bins(bins) => draw_histogram(&mut svg, size, &request.title, bins),
            ChartData::Slices(slices) => draw_pie(&mut svg, size, &request.title, slices),
        };
        drawn.map_err(|e| AppError::Render(format!("{:#}", e)))?;

        debug!(kind = %request.kind, bytes = svg.len(), "Chart rendered");

        Ok(RenderedChart {
            kind: request.kind,
            title: request.title.clone(),
            format: "svg".to_string(),
            body: svg,
        })
    }
}

fn value_range(values: impl Iterator<Item = f64>, include_zero: bool) -> (f64, f64) {
    let (mut lo, mut hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if include_zero {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if lo == hi {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (if lo == 0.0 { lo } else { lo - pad }, hi + pad)
}

fn tick(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

fn draw_bars(buf: &mut String, size: (u32, u32), title: &str, bars: &[(String, f64)]) -> Result<()> {
    let root = SVGBackend::with_string(buf, size).into_drawing_area();
    root.fill(&WHITE)?;

    let (y_min, y_max) = value_range(bars.iter().map(|(_, v)| *v), true);
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", CAPTION_SIZE).into_font())
        .margin(16)
        .x_label_area_size(48)
        .y_label_area_size(64)
        .build_cartesian_2d((0..bars.len()).into_segmented(), y_min..y_max)?;

    let label = |v: &SegmentValue<usize>| match v {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
            bars.get(*i).map(|(l, _)| l.clone()).unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&label)
        .y_label_formatter(&|v| tick(*v))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLUE.mix(0.7).filled())
            .margin(8)
            .data(bars.iter().enumerate().map(|(i, (_, v))| (i, *v))),
    )?;

    root.present()?;
    Ok(())
}

fn draw_line(
    buf: &mut String,
    size: (u32, u32),
    title: &str,
    points: &[(f64, f64)],
    x_labels: Option<&[String]>,
) -> Result<()> {
    let root = SVGBackend::with_string(buf, size).into_drawing_area();
    root.fill(&WHITE)?;

    let (x_min, x_max) = value_range(points.iter().map(|p| p.0), false);
    let (y_min, y_max) = value_range(points.iter().map(|p| p.1), false);
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", CAPTION_SIZE).into_font())
        .margin(16)
        .x_label_area_size(48)
        .y_label_area_size(64)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    let x_label = |x: &f64| match x_labels {
        Some(labels) => {
            let idx = x.round();
            if idx >= 0.0 && (idx - x).abs() < 1e-6 {
                labels.get(idx as usize).cloned().unwrap_or_default()
            } else {
                String::new()
            }
        }
        None => tick(*x),
    };
    chart
        .configure_mesh()
        .x_labels(x_labels.map_or(10, |l| l.len().clamp(2, 12)))
        .x_label_formatter(&x_label)
        .y_label_formatter(&|v| tick(*v))
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, BLUE.filled())),
    )?;

    root.present()?;
    Ok(())
}

fn draw_histogram(buf: &mut String, size: (u32, u32), title: &str, bins: &[Bin]) -> Result<()> {
    let root = SVGBackend::with_string(buf, size).into_drawing_area();
    root.fill(&WHITE)?;

    let lower = bins.first().map_or(0.0, |b| b.lower);
    let upper = bins.last().map_or(1.0, |b| b.upper);
    let (_, y_max) = value_range(bins.iter().map(|b| b.count as f64), true);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", CAPTION_SIZE).into_font())
        .margin(16)
        .x_label_area_size(48)
        .y_label_area_size(64)
        .build_cartesian_2d(lower..upper, 0.0..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|v| tick(*v))
        .y_desc("count")
        .draw()?;

    chart.draw_series(bins.iter().map(|b| {
        Rectangle::new([(b.lower, 0.0), (b.upper, b.count as f64)], BLUE.mix(0.7).filled())
    }))?;
    chart.draw_series(bins.iter().map(|b| {
        Rectangle::new([(b.lower, 0.0), (b.upper, b.count as f64)], WHITE.stroke_width(1))
    }))?;

    root.present()?;
    Ok(())
}

fn draw_pie(buf: &mut String, size: (u32, u32), title: &str, slices: &[(String, f64)]) -> Result<()> {
    let root = SVGBackend::with_string(buf, size).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(title, ("sans-serif", CAPTION_SIZE).into_font())?;

    let (w, h) = root.dim_in_pixel();
    let center = (w as i32 / 3, h as i32 / 2);
    let radius = f64::from(w.min(h)) * 0.4;
    let total: f64 = slices.iter().map(|(_, v)| v).sum();
    let legend_x = w as i32 * 2 / 3;

    let mut start = -PI / 2.0;
    for (idx, (label, value)) in slices.iter().enumerate() {
        let share = value / total;
        let sweep = share * 2.0 * PI;
        let color = Palette99::pick(idx);

        let steps = ((share * 120.0).ceil() as usize).max(2);
        let mut outline = Vec::with_capacity(steps + 2);
        outline.push(center);
        for step in 0..=steps {
            let angle = start + sweep * step as f64 / steps as f64;
            outline.push((
                center.0 + (radius * angle.cos()).round() as i32,
                center.1 + (radius * angle.sin()).round() as i32,
            ));
        }
        root.draw(&Polygon::new(outline, color.filled()))?;

        if idx < LEGEND_ENTRIES {
            let y = 16 + idx as i32 * 22;
            root.draw(&Rectangle::new([(legend_x, y), (legend_x + 14, y + 14)], color.filled()))?;
            root.draw(&Text::new(
                format!("{} ({:.1}%)", label, share * 100.0),
                (legend_x + 22, y),
                ("sans-serif", 14).into_font(),
            ))?;
        }

        start += sweep;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{chart_request, ChartKind, ColumnSelection};

    const MOVIES: &str = "title,year,rating,genre\n\
        Alien,1979,8.5,horror\n\
        Heat,1995,8.3,<b>crime</b>\n\
        Dune,2021,8.0,sci-fi\n\
        Se7en,1995,8.6,<b>crime</b>\n";

    fn render(kind: ChartKind, selection: ColumnSelection) -> RenderedChart {
        let dataset = Dataset::from_csv_bytes(MOVIES.as_bytes()).unwrap();
        let request = chart_request(kind, &selection, &dataset).unwrap();
        let chart = PlottersRenderer::default().render(&dataset, &request).unwrap();

        assert_eq!(chart.kind, kind);
        assert_eq!(chart.format, "svg");
        assert!(chart.body.contains("<svg"));
        assert!(chart.body.contains(&request.title));
        chart
    }

    #[test]
    fn test_render_numeric_bars() {
        render(ChartKind::Bar, ColumnSelection::single("rating"));
    }

    #[test]
    fn test_render_categorical_bars_escapes_text() {
        let chart = render(ChartKind::Bar, ColumnSelection::single("genre"));
        assert!(!chart.body.contains("<b>"));
    }

    #[test]
    fn test_render_numeric_line() {
        render(ChartKind::Line, ColumnSelection::pair("year", "rating"));
    }

    #[test]
    fn test_render_line_with_text_x() {
        render(ChartKind::Line, ColumnSelection::pair("title", "rating"));
    }

    #[test]
    fn test_render_histogram_bins() {
        render(ChartKind::Histogram, ColumnSelection::single("year"));
    }

    #[test]
    fn test_render_pie_slices_escapes_text() {
        let chart = render(ChartKind::Pie, ColumnSelection::single("genre"));
        assert!(chart.body.contains("&lt;b&gt;crime&lt;/b&gt; (50.0%)"));
        assert!(!chart.body.contains("<b>"));
    }

    #[test]
    fn test_value_range_includes_zero() {
        assert_eq!(value_range([2.0, 4.0].into_iter(), true).0, 0.0);
        let (lo, hi) = value_range([2.0, 4.0].into_iter(), false);
        assert!(lo < 2.0 && hi > 4.0);
    }

    #[test]
    fn test_value_range_degenerate() {
        assert_eq!(value_range([3.0].into_iter(), false), (2.0, 4.0));
        assert_eq!(value_range(std::iter::empty(), false), (0.0, 1.0));
    }

    #[test]
    fn test_tick_format() {
        assert_eq!(tick(1979.0), "1979");
        assert_eq!(tick(8.25), "8.25");
    }
}
