//! SVG figure rendering with plotters.
//!
//! One panel per sample, stacked vertically: the exon track shaded by
//! relative coverage, canonical junction arcs above it, backsplice arcs
//! below it, and optional count labels laid out collision-free. Bezier
//! strokes are sampled into polylines for the backend; the control points
//! themselves come from `geometry`.

use std::path::Path;

use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use rand::Rng;

use crate::annotation::Strand;
use crate::color::Rgb;
use crate::coverage::{cross_sample_max, max_coverage};
use crate::error::Error;
use crate::geometry::{junction_curves, CurveSide, Point, Viewport};
use crate::junction::JunctionEvent;
use crate::layout::{label_anchors, resolve_collisions, LabelBox, ShiftDirection};
use crate::scale::ScaledInterval;

/// Vertical placement of the exon track.
pub const EXON_BASELINE: f64 = 0.5;
pub const EXON_HEIGHT: f64 = 0.5;

const PANEL_WIDTH: u32 = 1500;
const PANEL_HEIGHT: u32 = 400;
const CURVE_SAMPLES: usize = 64;

/// Everything needed to draw one sample's panel.
#[derive(Debug, Clone)]
pub struct SamplePanel {
    pub name: String,
    pub canonical: Vec<JunctionEvent>,
    pub circular: Vec<JunctionEvent>,
    pub coverage: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub color: Rgb,
    pub exon_numbering: bool,
    pub normalize: bool,
}

/// Sample display name: file stem up to the first dot, uppercased.
pub fn sample_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.split('.').next().unwrap_or(name))
        .unwrap_or("sample")
        .to_uppercase()
}

/// Panel caption: separators replaced by spaces.
fn panel_title(name: &str) -> String {
    name.chars()
        .map(|c| if matches!(c, '-' | '_' | '|') { ' ' } else { c })
        .collect()
}

/// Initial plot extents around the (possibly rescaled) exon track, with
/// horizontal head room of 5% of gene length and generous vertical room so
/// curves stay inside the panel.
pub fn base_viewport(exons: &[ScaledInterval]) -> Viewport {
    let start = exons.iter().map(|e| e.start).fold(f64::INFINITY, f64::min);
    let stop = exons.iter().map(|e| e.stop).fold(f64::NEG_INFINITY, f64::max);
    let gene_length = stop - start;

    let x_adjustment = 0.05 * gene_length;
    let ytop = EXON_BASELINE + EXON_HEIGHT;
    let y_adjustment = 4.0 * (ytop * EXON_HEIGHT);

    Viewport {
        xmin: start - x_adjustment,
        xmax: stop + x_adjustment,
        ymin: EXON_BASELINE - y_adjustment,
        ymax: ytop + y_adjustment,
    }
}

/// Estimated extent of a rendered count annotation, in data coordinates.
///
/// The SVG backend has no data-space text metrics, so the box is derived
/// from character count and viewport size; the factors approximate an
/// 8pt label on the fixed panel geometry.
fn estimate_label_box(anchor: Point, text: &str, viewport: &Viewport) -> LabelBox {
    let width = 0.008 * viewport.width() * text.len().max(1) as f64;
    let height = 0.045 * viewport.height();

    LabelBox {
        x0: anchor.x - width / 2.0,
        x1: anchor.x + width / 2.0,
        y0: anchor.y - height / 2.0,
        y1: anchor.y + height / 2.0,
    }
}

/// Label text and initial anchor for every non-empty event: centered on the
/// topmost stroke's apex, offset away from the curve body.
fn initial_labels(
    events: &[JunctionEvent],
    side: CurveSide,
    baseline: f64,
    gene_length: f64,
    viewport: &Viewport,
) -> (Vec<String>, Vec<LabelBox>) {
    let mut texts = Vec::new();
    let mut boxes = Vec::new();

    for event in events.iter().filter(|e| e.count > 0) {
        let curves = junction_curves(event, side, baseline, gene_length, viewport);
        let Some(top) = curves.last() else { continue };

        let apex = top.midpoint();
        let anchor = match side {
            CurveSide::Above => Point::new(apex.x, apex.y + 0.1),
            CurveSide::Below => Point::new(apex.x, apex.y - 0.3),
        };

        let text = event.count.to_string();
        boxes.push(estimate_label_box(anchor, &text, viewport));
        texts.push(text);
    }

    (texts, boxes)
}

/// Render all sample panels into one SVG file.
pub fn render_figure<R: Rng>(
    path: &Path,
    samples: &[SamplePanel],
    exons: &[ScaledInterval],
    strand: Option<Strand>,
    options: &RenderOptions,
    rng: &mut R,
) -> Result<(), Error> {
    if samples.is_empty() {
        return Err(Error::Render("no samples to plot".to_string()));
    }
    if exons.is_empty() {
        return Err(Error::Render("no exons to plot".to_string()));
    }

    let height = PANEL_HEIGHT * samples.len() as u32;
    let root = SVGBackend::new(path, (PANEL_WIDTH, height)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let global_max = cross_sample_max(
        &samples
            .iter()
            .map(|s| s.coverage.clone())
            .collect::<Vec<_>>(),
    );

    let panels = root.split_evenly((samples.len(), 1));
    for (panel, sample) in panels.iter().zip(samples) {
        let max_cov = if options.normalize {
            global_max
        } else {
            max_coverage(&sample.coverage)
        };
        draw_panel(panel, sample, exons, strand, options, max_cov, rng)?;
    }

    root.present().map_err(render_err)?;
    log::info!("wrote {}", path.display());

    Ok(())
}

type Panel<'a> = DrawingArea<SVGBackend<'a>, plotters::coord::Shift>;

fn draw_panel<R: Rng>(
    area: &Panel<'_>,
    sample: &SamplePanel,
    exons: &[ScaledInterval],
    strand: Option<Strand>,
    options: &RenderOptions,
    max_cov: f64,
    rng: &mut R,
) -> Result<(), Error> {
    let mut viewport = base_viewport(exons);
    let gene_length = viewport.width() / 1.1; // undo the 5% head room
    let ytop = EXON_BASELINE + EXON_HEIGHT;

    // Geometry and label layout happen before the chart is built, so the
    // final vertical extents are known up front.
    let canonical_curves: Vec<_> = sample
        .canonical
        .iter()
        .flat_map(|e| junction_curves(e, CurveSide::Above, ytop, gene_length, &viewport))
        .collect();
    let circular_curves: Vec<_> = sample
        .circular
        .iter()
        .flat_map(|e| junction_curves(e, CurveSide::Below, EXON_BASELINE, gene_length, &viewport))
        .collect();

    let mut labels: Vec<(String, Point)> = Vec::new();
    if options.exon_numbering {
        let (texts, mut boxes) = initial_labels(
            &sample.canonical,
            CurveSide::Above,
            ytop,
            gene_length,
            &viewport,
        );
        resolve_collisions(&mut boxes, ShiftDirection::Up, &mut viewport, rng);
        let anchors = label_anchors(&boxes, ShiftDirection::Up);
        labels.extend(texts.into_iter().zip(anchors));

        let (texts, mut boxes) = initial_labels(
            &sample.circular,
            CurveSide::Below,
            EXON_BASELINE,
            gene_length,
            &viewport,
        );
        resolve_collisions(&mut boxes, ShiftDirection::Down, &mut viewport, rng);
        let anchors = label_anchors(&boxes, ShiftDirection::Down);
        labels.extend(texts.into_iter().zip(anchors));
    }

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .build_cartesian_2d(viewport.xmin..viewport.xmax, viewport.ymin..viewport.ymax)
        .map_err(render_err)?;

    // Panel caption, centered at the top.
    chart
        .draw_series(std::iter::once(Text::new(
            panel_title(&sample.name),
            ((viewport.xmin + viewport.xmax) / 2.0, viewport.ymax),
            ("sans-serif", 20)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Top)),
        )))
        .map_err(render_err)?;

    draw_exons(&mut chart, exons, sample, strand, options, max_cov, &viewport)?;

    let stroke = BLACK.mix(0.7).stroke_width(1);
    for curve in canonical_curves.iter().chain(&circular_curves) {
        chart
            .draw_series(LineSeries::new(curve.samples(CURVE_SAMPLES), stroke))
            .map_err(render_err)?;
    }

    let label_font = ("sans-serif", 13)
        .into_font()
        .color(&BLACK.mix(0.6))
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    for (text, anchor) in &labels {
        chart
            .draw_series(std::iter::once(Text::new(
                text.clone(),
                (anchor.x, anchor.y),
                label_font.clone(),
            )))
            .map_err(render_err)?;
    }

    Ok(())
}

type DataChart<'a, 'b> =
    ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn draw_exons(
    chart: &mut DataChart<'_, '_>,
    exons: &[ScaledInterval],
    sample: &SamplePanel,
    strand: Option<Strand>,
    options: &RenderOptions,
    max_cov: f64,
    viewport: &Viewport,
) -> Result<(), Error> {
    let (r, g, b) = options.color;
    let fill = RGBColor(r, g, b);

    // Exon numbers run right-to-left on the reverse strand.
    let mut numbers: Vec<usize> = (1..=exons.len()).collect();
    if strand == Some(Strand::Reverse) {
        numbers.reverse();
    }

    for (index, exon) in exons.iter().enumerate() {
        let alpha = match sample.coverage.get(index) {
            Some(&cov) if max_cov > 0.0 => (cov / max_cov).clamp(0.0, 1.0),
            _ => 0.0,
        };

        let corners = [
            (exon.start, EXON_BASELINE),
            (exon.stop, EXON_BASELINE + EXON_HEIGHT),
        ];
        chart
            .draw_series(std::iter::once(Rectangle::new(
                corners,
                fill.mix(alpha).filled(),
            )))
            .map_err(render_err)?;
        chart
            .draw_series(std::iter::once(Rectangle::new(
                corners,
                BLACK.stroke_width(1),
            )))
            .map_err(render_err)?;

        // Numbers only fit in exons that are wide enough on screen; dark
        // fills get white numbers.
        if options.exon_numbering && exon.len() / viewport.width() > 0.0065 {
            let number_color = if alpha >= 0.5 { &WHITE } else { &BLACK };
            chart
                .draw_series(std::iter::once(Text::new(
                    numbers[index].to_string(),
                    (
                        (exon.start + exon.stop) / 2.0,
                        EXON_BASELINE + EXON_HEIGHT / 2.0,
                    ),
                    ("sans-serif", 12)
                        .into_font()
                        .color(number_color)
                        .pos(Pos::new(HPos::Center, VPos::Center)),
                )))
                .map_err(render_err)?;
        }
    }

    Ok(())
}

/// Write the HTML page that embeds the SVG.
pub fn write_html_wrapper(html_path: &Path, svg_file_name: &str) -> Result<(), Error> {
    let html = format!(
        "<html>\n<body>\n<img src=\"{svg}\" alt=\"Cannot find {svg}. \
         Make sure the html file and svg file are in the same directory\">\n\
         </body>\n</html>\n",
        svg = svg_file_name
    );

    std::fs::write(html_path, html).map_err(|e| Error::io(e, html_path))
}

fn render_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Render(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn exons() -> Vec<ScaledInterval> {
        vec![
            ScaledInterval { start: 100.0, stop: 200.0 },
            ScaledInterval { start: 230.0, stop: 330.0 },
        ]
    }

    #[test]
    fn test_sample_name_from_path() {
        assert_eq!(
            sample_name(Path::new("/data/liver_rep1.sorted.bam")),
            "LIVER_REP1"
        );
    }

    #[test]
    fn test_panel_title_replaces_separators() {
        assert_eq!(panel_title("LIVER_REP-1|A"), "LIVER REP 1 A");
    }

    #[test]
    fn test_base_viewport_extents() {
        let vp = base_viewport(&exons());

        // 5% of the 230-long gene on each side.
        assert!((vp.xmin - (100.0 - 11.5)).abs() < 1e-9);
        assert!((vp.xmax - (330.0 + 11.5)).abs() < 1e-9);

        // 4 * (ytop * height) of vertical head room.
        assert!((vp.ymax - 3.0).abs() < 1e-9);
        assert!((vp.ymin - (-1.5)).abs() < 1e-9);
    }

    #[test]
    fn test_render_smoke() {
        let dir = tempfile::tempdir().unwrap();
        let svg_path = dir.path().join("GENE1.svg");

        let samples = vec![SamplePanel {
            name: "SAMPLE1".to_string(),
            canonical: vec![JunctionEvent::new(200.0, 230.0, 4)],
            circular: vec![JunctionEvent::new(100.0, 330.0, 2)],
            coverage: vec![3.0, 6.0],
        }];
        let options = RenderOptions {
            color: (0xC2, 0x18, 0x07),
            exon_numbering: true,
            normalize: false,
        };

        let mut rng = StdRng::seed_from_u64(7);
        render_figure(&svg_path, &samples, &exons(), None, &options, &mut rng).unwrap();

        let svg = std::fs::read_to_string(&svg_path).unwrap();
        assert!(svg.contains("<svg"));

        let html_path = dir.path().join("GENE1.html");
        write_html_wrapper(&html_path, "GENE1.svg").unwrap();
        let html = std::fs::read_to_string(&html_path).unwrap();
        assert!(html.contains("GENE1.svg"));
    }

    #[test]
    fn test_render_rejects_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.svg");
        let options = RenderOptions {
            color: (255, 0, 0),
            exon_numbering: false,
            normalize: false,
        };
        let mut rng = StdRng::seed_from_u64(7);

        let err = render_figure(&path, &[], &exons(), None, &options, &mut rng);
        assert!(matches!(err, Err(Error::Render(_))));
    }
}
