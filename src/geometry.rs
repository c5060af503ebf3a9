//! Bezier curve construction for junction arcs.
//!
//! Canonical junctions arc above the exon track with a height proportional
//! to the square root of the normalized span, so long-range junctions stay
//! flat. Backsplice junctions dip below the track with fixed horizontal
//! control offsets derived from gene length, giving circles a visually
//! distinct shape. Visual weight comes from redrawing each curve `count`
//! times at small vertical offsets instead of varying stroke width.

use crate::junction::JunctionEvent;

/// A point in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Plot extents in data coordinates, threaded explicitly through geometry
/// and layout calls instead of living in ambient plot state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Viewport {
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Grow the vertical extent to contain `y`.
    pub fn include_y(&mut self, y: f64) {
        self.ymin = self.ymin.min(y);
        self.ymax = self.ymax.max(y);
    }
}

/// Control points of one cubic Bezier stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveControlPoints {
    pub p0: Point,
    pub p1: Point,
    pub p2: Point,
    pub p3: Point,
}

impl CurveControlPoints {
    /// Evaluate the cubic at parameter `t` in `[0, 1]`.
    pub fn point_at(&self, t: f64) -> Point {
        let u = 1.0 - t;
        let b0 = u * u * u;
        let b1 = 3.0 * u * u * t;
        let b2 = 3.0 * u * t * t;
        let b3 = t * t * t;

        Point::new(
            b0 * self.p0.x + b1 * self.p1.x + b2 * self.p2.x + b3 * self.p3.x,
            b0 * self.p0.y + b1 * self.p1.y + b2 * self.p2.y + b3 * self.p3.y,
        )
    }

    /// Curve apex, where the count label is anchored.
    pub fn midpoint(&self) -> Point {
        self.point_at(0.5)
    }

    /// Sample the curve into a polyline for the rendering backend.
    pub fn samples(&self, n: usize) -> Vec<(f64, f64)> {
        let steps = n.max(2);
        (0..steps)
            .map(|i| {
                let p = self.point_at(i as f64 / (steps - 1) as f64);
                (p.x, p.y)
            })
            .collect()
    }
}

/// Which side of the exon track a junction class is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveSide {
    /// Canonical splice junctions arc above the baseline.
    Above,
    /// Backsplice junctions arc below it.
    Below,
}

impl CurveSide {
    /// Bound of the per-stroke vertical offset range.
    pub fn amplitude(self) -> f64 {
        match self {
            Self::Above => 0.1,
            Self::Below => 0.25,
        }
    }
}

/// Fraction of viewport height a backsplice arc dips below the baseline.
const BACKSPLICE_DEPTH: f64 = 0.1;

/// Canonical control offsets sit at this fraction of the span width.
const CANONICAL_CONTROL_FRACTION: f64 = 0.2;

/// Backsplice control offsets are this fraction of gene length.
const BACKSPLICE_CONTROL_DIVISOR: f64 = 20.0;

/// Control points for one canonical splice arc above the baseline.
///
/// Height is `sqrt(|span| / viewport_width)` plus the stacking adjustment,
/// so a junction spanning the whole viewport reaches height 1.
pub fn canonical_curve(
    start: f64,
    stop: f64,
    baseline: f64,
    adjust: f64,
    viewport: &Viewport,
) -> CurveControlPoints {
    let span = stop - start;
    let height = (span.abs() / viewport.width()).sqrt();
    let control_y = baseline + height + adjust;

    CurveControlPoints {
        p0: Point::new(start, baseline),
        p1: Point::new(start + CANONICAL_CONTROL_FRACTION * span, control_y),
        p2: Point::new(stop - CANONICAL_CONTROL_FRACTION * span, control_y),
        p3: Point::new(stop, baseline),
    }
}

/// Control points for one backsplice arc below the baseline.
///
/// The horizontal control offset is a constant fraction of gene length
/// regardless of span, which keeps circles flat and wide.
pub fn backsplice_curve(
    start: f64,
    stop: f64,
    baseline: f64,
    adjust: f64,
    gene_length: f64,
    viewport: &Viewport,
) -> CurveControlPoints {
    let size_adjust = gene_length / BACKSPLICE_CONTROL_DIVISOR;
    let control_y = baseline - BACKSPLICE_DEPTH * viewport.height() - adjust;

    CurveControlPoints {
        p0: Point::new(start, baseline),
        p1: Point::new(start - size_adjust, control_y),
        p2: Point::new(stop + size_adjust, control_y),
        p3: Point::new(stop, baseline),
    }
}

/// All strokes for one junction event: `count` curves stepped through the
/// side's offset range in `amplitude / count` increments. A zero-count
/// event produces nothing.
pub fn junction_curves(
    event: &JunctionEvent,
    side: CurveSide,
    baseline: f64,
    gene_length: f64,
    viewport: &Viewport,
) -> Vec<CurveControlPoints> {
    if event.count == 0 {
        return Vec::new();
    }

    let step = side.amplitude() / event.count as f64;
    (0..event.count)
        .map(|i| {
            let adjust = i as f64 * step;
            match side {
                CurveSide::Above => {
                    canonical_curve(event.start, event.stop, baseline, adjust, viewport)
                }
                CurveSide::Below => backsplice_curve(
                    event.start,
                    event.stop,
                    baseline,
                    adjust,
                    gene_length,
                    viewport,
                ),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport {
            xmin: 0.0,
            xmax: 1000.0,
            ymin: -1.5,
            ymax: 3.0,
        }
    }

    #[test]
    fn test_canonical_control_points() {
        let vp = viewport();
        let curve = canonical_curve(200.0, 500.0, 1.0, 0.0, &vp);

        assert_eq!(curve.p0, Point::new(200.0, 1.0));
        assert_eq!(curve.p3, Point::new(500.0, 1.0));

        // Horizontal offsets at 20% of the span.
        assert_eq!(curve.p1.x, 260.0);
        assert_eq!(curve.p2.x, 440.0);

        // Height follows sqrt of the normalized span: sqrt(300/1000).
        let expected = 1.0 + (300.0_f64 / 1000.0).sqrt();
        assert!((curve.p1.y - expected).abs() < 1e-12);
        assert_eq!(curve.p1.y, curve.p2.y);
    }

    #[test]
    fn test_canonical_height_sublinear_in_span() {
        let vp = viewport();
        let short = canonical_curve(0.0, 100.0, 1.0, 0.0, &vp);
        let long = canonical_curve(0.0, 900.0, 1.0, 0.0, &vp);

        let short_height = short.p1.y - 1.0;
        let long_height = long.p1.y - 1.0;
        assert!(long_height > short_height);
        assert!(long_height / short_height < 9.0 / 1.0);
    }

    #[test]
    fn test_backsplice_control_points() {
        let vp = viewport();
        let curve = backsplice_curve(650.0, 700.0, 0.5, 0.0, 900.0, &vp);

        assert_eq!(curve.p0, Point::new(650.0, 0.5));
        assert_eq!(curve.p3, Point::new(700.0, 0.5));

        // Control offsets from gene length (900 / 20 = 45), not the span.
        assert_eq!(curve.p1.x, 605.0);
        assert_eq!(curve.p2.x, 745.0);

        // Depth is a fraction of viewport height below the baseline.
        let expected = 0.5 - 0.1 * vp.height();
        assert!((curve.p1.y - expected).abs() < 1e-12);
        assert!(curve.p1.y < 0.5);
    }

    #[test]
    fn test_stack_count_and_offsets() {
        let vp = viewport();
        let event = JunctionEvent::new(200.0, 500.0, 4);

        let curves = junction_curves(&event, CurveSide::Above, 1.0, 900.0, &vp);
        assert_eq!(curves.len(), 4);

        // Offsets step in amplitude / count increments up to the bound.
        for (i, curve) in curves.iter().enumerate() {
            let expected = curves[0].p1.y + i as f64 * (0.1 / 4.0);
            assert!((curve.p1.y - expected).abs() < 1e-12);
        }
        let top = curves.last().unwrap().p1.y;
        assert!(top - curves[0].p1.y < 0.1);
    }

    #[test]
    fn test_zero_count_event_is_skipped() {
        let vp = viewport();
        let event = JunctionEvent::new(200.0, 500.0, 0);
        assert!(junction_curves(&event, CurveSide::Above, 1.0, 900.0, &vp).is_empty());
        assert!(junction_curves(&event, CurveSide::Below, 0.5, 900.0, &vp).is_empty());
    }

    #[test]
    fn test_point_at_endpoints_and_midpoint() {
        let vp = viewport();
        let curve = canonical_curve(200.0, 500.0, 1.0, 0.0, &vp);

        assert_eq!(curve.point_at(0.0), curve.p0);
        assert_eq!(curve.point_at(1.0), curve.p3);

        let mid = curve.midpoint();
        assert!((mid.x - 350.0).abs() < 1e-9);
        assert!(mid.y > 1.0);
    }

    #[test]
    fn test_samples_span_the_curve() {
        let vp = viewport();
        let curve = canonical_curve(200.0, 500.0, 1.0, 0.0, &vp);
        let samples = curve.samples(50);

        assert_eq!(samples.len(), 50);
        assert_eq!(samples[0], (200.0, 1.0));
        let last = samples.last().unwrap();
        assert!((last.0 - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_viewport_include_y() {
        let mut vp = viewport();
        vp.include_y(5.0);
        vp.include_y(-3.0);
        assert_eq!(vp.ymax, 5.0);
        assert_eq!(vp.ymin, -3.0);
    }
}
