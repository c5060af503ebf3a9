//! Count-label collision resolution.
//!
//! Labels start at curve midpoints and are nudged apart until no two boxes
//! intersect under a deliberately generous tolerance. Nudging is vertical
//! (away from the curves' side of the baseline) with a small randomized
//! horizontal jitter to break symmetric deadlocks. The loop is bounded: if
//! a pair has not separated within the cap, the last position is accepted.

use rand::Rng;

use crate::geometry::{Point, Viewport};

/// Axis-aligned rectangle around one rendered count annotation, in data
/// coordinates. Mutated in place during resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelBox {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl LabelBox {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center_x(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }
}

/// Which way colliding labels are pushed, matching the side the curves are
/// drawn on: canonical labels go up, backsplice labels go down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDirection {
    Up,
    Down,
}

/// Vertical distance of a single nudge.
const VERTICAL_STEP: f64 = 0.02;

/// Nudge cap per box pair; past it the last position is accepted.
const MAX_NUDGES: usize = 1_000;

/// Moving a box to clear one pair can re-collide an earlier pair, so pairs
/// are re-swept until a whole sweep is clean (or the cap is hit).
const MAX_SWEEPS: usize = 50;

/// Approximate intersection test with a quarter-width/quarter-height margin
/// around the first box, so near-miss labels are also separated.
pub fn boxes_collide(a: &LabelBox, b: &LabelBox) -> bool {
    let xextra = a.width() / 4.0;
    let yextra = a.height() / 4.0;

    let x_hit = (a.x0 - xextra <= b.x0 && b.x0 <= a.x1 + xextra)
        || (a.x0 - xextra <= b.x1 && b.x1 <= a.x1 + xextra);
    let y_hit = (a.y0 - yextra <= b.y0 && b.y0 <= a.y1 + yextra)
        || (a.y0 - yextra <= b.y1 && b.y1 <= a.y1 + yextra);

    x_hit && y_hit
}

/// Separate all boxes, extending the viewport to contain the results.
///
/// For every ordered pair the second box is nudged until the pair no longer
/// collides: a fixed vertical step in `direction` plus a horizontal step of
/// `xextra / 10` in a randomly chosen sign.
pub fn resolve_collisions<R: Rng>(
    boxes: &mut [LabelBox],
    direction: ShiftDirection,
    viewport: &mut Viewport,
    rng: &mut R,
) {
    let dy = match direction {
        ShiftDirection::Up => VERTICAL_STEP,
        ShiftDirection::Down => -VERTICAL_STEP,
    };

    for _sweep in 0..MAX_SWEEPS {
        let mut moved = false;

        for a in 0..boxes.len() {
            for b in 0..boxes.len() {
                if a == b {
                    continue;
                }

                let mut nudges = 0;
                while boxes_collide(&boxes[a], &boxes[b]) {
                    if nudges >= MAX_NUDGES {
                        log::debug!("label nudge cap reached; accepting last position");
                        break;
                    }

                    let dx = boxes[a].width() / 40.0;
                    let dx = if rng.gen_bool(0.5) { dx } else { -dx };

                    boxes[b].y0 += dy;
                    boxes[b].y1 += dy;
                    boxes[b].x0 += dx;
                    boxes[b].x1 += dx;
                    moved = true;
                    nudges += 1;
                }
            }
        }

        if !moved {
            break;
        }
    }

    for b in boxes.iter() {
        viewport.include_y(b.y0);
        viewport.include_y(b.y1);
    }
}

/// Final text anchors: horizontally centered, vertically on the box edge
/// facing the curves (bottom edge for labels pushed up, top edge for labels
/// pushed down).
pub fn label_anchors(boxes: &[LabelBox], direction: ShiftDirection) -> Vec<Point> {
    boxes
        .iter()
        .map(|b| match direction {
            ShiftDirection::Up => Point::new(b.center_x(), b.y0),
            ShiftDirection::Down => Point::new(b.center_x(), b.y1),
        })
        .collect()
}
