//! Intron rescaling.
//!
//! Compresses intron white space by a user-supplied factor while preserving
//! exon lengths, then maps arbitrary coordinates (junction endpoints) into
//! the compressed space through the same piecewise-linear transform.

use crate::annotation::GenomicInterval;
use crate::junction::JunctionEvent;

/// An exon interval in display (possibly compressed) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledInterval {
    pub start: f64,
    pub stop: f64,
}

impl ScaledInterval {
    pub fn len(&self) -> f64 {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0.0
    }
}

impl From<GenomicInterval> for ScaledInterval {
    fn from(interval: GenomicInterval) -> Self {
        Self {
            start: interval.start as f64,
            stop: interval.stop as f64,
        }
    }
}

/// Compress inter-exon gaps by `factor`, anchoring at the first exon.
///
/// Each exon keeps its original length; each subsequent exon starts at the
/// previous scaled stop plus `original_gap / factor`. A non-positive factor
/// is a configuration error: a warning is logged and the coordinates are
/// returned unscaled.
pub fn scale_introns(exons: &[GenomicInterval], factor: f64) -> Vec<ScaledInterval> {
    if factor <= 0.0 {
        log::warn!("intron scaling factor must be > 0; plotting without scaling");
        return exons.iter().copied().map(ScaledInterval::from).collect();
    }

    let mut scaled: Vec<ScaledInterval> = Vec::with_capacity(exons.len());
    let Some(first) = exons.first() else {
        return scaled;
    };
    scaled.push(ScaledInterval::from(*first));

    for i in 1..exons.len() {
        let length = exons[i].len() as f64;
        let gap = (exons[i].start as f64 - exons[i - 1].stop as f64) / factor;
        let left = scaled[i - 1].stop + gap;
        scaled.push(ScaledInterval {
            start: left,
            stop: left + length,
        });
    }

    scaled
}

/// Piecewise-linear lookup table between original and scaled coordinates.
///
/// Both interval lists are flattened into breakpoint sequences; a query is
/// interpolated within the original segment that brackets it and mapped to
/// the index-aligned scaled segment.
#[derive(Debug, Clone)]
pub struct CoordinateMap {
    original: Vec<f64>,
    scaled: Vec<f64>,
}

impl CoordinateMap {
    pub fn new(original: &[GenomicInterval], scaled: &[ScaledInterval]) -> Self {
        debug_assert_eq!(original.len(), scaled.len(), "interval lists are index-aligned");

        Self {
            original: original
                .iter()
                .flat_map(|e| [e.start as f64, e.stop as f64])
                .collect(),
            scaled: scaled.iter().flat_map(|e| [e.start, e.stop]).collect(),
        }
    }

    /// Map a coordinate from the original space into the scaled space.
    ///
    /// The bracketing segment is the first consecutive breakpoint pair
    /// containing the query; a query outside every segment (typically a
    /// junction endpoint past the last exon) falls through to the last
    /// pair. If no scaled pair exists at that index the query itself is
    /// used as the right bound (identity extrapolation); a zero-width
    /// original segment maps to its left scaled bound.
    pub fn transform(&self, query: f64) -> f64 {
        if self.original.len() < 2 {
            return query;
        }

        let last_pair = self.original.len() - 2;
        let idx = (0..=last_pair)
            .find(|&i| self.original[i] <= query && query <= self.original[i + 1])
            .unwrap_or(last_pair);

        let (left, right) = (self.original[idx], self.original[idx + 1]);
        let (new_left, new_right) = if self.scaled.len() > idx + 1 {
            (self.scaled[idx], self.scaled[idx + 1])
        } else if let Some(&new_left) = self.scaled.get(idx) {
            (new_left, query)
        } else {
            return query;
        };

        let original_range = right - left;
        if original_range == 0.0 {
            return new_left;
        }

        ((query - left) * (new_right - new_left)) / original_range + new_left
    }

    /// Apply `transform` to both endpoints of every junction event.
    pub fn transform_events(&self, events: &[JunctionEvent]) -> Vec<JunctionEvent> {
        events
            .iter()
            .map(|e| JunctionEvent::new(self.transform(e.start), self.transform(e.stop), e.count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exons() -> Vec<GenomicInterval> {
        vec![
            GenomicInterval::new(100, 200),
            GenomicInterval::new(500, 600),
            GenomicInterval::new(900, 1000),
        ]
    }

    #[test]
    fn test_scale_introns_worked_example() {
        let scaled = scale_introns(&exons(), 10.0);
        assert_eq!(
            scaled,
            vec![
                ScaledInterval { start: 100.0, stop: 200.0 },
                ScaledInterval { start: 230.0, stop: 330.0 },
                ScaledInterval { start: 360.0, stop: 460.0 },
            ]
        );
    }

    #[test]
    fn test_exon_lengths_preserved() {
        let original = exons();
        let scaled = scale_introns(&original, 7.3);
        for (o, s) in original.iter().zip(&scaled) {
            assert!((s.len() - o.len() as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn test_scaled_starts_strictly_increasing() {
        let scaled = scale_introns(&exons(), 100.0);
        for pair in scaled.windows(2) {
            assert!(pair[0].start < pair[1].start);
        }
    }

    #[test]
    fn test_non_positive_factor_returns_original() {
        for factor in [0.0, -1.0] {
            let scaled = scale_introns(&exons(), factor);
            assert_eq!(
                scaled,
                exons().into_iter().map(ScaledInterval::from).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_transform_exact_at_breakpoints() {
        let original = exons();
        let scaled = scale_introns(&original, 10.0);
        let map = CoordinateMap::new(&original, &scaled);

        for (o, s) in original.iter().zip(&scaled) {
            assert_eq!(map.transform(o.start as f64), s.start);
            assert_eq!(map.transform(o.stop as f64), s.stop);
        }
    }

    #[test]
    fn test_transform_interpolates_inside_gaps() {
        let original = exons();
        let scaled = scale_introns(&original, 10.0);
        let map = CoordinateMap::new(&original, &scaled);

        // Midpoint of the 200-500 gap maps to the midpoint of 200-230.
        assert!((map.transform(350.0) - 215.0).abs() < 1e-9);
    }

    #[test]
    fn test_transform_events_maps_both_endpoints() {
        let original = exons();
        let scaled = scale_introns(&original, 10.0);
        let map = CoordinateMap::new(&original, &scaled);

        let events = vec![JunctionEvent::new(200.0, 500.0, 4)];
        let mapped = map.transform_events(&events);
        assert_eq!(mapped[0].start, 200.0);
        assert_eq!(mapped[0].stop, 230.0);
        assert_eq!(mapped[0].count, 4);
    }

    #[test]
    fn test_transform_identity_fallback_past_known_scale() {
        // The scaled table is shorter than the original one; queries in the
        // uncovered tail use the query itself as the right bound.
        let original = vec![
            GenomicInterval::new(0, 10),
            GenomicInterval::new(20, 30),
        ];
        let scaled = vec![ScaledInterval { start: 0.0, stop: 10.0 }];
        let map = CoordinateMap {
            original: original
                .iter()
                .flat_map(|e| [e.start as f64, e.stop as f64])
                .collect(),
            scaled: scaled.iter().flat_map(|e| [e.start, e.stop]).collect(),
        };

        // Bracket (20, 30) has no scaled pair: right bound becomes the query.
        assert_eq!(map.transform(30.0), 30.0);
    }

    #[test]
    fn test_transform_zero_width_segment() {
        let map = CoordinateMap {
            original: vec![10.0, 10.0, 50.0],
            scaled: vec![10.0, 10.0, 20.0],
        };
        assert_eq!(map.transform(10.0), 10.0);
    }

    #[test]
    fn test_scale_introns_empty_input() {
        assert!(scale_introns(&[], 10.0).is_empty());
    }
}
