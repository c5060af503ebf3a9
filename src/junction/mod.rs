//! Splice junction detection from read alignments.
//!
//! Two independent detectors share the strand predicate and the
//! `JunctionEvent` output type:
//! - `canonical`: introns from reference-skip CIGAR operations
//! - `circular`: backsplice junctions from split (SA-tagged) alignments

mod canonical;
mod circular;

pub use canonical::find_junctions;
pub use circular::find_circles;

use crate::annotation::Strand;
use crate::io::AlignmentRecord;

/// A splice or backsplice junction with its supporting read count.
///
/// For canonical junctions `start`/`stop` are intron boundaries. For
/// circular junctions `start` is the donor (lower fused coordinate) and
/// `stop` the acceptor (higher), normalized at construction. Coordinates
/// are floats so the same type survives intron rescaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JunctionEvent {
    pub start: f64,
    pub stop: f64,
    pub count: u64,
}

impl JunctionEvent {
    pub fn new(start: f64, stop: f64, count: u64) -> Self {
        debug_assert!(start <= stop, "junction start must not exceed stop");
        Self { start, stop, count }
    }

    pub fn span(&self) -> f64 {
        self.stop - self.start
    }
}

/// Uniformly reduce the counts of a whole batch by floor division.
///
/// A non-positive divisor is a configuration error: it is reported as a
/// warning and the batch is left untouched.
pub fn reduce_counts(events: &mut [JunctionEvent], divisor: f64, what: &str) {
    if divisor <= 0.0 {
        log::warn!("{what} reduction factor must be > 0; not reducing");
        return;
    }

    for event in events {
        event.count = (event.count as f64 / divisor).floor() as u64;
    }
}

/// Strand predicate for protocol-aware read filtering.
///
/// With no strand every read is accepted. Otherwise the effective strand is
/// flipped under a reverse protocol, then mate 1 reads must agree with the
/// effective strand being `+` and mate 2 reads with it being `-`. The mate
/// asymmetry is the sequencing protocol's orientation convention.
pub(crate) fn strand_accepts(
    record: &AlignmentRecord,
    strand: Option<Strand>,
    reverse_protocol: bool,
) -> bool {
    let Some(mut strand) = strand else {
        return true;
    };

    if reverse_protocol {
        strand = strand.flipped();
    }

    if record.is_read1
        && ((strand == Strand::Forward && record.is_reverse)
            || (strand == Strand::Reverse && !record.is_reverse))
    {
        return false;
    }
    if record.is_read2
        && ((strand == Strand::Forward && !record.is_reverse)
            || (strand == Strand::Reverse && record.is_reverse))
    {
        return false;
    }

    true
}

/// Window containment plus minimum support, shared by both detectors.
fn passes_filters(start: u64, stop: u64, count: u64, upstream: u64, downstream: u64, min_count: u64) -> bool {
    start >= upstream && stop <= downstream && count >= min_count
}

/// Tally map into sorted, filtered events.
fn collect_events(
    tally: std::collections::HashMap<(u64, u64), u64>,
    upstream: u64,
    downstream: u64,
    min_count: u64,
) -> Vec<JunctionEvent> {
    let mut events: Vec<JunctionEvent> = tally
        .into_iter()
        .filter(|&((start, stop), count)| {
            passes_filters(start, stop, count, upstream, downstream, min_count)
        })
        .map(|((start, stop), count)| JunctionEvent::new(start as f64, stop as f64, count))
        .collect();

    // HashMap iteration order is arbitrary; keep output deterministic.
    events.sort_by(|a, b| {
        (a.start, a.stop)
            .partial_cmp(&(b.start, b.stop))
            .expect("junction coordinates are finite")
    });

    events
}
