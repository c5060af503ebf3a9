//! Per-exon read coverage.
//!
//! Average depth over each exon, from the overlap of matched alignment
//! blocks with the exon interval, under the same strand predicate the
//! junction extractors use. Coverage only drives exon shading; an optional
//! cross-sample maximum normalizes shading between samples.

use crate::annotation::{GenomicInterval, Strand};
use crate::error::Error;
use crate::io::AlignmentSource;
use crate::junction::strand_accepts;

/// Average coverage per exon, in input order.
pub fn exon_coverage(
    source: &mut dyn AlignmentSource,
    contig: &str,
    exons: &[GenomicInterval],
    strand: Option<Strand>,
    reverse_protocol: bool,
) -> Result<Vec<f64>, Error> {
    let mut coverage = Vec::with_capacity(exons.len());

    for exon in exons {
        let records = source.scan(contig, exon.start, exon.stop)?;

        let mut total_bases = 0u64;
        for record in records
            .iter()
            .filter(|r| strand_accepts(r, strand, reverse_protocol))
        {
            for (block_start, block_end) in record.aligned_blocks() {
                let lo = block_start.max(exon.start);
                let hi = block_end.min(exon.stop + 1);
                if hi > lo {
                    total_bases += hi - lo;
                }
            }
        }

        coverage.push(total_bases as f64 / (exon.stop - exon.start + 1) as f64);
    }

    Ok(coverage)
}

/// Highest per-exon coverage of one sample; 0 for an empty list.
pub fn max_coverage(coverage: &[f64]) -> f64 {
    coverage.iter().copied().fold(0.0, f64::max)
}

/// Highest per-exon coverage across all samples, for `--normalize`.
pub fn cross_sample_max(samples: &[Vec<f64>]) -> f64 {
    samples
        .iter()
        .map(|coverage| max_coverage(coverage))
        .fold(0.0, f64::max)
}
