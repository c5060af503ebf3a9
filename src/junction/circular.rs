// Circular (backsplice) junction detection from split alignments

use std::collections::HashMap;

use crate::annotation::Strand;
use crate::error::Error;
use crate::io::AlignmentSource;
use crate::junction::{collect_events, strand_accepts, JunctionEvent};

/// The companion alignment named by an SA tag.
///
/// Only the first SA entry is considered; a read split more than once is
/// not backsplice evidence this detector can interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Companion {
    contig: String,
    /// 1-based start position from the tag payload.
    start: u64,
    /// Total matched-base length of the companion's CIGAR.
    matched_len: u64,
}

impl Companion {
    /// Parse `contig,pos,strand,CIGAR,mapQ,NM;...` (SAM SA tag format).
    fn parse(tag: &str) -> Option<Self> {
        let mut fields = tag.split(',');
        let contig = fields.next()?.to_string();
        let start = fields.next()?.parse().ok()?;
        let _strand = fields.next()?;
        let cigar = fields.next()?;

        Some(Self {
            contig,
            start,
            matched_len: matched_len_of(cigar),
        })
    }
}

/// Sum of M operation lengths in a CIGAR string.
fn matched_len_of(cigar: &str) -> u64 {
    let mut total = 0;
    let mut num = 0u64;

    for c in cigar.chars() {
        if let Some(digit) = c.to_digit(10) {
            num = num * 10 + u64::from(digit);
        } else {
            if c == 'M' {
                total += num;
            }
            num = 0;
        }
    }

    total
}

/// Detect backsplice junctions evidenced by split alignments.
///
/// A candidate requires a primary (non-supplementary), strand-accepted read
/// whose SA tag points at the same contig; both sides must carry strictly
/// more than `min_overhang` matched bases. The two fused coordinates are
/// sorted into `(donor, acceptor)` before tallying, so `start <= stop`
/// always holds on the emitted events.
pub fn find_circles(
    source: &mut dyn AlignmentSource,
    contig: &str,
    upstream: u64,
    downstream: u64,
    min_overhang: u64,
    min_count: u64,
    strand: Option<Strand>,
    reverse_protocol: bool,
) -> Result<Vec<JunctionEvent>, Error> {
    let records = source.scan(contig, upstream, downstream)?;

    let mut tally: HashMap<(u64, u64), u64> = HashMap::new();
    for record in &records {
        // Supplementary alignments are the other half of a split read that
        // is already counted through its primary; skip them.
        if record.is_supplementary || !strand_accepts(record, strand, reverse_protocol) {
            continue;
        }

        let Some(tag) = record.sa_tag.as_deref() else {
            continue;
        };
        let Some(companion) = Companion::parse(tag) else {
            log::warn!("skipping unparseable SA tag: {tag}");
            continue;
        };

        // Circles only, not fusions: the companion must be on this contig.
        if companion.contig != record.reference_name {
            continue;
        }

        if !(record.matched_len() > min_overhang && companion.matched_len > min_overhang) {
            continue;
        }

        let fused = record.reference_end + 1;
        let donor = fused.min(companion.start);
        let acceptor = fused.max(companion.start);
        *tally.entry((donor, acceptor)).or_insert(0) += 1;
    }

    let events = collect_events(tally, upstream, downstream, min_count);
    log::debug!(
        "{}:{upstream}-{downstream}: {} circular junctions pass filters",
        contig,
        events.len()
    );

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{AlignmentRecord, CigarOp, MemorySource};

    fn split_read(start: u64, match_len: u64, sa: &str) -> AlignmentRecord {
        AlignmentRecord {
            reference_name: "chr1".to_string(),
            reference_start: start,
            reference_end: start + match_len,
            cigar: vec![CigarOp::Match(match_len), CigarOp::SoftClip(20)],
            is_read1: true,
            is_read2: false,
            is_reverse: false,
            is_supplementary: false,
            sa_tag: Some(sa.to_string()),
        }
    }

    #[test]
    fn test_companion_parse() {
        let companion = Companion::parse("chr1,650,+,30M70S,60,1;").unwrap();
        assert_eq!(companion.contig, "chr1");
        assert_eq!(companion.start, 650);
        assert_eq!(companion.matched_len, 30);
    }

    #[test]
    fn test_matched_len_sums_all_m_operations() {
        assert_eq!(matched_len_of("30M70S"), 30);
        assert_eq!(matched_len_of("10M5D20M15S"), 30);
        assert_eq!(matched_len_of("100S"), 0);
    }

    #[test]
    fn test_donor_acceptor_ordering() {
        // Primary ends at 699 (reference_end 699, fused 700); companion
        // starts upstream at 650. The event must come out as (650, 700).
        let read = split_read(649, 50, "chr1,650,+,40M60S,60,0;");
        let mut source = MemorySource::new(vec![read; 2]);

        let events = find_circles(&mut source, "chr1", 0, 1000, 10, 2, None, false).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start, 650.0);
        assert_eq!(events[0].stop, 700.0);
        assert_eq!(events[0].count, 2);
    }

    #[test]
    fn test_overhang_gates_individual_reads() {
        // Primary has 50 matched bases but the companion only 5: rejected.
        let weak = split_read(100, 50, "chr1,400,+,5M95S,60,0;");
        let mut source = MemorySource::new(vec![weak; 3]);
        let events = find_circles(&mut source, "chr1", 0, 1000, 10, 1, None, false).unwrap();
        assert!(events.is_empty());

        // Overhang is strict: exactly min_overhang matched bases fails too.
        let borderline = split_read(100, 10, "chr1,400,+,50M50S,60,0;");
        let mut source = MemorySource::new(vec![borderline; 3]);
        let events = find_circles(&mut source, "chr1", 0, 1000, 10, 1, None, false).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_cross_contig_splits_are_excluded() {
        let fusion = split_read(100, 50, "chr2,400,+,50M50S,60,0;");
        let mut source = MemorySource::new(vec![fusion; 3]);
        let events = find_circles(&mut source, "chr1", 0, 1000, 10, 1, None, false).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_supplementary_records_never_primary() {
        let mut supp = split_read(100, 50, "chr1,400,+,50M50S,60,0;");
        supp.is_supplementary = true;
        let mut source = MemorySource::new(vec![supp; 3]);
        let events = find_circles(&mut source, "chr1", 0, 1000, 10, 1, None, false).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_reads_without_sa_are_ignored() {
        let mut plain = split_read(100, 50, "unused");
        plain.sa_tag = None;
        let mut source = MemorySource::new(vec![plain; 3]);
        let events = find_circles(&mut source, "chr1", 0, 1000, 10, 1, None, false).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_min_count_gates_aggregate() {
        let read = split_read(100, 50, "chr1,400,+,50M50S,60,0;");
        let mut source = MemorySource::new(vec![read]);
        let events = find_circles(&mut source, "chr1", 0, 1000, 10, 2, None, false).unwrap();
        assert!(events.is_empty());
    }
}
