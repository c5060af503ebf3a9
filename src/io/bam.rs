//! Indexed BAM access with noodles.
//!
//! `BamSource` queries an indexed, coordinate-sorted BAM and converts each
//! hit into a crate-owned `AlignmentRecord`. Queries are repeatable: the
//! canonical and circular extractors each re-scan the same window
//! independently.

use std::fs::File;
use std::path::{Path, PathBuf};

use noodles::bam;
use noodles::core::{Position, Region};
use noodles::sam;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::data::field::Value;
use noodles::sam::alignment::RecordBuf;

use crate::error::Error;

// ---------------------------------------------------------------------------
// CIGAR operations
// ---------------------------------------------------------------------------

/// A single CIGAR operation with its length.
///
/// Sequence match/mismatch (`=`/`X`) are folded into `Match`; pad is folded
/// into `HardClip` (neither consumes read nor reference here).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOp {
    Match(u64),
    Insertion(u64),
    Deletion(u64),
    Skip(u64),
    SoftClip(u64),
    HardClip(u64),
}

impl CigarOp {
    pub fn len(&self) -> u64 {
        match *self {
            Self::Match(n)
            | Self::Insertion(n)
            | Self::Deletion(n)
            | Self::Skip(n)
            | Self::SoftClip(n)
            | Self::HardClip(n) => n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this operation advances the reference position.
    pub fn consumes_reference(&self) -> bool {
        matches!(self, Self::Match(_) | Self::Deletion(_) | Self::Skip(_))
    }
}

// ---------------------------------------------------------------------------
// Alignment records
// ---------------------------------------------------------------------------

/// One aligned read, reduced to what the pipeline needs.
///
/// `reference_start` is 0-based; `reference_end` is 0-based exclusive
/// (one past the last consumed reference base).
#[derive(Debug, Clone)]
pub struct AlignmentRecord {
    pub reference_name: String,
    pub reference_start: u64,
    pub reference_end: u64,
    pub cigar: Vec<CigarOp>,
    pub is_read1: bool,
    pub is_read2: bool,
    pub is_reverse: bool,
    pub is_supplementary: bool,
    /// Raw SA tag payload, when the read has a supplementary alignment.
    pub sa_tag: Option<String>,
}

impl AlignmentRecord {
    /// Total matched-base length (sum of M operations).
    pub fn matched_len(&self) -> u64 {
        self.cigar
            .iter()
            .filter(|op| matches!(op, CigarOp::Match(_)))
            .map(CigarOp::len)
            .sum()
    }

    /// Intron intervals implied by reference skips: one `(start, stop)` per
    /// N operation, 0-based half-open.
    pub fn introns(&self) -> Vec<(u64, u64)> {
        let mut introns = Vec::new();
        let mut pos = self.reference_start;

        for op in &self.cigar {
            if let CigarOp::Skip(len) = op {
                introns.push((pos, pos + len));
            }
            if op.consumes_reference() {
                pos += op.len();
            }
        }

        introns
    }

    /// Reference intervals covered by matched bases, 0-based half-open.
    pub fn aligned_blocks(&self) -> Vec<(u64, u64)> {
        let mut blocks = Vec::new();
        let mut pos = self.reference_start;

        for op in &self.cigar {
            if let CigarOp::Match(len) = op {
                blocks.push((pos, pos + len));
            }
            if op.consumes_reference() {
                pos += op.len();
            }
        }

        blocks
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// A queryable alignment source.
///
/// `scan` must support repeated, independent sequential passes over the same
/// window; each call yields a fresh record list.
pub trait AlignmentSource {
    fn scan(
        &mut self,
        contig: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<AlignmentRecord>, Error>;
}

/// Indexed BAM file source.
pub struct BamSource {
    path: PathBuf,
    reader: bam::io::IndexedReader<noodles::bgzf::Reader<File>>,
    header: sam::Header,
}

impl BamSource {
    /// Open an indexed BAM. The index must already exist next to the file;
    /// sorting and indexing are upstream responsibilities.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let mut reader = bam::io::indexed_reader::Builder::default()
            .build_from_path(path)
            .map_err(|e| {
                Error::Bam(format!(
                    "failed to open indexed BAM {}: {e} \
                     (is the file coordinate-sorted and indexed?)",
                    path.display()
                ))
            })?;

        let header = reader
            .read_header()
            .map_err(|e| Error::Bam(format!("failed to read header of {}: {e}", path.display())))?;

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            header,
        })
    }

    fn query_once(
        &mut self,
        contig: &str,
        start: u64,
        stop: u64,
    ) -> std::io::Result<Vec<AlignmentRecord>> {
        let to_position = |coord: u64| {
            Position::try_from(coord.max(1) as usize)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        };
        let region = Region::new(contig, to_position(start)?..=to_position(stop.max(start))?);

        let mut records = Vec::new();
        let query = self.reader.query(&self.header, &region)?;
        for result in query {
            let record = result?;
            let buf = RecordBuf::try_from_alignment_record(&self.header, &record)?;
            if let Some(converted) = convert_record(&self.header, &buf) {
                records.push(converted);
            }
        }

        Ok(records)
    }
}

impl AlignmentSource for BamSource {
    /// Query a window, retrying under the alternate contig naming convention
    /// (with/without the `chr` prefix) before giving up.
    fn scan(
        &mut self,
        contig: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<AlignmentRecord>, Error> {
        match self.query_once(contig, start, stop) {
            Ok(records) => Ok(records),
            Err(_) => {
                let alternate = match contig.strip_prefix("chr") {
                    Some(stripped) => stripped.to_string(),
                    None => format!("chr{contig}"),
                };
                log::debug!("contig '{contig}' not found, retrying as '{alternate}'");

                self.query_once(&alternate, start, stop)
                    .map_err(|_| Error::ContigNotFound {
                        contig: contig.to_string(),
                        path: self.path.clone(),
                    })
            }
        }
    }
}

fn convert_record(header: &sam::Header, buf: &RecordBuf) -> Option<AlignmentRecord> {
    let flags = buf.flags();
    if flags.is_unmapped() || flags.is_secondary() {
        return None;
    }

    let reference_name = buf.reference_sequence_id().and_then(|id| {
        header
            .reference_sequences()
            .get_index(id)
            .map(|(name, _)| name.to_string())
    })?;

    let reference_start = usize::from(buf.alignment_start()?) as u64 - 1;

    let mut cigar = Vec::new();
    for op in buf.cigar().as_ref() {
        let len = op.len() as u64;
        cigar.push(match op.kind() {
            Kind::Match | Kind::SequenceMatch | Kind::SequenceMismatch => CigarOp::Match(len),
            Kind::Insertion => CigarOp::Insertion(len),
            Kind::Deletion => CigarOp::Deletion(len),
            Kind::Skip => CigarOp::Skip(len),
            Kind::SoftClip => CigarOp::SoftClip(len),
            Kind::HardClip | Kind::Pad => CigarOp::HardClip(len),
        });
    }

    let reference_span: u64 = cigar
        .iter()
        .filter(|op| op.consumes_reference())
        .map(CigarOp::len)
        .sum();

    let sa_tag = buf
        .data()
        .get(&Tag::OTHER_ALIGNMENTS)
        .and_then(|value| match value {
            Value::String(s) => Some(String::from_utf8_lossy(s.as_ref()).into_owned()),
            _ => None,
        });

    Some(AlignmentRecord {
        reference_name,
        reference_start,
        reference_end: reference_start + reference_span,
        cigar,
        is_read1: flags.is_first_segment(),
        is_read2: flags.is_last_segment(),
        is_reverse: flags.is_reverse_complemented(),
        is_supplementary: flags.is_supplementary(),
        sa_tag,
    })
}

/// In-memory alignment source, for library callers and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub records: Vec<AlignmentRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<AlignmentRecord>) -> Self {
        Self { records }
    }
}

impl AlignmentSource for MemorySource {
    fn scan(
        &mut self,
        contig: &str,
        start: u64,
        stop: u64,
    ) -> Result<Vec<AlignmentRecord>, Error> {
        let hits: Vec<AlignmentRecord> = self
            .records
            .iter()
            .filter(|r| r.reference_name == contig)
            .filter(|r| r.reference_start <= stop && r.reference_end >= start)
            .cloned()
            .collect();

        if hits.is_empty() && !self.records.iter().any(|r| r.reference_name == contig) {
            return Err(Error::ContigNotFound {
                contig: contig.to_string(),
                path: PathBuf::from("<memory>"),
            });
        }

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn spliced_record(start: u64, cigar: Vec<CigarOp>) -> AlignmentRecord {
        let span: u64 = cigar
            .iter()
            .filter(|op| op.consumes_reference())
            .map(CigarOp::len)
            .sum();
        AlignmentRecord {
            reference_name: "chr1".to_string(),
            reference_start: start,
            reference_end: start + span,
            cigar,
            is_read1: true,
            is_read2: false,
            is_reverse: false,
            is_supplementary: false,
            sa_tag: None,
        }
    }

    #[test]
    fn test_introns_from_cigar() {
        // 50M 300N 50M starting at 150: intron is [200, 500).
        let record = spliced_record(
            150,
            vec![CigarOp::Match(50), CigarOp::Skip(300), CigarOp::Match(50)],
        );
        assert_eq!(record.introns(), vec![(200, 500)]);
    }

    #[test]
    fn test_multiple_introns() {
        let record = spliced_record(
            100,
            vec![
                CigarOp::SoftClip(5),
                CigarOp::Match(20),
                CigarOp::Skip(80),
                CigarOp::Match(10),
                CigarOp::Skip(40),
                CigarOp::Match(30),
            ],
        );
        assert_eq!(record.introns(), vec![(120, 200), (210, 250)]);
    }

    #[test]
    fn test_insertion_does_not_advance_reference() {
        let record = spliced_record(
            100,
            vec![
                CigarOp::Match(10),
                CigarOp::Insertion(5),
                CigarOp::Skip(20),
                CigarOp::Match(10),
            ],
        );
        assert_eq!(record.introns(), vec![(110, 130)]);
        assert_eq!(record.reference_end, 140);
    }

    #[test]
    fn test_matched_len_ignores_clips_and_gaps() {
        let record = spliced_record(
            0,
            vec![
                CigarOp::SoftClip(8),
                CigarOp::Match(25),
                CigarOp::Deletion(2),
                CigarOp::Match(15),
                CigarOp::HardClip(4),
            ],
        );
        assert_eq!(record.matched_len(), 40);
    }

    #[test]
    fn test_aligned_blocks() {
        let record = spliced_record(
            100,
            vec![CigarOp::Match(10), CigarOp::Skip(50), CigarOp::Match(20)],
        );
        assert_eq!(record.aligned_blocks(), vec![(100, 110), (160, 180)]);
    }

    #[test]
    fn test_memory_source_window_and_contig() {
        let mut source = MemorySource::new(vec![spliced_record(100, vec![CigarOp::Match(50)])]);

        let hits = source.scan("chr1", 0, 1000).unwrap();
        assert_eq!(hits.len(), 1);

        // Non-overlapping window: no hits, but the contig exists.
        let hits = source.scan("chr1", 5000, 6000).unwrap();
        assert!(hits.is_empty());

        let err = source.scan("chr9", 0, 1000);
        assert!(matches!(err, Err(Error::ContigNotFound { .. })));
    }
}
