//! GTF exon extraction.
//!
//! Scans a GTF file for the exons of a named gene or transcript and builds
//! the transcript model the rest of the pipeline runs on. When a gene has
//! several isoforms, the longest one (by summed exon length) is kept.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::Error;

/// Genomic strand, as annotated in the GTF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    /// The opposite strand.
    pub fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }

    fn from_gtf(c: &str) -> Option<Self> {
        match c {
            "+" => Some(Self::Forward),
            "-" => Some(Self::Reverse),
            _ => None,
        }
    }
}

/// A closed genomic interval with `start <= stop`, in GTF coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenomicInterval {
    pub start: u64,
    pub stop: u64,
}

impl GenomicInterval {
    pub fn new(start: u64, stop: u64) -> Self {
        debug_assert!(start <= stop, "interval start must not exceed stop");
        Self { start, stop }
    }

    pub fn len(&self) -> u64 {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What to look up in the GTF.
#[derive(Debug, Clone)]
pub enum Selector {
    Gene(String),
    Transcript(String),
}

impl Selector {
    fn name(&self) -> &str {
        match self {
            Self::Gene(name) | Self::Transcript(name) => name,
        }
    }

    fn attribute_key(&self) -> &'static str {
        match self {
            Self::Gene(_) => "gene_name",
            Self::Transcript(_) => "transcript_id",
        }
    }
}

/// One transcript's worth of exons, all on one contig and one strand.
#[derive(Debug, Clone)]
pub struct TranscriptModel {
    pub chromosome: String,
    pub strand: Option<Strand>,
    /// Exons sorted ascending by start; non-overlapping for one transcript.
    pub exons: Vec<GenomicInterval>,
}

impl TranscriptModel {
    pub fn span(&self) -> (u64, u64) {
        let start = self.exons.iter().map(|e| e.start).min().unwrap_or(0);
        let stop = self.exons.iter().map(|e| e.stop).max().unwrap_or(0);
        (start, stop)
    }
}

/// One exon line of interest from the GTF.
#[derive(Debug, Clone)]
struct ExonRecord {
    chromosome: String,
    start: u64,
    stop: u64,
    strand: String,
}

/// Load the exon model for `selector` from a GTF file.
///
/// Gene mode picks the longest daughter transcript; transcript mode returns
/// that transcript directly. A gene annotated on more than one contig or
/// strand is rejected as ambiguous.
pub fn load_transcript(path: &Path, selector: &Selector) -> Result<TranscriptModel, Error> {
    log::info!(
        "searching {} for {} \"{}\"",
        path.display(),
        selector.attribute_key(),
        selector.name()
    );

    let file = File::open(path).map_err(|e| Error::io(e, path))?;
    let reader = BufReader::new(file);

    // Fast substring pre-filter before splitting the line into fields.
    let needle = format!("{} \"{}\"", selector.attribute_key(), selector.name());

    let mut transcripts: HashMap<String, Vec<ExonRecord>> = HashMap::new();
    let mut line_num = 0u64;

    for line in reader.lines() {
        line_num += 1;
        let line = line.map_err(|e| Error::Gtf(format!("failed to read line {line_num}: {e}")))?;

        if line.starts_with('#') || !line.contains(&needle) {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 9 {
            log::warn!(
                "skipping malformed GTF line {line_num}: {} fields, expected 9",
                fields.len()
            );
            continue;
        }

        if !fields[2].eq_ignore_ascii_case("exon") {
            continue;
        }

        let start = fields[3]
            .parse::<u64>()
            .map_err(|e| Error::Gtf(format!("invalid start on line {line_num}: {e}")))?;
        let stop = fields[4]
            .parse::<u64>()
            .map_err(|e| Error::Gtf(format!("invalid stop on line {line_num}: {e}")))?;

        let attributes = parse_attributes(fields[8]);
        let Some(transcript_id) = attributes.get("transcript_id") else {
            log::warn!("skipping exon without transcript_id on line {line_num}");
            continue;
        };

        // The substring pre-filter can hit inside unrelated attribute values;
        // confirm against the parsed attribute.
        if attributes.get(selector.attribute_key()).map(String::as_str) != Some(selector.name()) {
            continue;
        }

        transcripts
            .entry(transcript_id.clone())
            .or_default()
            .push(ExonRecord {
                chromosome: fields[0].to_string(),
                start,
                stop,
                strand: fields[6].to_string(),
            });
    }

    if transcripts.is_empty() {
        return Err(Error::Gtf(format!(
            "{} \"{}\" not found in {}",
            selector.attribute_key(),
            selector.name(),
            path.display()
        )));
    }

    // Longest isoform by summed exon length (closed intervals).
    let longest = transcripts
        .iter()
        .max_by_key(|(id, exons)| {
            let length: u64 = exons.iter().map(|e| e.stop - e.start + 1).sum();
            (length, std::cmp::Reverse(id.to_string()))
        })
        .map(|(id, _)| id.clone())
        .expect("transcripts is non-empty");

    let exon_records = transcripts.remove(&longest).expect("key exists");
    log::info!(
        "selected transcript {} with {} exons",
        longest,
        exon_records.len()
    );

    let chromosomes: Vec<&str> = dedup(exon_records.iter().map(|e| e.chromosome.as_str()));
    if chromosomes.len() != 1 {
        return Err(Error::AmbiguousAnnotation(format!(
            "{} found on more than one contig ({}); please fix the GTF",
            selector.name(),
            chromosomes.join(", ")
        )));
    }

    let strands: Vec<&str> = dedup(exon_records.iter().map(|e| e.strand.as_str()));
    if strands.len() != 1 {
        return Err(Error::AmbiguousAnnotation(format!(
            "{} found on both DNA strands; please fix the GTF",
            selector.name()
        )));
    }

    let mut exons: Vec<GenomicInterval> = exon_records
        .iter()
        .map(|e| GenomicInterval::new(e.start, e.stop))
        .collect();
    exons.sort_by_key(|e| e.start);

    Ok(TranscriptModel {
        chromosome: chromosomes[0].to_string(),
        strand: Strand::from_gtf(strands[0]),
        exons,
    })
}

/// Parse a GTF attributes field: `key1 "value1"; key2 "value2";`
fn parse_attributes(attr_str: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();

    for pair in attr_str.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let mut parts = pair.splitn(2, ' ');
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };

        attributes.insert(
            key.trim().to_string(),
            value.trim().trim_matches('"').to_string(),
        );
    }

    attributes
}

fn dedup<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut unique: Vec<&str> = Vec::new();
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}
