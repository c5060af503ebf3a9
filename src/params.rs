use std::path::PathBuf;

use clap::Parser;

use crate::error::Error;

// ---------------------------------------------------------------------------
// Strand protocol enum
// ---------------------------------------------------------------------------

/// Library preparation strandedness for `--stranded`.
///
/// `Forward` means upstream (mate 1) reads are on the transcribed strand;
/// `Reverse` is the opposite convention (e.g. TruSeq stranded kits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrandProtocol {
    Forward,
    Reverse,
}

impl std::str::FromStr for StrandProtocol {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(Self::Forward),
            "reverse" => Ok(Self::Reverse),
            _ => Err(format!(
                "unknown stranded value '{s}'; expected 'forward' or 'reverse'"
            )),
        }
    }
}

impl std::fmt::Display for StrandProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Reverse => write!(f, "reverse"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameters struct
// ---------------------------------------------------------------------------

/// splicevis command-line parameters.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "splicevis",
    about = "Plot gene/transcript structure with splice and backsplice junction evidence",
    version
)]
pub struct Parameters {
    // ── Inputs ──────────────────────────────────────────────────────────
    /// Path to GTF annotation file
    #[arg(long = "gtf", required = true)]
    pub gtf: PathBuf,

    /// Path to each coordinate-sorted, indexed BAM file
    #[arg(short = 'b', long = "bam", num_args = 1.., required = true)]
    pub bam: Vec<PathBuf>,

    /// Name of gene to plot (overrides --transcript); plots its longest transcript
    #[arg(short = 'g', long = "gene")]
    pub gene: Option<String>,

    /// Name of transcript to plot
    #[arg(short = 't', long = "transcript")]
    pub transcript: Option<String>,

    // ── Junction detection ──────────────────────────────────────────────
    /// Drop canonical junctions supported by fewer reads than this
    #[arg(short = 'f', long = "filter", default_value_t = 0)]
    pub filter: u64,

    /// Drop backsplice junctions supported by fewer reads than this
    #[arg(long = "circle-filter", default_value_t = 2)]
    pub circle_filter: u64,

    /// Minimum matched bases required on each side of a backsplice candidate
    #[arg(long = "min-overhang", default_value_t = 10)]
    pub min_overhang: u64,

    /// Strand-specific protocol: 'forward' if upstream reads are forward
    /// strand, otherwise 'reverse' (TruSeq is 'reverse')
    #[arg(long = "stranded")]
    pub stranded: Option<StrandProtocol>,

    // ── Display transforms ──────────────────────────────────────────────
    /// Factor by which intron white space should be reduced
    #[arg(long = "intron-scale")]
    pub intron_scale: Option<f64>,

    /// Factor by which to reduce canonical junction stroke counts
    #[arg(long = "reduce-canonical")]
    pub reduce_canonical: Option<f64>,

    /// Factor by which to reduce backsplice junction stroke counts
    #[arg(long = "reduce-backsplice")]
    pub reduce_backsplice: Option<f64>,

    /// Normalize exon coverage shading between samples
    #[arg(short = 'n', long = "normalize")]
    pub normalize: bool,

    /// Label exons with their number and junctions with their read counts
    #[arg(long = "exon-numbering")]
    pub exon_numbering: bool,

    /// Exon color: hex ("#4286f4"), RGB ("211,19,23") or a name ("red")
    #[arg(short = 'c', long = "color", default_value = "#C21807")]
    pub color: String,

    // ── Output ──────────────────────────────────────────────────────────
    /// Output file name prefix (including path)
    #[arg(long = "out-prefix", default_value = "./")]
    pub out_prefix: PathBuf,
}

impl Parameters {
    /// Validate parameter combinations that clap cannot express.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.gtf.exists() {
            return Err(Error::Parameter(format!(
                "GTF {} was not found",
                self.gtf.display()
            )));
        }

        for path in &self.bam {
            if !path.exists() {
                return Err(Error::Parameter(format!(
                    "BAM {} was not found",
                    path.display()
                )));
            }
        }

        if self.gene.is_none() && self.transcript.is_none() {
            return Err(Error::Parameter(
                "either a gene or a transcript must be specified \
                 (e.g. \"-t ENST00000390665\" or \"-g EGFR\")"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Title used for output file names: the gene if given, else the transcript.
    pub fn title(&self) -> &str {
        self.gene
            .as_deref()
            .or(self.transcript.as_deref())
            .unwrap_or("transcript")
    }
}
