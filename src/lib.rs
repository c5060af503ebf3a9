pub mod annotation;
pub mod color;
pub mod coverage;
pub mod error;
pub mod geometry;
pub mod io;
pub mod junction;
pub mod layout;
pub mod params;
pub mod render;
pub mod scale;

use std::path::{Path, PathBuf};

use log::info;

use crate::annotation::{Selector, Strand, TranscriptModel};
use crate::error::Error;
use crate::io::BamSource;
use crate::junction::{find_circles, find_junctions, reduce_counts};
use crate::params::{Parameters, StrandProtocol};
use crate::render::{RenderOptions, SamplePanel};
use crate::scale::{scale_introns, CoordinateMap, ScaledInterval};

/// Top-level dispatcher. Called from `main()` after CLI parsing.
pub fn run(params: &Parameters) -> anyhow::Result<()> {
    params.validate()?;

    info!("splicevis v{}", env!("CARGO_PKG_VERSION"));

    let selector = match (&params.gene, &params.transcript) {
        (Some(gene), _) => Selector::Gene(gene.clone()),
        (None, Some(transcript)) => Selector::Transcript(transcript.clone()),
        (None, None) => unreachable!("validated above"),
    };

    let model = annotation::load_transcript(&params.gtf, &selector)?;
    let (transcript_start, transcript_stop) = model.span();
    info!(
        "{}: {} exons on {} spanning {}-{}",
        params.title(),
        model.exons.len(),
        model.chromosome,
        transcript_start,
        transcript_stop
    );

    // Strand filtering only applies when the library is strand-specific.
    let (strand, reverse_protocol) = match params.stranded {
        Some(protocol) => (model.strand, protocol == StrandProtocol::Reverse),
        None => (None, false),
    };

    // Samples are processed strictly sequentially. A sample whose contig
    // cannot be resolved (or whose window is empty) is skipped with an
    // error; the rest of the batch continues.
    let mut panels: Vec<SamplePanel> = Vec::new();
    for path in &params.bam {
        match process_sample(
            path,
            &model,
            transcript_start,
            transcript_stop,
            strand,
            reverse_protocol,
            params,
        ) {
            Ok(panel) => panels.push(panel),
            Err(e) if e.is_sample_fatal() => {
                log::error!("skipping sample {}: {e}", path.display());
            }
            Err(e) => return Err(e.into()),
        }
    }

    if panels.is_empty() {
        anyhow::bail!("no samples could be processed");
    }

    // Optional intron scaling: exons and every junction endpoint go through
    // the same transform.
    let exons: Vec<ScaledInterval> = match params.intron_scale {
        Some(factor) if factor > 0.0 => {
            info!("scaling introns by a factor of {factor}");
            let scaled = scale_introns(&model.exons, factor);
            let map = CoordinateMap::new(&model.exons, &scaled);
            for panel in &mut panels {
                panel.canonical = map.transform_events(&panel.canonical);
                panel.circular = map.transform_events(&panel.circular);
            }
            scaled
        }
        // Warns and returns the coordinates unscaled.
        Some(factor) => scale_introns(&model.exons, factor),
        None => model.exons.iter().copied().map(ScaledInterval::from).collect(),
    };

    if let Some(divisor) = params.reduce_canonical {
        for panel in &mut panels {
            reduce_counts(&mut panel.canonical, divisor, "canonical");
        }
    }
    if let Some(divisor) = params.reduce_backsplice {
        for panel in &mut panels {
            reduce_counts(&mut panel.circular, divisor, "backsplice");
        }
    }

    let options = RenderOptions {
        color: color::parse_color(&params.color),
        exon_numbering: params.exon_numbering,
        normalize: params.normalize,
    };

    let title = params.title();
    let svg_name = format!("{title}.svg");
    let svg_path = prefixed_path(&params.out_prefix, &svg_name);
    let mut rng = rand::thread_rng();
    render::render_figure(&svg_path, &panels, &exons, model.strand, &options, &mut rng)?;

    let html_path = prefixed_path(&params.out_prefix, &format!("{title}.html"));
    render::write_html_wrapper(&html_path, &svg_name)?;
    info!("wrote {}", html_path.display());

    Ok(())
}

/// Extract junctions and coverage for one BAM sample.
fn process_sample(
    path: &Path,
    model: &TranscriptModel,
    transcript_start: u64,
    transcript_stop: u64,
    strand: Option<Strand>,
    reverse_protocol: bool,
    params: &Parameters,
) -> Result<SamplePanel, Error> {
    info!("processing {}", path.display());
    let mut source = BamSource::open(path)?;

    let canonical = find_junctions(
        &mut source,
        &model.chromosome,
        transcript_start,
        transcript_stop,
        params.filter,
        strand,
        reverse_protocol,
    )?;
    let circular = find_circles(
        &mut source,
        &model.chromosome,
        transcript_start,
        transcript_stop,
        params.min_overhang,
        params.circle_filter,
        strand,
        reverse_protocol,
    )?;
    let coverage = coverage::exon_coverage(
        &mut source,
        &model.chromosome,
        &model.exons,
        strand,
        reverse_protocol,
    )?;

    if canonical.is_empty() && circular.is_empty() && coverage.iter().all(|&c| c == 0.0) {
        return Err(Error::Bam(format!(
            "no alignments overlap {}:{transcript_start}-{transcript_stop} in {}",
            model.chromosome,
            path.display()
        )));
    }

    info!(
        "{}: {} canonical and {} circular junctions pass filters",
        path.display(),
        canonical.len(),
        circular.len()
    );

    Ok(SamplePanel {
        name: render::sample_name(path),
        canonical,
        circular,
        coverage,
    })
}

/// Join an output prefix (which may end mid-filename, like `./results/run1_`)
/// with a file name.
fn prefixed_path(prefix: &Path, name: &str) -> PathBuf {
    let mut joined = prefix.as_os_str().to_os_string();
    joined.push(name);
    PathBuf::from(joined)
}
