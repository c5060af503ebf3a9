// Canonical splice junction extraction

use std::collections::HashMap;

use crate::annotation::Strand;
use crate::error::Error;
use crate::io::AlignmentSource;
use crate::junction::{collect_events, strand_accepts, JunctionEvent};

/// Extract canonical splice junctions from spliced alignments.
///
/// Every reference gap bounded by aligned blocks contributes one intron;
/// identical `(start, stop)` intervals are tallied across reads. Junctions
/// are kept when the intron lies fully inside `[upstream, downstream]` and
/// at least `min_count` reads support it.
pub fn find_junctions(
    source: &mut dyn AlignmentSource,
    contig: &str,
    upstream: u64,
    downstream: u64,
    min_count: u64,
    strand: Option<Strand>,
    reverse_protocol: bool,
) -> Result<Vec<JunctionEvent>, Error> {
    let records = source.scan(contig, upstream, downstream)?;

    let mut tally: HashMap<(u64, u64), u64> = HashMap::new();
    for record in records
        .iter()
        .filter(|r| strand_accepts(r, strand, reverse_protocol))
    {
        for intron in record.introns() {
            *tally.entry(intron).or_insert(0) += 1;
        }
    }

    let events = collect_events(tally, upstream, downstream, min_count);
    log::debug!(
        "{}:{upstream}-{downstream}: {} canonical junctions pass filters",
        contig,
        events.len()
    );

    Ok(events)
}
