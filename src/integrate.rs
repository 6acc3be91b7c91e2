//! Evidence integration: merge the detectors' per-read calls into one
//! deduplicated, annotated candidate table.

use crate::annotation::GeneLoci;
use crate::error::Result;
use crate::output::TableRow;
use crate::sources::{read_calls, CallSource, Origin, RawCall};
use crate::types::{HashSet, HashSetExt};
use serde::Serialize;

/// A cleaned, annotated fusion call. One per read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FusionCall {
    #[serde(rename = "Read_ID")]
    pub read_id: String,
    #[serde(rename = "Chimera_ID")]
    pub chimera_id: String,
    #[serde(rename = "Origin")]
    pub origin: Origin,
    #[serde(rename = "GeneA")]
    pub gene_a: String,
    #[serde(rename = "GeneB")]
    pub gene_b: String,
    #[serde(rename = "Chromosome_Gene_A")]
    pub chromosome_a: Option<String>,
    #[serde(rename = "Strand_Gene_A")]
    pub strand_a: Option<char>,
    #[serde(rename = "Chromosome_Gene_B")]
    pub chromosome_b: Option<String>,
    #[serde(rename = "Strand_Gene_B")]
    pub strand_b: Option<char>,
}

impl TableRow for FusionCall {
    const COLUMNS: &'static [&'static str] = &[
        "Read_ID",
        "Chimera_ID",
        "Origin",
        "GeneA",
        "GeneB",
        "Chromosome_Gene_A",
        "Strand_Gene_A",
        "Chromosome_Gene_B",
        "Strand_Gene_B",
    ];
}

impl FusionCall {
    /// Both gene tokens present.
    pub fn is_well_formed(&self) -> bool {
        !self.gene_a.is_empty() && !self.gene_b.is_empty()
    }
}

/// A call naming more than two genes. Kept aside, never used downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuarantinedCall {
    #[serde(rename = "Read_ID")]
    pub read_id: String,
    #[serde(rename = "Chimera_ID")]
    pub chimera_id: String,
    #[serde(rename = "Origin")]
    pub origin: Origin,
}

impl TableRow for QuarantinedCall {
    const COLUMNS: &'static [&'static str] = &["Read_ID", "Chimera_ID", "Origin"];
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IntegrationStats {
    pub total_rows: usize,
    pub kept: usize,
    pub quarantined: usize,
    pub missing_chimera: usize,
    pub duplicate_reads: usize,
    pub malformed: usize,
    /// Kept calls whose id had no colon; they stay but carry no genes.
    pub unsplittable: usize,
    pub unknown_genes: usize,
}

impl IntegrationStats {
    /// Every input row lands in exactly one bucket.
    pub fn is_conserved(&self) -> bool {
        self.kept + self.quarantined + self.missing_chimera + self.duplicate_reads + self.malformed
            == self.total_rows
    }
}

/// Distinct chimera ids reported by one detector or shared by several.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapRow {
    /// Detector names joined with `&`.
    #[serde(rename = "Set")]
    pub set: String,
    #[serde(rename = "Tools")]
    pub tools: usize,
    #[serde(rename = "Chimeras")]
    pub chimeras: usize,
    /// Share of this detector's chimeras found by every detector, in percent.
    /// Only on single-detector rows, and only with three or more detectors.
    #[serde(rename = "Consensus_Precision")]
    pub consensus_precision: Option<f64>,
}

impl TableRow for OverlapRow {
    const COLUMNS: &'static [&'static str] = &["Set", "Tools", "Chimeras", "Consensus_Precision"];
}

#[derive(Debug, Default)]
pub struct Integration {
    pub calls: Vec<FusionCall>,
    pub quarantined: Vec<QuarantinedCall>,
    /// Cross-detector agreement on chimera ids, before deduplication.
    pub overlap: Vec<OverlapRow>,
    pub stats: IntegrationStats,
}

impl Integration {
    /// Candidate read ids in table order.
    pub fn read_ids(&self) -> impl Iterator<Item = &str> {
        self.calls.iter().map(|c| c.read_id.as_str())
    }
}

/// Split on the first colon. `None` when there is no colon.
pub fn split_chimera_id(chimera_id: &str) -> Option<(&str, &str)> {
    chimera_id
        .split_once(':')
        .map(|(a, b)| (a.trim(), b.trim()))
}

/// Read every source in priority order and integrate the calls.
pub fn integrate(sources: &[CallSource], loci: &GeneLoci) -> Result<Integration> {
    let mut raw = Vec::new();
    let mut malformed = 0usize;

    for source in sources {
        let (calls, counts) = read_calls(source)?;
        malformed += counts.malformed;
        raw.extend(calls);
    }

    let origins: Vec<Origin> = sources.iter().map(|s| s.origin).collect();
    let overlap = overlap_analysis(&raw, &origins);
    for row in &overlap {
        tracing::info!(set = %row.set, chimeras = row.chimeras, "detector overlap");
    }

    let mut integration = integrate_calls(raw, loci);
    integration.overlap = overlap;
    integration.stats.malformed += malformed;
    integration.stats.total_rows += malformed;

    tracing::info!(
        total_rows = integration.stats.total_rows,
        kept = integration.stats.kept,
        quarantined = integration.stats.quarantined,
        missing_chimera = integration.stats.missing_chimera,
        duplicate_reads = integration.stats.duplicate_reads,
        malformed = integration.stats.malformed,
        "evidence integration complete"
    );
    if integration.stats.quarantined > 0 {
        tracing::info!(
            count = integration.stats.quarantined,
            "quarantined calls naming more than two genes"
        );
    }

    Ok(integration)
}

/// Integrate already-parsed calls, given in priority order.
///
/// Deduplication runs before quarantine, so a read whose first call names
/// three genes is quarantined even if a later source has a clean pair for it.
pub fn integrate_calls(raw: Vec<RawCall>, loci: &GeneLoci) -> Integration {
    let mut out = Integration::default();
    out.stats.total_rows = raw.len();

    let mut seen: HashSet<String> = HashSet::new();

    for call in raw {
        let Some(chimera_id) = call.chimera_id else {
            out.stats.missing_chimera += 1;
            continue;
        };

        if !seen.insert(call.read_id.clone()) {
            out.stats.duplicate_reads += 1;
            continue;
        }

        if chimera_id.matches(':').count() > 1 {
            out.stats.quarantined += 1;
            out.quarantined.push(QuarantinedCall {
                read_id: call.read_id,
                chimera_id,
                origin: call.origin,
            });
            continue;
        }

        let (gene_a, gene_b) = match split_chimera_id(&chimera_id) {
            Some((a, b)) => (a.to_string(), b.to_string()),
            None => {
                tracing::warn!(
                    read_id = %call.read_id,
                    chimera_id = %chimera_id,
                    "chimera id has no gene separator"
                );
                out.stats.unsplittable += 1;
                (String::new(), String::new())
            }
        };

        let locus_a = loci.get(&gene_a);
        let locus_b = loci.get(&gene_b);
        if !gene_a.is_empty() && locus_a.is_none() {
            out.stats.unknown_genes += 1;
        }
        if !gene_b.is_empty() && locus_b.is_none() {
            out.stats.unknown_genes += 1;
        }

        out.calls.push(FusionCall {
            read_id: call.read_id,
            chimera_id,
            origin: call.origin,
            chromosome_a: locus_a.map(|l| l.chromosome.clone()),
            strand_a: locus_a.map(|l| l.strand),
            chromosome_b: locus_b.map(|l| l.chromosome.clone()),
            strand_b: locus_b.map(|l| l.strand),
            gene_a,
            gene_b,
        });
        out.stats.kept += 1;
    }

    if out.stats.unknown_genes > 0 {
        tracing::warn!(
            count = out.stats.unknown_genes,
            "gene names missing from the annotation"
        );
    }

    out
}

/// Per-detector distinct chimera ids, their pairwise intersections and, with
/// three or more detectors, the intersection of all of them.
///
/// `origins` fixes the row order. Calls without a chimera id are ignored;
/// ids are compared after pair-delimiter normalisation.
pub fn overlap_analysis(raw: &[RawCall], origins: &[Origin]) -> Vec<OverlapRow> {
    let sets: Vec<(Origin, HashSet<&str>)> = origins
        .iter()
        .map(|origin| {
            let ids = raw
                .iter()
                .filter(|c| c.origin == *origin)
                .filter_map(|c| c.chimera_id.as_deref())
                .collect();
            (*origin, ids)
        })
        .collect();

    let consensus = (sets.len() >= 3).then(|| {
        let (_, first) = &sets[0];
        first
            .iter()
            .filter(|id| sets[1..].iter().all(|(_, other)| other.contains(*id)))
            .count()
    });

    let mut rows = Vec::new();
    for (origin, ids) in &sets {
        let consensus_precision = match consensus {
            Some(shared) if !ids.is_empty() => Some(shared as f64 / ids.len() as f64 * 100.0),
            _ => None,
        };
        rows.push(OverlapRow {
            set: origin.as_str().to_string(),
            tools: 1,
            chimeras: ids.len(),
            consensus_precision,
        });
    }
    for (i, (first, first_ids)) in sets.iter().enumerate() {
        for (second, second_ids) in &sets[i + 1..] {
            rows.push(OverlapRow {
                set: format!("{}&{}", first, second),
                tools: 2,
                chimeras: first_ids.intersection(second_ids).count(),
                consensus_precision: None,
            });
        }
    }
    if let Some(shared) = consensus {
        rows.push(OverlapRow {
            set: sets
                .iter()
                .map(|(origin, _)| origin.as_str())
                .collect::<Vec<_>>()
                .join("&"),
            tools: sets.len(),
            chimeras: shared,
            consensus_precision: None,
        });
    }
    rows
}
