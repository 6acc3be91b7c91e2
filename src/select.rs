//! Transcript selection: pick, per read and per fusion partner, the
//! best-supported reference transcript, then label the two picks by their
//! position along the read.

use crate::error::{Error, Result};
use crate::fasta::TranscriptMeta;
use crate::hits::{split_transcript_gene, RawHit};
use crate::integrate::FusionCall;
use crate::output::TableRow;
use crate::types::{HashMap, HashSet, HashSetExt, Role};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Transcript biotypes never considered.
    pub excluded_types: Vec<String>,
    /// Annotation tags that mark a transcript as preferred.
    pub primary_tags: Vec<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            excluded_types: vec!["retained_intron".to_string()],
            primary_tags: vec!["GENCODE_Primary".to_string()],
        }
    }
}

/// `Primary` sorts before `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Preference {
    #[serde(rename = "A")]
    Primary,
    #[serde(rename = "B")]
    Other,
}

/// A hit joined with its read's call and its transcript's annotation.
#[derive(Debug, Clone)]
pub struct AlignmentHit {
    pub raw: RawHit,
    pub gene: String,
    pub chimera_id: String,
    pub gene_a: String,
    pub gene_b: String,
    pub transcript_type: Option<String>,
    pub transcript_length: Option<u64>,
    pub annotation_tag: Option<String>,
    pub role: Role,
    pub preference: Preference,
}

/// The chosen transcript for one side of a read's fusion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedTranscript {
    #[serde(rename = "Read_ID")]
    pub read_id: String,
    #[serde(rename = "Chimera_ID")]
    pub chimera_id: String,
    #[serde(rename = "GeneA")]
    pub gene_a: String,
    #[serde(rename = "GeneB")]
    pub gene_b: String,
    pub transcript_id: String,
    pub gene: String,
    pub percent_identity: f64,
    pub alignment_length: u64,
    pub mismatches: u64,
    pub gap_opens: u64,
    pub query_start: u64,
    pub query_end: u64,
    pub subject_start: u64,
    pub subject_end: u64,
    pub e_value: f64,
    pub bit_score: f64,
    pub transcript_type: Option<String>,
    pub transcript_length: Option<u64>,
    pub annotation_tag: Option<String>,
    #[serde(rename = "Read_ID_role")]
    pub gene_role: Role,
    #[serde(rename = "Prefer")]
    pub preference: Preference,
    /// Position along the read: the earlier alignment is `A`.
    #[serde(rename = "Actual_order")]
    pub order: Role,
}

impl TableRow for SelectedTranscript {
    const COLUMNS: &'static [&'static str] = &[
        "Read_ID",
        "Chimera_ID",
        "GeneA",
        "GeneB",
        "transcript_id",
        "gene",
        "percent_identity",
        "alignment_length",
        "mismatches",
        "gap_opens",
        "query_start",
        "query_end",
        "subject_start",
        "subject_end",
        "e_value",
        "bit_score",
        "transcript_type",
        "transcript_length",
        "annotation_tag",
        "Read_ID_role",
        "Prefer",
        "Actual_order",
    ];
}

impl SelectedTranscript {
    fn from_hit(hit: AlignmentHit, order: Role) -> Self {
        let raw = hit.raw;
        Self {
            read_id: raw.read_id,
            chimera_id: hit.chimera_id,
            gene_a: hit.gene_a,
            gene_b: hit.gene_b,
            transcript_id: raw.transcript_id,
            gene: hit.gene,
            percent_identity: raw.percent_identity,
            alignment_length: raw.alignment_length,
            mismatches: raw.mismatches,
            gap_opens: raw.gap_opens,
            query_start: raw.query_start,
            query_end: raw.query_end,
            subject_start: raw.subject_start,
            subject_end: raw.subject_end,
            e_value: raw.e_value,
            bit_score: raw.bit_score,
            transcript_type: hit.transcript_type,
            transcript_length: hit.transcript_length,
            annotation_tag: hit.annotation_tag,
            gene_role: hit.role,
            preference: hit.preference,
            order,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SelectionStats {
    pub hits: usize,
    pub without_call: usize,
    pub excluded_type: usize,
    pub off_target: usize,
    pub candidates: usize,
    /// Reads with hits on only one partner gene.
    pub single_role_reads: usize,
    pub selected_reads: usize,
}

#[derive(Debug, Default)]
pub struct Selection {
    pub selected: Vec<SelectedTranscript>,
    pub stats: SelectionStats,
}

/// Join hits to calls and annotation, dropping hits that cannot support a
/// partner of their read's fusion.
pub fn annotate_hits(
    hits: Vec<RawHit>,
    calls: &[FusionCall],
    meta: &HashMap<String, TranscriptMeta>,
    tags: &HashMap<String, Vec<String>>,
    config: &SelectionConfig,
    stats: &mut SelectionStats,
) -> Vec<AlignmentHit> {
    let by_read: HashMap<&str, &FusionCall> =
        calls.iter().map(|c| (c.read_id.as_str(), c)).collect();

    stats.hits += hits.len();
    let mut out = Vec::with_capacity(hits.len());

    for raw in hits {
        let Some(call) = by_read.get(raw.read_id.as_str()) else {
            stats.without_call += 1;
            continue;
        };

        let (gene, _) = split_transcript_gene(&raw.transcript_id);
        let info = meta.get(&raw.transcript_id);
        let transcript_type = info.map(|m| m.transcript_type.clone());
        if let Some(ty) = &transcript_type {
            if config.excluded_types.iter().any(|x| x == ty) {
                stats.excluded_type += 1;
                continue;
            }
        }

        let role = if gene == call.gene_a {
            Role::A
        } else if gene == call.gene_b {
            Role::B
        } else {
            stats.off_target += 1;
            continue;
        };

        let transcript_tags = tags.get(&raw.transcript_id);
        let preference = match transcript_tags {
            Some(t) if t.iter().any(|tag| config.primary_tags.contains(tag)) => {
                Preference::Primary
            }
            _ => Preference::Other,
        };

        out.push(AlignmentHit {
            gene,
            chimera_id: call.chimera_id.clone(),
            gene_a: call.gene_a.clone(),
            gene_b: call.gene_b.clone(),
            transcript_type,
            transcript_length: info.and_then(|m| m.length),
            annotation_tag: transcript_tags.map(|t| t.join(",")),
            role,
            preference,
            raw,
        });
    }

    stats.candidates = out.len();
    out
}

/// Ranking within a read: higher bit score, then primary tag, then longer
/// transcript, unknown lengths last.
fn rank(a: &AlignmentHit, b: &AlignmentHit) -> Ordering {
    a.raw
        .read_id
        .cmp(&b.raw.read_id)
        .then_with(|| b.raw.bit_score.total_cmp(&a.raw.bit_score))
        .then_with(|| a.preference.cmp(&b.preference))
        .then_with(|| match (a.transcript_length, b.transcript_length) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Choose one transcript per (read, partner) and assign positional order.
///
/// All sorts are stable, so equal-ranked hits resolve by input order.
pub fn select_from_hits(
    mut candidates: Vec<AlignmentHit>,
    stats: &mut SelectionStats,
) -> Result<Vec<SelectedTranscript>> {
    candidates.sort_by(rank);

    let mut taken: HashSet<(String, Role)> = HashSet::new();
    let best: Vec<AlignmentHit> = candidates
        .into_iter()
        .filter(|h| taken.insert((h.raw.read_id.clone(), h.role)))
        .collect();

    // best is grouped by read id; keep reads covering both partners.
    let mut paired: Vec<AlignmentHit> = Vec::with_capacity(best.len());
    for group in best.chunk_by(|a, b| a.raw.read_id == b.raw.read_id) {
        let has_a = group.iter().any(|h| h.role == Role::A);
        let has_b = group.iter().any(|h| h.role == Role::B);
        if has_a && has_b {
            paired.extend(group.iter().cloned());
        } else {
            stats.single_role_reads += 1;
        }
    }

    paired.sort_by(|a, b| {
        b.raw
            .read_id
            .cmp(&a.raw.read_id)
            .then_with(|| a.raw.query_start.cmp(&b.raw.query_start))
            .then_with(|| a.role.cmp(&b.role))
    });

    let mut selected = Vec::with_capacity(paired.len());
    let mut rest = paired.as_slice();
    while let Some(first) = rest.first() {
        let len = rest
            .iter()
            .take_while(|h| h.raw.read_id == first.raw.read_id)
            .count();
        if len != 2 {
            return Err(Error::RoleConflict {
                read_id: first.raw.read_id.clone(),
                rows: len,
            });
        }
        for (hit, order) in rest[..len].iter().zip([Role::A, Role::B]) {
            selected.push(SelectedTranscript::from_hit(hit.clone(), order));
        }
        rest = &rest[len..];
    }

    stats.selected_reads = selected.len() / 2;
    Ok(selected)
}

/// Full selection: annotate, rank, pick, order.
pub fn select_transcripts(
    hits: Vec<RawHit>,
    calls: &[FusionCall],
    meta: &HashMap<String, TranscriptMeta>,
    tags: &HashMap<String, Vec<String>>,
    config: &SelectionConfig,
) -> Result<Selection> {
    let mut stats = SelectionStats::default();
    let candidates = annotate_hits(hits, calls, meta, tags, config, &mut stats);
    let selected = select_from_hits(candidates, &mut stats)?;

    tracing::info!(
        hits = stats.hits,
        without_call = stats.without_call,
        excluded_type = stats.excluded_type,
        off_target = stats.off_target,
        single_role_reads = stats.single_role_reads,
        selected_reads = stats.selected_reads,
        "transcript selection complete"
    );
    if selected.is_empty() {
        tracing::warn!("no read has a selected transcript for both fusion partners");
    }

    Ok(Selection { selected, stats })
}
