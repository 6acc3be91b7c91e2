//! Breakpoint location in transcript coordinates.
//!
//! Each selected transcript is laid out exon by exon. For the upstream partner
//! (`A`) the breakpoint is the exon whose end in transcript coordinates lies
//! closest to where the alignment stops; for the downstream partner (`B`) it
//! is the exon whose start lies closest to where the alignment begins.

use crate::annotation::ExonRecord;
use crate::error::{Error, Result};
use crate::output::{BedRow, TableRow};
use crate::select::SelectedTranscript;
use crate::types::{HashMap, HashMapExt, HashSet, HashSetExt, Role};
use serde::Serialize;

/// A selected transcript joined with one of its exons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptExonRow {
    #[serde(rename = "Read_ID")]
    pub read_id: String,
    #[serde(rename = "Chimera_ID")]
    pub chimera_id: String,
    #[serde(rename = "Actual_order")]
    pub order: Role,
    pub transcript_id: String,
    pub gene: String,
    pub subject_start: u64,
    pub subject_end: u64,
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub exon_id: String,
    pub strand: char,
    pub exon_number: u32,
    pub exon_length: u64,
    pub cumulative_exon_length: u64,
    pub exon_start_in_transcript: Option<u64>,
    pub exon_end_in_transcript: Option<u64>,
    pub abs_exon_distance: u64,
}

impl TableRow for TranscriptExonRow {
    const COLUMNS: &'static [&'static str] = &[
        "Read_ID",
        "Chimera_ID",
        "Actual_order",
        "transcript_id",
        "gene",
        "subject_start",
        "subject_end",
        "chromosome",
        "start",
        "end",
        "exon_id",
        "strand",
        "exon_number",
        "exon_length",
        "cumulative_exon_length",
        "exon_start_in_transcript",
        "exon_end_in_transcript",
        "abs_exon_distance",
    ];
}

impl TranscriptExonRow {
    pub fn to_bed(&self) -> BedRow {
        BedRow {
            chromosome: self.chromosome.clone(),
            start: self.start,
            end: self.end,
            name: self.read_id.clone(),
            score: ".",
            strand: self.strand,
        }
    }
}

/// The exon nearest the alignment edge for one side of a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointExon {
    pub read_id: String,
    pub order: Role,
    pub transcript_id: String,
    pub exon_number: u32,
    pub abs_exon_distance: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BreakpointStats {
    pub joined_rows: usize,
    pub unparsable_exon_numbers: usize,
    /// Selected transcripts with no exon in the annotation.
    pub transcripts_without_exons: usize,
    pub reads: usize,
    pub segments_a: usize,
    pub segments_b: usize,
}

#[derive(Debug, Default)]
pub struct Breakpoints {
    pub ranges_a: Vec<TranscriptExonRow>,
    pub ranges_b: Vec<TranscriptExonRow>,
    pub breakpoints: Vec<BreakpointExon>,
    pub debug: Vec<TranscriptExonRow>,
    pub stats: BreakpointStats,
}

impl Breakpoints {
    pub fn bed_a(&self) -> Vec<BedRow> {
        self.ranges_a.iter().map(TranscriptExonRow::to_bed).collect()
    }

    pub fn bed_b(&self) -> Vec<BedRow> {
        self.ranges_b.iter().map(TranscriptExonRow::to_bed).collect()
    }

    /// Role A ranges followed by role B ranges.
    pub fn summary(&self) -> Vec<TranscriptExonRow> {
        self.ranges_a
            .iter()
            .chain(self.ranges_b.iter())
            .cloned()
            .collect()
    }

    /// Reads with at least one exon range, in first-seen order.
    pub fn read_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.ranges_a
            .iter()
            .chain(self.ranges_b.iter())
            .map(|r| r.read_id.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

/// Leading digits of an `exon_number` attribute value.
pub fn parse_exon_number(raw: &str) -> Option<u32> {
    let digits: String = raw
        .trim()
        .trim_matches('"')
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Lay out one selected transcript's exons and measure each against the
/// alignment edge.
fn transcript_rows(
    selected: &SelectedTranscript,
    exons: &[(&ExonRecord, u32)],
) -> Vec<TranscriptExonRow> {
    let mut rows = Vec::with_capacity(exons.len());
    let mut cumulative = 0u64;

    for &(exon, exon_number) in exons {
        let exon_length = exon.end.abs_diff(exon.start);
        let previous = cumulative;
        cumulative += exon_length;

        let (exon_start, exon_end, distance) = match selected.order {
            Role::A => (None, Some(cumulative), cumulative.abs_diff(selected.subject_end)),
            Role::B => {
                let start = previous + 1;
                (Some(start), None, start.abs_diff(selected.subject_start))
            }
        };

        rows.push(TranscriptExonRow {
            read_id: selected.read_id.clone(),
            chimera_id: selected.chimera_id.clone(),
            order: selected.order,
            transcript_id: selected.transcript_id.clone(),
            gene: exon.gene.clone(),
            subject_start: selected.subject_start,
            subject_end: selected.subject_end,
            chromosome: exon.chromosome.clone(),
            start: exon.start,
            end: exon.end,
            exon_id: exon.exon_id.clone(),
            strand: exon.strand,
            exon_number,
            exon_length,
            cumulative_exon_length: cumulative,
            exon_start_in_transcript: exon_start,
            exon_end_in_transcript: exon_end,
            abs_exon_distance: distance,
        });
    }

    rows
}

/// Locate breakpoint exons and build the per-side exon ranges.
///
/// Fails when no selected transcript joins to any exon.
pub fn locate_breakpoints(
    selected: &[SelectedTranscript],
    exons: &[ExonRecord],
) -> Result<Breakpoints> {
    let mut by_transcript: HashMap<&str, Vec<&ExonRecord>> = HashMap::new();
    for exon in exons {
        by_transcript
            .entry(exon.transcript_id.as_str())
            .or_default()
            .push(exon);
    }

    let mut out = Breakpoints::default();

    for sel in selected {
        let Some(transcript_exons) = by_transcript.get(sel.transcript_id.as_str()) else {
            out.stats.transcripts_without_exons += 1;
            continue;
        };
        out.stats.joined_rows += transcript_exons.len();

        let mut ordered: Vec<(&ExonRecord, u32)> = Vec::with_capacity(transcript_exons.len());
        for &exon in transcript_exons {
            match exon.exon_number.as_deref().and_then(parse_exon_number) {
                Some(n) => ordered.push((exon, n)),
                None => out.stats.unparsable_exon_numbers += 1,
            }
        }
        ordered.sort_by_key(|&(_, n)| n);

        let rows = transcript_rows(sel, &ordered);
        if let Some(best) = rows
            .iter()
            .min_by_key(|r| (r.abs_exon_distance, r.exon_number))
        {
            out.breakpoints.push(BreakpointExon {
                read_id: best.read_id.clone(),
                order: best.order,
                transcript_id: best.transcript_id.clone(),
                exon_number: best.exon_number,
                abs_exon_distance: best.abs_exon_distance,
            });

            let cut = best.exon_number;
            match sel.order {
                Role::A => out
                    .ranges_a
                    .extend(rows.iter().filter(|r| r.exon_number <= cut).cloned()),
                Role::B => out
                    .ranges_b
                    .extend(rows.iter().filter(|r| r.exon_number >= cut).cloned()),
            }
        }
        out.debug.extend(rows);
    }

    if out.debug.is_empty() {
        return Err(Error::Empty {
            stage: "transcript-exon join",
            reason: format!(
                "none of {} selected transcripts matched an annotated exon",
                selected.len()
            ),
        });
    }
    if out.stats.unparsable_exon_numbers > 0 {
        tracing::warn!(
            count = out.stats.unparsable_exon_numbers,
            "dropped exons without a numeric exon_number"
        );
    }

    out.debug
        .sort_by(|a, b| (&a.transcript_id, a.exon_number).cmp(&(&b.transcript_id, b.exon_number)));
    out.ranges_a
        .sort_by(|a, b| (&a.read_id, a.exon_number).cmp(&(&b.read_id, b.exon_number)));
    out.ranges_b
        .sort_by(|a, b| (&a.read_id, a.exon_number).cmp(&(&b.read_id, b.exon_number)));

    out.stats.segments_a = out.ranges_a.len();
    out.stats.segments_b = out.ranges_b.len();
    out.stats.reads = out.read_ids().len();

    tracing::info!(
        joined_rows = out.stats.joined_rows,
        reads = out.stats.reads,
        segments_a = out.stats.segments_a,
        segments_b = out.stats.segments_b,
        "breakpoint location complete"
    );

    Ok(out)
}
