//! Sequence assembly: turn per-side exon ranges into one fused sequence per
//! read, and filter the candidate table to the reads that made it.

use crate::breakpoint::Breakpoints;
use crate::error::{Error, Result};
use crate::extract::SequenceExtractor;
use crate::fasta::write_record;
use crate::integrate::FusionCall;
use crate::output::{write_atomic, write_bed, TableRow};
use crate::sources::Origin;
use crate::types::{HashMap, HashMapExt, HashSet, HashSetExt, Role};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChromosomalStatus {
    Intrachromosomal,
    Interchromosomal,
}

impl ChromosomalStatus {
    /// Intrachromosomal only when both partners sit on the same known chromosome.
    pub fn of(call: &FusionCall) -> Self {
        match (&call.chromosome_a, &call.chromosome_b) {
            (Some(a), Some(b)) if a == b => ChromosomalStatus::Intrachromosomal,
            _ => ChromosomalStatus::Interchromosomal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalCandidate {
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
    #[serde(rename = "Chromosomal_Status")]
    pub status: ChromosomalStatus,
}

impl TableRow for FinalCandidate {
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
        "Chromosomal_Status",
    ];
}

impl From<&FusionCall> for FinalCandidate {
    fn from(call: &FusionCall) -> Self {
        Self {
            read_id: call.read_id.clone(),
            chimera_id: call.chimera_id.clone(),
            origin: call.origin,
            gene_a: call.gene_a.clone(),
            gene_b: call.gene_b.clone(),
            chromosome_a: call.chromosome_a.clone(),
            strand_a: call.strand_a,
            chromosome_b: call.chromosome_b.clone(),
            strand_b: call.strand_b,
            status: ChromosomalStatus::of(call),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct AssemblyStats {
    pub segments_a: usize,
    pub segments_b: usize,
    /// Reads with exon ranges on only one side.
    pub one_sided_reads: usize,
    pub reconstructed: usize,
    pub filtered_candidates: usize,
    pub unique_candidates: usize,
    pub intrachromosomal: usize,
    pub interchromosomal: usize,
    pub per_origin: Vec<(Origin, usize)>,
    /// Reconstructed sequences per unique candidate, in percent.
    pub reconstruction_rate: f64,
}

/// Where assembly writes its outputs.
#[derive(Debug, Clone)]
pub struct AssemblyPaths {
    pub bed_a: PathBuf,
    pub bed_b: PathBuf,
    pub fasta: PathBuf,
    /// Per-side FASTA intermediates.
    pub work_dir: PathBuf,
}

#[derive(Debug, Default)]
pub struct Assembly {
    pub candidates: Vec<FinalCandidate>,
    pub fasta: PathBuf,
    pub stats: AssemblyStats,
}

/// Drop a trailing `(+)`, `(-)` or `(.)` strand marker.
pub fn strip_strand_marker(header: &str) -> &str {
    for marker in ["(+)", "(-)", "(.)"] {
        if let Some(stripped) = header.strip_suffix(marker) {
            return stripped;
        }
    }
    header
}

/// Concatenate the sequence lines of records sharing a header.
///
/// Headers come out in first-encounter order, one sequence line each. Lines
/// before the first header and blank lines are ignored. Applying it to its
/// own output changes nothing.
pub fn merge_by_header<R: BufRead, W: Write>(
    input: R,
    output: &mut W,
    strip_markers: bool,
) -> std::io::Result<usize> {
    let mut order: Vec<(String, Vec<u8>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut current: Option<usize> = None;

    for line in input.lines() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix('>') {
            let header = if strip_markers {
                strip_strand_marker(header)
            } else {
                header
            };
            let slot = *index.entry(header.to_string()).or_insert_with(|| {
                order.push((header.to_string(), Vec::new()));
                order.len() - 1
            });
            current = Some(slot);
        } else if let Some(slot) = current {
            order[slot].1.extend_from_slice(line.as_bytes());
        }
    }

    for (header, seq) in &order {
        write_record(output, header, seq, 0)?;
    }
    Ok(order.len())
}

/// File wrapper around [`merge_by_header`].
pub fn merge_fasta_file(input: &Path, output: &Path, strip_markers: bool) -> Result<usize> {
    let reader = BufReader::new(File::open(input).map_err(|e| Error::io(e, input))?);
    let mut merged = 0usize;
    write_atomic(output, |w| {
        merged = merge_by_header(reader, w, strip_markers).map_err(|e| Error::io(e, input))?;
        Ok(())
    })?;
    Ok(merged)
}

pub fn concat_files(inputs: &[&Path], output: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(output).map_err(|e| Error::io(e, output))?);
    for input in inputs {
        let mut file = File::open(input).map_err(|e| Error::io(e, *input))?;
        std::io::copy(&mut file, &mut writer).map_err(|e| Error::io(e, output))?;
    }
    writer.flush().map_err(|e| Error::io(e, output))?;
    Ok(())
}

/// Rewrite headers as `read_id chimera_id`, keeping order and sequences.
pub fn rename_sequences(
    input: &Path,
    output: &Path,
    chimera_ids: &HashMap<&str, &str>,
) -> Result<usize> {
    let reader = BufReader::new(File::open(input).map_err(|e| Error::io(e, input))?);
    let mut renamed = 0usize;
    write_atomic(output, |w| {
        for line in reader.lines() {
            let line = line.map_err(|e| Error::io(e, input))?;
            if let Some(read_id) = line.strip_prefix('>') {
                renamed += 1;
                if let Some(chimera) = chimera_ids.get(read_id) {
                    writeln!(w, ">{} {}", read_id, chimera).map_err(|e| Error::io(e, output))?;
                    continue;
                }
            }
            writeln!(w, "{}", line).map_err(|e| Error::io(e, output))?;
        }
        Ok(())
    })?;
    Ok(renamed)
}

/// Keep calls whose read reached the exon ranges, annotate chromosomal status.
///
/// The returned table keeps every surviving row; statistics count unique
/// `(read_id, chimera_id)` pairs.
pub fn finalize_candidates(
    calls: &[FusionCall],
    passing: &HashSet<&str>,
    stats: &mut AssemblyStats,
) -> Vec<FinalCandidate> {
    let candidates: Vec<FinalCandidate> = calls
        .iter()
        .filter(|c| passing.contains(c.read_id.as_str()))
        .map(FinalCandidate::from)
        .collect();
    stats.filtered_candidates = candidates.len();

    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut per_origin: Vec<(Origin, usize)> = Origin::ALL.iter().map(|o| (*o, 0)).collect();
    for c in &candidates {
        if !seen.insert((c.read_id.as_str(), c.chimera_id.as_str())) {
            continue;
        }
        stats.unique_candidates += 1;
        match c.status {
            ChromosomalStatus::Intrachromosomal => stats.intrachromosomal += 1,
            ChromosomalStatus::Interchromosomal => stats.interchromosomal += 1,
        }
        if let Some((_, n)) = per_origin.iter_mut().find(|(o, _)| *o == c.origin) {
            *n += 1;
        }
    }
    stats.per_origin = per_origin;

    candidates
}

/// Extract, merge, fuse and rename the per-read sequences, then build the
/// final candidate table.
pub fn assemble(
    breakpoints: &Breakpoints,
    calls: &[FusionCall],
    extractor: &dyn SequenceExtractor,
    paths: &AssemblyPaths,
) -> Result<Assembly> {
    let work_dir = paths.work_dir.as_path();
    let mut stats = AssemblyStats {
        segments_a: breakpoints.ranges_a.len(),
        segments_b: breakpoints.ranges_b.len(),
        ..Default::default()
    };

    let mut merged = Vec::with_capacity(2);
    let sides = [
        (Role::A, breakpoints.bed_a(), paths.bed_a.as_path()),
        (Role::B, breakpoints.bed_b(), paths.bed_b.as_path()),
    ];
    for (role, bed_rows, bed) in sides {
        let raw = work_dir.join(format!("exon_sequences_{}.fa", role));
        let side = work_dir.join(format!("merged_{}.fa", role));

        write_bed(bed, &bed_rows)?;
        if bed_rows.is_empty() {
            tracing::warn!(role = %role, "no exon ranges, side contributes no sequence");
            File::create(&raw).map_err(|e| Error::io(e, &raw))?;
        } else {
            extractor.extract(bed, &raw)?;
        }
        let n = merge_fasta_file(&raw, &side, true)?;
        tracing::debug!(role = %role, sequences = n, "merged per-side sequences");
        merged.push(side);
    }

    let combined = work_dir.join("combined_A_B.fa");
    let fused = work_dir.join("fused.fa");
    concat_files(&[merged[0].as_path(), merged[1].as_path()], &combined)?;
    merge_fasta_file(&combined, &fused, false)?;

    let chimera_ids: HashMap<&str, &str> = calls
        .iter()
        .map(|c| (c.read_id.as_str(), c.chimera_id.as_str()))
        .collect();
    stats.reconstructed = rename_sequences(&fused, &paths.fasta, &chimera_ids)?;

    let a_reads: HashSet<&str> = breakpoints.ranges_a.iter().map(|r| r.read_id.as_str()).collect();
    let b_reads: HashSet<&str> = breakpoints.ranges_b.iter().map(|r| r.read_id.as_str()).collect();
    stats.one_sided_reads = a_reads.symmetric_difference(&b_reads).count();
    if stats.one_sided_reads > 0 {
        tracing::warn!(
            reads = stats.one_sided_reads,
            "reads reconstructed from one side only"
        );
    }

    let passing: HashSet<&str> = a_reads.union(&b_reads).copied().collect();
    let candidates = finalize_candidates(calls, &passing, &mut stats);
    stats.reconstruction_rate = if stats.unique_candidates > 0 {
        stats.reconstructed as f64 / stats.unique_candidates as f64 * 100.0
    } else {
        0.0
    };

    tracing::info!(
        reconstructed = stats.reconstructed,
        candidates = stats.unique_candidates,
        intrachromosomal = stats.intrachromosomal,
        interchromosomal = stats.interchromosomal,
        "sequence assembly complete"
    );

    Ok(Assembly {
        candidates,
        fasta: paths.fasta.clone(),
        stats,
    })
}
