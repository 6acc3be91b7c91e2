//! Optional alignment stage: build a transcript BLAST database and align the
//! candidate reads against it.

use crate::error::Result;
use crate::external::run_tool;
use crate::fasta::{subset_reads, write_blast_reference};
use crate::types::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct BlastConfig {
    pub blastn: String,
    pub makeblastdb: String,
    pub threads: usize,
}

impl Default for BlastConfig {
    fn default() -> Self {
        Self {
            blastn: "blastn".to_string(),
            makeblastdb: "makeblastdb".to_string(),
            threads: 1,
        }
    }
}

/// Subset reads, build the reference database, run `blastn -outfmt 6`.
///
/// Returns the path of the hit table inside `work_dir`.
pub fn run_blast(
    config: &BlastConfig,
    reads: &Path,
    read_ids: &HashSet<String>,
    transcriptome: &Path,
    work_dir: &Path,
) -> Result<PathBuf> {
    let query = work_dir.join("chimeric_reads.fa");
    let reference = work_dir.join("transcript_reference.fa");
    let db = work_dir.join("transcript_db");
    let hits = work_dir.join("blast_hits.tsv");

    let written = subset_reads(reads, read_ids, &query)?;
    if written < read_ids.len() {
        tracing::warn!(
            missing = read_ids.len() - written,
            "candidate reads not found in the read FASTA"
        );
    }

    write_blast_reference(transcriptome, &reference)?;

    run_tool(
        &config.makeblastdb,
        [
            OsStr::new("-in"),
            reference.as_os_str(),
            OsStr::new("-parse_seqids"),
            OsStr::new("-blastdb_version"),
            OsStr::new("5"),
            OsStr::new("-title"),
            OsStr::new("transcript_db"),
            OsStr::new("-dbtype"),
            OsStr::new("nucl"),
            OsStr::new("-out"),
            db.as_os_str(),
        ],
    )?;

    let threads = config.threads.max(1).to_string();
    run_tool(
        &config.blastn,
        [
            OsStr::new("-query"),
            query.as_os_str(),
            OsStr::new("-db"),
            db.as_os_str(),
            OsStr::new("-outfmt"),
            OsStr::new("6"),
            OsStr::new("-num_threads"),
            OsStr::new(&threads),
            OsStr::new("-out"),
            hits.as_os_str(),
        ],
    )?;

    tracing::info!(hits = %hits.display(), "alignment complete");
    Ok(hits)
}
