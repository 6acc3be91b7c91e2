//! Exon sequence extraction backends.
//!
//! Both produce one FASTA record per BED line, named `read_id(strand)` and
//! reverse-complemented on the minus strand, which is what
//! `bedtools getfasta -s -nameOnly` writes.

use crate::error::{Error, Result};
use crate::external::run_tool;
use crate::fasta::{write_record, FastaDb};
use serde::Deserialize;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub trait SequenceExtractor {
    /// Extract every interval of a BED6 file into a FASTA file.
    fn extract(&self, bed: &Path, out: &Path) -> Result<()>;
}

/// In-process extraction from a genome loaded into memory.
pub struct GenomeExtractor<'a> {
    genome: &'a FastaDb,
}

impl<'a> GenomeExtractor<'a> {
    pub fn new(genome: &'a FastaDb) -> Self {
        Self { genome }
    }
}

/// A BED6 line as read back for extraction.
#[derive(Debug, Deserialize)]
struct BedInterval {
    chromosome: String,
    start: u64,
    end: u64,
    name: String,
    _score: String,
    strand: char,
}

impl SequenceExtractor for GenomeExtractor<'_> {
    fn extract(&self, bed: &Path, out: &Path) -> Result<()> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_path(bed)
            .map_err(|e| Error::table(e, bed))?;
        let mut writer = BufWriter::new(File::create(out).map_err(|e| Error::io(e, out))?);

        let mut written = 0usize;
        let mut outside = 0usize;
        let mut malformed = 0usize;
        for (line, result) in reader.deserialize::<BedInterval>().enumerate() {
            let interval = match result {
                Ok(interval) => interval,
                Err(e) if e.is_io_error() => return Err(Error::table(e, bed)),
                Err(e) => {
                    malformed += 1;
                    tracing::warn!(bed = %bed.display(), line = line + 1, "skipping malformed BED row: {}", e);
                    continue;
                }
            };

            let BedInterval {
                chromosome,
                start,
                end,
                name,
                strand,
                ..
            } = interval;
            match self.genome.extract(&chromosome, start, end, strand) {
                Some(seq) => {
                    let header = format!("{}({})", name, strand);
                    write_record(&mut writer, &header, &seq, 0).map_err(|e| Error::io(e, out))?;
                    written += 1;
                }
                None => {
                    outside += 1;
                    tracing::warn!(
                        chromosome = %chromosome,
                        start,
                        end,
                        "interval outside the genome, skipped"
                    );
                }
            }
        }
        writer.flush().map_err(|e| Error::io(e, out))?;

        tracing::debug!(written, outside, malformed, bed = %bed.display(), "extracted exon sequences");
        Ok(())
    }
}

/// `bedtools getfasta -s -nameOnly`.
pub struct BedtoolsExtractor {
    pub program: String,
    pub genome: PathBuf,
}

impl SequenceExtractor for BedtoolsExtractor {
    fn extract(&self, bed: &Path, out: &Path) -> Result<()> {
        run_tool(
            &self.program,
            [
                OsStr::new("getfasta"),
                OsStr::new("-s"),
                OsStr::new("-fi"),
                self.genome.as_os_str(),
                OsStr::new("-bed"),
                bed.as_os_str(),
                OsStr::new("-fo"),
                out.as_os_str(),
                OsStr::new("-nameOnly"),
            ],
        )?;
        Ok(())
    }
}
