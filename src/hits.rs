use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// One row of BLAST tabular output (`-outfmt 6`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawHit {
    pub read_id: String,
    pub transcript_id: String,
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
}

/// Split `NAME-201` into gene `NAME` and transcript number `201`.
///
/// The gene is everything before the last hyphen when the suffix is a
/// transcript number; otherwise the whole id is the gene and there is no number.
pub fn split_transcript_gene(transcript_id: &str) -> (String, Option<String>) {
    match transcript_id.rsplit_once('-') {
        Some((gene, number))
            if !gene.is_empty()
                && !number.is_empty()
                && number.bytes().all(|b| b.is_ascii_digit()) =>
        {
            (gene.to_string(), Some(number.to_string()))
        }
        _ => (transcript_id.to_string(), None),
    }
}

/// Read a BLAST outfmt 6 table in file order. Rows that do not parse as the
/// twelve standard columns are skipped with a warning.
pub fn read_hits(path: &Path) -> Result<Vec<RawHit>> {
    if !path.is_file() {
        return Err(Error::MissingInput {
            what: "alignment hits",
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .from_path(path)
        .map_err(|e| Error::table(e, path))?;

    let mut hits = Vec::new();
    let mut skipped = 0usize;
    for result in reader.deserialize::<RawHit>() {
        match result {
            Ok(hit) => hits.push(hit),
            Err(e) if e.is_io_error() => return Err(Error::table(e, path)),
            Err(e) => {
                skipped += 1;
                tracing::warn!(path = %path.display(), "skipping malformed hit: {}", e);
            }
        }
    }

    tracing::info!(hits = hits.len(), skipped, "loaded alignment hits");
    Ok(hits)
}
