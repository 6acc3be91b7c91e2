use crate::error::{Error, Result};
use crate::types::{HashMap, HashMapExt, HashSet, HashSetExt};
use needletail::parse_fastx_file;
use std::io::Write;
use std::path::Path;

/// Bases per line when writing FASTA.
pub const LINE_WIDTH: usize = 60;

fn open_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Fasta {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// First whitespace-delimited token of a FASTA header.
pub fn header_id(header: &[u8]) -> String {
    let id = header
        .split(|b| b.is_ascii_whitespace())
        .next()
        .unwrap_or(header);
    String::from_utf8_lossy(id).into_owned()
}

/// In-memory genome keyed by sequence id.
#[derive(Debug, Default)]
pub struct FastaDb {
    seqs: HashMap<String, Vec<u8>>,
}

impl FastaDb {
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = parse_fastx_file(path).map_err(|e| open_error(path, e))?;
        let mut seqs: HashMap<String, Vec<u8>> = HashMap::new();

        while let Some(result) = reader.next() {
            let record = result.map_err(|e| open_error(path, e))?;
            let name = header_id(record.id());
            seqs.entry(name).or_insert_with(|| record.seq().to_vec());
        }

        tracing::debug!(sequences = seqs.len(), path = %path.display(), "loaded FASTA");
        Ok(Self { seqs })
    }

    pub fn from_sequences<I>(seqs: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        Self {
            seqs: seqs.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    /// Slice a BED interval (0-based start, exclusive end), reverse-complemented
    /// on the minus strand. `None` when the sequence is unknown or the interval
    /// falls outside it.
    pub fn extract(&self, seqname: &str, start: u64, end: u64, strand: char) -> Option<Vec<u8>> {
        let seq = self.seqs.get(seqname)?;
        let (s, e) = (usize::try_from(start).ok()?, usize::try_from(end).ok()?);
        if s > e || e > seq.len() {
            return None;
        }
        let slice = &seq[s..e];
        Some(if strand == '-' {
            reverse_complement(slice)
        } else {
            slice.to_vec()
        })
    }
}

/// Reverse complement, keeping case and leaving non-ACGTN bytes as they are.
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'T' => b'A',
            b'C' => b'G',
            b'G' => b'C',
            b'a' => b't',
            b't' => b'a',
            b'c' => b'g',
            b'g' => b'c',
            other => other,
        })
        .collect()
}

/// Write one record, wrapping the sequence at `width` bases (0 = no wrapping).
pub fn write_record<W: Write>(
    out: &mut W,
    header: &str,
    seq: &[u8],
    width: usize,
) -> std::io::Result<()> {
    writeln!(out, ">{}", header)?;
    if width == 0 || seq.is_empty() {
        out.write_all(seq)?;
        return writeln!(out);
    }
    for line in seq.chunks(width) {
        out.write_all(line)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Type and length of a transcript, from a GENCODE transcriptome header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptMeta {
    pub transcript_type: String,
    pub length: Option<u64>,
}

/// Transcript name from a GENCODE header, falling back to the plain id.
///
/// GENCODE headers look like
/// `ENST..|ENSG..|OTTHUMG..|OTTHUMT..|NAME-201|GENE|LEN|biotype|`.
pub fn transcript_name(header: &str) -> &str {
    let first = header.split_whitespace().next().unwrap_or(header);
    match first.split('|').nth(4) {
        Some(name) if !name.is_empty() => name,
        _ => first,
    }
}

/// Build `transcript_name -> TranscriptMeta` from a transcriptome FASTA.
///
/// A non-numeric length field falls back to the sequence length. The first
/// header carrying a name wins.
pub fn load_transcript_metadata(path: &Path) -> Result<HashMap<String, TranscriptMeta>> {
    let mut reader = parse_fastx_file(path).map_err(|e| open_error(path, e))?;
    let mut meta: HashMap<String, TranscriptMeta> = HashMap::new();

    while let Some(result) = reader.next() {
        let record = result.map_err(|e| open_error(path, e))?;
        let header = String::from_utf8_lossy(record.id()).into_owned();
        let fields: Vec<&str> = header.split('|').collect();

        let name = transcript_name(&header).to_string();
        let length = fields
            .get(6)
            .and_then(|f| f.trim().parse::<u64>().ok())
            .or(Some(record.num_bases() as u64));
        let transcript_type = fields
            .get(7)
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .unwrap_or("Unknown")
            .to_string();

        meta.entry(name).or_insert(TranscriptMeta {
            transcript_type,
            length,
        });
    }

    tracing::info!(transcripts = meta.len(), "loaded transcript metadata");
    Ok(meta)
}

/// Write the BLAST reference: headers replaced by transcript names, names that
/// differ only in case dropped after the first, 60 bases per line.
pub fn write_blast_reference(transcriptome: &Path, out: &Path) -> Result<usize> {
    let mut reader =
        parse_fastx_file(transcriptome).map_err(|e| open_error(transcriptome, e))?;
    let file = std::fs::File::create(out).map_err(|e| Error::io(e, out))?;
    let mut writer = std::io::BufWriter::new(file);

    let mut seen: HashSet<String> = HashSet::new();
    let mut written = 0usize;
    let mut duplicates = 0usize;

    while let Some(result) = reader.next() {
        let record = result.map_err(|e| open_error(transcriptome, e))?;
        let header = String::from_utf8_lossy(record.id()).into_owned();
        let name = transcript_name(&header);
        if !seen.insert(name.to_ascii_lowercase()) {
            duplicates += 1;
            continue;
        }
        write_record(&mut writer, name, &record.seq(), LINE_WIDTH)
            .map_err(|e| Error::io(e, out))?;
        written += 1;
    }
    writer.flush().map_err(|e| Error::io(e, out))?;

    tracing::info!(written, duplicates, "wrote BLAST reference");
    Ok(written)
}

/// Copy reads whose id is in `ids` to `out`; only the first record of each id
/// is kept.
pub fn subset_reads(reads: &Path, ids: &HashSet<String>, out: &Path) -> Result<usize> {
    let mut reader = parse_fastx_file(reads).map_err(|e| open_error(reads, e))?;
    let file = std::fs::File::create(out).map_err(|e| Error::io(e, out))?;
    let mut writer = std::io::BufWriter::new(file);

    let mut emitted: HashSet<String> = HashSet::new();
    while let Some(result) = reader.next() {
        let record = result.map_err(|e| open_error(reads, e))?;
        let id = header_id(record.id());
        if !ids.contains(&id) || emitted.contains(&id) {
            continue;
        }
        write_record(&mut writer, &id, &record.seq(), 0).map_err(|e| Error::io(e, out))?;
        emitted.insert(id);
    }
    writer.flush().map_err(|e| Error::io(e, out))?;

    tracing::info!(requested = ids.len(), written = emitted.len(), "subset reads");
    Ok(emitted.len())
}
