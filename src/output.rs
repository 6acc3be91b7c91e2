//! Atomic writers for the pipeline's tables.
//!
//! Every file is written to a temporary sibling and renamed into place, so a
//! failed run never leaves a truncated table under a final name.

use crate::error::{Error, Result};
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// A BED6 line: `chrom start end name score strand`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BedRow {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub name: String,
    pub score: &'static str,
    pub strand: char,
}

/// Write through a temp file in the destination directory, then persist.
pub fn write_atomic<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> Result<()>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(e, dir))?;
    {
        let mut writer = BufWriter::new(&mut tmp);
        fill(&mut writer)?;
        writer.flush().map_err(|e| Error::io(e, path))?;
    }
    tmp.persist(path).map_err(|e| Error::io(e.error, path))?;
    Ok(())
}

/// A row of a headed output table.
///
/// `COLUMNS` must match the serialized field names; it is only used to write
/// the header of an empty table.
pub trait TableRow: Serialize {
    const COLUMNS: &'static [&'static str];
}

/// Serialize rows as a tab-separated table with a header line, also when
/// there are no rows.
pub fn write_table<T: TableRow>(path: &Path, rows: &[T]) -> Result<()> {
    write_atomic(path, |w| {
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(w);
        if rows.is_empty() {
            writer
                .write_record(T::COLUMNS)
                .map_err(|e| Error::table(e, path))?;
        }
        for row in rows {
            writer.serialize(row).map_err(|e| Error::table(e, path))?;
        }
        writer.flush().map_err(|e| Error::io(e, path))?;
        Ok(())
    })
}

/// Write BED6 rows without a header.
pub fn write_bed(path: &Path, rows: &[BedRow]) -> Result<()> {
    write_atomic(path, |w| {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(w);
        for row in rows {
            writer.serialize(row).map_err(|e| Error::table(e, path))?;
        }
        writer.flush().map_err(|e| Error::io(e, path))?;
        Ok(())
    })
}

/// One value per line.
pub fn write_lines<I, S>(path: &Path, lines: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    write_atomic(path, |w| {
        for line in lines {
            writeln!(w, "{}", line.as_ref()).map_err(|e| Error::io(e, path))?;
        }
        Ok(())
    })
}
