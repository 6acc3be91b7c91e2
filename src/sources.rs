//! Per-tool adapters turning detector output tables into canonical
//! `{read_id, chimera_id}` records.
//!
//! Every detector writes its own table layout: LongGF a headed CSV, JaffaL a
//! headed TSV, Genion a headerless TSV with the read id in column 28 and a
//! `::`-joined gene pair in column 8. A [`SourceLayout`] captures that layout so the
//! integrator never hard-codes column positions.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The detector a call came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
pub enum Origin {
    #[serde(rename = "LongGF")]
    #[value(name = "longgf")]
    LongGf,
    #[serde(rename = "JaffaL")]
    #[value(name = "jaffal")]
    JaffaL,
    #[serde(rename = "Genion")]
    #[value(name = "genion")]
    Genion,
}

impl Origin {
    pub const ALL: [Origin; 3] = [Origin::LongGf, Origin::JaffaL, Origin::Genion];

    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::LongGf => "LongGF",
            Origin::JaffaL => "JaffaL",
            Origin::Genion => "Genion",
        }
    }

    /// Built-in layout for this detector's standard output.
    pub fn default_layout(&self) -> SourceLayout {
        match self {
            Origin::LongGf => SourceLayout {
                delimiter: b',',
                has_header: true,
                read_column: Column::Name("Read_ID".to_string()),
                chimera_column: Column::Name("Chimera_ID".to_string()),
                pair_delimiter: ":".to_string(),
                comment: None,
                fallback: Some((1, 2)),
            },
            Origin::JaffaL => SourceLayout {
                delimiter: b'\t',
                has_header: true,
                read_column: Column::Name("transcript".to_string()),
                chimera_column: Column::Name("fusion_genes".to_string()),
                pair_delimiter: ":".to_string(),
                comment: None,
                fallback: Some((0, 1)),
            },
            Origin::Genion => SourceLayout {
                delimiter: b'\t',
                has_header: false,
                read_column: Column::Index(27),
                chimera_column: Column::Index(7),
                pair_delimiter: "::".to_string(),
                comment: None,
                fallback: None,
            },
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field addressed either by 0-based position or by header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Index(usize),
    Name(String),
}

impl FromStr for Column {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.parse::<usize>() {
            Ok(idx) => Column::Index(idx),
            Err(_) => Column::Name(s.to_string()),
        })
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Index(i) => write!(f, "#{}", i),
            Column::Name(n) => f.write_str(n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    pub delimiter: u8,
    pub has_header: bool,
    pub read_column: Column,
    pub chimera_column: Column,
    /// Separator this tool puts between the two gene names.
    pub pair_delimiter: String,
    pub comment: Option<u8>,
    /// `(read, chimera)` positions used when a headed table lacks the named
    /// columns. Cleared by an explicit `read` or `chimera` override.
    pub fallback: Option<(usize, usize)>,
}

impl SourceLayout {
    /// Apply `key=value` overrides separated by `;`, e.g.
    /// `sep=tab;header=no;read=0;chimera=3;pair=--`.
    ///
    /// Recognised keys: `sep`, `header`, `read`, `chimera`, `pair`, `comment`.
    pub fn with_overrides(mut self, spec: &str) -> Result<Self> {
        let invalid = |reason: String| Error::Layout {
            spec: spec.to_string(),
            reason,
        };

        for item in spec.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = item
                .split_once('=')
                .ok_or_else(|| invalid(format!("'{}' is not key=value", item)))?;

            match key.trim() {
                "sep" | "delimiter" => self.delimiter = parse_byte(value).map_err(invalid)?,
                "header" => {
                    self.has_header = match value.to_ascii_lowercase().as_str() {
                        "yes" | "true" | "1" => true,
                        "no" | "false" | "0" => false,
                        other => return Err(invalid(format!("bad header flag '{}'", other))),
                    }
                }
                "read" => {
                    let Ok(column) = value.parse::<Column>();
                    self.read_column = column;
                    self.fallback = None;
                }
                "chimera" => {
                    let Ok(column) = value.parse::<Column>();
                    self.chimera_column = column;
                    self.fallback = None;
                }
                "pair" => {
                    if value.is_empty() {
                        return Err(invalid("empty pair delimiter".to_string()));
                    }
                    self.pair_delimiter = value.to_string();
                }
                "comment" => self.comment = Some(parse_byte(value).map_err(invalid)?),
                other => return Err(invalid(format!("unknown key '{}'", other))),
            }
        }

        Ok(self)
    }
}

fn parse_byte(value: &str) -> std::result::Result<u8, String> {
    match value {
        "tab" | "\\t" => Ok(b'\t'),
        "comma" => Ok(b','),
        "space" => Ok(b' '),
        "semicolon" => Ok(b';'),
        v if v.len() == 1 => Ok(v.as_bytes()[0]),
        v => Err(format!("'{}' is not a single-byte separator", v)),
    }
}

/// One detector's call set: the files it wrote and how to read them.
#[derive(Debug, Clone)]
pub struct CallSource {
    pub origin: Origin,
    pub paths: Vec<PathBuf>,
    pub layout: SourceLayout,
}

impl CallSource {
    pub fn new(origin: Origin, paths: Vec<PathBuf>) -> Self {
        Self {
            origin,
            paths,
            layout: origin.default_layout(),
        }
    }
}

/// A call as read from disk, before cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCall {
    pub read_id: String,
    pub chimera_id: Option<String>,
    pub origin: Origin,
}

/// Per-source read counts.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceCounts {
    pub rows: usize,
    pub malformed: usize,
}

/// Replace a tool-specific gene-pair separator with a single colon.
pub fn normalize_chimera_id(raw: &str, pair_delimiter: &str) -> String {
    let raw = raw.trim();
    if pair_delimiter == ":" {
        raw.to_string()
    } else {
        raw.replace(pair_delimiter, ":")
    }
}

/// Read every file of a source in order.
///
/// A missing or unreadable file is fatal. Individual rows without a read id or
/// with undecodable bytes are skipped and counted as malformed. Rows with an
/// empty chimera field are returned with `chimera_id: None` so the integrator
/// can account for them.
pub fn read_calls(source: &CallSource) -> Result<(Vec<RawCall>, SourceCounts)> {
    let mut calls = Vec::new();
    let mut counts = SourceCounts::default();

    for path in &source.paths {
        read_file(path, source, &mut calls, &mut counts)?;
    }

    tracing::info!(
        origin = %source.origin,
        files = source.paths.len(),
        rows = counts.rows,
        malformed = counts.malformed,
        "loaded detector calls"
    );

    Ok((calls, counts))
}

fn read_file(
    path: &Path,
    source: &CallSource,
    calls: &mut Vec<RawCall>,
    counts: &mut SourceCounts,
) -> Result<()> {
    if !path.is_file() {
        return Err(Error::MissingInput {
            what: "detector output",
            path: path.to_path_buf(),
        });
    }

    let layout = &source.layout;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(layout.delimiter)
        .has_headers(layout.has_header)
        .flexible(true)
        .comment(layout.comment)
        .from_path(path)
        .map_err(|e| Error::table(e, path))?;

    let (read_idx, chimera_idx) = if layout.has_header {
        let headers = reader.headers().map_err(|e| Error::table(e, path))?.clone();
        let named = resolve_column(&layout.read_column, &headers, path).and_then(|read| {
            resolve_column(&layout.chimera_column, &headers, path).map(|chimera| (read, chimera))
        });
        match (named, layout.fallback) {
            (Ok(columns), _) => columns,
            (Err(_), Some((read, chimera))) if headers.len() > read.max(chimera) => {
                tracing::warn!(
                    path = %path.display(),
                    read_column = read,
                    chimera_column = chimera,
                    "named columns absent, using positional columns"
                );
                (read, chimera)
            }
            (Err(e), _) => return Err(e),
        }
    } else {
        match (&layout.read_column, &layout.chimera_column) {
            (Column::Index(r), Column::Index(c)) => (*r, *c),
            (Column::Name(n), _) | (_, Column::Name(n)) => {
                return Err(Error::MissingColumn {
                    column: n.clone(),
                    path: path.to_path_buf(),
                })
            }
        }
    };

    for (line, result) in reader.records().enumerate() {
        counts.rows += 1;
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(Error::table(e, path)),
            Err(e) => {
                tracing::warn!(path = %path.display(), line = line + 1, "skipping malformed row: {}", e);
                counts.malformed += 1;
                continue;
            }
        };

        let read_id = record.get(read_idx).map(str::trim).unwrap_or("");
        if read_id.is_empty() {
            tracing::warn!(path = %path.display(), line = line + 1, "skipping row without read id");
            counts.malformed += 1;
            continue;
        }

        let chimera_id = record
            .get(chimera_idx)
            .map(|raw| normalize_chimera_id(raw, &layout.pair_delimiter))
            .filter(|id| !is_missing(id));

        calls.push(RawCall {
            read_id: read_id.to_string(),
            chimera_id,
            origin: source.origin,
        });
    }

    Ok(())
}

fn resolve_column(column: &Column, headers: &csv::StringRecord, path: &Path) -> Result<usize> {
    match column {
        Column::Index(idx) => Ok(*idx),
        Column::Name(name) => headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| Error::MissingColumn {
                column: name.clone(),
                path: path.to_path_buf(),
            }),
    }
}

fn is_missing(value: &str) -> bool {
    matches!(value, "" | "NA" | "NaN" | "nan" | "None")
}
