use crate::error::{Error, Result};
use crate::types::{HashMap, HashMapExt};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;

/// Chromosome and strand of a gene, from the first `gene` record carrying its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneLocus {
    pub chromosome: String,
    pub strand: char,
}

/// `gene_name -> GeneLocus`, first occurrence wins.
#[derive(Debug, Default, Clone)]
pub struct GeneLoci {
    loci: HashMap<String, GeneLocus>,
}

impl GeneLoci {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the gene is already known.
    pub fn insert(&mut self, gene: &str, locus: GeneLocus) {
        if !self.loci.contains_key(gene) {
            self.loci.insert(gene.to_string(), locus);
        }
    }

    pub fn get(&self, gene: &str) -> Option<&GeneLocus> {
        self.loci.get(gene)
    }

    pub fn len(&self) -> usize {
        self.loci.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loci.is_empty()
    }
}

/// One GTF exon feature in BED orientation.
///
/// `start` is 0-based, `end` is the GTF end, so `end - start` is the exon length.
/// `transcript_id` is the `transcript_name` attribute when present, which is
/// how BLAST hits and transcript selections refer to transcripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExonRecord {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub exon_id: String,
    pub strand: char,
    pub transcript_type: String,
    pub gene: String,
    pub transcript_id: String,
    /// Raw attribute value; parsed numerically by the breakpoint stage.
    pub exon_number: Option<String>,
}

/// Everything the pipeline needs from the annotation, loaded in one pass.
#[derive(Debug, Default)]
pub struct Annotation {
    pub genes: GeneLoci,
    /// `transcript_name -> tag values` from `transcript` records.
    pub tags: HashMap<String, Vec<String>>,
    pub exons: Vec<ExonRecord>,
}

impl Annotation {
    /// Read gene loci, transcript tags and exon records from a GTF file.
    ///
    /// Records noodles cannot decode are skipped with a warning; I/O failures
    /// abort the load.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MissingInput {
                what: "GTF annotation",
                path: path.to_path_buf(),
            });
        }

        // noodles-gtf yields gff::feature::RecordBuf, so attribute access is
        // shared with the GFF API.
        let file = File::open(path).map_err(|e| Error::io(e, path))?;
        let mut reader = noodles::gtf::io::Reader::new(BufReader::new(file));

        let mut annotation = Annotation {
            genes: GeneLoci::new(),
            tags: HashMap::new(),
            exons: Vec::new(),
        };
        let mut skipped = 0usize;

        for result in reader.record_bufs() {
            let record = match result {
                Ok(record) => record,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    skipped += 1;
                    tracing::warn!("skipping unparsable GTF record: {}", e);
                    continue;
                }
                Err(e) => return Err(Error::io(e, path)),
            };

            let feature_type: &[u8] = record.ty().as_ref();
            let attrs = record.attributes();

            match feature_type {
                b"gene" => {
                    if let Some(name) = get_record_buf_attribute(attrs, b"gene_name") {
                        annotation.genes.insert(
                            &name,
                            GeneLocus {
                                chromosome: record.reference_sequence_name().to_string(),
                                strand: strand_to_char(record.strand()),
                            },
                        );
                    }
                }
                b"transcript" => {
                    let Some(name) = get_record_buf_attribute(attrs, b"transcript_name") else {
                        continue;
                    };
                    let tags = get_record_buf_attributes(attrs, b"tag");
                    if !tags.is_empty() {
                        annotation.tags.entry(name).or_default().extend(tags);
                    }
                }
                b"exon" => {
                    let transcript_id = get_record_buf_attribute(attrs, b"transcript_name")
                        .or_else(|| get_record_buf_attribute(attrs, b"transcript_id"));
                    let Some(transcript_id) = transcript_id else {
                        skipped += 1;
                        continue;
                    };

                    annotation.exons.push(ExonRecord {
                        chromosome: record.reference_sequence_name().to_string(),
                        // 1-based inclusive -> 0-based half-open
                        start: (record.start().get() as u64).saturating_sub(1),
                        end: record.end().get() as u64,
                        exon_id: get_record_buf_attribute(attrs, b"exon_id")
                            .unwrap_or_else(|| ".".to_string()),
                        strand: strand_to_char(record.strand()),
                        transcript_type: get_record_buf_attribute(attrs, b"transcript_type")
                            .unwrap_or_else(|| "Unknown".to_string()),
                        gene: get_record_buf_attribute(attrs, b"gene_name")
                            .unwrap_or_else(|| "Unknown".to_string()),
                        transcript_id,
                        exon_number: get_record_buf_attribute(attrs, b"exon_number"),
                    });
                }
                _ => {}
            }
        }

        tracing::info!(
            genes = annotation.genes.len(),
            tagged_transcripts = annotation.tags.len(),
            exons = annotation.exons.len(),
            skipped,
            "loaded annotation"
        );

        Ok(annotation)
    }
}

fn get_record_buf_attribute(
    attrs: &noodles::gff::feature::record_buf::Attributes,
    key: &[u8],
) -> Option<String> {
    let value = attrs.get(key)?;
    value.iter().next().map(|v| v.to_string())
}

// `tag` repeats within a record; every value counts.
fn get_record_buf_attributes(
    attrs: &noodles::gff::feature::record_buf::Attributes,
    key: &[u8],
) -> Vec<String> {
    attrs
        .get(key)
        .map(|value| value.iter().map(|v| v.to_string()).collect())
        .unwrap_or_default()
}

fn strand_to_char(strand: noodles::gff::feature::record::Strand) -> char {
    use noodles::gff::feature::record::Strand;
    match strand {
        Strand::Forward => '+',
        Strand::Reverse => '-',
        Strand::None => '.',
        Strand::Unknown => '?',
    }
}
