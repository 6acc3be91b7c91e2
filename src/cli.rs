use crate::blast::BlastConfig;
use crate::error::{Error, Result};
use crate::pipeline::{ExtractorKind, HitInput, PipelineConfig};
use crate::select::SelectionConfig;
use crate::sources::{CallSource, Origin};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "exon-repair",
    about = "Reconcile long-read fusion calls and reconstruct chimeric transcript sequences",
    version
)]
pub struct Args {
    /// LongGF output table(s), comma-separated
    #[arg(long, value_name = "CSV", value_delimiter = ',')]
    pub longgf: Vec<PathBuf>,

    /// JaffaL output table(s), comma-separated
    #[arg(long, value_name = "TSV", value_delimiter = ',')]
    pub jaffal: Vec<PathBuf>,

    /// Genion output table(s), e.g. the .tsv and .tsv.fail files
    #[arg(long, value_name = "TSV", value_delimiter = ',')]
    pub genion: Vec<PathBuf>,

    /// Override the LongGF layout, e.g. "sep=tab;read=0;chimera=1"
    #[arg(long, value_name = "LAYOUT")]
    pub longgf_layout: Option<String>,

    /// Override the JaffaL layout
    #[arg(long, value_name = "LAYOUT")]
    pub jaffal_layout: Option<String>,

    /// Override the Genion layout
    #[arg(long, value_name = "LAYOUT")]
    pub genion_layout: Option<String>,

    /// Source order for read deduplication; the first source wins
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_value = "longgf,jaffal,genion"
    )]
    pub priority: Vec<Origin>,

    /// Reference annotation (GTF)
    #[arg(short = 'G', long = "gtf", value_name = "GTF")]
    pub gtf: PathBuf,

    /// Transcriptome FASTA with GENCODE-style headers
    #[arg(short = 'T', long = "transcriptome", value_name = "FASTA")]
    pub transcriptome: PathBuf,

    /// Genome sequence FASTA
    #[arg(short = 'S', long = "genome", value_name = "FASTA")]
    pub genome: PathBuf,

    /// Precomputed BLAST hits of reads against transcripts (outfmt 6)
    #[arg(long, value_name = "TSV", conflicts_with = "reads")]
    pub hits: Option<PathBuf>,

    /// Reads FASTA/FASTQ; aligned with blastn when --hits is not given
    #[arg(long, value_name = "FASTX", required_unless_present = "hits")]
    pub reads: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'o', long = "outdir", value_name = "DIR")]
    pub outdir: PathBuf,

    /// Number of threads (CPUs) handed to external tools
    #[arg(short = 'p', long = "threads", default_value_t = 1)]
    pub threads: usize,

    /// Exon sequence extraction backend
    #[arg(long, value_enum, default_value_t = ExtractorKind::Builtin)]
    pub extractor: ExtractorKind,

    /// bedtools executable
    #[arg(long, default_value = "bedtools")]
    pub bedtools: String,

    /// blastn executable
    #[arg(long, default_value = "blastn")]
    pub blastn: String,

    /// makeblastdb executable
    #[arg(long, default_value = "makeblastdb")]
    pub makeblastdb: String,

    /// Annotation tag marking preferred transcripts (repeatable)
    #[arg(long = "primary-tag", value_name = "TAG", default_value = "GENCODE_Primary")]
    pub primary_tags: Vec<String>,

    /// Transcript biotype to ignore (repeatable)
    #[arg(long = "exclude-type", value_name = "TYPE", default_value = "retained_intron")]
    pub excluded_types: Vec<String>,

    /// Set logging level to WARN
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Args {
    /// Resolve sources and layouts into a library configuration.
    ///
    /// Sources follow `--priority`; a detector given on the command line but
    /// left out of the priority list is appended after the listed ones.
    pub fn to_config(&self) -> Result<PipelineConfig> {
        let mut sources: Vec<CallSource> = Vec::new();
        let unlisted = Origin::ALL
            .iter()
            .filter(|origin| !self.priority.contains(*origin));
        for origin in self.priority.iter().chain(unlisted) {
            let (paths, layout) = match origin {
                Origin::LongGf => (&self.longgf, &self.longgf_layout),
                Origin::JaffaL => (&self.jaffal, &self.jaffal_layout),
                Origin::Genion => (&self.genion, &self.genion_layout),
            };
            if paths.is_empty() || sources.iter().any(|s| s.origin == *origin) {
                continue;
            }
            if !self.priority.contains(origin) {
                tracing::warn!(
                    origin = %origin,
                    "detector missing from --priority, ranked after the listed ones"
                );
            }
            let mut source = CallSource::new(*origin, paths.clone());
            if let Some(spec) = layout {
                source.layout = source.layout.with_overrides(spec)?;
            }
            sources.push(source);
        }

        let hits = match (&self.hits, &self.reads) {
            (Some(path), _) => HitInput::Precomputed(path.clone()),
            (None, Some(reads)) => HitInput::Align {
                reads: reads.clone(),
                blast: BlastConfig {
                    blastn: self.blastn.clone(),
                    makeblastdb: self.makeblastdb.clone(),
                    threads: self.threads,
                },
            },
            (None, None) => {
                return Err(Error::Config(
                    "either --hits or --reads is required".to_string(),
                ))
            }
        };

        Ok(PipelineConfig {
            sources,
            gtf: self.gtf.clone(),
            transcriptome: self.transcriptome.clone(),
            genome: self.genome.clone(),
            hits,
            outdir: self.outdir.clone(),
            extractor: self.extractor,
            bedtools: self.bedtools.clone(),
            selection: SelectionConfig {
                excluded_types: self.excluded_types.clone(),
                primary_tags: self.primary_tags.clone(),
            },
        })
    }
}
