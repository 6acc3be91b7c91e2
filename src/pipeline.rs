use crate::annotation::Annotation;
use crate::assemble::{assemble, AssemblyPaths};
use crate::blast::{run_blast, BlastConfig};
use crate::breakpoint::locate_breakpoints;
use crate::error::Error;
use crate::extract::{BedtoolsExtractor, GenomeExtractor, SequenceExtractor};
use crate::fasta::{load_transcript_metadata, FastaDb};
use crate::hits::read_hits;
use crate::integrate::integrate;
use crate::output::{write_lines, write_table, TableRow};
use crate::select::{select_transcripts, SelectionConfig};
use crate::sources::{CallSource, Origin};
use crate::types::HashSet;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const CHIMERA_LIBRARY: &str = "chimera_library.tsv";
pub const MULTI_GENE_FUSIONS: &str = "multi_gene_fusions.tsv";
pub const DETECTOR_OVERLAP: &str = "detector_overlap.tsv";
pub const CHIMERA_READ_IDS: &str = "chimera_read_ids.txt";
pub const READ_CHIMERA_PAIRS: &str = "read_chimera_pairs.tsv";
pub const SELECTED_TRANSCRIPTS: &str = "selected_transcripts.tsv";
pub const EXON_RANGES_A: &str = "exon_ranges_A.bed";
pub const EXON_RANGES_B: &str = "exon_ranges_B.bed";
pub const BREAKPOINT_SUMMARY: &str = "breakpoint_summary.tsv";
pub const TRANSCRIPT_EXON_DEBUG: &str = "transcript_exon_debug.tsv";
pub const RECONSTRUCTED_CHIMERAS: &str = "reconstructed_chimeras.fa";
pub const FINAL_CANDIDATES: &str = "final_candidates.tsv";
pub const RUN_SUMMARY: &str = "run_summary.tsv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExtractorKind {
    /// In-process genome slicing
    Builtin,
    /// `bedtools getfasta`
    Bedtools,
}

/// Where alignment hits come from.
#[derive(Debug, Clone)]
pub enum HitInput {
    Precomputed(PathBuf),
    Align { reads: PathBuf, blast: BlastConfig },
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Detector sources in priority order.
    pub sources: Vec<CallSource>,
    pub gtf: PathBuf,
    pub transcriptome: PathBuf,
    pub genome: PathBuf,
    pub hits: HitInput,
    pub outdir: PathBuf,
    pub extractor: ExtractorKind,
    pub bedtools: String,
    pub selection: SelectionConfig,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Stats {
    pub total_calls: usize,
    pub candidate_reads: usize,
    pub quarantined: usize,
    pub selected_reads: usize,
    pub breakpoint_reads: usize,
    pub reconstructed: usize,
    pub final_candidates: usize,
    pub intrachromosomal: usize,
    pub interchromosomal: usize,
    pub per_origin: Vec<(Origin, usize)>,
    pub reconstruction_rate: f64,
}

#[derive(Serialize)]
struct SummaryRow {
    metric: String,
    value: String,
}

#[derive(Serialize)]
struct ReadChimeraPair<'a> {
    #[serde(rename = "Read_ID")]
    read_id: &'a str,
    #[serde(rename = "Chimera_ID")]
    chimera_id: &'a str,
}

impl TableRow for SummaryRow {
    const COLUMNS: &'static [&'static str] = &["metric", "value"];
}

impl TableRow for ReadChimeraPair<'_> {
    const COLUMNS: &'static [&'static str] = &["Read_ID", "Chimera_ID"];
}

impl Stats {
    fn summary_rows(&self) -> Vec<SummaryRow> {
        let mut rows: Vec<(String, String)> = vec![
            ("total_calls".into(), self.total_calls.to_string()),
            ("candidate_reads".into(), self.candidate_reads.to_string()),
            ("quarantined".into(), self.quarantined.to_string()),
            ("selected_reads".into(), self.selected_reads.to_string()),
            ("breakpoint_reads".into(), self.breakpoint_reads.to_string()),
            ("reconstructed_sequences".into(), self.reconstructed.to_string()),
            ("final_candidates".into(), self.final_candidates.to_string()),
            ("intrachromosomal".into(), self.intrachromosomal.to_string()),
            ("interchromosomal".into(), self.interchromosomal.to_string()),
        ];
        for (origin, n) in &self.per_origin {
            rows.push((
                format!("{}_final_count", origin.as_str().to_lowercase()),
                n.to_string(),
            ));
        }
        rows.push((
            "reconstruction_rate".into(),
            format!("{:.2}", self.reconstruction_rate),
        ));
        rows.into_iter()
            .map(|(metric, value)| SummaryRow { metric, value })
            .collect()
    }
}

fn check_input(path: &Path, what: &'static str) -> Result<()> {
    if !path.is_file() {
        return Err(Error::MissingInput {
            what,
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(())
}

/// Run the four stages end to end, writing every table under `config.outdir`.
pub fn run(config: &PipelineConfig) -> Result<Stats> {
    if config.sources.is_empty() {
        return Err(Error::Config("no detector output given".to_string()).into());
    }
    for source in &config.sources {
        for path in &source.paths {
            check_input(path, "detector output")?;
        }
    }
    check_input(&config.gtf, "GTF annotation")?;
    check_input(&config.transcriptome, "transcriptome FASTA")?;
    check_input(&config.genome, "genome FASTA")?;
    match &config.hits {
        HitInput::Precomputed(path) => check_input(path, "alignment hits")?,
        HitInput::Align { reads, .. } => check_input(reads, "reads FASTA")?,
    }

    let outdir = config.outdir.as_path();
    let work_dir = outdir.join("work");
    std::fs::create_dir_all(&work_dir)
        .with_context(|| format!("failed to create {}", work_dir.display()))?;

    let annotation = Annotation::load(&config.gtf).context("loading annotation")?;

    // Evidence integration
    let integration =
        integrate(&config.sources, &annotation.genes).context("integrating fusion calls")?;
    write_table(&outdir.join(CHIMERA_LIBRARY), &integration.calls)
        .context("writing candidate table")?;
    write_table(&work_dir.join(MULTI_GENE_FUSIONS), &integration.quarantined)
        .context("writing quarantine table")?;
    write_table(&work_dir.join(DETECTOR_OVERLAP), &integration.overlap)
        .context("writing detector overlap table")?;
    write_lines(&work_dir.join(CHIMERA_READ_IDS), integration.read_ids())
        .context("writing candidate read ids")?;
    let pairs: Vec<ReadChimeraPair> = integration
        .calls
        .iter()
        .map(|c| ReadChimeraPair {
            read_id: &c.read_id,
            chimera_id: &c.chimera_id,
        })
        .collect();
    write_table(&work_dir.join(READ_CHIMERA_PAIRS), &pairs)
        .context("writing read/chimera pairs")?;

    // Transcript selection
    let hits_path = match &config.hits {
        HitInput::Precomputed(path) => path.clone(),
        HitInput::Align { reads, blast } => {
            let ids: HashSet<String> = integration.read_ids().map(str::to_string).collect();
            run_blast(blast, reads, &ids, &config.transcriptome, &work_dir)
                .context("aligning candidate reads")?
        }
    };
    let hits = read_hits(&hits_path)
        .with_context(|| format!("reading alignment hits from {}", hits_path.display()))?;
    let meta = load_transcript_metadata(&config.transcriptome)
        .context("loading transcript metadata")?;
    let selection = select_transcripts(
        hits,
        &integration.calls,
        &meta,
        &annotation.tags,
        &config.selection,
    )
    .context("selecting transcripts")?;
    write_table(&work_dir.join(SELECTED_TRANSCRIPTS), &selection.selected).with_context(|| {
        format!("writing {} selected transcripts", selection.selected.len())
    })?;

    // Breakpoints
    let breakpoints = locate_breakpoints(&selection.selected, &annotation.exons)
        .context("locating breakpoints")?;
    write_table(&outdir.join(BREAKPOINT_SUMMARY), &breakpoints.summary())
        .context("writing breakpoint summary")?;
    write_table(&work_dir.join(TRANSCRIPT_EXON_DEBUG), &breakpoints.debug)
        .context("writing transcript exon join")?;

    // Assembly
    let genome;
    let extractor: Box<dyn SequenceExtractor + '_> = match config.extractor {
        ExtractorKind::Builtin => {
            genome = FastaDb::load(&config.genome).context("loading genome")?;
            Box::new(GenomeExtractor::new(&genome))
        }
        ExtractorKind::Bedtools => Box::new(BedtoolsExtractor {
            program: config.bedtools.clone(),
            genome: config.genome.clone(),
        }),
    };
    let paths = AssemblyPaths {
        bed_a: outdir.join(EXON_RANGES_A),
        bed_b: outdir.join(EXON_RANGES_B),
        fasta: outdir.join(RECONSTRUCTED_CHIMERAS),
        work_dir: work_dir.clone(),
    };
    let assembly = assemble(&breakpoints, &integration.calls, extractor.as_ref(), &paths)
        .context("assembling chimeric sequences")?;
    write_table(&outdir.join(FINAL_CANDIDATES), &assembly.candidates).with_context(|| {
        format!("writing {} final candidates", assembly.candidates.len())
    })?;

    let stats = Stats {
        total_calls: integration.stats.total_rows,
        candidate_reads: integration.stats.kept,
        quarantined: integration.stats.quarantined,
        selected_reads: selection.stats.selected_reads,
        breakpoint_reads: breakpoints.stats.reads,
        reconstructed: assembly.stats.reconstructed,
        final_candidates: assembly.stats.unique_candidates,
        intrachromosomal: assembly.stats.intrachromosomal,
        interchromosomal: assembly.stats.interchromosomal,
        per_origin: assembly.stats.per_origin.clone(),
        reconstruction_rate: assembly.stats.reconstruction_rate,
    };
    write_table(&outdir.join(RUN_SUMMARY), &stats.summary_rows()).context("writing run summary")?;

    Ok(stats)
}
