use anyhow::Result;
use clap::Parser;
use exon_repair::{cli, pipeline};
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.quiet {
            EnvFilter::new("warn")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = args.to_config()?;
    let stats = match pipeline::run(&config) {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!("{:#}", e);
            return Err(e);
        }
    };

    tracing::info!(
        total_calls = stats.total_calls,
        candidate_reads = stats.candidate_reads,
        quarantined = stats.quarantined,
        selected_reads = stats.selected_reads,
        reconstructed = stats.reconstructed,
        final_candidates = stats.final_candidates,
        intrachromosomal = stats.intrachromosomal,
        interchromosomal = stats.interchromosomal,
        reconstruction_rate = stats.reconstruction_rate,
        "exon-repair: processing complete"
    );
    Ok(())
}
