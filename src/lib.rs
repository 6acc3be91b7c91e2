//! exon-repair: reconcile long-read gene-fusion calls and reconstruct the fused
//! transcript sequence of every supporting read.
//!
//! Four stages run in strict order, each consuming only the previous stage's
//! output:
//!
//! 1. [`integrate`]: merge LongGF, JaffaL and Genion calls into one
//!    deduplicated candidate table ([`sources`] reads each tool's layout).
//! 2. [`select`]: choose one reference transcript per read and partner gene
//!    from BLAST hits ([`hits`]).
//! 3. [`breakpoint`]: find the breakpoint exon on each side in transcript
//!    coordinates.
//! 4. [`assemble`]: extract the exon ranges ([`extract`]) and fuse them into
//!    one sequence per read.
//!
//! # Library usage
//!
//! ```no_run
//! use exon_repair::annotation::Annotation;
//! use exon_repair::integrate::integrate;
//! use exon_repair::sources::{CallSource, Origin};
//! use std::path::{Path, PathBuf};
//!
//! # fn main() -> exon_repair::error::Result<()> {
//! let annotation = Annotation::load(Path::new("gencode.gtf"))?;
//! let sources = vec![
//!     CallSource::new(Origin::LongGf, vec![PathBuf::from("longgf.csv")]),
//!     CallSource::new(Origin::Genion, vec![PathBuf::from("genion.tsv")]),
//! ];
//! let integration = integrate(&sources, &annotation.genes)?;
//! println!("{} candidate reads", integration.calls.len());
//! # Ok(())
//! # }
//! ```

pub mod annotation;
pub mod assemble;
pub mod blast;
pub mod breakpoint;
pub mod cli;
pub mod error;
pub mod external;
pub mod extract;
pub mod fasta;
pub mod hits;
pub mod integrate;
pub mod output;
pub mod pipeline;
pub mod select;
pub mod sources;
pub mod types;

pub use error::{Error, Result};
pub use pipeline::{run, PipelineConfig, Stats};
pub use types::Role;
