//! End-to-end tests driving the exon-repair binary on a miniature data set.
//!
//! Two genes on different chromosomes, two exons each, one read spanning the
//! fusion. Alignment hits are precomputed and extraction is in-process, so no
//! external tools are needed.

use std::path::{Path, PathBuf};
use std::process::Command;

// ── helpers ──────────────────────────────────────────────────────────────────

fn exon_repair_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_exon-repair"))
}

/// Deterministic pseudo-random ACGT sequence.
fn sequence(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 33) as usize % 4]
        })
        .collect()
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write fixture");
    path
}

fn fasta(records: &[(&str, &[u8])]) -> String {
    let mut out = String::new();
    for (header, seq) in records {
        out.push('>');
        out.push_str(header);
        out.push('\n');
        for line in seq.chunks(60) {
            out.push_str(std::str::from_utf8(line).expect("ascii"));
            out.push('\n');
        }
    }
    out
}

const GTF: &str = "\
chr1\ttest\tgene\t11\t150\t.\t+\t.\tgene_id \"G1\"; gene_name \"GeneX\";
chr1\ttest\ttranscript\t11\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; gene_name \"GeneX\"; transcript_name \"GeneX-201\"; tag \"basic\"; tag \"GENCODE_Primary\";
chr1\ttest\texon\t11\t60\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; gene_name \"GeneX\"; transcript_name \"GeneX-201\"; transcript_type \"protein_coding\"; exon_number \"1\"; exon_id \"E1\";
chr1\ttest\texon\t101\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; gene_name \"GeneX\"; transcript_name \"GeneX-201\"; transcript_type \"protein_coding\"; exon_number \"2\"; exon_id \"E2\";
chr2\ttest\tgene\t201\t350\t.\t+\t.\tgene_id \"G2\"; gene_name \"GeneY\";
chr2\ttest\ttranscript\t201\t350\t.\t+\t.\tgene_id \"G2\"; transcript_id \"T2\"; gene_name \"GeneY\"; transcript_name \"GeneY-201\";
chr2\ttest\texon\t201\t240\t.\t+\t.\tgene_id \"G2\"; transcript_id \"T2\"; gene_name \"GeneY\"; transcript_name \"GeneY-201\"; transcript_type \"protein_coding\"; exon_number \"1\"; exon_id \"E3\";
chr2\ttest\texon\t301\t350\t.\t+\t.\tgene_id \"G2\"; transcript_id \"T2\"; gene_name \"GeneY\"; transcript_name \"GeneY-201\"; transcript_type \"protein_coding\"; exon_number \"2\"; exon_id \"E4\";
";

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    chr1: Vec<u8>,
    chr2: Vec<u8>,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().to_path_buf();

    let chr1 = sequence(400, 1);
    let chr2 = sequence(400, 2);
    write(&root, "genome.fa", &fasta(&[("chr1", &chr1[..]), ("chr2", &chr2[..])]));

    let tx_x = [&chr1[10..60], &chr1[100..150]].concat();
    let tx_y = [&chr2[200..240], &chr2[300..350]].concat();
    write(
        &root,
        "transcripts.fa",
        &fasta(&[
            ("ENST1|ENSG1|-|-|GeneX-201|GeneX|100|protein_coding|", &tx_x[..]),
            ("ENST2|ENSG2|-|-|GeneY-201|GeneY|90|protein_coding|", &tx_y[..]),
        ]),
    );

    write(&root, "annotation.gtf", GTF);

    write(
        &root,
        "longgf.csv",
        "Read_ID,Chimera_ID\nr1,GeneX:GeneY\nr2,GeneX:GeneY:GeneZ\nr3,GeneX:GeneY\n",
    );
    write(&root, "jaffal.tsv", "fusion_genes\ttranscript\nGeneY:GeneX\tr1\n");

    // r1: GeneX on read bases 1-100, GeneY on 101-190. r3 has no hits.
    write(
        &root,
        "hits.tsv",
        "r1\tGeneX-201\t100.0\t100\t0\t0\t1\t100\t1\t100\t1e-50\t185.0\n\
         r1\tGeneY-201\t100.0\t90\t0\t0\t101\t190\t1\t90\t1e-45\t167.0\n\
         r2\tGeneX-201\t100.0\t100\t0\t0\t1\t100\t1\t100\t1e-50\t185.0\n",
    );

    Fixture {
        _dir: dir,
        root,
        chr1,
        chr2,
    }
}

fn run_binary(fx: &Fixture, extra: &[&str]) -> std::process::Output {
    let r = &fx.root;
    Command::new(exon_repair_bin())
        .arg("--longgf")
        .arg(r.join("longgf.csv"))
        .arg("--jaffal")
        .arg(r.join("jaffal.tsv"))
        .arg("-G")
        .arg(r.join("annotation.gtf"))
        .arg("-T")
        .arg(r.join("transcripts.fa"))
        .arg("-S")
        .arg(r.join("genome.fa"))
        .arg("--hits")
        .arg(r.join("hits.tsv"))
        .arg("-o")
        .arg(r.join("out"))
        .arg("-q")
        .args(extra)
        .output()
        .expect("failed to spawn exon-repair")
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
        .lines()
        .map(str::to_string)
        .collect()
}

// ── tests ─────────────────────────────────────────────────────────────────────

/// The reconstructed read is GeneX exons 1-2 followed by GeneY exons 1-2.
#[test]
fn reconstructs_fused_sequence() {
    let fx = fixture();
    let output = run_binary(&fx, &[]);
    assert!(
        output.status.success(),
        "exon-repair failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let out = fx.root.join("out");
    let fa = read_lines(&out.join("reconstructed_chimeras.fa"));
    let expected = [
        &fx.chr1[10..60],
        &fx.chr1[100..150],
        &fx.chr2[200..240],
        &fx.chr2[300..350],
    ]
    .concat();
    assert_eq!(fa.len(), 2, "one record");
    assert_eq!(fa[0], ">r1 GeneX:GeneY");
    assert_eq!(fa[1].as_bytes(), &expected[..], "A partial then B partial");

    let bed_a = read_lines(&out.join("exon_ranges_A.bed"));
    assert_eq!(bed_a, ["chr1\t10\t60\tr1\t.\t+", "chr1\t100\t150\tr1\t.\t+"]);
    let bed_b = read_lines(&out.join("exon_ranges_B.bed"));
    assert_eq!(bed_b.len(), 2);
}

/// LongGF wins the duplicate, the three-gene call is quarantined, and the read
/// without hits never reaches the final table.
#[test]
fn candidate_tables_reflect_integration() {
    let fx = fixture();
    let output = run_binary(&fx, &[]);
    assert!(output.status.success(), "exon-repair exited with {}", output.status);

    let out = fx.root.join("out");
    let library = read_lines(&out.join("chimera_library.tsv"));
    assert!(library[0].starts_with("Read_ID\tChimera_ID\tOrigin\tGeneA\tGeneB"));
    assert_eq!(library.len(), 3, "header + r1 + r3");
    assert!(library[1].starts_with("r1\tGeneX:GeneY\tLongGF\tGeneX\tGeneY\tchr1\t+\tchr2\t+"));

    let quarantine = read_lines(&out.join("work").join("multi_gene_fusions.tsv"));
    assert_eq!(quarantine.len(), 2);
    assert!(quarantine[1].starts_with("r2\tGeneX:GeneY:GeneZ"));

    let overlap = read_lines(&out.join("work").join("detector_overlap.tsv"));
    assert_eq!(
        overlap,
        [
            "Set\tTools\tChimeras\tConsensus_Precision",
            "LongGF\t1\t2\t",
            "JaffaL\t1\t1\t",
            "LongGF&JaffaL\t2\t0\t",
        ]
    );

    let finals = read_lines(&out.join("final_candidates.tsv"));
    assert_eq!(finals.len(), 2, "header + r1");
    assert!(finals[1].starts_with("r1\t"));
    assert!(finals[1].ends_with("\tInterchromosomal"));

    let summary = read_lines(&out.join("run_summary.tsv"));
    assert!(summary.iter().any(|l| l == "quarantined\t1"));
    assert!(summary.iter().any(|l| l == "reconstructed_sequences\t1"));
}

#[test]
fn missing_input_fails() {
    let fx = fixture();
    std::fs::remove_file(fx.root.join("hits.tsv")).expect("remove");
    let output = run_binary(&fx, &[]);
    assert!(!output.status.success(), "missing hits must be fatal");
    assert!(!fx.root.join("out").join("final_candidates.tsv").exists());
}
