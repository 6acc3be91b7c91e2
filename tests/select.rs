use exon_repair::fasta::TranscriptMeta;
use exon_repair::hits::{split_transcript_gene, RawHit};
use exon_repair::integrate::FusionCall;
use exon_repair::output::{write_table, TableRow};
use exon_repair::select::{select_transcripts, Preference, SelectedTranscript, SelectionConfig};
use exon_repair::sources::Origin;
use exon_repair::types::HashMap;
use exon_repair::Role;

// ── helpers ──────────────────────────────────────────────────────────────────

fn fusion(read: &str, a: &str, b: &str) -> FusionCall {
    FusionCall {
        read_id: read.into(),
        chimera_id: format!("{}:{}", a, b),
        origin: Origin::LongGf,
        gene_a: a.into(),
        gene_b: b.into(),
        chromosome_a: None,
        strand_a: None,
        chromosome_b: None,
        strand_b: None,
    }
}

fn hit(read: &str, transcript: &str, qstart: u64, bits: f64) -> RawHit {
    RawHit {
        read_id: read.into(),
        transcript_id: transcript.into(),
        percent_identity: 99.0,
        alignment_length: 100,
        mismatches: 1,
        gap_opens: 0,
        query_start: qstart,
        query_end: qstart + 99,
        subject_start: 1,
        subject_end: 100,
        e_value: 1e-30,
        bit_score: bits,
    }
}

fn meta(entries: &[(&str, &str, Option<u64>)]) -> HashMap<String, TranscriptMeta> {
    entries
        .iter()
        .map(|(name, ty, len)| {
            (
                name.to_string(),
                TranscriptMeta {
                    transcript_type: ty.to_string(),
                    length: *len,
                },
            )
        })
        .collect()
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[test]
fn gene_from_transcript_name() {
    assert_eq!(split_transcript_gene("GeneX-201"), ("GeneX".into(), Some("201".into())));
    assert_eq!(split_transcript_gene("HLA-A-202"), ("HLA-A".into(), Some("202".into())));
    assert_eq!(split_transcript_gene("GeneX"), ("GeneX".into(), None));
}

#[test]
fn best_hit_per_role_and_positional_order() {
    let calls = vec![fusion("r1", "GeneX", "GeneY")];
    // GeneY aligns earlier on the read, so it becomes positional A.
    let hits = vec![
        hit("r1", "GeneX-201", 500, 150.0),
        hit("r1", "GeneX-202", 500, 300.0),
        hit("r1", "GeneY-201", 10, 200.0),
        hit("r1", "Other-201", 5, 900.0),
    ];
    let m = meta(&[
        ("GeneX-201", "protein_coding", Some(1000)),
        ("GeneX-202", "protein_coding", Some(800)),
        ("GeneY-201", "protein_coding", Some(1200)),
    ]);
    let sel = select_transcripts(hits, &calls, &m, &HashMap::default(), &SelectionConfig::default())
        .expect("select");

    assert_eq!(sel.selected.len(), 2, "one row per role");
    assert_eq!(sel.selected[0].transcript_id, "GeneY-201");
    assert_eq!(sel.selected[0].order, Role::A);
    assert_eq!(sel.selected[0].gene_role, Role::B);
    assert_eq!(sel.selected[1].transcript_id, "GeneX-202", "higher bit score wins");
    assert_eq!(sel.selected[1].order, Role::B);
    assert_eq!(sel.stats.off_target, 1);
}

#[test]
fn primary_tag_then_length_break_ties() {
    let calls = vec![fusion("r1", "GeneX", "GeneY")];
    let hits = vec![
        hit("r1", "GeneX-201", 1, 200.0),
        hit("r1", "GeneX-202", 1, 200.0),
        hit("r1", "GeneY-201", 300, 200.0),
        hit("r1", "GeneY-202", 300, 200.0),
        hit("r1", "GeneY-203", 300, 200.0),
    ];
    let m = meta(&[
        ("GeneX-201", "protein_coding", Some(5000)),
        ("GeneX-202", "protein_coding", Some(100)),
        ("GeneY-201", "protein_coding", None),
        ("GeneY-202", "protein_coding", Some(700)),
        ("GeneY-203", "protein_coding", Some(900)),
    ]);
    let mut tags: HashMap<String, Vec<String>> = HashMap::default();
    tags.insert("GeneX-202".into(), vec!["basic".into(), "GENCODE_Primary".into()]);

    let sel = select_transcripts(hits, &calls, &m, &tags, &SelectionConfig::default())
        .expect("select");

    assert_eq!(sel.selected[0].transcript_id, "GeneX-202", "primary tag beats length");
    assert_eq!(sel.selected[0].preference, Preference::Primary);
    assert_eq!(sel.selected[1].transcript_id, "GeneY-203", "longest; unknown length last");
}

#[test]
fn excluded_type_dropped_but_missing_type_kept() {
    let calls = vec![fusion("r1", "GeneX", "GeneY")];
    let hits = vec![
        hit("r1", "GeneX-201", 1, 500.0),
        hit("r1", "GeneX-202", 1, 100.0),
        hit("r1", "GeneY-201", 200, 100.0),
    ];
    let m = meta(&[("GeneX-201", "retained_intron", Some(1000))]);
    let sel = select_transcripts(hits, &calls, &m, &HashMap::default(), &SelectionConfig::default())
        .expect("select");

    assert_eq!(sel.stats.excluded_type, 1);
    assert_eq!(sel.selected[0].transcript_id, "GeneX-202");
    assert_eq!(sel.selected[1].transcript_id, "GeneY-201", "no metadata, still kept");
}

#[test]
fn reads_missing_a_partner_are_dropped() {
    let calls = vec![fusion("r1", "GeneX", "GeneY"), fusion("r2", "GeneX", "GeneY")];
    let hits = vec![
        hit("r1", "GeneX-201", 1, 100.0),
        hit("r2", "GeneX-201", 1, 100.0),
        hit("r2", "GeneY-201", 150, 100.0),
        hit("r3", "GeneY-201", 150, 100.0),
    ];
    let sel = select_transcripts(
        hits,
        &calls,
        &HashMap::default(),
        &HashMap::default(),
        &SelectionConfig::default(),
    )
    .expect("select");

    assert!(sel.selected.iter().all(|s| s.read_id == "r2"));
    assert_eq!(sel.stats.single_role_reads, 1);
    assert_eq!(sel.stats.without_call, 1);

    // Role completeness: every surviving read has exactly one A and one B.
    let roles: Vec<Role> = sel.selected.iter().map(|s| s.order).collect();
    assert_eq!(roles, [Role::A, Role::B]);
}

#[test]
fn reads_sorted_descending_with_equal_start_ordered_by_role() {
    let calls = vec![fusion("r1", "GeneX", "GeneY"), fusion("r2", "GeneX", "GeneY")];
    let hits = vec![
        hit("r1", "GeneY-201", 1, 100.0),
        hit("r1", "GeneX-201", 1, 100.0),
        hit("r2", "GeneX-201", 400, 100.0),
        hit("r2", "GeneY-201", 1, 100.0),
    ];
    let sel = select_transcripts(
        hits,
        &calls,
        &HashMap::default(),
        &HashMap::default(),
        &SelectionConfig::default(),
    )
    .expect("select");

    let ids: Vec<&str> = sel.selected.iter().map(|s| s.read_id.as_str()).collect();
    assert_eq!(ids, ["r2", "r2", "r1", "r1"], "read id descending");
    assert_eq!(sel.selected[2].gene, "GeneX", "equal start: gene role A first");
    assert_eq!(sel.selected[2].order, Role::A);
}

#[test]
fn empty_selection_is_not_an_error() {
    let sel = select_transcripts(
        Vec::new(),
        &[],
        &HashMap::default(),
        &HashMap::default(),
        &SelectionConfig::default(),
    )
    .expect("empty selection");
    assert!(sel.selected.is_empty());
}

#[test]
fn selection_table_columns_match_serialized_header() {
    let calls = vec![fusion("r1", "GeneX", "GeneY")];
    let hits = vec![hit("r1", "GeneX-201", 1, 100.0), hit("r1", "GeneY-201", 200, 100.0)];
    let sel = select_transcripts(
        hits,
        &calls,
        &HashMap::default(),
        &HashMap::default(),
        &SelectionConfig::default(),
    )
    .expect("select");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("selected.tsv");
    write_table(&path, &sel.selected).expect("write");
    let text = std::fs::read_to_string(&path).expect("read");
    assert_eq!(text.lines().next(), Some(SelectedTranscript::COLUMNS.join("\t").as_str()));
}
