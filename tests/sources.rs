use exon_repair::sources::{normalize_chimera_id, read_calls, CallSource, Column, Origin};
use std::io::Write;

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::File::create(&path)
        .and_then(|mut f| f.write_all(content.as_bytes()))
        .expect("write");
    path
}

#[test]
fn preset_layouts() {
    let genion = Origin::Genion.default_layout();
    assert_eq!(genion.read_column, Column::Index(27));
    assert_eq!(genion.chimera_column, Column::Index(7));
    assert_eq!(genion.pair_delimiter, "::");
    assert!(!genion.has_header);

    let longgf = Origin::LongGf.default_layout();
    assert_eq!(longgf.delimiter, b',');
    assert_eq!(longgf.read_column, Column::Name("Read_ID".into()));
}

#[test]
fn overrides_replace_preset_fields() {
    let layout = Origin::LongGf
        .default_layout()
        .with_overrides("sep=tab; header=no; read=0; chimera=2; pair=--")
        .expect("valid layout");
    assert_eq!(layout.delimiter, b'\t');
    assert!(!layout.has_header);
    assert_eq!(layout.read_column, Column::Index(0));
    assert_eq!(layout.chimera_column, Column::Index(2));
    assert_eq!(layout.pair_delimiter, "--");
}

#[test]
fn bad_override_is_rejected() {
    let base = Origin::JaffaL.default_layout();
    assert!(base.clone().with_overrides("colour=blue").is_err());
    assert!(base.clone().with_overrides("sep=abc").is_err());
    assert!(base.with_overrides("header").is_err());
}

#[test]
fn normalise_pair_delimiter() {
    assert_eq!(normalize_chimera_id("A::B", "::"), "A:B");
    assert_eq!(normalize_chimera_id(" A:B ", ":"), "A:B");
}

#[test]
fn jaffal_table_by_header_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(
        &dir,
        "jaffal.tsv",
        "fusion_genes\tspanning_reads\ttranscript\n\
         GeneX:GeneY\t3\tread1\n\
         \t1\tread2\n\
         GeneZ:GeneY\t2\t\n",
    );
    let source = CallSource::new(Origin::JaffaL, vec![path]);
    let (calls, counts) = read_calls(&source).expect("read");

    assert_eq!(counts.rows, 3);
    assert_eq!(counts.malformed, 1, "row without read id");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].read_id, "read1");
    assert_eq!(calls[0].chimera_id.as_deref(), Some("GeneX:GeneY"));
    assert_eq!(calls[1].chimera_id, None, "empty chimera kept as missing");
}

#[test]
fn missing_header_column_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(&dir, "longgf.csv", "read,chimera\nr1,A:B\n");
    let source = CallSource::new(Origin::LongGf, vec![path]);
    assert!(read_calls(&source).is_err());
}

#[test]
fn multiple_files_read_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let a = write_file(&dir, "a.csv", "Read_ID,Chimera_ID\nr1,A:B\n");
    let b = write_file(&dir, "b.csv", "Read_ID,Chimera_ID\nr2,C:D\n");
    let source = CallSource::new(Origin::LongGf, vec![a, b]);
    let (calls, _) = read_calls(&source).expect("read");
    let ids: Vec<&str> = calls.iter().map(|c| c.read_id.as_str()).collect();
    assert_eq!(ids, ["r1", "r2"]);
}

#[test]
fn headed_table_without_named_columns_falls_back_to_positions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let longgf = write_file(&dir, "longgf.csv", "idx,read,pair\n0,r1,A:B\n1,r2,C:D\n");
    let jaffal = write_file(&dir, "jaffal.tsv", "read\tpair\textra\nr3\tE:F\tx\n");

    let (calls, _) = read_calls(&CallSource::new(Origin::LongGf, vec![longgf])).expect("longgf");
    let pairs: Vec<(&str, Option<&str>)> = calls
        .iter()
        .map(|c| (c.read_id.as_str(), c.chimera_id.as_deref()))
        .collect();
    assert_eq!(pairs, [("r1", Some("A:B")), ("r2", Some("C:D"))]);

    let (calls, _) = read_calls(&CallSource::new(Origin::JaffaL, vec![jaffal])).expect("jaffal");
    assert_eq!(calls[0].read_id, "r3");
    assert_eq!(calls[0].chimera_id.as_deref(), Some("E:F"));
}

#[test]
fn explicit_column_override_disables_fallback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(&dir, "longgf.csv", "idx,read,pair\n0,r1,A:B\n");
    let mut source = CallSource::new(Origin::LongGf, vec![path]);
    source.layout = source
        .layout
        .with_overrides("read=Read;chimera=Pair")
        .expect("valid layout");
    assert!(read_calls(&source).is_err());
}
