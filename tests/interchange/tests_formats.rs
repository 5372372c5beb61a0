//! Format detection and cross-format reads.

use mapstack::interchange::archive::write_archive;
use mapstack::interchange::compressed::gzip;
use mapstack::interchange::{
    DetectedFormat, MappingError, WriteMode, Wrapping, detect_format, read_headers, read_mappings,
    read_tiny, write_tiny,
};
use rstest::rstest;

const V1: &str = "v1\tofficial\tintermediary\tnamed\n\
    CLASS\ta\tnet/minecraft/class_1\tnet/example/Foo\n\
    CLASS\tb\tnet/minecraft/class_2\tnet/example/Bar\n\
    METHOD\ta\t(Lb;)V\tc\tmethod_10\tconsume\n\
    FIELD\ta\tI\td\tfield_20\tcount\n";

const V2: &str = "tiny\t2\t0\tofficial\tintermediary\tnamed\n\
    c\ta\tnet/minecraft/class_1\tnet/example/Foo\n\
    \tf\tI\td\tfield_20\tcount\n\
    \tm\t(Lb;)V\tc\tmethod_10\tconsume\n\
    c\tb\tnet/minecraft/class_2\tnet/example/Bar\n";

enum Wrap {
    Plain,
    Gzip,
    Jar,
}

fn wrap(text: &str, how: &Wrap) -> Vec<u8> {
    match how {
        Wrap::Plain => text.as_bytes().to_vec(),
        Wrap::Gzip => gzip(text.as_bytes()).unwrap(),
        Wrap::Jar => write_archive("mappings/mappings.tiny", text.as_bytes()).unwrap(),
    }
}

#[rstest]
#[case(V1, Wrap::Plain)]
#[case(V1, Wrap::Gzip)]
#[case(V1, Wrap::Jar)]
#[case(V2, Wrap::Plain)]
#[case(V2, Wrap::Gzip)]
#[case(V2, Wrap::Jar)]
fn test_every_wrapping_reads_the_same(#[case] table: &str, #[case] how: Wrap) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mappings.bin");
    std::fs::write(&path, wrap(table, &how)).unwrap();

    let header = read_headers(&path).unwrap();
    assert_eq!(header.namespaces.len(), 3);

    let model = read_mappings(&path, "intermediary", "named").unwrap();
    assert_eq!(model.try_map_name("net/minecraft/class_1"), Some("net/example/Foo"));
    let class = model.get("net/minecraft/class_1").unwrap();
    let method = class
        .method("method_10", "(Lnet/minecraft/class_2;)V")
        .unwrap();
    assert_eq!(method.name(), Some("consume"));
    assert_eq!(class.field("field_20", Some("I")).unwrap().name(), Some("count"));
}

#[test]
fn test_detection_reports_wrapping_and_body() {
    assert_eq!(
        detect_format(&wrap(V2, &Wrap::Jar)),
        Some((Wrapping::Zip, DetectedFormat::TinyV2))
    );
    assert_eq!(
        detect_format(&wrap(V1, &Wrap::Gzip)),
        Some((Wrapping::Gzip, DetectedFormat::TinyV1))
    );
}

#[test]
fn test_enigma_archive_is_read_as_a_tree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("enigma.zip");
    let archive = write_archive(
        "net/example/Foo.mapping",
        b"CLASS a net/example/Foo\n\tMETHOD c consume (Lb;)V\n\t\tARG 1 other\n",
    )
    .unwrap();
    std::fs::write(&path, archive).unwrap();

    let model = read_mappings(&path, "official", "named").unwrap();
    let method = model.get("a").unwrap().method("c", "(Lb;)V").unwrap();
    assert_eq!(method.name(), Some("consume"));
    assert_eq!(method.arg(1), Some("other"));
}

#[test]
fn test_requesting_an_absent_namespace_fails() {
    let err = read_tiny(V2, "official", "srg").unwrap_err();
    assert!(matches!(err, MappingError::MissingNamespace { .. }));
}

#[test]
fn test_v1_content_survives_conversion_to_v2() {
    let flat = read_tiny(V1, "official", "named").unwrap();
    let nested = write_tiny(&flat, &["official", "named"], WriteMode::Everything).unwrap();
    let back = read_tiny(std::str::from_utf8(&nested).unwrap(), "official", "named").unwrap();

    assert_eq!(
        flat.classes().map(|c| (c.from.clone(), c.to().map(str::to_string))).collect::<Vec<_>>(),
        back.classes().map(|c| (c.from.clone(), c.to().map(str::to_string))).collect::<Vec<_>>()
    );
    assert_eq!(flat.member_count(), back.member_count());
}

#[test]
fn test_unrecognised_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello").unwrap();
    assert!(matches!(
        read_mappings(&path, "official", "named"),
        Err(MappingError::Unsupported(_))
    ));
}
