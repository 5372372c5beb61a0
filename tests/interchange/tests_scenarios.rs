//! Stacking scenarios driven through the public model API.

use mapstack::interchange::{
    CombinedMappings, InvertScope, MergeFilter, ParameterNames, duplicate_column, read_tiny,
    read_v1,
};

const INTERMEDIARIES: &str = "v1\tofficial\tintermediary\n\
    CLASS\ta\tnet/minecraft/class_1\n\
    CLASS\tb\tnet/minecraft/class_2\n\
    METHOD\ta\t(Lb;)V\tc\tmethod_10\n\
    FIELD\ta\tI\td\tfield_20\n";

const PRIMARY: &str = "tiny\t2\t0\tofficial\tnamed\n\
    c\ta\tnet/example/Foo\n\
    \tm\t(Lb;)V\tc\tconsume\n\
    \t\tp\t1\t\tother\n";

const SECONDARY: &str = "v1\tofficial\tnamed\n\
    CLASS\ta\tnet/example/Ignored\n\
    CLASS\tb\tnet/example/Bar\n\
    CLASS\tz\tnet/example/Stray\n\
    FIELD\ta\tI\td\tcount\n";

#[test]
fn test_two_sources_stack_over_intermediaries() {
    let intermediaries = read_v1(INTERMEDIARIES, "official", "intermediary").unwrap();
    let mut accumulator = read_tiny(PRIMARY, "official", "named").unwrap();

    let secondary = read_tiny(SECONDARY, "official", "named").unwrap();
    let stats = accumulator.merge(&secondary, Some(MergeFilter::new(&intermediaries)));

    // `a` is already named, `z` is unknown to the intermediaries.
    assert_eq!(stats.classes, 1);
    assert_eq!(stats.fields, 1);
    assert_eq!(stats.filtered, 1);
    assert_eq!(accumulator.try_map_name("a"), Some("net/example/Foo"));
    assert!(!accumulator.contains_class("z"));

    let view = CombinedMappings::new(&accumulator, &intermediaries);
    let tiers: Vec<_> = view.classes().map(|c| (c.from, c.to, c.fallback)).collect();
    assert_eq!(
        tiers,
        vec![
            ("a", "net/example/Foo", "net/minecraft/class_1"),
            ("b", "net/example/Bar", "net/minecraft/class_2"),
        ]
    );

    let params = ParameterNames::from_combined(view);
    assert_eq!(params.render(), "net/example/Foo/consume(Lb;)V\n\t1: other\n");
}

#[test]
fn test_unmapped_entries_fall_back_to_intermediaries() {
    let intermediaries = read_v1(INTERMEDIARIES, "official", "intermediary").unwrap();
    let accumulator = read_tiny(SECONDARY, "official", "named").unwrap();

    let view = CombinedMappings::new(&accumulator, &intermediaries);
    let method = view
        .methods()
        .find(|(class, _)| class.from == "a")
        .map(|(_, method)| method)
        .unwrap();

    assert_eq!(method.from, "c");
    assert_eq!(method.to, "c");
    assert_eq!(method.fallback, "method_10");
}

#[test]
fn test_named_source_rekeyed_onto_intermediaries() {
    let intermediaries = read_v1(INTERMEDIARIES, "official", "intermediary").unwrap();
    let named = read_tiny(PRIMARY, "official", "named").unwrap();

    let rekeyed = named.rename_through(&intermediaries);
    let class = rekeyed.get("net/minecraft/class_1").unwrap();
    assert_eq!(class.to(), Some("net/example/Foo"));

    let method = class
        .method("method_10", "(Lnet/minecraft/class_2;)V")
        .unwrap();
    assert_eq!(method.name(), Some("consume"));

    let inverted = intermediaries.invert(InvertScope::Members);
    assert_eq!(inverted.try_map_name("net/minecraft/class_2"), Some("b"));
}

#[test]
fn test_column_duplication_feeds_a_three_column_reader() {
    let widened = duplicate_column(INTERMEDIARIES, "intermediary", "named").unwrap();
    assert!(widened.starts_with("v1\tofficial\tintermediary\tnamed\n"));

    let model = read_v1(&widened, "official", "named").unwrap();
    assert_eq!(model.try_map_name("a"), Some("net/minecraft/class_1"));
}

#[test]
fn test_side_file_survives_a_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params");

    let mut params = ParameterNames::new();
    params.insert("Foo/run()V", 2, "flag");
    params.insert("Foo/run()V", 2, "ignored");
    params.write_to_file(&path).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "Foo/run()V\n\t2: flag\n");
    assert_eq!(ParameterNames::read_from_file(&path).unwrap(), params);
}
