//! Multi-source merges through the intermediary namespace.

use std::sync::Arc;

use mapstack::Name;
use mapstack::interchange::{ParameterNames, read_mappings};
use mapstack::project::{
    MappingSource, MappingsCache, MappingsStack, SourceFormat, StackConfig, StackError,
    StackOutcome,
};
use rustc_hash::FxHashMap;

use crate::helpers::fixtures::{
    ANCHORED_ENIGMA, INTERMEDIARIES_1_13, INTERMEDIARIES_1_14, NATIVE_V1,
};
use crate::helpers::workspace::Workspace;

fn two_source_config(ws: &Workspace) -> StackConfig {
    let yarn = ws.source("yarn.tiny", NATIVE_V1);
    let enigma = ws.source("tree/Foo.mapping", ANCHORED_ENIGMA);
    StackConfig::new("1.14", ws.cache_dir())
        .with_source(MappingSource::new("yarn", "1", "1.14", yarn))
        .with_source(
            MappingSource::new("enigma", "2", "1.14", enigma.parent().unwrap())
                .with_format(SourceFormat::Enigma),
        )
}

#[test]
fn test_native_and_anchored_sources_merge() {
    let ws = Workspace::new();
    ws.publish_intermediaries("1.14", INTERMEDIARIES_1_14);

    let output = MappingsStack::new(two_source_config(&ws), ws.intermediaries())
        .run()
        .unwrap();

    assert_eq!(output.outcome, StackOutcome::Merged);
    assert_eq!(output.run.name, "stack");
    assert_eq!(output.run.version, "1");
    assert_eq!(output.stats.classes, 2);
    assert_eq!(output.stats.methods, 1);
    assert_eq!(output.stats.fields, 1);
    assert_eq!(output.stats.args, 1);
    assert_eq!(output.stats.filtered, 1);

    let base = std::fs::read_to_string(&output.run.base).unwrap();
    assert!(base.starts_with("tiny\t2\t0\tofficial\tnamed\tintermediary\n"));
    // Higher-priority source wins the class name.
    assert!(base.contains("c\ta\tnet/example/Foo\tnet/minecraft/class_1\n"));
    assert!(base.contains("\tf\tI\td\tcount\tfield_20\n"));
    assert!(base.contains("\tm\t(Lb;)V\tc\tconsume\tmethod_10\n"));
    assert!(base.contains("c\tb\tnet/example/Bar\tnet/minecraft/class_2\n"));
    // Unconfirmed by the intermediaries.
    assert!(!base.contains("gone"));

    let params = ParameterNames::read_from_file(&output.run.params).unwrap();
    let slots = params.get("net/example/Foo/consume(Lb;)V").unwrap();
    assert_eq!(slots[1].as_deref(), Some("other"));

    let intermediary = read_mappings(&output.run.base, "official", "intermediary").unwrap();
    assert_eq!(intermediary.try_map_name("b"), Some("net/minecraft/class_2"));

    assert!(ws.leftovers(&output.run.dir).is_empty());
}

#[test]
fn test_history_is_recorded_and_reused() {
    let ws = Workspace::new();
    ws.publish_intermediaries("1.14", INTERMEDIARIES_1_14);

    let first = MappingsStack::new(two_source_config(&ws), ws.intermediaries())
        .run()
        .unwrap();
    let history = first.run.history.clone().unwrap();
    assert_eq!(
        std::fs::read_to_string(&history).unwrap(),
        "1\n\tyarn-1 1.14\n\tenigma-2 1.14\n"
    );

    let again = MappingsStack::new(two_source_config(&ws), ws.intermediaries())
        .run()
        .unwrap();
    assert_eq!(again.outcome, StackOutcome::Cached);
    assert!(again.run.known);
    assert_eq!(again.run.base, first.run.base);

    let mut reordered = two_source_config(&ws);
    reordered.sources.reverse();
    let other = MappingsStack::new(reordered, ws.intermediaries()).run().unwrap();
    assert_eq!(other.outcome, StackOutcome::Merged);
    assert_eq!(other.run.version, "2");
    assert!(
        std::fs::read_to_string(&history)
            .unwrap()
            .starts_with("2\n\tenigma-2 1.14\n\tyarn-1 1.14\n1\n")
    );
}

#[test]
fn test_sources_for_other_versions_use_their_own_intermediaries() {
    let ws = Workspace::new();
    ws.publish_intermediaries("1.14", INTERMEDIARIES_1_14);
    ws.publish_intermediaries("1.13", INTERMEDIARIES_1_13);

    let old = ws.source(
        "old.tiny",
        "v1\tofficial\tnamed\n\
         CLASS\tx\tnet/example/Foo\n\
         METHOD\tx\t(Ly;)V\tz\tconsume\n",
    );
    let new = ws.source("new.tiny", "v1\tofficial\tnamed\nCLASS\tb\tnet/example/Bar\n");
    let config = StackConfig::new("1.14", ws.cache_dir())
        .with_source(MappingSource::new("new", "1", "1.14", new))
        .with_source(MappingSource::new("old", "1", "1.13", old));

    let output = MappingsStack::new(config, ws.intermediaries()).run().unwrap();

    assert!(ws.version_dir("1.13").join("intermediary.tiny").exists());
    let named = read_mappings(&output.run.base, "official", "named").unwrap();
    assert_eq!(named.try_map_name("a"), Some("net/example/Foo"));
    assert_eq!(named.try_map_name("b"), Some("net/example/Bar"));
    let method = named.get("a").unwrap().method("c", "(Lb;)V").unwrap();
    assert_eq!(method.name(), Some("consume"));
}

#[test]
fn test_descriptor_lookup_fills_missing_field_descriptors() {
    let ws = Workspace::new();
    ws.publish_intermediaries("1.14", INTERMEDIARIES_1_14);
    let path = ws.source(
        "fields.tiny",
        "tiny\t2\t0\tofficial\tnamed\nc\ta\tnet/example/Foo\n\tf\t\td\tcount\n",
    );
    let config = StackConfig::new("1.14", ws.cache_dir())
        .with_source(MappingSource::new("fields", "1", "1.14", path));

    let mut descriptors: FxHashMap<String, Name> = FxHashMap::default();
    descriptors.insert("a/d".to_string(), Name::new("I"));
    let output = MappingsStack::new(config, ws.intermediaries())
        .with_descriptors(descriptors)
        .run()
        .unwrap();

    let base = std::fs::read_to_string(&output.run.base).unwrap();
    assert!(base.contains("\tf\tI\td\tcount\tfield_20\n"));
}

#[test]
fn test_shared_cache_holds_decoded_sources() {
    let ws = Workspace::new();
    ws.publish_intermediaries("1.14", INTERMEDIARIES_1_14);
    let cache = Arc::new(MappingsCache::new());

    MappingsStack::new(two_source_config(&ws), ws.intermediaries())
        .with_cache(Arc::clone(&cache))
        .run()
        .unwrap();

    assert_eq!(cache.len(), 2);
}

#[test]
fn test_inconsistent_anchored_source_is_rejected() {
    let ws = Workspace::new();
    ws.publish_intermediaries("1.14", INTERMEDIARIES_1_14);
    let tree = ws.source(
        "bad.mapping",
        "CLASS net/minecraft/class_1 net/example/Foo\nCLASS a net/example/Stale\n",
    );
    let config = StackConfig::new("1.14", ws.cache_dir()).with_source(
        MappingSource::new("bad", "1", "1.14", tree).with_format(SourceFormat::Enigma),
    );

    let err = MappingsStack::new(config, ws.intermediaries()).run().unwrap_err();
    match err {
        StackError::Consistency { kind, names } => {
            assert_eq!(kind, "class");
            assert_eq!(names, vec!["a".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let dir = ws.version_dir("1.14");
    let remaining: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(remaining, vec!["intermediary.tiny".to_string()]);
}

#[test]
fn test_missing_intermediaries_abort_the_run() {
    let ws = Workspace::new();
    let path = ws.source("yarn.tiny", NATIVE_V1);
    let config = StackConfig::new("1.14", ws.cache_dir())
        .with_source(MappingSource::new("yarn", "1", "1.14", path));

    let err = MappingsStack::new(config, ws.intermediaries()).run().unwrap_err();
    assert!(matches!(err, StackError::MissingIntermediary { .. }));
    assert!(ws.leftovers(&ws.version_dir("1.14")).is_empty());
}
