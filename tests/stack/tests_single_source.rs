//! Zero- and single-source runs.

use mapstack::interchange::{ParameterNames, read_mappings};
use mapstack::project::{MappingSource, MappingsStack, StackConfig, StackOutcome};
use rstest::rstest;

use crate::helpers::fixtures::{INTERMEDIARIES_1_14, NATIVE_V1, SUPPLIER_V2};
use crate::helpers::workspace::Workspace;

#[test]
fn test_zero_sources_use_intermediary_names() {
    let ws = Workspace::new();
    ws.publish_intermediaries("1.14", INTERMEDIARIES_1_14);

    let config = StackConfig::new("1.14", ws.cache_dir()).with_jar(true);
    let output = MappingsStack::new(config, ws.intermediaries()).run().unwrap();

    assert_eq!(output.outcome, StackOutcome::Duplicated);
    assert_eq!(output.run.name, "intermediary");
    assert!(!output.has_params);

    let named = read_mappings(&output.run.base, "official", "named").unwrap();
    assert_eq!(named.try_map_name("a"), Some("net/minecraft/class_1"));

    let packaged = read_mappings(&output.run.jar, "official", "named").unwrap();
    assert_eq!(packaged.try_map_name("b"), Some("net/minecraft/class_2"));
}

#[test]
fn test_gzip_supplier_is_decompressed_verbatim() {
    let ws = Workspace::new();
    let table = "v1\tofficial\tintermediary\tnamed\n\
        CLASS\ta\tnet/minecraft/class_1\tnet/example/Foo\n";
    let path = ws.gz_source("yarn.gz", table);

    let config = StackConfig::new("1.14", ws.cache_dir())
        .with_source(MappingSource::new("yarn", "1", "1.14", path));
    let output = MappingsStack::new(config, ws.intermediaries()).run().unwrap();

    assert_eq!(output.outcome, StackOutcome::Extracted);
    assert_eq!(std::fs::read_to_string(&output.run.base).unwrap(), table);
    assert!(!output.run.intermediary.exists());
}

#[rstest]
#[case::jar(false)]
#[case::gzip(true)]
fn test_v2_supplier_is_downgraded_with_params(#[case] gzipped: bool) {
    let ws = Workspace::new();
    let path = if gzipped {
        ws.gz_source("yarn.gz", SUPPLIER_V2)
    } else {
        ws.jar_source("yarn.jar", SUPPLIER_V2)
    };

    let config = StackConfig::new("1.14", ws.cache_dir())
        .with_source(MappingSource::new("yarn", "2", "1.14", path));
    let output = MappingsStack::new(config, ws.intermediaries()).run().unwrap();

    assert_eq!(output.outcome, StackOutcome::Extracted);
    assert!(output.has_params);

    let base = std::fs::read_to_string(&output.run.base).unwrap();
    assert!(base.starts_with("v1\tofficial\tintermediary\tnamed\n"));
    let named = read_mappings(&output.run.base, "official", "named").unwrap();
    assert_eq!(named.try_map_name("a"), Some("net/example/Foo"));

    let params = ParameterNames::read_from_file(&output.run.params).unwrap();
    assert_eq!(params.len(), 1);
    let (_, slots) = params.iter().next().unwrap();
    assert_eq!(slots.get(1).and_then(|s| s.as_deref()), Some("other"));
}

#[test]
fn test_second_run_reuses_artifacts() {
    let ws = Workspace::new();
    let path = ws.jar_source("yarn.jar", SUPPLIER_V2);
    let config = StackConfig::new("1.14", ws.cache_dir())
        .with_source(MappingSource::new("yarn", "2", "1.14", path));

    let stack = MappingsStack::new(config, ws.intermediaries());
    let first = stack.run().unwrap();
    let second = stack.run().unwrap();

    assert_eq!(first.outcome, StackOutcome::Extracted);
    assert_eq!(second.outcome, StackOutcome::Cached);
    assert_eq!(first.run, second.run);
    assert!(second.has_params);
}

#[test]
fn test_native_source_without_intermediaries() {
    let ws = Workspace::new();
    let path = ws.source("yarn.tiny", NATIVE_V1);

    let config = StackConfig::new("1.14", ws.cache_dir())
        .with_intermediaries(false)
        .with_source(MappingSource::new("yarn", "1", "1.14", path));
    let output = MappingsStack::new(config, ws.intermediaries()).run().unwrap();

    assert_eq!(output.outcome, StackOutcome::Merged);
    assert!(!output.run.intermediary.exists());

    let base = std::fs::read_to_string(&output.run.base).unwrap();
    assert!(base.starts_with("tiny\t2\t0\tofficial\tnamed\tintermediary\n"));
    assert!(base.contains("c\ta\tnet/example/Foo\tnet/example/Foo\n"));
    assert!(base.contains("\tm\t(Lb;)V\tc\tconsume\tconsume\n"));
}

#[test]
fn test_nothing_to_build_without_intermediaries() {
    let ws = Workspace::new();
    let config = StackConfig::new("1.14", ws.cache_dir()).with_intermediaries(false);
    assert!(MappingsStack::new(config, ws.intermediaries()).run().is_err());
}
