//! Provenance record maintenance.

use mapstack::project::{StackHistory, prepend_in_place};
use rstest::rstest;

fn block(version: u32, sources: &[&str]) -> String {
    let mut out = format!("{version}\n");
    for source in sources {
        out.push('\t');
        out.push_str(source);
        out.push('\n');
    }
    out
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(40)]
fn test_in_place_prepend_preserves_every_block(#[case] existing_blocks: u32) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stack.history");
    let existing: String = (1..=existing_blocks)
        .rev()
        .map(|v| block(v, &["yarn-1.14.4+build.1 1.14.4", "enigma-7 1.14.3"]))
        .collect();
    std::fs::write(&path, &existing).unwrap();

    let newest = block(existing_blocks + 1, &["yarn-1.14.4+build.2 1.14.4"]);
    prepend_in_place(&path, newest.as_bytes()).unwrap();

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        format!("{newest}{existing}")
    );
}

#[test]
fn test_recorded_stacks_are_found_again() {
    let dir = tempfile::tempdir().unwrap();
    let history = StackHistory::new(dir.path().join("stack.history"));
    let first = vec!["yarn-1 1.14".to_string(), "enigma-7 1.14".to_string()];
    let second = vec!["yarn-2 1.14".to_string(), "enigma-7 1.14".to_string()];

    let v1 = history.lookup(&first).unwrap();
    assert_eq!((v1.version.as_str(), v1.known), ("1", false));
    history.record(&v1.version, &first).unwrap();

    let v2 = history.lookup(&second).unwrap();
    assert_eq!((v2.version.as_str(), v2.known), ("2", false));
    history.record(&v2.version, &second).unwrap();

    let again = history.lookup(&first).unwrap();
    assert_eq!((again.version.as_str(), again.known), ("1", true));
    let latest = history.lookup(&second).unwrap();
    assert_eq!((latest.version.as_str(), latest.known), ("2", true));
}

#[test]
fn test_prefix_of_a_recorded_stack_is_new() {
    let dir = tempfile::tempdir().unwrap();
    let history = StackHistory::new(dir.path().join("stack.history"));
    history
        .record("1", &["yarn-1 1.14".to_string(), "enigma-7 1.14".to_string()])
        .unwrap();

    let found = history.lookup(&["yarn-1 1.14".to_string()]).unwrap();
    assert!(!found.known);
    assert_eq!(found.version, "2");
}
