use keytree_audit::aggregator::{build_collapsed_stacks, calculate_top_prefixes, KeyTree};
use keytree_audit::flamegraph::{generate_flamegraph, generate_text_summary, FlamegraphConfig};
use keytree_audit::utils::error::FlamegraphError;

fn sample_tree() -> KeyTree {
    let mut tree = KeyTree::default();
    for (key, bytes) in [("app:users:1", 50), ("app:users:2", 30), ("cache:page", 20)] {
        tree.record_key(key);
        tree.record_size(key, bytes);
    }
    tree
}

#[test]
fn test_collapsed_stacks_cover_all_bytes() {
    let tree = sample_tree();
    let stacks = build_collapsed_stacks(&tree);

    let total: u64 = stacks.iter().map(|s| s.weight).sum();
    assert_eq!(total, tree.total_bytes());
    assert_eq!(stacks[0].stack, "app;users;1");
    assert_eq!(stacks[0].weight, 50);
}

#[test]
fn test_generate_flamegraph_svg() {
    let stacks = build_collapsed_stacks(&sample_tree());
    let config = FlamegraphConfig::new().with_title("Test Keys").with_width(800);

    let svg = generate_flamegraph(&stacks, Some(&config)).unwrap();

    assert!(svg.contains("<svg"));
    assert!(svg.contains("Test Keys"));
    assert!(svg.contains("users"));
}

#[test]
fn test_generate_flamegraph_empty() {
    let stacks = build_collapsed_stacks(&KeyTree::default());
    assert!(stacks.is_empty());
    assert!(matches!(
        generate_flamegraph(&stacks, None),
        Err(FlamegraphError::EmptyStacks)
    ));
}

#[test]
fn test_text_summary_lists_largest_prefixes() {
    let tree = sample_tree();
    let top = calculate_top_prefixes(&tree, 3);

    let summary = generate_text_summary(&top, tree.total_bytes());

    assert!(summary.contains("LARGEST KEY PREFIXES"));
    assert!(summary.contains("app:users:*"));
    assert!(summary.contains("80.0%"));
    assert!(!summary.contains("100.0%"));
    assert!(summary.contains("Total bytes: 100"));
}
