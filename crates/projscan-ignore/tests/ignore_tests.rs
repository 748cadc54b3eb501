use projscan_core::{MemoryTree, WarningKind};
use projscan_ignore::{IgnoreEngine, Match};

#[test]
fn test_no_ignore_file_ignores_nothing() {
    let tree = MemoryTree::new("/project").with_file("src/Main.java", "");
    let engine = IgnoreEngine::load(&tree, ".gitignore");

    assert!(!engine.should_ignore("src/Main.java", false));
    assert!(!engine.should_ignore("build", true));
    assert!(engine.warnings().is_empty());
}

#[test]
fn test_directory_pattern_covers_contents() {
    let engine = IgnoreEngine::from_root_content("build/\n");

    assert!(engine.should_ignore("build", true));
    assert!(engine.should_ignore("build/output.jar", false));
    assert!(engine.should_ignore("build/classes/Main.class", false));
    assert!(engine.should_ignore("build/a/b/c/d.txt", false));
}

#[test]
fn test_multiple_directory_patterns() {
    let engine = IgnoreEngine::from_root_content("build/\n.gradle/\nout/\n");

    assert!(engine.should_ignore("build", true));
    assert!(engine.should_ignore(".gradle", true));
    assert!(engine.should_ignore("out", true));
    assert!(!engine.should_ignore("src", true));
}

#[test]
fn test_hidden_directory_pattern() {
    let engine = IgnoreEngine::from_root_content(".idea/\n");

    assert!(engine.should_ignore(".idea", true));
    assert!(engine.should_ignore(".idea/workspace.xml", false));
}

#[test]
fn test_comments_and_blank_lines() {
    let engine = IgnoreEngine::from_root_content("# This is a comment\n\n\nbuild/\n\n");

    assert!(engine.should_ignore("build", true));
    assert!(!engine.should_ignore("src", true));
    assert_eq!(engine.rule_count(), 1);
}

#[test]
fn test_leading_slash_in_query() {
    let engine = IgnoreEngine::from_root_content("build/\n");

    assert!(engine.should_ignore("/build", true));
    assert!(engine.should_ignore("/build/output.jar", false));
}

#[test]
fn test_unrelated_paths_not_ignored() {
    let engine = IgnoreEngine::from_root_content("build/\n.gradle/\n");

    assert!(!engine.should_ignore("src/Main.java", false));
    assert!(!engine.should_ignore("README.md", false));
    assert!(!engine.should_ignore("lib", true));
}

#[test]
fn test_negation_reincludes_file() {
    let engine = IgnoreEngine::from_root_content("src/*.log\n!src/important.log\n");

    assert!(!engine.should_ignore("src/important.log", false));
    assert!(engine.should_ignore("src/debug.log", false));
    assert!(engine.should_ignore("src/error.log", false));
}

#[test]
fn test_negated_subdirectory_stays_under_ignored_parent() {
    let engine = IgnoreEngine::from_root_content("build/\n!build/reports/\n");

    assert!(engine.should_ignore("build", true));
    assert!(engine.should_ignore("build/classes", true));
    assert!(engine.should_ignore("build/reports", true));
}

#[test]
fn test_ignored_ancestor_wins_over_file_negation() {
    let engine = IgnoreEngine::from_root_content("build/\n");
    assert!(engine.should_ignore("build/out.txt", false));

    let engine = IgnoreEngine::from_root_content("build/\n!build/out.txt\n");
    assert!(engine.should_ignore("build/out.txt", false));
    assert!(engine.should_ignore_by_rules("build/out.txt", false));
}

#[test]
fn test_top_level_negation_lifts_ancestor_exclusion() {
    let engine = IgnoreEngine::from_root_content("build/\n!build/\n");

    assert!(!engine.should_ignore("build", true));
    assert!(!engine.should_ignore("build/out.txt", false));
    assert_eq!(engine.fast_excluded_dirs().count(), 0);
}

#[test]
fn test_nested_scope_negation() {
    let engine =
        IgnoreEngine::from_root_content("*.log\n").with_nested("sub", "!important.log\n");

    assert!(!engine.should_ignore("sub/important.log", false));
    assert!(!engine.should_ignore("sub/deeper/important.log", false));
    assert!(engine.should_ignore("sub/other.log", false));
    assert!(engine.should_ignore("other.log", false));
    assert!(engine.should_ignore("lib/x/other.log", false));
    assert!(engine.should_ignore("important.log", false));
}

#[test]
fn test_nested_scope_exclusion_is_local() {
    let engine = IgnoreEngine::empty().with_nested("web", "dist/\n*.map\n");

    assert!(engine.should_ignore("web/dist", true));
    assert!(engine.should_ignore("web/dist/app.js", false));
    assert!(engine.should_ignore("web/src/app.js.map", false));
    assert!(!engine.should_ignore("dist", true));
    assert!(!engine.should_ignore("api/app.js.map", false));
}

#[test]
fn test_deeper_scope_overrides_shallower() {
    let engine = IgnoreEngine::empty()
        .with_nested("a", "*.gen\n")
        .with_nested("a/b", "!keep.gen\n");

    assert!(engine.should_ignore("a/x.gen", false));
    assert!(engine.should_ignore("a/b/x.gen", false));
    assert!(!engine.should_ignore("a/b/keep.gen", false));
    assert!(engine.should_ignore("a/keep.gen", false));
}

#[test]
fn test_nested_negation_cannot_lift_ignored_ancestor() {
    let engine = IgnoreEngine::from_root_content("vendor/\n")
        .with_nested("vendor/lib", "!*.rs\n");

    assert!(engine.should_ignore("vendor/lib/a.rs", false));
    match engine.explain("vendor/lib/a.rs", false) {
        Some(Match::FastPath { dir }) => assert_eq!(dir, "vendor"),
        other => panic!("unexpected match: {other:?}"),
    }
}

#[test]
fn test_fast_path_agrees_with_rules() {
    let engine = IgnoreEngine::from_root_content(
        "build/\nnode_modules/\n.gradle/\ntarget/\n!target/\nout/\n*.log\n!keep.log\nsrc/gen/\n/dist\ncache/\n!cache/\n",
    )
    .with_nested("pkg", "build/\n!out/\n")
    .with_nested("docs", "!*.log\n");

    let names = [
        "build", "node_modules", ".gradle", "target", "out", "dist", "cache", "src", "pkg",
        "docs", "buildx", "keep.log",
    ];
    let tails = [
        "", "/a.txt", "/deep/x.log", "/keep.log", "/gen", "/gen/a.rs", "/build", "/out/x",
        "/node_modules/y",
    ];

    let mut checked = 0;
    for name in names {
        for tail in tails {
            let path = format!("{name}{tail}");
            for is_dir in [false, true] {
                assert_eq!(
                    engine.should_ignore(&path, is_dir),
                    engine.should_ignore_by_rules(&path, is_dir),
                    "fast path disagrees for {path} (dir: {is_dir})"
                );
                checked += 1;
            }
        }
    }
    assert_eq!(checked, names.len() * tails.len() * 2);

    let mut fast: Vec<&str> = engine.fast_excluded_dirs().collect();
    fast.sort();
    assert_eq!(fast, vec![".gradle", "build", "node_modules", "out"]);
}

#[test]
fn test_load_from_source() {
    let tree = MemoryTree::new("/project")
        .with_file(".gitignore", "target/\n*.log\n")
        .with_file("app/.gitignore", "!debug.log\ngenerated/\n")
        .with_file("app/src/main.rs", "")
        .with_file("app/debug.log", "")
        .with_file("trace.log", "");

    let engine = IgnoreEngine::load(&tree, ".gitignore");

    assert_eq!(engine.rule_count(), 4);
    let scopes: Vec<&str> = engine.nested_rules().map(|(scope, _)| scope).collect();
    assert_eq!(scopes, vec!["app"]);

    assert!(engine.should_ignore("target/debug/app", false));
    assert!(engine.should_ignore("trace.log", false));
    assert!(!engine.should_ignore("app/debug.log", false));
    assert!(engine.should_ignore("app/generated", true));
    assert!(!engine.should_ignore("app/src/main.rs", false));
}

#[test]
fn test_load_with_custom_file_name() {
    let tree = MemoryTree::new("/project")
        .with_file(".gitignore", "a.txt\n")
        .with_file(".scanignore", "b.txt\n");

    let engine = IgnoreEngine::load(&tree, ".scanignore");

    assert!(!engine.should_ignore("a.txt", false));
    assert!(engine.should_ignore("b.txt", false));
}

#[test]
fn test_load_records_pattern_warnings() {
    let tree = MemoryTree::new("/project")
        .with_file(".gitignore", "ok.txt\n[z-a]\n")
        .with_file("sub/.gitignore", "!\n");

    let engine = IgnoreEngine::load(&tree, ".gitignore");

    assert_eq!(engine.rule_count(), 1);
    assert_eq!(engine.warnings().len(), 2);
    assert!(engine.warnings().iter().all(|w| w.kind == WarningKind::Pattern));
    assert!(engine.should_ignore("ok.txt", false));
}

#[test]
fn test_unreadable_ignore_file_is_a_warning() {
    // A directory named like the ignore file cannot be read as text.
    let tree = MemoryTree::new("/project")
        .with_dir(".gitignore")
        .with_file("src/a.rs", "");

    let engine = IgnoreEngine::load(&tree, ".gitignore");

    assert_eq!(engine.rule_count(), 0);
    assert_eq!(engine.warnings().len(), 1);
    assert_eq!(engine.warnings()[0].kind, WarningKind::IgnoreFile);
}

#[test]
fn test_explain_display() {
    let engine = IgnoreEngine::from_root_content("*.log\n").with_nested("sub", "tmp/\n");

    let m = engine.explain("a/b.log", false).unwrap();
    assert!(m.is_ignored());
    assert_eq!(m.to_string(), "excluded by `*.log` (root)");

    let m = engine.explain("sub/tmp/x", false).unwrap();
    assert_eq!(m.to_string(), "ancestor `sub/tmp` excluded by `tmp/` (sub)");
}
