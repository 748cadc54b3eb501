//! Multi-scope ignore decisions.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use compact_str::CompactString;
use indexmap::IndexMap;

use projscan_core::{ScanSource, ScanWarning, relative_path};

use crate::rule::{IgnoreRule, IgnoreRuleSet};

/// Combines the root ignore file with every nested one.
///
/// The engine is immutable once built and is rebuilt for every scan that
/// actually walks the tree.
#[derive(Debug, Clone, Default)]
pub struct IgnoreEngine {
    root: IgnoreRuleSet,
    nested: IndexMap<CompactString, IgnoreRuleSet>,
    fast_excluded_top_level_dirs: HashSet<CompactString>,
    warnings: Vec<ScanWarning>,
}

/// The rule that decided an ignore query.
#[derive(Debug, Clone)]
pub enum Match<'a> {
    /// A top-level directory excluded through the O(1) lookup.
    FastPath { dir: &'a str },
    /// An ancestor directory is ignored, hiding everything beneath it.
    Ancestor { ancestor: String, rule: &'a IgnoreRule },
    /// The path itself matches an exclusion.
    Excluded(&'a IgnoreRule),
    /// The path itself matches a negation.
    Included(&'a IgnoreRule),
}

impl Match<'_> {
    /// Whether this match makes the path ignored.
    pub fn is_ignored(&self) -> bool {
        !matches!(self, Match::Included(_))
    }
}

impl fmt::Display for Match<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Match::FastPath { dir } => write!(f, "top-level directory `{dir}/`"),
            Match::Ancestor { ancestor, rule } => write!(
                f,
                "ancestor `{ancestor}` excluded by `{}` ({})",
                rule.source(),
                scope_label(rule.scope_dir())
            ),
            Match::Excluded(rule) => write!(
                f,
                "excluded by `{}` ({})",
                rule.source(),
                scope_label(rule.scope_dir())
            ),
            Match::Included(rule) => write!(
                f,
                "re-included by `{}` ({})",
                rule.source(),
                scope_label(rule.scope_dir())
            ),
        }
    }
}

fn scope_label(scope: &str) -> Cow<'_, str> {
    if scope.is_empty() {
        Cow::Borrowed("root")
    } else {
        Cow::Borrowed(scope)
    }
}

impl IgnoreEngine {
    /// An engine that ignores nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an engine from root ignore file text alone.
    pub fn from_root_content(content: &str) -> Self {
        Self::empty().with_root(content)
    }

    /// Add root-scoped rules.
    #[must_use]
    pub fn with_root(mut self, content: &str) -> Self {
        self.add_rules("", content, Path::new(".gitignore"));
        self.refresh_fast_path();
        self
    }

    /// Add rules from an ignore file living in `scope_dir`.
    #[must_use]
    pub fn with_nested(mut self, scope_dir: &str, content: &str) -> Self {
        let scope = normalize(scope_dir);
        let origin = Path::new(scope.as_ref()).join(".gitignore");
        self.add_rules(&scope, content, &origin);
        self.refresh_fast_path();
        self
    }

    /// Load every ignore file named `file_name` from a source.
    ///
    /// A missing root file yields an empty root rule set. Ignore files that
    /// cannot be read and patterns that fail to compile are skipped and kept
    /// as [`warnings`](IgnoreEngine::warnings).
    pub fn load(source: &dyn ScanSource, file_name: &str) -> Self {
        let root = source.root();
        let mut engine = Self::empty();

        let root_file = root.join(file_name);
        match source.read_to_string(&root_file) {
            Ok(content) => engine.add_rules("", &content, &root_file),
            Err(err) if err.is_not_found() => {
                tracing::debug!(root = %root.display(), "No root ignore file");
            }
            Err(err) => {
                tracing::warn!(path = %root_file.display(), "Failed to read ignore file: {err}");
                engine.warnings.push(ScanWarning::ignore_file(&root_file, &err));
            }
        }

        for path in source.ignore_files(file_name) {
            let Some(scope) = path.parent().and_then(|dir| relative_path(root, dir)) else {
                continue;
            };
            if scope.is_empty() {
                continue;
            }

            match source.read_to_string(&path) {
                Ok(content) => engine.add_rules(&scope, &content, &path),
                Err(err) => {
                    tracing::warn!(path = %path.display(), "Failed to read ignore file: {err}");
                    engine.warnings.push(ScanWarning::ignore_file(&path, &err));
                }
            }
        }

        engine.refresh_fast_path();

        tracing::debug!(
            root = %root.display(),
            rules = engine.rule_count(),
            scopes = engine.nested.len(),
            fast = engine.fast_excluded_top_level_dirs.len(),
            "Loaded ignore rules"
        );

        engine
    }

    fn add_rules(&mut self, scope: &str, content: &str, origin: &Path) {
        let new_warnings: Vec<ScanWarning> = {
            let set = if scope.is_empty() {
                &mut self.root
            } else {
                self.nested
                    .entry(CompactString::new(scope))
                    .or_insert_with(|| IgnoreRuleSet::new(scope))
            };
            let before = set.warnings().len();
            set.extend_from(content);
            set.warnings()[before..]
                .iter()
                .map(|w| ScanWarning::pattern(origin, w.line, &w.source, &w.message))
                .collect()
        };
        self.warnings.extend(new_warnings);
    }

    /// Rebuild the fast-path set from the root rules.
    ///
    /// A name is dropped when a root negation matches it, so that the lookup
    /// and the full rule evaluation always agree.
    fn refresh_fast_path(&mut self) {
        let root = &self.root;
        self.fast_excluded_top_level_dirs = root
            .fast_dirs()
            .filter(|name| root.find_include(name, true).is_none())
            .map(CompactString::new)
            .collect();
    }

    /// Decide whether a root-relative path is ignored.
    ///
    /// An ignored ancestor hides everything beneath it, whatever deeper
    /// negations say. Otherwise the most specific scope with a matching rule
    /// decides, negations first within a scope.
    pub fn should_ignore(&self, path: &str, is_directory: bool) -> bool {
        let path = normalize(path);
        if path.is_empty() {
            return false;
        }
        if self.fast_match(&path, is_directory).is_some() {
            return true;
        }
        self.ignored_by_rules(&path, is_directory)
    }

    /// [`should_ignore`](IgnoreEngine::should_ignore) without the top-level
    /// lookup table.
    pub fn should_ignore_by_rules(&self, path: &str, is_directory: bool) -> bool {
        let path = normalize(path);
        if path.is_empty() {
            return false;
        }
        self.ignored_by_rules(&path, is_directory)
    }

    /// Report which rule decided a path, if any.
    pub fn explain(&self, path: &str, is_directory: bool) -> Option<Match<'_>> {
        let path = normalize(path);
        if path.is_empty() {
            return None;
        }
        if let Some(dir) = self.fast_match(&path, is_directory) {
            return Some(Match::FastPath { dir });
        }
        for ancestor in ancestors(&path) {
            if let Some((true, rule)) = self.decide(ancestor, true) {
                return Some(Match::Ancestor {
                    ancestor: ancestor.to_string(),
                    rule,
                });
            }
        }
        self.decide(&path, is_directory).map(|(ignored, rule)| {
            if ignored {
                Match::Excluded(rule)
            } else {
                Match::Included(rule)
            }
        })
    }

    fn fast_match(&self, path: &str, is_directory: bool) -> Option<&str> {
        let top = match path.split_once('/') {
            Some((top, _)) => top,
            None if is_directory => path,
            None => return None,
        };
        self.fast_excluded_top_level_dirs
            .get(top)
            .map(CompactString::as_str)
    }

    fn ignored_by_rules(&self, path: &str, is_directory: bool) -> bool {
        ancestors(path).any(|a| matches!(self.decide(a, true), Some((true, _))))
            || matches!(self.decide(path, is_directory), Some((true, _)))
    }

    /// Evaluate a single path against the rules, ignoring its ancestors.
    fn decide(&self, path: &str, is_directory: bool) -> Option<(bool, &IgnoreRule)> {
        for scope in ancestors(path) {
            let Some(set) = self.nested.get(scope) else {
                continue;
            };
            if let Some(rule) = set.find_include(path, is_directory) {
                return Some((false, rule));
            }
            if let Some(rule) = set.find_exclude(path, is_directory) {
                return Some((true, rule));
            }
        }

        if let Some(rule) = self.root.find_include(path, is_directory) {
            return Some((false, rule));
        }
        self.root
            .find_exclude(path, is_directory)
            .map(|rule| (true, rule))
    }

    /// Rules from the root ignore file.
    pub fn root_rules(&self) -> &IgnoreRuleSet {
        &self.root
    }

    /// Rules from nested ignore files, keyed by directory.
    pub fn nested_rules(&self) -> impl Iterator<Item = (&str, &IgnoreRuleSet)> {
        self.nested.iter().map(|(scope, set)| (scope.as_str(), set))
    }

    /// Top-level directory names answered without regex evaluation.
    pub fn fast_excluded_dirs(&self) -> impl Iterator<Item = &str> {
        self.fast_excluded_top_level_dirs.iter().map(CompactString::as_str)
    }

    /// Total number of compiled rules across all scopes.
    pub fn rule_count(&self) -> usize {
        self.root.len() + self.nested.values().map(IgnoreRuleSet::len).sum::<usize>()
    }

    /// Unreadable ignore files and skipped patterns.
    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }
}

/// Strip leading and trailing separators and use `/` throughout.
fn normalize(path: &str) -> Cow<'_, str> {
    if path.contains('\\') {
        Cow::Owned(path.replace('\\', "/").trim_matches('/').to_string())
    } else {
        Cow::Borrowed(path.trim_matches('/'))
    }
}

/// Proper ancestors of a relative path, deepest first.
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.rmatch_indices('/').map(move |(i, _)| &path[..i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestors_deepest_first() {
        let found: Vec<&str> = ancestors("a/b/c/d.txt").collect();
        assert_eq!(found, vec!["a/b/c", "a/b", "a"]);
        assert_eq!(ancestors("top").count(), 0);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/build/out"), "build/out");
        assert_eq!(normalize("build/"), "build");
        assert_eq!(normalize("a\\b\\c"), "a/b/c");
    }

    #[test]
    fn test_empty_engine_ignores_nothing() {
        let engine = IgnoreEngine::empty();
        assert!(!engine.should_ignore("src/Main.java", false));
        assert!(!engine.should_ignore("build", true));
        assert_eq!(engine.rule_count(), 0);
    }

    #[test]
    fn test_empty_path_never_ignored() {
        let engine = IgnoreEngine::from_root_content("*\n");
        assert!(!engine.should_ignore("", false));
        assert!(!engine.should_ignore("/", true));
    }

    #[test]
    fn test_fast_path_set() {
        let engine = IgnoreEngine::from_root_content("build/\ntarget/\n*.log\n");
        let mut fast: Vec<&str> = engine.fast_excluded_dirs().collect();
        fast.sort();
        assert_eq!(fast, vec!["build", "target"]);
    }

    #[test]
    fn test_fast_path_dropped_when_negated() {
        let engine = IgnoreEngine::from_root_content("build/\n!build/\n");
        assert_eq!(engine.fast_excluded_dirs().count(), 0);
        assert!(!engine.should_ignore("build", true));
        assert!(!engine.should_ignore("build/out.txt", false));
    }

    #[test]
    fn test_fast_path_bare_file_not_matched() {
        let engine = IgnoreEngine::from_root_content("build/\n");
        assert!(engine.should_ignore("build", true));
        assert!(!engine.should_ignore("build", false));
        assert!(!engine.should_ignore_by_rules("build", false));
    }

    #[test]
    fn test_explain_reports_deciding_rule() {
        let engine = IgnoreEngine::from_root_content("out/\n*.log\n!keep.log\n")
            .with_nested("pkg", "gen/\n");

        assert!(matches!(
            engine.explain("out/a.txt", false),
            Some(Match::FastPath { dir: "out" })
        ));

        match engine.explain("pkg/gen/a.rs", false) {
            Some(Match::Ancestor { ancestor, rule }) => {
                assert_eq!(ancestor, "pkg/gen");
                assert_eq!(rule.scope_dir(), "pkg");
            }
            other => panic!("unexpected match: {other:?}"),
        }

        let included = engine.explain("keep.log", false).unwrap();
        assert!(!included.is_ignored());
        assert_eq!(included.to_string(), "re-included by `!keep.log` (root)");

        assert!(engine.explain("src/main.rs", false).is_none());
    }

    #[test]
    fn test_with_nested_normalizes_scope() {
        let engine = IgnoreEngine::empty().with_nested("/sub/", "*.tmp\n");
        let scopes: Vec<&str> = engine.nested_rules().map(|(s, _)| s).collect();
        assert_eq!(scopes, vec!["sub"]);
        assert!(engine.should_ignore("sub/a.tmp", false));
        assert!(!engine.should_ignore("a.tmp", false));
    }

    #[test]
    fn test_pattern_warnings_collected() {
        let engine = IgnoreEngine::from_root_content("[z-a]\nok\n");
        assert_eq!(engine.warnings().len(), 1);
        assert_eq!(engine.rule_count(), 1);
    }
}
