//! Compiled ignore rules and per-file rule sets.

use compact_str::CompactString;
use regex::Regex;

use projscan_core::ScanError;

use crate::glob::glob_to_regex;

/// A single compiled ignore pattern.
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    pattern: Regex,
    source: CompactString,
    is_negation: bool,
    is_directory_only: bool,
    scope_dir: CompactString,
    fast_dir: Option<CompactString>,
}

impl IgnoreRule {
    /// Compile one ignore-file line for the given scope.
    ///
    /// Returns `Ok(None)` for blank lines and comments.
    pub fn compile(line: &str, scope_dir: &str) -> Result<Option<Self>, ScanError> {
        let Some(parsed) = ParsedLine::parse(line) else {
            return Ok(None);
        };

        let invalid = |message: String| ScanError::InvalidPattern {
            pattern: line.trim().to_string(),
            message,
        };

        if parsed.body.is_empty() {
            return Err(invalid("empty pattern".to_string()));
        }

        let fast_path = parsed.directory_only
            && !parsed.negation
            && scope_dir.is_empty()
            && !parsed.body.contains('/');

        let regex = if fast_path {
            format!("^{}(?:/.*)?$", regex::escape(parsed.body))
        } else {
            glob_to_regex(parsed.body, parsed.directory_only, scope_dir)
        };

        let pattern = Regex::new(&regex).map_err(|e| invalid(e.to_string()))?;

        Ok(Some(Self {
            pattern,
            source: CompactString::new(line.trim()),
            is_negation: parsed.negation,
            is_directory_only: parsed.directory_only,
            scope_dir: CompactString::new(scope_dir),
            fast_dir: fast_path.then(|| CompactString::new(parsed.body)),
        }))
    }

    /// Check the rule against a normalized relative path.
    ///
    /// Directory-only rules never match a file path directly; files beneath a
    /// matched directory are caught through their ignored ancestor.
    pub fn matches(&self, path: &str, is_directory: bool) -> bool {
        if self.is_directory_only && !is_directory {
            return false;
        }
        self.pattern.is_match(path)
    }

    /// The compiled expression.
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// The trimmed source line.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether this is a `!` re-include rule.
    pub fn is_negation(&self) -> bool {
        self.is_negation
    }

    /// Whether the pattern ended with `/`.
    pub fn is_directory_only(&self) -> bool {
        self.is_directory_only
    }

    /// Directory of the owning ignore file ("" for the root).
    pub fn scope_dir(&self) -> &str {
        &self.scope_dir
    }

    /// The plain top-level directory name, when the rule qualifies for the
    /// O(1) lookup path.
    pub fn fast_dir(&self) -> Option<&str> {
        self.fast_dir.as_deref()
    }
}

/// A line split into its pattern body and flags.
struct ParsedLine<'a> {
    body: &'a str,
    negation: bool,
    directory_only: bool,
}

impl<'a> ParsedLine<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }

        let (negation, rest) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, trimmed),
        };

        let (directory_only, body) = match rest.strip_suffix('/') {
            Some(body) => (true, body),
            None => (false, rest),
        };

        Some(Self {
            body,
            negation,
            directory_only,
        })
    }
}

/// A line that could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternWarning {
    /// 1-based line number.
    pub line: usize,
    /// The offending line, trimmed.
    pub source: String,
    /// Why it was rejected.
    pub message: String,
}

/// The compiled rules of one ignore file.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRuleSet {
    scope_dir: CompactString,
    excludes: Vec<IgnoreRule>,
    includes: Vec<IgnoreRule>,
    warnings: Vec<PatternWarning>,
}

impl IgnoreRuleSet {
    /// Create an empty rule set for a scope.
    pub fn new(scope_dir: &str) -> Self {
        Self {
            scope_dir: CompactString::new(scope_dir),
            ..Self::default()
        }
    }

    /// Parse an ignore file's text for the given scope.
    ///
    /// Lines that fail to compile are skipped and recorded as warnings.
    pub fn parse(content: &str, scope_dir: &str) -> Self {
        let mut set = Self::new(scope_dir);
        set.extend_from(content);
        set
    }

    /// Compile more lines into this set.
    pub fn extend_from(&mut self, content: &str) {
        for (index, line) in content.lines().enumerate() {
            match IgnoreRule::compile(line, &self.scope_dir) {
                Ok(Some(rule)) => self.push(rule),
                Ok(None) => {}
                Err(err) => {
                    let message = match &err {
                        ScanError::InvalidPattern { message, .. } => message.clone(),
                        other => other.to_string(),
                    };
                    tracing::warn!(
                        scope = %self.scope_dir,
                        line = index + 1,
                        "Skipping ignore pattern `{}`: {}",
                        line.trim(),
                        message
                    );
                    self.warnings.push(PatternWarning {
                        line: index + 1,
                        source: line.trim().to_string(),
                        message,
                    });
                }
            }
        }
    }

    /// Add a compiled rule to the matching partition.
    pub fn push(&mut self, rule: IgnoreRule) {
        if rule.is_negation() {
            self.includes.push(rule);
        } else {
            self.excludes.push(rule);
        }
    }

    /// Directory of the ignore file ("" for the root).
    pub fn scope_dir(&self) -> &str {
        &self.scope_dir
    }

    /// Exclusion rules in source order.
    pub fn excludes(&self) -> &[IgnoreRule] {
        &self.excludes
    }

    /// Negation rules in source order.
    pub fn includes(&self) -> &[IgnoreRule] {
        &self.includes
    }

    /// Names registered for the top-level fast path.
    pub fn fast_dirs(&self) -> impl Iterator<Item = &str> {
        self.excludes.iter().filter_map(IgnoreRule::fast_dir)
    }

    /// Lines that could not be compiled.
    pub fn warnings(&self) -> &[PatternWarning] {
        &self.warnings
    }

    /// Total number of compiled rules.
    pub fn len(&self) -> usize {
        self.excludes.len() + self.includes.len()
    }

    /// Check if the set holds no rules.
    pub fn is_empty(&self) -> bool {
        self.excludes.is_empty() && self.includes.is_empty()
    }

    /// First negation rule matching the path.
    pub fn find_include(&self, path: &str, is_directory: bool) -> Option<&IgnoreRule> {
        self.includes.iter().find(|r| r.matches(path, is_directory))
    }

    /// First exclusion rule matching the path.
    pub fn find_exclude(&self, path: &str, is_directory: bool) -> Option<&IgnoreRule> {
        self.excludes.iter().find(|r| r.matches(path, is_directory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_comment_lines_skipped() {
        let set = IgnoreRuleSet::parse("\n# comment\n   \n  # indented comment\n", "");
        assert!(set.is_empty());
        assert!(set.warnings().is_empty());
    }

    #[test]
    fn test_partition_by_negation() {
        let set = IgnoreRuleSet::parse("*.log\n!keep.log\ntarget/\n", "");
        assert_eq!(set.excludes().len(), 2);
        assert_eq!(set.includes().len(), 1);
        assert!(set.includes()[0].is_negation());
        assert_eq!(set.includes()[0].source(), "!keep.log");
    }

    #[test]
    fn test_crlf_lines() {
        let set = IgnoreRuleSet::parse("a.txt\r\nb.txt\r\n", "");
        assert_eq!(set.len(), 2);
        assert!(set.find_exclude("b.txt", false).is_some());
    }

    #[test]
    fn test_fast_path_registration() {
        let set = IgnoreRuleSet::parse("build/\n.gradle/\nsrc/gen/\n!keep/\nplain\n", "");
        let fast: Vec<&str> = set.fast_dirs().collect();
        assert_eq!(fast, vec!["build", ".gradle"]);

        // The fast rule is still a regular exclusion.
        let build = set.find_exclude("build/out.txt", true).unwrap();
        assert_eq!(build.fast_dir(), Some("build"));
    }

    #[test]
    fn test_nested_scope_never_fast() {
        let set = IgnoreRuleSet::parse("build/\n", "sub");
        assert_eq!(set.fast_dirs().count(), 0);
        assert!(set.find_exclude("sub/build", true).is_some());
        assert!(set.find_exclude("build", true).is_none());
    }

    #[test]
    fn test_fast_path_regex_is_top_level_only() {
        let rule = IgnoreRule::compile("build/", "").unwrap().unwrap();
        assert!(rule.matches("build", true));
        assert!(rule.matches("build/out", true));
        assert!(!rule.matches("src/build", true));
    }

    #[test]
    fn test_directory_only_rule_skips_files() {
        let rule = IgnoreRule::compile("cache/", "").unwrap().unwrap();
        assert!(rule.matches("cache", true));
        assert!(!rule.matches("cache", false));
    }

    #[test]
    fn test_negation_with_spaces() {
        let rule = IgnoreRule::compile("!  important.log", "").unwrap().unwrap();
        assert!(rule.is_negation());
        assert!(rule.matches("important.log", false));
    }

    #[test]
    fn test_malformed_line_becomes_warning() {
        let set = IgnoreRuleSet::parse("ok.txt\n[z-a].txt\n!\nalso-ok\n", "");
        assert_eq!(set.len(), 2);
        assert_eq!(set.warnings().len(), 2);
        assert_eq!(set.warnings()[0].line, 2);
        assert_eq!(set.warnings()[1].message, "empty pattern");
    }

    #[test]
    fn test_duplicate_patterns_kept() {
        let set = IgnoreRuleSet::parse("*.tmp\n*.tmp\n", "");
        assert_eq!(set.excludes().len(), 2);
    }

    #[test]
    fn test_rule_scope_recorded() {
        let set = IgnoreRuleSet::parse("*.o\n", "native/lib");
        assert_eq!(set.scope_dir(), "native/lib");
        assert_eq!(set.excludes()[0].scope_dir(), "native/lib");
        assert!(set.find_exclude("native/lib/x/a.o", false).is_some());
        assert!(set.find_exclude("a.o", false).is_none());
    }
}
