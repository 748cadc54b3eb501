//! Gitignore-compatible rule engine for projscan.
//!
//! Ignore files are compiled into regular expressions once per scan and then
//! queried for every entry the walker meets.
//!
//! - [`glob_to_regex`] translates a single pattern, independent of any file
//! - [`IgnoreRuleSet`] compiles one ignore file's text for a given scope
//! - [`IgnoreEngine`] combines the root rule set with every nested one and
//!   answers [`should_ignore`](IgnoreEngine::should_ignore)
//!
//! # Example
//!
//! ```rust
//! use projscan_ignore::IgnoreEngine;
//!
//! let engine = IgnoreEngine::from_root_content("*.log\nbuild/\n")
//!     .with_nested("sub", "!important.log\n");
//!
//! assert!(engine.should_ignore("build/out.txt", false));
//! assert!(engine.should_ignore("other.log", false));
//! assert!(!engine.should_ignore("sub/important.log", false));
//! ```

mod engine;
mod glob;
mod rule;

pub use engine::{IgnoreEngine, Match};
pub use glob::glob_to_regex;
pub use rule::{IgnoreRule, IgnoreRuleSet, PatternWarning};
