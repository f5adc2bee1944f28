// src/probe/matcher.rs

//! Strategies for deciding whether a process invocation "is" a managed
//! command line.

use std::fmt::Debug;

use regex::Regex;

use crate::types::MatcherKind;

/// Compares a managed command line against one process invocation (the full
/// argument string as reported by the process table).
pub trait LivenessMatcher: Send + Sync + Debug {
    fn matches(&self, command_line: &str, invocation: &str) -> bool;
}

/// Invocation contains the command line.
///
/// Cheap and close to what users expect, but a command line that is a
/// substring of an unrelated invocation (or of another managed entry) counts
/// as alive.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl LivenessMatcher for SubstringMatcher {
    fn matches(&self, command_line: &str, invocation: &str) -> bool {
        let needle = command_line.trim();
        !needle.is_empty() && invocation.contains(needle)
    }
}

/// Command line used as a regular expression against the invocation.
///
/// Same semantics as `pgrep -f`. A command line that is not a valid pattern
/// is matched literally.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexMatcher;

impl LivenessMatcher for RegexMatcher {
    fn matches(&self, command_line: &str, invocation: &str) -> bool {
        let pattern = command_line.trim();
        if pattern.is_empty() {
            return false;
        }
        match Regex::new(pattern) {
            Ok(re) => re.is_match(invocation),
            Err(_) => invocation.contains(pattern),
        }
    }
}

/// Trimmed invocation equals the trimmed command line.
///
/// Misses commands that the shell keeps wrapped (`sh -c ...`), so only use it
/// for command lines the shell execs directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl LivenessMatcher for ExactMatcher {
    fn matches(&self, command_line: &str, invocation: &str) -> bool {
        let command_line = command_line.trim();
        !command_line.is_empty() && invocation.trim() == command_line
    }
}

impl MatcherKind {
    pub fn build(self) -> Box<dyn LivenessMatcher> {
        match self {
            MatcherKind::Substring => Box::new(SubstringMatcher),
            MatcherKind::Regex => Box::new(RegexMatcher),
            MatcherKind::Exact => Box::new(ExactMatcher),
        }
    }
}
