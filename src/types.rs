use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How a managed command line is compared against the invocations found in
/// the process table.
///
/// - `Substring`: the invocation contains the command line (default).
/// - `Regex`: the command line is used as a regular expression, the way
///   `pgrep -f` treats its pattern.
/// - `Exact`: the trimmed invocation equals the trimmed command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    Substring,
    Regex,
    Exact,
}

impl Default for MatcherKind {
    fn default() -> Self {
        MatcherKind::Substring
    }
}

impl FromStr for MatcherKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "substring" => Ok(MatcherKind::Substring),
            "regex" => Ok(MatcherKind::Regex),
            "exact" => Ok(MatcherKind::Exact),
            other => Err(format!(
                "invalid probe matcher: {other} (expected \"substring\", \"regex\" or \"exact\")"
            )),
        }
    }
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatcherKind::Substring => "substring",
            MatcherKind::Regex => "regex",
            MatcherKind::Exact => "exact",
        };
        f.write_str(s)
    }
}
