//! Pattern matching for downloader output.
//!
//! The external tools print free-form progress to stdout and errors to
//! stderr. These patterns pull structure out of both: percentages and
//! stage notes for live progress, and a transient/fatal classification
//! that drives the retry policy.

use regex::Regex;
use std::sync::OnceLock;

/// A named pattern for matching downloader output.
#[derive(Debug)]
pub struct Pattern {
    /// Human-readable name for this pattern.
    pub name: &'static str,
    regex: Regex,
}

impl Pattern {
    /// Creates a new pattern.
    pub fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).expect("Invalid regex pattern"),
        }
    }

    /// Checks if the pattern matches the given text.
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Checks if any pattern in the set matches.
pub fn any_match(text: &str, patterns: &[Pattern]) -> bool {
    patterns.iter().any(|p| p.matches(text))
}

/// Structured progress extracted from one output line.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Overall percentage, when the line carried one.
    pub percent: Option<u8>,
    /// Stage note ("Downloading...", "Converting...").
    pub stage: Option<String>,
}

fn percent_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)%").expect("Invalid regex pattern"))
}

fn fraction_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)/(\d+)").expect("Invalid regex pattern"))
}

/// Stage keywords the downloaders print, mapped to display notes.
const STAGES: &[(&str, &str)] = &[
    ("Downloading", "Downloading..."),
    ("Processing", "Processing..."),
    ("Converting", "Converting..."),
    ("Extracting", "Extracting..."),
];

/// Parses one stdout line into a progress update.
///
/// Percentages take precedence over `done/total` fractions when a line
/// carries both. Returns `None` for lines with no progress information.
pub fn parse_progress(line: &str) -> Option<ProgressUpdate> {
    let stage = STAGES
        .iter()
        .find(|(keyword, _)| line.contains(keyword))
        .map(|(_, note)| note.to_string());

    let percent = percent_regex()
        .captures(line)
        .and_then(|caps| caps[1].parse::<u8>().ok())
        .map(|p| p.min(100))
        .or_else(|| {
            fraction_regex().captures(line).and_then(|caps| {
                let done: u64 = caps[1].parse().ok()?;
                let total: u64 = caps[2].parse().ok()?;
                if total == 0 || done > total {
                    return None;
                }
                Some((done * 100 / total) as u8)
            })
        });

    if percent.is_none() && stage.is_none() {
        return None;
    }
    Some(ProgressUpdate { percent, stage })
}

/// Patterns indicating a failure that may succeed on retry.
pub fn transient_patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Pattern::new("timeout", r"(?i)time[d]? ?out"),
            Pattern::new("connection", r"(?i)connection (refused|reset|aborted|error)"),
            Pattern::new("network", r"(?i)network (is )?unreachable|temporary failure"),
            Pattern::new("rate_limited", r"(?i)rate limit|too many requests|429"),
            Pattern::new("server_error", r"(?i)\b(500|502|503|504)\b|internal server error"),
            Pattern::new("dns", r"(?i)name resolution|dns"),
        ]
    })
}

/// Patterns indicating a failure no retry will fix.
pub fn fatal_patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Pattern::new("auth", r"(?i)unauthorized|authentication|login required|invalid token|401|403"),
            Pattern::new("not_found", r"(?i)not found|404|no such (track|album|playlist)"),
            Pattern::new("region", r"(?i)not available in your (country|region)"),
            Pattern::new("invalid_url", r"(?i)invalid (url|link|id)"),
            Pattern::new("subscription", r"(?i)subscription (required|expired)"),
        ]
    })
}

/// Failure classification used by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth retrying.
    Transient,
    /// Retrying would not help.
    Fatal,
}

/// Classifies downloader error output.
///
/// Fatal patterns win over transient ones when both match; unmatched
/// output is treated as transient so flaky tools get their retries.
pub fn classify_error(text: &str) -> ErrorClass {
    if any_match(text, fatal_patterns()) {
        ErrorClass::Fatal
    } else {
        ErrorClass::Transient
    }
}
