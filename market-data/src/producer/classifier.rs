//! Producer diagnostics classification

use regex::Regex;
use std::sync::LazyLock;

const FATAL_PATTERNS: [&str; 7] = [
    "error:",
    "traceback",
    "exception:",
    "failed:",
    "critical:",
    "database connection failed",
    "no company found",
];

const WARNING_PATTERNS: [&str; 3] = ["warning", "userwarning", "deprecation"];

const INFO_PATTERNS: [&str; 11] = [
    "fetching",
    "data range:",
    "successfully",
    "query executed",
    "looking up",
    "processing",
    "completed",
    "data points",
    "querying",
    "filtered to",
    "adjusted for",
];

const INFO_PAIRS: [(&str, &str); 3] = [
    ("found", "company"),
    ("applied", "buffer"),
    ("records for", "company"),
];

static TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bin \d+(\.\d+)?s\b").expect("timing pattern is valid")
});

/// How a single diagnostic line is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Fatal,
    Warning,
    Info,
}

/// Producer stderr split into buckets, original line text preserved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub fatal: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl Diagnostics {
    pub fn has_fatal(&self) -> bool {
        !self.fatal.is_empty()
    }
}

/// Classify one non-empty line.
///
/// Fatal beats warning beats info; anything unrecognized is a warning so that
/// unknown chatter is neither dropped nor allowed to fail a request.
pub fn classify_line(line: &str) -> LineKind {
    let lower = line.to_lowercase();

    if lower.starts_with("error ") || FATAL_PATTERNS.iter().any(|p| lower.contains(p)) {
        return LineKind::Fatal;
    }

    if WARNING_PATTERNS.iter().any(|p| lower.contains(p))
        || (lower.contains("skipped") && lower.contains("invalid"))
    {
        return LineKind::Warning;
    }

    if INFO_PATTERNS.iter().any(|p| lower.contains(p))
        || INFO_PAIRS
            .iter()
            .any(|(a, b)| lower.contains(a) && lower.contains(b))
        || TIMING.is_match(&lower)
    {
        return LineKind::Info;
    }

    LineKind::Warning
}

/// Split diagnostic text into fatal / warning / informational lines
pub fn classify(text: &str) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let bucket = match classify_line(line) {
            LineKind::Fatal => &mut diagnostics.fatal,
            LineKind::Warning => &mut diagnostics.warnings,
            LineKind::Info => &mut diagnostics.info,
        };
        bucket.push(line.to_string());
    }
    diagnostics
}
