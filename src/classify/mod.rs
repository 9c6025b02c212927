// ABOUTME: Provider error classification for failed external calls.
// ABOUTME: Table-driven code lookup with ordered substring fallbacks; never fails.

mod codes;

pub use codes::{CodeEntry, KNOWN_CODES, lookup};

use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

/// Broad error family that drives retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Auth,
    Rate,
    Capacity,
    Service,
    Network,
    Validation,
    Resource,
    Account,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Auth => "AUTH",
            Category::Rate => "RATE",
            Category::Capacity => "CAPACITY",
            Category::Service => "SERVICE",
            Category::Network => "NETWORK",
            Category::Validation => "VALIDATION",
            Category::Resource => "RESOURCE",
            Category::Account => "ACCOUNT",
            Category::Unknown => "UNKNOWN",
        }
    }

    /// Transient categories are eligible for adaptive backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Category::Rate | Category::Network | Category::Service | Category::Capacity
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured result of classifying one failed invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub error_code: String,
    pub category: Category,
    pub subtype: &'static str,
    pub retryable: bool,
    pub suggested_action: &'static str,
    /// Base retry delay in seconds.
    pub retry_delay: u64,
    pub max_retries: u32,
    /// Operation name the failure came from.
    pub context: String,
    pub exit_code: i32,
    pub timestamp: i64,
}

impl Classification {
    pub fn base_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }

    /// Same classification with the timestamp zeroed, for comparisons.
    pub fn without_timestamp(&self) -> Self {
        Self {
            timestamp: 0,
            ..self.clone()
        }
    }
}

const DEFAULT_ACTION: &str = "check provider documentation";

/// Retry delay (seconds) and retry budget for a category and subtype.
pub fn retry_parameters(category: Category, subtype: &str) -> (u64, u32) {
    match (category, subtype) {
        (Category::Rate, "THROTTLE" | "LIMIT") => (5, 5),
        (Category::Rate, "BURST") => (10, 3),
        (Category::Service | Category::Network, _) => (5, 4),
        (Category::Capacity, _) => (10, 2),
        _ => (2, 3),
    }
}

static AWS_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"An error occurred \(([^)]+)\)").expect("valid regex"));
static SERVICE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[a-z][a-z0-9-]*:([A-Z][A-Za-z0-9.]*)").expect("valid regex")
});
static GENERIC_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][A-Za-z0-9]*(?:Error|Exception))\b").expect("valid regex")
});

/// Pull a provider error code out of raw output. Empty when nothing matches.
pub fn extract_code(text: &str) -> String {
    [&*AWS_CODE, &*SERVICE_PREFIX, &*GENERIC_TOKEN]
        .into_iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

struct Heuristic {
    needles: &'static [&'static str],
    category: Category,
    subtype: &'static str,
    retryable: bool,
    action: &'static str,
}

// Evaluated in order; first hit wins.
static HEURISTICS: &[Heuristic] = &[
    Heuristic {
        needles: &["Rate exceeded", "Too many requests"],
        category: Category::Rate,
        subtype: "THROTTLE",
        retryable: true,
        action: "back off and retry with exponential delay",
    },
    Heuristic {
        needles: &["Connection", "Network"],
        category: Category::Network,
        subtype: "CONNECTION",
        retryable: true,
        action: "check network connectivity and retry",
    },
    Heuristic {
        needles: &["Timeout"],
        category: Category::Network,
        subtype: "TIMEOUT",
        retryable: true,
        action: "retry; check network latency to the endpoint",
    },
    Heuristic {
        needles: &["Invalid", "Malformed"],
        category: Category::Validation,
        subtype: "INPUT",
        retryable: false,
        action: "fix the request parameters",
    },
];

/// Classify the output of a failed external invocation.
pub fn classify(text: &str, context: &str, exit_code: i32) -> Classification {
    let error_code = extract_code(text);

    let (category, subtype, retryable, suggested_action) = match lookup(&error_code) {
        Some(entry) => (
            entry.category,
            entry.subtype,
            entry.retryable,
            entry.suggested_action,
        ),
        None => HEURISTICS
            .iter()
            .find(|h| h.needles.iter().any(|n| text.contains(n)))
            .map(|h| (h.category, h.subtype, h.retryable, h.action))
            .unwrap_or((Category::Unknown, "GENERAL", false, DEFAULT_ACTION)),
    };

    let (retry_delay, max_retries) = retry_parameters(category, subtype);

    Classification {
        error_code,
        category,
        subtype,
        retryable,
        suggested_action,
        retry_delay,
        max_retries,
        context: context.to_string(),
        exit_code,
        timestamp: Utc::now().timestamp(),
    }
}
