//! Byte-size recovery from directory-listing markup
//!
//! Each strategy is a pure function over an `AnchorContext`. They run in
//! table order and the first one that produces a value wins; a winning
//! value of 0 still means "unknown" to the caller.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::html::AnchorContext;

pub type SizeExtractor = fn(&AnchorContext) -> Option<u64>;

/// Strategies in priority order
pub const SIZE_EXTRACTORS: &[(&str, SizeExtractor)] = &[
    ("sibling_token", sibling_token),
    ("trailing_integer", trailing_integer),
    ("trailing_sized_token", trailing_sized_token),
    ("time_then_size", time_then_size),
    ("bracketed_integer", bracketed_integer),
];

/// `<number>[.<number>] [unit]`, unit optional
static SIZE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]+(?:\.[0-9]+)?)\s*(bytes?|KB|MB|GB|K|M|G|B)?\b").expect("valid regex")
});

/// `<number>[.<number>] <unit>`, unit required
static SIZED_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]+(?:\.[0-9]+)?)\s*(bytes?|KB|MB|GB|K|M|G|B)\b").expect("valid regex")
});

static TRAILING_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([0-9]+)\s*$").expect("valid regex"));

/// `HH:MM  <digits>` (or `MM-DD  <digits>`) as emitted by autoindex pages
static TIME_THEN_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{2}[-:][0-9]{2}\s+([0-9]+)").expect("valid regex"));

static BRACKETED_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([0-9]+)\s+").expect("valid regex"));

/// Run every strategy in order; `None` when no size is recoverable
pub fn extract_size(anchor: &AnchorContext) -> Option<u64> {
    let (strategy, size) = SIZE_EXTRACTORS
        .iter()
        .find_map(|(name, extract)| extract(anchor).map(|size| (*name, size)))?;

    tracing::trace!(href = ?anchor.href, strategy, size, "size from markup");
    (size > 0).then_some(size)
}

/// First size token in the following siblings that looks like a real size
///
/// Bare numbers of 10 or less are rejected, since they are usually
/// fragments of a date or time.
pub fn sibling_token(anchor: &AnchorContext) -> Option<u64> {
    anchor.siblings.iter().find_map(|text| {
        let caps = SIZE_TOKEN.captures(text)?;
        let multiplier = unit_multiplier(caps.get(2).map(|m| m.as_str()));
        let bytes = scaled(&caps, multiplier)?;
        (bytes > 10 || multiplier > 1).then_some(bytes)
    })
}

pub fn trailing_integer(anchor: &AnchorContext) -> Option<u64> {
    capture_bytes(&TRAILING_INTEGER, &anchor.trailing_text)
}

pub fn trailing_sized_token(anchor: &AnchorContext) -> Option<u64> {
    capture_bytes(&SIZED_TOKEN, &anchor.trailing_text)
}

pub fn time_then_size(anchor: &AnchorContext) -> Option<u64> {
    capture_bytes(&TIME_THEN_SIZE, &anchor.trailing_text)
}

pub fn bracketed_integer(anchor: &AnchorContext) -> Option<u64> {
    capture_bytes(&BRACKETED_INTEGER, &anchor.trailing_text)
}

/// Parse a standalone size token such as `1.5 MB` or `500`
pub fn parse_size(text: &str) -> Option<u64> {
    let caps = SIZE_TOKEN.captures(text)?;
    scaled(&caps, unit_multiplier(caps.get(2).map(|m| m.as_str())))
}

fn capture_bytes(pattern: &Regex, text: &str) -> Option<u64> {
    let caps = pattern.captures(text)?;
    scaled(&caps, unit_multiplier(caps.get(2).map(|m| m.as_str())))
}

/// 1024-based multiplier; unitless and byte units are 1
fn unit_multiplier(unit: Option<&str>) -> u64 {
    match unit.and_then(|u| u.chars().next()).map(|c| c.to_ascii_uppercase()) {
        Some('K') => 1024,
        Some('M') => 1024 * 1024,
        Some('G') => 1024 * 1024 * 1024,
        _ => 1,
    }
}

fn scaled(caps: &Captures<'_>, multiplier: u64) -> Option<u64> {
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some((value * multiplier as f64).round() as u64)
}
