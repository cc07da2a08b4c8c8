//! Deterministic container names and hostnames for sidecars.
//!
//! Names follow
//! `<chain_id>-<process_name>[-val]-<index>-<sanitized_test_name>`, so every
//! sidecar of a test run gets a distinct name as long as its
//! `(chain_id, process_name, scope, index)` tuple is distinct. Hostnames are
//! the same string when it is already a valid DNS label; otherwise it is
//! normalized and suffixed with a short content hash.

use std::sync::LazyLock;

use regex::Regex;

use crate::sidecar::error::{Result, SidecarError};

/// Longest hostname a container runtime accepts (one DNS label).
pub const MAX_HOSTNAME_LEN: usize = 63;

/// Hex characters of the blake3 digest kept in condensed hostnames.
const HOSTNAME_HASH_LEN: usize = 12;

static TEST_NAME_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

static HOSTNAME_INVALID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]+").expect("valid regex"));

static DNS_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").expect("valid regex"));

/// What a sidecar is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SidecarScope {
    /// Shared by the whole chain; `index` disambiguates sidecars with the
    /// same process name.
    Chain { index: usize },
    /// Bound to the validator at `index`.
    Validator { index: usize },
}

impl SidecarScope {
    /// Get the chain or validator index.
    pub fn index(&self) -> usize {
        match self {
            SidecarScope::Chain { index } | SidecarScope::Validator { index } => *index,
        }
    }

    /// Whether the scope is a single validator.
    pub fn is_validator(&self) -> bool {
        matches!(self, SidecarScope::Validator { .. })
    }
}

impl std::fmt::Display for SidecarScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SidecarScope::Chain { index } => write!(f, "chain[{index}]"),
            SidecarScope::Validator { index } => write!(f, "validator[{index}]"),
        }
    }
}

/// Reduce a test name to lowercase alphanumerics separated by single dashes.
///
/// `"My Test!!"` becomes `"my-test"` and `"TestChain/sub_case"` becomes
/// `"testchain-sub-case"`. A name with no usable characters maps to `"test"`.
///
/// Case and separator choice are folded away, so `"TestA/b"`, `"TestA_b"` and
/// `"testa-b"` share one sanitized form and their sidecars share names. Test
/// names within one daemon must differ in more than case or punctuation.
pub fn sanitize_test_name(test_name: &str) -> String {
    let lowered = test_name.to_lowercase();
    let dashed = TEST_NAME_SEPARATORS.replace_all(&lowered, "-");
    let trimmed = dashed.trim_matches('-');
    if trimmed.is_empty() {
        "test".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Check that `value` can be embedded in a container name.
///
/// Docker accepts `[a-zA-Z0-9][a-zA-Z0-9_.-]*`.
pub fn validate_component(field: &'static str, value: &str) -> Result<()> {
    let invalid = |reason: &str| SidecarError::InvalidName {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let Some(first) = value.chars().next() else {
        return Err(invalid("must not be empty"));
    };
    if !first.is_ascii_alphanumeric() {
        return Err(invalid("must start with a letter or digit"));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
    {
        return Err(invalid(&format!("contains disallowed character '{bad}'")));
    }
    Ok(())
}

/// Container name for a sidecar.
pub fn container_name(
    chain_id: &str,
    process_name: &str,
    scope: SidecarScope,
    test_name: &str,
) -> String {
    let test = sanitize_test_name(test_name);
    match scope {
        SidecarScope::Validator { index } => {
            format!("{chain_id}-{process_name}-val-{index}-{test}")
        }
        SidecarScope::Chain { index } => format!("{chain_id}-{process_name}-{index}-{test}"),
    }
}

/// Hostname for a container name.
///
/// Names that are already valid DNS labels are returned unchanged. Anything
/// else is lowercased, stripped to `[a-z0-9-]`, cut to fit and suffixed with a
/// hash of the full name, which keeps distinct names distinct.
pub fn hostname(container_name: &str) -> String {
    if container_name.len() <= MAX_HOSTNAME_LEN && DNS_LABEL.is_match(container_name) {
        return container_name.to_string();
    }

    let lowered = container_name.to_lowercase();
    let normalized = HOSTNAME_INVALID.replace_all(&lowered, "-");
    let hash = blake3::hash(container_name.as_bytes()).to_hex();
    let suffix = &hash.as_str()[..HOSTNAME_HASH_LEN];

    // Everything left is ASCII, so byte slicing stays on char boundaries.
    let budget = MAX_HOSTNAME_LEN - HOSTNAME_HASH_LEN - 1;
    let prefix = &normalized[..normalized.len().min(budget)];
    let prefix = prefix.trim_matches('-');

    if prefix.is_empty() {
        suffix.to_string()
    } else {
        format!("{prefix}-{suffix}")
    }
}
