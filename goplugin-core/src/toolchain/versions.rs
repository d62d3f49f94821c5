//! Go version parsing and ordering.
//!
//! Go release labels are not always strict semver: `1.20` omits the patch
//! number and `1.21rc2` glues the pre-release tag onto the minor version.
//! Both are mapped onto a [`semver::Version`] for ordering while callers keep
//! seeing the original label.

use semver::Version;

use crate::error::{PluginError, Result};

/// Prefix of version labels in Go's release metadata (`go1.23.3`).
const GO_PREFIX: &str = "go";

/// Parses a Go version label into its semver ordering key.
///
/// Accepts strict semver, a leading `v`, missing minor/patch components
/// (`1.20` → `1.20.0`) and Go-style pre-releases (`1.21rc2` → `1.21.0-rc2`).
pub fn parse_version(raw: &str) -> Result<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

    match Version::parse(trimmed) {
        Ok(version) => Ok(version),
        Err(source) => canonicalize(trimmed)
            .and_then(|canonical| Version::parse(&canonical).ok())
            .ok_or_else(|| PluginError::VersionParse {
                version: raw.to_string(),
                source,
            }),
    }
}

/// Pads a short or Go-style label to `major.minor.patch[-pre][+build]`.
fn canonicalize(label: &str) -> Option<String> {
    let split = label
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(label.len());
    let (core, rest) = label.split_at(split);

    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    let mut canonical = parts.join(".");
    for _ in parts.len()..3 {
        canonical.push_str(".0");
    }

    if !rest.is_empty() {
        if !rest.starts_with('+') && !rest.starts_with('-') {
            canonical.push('-');
        }
        canonical.push_str(rest);
    }

    Some(canonical)
}

/// Sorts version labels in ascending semver order.
///
/// Returns the original labels. Equal versions keep their input order. Any
/// unparseable label fails the whole call.
pub fn sort_versions<S: AsRef<str>>(versions: &[S]) -> Result<Vec<String>> {
    let mut keyed = versions
        .iter()
        .map(|raw| parse_version(raw.as_ref()).map(|key| (key, raw.as_ref())))
        .collect::<Result<Vec<_>>>()?;

    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(keyed.into_iter().map(|(_, raw)| raw.to_string()).collect())
}

/// Extracts the version from Go's `VERSION?m=text` response.
///
/// The first line reads `go1.23.3`; later lines carry build metadata.
pub fn parse_latest_version(body: &str) -> Result<String> {
    let first_line = body.lines().next().unwrap_or("").trim();

    match first_line.strip_prefix(GO_PREFIX) {
        Some(version) if !version.is_empty() => Ok(version.to_string()),
        _ => Err(PluginError::MalformedVersionResponse(first_line.to_string())),
    }
}
