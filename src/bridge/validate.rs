//! Input validation before anything is spawned

use crate::error::{BridgeError, BridgeResult, ErrorCode};
use regex::Regex;
use std::sync::LazyLock;

const MAX_PACKAGE_NAME: usize = 255;
const MAX_QUERY: usize = 200;
const MAX_LIMIT: u32 = 10_000;

/// Packages `remove` refuses to touch
pub const ESSENTIAL_PACKAGES: &[&str] = &[
    "dpkg",
    "apt",
    "apt-get",
    "libc6",
    "init",
    "systemd",
    "base-files",
    "base-passwd",
    "bash",
    "coreutils",
];

static PACKAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9+.\-]*$").expect("valid regex"));

static SECTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_/+.\-]*$").expect("valid regex"));

/// Debian package names: lowercase alphanumerics and `+ . -`
pub fn package_name(name: &str) -> BridgeResult<()> {
    if name.is_empty() {
        return Err(BridgeError::invalid_input("Package name cannot be empty"));
    }
    if name.len() > MAX_PACKAGE_NAME {
        return Err(BridgeError::invalid_input(format!(
            "Package name exceeds {} characters",
            MAX_PACKAGE_NAME
        )));
    }
    if !PACKAGE_NAME.is_match(name) {
        return Err(
            BridgeError::invalid_input(format!("Invalid package name: {}", name))
                .with_details("Package names contain only a-z, 0-9, '+', '.' and '-'"),
        );
    }
    Ok(())
}

/// Section names, which may carry an area prefix (`contrib/net`)
pub fn section_name(name: &str) -> BridgeResult<()> {
    if name.is_empty() {
        return Err(BridgeError::invalid_input("Section name cannot be empty"));
    }
    if name.contains("..") || !SECTION_NAME.is_match(name) {
        return Err(BridgeError::invalid_input(format!(
            "Invalid section name: {}",
            name
        )));
    }
    Ok(())
}

static CATALOG_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").expect("valid regex"));

/// Store ids as listed by `list-stores`
pub fn store_id(id: &str) -> BridgeResult<()> {
    if id.is_empty() {
        return Err(BridgeError::invalid_input("Store ID cannot be empty"));
    }
    if id.len() > MAX_PACKAGE_NAME || !CATALOG_ID.is_match(id) {
        return Err(BridgeError::invalid_input(format!("Invalid store ID: {}", id)));
    }
    Ok(())
}

/// Category id, returned trimmed
pub fn category_id(id: &str) -> BridgeResult<&str> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(BridgeError::new(
            ErrorCode::Other("INVALID_CATEGORY".into()),
            "Category ID cannot be empty",
        ));
    }
    if trimmed.len() > MAX_PACKAGE_NAME || !CATALOG_ID.is_match(trimmed) {
        return Err(BridgeError::new(
            ErrorCode::Other("INVALID_CATEGORY".into()),
            format!("Invalid category ID: {}", trimmed),
        ));
    }
    Ok(trimmed)
}

/// Free-text search query
pub fn search_query(query: &str) -> BridgeResult<()> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(BridgeError::invalid_input("Search query cannot be empty"));
    }
    if trimmed.chars().count() > MAX_QUERY {
        return Err(BridgeError::invalid_input(format!(
            "Search query exceeds {} characters",
            MAX_QUERY
        )));
    }
    Ok(())
}

/// Result limit of `filter-packages`
pub fn limit(limit: u32) -> BridgeResult<()> {
    if limit == 0 || limit > MAX_LIMIT {
        return Err(BridgeError::invalid_input(format!(
            "Limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }
    Ok(())
}

/// Package name that may be removed
pub fn removable_package(name: &str) -> BridgeResult<()> {
    package_name(name)?;
    if ESSENTIAL_PACKAGES.contains(&name) {
        return Err(BridgeError::new(
            ErrorCode::Other("ESSENTIAL_PACKAGE".into()),
            format!("Cannot remove essential package '{}'", name),
        )
        .with_details("Removing this package may break your system"));
    }
    Ok(())
}
