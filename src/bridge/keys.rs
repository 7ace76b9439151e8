//! Cache key conventions
//!
//! Keys are `"<operation>:<args joined by ':'>"`, or the bare operation name
//! for queries without arguments. Prefix invalidation depends on these staying
//! stable.

use super::models::PackageFilter;

pub const SECTIONS: &str = "sections";
pub const INSTALLED: &str = "installed";
pub const UPGRADABLE: &str = "upgradable";
pub const REPOSITORIES: &str = "repositories";
pub const STORES: &str = "stores";

pub const SEARCH_PREFIX: &str = "search:";
pub const DETAILS_PREFIX: &str = "details:";
pub const SECTION_PREFIX: &str = "section:";
pub const FILTER_PREFIX: &str = "filter:";
pub const CATEGORIES_PREFIX: &str = "categories:";
pub const CATEGORY_PREFIX: &str = "category:";

/// Build a key from an operation name and its arguments
pub fn key(operation: &str, args: &[&str]) -> String {
    if args.is_empty() {
        operation.to_string()
    } else {
        format!("{}:{}", operation, args.join(":"))
    }
}

pub fn search(query: &str) -> String {
    key("search", &[query])
}

pub fn details(package: &str) -> String {
    key("details", &[package])
}

pub fn section(name: &str) -> String {
    key("section", &[name])
}

/// `repositories`, or `repositories:<store>` when scoped to a store
pub fn repositories(store: Option<&str>) -> String {
    match store {
        Some(store) => key(REPOSITORIES, &[store]),
        None => REPOSITORIES.to_string(),
    }
}

/// `categories:<store>`, with an empty store for the whole catalog
pub fn categories(store: Option<&str>) -> String {
    key("categories", &[store.unwrap_or("")])
}

pub fn category(category: &str, store: Option<&str>) -> String {
    key("category", &[category, store.unwrap_or("")])
}

pub fn dependencies(package: &str) -> String {
    key("dependencies", &[package])
}

pub fn reverse_dependencies(package: &str) -> String {
    key("reverse-dependencies", &[package])
}

pub fn files(package: &str) -> String {
    key("files", &[package])
}

pub fn filter(filter: &PackageFilter) -> String {
    let args = filter.to_args();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    key("filter", &args)
}

/// Keys and prefixes made stale by installing or removing `package`.
///
/// Every listing that carries an `installed` flag is affected, plus the
/// package's own details and file list.
pub fn affected_by_package_change(package: &str) -> (Vec<String>, &'static [&'static str]) {
    (
        vec![
            INSTALLED.to_string(),
            UPGRADABLE.to_string(),
            details(package),
            files(package),
        ],
        &[
            SEARCH_PREFIX,
            SECTION_PREFIX,
            FILTER_PREFIX,
            CATEGORY_PREFIX,
            CATEGORIES_PREFIX,
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_shapes() {
        assert_eq!(key("sections", &[]), "sections");
        assert_eq!(search("nginx"), "search:nginx");
        assert_eq!(details("tree"), "details:tree");
        assert_eq!(reverse_dependencies("libc6"), "reverse-dependencies:libc6");
        assert!(details("x").starts_with(DETAILS_PREFIX));
        assert_eq!(filter(&PackageFilter::default()), "filter:--limit:1000");
        assert_eq!(repositories(None), "repositories");
        assert_eq!(repositories(Some("marine")), "repositories:marine");
        assert_eq!(categories(None), "categories:");
        assert_eq!(category("navigation", Some("marine")), "category:navigation:marine");
        assert_eq!(category("navigation", None), "category:navigation:");
    }

    #[test]
    fn package_change_reaches_category_listings() {
        let (keys, prefixes) = affected_by_package_change("tree");
        assert!(keys.contains(&"details:tree".to_string()));
        assert!(category("utils", None).starts_with(CATEGORY_PREFIX));
        assert!(prefixes.contains(&CATEGORY_PREFIX));
        assert!(prefixes.contains(&CATEGORIES_PREFIX));
        assert!(!STORES.starts_with(CATEGORY_PREFIX));
    }
}
