//! Typed shapes of bridge tool output
//!
//! Field names follow the JSON the bridge tool prints: package records use
//! camelCase, repository and filter records use snake_case.

use serde::{Deserialize, Serialize};

/// Package row in list views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSummary {
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub installed: bool,
    #[serde(default)]
    pub section: String,
}

/// One alternative of a dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(default)]
    pub relation: String,
    #[serde(default)]
    pub version: String,
}

/// Full package record for the details view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDetails {
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub installed: bool,
    #[serde(default)]
    pub installed_version: Option<String>,
    #[serde(default)]
    pub candidate_version: Option<String>,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub maintainer: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub installed_size: u64,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub reverse_dependencies: Vec<String>,
}

/// Debian section with its package count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub count: u64,
}

/// Installed package with a newer candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradablePackage {
    pub name: String,
    #[serde(default)]
    pub installed_version: String,
    #[serde(default)]
    pub candidate_version: String,
    #[serde(default)]
    pub summary: String,
}

/// Configured APT repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub suite: String,
    #[serde(default)]
    pub package_count: u64,
}

/// Package selection rules of a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFilters {
    #[serde(default)]
    pub include_origins: Vec<String>,
    #[serde(default)]
    pub include_sections: Vec<String>,
    #[serde(default)]
    pub include_tags: Vec<String>,
    #[serde(default)]
    pub include_packages: Vec<String>,
}

/// Section shown under a store-specific label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomSection {
    pub section: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Curated view over the package catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub filters: StoreFilters,
    #[serde(default)]
    pub custom_sections: Option<Vec<CustomSection>>,
}

/// Package category with its package count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub count: u64,
}

/// Tab filter of `filter-packages`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageTab {
    Installed,
    Upgradable,
}

impl PackageTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Upgradable => "upgradable",
        }
    }
}

/// Arguments of `filter-packages`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFilter {
    pub store: Option<String>,
    pub repository: Option<String>,
    pub tab: Option<PackageTab>,
    pub search: Option<String>,
    pub limit: u32,
}

impl Default for PackageFilter {
    fn default() -> Self {
        Self {
            store: None,
            repository: None,
            tab: None,
            search: None,
            limit: 1000,
        }
    }
}

impl PackageFilter {
    /// Command-line arguments for the bridge tool
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ref store) = self.store {
            args.push("--store".to_string());
            args.push(store.clone());
        }
        if let Some(ref repo) = self.repository {
            args.push("--repo".to_string());
            args.push(repo.clone());
        }
        if let Some(tab) = self.tab {
            args.push("--tab".to_string());
            args.push(tab.as_str().to_string());
        }
        if let Some(ref search) = self.search {
            args.push("--search".to_string());
            args.push(search.clone());
        }
        args.push("--limit".to_string());
        args.push(self.limit.to_string());
        args
    }
}

/// Result of `filter-packages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterResult {
    pub packages: Vec<PackageSummary>,
    pub total_count: u64,
    #[serde(default)]
    pub applied_filters: Vec<String>,
    pub limit: u64,
    #[serde(default)]
    pub limited: bool,
}

/// Terminal result of install/remove/update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_use_camel_case() {
        let json = r#"{
            "name": "nginx",
            "summary": "HTTP server",
            "installed": true,
            "installedVersion": "1.24.0-2",
            "candidateVersion": "1.24.0-2",
            "installedSize": 1200,
            "dependencies": [{"name": "libc6", "relation": ">=", "version": "2.34"}],
            "reverseDependencies": ["nginx-full"]
        }"#;
        let details: PackageDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.installed_version.as_deref(), Some("1.24.0-2"));
        assert_eq!(details.installed_size, 1200);
        assert_eq!(details.dependencies[0].relation, ">=");
        assert_eq!(details.reverse_dependencies, vec!["nginx-full"]);
    }

    #[test]
    fn filter_args() {
        let filter = PackageFilter {
            tab: Some(PackageTab::Installed),
            search: Some("nginx".into()),
            ..PackageFilter::default()
        };
        assert_eq!(
            filter.to_args(),
            vec!["--tab", "installed", "--search", "nginx", "--limit", "1000"]
        );

        let filter = PackageFilter {
            store: Some("marine".into()),
            repository: Some("debian-main".into()),
            ..PackageFilter::default()
        };
        assert_eq!(
            filter.to_args(),
            vec!["--store", "marine", "--repo", "debian-main", "--limit", "1000"]
        );
    }

    #[test]
    fn store_optional_fields() {
        let json = r#"[{
            "id": "marine",
            "name": "Marine Navigation",
            "description": "Boating apps",
            "icon": null,
            "banner": null,
            "filters": {
                "include_origins": [],
                "include_sections": ["net"],
                "include_tags": ["field::marine"],
                "include_packages": []
            },
            "custom_sections": [
                {"section": "net", "label": "Networking", "description": "", "icon": "network"}
            ]
        }]"#;
        let stores: Vec<Store> = serde_json::from_str(json).unwrap();
        assert_eq!(stores[0].filters.include_tags, vec!["field::marine"]);
        assert!(stores[0].icon.is_none());
        let sections = stores[0].custom_sections.as_ref().unwrap();
        assert_eq!(sections[0].icon.as_deref(), Some("network"));

        let category: Category =
            serde_json::from_str(r#"{"id": "navigation", "label": "Navigation", "icon": null, "description": null, "count": 4}"#)
                .unwrap();
        assert_eq!(category.count, 4);
        assert!(category.description.is_none());
    }
}
