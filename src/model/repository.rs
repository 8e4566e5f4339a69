use crate::model::{Error, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// Repository key (`owner/name`) -> vertical names, in configuration order.
pub type VerticalIndex = IndexMap<String, Vec<String>>;

#[derive(Debug, Clone, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

impl RepositoryRef {
    pub fn new(owner: impl ToString, name: impl ToString) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Vertical {
    pub name: String,
    pub repositories: Vec<RepositoryRef>,
}

/// Canonical repository set, whatever schema the file used.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RepositoriesConfig {
    pub organization: Option<String>,
    pub repositories: Vec<RepositoryRef>,
    pub verticals: Vec<Vertical>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    organization: Option<String>,
    #[serde(default)]
    repositories: Vec<RawRepository>,
    #[serde(default)]
    verticals: Vec<RawVertical>,
}

#[derive(Debug, Deserialize)]
struct RawVertical {
    name: String,
    #[serde(default)]
    organization: Option<String>,
    #[serde(default)]
    repositories: Vec<RawRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRepository {
    Full { owner: String, name: String },
    Short(String),
}

// Create
impl RepositoriesConfig {
    pub fn from_config(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }
}

// Parser
impl RepositoriesConfig {
    /// Parses YAML (and therefore JSON) text. `origin` names the input in errors.
    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(text).map_err(|source| Error::ConfigParse {
            origin: origin.to_string(),
            source,
        })?;

        let organization = raw.organization.filter(|org| !org.trim().is_empty());
        let repositories = raw
            .repositories
            .into_iter()
            .map(|repo| repo.resolve(organization.as_deref()))
            .collect::<Result<Vec<_>>>()?;

        let mut verticals = Vec::with_capacity(raw.verticals.len());
        for vertical in raw.verticals {
            let owner = vertical.organization.as_deref().or(organization.as_deref());
            let members = vertical
                .repositories
                .into_iter()
                .map(|repo| repo.resolve(owner))
                .collect::<Result<Vec<_>>>()?;
            verticals.push(Vertical {
                name: vertical.name,
                repositories: members,
            });
        }

        if repositories.is_empty() && verticals.iter().all(|v| v.repositories.is_empty()) {
            return Err(Error::Config("no repositories found in configuration file".to_string()));
        }

        Ok(Self {
            organization,
            repositories,
            verticals,
        })
    }
}

impl RawRepository {
    fn resolve(self, organization: Option<&str>) -> Result<RepositoryRef> {
        let (owner, name) = match self {
            RawRepository::Full { owner, name } => (owner, name),
            RawRepository::Short(value) => match value.split_once('/') {
                Some((owner, name)) => (owner.to_string(), name.to_string()),
                None => match organization {
                    Some(org) => (org.to_string(), value),
                    None => {
                        return Err(Error::Config(format!(
                            "repository `{value}` has no owner and no organization is configured"
                        )))
                    }
                },
            },
        };
        let (owner, name) = (owner.trim(), name.trim());
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(Error::Config(format!("invalid repository `{owner}/{name}`")));
        }
        Ok(RepositoryRef::new(owner, name))
    }
}

impl RepositoriesConfig {
    /// Every configured repository once, top-level list first, then verticals
    /// in file order.
    pub fn all_repositories(&self) -> Vec<RepositoryRef> {
        let mut unique: IndexMap<String, RepositoryRef> = IndexMap::new();
        let verticals = self.verticals.iter().flat_map(|v| &v.repositories);
        for repo in self.repositories.iter().chain(verticals) {
            unique.entry(repo.key()).or_insert_with(|| repo.clone());
        }
        unique.into_values().collect()
    }

    pub fn vertical_index(&self) -> VerticalIndex {
        let mut index = VerticalIndex::new();
        for vertical in &self.verticals {
            for repo in &vertical.repositories {
                let names = index.entry(repo.key()).or_default();
                if !names.contains(&vertical.name) {
                    names.push(vertical.name.clone());
                }
            }
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn single_organization_schema() {
        let yaml = "organization: acme\nrepositories: [api, web]\n";
        let config = RepositoriesConfig::parse(yaml, "test").unwrap();
        assert_eq!(
            config.all_repositories(),
            vec![RepositoryRef::new("acme", "api"), RepositoryRef::new("acme", "web")]
        );
        assert!(config.vertical_index().is_empty());
    }

    #[test]
    fn full_schema_accepts_maps_and_slugs() {
        let yaml = r"
repositories:
  - owner: acme
    name: api
  - globex/billing
";
        let config = RepositoriesConfig::parse(yaml, "test").unwrap();
        assert_eq!(
            config.repositories,
            vec![RepositoryRef::new("acme", "api"), RepositoryRef::new("globex", "billing")]
        );
    }

    #[test]
    fn json_input_is_accepted() {
        let json = r#"{"repositories": [{"owner": "acme", "name": "api"}]}"#;
        let config = RepositoriesConfig::parse(json, "test.json").unwrap();
        assert_eq!(config.all_repositories(), vec![RepositoryRef::new("acme", "api")]);
    }

    #[test]
    fn verticals_are_merged_and_deduplicated() {
        let yaml = r"
organization: acme
repositories: [api]
verticals:
  - name: Provider
    repositories: [api, portal]
  - name: Payer
    repositories: [portal, acme/claims]
  - name: External
    organization: globex
    repositories: [sdk]
";
        let config = RepositoriesConfig::parse(yaml, "test").unwrap();
        let keys = config.all_repositories().iter().map(RepositoryRef::key).collect::<Vec<_>>();
        assert_eq!(keys, vec!["acme/api", "acme/portal", "acme/claims", "globex/sdk"]);

        let index = config.vertical_index();
        assert_eq!(index["acme/api"], vec!["Provider"]);
        assert_eq!(index["acme/portal"], vec!["Provider", "Payer"]);
        assert_eq!(index["globex/sdk"], vec!["External"]);
    }

    #[test]
    fn repeated_membership_is_listed_once() {
        let yaml = "verticals:\n  - name: Core\n    repositories: [acme/api, acme/api]\n";
        let config = RepositoriesConfig::parse(yaml, "test").unwrap();
        assert_eq!(config.vertical_index()["acme/api"], vec!["Core"]);
        assert_eq!(config.all_repositories().len(), 1);
    }

    #[test]
    fn empty_configuration_is_rejected() {
        let err = RepositoriesConfig::parse("repositories: []\n", "test").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn bare_name_without_organization_is_rejected() {
        let err = RepositoriesConfig::parse("repositories: [api]\n", "test").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_slug_is_rejected() {
        let err = RepositoriesConfig::parse("repositories: [acme/]\n", "test").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = RepositoriesConfig::parse("repositories: [a/b/c]\n", "test").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "organization: acme\nrepositories: [api]").unwrap();
        let config = RepositoriesConfig::from_config(file.path()).unwrap();
        assert_eq!(config.organization.as_deref(), Some("acme"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RepositoriesConfig::from_config(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }
}
