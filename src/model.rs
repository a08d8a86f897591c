//! Coordinates, dependencies and the POM model shared by every stage.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Coordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

impl FromStr for Coordinate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        match parts.as_slice() {
            [g, a, v] if !g.is_empty() && !a.is_empty() && !v.is_empty() => {
                Ok(Self::new(*g, *a, *v))
            }
            _ => Err(format!("expected group:artifact:version, got {s:?}")),
        }
    }
}

/// Maven dependency scope. Anything unrecognized is treated as `compile`,
/// which is also the default when no scope is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Compile,
    Provided,
    Runtime,
    Test,
    System,
    Import,
}

impl Scope {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "provided" => Scope::Provided,
            "runtime" => Scope::Runtime,
            "test" => Scope::Test,
            "system" => Scope::System,
            "import" => Scope::Import,
            _ => Scope::Compile,
        }
    }
}

/// A direct dependency of a project with its version already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub coordinate: Coordinate,
    pub scope: Scope,
    /// Maven `<type>`, used as the file extension when resolving (`jar`, `pom`, ...).
    pub kind: String,
}

impl Dependency {
    pub fn new(coordinate: Coordinate, scope: Scope) -> Self {
        Self {
            coordinate,
            scope,
            kind: "jar".to_string(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// File extension the declared type is packaged with.
    pub fn extension(&self) -> &str {
        match self.kind.as_str() {
            "test-jar" | "ejb" | "ejb-client" | "maven-plugin" | "bundle" | "java-source"
            | "javadoc" => "jar",
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedArtifact {
    pub coordinate: Coordinate,
    pub file: PathBuf,
    /// artifactId of the reactor module that declared the dependency.
    pub owner: Option<String>,
}

impl ResolvedArtifact {
    /// The metadata file sitting next to the binary (`foo-1.0.jar` -> `foo-1.0.pom`).
    pub fn pom_path(&self) -> PathBuf {
        self.file.with_extension("pom")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueManagement {
    pub system: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scm {
    pub url: Option<String>,
    pub connection: Option<String>,
    pub developer_connection: Option<String>,
}

impl Scm {
    /// Declared locations in lookup order: browse url, then the two connection strings.
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        [&self.url, &self.connection, &self.developer_connection]
            .into_iter()
            .filter_map(|v| v.as_deref())
    }
}

/// In-memory view of one POM file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    pub group_id: Option<String>,
    pub artifact_id: String,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub parent: Option<Coordinate>,
    pub issue_management: Option<IssueManagement>,
    pub scm: Option<Scm>,
    pub dependencies: Vec<DeclaredDependency>,
    pub dependency_management: Vec<DeclaredDependency>,
    pub modules: Vec<String>,
    pub properties: BTreeMap<String, String>,
    pub source_directory: Option<String>,
}

impl Model {
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.group_id.as_str()))
    }

    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.version.as_str()))
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(
            self.effective_group_id()?,
            self.artifact_id.as_str(),
            self.effective_version()?,
        ))
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.artifact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_round_trips_through_display() {
        let c: Coordinate = "org.acme:widget:1.0".parse().unwrap();
        assert_eq!(c, Coordinate::new("org.acme", "widget", "1.0"));
        assert_eq!(c.to_string(), "org.acme:widget:1.0");
        assert!("org.acme:widget".parse::<Coordinate>().is_err());
    }

    #[test]
    fn scope_defaults_to_compile() {
        assert_eq!(Scope::parse("SYSTEM"), Scope::System);
        assert_eq!(Scope::parse(""), Scope::Compile);
        assert_eq!(Scope::parse("weird"), Scope::Compile);
    }

    #[test]
    fn model_inherits_group_and_version_from_parent() {
        let model = Model {
            artifact_id: "child".to_string(),
            parent: Some(Coordinate::new("org.acme", "parent", "2.0")),
            ..Model::default()
        };
        assert_eq!(
            model.coordinate(),
            Some(Coordinate::new("org.acme", "child", "2.0"))
        );
    }

    #[test]
    fn jar_flavoured_types_resolve_as_jars() {
        let c = Coordinate::new("a", "b", "1");
        assert_eq!(Dependency::new(c.clone(), Scope::Test).with_kind("test-jar").extension(), "jar");
        assert_eq!(Dependency::new(c, Scope::Import).with_kind("pom").extension(), "pom");
    }

    #[test]
    fn pom_path_swaps_extension() {
        let artifact = ResolvedArtifact {
            coordinate: Coordinate::new("a", "b", "1"),
            file: PathBuf::from("/repo/a/b/1/b-1.jar"),
            owner: None,
        };
        assert_eq!(artifact.pom_path(), PathBuf::from("/repo/a/b/1/b-1.pom"));
    }
}
