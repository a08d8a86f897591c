//! Inference of which issue tracker a dependency uses, and where.
//!
//! Three tiers are tried in order, each across the whole lineage (own POM
//! first, then ancestors) before the next tier is consulted:
//!
//! 1. an explicit `<issueManagement>` block,
//! 2. a GitHub repository in `<scm>`,
//! 3. a GitHub repository as the project `<url>`.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::Model;

static GITHUB_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com/(?P<org>[\w.-]+)/(?P<repo>[\w.-]+)").expect("github path regex")
});

static GITHUB_SSH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"git@github\.com:(?P<org>[\w.-]+)/(?P<repo>[\w.-]+)").expect("github ssh regex")
});

static GITHUB_PROJECT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?github\.com/(?P<org>[\w.-]+)/(?P<repo>[\w.-]+?)(?:\.git)?/?$")
        .expect("github project url regex")
});

const ARTIFACT_ID_PLACEHOLDERS: [&str; 3] =
    ["${project.artifactId}", "${pom.artifactId}", "${artifactId}"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IssueSystem {
    #[serde(rename = "github")]
    Github,
    #[serde(rename = "jira")]
    Jira,
    #[serde(rename = "sourceforge")]
    Sourceforge,
    #[serde(rename = "google code")]
    GoogleCode,
    #[serde(rename = "youtrack")]
    Youtrack,
    #[serde(rename = "bugzilla")]
    Bugzilla,
}

impl IssueSystem {
    pub const ALL: [IssueSystem; 6] = [
        IssueSystem::Github,
        IssueSystem::Jira,
        IssueSystem::Sourceforge,
        IssueSystem::GoogleCode,
        IssueSystem::Youtrack,
        IssueSystem::Bugzilla,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            IssueSystem::Github => "github",
            IssueSystem::Jira => "jira",
            IssueSystem::Sourceforge => "sourceforge",
            IssueSystem::GoogleCode => "google code",
            IssueSystem::Youtrack => "youtrack",
            IssueSystem::Bugzilla => "bugzilla",
        }
    }

    /// Keyword-containment match, case-insensitive.
    pub fn classify(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if lower.contains("github") {
            Some(IssueSystem::Github)
        } else if lower.contains("jira") {
            Some(IssueSystem::Jira)
        } else if lower.contains("sourceforge") {
            Some(IssueSystem::Sourceforge)
        } else if lower.contains("google") && lower.contains("code") {
            Some(IssueSystem::GoogleCode)
        } else if lower.contains("youtrack") {
            Some(IssueSystem::Youtrack)
        } else if lower.contains("bugzilla") {
            Some(IssueSystem::Bugzilla)
        } else {
            None
        }
    }
}

impl fmt::Display for IssueSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueSite {
    pub system: IssueSystem,
    pub url: String,
}

impl IssueSite {
    fn github(org: &str, repo: &str) -> Self {
        Self {
            system: IssueSystem::Github,
            url: format!("https://github.com/{org}/{repo}/issues"),
        }
    }
}

/// Normalizes a declared system name, falling back to its URL.
///
/// Both absent is `Ok(None)`. Anything non-empty that matches no keyword is
/// [`Error::UnrecognizedIssueSystem`].
pub fn normalize_system(system: Option<&str>, url: Option<&str>) -> Result<Option<IssueSystem>> {
    let system = system.map(str::trim).filter(|s| !s.is_empty());
    let url = url.map(str::trim).filter(|s| !s.is_empty());

    if let Some(found) = system.and_then(IssueSystem::classify) {
        return Ok(Some(found));
    }
    if let Some(found) = url.and_then(IssueSystem::classify) {
        return Ok(Some(found));
    }
    match system.or(url) {
        Some(unknown) => Err(Error::UnrecognizedIssueSystem(unknown.to_string())),
        None => Ok(None),
    }
}

pub fn resolve_issue_site(lineage: &[Model]) -> Result<Option<IssueSite>> {
    let site = match from_issue_management(lineage)? {
        Some(site) => Some(site),
        None => from_scm(lineage).or_else(|| from_project_url(lineage)),
    };
    if let Some(head) = lineage.first() {
        debug!(artifact = %head.artifact_id, site = ?site, "resolved issue site");
    }
    Ok(site)
}

fn from_issue_management(lineage: &[Model]) -> Result<Option<IssueSite>> {
    let artifact_id = lineage.first().map(|m| m.artifact_id.as_str()).unwrap_or("");

    for model in lineage {
        let Some(im) = &model.issue_management else {
            continue;
        };
        let Some(raw_url) = im.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
            continue;
        };
        let url = expand_artifact_id(raw_url, artifact_id);
        if let Some(system) = normalize_system(im.system.as_deref(), Some(&url))? {
            return Ok(Some(IssueSite { system, url }));
        }
    }
    Ok(None)
}

fn from_scm(lineage: &[Model]) -> Option<IssueSite> {
    lineage
        .iter()
        .filter_map(|m| m.scm.as_ref())
        .flat_map(|scm| scm.locations())
        .find_map(github_repository)
        .map(|(org, repo)| IssueSite::github(&org, &repo))
}

fn from_project_url(lineage: &[Model]) -> Option<IssueSite> {
    lineage
        .iter()
        .filter_map(|m| m.url.as_deref())
        .find_map(|url| {
            let caps = GITHUB_PROJECT_URL.captures(url.trim())?;
            Some(IssueSite::github(&caps["org"], &caps["repo"]))
        })
}

/// `(org, repo)` from an HTTPS-ish or SSH GitHub location, `.git` stripped.
pub fn github_repository(location: &str) -> Option<(String, String)> {
    let caps = GITHUB_SSH
        .captures(location)
        .or_else(|| GITHUB_PATH.captures(location))?;
    let repo = &caps["repo"];
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return None;
    }
    Some((caps["org"].to_string(), repo.to_string()))
}

fn expand_artifact_id(url: &str, artifact_id: &str) -> String {
    ARTIFACT_ID_PLACEHOLDERS
        .iter()
        .fold(url.to_string(), |acc, token| acc.replace(token, artifact_id))
}
