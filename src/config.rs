use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use crate::cli::{Cli, ProjectArgs};
use crate::repository::{CachingResolver, MAVEN_CENTRAL, MavenRepository};
use crate::scrape::ScrapeSettings;
use crate::usage::FailurePolicy;

pub const M2_ENV: &str = "OSS_ISSUES_M2";
pub const REMOTES_ENV: &str = "OSS_ISSUES_REMOTES";
pub const CHROME_ENV: &str = "CHROME";

pub const DEFAULT_SCRAPE_WORKERS: usize = 4;

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub failure_policy: FailurePolicy,
    /// Threads used for per-dependency issue lookup; at least one.
    pub scrape_workers: usize,
    pub include_unused: bool,
    pub scrape: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::FailFast,
            scrape_workers: DEFAULT_SCRAPE_WORKERS,
            include_unused: false,
            scrape: true,
        }
    }
}

pub fn failure_policy(project: &ProjectArgs) -> FailurePolicy {
    if project.keep_going {
        FailurePolicy::SkipAndContinue
    } else {
        FailurePolicy::FailFast
    }
}

pub fn default_m2_repository() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Failed to resolve home directory"))?;
    Ok(home.join(".m2").join("repository"))
}

pub fn resolve_m2_repo(cli: &Cli) -> Result<PathBuf> {
    if let Some(p) = cli.m2.clone() {
        return Ok(p);
    }

    if let Ok(p) = env::var(M2_ENV) {
        return Ok(PathBuf::from(p));
    }

    default_m2_repository()
}

pub fn resolve_remotes(cli: &Cli) -> Vec<String> {
    if !cli.remotes.is_empty() {
        return cli.remotes.clone();
    }

    if let Ok(raw) = env::var(REMOTES_ENV) {
        let remotes: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();
        if !remotes.is_empty() {
            return remotes;
        }
    }

    vec![MAVEN_CENTRAL.to_string()]
}

pub fn resolve_chrome_path(cli: &Cli) -> Option<PathBuf> {
    cli.chrome
        .clone()
        .or_else(|| env::var(CHROME_ENV).ok().map(PathBuf::from))
}

pub fn build_resolver(cli: &Cli) -> Result<CachingResolver<MavenRepository>> {
    let local = resolve_m2_repo(cli)?;
    let repository = if cli.offline {
        MavenRepository::offline(local)
    } else {
        MavenRepository::new(local, resolve_remotes(cli))
            .context("Failed to set up remote repository access")?
    };
    Ok(CachingResolver::new(repository))
}

pub fn scrape_settings(cli: &Cli) -> ScrapeSettings {
    ScrapeSettings {
        chrome: resolve_chrome_path(cli),
        ..ScrapeSettings::default()
    }
}

/// `--pom` may name the file or its directory; without it `./pom.xml` is used.
pub fn resolve_pom(pom: Option<&Path>) -> Result<PathBuf> {
    let candidate = match pom {
        Some(p) if p.is_dir() => p.join("pom.xml"),
        Some(p) => p.to_path_buf(),
        None => env::current_dir()
            .context("Failed to read current directory")?
            .join("pom.xml"),
    };
    if !candidate.is_file() {
        anyhow::bail!("pom.xml not found: {}", candidate.display());
    }
    Ok(candidate)
}
