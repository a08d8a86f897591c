//! Open-issue snapshots pulled from upstream trackers.
//!
//! Each tracker gets its own [`IssueScraper`]; the [`ScraperRegistry`] picks
//! one by [`IssueSystem`] and falls back to [`NoOpScraper`] for systems that
//! have no scraper registered. Adding a tracker means registering one more
//! implementation.

pub mod github;
pub mod jira;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::site::{IssueSite, IssueSystem};

pub use github::GithubScraper;
pub use jira::{BrowserDriver, BrowserSession, ChromeDriver, JiraScraper, RenderedRow};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const USER_AGENT: &str = concat!("oss-issues/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub title: String,
    pub url: String,
    pub tags: BTreeSet<String>,
    pub created: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateCount {
    pub state: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueSnapshot {
    pub captured_at: DateTime<Utc>,
    pub system: String,
    pub url: String,
    pub open_issues: Vec<Issue>,
    pub state_counts: Vec<StateCount>,
}

impl IssueSnapshot {
    pub fn new(
        system: impl Into<String>,
        url: impl Into<String>,
        open_issues: Vec<Issue>,
        state_counts: Vec<StateCount>,
    ) -> Self {
        Self {
            captured_at: Utc::now(),
            system: system.into(),
            url: url.into(),
            open_issues,
            state_counts,
        }
    }

    pub fn empty(system: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(system, url, Vec::new(), Vec::new())
    }
}

pub trait IssueScraper: Send + Sync {
    fn scrape(&self, base_url: &str) -> Result<IssueSnapshot>;
}

/// Placeholder for trackers nobody has written a scraper for yet.
#[derive(Debug, Clone)]
pub struct NoOpScraper {
    system: String,
}

impl NoOpScraper {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
        }
    }
}

impl IssueScraper for NoOpScraper {
    fn scrape(&self, base_url: &str) -> Result<IssueSnapshot> {
        Ok(IssueSnapshot::empty(self.system.as_str(), base_url))
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub timeout: Duration,
    /// Chrome/Chromium binary for browser-rendered trackers; auto-detected when unset.
    pub chrome: Option<PathBuf>,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            chrome: None,
        }
    }
}

#[derive(Default)]
pub struct ScraperRegistry {
    scrapers: HashMap<IssueSystem, Box<dyn IssueScraper>>,
}

impl ScraperRegistry {
    /// A registry with nothing registered: every site gets a [`NoOpScraper`].
    pub fn new() -> Self {
        Self::default()
    }

    /// GitHub over plain HTTP, Jira through a headless browser.
    pub fn standard(settings: &ScrapeSettings) -> Result<Self> {
        Ok(Self::new()
            .with_scraper(IssueSystem::Github, GithubScraper::new(settings)?)
            .with_scraper(IssueSystem::Jira, JiraScraper::new(ChromeDriver::new(settings))))
    }

    pub fn with_scraper(mut self, system: IssueSystem, scraper: impl IssueScraper + 'static) -> Self {
        self.scrapers.insert(system, Box::new(scraper));
        self
    }

    pub fn is_registered(&self, system: IssueSystem) -> bool {
        self.scrapers.contains_key(&system)
    }

    pub fn scrape(&self, site: &IssueSite) -> Result<IssueSnapshot> {
        match self.scrapers.get(&site.system) {
            Some(scraper) => scraper.scrape(&site.url),
            None => NoOpScraper::new(site.system.tag()).scrape(&site.url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct Failing;

    impl IssueScraper for Failing {
        fn scrape(&self, base_url: &str) -> Result<IssueSnapshot> {
            Err(Error::scrape(base_url, "boom"))
        }
    }

    #[test]
    fn noop_returns_an_empty_snapshot_tagged_with_the_system() {
        let snapshot = NoOpScraper::new("bugzilla")
            .scrape("https://bugs.acme.org")
            .unwrap();
        assert_eq!(snapshot.system, "bugzilla");
        assert_eq!(snapshot.url, "https://bugs.acme.org");
        assert!(snapshot.open_issues.is_empty());
        assert!(snapshot.state_counts.is_empty());
    }

    #[test]
    fn registry_dispatches_by_system_and_falls_back_to_noop() {
        let registry = ScraperRegistry::new().with_scraper(IssueSystem::Jira, Failing);
        assert!(registry.is_registered(IssueSystem::Jira));

        let jira = IssueSite {
            system: IssueSystem::Jira,
            url: "https://issues.acme.org/browse/W".to_string(),
        };
        assert!(registry.scrape(&jira).is_err());

        let youtrack = IssueSite {
            system: IssueSystem::Youtrack,
            url: "https://youtrack.acme.org/issues/W".to_string(),
        };
        let snapshot = registry.scrape(&youtrack).unwrap();
        assert_eq!(snapshot.system, "youtrack");
        assert!(snapshot.open_issues.is_empty());
    }
}
