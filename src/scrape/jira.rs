use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use super::{Issue, IssueScraper, IssueSnapshot, ScrapeSettings};
use crate::error::{Error, Result};

pub const SYSTEM: &str = "jira";
pub const OPEN_ISSUES_QUERY: &str = "?filter=allopenissues";

const ISSUE_ROW: &str = "ol.issue-list > li[data-key]";
const ISSUE_LINK: &str = "a.splitview-issue-link";
const ISSUE_SUMMARY: &str = "span.issue-link-summary";

/// Title and link of one rendered issue row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub title: String,
    pub href: String,
}

/// One live browser, owned by a single scrape call.
pub trait BrowserSession {
    fn navigate(&mut self, url: &str) -> std::result::Result<(), String>;

    /// Rows matching `row`, each reading its title from `title` and its link from `link`.
    /// No matching rows is an empty list; a row missing either part is an error.
    fn rows(
        &mut self,
        row: &str,
        link: &str,
        title: &str,
    ) -> std::result::Result<Vec<RenderedRow>, String>;

    fn quit(&mut self) -> std::result::Result<(), String>;
}

pub trait BrowserDriver: Send + Sync {
    fn launch(&self) -> std::result::Result<Box<dyn BrowserSession>, String>;
}

/// Quits the session when dropped, on every exit path of a scrape.
struct SessionGuard {
    session: Box<dyn BrowserSession>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Err(e) = self.session.quit() {
            warn!(error = %e, "failed to quit browser session");
        }
    }
}

/// Scrapes Jira's JavaScript-rendered issue navigator. State counts are not
/// exposed there, so snapshots carry none.
pub struct JiraScraper<D = ChromeDriver> {
    driver: D,
}

impl<D: BrowserDriver> JiraScraper<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }
}

impl<D: BrowserDriver> IssueScraper for JiraScraper<D> {
    fn scrape(&self, base_url: &str) -> Result<IssueSnapshot> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), OPEN_ISSUES_QUERY);
        let page_url = Url::parse(&url).map_err(|e| Error::scrape(&url, e))?;

        info!(%url, "scraping jira issues");
        let mut guard = SessionGuard {
            session: self
                .driver
                .launch()
                .map_err(|e| Error::scrape(&url, format!("browser launch failed: {e}")))?,
        };

        guard
            .session
            .navigate(&url)
            .map_err(|e| Error::scrape(&url, e))?;
        let rows = guard
            .session
            .rows(ISSUE_ROW, ISSUE_LINK, ISSUE_SUMMARY)
            .map_err(|e| Error::scrape(&url, e))?;

        let issues = rows
            .into_iter()
            .map(|row| {
                let link = page_url
                    .join(&row.href)
                    .map_err(|e| Error::scrape(&url, format!("bad issue link {:?}: {e}", row.href)))?;
                Ok(Issue {
                    title: row.title,
                    url: link.to_string(),
                    tags: BTreeSet::new(),
                    created: None,
                    last_activity: None,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(IssueSnapshot::new(SYSTEM, url, issues, Vec::new()))
    }
}

/// Launches a headless Chrome/Chromium per session.
#[derive(Debug, Clone)]
pub struct ChromeDriver {
    path: Option<PathBuf>,
    timeout: Duration,
}

impl ChromeDriver {
    pub fn new(settings: &ScrapeSettings) -> Self {
        Self {
            path: settings.chrome.clone(),
            timeout: settings.timeout,
        }
    }
}

impl BrowserDriver for ChromeDriver {
    fn launch(&self) -> std::result::Result<Box<dyn BrowserSession>, String> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .path(self.path.clone())
            .idle_browser_timeout(self.timeout)
            .build()
            .map_err(|e| e.to_string())?;
        let browser = Browser::new(options).map_err(|e| e.to_string())?;
        let tab = browser.new_tab().map_err(|e| e.to_string())?;
        tab.set_default_timeout(self.timeout);
        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            tab,
        }))
    }
}

struct ChromeSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl BrowserSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> std::result::Result<(), String> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn rows(
        &mut self,
        row: &str,
        link: &str,
        title: &str,
    ) -> std::result::Result<Vec<RenderedRow>, String> {
        let elements = matched_or_empty(self.tab.find_elements(row))?;

        let mut rows = Vec::with_capacity(elements.len());
        for element in elements {
            let link_el = element.find_element(link).map_err(|e| e.to_string())?;
            let title_el = element.find_element(title).map_err(|e| e.to_string())?;
            let href = link_el
                .get_attribute_value("href")
                .map_err(|e| e.to_string())?
                .ok_or_else(|| format!("{link} without href"))?;
            let text = title_el.get_inner_text().map_err(|e| e.to_string())?;
            rows.push(RenderedRow {
                title: text.trim().to_string(),
                href,
            });
        }
        Ok(rows)
    }

    fn quit(&mut self) -> std::result::Result<(), String> {
        let Some(browser) = self.browser.take() else {
            return Ok(());
        };
        let closed = self.tab.close(true).map(|_| ()).map_err(|e| e.to_string());
        // Dropping the browser kills the child process.
        drop(browser);
        closed
    }
}

/// A selector matching nothing is an empty page; any other browser error is not.
fn matched_or_empty<T>(found: anyhow::Result<Vec<T>>) -> std::result::Result<Vec<T>, String> {
    match found {
        Ok(elements) => Ok(elements),
        Err(e) if e.downcast_ref::<NoElementFound>().is_some() => Ok(Vec::new()),
        Err(e) => Err(e.to_string()),
    }
}
