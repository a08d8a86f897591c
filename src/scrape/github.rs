use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::{debug, info};
use url::Url;

use super::{Issue, IssueScraper, IssueSnapshot, ScrapeSettings, StateCount, USER_AGENT};
use crate::error::{Error, Result};

pub const SYSTEM: &str = "github";
pub const OPEN_ISSUES_QUERY: &str = "?q=is%3Aissue+is%3Aopen+sort%3Aupdated-desc";

static STATE_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<count>[0-9][0-9,]*) (?P<state>Open|Closed)").expect("state count regex")
});

static STATES: LazyLock<Selector> = LazyLock::new(|| selector("div.states"));
static ISSUE_ROW: LazyLock<Selector> = LazyLock::new(|| selector("li.js-issue-row"));
static TITLE_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.js-navigation-open"));
static LABEL: LazyLock<Selector> = LazyLock::new(|| selector("a.IssueLabel"));
static RELATIVE_TIME: LazyLock<Selector> = LazyLock::new(|| selector("relative-time"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css}: {e}"))
}

/// Scrapes the first page of a repository's issue list.
///
/// Redirects are not followed: a moved or deleted repository answers with a
/// 301/404/410 and yields an empty snapshot instead of an error.
#[derive(Debug, Clone)]
pub struct GithubScraper {
    client: Client,
}

impl GithubScraper {
    pub fn new(settings: &ScrapeSettings) -> Result<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::scrape("https://github.com", e))?;
        Ok(Self { client })
    }
}

impl IssueScraper for GithubScraper {
    fn scrape(&self, base_url: &str) -> Result<IssueSnapshot> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), OPEN_ISSUES_QUERY);
        let page_url = Url::parse(&url).map_err(|e| Error::scrape(&url, e))?;

        info!(%url, "scraping github issues");
        let response = self
            .client
            .get(page_url.clone())
            .send()
            .map_err(|e| Error::scrape(&url, e))?;

        if response.status() != StatusCode::OK {
            debug!(%url, status = response.status().as_u16(), "no issue page");
            return Ok(IssueSnapshot::empty(SYSTEM, url));
        }

        let body = response.text().map_err(|e| Error::scrape(&url, e))?;
        let (issues, counts) =
            parse_issue_page(&body, &page_url).map_err(|reason| Error::scrape(&url, reason))?;
        Ok(IssueSnapshot::new(SYSTEM, url, issues, counts))
    }
}

/// Issue rows and the open/closed summary of one rendered issue list page.
/// Relative issue links are resolved against `page_url`.
pub fn parse_issue_page(
    html: &str,
    page_url: &Url,
) -> std::result::Result<(Vec<Issue>, Vec<StateCount>), String> {
    let doc = Html::parse_document(html);

    let states = doc
        .select(&STATES)
        .next()
        .ok_or_else(|| "issue state summary (div.states) not found".to_string())?;
    let summary = element_text(&states);
    let counts = STATE_COUNT
        .captures_iter(&summary)
        .filter_map(|caps| {
            let count = caps["count"].replace(',', "").parse().ok()?;
            Some(StateCount {
                state: caps["state"].to_string(),
                count,
            })
        })
        .collect();

    let mut issues = Vec::new();
    for row in doc.select(&ISSUE_ROW) {
        let title = row
            .select(&TITLE_LINK)
            .next()
            .ok_or_else(|| "issue row without a title link".to_string())?;
        let href = title
            .value()
            .attr("href")
            .ok_or_else(|| "issue title link without href".to_string())?;
        let url = page_url
            .join(href)
            .map_err(|e| format!("bad issue link {href:?}: {e}"))?;

        let tags: BTreeSet<String> = row
            .select(&LABEL)
            .map(|label| element_text(&label))
            .filter(|t| !t.is_empty())
            .collect();

        let last_activity = row
            .select(&RELATIVE_TIME)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|d| d.with_timezone(&Utc));

        issues.push(Issue {
            title: element_text(&title),
            url: url.to_string(),
            tags,
            created: None,
            last_activity,
        });
    }

    Ok((issues, counts))
}

fn element_text(el: &ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
