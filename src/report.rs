//! Ranked usage joined with each dependency's issue snapshot.
//!
//! Issue lookup runs per dependency on a bounded rayon pool. A failed scrape
//! only marks its own entry as skipped; lineage and site failures abort the
//! report unless the policy says to keep going.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt::Write as _;
use tracing::warn;

use crate::config::ReportConfig;
use crate::error::Result;
use crate::lineage::lineage_of;
use crate::model::ResolvedArtifact;
use crate::pom::MetadataReader;
use crate::repository::ArtifactResolver;
use crate::scrape::{IssueSnapshot, ScraperRegistry};
use crate::site::{IssueSite, resolve_issue_site};
use crate::usage::{DependencyUsage, FailurePolicy, UsageReport};

const MAX_TEXT_ISSUES: usize = 10;

#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub resolver: &'a dyn ArtifactResolver,
    pub reader: &'a dyn MetadataReader,
    pub scrapers: &'a ScraperRegistry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum IssuePanel {
    /// Nothing in the lineage points at an issue tracker.
    Unknown,
    Unscraped {
        site: IssueSite,
    },
    Snapshot {
        site: IssueSite,
        snapshot: IssueSnapshot,
    },
    Skipped {
        site: IssueSite,
        reason: String,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub name: String,
    pub coordinate: String,
    pub owner: Option<String>,
    pub usage: usize,
    pub classes: usize,
    pub issues: IssuePanel,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub project: String,
    pub generated_at: DateTime<Utc>,
    pub total_imports: usize,
    pub entries: Vec<ReportEntry>,
    pub failures: Vec<String>,
}

pub fn assemble(
    project_name: &str,
    usage: &UsageReport,
    deps: Collaborators<'_>,
    config: &ReportConfig,
) -> Result<Report> {
    let ranked: Vec<DependencyUsage> = usage
        .ranked()
        .into_iter()
        .filter(|u| config.include_unused || u.count > 0)
        .collect();

    let outcomes: Vec<Result<ReportEntry>> = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.scrape_workers.max(1))
        .build()
    {
        Ok(pool) => pool.install(|| {
            ranked
                .par_iter()
                .map(|u| entry_for(u, deps, config))
                .collect()
        }),
        Err(e) => {
            warn!(error = %e, "worker pool unavailable, scraping sequentially");
            ranked.iter().map(|u| entry_for(u, deps, config)).collect()
        }
    };

    let entries = outcomes.into_iter().collect::<Result<Vec<_>>>()?;

    Ok(Report {
        project: project_name.to_string(),
        generated_at: Utc::now(),
        total_imports: usage.total_imports,
        entries,
        failures: usage.failures.iter().map(ToString::to_string).collect(),
    })
}

fn entry_for(
    usage: &DependencyUsage,
    deps: Collaborators<'_>,
    config: &ReportConfig,
) -> Result<ReportEntry> {
    let (name, issues) = issue_panel(&usage.artifact, deps, config)?;
    Ok(ReportEntry {
        name,
        coordinate: usage.artifact.coordinate.to_string(),
        owner: usage.artifact.owner.clone(),
        usage: usage.count,
        classes: usage.classes,
        issues,
    })
}

fn issue_panel(
    artifact: &ResolvedArtifact,
    deps: Collaborators<'_>,
    config: &ReportConfig,
) -> Result<(String, IssuePanel)> {
    let fallback_name = artifact.coordinate.artifact_id.clone();

    let located = lineage_of(artifact, deps.resolver, deps.reader).and_then(|lineage| {
        let name = lineage
            .first()
            .map(|m| m.display_name().to_string())
            .unwrap_or_else(|| fallback_name.clone());
        Ok((name, resolve_issue_site(&lineage)?))
    });

    let (name, site) = match located {
        Ok((name, Some(site))) => (name, site),
        Ok((name, None)) => return Ok((name, IssuePanel::Unknown)),
        Err(e) => match config.failure_policy {
            FailurePolicy::FailFast => return Err(e),
            FailurePolicy::SkipAndContinue => {
                warn!(artifact = %artifact.coordinate, error = %e, "issue site lookup failed");
                return Ok((fallback_name, IssuePanel::Failed { reason: e.to_string() }));
            }
        },
    };

    if !config.scrape {
        return Ok((name, IssuePanel::Unscraped { site }));
    }

    let panel = match deps.scrapers.scrape(&site) {
        Ok(snapshot) => IssuePanel::Snapshot { site, snapshot },
        Err(e) => {
            warn!(artifact = %artifact.coordinate, error = %e, "scrape failed, skipping issues");
            IssuePanel::Skipped {
                site,
                reason: e.to_string(),
            }
        }
    };
    Ok((name, panel))
}

pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "project: {}", report.project);
    let _ = writeln!(out, "total_imports: {}", report.total_imports);

    for (rank, entry) in report.entries.iter().enumerate() {
        let owner = entry
            .owner
            .as_deref()
            .map(|o| format!(" [{o}]"))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{}. {} ({}){owner} usage: {}",
            rank + 1,
            entry.name,
            entry.coordinate,
            entry.usage
        );

        match &entry.issues {
            IssuePanel::Unknown => {
                let _ = writeln!(out, "   issues: unknown");
            }
            IssuePanel::Unscraped { site } => {
                let _ = writeln!(out, "   issues: {} {}", site.system, site.url);
            }
            IssuePanel::Skipped { site, reason } => {
                let _ = writeln!(out, "   issues: {} {} (skipped: {reason})", site.system, site.url);
            }
            IssuePanel::Failed { reason } => {
                let _ = writeln!(out, "   issues: failed ({reason})");
            }
            IssuePanel::Snapshot { site, snapshot } => {
                let counts = snapshot
                    .state_counts
                    .iter()
                    .map(|c| format!("{} {}", c.count, c.state))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = writeln!(
                    out,
                    "   issues: {} {} ({} listed{}{counts})",
                    site.system,
                    snapshot.url,
                    snapshot.open_issues.len(),
                    if counts.is_empty() { "" } else { "; " }
                );
                for issue in snapshot.open_issues.iter().take(MAX_TEXT_ISSUES) {
                    let tags = if issue.tags.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", issue.tags.iter().cloned().collect::<Vec<_>>().join(", "))
                    };
                    let _ = writeln!(out, "     - {} <{}>{tags}", issue.title, issue.url);
                }
            }
        }
    }

    for failure in &report.failures {
        let _ = writeln!(out, "failure: {failure}");
    }
    out
}
