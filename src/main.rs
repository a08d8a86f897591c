use anyhow::{Context, Result};
use clap::Parser;
use oss_issues::cli::{Cli, Commands, OutputFormat, ProjectArgs};
use oss_issues::config::{self, ReportConfig};
use oss_issues::error::Error;
use oss_issues::imports::collect_imports;
use oss_issues::lineage::lineage_of;
use oss_issues::logging;
use oss_issues::model::{Coordinate, ResolvedArtifact};
use oss_issues::pom::{MetadataReader, PomReader};
use oss_issues::project::{Project, load_reactor};
use oss_issues::report::{Collaborators, Report, assemble, render_text};
use oss_issues::repository::ArtifactResolver;
use oss_issues::scrape::ScraperRegistry;
use oss_issues::site::{IssueSite, IssueSystem, resolve_issue_site};
use oss_issues::usage::{DependencyUsage, UsageReport, compute_reactor_usage, compute_usage};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command.clone() {
        Commands::Report {
            project,
            format,
            jobs,
            include_unused,
            no_scrape,
            output,
        } => {
            let resolver = config::build_resolver(&cli)?;
            let reader = PomReader;
            let (name, usage) = analyze(&project, &resolver, &reader)?;

            let scrapers = if no_scrape {
                ScraperRegistry::new()
            } else {
                ScraperRegistry::standard(&config::scrape_settings(&cli))?
            };
            let report_config = ReportConfig {
                failure_policy: config::failure_policy(&project),
                scrape_workers: jobs.max(1),
                include_unused,
                scrape: !no_scrape,
            };
            let deps = Collaborators {
                resolver: &resolver,
                reader: &reader,
                scrapers: &scrapers,
            };
            let report = assemble(&name, &usage, deps, &report_config)?;
            write_report(&report, format, output.as_deref())?;
        }
        Commands::Usage { project } => {
            let resolver = config::build_resolver(&cli)?;
            let (name, usage) = analyze(&project, &resolver, &PomReader)?;
            let output = UsageOutput::new(name, &usage);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Imports { roots } => {
            let scan = collect_imports(&roots);
            let output = ImportsOutput {
                files: scan.files,
                imports: scan.imports,
                failures: scan.failures.iter().map(ToString::to_string).collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Site { coordinate } => {
            let coordinate: Coordinate = coordinate.parse().map_err(anyhow::Error::msg)?;
            let resolver = config::build_resolver(&cli)?;
            let output = site_of(coordinate, &resolver, &PomReader)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Scrape { system, url } => {
            let system =
                IssueSystem::classify(&system).ok_or_else(|| Error::UnrecognizedIssueSystem(system))?;
            let scrapers = ScraperRegistry::standard(&config::scrape_settings(&cli))?;
            let snapshot = scrapers.scrape(&IssueSite { system, url })?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }

    Ok(())
}

/// Loads the project (or reactor) and computes dependency usage.
fn analyze(
    args: &ProjectArgs,
    resolver: &dyn ArtifactResolver,
    reader: &dyn MetadataReader,
) -> Result<(String, UsageReport)> {
    let start = Instant::now();
    let pom = config::resolve_pom(args.pom.as_deref())?;
    let policy = config::failure_policy(args);

    let (name, usage) = if args.reactor {
        let reactor = load_reactor(&pom, reader, resolver)?;
        if reactor.modules.is_empty() {
            warn!(pom = %pom.display(), "no modules declared; analyzing as a single project");
            let usage = compute_usage(&reactor.top, resolver, policy)?;
            (reactor.top.name.clone(), usage)
        } else {
            let usage = compute_reactor_usage(&reactor.top, &reactor.modules, resolver, policy)?;
            (reactor.top.name.clone(), usage)
        }
    } else {
        let project = Project::load(&pom, reader, resolver)?;
        let usage = compute_usage(&project, resolver, policy)?;
        (project.name.clone(), usage)
    };

    info!(
        dependencies = usage.usages.len(),
        imports = usage.total_imports,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "usage computed"
    );
    Ok((name, usage))
}

fn site_of(
    coordinate: Coordinate,
    resolver: &dyn ArtifactResolver,
    reader: &dyn MetadataReader,
) -> Result<SiteOutput> {
    let pom = resolver.resolve(&coordinate, "pom")?;
    let artifact = ResolvedArtifact {
        coordinate: coordinate.clone(),
        file: pom,
        owner: None,
    };
    let lineage = lineage_of(&artifact, resolver, reader)?;
    let site = resolve_issue_site(&lineage)?;
    Ok(SiteOutput {
        coordinate: coordinate.to_string(),
        lineage: lineage
            .iter()
            .map(|m| {
                m.coordinate()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| m.artifact_id.clone())
            })
            .collect(),
        site,
    })
}

#[derive(Debug, Serialize)]
struct UsageOutput {
    project: String,
    total_imports: usize,
    collisions: usize,
    usages: Vec<DependencyUsage>,
    failures: Vec<String>,
}

impl UsageOutput {
    fn new(project: String, usage: &UsageReport) -> Self {
        Self {
            project,
            total_imports: usage.total_imports,
            collisions: usage.collisions,
            usages: usage.ranked(),
            failures: usage.failures.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ImportsOutput {
    files: usize,
    imports: Vec<String>,
    failures: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SiteOutput {
    coordinate: String,
    lineage: Vec<String>,
    site: Option<IssueSite>,
}

fn write_report(report: &Report, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
        OutputFormat::Text => render_text(report),
    };

    if let Some(path) = output {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    } else {
        print!("{content}");
        if !content.ends_with('\n') {
            println!();
        }
    }

    Ok(())
}
