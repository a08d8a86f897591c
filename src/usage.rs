//! Per-dependency usage counts from import statements.
//!
//! Every direct dependency (except `system` scope) is resolved and cataloged,
//! giving a class-name index. Each import that names an indexed class adds
//! one to the owning dependency. When two dependencies package the same
//! class, the one declared first keeps it.

use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::catalog::classes_of;
use crate::error::{Error, Result};
use crate::imports::{collect_imports, imports_of};
use crate::model::{Dependency, ResolvedArtifact, Scope};
use crate::project::Project;
use crate::repository::ArtifactResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// The first resolution or parse failure aborts the computation.
    #[default]
    FailFast,
    /// Failures are collected in [`UsageReport::failures`] and the rest carries on.
    SkipAndContinue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyUsage {
    pub artifact: ResolvedArtifact,
    pub scope: Scope,
    pub classes: usize,
    pub count: usize,
}

#[derive(Debug, Default)]
pub struct UsageReport {
    /// One entry per indexed dependency, in declaration order.
    pub usages: Vec<DependencyUsage>,
    pub failures: Vec<Error>,
    pub total_imports: usize,
    /// Class names claimed by more than one dependency.
    pub collisions: usize,
}

impl UsageReport {
    /// Usages by count, highest first; ties keep declaration order.
    pub fn ranked(&self) -> Vec<DependencyUsage> {
        rank(&self.usages)
    }
}

pub fn rank(usages: &[DependencyUsage]) -> Vec<DependencyUsage> {
    let mut ranked = usages.to_vec();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

pub fn compute_usage(
    project: &Project,
    resolver: &dyn ArtifactResolver,
    policy: FailurePolicy,
) -> Result<UsageReport> {
    let mut tally = Tally::new(resolver, policy);
    let index = tally.index(project.dependencies.iter(), None)?;
    tally.count(&project.source_roots, &index)?;
    Ok(tally.report)
}

/// Usage of each module's dependencies by that module's own sources.
///
/// Only `modules` are scanned; the top project contributes nothing but its
/// identity. Dependencies on other reactor members are left out, so a module
/// importing a sibling's classes is not counted against the sibling.
pub fn compute_reactor_usage(
    top: &Project,
    modules: &[Project],
    resolver: &dyn ArtifactResolver,
    policy: FailurePolicy,
) -> Result<UsageReport> {
    let members: HashSet<(&str, &str)> = std::iter::once(top)
        .chain(modules)
        .map(|p| (p.coordinate.group_id.as_str(), p.coordinate.artifact_id.as_str()))
        .collect();

    let mut tally = Tally::new(resolver, policy);
    for module in modules {
        let external = module.dependencies.iter().filter(|d| {
            !members.contains(&(
                d.coordinate.group_id.as_str(),
                d.coordinate.artifact_id.as_str(),
            ))
        });
        let index = tally.index(external, Some(module.artifact_id()))?;
        tally.count(&module.source_roots, &index)?;
    }
    Ok(tally.report)
}

struct Tally<'a> {
    resolver: &'a dyn ArtifactResolver,
    policy: FailurePolicy,
    report: UsageReport,
    catalogs: HashMap<PathBuf, Vec<String>>,
}

impl<'a> Tally<'a> {
    fn new(resolver: &'a dyn ArtifactResolver, policy: FailurePolicy) -> Self {
        Self {
            resolver,
            policy,
            report: UsageReport::default(),
            catalogs: HashMap::new(),
        }
    }

    fn fail(&mut self, error: Error) -> Result<()> {
        match self.policy {
            FailurePolicy::FailFast => Err(error),
            FailurePolicy::SkipAndContinue => {
                warn!(%error, "skipping");
                self.report.failures.push(error);
                Ok(())
            }
        }
    }

    /// Adds a usage slot per dependency and returns class name -> slot.
    fn index<'d>(
        &mut self,
        dependencies: impl Iterator<Item = &'d Dependency>,
        owner: Option<&str>,
    ) -> Result<HashMap<String, usize>> {
        let mut index = HashMap::new();

        for dep in dependencies.filter(|d| d.scope != Scope::System) {
            let artifact = match self.resolver.resolve(&dep.coordinate, dep.extension()) {
                Ok(file) => ResolvedArtifact {
                    coordinate: dep.coordinate.clone(),
                    file,
                    owner: owner.map(str::to_string),
                },
                Err(e) => {
                    self.fail(e)?;
                    continue;
                }
            };

            let classes = match self.catalog(&artifact) {
                Ok(classes) => classes,
                Err(e) => {
                    self.fail(e)?;
                    continue;
                }
            };

            let slot = self.report.usages.len();
            let class_count = classes.len();
            for class in classes {
                match index.entry(class) {
                    Entry::Vacant(v) => {
                        v.insert(slot);
                    }
                    Entry::Occupied(o) => {
                        debug!(class = %o.key(), artifact = %artifact.coordinate, "class already claimed");
                        self.report.collisions += 1;
                    }
                }
            }

            self.report.usages.push(DependencyUsage {
                artifact,
                classes: class_count,
                scope: dep.scope,
                count: 0,
            });
        }

        Ok(index)
    }

    fn catalog(&mut self, artifact: &ResolvedArtifact) -> Result<Vec<String>> {
        if let Some(classes) = self.catalogs.get(&artifact.file) {
            return Ok(classes.clone());
        }
        let classes = classes_of(artifact)?;
        self.catalogs.insert(artifact.file.clone(), classes.clone());
        Ok(classes)
    }

    fn count(&mut self, roots: &[PathBuf], index: &HashMap<String, usize>) -> Result<()> {
        let imports = match self.policy {
            FailurePolicy::FailFast => imports_of(roots)?,
            FailurePolicy::SkipAndContinue => {
                let scan = collect_imports(roots);
                for failure in scan.failures {
                    warn!(error = %failure, "skipping unparsable source");
                    self.report.failures.push(failure);
                }
                scan.imports
            }
        };

        self.report.total_imports += imports.len();
        for import in &imports {
            if let Some(&slot) = index.get(import) {
                self.report.usages[slot].count += 1;
            }
        }
        Ok(())
    }
}
