//! Loading a project (or a multi-module reactor) from its pom.xml.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Coordinate, Dependency, Model, Scope};
use crate::lineage::ancestors_of;
use crate::pom::{MetadataReader, interpolate_model};
use crate::repository::ArtifactResolver;

const DEFAULT_SOURCE_DIR: &str = "src/main/java";
const MAX_MODULE_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub coordinate: Coordinate,
    pub name: String,
    pub base_dir: PathBuf,
    pub dependencies: Vec<Dependency>,
    pub source_roots: Vec<PathBuf>,
    /// pom.xml paths of declared sub-modules.
    pub modules: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Reactor {
    pub top: Project,
    pub modules: Vec<Project>,
}

/// Settings a module picks up from the aggregator above it.
#[derive(Debug, Clone, Default)]
struct Inherited {
    properties: BTreeMap<String, String>,
    managed: HashMap<(String, String), String>,
}

impl Project {
    /// Loads `pom` with the properties and managed versions of its parent chain.
    pub fn load(
        pom: &Path,
        reader: &dyn MetadataReader,
        resolver: &dyn ArtifactResolver,
    ) -> Result<Self> {
        let loader = Loader { reader, resolver };
        loader.load(pom, &Inherited::default()).map(|(project, _)| project)
    }

    pub fn artifact_id(&self) -> &str {
        &self.coordinate.artifact_id
    }
}

pub fn load_reactor(
    top_pom: &Path,
    reader: &dyn MetadataReader,
    resolver: &dyn ArtifactResolver,
) -> Result<Reactor> {
    let loader = Loader { reader, resolver };
    let (top, inherited) = loader.load(top_pom, &Inherited::default())?;
    let mut modules = Vec::new();
    loader.collect_modules(&top, &inherited, 1, &mut modules)?;
    debug!(top = %top.coordinate, modules = modules.len(), "loaded reactor");
    Ok(Reactor { top, modules })
}

struct Loader<'a> {
    reader: &'a dyn MetadataReader,
    resolver: &'a dyn ArtifactResolver,
}

impl Loader<'_> {
    fn collect_modules(
        &self,
        project: &Project,
        inherited: &Inherited,
        depth: usize,
        out: &mut Vec<Project>,
    ) -> Result<()> {
        if project.modules.is_empty() {
            return Ok(());
        }
        if depth > MAX_MODULE_DEPTH {
            return Err(Error::parse(
                &project.base_dir,
                format!("module nesting deeper than {MAX_MODULE_DEPTH}"),
            ));
        }
        for pom in &project.modules {
            let (module, module_inherited) = self.load(pom, inherited)?;
            out.push(module.clone());
            self.collect_modules(&module, &module_inherited, depth + 1, out)?;
        }
        Ok(())
    }

    fn load(&self, pom: &Path, inherited: &Inherited) -> Result<(Project, Inherited)> {
        let mut model = self.reader.read(pom)?;

        // Ancestors only matter for what the project leaves undeclared, so an
        // unreachable parent is reported when a dependency actually needs it.
        let (ancestors, ancestry_gap) = match ancestors_of(pom, &model, self.resolver, self.reader) {
            Ok(ancestors) => (ancestors, None),
            Err(e) => {
                warn!(pom = %pom.display(), error = %e, "parent chain incomplete");
                (Vec::new(), Some(e.to_string()))
            }
        };

        let mut properties = inherited.properties.clone();
        let mut managed_decls = Vec::new();
        for ancestor in ancestors.iter().rev() {
            properties.extend(ancestor.properties.clone());
            managed_decls.extend(ancestor.dependency_management.iter().cloned());
        }
        managed_decls.append(&mut model.dependency_management);
        model.dependency_management = managed_decls;
        interpolate_model(&mut model, &properties);

        let coordinate = model
            .coordinate()
            .ok_or_else(|| Error::parse(pom, "cannot determine groupId/version"))?;

        let mut next = Inherited {
            properties,
            managed: inherited.managed.clone(),
        };
        next.properties.extend(model.properties.clone());
        for managed in &model.dependency_management {
            if let Some(v) = &managed.version {
                next.managed.insert(
                    (managed.group_id.clone(), managed.artifact_id.clone()),
                    v.clone(),
                );
            }
        }

        let dependencies = direct_dependencies(pom, &model, &next, ancestry_gap.as_deref())?;
        let base_dir = pom
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let source_dir = model
            .source_directory
            .as_deref()
            .unwrap_or(DEFAULT_SOURCE_DIR);
        let modules = model
            .modules
            .iter()
            .map(|m| {
                let p = base_dir.join(m);
                if p.is_dir() { p.join("pom.xml") } else { p }
            })
            .collect();

        let project = Project {
            name: model.display_name().to_string(),
            coordinate,
            source_roots: vec![base_dir.join(source_dir)],
            base_dir,
            dependencies,
            modules,
        };
        Ok((project, next))
    }
}

fn direct_dependencies(
    pom: &Path,
    model: &Model,
    inherited: &Inherited,
    ancestry_gap: Option<&str>,
) -> Result<Vec<Dependency>> {
    model
        .dependencies
        .iter()
        .map(|d| {
            let version = d
                .version
                .clone()
                .or_else(|| {
                    inherited
                        .managed
                        .get(&(d.group_id.clone(), d.artifact_id.clone()))
                        .cloned()
                })
                .ok_or_else(|| {
                    let mut reason =
                        format!("dependency {}:{} has no version", d.group_id, d.artifact_id);
                    if let Some(gap) = ancestry_gap {
                        reason.push_str(&format!(" (parent chain incomplete: {gap})"));
                    }
                    Error::parse(pom, reason)
                })?;
            let scope = d.scope.as_deref().map(Scope::parse).unwrap_or_default();
            let dep = Dependency::new(
                Coordinate::new(d.group_id.as_str(), d.artifact_id.as_str(), version),
                scope,
            );
            Ok(match d.kind.as_deref() {
                Some(kind) => dep.with_kind(kind),
                None => dep,
            })
        })
        .collect()
}
