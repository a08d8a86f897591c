use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Coordinate, Model, ResolvedArtifact};
use crate::pom::MetadataReader;
use crate::repository::ArtifactResolver;

/// Longest parent chain followed before giving up.
pub const MAX_LINEAGE_DEPTH: usize = 32;

/// The artifact's own model followed by each ancestor up to the first model
/// without a parent.
///
/// The own POM is expected next to the artifact file; when it is not there it
/// is resolved like any parent. A parent that was already visited, or a chain
/// longer than [`MAX_LINEAGE_DEPTH`], is an [`Error::Lineage`].
pub fn lineage_of(
    artifact: &ResolvedArtifact,
    resolver: &dyn ArtifactResolver,
    reader: &dyn MetadataReader,
) -> Result<Vec<Model>> {
    let sibling = artifact.pom_path();
    let own_pom = if sibling.is_file() {
        sibling
    } else {
        resolver.resolve(&artifact.coordinate, "pom")?
    };

    let model = reader.read(&own_pom)?;
    let ancestors = walk_parents(&artifact.coordinate, &model, None, resolver, reader)?;

    let mut lineage = Vec::with_capacity(ancestors.len() + 1);
    lineage.push(model);
    lineage.extend(ancestors);
    debug!(artifact = %artifact.coordinate, depth = lineage.len(), "resolved lineage");
    Ok(lineage)
}

/// Ancestors of a checked-out project, nearest parent first.
///
/// Each parent is first looked for at `../pom.xml` relative to its child, the
/// way a multi-module checkout lays them out, and resolved from the repository
/// otherwise. Once a parent comes from the repository, its own ancestors do too.
pub fn ancestors_of(
    pom: &Path,
    model: &Model,
    resolver: &dyn ArtifactResolver,
    reader: &dyn MetadataReader,
) -> Result<Vec<Model>> {
    let Some(coordinate) = model.coordinate() else {
        return Ok(Vec::new());
    };
    walk_parents(&coordinate, model, Some(pom), resolver, reader)
}

fn walk_parents(
    origin: &Coordinate,
    child: &Model,
    child_pom: Option<&Path>,
    resolver: &dyn ArtifactResolver,
    reader: &dyn MetadataReader,
) -> Result<Vec<Model>> {
    let mut visited = HashSet::from([origin.clone()]);
    if let Some(c) = child.coordinate() {
        visited.insert(c);
    }

    let mut ancestors: Vec<Model> = Vec::new();
    let mut parent = child.parent.clone();
    let mut on_disk = child_pom.map(Path::to_path_buf);

    while let Some(coordinate) = parent {
        if ancestors.len() + 1 >= MAX_LINEAGE_DEPTH {
            return Err(Error::Lineage {
                coordinate: origin.to_string(),
                reason: format!("more than {MAX_LINEAGE_DEPTH} ancestors"),
            });
        }
        if !visited.insert(coordinate.clone()) {
            return Err(Error::Lineage {
                coordinate: origin.to_string(),
                reason: format!("parent {coordinate} appears twice"),
            });
        }

        let model = match on_disk.as_deref().and_then(|p| checked_out_parent(p, &coordinate, reader)) {
            Some((pom, model)) => {
                on_disk = Some(pom);
                model
            }
            None => {
                on_disk = None;
                reader.read(&resolver.resolve(&coordinate, "pom")?)?
            }
        };
        parent = model.parent.clone();
        ancestors.push(model);
    }
    Ok(ancestors)
}

/// `../pom.xml` next to `child_pom`, if it declares `parent`.
fn checked_out_parent(
    child_pom: &Path,
    parent: &Coordinate,
    reader: &dyn MetadataReader,
) -> Option<(PathBuf, Model)> {
    let candidate = child_pom.parent()?.parent()?.join("pom.xml");
    if !candidate.is_file() {
        return None;
    }
    let model = reader.read(&candidate).ok()?;
    if model.coordinate().as_ref() != Some(parent) {
        debug!(pom = %candidate.display(), %parent, "relative parent pom does not match");
        return None;
    }
    Some((candidate, model))
}
