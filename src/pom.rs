//! POM metadata reading with quick-xml.

use quick_xml::Reader;
use quick_xml::events::Event;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::model::{Coordinate, DeclaredDependency, IssueManagement, Model, Scm};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder regex"));

const MAX_INTERPOLATION_PASSES: usize = 8;

pub trait MetadataReader: Send + Sync {
    fn read(&self, pom: &Path) -> Result<Model>;
}

impl<T: MetadataReader + ?Sized> MetadataReader for &T {
    fn read(&self, pom: &Path) -> Result<Model> {
        (**self).read(pom)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PomReader;

impl MetadataReader for PomReader {
    fn read(&self, pom: &Path) -> Result<Model> {
        let content = std::fs::read_to_string(pom).map_err(|e| Error::parse(pom, e))?;
        parse_pom(&content).map_err(|reason| Error::parse(pom, reason))
    }
}

#[derive(Default)]
struct PartialParent {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
}

pub fn parse_pom(content: &str) -> std::result::Result<Model, String> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut model = Model::default();
    let mut parent: Option<PartialParent> = None;
    let mut dependency: Option<DeclaredDependency> = None;
    let mut saw_project = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).to_string());
                open_element(&path, &mut model, &mut parent, &mut dependency);
                saw_project |= path.len() == 1 && path[0] == "project";
            }
            Ok(Event::Empty(ref e)) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).to_string());
                open_element(&path, &mut model, &mut parent, &mut dependency);
                assign_text(&path, String::new(), &mut model, &mut parent, &mut dependency);
                saw_project |= path.len() == 1 && path[0] == "project";
                path.pop();
            }
            Ok(Event::End(_)) => {
                if is_dependency(&path)
                    && let Some(dep) = dependency.take()
                {
                    if path.len() == 3 {
                        model.dependencies.push(dep);
                    } else {
                        model.dependency_management.push(dep);
                    }
                }
                path.pop();
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(|e| e.to_string())?.to_string();
                assign_text(&path, text, &mut model, &mut parent, &mut dependency);
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e).trim().to_string();
                assign_text(&path, text, &mut model, &mut parent, &mut dependency);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML parse error at position {}: {e}",
                    reader.buffer_position()
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_project {
        return Err("missing <project> root element".to_string());
    }
    if model.artifact_id.is_empty() {
        return Err("missing <artifactId>".to_string());
    }

    if let Some(p) = parent {
        match (p.group_id, p.artifact_id, p.version) {
            (Some(g), Some(a), Some(v)) => model.parent = Some(Coordinate::new(g, a, v)),
            _ => return Err("incomplete <parent> declaration".to_string()),
        }
    }

    interpolate_model(&mut model, &BTreeMap::new());
    Ok(model)
}

fn is_dependency(path: &[String]) -> bool {
    let segs: Vec<&str> = path.iter().map(String::as_str).collect();
    matches!(
        segs.as_slice(),
        ["project", "dependencies", "dependency"]
            | ["project", "dependencyManagement", "dependencies", "dependency"]
    )
}

fn open_element(
    path: &[String],
    model: &mut Model,
    parent: &mut Option<PartialParent>,
    dependency: &mut Option<DeclaredDependency>,
) {
    let segs: Vec<&str> = path.iter().map(String::as_str).collect();
    match segs.as_slice() {
        ["project", "parent"] => {
            parent.get_or_insert_with(PartialParent::default);
        }
        ["project", "issueManagement"] => {
            model
                .issue_management
                .get_or_insert_with(IssueManagement::default);
        }
        ["project", "scm"] => {
            model.scm.get_or_insert_with(Scm::default);
        }
        _ if is_dependency(path) => *dependency = Some(DeclaredDependency::default()),
        _ => {}
    }
}

fn assign_text(
    path: &[String],
    text: String,
    model: &mut Model,
    parent: &mut Option<PartialParent>,
    dependency: &mut Option<DeclaredDependency>,
) {
    let value = Some(text.clone()).filter(|t| !t.is_empty());
    let segs: Vec<&str> = path.iter().map(String::as_str).collect();
    match segs.as_slice() {
        ["project", "groupId"] => model.group_id = value,
        ["project", "artifactId"] => model.artifact_id = text,
        ["project", "version"] => model.version = value,
        ["project", "packaging"] => model.packaging = value,
        ["project", "name"] => model.name = value,
        ["project", "url"] => model.url = value,
        ["project", "parent", field] => {
            if let Some(p) = parent.as_mut() {
                match *field {
                    "groupId" => p.group_id = value,
                    "artifactId" => p.artifact_id = value,
                    "version" => p.version = value,
                    _ => {}
                }
            }
        }
        ["project", "issueManagement", field] => {
            let im = model
                .issue_management
                .get_or_insert_with(IssueManagement::default);
            match *field {
                "system" => im.system = value,
                "url" => im.url = value,
                _ => {}
            }
        }
        ["project", "scm", field] => {
            let scm = model.scm.get_or_insert_with(Scm::default);
            match *field {
                "url" => scm.url = value,
                "connection" => scm.connection = value,
                "developerConnection" => scm.developer_connection = value,
                _ => {}
            }
        }
        ["project", "dependencies", "dependency", field]
        | ["project", "dependencyManagement", "dependencies", "dependency", field] => {
            if let Some(dep) = dependency.as_mut() {
                match *field {
                    "groupId" => dep.group_id = text,
                    "artifactId" => dep.artifact_id = text,
                    "version" => dep.version = value,
                    "scope" => dep.scope = value,
                    "type" => dep.kind = value,
                    _ => {}
                }
            }
        }
        ["project", "modules", "module"] => {
            if !text.is_empty() {
                model.modules.push(text);
            }
        }
        ["project", "properties", key] => {
            model.properties.insert((*key).to_string(), text);
        }
        ["project", "build", "sourceDirectory"] => model.source_directory = value,
        _ => {}
    }
}

/// Expands `${...}` references in dependency coordinates using the model's own
/// properties, then `inherited`, then the `project.*` built-ins. Unknown
/// references are left untouched.
pub fn interpolate_model(model: &mut Model, inherited: &BTreeMap<String, String>) {
    let mut props = inherited.clone();
    props.extend(model.properties.clone());
    if let Some(g) = model.effective_group_id() {
        props.insert("project.groupId".to_string(), g.to_string());
    }
    if let Some(v) = model.effective_version() {
        props.insert("project.version".to_string(), v.to_string());
    }
    props.insert("project.artifactId".to_string(), model.artifact_id.clone());
    if let Some(p) = &model.parent {
        props.insert("project.parent.groupId".to_string(), p.group_id.clone());
        props.insert("project.parent.version".to_string(), p.version.clone());
    }

    let lookup = |key: &str| -> Option<String> {
        props
            .get(key)
            .or_else(|| key.strip_prefix("pom.").and_then(|k| props.get(&format!("project.{k}"))))
            .cloned()
    };

    for dep in model
        .dependencies
        .iter_mut()
        .chain(model.dependency_management.iter_mut())
    {
        dep.group_id = interpolate(&dep.group_id, &lookup);
        dep.artifact_id = interpolate(&dep.artifact_id, &lookup);
        if let Some(v) = dep.version.as_mut() {
            *v = interpolate(v, &lookup);
        }
    }
}

pub fn interpolate(value: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut current = value.to_string();
    for _ in 0..MAX_INTERPOLATION_PASSES {
        if !current.contains("${") {
            break;
        }
        let next = PLACEHOLDER
            .replace_all(&current, |caps: &Captures| {
                lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
}
