use memmap2::Mmap;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::model::ResolvedArtifact;

/// Fully-qualified class names packaged by a resolved artifact.
///
/// Non-jar artifacts (poms, zips, native bundles) yield an empty list.
pub fn classes_of(artifact: &ResolvedArtifact) -> Result<Vec<String>> {
    let classes = catalog(&artifact.file)?;
    debug!(
        artifact = %artifact.coordinate,
        classes = classes.len(),
        "cataloged artifact"
    );
    Ok(classes)
}

pub fn catalog(artifact_path: &Path) -> Result<Vec<String>> {
    if !is_jar(artifact_path) {
        return Ok(Vec::new());
    }

    let file = File::open(artifact_path).map_err(|e| Error::parse(artifact_path, e))?;
    // SAFETY: The file is opened read-only and remains valid for the lifetime of the mmap.
    // The mmap is dropped before the file, ensuring memory safety.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::parse(artifact_path, e))?;
    let mut archive =
        ZipArchive::new(Cursor::new(&mmap[..])).map_err(|e| Error::parse(artifact_path, e))?;

    let mut classes = Vec::new();
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| Error::parse(artifact_path, e))?;
        if let Some(fqcn) = binary_name_to_fqcn(entry.name()) {
            classes.push(fqcn);
        }
    }
    Ok(classes)
}

/// `org/acme/Outer$Inner.class` -> `org.acme.Outer.Inner`, the same shape an
/// import of the nested type has.
pub fn binary_name_to_fqcn(entry_name: &str) -> Option<String> {
    let stem = entry_name.strip_suffix(".class")?;
    if stem.starts_with("META-INF/") {
        return None;
    }
    let simple = stem.rsplit(['/', '\\']).next().unwrap_or(stem);
    if simple == "module-info" || simple == "package-info" {
        return None;
    }
    Some(stem.replace(['/', '\\', '$'], "."))
}

fn is_jar(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jar"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> anyhow::Result<()> {
        let file = File::create(path)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for (name, content) in entries {
            zip.start_file(*name, options)?;
            zip.write_all(content)?;
        }

        zip.finish()?;
        Ok(())
    }

    #[test]
    fn catalog_normalizes_nested_classes_to_dotted_names() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let jar = dir.path().join("widget-1.0.jar");
        write_jar(
            &jar,
            &[
                ("org/acme/Widget.class", b""),
                ("org/acme/Widget$Part.class", b""),
                ("org/acme/package-info.class", b""),
                ("module-info.class", b""),
                ("META-INF/versions/11/org/acme/Widget.class", b""),
                ("META-INF/MANIFEST.MF", b""),
            ],
        )?;

        let classes = catalog(&jar)?;
        assert_eq!(classes, vec!["org.acme.Widget", "org.acme.Widget.Part"]);
        Ok(())
    }

    #[test]
    fn catalog_handles_empty_jar() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let jar = dir.path().join("empty.jar");
        write_jar(&jar, &[])?;
        assert!(catalog(&jar)?.is_empty());
        Ok(())
    }

    #[test]
    fn non_jar_artifacts_have_no_classes() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let pom = dir.path().join("bom-1.0.pom");
        std::fs::write(&pom, "<project/>")?;
        assert!(catalog(&pom)?.is_empty());
        Ok(())
    }

    #[test]
    fn corrupt_jar_is_a_parse_failure() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let jar = dir.path().join("broken.jar");
        std::fs::write(&jar, b"not a zip")?;
        assert!(matches!(catalog(&jar), Err(Error::Parse { .. })));
        Ok(())
    }
}
