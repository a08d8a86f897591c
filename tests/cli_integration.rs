use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};

fn write_file(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

fn write_jar(path: &Path, entries: &[&str]) -> anyhow::Result<()> {
    use std::io::Write;
    use zip::write::FileOptions;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for name in entries {
        zip.start_file(*name, options)?;
        zip.write_all(b"")?;
    }
    zip.finish()?;
    Ok(())
}

fn artifact_pom(group: &str, artifact: &str, version: &str, extra: &str) -> String {
    format!(
        r#"<project>
  <groupId>{group}</groupId>
  <artifactId>{artifact}</artifactId>
  <version>{version}</version>
  {extra}
</project>"#
    )
}

/// A local repository with two jars and a project importing from both.
fn fixture(root: &Path, with_missing_dependency: bool) -> anyhow::Result<()> {
    let m2 = root.join("m2");
    let demo = m2.join("org/example/demo/1.0");
    write_jar(
        &demo.join("demo-1.0.jar"),
        &["META-INF/MANIFEST.MF", "org/example/pkg/A.class", "org/example/pkg/B.class"],
    )?;
    write_file(&demo.join("demo-1.0.pom"), &artifact_pom("org.example", "demo", "1.0", ""))?;

    let other = m2.join("org/other/other/2.0");
    write_jar(&other.join("other-2.0.jar"), &["org/other/C.class"])?;
    write_file(
        &other.join("other-2.0.pom"),
        &artifact_pom(
            "org.other",
            "other",
            "2.0",
            "<name>Other Lib</name><scm><url>https://github.com/acme/other</url></scm>",
        ),
    )?;

    let missing = if with_missing_dependency {
        r#"<dependency>
      <groupId>org.gone</groupId>
      <artifactId>gone</artifactId>
      <version>9</version>
    </dependency>"#
    } else {
        ""
    };

    let project = root.join("app");
    write_file(
        &project.join("pom.xml"),
        &format!(
            r#"<project>
  <groupId>org.app</groupId>
  <artifactId>app</artifactId>
  <version>0.1</version>
  <properties><other.version>2.0</other.version></properties>
  <dependencies>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>demo</artifactId>
      <version>1.0</version>
    </dependency>
    <dependency>
      <groupId>org.other</groupId>
      <artifactId>other</artifactId>
      <version>${{other.version}}</version>
    </dependency>
    {missing}
  </dependencies>
</project>"#
        ),
    )?;

    write_file(
        &project.join("src/main/java/app/Main.java"),
        "package app;\n\nimport org.example.pkg.A;\nimport org.example.pkg.B;\nimport java.util.List;\n\nclass Main {}\n",
    )?;
    write_file(
        &project.join("src/main/java/app/Util.java"),
        "package app;\n\nimport org.example.pkg.A;\nimport org.other.C;\nimport static org.other.C.run;\nimport org.example.pkg.*;\n\nclass Util {}\n",
    )?;
    Ok(())
}

fn run(args: &[&str]) -> anyhow::Result<Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_oss-issues"))
        .args(args)
        .env_remove("OSS_ISSUES_M2")
        .env_remove("OSS_ISSUES_REMOTES")
        .env_remove("OSS_ISSUES_LOG")
        .env_remove("RUST_LOG")
        .output()?)
}

fn run_json(args: &[&str]) -> anyhow::Result<Value> {
    let out = run(args)?;
    if !out.status.success() {
        return Err(anyhow::anyhow!(
            "command failed: status={:?}, stderr={}",
            out.status.code(),
            String::from_utf8_lossy(&out.stderr)
        ));
    }
    Ok(serde_json::from_slice(&out.stdout)?)
}

#[test]
fn report_ranks_dependencies_and_locates_issue_sites() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fixture(dir.path(), false)?;
    let m2 = dir.path().join("m2");
    let pom = dir.path().join("app/pom.xml");

    let report = run_json(&[
        "--m2",
        m2.to_str().unwrap(),
        "--offline",
        "report",
        "--pom",
        pom.to_str().unwrap(),
        "--format",
        "json",
        "--no-scrape",
    ])?;

    assert_eq!(report["project"], "app");
    assert_eq!(report["total_imports"], 5);

    let entries = report["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0]["coordinate"], "org.example:demo:1.0");
    assert_eq!(entries[0]["name"], "demo");
    assert_eq!(entries[0]["usage"], 3);
    assert_eq!(entries[0]["classes"], 2);
    assert_eq!(entries[0]["issues"]["status"], "unknown");

    assert_eq!(entries[1]["coordinate"], "org.other:other:2.0");
    assert_eq!(entries[1]["name"], "Other Lib");
    assert_eq!(entries[1]["usage"], 1);
    assert_eq!(entries[1]["issues"]["status"], "unscraped");
    assert_eq!(entries[1]["issues"]["site"]["system"], "github");
    assert_eq!(
        entries[1]["issues"]["site"]["url"],
        "https://github.com/acme/other/issues"
    );
    Ok(())
}

#[test]
fn text_report_is_written_to_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fixture(dir.path(), false)?;
    let m2 = dir.path().join("m2");
    let pom_dir = dir.path().join("app");
    let output = dir.path().join("out/report.txt");

    let out = run(&[
        "--m2",
        m2.to_str().unwrap(),
        "--offline",
        "report",
        "--pom",
        pom_dir.to_str().unwrap(),
        "--no-scrape",
        "-o",
        output.to_str().unwrap(),
    ])?;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let text = std::fs::read_to_string(&output)?;
    assert!(text.contains("1. demo (org.example:demo:1.0) usage: 3"), "{text}");
    assert!(text.contains("issues: unknown"), "{text}");
    assert!(text.contains("https://github.com/acme/other/issues"), "{text}");
    Ok(())
}

#[test]
fn unresolvable_dependency_fails_fast_by_default() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fixture(dir.path(), true)?;
    let m2 = dir.path().join("m2");
    let pom = dir.path().join("app/pom.xml");

    let out = run(&[
        "--m2",
        m2.to_str().unwrap(),
        "--offline",
        "usage",
        "--pom",
        pom.to_str().unwrap(),
    ])?;
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("org.gone:gone:9"));
    Ok(())
}

#[test]
fn keep_going_collects_resolution_failures() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fixture(dir.path(), true)?;
    let m2 = dir.path().join("m2");
    let pom = dir.path().join("app/pom.xml");

    let usage = run_json(&[
        "--m2",
        m2.to_str().unwrap(),
        "--offline",
        "usage",
        "--pom",
        pom.to_str().unwrap(),
        "--keep-going",
    ])?;

    let failures = usage["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].as_str().unwrap().contains("org.gone:gone:9"));

    let usages = usage["usages"].as_array().unwrap();
    assert_eq!(usages.len(), 2);
    assert_eq!(usages[0]["count"], 3);
    Ok(())
}

#[test]
fn imports_lists_single_type_imports() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fixture(dir.path(), false)?;
    let src = dir.path().join("app/src/main/java");

    let scan = run_json(&["imports", src.to_str().unwrap()])?;
    assert_eq!(scan["files"], 2);
    let mut imports: Vec<&str> = scan["imports"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    imports.sort_unstable();
    assert_eq!(
        imports,
        vec![
            "java.util.List",
            "org.example.pkg.A",
            "org.example.pkg.A",
            "org.example.pkg.B",
            "org.other.C",
        ]
    );
    Ok(())
}

#[test]
fn site_follows_the_parent_chain() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let m2 = dir.path().join("m2");
    write_file(
        &m2.join("org/acme/acme-parent/3/acme-parent-3.pom"),
        &artifact_pom(
            "org.acme",
            "acme-parent",
            "3",
            "<issueManagement><system>JIRA</system><url>https://issues.acme.org/browse/ACME</url></issueManagement>",
        ),
    )?;
    write_file(
        &m2.join("org/acme/widget/1.2/widget-1.2.pom"),
        r#"<project>
  <parent>
    <groupId>org.acme</groupId>
    <artifactId>acme-parent</artifactId>
    <version>3</version>
  </parent>
  <artifactId>widget</artifactId>
  <version>1.2</version>
</project>"#,
    )?;

    let site = run_json(&["--m2", m2.to_str().unwrap(), "--offline", "site", "org.acme:widget:1.2"])?;
    assert_eq!(site["lineage"].as_array().unwrap().len(), 2);
    assert_eq!(site["lineage"][1], "org.acme:acme-parent:3");
    assert_eq!(site["site"]["system"], "jira");
    assert_eq!(site["site"]["url"], "https://issues.acme.org/browse/ACME");
    Ok(())
}
