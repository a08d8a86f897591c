use oss_issues::model::Coordinate;
use oss_issues::repository::{ArtifactResolver, CachingResolver, MavenRepository, layout_path};
use oss_issues::scrape::github::{GithubScraper, OPEN_ISSUES_QUERY};
use oss_issues::scrape::{IssueScraper, IssueSnapshot, ScrapeSettings};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ISSUE_PAGE: &str = r##"<html><body>
<div class="states">
  <a href="/acme/widget/issues?q=is%3Aopen">1,204 Open</a>
  <a href="/acme/widget/issues?q=is%3Aclosed">87 Closed</a>
</div>
<ul>
  <li class="js-issue-row">
    <a class="js-navigation-open" href="/acme/widget/issues/42">Crash on empty input</a>
    <a class="IssueLabel" href="#">bug</a>
    <relative-time datetime="2024-05-02T08:00:00Z">May 2</relative-time>
  </li>
</ul>
</body></html>"##;

#[tokio::test(flavor = "multi_thread")]
async fn missing_artifacts_are_downloaded_into_the_local_repository() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let coordinate = Coordinate::new("org.acme", "widget", "1.0");
    let rel = layout_path(&coordinate, "pom");

    Mock::given(method("GET"))
        .and(path(format!("/maven2/{rel}")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<project/>"))
        .expect(1)
        .mount(&server)
        .await;

    let local = tempfile::tempdir()?;
    let remotes = vec![
        format!("{}/empty", server.uri()),
        format!("{}/maven2/", server.uri()),
    ];
    let root = local.path().to_path_buf();

    let resolved = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let repo = MavenRepository::new(root, remotes)?;
        let first = repo.resolve(&coordinate, "pom")?;
        // Second lookup is served from disk.
        let second = repo.resolve(&coordinate, "pom")?;
        assert_eq!(first, second);
        Ok(first)
    })
    .await??;

    assert_eq!(resolved, local.path().join(&rel));
    assert_eq!(std::fs::read_to_string(&resolved)?, "<project/>");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_misses_on_one_parent_pom_all_succeed() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let coordinate = Coordinate::new("org.apache", "apache", "33");
    let rel = layout_path(&coordinate, "pom");
    let body = format!("<project>{}</project>", "<!-- padding -->".repeat(4096));

    Mock::given(method("GET"))
        .and(path(format!("/{rel}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .mount(&server)
        .await;

    for _ in 0..5 {
        let local = tempfile::tempdir()?;
        let root = local.path().to_path_buf();
        let remotes = vec![server.uri()];
        let coordinate = coordinate.clone();

        let paths = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<std::path::PathBuf>> {
            let resolver = CachingResolver::new(MavenRepository::new(root, remotes)?);
            std::thread::scope(|scope| {
                let handles: Vec<_> = (0..6)
                    .map(|_| scope.spawn(|| resolver.resolve(&coordinate, "pom")))
                    .collect();
                handles
                    .into_iter()
                    .map(|h| Ok(h.join().map_err(|_| anyhow::anyhow!("resolver thread panicked"))??))
                    .collect()
            })
        })
        .await??;

        let expected = local.path().join(&rel);
        assert!(paths.iter().all(|p| *p == expected));
        assert_eq!(std::fs::read_to_string(&expected)?, body);
        let leftovers = std::fs::read_dir(expected.parent().unwrap())?.count();
        assert_eq!(leftovers, 1);
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn artifact_missing_everywhere_is_a_resolution_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let local = tempfile::tempdir()?;
    let root = local.path().to_path_buf();
    let remotes = vec![server.uri()];

    let err = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        let repo = MavenRepository::new(root, remotes)?;
        let err = repo
            .resolve(&Coordinate::new("org.acme", "ghost", "1"), "jar")
            .unwrap_err();
        Ok(err.to_string())
    })
    .await??;

    assert!(err.contains("org.acme:ghost:1"), "{err}");
    assert!(err.contains("404"), "{err}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn github_issue_list_is_scraped() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acme/widget/issues"))
        .and(query_param("q", "is:issue is:open sort:updated-desc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ISSUE_PAGE))
        .mount(&server)
        .await;

    let base = format!("{}/acme/widget/issues", server.uri());
    let expected_url = format!("{base}{OPEN_ISSUES_QUERY}");
    let issue_url = format!("{}/acme/widget/issues/42", server.uri());

    let snapshot = tokio::task::spawn_blocking(move || {
        GithubScraper::new(&ScrapeSettings::default())?.scrape(&base)
    })
    .await??;

    assert_eq!(snapshot.system, "github");
    assert_eq!(snapshot.url, expected_url);
    assert_eq!(snapshot.state_counts.len(), 2);
    assert_eq!(snapshot.state_counts[0].state, "Open");
    assert_eq!(snapshot.state_counts[0].count, 1204);
    assert_eq!(snapshot.open_issues.len(), 1);
    assert_eq!(snapshot.open_issues[0].title, "Crash on empty input");
    assert_eq!(snapshot.open_issues[0].url, issue_url);
    assert!(snapshot.open_issues[0].tags.contains("bug"));
    Ok(())
}

async fn scrape_answering(template: ResponseTemplate) -> anyhow::Result<IssueSnapshot> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acme/gone/issues"))
        .respond_with(template)
        .expect(1)
        .mount(&server)
        .await;

    let base = format!("{}/acme/gone/issues", server.uri());
    let snapshot = tokio::task::spawn_blocking(move || {
        GithubScraper::new(&ScrapeSettings::default())?.scrape(&base)
    })
    .await??;
    Ok(snapshot)
}

#[tokio::test(flavor = "multi_thread")]
async fn moved_repository_yields_an_empty_snapshot() -> anyhow::Result<()> {
    let snapshot = scrape_answering(
        ResponseTemplate::new(301).insert_header("location", "https://github.com/acme/new"),
    )
    .await?;
    assert!(snapshot.open_issues.is_empty());
    assert!(snapshot.state_counts.is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_repository_yields_an_empty_snapshot() -> anyhow::Result<()> {
    let snapshot = scrape_answering(ResponseTemplate::new(404)).await?;
    assert_eq!(snapshot.system, "github");
    assert!(snapshot.open_issues.is_empty());
    assert!(snapshot.state_counts.is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn deleted_repository_yields_an_empty_snapshot() -> anyhow::Result<()> {
    let snapshot = scrape_answering(ResponseTemplate::new(410).set_body_string("Gone")).await?;
    assert!(snapshot.open_issues.is_empty());
    assert!(snapshot.state_counts.is_empty());
    Ok(())
}
