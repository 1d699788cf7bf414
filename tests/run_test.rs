//! Integration tests for `pew-resolve run`
//!
//! Drive the binary against mocked provider APIs and check the outputs it
//! writes through the GitHub Actions files.

mod common;

use common::{text, TestRunner};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_gitlab(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v4/projects/group%2Fgame/repository/commits"))
        .and(query_param("ref_name", "main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "abc1234ffffffff",
            "committed_date": "2024-03-07T14:05:09Z"
        }])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects/group%2Fgame/repository/files/VERSION"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "encoding": "base64",
            "content": "MS4yLjM="
        })))
        .mount(server)
        .await;
}

// ============================================
// Input validation
// ============================================

#[tokio::test]
async fn test_run_without_repository_fails() {
    let runner = TestRunner::new();
    let output = runner.command(&["run"]).output().await.unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(text(&output.stderr).contains("No repository supplied"));
}

#[tokio::test]
async fn test_run_reads_inputs_from_environment() {
    let runner = TestRunner::new();
    let output = runner
        .command(&["run"])
        .env("INPUT_REPOSITORY", "acme/game")
        .env("INPUT_REF", "main")
        .output()
        .await
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(text(&output.stderr).contains("No provider supplied"));
}

#[tokio::test]
async fn test_run_unknown_provider() {
    let runner = TestRunner::new();
    let output = runner
        .command(&["run", "--repository", "acme/game", "--ref", "main", "--provider", "svn"])
        .output()
        .await
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(text(&output.stderr).contains("Unknown provider 'svn'"));
}

#[tokio::test]
async fn test_run_missing_credential() {
    let runner = TestRunner::new();
    let output = runner
        .command(&["run", "--repository", "acme/game", "--ref", "main", "--provider", "GitHub"])
        .output()
        .await
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(text(&output.stderr)
        .contains("GitHub repositories must supply `env.PEW_GITHUB_APPID`"));
}

#[tokio::test]
async fn test_run_error_is_annotation_in_actions() {
    let runner = TestRunner::new();
    let output = runner
        .actions_command(&["run", "--ref", "main", "--provider", "gitlab"])
        .output()
        .await
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(text(&output.stdout).contains("::error::No repository supplied"));
}

// ============================================
// End-to-end runs against mocked APIs
// ============================================

#[tokio::test]
async fn test_run_gitlab_writes_outputs_and_exports() {
    let server = MockServer::start().await;
    mount_gitlab(&server).await;
    let runner = TestRunner::new();

    let repository = format!("{}/group/game.git", server.uri());
    let output = runner
        .actions_command(&[
            "run",
            "--repository",
            &repository,
            "--ref",
            "main",
            "--provider",
            "gitlab",
            "--files",
            "VERSION!|APP_VERSION; missing.txt|MISSING",
            "--run-number",
            "42",
        ])
        .env("PEW_GITLAB_TOKEN", "glpat-secret")
        .output()
        .await
        .unwrap();

    assert!(output.status.success(), "{}", text(&output.stderr));
    assert!(text(&output.stdout).contains("::add-mask::glpat-secret"));

    let outputs = runner.output_file();
    assert_eq!(runner.block(&outputs, "token").as_deref(), Some("glpat-secret"));
    assert_eq!(runner.block(&outputs, "commit").as_deref(), Some("abc1234ffffffff"));
    assert_eq!(
        runner.block(&outputs, "commit-date").as_deref(),
        Some("2024-03-07T14:05:09Z")
    );
    assert_eq!(runner.block(&outputs, "build-short").as_deref(), Some("0307saffron"));
    assert_eq!(
        runner.block(&outputs, "build-template").as_deref(),
        Some("{project-name}-240307-140509-abc1234-0307saffron+{platform}+{configuration}+main42")
    );
    let components: serde_json::Value =
        serde_json::from_str(&runner.block(&outputs, "build-components").unwrap()).unwrap();
    assert_eq!(components["ref"], "main");

    assert_eq!(
        runner.read_blocks(&runner.env_file()),
        vec![("APP_VERSION".to_string(), "1.2.3".to_string())]
    );

    // GitLab leaves nothing to revoke but still records its provider
    let state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(runner.state_file()).unwrap()).unwrap();
    assert_eq!(state, json!({"provider": "gitlab"}));
}

#[tokio::test]
async fn test_run_missing_required_file_fails_after_commit_output() {
    let server = MockServer::start().await;
    mount_gitlab(&server).await;
    let runner = TestRunner::new();

    let repository = format!("{}/group/game", server.uri());
    let output = runner
        .actions_command(&[
            "run",
            "--repository",
            &repository,
            "--ref",
            "main",
            "--provider",
            "gitlab",
            "--files",
            "a.txt!|A;b.txt!|B;VERSION|V",
        ])
        .env("PEW_GITLAB_TOKEN", "glpat-secret")
        .output()
        .await
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(text(&output.stdout).contains("::error::Missing required file(s): a.txt, b.txt"));

    let outputs = runner.output_file();
    assert_eq!(runner.block(&outputs, "commit").as_deref(), Some("abc1234ffffffff"));
    assert!(runner.block(&outputs, "build-short").is_none());
}

#[tokio::test]
async fn test_run_bitbucket_plain_output_redacts_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2.0/repositories/studio/game/refs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{
                "name": "v1.0",
                "target": {"hash": "feedfacecafebeef", "date": "2024-03-07T14:05:09+00:00"}
            }]
        })))
        .mount(&server)
        .await;
    let runner = TestRunner::new();

    let output = runner
        .command(&[
            "run",
            "--repository",
            "https://bitbucket.org/studio/game",
            "--ref",
            "v1.0",
            "--provider",
            "bitbucket",
        ])
        .env("PEW_BITBUCKET_API_URL", server.uri())
        .env("PEW_BITBUCKET_USERNAME", "builder")
        .env("PEW_BITBUCKET_PASSWORD", "app-password")
        .output()
        .await
        .unwrap();

    assert!(output.status.success(), "{}", text(&output.stderr));
    let stdout = text(&output.stdout);
    assert!(stdout.contains("token=***\n"));
    assert!(stdout.contains("commit=feedfacecafebeef\n"));
    assert!(!stdout.contains("app-password"));
    assert!(!text(&output.stderr).contains("app-password"));
}

#[tokio::test]
async fn test_run_json_report() {
    let server = MockServer::start().await;
    mount_gitlab(&server).await;
    let runner = TestRunner::new();

    let repository = format!("{}/group/game", server.uri());
    let output = runner
        .command(&[
            "--json",
            "run",
            "--repository",
            &repository,
            "--ref",
            "main",
            "--provider",
            "gitlab",
            "--run-number",
            "43",
        ])
        .env("PEW_GITLAB_TOKEN", "glpat-secret")
        .output()
        .await
        .unwrap();

    assert!(output.status.success(), "{}", text(&output.stderr));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["commit"], "abc1234ffffffff");
    assert_eq!(report["build"]["short"], "0307orchid");
    assert!(!text(&output.stdout).contains("glpat-secret"));
}
