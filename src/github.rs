use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::GithubConfig;
use crate::services::{OperationResult, SourceHost};

/// Branch that file commits land on.
const COMMIT_BRANCH: &str = "main";

/// GitHub REST client. Each public operation is a single best-effort
/// attempt; failures are logged and reported as text.
pub struct GithubClient {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to build GitHub HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let token = self
            .token
            .as_deref()
            .context("GitHub token is not configured")?;
        let url = self.url(path);
        debug!("GitHub {} {}", method, url);
        Ok(self
            .client
            .request(method, url)
            .header("Authorization", format!("token {}", token))
            .header("Accept", "application/vnd.github.v3+json"))
    }

    /// Send a request and return the decoded JSON body of a 2xx response.
    async fn send(request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request
            .send()
            .await
            .context("Failed to send request to GitHub")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("GitHub API error ({}): {}", status, error_body);
        }

        let body = response.text().await.context("Failed to read GitHub response")?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).context("Failed to parse GitHub response")
    }

    async fn try_create_repository(&self, name: &str) -> Result<String> {
        let request = self
            .request(reqwest::Method::POST, "/user/repos")?
            .json(&json!({ "name": name, "private": false }));
        let body = Self::send(request).await?;
        Ok(body["html_url"]
            .as_str()
            .unwrap_or("Repo created")
            .to_string())
    }

    async fn try_create_file(
        &self,
        repo: &str,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(content.as_bytes());
        let request = self
            .request(
                reqwest::Method::PUT,
                &format!("/repos/{}/contents/{}", repo, path),
            )?
            .json(&json!({
                "message": message,
                "content": encoded,
                "branch": COMMIT_BRANCH,
            }));
        let body = Self::send(request).await?;
        Ok(body["content"]["html_url"]
            .as_str()
            .unwrap_or("File created")
            .to_string())
    }

    async fn try_delete_file(
        &self,
        repo: &str,
        path: &str,
        revision: &str,
        message: &str,
    ) -> Result<String> {
        let request = self
            .request(
                reqwest::Method::DELETE,
                &format!("/repos/{}/contents/{}", repo, path),
            )?
            .json(&json!({
                "message": message,
                "sha": revision,
                "branch": COMMIT_BRANCH,
            }));
        Self::send(request).await?;
        Ok(format!("Deleted {}", path))
    }

    async fn try_revision_marker(&self, repo: &str, path: &str) -> Result<String> {
        let request = self.request(
            reqwest::Method::GET,
            &format!("/repos/{}/contents/{}", repo, path),
        )?;
        let body = Self::send(request).await?;
        Ok(body["sha"].as_str().unwrap_or_default().to_string())
    }

    async fn try_create_pull_request(
        &self,
        repo: &str,
        title: &str,
        head: &str,
        base: &str,
    ) -> Result<String> {
        let request = self
            .request(reqwest::Method::POST, &format!("/repos/{}/pulls", repo))?
            .json(&json!({ "title": title, "head": head, "base": base }));
        let body = Self::send(request).await?;
        Ok(body["html_url"].as_str().unwrap_or("PR created").to_string())
    }

    async fn try_create_branch(&self, repo: &str, new_branch: &str, source: &str) -> Result<String> {
        // Step 1: resolve the commit the source branch points at.
        let lookup = self.request(
            reqwest::Method::GET,
            &format!("/repos/{}/git/ref/heads/{}", repo, source),
        )?;
        let reference = Self::send(lookup)
            .await
            .with_context(|| format!("Failed to resolve branch '{}'", source))?;
        let sha = reference["object"]["sha"]
            .as_str()
            .with_context(|| format!("Branch '{}' has no commit sha", source))?
            .to_string();

        // Step 2: create the new ref. Nothing is undone if this fails.
        let create = self
            .request(reqwest::Method::POST, &format!("/repos/{}/git/refs", repo))?
            .json(&json!({
                "ref": format!("refs/heads/{}", new_branch),
                "sha": sha,
            }));
        Self::send(create).await?;

        Ok(format!(
            "Branch '{}' created from '{}'.",
            new_branch, source
        ))
    }
}

/// Convert an internal result into the reply shape, logging failures.
fn report(category: &str, result: Result<String>) -> OperationResult {
    match result {
        Ok(text) => OperationResult::success(text),
        Err(e) => {
            error!("{}: {:#}", category, e);
            OperationResult::failure(category, &e)
        }
    }
}

#[async_trait]
impl SourceHost for GithubClient {
    async fn create_repository(&self, name: &str) -> OperationResult {
        info!("Creating repository '{}'", name);
        report(
            "Error creating repo",
            self.try_create_repository(name).await,
        )
    }

    async fn create_file(
        &self,
        repo: &str,
        path: &str,
        content: &str,
        message: &str,
    ) -> OperationResult {
        info!("Creating file '{}' in {}", path, repo);
        report(
            "Error creating file",
            self.try_create_file(repo, path, content, message).await,
        )
    }

    async fn delete_file(
        &self,
        repo: &str,
        path: &str,
        revision: &str,
        message: &str,
    ) -> OperationResult {
        info!("Deleting file '{}' in {}", path, repo);
        report(
            "Error deleting file",
            self.try_delete_file(repo, path, revision, message).await,
        )
    }

    async fn revision_marker(&self, repo: &str, path: &str) -> String {
        match self.try_revision_marker(repo, path).await {
            Ok(sha) => sha,
            Err(e) => {
                error!("Error fetching SHA for {} in {}: {:#}", path, repo, e);
                String::new()
            }
        }
    }

    async fn create_pull_request(
        &self,
        repo: &str,
        title: &str,
        head: &str,
        base: &str,
    ) -> OperationResult {
        info!("Opening pull request {} -> {} in {}", head, base, repo);
        report(
            "Error creating PR",
            self.try_create_pull_request(repo, title, head, base).await,
        )
    }

    async fn create_branch(&self, repo: &str, new_branch: &str, source: &str) -> OperationResult {
        info!("Creating branch '{}' from '{}' in {}", new_branch, source, repo);
        report(
            "Error creating branch",
            self.try_create_branch(repo, new_branch, source).await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> GithubClient {
        GithubClient::new(&GithubConfig {
            api_url: server.base_url(),
            token: Some("ghp_test".to_string()),
            owner: "octocat".to_string(),
            timeout_secs: Some(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_repository_returns_html_url() {
        let server = MockServer::start_async().await;
        let create = server.mock(|when, then| {
            when.method(POST)
                .path("/user/repos")
                .header("authorization", "token ghp_test")
                .json_body(json!({"name": "demo", "private": false}));
            then.status(201)
                .json_body(json!({"html_url": "https://github.com/octocat/demo"}));
        });

        let result = client(&server).create_repository("demo").await;

        create.assert();
        assert_eq!(
            result,
            OperationResult::success("https://github.com/octocat/demo")
        );
    }

    #[tokio::test]
    async fn test_create_repository_twice_is_not_idempotent() {
        let server = MockServer::start_async().await;
        let github = client(&server);

        let mut created = server.mock(|when, then| {
            when.method(POST).path("/user/repos");
            then.status(201)
                .json_body(json!({"html_url": "https://github.com/octocat/x"}));
        });
        let first = github.create_repository("x").await;
        created.delete();

        server.mock(|when, then| {
            when.method(POST).path("/user/repos");
            then.status(422).json_body(json!({
                "message": "Repository creation failed.",
                "errors": [{"message": "name already exists on this account"}]
            }));
        });
        let second = github.create_repository("x").await;

        // Repeating the same command produces a different outcome.
        assert!(first.is_success());
        assert!(!second.is_success());
        assert_ne!(first, second);
        assert!(second.text().starts_with("Error creating repo:"));
        assert!(second.text().contains("already exists"));
    }

    #[tokio::test]
    async fn test_create_file_sends_base64_content_to_main() {
        let server = MockServer::start_async().await;
        let put = server.mock(|when, then| {
            when.method(PUT)
                .path("/repos/octocat/demo/contents/app.py")
                .json_body(json!({
                    "message": "Add app.py via bot",
                    "content": "cHJpbnQoMSk=",
                    "branch": "main"
                }));
            then.status(201).json_body(json!({
                "content": {"html_url": "https://github.com/octocat/demo/blob/main/app.py"}
            }));
        });

        let result = client(&server)
            .create_file("octocat/demo", "app.py", "print(1)", "Add app.py via bot")
            .await;

        put.assert();
        assert_eq!(
            result.text(),
            "https://github.com/octocat/demo/blob/main/app.py"
        );
    }

    #[tokio::test]
    async fn test_revision_marker_is_empty_on_failure() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/repos/octocat/demo/contents/missing.py");
            then.status(404).json_body(json!({"message": "Not Found"}));
        });

        let sha = client(&server)
            .revision_marker("octocat/demo", "missing.py")
            .await;
        assert_eq!(sha, "");
    }

    #[tokio::test]
    async fn test_delete_file_reports_path() {
        let server = MockServer::start_async().await;
        let delete = server.mock(|when, then| {
            when.method(DELETE)
                .path("/repos/octocat/demo/contents/app.py")
                .json_body(json!({
                    "message": "Delete app.py via bot",
                    "sha": "abc123",
                    "branch": "main"
                }));
            then.status(200).json_body(json!({"commit": {"sha": "def456"}}));
        });

        let result = client(&server)
            .delete_file("octocat/demo", "app.py", "abc123", "Delete app.py via bot")
            .await;

        delete.assert();
        assert_eq!(result, OperationResult::success("Deleted app.py"));
    }

    #[tokio::test]
    async fn test_create_branch_stops_when_source_lookup_fails() {
        let server = MockServer::start_async().await;
        let lookup = server.mock(|when, then| {
            when.method(GET).path("/repos/octocat/demo/git/ref/heads/main");
            then.status(404).json_body(json!({"message": "Not Found"}));
        });
        let create_ref = server.mock(|when, then| {
            when.method(POST).path("/repos/octocat/demo/git/refs");
            then.status(201).json_body(json!({"ref": "refs/heads/feature"}));
        });

        let result = client(&server)
            .create_branch("octocat/demo", "feature", "main")
            .await;

        lookup.assert();
        assert_eq!(create_ref.calls(), 0);
        assert!(result.text().starts_with("Error creating branch:"));
    }

    #[tokio::test]
    async fn test_create_branch_from_resolved_sha() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/repos/octocat/demo/git/ref/heads/main");
            then.status(200)
                .json_body(json!({"ref": "refs/heads/main", "object": {"sha": "abc123"}}));
        });
        let create_ref = server.mock(|when, then| {
            when.method(POST)
                .path("/repos/octocat/demo/git/refs")
                .json_body(json!({"ref": "refs/heads/feature", "sha": "abc123"}));
            then.status(201).json_body(json!({"ref": "refs/heads/feature"}));
        });

        let result = client(&server)
            .create_branch("octocat/demo", "feature", "main")
            .await;

        create_ref.assert();
        assert_eq!(
            result,
            OperationResult::success("Branch 'feature' created from 'main'.")
        );
    }

    #[tokio::test]
    async fn test_create_pull_request_failure_is_text() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/repos/octocat/demo/pulls");
            then.status(422)
                .json_body(json!({"message": "No commits between main and feature"}));
        });

        let result = client(&server)
            .create_pull_request("octocat/demo", "PR via Bot", "feature", "main")
            .await;
        assert!(result.text().starts_with("Error creating PR:"));
        assert!(result.text().contains("No commits"));
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_request() {
        let server = MockServer::start_async().await;
        let create = server.mock(|when, then| {
            when.method(POST).path("/user/repos");
            then.status(201).json_body(json!({}));
        });

        let github = GithubClient::new(&GithubConfig {
            api_url: server.base_url(),
            token: None,
            owner: "octocat".to_string(),
            timeout_secs: None,
        })
        .unwrap();
        let result = github.create_repository("demo").await;

        assert_eq!(create.calls(), 0);
        assert!(result.text().contains("GitHub token is not configured"));
    }
}
