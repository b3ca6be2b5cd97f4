//! Contracts for the external capabilities the relay drives.
//!
//! Every operation reports its outcome as an [`OperationResult`] instead of
//! an error: implementations catch failures at their own boundary and turn
//! them into text, so callers never need failure handling of their own.

use async_trait::async_trait;

/// Reply used when an operation succeeds with nothing to say.
const EMPTY_REPLY: &str = "Done (no output).";

/// Outcome of one external operation, always renderable as chat text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    Success(String),
    Failure(String),
}

impl OperationResult {
    pub fn success(text: impl Into<String>) -> Self {
        OperationResult::Success(text.into())
    }

    /// Build a failure as `"{category}: {error}"`, including the full
    /// context chain of the error.
    pub fn failure(category: &str, error: &anyhow::Error) -> Self {
        OperationResult::Failure(format!("{}: {:#}", category, error))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Success(_))
    }

    pub fn text(&self) -> &str {
        match self {
            OperationResult::Success(t) | OperationResult::Failure(t) => t,
        }
    }

    /// Reply text for the chat. Never empty.
    pub fn into_reply(self) -> String {
        let text = match self {
            OperationResult::Success(t) | OperationResult::Failure(t) => t,
        };
        if text.trim().is_empty() {
            EMPTY_REPLY.to_string()
        } else {
            text
        }
    }
}

/// Text completion against the language model.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str) -> OperationResult;
}

/// Repository, file, branch and pull request operations on the source host.
///
/// `repo` is always the full `owner/name` identifier.
#[async_trait]
pub trait SourceHost: Send + Sync {
    async fn create_repository(&self, name: &str) -> OperationResult;

    async fn create_file(
        &self,
        repo: &str,
        path: &str,
        content: &str,
        message: &str,
    ) -> OperationResult;

    async fn delete_file(
        &self,
        repo: &str,
        path: &str,
        revision: &str,
        message: &str,
    ) -> OperationResult;

    /// Current revision marker (blob sha) of a file, or an empty string when
    /// it cannot be resolved.
    async fn revision_marker(&self, repo: &str, path: &str) -> String;

    async fn create_pull_request(
        &self,
        repo: &str,
        title: &str,
        head: &str,
        base: &str,
    ) -> OperationResult;

    /// Two-step: resolve `source`'s commit, then create `new_branch` on it.
    async fn create_branch(&self, repo: &str, new_branch: &str, source: &str) -> OperationResult;
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> OperationResult;
}

#[async_trait]
pub trait Search: Send + Sync {
    async fn lookup(&self, query: &str) -> OperationResult;
}

/// Outbound chat delivery. Failures are returned so the caller can log them.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, chat_id: Option<i64>, text: &str) -> anyhow::Result<()>;
}
