use std::sync::Arc;

use tracing::debug;

use crate::command::Intent;
use crate::services::{Completion, Mailer, OperationResult, Search, SourceHost};

/// Branch created by "create branch" and used as the PR head.
pub const FEATURE_BRANCH: &str = "feature";
/// Branch that new branches start from and PRs target.
pub const BASE_BRANCH: &str = "main";

const PR_TITLE: &str = "PR via Bot";

/// Routes each intent to the external operation(s) that fulfil it.
///
/// Results are passed through untouched; the clients already turn their
/// failures into reply text.
pub struct Dispatcher {
    completion: Arc<dyn Completion>,
    source_host: Arc<dyn SourceHost>,
    mailer: Arc<dyn Mailer>,
    search: Arc<dyn Search>,
    /// Account prefix for `owner/name` repository identifiers
    owner: String,
}

impl Dispatcher {
    pub fn new(
        completion: Arc<dyn Completion>,
        source_host: Arc<dyn SourceHost>,
        mailer: Arc<dyn Mailer>,
        search: Arc<dyn Search>,
        owner: String,
    ) -> Self {
        Self {
            completion,
            source_host,
            mailer,
            search,
            owner,
        }
    }

    fn full_name(&self, repo: &str) -> String {
        format!("{}/{}", self.owner, repo)
    }

    pub async fn dispatch(&self, intent: Intent) -> OperationResult {
        debug!("Dispatching intent: {}", intent.kind());

        match intent {
            Intent::GenerateArt { subject } => {
                let prompt = format!(
                    "Generate a simple but clear ASCII art of {}. \
                     Only use plain text characters. Keep it under 50 lines.",
                    subject
                );
                self.completion.complete(&prompt).await
            }
            Intent::SendEmail { to, subject, body } => {
                self.mailer.send(&to, &subject, &body).await
            }
            Intent::CreateRepo { name } => self.source_host.create_repository(&name).await,
            Intent::AddFile { filename, repo } => {
                // Whatever the model returns, error text included, is committed as is.
                let generated = self
                    .completion
                    .complete(&format!("Write complete {} code in Python.", filename))
                    .await;
                self.source_host
                    .create_file(
                        &self.full_name(&repo),
                        &filename,
                        generated.text(),
                        &format!("Add {} via bot", filename),
                    )
                    .await
            }
            Intent::DeleteFile { filename, repo } => {
                let repo = self.full_name(&repo);
                // An unresolved marker is sent as "" and rejected by the host.
                let revision = self.source_host.revision_marker(&repo, &filename).await;
                self.source_host
                    .delete_file(
                        &repo,
                        &filename,
                        &revision,
                        &format!("Delete {} via bot", filename),
                    )
                    .await
            }
            Intent::CreatePullRequest { repo } => {
                self.source_host
                    .create_pull_request(&self.full_name(&repo), PR_TITLE, FEATURE_BRANCH, BASE_BRANCH)
                    .await
            }
            Intent::CreateBranch { repo } => {
                self.source_host
                    .create_branch(&self.full_name(&repo), FEATURE_BRANCH, BASE_BRANCH)
                    .await
            }
            Intent::ReviewCode { snippet } => {
                let prompt = format!(
                    "Review the following code and highlight any bugs or improvements:\n\n{}",
                    snippet
                );
                self.completion.complete(&prompt).await
            }
            Intent::SearchWeb { query } => self.search.lookup(&query).await,
            Intent::Freeform { text } => self.completion.complete(&text).await,
            Intent::Usage(hint) => OperationResult::success(hint),
        }
    }
}
