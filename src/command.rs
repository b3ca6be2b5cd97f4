//! Chat command classification.
//!
//! Rules are checked in a fixed order and the first match wins, so a message
//! matching several rules (e.g. both "create repo" and "create pr") always
//! resolves to the earliest one.

pub const EMAIL_USAGE: &str = "Usage: email <recipient_email> <subject> <body>";
pub const ADD_FILE_USAGE: &str = "Usage: add file <filename> to <repo>";
pub const DELETE_FILE_USAGE: &str = "Usage: delete file <filename> from <repo>";

/// The classified meaning of a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    GenerateArt { subject: String },
    SendEmail { to: String, subject: String, body: String },
    CreateRepo { name: String },
    AddFile { filename: String, repo: String },
    DeleteFile { filename: String, repo: String },
    CreatePullRequest { repo: String },
    CreateBranch { repo: String },
    ReviewCode { snippet: String },
    SearchWeb { query: String },
    Freeform { text: String },
    /// Recognized command with too few arguments; replied to verbatim.
    Usage(&'static str),
}

impl Intent {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::GenerateArt { .. } => "generate_art",
            Intent::SendEmail { .. } => "send_email",
            Intent::CreateRepo { .. } => "create_repo",
            Intent::AddFile { .. } => "add_file",
            Intent::DeleteFile { .. } => "delete_file",
            Intent::CreatePullRequest { .. } => "create_pr",
            Intent::CreateBranch { .. } => "create_branch",
            Intent::ReviewCode { .. } => "review_code",
            Intent::SearchWeb { .. } => "search_web",
            Intent::Freeform { .. } => "freeform",
            Intent::Usage(_) => "usage",
        }
    }
}

/// Classify a message that the caller has already lowercased and trimmed.
pub fn classify(text: &str) -> Intent {
    if text.starts_with("ascii") {
        return Intent::GenerateArt {
            subject: text.replace("ascii", "").trim().to_string(),
        };
    }

    if text.starts_with("email ") {
        let parts: Vec<&str> = text.splitn(4, ' ').collect();
        if parts.len() < 4 {
            return Intent::Usage(EMAIL_USAGE);
        }
        return Intent::SendEmail {
            to: parts[1].to_string(),
            subject: parts[2].to_string(),
            body: parts[3].to_string(),
        };
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    let last = tokens.last().copied().unwrap_or_default().to_string();

    if text.contains("create repo") {
        return Intent::CreateRepo { name: last };
    }

    // The filename is always the third token, wherever "add file" appears.
    if text.contains("add file") || text.contains(".py") {
        return match tokens.get(2) {
            Some(filename) => Intent::AddFile {
                filename: filename.to_string(),
                repo: last,
            },
            None => Intent::Usage(ADD_FILE_USAGE),
        };
    }

    if text.contains("delete file") {
        return match tokens.get(2) {
            Some(filename) => Intent::DeleteFile {
                filename: filename.to_string(),
                repo: last,
            },
            None => Intent::Usage(DELETE_FILE_USAGE),
        };
    }

    if text.contains("create pr") {
        return Intent::CreatePullRequest { repo: last };
    }

    if text.contains("create branch") {
        return Intent::CreateBranch { repo: last };
    }

    if let Some((_, snippet)) = text.split_once("review code") {
        return Intent::ReviewCode {
            snippet: snippet.trim().to_string(),
        };
    }

    if let Some(query) = text.strip_prefix("search") {
        return Intent::SearchWeb {
            query: query.trim().to_string(),
        };
    }

    Intent::Freeform {
        text: text.to_string(),
    }
}
