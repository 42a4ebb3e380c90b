//! Strongly-typed identifiers for changegate entities.

use crate::error::{GateError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum token length accepted from the wire.
pub const MAX_TOKEN_LEN: usize = 256;

/// Opaque correlation key addressing exactly one pending wait.
///
/// Tokens travel in URL paths, so only unreserved URI characters are allowed:
/// ASCII alphanumerics plus `.`, `_`, `~` and `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Token(String);

impl Token {
    /// Validate and wrap a raw token.
    ///
    /// # Errors
    /// Returns [`GateError::InvalidToken`] if the text is empty, too long, or
    /// contains characters that are not path-safe.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(GateError::InvalidToken {
                token: raw,
                cause: "token is empty".to_string(),
            });
        }
        if raw.len() > MAX_TOKEN_LEN {
            return Err(GateError::InvalidToken {
                cause: format!("token exceeds {} characters", MAX_TOKEN_LEN),
                token: raw,
            });
        }
        if let Some(bad) = raw.chars().find(|c| !is_token_char(*c)) {
            return Err(GateError::InvalidToken {
                cause: format!("character {:?} is not allowed", bad),
                token: raw,
            });
        }
        Ok(Self(raw))
    }

    /// Mint a fresh, unguessable token for a job.
    ///
    /// Layout: `<tool_id>_<random>_<job>`. The random part is a v4 UUID in
    /// simple form; characters of the tool or job ID that are not path-safe
    /// are replaced with `-`.
    #[must_use]
    pub fn mint(tool_id: &str, job_id: &JobId) -> Self {
        let disambiguator = Uuid::new_v4().simple().to_string();
        let mut token = format!(
            "{}_{}_{}",
            sanitize(tool_id),
            disambiguator,
            sanitize(job_id.as_str())
        );
        token.truncate(MAX_TOKEN_LEN);
        Self(token)
    }

    /// Borrow the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '~' | '-')
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if is_token_char(c) { c } else { '-' })
        .collect()
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Token {
    type Error = GateError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

/// Identifier of the suspended unit of work that owns a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(Uuid);

impl ExecutionId {
    /// Create a new random execution ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parse an execution ID, with or without the `exec_` display prefix.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.strip_prefix("exec_").unwrap_or(s);
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exec_{}", self.0)
    }
}

/// Identifier of a pipeline job (e.g. `folder/deploy-prod#42`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Create a job ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the job ID text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
