use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{NotesError, Result};

/// Source of the bearer token used for document API calls.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn token(&self) -> Result<String>;
}

/// A token handed over in configuration.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn token(&self) -> Result<String> {
        let token = self.0.trim();
        if token.is_empty() {
            return Err(NotesError::Auth("access token is empty".to_string()));
        }
        Ok(token.to_string())
    }
}

/// Asks an external tool for a fresh token, `gcloud` by default.
pub struct CommandToken {
    program: String,
    args: Vec<String>,
}

impl Default for CommandToken {
    fn default() -> Self {
        Self::new("gcloud", ["auth", "print-access-token"])
    }
}

impl CommandToken {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl CredentialProvider for CommandToken {
    async fn token(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| NotesError::Auth(format!("could not run {}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(NotesError::Auth(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(NotesError::Auth(format!("{} printed no token", self.program)));
        }
        Ok(token)
    }
}
