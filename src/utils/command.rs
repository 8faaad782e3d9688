/// External command execution
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::process::Stdio;
use tokio::process::Command;

/// Result from command execution with captured output
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutput {
    fn from_output(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        }
    }

    /// Return stdout if successful, otherwise error with stderr
    pub fn into_result(self) -> Result<String> {
        if self.success {
            Ok(self.stdout)
        } else {
            anyhow::bail!("{}", self.stderr.trim())
        }
    }
}

/// Builder for executing external commands with captured output
pub struct CommandBuilder {
    command: Command,
    context_msg: Option<String>,
}

impl CommandBuilder {
    /// Create a new command builder
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        let mut command = Command::new(program);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        Self {
            command,
            context_msg: None,
        }
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.command.args(args);
        self
    }

    /// Set context message for error reporting
    pub fn context<S: Into<String>>(mut self, msg: S) -> Self {
        self.context_msg = Some(msg.into());
        self
    }

    /// Execute and return raw output
    pub async fn output(mut self) -> Result<CommandOutput> {
        let output = match self.context_msg.take() {
            Some(ctx) => self.command.output().await.context(ctx)?,
            None => self.command.output().await?,
        };
        Ok(CommandOutput::from_output(output))
    }

    /// Execute and return stdout on success, error on failure
    pub async fn run(self) -> Result<String> {
        self.output().await?.into_result()
    }
}

/// Ask the gcloud CLI for an OAuth access token of the active account
pub async fn gcloud_access_token() -> Result<String> {
    let stdout = CommandBuilder::new("gcloud")
        .args(["auth", "print-access-token"])
        .context(
            "gcloud is not installed or not in PATH. Install it from \
             https://cloud.google.com/sdk/docs/install or set GOOGLE_OAUTH_ACCESS_TOKEN",
        )
        .run()
        .await
        .context("gcloud auth print-access-token failed")?;

    let token = stdout.trim();
    if token.is_empty() {
        anyhow::bail!("gcloud returned an empty access token");
    }
    Ok(token.to_string())
}
