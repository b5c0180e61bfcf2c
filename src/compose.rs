// ABOUTME: Runs the external Compose tool for stack deploy and teardown.
// ABOUTME: Deployment YAML lives in a private temp file that is removed on every exit path.

use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Errors from running the Compose tool.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("failed to prepare compose file: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("failed to launch {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("{program} exited with exit code {code}: {stderr}")]
    Exit {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("{program} was terminated by a signal: {stderr}")]
    Terminated { program: String, stderr: String },
}

impl ComposeError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ComposeError::Exit { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Captured output of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ComposeOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Invokes a Compose-compatible tool.
#[derive(Debug, Clone)]
pub struct ComposeRunner {
    program: String,
    args: Vec<String>,
    temp_dir: PathBuf,
}

impl Default for ComposeRunner {
    fn default() -> Self {
        Self::new("docker", vec!["compose".to_string()])
    }
}

impl ComposeRunner {
    /// `program` plus the leading `args` that select its compose mode
    /// (`docker compose`, or `docker-compose` with no args).
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Write deployment files somewhere other than the system temp dir.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn temp_dir(&self) -> &std::path::Path {
        &self.temp_dir
    }

    /// Bring a stack up in the background from `yaml`.
    ///
    /// Runs `[-p <project>] -f <file> up -d` with `env` applied. The file is
    /// deleted before this returns, whatever the outcome.
    pub async fn deploy(
        &self,
        env: &[(String, String)],
        yaml: &str,
        project: Option<&str>,
    ) -> Result<ComposeOutput, ComposeError> {
        let file = tempfile::Builder::new()
            .prefix("dockfleet-compose-")
            .suffix(".yml")
            .tempfile_in(&self.temp_dir)
            .map_err(ComposeError::TempFile)?;

        let mut args = project_args(project);
        args.push("-f".to_string());
        args.push(file.path().to_string_lossy().into_owned());
        args.push("up".to_string());
        args.push("-d".to_string());

        // Dropping `file` on any early exit (including cancellation) also removes it
        let result = match tokio::fs::write(file.path(), yaml).await {
            Ok(()) => self.run(env, &args).await,
            Err(e) => Err(ComposeError::TempFile(e)),
        };

        let path = file.path().to_path_buf();
        if let Err(e) = file.close() {
            tracing::warn!("failed to remove compose file {}: {}", path.display(), e);
        }

        result
    }

    /// Stop and remove a stack and its volumes: `-p <project> down -v`.
    pub async fn teardown(
        &self,
        env: &[(String, String)],
        project: &str,
    ) -> Result<ComposeOutput, ComposeError> {
        let mut args = project_args(Some(project));
        args.push("down".to_string());
        args.push("-v".to_string());
        self.run(env, &args).await
    }

    async fn run(
        &self,
        env: &[(String, String)],
        args: &[String],
    ) -> Result<ComposeOutput, ComposeError> {
        tracing::info!("Running {} {} {}", self.program, self.args.join(" "), args.join(" "));

        let output = Command::new(&self.program)
            .args(&self.args)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ComposeError::Spawn {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            return Ok(ComposeOutput { stdout, stderr });
        }

        match output.status.code() {
            Some(code) => {
                tracing::warn!("{} exited with code {}", self.program, code);
                Err(ComposeError::Exit {
                    program: self.program.clone(),
                    code,
                    stderr: stderr.trim().to_string(),
                })
            }
            None => Err(ComposeError::Terminated {
                program: self.program.clone(),
                stderr: stderr.trim().to_string(),
            }),
        }
    }
}

fn project_args(project: Option<&str>) -> Vec<String> {
    match project {
        Some(name) => vec!["-p".to_string(), name.to_string()],
        None => Vec::new(),
    }
}
