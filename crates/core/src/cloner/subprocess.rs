//! Out-of-process helper invocation.
//!
//! The helper receives a JSON request on stdin and reports a JSON result
//! on stdout; a non-zero exit code or a timeout fails the call. Stdout
//! and stderr are captured for the step record.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::config::ClonerConfig;
use super::error::ClonerError;
use super::traits::{CloneOutcome, CloneRequest, TtsCloner};

/// A fully described helper invocation.
#[derive(Debug, Clone)]
pub struct SubprocessSpec {
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
    pub stdin_json: serde_json::Value,
    pub timeout: Duration,
}

/// Parsed helper result.
#[derive(Debug)]
pub struct SubprocessOutput {
    pub stdout_json: serde_json::Value,
    pub exit_code: i32,
    pub stderr: String,
}

/// Run a helper to completion and parse its stdout as JSON.
pub async fn run_subprocess(spec: SubprocessSpec) -> Result<SubprocessOutput, ClonerError> {
    let Some((program, args)) = spec.argv.split_first() else {
        return Err(ClonerError::NotConfigured);
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|e| ClonerError::Spawn(format!("{}: {}", program, e)))?;

    let payload =
        serde_json::to_vec(&spec.stdin_json).map_err(|e| ClonerError::BadOutput(e.to_string()))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(&payload)
            .await
            .map_err(|e| ClonerError::Spawn(format!("write helper stdin: {}", e)))?;
        drop(stdin);
    }

    let timeout_secs = spec.timeout.as_secs();
    let output = timeout(spec.timeout, child.wait_with_output())
        .await
        .map_err(|_| ClonerError::Timeout { timeout_secs })?
        .map_err(|e| ClonerError::Spawn(format!("wait for helper: {}", e)))?;

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let exit_code = output.status.code().unwrap_or(-1);
    if !output.status.success() {
        return Err(ClonerError::NonZeroExit {
            code: exit_code,
            stderr,
        });
    }

    let stdout_json = serde_json::from_slice(&output.stdout)
        .map_err(|e| ClonerError::BadOutput(format!("helper stdout: {}", e)))?;

    Ok(SubprocessOutput {
        stdout_json,
        exit_code,
        stderr,
    })
}

#[derive(Debug, Deserialize)]
struct HelperResult {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    duration_ms: u64,
}

/// [`TtsCloner`] backed by an out-of-process helper binary.
pub struct SubprocessCloner {
    config: ClonerConfig,
}

impl SubprocessCloner {
    pub fn new(config: ClonerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TtsCloner for SubprocessCloner {
    fn name(&self) -> &str {
        "subprocess"
    }

    async fn clone_with_emotion(&self, request: CloneRequest) -> Result<CloneOutcome, ClonerError> {
        let spec = SubprocessSpec {
            argv: self.config.helper_argv.clone(),
            env: self.config.helper_env.clone(),
            stdin_json: json!({
                "text": request.text,
                "speaker_wav": request.speaker_wav,
                "emotion_wav": request.emotion_wav,
                "output_path": request.output_path,
            }),
            timeout: Duration::from_secs(self.config.timeout_secs),
        };

        let output = run_subprocess(spec).await?;
        debug!(
            output = %output.stdout_json,
            "cloner helper finished"
        );

        let result: HelperResult = serde_json::from_value(output.stdout_json)
            .map_err(|e| ClonerError::BadOutput(e.to_string()))?;
        if !result.success {
            return Err(ClonerError::Rejected(
                result.error.unwrap_or_else(|| "unspecified".to_string()),
            ));
        }

        Ok(CloneOutcome {
            duration_ms: result.duration_ms,
        })
    }
}
