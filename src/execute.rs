//! Code runner proxy.
//!
//! Source files are sent to a Judge0 instance; nothing runs locally.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

use crate::config::ExecuteConfig;
use crate::file::DriveService;
use crate::{DriveError, Result};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// User agent string for Judge0 requests.
const USER_AGENT: &str = "driveshelf/0.1 (code runner)";

/// Judge0 language IDs by file extension.
pub const LANGUAGES: [(&str, u32); 10] = [
    ("py", 71),
    ("java", 62),
    ("c", 50),
    ("cpp", 54),
    ("go", 60),
    ("rb", 72),
    ("php", 68),
    ("sh", 46),
    ("js", 63),
    ("ts", 74),
];

/// Judge0 language ID for a file extension.
pub fn language_id(extension: &str) -> Option<u32> {
    let extension = extension.to_lowercase();
    LANGUAGES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, id)| *id)
}

/// Decode a base64 field from Judge0. Line breaks inside the data are allowed.
pub fn decode_output(value: Option<&str>) -> Option<String> {
    let compact: String = value?.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }
    let bytes = STANDARD.decode(compact).ok()?;
    String::from_utf8(bytes).ok()
}

#[derive(Debug, Deserialize)]
struct Submission {
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    time: Option<Value>,
    #[serde(default)]
    memory: Option<Value>,
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
    #[serde(default)]
    compile_output: Option<String>,
}

/// Decoded program output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecodedOutput {
    /// Standard output.
    pub stdout: Option<String>,
    /// Standard error.
    pub stderr: Option<String>,
    /// Compiler messages.
    pub compile_output: Option<String>,
}

/// Result of a run. Output fields hold Judge0's base64 text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutput {
    /// Judge0 status object.
    pub status: Option<Value>,
    /// CPU time in seconds.
    pub time: Option<Value>,
    /// Memory use in kilobytes.
    pub memory: Option<Value>,
    /// Base64 standard output.
    pub stdout: Option<String>,
    /// Base64 standard error.
    pub stderr: Option<String>,
    /// Base64 compiler messages.
    pub compile_output: Option<String>,
    /// The output fields decoded as UTF-8.
    pub decoded: DecodedOutput,
}

impl From<Submission> for RunOutput {
    fn from(s: Submission) -> Self {
        let decoded = DecodedOutput {
            stdout: decode_output(s.stdout.as_deref()),
            stderr: decode_output(s.stderr.as_deref()),
            compile_output: decode_output(s.compile_output.as_deref()),
        };
        Self {
            status: s.status,
            time: s.time,
            memory: s.memory,
            stdout: s.stdout,
            stderr: s.stderr,
            compile_output: s.compile_output,
            decoded,
        }
    }
}

/// Client for a Judge0 service.
pub struct CodeRunner {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CodeRunner {
    /// Create a runner from configuration.
    pub fn new(config: &ExecuteConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DriveError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.judge0_url.trim().to_string(),
            api_key: config.judge0_key.trim().to_string(),
        })
    }

    /// Check if a Judge0 URL is configured.
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty()
    }

    /// URL of the synchronous submission endpoint.
    pub fn submissions_url(&self) -> Result<Url> {
        if !self.is_configured() {
            return Err(DriveError::Unavailable(
                "code execution is not configured".to_string(),
            ));
        }
        let mut url = Url::parse(&format!("{}/submissions", self.base_url.trim_end_matches('/')))
            .map_err(|e| DriveError::Config(format!("invalid judge0_url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("base64_encoded", "true")
            .append_pair("wait", "true");
        Ok(url)
    }

    /// Submit source code and wait for the result.
    pub async fn run_source(&self, language_id: u32, source: &[u8], stdin: &str) -> Result<RunOutput> {
        let url = self.submissions_url()?;
        let payload = json!({
            "language_id": language_id,
            "source_code": STANDARD.encode(source),
            "stdin": STANDARD.encode(stdin.as_bytes()),
        });

        let mut request = self.client.post(url).json(&payload);
        if !self.api_key.is_empty() {
            request = request
                .header("X-Auth-Token", &self.api_key)
                .header("X-RapidAPI-Key", &self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DriveError::Upstream(format!("judge0 request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::Upstream(format!(
                "judge0 returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let submission: Submission = response
            .json()
            .await
            .map_err(|e| DriveError::Upstream(format!("invalid judge0 response: {}", e)))?;
        debug!(language_id, status = ?submission.status, "Judge0 submission finished");
        Ok(submission.into())
    }

    /// Run a live file the caller can view.
    pub async fn run_file(
        &self,
        drive: &DriveService<'_>,
        user_id: i64,
        file_id: i64,
        stdin: &str,
    ) -> Result<RunOutput> {
        let file = drive.get_file(user_id, file_id).await?;
        let extension = file.extension().unwrap_or_default();
        let language_id = language_id(&extension).ok_or_else(|| {
            DriveError::BadRequest(format!("unsupported language for extension: {extension}"))
        })?;
        if !self.is_configured() {
            return Err(DriveError::Unavailable(
                "code execution is not configured".to_string(),
            ));
        }

        let source = drive.storage().load(&file.stored_name)?;
        info!(user_id, file_id, language_id, "Running file");
        self.run_source(language_id, &source, stdin).await
    }
}
