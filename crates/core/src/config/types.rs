use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub staging: StagingConfig,
    pub worker: WorkerConfig,
    #[serde(default)]
    pub result: ResultConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Where uploads are staged before a worker sees them.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StagingConfig {
    #[serde(default = "default_staging_dir")]
    pub dir: PathBuf,
    /// Largest accepted upload in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Keep staged inputs after the job is terminal.
    #[serde(default = "default_retain_inputs")]
    pub retain_inputs: bool,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: default_staging_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            retain_inputs: default_retain_inputs(),
        }
    }
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("public/images")
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_retain_inputs() -> bool {
    true
}

/// External transformation unit.
///
/// The unit is invoked as
/// `program [leading_args...] <input> <auxiliary> <output_id> <verbosity_flag>`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    pub program: PathBuf,
    /// Arguments placed before the positional contract (e.g. a script path
    /// when `program` is an interpreter).
    #[serde(default)]
    pub leading_args: Vec<String>,
    /// Fixed reference resource passed as the second positional argument.
    pub auxiliary_path: PathBuf,
    #[serde(default = "default_verbosity_flag")]
    pub verbosity_flag: String,
    /// Cap on retained stderr per job; oldest bytes are evicted first.
    #[serde(default = "default_max_stderr_bytes")]
    pub max_stderr_bytes: usize,
    /// Wall-clock limit per job. Unlimited when absent.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl WorkerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn default_verbosity_flag() -> String {
    "1".to_string()
}

fn default_max_stderr_bytes() -> usize {
    64 * 1024
}

/// How finished artifacts are addressed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResultConfig {
    /// Reference template; `{output_id}` is replaced by the job's output
    /// identifier. `http(s)://` templates produce URLs, anything else a path.
    #[serde(default = "default_template")]
    pub template: String,
    /// Maximum characters of redacted stderr included in error messages.
    #[serde(default = "default_max_error_excerpt")]
    pub max_error_excerpt: usize,
    /// Directory served under `/results` when set.
    #[serde(default)]
    pub serve_dir: Option<PathBuf>,
}

impl Default for ResultConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            max_error_excerpt: default_max_error_excerpt(),
            serve_dir: None,
        }
    }
}

fn default_template() -> String {
    "/results/{output_id}".to_string()
}

fn default_max_error_excerpt() -> usize {
    400
}
