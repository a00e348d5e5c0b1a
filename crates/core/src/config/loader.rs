use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// Environment variables use the `WEAVER_` prefix and a double underscore
/// between section and key, e.g. `WEAVER_WORKER__TIMEOUT_SECS=120`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("WEAVER_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[server]
port = 9000

[worker]
program = "python3"
leading_args = ["weave.py"]
auxiliary_path = "frames/circular_nails_frame.jpg"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.worker.program, PathBuf::from("python3"));
        assert_eq!(config.worker.leading_args, vec!["weave.py".to_string()]);
        assert_eq!(config.worker.timeout_secs, None);
    }

    #[test]
    fn test_load_config_from_str_missing_worker() {
        let toml = r#"
[server]
port = 8080
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[server]
host = "127.0.0.1"
port = 3000

[staging]
dir = "/var/lib/weaver/uploads"
retain_inputs = false

[worker]
program = "/usr/local/bin/weave"
auxiliary_path = "/srv/frames/nails.jpg"
timeout_secs = 600

[result]
template = "https://cdn.example.com/weaves/{{output_id}}.gif"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.staging.dir, PathBuf::from("/var/lib/weaver/uploads"));
        assert!(!config.staging.retain_inputs);
        assert_eq!(config.worker.timeout_secs, Some(600));
        assert_eq!(
            config.result.template,
            "https://cdn.example.com/weaves/{output_id}.gif"
        );
    }
}
