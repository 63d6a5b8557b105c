use crate::core::runner::{DEFAULT_CHUNK_SIZE, DEFAULT_JOB_NAME};
use crate::core::{CaseMapping, ConfigProvider};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub job: JobConfig,
    pub source: SourceConfig,
    pub sink: SinkConfig,
    #[serde(default)]
    pub chunk: ChunkConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub description: Option<String>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_JOB_NAME.to_string(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub input_path: String,
    pub delimiter: Option<char>,
    #[serde(default = "default_field_names")]
    pub names: Vec<String>,
    pub lines_to_skip: Option<usize>,
    #[serde(default)]
    pub comment_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    pub output_path: String,
    pub delimiter: Option<char>,
    pub header: Option<String>,
    pub append: Option<bool>,
    pub delete_if_empty: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkConfig {
    pub size: Option<usize>,
    pub case_mapping: Option<CaseMapping>,
    pub io_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    /// `compact` (default) or `json`
    pub log_format: Option<String>,
}

fn default_field_names() -> Vec<String> {
    vec!["firstName".to_string(), "lastName".to_string()]
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})，未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if let Some(format) = self
            .monitoring
            .as_ref()
            .and_then(|m| m.log_format.as_deref())
        {
            if !matches!(format, "compact" | "json") {
                return Err(EtlError::InvalidConfigValueError {
                    field: "monitoring.log_format".to_string(),
                    value: format.to_string(),
                    reason: "Valid formats: compact, json".to_string(),
                });
            }
        }

        super::validate_provider(self)
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_format.as_deref())
            == Some("json")
    }
}

impl ConfigProvider for TomlConfig {
    fn job_name(&self) -> &str {
        &self.job.name
    }

    fn input_path(&self) -> &str {
        &self.source.input_path
    }

    fn output_path(&self) -> &str {
        &self.sink.output_path
    }

    fn chunk_size(&self) -> usize {
        self.chunk.size.unwrap_or(DEFAULT_CHUNK_SIZE)
    }

    fn field_delimiter(&self) -> char {
        self.source.delimiter.unwrap_or(',')
    }

    fn output_delimiter(&self) -> char {
        self.sink.delimiter.unwrap_or(',')
    }

    fn field_names(&self) -> &[String] {
        &self.source.names
    }

    fn lines_to_skip(&self) -> usize {
        self.source.lines_to_skip.unwrap_or(0)
    }

    fn comment_prefixes(&self) -> &[String] {
        &self.source.comment_prefixes
    }

    fn header(&self) -> Option<&str> {
        self.sink.header.as_deref()
    }

    fn append(&self) -> bool {
        self.sink.append.unwrap_or(false)
    }

    fn delete_if_empty(&self) -> bool {
        self.sink.delete_if_empty.unwrap_or(false)
    }

    fn case_mapping(&self) -> CaseMapping {
        self.chunk.case_mapping.unwrap_or_default()
    }

    fn io_timeout(&self) -> Option<Duration> {
        self.chunk.io_timeout_seconds.map(Duration::from_secs)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_minimal_toml_config() {
        let toml_content = r#"
[source]
input_path = "./data.csv"

[sink]
output_path = "./output.csv"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.job_name(), "copy-file-to-file");
        assert_eq!(config.chunk_size(), 5);
        assert_eq!(config.field_delimiter(), ',');
        assert_eq!(config.field_names(), ["firstName", "lastName"]);
        assert_eq!(config.case_mapping(), CaseMapping::Ascii);
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r##"
[job]
name = "people-export"
description = "Nightly people export"

[source]
input_path = "./data.csv"
delimiter = ";"
names = ["lastName", "firstName"]
lines_to_skip = 1
comment_prefixes = ["#", "//"]

[sink]
output_path = "./output.csv"
delimiter = "|"
header = "LAST|FIRST"
append = true
delete_if_empty = true

[chunk]
size = 50
case_mapping = "unicode"
io_timeout_seconds = 10

[monitoring]
enabled = true
log_format = "json"
"##;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.job_name(), "people-export");
        assert_eq!(config.field_delimiter(), ';');
        assert_eq!(config.output_delimiter(), '|');
        assert_eq!(config.field_names(), ["lastName", "firstName"]);
        assert_eq!(config.lines_to_skip(), 1);
        assert_eq!(config.comment_prefixes().len(), 2);
        assert_eq!(config.header(), Some("LAST|FIRST"));
        assert!(config.append());
        assert!(config.delete_if_empty());
        assert_eq!(config.chunk_size(), 50);
        assert_eq!(config.case_mapping(), CaseMapping::Unicode);
        assert_eq!(config.io_timeout(), Some(Duration::from_secs(10)));
        assert!(config.monitoring_enabled());
        assert!(config.json_logs());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CHUNK_ETL_TEST_DIR", "/tmp/people");

        let toml_content = r#"
[source]
input_path = "${CHUNK_ETL_TEST_DIR}/data.csv"

[sink]
output_path = "${CHUNK_ETL_UNDEFINED_DIR}/output.csv"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.input_path(), "/tmp/people/data.csv");
        assert_eq!(config.output_path(), "${CHUNK_ETL_UNDEFINED_DIR}/output.csv");

        std::env::remove_var("CHUNK_ETL_TEST_DIR");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[source]
input_path = "./data.csv"

[sink]
output_path = "./output.csv"

[chunk]
size = 0
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        let bad_format = r#"
[source]
input_path = "./data.csv"

[sink]
output_path = "./output.csv"

[monitoring]
enabled = false
log_format = "xml"
"#;
        let config = TomlConfig::from_toml_str(bad_format).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_section_is_rejected() {
        let result = TomlConfig::from_toml_str("[source]\ninput_path = \"a.csv\"\n");
        assert!(matches!(
            result,
            Err(EtlError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[job]
name = "file-test"

[source]
input_path = "./data.csv"

[sink]
output_path = "./output.csv"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.job.name, "file-test");
    }
}
