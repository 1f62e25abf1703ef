//! 配置系统
//! 从环境变量（以及可选的配置文件）加载所有配置，使用 Secret 包装敏感信息

use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::ssh::config::{default_key_path, SshConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct ZfsConfig {
    /// zfs 可执行文件
    pub binary: String,
    /// 存放数据集标识符的用户属性
    pub identifier_property: String,
    /// 是否通过 pfexec 执行（RBAC 权限）
    pub use_pfexec: bool,
}

impl Default for ZfsConfig {
    fn default() -> Self {
        Self {
            binary: "zfs".to_string(),
            identifier_property: "terraform:uuid".to_string(),
            use_pfexec: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub ssh: SshConfig,
    pub zfs: ZfsConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// 加载配置：默认值 < 配置文件 < 环境变量（前缀 ILLUMOS_）
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let zfs = ZfsConfig::default();
        let logging = LoggingConfig::default();

        let mut settings = Config::builder()
            .set_default("ssh.port", 22)?
            .set_default("ssh.key_path", default_key_path().to_string_lossy().to_string())?
            .set_default("ssh.host_key_verification", "strict")?
            .set_default("ssh.connect_timeout_secs", 10)?
            .set_default("zfs.binary", zfs.binary)?
            .set_default("zfs.identifier_property", zfs.identifier_property)?
            .set_default("zfs.use_pfexec", zfs.use_pfexec)?
            .set_default("logging.level", logging.level)?
            .set_default("logging.format", logging.format)?;

        if let Some(path) = file {
            settings = settings.add_source(File::from(path).required(true));
        }

        settings = settings.add_source(
            Environment::with_prefix("ILLUMOS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    fn validate(&self) -> Result<(), ConfigError> {
        self.ssh.validate().map_err(ConfigError::Message)?;

        if self.zfs.binary.trim().is_empty() {
            return Err(ConfigError::Message("zfs.binary must not be empty".to_string()));
        }

        // ZFS 用户属性名必须包含冒号
        if !self.zfs.identifier_property.contains(':') {
            return Err(ConfigError::Message(format!(
                "zfs.identifier_property '{}' must be a user property (module:property)",
                self.zfs.identifier_property
            )));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        Ok(())
    }
}
