//! SSH 配置模型
//!
//! 连接配置在构造后不可变；运行期连接状态由 `SessionManager` 单独持有

use secrecy::Secret;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// 主机密钥验证策略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyVerification {
    /// 严格模式：只接受 known_hosts 中登记的指纹
    #[default]
    Strict,
    /// 接受模式：已登记的主机必须匹配，未登记的主机首次接受
    Accept,
    /// 禁用验证（不安全，仅用于封闭的实验网络）
    Disabled,
}

impl std::str::FromStr for HostKeyVerification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "accept" => Ok(Self::Accept),
            "disabled" | "none" | "false" => Ok(Self::Disabled),
            _ => Err(format!("Unknown host key verification mode: {}", s)),
        }
    }
}

/// SSH 连接配置
#[derive(Debug, Clone, Deserialize)]
pub struct SshConfig {
    /// 主机地址
    pub host: String,

    /// 端口
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// 用户名
    pub username: String,

    /// 私钥文件路径，默认 `~/.ssh/id_rsa`
    #[serde(default = "default_key_path")]
    pub key_path: PathBuf,

    /// 私钥密码（使用 Secret 包装，防止日志泄露）
    #[serde(default)]
    pub key_passphrase: Option<Secret<String>>,

    /// 主机密钥验证策略
    #[serde(default)]
    pub host_key_verification: HostKeyVerification,

    /// 已知主机指纹，键为 `host:port`，值为 `ssh-keygen -lf` 输出的 `SHA256:<base64>`
    #[serde(default)]
    pub known_hosts: HashMap<String, String>,

    /// 连接与握手超时（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_ssh_port() -> u16 {
    22
}

fn default_connect_timeout() -> u64 {
    10
}

/// 默认私钥路径，只在配置边界解析一次用户主目录
pub fn default_key_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".ssh").join("id_rsa"))
        .unwrap_or_default()
}

impl SshConfig {
    /// 创建新的 SSH 配置
    pub fn new(host: String, username: String) -> Self {
        Self {
            host,
            port: default_ssh_port(),
            username,
            key_path: default_key_path(),
            key_passphrase: None,
            host_key_verification: HostKeyVerification::default(),
            known_hosts: HashMap::new(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }

    /// 设置端口
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// 设置私钥路径
    pub fn with_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = path.into();
        self
    }

    /// 设置私钥密码
    pub fn with_key_passphrase(mut self, passphrase: String) -> Self {
        self.key_passphrase = Some(Secret::new(passphrase));
        self
    }

    /// 设置主机密钥验证策略
    pub fn with_host_key_verification(mut self, verification: HostKeyVerification) -> Self {
        self.host_key_verification = verification;
        self
    }

    /// 登记已知主机指纹
    pub fn with_known_host(mut self, fingerprint: String) -> Self {
        self.known_hosts.insert(self.host_key(), fingerprint);
        self
    }

    /// 设置连接超时
    pub fn with_connect_timeout(mut self, timeout_secs: u64) -> Self {
        self.connect_timeout_secs = timeout_secs;
        self
    }

    /// known_hosts 中使用的键
    pub fn host_key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 获取目标地址字符串
    pub fn target(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("ssh.host must not be empty".to_string());
        }
        if self.username.trim().is_empty() {
            return Err("ssh.username must not be empty".to_string());
        }
        if self.port == 0 {
            return Err("ssh.port must be between 1 and 65535".to_string());
        }
        if self.key_path.as_os_str().is_empty() {
            return Err(
                "ssh.key_path is not set and no home directory is available".to_string(),
            );
        }
        Ok(())
    }
}
