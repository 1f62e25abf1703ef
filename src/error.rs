//! 统一错误模型
//! 定义远程会话与数据集操作的所有错误类型

use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("SSH connection error: {0}")]
    SshConnection(String),

    #[error("SSH authentication failed: {0}")]
    SshAuthentication(String),

    #[error("SSH session error: {0}")]
    SshSession(String),

    /// 远程命令失败（非零退出码，或在严格模式下 stderr 非空）
    #[error("remote command `{command}` failed (exit code {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Dataset not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// 错误分类，便于日志聚合
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::SshConnection(_) => "connection",
            AppError::SshAuthentication(_) => "authentication",
            AppError::SshSession(_) => "session",
            AppError::CommandFailed { .. } => "command",
            AppError::Parse(_) => "parse",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation",
        }
    }

    /// 是否确认资源不存在
    ///
    /// 只有 `NotFound` 表示远端列表完整且没有匹配项；
    /// 其余错误只能说明"无法确认存在性"。
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// 是否为连接阶段的错误（密钥、拨号、认证、通道）
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::SshConnection(_) | AppError::SshAuthentication(_) | AppError::SshSession(_)
        )
    }

    // 便捷方法
    pub fn validation(msg: &str) -> Self {
        AppError::Validation(msg.to_string())
    }

    pub fn parse(msg: &str) -> Self {
        AppError::Parse(msg.to_string())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

/// 从 russh::Error 转换（握手阶段的传输错误）
impl From<russh::Error> for AppError {
    fn from(e: russh::Error) -> Self {
        AppError::SshConnection(e.to_string())
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}
