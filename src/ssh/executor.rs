//! SSH 会话管理器
//! 每个客户端实例持有至多一条惰性建立的 SSH 连接，按需为每次操作打开独立会话
//!
//! 使用 russh 库实现连接、公钥认证和命令执行

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use russh::client::{self, Config};
use russh::{Channel, ChannelMsg, Disconnect};
use russh_keys::key::{KeyPair, PublicKey};
use russh_keys::load_secret_key;
use secrecy::ExposeSecret;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::command::RemoteCommand;
use super::config::{HostKeyVerification, SshConfig};
use super::execution::ExecutionResult;
use crate::error::{AppError, Result};

/// 远程执行接口
///
/// 数据集操作只依赖这个接口；`SessionManager` 是基于 SSH 的实现。
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// 确保连接可用（幂等）
    async fn ensure_connected(&self) -> Result<()>;

    /// 在一个新的会话中执行一条命令，会话用后即释放
    async fn execute(&self, command: &RemoteCommand) -> Result<ExecutionResult>;

    /// 关闭连接（幂等）
    async fn close(&self);
}

type Connection = client::Handle<HostKeyPolicy>;

/// SSH 会话管理器
///
/// 配置不可变；连接槽位由内部互斥锁保护，与配置分离。
pub struct SessionManager {
    config: SshConfig,
    connection: Mutex<Option<Connection>>,
}

impl SessionManager {
    pub fn new(config: SshConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
        }
    }

    /// 当前是否持有连接
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    /// 建立连接（已连接时直接返回，不做健康检查）
    ///
    /// 任何一步失败都不会保存连接，下次调用会从头重试。
    pub async fn ensure_connected(&self) -> Result<()> {
        let mut slot = self.connection.lock().await;
        if slot.is_some() {
            return Ok(());
        }

        let handle = self.connect().await?;
        *slot = Some(handle);
        Ok(())
    }

    /// 在现有连接上打开一个命令会话
    pub async fn new_session(&self) -> Result<Session> {
        let slot = self.connection.lock().await;
        let handle = slot.as_ref().ok_or_else(|| {
            AppError::SshSession(format!("not connected to {}", self.config.target()))
        })?;

        let channel = handle.channel_open_session().await.map_err(|e| {
            error!(error = %e, host = %self.config.host, "Failed to open SSH channel");
            AppError::SshSession(format!("failed to open channel: {}", e))
        })?;

        Ok(Session { channel })
    }

    /// 断开连接并清空槽位
    pub async fn close(&self) {
        let mut slot = self.connection.lock().await;
        if let Some(handle) = slot.take() {
            if let Err(e) = handle
                .disconnect(Disconnect::ByApplication, "", "English")
                .await
            {
                debug!(error = %e, "Disconnect returned an error");
            }
            info!(host = %self.config.host, "SSH connection closed");
        }
    }

    fn load_key(&self) -> Result<KeyPair> {
        let path = &self.config.key_path;
        info!(path = %path.display(), "Loading private key");

        let passphrase = self
            .config
            .key_passphrase
            .as_ref()
            .map(|p| p.expose_secret().as_str());

        load_secret_key(path, passphrase).map_err(|e| {
            error!(error = %e, path = %path.display(), "Failed to load private key");
            AppError::SshConnection(format!(
                "failed to load private key {}: {}",
                path.display(),
                e
            ))
        })
    }

    async fn connect(&self) -> Result<Connection> {
        let key = self.load_key()?;

        let client_config = Arc::new(Config::default());
        let handler = HostKeyPolicy::from_config(&self.config);

        info!(target = %self.config.target(), "Connecting to host");

        let mut handle = timeout(
            Duration::from_secs(self.config.connect_timeout_secs),
            client::connect(client_config, (self.config.host.clone(), self.config.port), handler),
        )
        .await
        .map_err(|_| {
            AppError::SshConnection(format!("connection timed out: {}", self.config.target()))
        })?
        .map_err(|e| {
            error!(error = %e, "SSH connection failed");
            match e {
                AppError::SshConnection(msg) => AppError::SshConnection(format!(
                    "failed to connect to {}: {}",
                    self.config.target(),
                    msg
                )),
                other => other,
            }
        })?;

        let authenticated = handle
            .authenticate_publickey(self.config.username.clone(), Arc::new(key))
            .await
            .map_err(|e| {
                error!(error = %e, "SSH public key authentication error");
                AppError::SshAuthentication(e.to_string())
            })?;

        if !authenticated {
            error!(user = %self.config.username, "SSH authentication rejected");
            let _ = handle
                .disconnect(Disconnect::ByApplication, "", "English")
                .await;
            return Err(AppError::SshAuthentication(format!(
                "public key rejected for {}",
                self.config.target()
            )));
        }

        info!(target = %self.config.target(), "Connected successfully");
        Ok(handle)
    }
}

#[async_trait]
impl RemoteExecutor for SessionManager {
    async fn ensure_connected(&self) -> Result<()> {
        SessionManager::ensure_connected(self).await
    }

    async fn execute(&self, command: &RemoteCommand) -> Result<ExecutionResult> {
        let session = self.new_session().await?;
        session.run(&command.to_shell_string()).await
    }

    async fn close(&self) {
        SessionManager::close(self).await
    }
}

/// 一次性命令会话
///
/// `run` 消费会话，保证每个会话最多执行一条命令，并在所有路径上关闭通道。
pub struct Session {
    channel: Channel<client::Msg>,
}

impl Session {
    pub async fn run(mut self, command: &str) -> Result<ExecutionResult> {
        let start_time = Instant::now();
        debug!(command = %command, "SSH execute");

        if let Err(e) = self.channel.exec(true, command).await {
            error!(error = %e, "Failed to start remote command");
            let _ = self.channel.close().await;
            return Err(AppError::SshSession(format!("failed to start remote command: {}", e)));
        }

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = None;

        while let Some(msg) = self.channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => {
                    stdout.extend_from_slice(data);
                }
                ChannelMsg::ExtendedData { ref data, ext } => {
                    // SSH_EXTENDED_DATA_STDERR
                    if ext == 1 {
                        stderr.extend_from_slice(data);
                    }
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    exit_code = Some(exit_status as i32);
                }
                ChannelMsg::ExitSignal { signal_name, .. } => {
                    warn!(signal = ?signal_name, "Remote command terminated by signal");
                }
                ChannelMsg::Close => break,
                _ => {}
            }
        }

        let _ = self.channel.close().await;

        let result = ExecutionResult {
            exit_code: exit_code.unwrap_or(-1),
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
            duration_secs: start_time.elapsed().as_secs_f64(),
        };

        debug!(
            exit_code = result.exit_code,
            duration_secs = result.duration_secs,
            stdout_len = result.stdout.len(),
            stderr_len = result.stderr.len(),
            "Command executed"
        );

        Ok(result)
    }
}

const FINGERPRINT_PREFIX: &str = "SHA256:";

/// 主机公钥指纹，格式与 `ssh-keygen -lf` 相同（`SHA256:<base64>`）
fn fingerprint(key: &PublicKey) -> String {
    format!("{}{}", FINGERPRINT_PREFIX, key.fingerprint())
}

/// 比较指纹；登记值可以省略 `SHA256:` 前缀
fn same_fingerprint(known: &str, offered: &str) -> bool {
    let strip = |f: &str| f.trim().strip_prefix(FINGERPRINT_PREFIX).unwrap_or(f.trim()).to_string();
    strip(known) == strip(offered)
}

/// 主机密钥验证处理器
pub struct HostKeyPolicy {
    verification_mode: HostKeyVerification,
    expected_fingerprint: Option<String>,
    host_key: String,
}

impl HostKeyPolicy {
    fn from_config(config: &SshConfig) -> Self {
        let host_key = config.host_key();
        Self {
            verification_mode: config.host_key_verification.clone(),
            expected_fingerprint: config.known_hosts.get(&host_key).cloned(),
            host_key,
        }
    }

    /// 按策略判断是否接受给定指纹
    fn accepts(&self, fingerprint: &str) -> bool {
        match self.verification_mode {
            HostKeyVerification::Disabled => {
                warn!(
                    host = %self.host_key,
                    "Host key verification DISABLED - accepting all keys"
                );
                true
            }
            HostKeyVerification::Accept | HostKeyVerification::Strict => {
                match &self.expected_fingerprint {
                    Some(expected) if same_fingerprint(expected, fingerprint) => {
                        debug!(host = %self.host_key, "Host key verified");
                        true
                    }
                    Some(expected) => {
                        error!(
                            host = %self.host_key,
                            expected = %expected,
                            actual = %fingerprint,
                            "Host key mismatch - REJECTING CONNECTION"
                        );
                        false
                    }
                    None if self.verification_mode == HostKeyVerification::Accept => {
                        info!(
                            host = %self.host_key,
                            fingerprint = %fingerprint,
                            "Unknown host - accepting host key"
                        );
                        true
                    }
                    None => {
                        error!(
                            host = %self.host_key,
                            fingerprint = %fingerprint,
                            "Unknown host in strict mode - rejecting connection"
                        );
                        false
                    }
                }
            }
        }
    }
}

#[async_trait]
impl client::Handler for HostKeyPolicy {
    type Error = AppError;

    /// 拒绝时在错误中带上服务器提供的指纹，便于登记到 `ssh.known_hosts`
    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool> {
        let offered = fingerprint(server_public_key);
        if self.accepts(&offered) {
            return Ok(true);
        }

        Err(AppError::SshConnection(format!(
            "host key for {} rejected; server offered {}",
            self.host_key, offered
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(mode: HostKeyVerification, known: Option<&str>) -> HostKeyPolicy {
        let mut config = SshConfig::new("gz.lab".to_string(), "root".to_string())
            .with_host_key_verification(mode);
        if let Some(fingerprint) = known {
            config = config.with_known_host(fingerprint.to_string());
        }
        HostKeyPolicy::from_config(&config)
    }

    const KNOWN: &str = "SHA256:uNiVztksCsDhcc0u9e8BujQXVUpKZIDTMczCvj3tD2s";
    const OTHER: &str = "SHA256:47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU";

    #[test]
    fn test_strict_rejects_unknown_host() {
        assert!(!policy(HostKeyVerification::Strict, None).accepts(KNOWN));
    }

    #[test]
    fn test_strict_accepts_matching_fingerprint() {
        let policy = policy(HostKeyVerification::Strict, Some(KNOWN));
        assert!(policy.accepts(KNOWN));
        assert!(!policy.accepts(OTHER));
    }

    #[test]
    fn test_known_fingerprint_prefix_is_optional() {
        let bare = KNOWN.trim_start_matches("SHA256:");
        assert!(policy(HostKeyVerification::Strict, Some(bare)).accepts(KNOWN));
    }

    #[test]
    fn test_fingerprint_comparison_is_case_sensitive() {
        let lowered = KNOWN.to_lowercase();
        assert!(!policy(HostKeyVerification::Strict, Some(&lowered)).accepts(KNOWN));
    }

    #[test]
    fn test_accept_mode_trusts_unknown_but_not_mismatch() {
        assert!(policy(HostKeyVerification::Accept, None).accepts(KNOWN));
        assert!(!policy(HostKeyVerification::Accept, Some(KNOWN)).accepts(OTHER));
    }

    #[test]
    fn test_disabled_accepts_everything() {
        assert!(policy(HostKeyVerification::Disabled, Some(KNOWN)).accepts(OTHER));
    }

    #[test]
    fn test_fingerprint_matches_openssh_format() {
        let key = KeyPair::generate_ed25519().unwrap().clone_public_key().unwrap();
        let printed = fingerprint(&key);
        assert!(printed.starts_with("SHA256:"));
        // base64 无填充的 32 字节摘要
        assert_eq!(printed.len(), "SHA256:".len() + 43);
    }

    #[tokio::test]
    async fn test_rejected_host_key_reports_offered_fingerprint() {
        let key = KeyPair::generate_ed25519().unwrap().clone_public_key().unwrap();
        let mut policy = policy(HostKeyVerification::Strict, Some(KNOWN));

        let error = client::Handler::check_server_key(&mut policy, &key)
            .await
            .unwrap_err();
        match error {
            AppError::SshConnection(message) => {
                assert!(message.contains("gz.lab:22"));
                assert!(message.contains(&fingerprint(&key)));
            }
            other => panic!("expected SshConnection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_new_session_requires_connection() {
        let manager = SessionManager::new(SshConfig::new(
            "gz.lab".to_string(),
            "root".to_string(),
        ));

        let result = manager.new_session().await;
        assert!(matches!(result, Err(AppError::SshSession(_))));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_when_not_connected() {
        let manager = SessionManager::new(SshConfig::new(
            "gz.lab".to_string(),
            "root".to_string(),
        ));

        manager.close().await;
        manager.close().await;
        assert!(!manager.is_connected().await);
    }
}
