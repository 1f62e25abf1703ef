//! SSH 远程执行模块
//! 连接管理、命令会话和命令参数引用

pub mod command;
pub mod config;
pub mod execution;
pub mod executor;

pub use command::{shell_quote, RemoteCommand};
pub use config::{HostKeyVerification, SshConfig};
pub use execution::ExecutionResult;
pub use executor::{RemoteExecutor, Session, SessionManager};
