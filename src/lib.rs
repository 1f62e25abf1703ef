//! illumos 远程 ZFS 数据集管理库
//! 通过 SSH 在 illumos 主机上创建、读取、更新和销毁数据集

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod ssh;
pub mod telemetry;
pub mod zfs;

pub use error::{AppError, Result};
pub use models::{Dataset, PropertyAssignment};
pub use services::{DatasetResource, DatasetService};
pub use ssh::{RemoteExecutor, SessionManager};
