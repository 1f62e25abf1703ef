//! 数据集生命周期服务
//! create / fetch / update / delete 四个操作，每个操作执行一次远程命令

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ZfsConfig;
use crate::error::{AppError, Result};
use crate::models::{Dataset, PropertyAssignment};
use crate::ssh::{ExecutionResult, RemoteCommand, RemoteExecutor};
use crate::zfs::{find_by_identifier, parse_listing, ZfsCommands};

/// 数据集服务
pub struct DatasetService {
    executor: Arc<dyn RemoteExecutor>,
    commands: ZfsCommands,
}

impl DatasetService {
    pub fn new(executor: Arc<dyn RemoteExecutor>, config: &ZfsConfig) -> Self {
        Self {
            executor,
            commands: ZfsCommands::new(config),
        }
    }

    /// 创建数据集，返回本地生成的标识符
    ///
    /// 不返回完整记录，调用方需要再 `fetch` 一次获取远端状态。
    pub async fn create(&self, desired: &Dataset) -> Result<Uuid> {
        self.executor.ensure_connected().await?;

        if let Some(id) = desired.id {
            return Err(AppError::Validation(format!(
                "dataset '{}' already has identifier {}",
                desired.name, id
            )));
        }

        let id = Uuid::new_v4();
        let command =
            self.commands
                .create(&desired.name, &id, &desired.compression, &desired.quota)?;

        let result = self.run(&command).await?;
        if result.is_failure() {
            return Err(command_failed(&command, &result));
        }

        info!(name = %desired.name, id = %id, "Dataset created");
        Ok(id)
    }

    /// 按标识符读取数据集
    ///
    /// `NotFound` 表示列表完整但无匹配；其他错误只能说明无法确认存在性。
    pub async fn fetch(&self, id: &Uuid) -> Result<Dataset> {
        self.executor.ensure_connected().await?;

        let command = self.commands.list();
        let result = self.run(&command).await?;
        if result.is_failure() {
            return Err(command_failed(&command, &result));
        }

        let rows = parse_listing(&result.stdout).map_err(|e| {
            error!(error = %e, "Failed to parse dataset listing");
            e
        })?;
        debug!(rows = rows.len(), id = %id, "Dataset listing parsed");

        find_by_identifier(rows, id)
    }

    /// 设置属性
    ///
    /// `changes` 由调用方计算，这里不做新旧比较；空列表是调用方错误。
    pub async fn update(&self, target: &Dataset, changes: &[PropertyAssignment]) -> Result<()> {
        self.executor.ensure_connected().await?;

        let command = self.commands.set(&target.name, changes)?;
        let result = self.run(&command).await?;
        if result.is_failure() || result.has_stderr() {
            return Err(command_failed(&command, &result));
        }

        info!(name = %target.name, changes = changes.len(), "Dataset updated");
        Ok(())
    }

    /// 按名称销毁数据集
    ///
    /// 与 `fetch` 不同，这里以名称为键；名称应来自之前的 `fetch` 结果。
    /// 退出码为 0 但 stderr 收到任何输出（包括只有空白）时同样视为失败。
    pub async fn delete(&self, name: &str) -> Result<()> {
        self.executor.ensure_connected().await?;

        let command = self.commands.destroy(name)?;
        let result = self.run(&command).await?;
        if result.is_failure() {
            return Err(command_failed(&command, &result));
        }
        if result.has_stderr() {
            warn!(name = %name, stderr = %result.stderr_trimmed(), "Unrecognized response from zfs destroy");
            return Err(command_failed(&command, &result));
        }

        info!(name = %name, "Dataset destroyed");
        Ok(())
    }

    /// 关闭底层连接
    pub async fn close(&self) {
        self.executor.close().await;
    }

    async fn run(&self, command: &RemoteCommand) -> Result<ExecutionResult> {
        debug!(command = %command, "Running zfs command");
        self.executor.execute(command).await
    }
}

fn command_failed(command: &RemoteCommand, result: &ExecutionResult) -> AppError {
    error!(
        command = %command,
        exit_code = result.exit_code,
        stderr = %result.stderr_trimmed(),
        "Remote command failed"
    );
    AppError::CommandFailed {
        command: command.to_string(),
        exit_code: result.exit_code,
        stderr: result.stderr_trimmed().to_string(),
    }
}
