//! 声明式数据集资源
//!
//! 在四个生命周期操作之上做一次"期望状态 → 远端状态"的对齐：
//! 创建后回读、只对变化的属性发起 update、删除按状态里的名称进行。

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Dataset, PropertyAssignment};
use crate::services::DatasetService;

/// 数据集资源
pub struct DatasetResource {
    service: Arc<DatasetService>,
}

impl DatasetResource {
    pub fn new(service: Arc<DatasetService>) -> Self {
        Self { service }
    }

    /// 创建并回读远端状态
    pub async fn create(&self, desired: &Dataset) -> Result<Dataset> {
        let id = self.service.create(desired).await?;
        self.service.fetch(&id).await
    }

    pub async fn read(&self, id: &Uuid) -> Result<Dataset> {
        self.service.fetch(id).await
    }

    /// 把 `current` 调整为 `desired`，返回调整后的远端状态
    ///
    /// 名称不可变；没有属性变化时不发起 `zfs set`。
    pub async fn update(&self, id: &Uuid, current: &Dataset, desired: &Dataset) -> Result<Dataset> {
        if desired.name != current.name {
            return Err(AppError::Validation(format!(
                "renaming '{}' to '{}' requires replacing the dataset",
                current.name, desired.name
            )));
        }

        let changes = diff_properties(current, desired)?;
        if changes.is_empty() {
            debug!(id = %id, "No property changes");
        } else {
            let target = Dataset {
                id: Some(*id),
                ..Dataset::new(current.name.clone())
            };
            self.service.update(&target, &changes).await?;
            info!(id = %id, name = %current.name, "Dataset reconciled");
        }

        self.service.fetch(id).await
    }

    /// 按状态中的名称删除
    pub async fn delete(&self, state: &Dataset) -> Result<()> {
        info!(id = ?state.id, name = %state.name, "Request to delete dataset");
        self.service.delete(&state.name).await
    }
}

/// 比较可变属性，按 compression、quota 的顺序生成赋值
///
/// 清空一个已设置的属性需要 `zfs inherit`，这里不支持，返回校验错误。
pub fn diff_properties(current: &Dataset, desired: &Dataset) -> Result<Vec<PropertyAssignment>> {
    let mut changes = Vec::new();

    for (key, old, new) in [
        ("compression", &current.compression, &desired.compression),
        ("quota", &current.quota, &desired.quota),
    ] {
        if old == new {
            continue;
        }
        if new.is_empty() {
            return Err(AppError::Validation(format!(
                "clearing '{}' (currently '{}') is not supported",
                key, old
            )));
        }
        changes.push(PropertyAssignment::new(key, new.as_str()));
    }

    Ok(changes)
}
