//! zfs(8) 命令构造
//!
//! 所有命令都以参数数组构造，调用方提供的名称和属性值先经过校验。

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::config::ZfsConfig;
use crate::error::{AppError, Result};
use crate::models::PropertyAssignment;
use crate::ssh::RemoteCommand;

/// ZFS 数据集名称最大长度
const MAX_DATASET_NAME_LEN: usize = 255;

const PFEXEC: &str = "pfexec";

/// 数据集名称中每一段允许的字符（zfs 允许空格）
static NAME_COMPONENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.: \-]+$").expect("valid dataset name pattern"));

/// 属性名：原生属性（小写）或带冒号的用户属性
static PROPERTY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_.:\-]*$").expect("valid property name pattern"));

/// 校验数据集名称（`pool/fs/child`）
pub fn validate_dataset_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AppError::validation("dataset name must not be empty"));
    }
    if name.len() > MAX_DATASET_NAME_LEN {
        return Err(AppError::Validation(format!(
            "dataset name exceeds {} characters",
            MAX_DATASET_NAME_LEN
        )));
    }
    if name.starts_with('-') {
        return Err(AppError::Validation(format!(
            "dataset name '{}' must not start with '-'",
            name
        )));
    }

    for component in name.split('/') {
        if component.is_empty() || component == "." || component == ".." {
            return Err(AppError::Validation(format!(
                "dataset name '{}' has an empty or relative component",
                name
            )));
        }
        if !NAME_COMPONENT.is_match(component) {
            return Err(AppError::Validation(format!(
                "dataset name '{}' contains unsupported characters",
                name
            )));
        }
    }

    Ok(())
}

/// 校验属性名
pub fn validate_property_name(key: &str) -> Result<()> {
    if PROPERTY_NAME.is_match(key) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("invalid property name '{}'", key)))
    }
}

/// 校验属性值：非空且不含控制字符（制表符和换行会破坏列表输出）
pub fn validate_property_value(key: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(AppError::Validation(format!("property '{}' has an empty value", key)));
    }
    if value.chars().any(char::is_control) {
        return Err(AppError::Validation(format!(
            "property '{}' value contains control characters",
            key
        )));
    }
    Ok(())
}

fn validate_assignment(assignment: &PropertyAssignment) -> Result<()> {
    validate_property_name(&assignment.key)?;
    validate_property_value(&assignment.key, &assignment.value)
}

/// zfs 命令构造器
#[derive(Debug, Clone)]
pub struct ZfsCommands {
    binary: String,
    identifier_property: String,
    use_pfexec: bool,
}

impl ZfsCommands {
    pub fn new(config: &ZfsConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            identifier_property: config.identifier_property.clone(),
            use_pfexec: config.use_pfexec,
        }
    }

    fn base(&self) -> RemoteCommand {
        if self.use_pfexec {
            RemoteCommand::new(PFEXEC).arg(&self.binary)
        } else {
            RemoteCommand::new(&self.binary)
        }
    }

    /// `zfs create -o <idprop>=<uuid> [-o compression=..] [-o quota=..] <name>`
    pub fn create(
        &self,
        name: &str,
        id: &Uuid,
        compression: &str,
        quota: &str,
    ) -> Result<RemoteCommand> {
        validate_dataset_name(name)?;

        let mut properties = vec![PropertyAssignment::new(
            &self.identifier_property,
            id.to_string(),
        )];
        if !compression.is_empty() {
            properties.push(PropertyAssignment::new("compression", compression));
        }
        if !quota.is_empty() {
            properties.push(PropertyAssignment::new("quota", quota));
        }

        let mut command = self.base().arg("create");
        for property in &properties {
            validate_assignment(property)?;
            command = command.arg("-o").arg(property.to_arg());
        }

        Ok(command.arg(name))
    }

    /// `zfs list -H -o name,<idprop>,compression,quota`
    pub fn list(&self) -> RemoteCommand {
        self.base().args([
            "list".to_string(),
            "-H".to_string(),
            "-o".to_string(),
            format!("name,{},compression,quota", self.identifier_property),
        ])
    }

    /// `zfs set <k1>=<v1> <k2>=<v2> ... <name>`
    pub fn set(&self, name: &str, changes: &[PropertyAssignment]) -> Result<RemoteCommand> {
        validate_dataset_name(name)?;
        if changes.is_empty() {
            return Err(AppError::validation("no property changes to apply"));
        }

        let mut command = self.base().arg("set");
        for change in changes {
            validate_assignment(change)?;
            command = command.arg(change.to_arg());
        }

        Ok(command.arg(name))
    }

    /// `zfs destroy <name>`
    pub fn destroy(&self, name: &str) -> Result<RemoteCommand> {
        validate_dataset_name(name)?;
        Ok(self.base().arg("destroy").arg(name))
    }
}
