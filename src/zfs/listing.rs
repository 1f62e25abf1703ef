//! `zfs list -H` 输出解析
//!
//! 输出为每行一个数据集、列之间以制表符分隔。`-` 表示属性不存在。

use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::Dataset;

/// 列表中的列数：name, identifier, compression, quota
const COLUMNS: usize = 4;

/// 列表中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub name: String,
    pub identifier: Option<String>,
    pub compression: String,
    pub quota: String,
}

impl ListingRow {
    /// 转换为数据集记录；标识符必须是合法 UUID
    pub fn into_dataset(self) -> Result<Dataset> {
        let id = match self.identifier {
            Some(raw) => Some(Uuid::parse_str(&raw).map_err(|e| {
                AppError::Parse(format!(
                    "dataset '{}' has a malformed identifier '{}': {}",
                    self.name, raw, e
                ))
            })?),
            None => None,
        };

        Ok(Dataset {
            id,
            name: self.name,
            compression: self.compression,
            quota: self.quota,
        })
    }
}

fn absent_to_empty(value: &str) -> String {
    if value == "-" {
        String::new()
    } else {
        value.to_string()
    }
}

/// 解析完整列表输出
pub fn parse_listing(output: &str) -> Result<Vec<ListingRow>> {
    let mut rows = Vec::new();

    for (index, line) in output.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != COLUMNS {
            return Err(AppError::Parse(format!(
                "line {}: expected {} tab-separated columns, found {}",
                index + 1,
                COLUMNS,
                fields.len()
            )));
        }

        // 名称可以包含空格，原样保留
        let name = fields[0];
        if name.trim().is_empty() || name == "-" {
            return Err(AppError::Parse(format!("line {}: missing dataset name", index + 1)));
        }

        let identifier = match fields[1].trim() {
            "" | "-" => None,
            raw => Some(raw.to_string()),
        };

        // quota 未设置时 zfs 显示 none
        let quota = match fields[3].trim() {
            "none" => String::new(),
            raw => absent_to_empty(raw),
        };

        rows.push(ListingRow {
            name: name.to_string(),
            identifier,
            compression: absent_to_empty(fields[2].trim()),
            quota,
        });
    }

    Ok(rows)
}

/// 在列表中查找带有指定标识符的唯一数据集
pub fn find_by_identifier(rows: Vec<ListingRow>, id: &Uuid) -> Result<Dataset> {
    let mut matches = rows.into_iter().filter(|row| {
        row.identifier
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .is_some_and(|candidate| candidate == *id)
    });

    let first = matches
        .next()
        .ok_or_else(|| AppError::NotFound(format!("no dataset tagged with identifier {}", id)))?;

    if let Some(second) = matches.next() {
        return Err(AppError::Parse(format!(
            "identifier {} is shared by '{}' and '{}'",
            id, first.name, second.name
        )));
    }

    first.into_dataset()
}
