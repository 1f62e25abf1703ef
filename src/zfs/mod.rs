//! zfs(8) 命令面：命令构造与输出解析

pub mod command;
pub mod listing;

pub use command::{validate_dataset_name, ZfsCommands};
pub use listing::{find_by_identifier, parse_listing, ListingRow};
