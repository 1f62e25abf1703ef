//! 数据模型模块

pub mod dataset;
pub mod property;

pub use dataset::Dataset;
pub use property::PropertyAssignment;
