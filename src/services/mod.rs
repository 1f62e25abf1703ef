//! Business logic services layer

pub mod dataset_service;
pub mod resource;

pub use dataset_service::DatasetService;
pub use resource::{diff_properties, DatasetResource};
