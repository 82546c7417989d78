pub mod config;
pub mod logging;

pub mod app;
pub mod collector;
pub mod error;
pub mod record;
pub mod retry;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod url_model;

pub use error::{MetadataError, MetadataResult};

#[cfg(test)]
mod test_support;
