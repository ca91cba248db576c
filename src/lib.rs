pub mod app;
pub mod archive;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod error_log;
pub mod format;
pub mod maps;
pub mod normalize;
pub mod output;
pub mod recording;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod scheduler;
pub mod store;
