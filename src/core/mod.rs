//! 核心模块
//!
//! 包含内核配置和配置存储。

pub mod config;
pub mod store;

pub use config::{CoreConfig, CoreConfigBuilder, LogConfig, ModuleConfig};
pub use store::{ConfigStore, Property};
