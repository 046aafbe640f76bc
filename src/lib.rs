//! # modloader-core - 模块加载内核
//!
//! 模块加载内核负责把一个插件拆分成可独立开关的功能模块，提供以下核心功能：
//!
//! - **模块发现**: 通过显式注册的模块目录发现模块容器和模块
//! - **模块开关**: 每个模块在配置文件中有一个持久化的启用标记
//! - **依赖解析**: 剔除依赖缺失的模块，按依赖关系计算加载顺序，核心模块总是最先加载
//! - **生命周期调度**: 按固定的阶段顺序把宿主通知转交给每个已加载模块
//! - **消息路由**: 模块间消息交给第一个愿意处理的模块
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use modloader_core::module::{
//!     InitEvent, LoadedSystems, ModuleCatalog, ModuleContainer, ModuleDescriptor,
//!     ModuleHooks, ModuleManager, NoopEventBus,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut catalog = ModuleCatalog::new();
//!     catalog.register_container(ModuleContainer::new("example"));
//!     catalog.register_module(
//!         ModuleDescriptor::core("example", "core"),
//!         ModuleHooks::new().on_init(|ctx, _| {
//!             tracing::info!(stage = %ctx.stage(), "核心模块初始化");
//!             Ok(())
//!         }),
//!     )?;
//!
//!     let mut manager = ModuleManager::with_defaults();
//!     manager.setup(&mut catalog, &LoadedSystems::new(), &mut NoopEventBus)?;
//!     manager.on_init(&InitEvent::default())?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## 模块结构
//!
//! - `module` - 模块发现、依赖解析和生命周期调度
//! - `core` - 内核配置和模块开关配置存储
//! - `utils` - 错误类型和日志系统

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod core;
pub mod module;
pub mod utils;

// 重导出常用类型，方便使用
pub use module::{
    DependencyKey, DiscoveryIndex, InterModMessage, Module, ModuleCatalog, ModuleContainer,
    ModuleDescriptor, ModuleHooks, ModuleManager, ModuleStage, StageContext,
};

pub use utils::{error_code, CoreError, Result};
pub use utils::logger::{LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy};

pub use core::config::{CoreConfig, CoreConfigBuilder, LogConfig, ModuleConfig};
pub use core::store::ConfigStore;

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
