//! 模块管理模块
//!
//! 包含模块管理系统的核心组件：
//! - 模块元数据与依赖键
//! - 模块目录（发现索引）和容器注册表
//! - 模块开关
//! - 依赖图与依赖解析
//! - 生命周期阶段、事件与模块能力集
//! - 模块管理器

pub mod catalog;
pub mod config_gate;
pub mod dependency;
pub mod event;
pub mod hooks;
pub mod host;
pub mod lifecycle;
pub mod manager;
pub mod message;
pub mod metadata;
pub mod registry;

// 重导出常用类型
pub use catalog::{ContainerEntry, DiscoveryIndex, ModuleCatalog, ModuleEntry};
pub use config_gate::{render_comment, ConfigGate, MODULE_SECTION};
pub use dependency::{DependencyGraph, DependencyResolver, Resolution, TopologicalOrder};
pub use event::{
    ConstructionEvent, InitEvent, LoadCompleteEvent, PostInitEvent, PreInitEvent,
    ServerAboutToStartEvent, ServerStartedEvent, ServerStartingEvent, ServerStoppedEvent,
    ServerStoppingEvent, Side, StageEvent,
};
pub use hooks::{MessageHook, Module, ModuleHooks, PacketHook, StageHook};
pub use host::{
    EventBus, EventBusKind, HostEnvironment, LoadedSystems, NoopEventBus, NoopPacketRegistrar,
    PacketDirection, PacketRegistrar, PacketRegistration,
};
pub use lifecycle::{ModuleStage, StageContext};
pub use manager::ModuleManager;
pub use message::InterModMessage;
pub use metadata::{DependencyKey, ModuleContainer, ModuleDescriptor};
pub use registry::ContainerRegistry;
