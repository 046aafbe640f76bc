//! 生命周期事件
//!
//! 宿主在每个阶段传入的事件载荷。调度器不解释载荷内容，原样转交给模块钩子。

use std::path::PathBuf;

use super::hooks::{ModuleHooks, StageHook};
use super::lifecycle::ModuleStage;

/// 运行端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    /// 客户端
    #[default]
    Client,
    /// 专用服务器
    Server,
}

/// 阶段事件
///
/// 每种事件类型唯一对应一个生命周期阶段，以及 [`ModuleHooks`] 中的一个钩子槽位。
pub trait StageEvent: Sized + 'static {
    /// 事件对应的阶段
    const STAGE: ModuleStage;

    /// 钩子槽位
    #[doc(hidden)]
    fn slot(hooks: &mut ModuleHooks) -> &mut Option<StageHook<Self>>;
}

macro_rules! stage_event {
    ($event:ty, $stage:expr, $field:ident) => {
        impl StageEvent for $event {
            const STAGE: ModuleStage = $stage;

            fn slot(hooks: &mut ModuleHooks) -> &mut Option<StageHook<Self>> {
                &mut hooks.$field
            }
        }
    };
}

/// 构造事件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructionEvent {
    /// 宿主版本
    pub host_version: String,
    /// 运行端
    pub side: Side,
}

/// 预初始化事件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreInitEvent {
    /// 宿主分配给本插件的配置目录
    pub config_dir: PathBuf,
    /// 运行端
    pub side: Side,
}

/// 初始化事件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitEvent {
    /// 运行端
    pub side: Side,
}

/// 后初始化事件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostInitEvent {
    /// 运行端
    pub side: Side,
}

/// 加载完成事件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadCompleteEvent;

/// 服务器即将启动事件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerAboutToStartEvent {
    /// 服务器名称
    pub server_name: String,
}

/// 服务器启动中事件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStartingEvent {
    /// 服务器名称
    pub server_name: String,
}

/// 服务器已启动事件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStartedEvent {
    /// 服务器名称
    pub server_name: String,
}

/// 服务器停止中事件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStoppingEvent {
    /// 服务器名称
    pub server_name: String,
}

/// 服务器已停止事件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStoppedEvent {
    /// 服务器名称
    pub server_name: String,
}

stage_event!(ConstructionEvent, ModuleStage::Construction, construction);
stage_event!(PreInitEvent, ModuleStage::PreInit, pre_init);
stage_event!(InitEvent, ModuleStage::Init, init);
stage_event!(PostInitEvent, ModuleStage::PostInit, post_init);
stage_event!(LoadCompleteEvent, ModuleStage::LoadComplete, load_complete);
stage_event!(ServerAboutToStartEvent, ModuleStage::ServerAboutToStart, server_about_to_start);
stage_event!(ServerStartingEvent, ModuleStage::ServerStarting, server_starting);
stage_event!(ServerStartedEvent, ModuleStage::ServerStarted, server_started);
stage_event!(ServerStoppingEvent, ModuleStage::ServerStopping, server_stopping);
stage_event!(ServerStoppedEvent, ModuleStage::ServerStopped, server_stopped);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_stages_follow_lifecycle_order() {
        let stages = [
            ConstructionEvent::STAGE,
            PreInitEvent::STAGE,
            InitEvent::STAGE,
            PostInitEvent::STAGE,
            LoadCompleteEvent::STAGE,
            ServerAboutToStartEvent::STAGE,
            ServerStartingEvent::STAGE,
            ServerStartedEvent::STAGE,
            ServerStoppingEvent::STAGE,
            ServerStoppedEvent::STAGE,
        ];
        assert_eq!(&stages[..], &ModuleStage::ALL[2..]);
    }
}
