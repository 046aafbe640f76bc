//! 模块能力集
//!
//! 模块的每个生命周期钩子都是可选的：未提供的钩子在结构上就是 `None`，
//! 调度器直接跳过。

use std::collections::HashMap;
use std::fmt;

use super::event::{
    ConstructionEvent, InitEvent, LoadCompleteEvent, PostInitEvent, PreInitEvent,
    ServerAboutToStartEvent, ServerStartedEvent, ServerStartingEvent, ServerStoppedEvent,
    ServerStoppingEvent, StageEvent,
};
use super::host::{EventBusKind, PacketRegistration};
use super::lifecycle::StageContext;
use super::message::InterModMessage;
use super::metadata::{DependencyKey, ModuleDescriptor};

/// 阶段钩子
pub type StageHook<E> = Box<dyn FnMut(&StageContext<'_>, &E) -> anyhow::Result<()> + Send>;

/// 网络包注册钩子
pub type PacketHook =
    Box<dyn FnMut(&StageContext<'_>, &mut PacketRegistration<'_>) -> anyhow::Result<()> + Send>;

/// 消息处理钩子，返回 `true` 表示消息已被处理
pub type MessageHook = Box<dyn FnMut(&StageContext<'_>, &InterModMessage) -> bool + Send>;

/// 模块能力集
#[derive(Default)]
pub struct ModuleHooks {
    pub(crate) construction: Option<StageHook<ConstructionEvent>>,
    pub(crate) pre_init: Option<StageHook<PreInitEvent>>,
    pub(crate) init: Option<StageHook<InitEvent>>,
    pub(crate) post_init: Option<StageHook<PostInitEvent>>,
    pub(crate) load_complete: Option<StageHook<LoadCompleteEvent>>,
    pub(crate) server_about_to_start: Option<StageHook<ServerAboutToStartEvent>>,
    pub(crate) server_starting: Option<StageHook<ServerStartingEvent>>,
    pub(crate) server_started: Option<StageHook<ServerStartedEvent>>,
    pub(crate) server_stopping: Option<StageHook<ServerStoppingEvent>>,
    pub(crate) server_stopped: Option<StageHook<ServerStoppedEvent>>,
    pub(crate) register_packets: Option<PacketHook>,
    pub(crate) process_message: Option<MessageHook>,
    pub(crate) subscribers: HashMap<EventBusKind, Vec<String>>,
}

impl ModuleHooks {
    /// 创建空能力集
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置任意阶段的钩子
    pub fn on<E, F>(mut self, hook: F) -> Self
    where
        E: StageEvent,
        F: FnMut(&StageContext<'_>, &E) -> anyhow::Result<()> + Send + 'static,
    {
        *E::slot(&mut self) = Some(Box::new(hook));
        self
    }

    /// 设置构造阶段钩子
    pub fn on_construction<F>(self, hook: F) -> Self
    where
        F: FnMut(&StageContext<'_>, &ConstructionEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.on::<ConstructionEvent, _>(hook)
    }

    /// 设置预初始化钩子
    pub fn on_pre_init<F>(self, hook: F) -> Self
    where
        F: FnMut(&StageContext<'_>, &PreInitEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.on::<PreInitEvent, _>(hook)
    }

    /// 设置初始化钩子
    pub fn on_init<F>(self, hook: F) -> Self
    where
        F: FnMut(&StageContext<'_>, &InitEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.on::<InitEvent, _>(hook)
    }

    /// 设置后初始化钩子
    pub fn on_post_init<F>(self, hook: F) -> Self
    where
        F: FnMut(&StageContext<'_>, &PostInitEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.on::<PostInitEvent, _>(hook)
    }

    /// 设置加载完成钩子
    pub fn on_load_complete<F>(self, hook: F) -> Self
    where
        F: FnMut(&StageContext<'_>, &LoadCompleteEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.on::<LoadCompleteEvent, _>(hook)
    }

    /// 设置服务器即将启动钩子
    pub fn on_server_about_to_start<F>(self, hook: F) -> Self
    where
        F: FnMut(&StageContext<'_>, &ServerAboutToStartEvent) -> anyhow::Result<()>
            + Send
            + 'static,
    {
        self.on::<ServerAboutToStartEvent, _>(hook)
    }

    /// 设置服务器启动中钩子
    pub fn on_server_starting<F>(self, hook: F) -> Self
    where
        F: FnMut(&StageContext<'_>, &ServerStartingEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.on::<ServerStartingEvent, _>(hook)
    }

    /// 设置服务器已启动钩子
    pub fn on_server_started<F>(self, hook: F) -> Self
    where
        F: FnMut(&StageContext<'_>, &ServerStartedEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.on::<ServerStartedEvent, _>(hook)
    }

    /// 设置服务器停止中钩子
    pub fn on_server_stopping<F>(self, hook: F) -> Self
    where
        F: FnMut(&StageContext<'_>, &ServerStoppingEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.on::<ServerStoppingEvent, _>(hook)
    }

    /// 设置服务器已停止钩子
    pub fn on_server_stopped<F>(self, hook: F) -> Self
    where
        F: FnMut(&StageContext<'_>, &ServerStoppedEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.on::<ServerStoppedEvent, _>(hook)
    }

    /// 设置网络包注册钩子
    pub fn on_register_packets<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&StageContext<'_>, &mut PacketRegistration<'_>) -> anyhow::Result<()>
            + Send
            + 'static,
    {
        self.register_packets = Some(Box::new(hook));
        self
    }

    /// 设置消息处理钩子
    pub fn on_message<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&StageContext<'_>, &InterModMessage) -> bool + Send + 'static,
    {
        self.process_message = Some(Box::new(hook));
        self
    }

    /// 声明事件总线订阅者
    pub fn subscribe(mut self, bus: EventBusKind, subscriber: impl Into<String>) -> Self {
        self.subscribers
            .entry(bus)
            .or_default()
            .push(subscriber.into());
        self
    }

    /// 指定总线上的订阅者
    pub fn subscribers(&self, bus: EventBusKind) -> &[String] {
        self.subscribers
            .get(&bus)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl fmt::Debug for ModuleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHooks")
            .field("construction", &self.construction.is_some())
            .field("pre_init", &self.pre_init.is_some())
            .field("init", &self.init.is_some())
            .field("post_init", &self.post_init.is_some())
            .field("load_complete", &self.load_complete.is_some())
            .field("register_packets", &self.register_packets.is_some())
            .field("process_message", &self.process_message.is_some())
            .field("subscribers", &self.subscribers)
            .finish_non_exhaustive()
    }
}

/// 已实例化的模块
///
/// 静态描述加上能力集，在发现阶段创建一次，与管理器同生命周期。
#[derive(Debug)]
pub struct Module {
    descriptor: ModuleDescriptor,
    key: DependencyKey,
    pub(crate) hooks: ModuleHooks,
}

impl Module {
    /// 创建模块
    pub fn new(descriptor: ModuleDescriptor, hooks: ModuleHooks) -> Self {
        let key = descriptor.key();
        Self {
            descriptor,
            key,
            hooks,
        }
    }

    /// 模块描述
    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    /// 依赖键
    pub fn key(&self) -> &DependencyKey {
        &self.key
    }

    /// 所属容器 ID
    pub fn container_id(&self) -> &str {
        &self.descriptor.container_id
    }

    /// 能力集
    pub fn hooks(&self) -> &ModuleHooks {
        &self.hooks
    }

    /// 同时借出依赖键、描述和可变能力集
    pub(crate) fn split_mut(&mut self) -> (&DependencyKey, &ModuleDescriptor, &mut ModuleHooks) {
        (&self.key, &self.descriptor, &mut self.hooks)
    }
}
