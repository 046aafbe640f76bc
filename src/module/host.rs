//! 宿主协作接口
//!
//! 模块管理器与宿主之间的边界：宿主系统探测、事件总线订阅和网络包注册。
//! 具体实现由宿主提供，内核只通过这些 trait 调用。

use std::collections::HashSet;

use tracing::debug;

use super::lifecycle::StageContext;
use super::metadata::DependencyKey;

/// 宿主环境
///
/// 用于判断模块声明的宿主系统依赖是否存在。
pub trait HostEnvironment {
    /// 指定宿主系统是否已加载
    fn is_system_loaded(&self, name: &str) -> bool;
}

/// 已加载宿主系统集合
#[derive(Debug, Clone, Default)]
pub struct LoadedSystems {
    systems: HashSet<String>,
}

impl LoadedSystems {
    /// 创建空集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个宿主系统
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.systems.insert(name.into());
        self
    }
}

impl<S: Into<String>> FromIterator<S> for LoadedSystems {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            systems: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl HostEnvironment for LoadedSystems {
    fn is_system_loaded(&self, name: &str) -> bool {
        self.systems.contains(name)
    }
}

/// 事件总线种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventBusKind {
    /// 主事件总线
    Main,
    /// 地形生成总线
    TerrainGen,
    /// 矿物生成总线
    OreGen,
}

impl EventBusKind {
    /// 全部总线
    pub const ALL: [EventBusKind; 3] = [
        EventBusKind::Main,
        EventBusKind::TerrainGen,
        EventBusKind::OreGen,
    ];
}

/// 宿主事件总线
///
/// 模块在 setup 阶段声明的订阅者由管理器推送到这里。
pub trait EventBus {
    /// 订阅一个事件处理者
    ///
    /// `ctx` 指向订阅者所属模块的容器，阶段为模块配置阶段。
    fn subscribe(
        &mut self,
        ctx: &StageContext<'_>,
        bus: EventBusKind,
        owner: &DependencyKey,
        subscriber: &str,
    );
}

/// 不做任何事的事件总线
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventBus;

impl EventBus for NoopEventBus {
    fn subscribe(
        &mut self,
        _ctx: &StageContext<'_>,
        _bus: EventBusKind,
        _owner: &DependencyKey,
        _subscriber: &str,
    ) {
    }
}

/// 网络包方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketDirection {
    /// 客户端发往服务器，由服务器执行
    ServerBound,
    /// 服务器发往客户端，由客户端执行
    ClientBound,
}

/// 网络包注册器
pub trait PacketRegistrar {
    /// 注册一个网络包类型
    fn register_packet(&mut self, owner: &DependencyKey, packet: &str, direction: PacketDirection);
}

/// 不做任何事的网络包注册器
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPacketRegistrar;

impl PacketRegistrar for NoopPacketRegistrar {
    fn register_packet(&mut self, _owner: &DependencyKey, _packet: &str, _direction: PacketDirection) {}
}

/// 单个模块的网络包注册句柄
///
/// 只在预初始化阶段的注册轮次中存在，因此注册窗口关闭后无法再注册网络包。
pub struct PacketRegistration<'a> {
    owner: &'a DependencyKey,
    registrar: &'a mut dyn PacketRegistrar,
    count: usize,
}

impl<'a> PacketRegistration<'a> {
    pub(crate) fn new(owner: &'a DependencyKey, registrar: &'a mut dyn PacketRegistrar) -> Self {
        Self {
            owner,
            registrar,
            count: 0,
        }
    }

    /// 注册一个网络包
    pub fn register(&mut self, packet: &str, direction: PacketDirection) -> &mut Self {
        debug!(module = %self.owner, packet, ?direction, "注册网络包");
        self.registrar.register_packet(self.owner, packet, direction);
        self.count += 1;
        self
    }

    /// 已注册的网络包数量
    pub fn count(&self) -> usize {
        self.count
    }
}
