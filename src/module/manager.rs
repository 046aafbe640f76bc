//! 模块管理器
//!
//! 整合模块管理系统的所有组件，提供统一的模块管理接口：
//! 容器注册、模块发现、依赖解析、分阶段生命周期调度和模块间消息路由。

use std::collections::{HashMap, HashSet};

use tracing::{debug, error, info, instrument, warn};

use super::catalog::DiscoveryIndex;
use super::dependency::{DependencyResolver, Resolution};
use super::config_gate::ConfigGate;
use super::event::{
    ConstructionEvent, InitEvent, LoadCompleteEvent, PostInitEvent, PreInitEvent,
    ServerAboutToStartEvent, ServerStartedEvent, ServerStartingEvent, ServerStoppedEvent,
    ServerStoppingEvent, StageEvent,
};
use super::hooks::Module;
use super::host::{EventBus, EventBusKind, HostEnvironment, PacketRegistrar, PacketRegistration};
use super::lifecycle::{ModuleStage, StageContext};
use super::message::InterModMessage;
use super::metadata::{DependencyKey, ModuleContainer, ModuleDescriptor};
use super::registry::ContainerRegistry;
use crate::core::config::{CoreConfig, ModuleConfig};
use crate::utils::{CoreError, Result};

/// 模块管理器
///
/// 负责模块的整个生命周期管理，包括：
/// - 模块容器注册
/// - 模块发现和实例化
/// - 配置开关过滤和依赖解析
/// - 按加载顺序分阶段调度模块钩子
/// - 模块间消息路由
///
/// 所有修改操作都要求 `&mut self`，管理器本身即是唯一的写入者。
pub struct ModuleManager {
    /// 配置
    config: ModuleConfig,
    /// 容器注册表
    containers: ContainerRegistry,
    /// 模块开关
    gate: ConfigGate,
    /// 已加载模块，按加载顺序
    modules: Vec<Module>,
    /// 已加载模块的依赖键集合
    loaded: HashSet<DependencyKey>,
    /// 最近一次解析结果
    resolution: Option<Resolution>,
    /// 当前阶段
    stage: ModuleStage,
}

impl ModuleManager {
    /// 创建新的模块管理器
    pub fn new(config: ModuleConfig) -> Self {
        let gate = ConfigGate::new(config.store_path());
        Self {
            config,
            containers: ContainerRegistry::new(),
            gate,
            modules: Vec::new(),
            loaded: HashSet::new(),
            resolution: None,
            stage: ModuleStage::ConstructionSetup,
        }
    }

    /// 使用默认配置创建
    pub fn with_defaults() -> Self {
        Self::new(ModuleConfig::default())
    }

    /// 从内核配置创建
    pub fn from_core_config(config: &CoreConfig) -> Self {
        Self::new(config.modules.clone())
    }

    /// 注册模块容器
    ///
    /// 只能在 [`ModuleStage::ConstructionSetup`] 阶段注册，之后的注册会被忽略并记录错误日志。
    pub fn register_container(&mut self, container: ModuleContainer) -> bool {
        if self.stage != ModuleStage::ConstructionSetup {
            error!(
                container_id = %container.id,
                stage = %self.stage,
                "注册模块容器失败：模块加载已经开始"
            );
            return false;
        }
        self.containers.register(container)
    }

    /// 发现模块并计算加载顺序
    ///
    /// 依次执行：
    /// 1. 实例化并注册发现索引中的容器
    /// 2. 进入 [`ModuleStage::ModuleSetup`]，封存容器注册表
    /// 3. 发现模块：跳过宿主依赖缺失的模块，实例化其余模块
    /// 4. 按配置开关和依赖关系解析加载顺序，保存配置
    /// 5. 把每个已加载模块的事件订阅者推送到事件总线
    ///
    /// # Errors
    ///
    /// - `CoreError::InvalidStageTransition` - 已经执行过 setup
    /// - `CoreError::MissingCoreModule` - 某个容器没有核心模块
    /// - 读写模块配置文件失败
    #[instrument(skip_all)]
    pub fn setup(
        &mut self,
        index: &mut dyn DiscoveryIndex,
        host: &dyn HostEnvironment,
        bus: &mut dyn EventBus,
    ) -> Result<()> {
        if self.stage != ModuleStage::ConstructionSetup {
            return Err(CoreError::InvalidStageTransition {
                current: self.stage,
                requested: ModuleStage::ModuleSetup,
            });
        }

        for entry in index.containers() {
            match (entry.factory)() {
                Ok(container) => {
                    self.register_container(container);
                }
                Err(e) => error!(source = %entry.source, error = %e, "模块容器实例化失败"),
            }
        }

        self.stage = ModuleStage::ModuleSetup;
        self.containers.seal();
        info!(containers = self.containers.count(), "开始配置模块");

        let discovered = discover(index, host);
        debug!(count = discovered.len(), "发现模块");

        let container_ids = self.containers.ids();
        let descriptors: Vec<&ModuleDescriptor> =
            discovered.iter().map(Module::descriptor).collect();
        let gate = &mut self.gate;
        let resolution = DependencyResolver::new()
            .resolve(&container_ids, &descriptors, |d| gate.is_enabled(d))?;
        self.gate.finish()?;

        let mut by_key: HashMap<DependencyKey, Module> = discovered
            .into_iter()
            .map(|m| (m.key().clone(), m))
            .collect();
        self.modules = resolution
            .order
            .iter()
            .filter_map(|key| by_key.remove(key))
            .collect();
        self.loaded = resolution.order.iter().cloned().collect();

        for module in &self.modules {
            let ctx = StageContext::new(
                self.stage,
                self.containers.get(&module.descriptor().container_id),
                &self.loaded,
            );
            for kind in EventBusKind::ALL {
                for subscriber in module.hooks().subscribers(kind) {
                    debug!(module = %module.key(), bus = ?kind, subscriber, "注册事件订阅者");
                    bus.subscribe(&ctx, kind, module.key(), subscriber);
                }
            }
        }

        info!(
            loaded = self.modules.len(),
            disabled = resolution.disabled.len(),
            missing = resolution.missing.len(),
            cyclic = resolution.cyclic.len(),
            "模块配置完成"
        );
        self.resolution = Some(resolution);
        Ok(())
    }

    /// 构造阶段
    pub fn on_construction(&mut self, event: &ConstructionEvent) -> Result<()> {
        self.dispatch(event)
    }

    /// 预初始化阶段
    ///
    /// 先为所有模块执行网络包注册，再执行所有模块的预初始化钩子。
    #[instrument(skip_all, fields(stage = %ModuleStage::PreInit))]
    pub fn on_pre_init(
        &mut self,
        event: &PreInitEvent,
        registrar: &mut dyn PacketRegistrar,
    ) -> Result<()> {
        self.enter(ModuleStage::PreInit)?;

        let stage = self.stage;
        for module in &mut self.modules {
            let (key, descriptor, hooks) = module.split_mut();
            let Some(hook) = hooks.register_packets.as_mut() else {
                continue;
            };
            let ctx = StageContext::new(
                stage,
                self.containers.get(&descriptor.container_id),
                &self.loaded,
            );
            let mut registration = PacketRegistration::new(key, &mut *registrar);
            hook(&ctx, &mut registration).map_err(|source| CoreError::HookFailed {
                module: key.to_string(),
                stage,
                source,
            })?;
            debug!(module = %key, packets = registration.count(), "网络包注册完成");
        }

        self.run_hooks(event)
    }

    /// 初始化阶段
    pub fn on_init(&mut self, event: &InitEvent) -> Result<()> {
        self.dispatch(event)
    }

    /// 后初始化阶段
    pub fn on_post_init(&mut self, event: &PostInitEvent) -> Result<()> {
        self.dispatch(event)
    }

    /// 加载完成阶段
    pub fn on_load_complete(&mut self, event: &LoadCompleteEvent) -> Result<()> {
        self.dispatch(event)
    }

    /// 服务器即将启动
    pub fn on_server_about_to_start(&mut self, event: &ServerAboutToStartEvent) -> Result<()> {
        self.dispatch(event)
    }

    /// 服务器启动中
    pub fn on_server_starting(&mut self, event: &ServerStartingEvent) -> Result<()> {
        self.dispatch(event)
    }

    /// 服务器已启动
    pub fn on_server_started(&mut self, event: &ServerStartedEvent) -> Result<()> {
        self.dispatch(event)
    }

    /// 服务器停止中
    pub fn on_server_stopping(&mut self, event: &ServerStoppingEvent) -> Result<()> {
        self.dispatch(event)
    }

    /// 服务器已停止
    pub fn on_server_stopped(&mut self, event: &ServerStoppedEvent) -> Result<()> {
        self.dispatch(event)
    }

    /// 处理模块间消息
    ///
    /// 每条消息按加载顺序交给各模块，第一个返回 `true` 的模块即视为处理者。
    ///
    /// # Returns
    ///
    /// 被处理的消息数量
    pub fn process_messages(&mut self, messages: &[InterModMessage]) -> usize {
        let stage = self.stage;
        let mut handled = 0;

        for message in messages {
            let mut handler = None;
            for module in &mut self.modules {
                let (key, descriptor, hooks) = module.split_mut();
                let Some(hook) = hooks.process_message.as_mut() else {
                    continue;
                };
                let ctx = StageContext::new(
                    stage,
                    self.containers.get(&descriptor.container_id),
                    &self.loaded,
                );
                if hook(&ctx, message) {
                    handler = Some(key.clone());
                    break;
                }
            }

            match handler {
                Some(key) => {
                    debug!(sender = %message.sender, key = %message.key, module = %key, "消息已处理");
                    handled += 1;
                }
                None => {
                    debug!(sender = %message.sender, key = %message.key, "消息未被任何模块处理");
                }
            }
        }

        handled
    }

    /// 模块是否已加载
    pub fn is_module_enabled(&self, key: &DependencyKey) -> bool {
        self.loaded.contains(key)
    }

    /// 当前阶段
    pub fn current_stage(&self) -> ModuleStage {
        self.stage
    }

    /// 是否已越过给定阶段
    pub fn has_passed_stage(&self, stage: ModuleStage) -> bool {
        self.stage.has_passed(stage)
    }

    /// 已加载模块的依赖键，按加载顺序
    pub fn loaded_keys(&self) -> Vec<&DependencyKey> {
        self.modules.iter().map(Module::key).collect()
    }

    /// 已加载模块，按加载顺序
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// 容器注册表
    pub fn containers(&self) -> &ContainerRegistry {
        &self.containers
    }

    /// 最近一次解析结果
    pub fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    /// 获取配置
    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// 进入下一个阶段并调度对应钩子
    #[instrument(skip_all, fields(stage = %E::STAGE))]
    fn dispatch<E: StageEvent>(&mut self, event: &E) -> Result<()> {
        self.enter(E::STAGE)?;
        self.run_hooks(event)
    }

    /// 阶段只能前进
    fn enter(&mut self, next: ModuleStage) -> Result<()> {
        if !self.stage.can_advance_to(next) {
            warn!(current = %self.stage, requested = %next, "拒绝阶段回退");
            return Err(CoreError::InvalidStageTransition {
                current: self.stage,
                requested: next,
            });
        }
        debug!(from = %self.stage, to = %next, "阶段切换");
        self.stage = next;
        Ok(())
    }

    /// 按加载顺序执行当前阶段的钩子，遇到错误立即返回
    fn run_hooks<E: StageEvent>(&mut self, event: &E) -> Result<()> {
        let stage = self.stage;
        for module in &mut self.modules {
            let (key, descriptor, hooks) = module.split_mut();
            let Some(hook) = E::slot(hooks).as_mut() else {
                continue;
            };
            let ctx = StageContext::new(
                stage,
                self.containers.get(&descriptor.container_id),
                &self.loaded,
            );

            debug!(module = %key, %stage, "start");
            hook(&ctx, event).map_err(|source| CoreError::HookFailed {
                module: key.to_string(),
                stage,
                source,
            })?;
            debug!(module = %key, %stage, "complete");
        }
        Ok(())
    }
}

impl std::fmt::Debug for ModuleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleManager")
            .field("stage", &self.stage)
            .field("containers", &self.containers.ids())
            .field("loaded", &self.loaded_keys())
            .finish_non_exhaustive()
    }
}

/// 从发现索引中取出并实例化模块
///
/// 实例按 `(容器 ID, 模块 ID)` 排序。宿主依赖缺失、依赖键重复或构造失败的模块被跳过。
fn discover(index: &mut dyn DiscoveryIndex, host: &dyn HostEnvironment) -> Vec<Module> {
    let mut entries = index.modules();
    entries.sort_by(|a, b| {
        (&a.descriptor.container_id, &a.descriptor.module_id)
            .cmp(&(&b.descriptor.container_id, &b.descriptor.module_id))
    });

    let mut seen: HashSet<DependencyKey> = HashSet::new();
    let mut modules = Vec::with_capacity(entries.len());

    for entry in entries {
        let key = entry.descriptor.key();

        let absent: Vec<&str> = entry
            .descriptor
            .host_dependencies
            .iter()
            .filter(|name| !host.is_system_loaded(name))
            .map(String::as_str)
            .collect();
        if !absent.is_empty() {
            info!(module = %key, missing = ?absent, "宿主依赖缺失，跳过模块");
            continue;
        }

        if !seen.insert(key.clone()) {
            error!(module = %key, "模块重复注册，忽略后注册者");
            continue;
        }

        match (entry.factory)() {
            Ok(hooks) => modules.push(Module::new(entry.descriptor, hooks)),
            Err(e) => error!(module = %key, error = %e, "模块实例化失败"),
        }
    }

    modules
}
