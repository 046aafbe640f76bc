//! 生命周期阶段
//!
//! 定义模块生命周期的阶段序列，以及调度期间传给每个钩子的上下文。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::metadata::{DependencyKey, ModuleContainer};

/// 模块生命周期阶段
///
/// 全序枚举，当前阶段只会前进、不会回退。
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStage {
    /// 容器注册阶段（初始状态）
    #[default]
    ConstructionSetup,
    /// 模块发现与配置阶段
    ModuleSetup,
    /// 构造
    Construction,
    /// 预初始化
    PreInit,
    /// 初始化
    Init,
    /// 后初始化
    PostInit,
    /// 加载完成
    LoadComplete,
    /// 服务器即将启动
    ServerAboutToStart,
    /// 服务器启动中
    ServerStarting,
    /// 服务器已启动
    ServerStarted,
    /// 服务器停止中
    ServerStopping,
    /// 服务器已停止（终止状态）
    ServerStopped,
}

impl ModuleStage {
    /// 全部阶段，按顺序排列
    pub const ALL: [ModuleStage; 12] = [
        ModuleStage::ConstructionSetup,
        ModuleStage::ModuleSetup,
        ModuleStage::Construction,
        ModuleStage::PreInit,
        ModuleStage::Init,
        ModuleStage::PostInit,
        ModuleStage::LoadComplete,
        ModuleStage::ServerAboutToStart,
        ModuleStage::ServerStarting,
        ModuleStage::ServerStarted,
        ModuleStage::ServerStopping,
        ModuleStage::ServerStopped,
    ];

    /// 阶段名称
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStage::ConstructionSetup => "construction_setup",
            ModuleStage::ModuleSetup => "module_setup",
            ModuleStage::Construction => "construction",
            ModuleStage::PreInit => "pre_init",
            ModuleStage::Init => "init",
            ModuleStage::PostInit => "post_init",
            ModuleStage::LoadComplete => "load_complete",
            ModuleStage::ServerAboutToStart => "server_about_to_start",
            ModuleStage::ServerStarting => "server_starting",
            ModuleStage::ServerStarted => "server_started",
            ModuleStage::ServerStopping => "server_stopping",
            ModuleStage::ServerStopped => "server_stopped",
        }
    }

    /// 是否已越过给定阶段（严格大于）
    pub fn has_passed(&self, stage: ModuleStage) -> bool {
        *self > stage
    }

    /// 是否可以切换到目标阶段
    pub fn can_advance_to(&self, next: ModuleStage) -> bool {
        next > *self
    }

    /// 是否为终止阶段
    pub fn is_terminal(&self) -> bool {
        *self == ModuleStage::ServerStopped
    }
}

impl fmt::Display for ModuleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 调度上下文
///
/// 每次调用模块钩子时构造，携带当前阶段、当前模块所属容器以及已加载模块集合。
/// 上下文只在一次钩子调用期间有效。
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    stage: ModuleStage,
    container: Option<&'a ModuleContainer>,
    loaded: &'a HashSet<DependencyKey>,
}

impl<'a> StageContext<'a> {
    pub(crate) fn new(
        stage: ModuleStage,
        container: Option<&'a ModuleContainer>,
        loaded: &'a HashSet<DependencyKey>,
    ) -> Self {
        Self {
            stage,
            container,
            loaded,
        }
    }

    /// 当前阶段
    pub fn stage(&self) -> ModuleStage {
        self.stage
    }

    /// 当前正在调度的模块所属容器
    pub fn container(&self) -> Option<&'a ModuleContainer> {
        self.container
    }

    /// 模块是否已加载
    pub fn is_module_enabled(&self, key: &DependencyKey) -> bool {
        self.loaded.contains(key)
    }

    /// 是否已越过给定阶段
    pub fn has_passed_stage(&self, stage: ModuleStage) -> bool {
        self.stage.has_passed(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        for pair in ModuleStage::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[1].has_passed(pair[0]));
            assert!(!pair[0].has_passed(pair[1]));
        }
    }

    #[test]
    fn test_stage_has_passed_is_strict() {
        assert!(!ModuleStage::Init.has_passed(ModuleStage::Init));
        assert!(ModuleStage::Init.has_passed(ModuleStage::PreInit));
    }

    #[test]
    fn test_stage_transitions() {
        assert!(ModuleStage::ConstructionSetup.can_advance_to(ModuleStage::ModuleSetup));
        assert!(ModuleStage::PreInit.can_advance_to(ModuleStage::LoadComplete));
        assert!(!ModuleStage::Init.can_advance_to(ModuleStage::Init));
        assert!(!ModuleStage::Init.can_advance_to(ModuleStage::PreInit));
        assert!(ModuleStage::ServerStopped.is_terminal());
        assert_eq!(ModuleStage::default(), ModuleStage::ConstructionSetup);
    }

    #[test]
    fn test_stage_context_queries() {
        let container = ModuleContainer::new("example");
        let mut loaded = HashSet::new();
        loaded.insert(DependencyKey::new("example", "core"));

        let ctx = StageContext::new(ModuleStage::Init, Some(&container), &loaded);
        assert_eq!(ctx.stage(), ModuleStage::Init);
        assert_eq!(ctx.container().map(|c| c.id.as_str()), Some("example"));
        assert!(ctx.is_module_enabled(&DependencyKey::new("example", "core")));
        assert!(!ctx.is_module_enabled(&DependencyKey::new("example", "other")));
        assert!(ctx.has_passed_stage(ModuleStage::PreInit));
    }
}
