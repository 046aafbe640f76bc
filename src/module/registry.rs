//! 模块容器注册表
//!
//! 管理所有已注册的模块容器，按容器 ID 排序迭代。

use std::collections::BTreeMap;

use tracing::{error, warn};

use crate::module::metadata::ModuleContainer;

/// 模块容器注册表
///
/// 管理所有已注册的模块容器，包括：
/// - 容器注册（封存后拒绝）
/// - 按 ID 查询
/// - 按 ID 有序迭代
#[derive(Debug, Default)]
pub struct ContainerRegistry {
    /// 已注册的容器：container_id -> ModuleContainer
    containers: BTreeMap<String, ModuleContainer>,

    /// 模块加载开始后封存，不再接受注册
    sealed: bool,
}

impl ContainerRegistry {
    /// 创建新的容器注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册容器
    ///
    /// # Returns
    ///
    /// 是否注册成功。封存后或容器 ID 为空时拒绝注册，只记录错误日志。
    ///
    /// # Notes
    ///
    /// 同一 ID 重复注册时，后注册者覆盖先注册者。
    pub fn register(&mut self, container: ModuleContainer) -> bool {
        if self.sealed {
            error!(
                container_id = %container.id,
                "注册模块容器失败：模块加载已经开始"
            );
            return false;
        }

        if container.id.trim().is_empty() {
            error!("注册模块容器失败：容器 ID 为空");
            return false;
        }

        if let Some(previous) = self.containers.insert(container.id.clone(), container) {
            warn!(container_id = %previous.id, "模块容器 ID 重复，覆盖先前的注册");
        }
        true
    }

    /// 封存注册表
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// 是否已封存
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// 获取容器
    pub fn get(&self, container_id: &str) -> Option<&ModuleContainer> {
        self.containers.get(container_id)
    }

    /// 检查容器是否存在
    pub fn contains(&self, container_id: &str) -> bool {
        self.containers.contains_key(container_id)
    }

    /// 按 ID 顺序迭代容器
    pub fn iter(&self) -> impl Iterator<Item = &ModuleContainer> {
        self.containers.values()
    }

    /// 按 ID 顺序返回容器 ID
    pub fn ids(&self) -> Vec<String> {
        self.containers.keys().cloned().collect()
    }

    /// 容器数量
    pub fn count(&self) -> usize {
        self.containers.len()
    }

    /// 注册表是否为空
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}
