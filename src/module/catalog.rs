//! 模块目录
//!
//! 模块和容器的显式注册入口。宿主在启动时把每个容器、每个模块的静态描述
//! 和构造函数登记到目录中，管理器在 setup 时分两次读取：先读容器，再读模块。

use std::collections::HashSet;
use std::fmt;

use crate::module::hooks::ModuleHooks;
use crate::module::metadata::{DependencyKey, ModuleContainer, ModuleDescriptor};
use crate::utils::{CoreError, Result};

/// 容器构造函数
pub type ContainerFactory = Box<dyn FnOnce() -> anyhow::Result<ModuleContainer> + Send>;

/// 模块构造函数
pub type ModuleFactory = Box<dyn FnOnce() -> anyhow::Result<ModuleHooks> + Send>;

/// 待实例化的容器
pub struct ContainerEntry {
    /// 来源名称，仅用于日志
    pub source: String,
    /// 构造函数
    pub factory: ContainerFactory,
}

impl fmt::Debug for ContainerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerEntry")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// 待实例化的模块
pub struct ModuleEntry {
    /// 静态描述
    pub descriptor: ModuleDescriptor,
    /// 构造函数
    pub factory: ModuleFactory,
}

impl fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// 发现索引
///
/// 提供所有可发现的容器和模块，元数据在实例化之前即可读取。
pub trait DiscoveryIndex {
    /// 取出所有容器
    fn containers(&mut self) -> Vec<ContainerEntry>;

    /// 取出所有模块
    fn modules(&mut self) -> Vec<ModuleEntry>;
}

/// 模块目录
///
/// [`DiscoveryIndex`] 的显式注册实现。
#[derive(Debug, Default)]
pub struct ModuleCatalog {
    containers: Vec<ContainerEntry>,
    modules: Vec<ModuleEntry>,
    keys: HashSet<DependencyKey>,
}

impl ModuleCatalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记容器实例
    pub fn register_container(&mut self, container: ModuleContainer) -> &mut Self {
        let source = container.id.clone();
        self.register_container_factory(source, move || Ok(container))
    }

    /// 登记容器构造函数
    pub fn register_container_factory<F>(&mut self, source: impl Into<String>, factory: F) -> &mut Self
    where
        F: FnOnce() -> anyhow::Result<ModuleContainer> + Send + 'static,
    {
        self.containers.push(ContainerEntry {
            source: source.into(),
            factory: Box::new(factory),
        });
        self
    }

    /// 登记模块及其能力集
    pub fn register_module(
        &mut self,
        descriptor: ModuleDescriptor,
        hooks: ModuleHooks,
    ) -> Result<&mut Self> {
        self.register_module_factory(descriptor, move || Ok(hooks))
    }

    /// 登记模块构造函数
    ///
    /// # Errors
    ///
    /// - `CoreError::InvalidDependencyKey` - 容器 ID 或模块 ID 为空，或包含 `:`
    /// - `CoreError::DuplicateModule` - 同一依赖键已登记
    pub fn register_module_factory<F>(
        &mut self,
        descriptor: ModuleDescriptor,
        factory: F,
    ) -> Result<&mut Self>
    where
        F: FnOnce() -> anyhow::Result<ModuleHooks> + Send + 'static,
    {
        let key: DependencyKey = descriptor.key().to_string().parse()?;
        if !self.keys.insert(key.clone()) {
            return Err(CoreError::DuplicateModule(key.to_string()));
        }

        self.modules.push(ModuleEntry {
            descriptor,
            factory: Box::new(factory),
        });
        Ok(self)
    }

    /// 已登记的容器数量
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// 已登记的模块数量
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}

impl DiscoveryIndex for ModuleCatalog {
    fn containers(&mut self) -> Vec<ContainerEntry> {
        std::mem::take(&mut self.containers)
    }

    fn modules(&mut self) -> Vec<ModuleEntry> {
        self.keys.clear();
        std::mem::take(&mut self.modules)
    }
}
