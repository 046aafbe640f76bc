//! 模块元数据定义
//!
//! 定义模块和模块容器的静态描述信息：容器 ID、模块 ID、核心标记、
//! 声明的模块依赖以及宿主系统依赖。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::utils::CoreError;

/// 依赖键
///
/// 复合标识 `containerId:moduleId`，既用于声明依赖，也用于判断模块是否在加载集合中。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DependencyKey {
    container: String,
    module: String,
}

impl DependencyKey {
    /// 创建依赖键
    pub fn new(container: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            module: module.into(),
        }
    }

    /// 容器 ID
    pub fn container(&self) -> &str {
        &self.container
    }

    /// 模块 ID
    pub fn module(&self) -> &str {
        &self.module
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.container, self.module)
    }
}

impl FromStr for DependencyKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((container, module))
                if !container.is_empty() && !module.is_empty() && !module.contains(':') =>
            {
                Ok(Self::new(container, module))
            }
            _ => Err(CoreError::InvalidDependencyKey(s.to_string())),
        }
    }
}

impl TryFrom<String> for DependencyKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DependencyKey> for String {
    fn from(key: DependencyKey) -> Self {
        key.to_string()
    }
}

/// 模块描述
///
/// 模块的静态元数据，在实例化模块之前即可读取。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// 所属容器 ID
    pub container_id: String,

    /// 模块 ID（容器内唯一）
    pub module_id: String,

    /// 是否为容器的核心模块
    #[serde(default)]
    pub is_core: bool,

    /// 模块描述，写入配置文件注释
    #[serde(default)]
    pub description: String,

    /// 依赖的其他模块
    #[serde(default)]
    pub dependencies: BTreeSet<DependencyKey>,

    /// 必须存在的宿主系统
    #[serde(default)]
    pub host_dependencies: Vec<String>,
}

impl ModuleDescriptor {
    /// 创建新的模块描述
    pub fn new(container_id: impl Into<String>, module_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            module_id: module_id.into(),
            is_core: false,
            description: String::new(),
            dependencies: BTreeSet::new(),
            host_dependencies: vec![],
        }
    }

    /// 创建核心模块描述
    pub fn core(container_id: impl Into<String>, module_id: impl Into<String>) -> Self {
        Self::new(container_id, module_id).as_core()
    }

    /// 标记为核心模块
    pub fn as_core(mut self) -> Self {
        self.is_core = true;
        self
    }

    /// 设置描述
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// 添加模块依赖
    pub fn depends_on(mut self, key: DependencyKey) -> Self {
        self.dependencies.insert(key);
        self
    }

    /// 添加宿主系统依赖
    pub fn requires_host(mut self, system: impl Into<String>) -> Self {
        self.host_dependencies.push(system.into());
        self
    }

    /// 本模块的依赖键
    pub fn key(&self) -> DependencyKey {
        DependencyKey::new(&self.container_id, &self.module_id)
    }
}

/// 模块容器
///
/// 一组模块的命名分组，其中恰好一个模块是核心模块。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleContainer {
    /// 容器 ID
    pub id: String,

    /// 显示名称
    #[serde(default)]
    pub name: String,
}

impl ModuleContainer {
    /// 创建容器，显示名称默认与 ID 相同
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
        }
    }

    /// 设置显示名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl fmt::Display for ModuleContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
