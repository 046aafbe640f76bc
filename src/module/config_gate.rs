//! 模块开关
//!
//! 把 `(容器 ID, 模块 ID)` 映射到持久化的启用标记。配置存储在首次访问时才打开，
//! 新模块以默认值 `true` 写入，整个配置过程结束后如有修改只保存一次。

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::store::ConfigStore;
use crate::module::metadata::ModuleDescriptor;
use crate::utils::Result;

/// 模块开关所在的配置节
pub const MODULE_SECTION: &str = "modules";

/// 配置节注释
pub const MODULE_SECTION_COMMENT: &str =
    "Module configuration file. Can individually enable/disable modules from the mod and its addons";

/// 模块开关
#[derive(Debug)]
pub struct ConfigGate {
    path: PathBuf,
    store: Option<ConfigStore>,
}

impl ConfigGate {
    /// 创建开关，此时不读取文件
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            store: None,
        }
    }

    /// 配置文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 打开（或返回已打开的）配置存储
    fn store(&mut self) -> Result<&mut ConfigStore> {
        if self.store.is_none() {
            let mut store = ConfigStore::open(&self.path)?;
            store.set_section_comment(MODULE_SECTION, MODULE_SECTION_COMMENT);
            self.store = Some(store);
        }
        Ok(self.store.get_or_insert_with(|| ConfigStore::new(&self.path)))
    }

    /// 模块是否启用
    ///
    /// 配置项不存在时以 `true` 创建。
    pub fn is_enabled(&mut self, descriptor: &ModuleDescriptor) -> Result<bool> {
        let key = descriptor.key().to_string();
        let comment = render_comment(descriptor);
        let enabled = self
            .store()?
            .get_bool(MODULE_SECTION, &key, true, &comment);
        debug!(module = %key, enabled, "读取模块开关");
        Ok(enabled)
    }

    /// 结束配置过程：有未保存修改时写回文件
    ///
    /// # Returns
    ///
    /// 是否写入了文件
    pub fn finish(&mut self) -> Result<bool> {
        match self.store {
            Some(ref mut store) if store.has_changed() => {
                store.save()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// 生成模块配置项的注释：描述、模块依赖、宿主依赖
pub fn render_comment(descriptor: &ModuleDescriptor) -> String {
    let mut comment = descriptor.description.clone();

    if !descriptor.dependencies.is_empty() {
        let deps: Vec<String> = descriptor
            .dependencies
            .iter()
            .map(ToString::to_string)
            .collect();
        comment.push('\n');
        comment.push_str(&format!("Module Dependencies: [ {} ]", deps.join(", ")));
    }

    if !descriptor.host_dependencies.is_empty() {
        comment.push('\n');
        comment.push_str(&format!(
            "Host Dependencies: [ {} ]",
            descriptor.host_dependencies.join(", ")
        ));
    }

    comment
}
