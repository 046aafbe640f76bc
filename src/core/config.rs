//! 内核配置
//!
//! 定义内核的配置结构和加载逻辑。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::CoreError;

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出到文件
    #[serde(default)]
    pub file_output: bool,

    /// 日志文件目录
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// 是否输出 JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 日志轮转策略
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: false,
            log_dir: None,
            json_format: false,
            rotation: default_rotation(),
        }
    }
}

/// 模块管理配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// 宿主配置目录
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// 配置子目录名，通常为插件 ID
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// 模块开关配置文件名
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("config")
}

fn default_namespace() -> String {
    "modloader".to_string()
}

fn default_file_name() -> String {
    "modules.toml".to_string()
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            namespace: default_namespace(),
            file_name: default_file_name(),
        }
    }
}

impl ModuleConfig {
    /// 模块开关配置文件的完整路径
    pub fn store_path(&self) -> PathBuf {
        self.config_dir.join(&self.namespace).join(&self.file_name)
    }
}

/// 内核配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    /// 配置文件路径
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// 日志配置
    #[serde(default)]
    pub logging: LogConfig,

    /// 模块管理配置
    #[serde(default)]
    pub modules: ModuleConfig,

    /// 是否为开发模式
    #[serde(default)]
    pub dev_mode: bool,
}

impl CoreConfig {
    /// 创建配置构建器
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::new()
    }

    /// 从文件加载配置，`.json` 按 JSON 解析，其余按 YAML 解析
    pub fn from_file(path: impl AsRef<Path>) -> crate::utils::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let mut config: CoreConfig = if path.extension().map(|e| e == "json").unwrap_or(false) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// 校验配置
    ///
    /// # Errors
    ///
    /// - `CoreError::InvalidConfigValue` - 日志级别无法识别，或模块命名空间、文件名为空
    pub fn validate(&self) -> crate::utils::Result<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(CoreError::InvalidConfigValue {
                key: "logging.level".to_string(),
                reason: format!("未知的日志级别 '{}'", self.logging.level),
            });
        }
        if self.modules.namespace.trim().is_empty() {
            return Err(CoreError::InvalidConfigValue {
                key: "modules.namespace".to_string(),
                reason: "不能为空".to_string(),
            });
        }
        if self.modules.file_name.trim().is_empty() {
            return Err(CoreError::InvalidConfigValue {
                key: "modules.file_name".to_string(),
                reason: "不能为空".to_string(),
            });
        }
        Ok(())
    }

    /// 合并另一个配置（用于覆盖）
    pub fn merge(&mut self, other: CoreConfig) {
        // 只覆盖非默认值的配置
        if other.logging.level != default_log_level() {
            self.logging.level = other.logging.level;
        }
        if other.logging.file_output {
            self.logging.file_output = true;
            self.logging.log_dir = other.logging.log_dir;
        }
        if other.logging.json_format {
            self.logging.json_format = true;
        }
        if other.modules.config_dir != default_config_dir() {
            self.modules.config_dir = other.modules.config_dir;
        }
        if other.modules.namespace != default_namespace() {
            self.modules.namespace = other.modules.namespace;
        }
        if other.modules.file_name != default_file_name() {
            self.modules.file_name = other.modules.file_name;
        }
        if other.dev_mode {
            self.dev_mode = true;
        }
    }
}

/// 配置构建器
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            config: CoreConfig::default(),
        }
    }

    /// 设置配置文件路径
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.config_path = Some(path.into());
        self
    }

    /// 设置日志级别
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// 启用文件日志
    pub fn file_logging(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.config.logging.file_output = true;
        self.config.logging.log_dir = Some(log_dir.into());
        self
    }

    /// 启用 JSON 格式日志
    pub fn json_logging(mut self) -> Self {
        self.config.logging.json_format = true;
        self
    }

    /// 设置宿主配置目录
    pub fn config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.modules.config_dir = dir.into();
        self
    }

    /// 设置配置子目录名
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.modules.namespace = namespace.into();
        self
    }

    /// 设置模块开关配置文件名
    pub fn module_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.modules.file_name = name.into();
        self
    }

    /// 启用开发模式
    pub fn dev_mode(mut self) -> Self {
        self.config.dev_mode = true;
        self
    }

    /// 构建配置
    pub fn build(self) -> CoreConfig {
        self.config
    }
}
