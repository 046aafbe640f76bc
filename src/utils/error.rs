//! 模块加载内核错误类型定义
//!
//! 本模块定义了内核中使用的所有错误类型。

use thiserror::Error;

use crate::module::lifecycle::ModuleStage;

/// 模块加载内核核心错误类型
#[derive(Error, Debug)]
pub enum CoreError {
    // ==================== 模块管理错误 ====================

    /// 模块容器缺少核心模块
    #[error("模块容器 '{0}' 缺少核心模块")]
    MissingCoreModule(String),

    /// 模块 ID 重复注册
    #[error("模块重复注册: '{0}'")]
    DuplicateModule(String),

    /// 依赖键格式无效
    #[error("依赖键格式无效: '{0}'，应为 'container:module'")]
    InvalidDependencyKey(String),

    /// 阶段只能前进
    #[error("非法的阶段切换: 当前阶段 {current}，请求进入 {requested}")]
    InvalidStageTransition {
        /// 当前阶段
        current: ModuleStage,
        /// 请求进入的阶段
        requested: ModuleStage,
    },

    /// 生命周期钩子执行失败
    #[error("模块 '{module}' 在阶段 {stage} 执行失败: {source}")]
    HookFailed {
        /// 模块依赖键
        module: String,
        /// 失败时所在阶段
        stage: ModuleStage,
        /// 钩子返回的错误
        #[source]
        source: anyhow::Error,
    },

    // ==================== 配置错误 ====================

    /// 配置加载失败
    #[error("配置加载失败: {0}")]
    ConfigLoadFailed(String),

    /// 配置项未找到
    #[error("配置项未找到: '{0}'")]
    ConfigNotFound(String),

    /// 配置值无效
    #[error("配置值无效: '{key}' - {reason}")]
    InvalidConfigValue {
        /// 配置项
        key: String,
        /// 原因
        reason: String,
    },

    // ==================== IO 和序列化错误 ====================

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML 序列化/反序列化错误
    #[error("YAML 错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML 解析错误
    #[error("TOML 错误: {0}")]
    Toml(#[from] toml_edit::TomlError),

    // ==================== 通用错误 ====================

    /// 初始化失败
    #[error("初始化失败: {0}")]
    InitFailed(String),

    /// 其他错误
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// 内核操作结果类型别名
pub type Result<T> = std::result::Result<T, CoreError>;

/// 错误码常量
pub mod error_code {
    // 核心错误 (CORE-xxx)
    /// 初始化失败
    pub const CORE_INIT_FAILED: &str = "CORE-001";
    /// 非法的阶段切换
    pub const CORE_INVALID_STAGE: &str = "CORE-002";

    // 模块错误 (MODULE-xxx)
    /// 缺少核心模块
    pub const MODULE_MISSING_CORE: &str = "MODULE-001";
    /// 模块重复注册
    pub const MODULE_DUPLICATE: &str = "MODULE-002";
    /// 依赖键格式无效
    pub const MODULE_INVALID_KEY: &str = "MODULE-003";
    /// 钩子执行失败
    pub const MODULE_HOOK_FAILED: &str = "MODULE-004";

    // 配置错误 (CONFIG-xxx)
    /// 配置加载失败
    pub const CONFIG_LOAD_FAILED: &str = "CONFIG-001";
    /// 配置项未找到
    pub const CONFIG_NOT_FOUND: &str = "CONFIG-002";
    /// 配置值无效
    pub const CONFIG_INVALID_VALUE: &str = "CONFIG-003";

    // IO 错误 (IO-xxx)
    /// IO 错误
    pub const IO_FAILED: &str = "IO-001";
}

impl CoreError {
    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::MissingCoreModule(_) => error_code::MODULE_MISSING_CORE,
            CoreError::DuplicateModule(_) => error_code::MODULE_DUPLICATE,
            CoreError::InvalidDependencyKey(_) => error_code::MODULE_INVALID_KEY,
            CoreError::HookFailed { .. } => error_code::MODULE_HOOK_FAILED,
            CoreError::InvalidStageTransition { .. } => error_code::CORE_INVALID_STAGE,
            CoreError::InitFailed(_) => error_code::CORE_INIT_FAILED,
            CoreError::ConfigLoadFailed(_) | CoreError::Toml(_) => error_code::CONFIG_LOAD_FAILED,
            CoreError::ConfigNotFound(_) => error_code::CONFIG_NOT_FOUND,
            CoreError::InvalidConfigValue { .. } => error_code::CONFIG_INVALID_VALUE,
            CoreError::Io(_) => error_code::IO_FAILED,
            _ => "UNKNOWN",
        }
    }

    /// 是否为致命错误（整个加载流程必须中止）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CoreError::MissingCoreModule(_) | CoreError::HookFailed { .. }
        )
    }
}
