//! 日志系统模块
//!
//! 本模块基于 tracing 生态实现日志系统，包括：
//!
//! - 多级别日志支持（TRACE, DEBUG, INFO, WARN, ERROR）
//! - 结构化日志（JSON 格式输出）
//! - 文件日志输出（非阻塞写入）
//! - 日志轮转（按时间轮转：每天、每小时）
//! - 日志过滤（按模块、按级别）
//!
//! # 示例
//!
//! ```rust,no_run
//! use modloader_core::utils::logger::{Logger, LoggerConfig, RotationStrategy};
//!
//! // 基础初始化（仅控制台输出）
//! let _guard = Logger::init(LoggerConfig::default()).unwrap();
//!
//! // 完整配置
//! let config = LoggerConfig::builder()
//!     .level("debug")
//!     .json_format(true)
//!     .file_output("./logs")
//!     .rotation(RotationStrategy::Daily)
//!     .build();
//! let _ = config;
//!
//! tracing::info!(module = "example:core", stage = "init", "模块初始化");
//! ```

use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::core::config::LogConfig;
use crate::utils::{CoreError, Result};

/// 日志文件名前缀
const DEFAULT_FILE_PREFIX: &str = "modloader";

// ============================================================================
// 日志轮转策略
// ============================================================================

/// 日志轮转策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationStrategy {
    /// 不轮转（单个日志文件）
    Never,
    /// 每小时轮转
    Hourly,
    /// 每天轮转（默认）
    #[default]
    Daily,
}

impl RotationStrategy {
    fn to_rotation(self) -> Rotation {
        match self {
            RotationStrategy::Never => Rotation::NEVER,
            RotationStrategy::Hourly => Rotation::HOURLY,
            RotationStrategy::Daily => Rotation::DAILY,
        }
    }

    /// 从字符串解析轮转策略，无法识别时使用默认值
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "never" | "none" => RotationStrategy::Never,
            "hourly" | "hour" => RotationStrategy::Hourly,
            _ => RotationStrategy::Daily,
        }
    }
}

impl std::fmt::Display for RotationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RotationStrategy::Never => write!(f, "never"),
            RotationStrategy::Hourly => write!(f, "hourly"),
            RotationStrategy::Daily => write!(f, "daily"),
        }
    }
}

// ============================================================================
// 日志配置
// ============================================================================

/// 日志系统配置
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// 默认日志级别（例如 "trace", "debug", "info", "warn", "error"）
    pub level: String,

    /// 是否使用 JSON 格式输出
    pub json_format: bool,

    /// 是否输出到控制台
    pub console_output: bool,

    /// 文件输出目录（None 表示不输出到文件）
    pub file_output: Option<PathBuf>,

    /// 日志文件名前缀
    pub file_prefix: String,

    /// 日志轮转策略
    pub rotation: RotationStrategy,

    /// 是否显示目标模块
    pub show_target: bool,

    /// 是否显示文件名和行号
    pub show_file_line: bool,

    /// 自定义过滤指令（EnvFilter 格式）
    /// 例如："modloader_core=debug,modloader_core::module::dependency=trace"
    pub filter_directives: Option<String>,

    /// 是否启用 ANSI 颜色（控制台输出）
    pub ansi_colors: bool,

    /// 是否记录 span 关闭事件（可看到每个阶段的耗时）
    pub span_close: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: None,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            rotation: RotationStrategy::Daily,
            show_target: true,
            show_file_line: false,
            filter_directives: None,
            ansi_colors: true,
            span_close: false,
        }
    }
}

impl LoggerConfig {
    /// 创建配置构建器
    pub fn builder() -> LoggerConfigBuilder {
        LoggerConfigBuilder::new()
    }

    /// 从内核配置的 LogConfig 创建
    pub fn from_log_config(log_config: &LogConfig) -> Self {
        Self {
            level: log_config.level.clone(),
            json_format: log_config.json_format,
            file_output: if log_config.file_output {
                log_config.log_dir.clone()
            } else {
                None
            },
            rotation: RotationStrategy::parse(&log_config.rotation),
            ..Default::default()
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_close {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// 日志配置构建器
#[derive(Debug, Default)]
pub struct LoggerConfigBuilder {
    config: LoggerConfig,
}

impl LoggerConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
        }
    }

    /// 设置日志级别
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// 启用 JSON 格式输出
    pub fn json_format(mut self, enable: bool) -> Self {
        self.config.json_format = enable;
        self
    }

    /// 设置控制台输出
    pub fn console_output(mut self, enable: bool) -> Self {
        self.config.console_output = enable;
        self
    }

    /// 设置文件输出目录
    pub fn file_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.file_output = Some(dir.into());
        self
    }

    /// 设置日志文件前缀
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    /// 设置轮转策略
    pub fn rotation(mut self, strategy: RotationStrategy) -> Self {
        self.config.rotation = strategy;
        self
    }

    /// 显示目标模块
    pub fn show_target(mut self, enable: bool) -> Self {
        self.config.show_target = enable;
        self
    }

    /// 显示文件名和行号
    pub fn show_file_line(mut self, enable: bool) -> Self {
        self.config.show_file_line = enable;
        self
    }

    /// 设置过滤指令
    pub fn filter_directives(mut self, directives: impl Into<String>) -> Self {
        self.config.filter_directives = Some(directives.into());
        self
    }

    /// 启用 ANSI 颜色
    pub fn ansi_colors(mut self, enable: bool) -> Self {
        self.config.ansi_colors = enable;
        self
    }

    /// 记录 span 关闭事件
    pub fn span_close(mut self, enable: bool) -> Self {
        self.config.span_close = enable;
        self
    }

    /// 构建配置
    pub fn build(self) -> LoggerConfig {
        self.config
    }
}

// ============================================================================
// 日志守卫
// ============================================================================

/// 日志系统守卫
///
/// 持有非阻塞写入器的 WorkerGuard。守卫被丢弃时会等待所有挂起的日志写入完成，
/// 因此必须保持到程序退出。
#[derive(Default)]
pub struct LogGuard {
    _console_guard: Option<WorkerGuard>,
    _file_guard: Option<WorkerGuard>,
}

// ============================================================================
// 日志系统
// ============================================================================

static LOGGER_INITIALIZED: OnceLock<bool> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 日志系统
pub struct Logger;

impl Logger {
    /// 初始化日志系统
    ///
    /// 返回的 `LogGuard` 必须保持活动状态直到程序退出。
    ///
    /// # Errors
    ///
    /// 日志系统已初始化时返回 `CoreError::InitFailed`。
    pub fn init(config: LoggerConfig) -> Result<LogGuard> {
        if LOGGER_INITIALIZED.get().is_some() {
            return Err(CoreError::InitFailed(
                "日志系统已初始化，不能重复初始化".to_string(),
            ));
        }

        let env_filter = Self::create_env_filter(&config);
        let mut guard = LogGuard::default();
        let mut layers: Vec<BoxedLayer> = Vec::new();

        if config.console_output {
            let (writer, console_guard) = tracing_appender::non_blocking(io::stdout());
            guard._console_guard = Some(console_guard);
            layers.push(Self::build_layer(&config, writer, config.ansi_colors));
        }

        if let Some(ref log_dir) = config.file_output {
            let appender = RollingFileAppender::new(
                config.rotation.to_rotation(),
                log_dir,
                format!("{}.log", config.file_prefix),
            );
            let (writer, file_guard) = tracing_appender::non_blocking(appender);
            guard._file_guard = Some(file_guard);
            // 文件不使用 ANSI
            layers.push(Self::build_layer(&config, writer, false));
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(env_filter)
            .try_init()
            .map_err(|e| CoreError::InitFailed(format!("日志系统初始化失败: {}", e)))?;

        let _ = LOGGER_INITIALIZED.set(true);
        Ok(guard)
    }

    /// 尝试初始化日志系统，已初始化时返回空守卫
    pub fn try_init(config: LoggerConfig) -> LogGuard {
        Self::init(config).unwrap_or_default()
    }

    /// 使用默认配置初始化日志系统
    pub fn init_default() -> Result<LogGuard> {
        Self::init(LoggerConfig::default())
    }

    /// 优先使用环境变量 RUST_LOG，否则使用配置中的级别，再叠加自定义过滤指令
    fn create_env_filter(config: &LoggerConfig) -> EnvFilter {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

        match config.filter_directives {
            Some(ref directives) => directives
                .split(',')
                .filter_map(|d| d.trim().parse().ok())
                .fold(filter, |f, directive| f.add_directive(directive)),
            None => filter,
        }
    }

    fn build_layer<W>(config: &LoggerConfig, writer: W, ansi: bool) -> BoxedLayer
    where
        W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
    {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(config.show_target)
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .with_span_events(config.span_events());

        if config.json_format {
            layer.json().with_ansi(false).boxed()
        } else {
            layer.with_ansi(ansi).boxed()
        }
    }
}
