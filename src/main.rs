//! modloader 命令行入口
//!
//! 模块加载内核的命令行工具，用于检查内核配置和管理模块开关配置文件。
//!
//! # 命令概览
//!
//! - `version` - 显示版本信息
//! - `check-config` - 验证内核配置文件
//! - `list` - 列出模块开关
//! - `enable` / `disable` - 修改模块开关
//!
//! # 使用示例
//!
//! ```bash
//! # 查看模块开关
//! modloader -c config.yaml list
//!
//! # 禁用一个模块
//! modloader disable example:worldgen
//!
//! # 检查配置文件
//! modloader check-config -c config.yaml
//!
//! # 临时指定宿主配置目录
//! modloader --config-dir /srv/host/config list
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{debug, info};

use modloader_core::module::{DependencyKey, MODULE_SECTION};
use modloader_core::{ConfigStore, CoreConfig, CoreError, Logger, LoggerConfig};

/// modloader - 模块加载内核
///
/// 管理模块开关配置，检查内核配置文件。
#[derive(Parser)]
#[command(name = "modloader")]
#[command(version, about = "模块加载内核命令行工具", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// 内核配置文件路径
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// 开发模式（显示源码位置）
    #[arg(long, global = true)]
    dev: bool,

    /// 覆盖配置文件中的宿主配置目录
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// 子命令
    #[command(subcommand)]
    command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
enum Commands {
    /// 查看版本信息
    Version,

    /// 验证内核配置文件
    ///
    /// 检查配置文件是否有效，并显示解析后的配置内容。
    CheckConfig {
        /// 配置文件路径（不指定则使用全局 -c 选项）
        #[arg(short = 'f', long)]
        file: Option<PathBuf>,
    },

    /// 列出模块开关
    ///
    /// 显示模块开关配置文件中的所有模块及其启用状态。
    List {
        /// 同时显示每个模块的注释
        #[arg(short, long)]
        verbose: bool,
    },

    /// 启用模块
    Enable {
        /// 模块依赖键（格式: container:module）
        key: String,
    },

    /// 禁用模块
    Disable {
        /// 模块依赖键（格式: container:module）
        key: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let _guard = match cli.command {
        Commands::Version => None,
        _ => Some(Logger::init(
            LoggerConfig::builder()
                .level(cli.log_level.as_str())
                .show_file_line(cli.dev)
                .build(),
        )?),
    };

    match &cli.command {
        Commands::Version => print_version(),
        Commands::CheckConfig { file } => {
            let path = file.as_deref().unwrap_or(cli.config.as_path());
            check_config(path)?;
        }
        Commands::List { verbose } => {
            let config = load_config(&cli)?;
            list_modules(&config, *verbose)?;
        }
        Commands::Enable { key } => {
            let config = load_config(&cli)?;
            set_enabled(&config, key, true)?;
        }
        Commands::Disable { key } => {
            let config = load_config(&cli)?;
            set_enabled(&config, key, false)?;
        }
    }

    Ok(())
}

/// 加载内核配置，文件不存在时使用默认配置，再合并命令行覆盖项
fn load_config(cli: &Cli) -> Result<CoreConfig, CoreError> {
    let path = cli.config.as_path();
    let mut config = if path.exists() {
        let config = CoreConfig::from_file(path)?;
        info!("已加载配置文件: {}", path.display());
        config
    } else {
        debug!("配置文件不存在 ({})，使用默认配置", path.display());
        CoreConfig::default()
    };

    let mut overrides = CoreConfig::builder();
    if let Some(ref dir) = cli.config_dir {
        overrides = overrides.config_dir(dir);
    }
    if cli.dev {
        overrides = overrides.dev_mode();
    }
    config.merge(overrides.build());
    Ok(config)
}

/// 检查配置文件
fn check_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("检查配置文件: {}", path.display());
    println!();

    let config = if path.exists() {
        match CoreConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                println!("❌ 配置文件无效: {}", e);
                return Err(Box::new(e));
            }
        }
    } else {
        println!("⚠️  警告: 配置文件不存在，将使用默认配置");
        CoreConfig::default()
    };

    if let Err(e) = config.validate() {
        println!("❌ 配置文件无效: {}", e);
        return Err(Box::new(e));
    }
    println!("✅ 配置有效！");

    println!();
    println!("配置内容:");
    println!("────────────────────────────────────────");
    println!("  [日志配置]");
    println!("    日志级别:       {}", config.logging.level);
    println!("    文件输出:       {}", if config.logging.file_output { "是" } else { "否" });
    println!("    JSON 格式:      {}", if config.logging.json_format { "是" } else { "否" });
    println!("    轮转策略:       {}", config.logging.rotation);
    println!();
    println!("  [模块配置]");
    println!("    配置目录:       {}", config.modules.config_dir.display());
    println!("    命名空间:       {}", config.modules.namespace);
    println!("    开关文件:       {}", config.modules.store_path().display());
    println!();
    println!("  [其他]");
    println!("    开发模式:       {}", if config.dev_mode { "是" } else { "否" });
    println!("────────────────────────────────────────");
    Ok(())
}

/// 列出模块开关
fn list_modules(config: &CoreConfig, verbose: bool) -> Result<(), CoreError> {
    let path = config.modules.store_path();
    let store = ConfigStore::open(&path)?;
    let entries = store.entries(MODULE_SECTION);

    println!();
    println!("模块开关 ({})", path.display());
    println!("═══════════════════════════════════════");
    if entries.is_empty() {
        println!("  (无)");
    }
    for (key, property) in entries {
        let state = match property.as_bool() {
            Some(true) => "启用",
            Some(false) => "禁用",
            None => "无效",
        };
        println!("  [{}] {}", state, key);
        if verbose {
            if let Some(ref comment) = property.comment {
                for line in comment.lines() {
                    println!("         {}", line);
                }
            }
        }
    }
    println!("═══════════════════════════════════════");
    println!();
    Ok(())
}

/// 修改模块开关
fn set_enabled(config: &CoreConfig, key: &str, enabled: bool) -> Result<(), CoreError> {
    let key: DependencyKey = key.parse()?;
    let path = config.modules.store_path();
    let mut store = ConfigStore::open(&path)?;

    let name = key.to_string();
    if store.get(MODULE_SECTION, &name).is_none() {
        return Err(CoreError::ConfigNotFound(name));
    }

    if store.set_bool(MODULE_SECTION, &name, enabled) {
        store.save()?;
        println!("{} 已{}", name, if enabled { "启用" } else { "禁用" });
    } else {
        println!("{} 未变化", name);
    }
    Ok(())
}

/// 打印版本信息
fn print_version() {
    println!();
    println!("modloader - 模块加载内核");
    println!("═══════════════════════════════════════");
    println!("  版本:             {}", modloader_core::VERSION);
    println!();
    println!("构建信息:");
    println!("  目标平台:         {}", std::env::consts::ARCH);
    println!("  操作系统:         {}", std::env::consts::OS);
    println!("═══════════════════════════════════════");
    println!();
}
