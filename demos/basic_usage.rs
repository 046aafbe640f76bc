//! 基本使用示例
//!
//! 本示例展示了模块加载内核的基本使用方法，包括：
//!
//! - 注册模块容器和模块
//! - 配置模块并计算加载顺序
//! - 驱动生命周期阶段
//! - 处理模块间消息
//!
//! # 运行示例
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::path::PathBuf;

use modloader_core::module::{
    ConstructionEvent, DependencyKey, EventBus, EventBusKind, InitEvent, InterModMessage,
    LoadCompleteEvent, LoadedSystems, ModuleCatalog, ModuleContainer, ModuleDescriptor,
    ModuleHooks, ModuleManager, PacketDirection, PacketRegistrar, PostInitEvent, PreInitEvent,
    Side, StageContext,
};
use modloader_core::{CoreConfig, Logger, LoggerConfig};
use serde_json::json;

/// 打印订阅信息的事件总线
struct PrintingBus;

impl EventBus for PrintingBus {
    fn subscribe(
        &mut self,
        ctx: &StageContext<'_>,
        bus: EventBusKind,
        owner: &DependencyKey,
        subscriber: &str,
    ) {
        let container = ctx.container().map(|c| c.name.as_str()).unwrap_or("?");
        println!("   - {:?} <- {} ({}, {})", bus, subscriber, owner, container);
    }
}

/// 打印注册信息的网络包注册器
struct PrintingRegistrar;

impl PacketRegistrar for PrintingRegistrar {
    fn register_packet(&mut self, owner: &DependencyKey, packet: &str, direction: PacketDirection) {
        println!("   - {} {:?} ({})", packet, direction, owner);
    }
}

fn build_catalog() -> Result<ModuleCatalog, Box<dyn std::error::Error>> {
    let mut catalog = ModuleCatalog::new();
    catalog.register_container(ModuleContainer::new("demo").with_name("Demo Mod"));

    catalog
        .register_module(
            ModuleDescriptor::core("demo", "core").with_description("Shared blocks and items"),
            ModuleHooks::new()
                .on_register_packets(|_, packets| {
                    packets.register("sync_config", PacketDirection::ClientBound);
                    Ok(())
                })
                .on_init(|ctx, _| {
                    let container = ctx.container().map(|c| c.name.as_str()).unwrap_or("?");
                    println!("   [core] 初始化，所属容器: {}", container);
                    Ok(())
                }),
        )?
        .register_module(
            ModuleDescriptor::new("demo", "worldgen")
                .with_description("Ore generation")
                .depends_on(DependencyKey::new("demo", "core")),
            ModuleHooks::new()
                .subscribe(EventBusKind::OreGen, "OreGenerator")
                .on_init(|ctx, _| {
                    let jei = ctx.is_module_enabled(&DependencyKey::new("demo", "jei"));
                    println!("   [worldgen] 初始化，JEI 集成已加载: {}", jei);
                    Ok(())
                })
                .on_message(|_, message| {
                    if message.key != "add_ore" {
                        return false;
                    }
                    println!("   [worldgen] 收到来自 {} 的矿物: {}", message.sender, message.value);
                    true
                }),
        )?
        .register_module(
            ModuleDescriptor::new("demo", "jei")
                .with_description("Recipe viewer integration")
                .requires_host("jei"),
            ModuleHooks::new(),
        )?;

    Ok(catalog)
}

/// 主函数
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = Logger::try_init(LoggerConfig::builder().level("info").build());

    println!("=== 模块加载内核基本使用示例 ===\n");

    // -------------------------------------------------------------------------
    // 1. 创建模块管理器
    // -------------------------------------------------------------------------
    let config_dir = std::env::temp_dir().join("modloader-demo");
    let config = CoreConfig::builder()
        .config_dir(&config_dir)
        .namespace("demo")
        .build();
    println!("1. 模块开关文件: {}\n", config.modules.store_path().display());

    let mut manager = ModuleManager::from_core_config(&config);

    // -------------------------------------------------------------------------
    // 2. 发现并配置模块（宿主未加载 JEI）
    // -------------------------------------------------------------------------
    println!("2. 配置模块，事件订阅:");
    let mut catalog = build_catalog()?;
    manager.setup(&mut catalog, &LoadedSystems::new(), &mut PrintingBus)?;

    println!("\n   加载顺序:");
    for key in manager.loaded_keys() {
        println!("   - {}", key);
    }
    println!();

    // -------------------------------------------------------------------------
    // 3. 驱动生命周期
    // -------------------------------------------------------------------------
    println!("3. 生命周期:");
    manager.on_construction(&ConstructionEvent {
        host_version: "1.12.2".to_string(),
        side: Side::Client,
    })?;
    println!("   网络包注册:");
    manager.on_pre_init(
        &PreInitEvent {
            config_dir: PathBuf::from(&config_dir),
            side: Side::Client,
        },
        &mut PrintingRegistrar,
    )?;
    manager.on_init(&InitEvent::default())?;
    manager.on_post_init(&PostInitEvent::default())?;
    println!();

    // -------------------------------------------------------------------------
    // 4. 模块间消息
    // -------------------------------------------------------------------------
    println!("4. 模块间消息:");
    let handled = manager.process_messages(&[
        InterModMessage::new("othermod", "add_ore", json!({"block": "othermod:ruby_ore"})),
        InterModMessage::new("othermod", "unknown", json!(null)),
    ]);
    println!("   已处理 {} 条消息\n", handled);

    manager.on_load_complete(&LoadCompleteEvent)?;
    println!("当前阶段: {}", manager.current_stage());
    println!("\n=== 示例完成 ===");

    Ok(())
}
