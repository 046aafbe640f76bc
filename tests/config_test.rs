//! 模块开关配置集成测试
//!
//! 测试模块管理器与配置文件之间的完整工作流程

use modloader_core::module::{
    LoadedSystems, ModuleCatalog, ModuleContainer, ModuleDescriptor, ModuleHooks, ModuleManager,
    NoopEventBus, MODULE_SECTION,
};
use modloader_core::{ConfigStore, CoreConfig, DependencyKey};
use tempfile::TempDir;

fn catalog() -> ModuleCatalog {
    let mut catalog = ModuleCatalog::new();
    catalog.register_container(ModuleContainer::new("example").with_name("Example"));
    catalog
        .register_module(
            ModuleDescriptor::core("example", "core").with_description("Core features"),
            ModuleHooks::new(),
        )
        .unwrap()
        .register_module(
            ModuleDescriptor::new("example", "worldgen")
                .with_description("World generation")
                .depends_on(DependencyKey::new("example", "core")),
            ModuleHooks::new(),
        )
        .unwrap()
        .register_module(
            ModuleDescriptor::new("example", "integration")
                .with_description("Recipe viewer integration")
                .requires_host("jei"),
            ModuleHooks::new(),
        )
        .unwrap();
    catalog
}

fn config(dir: &TempDir) -> CoreConfig {
    CoreConfig::builder()
        .config_dir(dir.path())
        .namespace("example")
        .build()
}

/// 首次运行时生成配置文件，全部模块默认启用
#[test]
fn test_first_run_seeds_config_file() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    let mut manager = ModuleManager::from_core_config(&config);
    manager
        .setup(&mut catalog(), &LoadedSystems::new().with("jei"), &mut NoopEventBus)
        .unwrap();

    let path = config.modules.store_path();
    assert!(path.exists());

    let store = ConfigStore::open(&path).unwrap();
    let keys: Vec<String> = store
        .entries(MODULE_SECTION)
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec!["example:core", "example:integration", "example:worldgen"]);

    let worldgen = store.get(MODULE_SECTION, "example:worldgen").unwrap();
    assert_eq!(worldgen.as_bool(), Some(true));
    assert_eq!(
        worldgen.comment.as_deref(),
        Some("World generation\nModule Dependencies: [ example:core ]")
    );
    let integration = store.get(MODULE_SECTION, "example:integration").unwrap();
    assert_eq!(
        integration.comment.as_deref(),
        Some("Recipe viewer integration\nHost Dependencies: [ jei ]")
    );
    assert!(store
        .section_comment(MODULE_SECTION)
        .unwrap()
        .starts_with("Module configuration file."));
}

/// 宿主依赖缺失的模块不会出现在配置文件中
#[test]
fn test_missing_host_dependency_not_written() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    let mut manager = ModuleManager::from_core_config(&config);
    manager
        .setup(&mut catalog(), &LoadedSystems::new(), &mut NoopEventBus)
        .unwrap();

    let store = ConfigStore::open(config.modules.store_path()).unwrap();
    assert!(store.get(MODULE_SECTION, "example:integration").is_none());
    assert!(!manager.is_module_enabled(&DependencyKey::new("example", "integration")));
}

/// 用户禁用的模块在下次加载时被跳过，配置文件不会被重写
#[test]
fn test_disabled_flag_respected_without_rewrite() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let path = config.modules.store_path();

    ModuleManager::from_core_config(&config)
        .setup(&mut catalog(), &LoadedSystems::new(), &mut NoopEventBus)
        .unwrap();

    let mut store = ConfigStore::open(&path).unwrap();
    assert!(store.set_bool(MODULE_SECTION, "example:worldgen", false));
    store.save().unwrap();
    let written = std::fs::read_to_string(&path).unwrap();

    let mut manager = ModuleManager::from_core_config(&config);
    manager
        .setup(&mut catalog(), &LoadedSystems::new(), &mut NoopEventBus)
        .unwrap();

    assert!(manager.is_module_enabled(&DependencyKey::new("example", "core")));
    assert!(!manager.is_module_enabled(&DependencyKey::new("example", "worldgen")));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), written);

    let resolution = manager.resolution().unwrap();
    assert_eq!(resolution.disabled, vec![DependencyKey::new("example", "worldgen")]);
}

/// 无法解析的开关值被重置为默认值并写回
#[test]
fn test_invalid_flag_reset_to_default() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let path = config.modules.store_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        "[modules]\n\"example:core\" = \"yes\"\n\"example:worldgen\" = true\n",
    )
    .unwrap();

    let mut manager = ModuleManager::from_core_config(&config);
    manager
        .setup(&mut catalog(), &LoadedSystems::new(), &mut NoopEventBus)
        .unwrap();

    assert!(manager.is_module_enabled(&DependencyKey::new("example", "core")));
    let store = ConfigStore::open(&path).unwrap();
    assert_eq!(store.get(MODULE_SECTION, "example:core").unwrap().value, "true");
}

/// 内核配置文件中的模块配置决定开关文件位置
#[test]
fn test_core_config_yaml_controls_store_path() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        format!(
            "modules:\n  config_dir: {}\n  namespace: example\n  file_name: features.toml\nlogging:\n  level: debug\n",
            dir.path().display()
        ),
    )
    .unwrap();

    let config = CoreConfig::from_file(&config_path).unwrap();
    config.validate().unwrap();
    assert_eq!(
        config.modules.store_path(),
        dir.path().join("example").join("features.toml")
    );

    let mut manager = ModuleManager::from_core_config(&config);
    manager
        .setup(&mut catalog(), &LoadedSystems::new(), &mut NoopEventBus)
        .unwrap();
    assert!(config.modules.store_path().exists());
}

/// 命令行覆盖项只替换显式给出的字段
#[test]
fn test_overrides_merge_onto_file_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        "modules:\n  namespace: example\n  file_name: features.toml\nlogging:\n  level: debug\n",
    )
    .unwrap();

    let mut config = CoreConfig::from_file(&config_path).unwrap();
    let host_dir = dir.path().join("host");
    config.merge(CoreConfig::builder().config_dir(&host_dir).dev_mode().build());

    assert!(config.dev_mode);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.modules.store_path(),
        host_dir.join("example").join("features.toml")
    );

    ModuleManager::from_core_config(&config)
        .setup(&mut catalog(), &LoadedSystems::new(), &mut NoopEventBus)
        .unwrap();
    assert!(config.modules.store_path().exists());
}
