//! 依赖解析集成测试
//!
//! 通过模块管理器验证加载顺序的各项性质

use std::sync::{Arc, Mutex};

use modloader_core::module::{
    InitEvent, LoadedSystems, ModuleCatalog, ModuleContainer, ModuleDescriptor, ModuleHooks,
    ModuleManager, NoopEventBus, MODULE_SECTION,
};
use modloader_core::{ConfigStore, CoreError, DependencyKey, ModuleConfig};
use tempfile::TempDir;

fn key(s: &str) -> DependencyKey {
    s.parse().unwrap()
}

/// 模块声明：(依赖键, 是否核心, 依赖列表)
type Decl<'a> = (&'a str, bool, &'a [&'a str]);

fn build_catalog(containers: &[&str], modules: &[Decl<'_>]) -> ModuleCatalog {
    let mut catalog = ModuleCatalog::new();
    for id in containers {
        catalog.register_container(ModuleContainer::new(*id));
    }
    for (decl, is_core, deps) in modules {
        let k = key(decl);
        let mut descriptor = ModuleDescriptor::new(k.container(), k.module());
        if *is_core {
            descriptor = descriptor.as_core();
        }
        for dep in *deps {
            descriptor = descriptor.depends_on(key(dep));
        }
        catalog.register_module(descriptor, ModuleHooks::new()).unwrap();
    }
    catalog
}

fn manager(dir: &TempDir) -> ModuleManager {
    ModuleManager::new(ModuleConfig {
        config_dir: dir.path().to_path_buf(),
        ..ModuleConfig::default()
    })
}

fn resolve(dir: &TempDir, containers: &[&str], modules: &[Decl<'_>]) -> Vec<String> {
    let mut manager = manager(dir);
    manager
        .setup(
            &mut build_catalog(containers, modules),
            &LoadedSystems::new(),
            &mut NoopEventBus,
        )
        .unwrap();
    manager.loaded_keys().iter().map(|k| k.to_string()).collect()
}

const MIXED: &[Decl<'static>] = &[
    ("tech:core", true, &["base:core"]),
    ("tech:machines", false, &["tech:power", "base:ores"]),
    ("tech:power", false, &[]),
    ("tech:addon", false, &["magic:core"]),
    ("base:core", true, &[]),
    ("base:ores", false, &["base:tools"]),
    ("base:tools", false, &[]),
    ("base:broken", false, &["missing:thing"]),
];

#[test]
fn test_dependencies_precede_dependents() {
    let dir = TempDir::new().unwrap();
    let order = resolve(&dir, &["tech", "base"], MIXED);

    for (decl, _, deps) in MIXED {
        let Some(pos) = order.iter().position(|k| k.as_str() == *decl) else {
            continue;
        };
        for dep in *deps {
            let dep_pos = order.iter().position(|k| k.as_str() == *dep);
            assert!(
                matches!(dep_pos, Some(d) if d < pos),
                "{} loaded but dependency {} is not before it: {:?}",
                decl,
                dep,
                order
            );
        }
    }

    assert!(!order.contains(&"tech:addon".to_string()));
    assert!(!order.contains(&"base:broken".to_string()));
    assert_eq!(order.len(), 6);
}

#[test]
fn test_resolution_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let first = resolve(&dir, &["tech", "base"], MIXED);
    let second = resolve(&dir, &["tech", "base"], MIXED);
    assert_eq!(first, second);
    assert_eq!(
        first,
        vec![
            "base:core",
            "base:tools",
            "base:ores",
            "tech:core",
            "tech:power",
            "tech:machines",
        ]
    );
}

#[test]
fn test_core_module_first_in_container() {
    let dir = TempDir::new().unwrap();
    // 核心模块 ID 排序靠后，且普通模块不声明对核心的依赖
    let order = resolve(
        &dir,
        &["alpha"],
        &[
            ("alpha:a", false, &[]),
            ("alpha:b", false, &[]),
            ("alpha:zz_core", true, &[]),
        ],
    );
    assert_eq!(order, vec!["alpha:zz_core", "alpha:a", "alpha:b"]);
}

#[test]
fn test_core_first_even_when_core_depends_on_other_container() {
    let dir = TempDir::new().unwrap();
    let order = resolve(&dir, &["tech", "base"], MIXED);

    for container in ["tech", "base"] {
        let core = order
            .iter()
            .position(|k| *k == format!("{container}:core"))
            .unwrap();
        for (pos, k) in order.iter().enumerate() {
            if k.starts_with(&format!("{container}:")) && pos != core {
                assert!(core < pos, "{k} precedes core of {container}");
            }
        }
    }
}

#[test]
fn test_disabled_dependency_excludes_dependent_from_callbacks() {
    let dir = TempDir::new().unwrap();
    let config = ModuleConfig {
        config_dir: dir.path().to_path_buf(),
        ..ModuleConfig::default()
    };
    let path = config.store_path();

    let mut store = ConfigStore::new(&path);
    store.set_bool(MODULE_SECTION, "x:b", false);
    store.save().unwrap();

    let calls = Arc::new(Mutex::new(Vec::<String>::new()));
    let mut catalog = ModuleCatalog::new();
    catalog.register_container(ModuleContainer::new("x"));
    for (descriptor, name) in [
        (ModuleDescriptor::core("x", "core"), "core"),
        (ModuleDescriptor::new("x", "a").depends_on(key("x:b")), "a"),
        (ModuleDescriptor::new("x", "b"), "b"),
    ] {
        let calls = calls.clone();
        catalog
            .register_module(
                descriptor,
                ModuleHooks::new().on_init(move |_, _| {
                    calls.lock().unwrap().push(name.to_string());
                    Ok(())
                }),
            )
            .unwrap();
    }

    let mut manager = ModuleManager::new(config);
    manager
        .setup(&mut catalog, &LoadedSystems::new(), &mut NoopEventBus)
        .unwrap();
    manager.on_init(&InitEvent::default()).unwrap();

    assert!(!manager.is_module_enabled(&key("x:a")));
    assert!(!manager.is_module_enabled(&key("x:b")));
    assert_eq!(*calls.lock().unwrap(), vec!["core"]);

    let resolution = manager.resolution().unwrap();
    assert_eq!(resolution.disabled, vec![key("x:b")]);
    assert_eq!(resolution.missing, vec![(key("x:a"), vec![key("x:b")])]);
}

#[test]
fn test_cycle_terminates_and_excludes_members() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(&dir);
    manager
        .setup(
            &mut build_catalog(
                &["x"],
                &[
                    ("x:core", true, &[]),
                    ("x:a", false, &["x:b"]),
                    ("x:b", false, &["x:a"]),
                    ("x:c", false, &["x:a"]),
                    ("x:d", false, &[]),
                ],
            ),
            &LoadedSystems::new(),
            &mut NoopEventBus,
        )
        .unwrap();

    let order: Vec<String> = manager.loaded_keys().iter().map(|k| k.to_string()).collect();
    assert_eq!(order, vec!["x:core", "x:d"]);
    assert_eq!(
        manager.resolution().unwrap().cyclic,
        vec![key("x:a"), key("x:b"), key("x:c")]
    );
}

#[test]
fn test_container_without_core_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut manager = manager(&dir);
    let result = manager.setup(
        &mut build_catalog(&["x", "y"], &[("x:core", true, &[]), ("y:a", false, &[])]),
        &LoadedSystems::new(),
        &mut NoopEventBus,
    );

    let err = result.unwrap_err();
    assert!(matches!(err, CoreError::MissingCoreModule(ref id) if id == "y"));
    assert!(err.is_fatal());
}

#[test]
fn test_module_of_unregistered_container_skipped() {
    let dir = TempDir::new().unwrap();
    let order = resolve(
        &dir,
        &["x"],
        &[("x:core", true, &[]), ("ghost:core", true, &[])],
    );
    assert_eq!(order, vec!["x:core"]);
}
