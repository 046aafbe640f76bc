//! 模块依赖管理
//!
//! 本模块提供模块依赖关系的图结构和解析器。
//!
//! # 主要组件
//!
//! - [`DependencyGraph`] - 依赖关系图，负责循环检测和拓扑排序
//! - [`DependencyResolver`] - 依赖解析器，从已发现的模块计算最终加载顺序
//!
//! # 示例
//!
//! ```rust
//! use modloader_core::module::dependency::DependencyGraph;
//! use modloader_core::module::DependencyKey;
//!
//! let core = DependencyKey::new("example", "core");
//! let extra = DependencyKey::new("example", "extra");
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_dependency(&extra, &core);
//!
//! assert_eq!(graph.get_dependencies(&extra), vec![core.clone()]);
//! assert!(!graph.has_cycle());
//! assert_eq!(graph.sort().order, vec![core, extra]);
//! ```

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use tracing::{debug, info, warn};

use crate::module::metadata::{DependencyKey, ModuleDescriptor};
use crate::utils::{CoreError, Result};

/// 模块依赖关系图
///
/// 节点按插入顺序编号，排序时同时就绪的节点按编号从小到大输出，
/// 因此相同输入总是得到相同的顺序。
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// 节点，按插入顺序
    nodes: Vec<DependencyKey>,
    /// 依赖键 -> 节点编号
    index: HashMap<DependencyKey, usize>,
    /// 正向边：节点 -> 该节点依赖的节点
    edges: Vec<Vec<usize>>,
    /// 反向边：节点 -> 依赖该节点的节点
    reverse_edges: Vec<Vec<usize>>,
}

/// 拓扑排序结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologicalOrder {
    /// 依赖在前、依赖方在后的顺序
    pub order: Vec<DependencyKey>,
    /// 因循环依赖（直接或间接）无法排序的节点，按插入顺序
    pub blocked: Vec<DependencyKey>,
}

impl DependencyGraph {
    /// 创建一个空的依赖图
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加模块节点，已存在时返回原编号
    pub fn add_module(&mut self, key: &DependencyKey) -> usize {
        if let Some(&id) = self.index.get(key) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(key.clone());
        self.index.insert(key.clone(), id);
        self.edges.push(Vec::new());
        self.reverse_edges.push(Vec::new());
        id
    }

    /// 添加依赖关系：`module` 依赖 `dependency`
    ///
    /// 两端节点不存在时自动添加，重复的边会被忽略。
    pub fn add_dependency(&mut self, module: &DependencyKey, dependency: &DependencyKey) {
        let from = self.add_module(module);
        let to = self.add_module(dependency);
        if !self.edges[from].contains(&to) {
            self.edges[from].push(to);
            self.reverse_edges[to].push(from);
        }
    }

    /// 获取模块的直接依赖
    pub fn get_dependencies(&self, key: &DependencyKey) -> Vec<DependencyKey> {
        self.index
            .get(key)
            .map(|&id| self.edges[id].iter().map(|&d| self.nodes[d].clone()).collect())
            .unwrap_or_default()
    }

    /// 获取直接依赖此模块的模块
    pub fn get_dependents(&self, key: &DependencyKey) -> Vec<DependencyKey> {
        self.index
            .get(key)
            .map(|&id| {
                self.reverse_edges[id]
                    .iter()
                    .map(|&d| self.nodes[d].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 检查是否包含指定模块
    pub fn contains_module(&self, key: &DependencyKey) -> bool {
        self.index.contains_key(key)
    }

    /// 获取图中模块数量
    pub fn module_count(&self) -> usize {
        self.nodes.len()
    }

    /// 检查图是否为空
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 检测是否存在循环依赖
    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// 查找循环依赖路径
    ///
    /// 如果存在循环依赖，返回参与循环的模块路径（首尾相同）；否则返回 `None`。
    pub fn find_cycle(&self) -> Option<Vec<DependencyKey>> {
        let mut visited = vec![false; self.nodes.len()];
        let mut on_stack = vec![false; self.nodes.len()];
        let mut path = Vec::new();

        for node in 0..self.nodes.len() {
            if let Some(cycle) = self.find_cycle_util(node, &mut visited, &mut on_stack, &mut path) {
                return Some(cycle.into_iter().map(|id| self.nodes[id].clone()).collect());
            }
        }
        None
    }

    /// 查找循环的辅助函数（DFS）
    fn find_cycle_util(
        &self,
        node: usize,
        visited: &mut [bool],
        on_stack: &mut [bool],
        path: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        if on_stack[node] {
            let start = path.iter().position(|&n| n == node)?;
            let mut cycle = path[start..].to_vec();
            cycle.push(node);
            return Some(cycle);
        }
        if visited[node] {
            return None;
        }

        visited[node] = true;
        on_stack[node] = true;
        path.push(node);

        for &next in &self.edges[node] {
            if let Some(cycle) = self.find_cycle_util(next, visited, on_stack, path) {
                return Some(cycle);
            }
        }

        path.pop();
        on_stack[node] = false;
        None
    }

    /// 拓扑排序（Kahn 算法）
    ///
    /// 入度为"尚未输出的依赖数"。每次从就绪节点中取插入编号最小者输出。
    /// 循环上的节点以及依赖它们的节点永远不会就绪，放入 `blocked`。
    pub fn sort(&self) -> TopologicalOrder {
        let mut in_degree: Vec<usize> = self.edges.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(id, _)| Reverse(id))
            .collect();

        let mut emitted = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(Reverse(node)) = ready.pop() {
            emitted[node] = true;
            order.push(self.nodes[node].clone());

            for &dependent in &self.reverse_edges[node] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        let blocked = emitted
            .iter()
            .enumerate()
            .filter(|(_, &done)| !done)
            .map(|(id, _)| self.nodes[id].clone())
            .collect();

        TopologicalOrder { order, blocked }
    }
}

/// 依赖解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// 最终加载顺序
    pub order: Vec<DependencyKey>,
    /// 被配置禁用的模块
    pub disabled: Vec<DependencyKey>,
    /// 依赖缺失的模块及其缺失的依赖
    pub missing: Vec<(DependencyKey, Vec<DependencyKey>)>,
    /// 处于循环依赖中或依赖循环的模块
    pub cyclic: Vec<DependencyKey>,
    /// 所属容器未注册的模块
    pub orphaned: Vec<DependencyKey>,
}

impl Resolution {
    /// 模块在加载顺序中的位置
    pub fn position(&self, key: &DependencyKey) -> Option<usize> {
        self.order.iter().position(|k| k == key)
    }

    /// 模块是否会被加载
    pub fn is_loaded(&self, key: &DependencyKey) -> bool {
        self.order.contains(key)
    }
}

/// 依赖解析器
///
/// 计算最终加载顺序：
/// 1. 每个容器必须有核心模块，核心模块排在容器首位
/// 2. 过滤被配置禁用的模块
/// 3. 反复剔除依赖缺失的模块，直到不再变化
/// 4. 对剩余模块做拓扑排序
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyResolver;

impl DependencyResolver {
    /// 创建解析器
    pub fn new() -> Self {
        Self
    }

    /// 解析加载顺序
    ///
    /// # 参数
    ///
    /// * `container_ids` - 已注册的容器 ID，按迭代顺序
    /// * `descriptors` - 已发现的模块，容器内按发现顺序
    /// * `is_enabled` - 模块开关查询
    ///
    /// # 错误
    ///
    /// - `CoreError::MissingCoreModule` - 某个容器没有核心模块
    /// - 模块开关查询返回的错误
    pub fn resolve<F>(
        &self,
        container_ids: &[String],
        descriptors: &[&ModuleDescriptor],
        mut is_enabled: F,
    ) -> Result<Resolution>
    where
        F: FnMut(&ModuleDescriptor) -> Result<bool>,
    {
        let mut resolution = Resolution::default();

        for descriptor in descriptors {
            if !container_ids.iter().any(|id| *id == descriptor.container_id) {
                warn!(module = %descriptor.key(), "模块所属容器未注册，跳过加载");
                resolution.orphaned.push(descriptor.key());
            }
        }

        // 核心模块前置 + 配置过滤
        let mut candidates: Vec<&ModuleDescriptor> = Vec::new();
        let mut core_keys: HashMap<&str, DependencyKey> = HashMap::new();

        for container_id in container_ids {
            let mut modules: Vec<&ModuleDescriptor> = descriptors
                .iter()
                .copied()
                .filter(|d| d.container_id == *container_id)
                .collect();

            let core_pos = modules
                .iter()
                .position(|d| d.is_core)
                .ok_or_else(|| CoreError::MissingCoreModule(container_id.clone()))?;
            let core = modules.remove(core_pos);
            modules.insert(0, core);

            for extra in modules.iter().skip(1).filter(|d| d.is_core) {
                warn!(
                    container_id = %container_id,
                    module = %extra.key(),
                    core = %core.key(),
                    "容器存在多个核心模块，只有第一个生效"
                );
            }

            for descriptor in modules {
                if !is_enabled(descriptor)? {
                    debug!(module = %descriptor.key(), "模块已被配置禁用");
                    resolution.disabled.push(descriptor.key());
                    continue;
                }
                if std::ptr::eq(descriptor, core) {
                    core_keys.insert(container_id.as_str(), descriptor.key());
                }
                candidates.push(descriptor);
            }
        }

        let survivors = prune_missing(&candidates, &mut resolution);

        // 显式依赖 + 容器内对核心模块的隐式排序依赖
        let mut graph = DependencyGraph::new();
        for descriptor in &survivors {
            graph.add_module(&descriptor.key());
        }
        for descriptor in &survivors {
            let key = descriptor.key();
            for dependency in &descriptor.dependencies {
                graph.add_dependency(&key, dependency);
            }
            if let Some(core_key) = core_keys.get(descriptor.container_id.as_str()) {
                if *core_key != key && graph.contains_module(core_key) {
                    graph.add_dependency(&key, core_key);
                }
            }
        }

        let sorted = graph.sort();
        if !sorted.blocked.is_empty() {
            let cycle = graph
                .find_cycle()
                .map(|path| {
                    path.iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" -> ")
                })
                .unwrap_or_default();
            warn!(
                cycle = %cycle,
                modules = ?sorted.blocked.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "检测到循环依赖，相关模块跳过加载"
            );
        }

        resolution.order = sorted.order;
        resolution.cyclic = sorted.blocked;
        Ok(resolution)
    }
}

/// 剔除依赖缺失的模块
///
/// 与"反复扫描直到没有变化"得到相同的不动点：被剔除模块的依赖键随之移出候选集合，
/// 依赖它的模块再被检查。
fn prune_missing<'a>(
    candidates: &[&'a ModuleDescriptor],
    resolution: &mut Resolution,
) -> Vec<&'a ModuleDescriptor> {
    let keys: Vec<DependencyKey> = candidates.iter().map(|d| d.key()).collect();
    let index: HashMap<&DependencyKey, usize> =
        keys.iter().enumerate().map(|(i, k)| (k, i)).collect();

    let mut dependents: HashMap<&DependencyKey, Vec<usize>> = HashMap::new();
    for (i, descriptor) in candidates.iter().enumerate() {
        for dependency in &descriptor.dependencies {
            dependents.entry(dependency).or_default().push(i);
        }
    }

    let mut alive = vec![true; candidates.len()];
    let mut queue: VecDeque<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, d)| d.dependencies.iter().any(|dep| !index.contains_key(dep)))
        .map(|(i, _)| i)
        .collect();
    let mut removed: HashSet<usize> = HashSet::new();

    while let Some(i) = queue.pop_front() {
        if !alive[i] {
            continue;
        }
        alive[i] = false;
        removed.insert(i);

        let missing: Vec<DependencyKey> = candidates[i]
            .dependencies
            .iter()
            .filter(|dep| !index.get(dep).map(|&j| alive[j]).unwrap_or(false))
            .cloned()
            .collect();
        info!(
            module = %keys[i],
            missing = ?missing.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "模块缺少至少一个模块依赖，跳过加载"
        );
        resolution.missing.push((keys[i].clone(), missing));

        if let Some(list) = dependents.get(&keys[i]) {
            queue.extend(list.iter().copied().filter(|&j| alive[j]));
        }
    }

    candidates
        .iter()
        .enumerate()
        .filter(|(i, _)| !removed.contains(i))
        .map(|(_, d)| *d)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> DependencyKey {
        s.parse().unwrap()
    }

    fn module(decl: &str, deps: &[&str]) -> ModuleDescriptor {
        let k = key(decl);
        let mut descriptor = ModuleDescriptor::new(k.container(), k.module());
        for dep in deps {
            descriptor = descriptor.depends_on(key(dep));
        }
        descriptor
    }

    fn core(decl: &str, deps: &[&str]) -> ModuleDescriptor {
        module(decl, deps).as_core()
    }

    fn all_enabled(_: &ModuleDescriptor) -> Result<bool> {
        Ok(true)
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn order_strings(resolution: &Resolution) -> Vec<String> {
        resolution.order.iter().map(ToString::to_string).collect()
    }

    // ==================== DependencyGraph 测试 ====================

    #[test]
    fn test_dependency_graph_new() {
        let graph = DependencyGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.module_count(), 0);
    }

    #[test]
    fn test_add_module_duplicate() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_module(&key("x:a"));
        let again = graph.add_module(&key("x:a"));

        assert_eq!(a, again);
        assert_eq!(graph.module_count(), 1);
        assert!(graph.contains_module(&key("x:a")));
    }

    #[test]
    fn test_add_dependency_duplicate() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(&key("x:a"), &key("x:b"));
        graph.add_dependency(&key("x:a"), &key("x:b"));

        assert_eq!(graph.get_dependencies(&key("x:a")), vec![key("x:b")]);
        assert_eq!(graph.get_dependents(&key("x:b")), vec![key("x:a")]);
    }

    #[test]
    fn test_has_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(&key("x:a"), &key("x:b"));
        graph.add_dependency(&key("x:b"), &key("x:c"));
        assert!(!graph.has_cycle());

        graph.add_dependency(&key("x:c"), &key("x:a"));
        assert!(graph.has_cycle());
    }

    #[test]
    fn test_has_cycle_self_loop() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(&key("x:a"), &key("x:a"));
        assert_eq!(graph.find_cycle(), Some(vec![key("x:a"), key("x:a")]));
    }

    #[test]
    fn test_find_cycle_path() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(&key("x:a"), &key("x:b"));
        graph.add_dependency(&key("x:b"), &key("x:a"));

        let cycle = graph.find_cycle().unwrap();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 3);
    }

    #[test]
    fn test_sort_prefers_insertion_order() {
        let mut graph = DependencyGraph::new();
        graph.add_module(&key("x:c"));
        graph.add_module(&key("x:b"));
        graph.add_module(&key("x:a"));
        graph.add_dependency(&key("x:c"), &key("x:a"));

        let sorted = graph.sort();
        assert_eq!(sorted.order, vec![key("x:b"), key("x:a"), key("x:c")]);
        assert!(sorted.blocked.is_empty());
    }

    #[test]
    fn test_sort_with_cycle_blocks_dependents() {
        let mut graph = DependencyGraph::new();
        graph.add_module(&key("x:root"));
        graph.add_dependency(&key("x:a"), &key("x:b"));
        graph.add_dependency(&key("x:b"), &key("x:a"));
        graph.add_dependency(&key("x:c"), &key("x:a"));

        let sorted = graph.sort();
        assert_eq!(sorted.order, vec![key("x:root")]);
        assert_eq!(sorted.blocked, vec![key("x:a"), key("x:b"), key("x:c")]);
    }

    // ==================== DependencyResolver 测试 ====================

    #[test]
    fn test_resolver_simple_chain() {
        let c = core("x:core", &[]);
        let a = module("x:a", &["x:b"]);
        let b = module("x:b", &[]);

        let resolution = DependencyResolver::new()
            .resolve(&ids(&["x"]), &[&a, &b, &c], all_enabled)
            .unwrap();

        assert_eq!(order_strings(&resolution), vec!["x:core", "x:b", "x:a"]);
    }

    #[test]
    fn test_resolver_missing_core_is_fatal() {
        let a = module("x:a", &[]);
        let result = DependencyResolver::new().resolve(&ids(&["x"]), &[&a], all_enabled);
        assert!(matches!(result, Err(CoreError::MissingCoreModule(ref id)) if id == "x"));
    }

    #[test]
    fn test_resolver_empty_container_is_fatal() {
        let result = DependencyResolver::new().resolve(&ids(&["x"]), &[], all_enabled);
        assert!(matches!(result, Err(CoreError::MissingCoreModule(_))));
    }

    #[test]
    fn test_resolver_core_first_despite_dependencies() {
        // 核心模块依赖另一个容器的模块，容器内的其他模块仍排在核心之后
        let xc = core("x:core", &["y:core"]);
        let xa = module("x:a", &[]);
        let yc = core("y:core", &[]);

        let resolution = DependencyResolver::new()
            .resolve(&ids(&["x", "y"]), &[&xa, &xc, &yc], all_enabled)
            .unwrap();

        assert_eq!(order_strings(&resolution), vec!["y:core", "x:core", "x:a"]);
    }

    #[test]
    fn test_resolver_transitive_prune() {
        let c = core("x:core", &[]);
        let a = module("x:a", &["x:b"]);
        let b = module("x:b", &["x:gone"]);
        let d = module("x:d", &["x:a"]);

        let resolution = DependencyResolver::new()
            .resolve(&ids(&["x"]), &[&c, &a, &b, &d], all_enabled)
            .unwrap();

        assert_eq!(order_strings(&resolution), vec!["x:core"]);
        let missing: Vec<String> = resolution
            .missing
            .iter()
            .map(|(k, _)| k.to_string())
            .collect();
        assert_eq!(missing, vec!["x:b", "x:a", "x:d"]);
        assert_eq!(resolution.missing[0].1, vec![key("x:gone")]);
    }

    #[test]
    fn test_resolver_disabled_module_prunes_dependents() {
        let c = core("x:core", &[]);
        let a = module("x:a", &["x:b"]);
        let b = module("x:b", &[]);

        let resolution = DependencyResolver::new()
            .resolve(&ids(&["x"]), &[&c, &a, &b], |d: &ModuleDescriptor| {
                Ok(d.module_id != "b")
            })
            .unwrap();

        assert_eq!(order_strings(&resolution), vec!["x:core"]);
        assert_eq!(resolution.disabled, vec![key("x:b")]);
        assert_eq!(resolution.missing.len(), 1);
        assert!(!resolution.is_loaded(&key("x:a")));
    }

    #[test]
    fn test_resolver_cycle_excluded() {
        let c = core("x:core", &[]);
        let a = module("x:a", &["x:b"]);
        let b = module("x:b", &["x:a"]);
        let d = module("x:d", &[]);

        let resolution = DependencyResolver::new()
            .resolve(&ids(&["x"]), &[&c, &a, &b, &d], all_enabled)
            .unwrap();

        assert_eq!(order_strings(&resolution), vec!["x:core", "x:d"]);
        assert_eq!(resolution.cyclic, vec![key("x:a"), key("x:b")]);
    }

    #[test]
    fn test_resolver_orphaned_module() {
        let c = core("x:core", &[]);
        let stray = module("z:a", &[]);

        let resolution = DependencyResolver::new()
            .resolve(&ids(&["x"]), &[&c, &stray], all_enabled)
            .unwrap();

        assert_eq!(order_strings(&resolution), vec!["x:core"]);
        assert_eq!(resolution.orphaned, vec![key("z:a")]);
    }

    #[test]
    fn test_resolver_gate_error_propagates() {
        let c = core("x:core", &[]);
        let result = DependencyResolver::new().resolve(&ids(&["x"]), &[&c], |_: &ModuleDescriptor| {
            Err(CoreError::ConfigLoadFailed("broken".to_string()))
        });
        assert!(matches!(result, Err(CoreError::ConfigLoadFailed(_))));
    }

    #[test]
    fn test_resolver_idempotent() {
        let xc = core("x:core", &[]);
        let xa = module("x:a", &["y:b"]);
        let yc = core("y:core", &[]);
        let yb = module("y:b", &["x:core"]);
        let inputs = [&xa, &xc, &yb, &yc];

        let resolver = DependencyResolver::new();
        let first = resolver.resolve(&ids(&["x", "y"]), &inputs, all_enabled).unwrap();
        let second = resolver.resolve(&ids(&["x", "y"]), &inputs, all_enabled).unwrap();

        assert_eq!(first, second);
        assert_eq!(order_strings(&first), vec!["x:core", "y:core", "y:b", "x:a"]);
    }
}
