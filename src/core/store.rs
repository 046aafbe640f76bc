//! 配置存储
//!
//! 基于 TOML 文档的键值存储：分节（表）、每个键可带多行注释。读取一次，
//! 仅在有未保存修改时写回一次。键名按 TOML 规则自动加引号，任何合法的
//! 依赖键都能原样写回。
//!
//! # 文件格式
//!
//! ```toml
//! # 节注释
//! [modules]
//!
//! # 键注释第一行
//! # 键注释第二行
//! "example:core" = true
//! ```

use std::path::{Path, PathBuf};

use toml_edit::{DocumentMut, Item, Table, Value};
use tracing::{debug, info, warn};

use crate::utils::Result;

/// 配置项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// 原始值
    pub value: String,
    /// 注释（可多行）
    pub comment: Option<String>,
}

impl Property {
    /// 解析为布尔值
    pub fn as_bool(&self) -> Option<bool> {
        parse_bool(&self.value)
    }
}

/// 配置存储
#[derive(Debug)]
pub struct ConfigStore {
    /// 文件路径
    path: PathBuf,
    /// TOML 文档，保留注释和格式
    doc: DocumentMut,
    /// 是否有未保存的修改
    changed: bool,
}

impl ConfigStore {
    /// 创建指向给定路径的空存储，不读取文件
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            doc: DocumentMut::new(),
            changed: false,
        }
    }

    /// 打开存储：文件存在则读取，否则为空存储
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::new(path);
        store.load()?;
        Ok(store)
    }

    /// 从文件读取内容，替换当前内容
    pub fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "配置文件不存在，使用空配置");
            self.doc = DocumentMut::new();
            return Ok(());
        }

        let content = std::fs::read_to_string(&self.path)?;
        self.doc = content.parse::<DocumentMut>()?;
        self.changed = false;
        debug!(path = %self.path.display(), sections = self.doc.len(), "配置文件已读取");
        Ok(())
    }

    /// 文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取布尔配置项，不存在时以默认值创建
    ///
    /// 创建新配置项或修复无法解析的值都会标记存储为已修改。注释总是更新为最新内容。
    pub fn get_bool(&mut self, section: &str, key: &str, default: bool, comment: &str) -> bool {
        let (value, changed) = {
            let Some(table) = self.section_mut(section) else {
                return default;
            };
            let current = table.get(key).map(item_as_bool);

            let outcome = match current {
                Some(Some(value)) => (value, false),
                Some(None) => {
                    warn!(key, default, "配置值无法解析为布尔值，重置为默认值");
                    if let Some(item) = table.get_mut(key) {
                        *item = toml_edit::value(default);
                    }
                    (default, true)
                }
                None => {
                    table.insert(key, toml_edit::value(default));
                    (default, true)
                }
            };

            if let Some(mut k) = table.key_mut(key) {
                k.leaf_decor_mut().set_prefix(comment_prefix(comment));
            }
            outcome
        };

        self.changed |= changed;
        value
    }

    /// 写入布尔配置项
    ///
    /// # Returns
    ///
    /// 值是否发生了变化
    pub fn set_bool(&mut self, section: &str, key: &str, value: bool) -> bool {
        let changed = {
            let Some(table) = self.section_mut(section) else {
                return false;
            };
            match table.get_mut(key) {
                Some(item) if item_as_bool(item) == Some(value) => false,
                Some(item) => {
                    *item = toml_edit::value(value);
                    true
                }
                None => {
                    table.insert(key, toml_edit::value(value));
                    if let Some(mut k) = table.key_mut(key) {
                        k.leaf_decor_mut().set_prefix("\n");
                    }
                    true
                }
            }
        };

        self.changed |= changed;
        changed
    }

    /// 读取配置项
    pub fn get(&self, section: &str, key: &str) -> Option<Property> {
        let table = self.doc.get(section)?.as_table()?;
        let item = table.get(key)?;
        Some(Property {
            value: item_text(item),
            comment: table
                .key(key)
                .and_then(|k| k.leaf_decor().prefix())
                .and_then(|raw| raw.as_str())
                .and_then(parse_comment),
        })
    }

    /// 设置节注释
    pub fn set_section_comment(&mut self, section: &str, comment: &str) {
        if let Some(table) = self.section_mut(section) {
            table.decor_mut().set_prefix(comment_lines(comment));
        }
    }

    /// 节注释
    pub fn section_comment(&self, section: &str) -> Option<String> {
        self.doc
            .get(section)?
            .as_table()?
            .decor()
            .prefix()?
            .as_str()
            .and_then(parse_comment)
    }

    /// 按键排序列出节中的配置项
    pub fn entries(&self, section: &str) -> Vec<(String, Property)> {
        let Some(table) = self.doc.get(section).and_then(Item::as_table) else {
            return Vec::new();
        };

        let mut entries: Vec<(String, Property)> = table
            .iter()
            .filter_map(|(key, _)| Some((key.to_string(), self.get(section, key)?)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// 是否有未保存的修改
    pub fn has_changed(&self) -> bool {
        self.changed
    }

    /// 写回文件，必要时创建父目录
    pub fn save(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, self.render())?;
        self.changed = false;
        info!(path = %self.path.display(), "配置文件已保存");
        Ok(())
    }

    /// 渲染为文本
    pub fn render(&self) -> String {
        self.doc.to_string()
    }

    /// 取得配置节，不存在时创建，类型不对时替换为空表
    fn section_mut(&mut self, section: &str) -> Option<&mut Table> {
        match self.doc.get(section).map(Item::is_table) {
            Some(true) => {}
            Some(false) => {
                warn!(section, "配置节不是表，重置为空表");
                self.doc.insert(section, toml_edit::table());
                self.changed = true;
            }
            None => {
                self.doc.insert(section, toml_edit::table());
            }
        }
        self.doc.get_mut(section).and_then(Item::as_table_mut)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn item_as_bool(item: &Item) -> Option<bool> {
    match item.as_value()? {
        Value::Boolean(b) => Some(*b.value()),
        Value::String(s) => parse_bool(s.value()),
        _ => None,
    }
}

fn item_text(item: &Item) -> String {
    match item.as_value() {
        Some(Value::Boolean(b)) => b.value().to_string(),
        Some(Value::String(s)) => s.value().clone(),
        Some(value) => value.to_string().trim().to_string(),
        None => item.to_string().trim().to_string(),
    }
}

/// 注释文本转换为 `#` 行，空行写为单独的 `#`
fn comment_lines(comment: &str) -> String {
    comment
        .lines()
        .map(|line| {
            if line.is_empty() {
                "#\n".to_string()
            } else {
                format!("# {line}\n")
            }
        })
        .collect()
}

/// 键前缀：空行分隔，然后是注释
fn comment_prefix(comment: &str) -> String {
    format!("\n{}", comment_lines(comment))
}

/// 从装饰前缀中提取注释文本，忽略空白行
fn parse_comment(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix('#'))
        .map(|line| line.strip_prefix(' ').unwrap_or(line))
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}
