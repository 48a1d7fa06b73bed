use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// 預設的圖層來源。 / Layer source used for snap targets by default.
pub const LOCAL_SOURCE: &str = "local";

/// 供幾何吸附使用的圖層參考。 / A named layer reference used by feature snapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapTarget {
    pub source: String,
    pub name: String,
}

impl SnapTarget {
    pub fn new(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self::new(LOCAL_SOURCE, name)
    }
}

/// 已登錄名稱的有序集合，僅存在於本次工作階段。 / Insertion-ordered set of registered names, never persisted.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    /// 加入名稱；已存在時回傳 `false`。 / Adds `name`, returning `false` when it was already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.seen.contains(&name) {
            return false;
        }
        self.seen.insert(name.clone());
        self.order.push(name);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
