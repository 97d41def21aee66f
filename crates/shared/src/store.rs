//! 内存存储
//!
//! 使用 DashMap 实现的高并发内存存储，为仓储层提供文档存储语义的
//! 按键 upsert、点查与谓词筛选。写入是以键为粒度的独立点更新，
//! 不做跨行锁，后写覆盖先写。

use dashmap::DashMap;
use std::sync::Arc;

/// 通用内存存储
///
/// 返回值均为克隆，调用方不持有内部锁。
#[derive(Debug)]
pub struct MemoryStore<T> {
    data: Arc<DashMap<String, T>>,
}

impl<T: Clone> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
        }
    }

    /// 插入或更新数据
    ///
    /// key 已存在时覆盖原有数据（upsert 语义）
    pub fn insert(&self, id: &str, value: T) {
        self.data.insert(id.to_string(), value);
    }

    /// 获取数据
    pub fn get(&self, id: &str) -> Option<T> {
        self.data.get(id).map(|v| v.clone())
    }

    /// 就地更新数据
    ///
    /// key 存在时对其应用修改函数并返回 true；不存在时返回 false
    pub fn update<F>(&self, id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        match self.data.get_mut(id) {
            Some(mut entry) => {
                mutate(entry.value_mut());
                true
            }
            None => false,
        }
    }

    /// 删除数据
    ///
    /// 返回被删除的数据；key 不存在时返回 None，不视为错误
    pub fn remove(&self, id: &str) -> Option<T> {
        self.data.remove(id).map(|(_, v)| v)
    }

    /// 按条件筛选数据
    pub fn list_by<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.data
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// 检查是否存在指定 key
    pub fn contains(&self, id: &str) -> bool {
        self.data.contains_key(id)
    }

    /// 获取数据总数
    pub fn count(&self) -> usize {
        self.data.len()
    }

    /// 清空所有数据
    pub fn clear(&self) {
        self.data.clear();
    }
}

impl<T: Clone> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct TestDoc {
        id: String,
        active: bool,
    }

    #[test]
    fn test_store_upsert_overwrites() {
        let store: MemoryStore<TestDoc> = MemoryStore::new();

        store.insert(
            "t1",
            TestDoc {
                id: "t1".to_string(),
                active: true,
            },
        );
        store.insert(
            "t1",
            TestDoc {
                id: "t1".to_string(),
                active: false,
            },
        );

        // 同键插入是覆盖而非新增
        assert_eq!(store.count(), 1);
        assert!(!store.get("t1").unwrap().active);
    }

    #[test]
    fn test_store_update_in_place() {
        let store: MemoryStore<TestDoc> = MemoryStore::new();
        store.insert(
            "t1",
            TestDoc {
                id: "t1".to_string(),
                active: true,
            },
        );

        assert!(store.update("t1", |doc| doc.active = false));
        assert!(!store.get("t1").unwrap().active);

        // 不存在的 key 返回 false
        assert!(!store.update("missing", |doc| doc.active = false));
    }

    #[test]
    fn test_store_remove_missing_is_noop() {
        let store: MemoryStore<TestDoc> = MemoryStore::new();
        assert!(store.remove("missing").is_none());
    }

    #[test]
    fn test_store_list_by_predicate() {
        let store: MemoryStore<TestDoc> = MemoryStore::new();
        for (id, active) in [("a", true), ("b", false), ("c", true)] {
            store.insert(
                id,
                TestDoc {
                    id: id.to_string(),
                    active,
                },
            );
        }

        let active = store.list_by(|doc| doc.active);
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|doc| doc.active));
    }

    #[test]
    fn test_store_clone_shares_data() {
        let store: MemoryStore<TestDoc> = MemoryStore::new();
        let clone = store.clone();

        store.insert(
            "t1",
            TestDoc {
                id: "t1".to_string(),
                active: true,
            },
        );
        assert!(clone.contains("t1"));
    }
}
