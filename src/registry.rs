//! # Item Registry
//!
//! Name → built value. The holder owns one registry that grows as items finish building;
//! every builder receives a snapshot of it inside its [`BuildContext`](crate::BuildContext).

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// A built value. The holder never looks inside it.
pub type Item = Arc<dyn Any + Send + Sync>;

#[derive(Clone, Default)]
pub struct ItemRegistry {
    items: HashMap<String, Item>,
}

impl ItemRegistry {
    pub(crate) fn insert(&mut self, name: impl Into<String>, item: Item) {
        self.items.insert(name.into(), item);
    }

    /// The stored value exactly as the builder produced it, or `None` if nothing was stored
    /// under `name`.
    pub fn get(&self, name: &str) -> Option<Item> {
        self.items.get(name).cloned()
    }

    /// Like [`get`](Self::get), downcast to `T`. `None` also when the item has another type.
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.get(name).and_then(|item| item.downcast::<T>().ok())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl std::fmt::Debug for ItemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("ItemRegistry").field("items", &names).finish()
    }
}
