//! # Item Definitions
//!
//! A definition declares one item: its name, the items it needs, and an async builder.
//!
//! ```rust
//! use item_holder::{ItemDefinition, ItemPack};
//!
//! struct Database { url: String }
//!
//! let db = ItemDefinition::new("db", |ctx| async move {
//!     let url = ctx.require::<String>("db_url")?;
//!     Ok(ItemPack::new(Database { url: url.to_string() })
//!         .with_destroy(|| async { Ok(()) })
//!         .into())
//! })
//! .need("db_url");
//!
//! assert_eq!(db.dependencies(), ["db_url"]);
//! ```
//!
//! A builder returns `Ok(None)` when its definition contributes no item, and an
//! [`ItemPack`] otherwise. The pack may carry a `stop` hook (end request handling) and a
//! `destroy` hook (release resources); most builders supply neither.
//!
//! [`Definition`] is what [`Holder::load`](crate::Holder::load) accepts: a standard definition,
//! a `type`-tagged [`CustomDefinition`] that an adapter turns into a standard one, or a
//! per-consumer template (see [`adapter`](crate::adapter)).

use crate::error::{BoxError, HolderError};
use crate::registry::{Item, ItemRegistry};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Async action run once during teardown.
pub type Hook = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>;

pub type BuildFuture = BoxFuture<'static, Result<Option<ItemPack>, BoxError>>;

pub(crate) type BuildFn = Arc<dyn Fn(BuildContext) -> BuildFuture + Send + Sync>;

/// What a builder hands back: the item itself plus optional teardown hooks.
#[derive(Default)]
pub struct ItemPack {
    pub(crate) item: Option<Item>,
    pub(crate) stop: Option<Hook>,
    pub(crate) destroy: Option<Hook>,
}

impl ItemPack {
    pub fn new<T: Any + Send + Sync>(item: T) -> Self {
        Self::from_item(Arc::new(item))
    }

    pub fn from_item(item: Item) -> Self {
        Self {
            item: Some(item),
            ..Self::default()
        }
    }

    /// A pack with no queryable item, for definitions that only contribute hooks.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_stop<F, Fut>(mut self, stop: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.stop = Some(Box::new(move || stop().boxed()));
        self
    }

    pub fn with_destroy<F, Fut>(mut self, destroy: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.destroy = Some(Box::new(move || destroy().boxed()));
        self
    }
}

impl fmt::Debug for ItemPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemPack")
            .field("item", &self.item.is_some())
            .field("stop", &self.stop.is_some())
            .field("destroy", &self.destroy.is_some())
            .finish()
    }
}

/// The view a builder gets: every item built so far, and nothing else.
#[derive(Debug, Clone)]
pub struct BuildContext {
    name: String,
    consumer: Option<String>,
    items: ItemRegistry,
}

impl BuildContext {
    pub(crate) fn new(name: String, consumer: Option<String>, items: ItemRegistry) -> Self {
        Self {
            name,
            consumer,
            items,
        }
    }

    /// The name of the definition being built. For per-consumer builds this is the
    /// template's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The definition this build serves, for per-consumer builds.
    pub fn consumer(&self) -> Option<&str> {
        self.consumer.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<Item> {
        self.items.get(name)
    }

    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.items.get_as(name)
    }

    /// Like [`get_as`](Self::get_as), but a missing or mistyped item is an error the builder
    /// can propagate with `?`.
    pub fn require<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, HolderError> {
        self.get_as(name).ok_or_else(|| HolderError::ItemUnavailable {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    pub fn items(&self) -> &ItemRegistry {
        &self.items
    }

    /// Makes the item stored under `from` also visible as `to`.
    pub(crate) fn alias(&mut self, from: &str, to: &str) {
        if let Some(item) = self.items.get(from) {
            self.items.insert(to, item);
        }
    }
}

/// Set on definitions produced by per-consumer expansion.
#[derive(Debug, Clone)]
pub(crate) struct Origin {
    pub(crate) template: String,
    pub(crate) consumer: String,
}

/// The standard definition shape.
#[derive(Clone)]
pub struct ItemDefinition {
    pub(crate) name: String,
    pub(crate) need: Vec<String>,
    pub(crate) build: BuildFn,
    pub(crate) origin: Option<Origin>,
}

impl ItemDefinition {
    pub fn new<F, Fut>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn(BuildContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<ItemPack>, BoxError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            need: Vec::new(),
            build: Arc::new(move |ctx| build(ctx).boxed()),
            origin: None,
        }
    }

    /// Adds one name to the `need` list.
    pub fn need(mut self, name: impl Into<String>) -> Self {
        self.need.push(name.into());
        self
    }

    pub fn needs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.need.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.need
    }

    /// `(name, consumer)` as reported to observers.
    pub(crate) fn label(&self) -> (&str, Option<&str>) {
        match &self.origin {
            Some(origin) => (&origin.template, Some(&origin.consumer)),
            None => (&self.name, None),
        }
    }
}

impl fmt::Debug for ItemDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemDefinition")
            .field("name", &self.name)
            .field("need", &self.need)
            .finish_non_exhaustive()
    }
}

/// A definition in a custom shape, identified by its `type` tag.
///
/// Custom definitions are plain data and can be deserialized:
///
/// ```rust
/// use item_holder::CustomDefinition;
///
/// let def: CustomDefinition = serde_json::from_str(
///     r#"{ "type": "add", "name": "sum", "need": "base", "a": 1, "b": 2 }"#,
/// ).unwrap();
/// assert_eq!(def.kind, "add");
/// assert_eq!(def.need, ["base"]);
/// assert_eq!(def.param::<i64>("b").unwrap(), 2);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CustomDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub need: Vec<String>,
    /// Every other field of the definition.
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl CustomDefinition {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            need: Vec::new(),
            params: serde_json::Map::new(),
        }
    }

    pub fn need(mut self, name: impl Into<String>) -> Self {
        self.need.push(name.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Deserializes one extra field.
    pub fn param<T: DeserializeOwned>(&self, key: &str) -> Result<T, BoxError> {
        let value = self
            .params
            .get(key)
            .ok_or_else(|| format!("definition '{}' has no field '{key}'", self.name))?;
        Ok(T::deserialize(value)?)
    }

    /// Deserializes all extra fields at once.
    pub fn params<T: DeserializeOwned>(&self) -> Result<T, BoxError> {
        let value = serde_json::Value::Object(self.params.clone());
        Ok(serde_json::from_value(value)?)
    }

    /// A standard definition with this definition's name and need.
    pub fn into_standard<F, Fut>(self, build: F) -> ItemDefinition
    where
        F: Fn(BuildContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<ItemPack>, BoxError>> + Send + 'static,
    {
        ItemDefinition::new(self.name, build).needs(self.need)
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(name) => vec![name],
        OneOrMany::Many(names) => names,
    })
}

/// Every definition shape accepted by `load`.
#[derive(Debug, Clone)]
pub enum Definition {
    Standard(ItemDefinition),
    Custom(CustomDefinition),
    /// Built once for each definition that needs it, never on its own.
    PerConsumer(ItemDefinition),
}

impl Definition {
    pub fn per_consumer(template: ItemDefinition) -> Self {
        Definition::PerConsumer(template)
    }

    pub fn name(&self) -> &str {
        match self {
            Definition::Standard(def) | Definition::PerConsumer(def) => def.name(),
            Definition::Custom(def) => &def.name,
        }
    }
}

impl From<ItemDefinition> for Definition {
    fn from(def: ItemDefinition) -> Self {
        Definition::Standard(def)
    }
}

impl From<CustomDefinition> for Definition {
    fn from(def: CustomDefinition) -> Self {
        Definition::Custom(def)
    }
}
