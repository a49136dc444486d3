//! # Adapters & Definition Preparation
//!
//! Before anything is sorted or built, the raw definition set is turned into a flat list of
//! standard [`ItemDefinition`]s:
//!
//! 1. Raw names are checked for duplicates.
//! 2. Each [`CustomDefinition`] goes through the adapter registered for its `type`.
//! 3. Each per-consumer template is expanded into one definition per consumer.
//! 4. Names are checked again, since expansion introduces new ones.
//!
//! All of this happens before the first builder runs, so a missing adapter or a colliding name
//! never leaves a half-built holder behind.
//!
//! ## Per-consumer templates
//!
//! A template `T` needed by `C` becomes a definition named `T@C` that needs what `T` needs and
//! runs `T`'s builder with [`BuildContext::consumer`] set to `C`. `C` needs `T@C` instead of `T`
//! and still finds the result under `T` in its context. A template nobody needs is never built.
//! A consumer that lists `T` more than once still gets a single instance.
//!
//! Instances are ordinary items of the holder: once loaded, `holder.get_item("T@C")` returns the
//! value built for `C`, while `holder.get_item("T")` returns `None`.

use crate::definition::{BuildContext, BuildFn, CustomDefinition, Definition, ItemDefinition, Origin};
use crate::error::{BoxError, HolderError};
use crate::graph::check_unique_definitions;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Normalizes a custom definition into the standard shape.
pub type Adapter = Arc<dyn Fn(CustomDefinition) -> Result<ItemDefinition, BoxError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Adapter>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adapter` for definitions whose `type` is `kind`, replacing any previous one.
    pub fn register<F>(&mut self, kind: impl Into<String>, adapter: F)
    where
        F: Fn(CustomDefinition) -> Result<ItemDefinition, BoxError> + Send + Sync + 'static,
    {
        self.adapters.insert(kind.into(), Arc::new(adapter));
    }

    pub fn get(&self, kind: &str) -> Option<&Adapter> {
        self.adapters.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.adapters.contains_key(kind)
    }

    pub(crate) fn adapt(&self, custom: CustomDefinition) -> Result<ItemDefinition, HolderError> {
        let adapter = self.get(&custom.kind).ok_or_else(|| HolderError::UnknownAdapter {
            kind: custom.kind.clone(),
            name: custom.name.clone(),
        })?;
        let (kind, name) = (custom.kind.clone(), custom.name.clone());
        debug!(%kind, %name, "adapting definition");
        adapter(custom).map_err(|source| HolderError::AdapterFailed { kind, name, source })
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&String> = self.adapters.keys().collect();
        kinds.sort_unstable();
        f.debug_struct("AdapterRegistry").field("kinds", &kinds).finish()
    }
}

/// Turns the raw definition set into standard definitions, in their original relative order.
pub(crate) fn prepare_definitions(
    definitions: Vec<Definition>,
    adapters: &AdapterRegistry,
) -> Result<Vec<ItemDefinition>, HolderError> {
    check_unique_definitions(definitions.iter().map(Definition::name))?;

    // every adapter must exist before any of them runs
    for definition in &definitions {
        if let Definition::Custom(custom) = definition {
            if !adapters.contains(&custom.kind) {
                return Err(HolderError::UnknownAdapter {
                    kind: custom.kind.clone(),
                    name: custom.name.clone(),
                });
            }
        }
    }

    let mut standard = Vec::with_capacity(definitions.len());
    let mut templates = HashMap::new();
    for definition in definitions {
        match definition {
            Definition::Standard(def) => standard.push(def),
            Definition::Custom(custom) => standard.push(adapters.adapt(custom)?),
            Definition::PerConsumer(template) => {
                templates.insert(template.name.clone(), template);
            }
        }
    }

    let prepared = if templates.is_empty() {
        standard
    } else {
        expand_per_consumer(standard, &templates)
    };
    check_unique_definitions(prepared.iter().map(ItemDefinition::name))?;
    Ok(prepared)
}

fn expand_per_consumer(
    definitions: Vec<ItemDefinition>,
    templates: &HashMap<String, ItemDefinition>,
) -> Vec<ItemDefinition> {
    let mut expanded = Vec::with_capacity(definitions.len());
    for mut consumer in definitions {
        let mut aliases: Vec<(String, String)> = Vec::new();
        for need in consumer.need.iter_mut() {
            let Some(template) = templates.get(need.as_str()) else {
                continue;
            };
            let instance = format!("{}@{}", template.name, consumer.name);
            // a repeated need shares the instance already expanded for this consumer
            if aliases.iter().any(|(existing, _)| *existing == instance) {
                *need = instance;
                continue;
            }
            debug!(template = %template.name, consumer = %consumer.name, "expanding per-consumer definition");
            expanded.push(ItemDefinition {
                name: instance.clone(),
                need: template.need.clone(),
                build: template.build.clone(),
                origin: Some(Origin {
                    template: template.name.clone(),
                    consumer: consumer.name.clone(),
                }),
            });
            aliases.push((instance.clone(), template.name.clone()));
            *need = instance;
        }
        if !aliases.is_empty() {
            consumer.build = with_aliases(consumer.build, aliases);
        }
        expanded.push(consumer);
    }
    expanded
}

fn with_aliases(build: BuildFn, aliases: Vec<(String, String)>) -> BuildFn {
    Arc::new(move |mut ctx: BuildContext| {
        for (instance, template) in &aliases {
            ctx.alias(instance, template);
        }
        build(ctx)
    })
}
