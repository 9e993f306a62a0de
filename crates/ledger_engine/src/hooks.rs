//! Named override plugins for the extension points of a crawl.
//!
//! A run picks at most one hook per extension point by name from a
//! [`HookRegistry`]. The hook is resolved once when the pipeline is built and
//! then invoked for every record through [`Hook::call`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ledger_core::ConfigError;
use ledger_logging::ledger_info;
use serde_json::{Map, Value};

pub const IDENTITY: &str = "identity";
pub const SKIP_EMPTY_HISTORY: &str = "skip_empty_history";
pub const ATTACH_CUSTOM_DATA: &str = "attach_custom_data";
pub const LOG_LABEL: &str = "log_label";

/// Read-only JSON bag handed to every stage of a pipeline call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookContext(Map<String, Value>);

impl HookContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn label(&self) -> Option<&str> {
        self.get("label").and_then(Value::as_str)
    }

    /// A new context where keys of `later` replace keys of `self`.
    pub fn merged(&self, later: &HookContext) -> HookContext {
        let mut merged = self.0.clone();
        for (key, value) in &later.0 {
            merged.insert(key.clone(), value.clone());
        }
        HookContext(merged)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for HookContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Operations a hook may perform on the running crawl.
pub trait HookCapabilities: Send + Sync {
    /// Queue another address. Returns `false` when it is invalid or already known.
    fn add_address(&self, address: &str) -> bool;

    /// Queue transaction page `page` of an address whose summary was already
    /// read. Returns `false` when nothing was queued.
    fn enqueue_page(&self, _address: &str, _page: u32) -> bool {
        false
    }

    /// Push an extra raw record through the output pipeline, with its
    /// dedup, quota and date checks. Returns how many records were emitted.
    fn emit(&self, _record: Value) -> Result<usize, HookError> {
        Err(HookError::from("emitting records is not available here"))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapabilities;

impl HookCapabilities for NoCapabilities {
    fn add_address(&self, _address: &str) -> bool {
        false
    }
}

/// Everything a hook sees for one invocation.
pub struct HookScope<'a> {
    /// Extension point name, e.g. `extendOutputFunction`.
    pub key: &'a str,
    pub context: &'a HookContext,
    /// The raw value the pipeline was called with.
    pub data: &'a Value,
    /// The mapped item that passed the filter.
    pub item: &'a Value,
    pub capabilities: &'a dyn HookCapabilities,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// An override for one extension point. The returned value may be `null`
/// (nothing emitted), a single value, or an array of values.
pub trait Hook: Send + Sync {
    fn call(&self, scope: &HookScope<'_>) -> Result<Value, HookError>;
}

impl<F> Hook for F
where
    F: Fn(&HookScope<'_>) -> Result<Value, HookError> + Send + Sync,
{
    fn call(&self, scope: &HookScope<'_>) -> Result<Value, HookError> {
        self(scope)
    }
}

#[derive(Clone)]
pub struct HookRegistry {
    hooks: BTreeMap<String, Arc<dyn Hook>>,
}

impl HookRegistry {
    /// Registry without any hook, not even `identity`.
    pub fn empty() -> Self {
        Self {
            hooks: BTreeMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry
            .register(IDENTITY, identity)
            .register(SKIP_EMPTY_HISTORY, skip_empty_history)
            .register(ATTACH_CUSTOM_DATA, attach_custom_data)
            .register(LOG_LABEL, log_label);
        registry
    }

    /// Add or replace a hook under `name`.
    pub fn register(&mut self, name: impl Into<String>, hook: impl Hook + 'static) -> &mut Self {
        self.hooks.insert(name.into(), Arc::new(hook));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.hooks.keys().map(String::as_str)
    }

    /// Look up the override for extension point `key`. A missing or blank
    /// name selects the identity hook.
    pub fn resolve(&self, key: &str, name: Option<&str>) -> Result<Arc<dyn Hook>, ConfigError> {
        let name = name.map(str::trim).filter(|name| !name.is_empty());
        match name {
            None => Ok(Arc::new(identity)),
            Some(name) => self
                .hooks
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownHook {
                    key: key.to_string(),
                    name: name.to_string(),
                }),
        }
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.hooks.keys()).finish()
    }
}

fn identity(scope: &HookScope<'_>) -> Result<Value, HookError> {
    Ok(scope.item.clone())
}

/// Drops records that stand for an address without transactions.
fn skip_empty_history(scope: &HookScope<'_>) -> Result<Value, HookError> {
    match scope.item.get("tx") {
        Some(Value::Null) => Ok(Value::Null),
        _ => Ok(scope.item.clone()),
    }
}

fn attach_custom_data(scope: &HookScope<'_>) -> Result<Value, HookError> {
    let mut item = scope.item.clone();
    if let Value::Object(fields) = &mut item {
        let custom = scope
            .context
            .get("customData")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        fields.insert("customData".to_string(), custom);
    }
    Ok(item)
}

fn log_label(scope: &HookScope<'_>) -> Result<Value, HookError> {
    match scope.context.label() {
        Some(label) => ledger_info!("{}: {label}", scope.key),
        None => ledger_info!("{}: record for {}", scope.key, scope.item["address"]),
    }
    Ok(scope.item.clone())
}
