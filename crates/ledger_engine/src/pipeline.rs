//! Map, filter, override hook and output, composed once per extension point.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use ledger_core::{ConfigError, DataShapeError};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::hooks::{Hook, HookCapabilities, HookContext, HookRegistry, HookScope, NoCapabilities};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error(transparent)]
    DataShape(#[from] DataShapeError),
    #[error("\"{key}\" failed: {message}")]
    Runtime { key: String, message: String },
}

/// What a map stage produced for one raw value.
#[derive(Debug, Clone, PartialEq)]
pub enum Mapped<I> {
    None,
    One(I),
    Many(Vec<I>),
}

impl<I> Mapped<I> {
    pub fn into_vec(self) -> Vec<I> {
        match self {
            Mapped::None => Vec::new(),
            Mapped::One(item) => vec![item],
            Mapped::Many(items) => items,
        }
    }
}

impl<I> From<Vec<I>> for Mapped<I> {
    fn from(items: Vec<I>) -> Self {
        Mapped::Many(items)
    }
}

type MapStage<R, I> = Box<dyn Fn(&R, &HookContext) -> Result<Mapped<I>, DataShapeError> + Send + Sync>;
type FilterStage<R, I> = Box<dyn Fn(&R, &I, &HookContext) -> bool + Send + Sync>;
type OutputStage = Box<dyn Fn(Value, &HookContext) -> Result<(), PipelineError> + Send + Sync>;

/// Collects the stages of an [`ExtendFunction`].
///
/// `map` changes the item type and therefore clears a previously set filter;
/// set the filter after the map.
pub struct ExtendBuilder<R, I> {
    key: String,
    helpers: HookContext,
    map: MapStage<R, I>,
    filter: Option<FilterStage<R, I>>,
    output: Option<OutputStage>,
    capabilities: Arc<dyn HookCapabilities>,
}

impl<R: Clone + 'static> ExtendBuilder<R, R> {
    /// Builder for extension point `key` whose map passes the raw value through.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            helpers: HookContext::new(),
            map: Box::new(|raw: &R, _: &HookContext| Ok(Mapped::One(raw.clone()))),
            filter: None,
            output: None,
            capabilities: Arc::new(NoCapabilities),
        }
    }
}

impl<R: 'static, I: 'static> ExtendBuilder<R, I> {
    pub fn map<J, F>(self, map: F) -> ExtendBuilder<R, J>
    where
        F: Fn(&R, &HookContext) -> Result<Mapped<J>, DataShapeError> + Send + Sync + 'static,
    {
        ExtendBuilder {
            key: self.key,
            helpers: self.helpers,
            map: Box::new(map),
            filter: None,
            output: self.output,
            capabilities: self.capabilities,
        }
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&R, &I, &HookContext) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn output<F>(mut self, output: F) -> Self
    where
        F: Fn(Value, &HookContext) -> Result<(), PipelineError> + Send + Sync + 'static,
    {
        self.output = Some(Box::new(output));
        self
    }

    /// Platform helper visible to every stage under `name`.
    pub fn helper(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.helpers.insert(name, value);
        self
    }

    /// Caller-supplied data, exposed as `customData`.
    pub fn custom_data(self, data: Option<Map<String, Value>>) -> Self {
        self.helper("customData", Value::Object(data.unwrap_or_default()))
    }

    pub fn capabilities(mut self, capabilities: Arc<dyn HookCapabilities>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Resolve the override hook by name and freeze the stages.
    pub fn build(
        self,
        registry: &HookRegistry,
        hook_name: Option<&str>,
    ) -> Result<ExtendFunction<R, I>, ConfigError> {
        let hook = registry.resolve(&self.key, hook_name)?;
        let base = HookContext::new()
            .with("customData", Value::Object(Map::new()))
            .merged(&self.helpers);
        Ok(ExtendFunction {
            key: self.key,
            base,
            map: self.map,
            filter: self.filter,
            output: self.output,
            hook,
            hook_lock: Mutex::new(()),
            capabilities: self.capabilities,
        })
    }
}

/// A built pipeline, called once per raw value.
pub struct ExtendFunction<R, I> {
    key: String,
    base: HookContext,
    map: MapStage<R, I>,
    filter: Option<FilterStage<R, I>>,
    output: Option<OutputStage>,
    hook: Arc<dyn Hook>,
    hook_lock: Mutex<()>,
    capabilities: Arc<dyn HookCapabilities>,
}

impl<R: Serialize, I: Serialize> ExtendFunction<R, I> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Run `data` through every stage. Returns how many values reached the
    /// output stage.
    pub fn call(&self, data: &R, args: &HookContext) -> Result<usize, PipelineError> {
        let context = self.base.merged(args);
        let items = (self.map)(data, &context)?.into_vec();
        if items.is_empty() {
            return Ok(0);
        }

        let data_value = self.to_value(data)?;
        let mut emitted = 0;
        for item in items {
            if let Some(filter) = &self.filter {
                if !filter(data, &item, &context) {
                    continue;
                }
            }
            let item_value = self.to_value(&item)?;
            let result = self.invoke_hook(&context, &data_value, &item_value)?;
            for value in into_sequence(result) {
                if value.is_null() {
                    continue;
                }
                if let Some(output) = &self.output {
                    output(value, &context)?;
                }
                emitted += 1;
            }
        }
        Ok(emitted)
    }

    fn invoke_hook(
        &self,
        context: &HookContext,
        data: &Value,
        item: &Value,
    ) -> Result<Value, PipelineError> {
        let _serialized = self.hook_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let scope = HookScope {
            key: &self.key,
            context,
            data,
            item,
            capabilities: self.capabilities.as_ref(),
        };
        match catch_unwind(AssertUnwindSafe(|| self.hook.call(&scope))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(self.runtime(err.to_string())),
            Err(panic) => Err(self.runtime(panic_message(panic.as_ref()))),
        }
    }

    fn to_value<T: Serialize>(&self, value: &T) -> Result<Value, PipelineError> {
        serde_json::to_value(value).map_err(|err| self.runtime(err.to_string()))
    }

    fn runtime(&self, message: String) -> PipelineError {
        PipelineError::Runtime {
            key: self.key.clone(),
            message,
        }
    }
}

fn into_sequence(value: Value) -> Vec<Value> {
    match value {
        Value::Array(values) => values,
        other => vec![other],
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
