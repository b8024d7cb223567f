use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value, json};

/// Built-in aggregation operators for `BinaryOperatorAggregate`.
#[derive(Clone)]
pub enum AggregateOp {
    /// Add numbers. Integers stay integers unless the sum overflows.
    Sum,
    /// Keep the larger number.
    Max,
    /// Keep the smaller number.
    Min,
    /// Combine with an arbitrary function of `(current, update)`.
    Custom(Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>),
}

impl std::fmt::Debug for AggregateOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateOp::Sum => write!(f, "Sum"),
            AggregateOp::Max => write!(f, "Max"),
            AggregateOp::Min => write!(f, "Min"),
            AggregateOp::Custom(_) => write!(f, "Custom(...)"),
        }
    }
}

impl AggregateOp {
    fn apply(&self, current: &Value, update: &Value) -> Value {
        match self {
            AggregateOp::Sum => add_numbers(current, update),
            AggregateOp::Max => pick_number(current, update, |a, b| b > a),
            AggregateOp::Min => pick_number(current, update, |a, b| b < a),
            AggregateOp::Custom(f) => f(current, update),
        }
    }
}

fn add_numbers(a: &Value, b: &Value) -> Value {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return json!(sum);
        }
    }
    json!(a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0))
}

/// Keep `current` unless `update` is a number that `replaces` it.
fn pick_number(current: &Value, update: &Value, replaces: fn(f64, f64) -> bool) -> Value {
    match (current.as_f64(), update.as_f64()) {
        (_, None) => current.clone(),
        (None, Some(_)) => update.clone(),
        (Some(a), Some(b)) if replaces(a, b) => update.clone(),
        _ => current.clone(),
    }
}

/// How a state field merges updates. Fixed when the graph is built.
#[derive(Clone, Debug)]
pub enum ChannelSpec {
    /// Replace the value; the last merged write wins.
    LastValue { default: Value },
    /// Concatenate writes into a list.
    Append,
    /// Fold writes into the value with an operator.
    BinaryOperator { default: Value, op: AggregateOp },
}

impl ChannelSpec {
    /// Create a fresh `Channel` instance from this spec.
    pub fn create(&self) -> Box<dyn Channel> {
        match self {
            ChannelSpec::LastValue { default } => Box::new(LastValue::new(default.clone())),
            ChannelSpec::Append => Box::new(AppendChannel::new()),
            ChannelSpec::BinaryOperator { default, op } => {
                Box::new(BinaryOperatorAggregate::new(default.clone(), op.clone()))
            }
        }
    }
}

/// A channel owns a single field of the graph state and decides how a
/// task's write for that field merges with the current value.
pub trait Channel: Send + Sync {
    /// Merge one write. Returns `true` if the value changed.
    fn update(&mut self, value: Value) -> bool;

    /// Get the current value of the channel.
    fn get(&self) -> &Value;

    /// Serializable snapshot of the channel.
    fn checkpoint(&self) -> Value;

    /// Restore from a snapshot produced by `checkpoint`.
    fn restore(&mut self, data: Value);
}

/// Keeps only the most recently merged value.
pub struct LastValue {
    value: Value,
}

impl LastValue {
    pub fn new(default: Value) -> Self {
        Self { value: default }
    }
}

impl Channel for LastValue {
    fn update(&mut self, value: Value) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        true
    }

    fn get(&self) -> &Value {
        &self.value
    }

    fn checkpoint(&self) -> Value {
        self.value.clone()
    }

    fn restore(&mut self, data: Value) {
        self.value = data;
    }
}

/// Appends writes to a JSON array. An array write contributes each of its
/// elements; any other value contributes itself.
pub struct AppendChannel {
    items: Vec<Value>,
    /// Cached JSON array so `get()` can return `&Value`.
    cached: Value,
}

impl AppendChannel {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            cached: Value::Array(Vec::new()),
        }
    }

    fn rebuild_cache(&mut self) {
        self.cached = Value::Array(self.items.clone());
    }
}

impl Default for AppendChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for AppendChannel {
    fn update(&mut self, value: Value) -> bool {
        match value {
            Value::Array(arr) if arr.is_empty() => return false,
            Value::Array(arr) => self.items.extend(arr),
            other => self.items.push(other),
        }
        self.rebuild_cache();
        true
    }

    fn get(&self) -> &Value {
        &self.cached
    }

    fn checkpoint(&self) -> Value {
        self.cached.clone()
    }

    fn restore(&mut self, data: Value) {
        self.items = match data {
            Value::Array(arr) => arr,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        self.rebuild_cache();
    }
}

/// Folds each write into the current value with an `AggregateOp`.
pub struct BinaryOperatorAggregate {
    value: Value,
    op: AggregateOp,
}

impl BinaryOperatorAggregate {
    pub fn new(default: Value, op: AggregateOp) -> Self {
        Self { value: default, op }
    }
}

impl Channel for BinaryOperatorAggregate {
    fn update(&mut self, value: Value) -> bool {
        let next = self.op.apply(&self.value, &value);
        if next == self.value {
            return false;
        }
        self.value = next;
        true
    }

    fn get(&self) -> &Value {
        &self.value
    }

    fn checkpoint(&self) -> Value {
        self.value.clone()
    }

    fn restore(&mut self, data: Value) {
        self.value = data;
    }
}

/// The live channels of one run.
///
/// Declared fields use their spec; a field first written without a spec gets
/// a `LastValue` channel.
pub struct Channels {
    channels: HashMap<String, Box<dyn Channel>>,
}

impl Channels {
    /// Fresh channels for every declared field.
    pub fn new(specs: &HashMap<String, ChannelSpec>) -> Self {
        Self {
            channels: specs
                .iter()
                .map(|(name, spec)| (name.clone(), spec.create()))
                .collect(),
        }
    }

    /// Channels restored from a snapshot taken with [`Channels::values`].
    pub fn from_values(
        specs: &HashMap<String, ChannelSpec>,
        values: &HashMap<String, Value>,
    ) -> Self {
        let mut channels = Self::new(specs);
        for (name, value) in values {
            channels.channel_mut(name).restore(value.clone());
        }
        channels
    }

    fn channel_mut(&mut self, name: &str) -> &mut Box<dyn Channel> {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| Box::new(LastValue::new(Value::Null)))
    }

    /// Merge every field of a partial update.
    pub fn apply(&mut self, update: &Map<String, Value>) {
        for (name, value) in update {
            self.channel_mut(name).update(value.clone());
        }
    }

    /// Current state as a JSON object.
    pub fn state(&self) -> Value {
        Value::Object(
            self.channels
                .iter()
                .map(|(name, ch)| (name.clone(), ch.get().clone()))
                .collect(),
        )
    }

    /// Snapshot of every channel.
    pub fn values(&self) -> HashMap<String, Value> {
        self.channels
            .iter()
            .map(|(name, ch)| (name.clone(), ch.checkpoint()))
            .collect()
    }
}
