//! Tool registry: descriptors, argument extraction and dispatch.

use super::protocol::{Tool, ToolCallResult};
use crate::error::{Result, UltimarrError};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, warn};

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    /// A string restricted to the listed values.
    Enum(&'static [&'static str]),
}

/// One declared tool parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

/// Declarative description of a tool, fixed at registration.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            params: Vec::new(),
        }
    }

    /// Add a required parameter.
    pub fn required(mut self, name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        self.params.push(ParamSpec {
            name,
            kind,
            required: true,
            description,
        });
        self
    }

    /// Add an optional parameter.
    pub fn optional(mut self, name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        self.params.push(ParamSpec {
            name,
            kind,
            required: false,
            description,
        });
        self
    }

    /// JSON Schema for the tool's arguments object.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            let schema = match param.kind {
                ParamKind::String => json!({"type": "string", "description": param.description}),
                ParamKind::Number => json!({"type": "number", "description": param.description}),
                ParamKind::Enum(values) => json!({
                    "type": "string",
                    "enum": values,
                    "description": param.description
                }),
            };
            properties.insert(param.name.to_string(), schema);
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }

    /// Wire form for `tools/list`.
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Arguments of one tool call, with typed extraction.
///
/// Anything other than a JSON object is treated as no arguments. `null`
/// values count as absent.
#[derive(Debug, Clone, Default)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn from_value(value: Option<Value>) -> Self {
        match value {
            Some(Value::Object(map)) => Self(map),
            _ => Self::default(),
        }
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    /// A required, non-empty string.
    pub fn required_str(&self, name: &str) -> Result<&str> {
        match self.get(name) {
            None => Err(UltimarrError::invalid_argument(name, "required string is missing")),
            Some(Value::String(s)) if s.trim().is_empty() => {
                Err(UltimarrError::invalid_argument(name, "must not be empty"))
            }
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(UltimarrError::invalid_argument(
                name,
                format!("expected string, got {}", json_type(other)),
            )),
        }
    }

    /// A required string converted by `parse`; `values` lists the accepted
    /// inputs for the error message.
    pub fn required_enum<T>(
        &self,
        name: &str,
        values: &[&str],
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<T> {
        let value = self.required_str(name).map_err(|_| {
            UltimarrError::invalid_argument(name, format!("expected one of {}", values.join(", ")))
        })?;
        parse(value).ok_or_else(|| {
            UltimarrError::invalid_argument(
                name,
                format!("expected one of {}, got '{}'", values.join(", "), value),
            )
        })
    }

    /// A required non-negative integer identifier.
    pub fn required_id(&self, name: &str) -> Result<i64> {
        self.optional_id(name)?
            .ok_or_else(|| UltimarrError::invalid_argument(name, "required number is missing"))
    }

    /// An optional non-negative integer identifier.
    pub fn optional_id(&self, name: &str) -> Result<Option<i64>> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        let id = integer(value).ok_or_else(|| {
            UltimarrError::invalid_argument(
                name,
                format!("expected integer number, got {}", describe(value)),
            )
        })?;
        if id < 0 {
            return Err(UltimarrError::invalid_argument(name, "must not be negative"));
        }
        Ok(Some(id))
    }

    /// An optional positive count, defaulting to `default`.
    pub fn optional_limit(&self, name: &str, default: u64) -> Result<u64> {
        match self.optional_id(name)? {
            None => Ok(default),
            Some(0) => Err(UltimarrError::invalid_argument(name, "must be at least 1")),
            Some(n) => Ok(n as u64),
        }
    }
}

/// Integer value of a JSON number, accepting integral floats like `42.0`.
fn integer(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    if let Some(n) = number.as_i64() {
        return Some(n);
    }
    let f = number.as_f64()?;
    (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

fn describe(value: &Value) -> String {
    match value {
        Value::Number(n) => format!("number {}", n),
        other => json_type(other).to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

type Handler = Box<dyn Fn(Arguments) -> BoxFuture<'static, Result<String>> + Send + Sync>;

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Handler,
}

/// Registry mapping tool names to descriptors and handlers.
///
/// Tools keep their registration order for `tools/list`.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under the descriptor's name, replacing any
    /// previous tool with that name.
    pub fn register<F, Fut>(&mut self, descriptor: ToolDescriptor, handler: F)
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        let tool = RegisteredTool {
            descriptor,
            handler: Box::new(move |args| handler(args).boxed()),
        };
        match self.index.get(tool.descriptor.name) {
            Some(&i) => self.tools[i] = tool,
            None => {
                self.index.insert(tool.descriptor.name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|t| &t.descriptor)
    }

    /// Wire definitions for `tools/list`.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.descriptors().map(ToolDescriptor::to_tool).collect()
    }

    /// Run the named tool and return its typed outcome.
    pub async fn call(&self, name: &str, arguments: Option<Value>) -> Result<String> {
        let tool = self
            .index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| UltimarrError::UnknownTool(name.to_string()))?;

        debug!(tool = name, "Calling tool");
        (tool.handler)(Arguments::from_value(arguments)).await
    }

    /// Run the named tool, converting any failure into an error result.
    pub async fn dispatch(&self, name: &str, arguments: Option<Value>) -> ToolCallResult {
        match self.call(name, arguments).await {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => {
                warn!(tool = name, error = %e, "Tool call failed");
                ToolCallResult::error(e.to_string())
            }
        }
    }
}
