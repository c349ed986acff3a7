//! Runtime values of the sandbox and their JavaScript coercions.

use crate::error::SandboxError;
use crate::resolver::Exports;
use indexmap::IndexMap;
use smol_str::SmolStr;
use std::cell::RefCell;
use std::rc::Rc;

/// A shared, mutable object (reference semantics, like JS objects).
pub(crate) type ObjectRef = Rc<RefCell<IndexMap<SmolStr, Value>>>;
/// A shared, mutable array.
pub(crate) type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Native functions reachable from module code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Require,
}

#[derive(Debug, Clone)]
pub(crate) enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Builtin),
}

/// Deepest object nesting accepted when freezing exports.
const MAX_DEPTH: usize = 64;

impl Value {
    pub(crate) fn new_object(entries: IndexMap<SmolStr, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(entries)))
    }

    pub(crate) fn new_array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    /// Thaws the exports of another module into a fresh object.
    pub(crate) fn from_exports(exports: Exports) -> Self {
        Value::new_object(
            exports
                .iter()
                .map(|(key, value)| (key.clone(), Value::from_json(value)))
                .collect(),
        )
    }

    pub(crate) fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::new_array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::new_object(
                map.iter()
                    .map(|(key, value)| (SmolStr::new(key), Value::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Converts to JSON the way `JSON.stringify` would: `undefined` and
    /// functions vanish from objects and become `null` inside arrays.
    pub(crate) fn to_json(&self) -> Result<Option<serde_json::Value>, SandboxError> {
        self.to_json_at(0)
    }

    fn to_json_at(&self, depth: usize) -> Result<Option<serde_json::Value>, SandboxError> {
        if depth > MAX_DEPTH {
            return Err(SandboxError::Unsupported(
                "exported value is nested too deeply (cyclic?)".into(),
            ));
        }
        let json = match self {
            Value::Undefined | Value::Function(_) => return Ok(None),
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(
                items
                    .borrow()
                    .iter()
                    .map(|item| Ok(item.to_json_at(depth + 1)?.unwrap_or_default()))
                    .collect::<Result<_, SandboxError>>()?,
            ),
            Value::Object(object) => {
                let mut map = serde_json::Map::new();
                for (key, value) in object.borrow().iter() {
                    if let Some(json) = value.to_json_at(depth + 1)? {
                        map.insert(key.to_string(), json);
                    }
                }
                serde_json::Value::Object(map)
            }
        };
        Ok(Some(json))
    }

    pub(crate) fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    pub(crate) fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
        }
    }

    /// `ToString`.
    pub(crate) fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .borrow()
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_js_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".into(),
            Value::Function(_) => "function () { [native code] }".into(),
        }
    }

    /// `ToNumber`.
    pub(crate) fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Array(_) | Value::Object(_) | Value::Function(_) => f64::NAN,
        }
    }

    /// Property key for computed access (`obj[key]`).
    pub(crate) fn to_key(&self) -> SmolStr {
        SmolStr::new(self.to_js_string())
    }

    fn is_primitive_for_add(&self) -> bool {
        !matches!(
            self,
            Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_)
        )
    }
}

/// The binary `+` operator.
pub(crate) fn add(left: &Value, right: &Value) -> Value {
    if left.is_primitive_for_add() && right.is_primitive_for_add() {
        Value::Number(left.to_number() + right.to_number())
    } else {
        let mut out = left.to_js_string();
        out.push_str(&right.to_js_string());
        Value::String(out)
    }
}

/// Property read, `obj.key`.
pub(crate) fn member_get(object: &Value, key: &str) -> Result<Value, SandboxError> {
    let value = match object {
        Value::Undefined | Value::Null => {
            return Err(SandboxError::Type(format!(
                "Cannot read properties of {} (reading '{}')",
                object.to_js_string(),
                key
            )));
        }
        Value::Object(map) => map.borrow().get(key).cloned().unwrap_or(Value::Undefined),
        Value::Array(items) => {
            let items = items.borrow();
            if key == "length" {
                Value::Number(items.len() as f64)
            } else {
                index(key)
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or(Value::Undefined)
            }
        }
        Value::String(s) => {
            if key == "length" {
                Value::Number(s.encode_utf16().count() as f64)
            } else {
                index(key)
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or(Value::Undefined)
            }
        }
        Value::Bool(_) | Value::Number(_) | Value::Function(_) => Value::Undefined,
    };
    Ok(value)
}

/// Property write, `obj.key = value`.
pub(crate) fn member_set(object: &Value, key: SmolStr, value: Value) -> Result<(), SandboxError> {
    match object {
        Value::Object(map) => {
            map.borrow_mut().insert(key, value);
            Ok(())
        }
        Value::Array(items) => {
            if let Some(i) = index(&key) {
                let mut items = items.borrow_mut();
                if i >= items.len() {
                    items.resize(i + 1, Value::Undefined);
                }
                items[i] = value;
            }
            Ok(())
        }
        other => Err(SandboxError::Type(format!(
            "Cannot set properties of {} (setting '{}')",
            other.to_js_string(),
            key
        ))),
    }
}

/// Appends the elements of `source` to `target` (`[...source]`).
pub(crate) fn spread_into_array(target: &mut Vec<Value>, source: Value) -> Result<(), SandboxError> {
    match source {
        Value::Array(items) => target.extend(items.borrow().iter().cloned()),
        Value::String(s) => target.extend(s.chars().map(|c| Value::String(c.to_string()))),
        other => {
            return Err(SandboxError::Type(format!(
                "{} is not iterable",
                other.to_js_string()
            )));
        }
    }
    Ok(())
}

/// Copies the own enumerable properties of `source` into `target` (`{...source}`).
pub(crate) fn spread_into_object(target: &mut IndexMap<SmolStr, Value>, source: Value) {
    match source {
        Value::Object(map) => {
            for (key, value) in map.borrow().iter() {
                target.insert(key.clone(), value.clone());
            }
        }
        Value::Array(items) => {
            for (i, value) in items.borrow().iter().enumerate() {
                target.insert(SmolStr::new(i.to_string()), value.clone());
            }
        }
        Value::String(s) => {
            for (i, c) in s.chars().enumerate() {
                target.insert(SmolStr::new(i.to_string()), Value::String(c.to_string()));
            }
        }
        _ => {}
    }
}

fn index(key: &str) -> Option<usize> {
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse().ok()
}

pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.into()
    } else if n == n.trunc() && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n == n.trunc() && n.abs() < 9.0e15 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}
