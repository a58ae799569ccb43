//! JSON value tree and pretty-printer.
//!
//! # Design
//! `JsonValue` is a strict owned tree: containers own their children and
//! nothing is shared. Two variants are not JSON values at all:
//! `EndOfInput` marks "no value here" (empty text, a closed container, or a
//! missing object key) and `Error` carries a parse diagnostic. Lookups that
//! miss return a shared `EndOfInput`, so a caller can tell an absent key
//! from a key whose value is `null`. Always check `is_error()` before
//! trusting the tree.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::ops::Index;

pub use crate::parser::parse;

static END: JsonValue = JsonValue::EndOfInput;

/// One parsed JSON-like value.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Null,
    True,
    False,
    /// Raw text between the quotes; escapes are not decoded.
    Text(String),
    Integer(i64),
    Float(f64),
    Array(Vec<JsonValue>),
    Object(BTreeMap<String, JsonValue>),
    /// No value was present at this position.
    EndOfInput,
    Error(JsonError),
}

/// A parse diagnostic with the half-open byte range that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonError {
    pub message: String,
    pub start: usize,
    pub end: usize,
}

impl fmt::Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error at {},{}: {}", self.start, self.end, self.message)
    }
}

impl std::error::Error for JsonError {}

impl JsonValue {
    /// Value stored under `key`, or `EndOfInput` when this is not an object
    /// or the key is absent.
    pub fn get(&self, key: &str) -> &JsonValue {
        match self {
            JsonValue::Object(object) => object.get(key).unwrap_or(&END),
            _ => &END,
        }
    }

    /// Element `index` of an array, or `EndOfInput`.
    pub fn at(&self, index: usize) -> &JsonValue {
        match self {
            JsonValue::Array(array) => array.get(index).unwrap_or(&END),
            _ => &END,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            JsonValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            JsonValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Floats as-is; integers widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            JsonValue::Float(f) => Some(*f),
            JsonValue::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsonValue::True => Some(true),
            JsonValue::False => Some(false),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            JsonValue::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, JsonValue>> {
        match self {
            JsonValue::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&JsonError> {
        match self {
            JsonValue::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    pub fn is_end(&self) -> bool {
        matches!(self, JsonValue::EndOfInput)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, JsonValue::Error(_))
    }

    /// Render with two spaces of indentation per nesting level.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        write_value(&mut out, self, 0);
        out
    }
}

impl Index<&str> for JsonValue {
    type Output = JsonValue;

    fn index(&self, key: &str) -> &JsonValue {
        self.get(key)
    }
}

impl Index<usize> for JsonValue {
    type Output = JsonValue;

    fn index(&self, index: usize) -> &JsonValue {
        self.at(index)
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty())
    }
}

fn write_value(out: &mut String, value: &JsonValue, indent: usize) {
    match value {
        JsonValue::Null => out.push_str("null"),
        JsonValue::True => out.push_str("true"),
        JsonValue::False => out.push_str("false"),
        JsonValue::Text(text) => write_text(out, text),
        JsonValue::Integer(n) => {
            let _ = write!(out, "{n}");
        }
        JsonValue::Float(f) => write_float(out, *f),
        JsonValue::Array(array) if array.is_empty() => out.push_str("[]"),
        JsonValue::Array(array) => {
            out.push_str("[\n");
            for (i, item) in array.iter().enumerate() {
                push_indent(out, indent + 1);
                write_value(out, item, indent + 1);
                out.push_str(if i + 1 < array.len() { ",\n" } else { "\n" });
            }
            push_indent(out, indent);
            out.push(']');
        }
        JsonValue::Object(object) if object.is_empty() => out.push_str("{}"),
        JsonValue::Object(object) => {
            out.push_str("{\n");
            for (i, (key, item)) in object.iter().enumerate() {
                push_indent(out, indent + 1);
                write_key(out, key);
                out.push_str(" : ");
                write_value(out, item, indent + 1);
                out.push_str(if i + 1 < object.len() { ",\n" } else { "\n" });
            }
            push_indent(out, indent);
            out.push('}');
        }
        JsonValue::EndOfInput => out.push_str("<EMPTY>"),
        JsonValue::Error(err) => {
            let _ = write!(out, "{err}");
        }
    }
}

fn push_indent(out: &mut String, level: usize) {
    out.extend(std::iter::repeat("  ").take(level));
}

/// Quote with `"` unless the text holds an unescaped `"`; the parser
/// guarantees such text holds no unescaped `'`.
fn write_text(out: &mut String, text: &str) {
    let quote = if has_unescaped(text, b'"') { '\'' } else { '"' };
    out.push(quote);
    out.push_str(text);
    out.push(quote);
}

fn has_unescaped(text: &str, quote: u8) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return true,
            _ => i += 1,
        }
    }
    false
}

/// Keys that read back as the same key are written bare, the rest quoted.
fn write_key(out: &mut String, key: &str) {
    if is_bare_key(key) {
        out.push_str(key);
    } else {
        write_text(out, key);
    }
}

fn is_bare_key(key: &str) -> bool {
    let Some(first) = key.bytes().next() else {
        return false;
    };
    if first.is_ascii_digit() {
        // Integer keys are re-stringified, so only canonical forms survive.
        return key.bytes().all(|b| b.is_ascii_digit())
            && (key == "0" || first != b'0')
            && key.parse::<i64>().is_ok();
    }
    let identifier = (first.is_ascii_alphabetic() || first == b'_')
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    identifier && !["null", "true", "false"].iter().any(|kw| key.starts_with(kw))
}

/// Floats always keep a decimal point so they read back as floats.
fn write_float(out: &mut String, f: f64) {
    let start = out.len();
    let _ = write!(out, "{f}");
    if !out[start..].contains('.') {
        out.push_str(".0");
    }
}
