//! Lenient recursive-descent parser producing `JsonValue` trees.
//!
//! Besides standard JSON it accepts single-quoted strings, bare identifier
//! tokens as keys or values, integer keys, and arrays without commas.
//! String escapes are kept verbatim, never decoded.

use std::collections::BTreeMap;

use crate::json::{JsonError, JsonValue};

type Parsed = Result<JsonValue, JsonError>;

/// Containers nested deeper than this are rejected instead of recursing on.
const MAX_DEPTH: usize = 128;

/// Parse `text` into a value tree.
///
/// Never fails: empty input gives `JsonValue::EndOfInput` and malformed
/// input gives `JsonValue::Error`, as do containers nested more than
/// `MAX_DEPTH` deep. Text after the first complete value is ignored.
pub fn parse(text: &str) -> JsonValue {
    let mut cursor = ParseCursor::new(text);
    cursor.value().unwrap_or_else(JsonValue::Error)
}

/// Scan state for one `parse` call.
struct ParseCursor<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> ParseCursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, depth: 0 }
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn looking_at(&self, literal: &str) -> bool {
        self.bytes()[self.pos..].starts_with(literal.as_bytes())
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn skip_run(&mut self, byte: u8) {
        while self.peek() == Some(byte) {
            self.pos += 1;
        }
    }

    fn error(&self, start: usize, end: usize, message: &str) -> JsonError {
        JsonError {
            message: message.to_string(),
            start,
            end,
        }
    }

    /// Parse one value starting at the cursor.
    ///
    /// `}`, `]`, `,` and the end of the text yield `EndOfInput` without
    /// consuming anything, which is how containers learn they are done.
    fn value(&mut self) -> Parsed {
        self.skip_whitespace();
        let Some(byte) = self.peek() else {
            return Ok(JsonValue::EndOfInput);
        };
        match byte {
            b'{' | b'[' => self.nested(byte),
            b'}' | b']' | b',' => Ok(JsonValue::EndOfInput),
            b'"' | b'\'' => self.text(),
            _ if self.looking_at("null") => self.keyword(4, JsonValue::Null),
            _ if self.looking_at("true") => self.keyword(4, JsonValue::True),
            _ if self.looking_at("false") => self.keyword(5, JsonValue::False),
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => Ok(self.bare_token()),
            _ => Err(self.error(self.pos, self.pos, "invalid character found")),
        }
    }

    fn nested(&mut self, open: u8) -> Parsed {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(self.pos, self.pos, "Maximum nesting depth exceeded."));
        }
        self.depth += 1;
        let parsed = if open == b'{' { self.object() } else { self.array() };
        self.depth -= 1;
        parsed
    }

    fn keyword(&mut self, len: usize, value: JsonValue) -> Parsed {
        self.pos += len;
        Ok(value)
    }

    fn object(&mut self) -> Parsed {
        let start = self.pos;
        self.pos += 1;
        let mut object = BTreeMap::new();
        loop {
            self.skip_whitespace();
            self.skip_run(b',');
            let key_start = self.pos;
            let key = match self.value()? {
                JsonValue::Text(text) => text,
                JsonValue::Integer(n) => n.to_string(),
                JsonValue::EndOfInput if self.peek() == Some(b'}') => {
                    self.pos += 1;
                    return Ok(JsonValue::Object(object));
                }
                JsonValue::EndOfInput => {
                    return Err(self.error(start, self.pos, "Expected '}' for end of object."));
                }
                _ => return Err(self.error(key_start, self.pos, "Key must be a string.")),
            };

            self.skip_whitespace();
            self.skip_run(b':');
            let value = self.value()?;
            if value.is_end() {
                return Err(self.error(start, self.pos, "No value found for object key-value pair."));
            }
            // The first occurrence of a key wins.
            object.entry(key).or_insert(value);

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.skip_run(b','),
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(JsonValue::Object(object));
                }
                _ => return Err(self.error(start, self.pos, "Expected '}' for end of object.")),
            }
        }
    }

    fn array(&mut self) -> Parsed {
        self.pos += 1;
        let mut array = Vec::new();
        loop {
            self.skip_whitespace();
            self.skip_run(b',');
            let item = self.value()?;
            if item.is_end() {
                if self.peek() == Some(b']') {
                    self.pos += 1;
                }
                return Ok(JsonValue::Array(array));
            }
            array.push(item);
        }
    }

    /// Quoted text, closed by the same quote character that opened it.
    fn text(&mut self) -> Parsed {
        let bytes = self.bytes();
        let open = self.pos;
        let quote = bytes[open];
        let mut index = open + 1;
        while index < bytes.len() && bytes[index] != quote {
            index += if bytes[index] == b'\\' { 2 } else { 1 };
        }
        if index >= bytes.len() {
            return Err(self.error(open, bytes.len(), "String without final quotes was detected."));
        }
        self.pos = index + 1;
        Ok(JsonValue::Text(self.src[open + 1..index].to_string()))
    }

    fn bare_token(&mut self) -> JsonValue {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_' || b == b'-') {
            self.pos += 1;
        }
        JsonValue::Text(self.src[start..self.pos].to_string())
    }

    /// Unsigned decimal; a `.` after the digits makes it a float.
    fn number(&mut self) -> Parsed {
        let start = self.pos;
        self.skip_digits();
        let is_float = self.peek() == Some(b'.');
        if is_float {
            self.pos += 1;
            self.skip_digits();
        }

        let literal = &self.src[start..self.pos];
        if is_float {
            return match literal.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(JsonValue::Float(f)),
                Ok(_) => Err(self.error(start, self.pos, "Number out of range.")),
                Err(_) => Err(self.error(start, self.pos, "Invalid number.")),
            };
        }
        literal
            .parse()
            .map(JsonValue::Integer)
            .map_err(|_| self.error(start, self.pos, "Number out of range."))
    }

    fn skip_digits(&mut self) {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
    }
}
