//! Stage 3: lenient parse.
//!
//! A recursive-descent parser for the JSON dialect models actually emit. On top of
//! strict JSON it accepts:
//! - trailing commas in objects and arrays
//! - unquoted identifier keys (`{match_score: 85}`)
//! - single-quoted strings, with `\'` escapes
//! - `//`, `/* */` and `#` comments
//! - `True` / `False` / `None` and a leading `+` on numbers
//! - raw newlines and tabs inside strings
//!
//! It does NOT invent missing structure: an unterminated object is still an error.
//! Balancing is the job of the later repair stages.

use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("lenient parse failed at char {position}: {message}")]
pub struct LenientError {
    pub position: usize,
    pub message: String,
}

/// Max nesting depth accepted before giving up.
const MAX_DEPTH: usize = 128;

pub fn parse_lenient(input: &str) -> Result<Value, LenientError> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
        depth: 0,
    };
    let value = parser.parse_value()?;
    parser.skip_trivia();
    if parser.pos < parser.chars.len() {
        return Err(parser.error("unexpected trailing content"));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn error(&self, message: &str) -> LenientError {
        LenientError {
            position: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Skips whitespace and comments.
    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => self.pos += 1,
                (Some('/'), Some('/')) | (Some('#'), _) => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    while self.pos < self.chars.len()
                        && !(self.peek() == Some('*') && self.peek_at(1) == Some('/'))
                    {
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(self.chars.len());
                }
                _ => break,
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value, LenientError> {
        self.skip_trivia();
        match self.peek() {
            Some('{') => self.nested(Self::parse_object),
            Some('[') => self.nested(Self::parse_array),
            Some(q @ ('"' | '\'')) => self.parse_string(q).map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                self.parse_number()
            }
            Some(c) if is_ident_start(c) => {
                let word = self.parse_identifier();
                match word.as_str() {
                    "true" | "True" => Ok(Value::Bool(true)),
                    "false" | "False" => Ok(Value::Bool(false)),
                    "null" | "None" => Ok(Value::Null),
                    _ => Err(self.error("unexpected bare word")),
                }
            }
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Value, LenientError>,
    ) -> Result<Value, LenientError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn parse_object(&mut self) -> Result<Value, LenientError> {
        self.pos += 1; // '{'
        let mut map = Map::new();

        loop {
            self.skip_trivia();
            match self.peek() {
                Some('}') => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                Some(',') => {
                    // Empty slot such as `{,` or `,,`.
                    self.pos += 1;
                    continue;
                }
                None => return Err(self.error("unterminated object")),
                _ => {}
            }

            let key = match self.peek() {
                Some(q @ ('"' | '\'')) => self.parse_string(q)?,
                Some(c) if is_ident_start(c) => self.parse_identifier(),
                _ => return Err(self.error("expected object key")),
            };

            self.skip_trivia();
            if self.peek() != Some(':') {
                return Err(self.error("expected ':' after key"));
            }
            self.pos += 1;

            let value = self.parse_value()?;
            map.insert(key, value);

            self.skip_trivia();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                None => return Err(self.error("unterminated object")),
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, LenientError> {
        self.pos += 1; // '['
        let mut items = Vec::new();

        loop {
            self.skip_trivia();
            match self.peek() {
                Some(']') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                Some(',') => {
                    self.pos += 1;
                    continue;
                }
                None => return Err(self.error("unterminated array")),
                _ => {}
            }

            items.push(self.parse_value()?);

            self.skip_trivia();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {}
                None => return Err(self.error("unterminated array")),
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String, LenientError> {
        self.pos += 1; // opening quote
        let mut out = String::new();

        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                c if c == quote => return Ok(out),
                '\\' => {
                    let Some(esc) = self.peek() else { break };
                    self.pos += 1;
                    match esc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        'u' => out.push(self.parse_unicode_escape()?),
                        other => out.push(other),
                    }
                }
                other => out.push(other),
            }
        }
        Err(self.error("unterminated string"))
    }

    /// Decodes the four hex digits after `\u`. A high surrogate pairs with a
    /// directly following `\uDC00`..`\uDFFF`; an unpaired surrogate becomes
    /// U+FFFD and whatever follows it is parsed normally.
    fn parse_unicode_escape(&mut self) -> Result<char, LenientError> {
        let high = self.read_hex4()?;
        if !(0xD800..0xDC00).contains(&high) {
            return Ok(char::from_u32(high).unwrap_or('\u{FFFD}'));
        }
        if self.peek() != Some('\\') || self.peek_at(1) != Some('u') {
            return Ok('\u{FFFD}');
        }
        let mark = self.pos;
        self.pos += 2;
        match self.read_hex4() {
            Ok(low) if (0xDC00..0xE000).contains(&low) => {
                let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                Ok(char::from_u32(code).unwrap_or('\u{FFFD}'))
            }
            _ => {
                self.pos = mark;
                Ok('\u{FFFD}')
            }
        }
    }

    fn read_hex4(&mut self) -> Result<u32, LenientError> {
        let end = self.pos + 4;
        if end > self.chars.len() {
            return Err(self.error("truncated unicode escape"));
        }
        let hex: String = self.chars[self.pos..end].iter().collect();
        let code = u32::from_str_radix(&hex, 16).map_err(|_| self.error("bad unicode escape"))?;
        self.pos = end;
        Ok(code)
    }

    fn parse_identifier(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_number(&mut self) -> Result<Value, LenientError> {
        let start = self.pos;
        if matches!(self.peek(), Some('+' | '-')) {
            self.pos += 1;
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        let text = text.trim_start_matches('+');

        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| self.error("invalid number"))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_strict_json_parses_identically() {
        let input = r#"{"a": [1, 2.5, "x"], "b": {"c": null, "d": true}}"#;
        assert_eq!(
            parse_lenient(input).unwrap(),
            serde_json::from_str::<Value>(input).unwrap()
        );
    }

    #[test]
    fn test_unquoted_keys_and_single_quotes() {
        let value = parse_lenient("{match_score: 85, feedback: 'Good fit'}").unwrap();
        assert_eq!(value, json!({"match_score": 85, "feedback": "Good fit"}));
    }

    #[test]
    fn test_trailing_commas() {
        let value = parse_lenient(r#"{"a": [1, 2,], "b": 3,}"#).unwrap();
        assert_eq!(value, json!({"a": [1, 2], "b": 3}));
    }

    #[test]
    fn test_python_literals() {
        let value = parse_lenient("{'passed': True, 'other': False, 'x': None}").unwrap();
        assert_eq!(value, json!({"passed": true, "other": false, "x": null}));
    }

    #[test]
    fn test_comments_are_skipped() {
        let input = "{\n // score\n \"a\": 1, /* block */ \"b\": 2 # tail\n}";
        assert_eq!(parse_lenient(input).unwrap(), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_escaped_single_quote_and_raw_newline() {
        let value = parse_lenient("{'text': 'It\\'s\nfine'}").unwrap();
        assert_eq!(value, json!({"text": "It's\nfine"}));
    }

    #[test]
    fn test_unicode_escape_and_surrogate_pair() {
        let value = parse_lenient(r#"{"a": "caf\u00e9", "b": "\ud83d\ude00!"}"#).unwrap();
        assert_eq!(value, json!({"a": "caf\u{e9}", "b": "\u{1F600}!"}));
    }

    #[test]
    fn test_lone_high_surrogate_becomes_replacement_char() {
        let value = parse_lenient(r#"{'a': '\ud83dx', 'b': '\ud83d'}"#).unwrap();
        assert_eq!(value, json!({"a": "\u{FFFD}x", "b": "\u{FFFD}"}));
    }

    #[test]
    fn test_high_surrogate_keeps_following_non_surrogate_escape() {
        let value = parse_lenient(r#"{"a": "\ud83d\u0041"}"#).unwrap();
        assert_eq!(value, json!({"a": "\u{FFFD}A"}));
    }

    #[test]
    fn test_lone_low_surrogate_becomes_replacement_char() {
        let value = parse_lenient(r#"{"a": "\udc00"}"#).unwrap();
        assert_eq!(value, json!({"a": "\u{FFFD}"}));
    }

    #[test]
    fn test_plus_sign_and_float() {
        let value = parse_lenient("{a: +5, b: -2.5e1}").unwrap();
        assert_eq!(value, json!({"a": 5, "b": -25.0}));
    }

    #[test]
    fn test_unterminated_object_is_error() {
        assert!(parse_lenient(r#"{"match_score": 70, "feedback": "ok""#).is_err());
    }

    #[test]
    fn test_bare_words_are_error() {
        assert!(parse_lenient("not json at all").is_err());
    }

    #[test]
    fn test_trailing_garbage_is_error() {
        let err = parse_lenient("{\"a\": 1} extra").unwrap_err();
        assert_eq!(err.message, "unexpected trailing content");
    }

    #[test]
    fn test_missing_comma_is_error() {
        assert!(parse_lenient(r#"{"a": 1 "b": 2}"#).is_err());
    }
}
