//! Stage 4: syntactic repair.
//!
//! Rewrites the stripped text token by token into something a strict JSON parser
//! accepts. The rewriter keeps a container stack and remembers the last
//! significant token it emitted, which is enough to decide where keys sit, where
//! commas are missing and what to close at the end of input.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Last {
    Start,
    Open,
    Comma,
    Colon,
    Value,
}

/// Returns the rewritten text. Never fails; the caller decides whether it parses.
pub fn repair_syntax(input: &str) -> String {
    let mut rewriter = Rewriter {
        chars: input.chars().collect(),
        pos: 0,
        out: String::with_capacity(input.len() + 16),
        stack: Vec::new(),
        last: Last::Start,
        comma_at: 0,
    };
    rewriter.run();
    rewriter.finish()
}

struct Rewriter {
    chars: Vec<char>,
    pos: usize,
    out: String,
    /// Open containers, `{` or `[`.
    stack: Vec<char>,
    last: Last,
    /// Byte offset in `out` of the most recent comma.
    comma_at: usize,
}

impl Rewriter {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                c if c.is_whitespace() => {
                    self.out.push(c);
                    self.pos += 1;
                }
                '/' if matches!(self.peek_at(1), Some('/' | '*')) => self.skip_comment(),
                '#' => self.skip_comment(),
                '"' | '\'' => {
                    self.before_value();
                    self.read_string(c);
                    self.last = Last::Value;
                }
                '{' | '[' => {
                    self.before_value();
                    self.stack.push(c);
                    self.out.push(c);
                    self.last = Last::Open;
                    self.pos += 1;
                }
                '}' | ']' => {
                    self.close_pending();
                    let open = if c == '}' { '{' } else { '[' };
                    if self.stack.last() == Some(&open) {
                        self.stack.pop();
                    }
                    self.out.push(c);
                    self.last = Last::Value;
                    self.pos += 1;
                }
                ',' => {
                    match self.last {
                        Last::Value => self.push_comma(),
                        Last::Colon => {
                            self.out.push_str("null");
                            self.push_comma();
                        }
                        // Leading or repeated comma.
                        Last::Start | Last::Open | Last::Comma => {}
                    }
                    self.pos += 1;
                }
                ':' => {
                    self.out.push(':');
                    self.last = Last::Colon;
                    self.pos += 1;
                }
                c if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                    self.before_value();
                    self.read_number();
                    self.last = Last::Value;
                }
                c if is_ident_start(c) => {
                    self.before_value();
                    self.read_word();
                    self.last = Last::Value;
                }
                // Stray punctuation outside any string.
                _ => self.pos += 1,
            }
        }
    }

    fn finish(mut self) -> String {
        self.close_pending();
        while let Some(open) = self.stack.pop() {
            self.out.push(if open == '{' { '}' } else { ']' });
        }
        self.out
    }

    /// Drops a trailing comma and fills a dangling `key:` before a closer.
    fn close_pending(&mut self) {
        match self.last {
            Last::Comma => {
                self.out.truncate(self.comma_at);
                self.last = Last::Value;
            }
            Last::Colon => {
                self.out.push_str("null");
                self.last = Last::Value;
            }
            _ => {}
        }
    }

    fn push_comma(&mut self) {
        self.comma_at = self.out.len();
        self.out.push(',');
        self.last = Last::Comma;
    }

    /// Inserts the comma missing between two adjacent values.
    fn before_value(&mut self) {
        if self.last == Last::Value && !self.stack.is_empty() {
            self.push_comma();
        }
    }

    fn in_key_position(&self) -> bool {
        self.stack.last() == Some(&'{') && matches!(self.last, Last::Open | Last::Comma)
    }

    fn skip_comment(&mut self) {
        if self.peek() == Some('/') && self.peek_at(1) == Some('*') {
            self.pos += 2;
            while self.pos < self.chars.len()
                && !(self.peek() == Some('*') && self.peek_at(1) == Some('/'))
            {
                self.pos += 1;
            }
            self.pos = (self.pos + 2).min(self.chars.len());
            return;
        }
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    /// Next non-whitespace char after `idx`, and whether a newline came first.
    fn next_significant(&self, idx: usize) -> (Option<char>, bool) {
        let mut newline = false;
        for &c in self.chars.iter().skip(idx) {
            if c == '\n' {
                newline = true;
            } else if !c.is_whitespace() {
                return (Some(c), newline);
            }
        }
        (None, newline)
    }

    /// A quote ends its string when a structural char, a line break or the end
    /// of input follows. It also ends it when the next token starts another array
    /// element or an object key; the missing comma is inserted afterwards.
    /// Anything else is embedded text and gets escaped.
    fn quote_closes(&self, idx: usize) -> bool {
        match self.next_significant(idx) {
            (None, _) | (Some(',' | ':' | '}' | ']'), _) => true,
            (Some(_), true) => true,
            (Some('"' | '\'' | '{' | '['), false) if self.stack.last() == Some(&'[') => true,
            (Some(_), false) => self.key_follows(idx),
        }
    }

    /// Whether the next token after `idx` is a key (`"key":`, `'key':` or `key:`).
    fn key_follows(&self, idx: usize) -> bool {
        let start = idx
            + self.chars[idx.min(self.chars.len())..]
                .iter()
                .take_while(|c| c.is_whitespace())
                .count();
        let Some(&first) = self.chars.get(start) else {
            return false;
        };

        let end = if first == '"' || first == '\'' {
            let mut i = start + 1;
            loop {
                match self.chars.get(i) {
                    None | Some('\n') => return false,
                    Some('\\') => i += 2,
                    Some(&c) if c == first => break i + 1,
                    Some(_) => i += 1,
                }
            }
        } else if is_ident_start(first) {
            start
                + self.chars[start..]
                    .iter()
                    .take_while(|&&c| is_ident_char(c))
                    .count()
        } else {
            return false;
        };

        self.next_significant(end).0 == Some(':')
    }

    fn read_string(&mut self, quote: char) {
        self.pos += 1;
        self.out.push('"');

        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => self.read_escape(),
                c if c == quote => {
                    if self.quote_closes(self.pos) {
                        self.out.push('"');
                        return;
                    }
                    push_escaped(&mut self.out, c);
                }
                c => push_escaped(&mut self.out, c),
            }
        }
        // Unterminated at end of input.
        self.out.push('"');
    }

    fn read_escape(&mut self) {
        let Some(esc) = self.peek() else {
            return;
        };
        self.pos += 1;
        match esc {
            '\'' => self.out.push('\''),
            '"' | '\\' | '/' | 'n' | 't' | 'r' | 'b' | 'f' => {
                self.out.push('\\');
                self.out.push(esc);
            }
            'u' if self.has_hex4() => {
                self.out.push_str("\\u");
                for _ in 0..4 {
                    if let Some(h) = self.peek() {
                        self.out.push(h);
                    }
                    self.pos += 1;
                }
            }
            other => {
                // Unknown escape: keep the backslash as a literal.
                self.out.push_str("\\\\");
                push_escaped(&mut self.out, other);
            }
        }
    }

    fn has_hex4(&self) -> bool {
        (0..4).all(|i| self.peek_at(i).is_some_and(|c| c.is_ascii_hexdigit()))
    }

    fn read_number(&mut self) {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();

        let mut text = raw.trim_start_matches('+').to_string();
        if text.starts_with('.') {
            text.insert(0, '0');
        } else if text.starts_with("-.") {
            text.insert(1, '0');
        }
        let text = text.trim_end_matches('.');

        if serde_json::from_str::<serde_json::Number>(text).is_ok() {
            self.out.push_str(text);
        } else {
            push_quoted(&mut self.out, &raw);
        }
    }

    fn read_word(&mut self) {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        let (next, newline) = self.next_significant(self.pos);
        if self.in_key_position() || next == Some(':') {
            push_quoted(&mut self.out, &word);
            return;
        }

        let ends_here = newline || matches!(next, None | Some(',' | '}' | ']'));
        if let (Some(literal), true) = (literal_for(&word), ends_here) {
            self.out.push_str(literal);
            return;
        }

        // Unquoted prose value: runs to the next delimiter on this line.
        while let Some(c) = self.peek() {
            if matches!(c, ',' | '}' | ']' | '\n') {
                break;
            }
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        push_quoted(&mut self.out, text.trim_end());
    }
}

fn literal_for(word: &str) -> Option<&'static str> {
    match word {
        "true" | "True" | "TRUE" => Some("true"),
        "false" | "False" | "FALSE" => Some("false"),
        "null" | "None" | "NULL" | "undefined" | "NaN" => Some("null"),
        _ => None,
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '-'
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        c if c.is_control() => {}
        c => out.push(c),
    }
}

fn push_quoted(out: &mut String, text: &str) {
    out.push('"');
    for c in text.chars() {
        push_escaped(out, c);
    }
    out.push('"');
}
