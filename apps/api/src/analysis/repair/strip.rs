//! Stage 1: strip decoration around the JSON object.
//!
//! Removes markdown code-fence markers, then keeps the text from the first `{`
//! through its matching `}`. Matching is depth-aware and ignores braces inside
//! double- and single-quoted strings. Without a matching close the tail after the first `{`
//! is kept as-is so later stages can balance it.

/// Removes every ```` ``` ```` marker together with a language tag glued to it.
pub fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(idx) = rest.find("```") {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + 3..];
        // Drop a language tag such as `json` or `json5` directly after the fence.
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        rest = &rest[tag_len..];
    }
    out.push_str(rest);
    out
}

/// Byte index of the `}` closing the object that opens at `open_idx`.
///
/// A single quote opens a string only where a value or key can start (after
/// `{` `[` `,` `:`), so apostrophes in bare prose are left alone.
pub fn find_matching_brace(text: &str, open_idx: usize) -> Option<usize> {
    let body = &text[open_idx..];
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev = '\0';

    for (offset, ch) in body.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q && (q == '"' || single_quote_closes(&body[offset + 1..])) {
                quote = None;
                prev = ch;
            }
            continue;
        }

        match ch {
            '"' => quote = Some('"'),
            '\'' if matches!(prev, '{' | '[' | ',' | ':') => quote = Some('\''),
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open_idx + offset);
                }
            }
            _ => {}
        }
        if !ch.is_whitespace() {
            prev = ch;
        }
    }
    None
}

/// Same rule the syntactic rewriter applies: an apostrophe followed by more
/// text on the line is part of the string.
fn single_quote_closes(rest: &str) -> bool {
    for c in rest.chars() {
        if c == '\n' {
            return true;
        }
        if !c.is_whitespace() {
            return matches!(c, ',' | ':' | '}' | ']');
        }
    }
    true
}

/// Strips fences and any prose before/after the outermost object.
pub fn strip_decoration(raw: &str) -> String {
    let unfenced = strip_code_fences(raw);
    let Some(start) = unfenced.find('{') else {
        return unfenced.trim().to_string();
    };

    match find_matching_brace(&unfenced, start) {
        Some(end) => unfenced[start..=end].to_string(),
        None => unfenced[start..].trim_end().to_string(),
    }
}
