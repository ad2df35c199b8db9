//! Stage 5: structural repair.
//!
//! Walks the text once with a stack of open delimiters. String contents are
//! copied untouched. A closer that matches the top is kept; one that matches a
//! deeper frame first closes everything above it; one that matches nothing is
//! dropped. Whatever is still open at the end is closed in reverse order.

pub fn balance(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' | '[' => {
                stack.push(c);
                out.push(c);
            }
            '}' | ']' => {
                let open = opener_for(c);
                let Some(depth) = stack.iter().rposition(|&o| o == open) else {
                    continue;
                };
                while stack.len() > depth + 1 {
                    if let Some(inner) = stack.pop() {
                        push_closer(&mut out, closer_for(inner));
                    }
                }
                stack.pop();
                push_closer(&mut out, c);
            }
            _ => out.push(c),
        }
    }

    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }
    while let Some(open) = stack.pop() {
        push_closer(&mut out, closer_for(open));
    }
    out
}

/// Pushes `closer`, first dropping a dangling comma or filling a dangling colon.
fn push_closer(out: &mut String, closer: char) {
    let len = out.trim_end().len();
    match out[..len].chars().last() {
        Some(',') => out.truncate(len - 1),
        Some(':') => out.push_str(" null"),
        _ => {}
    }
    out.push(closer);
}

fn opener_for(closer: char) -> char {
    if closer == '}' {
        '{'
    } else {
        '['
    }
}

fn closer_for(opener: char) -> char {
    if opener == '{' {
        '}'
    } else {
        ']'
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_balanced_input_unchanged() {
        let input = r#"{"a": [1, {"b": 2}], "c": "x"}"#;
        assert_eq!(balance(input), input);
    }

    #[test]
    fn test_missing_closing_brace_appended() {
        assert_eq!(
            balance(r#"{"match_score": 70, "feedback": "ok""#),
            r#"{"match_score": 70, "feedback": "ok"}"#
        );
    }

    #[test]
    fn test_closers_appended_in_reverse_order() {
        assert_eq!(balance(r#"{"a": [1, {"b": 2"#), r#"{"a": [1, {"b": 2}]}"#);
    }

    #[test]
    fn test_unmatched_closer_dropped() {
        assert_eq!(balance(r#"{"a": 1}}"#), r#"{"a": 1}"#);
        assert_eq!(balance(r#"{"a": [1, 2]]}"#), r#"{"a": [1, 2]}"#);
    }

    #[test]
    fn test_closer_for_outer_frame_closes_inner_first() {
        assert_eq!(balance(r#"{"a": [1, 2}"#), r#"{"a": [1, 2]}"#);
    }

    #[test]
    fn test_delimiters_inside_strings_ignored() {
        assert_eq!(balance(r#"{"a": "x}]""#), r#"{"a": "x}]"}"#);
    }

    #[test]
    fn test_unterminated_string_closed() {
        assert_eq!(balance(r#"{"a": "open"#), r#"{"a": "open"}"#);
        assert_eq!(balance("{\"a\": \"open\\"), "{\"a\": \"open\"}");
    }

    #[test]
    fn test_dangling_comma_and_colon() {
        assert_eq!(balance(r#"{"a": [1, 2, "#), r#"{"a": [1, 2]}"#);
        assert_eq!(balance(r#"{"a": {"b":"#), r#"{"a": {"b": null}}"#);
    }
}
