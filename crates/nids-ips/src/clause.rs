//! Rule clause text
//!
//! Splits the options body of a rule into `keyword: value` clauses and
//! option arguments into tokens.

use crate::{IpsError, Result};

/// Argument delimiters inside a clause value
const ARG_DELIMITERS: [char; 3] = [' ', '\t', '\n'];

fn is_arg_delimiter(c: char) -> bool {
    ARG_DELIMITERS.contains(&c)
}

/// One `keyword[: value]` clause
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clause<'a> {
    pub keyword: &'a str,
    pub value: Option<&'a str>,
}

/// Parse `keyword` or `keyword: value`
pub fn parse_clause(text: &str) -> Result<Clause<'_>> {
    let text = text.trim().trim_end_matches(';').trim_end();

    let (keyword, value) = match text.find(':') {
        Some(colon) => {
            let v = text[colon + 1..].trim();
            // Remove surrounding quotes
            let v = v.trim_matches('"');
            (text[..colon].trim(), Some(v))
        }
        None => (text, None),
    };

    if keyword.is_empty() || keyword.contains(is_arg_delimiter) {
        return Err(IpsError::MalformedClause(text.to_string()));
    }

    Ok(Clause { keyword, value })
}

/// Split an options body on `;`, respecting quotes and escapes
pub fn split_clauses(options: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape_next = false;

    for ch in options.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' => {
                escape_next = true;
                current.push(ch);
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ';' if !in_quotes => {
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }

    parts
}

/// Split option arguments on space, tab and newline.
///
/// At most `max` tokens are produced; the last one keeps the remainder
/// of the text.
pub fn split_args(args: &str, max: usize) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = args.trim_matches(is_arg_delimiter);

    while !rest.is_empty() && max > 0 {
        if tokens.len() + 1 == max {
            tokens.push(rest);
            break;
        }
        let end = rest.find(is_arg_delimiter).unwrap_or(rest.len());
        tokens.push(&rest[..end]);
        rest = rest[end..].trim_start_matches(is_arg_delimiter);
    }

    tokens
}
