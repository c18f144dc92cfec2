//! OSC 1.0 address pattern matching.
//!
//! Patterns are matched part by part (split on `/`), so `*` never crosses a
//! path separator. Supported syntax within a part:
//! - `?` matches any single character
//! - `*` matches any run of characters, including none
//! - `[abc]`, `[a-z]`, `[!a-z]` match one character from (or not from) a set
//! - `{foo,bar}` matches any of the comma-separated strings

use std::fmt;

use super::OscError;
use super::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPattern {
    pattern: String,
    parts: Vec<Vec<char>>,
}

impl AddressPattern {
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let invalid = |reason: &str| OscError::InvalidPattern {
            pattern: pattern.clone(),
            reason: reason.to_string(),
        };

        let Some(rest) = pattern.strip_prefix('/') else {
            return Err(invalid("must start with '/'"));
        };

        let parts: Vec<Vec<char>> = rest.split('/').map(|p| p.chars().collect()).collect();
        for part in &parts {
            check_brackets(part).map_err(invalid)?;
        }

        Ok(Self { pattern, parts })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, address: &str) -> bool {
        let Some(rest) = address.strip_prefix('/') else {
            return false;
        };

        let mut parts = rest.split('/');
        for pattern_part in &self.parts {
            let Some(part) = parts.next() else {
                return false;
            };
            let part: Vec<char> = part.chars().collect();
            if !match_part(pattern_part, &part) {
                return false;
            }
        }
        parts.next().is_none()
    }
}

impl fmt::Display for AddressPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn check_brackets(part: &[char]) -> std::result::Result<(), &'static str> {
    let mut open: Option<char> = None;
    for &c in part {
        match (open, c) {
            (None, '[') => open = Some(']'),
            (None, '{') => open = Some('}'),
            (None, ']') | (None, '}') => return Err("unbalanced closing bracket"),
            (Some(close), c) if c == close => open = None,
            (Some(_), '[') | (Some(_), '{') => return Err("nested brackets are not allowed"),
            _ => {}
        }
    }
    match open {
        Some(_) => Err("unclosed bracket"),
        None => Ok(()),
    }
}

fn match_part(pattern: &[char], input: &[char]) -> bool {
    match pattern.first() {
        None => input.is_empty(),
        Some('*') => {
            let rest = &pattern[1..];
            (0..=input.len()).any(|skip| match_part(rest, &input[skip..]))
        }
        Some('?') => !input.is_empty() && match_part(&pattern[1..], &input[1..]),
        Some('[') => {
            let Some(end) = pattern.iter().position(|&c| c == ']') else {
                return false;
            };
            match input.first() {
                Some(&c) if class_contains(&pattern[1..end], c) => {
                    match_part(&pattern[end + 1..], &input[1..])
                }
                _ => false,
            }
        }
        Some('{') => {
            let Some(end) = pattern.iter().position(|&c| c == '}') else {
                return false;
            };
            let rest = &pattern[end + 1..];
            pattern[1..end].split(|&c| c == ',').any(|alt| {
                input.starts_with(alt) && match_part(rest, &input[alt.len()..])
            })
        }
        Some(&c) => input.first() == Some(&c) && match_part(&pattern[1..], &input[1..]),
    }
}

fn class_contains(class: &[char], c: char) -> bool {
    let (negated, class) = match class.split_first() {
        Some(('!', rest)) => (true, rest),
        _ => (false, class),
    };

    let mut found = false;
    let mut i = 0;
    while i < class.len() {
        // A '-' at either end is literal
        if i + 2 < class.len() && class[i + 1] == '-' {
            if class[i] <= c && c <= class[i + 2] {
                found = true;
            }
            i += 3;
        } else {
            if class[i] == c {
                found = true;
            }
            i += 1;
        }
    }
    found != negated
}
