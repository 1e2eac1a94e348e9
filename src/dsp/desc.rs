//! Parser for filter and transform description strings
//!
//! Descriptions are whitespace-separated elements of the form
//! `name` or `name[key value, key value2]`. Values may contain further
//! spaces and colons, e.g. `map[from -70 : 0]`.

use crate::error::{Result, WavescopeError};

#[derive(Debug, Clone, PartialEq)]
pub struct DescElement {
    pub name: String,
    pub args: Vec<(String, String)>,
}

impl DescElement {
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn arg_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.arg(key) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<f64>()
                .map(Some)
                .map_err(|_| WavescopeError::InvalidParams {
                    reason: format!("'{}': '{key}' is not a number: '{raw}'", self.name),
                }),
        }
    }

    /// Parses a `low : high` pair
    pub fn arg_range(&self, key: &str) -> Result<Option<(f64, f64)>> {
        let Some(raw) = self.arg(key) else {
            return Ok(None);
        };
        let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
        if parts.len() != 2 {
            return Err(WavescopeError::InvalidParams {
                reason: format!("'{}': '{key}' must be 'low : high', got '{raw}'", self.name),
            });
        }
        let parse = |s: &str| {
            s.parse::<f64>().map_err(|_| WavescopeError::InvalidParams {
                reason: format!("'{}': '{key}' bound is not a number: '{s}'", self.name),
            })
        };
        Ok(Some((parse(parts[0])?, parse(parts[1])?)))
    }
}

pub fn parse_description(desc: &str) -> Result<Vec<DescElement>> {
    let mut elements = Vec::new();
    let mut rest = desc.trim();

    while !rest.is_empty() {
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '[')
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        if name.is_empty() {
            return Err(WavescopeError::InvalidParams {
                reason: format!("malformed description: '{desc}'"),
            });
        }

        rest = rest[name_end..].trim_start();
        let mut element = DescElement {
            name: name.to_string(),
            args: Vec::new(),
        };

        if let Some(stripped) = rest.strip_prefix('[') {
            let close = stripped
                .find(']')
                .ok_or_else(|| WavescopeError::InvalidParams {
                    reason: format!("unclosed '[' in description: '{desc}'"),
                })?;
            element.args = parse_args(&stripped[..close])?;
            rest = stripped[close + 1..].trim_start();
        }

        elements.push(element);
    }

    Ok(elements)
}

/// Args are comma-separated; the key is the first word, the value is
/// everything after it.
fn parse_args(raw: &str) -> Result<Vec<(String, String)>> {
    let mut args = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, value) = match part.find(char::is_whitespace) {
            Some(split) => (&part[..split], part[split..].trim_start()),
            None => (part, ""),
        };
        args.push((key.to_string(), value.to_string()));
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_names() {
        let elements = parse_description("db clamp").unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].name, "db");
        assert!(elements[0].args.is_empty());
    }

    #[test]
    fn test_args_and_ranges() {
        let elements = parse_description("map[from -70 : 0, to 0 : 1] clamp").unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].arg_range("from").unwrap(), Some((-70.0, 0.0)));
        assert_eq!(elements[0].arg_range("to").unwrap(), Some((0.0, 1.0)));
        assert_eq!(elements[1].name, "clamp");
    }

    #[test]
    fn test_filter_style_args() {
        let elements = parse_description("bqHighPass[q 0.3, freq 200] bwLowPass[order 5, freq 10000]")
            .unwrap();
        assert_eq!(elements[0].arg_f64("q").unwrap(), Some(0.3));
        assert_eq!(elements[1].arg_f64("order").unwrap(), Some(5.0));
        assert_eq!(elements[1].arg_f64("gain").unwrap(), None);
    }

    #[test]
    fn test_unclosed_bracket() {
        assert!(parse_description("map[from 0 : 1").is_err());
    }

    #[test]
    fn test_empty_is_ok() {
        assert!(parse_description("  ").unwrap().is_empty());
    }
}
