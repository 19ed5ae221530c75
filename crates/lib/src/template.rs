//! `%(key)s` template parsing and rendering.
//!
//! Download URIs, install commands and similar strings may reference values
//! that are only known once a build request is assembled. They use the
//! `%(key)s` form:
//!
//! - `%(name)s` is replaced by the value registered for `name`
//! - `%%` produces a literal `%`
//! - any other `%` passes through unchanged, so URL escapes such as `%20`
//!   need no special treatment
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use hostcraft_lib::template::render;
//!
//! let mut context = BTreeMap::new();
//! context.insert("package_name", "php-5.4.0".to_string());
//!
//! let uri = render("http://host/%(package_name)s.tgz", &context).unwrap();
//! assert_eq!(uri, "http://host/php-5.4.0.tgz");
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

/// A segment of parsed template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text
  Literal(String),

  /// A `%(key)s` reference
  Key(String),
}

/// Errors that can occur during template parsing or rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
  #[error("unclosed key at position {0}")]
  Unclosed(usize),

  #[error("unsupported conversion '{conversion}' for key '{key}' (only 's' is supported)")]
  UnsupportedConversion { key: String, conversion: String },

  #[error("unknown key '{key}' in template '{template}'")]
  UnknownKey { key: String, template: String },
}

/// Parse a template into literal and key segments.
pub fn parse(input: &str) -> Result<Vec<Segment>, TemplateError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '%' {
      literal.push(ch);
      continue;
    }

    match chars.peek() {
      Some((_, '%')) => {
        chars.next();
        literal.push('%');
      }
      Some((_, '(')) => {
        chars.next();

        let mut key = String::new();
        let mut found_close = false;
        for (_, c) in chars.by_ref() {
          if c == ')' {
            found_close = true;
            break;
          }
          key.push(c);
        }

        if !found_close {
          return Err(TemplateError::Unclosed(pos));
        }

        match chars.next() {
          Some((_, 's')) => {}
          other => {
            return Err(TemplateError::UnsupportedConversion {
              key,
              conversion: other.map(|(_, c)| c.to_string()).unwrap_or_default(),
            });
          }
        }

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Key(key));
      }
      _ => literal.push('%'),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Render `input`, replacing every `%(key)s` with its value from `context`.
///
/// Fails without partial output if any key is missing.
pub fn render<K, V>(input: &str, context: &BTreeMap<K, V>) -> Result<String, TemplateError>
where
  K: std::borrow::Borrow<str> + Ord,
  V: AsRef<str>,
{
  let mut result = String::with_capacity(input.len());

  for segment in parse(input)? {
    match segment {
      Segment::Literal(s) => result.push_str(&s),
      Segment::Key(key) => {
        let value = context.get(key.as_str()).ok_or_else(|| TemplateError::UnknownKey {
          key: key.clone(),
          template: input.to_string(),
        })?;
        result.push_str(value.as_ref());
      }
    }
  }

  Ok(result)
}
