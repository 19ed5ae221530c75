//! Shell string building helpers.
//!
//! Quoting rules used throughout the crate:
//!
//! - [`quote`] single-quotes a word for `sh` unless it only contains
//!   characters that are safe unquoted (`[A-Za-z0-9_=/,.+-]`).
//!   Plain paths such as `/opt/build` therefore pass through untouched.
//! - [`escape_single_quotes`] prepares text that the caller wraps in single
//!   quotes itself (`'it'\''s'`).
//! - [`escape_for_regex`] prepares literal text for `grep -E "<pattern>"`,
//!   accounting for the extra round of backslash processing that double
//!   quotes perform.

use std::borrow::Cow;

/// Quote `word` for safe use as a single POSIX shell word.
pub fn quote(word: &str) -> Cow<'_, str> {
  shell_escape::unix::escape(Cow::Borrowed(word))
}

/// Escape single quotes so `text` can be embedded inside `'...'`.
pub fn escape_single_quotes(text: &str) -> String {
  text.replace('\'', r"'\''")
}

/// Characters that are special in extended regular expressions.
const REGEX_SPECIAL: &[char] = &[
  '\\', '.', '^', '$', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|', '-', '&', '~', '#', ' ', '\t', '\n', '\r',
  '\x0b', '\x0c',
];

/// Escape `text` for literal matching with `grep -E "<pattern>"`.
///
/// Special characters get a backslash. Because the pattern travels inside
/// double quotes, a literal backslash becomes four backslashes, `$` becomes
/// `\\\$`, and `"` and `` ` `` are backslash-escaped for the shell. Single
/// quotes are left alone.
pub fn escape_for_regex(text: &str) -> String {
  let mut escaped = String::with_capacity(text.len() * 2);
  for ch in text.chars() {
    match ch {
      '\\' => escaped.push_str(r"\\\\"),
      '$' => escaped.push_str(r"\\\$"),
      '"' | '`' => {
        escaped.push('\\');
        escaped.push(ch);
      }
      c if REGEX_SPECIAL.contains(&c) => {
        escaped.push('\\');
        escaped.push(c);
      }
      c => escaped.push(c),
    }
  }
  escaped
}

/// Join path segments with POSIX semantics.
///
/// An absolute segment discards everything before it, and empty segments are
/// ignored, so `posix_join(&["..", "/opt/stage", "done"])` is `/opt/stage/done`.
pub fn posix_join(parts: &[&str]) -> String {
  let mut joined = String::new();
  for part in parts.iter().filter(|p| !p.is_empty()) {
    if part.starts_with('/') {
      joined.clear();
    } else if !joined.is_empty() && !joined.ends_with('/') {
      joined.push('/');
    }
    joined.push_str(part);
  }
  joined
}

/// Final path component, mirroring `basename`.
pub fn basename(path: &str) -> &str {
  path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}
