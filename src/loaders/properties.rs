//! Line-oriented `key=value` sources

use super::Loader;
use crate::error::{Error, Result};
use crate::store::PropertyStore;
use std::str::Chars;
use url::Url;

const WHITESPACE: [char; 3] = [' ', '\t', '\x0c'];

/// Loader for `.properties` files
///
/// Supports `=`, `:` or whitespace between key and value, `#` and `!`
/// comments, backslash line continuations and the `\t \n \r \f \uXXXX`
/// escapes. Keys stay flat: `a.b=1` is stored under the literal key `a.b`.
///
/// Accepts every source, so it acts as the fallback format.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesLoader;

impl Loader for PropertiesLoader {
    fn accept(&self, _url: &Url) -> bool {
        true
    }

    fn load(&self, content: &str) -> Result<PropertyStore> {
        let mut store = PropertyStore::new();
        for line in logical_lines(content) {
            let (key, value) = split_entry(&line);
            store.put(unescape(key)?, unescape(value)?);
        }
        Ok(store)
    }

    fn default_spec(&self, prefix: &str) -> Option<String> {
        Some(format!("{prefix}.properties"))
    }
}

/// Join continuation lines and drop blanks and comments
fn logical_lines(content: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending: Option<String> = None;

    for raw in content.lines() {
        let trimmed = raw.trim_start_matches(WHITESPACE);
        let mut line = match pending.take() {
            Some(mut joined) => {
                joined.push_str(trimmed);
                joined
            }
            None if trimmed.is_empty() || trimmed.starts_with(['#', '!']) => continue,
            None => trimmed.to_string(),
        };

        if continues(&line) {
            line.pop();
            pending = Some(line);
        } else {
            lines.push(line);
        }
    }

    lines.extend(pending);
    lines
}

/// An odd number of trailing backslashes continues the line
fn continues(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Split a logical line into raw key and raw value
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut boundary = None;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                boundary = Some((i, true));
                break;
            }
            c if WHITESPACE.contains(&c) => {
                boundary = Some((i, false));
                break;
            }
            _ => {}
        }
    }

    let Some((at, explicit)) = boundary else {
        return (line, "");
    };
    let key = &line[..at];
    let mut value = line[at + 1..].trim_start_matches(WHITESPACE);
    if !explicit {
        if let Some(rest) = value.strip_prefix(['=', ':']) {
            value = rest.trim_start_matches(WHITESPACE);
        }
    }
    (key, value)
}

fn unescape(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => out.push(unicode_escape(&mut chars)?),
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

fn malformed_unicode() -> Error {
    Error::Parse("Malformed \\uxxxx encoding".into())
}

fn hex4(chars: &mut Chars<'_>) -> Result<u32> {
    let digits: String = chars.by_ref().take(4).collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(malformed_unicode());
    }
    u32::from_str_radix(&digits, 16).map_err(|_| malformed_unicode())
}

/// Decode the `XXXX` after `\u`, pairing UTF-16 surrogates
fn unicode_escape(chars: &mut Chars<'_>) -> Result<char> {
    let high = hex4(chars)?;
    let code = if (0xD800..0xDC00).contains(&high) {
        let rest = chars.as_str();
        let Some(mut tail) = rest.strip_prefix("\\u").map(str::chars) else {
            return Err(malformed_unicode());
        };
        let low = hex4(&mut tail)?;
        if !(0xDC00..0xE000).contains(&low) {
            return Err(malformed_unicode());
        }
        *chars = tail;
        0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
    } else {
        high
    };
    char::from_u32(code).ok_or_else(malformed_unicode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(content: &str) -> PropertyStore {
        PropertiesLoader.load(content).unwrap()
    }

    #[test]
    fn test_separators() {
        let store = load("a=1\nb: 2\nc 3\nd = 4\ne\t=\t5\nf\n");

        assert_eq!(store.get_text("a"), Some("1"));
        assert_eq!(store.get_text("b"), Some("2"));
        assert_eq!(store.get_text("c"), Some("3"));
        assert_eq!(store.get_text("d"), Some("4"));
        assert_eq!(store.get_text("e"), Some("5"));
        assert_eq!(store.get_text("f"), Some(""));
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let store = load("# comment\n  ! also a comment\n\n   \nkey=value\n");

        assert_eq!(store.len(), 1);
        assert_eq!(store.get_text("key"), Some("value"));
    }

    #[test]
    fn test_continuation() {
        let store = load("fruits = apple, \\\n         banana, \\\n         pear\nnext=1");

        assert_eq!(store.get_text("fruits"), Some("apple, banana, pear"));
        assert_eq!(store.get_text("next"), Some("1"));
    }

    #[test]
    fn test_escaped_backslash_does_not_continue() {
        let store = load("path=c:\\\\\nnext=1");

        assert_eq!(store.get_text("path"), Some("c:\\"));
        assert_eq!(store.get_text("next"), Some("1"));
    }

    #[test]
    fn test_escapes() {
        let store = load("tab=a\\tb\nkey\\=with\\:seps=v\nsmile=\\u263A\nemoji=\\uD83D\\uDE00\n");

        assert_eq!(store.get_text("tab"), Some("a\tb"));
        assert_eq!(store.get_text("key=with:seps"), Some("v"));
        assert_eq!(store.get_text("smile"), Some("\u{263A}"));
        assert_eq!(store.get_text("emoji"), Some("\u{1F600}"));
    }

    #[test]
    fn test_dotted_keys_stay_flat() {
        let store = load("server.port=80");

        assert!(store.contains_key("server.port"));
        assert!(!store.contains_key("server"));
    }

    #[test]
    fn test_value_keeps_trailing_whitespace() {
        assert_eq!(load("k=v  ").get_text("k"), Some("v  "));
    }

    #[test]
    fn test_malformed_unicode() {
        assert!(PropertiesLoader.load("bad=\\u12").is_err());
        assert!(PropertiesLoader.load("bad=\\uZZZZ").is_err());
        assert!(PropertiesLoader.load("bad=\\uD83D").is_err());
    }
}
