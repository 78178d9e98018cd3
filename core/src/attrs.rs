//! Field annotation parsing.
//!
//! Every schema field carries a short annotation string that names the
//! option and attaches metadata to it. The grammar is a sequence of
//! space-separated tokens:
//!
//! - `key:"quoted value"` or `key:value`: a key/value pair. Quoted values
//!   may contain spaces and backslash escapes.
//! - a leading bare token (no colon): the field's name, e.g. `v` or `[0]`.
//!   A leading quoted token is unquoted and used as the name.
//! - any later bare token: a presence-only marker checked with
//!   [`Attributes::has`].
//!
//! # Examples
//!
//! ```
//! use command_bind_core::Attributes;
//!
//! let attrs = Attributes::parse(r#"v desc:"be more verbose" required"#);
//! assert_eq!(attrs.name(), Some("v"));
//! assert_eq!(attrs.get("desc"), "be more verbose");
//! assert!(attrs.has("required"));
//! assert!(!attrs.has("req"));
//! ```

use std::fmt;

/// Parsed annotation of one schema field.
///
/// Lookups are case-sensitive exact key matches. The first occurrence of a
/// repeated key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    raw: String,
    name: Option<String>,
    pairs: Vec<(String, String)>,
    markers: Vec<String>,
}

enum Token {
    Pair(String, String),
    Bare(String),
    Quoted(String),
}

impl Attributes {
    /// Parses an annotation string.
    pub fn parse(raw: &str) -> Self {
        let mut attrs = Self {
            raw: raw.to_string(),
            ..Default::default()
        };

        for (position, token) in tokenize(raw).into_iter().enumerate() {
            match token {
                Token::Pair(key, value) => attrs.pairs.push((key, value)),
                Token::Bare(word) | Token::Quoted(word) if position == 0 => {
                    let word = word.trim();
                    if !word.is_empty() {
                        attrs.name = Some(word.to_string());
                    }
                }
                Token::Bare(word) => attrs.markers.push(word),
                Token::Quoted(_) => {}
            }
        }

        attrs
    }

    /// Returns the original annotation text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the value for `key`, or an empty string if absent.
    pub fn get(&self, key: &str) -> &str {
        self.value(key).unwrap_or("")
    }

    /// Returns the value for `key` if the key is present.
    ///
    /// A bare marker counts as present with an empty value, so both
    /// `default:""` and a lone `default` yield `Some("")`.
    ///
    /// ```
    /// use command_bind_core::Attributes;
    ///
    /// let attrs = Attributes::parse("[1] default");
    /// assert_eq!(attrs.get_opt("default"), Some(""));
    /// assert_eq!(attrs.get_opt("desc"), None);
    /// ```
    pub fn get_opt(&self, key: &str) -> Option<&str> {
        self.value(key)
            .or_else(|| self.markers.iter().any(|m| m == key).then_some(""))
    }

    /// Returns `true` if `key` appears as a whole token: a key/value key, a
    /// marker, or the leading name.
    ///
    /// A key that is only a substring of a longer token does not match.
    pub fn has(&self, key: &str) -> bool {
        self.name.as_deref() == Some(key)
            || self.markers.iter().any(|m| m == key)
            || self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Returns the field's name.
    ///
    /// The leading bare token wins; otherwise the `name:` key is consulted,
    /// then the older `type:` key.
    pub fn name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or_else(|| self.value("name").filter(|v| !v.is_empty()))
            .or_else(|| self.value("type").filter(|v| !v.is_empty()))
    }

    /// Returns all presence-only markers in declaration order.
    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.markers.iter().map(String::as_str)
    }

    fn value(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl From<&str> for Attributes {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn tokenize(raw: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = raw.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        if first == '"' {
            chars.next();
            tokens.push(Token::Quoted(read_quoted(&mut chars)));
            skip_word(&mut chars);
            continue;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| !c.is_whitespace() && *c != ':') {
            key.push(c);
        }

        if chars.next_if_eq(&':').is_none() {
            tokens.push(Token::Bare(key));
            continue;
        }

        let value = if chars.next_if_eq(&'"').is_some() {
            let value = read_quoted(&mut chars);
            skip_word(&mut chars);
            value
        } else {
            let mut value = String::new();
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                value.push(c);
            }
            value
        };
        tokens.push(Token::Pair(key, value));
    }

    tokens
}

/// Reads up to the closing quote, the opening one already consumed.
/// An unterminated value runs to the end of the input.
fn read_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut value = String::new();
    while let Some(c) = chars.next() {
        match c {
            '"' => break,
            '\\' => match chars.next() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some('r') => value.push('\r'),
                Some('"') => value.push('"'),
                Some('\\') => value.push('\\'),
                Some(other) => {
                    value.push('\\');
                    value.push(other);
                }
                None => value.push('\\'),
            },
            _ => value.push(c),
        }
    }
    value
}

fn skip_word(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while chars.next_if(|c| !c.is_whitespace()).is_some() {}
}
