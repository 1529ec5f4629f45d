//! Exact-preservation store for `uEnv.txt`-style boot configuration files.
//!
//! Rules:
//! - every line is kept byte-for-byte as read, including its terminator
//! - only the first `interface=` and `ext=` lines are authoritative
//! - on save only those two lines are replaced; a missing key is appended
//! - the file is replaced atomically (see [`atomic_write`])

mod atomic;
mod token;

use std::fs;
use std::io::Write as _;
use std::path::Path;

use crate::error::StoreError;
use crate::registry::Category;

pub use atomic::atomic_write;
pub use token::Token;

/// Longest token kept from a tracked line; longer tokens are truncated.
pub const TOKEN_MAX_LEN: usize = 255;

/// A loaded boot configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UenvFile {
    lines: Vec<Vec<u8>>,
    interface_line: Option<usize>,
    ext_line: Option<usize>,
    interface_tokens: Vec<Token>,
    ext_tokens: Vec<Token>,
}

impl UenvFile {
    /// Read and scan the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] with the OS error text if the file cannot
    /// be read.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = fs::read(path).map_err(|source| StoreError::Io {
            action: "read",
            path: path.display().to_string(),
            source,
        })?;
        let file = Self::parse(&content);
        tracing::debug!(
            path = %path.display(),
            lines = file.lines.len(),
            interface_line = ?file.interface_line,
            ext_line = ?file.ext_line,
            "uEnv loaded"
        );
        Ok(file)
    }

    /// Scan raw file content.
    ///
    /// # Examples
    ///
    /// ```
    /// use epass_config::registry::Category;
    /// use epass_config::uenv::UenvFile;
    ///
    /// let file = UenvFile::parse(b"bootdelay=1\n  interface=i2c0  uart1\n");
    /// assert_eq!(file.line_index(Category::Interface), Some(1));
    /// assert_eq!(file.tokens(Category::Interface), ["i2c0", "uart1"]);
    /// assert_eq!(file.line_index(Category::Extension), None);
    /// ```
    #[must_use]
    pub fn parse(content: &[u8]) -> Self {
        let lines: Vec<Vec<u8>> = content
            .split_inclusive(|&b| b == b'\n')
            .map(<[u8]>::to_vec)
            .collect();

        let mut file = Self {
            lines,
            ..Self::default()
        };

        for (i, line) in file.lines.iter().enumerate() {
            if file.interface_line.is_none()
                && let Some(rest) = strip_key(line, Category::Interface.prefix())
            {
                file.interface_line = Some(i);
                file.interface_tokens = parse_tokens(rest);
            } else if file.ext_line.is_none()
                && let Some(rest) = strip_key(line, Category::Extension.prefix())
            {
                file.ext_line = Some(i);
                file.ext_tokens = parse_tokens(rest);
            }
            if file.interface_line.is_some() && file.ext_line.is_some() {
                break;
            }
        }

        file
    }

    /// Raw lines, each with its original terminator.
    #[must_use]
    pub fn lines(&self) -> &[Vec<u8>] {
        &self.lines
    }

    /// Index of the authoritative line for `category`, if present.
    #[must_use]
    pub const fn line_index(&self, category: Category) -> Option<usize> {
        match category {
            Category::Interface => self.interface_line,
            Category::Extension => self.ext_line,
        }
    }

    /// Tokens parsed from the authoritative line for `category`.
    #[must_use]
    pub fn tokens(&self, category: Category) -> &[Token] {
        match category {
            Category::Interface => &self.interface_tokens,
            Category::Extension => &self.ext_tokens,
        }
    }

    /// Produce the new file content with the two tracked lines replaced.
    ///
    /// Untracked lines are copied verbatim. A tracked key absent from the
    /// original is appended at the end, after a newline if the content so
    /// far does not end with one.
    #[must_use]
    pub fn render(&self, interface_value: &[u8], ext_value: &[u8]) -> Vec<u8> {
        let value_for = |category| match category {
            Category::Interface => interface_value,
            Category::Extension => ext_value,
        };

        let capacity = self.lines.iter().map(Vec::len).sum::<usize>()
            + interface_value.len()
            + ext_value.len()
            + 32;
        let mut out = Vec::with_capacity(capacity);

        for (i, line) in self.lines.iter().enumerate() {
            match Category::ALL
                .into_iter()
                .find(|&c| self.line_index(c) == Some(i))
            {
                Some(category) => push_key_line(&mut out, category, value_for(category)),
                None => out.extend_from_slice(line),
            }
        }

        for category in Category::ALL {
            if self.line_index(category).is_none() {
                if out.last().is_some_and(|&b| b != b'\n') {
                    out.push(b'\n');
                }
                push_key_line(&mut out, category, value_for(category));
            }
        }

        out
    }

    /// Atomically rewrite `path`, replacing only the two tracked lines.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if any step fails; the original file is
    /// then left untouched.
    pub fn write_preserve(
        &self,
        path: &Path,
        interface_value: &[u8],
        ext_value: &[u8],
    ) -> Result<(), StoreError> {
        let content = self.render(interface_value, ext_value);
        atomic_write(path, |f| f.write_all(&content))?;
        tracing::debug!(
            path = %path.display(),
            bytes = content.len(),
            "uEnv written"
        );
        Ok(())
    }
}

/// Load `path` (free-function form of [`UenvFile::load`]).
///
/// # Errors
///
/// See [`UenvFile::load`].
pub fn load_file(path: &Path) -> Result<UenvFile, StoreError> {
    UenvFile::load(path)
}

/// Rewrite `path` from `file` (free-function form of
/// [`UenvFile::write_preserve`]).
///
/// # Errors
///
/// See [`UenvFile::write_preserve`].
pub fn write_file(
    path: &Path,
    file: &UenvFile,
    interface_value: &[u8],
    ext_value: &[u8],
) -> Result<(), StoreError> {
    file.write_preserve(path, interface_value, ext_value)
}

/// Join tokens with single spaces, skipping empty ones.
///
/// # Examples
///
/// ```
/// use epass_config::uenv::{Token, join_tokens};
///
/// let tokens = [Token::from("i2c0"), Token::default(), Token::from(&b"x\xff"[..])];
/// assert_eq!(join_tokens(&tokens), b"i2c0 x\xff");
/// ```
#[must_use]
pub fn join_tokens(tokens: &[Token]) -> Vec<u8> {
    tokens
        .iter()
        .filter(|t| !t.is_empty())
        .map(Token::as_bytes)
        .collect::<Vec<_>>()
        .join(&b' ')
}

/// Whitespace as understood by C `isspace` in the "C" locale.
const fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// If `line` starts with `key` after optional leading whitespace, return the
/// remainder after the key.
fn strip_key<'a>(line: &'a [u8], key: &str) -> Option<&'a [u8]> {
    let start = line.iter().position(|&b| !is_space(b))?;
    line.get(start..)?.strip_prefix(key.as_bytes())
}

/// Split a value into whitespace-delimited tokens, truncating each to
/// [`TOKEN_MAX_LEN`] bytes. Bytes are kept as read.
fn parse_tokens(value: &[u8]) -> Vec<Token> {
    value
        .split(|&b| is_space(b))
        .filter(|t| !t.is_empty())
        .map(|t| Token::from(t.get(..TOKEN_MAX_LEN).unwrap_or(t)))
        .collect()
}

fn push_key_line(out: &mut Vec<u8>, category: Category, value: &[u8]) {
    let end = value
        .iter()
        .rposition(|&b| b != b'\n' && b != b'\r')
        .map_or(0, |i| i + 1);
    out.extend_from_slice(category.prefix().as_bytes());
    out.extend_from_slice(value.get(..end).unwrap_or_default());
    out.push(b'\n');
}
