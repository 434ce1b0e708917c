//! Built-in transforms.
//!
//! These are deliberately conservative text passes. They never reorder
//! code, and each one either preserves the line structure exactly
//! (comment stripping) or records which input line every output line came
//! from, so composed source maps stay line-accurate through the chain.

use crate::sourcemap::SourceMap;
use crate::transform::{Transform, TransformError};
use std::path::Path;

/// Passes input through unchanged. Useful as a rule placeholder in tests
/// and custom pipelines.
pub struct Identity;

impl Transform for Identity {
    fn name(&self) -> &str {
        "identity"
    }

    fn apply(
        &self,
        input: &[u8],
        map: &SourceMap,
        _path: &Path,
    ) -> Result<(Vec<u8>, SourceMap), TransformError> {
        Ok((input.to_vec(), map.clone()))
    }
}

/// Removes comments while preserving line structure.
///
/// Handles `/* */` block comments for all inputs and `//` line comments
/// for script files only, since `//` occurs in unquoted css `url()`
/// values. Quoted strings and template literals are left intact. Newlines
/// inside block comments are kept so the incoming map stays valid.
pub struct StripComments;

impl StripComments {
    fn line_comments_apply(path: &Path) -> bool {
        !matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("css") | Some("scss") | Some("sass")
        )
    }
}

impl Transform for StripComments {
    fn name(&self) -> &str {
        "strip-comments"
    }

    fn apply(
        &self,
        input: &[u8],
        map: &SourceMap,
        path: &Path,
    ) -> Result<(Vec<u8>, SourceMap), TransformError> {
        let text = std::str::from_utf8(input).map_err(|e| {
            TransformError::new(path, self.name(), format!("input is not valid utf-8: {e}"))
        })?;
        let strip_line = Self::line_comments_apply(path);

        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        let mut in_string: Option<char> = None;

        while let Some(c) = chars.next() {
            if let Some(quote) = in_string {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == quote {
                    in_string = None;
                }
                continue;
            }
            match c {
                '"' | '\'' | '`' => {
                    in_string = Some(c);
                    out.push(c);
                }
                '/' if chars.peek() == Some(&'/') && strip_line => {
                    for skipped in chars.by_ref() {
                        if skipped == '\n' {
                            out.push('\n');
                            break;
                        }
                    }
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    let mut prev = '\0';
                    for skipped in chars.by_ref() {
                        if skipped == '\n' {
                            out.push('\n');
                        }
                        if prev == '*' && skipped == '/' {
                            break;
                        }
                        prev = skipped;
                    }
                }
                _ => out.push(c),
            }
        }

        // Line structure is unchanged, so the map passes through.
        Ok((out.into_bytes(), map.clone()))
    }
}

/// Trims surrounding whitespace and drops blank lines.
///
/// The output map records the originating input line of each surviving
/// line, composed with the incoming map.
pub struct MinifyWhitespace;

impl Transform for MinifyWhitespace {
    fn name(&self) -> &str {
        "minify-whitespace"
    }

    fn apply(
        &self,
        input: &[u8],
        map: &SourceMap,
        path: &Path,
    ) -> Result<(Vec<u8>, SourceMap), TransformError> {
        let text = std::str::from_utf8(input).map_err(|e| {
            TransformError::new(path, self.name(), format!("input is not valid utf-8: {e}"))
        })?;

        let mut out_lines: Vec<&str> = Vec::new();
        let mut lines: Vec<u32> = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            out_lines.push(trimmed);
            lines.push(map.lines.get(idx).copied().unwrap_or(idx as u32));
        }

        let out = out_lines.join("\n");
        Ok((out.into_bytes(), SourceMap { file: map.file.clone(), lines }))
    }
}

/// Minifies markup: strips `<!-- -->` comments and collapses whitespace
/// runs, including those between tags, into a single space.
///
/// The result is effectively one line, so the map collapses to the first
/// mapped input line.
pub struct MinifyMarkup;

impl Transform for MinifyMarkup {
    fn name(&self) -> &str {
        "minify-markup"
    }

    fn apply(
        &self,
        input: &[u8],
        map: &SourceMap,
        path: &Path,
    ) -> Result<(Vec<u8>, SourceMap), TransformError> {
        let text = std::str::from_utf8(input).map_err(|e| {
            TransformError::new(path, self.name(), format!("input is not valid utf-8: {e}"))
        })?;

        let mut without_comments = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("<!--") {
            without_comments.push_str(&rest[..start]);
            match rest[start..].find("-->") {
                Some(end) => rest = &rest[start + end + 3..],
                None => {
                    rest = "";
                    break;
                }
            }
        }
        without_comments.push_str(rest);

        let mut out = String::with_capacity(without_comments.len());
        let mut pending_space = false;
        for c in without_comments.chars() {
            if c.is_whitespace() {
                pending_space = !out.is_empty();
                continue;
            }
            if pending_space {
                // No space needed at a tag boundary.
                if !(out.ends_with('>') && c == '<') {
                    out.push(' ');
                }
                pending_space = false;
            }
            out.push(c);
        }

        let first = map.lines.first().copied().unwrap_or(0);
        Ok((out.into_bytes(), SourceMap { file: map.file.clone(), lines: vec![first] }))
    }
}
