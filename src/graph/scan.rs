//! Import specifier extraction.
//!
//! Scans module source for dependency references. This is intentionally a
//! lightweight lexical scan, not a real parser: specifiers inside comments
//! are stripped first, and only quoted string specifiers are recognized.

use crate::graph::module::{DepKind, ModuleKind};
use regex::Regex;
use std::sync::OnceLock;

/// A specifier found in a module's source, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRef {
    /// The specifier text between the quotes
    pub specifier: String,
    /// Eager or lazy, depending on the reference syntax
    pub kind: DepKind,
}

fn script_static_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // `import ... from '...'`, bare `import '...'`, `export ... from '...'`
        // and CommonJS `require('...')`.
        Regex::new(
            r#"(?:\bimport\s+[^;'"]*?from\s*|\bimport\s*|\bexport\s+[^;'"]*?from\s*|\brequire\s*\(\s*)["']([^"']+)["']"#,
        )
        .expect("static script import pattern")
    })
}

fn script_dynamic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\bimport\s*\(\s*["']([^"']+)["']\s*\)"#).expect("dynamic import pattern")
    })
}

fn style_import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"@import\s+(?:url\(\s*)?["']([^"']+)["']"#).expect("@import pattern")
    })
}

fn style_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\burl\(\s*["']?([^"'()]+?)["']?\s*\)"#).expect("url() pattern"))
}

fn markup_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?:src|href)\s*=\s*["']([^"']+)["']"#).expect("markup ref pattern")
    })
}

/// Strip `//` line comments and `/* */` block comments.
///
/// Quote-aware so that `"http://x"` survives. Good enough for scanning;
/// the transform stage has its own comment handling.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_string: Option<char> = None;

    while let Some(c) = chars.next() {
        match in_string {
            Some(quote) => {
                out.push(c);
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else if c == quote {
                    in_string = None;
                }
            }
            None => match c {
                '"' | '\'' | '`' => {
                    in_string = Some(c);
                    out.push(c);
                }
                '/' if chars.peek() == Some(&'/') => {
                    for next in chars.by_ref() {
                        if next == '\n' {
                            out.push('\n');
                            break;
                        }
                    }
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    let mut prev = ' ';
                    for next in chars.by_ref() {
                        if next == '\n' {
                            out.push('\n');
                        }
                        if prev == '*' && next == '/' {
                            break;
                        }
                        prev = next;
                    }
                }
                _ => out.push(c),
            },
        }
    }

    out
}

/// Whether a specifier points at a local file rather than an external URL.
fn is_local(specifier: &str) -> bool {
    !(specifier.starts_with("http://")
        || specifier.starts_with("https://")
        || specifier.starts_with("data:")
        || specifier.starts_with("//")
        || specifier.starts_with('#'))
}

/// Scan a module's source for dependency references.
///
/// Returns specifiers in the order they appear, with duplicates removed
/// (the first occurrence decides position and eagerness).
pub fn scan_refs(kind: ModuleKind, source: &[u8]) -> Vec<ScannedRef> {
    let text = String::from_utf8_lossy(source);
    let mut found: Vec<(usize, ScannedRef)> = Vec::new();

    match kind {
        ModuleKind::Script => {
            let stripped = strip_comments(&text);
            // Dynamic imports first so the static pattern's bare-import arm
            // does not claim them.
            for cap in script_dynamic_re().captures_iter(&stripped) {
                let m = cap.get(1).expect("capture group");
                found.push((
                    m.start(),
                    ScannedRef { specifier: m.as_str().to_string(), kind: DepKind::Lazy },
                ));
            }
            for cap in script_static_re().captures_iter(&stripped) {
                let m = cap.get(1).expect("capture group");
                found.push((
                    m.start(),
                    ScannedRef { specifier: m.as_str().to_string(), kind: DepKind::Eager },
                ));
            }
        }
        ModuleKind::Style => {
            let stripped = strip_comments(&text);
            for cap in style_import_re().captures_iter(&stripped) {
                let m = cap.get(1).expect("capture group");
                found.push((
                    m.start(),
                    ScannedRef { specifier: m.as_str().to_string(), kind: DepKind::Eager },
                ));
            }
            for cap in style_url_re().captures_iter(&stripped) {
                let m = cap.get(1).expect("capture group");
                found.push((
                    m.start(),
                    ScannedRef { specifier: m.as_str().to_string(), kind: DepKind::Lazy },
                ));
            }
        }
        ModuleKind::Markup => {
            for cap in markup_ref_re().captures_iter(&text) {
                let m = cap.get(1).expect("capture group");
                found.push((
                    m.start(),
                    ScannedRef { specifier: m.as_str().to_string(), kind: DepKind::Lazy },
                ));
            }
        }
        ModuleKind::Asset => {}
    }

    found.sort_by_key(|(pos, _)| *pos);

    let mut seen = std::collections::HashSet::new();
    found
        .into_iter()
        .map(|(_, r)| r)
        .filter(|r| is_local(&r.specifier) && seen.insert(r.specifier.clone()))
        .collect()
}
