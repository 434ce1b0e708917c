//! HTML template rendering.
//!
//! A project may configure an HTML template that references bundle
//! outputs by their logical names (`js/main.js`, `css/main.css`). The
//! renderer rewrites those references to the emitted filenames from the
//! manifest, so production pages pick up content-hashed names without the
//! template knowing the hash scheme. Production output is additionally
//! minified.

use crate::config::Mode;
use crate::emit::{write_atomic, EmitError};
use crate::manifest::BuildManifest;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error rendering or writing the HTML template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template file could not be read
    #[error("cannot read template {}: {source}", path.display())]
    Read {
        /// Template path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// Writing the rendered page failed
    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Rewrite logical asset references to their emitted filenames.
///
/// Longer keys are substituted first so `js/main.js` cannot clobber a
/// reference to `js/main.js.map`.
pub fn render_template(template: &str, manifest: &BuildManifest) -> String {
    let mut keys: Vec<&String> = manifest.assets.keys().collect();
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));

    let mut out = template.to_string();
    for key in keys {
        if let Some(emitted) = manifest.get(key) {
            if emitted != key.as_str() {
                out = out.replace(key.as_str(), emitted);
            }
        }
    }
    out
}

/// Collapse whitespace and strip comments for production pages.
pub fn minify_html(html: &str) -> String {
    let mut without_comments = String::with_capacity(html.len());
    let mut rest = html;
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
            if !(out.ends_with('>') && c == '<') {
                out.push(' ');
            }
            pending_space = false;
        }
        out.push(c);
    }
    out
}

/// Render the template and write it as `index.html` in the output dir.
pub fn emit_index(
    template_path: &Path,
    out_dir: &Path,
    manifest: &BuildManifest,
    mode: Mode,
) -> Result<PathBuf, TemplateError> {
    let template = fs::read_to_string(template_path)
        .map_err(|e| TemplateError::Read { path: template_path.to_path_buf(), source: e })?;

    let mut rendered = render_template(&template, manifest);
    if mode == Mode::Production {
        rendered = minify_html(&rendered);
    }

    let dest = out_dir.join("index.html");
    write_atomic(&dest, rendered.as_bytes())?;
    Ok(dest)
}
