//! Embedded diagramming library seam.

/// Error reported by a [`MarkupEngine`] for source it cannot render (usually a syntax error).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A loaded diagramming library: `render(id, source) -> svg`.
///
/// `diagram_id` must end up as the root `<svg id>` so several renders can coexist in one
/// document without their internal ids colliding.
pub trait MarkupEngine {
    fn render(&self, diagram_id: &str, source: &str) -> Result<String, EngineError>;
}

/// Converts an arbitrary string into a conservative SVG `id` token.
///
/// Unsupported characters become `-`, runs of `-` collapse, and the result always starts
/// with an ASCII letter (`d-` is prefixed when needed).
pub fn sanitize_svg_id(raw: &str) -> String {
    let raw = raw.trim();
    let mut out = String::with_capacity(raw.len() + 2);
    for ch in raw.chars() {
        let ok = ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':' | '.');
        let ch = if ok { ch } else { '-' };
        if ch == '-' && out.ends_with('-') {
            continue;
        }
        out.push(ch);
    }
    let out = out.trim_matches('-');
    if out.is_empty() {
        return "d-untitled".to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_alphabetic()) {
        out.to_string()
    } else {
        format!("d-{out}")
    }
}

/// Sets the `id` attribute of the root `<svg>` element, replacing an existing one.
pub fn with_root_svg_id(svg: &str, diagram_id: &str) -> String {
    let Some(start) = find_root_svg(svg) else {
        return svg.to_string();
    };
    let Some(tag_len) = svg[start..].find('>') else {
        return svg.to_string();
    };
    let tag_end = start + tag_len;
    let tag = &svg[start..tag_end];
    let id_attr = format!(r#"id="{diagram_id}""#);

    let new_tag = match tag.find(" id=\"") {
        Some(id_pos) => {
            let value_start = id_pos + " id=\"".len();
            match tag[value_start..].find('"') {
                Some(value_len) => format!(
                    "{} {id_attr}{}",
                    &tag[..id_pos],
                    &tag[value_start + value_len + 1..]
                ),
                None => return svg.to_string(),
            }
        }
        None => {
            let (head, tail) = tag.split_at("<svg".len());
            format!("{head} {id_attr}{tail}")
        }
    };

    let mut out = String::with_capacity(svg.len() + id_attr.len() + 1);
    out.push_str(&svg[..start]);
    out.push_str(&new_tag);
    out.push_str(&svg[tag_end..]);
    out
}

/// Byte offset of the first `<svg` start tag outside comments, processing instructions and
/// doctype declarations.
fn find_root_svg(svg: &str) -> Option<usize> {
    let mut pos = 0;
    while let Some(offset) = svg[pos..].find('<') {
        let start = pos + offset;
        let rest = &svg[start..];
        let skip = if rest.starts_with("<!--") {
            rest.find("-->").map(|end| end + "-->".len())
        } else if rest.starts_with("<?") {
            rest.find("?>").map(|end| end + "?>".len())
        } else if rest.starts_with("<!") {
            declaration_len(rest)
        } else if let Some(after) = rest.strip_prefix("<svg") {
            if after.starts_with(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/') {
                return Some(start);
            }
            Some(1)
        } else {
            Some(1)
        };
        pos = start + skip?;
    }
    None
}

/// Length of a `<!...>` declaration, including a bracketed internal subset.
fn declaration_len(rest: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in rest.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '>' if depth == 0 => return Some(i + 1),
            _ => {}
        }
    }
    None
}

/// Pure-Rust Mermaid renderer backed by `mermaid-rs-renderer`.
#[cfg(feature = "mermaid")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MermaidEngine;

#[cfg(feature = "mermaid")]
impl MarkupEngine for MermaidEngine {
    fn render(&self, diagram_id: &str, source: &str) -> Result<String, EngineError> {
        let svg =
            mermaid_rs_renderer::render(source).map_err(|e| EngineError::new(e.to_string()))?;
        tracing::debug!(diagram_id, bytes = svg.len(), "mermaid SVG generated");
        Ok(with_root_svg_id(&svg, diagram_id))
    }
}

/// The engine compiled into this build, if any.
pub fn default_engine() -> Option<Box<dyn MarkupEngine>> {
    #[cfg(feature = "mermaid")]
    {
        Some(Box::new(MermaidEngine))
    }
    #[cfg(not(feature = "mermaid"))]
    {
        None
    }
}
