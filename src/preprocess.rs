//! Seam to the external `.svelte` -> TypeScript preprocessor
//!
//! The real compiler lives outside this crate. [`ScriptBlockPreprocessor`] is
//! a small stand-in that lifts the `<script>` blocks out of a component so the
//! engine at least sees the component's own code.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::snapshot::SourceMapping;

/// Code handed to the engine when a component cannot be transformed
pub const COMPONENT_STUB: &str = "export default class __SvelteComponent__ {}\n";

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<script(?P<attrs>\s[^>]*)?>(?P<body>.*?)</script\s*>")
        .expect("script block regex is valid")
});

static SCRIPT_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<script[\s>]").expect("script open regex is valid"));

static TYPED_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(lang\s*=\s*["']?(ts|typescript)["']?|type\s*=\s*["']text/typescript["'])"#)
        .expect("typed attribute regex is valid")
});

/// Output of a successful transform
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    /// Host-language code
    pub code: String,
    /// Generated -> original offsets
    pub mapping: SourceMapping,
    /// The component declares a TypeScript script block
    pub typed: bool,
}

/// The component could not be transformed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (at offset {offset})")]
pub struct ParserError {
    pub message: String,
    /// Byte offset into the original component text
    pub offset: usize,
    /// The component still declares a TypeScript script block
    pub typed: bool,
}

/// Turns `.svelte` component text into host-language code
pub trait Preprocessor: Send + Sync {
    fn transform(&self, path: &Path, text: &str) -> Result<Transformed, ParserError>;
}

/// Extracts `<script>` blocks in document order and appends a default export
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptBlockPreprocessor;

impl Preprocessor for ScriptBlockPreprocessor {
    fn transform(&self, _path: &Path, text: &str) -> Result<Transformed, ParserError> {
        let mut code = String::with_capacity(text.len() / 2);
        let mut mapping = SourceMapping::default();
        let mut typed = false;
        let mut blocks = 0;

        for caps in SCRIPT_BLOCK.captures_iter(text) {
            blocks += 1;
            if caps
                .name("attrs")
                .is_some_and(|attrs| TYPED_ATTR.is_match(attrs.as_str()))
            {
                typed = true;
            }
            if let Some(body) = caps.name("body") {
                mapping.push(code.len(), body.start(), body.len());
                code.push_str(body.as_str());
                code.push('\n');
            }
        }

        let opened = SCRIPT_OPEN.find_iter(text).count();
        if opened > blocks {
            let offset = SCRIPT_OPEN
                .find_iter(text)
                .nth(blocks)
                .map(|m| m.start())
                .unwrap_or_default();
            return Err(ParserError {
                message: "unclosed <script> tag".to_string(),
                offset,
                typed: declares_typescript(text),
            });
        }

        code.push_str(COMPONENT_STUB);
        Ok(Transformed {
            code,
            mapping,
            typed,
        })
    }
}

/// Checks every opening `<script` tag, complete or not, for a TypeScript
/// marker. Only needs the tag itself, so it works on broken components.
fn declares_typescript(text: &str) -> bool {
    SCRIPT_OPEN.find_iter(text).any(|open| {
        let rest = &text[open.start()..];
        let tag = rest.find('>').map_or(rest, |end| &rest[..end]);
        TYPED_ATTR.is_match(tag)
    })
}
