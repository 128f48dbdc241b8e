//! Versioned, immutable views of file content as the engine sees it
//!
//! A [`Snapshot`] never changes after creation. Updates produce a new
//! snapshot with a fresh version allocated by the [`SnapshotCache`].

pub mod cache;
pub mod edits;

pub use cache::{SnapshotCache, SnapshotUpdate};
pub use edits::{Position, Range, TextEdit, apply_edits, offset_at};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::paths::is_svelte_path;
use crate::preprocess::{COMPONENT_STUB, ParserError, Preprocessor};

/// Syntax dialect of a file as understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptKind {
    /// `.ts`, `.js` and their module variants
    Host,
    /// `.tsx`, `.jsx`, and typed components after preprocessing
    HostJsx,
    /// Untyped components after preprocessing
    Extension,
    Other,
}

impl ScriptKind {
    /// Classify by file name alone. Components report `Extension` here;
    /// their final kind depends on the preprocessor output.
    pub fn from_file_name(path: &Path) -> Self {
        if is_svelte_path(path) {
            return Self::Extension;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("ts" | "mts" | "cts" | "js" | "mjs" | "cjs") => Self::Host,
            Some("tsx" | "jsx") => Self::HostJsx,
            _ => Self::Other,
        }
    }

}

/// One generated span and where it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedSpan {
    pub generated: usize,
    pub original: usize,
    pub len: usize,
}

/// Offsets in generated code mapped back to the original component text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMapping {
    spans: Vec<MappedSpan>,
}

impl SourceMapping {
    pub fn push(&mut self, generated: usize, original: usize, len: usize) {
        self.spans.push(MappedSpan {
            generated,
            original,
            len,
        });
    }

    pub fn spans(&self) -> &[MappedSpan] {
        &self.spans
    }

    pub fn original_offset(&self, generated: usize) -> Option<usize> {
        self.spans
            .iter()
            .find(|s| generated >= s.generated && generated < s.generated + s.len)
            .map(|s| s.original + (generated - s.generated))
    }

    pub fn generated_offset(&self, original: usize) -> Option<usize> {
        self.spans
            .iter()
            .find(|s| original >= s.original && original < s.original + s.len)
            .map(|s| s.generated + (original - s.original))
    }
}

/// Script-kind specific metadata
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotExtras {
    Host,
    Extension {
        mapping: SourceMapping,
        /// Set when the component could not be transformed and a stub was used
        parser_error: Option<ParserError>,
        /// Original component text, kept for mapping diagnostics back
        original_text: String,
    },
}

/// Analyzable content of one file at one version
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    file_path: PathBuf,
    version: u64,
    document_version: Option<i32>,
    text: String,
    script_kind: ScriptKind,
    extras: SnapshotExtras,
}

impl Snapshot {
    /// Host-language file; content is used verbatim
    pub fn from_host_text(
        file_path: PathBuf,
        text: String,
        version: u64,
        document_version: Option<i32>,
    ) -> Self {
        let script_kind = ScriptKind::from_file_name(&file_path);
        Self {
            file_path,
            version,
            document_version,
            text,
            script_kind,
            extras: SnapshotExtras::Host,
        }
    }

    /// Component file; runs the preprocessor and never exposes invalid syntax
    pub fn from_extension_text(
        file_path: PathBuf,
        text: String,
        version: u64,
        document_version: Option<i32>,
        preprocessor: &dyn Preprocessor,
    ) -> Self {
        let (code, mapping, typed, parser_error) = match preprocessor.transform(&file_path, &text) {
            Ok(out) => (out.code, out.mapping, out.typed, None),
            Err(err) => {
                tracing::debug!(
                    "preprocessing {} failed, using stub: {err}",
                    file_path.display()
                );
                // Keep the declared dialect so a typo does not change the kind
                let typed = err.typed;
                (COMPONENT_STUB.to_string(), SourceMapping::default(), typed, Some(err))
            }
        };
        let script_kind = if typed {
            ScriptKind::HostJsx
        } else {
            ScriptKind::Extension
        };
        Self {
            file_path,
            version,
            document_version,
            text: code,
            script_kind,
            extras: SnapshotExtras::Extension {
                mapping,
                parser_error,
                original_text: text,
            },
        }
    }

    /// Dispatch on the file name
    pub fn from_text(
        file_path: PathBuf,
        text: String,
        version: u64,
        document_version: Option<i32>,
        preprocessor: &dyn Preprocessor,
    ) -> Self {
        if is_svelte_path(&file_path) {
            Self::from_extension_text(file_path, text, version, document_version, preprocessor)
        } else {
            Self::from_host_text(file_path, text, version, document_version)
        }
    }

    /// New host snapshot with `edits` applied, or `None` for component snapshots
    pub fn with_edits(&self, edits: &[TextEdit], version: u64) -> Option<Self> {
        if !matches!(self.extras, SnapshotExtras::Host) {
            return None;
        }
        Some(Self {
            file_path: self.file_path.clone(),
            version,
            document_version: self.document_version,
            text: apply_edits(&self.text, edits),
            script_kind: self.script_kind,
            extras: SnapshotExtras::Host,
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn document_version(&self) -> Option<i32> {
        self.document_version
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn script_kind(&self) -> ScriptKind {
        self.script_kind
    }

    pub fn extras(&self) -> &SnapshotExtras {
        &self.extras
    }

    pub fn parser_error(&self) -> Option<&ParserError> {
        match &self.extras {
            SnapshotExtras::Extension { parser_error, .. } => parser_error.as_ref(),
            SnapshotExtras::Host => None,
        }
    }
}
