//! Chunk model for parsed templates
//!
//! A template parses into a flat, ordered sequence of chunks. Directive
//! nesting is not resolved at parse time: `If`/`BeginLoop` chunks are paired
//! with their `EndIf`/`EndLoop` markers by the renderer's forward scans.

/// Classification of a single parsed template unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Raw text (passed through unchanged)
    Static,
    /// Value substitution: `{{name}}`
    Value,
    /// Substitution directive: `{{#SUB name}}`
    Sub,
    /// Conditional: `{{#IF name}}`
    If,
    /// Negated conditional: `{{#IF_NOT name}}`
    IfNot,
    /// Conditional end marker: `{{#END_IF}}`
    EndIf,
    /// Loop start: `{{#LOOP name}}`
    BeginLoop,
    /// Loop end marker: `{{#END_LOOP}}`
    EndLoop,
}

/// One unit of a parsed template
///
/// `content` holds literal text for [`ChunkKind::Static`], the referenced
/// identifier for value and directive chunks, and is empty for end markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub kind: ChunkKind,
    pub content: String,
}

impl Chunk {
    pub fn new(kind: ChunkKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }

    /// A literal text chunk
    pub fn static_text(text: impl Into<String>) -> Self {
        Self::new(ChunkKind::Static, text)
    }

    /// An end marker chunk (`EndIf` or `EndLoop`), which carries no content
    pub fn end_marker(kind: ChunkKind) -> Self {
        debug_assert!(matches!(kind, ChunkKind::EndIf | ChunkKind::EndLoop));
        Self::new(kind, "")
    }
}
