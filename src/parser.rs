//! Chunk parser for the template language
//!
//! Splits template source on the `}}` / `{{` delimiters into a flat,
//! ordered chunk sequence. No nesting is resolved here: begin/end directive
//! markers are paired later by the renderer's forward scans.

use crate::chunk::{Chunk, ChunkKind};
use crate::error::{Error, Result};

/// Parse template source into a flat chunk sequence.
///
/// Fails only on malformed directives (wrong argument count, unknown command
/// keyword). Literal text, even empty runs between adjacent placeholders, is
/// always preserved as `Static` chunks.
pub fn parse(text: &str) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();

    for segment in text.split("}}") {
        let mut parts = segment.split("{{");

        // The text before the opening delimiter is always a static chunk,
        // even when empty. This is how literal text between and around
        // placeholders survives.
        let static_part = parts.next().unwrap_or_default();
        chunks.push(Chunk::static_text(static_part));

        // Anything past a second `{{` in the same segment is dropped, as the
        // original split-based grammar only ever looked at the first body.
        if let Some(body) = parts.next() {
            chunks.push(parse_placeholder(body)?);
        }
    }

    Ok(chunks)
}

/// Parse one placeholder body (the text between `{{` and `}}`).
fn parse_placeholder(body: &str) -> Result<Chunk> {
    let trimmed = body.trim();

    if !trimmed.starts_with('#') {
        // A plain value reference. The lookup key is the *untrimmed* body:
        // whitespace inside `{{ }}` is part of the key, unlike directive
        // bodies which are trimmed before tokenization.
        return Ok(Chunk::new(ChunkKind::Value, body));
    }

    parse_directive(trimmed)
}

/// Parse a directive body (trimmed, starting with `#`).
///
/// Both `{{#IF name}}` and `{{# IF name}}` spellings are accepted: the
/// leading `#` is stripped before splitting on whitespace, so the command
/// keyword is the first token either way.
fn parse_directive(trimmed: &str) -> Result<Chunk> {
    let tokens: Vec<&str> = trimmed[1..].split_whitespace().collect();

    let command = *tokens.first().ok_or_else(|| Error::UnknownDirective {
        body: trimmed.to_string(),
    })?;

    match command {
        "SUB" => directive_with_name(ChunkKind::Sub, &tokens, trimmed),
        "IF" => directive_with_name(ChunkKind::If, &tokens, trimmed),
        "IF_NOT" => directive_with_name(ChunkKind::IfNot, &tokens, trimmed),
        "LOOP" => directive_with_name(ChunkKind::BeginLoop, &tokens, trimmed),
        // End markers take no argument; extras are ignored
        "END_IF" => Ok(Chunk::end_marker(ChunkKind::EndIf)),
        "END_LOOP" => Ok(Chunk::end_marker(ChunkKind::EndLoop)),
        _ => Err(Error::UnknownDirective {
            body: trimmed.to_string(),
        }),
    }
}

/// Build a directive chunk that requires exactly one name argument.
fn directive_with_name(kind: ChunkKind, tokens: &[&str], body: &str) -> Result<Chunk> {
    if tokens.len() != 2 {
        return Err(Error::Directive {
            body: body.to_string(),
        });
    }
    Ok(Chunk::new(kind, tokens[1]))
}
