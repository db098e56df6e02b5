//! Chunk renderer and engine facade
//!
//! Walks a flat chunk sequence against a data context, resolving nested
//! LOOP/IF ranges with depth-tracked forward scans. Data-level problems
//! (missing keys, wrong value types, non-boolean condition strings) never
//! abort rendering: they are emitted as inline diagnostic placeholders so
//! the surrounding document stays usable. Only structural problems — an
//! unmatched end marker — propagate as errors.

use crate::cache::{ChunkCache, Clock, SystemClock};
use crate::chunk::{Chunk, ChunkKind};
use crate::error::{Error, Result};
use crate::value::{Context, Dict, Value, is_boolean_string, is_trueish};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::sync::Arc;

/// Render a chunk sequence against a context.
pub fn render(chunks: &[Chunk], ctx: &Context) -> Result<String> {
    let mut output = String::new();
    render_chunks(chunks, ctx.as_dict(), &mut output)?;
    Ok(output)
}

/// Top-level walk over a chunk slice. Also used recursively for loop and
/// conditional bodies.
fn render_chunks(chunks: &[Chunk], data: &Dict, output: &mut String) -> Result<()> {
    let mut i = 0;
    while i < chunks.len() {
        let chunk = &chunks[i];
        match chunk.kind {
            ChunkKind::Static => output.push_str(&chunk.content),
            // SUB is substitution by another name
            ChunkKind::Value | ChunkKind::Sub => {
                output.push_str(&value_fragment(&chunk.content, data));
            }
            ChunkKind::BeginLoop => {
                i = render_loop(chunks, i, &chunk.content, data, output)?;
            }
            ChunkKind::If => {
                i = render_conditional(chunks, i, &chunk.content, data, true, output)?;
            }
            ChunkKind::IfNot => {
                i = render_conditional(chunks, i, &chunk.content, data, false, output)?;
            }
            // Stray end markers not consumed by a scan are skipped
            ChunkKind::EndIf | ChunkKind::EndLoop => {}
        }
        i += 1;
    }
    Ok(())
}

/// Resolve a value reference to its output fragment.
fn value_fragment(name: &str, data: &Dict) -> String {
    match data.get(name) {
        // Absent and falsy lookups are reported the same way
        None => not_found(name),
        Some(value) if value.is_falsy() => not_found(name),
        Some(Value::List(_)) => format!("{{{{{name} - IS AN ARRAY!!!"),
        Some(value) => value.render_to_string(),
    }
}

fn not_found(name: &str) -> String {
    format!("{{{{{name} - NOT FOUND !!!}}}}")
}

/// Render a loop: scan to the matching END_LOOP, then render the body once
/// per list element, each against that element's own dict. Returns the index
/// of the END_LOOP so the caller's cursor skips the consumed body.
fn render_loop(
    chunks: &[Chunk],
    start: usize,
    name: &str,
    data: &Dict,
    output: &mut String,
) -> Result<usize> {
    // Scan before resolving the name: a malformed template is structural
    // and must fail even when the data would have skipped the body.
    let end = matching_end(chunks, start, ChunkKind::EndLoop).ok_or_else(|| {
        Error::UnmatchedLoop {
            name: name.to_string(),
        }
    })?;

    match data.get(name) {
        None => output.push_str(&not_found(name)),
        Some(value) if value.is_falsy() => output.push_str(&not_found(name)),
        Some(Value::List(rows)) => {
            let body = &chunks[start + 1..end];
            for row in rows {
                render_chunks(body, row, output)?;
            }
        }
        Some(_) => {
            output.push_str(&format!("{{{{{name} - ISN'T AN ARRAY!!!"));
        }
    }

    Ok(end)
}

/// Render an IF/IF_NOT: scan to the matching END_IF, resolve the condition,
/// and render the body against the same, unmodified context when it holds.
/// Returns the index of the END_IF.
fn render_conditional(
    chunks: &[Chunk],
    start: usize,
    name: &str,
    data: &Dict,
    want: bool,
    output: &mut String,
) -> Result<usize> {
    let end =
        matching_end(chunks, start, ChunkKind::EndIf).ok_or_else(|| Error::UnmatchedIf {
            name: name.to_string(),
        })?;

    // Strings outside the four accepted spellings are a data error, surfaced
    // inline; the body is not rendered either way.
    if let Some(Value::String(s)) = data.get(name) {
        if !is_boolean_string(s) {
            output.push_str(&format!(
                "{{{{{name} - ISN'T A BOOLEAN VALUE!!! allowed values are 'true', 'false', '0', '1'}}}}"
            ));
            return Ok(end);
        }
    }

    let mut condition = match data.get(name) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => is_trueish(s),
        // Absent keys, numbers, objects and lists never satisfy a condition
        _ => false,
    };
    if !want {
        condition = !condition;
    }

    if condition {
        render_chunks(&chunks[start + 1..end], data, output)?;
    }

    Ok(end)
}

/// Find the index of the end marker matching the directive at `start`.
///
/// Walks forward tracking nesting depth: same-family openers increment,
/// `close` at depth zero is the match. Returns `None` when the sequence
/// ends before the match, which callers turn into a structural error.
fn matching_end(chunks: &[Chunk], start: usize, close: ChunkKind) -> Option<usize> {
    let mut depth = 0usize;
    for (i, chunk) in chunks.iter().enumerate().skip(start + 1) {
        if chunk.kind == close {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        } else if opens_family(chunk.kind, close) {
            depth += 1;
        }
    }
    None
}

/// Does `kind` open a nested block of the family closed by `close`?
fn opens_family(kind: ChunkKind, close: ChunkKind) -> bool {
    match close {
        ChunkKind::EndLoop => kind == ChunkKind::BeginLoop,
        ChunkKind::EndIf => matches!(kind, ChunkKind::If | ChunkKind::IfNot),
        _ => false,
    }
}

/// Trait for loading template source text by name
pub trait TemplateLoader {
    /// Load a template by path/name, returning the source code
    fn load(&self, name: &str) -> Result<String>;
}

/// A simple in-memory template loader
#[derive(Default)]
pub struct InMemoryLoader {
    templates: HashMap<String, String>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }
}

impl TemplateLoader for InMemoryLoader {
    fn load(&self, name: &str) -> Result<String> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Load {
                name: name.to_string(),
                message: "template not found".to_string(),
            })
    }
}

/// A file-based template loader that reads from a directory
pub struct FileLoader {
    root: Utf8PathBuf,
}

impl FileLoader {
    /// Create a new file loader rooted at the given directory
    pub fn new(root: impl AsRef<Utf8Path>) -> Self {
        Self {
            root: root.as_ref().to_owned(),
        }
    }

    /// Get the root directory
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl TemplateLoader for FileLoader {
    fn load(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        std::fs::read_to_string(&path).map_err(|e| Error::Load {
            name: name.to_string(),
            message: e.to_string(),
        })
    }
}

/// Template engine facade: cache-aware parse + render
///
/// Holds the loader and the chunk cache. Caching is disabled by default;
/// when enabled, parsed chunk sequences are reused until the fixed
/// expiration threshold forces a re-parse.
pub struct Engine {
    loader: Box<dyn TemplateLoader>,
    cache: ChunkCache,
}

impl Engine {
    /// Create a new engine with the given loader (caching disabled)
    pub fn new(loader: impl TemplateLoader + 'static) -> Self {
        Self::with_clock(loader, Arc::new(SystemClock::new()))
    }

    /// Create an engine with an explicit clock (for deterministic TTL tests)
    pub fn with_clock(loader: impl TemplateLoader + 'static, clock: Arc<dyn Clock>) -> Self {
        Self {
            loader: Box::new(loader),
            cache: ChunkCache::new(clock),
        }
    }

    /// Enable or disable the chunk cache
    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.cache.set_enabled(enabled);
    }

    /// Access the chunk cache (request counts, enablement)
    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    /// Render the template stored under `key` against `ctx`.
    ///
    /// Fetch and parse failures degrade to a visible inline error chunk in
    /// the output; only structural template errors (unmatched IF/LOOP end
    /// markers) propagate as `Err`.
    pub fn process(&mut self, key: &str, ctx: &Context) -> Result<String> {
        let chunks = self.cache.get_chunks(key, self.loader.as_ref());
        render(&chunks, ctx)
    }

    /// Raw passthrough read of a template's source, no parsing.
    ///
    /// An escape hatch for verbatim inclusion of a fragment.
    pub fn partial(&self, name: &str) -> Result<String> {
        self.loader.load(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::value::Dict;

    fn render_str(template: &str, ctx: &Context) -> String {
        render(&parse(template).unwrap(), ctx).unwrap()
    }

    fn row(pairs: &[(&str, &str)]) -> Dict {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    #[test]
    fn test_static_only() {
        let ctx = Context::new();
        assert_eq!(render_str("plain text", &ctx), "plain text");
    }

    #[test]
    fn test_value_substitution() {
        let mut ctx = Context::new();
        ctx.set("name", "Alice");
        assert_eq!(render_str("Hello, {{name}}!", &ctx), "Hello, Alice!");
    }

    #[test]
    fn test_value_missing() {
        let ctx = Context::new();
        assert_eq!(render_str("a{{x}}b", &ctx), "a{{x - NOT FOUND !!!}}b");
    }

    #[test]
    fn test_value_falsy_reported_missing() {
        let mut ctx = Context::new();
        ctx.set("x", "");
        assert_eq!(render_str("{{x}}", &ctx), "{{x - NOT FOUND !!!}}");
        ctx.set("x", 0);
        assert_eq!(render_str("{{x}}", &ctx), "{{x - NOT FOUND !!!}}");
    }

    #[test]
    fn test_value_numeric() {
        let mut ctx = Context::new();
        ctx.set("n", 42);
        assert_eq!(render_str("{{n}}", &ctx), "42");
    }

    #[test]
    fn test_value_is_array_diagnostic() {
        let mut ctx = Context::new();
        ctx.set("xs", Vec::<Dict>::new());
        assert_eq!(render_str("{{xs}}", &ctx), "{{xs - IS AN ARRAY!!!");
    }

    #[test]
    fn test_value_whitespace_key() {
        // The untrimmed body is the lookup key
        let mut ctx = Context::new();
        ctx.set(" name ", "x");
        assert_eq!(render_str("{{ name }}", &ctx), "x");
    }

    #[test]
    fn test_sub_is_value_alias() {
        let mut ctx = Context::new();
        ctx.set("part", "fragment");
        assert_eq!(render_str("{{#SUB part}}", &ctx), "fragment");
    }

    #[test]
    fn test_if_true_false() {
        let mut ctx = Context::new();
        ctx.set("ok", true);
        assert_eq!(render_str("{{#IF ok}}Y{{#END_IF}}", &ctx), "Y");
        ctx.set("ok", false);
        assert_eq!(render_str("{{#IF ok}}Y{{#END_IF}}", &ctx), "");
    }

    #[test]
    fn test_if_string_conditions() {
        let mut ctx = Context::new();
        for (s, expected) in [("true", "Y"), ("1", "Y"), ("false", ""), ("0", "")] {
            ctx.set("ok", s);
            assert_eq!(render_str("{{#IF ok}}Y{{#END_IF}}", &ctx), expected);
        }
    }

    #[test]
    fn test_if_bad_string_diagnostic() {
        let mut ctx = Context::new();
        ctx.set("ok", "maybe");
        let out = render_str("{{#IF ok}}Y{{#END_IF}}", &ctx);
        assert!(out.contains("ISN'T A BOOLEAN VALUE"));
        assert!(!out.contains('Y'));
    }

    #[test]
    fn test_if_missing_is_false() {
        let ctx = Context::new();
        assert_eq!(render_str("{{#IF ok}}Y{{#END_IF}}", &ctx), "");
        assert_eq!(render_str("{{#IF_NOT ok}}N{{#END_IF}}", &ctx), "N");
    }

    #[test]
    fn test_if_number_is_false() {
        // Numbers never satisfy a condition, not even nonzero ones
        let mut ctx = Context::new();
        ctx.set("ok", 1);
        assert_eq!(render_str("{{#IF ok}}Y{{#END_IF}}", &ctx), "");
        assert_eq!(render_str("{{#IF_NOT ok}}N{{#END_IF}}", &ctx), "N");
    }

    #[test]
    fn test_if_not_negates() {
        let mut ctx = Context::new();
        ctx.set("ok", false);
        assert_eq!(render_str("{{#IF_NOT ok}}N{{#END_IF}}", &ctx), "N");
        ctx.set("ok", "true");
        assert_eq!(render_str("{{#IF_NOT ok}}N{{#END_IF}}", &ctx), "");
    }

    #[test]
    fn test_loop_renders_rows_in_order() {
        let mut ctx = Context::new();
        ctx.set("items", vec![row(&[("n", "1")]), row(&[("n", "2")])]);
        assert_eq!(
            render_str("{{#LOOP items}}[{{n}}]{{#END_LOOP}}", &ctx),
            "[1][2]"
        );
    }

    #[test]
    fn test_loop_empty_list() {
        let mut ctx = Context::new();
        ctx.set("items", Vec::<Dict>::new());
        assert_eq!(render_str("{{#LOOP items}}[{{n}}]{{#END_LOOP}}", &ctx), "");
    }

    #[test]
    fn test_loop_missing_name_skips_body() {
        let ctx = Context::new();
        assert_eq!(
            render_str("a{{#LOOP items}}[{{n}}]{{#END_LOOP}}b", &ctx),
            "a{{items - NOT FOUND !!!}}b"
        );
    }

    #[test]
    fn test_loop_non_list_diagnostic() {
        let mut ctx = Context::new();
        ctx.set("items", "not-a-list");
        let out = render_str("{{#LOOP items}}[{{n}}]{{#END_LOOP}}", &ctx);
        assert_eq!(out, "{{items - ISN'T AN ARRAY!!!");
    }

    #[test]
    fn test_loop_body_isolated_from_outer_context() {
        // Rows do not inherit the enclosing context
        let mut ctx = Context::new();
        ctx.set("outer", "visible");
        ctx.set("items", vec![row(&[("n", "1")])]);
        assert_eq!(
            render_str("{{#LOOP items}}{{outer}}{{#END_LOOP}}", &ctx),
            "{{outer - NOT FOUND !!!}}"
        );
    }

    #[test]
    fn test_nested_loops_match_correct_end() {
        let mut inner_a = row(&[("x", "a")]);
        inner_a.insert(
            "inner".to_string(),
            Value::List(vec![row(&[("y", "1")]), row(&[("y", "2")])]),
        );
        let mut inner_b = row(&[("x", "b")]);
        inner_b.insert("inner".to_string(), Value::List(vec![row(&[("y", "3")])]));

        let mut ctx = Context::new();
        ctx.set("outer", vec![inner_a, inner_b]);

        let out = render_str(
            "{{#LOOP outer}}<{{x}}:{{#LOOP inner}}{{y}}{{#END_LOOP}}>{{#END_LOOP}}",
            &ctx,
        );
        assert_eq!(out, "<a:12><b:3>");
    }

    #[test]
    fn test_if_inside_loop() {
        let mut on = row(&[("n", "1")]);
        on.insert("show".to_string(), Value::Bool(true));
        let mut off = row(&[("n", "2")]);
        off.insert("show".to_string(), Value::Bool(false));

        let mut ctx = Context::new();
        ctx.set("items", vec![on, off]);
        let out = render_str(
            "{{#LOOP items}}{{#IF show}}{{n}}{{#END_IF}}{{#END_LOOP}}",
            &ctx,
        );
        assert_eq!(out, "1");
    }

    #[test]
    fn test_loop_inside_if() {
        let mut ctx = Context::new();
        ctx.set("ok", true);
        ctx.set("items", vec![row(&[("n", "1")]), row(&[("n", "2")])]);
        let out = render_str(
            "{{#IF ok}}{{#LOOP items}}{{n}}{{#END_LOOP}}{{#END_IF}}",
            &ctx,
        );
        assert_eq!(out, "12");
    }

    #[test]
    fn test_nested_ifs_match_correct_end() {
        let mut ctx = Context::new();
        ctx.set("a", true);
        ctx.set("b", false);
        let out = render_str(
            "{{#IF a}}1{{#IF b}}2{{#END_IF}}3{{#END_IF}}4",
            &ctx,
        );
        assert_eq!(out, "134");
    }

    #[test]
    fn test_unmatched_if_is_structural_error() {
        let mut ctx = Context::new();
        ctx.set("ok", true);
        let err = render(&parse("{{#IF ok}}Y").unwrap(), &ctx).unwrap_err();
        assert!(matches!(err, Error::UnmatchedIf { .. }));
    }

    #[test]
    fn test_unmatched_loop_is_structural_error() {
        // Even when the data would have skipped the body entirely
        let ctx = Context::new();
        let err = render(&parse("{{#LOOP items}}x").unwrap(), &ctx).unwrap_err();
        assert!(matches!(err, Error::UnmatchedLoop { .. }));
    }

    #[test]
    fn test_stray_end_markers_skipped() {
        let ctx = Context::new();
        assert_eq!(render_str("a{{#END_IF}}b{{#END_LOOP}}c", &ctx), "abc");
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut ctx = Context::new();
        ctx.set("ok", true);
        ctx.set("items", vec![row(&[("n", "1")])]);
        let chunks = parse("{{#IF ok}}{{#LOOP items}}{{n}}{{#END_LOOP}}{{#END_IF}}").unwrap();
        let first = render(&chunks, &ctx).unwrap();
        let second = render(&chunks, &ctx).unwrap();
        assert_eq!(first, second);
    }
}
