//! # muscade
//!
//! A small text/HTML templating engine built on a flat chunk representation.
//!
//! muscade parses a template into an ordered sequence of chunks (literal
//! text, value references, directive markers) and renders that sequence
//! against a data context, with support for:
//! - **Value substitution**: `{{name}}`
//! - **Conditionals**: `{{#IF name}} ... {{#END_IF}}` and
//!   `{{#IF_NOT name}} ... {{#END_IF}}`, arbitrarily nested
//! - **Loops**: `{{#LOOP name}} ... {{#END_LOOP}}` over lists of objects,
//!   each row rendered against its own context
//! - **Chunk caching**: parsed templates are reused until a fixed
//!   expiration threshold forces a re-parse
//! - **Graceful degradation**: missing keys and mistyped data render as
//!   inline diagnostic placeholders instead of aborting
//!
//! ## Example
//!
//! ```text
//! use muscade::{Context, Engine, InMemoryLoader};
//!
//! let mut loader = InMemoryLoader::new();
//! loader.add("hello.html", "Hello, {{name}}!");
//!
//! let mut engine = Engine::new(loader);
//! let mut ctx = Context::new();
//! ctx.set("name", "World");
//!
//! let output = engine.process("hello.html", &ctx)?;
//! assert_eq!(output, "Hello, World!");
//! ```

mod cache;
mod chunk;
mod error;
mod parser;
mod render;
mod value;

pub use cache::{CACHE_EXPIRATION, ChunkCache, Clock, SystemClock};
pub use chunk::{Chunk, ChunkKind};
pub use error::{Error, Result};
pub use parser::parse;
pub use render::{Engine, FileLoader, InMemoryLoader, TemplateLoader, render};
pub use value::{Context, Dict, Value, is_boolean_string, is_trueish};
