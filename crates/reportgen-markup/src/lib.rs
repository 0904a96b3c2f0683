//! Safe conversion of model-written text into LaTeX
//!
//! Model output is untrusted: anything that is not one of the recognised
//! markdown constructs is rendered literally. Three layers:
//!
//! - [`escape`] makes a literal span safe to embed in a document
//! - [`render_inline`] handles `**bold**`, `*italic*` and `` `code` `` spans
//! - [`transform`] classifies lines (headings, list items, quotes, code
//!   fences) and keeps list environments balanced

mod escape;
mod inline;
mod title;
mod transform;

pub use escape::{SPECIAL_CHARS, escape, escape_into};
pub use inline::{InlineStyle, render_inline};
pub use title::{UNTITLED, clean_title};
pub use transform::{LineKind, classify_line, transform};
