//! Text-level helpers for the portal's markup.
//!
//! The portal emits a fixed, often slightly invalid HTML dialect. Instead of
//! building a DOM, pages are whitespace-normalised and elements are isolated by
//! counting opening and closing tags of one kind over the flat text.

mod scan;
mod text;

pub use scan::{extract_elements, find_balanced, TagMatch};
pub use text::normalize_whitespace;
