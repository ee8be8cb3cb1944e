//! Tweet metadata and media extraction for archiving.
//!
//! Only the Twitter/X pipeline exists so far; see [`twitter`].
pub mod twitter;
