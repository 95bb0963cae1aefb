//! In-memory model of an audio CD table of contents.
//!
//! A [`toc::Table`] is built incrementally from tracks and indexes, resolved
//! against one or more backing source files, and then queried for the disc
//! identifiers used by CDDB, MusicBrainz and AccurateRip lookups, or dumped
//! as a cue sheet. The crate performs no I/O of its own.

pub mod cd;
pub mod toc;
pub mod util;
