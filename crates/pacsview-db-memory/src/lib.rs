//! In-memory storage backend.
//!
//! Implements every pacsview repository trait over plain maps behind an
//! `RwLock`. The study search evaluates the filter model with exactly the
//! semantics the compiled SQL has, so tests exercise the same behavior a
//! relational backend would exhibit.

mod eval;
mod store;

pub use store::MemoryStore;
