//! # treenorm-core — Foundational Types for the Tree Normalizer
//!
//! Leaf crate of the treenorm workspace: it defines the path model, the
//! JSON value navigation helpers, and the violation taxonomy that the
//! normalizer proper (`treenorm`) builds on. It depends on nothing
//! internal.
//!
//! ## Key Design Principles
//!
//! 1. **Typed path segments.** A location in the tree is a `TreePath` of
//!    `Segment::Key` / `Segment::Index` values, not a pre-rendered string.
//!    Rendering and relative parsing live in one place.
//!
//! 2. **Re-navigation over aliasing.** `get` / `get_mut` / `exists`
//!    resolve a path from the root on every use. The walker in `treenorm`
//!    never threads `&mut` references through recursion, so each mutation
//!    has a single unambiguous owner.
//!
//! 3. **Violations are data.** A failed check is a `(path, ErrorKind)`
//!    entry in a `Violations` sink, collected across the whole walk and
//!    only surfaced as `NormalizeError` at the very end.
//!
//! ## Crate Policy
//!
//! - No dependencies on other treenorm crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - Public plain-data types derive `Debug`, `Clone`, `Serialize`,
//!   `Deserialize`.

pub mod error;
pub mod path;
pub mod tree;

// Re-export primary types for ergonomic imports.
pub use error::{ErrorKind, NormalizeError, Violations};
pub use path::{Segment, TreePath};
pub use tree::{exists, get, get_mut, TypeTag};
