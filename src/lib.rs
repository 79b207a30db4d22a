//! coax - coax loosely structured model output into validated
//! hardware-platform configuration records.
//!
//! A local text-generation model is asked to emit one configuration record
//! (CPU cluster, chiplet, bus, interface, event, operation) as JSON. Model
//! output is unreliable: wrapped in prose, truncated mid-structure, keys
//! misspelled, values loosely typed. This crate turns that output into a
//! validated record, or hands back the best-effort payload when it cannot:
//!
//! 1. [`repair`] cuts the brace-delimited snippet out of the completion and
//!    heals truncation by appending the missing closers.
//! 2. [`registry`] narrows the statically declared record universe to the
//!    candidate types named in the retrieved schema context.
//! 3. [`normalize`] reshapes the parsed mapping toward each candidate's
//!    declared form: key repair, synonym tables, quantity coercion.
//! 4. [`schema`] constructors enforce the actual constraints; the first
//!    candidate that constructs wins ([`pipeline`]).
//!
//! The external collaborators (schema retrieval, text generation) sit
//! behind traits in [`retrieval`] and [`generate`]. [`xmlcheck`] is the
//! sibling utility that checks XML documents against the same record
//! universe.

pub mod generate;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod registry;
pub mod repair;
pub mod retrieval;
pub mod schema;
pub mod xmlcheck;

pub use generate::{GenerationError, MockGenerator, ModelRunner, TextGenerator};
pub use pipeline::{validate_as, validate_first, Outcome, Pipeline, RequestError};
pub use registry::{candidates, RecordKind, RecordSpec, REGISTRY};
pub use repair::{extract_object, repair_snippet, ExtractError};
pub use retrieval::{SchemaRetriever, SnippetStore};
pub use schema::ValidationFailure;
