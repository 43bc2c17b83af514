//! Compiler from the neutral resource schema to per-tool files.
//!
//! Each compile target has an [`Emitter`] that decides file extension,
//! front matter and body decoration. The [`Compiler`] parses source
//! documents, checks them against the package kind and asks the emitter to
//! render one file per rule or prompt. Nothing here touches the filesystem.
//!
//! The [`convert`] module goes the other way, turning tool-specific
//! Markdown into a neutral resource document.

pub mod amazonq;
pub mod compiler;
pub mod convert;
pub mod copilot;
pub mod cursor;
pub mod emitter;
pub mod error;
pub mod markdown;
pub mod naming;
pub mod target;

pub use compiler::{CompileFailure, CompileOptions, CompileReport, Compiler};
pub use convert::{ConvertOptions, convert_file, convert_files};
pub use emitter::{Emitter, emitter_for};
pub use error::{Error, Result};
pub use naming::is_compilable;
pub use target::CompileTarget;
