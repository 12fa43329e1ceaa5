//! Compilation driver
//!
//! [`Compilation`] owns the scope frames and the compiled modules. Each module
//! is walked once: declarations are reduced, imports bind the exports of
//! already compiled dependencies, mixins and control flow are expanded, and the
//! result is an [`EvaluatedStylesheet`] of literal nodes plus a finalized export
//! registry readable through [`Compilation::exports_of`].

mod compilation;
mod error;
mod logging;
mod options;
mod output;
mod walk;

pub use compilation::Compilation;
pub use error::{CompileError, PositionedError};
pub use logging::init_tracing;
pub use options::CompileOptions;
pub use output::{EvaluatedStylesheet, OutputNode};
