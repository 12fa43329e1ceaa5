//! Expression reducer
//!
//! Evaluates value-language expressions to literal [`jz_ast::Value`]s: variable
//! substitution, calls to `@function` definitions and built-ins, CSS-aware
//! arithmetic with unit conversion, and the control flow allowed in function
//! bodies.

mod builtins;
pub mod control;
mod error;
mod reducer;
pub mod units;

pub use builtins::Builtins;
pub use control::{DanglingElse, Step, statements};
pub use error::ReduceError;
pub use reducer::{MAX_LOOP_ITERATIONS, ReduceOptions, Reducer};
