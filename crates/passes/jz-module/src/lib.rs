//! Modules and their export registries
//!
//! A [`Module`] is identified by its path, evaluated according to its
//! [`ModuleType`], and publishes a [`ModuleMembers`] registry once compiled.
//! Importers only ever read finalized registries.

mod export;
mod members;
mod module;

pub use export::{ExportError, ExportSource, process_export};
pub use members::{ClassReference, Export, ModuleMembers};
pub use module::{EXTENSIONS, IdentifierScope, Module, ModuleType, TOP_LEVEL_EXTENSION};
