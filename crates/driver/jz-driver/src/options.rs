//! Compilation options

use anyhow::Context;
use jz_graph::DiscoverOptions;
use jz_reduce::ReduceOptions;
use serde::Deserialize;

/// Options shared by every module of a compilation
///
/// Loaded from TOML with kebab-case keys; missing keys take their defaults.
///
/// ```toml
/// division-in-values = false
/// class-name-template = "[module]__[name]"
/// builtin-modules = true
/// max-call-depth = 64
/// fail-fast-resolution = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CompileOptions {
    /// Whether `/` divides in plain declaration values
    pub division_in_values: bool,
    /// Generated class names, `[name]` and `[module]` are substituted
    pub class_name_template: String,
    /// Whether `@use "math"` and friends are available
    pub builtin_modules: bool,
    /// Maximum nesting of function and mixin invocations
    pub max_call_depth: usize,
    /// Stop dependency discovery at the first failure
    pub fail_fast_resolution: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            division_in_values: false,
            class_name_template: "[name]".to_string(),
            builtin_modules: true,
            max_call_depth: 64,
            fail_fast_resolution: false,
        }
    }
}

impl CompileOptions {
    /// Parses options from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error for malformed TOML, unknown keys and mistyped values.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("Failed to parse compile options")
    }

    /// Reducer knobs
    #[must_use]
    pub fn reduce_options(&self) -> ReduceOptions {
        ReduceOptions {
            division_in_values: self.division_in_values,
            max_call_depth: self.max_call_depth,
        }
    }

    /// Dependency discovery knobs
    #[must_use]
    pub fn discover_options(&self) -> DiscoverOptions {
        DiscoverOptions {
            fail_fast: self.fail_fast_resolution,
        }
    }
}
