//! Errors for scope lookups and declarations

use crate::member::MemberKind;
use jz_span::FileSpan;
use std::mem;
use thiserror::Error;

/// Errors raised while declaring or resolving names
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// Name already declared in the same frame
    #[error("{kind} {name} has already been declared in this scope")]
    DuplicateDeclaration {
        /// The redeclared name
        name: String,
        /// Kind of the second declaration
        kind: MemberKind,
        /// Location of the second declaration
        span: FileSpan,
    },

    /// Name not visible from the use site
    #[error("Undefined {kind} {name}{}", did_you_mean(.suggestions))]
    Unresolved {
        /// The name that was not found
        name: String,
        /// Kind that was looked up
        kind: MemberKind,
        /// Where the name was used
        span: FileSpan,
        /// Visible names close to `name`
        suggestions: Vec<String>,
    },
}

impl ScopeError {
    /// Location of the offending name
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::DuplicateDeclaration { span, .. } | Self::Unresolved { span, .. } => *span,
        }
    }

    /// Up to three names within edit distance 3 of `name`, closest first
    #[must_use]
    pub fn compute_suggestions<'a>(
        name: &str,
        available: impl IntoIterator<Item = &'a str>,
    ) -> Vec<String> {
        let mut suggestions: Vec<(&str, usize)> = available
            .into_iter()
            .filter(|candidate| *candidate != name)
            .map(|candidate| (candidate, levenshtein_distance(name, candidate)))
            .filter(|(_, distance)| *distance <= 3)
            .collect();

        suggestions.sort_by_key(|(_, distance)| *distance);
        suggestions.dedup_by_key(|(candidate, _)| *candidate);
        suggestions
            .into_iter()
            .take(3)
            .map(|(candidate, _)| candidate.to_string())
            .collect()
    }
}

fn did_you_mean(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(", did you mean {}?", suggestions.join(" or "))
    }
}

/// Levenshtein distance over characters
fn levenshtein_distance(source: &str, target: &str) -> usize {
    let source: Vec<char> = source.chars().collect();
    let target: Vec<char> = target.chars().collect();

    if source.is_empty() {
        return target.len();
    }
    if target.is_empty() {
        return source.len();
    }

    let mut previous: Vec<usize> = (0..=target.len()).collect();
    let mut current = vec![0; target.len() + 1];

    for (idx, source_char) in source.iter().enumerate() {
        current[0] = idx + 1;
        for (jdx, target_char) in target.iter().enumerate() {
            let cost = usize::from(source_char != target_char);
            current[jdx + 1] = (previous[jdx + 1] + 1)
                .min(current[jdx] + 1)
                .min(previous[jdx] + cost);
        }
        mem::swap(&mut previous, &mut current);
    }

    previous[target.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("$gap", "$gap"), 0);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("$primary", "$primry"), 1);
    }

    #[test]
    fn test_unresolved_message() {
        let error = ScopeError::Unresolved {
            name: "$colr".to_string(),
            kind: MemberKind::Variable,
            span: FileSpan::default(),
            suggestions: ScopeError::compute_suggestions(
                "$colr",
                ["$color", "$width", "$col"],
            ),
        };
        assert_eq!(
            error.to_string(),
            "Undefined variable $colr, did you mean $color or $col?"
        );
    }
}
