//! CSS unit conversion

use std::f64::consts::PI;

/// Group of mutually convertible units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitFamily {
    /// Absolute lengths, canonical `px`
    Length,
    /// Angles, canonical `deg`
    Angle,
    /// Times, canonical `ms`
    Time,
    /// Frequencies, canonical `hz`
    Frequency,
    /// Resolutions, canonical `dppx`
    Resolution,
}

impl UnitFamily {
    /// Canonical unit of the family
    #[must_use]
    pub fn canonical(self) -> &'static str {
        match self {
            Self::Length => "px",
            Self::Angle => "deg",
            Self::Time => "ms",
            Self::Frequency => "hz",
            Self::Resolution => "dppx",
        }
    }
}

/// Family of `unit` and how many canonical units one `unit` is
#[must_use]
pub fn unit_info(unit: &str) -> Option<(UnitFamily, f64)> {
    let info = match unit.to_ascii_lowercase().as_str() {
        "px" => (UnitFamily::Length, 1.0),
        "in" => (UnitFamily::Length, 96.0),
        "cm" => (UnitFamily::Length, 96.0 / 2.54),
        "mm" => (UnitFamily::Length, 96.0 / 25.4),
        "q" => (UnitFamily::Length, 96.0 / 101.6),
        "pt" => (UnitFamily::Length, 96.0 / 72.0),
        "pc" => (UnitFamily::Length, 16.0),
        "deg" => (UnitFamily::Angle, 1.0),
        "grad" => (UnitFamily::Angle, 0.9),
        "rad" => (UnitFamily::Angle, 180.0 / PI),
        "turn" => (UnitFamily::Angle, 360.0),
        "ms" => (UnitFamily::Time, 1.0),
        "s" => (UnitFamily::Time, 1000.0),
        "hz" => (UnitFamily::Frequency, 1.0),
        "khz" => (UnitFamily::Frequency, 1000.0),
        "dppx" | "x" => (UnitFamily::Resolution, 1.0),
        "dpi" => (UnitFamily::Resolution, 1.0 / 96.0),
        "dpcm" => (UnitFamily::Resolution, 2.54 / 96.0),
        _ => return None,
    };
    Some(info)
}

/// Unit two operands are combined in, `None` when they cannot be combined
///
/// Equal units stay as they are, a unitless operand adopts the other unit, and
/// convertible units meet in their family's canonical unit.
#[must_use]
pub fn common_unit<'a>(left: &'a str, right: &'a str) -> Option<&'a str> {
    if left.eq_ignore_ascii_case(right) {
        return Some(left);
    }
    if left.is_empty() {
        return Some(right);
    }
    if right.is_empty() {
        return Some(left);
    }

    let (left_family, _) = unit_info(left)?;
    let (right_family, _) = unit_info(right)?;
    (left_family == right_family).then(|| left_family.canonical())
}

/// `value` expressed in `to`; unitless values pass through unchanged
#[must_use]
pub fn convert(value: f64, from: &str, to: &str) -> Option<f64> {
    if from.is_empty() || to.is_empty() || from.eq_ignore_ascii_case(to) {
        return Some(value);
    }

    let (from_family, from_factor) = unit_info(from)?;
    let (to_family, to_factor) = unit_info(to)?;
    (from_family == to_family).then(|| value * from_factor / to_factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_unit() {
        assert_eq!(common_unit("px", "px"), Some("px"));
        assert_eq!(common_unit("", "em"), Some("em"));
        assert_eq!(common_unit("in", "px"), Some("px"));
        assert_eq!(common_unit("s", "ms"), Some("ms"));
        assert_eq!(common_unit("px", "em"), None);
        assert_eq!(common_unit("px", "deg"), None);
    }

    #[test]
    fn test_convert() {
        assert_eq!(convert(1.0, "in", "px"), Some(96.0));
        assert_eq!(convert(1.0, "turn", "deg"), Some(360.0));
        assert_eq!(convert(2.0, "s", "ms"), Some(2000.0));
        assert_eq!(convert(5.0, "", "px"), Some(5.0));
        assert_eq!(convert(1.0, "px", "%"), None);
    }
}
