//! Two-decimal rounding and lenient numeric parsing shared by every stage.

/// Round half away from zero to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parse a price-like cell. Thousands separators and surrounding whitespace
/// are tolerated; anything that is not a finite number yields `None`.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cleaned: String = cell.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(round2(1.005_000_1), 1.01);
        assert_eq!(round2(-2.345_01), -2.35);
        assert_eq!(round2(100.0), 100.0);
    }

    #[test]
    fn parse_number_accepts_separators() {
        assert_eq!(parse_number(" 17,245.65 "), Some(17245.65));
        assert_eq!(parse_number("42"), Some(42.0));
    }

    #[test]
    fn parse_number_rejects_garbage() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number("null"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
    }
}
