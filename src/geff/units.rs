//! Unit string normalization.
//!
//! Free-form unit strings ("Micron", "sec", "nm") are mapped onto the
//! OME-Zarr vocabulary on a best-effort basis. Anything unrecognized passes
//! through lower-cased; this is never an error.

/// Normalizes a unit string to the OME-Zarr vocabulary.
///
/// Rules, checked in order on the lower-cased input:
/// - prefix `micro`, `µm` or `um` → `micrometer`
/// - prefix `nano` or `nm` → `nanometer`
/// - prefix `min` → `minute`
/// - prefix `sec` → `second`
/// - exactly `ms` → `millisecond`
/// - otherwise the lower-cased input
///
/// # Example
/// ```
/// use trackgeff::geff::normalize_unit;
///
/// assert_eq!(normalize_unit("Microns"), "micrometer");
/// assert_eq!(normalize_unit("Pixel"), "pixel");
/// ```
pub fn normalize_unit(unit: &str) -> String {
    let lower = unit.to_lowercase();

    if lower.starts_with("micro") || lower.starts_with("µm") || lower.starts_with("um") {
        return "micrometer".to_string();
    }
    if lower.starts_with("nano") || lower.starts_with("nm") {
        return "nanometer".to_string();
    }
    if lower.starts_with("min") {
        return "minute".to_string();
    }
    if lower.starts_with("sec") {
        return "second".to_string();
    }
    if lower == "ms" {
        return "millisecond".to_string();
    }
    lower
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spatial_units() {
        assert_eq!(normalize_unit("micron"), "micrometer");
        assert_eq!(normalize_unit("MICROMETER"), "micrometer");
        assert_eq!(normalize_unit("µm"), "micrometer");
        assert_eq!(normalize_unit("um"), "micrometer");
        assert_eq!(normalize_unit("nanometers"), "nanometer");
        assert_eq!(normalize_unit("nm"), "nanometer");
    }

    #[test]
    fn time_units() {
        assert_eq!(normalize_unit("min"), "minute");
        assert_eq!(normalize_unit("Minutes"), "minute");
        assert_eq!(normalize_unit("sec"), "second");
        assert_eq!(normalize_unit("Seconds"), "second");
        assert_eq!(normalize_unit("ms"), "millisecond");
        assert_eq!(normalize_unit("MS"), "millisecond");
    }

    #[test]
    fn ms_is_matched_literally() {
        assert_eq!(normalize_unit("msec"), "msec");
    }

    #[test]
    fn unknown_units_pass_through_lowercased() {
        assert_eq!(normalize_unit("Pixel"), "pixel");
        assert_eq!(normalize_unit("frame"), "frame");
        assert_eq!(normalize_unit(""), "");
    }
}
