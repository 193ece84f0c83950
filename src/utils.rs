//! # Utility Functions Module
//!
//! This module provides utility functions that improve code readability
//! and reduce boilerplate across the application.

/// Converts a vector of string-like items to Vec<String>.
///
/// This utility function accepts any iterable of items that can be converted
/// to String, eliminating repetitive `.to_string()` calls when building
/// external command argument lists.
///
/// # Example
/// ```rust
/// use media_compressor::utils::to_string_vec;
///
/// let bitrate = "1000K";
/// let args = to_string_vec(["-b:v", bitrate, "-loglevel", "error"]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Macro for even more convenient argument building.
///
/// Converts every item up front so mixed types (paths, numbers, literals)
/// can sit in one list.
///
/// # Example
/// ```rust
/// use media_compressor::args;
///
/// let crf = 23;
/// let args = args!["-c:v", "libx264", "-crf", crf];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        $crate::utils::to_string_vec([$(($item).to_string()),*])
    };
}

/// Get human-readable file size
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Percentage of space saved going from `original` to `compressed` bytes
pub fn savings_percent(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        0.0
    } else {
        (1.0 - (compressed as f64 / original as f64)) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_string_vec_string_literals() {
        let result = to_string_vec(["hello", "world"]);
        assert_eq!(result, vec!["hello".to_string(), "world".to_string()]);
    }

    #[test]
    fn test_to_string_vec_mixed_types() {
        let framerate = 30;
        let result = to_string_vec(["-r", &framerate.to_string(), "-loglevel"]);
        assert_eq!(
            result,
            vec!["-r".to_string(), "30".to_string(), "-loglevel".to_string()]
        );
    }

    #[test]
    fn test_args_macro() {
        let crf = 23;
        let result = args!["-crf", crf];
        assert_eq!(result, vec!["-crf".to_string(), "23".to_string()]);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_savings_percent() {
        assert_eq!(savings_percent(1000, 250), 75.0);
        assert_eq!(savings_percent(0, 0), 0.0);
    }
}
