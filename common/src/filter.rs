//! Filename eligibility for directory comparison
//!
//! Only names directly under a compared directory are ever checked, so the filter works on
//! a single path component. Names starting with `.` (hidden) or `_` (private/scratch) never take
//! part in comparison or copying, regardless of which side they are found on.
//!
//! # Examples
//!
//! ```
//! use common::filter::{check, is_eligible, FilterResult};
//! use std::ffi::OsStr;
//!
//! assert!(is_eligible(OsStr::new("movie.mkv")));
//! assert!(!is_eligible(OsStr::new(".DS_Store")));
//! assert!(matches!(check(OsStr::new("_draft")), FilterResult::ExcludedPrivate));
//! ```

use std::ffi::OsStr;

/// Result of checking whether a filename should be compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    /// name takes part in comparison
    Included,
    /// name starts with `.`
    ExcludedHidden,
    /// name starts with `_`
    ExcludedPrivate,
}

impl FilterResult {
    pub fn is_included(&self) -> bool {
        matches!(self, FilterResult::Included)
    }
}

/// Classify a filename. Non UTF-8 names are handled: only the first byte matters.
pub fn check(name: &OsStr) -> FilterResult {
    match name.as_encoded_bytes().first() {
        Some(b'.') => FilterResult::ExcludedHidden,
        Some(b'_') => FilterResult::ExcludedPrivate,
        _ => FilterResult::Included,
    }
}

pub fn is_eligible(name: &OsStr) -> bool {
    check(name).is_included()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_names_included() {
        for name in ["a.txt", "file_1.bin", "Films", "x.", "x_", "-dash"] {
            assert!(is_eligible(OsStr::new(name)), "{name} should be eligible");
        }
    }

    #[test]
    fn test_hidden_excluded() {
        assert_eq!(check(OsStr::new(".hidden")), FilterResult::ExcludedHidden);
        assert_eq!(check(OsStr::new(".")), FilterResult::ExcludedHidden);
        assert_eq!(check(OsStr::new("..")), FilterResult::ExcludedHidden);
    }

    #[test]
    fn test_underscore_excluded() {
        assert_eq!(check(OsStr::new("_tmp")), FilterResult::ExcludedPrivate);
        assert_eq!(check(OsStr::new("__init__")), FilterResult::ExcludedPrivate);
    }

    #[test]
    fn test_only_first_character_matters() {
        // "._foo" is hidden, not private
        assert_eq!(check(OsStr::new("._foo")), FilterResult::ExcludedHidden);
        assert_eq!(check(OsStr::new("_.foo")), FilterResult::ExcludedPrivate);
        assert!(is_eligible(OsStr::new("a.b_c")));
    }

    #[test]
    fn test_empty_name_included() {
        assert!(is_eligible(OsStr::new("")));
    }

    #[test]
    fn test_non_utf8_name() {
        use std::os::unix::ffi::OsStrExt;
        assert!(is_eligible(OsStr::from_bytes(b"\xffname")));
        assert!(!is_eligible(OsStr::from_bytes(b".\xff")));
    }

    proptest! {
        #[test]
        fn dot_or_underscore_prefix_never_eligible(prefix in "[._]", rest in ".*") {
            let name = format!("{prefix}{rest}");
            prop_assert!(!is_eligible(OsStr::new(&name)));
        }

        #[test]
        fn other_prefix_always_eligible(first in "[^._]", rest in ".*") {
            let name = format!("{first}{rest}");
            prop_assert!(is_eligible(OsStr::new(&name)));
        }
    }
}
