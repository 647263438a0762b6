use hq_fs::{IgnoreSet, normalize_relative};
use proptest::prelude::*;

proptest! {
    #[test]
    fn normalized_paths_have_no_backslashes_or_empty_components(s in "[a-z./\\\\]{0,40}") {
        let normalized = normalize_relative(&s);

        prop_assert!(!normalized.contains('\\'));
        prop_assert!(!normalized.contains("//"));
        prop_assert!(!normalized.starts_with('/'));
        prop_assert!(!normalized.ends_with('/'));
        prop_assert!(!normalized.split('/').any(|c| c == "." || c == ".."));
    }

    #[test]
    fn normalization_is_idempotent(s in "[a-z./\\\\]{0,40}") {
        let once = normalize_relative(&s);
        prop_assert_eq!(normalize_relative(&once), once.clone());
    }

    #[test]
    fn windows_separators_match_identically(parts in prop::collection::vec("[a-z]{1,8}", 1..5)) {
        let set = IgnoreSet::standard();
        let mut with_modules = parts.clone();
        with_modules.insert(0, "node_modules".to_string());
        let unix = with_modules.join("/");
        let windows = with_modules.join("\\");

        prop_assert_eq!(set.is_ignored(&unix, false), set.is_ignored(&windows, false));
        prop_assert!(set.is_ignored(&unix, false));
    }
}
