use serde::{Deserialize, Serialize};

/// A blocklist entry. Removal is a soft delete: unblocked entries are kept
/// with `blocked = false` rather than dropped from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedApp {
    pub path: String,
    pub name: String,
    pub blocked: bool,
}

/// Canonicalizes an executable path for blocklist comparison: backslashes
/// become forward slashes and duplicate separators collapse. Case folding is
/// left to the storage layer (the path column compares NOCASE), so the
/// stored path keeps its display casing.
pub fn normalize_exe_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    let mut previous_was_separator = false;

    for ch in path.chars() {
        let ch = if ch == '\\' { '/' } else { ch };
        if ch == '/' {
            if previous_was_separator {
                continue;
            }
            previous_was_separator = true;
        } else {
            previous_was_separator = false;
        }
        normalized.push(ch);
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backslashes_become_forward_slashes() {
        assert_eq!(normalize_exe_path("C:\\Foo\\Bar.exe"), "C:/Foo/Bar.exe");
    }

    #[test]
    fn duplicate_separators_collapse() {
        assert_eq!(normalize_exe_path("C:\\Foo\\\\Bar.exe"), "C:/Foo/Bar.exe");
        assert_eq!(normalize_exe_path("C://Foo///Bar.exe"), "C:/Foo/Bar.exe");
    }

    #[test]
    fn forward_slash_paths_unchanged() {
        assert_eq!(normalize_exe_path("c:/foo/bar.exe"), "c:/foo/bar.exe");
        assert_eq!(normalize_exe_path("/usr/bin/firefox"), "/usr/bin/firefox");
    }

    #[test]
    fn mixed_variants_normalize_identically() {
        let normalized = [
            normalize_exe_path("C:\\Foo\\Bar.exe"),
            normalize_exe_path("C:/Foo/Bar.exe"),
            normalize_exe_path("C:\\Foo\\\\Bar.exe"),
        ];
        assert_eq!(normalized[0], normalized[1]);
        assert_eq!(normalized[1], normalized[2]);
    }
}
