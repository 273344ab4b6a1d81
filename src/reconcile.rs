//! Local-tree vs remote-listing reconciliation
//!
//! Offline diagnostic for the asset mirror: walks a local directory tree,
//! normalizes every file to the same forward-slash key the resolver and
//! uploader use, and classifies it against the remote object listing.
//! Every local file lands in exactly one bucket: present remotely, present
//! under a different case (a mismatch to fix), or missing (to upload).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A local file whose key exists remotely only under different casing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseMismatch {
    /// The key the local tree expects
    pub expected: String,

    /// The key actually present in the remote listing
    pub actual: String,
}

/// Classification of a local file set against a remote key set
///
/// The three vectors partition the input: each local key appears in exactly
/// one of them.
#[derive(Debug, Default, Clone)]
pub struct DiffReport {
    /// Keys present remotely with an exact match
    pub matched: Vec<String>,

    /// Keys present remotely under different casing
    pub case_mismatches: Vec<CaseMismatch>,

    /// Keys absent remotely, to be uploaded
    pub missing: Vec<String>,
}

/// Classifies every local key against the remote listing
///
/// Case-insensitive matching uses a lowercased index of the remote keys;
/// when several remote keys collapse to the same lowercase form, the first
/// one encountered wins. Output vectors are sorted for stable reports.
pub fn classify(local_keys: &[String], remote_keys: &HashSet<String>) -> DiffReport {
    let mut remote_lower: HashMap<String, &String> = HashMap::new();
    for key in remote_keys {
        remote_lower.entry(key.to_lowercase()).or_insert(key);
    }

    let mut report = DiffReport::default();
    for key in local_keys {
        if remote_keys.contains(key) {
            report.matched.push(key.clone());
        } else if let Some(actual) = remote_lower.get(&key.to_lowercase()) {
            report.case_mismatches.push(CaseMismatch {
                expected: key.clone(),
                actual: (*actual).clone(),
            });
        } else {
            report.missing.push(key.clone());
        }
    }

    report.matched.sort();
    report.missing.sort();
    report
        .case_mismatches
        .sort_by(|a, b| a.expected.cmp(&b.expected));
    report
}

/// Collects every file under a root directory (iterative, no recursion)
pub fn walk_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                stack.push(entry.path());
            } else if file_type.is_file() {
                out.push(entry.path());
            }
        }
    }
    Ok(out)
}

/// Converts a file path into its forward-slash key relative to a root
///
/// Returns None when the file is not under the root. Both the resolver and
/// the uploader key objects this way, so reconciliation findings line up
/// with what the live request path would look for.
pub fn relative_key(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

/// Files never mirrored: packaging metadata and runtime save data
pub fn is_excluded(relative: &str) -> bool {
    if relative == "package.json" || relative.ends_with("/package.json") {
        return true;
    }
    if relative.starts_with("save/") || relative.contains("/save/") {
        return true;
    }
    false
}

/// Groups keys by their first path segment under a prefix, largest first
pub fn top_level_breakdown(keys: &[String], prefix: &str) -> Vec<(String, usize)> {
    let mut groups: BTreeMap<String, usize> = BTreeMap::new();
    for key in keys {
        let rest = key.strip_prefix(prefix).unwrap_or(key);
        let top = rest.split('/').next().unwrap_or("(root)");
        let top = if top.is_empty() { "(root)" } else { top };
        *groups.entry(top.to_string()).or_insert(0) += 1;
    }
    let mut out: Vec<(String, usize)> = groups.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn remote(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn classification_partitions_the_local_set() {
        let local = keys(&[
            "games/a/index.html",
            "games/a/img/title.png",
            "games/a/JS/main.js",
            "games/a/audio/theme.ogg",
        ]);
        let remote = remote(&[
            "games/a/index.html",
            "games/a/js/main.js",
            "games/b/unrelated.png",
        ]);

        let report = classify(&local, &remote);

        assert_eq!(report.matched, keys(&["games/a/index.html"]));
        assert_eq!(report.case_mismatches.len(), 1);
        assert_eq!(report.case_mismatches[0].expected, "games/a/JS/main.js");
        assert_eq!(report.case_mismatches[0].actual, "games/a/js/main.js");
        assert_eq!(
            report.missing,
            keys(&["games/a/audio/theme.ogg", "games/a/img/title.png"])
        );

        // Exactly one bucket per input key
        let total =
            report.matched.len() + report.case_mismatches.len() + report.missing.len();
        assert_eq!(total, local.len());
    }

    #[test]
    fn case_mismatch_reports_the_actual_remote_key() {
        let local = keys(&["games/mouseHit/js/main.js"]);
        let remote = remote(&["games/mouseHit/JS/main.js"]);

        let report = classify(&local, &remote);

        assert!(report.matched.is_empty());
        assert!(report.missing.is_empty());
        assert_eq!(report.case_mismatches[0].actual, "games/mouseHit/JS/main.js");
    }

    #[test]
    fn empty_remote_marks_everything_missing() {
        let local = keys(&["games/x/a.png", "games/x/b.png"]);
        let report = classify(&local, &HashSet::new());
        assert_eq!(report.missing.len(), 2);
        assert!(report.matched.is_empty());
        assert!(report.case_mismatches.is_empty());
    }

    #[test]
    fn relative_key_uses_forward_slashes() {
        let root = Path::new("/srv/public");
        let file = root.join("games").join("mouseHit").join("js").join("main.js");
        assert_eq!(
            relative_key(root, &file).as_deref(),
            Some("games/mouseHit/js/main.js")
        );
        assert_eq!(relative_key(root, Path::new("/elsewhere/x")), None);
    }

    #[test]
    fn save_data_and_package_json_are_excluded() {
        assert!(is_excluded("package.json"));
        assert!(is_excluded("www/package.json"));
        assert!(is_excluded("save/slot1.rpgsave"));
        assert!(is_excluded("www/save/slot1.rpgsave"));
        assert!(!is_excluded("js/main.js"));
    }

    #[test]
    fn breakdown_groups_by_first_segment_under_the_prefix() {
        let missing = keys(&[
            "games/bloodmoney/img/a.png",
            "games/bloodmoney/img/b.png",
            "games/bloodmoney/audio/c.ogg",
        ]);
        let breakdown = top_level_breakdown(&missing, "games/bloodmoney/");
        assert_eq!(
            breakdown,
            vec![("img".to_string(), 2), ("audio".to_string(), 1)]
        );
    }
}
