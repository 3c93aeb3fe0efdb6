use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The SDK's own list of bundled packages, keyed by package name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityList {
    pub path: PathBuf,
    pub packages: BTreeSet<String>,
}

impl AuthorityList {
    pub fn contains(&self, package: &str) -> bool {
        self.packages.contains(package)
    }
}

/// Where the authority file may live: the app's own install first, then a
/// hoisted install at the workspace root.
pub fn authority_candidates(
    app_dir: &Path,
    workspace_root: &Path,
    sdk_package: &str,
    file_name: &str,
) -> Vec<PathBuf> {
    let mut out = vec![app_dir
        .join("node_modules")
        .join(sdk_package)
        .join(file_name)];
    let hoisted = workspace_root
        .join("node_modules")
        .join(sdk_package)
        .join(file_name);
    if !out.contains(&hoisted) {
        out.push(hoisted);
    }
    out
}

/// Load the first usable authority list among `candidates`.
///
/// A candidate is usable when it parses as a JSON object with at least one key.
pub fn load_authority_list(candidates: &[PathBuf]) -> Option<AuthorityList> {
    for path in candidates {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                debug!("authority list {} unavailable: {e}", path.display());
                continue;
            }
        };
        let packages: BTreeSet<String> = match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map.keys().cloned().collect(),
            Ok(_) => {
                debug!("authority list {} is not an object", path.display());
                continue;
            }
            Err(e) => {
                debug!("authority list {} is malformed: {e}", path.display());
                continue;
            }
        };
        if packages.is_empty() {
            debug!("authority list {} is empty", path.display());
            continue;
        }
        debug!(
            "loaded {} managed packages from {}",
            packages.len(),
            path.display()
        );
        return Some(AuthorityList {
            path: path.clone(),
            packages,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn candidates_prefer_app_install() {
        let c = authority_candidates(
            Path::new("/ws/apps/mobile"),
            Path::new("/ws"),
            "expo",
            "bundledNativeModules.json",
        );
        assert_eq!(
            c,
            vec![
                PathBuf::from("/ws/apps/mobile/node_modules/expo/bundledNativeModules.json"),
                PathBuf::from("/ws/node_modules/expo/bundledNativeModules.json"),
            ]
        );
    }

    #[test]
    fn loads_keys_of_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundled.json");
        write(
            &path,
            r#"{"expo-image":"~2.0.0","react-native":"0.76.3","date-fns":"^3.0.0"}"#,
        );
        let list = load_authority_list(&[path.clone()]).unwrap();
        assert_eq!(list.path, path);
        assert!(list.contains("react-native"));
        assert!(!list.contains("lodash"));
        assert_eq!(list.packages.len(), 3);
    }

    #[test]
    fn falls_through_missing_malformed_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let malformed = dir.path().join("malformed.json");
        let empty = dir.path().join("empty.json");
        let array = dir.path().join("array.json");
        let good = dir.path().join("good.json");
        write(&malformed, "{");
        write(&empty, "{}");
        write(&array, r#"["expo"]"#);
        write(&good, r#"{"expo-font":"~13.0.1"}"#);

        let list = load_authority_list(&[missing, malformed, empty, array, good.clone()]).unwrap();
        assert_eq!(list.path, good);
    }

    #[test]
    fn none_when_no_candidate_usable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_authority_list(&[dir.path().join("nope.json")]).is_none());
    }
}
