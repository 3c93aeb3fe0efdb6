use sdkpin_workspace::ManifestEntry;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// The workspace member that hosts the mobile SDK; the context every probe runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SdkApp {
    pub dir: PathBuf,
    pub manifest_rel_path: String,
    pub sdk_package: String,
}

impl SdkApp {
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// The first member (in discovery order) declaring `sdk_package` in
/// `dependencies` or `devDependencies`.
pub fn find_sdk_app(members: &[ManifestEntry], sdk_package: &str) -> Option<SdkApp> {
    members
        .iter()
        .find(|m| m.manifest.declares_runtime_or_dev(sdk_package))
        .map(|m| SdkApp {
            dir: m
                .path
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
            manifest_rel_path: m.rel_path.clone(),
            sdk_package: sdk_package.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdkpin_schema::parse_manifest_str;

    fn entry(rel: &str, json: &str) -> ManifestEntry {
        ManifestEntry {
            path: PathBuf::from("/ws").join(rel),
            rel_path: rel.to_owned(),
            manifest: parse_manifest_str(json).unwrap(),
        }
    }

    #[test]
    fn finds_first_member_with_sdk() {
        let members = vec![
            entry("apps/web/package.json", r#"{"name":"web","dependencies":{"next":"15.0.0"}}"#),
            entry(
                "apps/mobile/package.json",
                r#"{"name":"mobile","dependencies":{"expo":"~52.0.0"}}"#,
            ),
            entry(
                "apps/tablet/package.json",
                r#"{"name":"tablet","devDependencies":{"expo":"~52.0.0"}}"#,
            ),
        ];
        let app = find_sdk_app(&members, "expo").unwrap();
        assert_eq!(app.dir, PathBuf::from("/ws/apps/mobile"));
        assert_eq!(app.manifest_rel_path, "apps/mobile/package.json");
    }

    #[test]
    fn peer_only_declaration_does_not_count() {
        let members = vec![entry(
            "packages/ui/package.json",
            r#"{"name":"ui","peerDependencies":{"expo":"*"}}"#,
        )];
        assert!(find_sdk_app(&members, "expo").is_none());
    }
}
