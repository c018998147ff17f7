use std::collections::BTreeMap;

use serde::Serialize;

/// Key the host's software update hook files this descriptor under
pub const UPDATE_KEY: &str = "emailnotifier";

/// Describes where the host's self update mechanism finds new releases
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateInformation {
    #[serde(rename = "displayName")]
    pub display_name: &'static str,
    #[serde(rename = "displayVersion")]
    pub display_version: &'static str,
    #[serde(rename = "type")]
    pub check_type: &'static str,
    pub user: &'static str,
    pub repo: &'static str,
    pub current: &'static str,
    pub pip: &'static str,
    pub dependency_links: bool,
}

pub fn update_information() -> BTreeMap<&'static str, UpdateInformation> {
    let version = env!("CARGO_PKG_VERSION");
    BTreeMap::from([(
        UPDATE_KEY,
        UpdateInformation {
            display_name: "EmailNotifier Plugin",
            display_version: version,
            check_type: "github_release",
            user: "anoved",
            repo: "OctoPrint-EmailNotifier",
            current: version,
            pip: "https://github.com/anoved/OctoPrint-EmailNotifier/archive/{target_version}.zip",
            dependency_links: false,
        },
    )])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_uses_host_field_names() {
        let actual = serde_json::to_value(update_information()).unwrap();
        let info = &actual[UPDATE_KEY];

        assert_eq!(info["displayName"], "EmailNotifier Plugin");
        assert_eq!(info["type"], "github_release");
        assert_eq!(info["current"], env!("CARGO_PKG_VERSION"));
        assert_eq!(info["displayVersion"], info["current"]);
        assert_eq!(info["dependency_links"], false);
        assert!(info["pip"]
            .as_str()
            .unwrap()
            .ends_with("/archive/{target_version}.zip"));
    }
}
