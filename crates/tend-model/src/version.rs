use serde::{Deserialize, Serialize};

/// Tag the upgrade responder attaches to the release it considers current.
pub const TAG_LATEST: &str = "latest";

/// One release known to the upgrade responder.
///
/// Field casing follows the responder's payload exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionDescriptor {
    /// Release version, in semantic versioning form.
    pub name: String,
    pub release_date: String,
    pub tags: Vec<String>,
}

/// Request body for the upgrade check round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRequest {
    /// Version currently running. The field name is fixed by the responder's
    /// wire contract.
    #[serde(rename = "longhornVersion")]
    pub current_version: String,
}

/// Response body of the upgrade check round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResponse {
    pub versions: Vec<VersionDescriptor>,
}

impl CheckResponse {
    /// First release tagged [`TAG_LATEST`], in response order.
    ///
    /// The responder lists releases in its own order; the first match wins,
    /// there is no semver comparison here.
    pub fn latest_tagged(&self) -> Option<&str> {
        self.versions
            .iter()
            .find(|v| v.tags.iter().any(|t| t == TAG_LATEST))
            .map(|v| v.name.as_str())
    }
}
