//! Domain types for the university search resource.
//!
//! # Design
//! `RemoteUniversity` mirrors the wire record and is defined independently of
//! the mock-server's copy; integration tests catch schema drift between the
//! two. The wire record has no identifier, so every conversion into
//! `University` mints a fresh one. Decoding the same record twice therefore
//! yields two different ids.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A university as shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct University {
    pub id: Uuid,
    pub alpha_two_code: String,
    pub country: String,
    pub domains: Vec<String>,
    pub name: String,
    pub state_province: Option<String>,
    pub web_pages: Vec<String>,
}

/// One record of the remote search response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteUniversity {
    pub name: String,
    pub country: String,
    pub alpha_two_code: String,
    pub domains: Vec<String>,
    pub web_pages: Vec<String>,
    #[serde(rename = "state-province", default)]
    pub state_province: Option<String>,
}

impl From<RemoteUniversity> for University {
    fn from(remote: RemoteUniversity) -> Self {
        Self {
            id: Uuid::new_v4(),
            alpha_two_code: remote.alpha_two_code,
            country: remote.country,
            domains: remote.domains,
            name: remote.name,
            state_province: remote.state_province,
            web_pages: remote.web_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{
        "name": "Universidad de Monterrey",
        "country": "Mexico",
        "alpha_two_code": "MX",
        "domains": ["udem.edu.mx"],
        "web_pages": ["http://www.udem.edu.mx/"],
        "state-province": "Nuevo Leon"
    }"#;

    #[test]
    fn remote_record_reads_wire_field_names() {
        let remote: RemoteUniversity = serde_json::from_str(RECORD).unwrap();
        assert_eq!(remote.alpha_two_code, "MX");
        assert_eq!(remote.state_province.as_deref(), Some("Nuevo Leon"));
        assert_eq!(remote.web_pages, vec!["http://www.udem.edu.mx/"]);
    }

    #[test]
    fn state_province_may_be_null_or_absent() {
        let null: RemoteUniversity = serde_json::from_str(
            r#"{"name":"A","country":"B","alpha_two_code":"C","domains":[],"web_pages":[],"state-province":null}"#,
        )
        .unwrap();
        assert!(null.state_province.is_none());

        let absent: RemoteUniversity = serde_json::from_str(
            r#"{"name":"A","country":"B","alpha_two_code":"C","domains":[],"web_pages":[]}"#,
        )
        .unwrap();
        assert!(absent.state_province.is_none());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let result: Result<RemoteUniversity, _> =
            serde_json::from_str(r#"{"name":"A","country":"B","domains":[],"web_pages":[]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn conversion_mints_a_fresh_id_each_time() {
        let remote: RemoteUniversity = serde_json::from_str(RECORD).unwrap();
        let first = University::from(remote.clone());
        let second = University::from(remote);
        assert_ne!(first.id, second.id);
        assert_eq!(first.name, second.name);
        assert_eq!(first.domains, second.domains);
    }
}
