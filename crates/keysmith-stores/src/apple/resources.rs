//! JSON:API documents returned by App Store Connect

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use keysmith_credentials::portal::{PortalCertificate, PortalProfile, ProfileClass};
use keysmith_credentials::types::{Device, ProfileStatus};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(crate) struct Document<T> {
    pub data: T,
    #[serde(default)]
    pub included: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct ResourceId {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Linkage {
    One(ResourceId),
    Many(Vec<ResourceId>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct Relationship {
    pub data: Option<Linkage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Value,
    #[serde(default)]
    pub relationships: HashMap<String, Relationship>,
}

impl Resource {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    pub fn date(&self, name: &str) -> Option<DateTime<Utc>> {
        // Apple writes offsets without a colon (`+0000`)
        let value = self.attr(name)?;
        DateTime::parse_from_rfc3339(value)
            .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }

    pub fn related(&self, name: &str) -> Vec<&ResourceId> {
        match self.relationships.get(name).and_then(|r| r.data.as_ref()) {
            Some(Linkage::One(id)) => vec![id],
            Some(Linkage::Many(ids)) => ids.iter().collect(),
            None => Vec::new(),
        }
    }
}

fn find<'a>(included: &'a [Resource], id: &ResourceId) -> Option<&'a Resource> {
    included.iter().find(|r| r.kind == id.kind && r.id == id.id)
}

pub(crate) fn profile_type(class: ProfileClass) -> &'static str {
    match class {
        ProfileClass::AppStore => "IOS_APP_STORE",
        ProfileClass::AdHoc => "IOS_APP_ADHOC",
        ProfileClass::InHouse => "IOS_APP_INHOUSE",
        ProfileClass::Development => "IOS_APP_DEVELOPMENT",
    }
}

fn profile_class(profile_type: &str) -> Option<ProfileClass> {
    match profile_type {
        "IOS_APP_STORE" => Some(ProfileClass::AppStore),
        "IOS_APP_ADHOC" => Some(ProfileClass::AdHoc),
        "IOS_APP_INHOUSE" => Some(ProfileClass::InHouse),
        "IOS_APP_DEVELOPMENT" => Some(ProfileClass::Development),
        _ => None,
    }
}

fn profile_status(state: Option<&str>) -> ProfileStatus {
    match state {
        Some("ACTIVE") => ProfileStatus::Active,
        Some("EXPIRED") => ProfileStatus::Expired,
        _ => ProfileStatus::Invalid,
    }
}

pub(crate) fn certificate(resource: &Resource) -> Option<PortalCertificate> {
    Some(PortalCertificate {
        id: resource.id.clone(),
        serial_number: resource.attr("serialNumber")?.to_string(),
        name: resource
            .attr("displayName")
            .or_else(|| resource.attr("name"))
            .map(str::to_string),
        expires_at: resource.date("expirationDate"),
    })
}

pub(crate) fn device(resource: &Resource) -> Option<Device> {
    Some(Device {
        id: resource.id.clone(),
        udid: resource.attr("udid")?.to_string(),
        name: resource.attr("name").map(str::to_string),
    })
}

/// Build a portal profile from a profile resource and the resources
/// included with it
pub(crate) fn profile(resource: &Resource, included: &[Resource]) -> Option<PortalProfile> {
    let bundle_identifier = resource
        .related("bundleId")
        .first()
        .and_then(|id| find(included, id))
        .and_then(|b| b.attr("identifier"))?
        .to_string();

    let certificate_serials = resource
        .related("certificates")
        .into_iter()
        .filter_map(|id| find(included, id))
        .filter_map(|c| c.attr("serialNumber"))
        .map(str::to_ascii_uppercase)
        .collect();
    let device_udids = resource
        .related("devices")
        .into_iter()
        .filter_map(|id| find(included, id))
        .filter_map(|d| d.attr("udid"))
        .map(str::to_string)
        .collect();

    Some(PortalProfile {
        id: resource.id.clone(),
        name: resource.attr("name").unwrap_or_default().to_string(),
        bundle_identifier,
        class: profile_class(resource.attr("profileType")?)?,
        status: profile_status(resource.attr("profileState")),
        expires_at: resource.date("expirationDate"),
        certificate_serials,
        device_udids,
        content: resource.attr("profileContent").unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILES: &str = r#"{
        "data": [{
            "type": "profiles",
            "id": "P1",
            "attributes": {
                "name": "*[keysmith] com.acme.rocket AdHoc",
                "profileType": "IOS_APP_ADHOC",
                "profileState": "ACTIVE",
                "expirationDate": "2030-01-01T00:00:00.000+0000",
                "profileContent": "cHJvZmlsZQ=="
            },
            "relationships": {
                "bundleId": {"data": {"type": "bundleIds", "id": "B1"}},
                "certificates": {"data": [{"type": "certificates", "id": "C1"}]},
                "devices": {"data": [{"type": "devices", "id": "D1"}]}
            }
        }],
        "included": [
            {"type": "bundleIds", "id": "B1", "attributes": {"identifier": "com.acme.rocket"}},
            {"type": "certificates", "id": "C1", "attributes": {"serialNumber": "abc123"}},
            {"type": "devices", "id": "D1", "attributes": {"udid": "00008030-AAA", "name": "iPhone"}}
        ]
    }"#;

    #[test]
    fn test_profile_from_included_resources() {
        let doc: Document<Vec<Resource>> = serde_json::from_str(PROFILES).unwrap();
        let profile = profile(&doc.data[0], &doc.included).unwrap();

        assert_eq!(profile.bundle_identifier, "com.acme.rocket");
        assert_eq!(profile.class, ProfileClass::AdHoc);
        assert_eq!(profile.status, ProfileStatus::Active);
        assert_eq!(profile.certificate_serials, vec!["ABC123".to_string()]);
        assert_eq!(profile.device_udids, vec!["00008030-AAA".to_string()]);
        assert!(profile.expires_at.is_some());
    }

    #[test]
    fn test_certificate_requires_serial() {
        let resource: Resource = serde_json::from_str(
            r#"{"type": "certificates", "id": "C1", "attributes": {"name": "iOS Distribution"}}"#,
        )
        .unwrap();
        assert!(certificate(&resource).is_none());
    }
}
