//! Provisioning profile inspection
//!
//! A `.mobileprovision` file is a CMS envelope around an XML property list.
//! Only the embedded plist is read; the signature is not checked.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{CredentialsError, Result};
use crate::types::{AppleTeamInput, ProvisioningProfile};

const PLIST_START: &[u8] = b"<?xml";
const PLIST_END: &[u8] = b"</plist>";

/// Metadata embedded in a provisioning profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileInfo {
    pub uuid: Option<String>,
    pub name: Option<String>,
    pub team_identifier: Option<String>,
    pub team_name: Option<String>,
    pub application_identifier: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub provisioned_devices: Vec<String>,
}

impl ProfileInfo {
    /// Team identity declared by the profile
    pub fn team(&self) -> Option<AppleTeamInput> {
        self.team_identifier.as_ref().map(|id| AppleTeamInput {
            team_identifier: id.clone(),
            team_name: self.team_name.clone(),
        })
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Read the plist embedded in a `.mobileprovision` blob
pub fn parse_provisioning_profile(bytes: &[u8]) -> Result<ProfileInfo> {
    let start = find(bytes, PLIST_START)
        .ok_or_else(|| CredentialsError::InvalidProfile("no embedded property list".to_string()))?;
    let end = find(&bytes[start..], PLIST_END)
        .map(|offset| start + offset + PLIST_END.len())
        .ok_or_else(|| CredentialsError::InvalidProfile("truncated property list".to_string()))?;

    let value = plist::Value::from_reader_xml(&bytes[start..end])
        .map_err(|e| CredentialsError::InvalidProfile(e.to_string()))?;
    let dict = value.as_dictionary().ok_or_else(|| {
        CredentialsError::InvalidProfile("property list is not a dictionary".to_string())
    })?;

    let string = |key: &str| dict.get(key).and_then(|v| v.as_string()).map(str::to_string);

    let team_identifier = dict
        .get("TeamIdentifier")
        .and_then(|v| v.as_array())
        .and_then(|ids| ids.first())
        .and_then(|v| v.as_string())
        .map(str::to_string);

    let application_identifier = dict
        .get("Entitlements")
        .and_then(|v| v.as_dictionary())
        .and_then(|e| e.get("application-identifier"))
        .and_then(|v| v.as_string())
        .map(str::to_string);

    let expiration_date = dict
        .get("ExpirationDate")
        .and_then(|v| v.as_date())
        .map(|date| DateTime::<Utc>::from(std::time::SystemTime::from(date)));

    let provisioned_devices = dict
        .get("ProvisionedDevices")
        .and_then(|v| v.as_array())
        .map(|devices| {
            devices
                .iter()
                .filter_map(|d| d.as_string().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let info = ProfileInfo {
        uuid: string("UUID"),
        name: string("Name"),
        team_identifier,
        team_name: string("TeamName"),
        application_identifier,
        expiration_date,
        provisioned_devices,
    };
    debug!(uuid = ?info.uuid, team = ?info.team_identifier, "parsed provisioning profile");
    Ok(info)
}

/// Device UDIDs embedded in a profile.
///
/// Falls back to the device list stored with the record when the blob
/// cannot be read.
pub fn embedded_device_udids(profile: &ProvisioningProfile) -> Vec<String> {
    profile
        .content_bytes()
        .ok()
        .and_then(|bytes| parse_provisioning_profile(&bytes).ok())
        .map(|info| info.provisioned_devices)
        .filter(|devices| !devices.is_empty())
        .unwrap_or_else(|| profile.device_udids.clone())
}

#[cfg(test)]
pub(crate) fn sample_profile_bytes(team: &str, devices: &[&str]) -> Vec<u8> {
    let devices_xml = if devices.is_empty() {
        String::new()
    } else {
        format!(
            "<key>ProvisionedDevices</key><array>{}</array>",
            devices
                .iter()
                .map(|d| format!("<string>{d}</string>"))
                .collect::<String>()
        )
    };
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>Name</key><string>Rocket Ad Hoc</string>
  <key>UUID</key><string>6F1C2A3B-0000-4000-8000-000000000001</string>
  <key>TeamIdentifier</key><array><string>{team}</string></array>
  <key>TeamName</key><string>Acme Inc</string>
  <key>ExpirationDate</key><date>2030-01-01T00:00:00Z</date>
  <key>Entitlements</key><dict><key>application-identifier</key><string>{team}.com.acme.rocket</string></dict>
  {devices_xml}
</dict>
</plist>"#
    );

    let mut bytes = vec![0x30, 0x82, 0x1f, 0x00];
    bytes.extend_from_slice(xml.as_bytes());
    bytes.extend_from_slice(&[0xa0, 0x82, 0x0c]);
    bytes
}
