//! GraphQL documents of the credential store API
//!
//! Fields are aliased to the snake_case names of the wire types so responses
//! deserialize without per-field renames.

macro_rules! team_fields {
    () => {
        "id team_identifier: appleTeamIdentifier team_name: appleTeamName"
    };
}

macro_rules! certificate_fields {
    () => {
        concat!(
            "id certificate_p12: certificateP12 certificate_password: certificatePassword ",
            "serial_number: serialNumber valid_from: validityNotBefore valid_until: validityNotAfter ",
            "developer_portal_identifier: developerPortalIdentifier ",
            "apple_team: appleTeam { ",
            team_fields!(),
            " } assigned_apps: assignedApps { project_full_name: projectFullName bundle_identifier: bundleIdentifier }"
        )
    };
}

macro_rules! push_key_fields {
    () => {
        concat!(
            "id key_identifier: keyIdentifier key_p8: keyP8 apple_team: appleTeam { ",
            team_fields!(),
            " }"
        )
    };
}

macro_rules! profile_fields {
    () => {
        concat!(
            "id provisioning_profile: provisioningProfile ",
            "developer_portal_identifier: developerPortalIdentifier status expires_at: expiresAt ",
            "certificate_id: distributionCertificateId device_udids: deviceUdids ",
            "apple_team: appleTeam { ",
            team_fields!(),
            " }"
        )
    };
}

macro_rules! build_credentials_fields {
    () => {
        concat!(
            "id distribution_type: distributionType ",
            "distribution_certificate_id: distributionCertificateId ",
            "provisioning_profile: provisioningProfile { ",
            profile_fields!(),
            " } apple_team: appleTeam { ",
            team_fields!(),
            " }"
        )
    };
}

macro_rules! app_credentials_fields {
    () => {
        concat!(
            "id project_full_name: projectFullName bundle_identifier: bundleIdentifier ",
            "parent_bundle_identifier: parentBundleIdentifier push_key_id: pushKeyId ",
            "build_credentials: buildCredentials { ",
            build_credentials_fields!(),
            " } keystore { keystore keystore_password: keystorePassword key_alias: keyAlias key_password: keyPassword }"
        )
    };
}

pub(crate) const ACCOUNT_CREDENTIALS: &str = concat!(
    "query AccountCredentials($accountName: String!) { account(name: $accountName) { ",
    "app_credentials: appCredentials { ",
    app_credentials_fields!(),
    " } distribution_certificates: distributionCertificates { ",
    certificate_fields!(),
    " } push_keys: pushKeys { ",
    push_key_fields!(),
    " } } }"
);

pub(crate) const APP_CREDENTIALS: &str = concat!(
    "query AppCredentials($app: AppLookupInput!) { app_credentials: appCredentials(app: $app) { ",
    app_credentials_fields!(),
    " } }"
);

pub(crate) const USER_CREDENTIAL: &str = concat!(
    "query UserCredential($accountName: String!, $id: ID!) { account(name: $accountName) { ",
    "distribution_certificate: distributionCertificate(id: $id) { ",
    certificate_fields!(),
    " } push_key: pushKey(id: $id) { ",
    push_key_fields!(),
    " } } }"
);

pub(crate) const CREATE_DISTRIBUTION_CERTIFICATE: &str = concat!(
    "mutation CreateDistributionCertificate($accountName: String!, $input: DistributionCertificateInput!) { ",
    "record: createDistributionCertificate(accountName: $accountName, input: $input) { ",
    certificate_fields!(),
    " } }"
);

pub(crate) const UPDATE_DISTRIBUTION_CERTIFICATE: &str = concat!(
    "mutation UpdateDistributionCertificate($id: ID!, $input: DistributionCertificateInput!) { ",
    "record: updateDistributionCertificate(id: $id, input: $input) { ",
    certificate_fields!(),
    " } }"
);

pub(crate) const DELETE_DISTRIBUTION_CERTIFICATE: &str =
    "mutation DeleteDistributionCertificate($id: ID!) { record: deleteDistributionCertificate(id: $id) { id } }";

pub(crate) const CREATE_PUSH_KEY: &str = concat!(
    "mutation CreatePushKey($accountName: String!, $input: PushKeyInput!) { ",
    "record: createPushKey(accountName: $accountName, input: $input) { ",
    push_key_fields!(),
    " } }"
);

pub(crate) const DELETE_PUSH_KEY: &str =
    "mutation DeletePushKey($id: ID!) { record: deletePushKey(id: $id) { id } }";

pub(crate) const CREATE_PROVISIONING_PROFILE: &str = concat!(
    "mutation CreateProvisioningProfile($app: AppLookupInput!, $input: ProvisioningProfileInput!) { ",
    "record: createProvisioningProfile(app: $app, input: $input) { ",
    profile_fields!(),
    " } }"
);

pub(crate) const UPDATE_PROVISIONING_PROFILE: &str = concat!(
    "mutation UpdateProvisioningProfile($id: ID!, $input: ProvisioningProfileInput!) { ",
    "record: updateProvisioningProfile(id: $id, input: $input) { ",
    profile_fields!(),
    " } }"
);

pub(crate) const DELETE_PROVISIONING_PROFILE: &str =
    "mutation DeleteProvisioningProfile($id: ID!) { record: deleteProvisioningProfile(id: $id) { id } }";

pub(crate) const UPSERT_BUILD_CREDENTIALS: &str = concat!(
    "mutation UpsertBuildCredentials($app: AppLookupInput!, $input: BuildCredentialsInput!) { ",
    "record: upsertBuildCredentials(app: $app, input: $input) { ",
    build_credentials_fields!(),
    " } }"
);

pub(crate) const CREATE_OR_GET_APPLE_TEAM: &str = concat!(
    "mutation CreateOrGetAppleTeam($accountName: String!, $input: AppleTeamInput!) { ",
    "record: createOrGetAppleTeam(accountName: $accountName, input: $input) { ",
    team_fields!(),
    " } }"
);

pub(crate) const CREATE_OR_GET_APPLE_APP_IDENTIFIER: &str = concat!(
    "mutation CreateOrGetAppleAppIdentifier($app: AppLookupInput!, $appleTeamId: ID) { ",
    "record: createOrGetAppleAppIdentifier(app: $app, appleTeamId: $appleTeamId) { ",
    "id bundle_identifier: bundleIdentifier parent_bundle_identifier: parentBundleIdentifier } }"
);

pub(crate) const SET_KEYSTORE: &str =
    "mutation SetKeystore($app: AppLookupInput!, $input: KeystoreInput!) { record: setKeystore(app: $app, input: $input) { id } }";

pub(crate) const DELETE_KEYSTORE: &str =
    "mutation DeleteKeystore($app: AppLookupInput!) { record: deleteKeystore(app: $app) { id } }";

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced(document: &str) -> bool {
        let mut depth = 0i32;
        for c in document.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return false;
            }
        }
        depth == 0
    }

    #[test]
    fn test_documents_are_balanced() {
        for document in [
            ACCOUNT_CREDENTIALS,
            APP_CREDENTIALS,
            USER_CREDENTIAL,
            CREATE_DISTRIBUTION_CERTIFICATE,
            UPDATE_DISTRIBUTION_CERTIFICATE,
            DELETE_DISTRIBUTION_CERTIFICATE,
            CREATE_PUSH_KEY,
            DELETE_PUSH_KEY,
            CREATE_PROVISIONING_PROFILE,
            UPDATE_PROVISIONING_PROFILE,
            DELETE_PROVISIONING_PROFILE,
            UPSERT_BUILD_CREDENTIALS,
            CREATE_OR_GET_APPLE_TEAM,
            CREATE_OR_GET_APPLE_APP_IDENTIFIER,
            SET_KEYSTORE,
            DELETE_KEYSTORE,
        ] {
            assert!(balanced(document), "unbalanced document: {document}");
        }
    }

    #[test]
    fn test_nested_selections_are_expanded() {
        assert!(ACCOUNT_CREDENTIALS.contains("team_identifier: appleTeamIdentifier"));
        assert!(ACCOUNT_CREDENTIALS.contains("provisioning_profile: provisioningProfile {"));
        assert!(USER_CREDENTIAL.contains("key_p8: keyP8"));
    }
}
