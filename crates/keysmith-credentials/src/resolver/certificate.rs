use std::cmp::Reverse;

use chrono::Utc;
use tracing::{info, warn};

use crate::context::Context;
use crate::error::{CredentialsError, Result};
use crate::portal::{PortalError, PortalSession};
use crate::types::{
    AppLookupParams, AppleTeam, DistributionCertificate, DistributionCertificateInput,
};
use crate::validators::{is_distribution_certificate_valid, valid_serial_numbers};

fn from_portal(error: PortalError) -> CredentialsError {
    match error {
        PortalError::CertificateLimitReached => CredentialsError::CertificateLimitReached,
        other => other.into(),
    }
}

/// Pick a certificate for the app: reuse a valid certificate of the same
/// team, or generate a new one.
pub(super) async fn resolve_distribution_certificate(
    ctx: &mut Context,
    app: &AppLookupParams,
    session: &PortalSession,
    team: &AppleTeam,
) -> Result<DistributionCertificate> {
    let portal = ctx.portal();
    let serials = valid_serial_numbers(portal.as_ref(), session).await?;
    let now = Utc::now();

    let mut candidates: Vec<DistributionCertificate> = ctx
        .cache
        .distribution_certificates(&app.account)
        .await?
        .into_iter()
        .filter(|cert| is_distribution_certificate_valid(cert, &serials, now))
        .filter(|cert| {
            cert.apple_team
                .as_ref()
                .is_some_and(|t| t.team_identifier == team.team_identifier)
        })
        .collect();
    candidates.sort_by_key(|cert| Reverse(cert.valid_until));

    if let Some(best) = candidates.first() {
        let reuse = ctx
            .prompter()
            .confirm(
                &format!(
                    "Reuse the distribution certificate with the latest expiry?\n  {}",
                    best.describe()
                ),
                true,
            )
            .await?;
        if reuse {
            return Ok(best.clone());
        }

        if candidates.len() > 1 {
            let mut items: Vec<String> = candidates[1..].iter().map(|c| c.describe()).collect();
            items.push("Generate a new certificate".to_string());
            let choice = ctx
                .prompter()
                .select("Select a distribution certificate", &items, 0)
                .await?;
            if let Some(cert) = candidates.get(choice + 1) {
                return Ok(cert.clone());
            }
        }
    }

    generate_distribution_certificate(ctx, &app.account, session, team).await
}

/// Generate a certificate on the portal and store it for the account.
///
/// When the team is at its certificate limit, interactive runs may pick
/// certificates to revoke and retry once.
pub async fn generate_distribution_certificate(
    ctx: &mut Context,
    account: &str,
    session: &PortalSession,
    team: &AppleTeam,
) -> Result<DistributionCertificate> {
    let portal = ctx.portal();

    let generated = match portal.create_distribution_certificate(session).await {
        Ok(generated) => generated,
        Err(PortalError::CertificateLimitReached) if ctx.is_interactive() => {
            revoke_for_limit(ctx, account, session).await?;
            portal
                .create_distribution_certificate(session)
                .await
                .map_err(from_portal)?
        }
        Err(e) => return Err(from_portal(e)),
    };
    info!(serial = %generated.serial_number, "generated distribution certificate");

    let certificate = ctx
        .cache
        .create_distribution_certificate(
            account,
            &DistributionCertificateInput {
                certificate_p12: generated.certificate_p12,
                certificate_password: generated.certificate_password,
                apple_team_id: Some(team.id.clone()),
                developer_portal_identifier: Some(generated.developer_portal_identifier),
            },
        )
        .await?;
    ctx.prompter()
        .note(&format!("Created distribution certificate {}", certificate.describe()));
    Ok(certificate)
}

async fn revoke_for_limit(ctx: &mut Context, account: &str, session: &PortalSession) -> Result<()> {
    let portal = ctx.portal();
    let listed = portal.list_distribution_certificates(session).await?;
    warn!(count = listed.len(), "distribution certificate limit reached");
    ctx.prompter().warn(
        "The Apple Developer Portal will not issue more distribution certificates for this team",
    );

    let items: Vec<String> = listed.iter().map(|c| c.describe()).collect();
    let defaults = vec![false; items.len()];
    let picked = ctx
        .prompter()
        .multi_select("Select certificates to revoke", &items, &defaults)
        .await?;
    if picked.is_empty() {
        return Err(CredentialsError::CertificateLimitReached);
    }

    let revoked: Vec<_> = picked.iter().filter_map(|&i| listed.get(i)).collect();
    let ids: Vec<String> = revoked.iter().map(|c| c.id.clone()).collect();
    portal.revoke_distribution_certificates(session, &ids).await?;

    // remote records of revoked certificates are useless now
    let stored = ctx.cache.distribution_certificates(account).await?;
    for cert in stored {
        let matches = revoked.iter().any(|r| {
            cert.developer_portal_identifier.as_deref() == Some(r.id.as_str())
                || cert
                    .serial_number
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(&r.serial_number))
        });
        if matches {
            ctx.cache
                .delete_distribution_certificate(account, &cert.id)
                .await?;
        }
    }
    ctx.prompter()
        .note(&format!("Revoked {} distribution certificate(s)", ids.len()));
    Ok(())
}
