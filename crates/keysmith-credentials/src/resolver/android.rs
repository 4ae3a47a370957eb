use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{info, instrument};

use crate::context::Context;
use crate::credentials_file::resolve_path;
use crate::error::{CredentialsError, Result};
use crate::keystore::generate_keystore;
use crate::types::{AppLookupParams, Keystore};

async fn upload_existing_keystore(ctx: &Context) -> Result<Keystore> {
    let prompter = ctx.prompter();
    let path = prompter.text("Path to the keystore file", None).await?;
    let keystore_password = prompter.password("Keystore password").await?;
    let key_alias = prompter.text("Key alias", None).await?;
    let key_password = prompter
        .password("Key password (leave empty if it matches the keystore password)")
        .await?;

    let bytes = tokio::fs::read(resolve_path(&ctx.project_dir, path.trim())).await?;
    Ok(Keystore {
        keystore: BASE64.encode(bytes),
        keystore_password,
        key_alias: key_alias.trim().to_string(),
        key_password: Some(key_password).filter(|p| !p.is_empty()),
    })
}

/// Return the app's upload keystore, setting one up if there is none
#[instrument(skip_all, fields(app = %app))]
pub async fn resolve_keystore(ctx: &mut Context, app: &AppLookupParams) -> Result<Keystore> {
    if let Some(existing) = ctx.cache.keystore(app).await? {
        info!(alias = %existing.key_alias, "reusing existing keystore");
        return Ok(existing);
    }
    if !ctx.is_interactive() {
        return Err(CredentialsError::non_interactive("Android keystore", app));
    }

    let items = vec![
        "Generate a new keystore".to_string(),
        "Upload an existing keystore".to_string(),
    ];
    let choice = ctx
        .prompter()
        .select("How do you want to set up the keystore?", &items, 0)
        .await?;
    let keystore = if choice == 0 {
        generate_keystore(&app.bundle_identifier).await?
    } else {
        upload_existing_keystore(ctx).await?
    };

    ctx.cache.set_keystore(app, &keystore).await?;
    ctx.prompter()
        .note(&format!("Keystore for {} is set up", app.bundle_identifier));
    Ok(keystore)
}
