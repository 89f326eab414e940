//! Subcommand implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use grabotp_core::{
    AccountIdentity, Config, CredentialStore, FetchPipeline, InteractiveAuthorizer, KeyringStore,
    SessionManager,
};
use grabotp_oauth::{OAuthClient, Provider};
use tracing::debug;
use url::Url;

use crate::output;

type Manager = SessionManager<KeyringStore, InteractiveAuthorizer>;

/// Fetch OTPs from every configured account and print them.
pub async fn fetch(json: bool) -> Result<()> {
    let (_, config) = load_config().await?;

    if config.emails.is_empty() {
        println!("No accounts configured. Please run `grabotp account add` to add one.");
        return Ok(());
    }

    let pipeline = FetchPipeline::new(Arc::new(session_manager(&config)?));
    let otps = pipeline.fetch(&config.emails).await?;

    if json {
        output::print_json(&otps)
    } else {
        output::print_table(&otps);
        output::copy_latest(&otps);
        Ok(())
    }
}

/// Authorize a new account in the browser and add it to the configuration.
pub async fn add_account(client_id: Option<String>, client_secret: Option<String>) -> Result<()> {
    let (path, mut config) = load_config().await?;

    if client_id.is_some() || client_secret.is_some() {
        if let Some(id) = client_id {
            config.client_id = id;
        }
        if client_secret.is_some() {
            config.client_secret = client_secret;
        }
        config.save(&path).await?;
    }

    let identity = session_manager(&config)?.authorize_new().await?;

    if config.add_account(identity.clone()) {
        config.save(&path).await?;
        println!("Successfully added {identity}");
    } else {
        println!("{identity} is already configured; its token was refreshed");
    }
    Ok(())
}

/// Print the configured accounts.
pub async fn list_accounts() -> Result<()> {
    let (_, config) = load_config().await?;

    if config.emails.is_empty() {
        println!("No accounts configured.");
        return Ok(());
    }

    println!("Configured accounts:");
    for account in &config.emails {
        println!("- {account}");
    }
    Ok(())
}

/// Remove an account and its stored token.
pub async fn remove_account(account: AccountIdentity) -> Result<()> {
    let (path, mut config) = load_config().await?;

    remove_from(&mut config, &KeyringStore::new(), &account)?;
    config.save(&path).await?;

    println!("Successfully removed {account}");
    Ok(())
}

/// Forget every stored token and clear the configuration.
pub async fn reset() -> Result<()> {
    let (path, mut config) = load_config().await?;

    reset_all(&mut config, &KeyringStore::new())?;
    config.save(&path).await?;

    println!("Reset successful!");
    Ok(())
}

// Tokens are deleted before the config stops listing their account.
fn remove_from(
    config: &mut Config,
    store: &impl CredentialStore,
    account: &AccountIdentity,
) -> Result<()> {
    let listed: Vec<_> = config.emails.iter().filter(|e| e.matches(account)).collect();
    if listed.is_empty() {
        return Err(grabotp_core::Error::AccountNotFound(account.to_string()).into());
    }
    for entry in listed {
        store.delete(entry)?;
    }
    config.remove_account(account)?;
    Ok(())
}

fn reset_all(config: &mut Config, store: &impl CredentialStore) -> Result<()> {
    for account in &config.emails {
        store.delete(account)?;
    }
    config.reset();
    Ok(())
}

/// True when the error chain says the stored authorization is unusable.
pub fn needs_reauthorization(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<grabotp_core::Error>()
        .is_some_and(grabotp_core::Error::needs_reauthorization)
}

async fn load_config() -> Result<(PathBuf, Config)> {
    let path = Config::default_path()?;
    let config = Config::load(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok((path, config))
}

fn session_manager(config: &Config) -> Result<Manager> {
    let mut client = OAuthClient::new(config.require_client_id()?, Provider::google()?);
    if let Some(secret) = &config.client_secret {
        client = client.with_client_secret(secret);
    }

    let authorizer = InteractiveAuthorizer::new(client.clone(), present_authorization_url);
    Ok(SessionManager::new(KeyringStore::new(), authorizer, client))
}

fn present_authorization_url(url: &Url) {
    println!("Go to the following link in your browser to authorize grabotp:\n\n{url}\n");
    if let Err(e) = opener::open(url.as_str()) {
        debug!("could not open a browser: {e}");
    }
}
