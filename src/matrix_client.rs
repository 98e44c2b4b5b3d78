// ABOUTME: Matrix client initialization, registration, and password login
// ABOUTME: The client keeps sync tokens and crypto state in a SQLite store on disk

use anyhow::{Context, Result};
use matrix_sdk::{
    ruma::{
        api::client::{account::register::v3::Request as RegistrationRequest, uiaa},
        OwnedDeviceId,
    },
    Client,
};
use std::path::Path;

pub async fn create_client(homeserver: &str, store_path: &Path) -> Result<Client> {
    std::fs::create_dir_all(store_path)
        .with_context(|| format!("Failed to create store directory {}", store_path.display()))?;

    let client = Client::builder()
        .homeserver_url(homeserver)
        .sqlite_store(store_path, None)
        .build()
        .await
        .context("Failed to create Matrix client")?;

    tracing::info!(homeserver, store = %store_path.display(), "Matrix client created");

    Ok(client)
}

/// Registration takes a localpart; accept full user ids too
pub fn localpart(user: &str) -> &str {
    let bare = user.strip_prefix('@').unwrap_or(user);
    bare.split(':').next().unwrap_or(bare)
}

/// Register a new account, completing a dummy interactive-auth stage if the
/// server asks for one. A successful registration leaves the client logged in
/// on `device_name`.
pub async fn register(client: &Client, user: &str, password: &str, device_name: &str) -> Result<()> {
    let username = localpart(user);
    tracing::info!(user = username, "Registering...");

    let mut request = RegistrationRequest::new();
    request.username = Some(username.to_owned());
    request.password = Some(password.to_owned());
    request.device_id = Some(OwnedDeviceId::from(device_name));
    request.initial_device_display_name = Some(device_name.to_owned());

    match client.matrix_auth().register(request.clone()).await {
        Ok(response) => {
            tracing::info!(user_id = %response.user_id, "Registered");
            Ok(())
        }
        Err(e) => {
            let Some(info) = e.as_uiaa_response() else {
                return Err(e).context("Registration failed");
            };

            let mut dummy = uiaa::Dummy::new();
            dummy.session = info.session.clone();
            request.auth = Some(uiaa::AuthData::Dummy(dummy));

            let response = client
                .matrix_auth()
                .register(request)
                .await
                .context("Registration failed")?;
            tracing::info!(user_id = %response.user_id, "Registered");
            Ok(())
        }
    }
}

/// Optionally register, then log in unless registration already did.
///
/// A failed registration (usually "user already exists") falls through to login.
pub async fn sign_in(
    client: &Client,
    user: &str,
    password: &str,
    device_name: &str,
    register_first: bool,
) -> Result<()> {
    if register_first {
        if let Err(e) = register(client, user, password, device_name).await {
            tracing::warn!(error = %e, "Registration failed, trying to log in");
        }
    }

    if client.matrix_auth().logged_in() {
        tracing::info!(
            device = ?client.device_id(),
            "Registration logged the client in, skipping login"
        );
        return Ok(());
    }

    login(client, user, password, device_name).await
}

pub async fn login(client: &Client, user: &str, password: &str, device_name: &str) -> Result<()> {
    tracing::info!(user, "Logging in...");

    client
        .matrix_auth()
        .login_username(user, password)
        .device_id(device_name)
        .initial_device_display_name(device_name)
        .send()
        .await
        .context("Failed to log in")?;

    match client.user_id() {
        Some(user_id) => tracing::info!(%user_id, "Logged in successfully"),
        None => anyhow::bail!("Login succeeded but the client has no user id"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localpart_from_full_user_id() {
        assert_eq!(localpart("@gordy:example.org"), "gordy");
    }

    #[test]
    fn test_localpart_bare() {
        assert_eq!(localpart("gordy"), "gordy");
    }

    #[test]
    fn test_localpart_without_server() {
        assert_eq!(localpart("@gordy"), "gordy");
    }
}
