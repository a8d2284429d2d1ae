//! Authentication module for Firebase Cloud Messaging
//!
//! Access tokens come from a service account key file via OAuth2, or from a
//! fixed bearer token when talking to an emulator or a test server.

use fanout_common::ProviderError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::{read_service_account_key, ServiceAccountAuthenticator};

/// OAuth2 scope required by the FCM HTTP v1 API.
pub const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Source of bearer tokens for FCM requests.
#[derive(Clone)]
pub enum FirebaseAuth {
    /// Exchange a service account key for short-lived access tokens.
    ///
    /// The authenticator is built on first use and shared by clones, so
    /// tokens are cached and refreshed by `yup-oauth2` instead of being
    /// requested for every send.
    ServiceAccount {
        key_path: PathBuf,
        authenticator: Arc<OnceCell<DefaultAuthenticator>>,
    },
    /// Use the given token as is.
    Static(String),
}

impl fmt::Debug for FirebaseAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirebaseAuth::ServiceAccount {
                key_path,
                authenticator,
            } => f
                .debug_struct("ServiceAccount")
                .field("key_path", key_path)
                .field("ready", &authenticator.initialized())
                .finish(),
            FirebaseAuth::Static(_) => f.write_str("Static(..)"),
        }
    }
}

impl FirebaseAuth {
    pub fn service_account(key_path: impl Into<PathBuf>) -> Self {
        FirebaseAuth::ServiceAccount {
            key_path: key_path.into(),
            authenticator: Arc::new(OnceCell::new()),
        }
    }

    /// Obtains an access token for Firebase Cloud Messaging.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Auth`] if the key file cannot be read, the
    /// OAuth2 exchange fails or no token is returned. A failed setup is not
    /// cached; the next call tries again.
    pub async fn access_token(&self) -> Result<String, ProviderError> {
        match self {
            FirebaseAuth::Static(token) => Ok(token.clone()),
            FirebaseAuth::ServiceAccount {
                key_path,
                authenticator,
            } => {
                let auth = authenticator
                    .get_or_try_init(|| build_authenticator(key_path))
                    .await?;
                let token = auth
                    .token(&[FCM_SCOPE])
                    .await
                    .map_err(|e| ProviderError::Auth(e.to_string()))?;
                token
                    .token()
                    .map(str::to_string)
                    .ok_or_else(|| ProviderError::Auth("No token available".to_string()))
            }
        }
    }
}

/// Checks that a service account key file can be read and parsed.
pub async fn verify_service_account_key(key_path: &Path) -> Result<(), ProviderError> {
    read_service_account_key(key_path)
        .await
        .map(|_| ())
        .map_err(|e| ProviderError::Config(format!("{}: {}", key_path.display(), e)))
}

async fn build_authenticator(key_path: &Path) -> Result<DefaultAuthenticator, ProviderError> {
    let sa_key = read_service_account_key(key_path)
        .await
        .map_err(|e| ProviderError::Auth(format!("{}: {}", key_path.display(), e)))?;
    ServiceAccountAuthenticator::builder(sa_key)
        .build()
        .await
        .map_err(|e| ProviderError::Auth(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_is_returned_verbatim() {
        let auth = FirebaseAuth::Static("test-bearer".to_string());
        assert_eq!(auth.access_token().await.unwrap(), "test-bearer");
    }

    #[tokio::test]
    async fn test_missing_key_file_is_an_auth_error() {
        let auth = FirebaseAuth::service_account("/nonexistent/service-account.json");
        assert!(matches!(
            auth.access_token().await,
            Err(ProviderError::Auth(_))
        ));
        assert!(matches!(
            verify_service_account_key(Path::new("/nonexistent/service-account.json")).await,
            Err(ProviderError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticator_is_shared_and_failures_are_not_cached() {
        let auth = FirebaseAuth::service_account("/nonexistent/service-account.json");
        let copy = auth.clone();
        let cell = |auth: &FirebaseAuth| match auth {
            FirebaseAuth::ServiceAccount { authenticator, .. } => authenticator.clone(),
            FirebaseAuth::Static(_) => panic!("expected service account auth"),
        };
        let a = cell(&auth);
        assert!(Arc::ptr_eq(&a, &cell(&copy)));

        assert!(auth.access_token().await.is_err());
        assert!(!a.initialized());
        assert!(copy.access_token().await.is_err());
        assert!(format!("{auth:?}").contains("ready: false"));
    }
}
