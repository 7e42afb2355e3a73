//! External user agent (browser) port

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;
use warden_domain::AuthResult;

/// Port for the browser that renders provider pages.
#[async_trait]
pub trait UserAgent: Send + Sync {
    /// Opens `url` and waits until the provider redirects to
    /// `redirect_uri`.
    ///
    /// # Returns
    /// The full redirect URL, including its query string.
    ///
    /// # Errors
    /// `UserCancelled` if the user closed the flow, `Network` if the
    /// redirect could not be received.
    async fn authorize(&self, url: &Url, redirect_uri: &str) -> AuthResult<Url>;
}

#[async_trait]
impl<T: UserAgent + ?Sized> UserAgent for Arc<T> {
    async fn authorize(&self, url: &Url, redirect_uri: &str) -> AuthResult<Url> {
        (**self).authorize(url, redirect_uri).await
    }
}
