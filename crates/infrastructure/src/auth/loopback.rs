//! One-shot loopback listener standing in for the browser redirect target.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use url::Url;
use warden_application::ports::UserAgent;
use warden_domain::{AuthError, AuthResult};

const SUCCESS_HTML: &str = "<html><body><h1>Warden</h1><p>Done. You may close this window.</p></body></html>";
const ERROR_HTML: &str =
    "<html><body><h1>Warden</h1><p>Sign-in did not complete. You may close this window.</p></body></html>";
const NOT_FOUND_HTML: &str = "<html><body><h1>Not found</h1></body></html>";

/// Opens a URL in whatever the user reads from.
pub type Launcher = Arc<dyn Fn(&Url) -> std::io::Result<()> + Send + Sync>;

/// Default launcher: prints the URL for the user to open.
#[must_use]
pub fn print_launcher() -> Launcher {
    Arc::new(|url: &Url| -> std::io::Result<()> {
        info!(host = url.host_str().unwrap_or_default(), path = url.path(), "waiting for browser");
        eprintln!("Open this URL in your browser to continue:\n\n  {url}\n");
        Ok(())
    })
}

/// User agent that announces the provider URL and receives the redirect on
/// `127.0.0.1`.
///
/// The listener binds the host and port of the redirect URI, so the URI
/// registered with the provider must be a loopback address.
pub struct LoopbackUserAgent {
    launcher: Launcher,
}

impl LoopbackUserAgent {
    /// Creates an agent using `launcher` to open URLs.
    #[must_use]
    pub fn new(launcher: Launcher) -> Self {
        Self { launcher }
    }

    /// Serves one connection. Returns the redirect URL if the request hit
    /// the callback path.
    async fn serve(mut socket: TcpStream, redirect: &Url) -> AuthResult<Option<Url>> {
        let mut buffer = vec![0u8; 8192];
        let size = socket
            .read(&mut buffer)
            .await
            .map_err(|e| AuthError::network(format!("callback read failed: {e}")))?;
        let request = String::from_utf8_lossy(&buffer[..size]);
        let target = request_target(&request);

        let (path, query) = target.map_or(("", None), |t| match t.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (t, None),
        });

        if path != redirect.path() {
            debug!(path, "ignoring request outside the callback path");
            respond(&mut socket, "404 Not Found", NOT_FOUND_HTML).await;
            return Ok(None);
        }

        let mut received = redirect.clone();
        received.set_query(query);
        let failed = received.query_pairs().any(|(key, _)| key == "error");
        if failed {
            respond(&mut socket, "400 Bad Request", ERROR_HTML).await;
        } else {
            respond(&mut socket, "200 OK", SUCCESS_HTML).await;
        }
        Ok(Some(received))
    }
}

impl Default for LoopbackUserAgent {
    fn default() -> Self {
        Self::new(print_launcher())
    }
}

/// Returns the target of a `GET` request line.
fn request_target(request: &str) -> Option<&str> {
    let mut parts = request.lines().next()?.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => Some(target),
        _ => None,
    }
}

async fn respond(socket: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(error) = socket.write_all(response.as_bytes()).await {
        warn!(error = %error, "failed to answer callback request");
    }
    let _ = socket.shutdown().await;
}

#[async_trait]
impl UserAgent for LoopbackUserAgent {
    async fn authorize(&self, url: &Url, redirect_uri: &str) -> AuthResult<Url> {
        let redirect = Url::parse(redirect_uri)
            .map_err(|e| AuthError::validation(format!("invalid redirect URI: {e}")))?;
        let host = redirect
            .host_str()
            .ok_or_else(|| AuthError::validation("redirect URI has no host"))?;
        let port = redirect
            .port_or_known_default()
            .ok_or_else(|| AuthError::validation("redirect URI has no port"))?;

        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| AuthError::network(format!("cannot listen on {host}:{port}: {e}")))?;
        debug!(host, port, "callback listener bound");

        (self.launcher)(url)
            .map_err(|e| AuthError::network(format!("failed to open browser: {e}")))?;

        loop {
            let (socket, _) = listener
                .accept()
                .await
                .map_err(|e| AuthError::network(format!("callback accept failed: {e}")))?;
            if let Some(received) = Self::serve(socket, &redirect).await? {
                return Ok(received);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    /// Launcher that plays the browser: hits `paths` on the callback host in
    /// order.
    fn browser(port: u16, paths: &'static [&'static str]) -> Launcher {
        Arc::new(move |_url: &Url| -> std::io::Result<()> {
            tokio::spawn(async move {
                for path in paths {
                    let _ = reqwest::get(format!("http://127.0.0.1:{port}{path}")).await;
                }
            });
            Ok(())
        })
    }

    #[test]
    fn test_request_target() {
        assert_eq!(
            request_target("GET /callback?code=x HTTP/1.1\r\nHost: a\r\n\r\n"),
            Some("/callback?code=x")
        );
        assert_eq!(request_target("POST /callback HTTP/1.1\r\n"), None);
        assert_eq!(request_target(""), None);
    }

    #[tokio::test]
    async fn test_receives_redirect() {
        let port = free_port();
        let agent = LoopbackUserAgent::new(browser(
            port,
            &["/favicon.ico", "/callback?code=abc&state=xyz"],
        ));
        let provider = Url::parse("https://tenant.example.com/authorize").unwrap();

        let received = agent
            .authorize(&provider, &format!("http://127.0.0.1:{port}/callback"))
            .await
            .unwrap();

        assert_eq!(received.path(), "/callback");
        assert_eq!(received.query(), Some("code=abc&state=xyz"));
    }

    #[tokio::test]
    async fn test_launcher_failure_is_network() {
        let port = free_port();
        let agent = LoopbackUserAgent::new(Arc::new(|_: &Url| -> std::io::Result<()> {
            Err(std::io::Error::other("no display"))
        }));
        let provider = Url::parse("https://tenant.example.com/authorize").unwrap();

        let result = agent
            .authorize(&provider, &format!("http://127.0.0.1:{port}/callback"))
            .await;

        assert!(matches!(result, Err(AuthError::Network { .. })));
    }
}
