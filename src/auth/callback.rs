//! One-shot OAuth callback server
//!
//! A temporary local HTTP listener that captures the authorization code
//! from the browser redirect. It accepts exactly one request; the one-time
//! code lives only in that request and is never persisted, so a page
//! refresh cannot replay it.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use crate::error::Error;
use crate::Result;

const SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Amity | Signed In</title>
    <style>
        body {
            background-color: #101418;
            color: #e7ebf0;
            font-family: -apple-system, system-ui, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            text-align: center;
        }
        h1 { color: #7dd3a0; font-size: 22px; margin-bottom: 8px; }
        p { color: #8b97a5; font-size: 15px; line-height: 1.6; }
    </style>
</head>
<body>
    <div>
        <h1>Signed in</h1>
        <p>Amity has your profile now.<br>You can close this window and return to your terminal.</p>
    </div>
</body>
</html>"#;

const ERROR_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Amity | Sign-in Failed</title>
    <style>
        body {
            background-color: #101418;
            color: #e7ebf0;
            font-family: -apple-system, system-ui, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            text-align: center;
        }
        h1 { color: #e07070; font-size: 22px; margin-bottom: 8px; }
        p { color: #8b97a5; font-size: 15px; line-height: 1.6; }
    </style>
</head>
<body>
    <div>
        <h1>Sign-in failed</h1>
        <p>Something went wrong during authorization.<br>Please return to your terminal and try again.</p>
    </div>
</body>
</html>"#;

/// Parameters captured from the callback request.
#[derive(Debug, Clone)]
pub struct CallbackParams {
    pub code: String,
    pub state: Option<String>,
}

/// Bind address and expected request path for a redirect URI.
fn callback_endpoint(redirect_uri: &str) -> Result<(String, String)> {
    let url = Url::parse(redirect_uri)
        .map_err(|e| Error::OAuth(format!("Invalid redirect URI {redirect_uri}: {e}")))?;

    let host = url.host_str().unwrap_or("localhost");
    let port = url
        .port_or_known_default()
        .ok_or_else(|| Error::OAuth(format!("Redirect URI {redirect_uri} has no port")))?;

    Ok((format!("{host}:{port}"), url.path().to_string()))
}

/// Wait for the single OAuth redirect on the configured URI.
///
/// Returns the authorization code once the expected `state` is validated.
pub async fn wait_for_callback(redirect_uri: &str, expected_state: &str) -> Result<CallbackParams> {
    let (addr, path) = callback_endpoint(redirect_uri)?;

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::OAuth(format!("Failed to start callback server on {addr}: {e}")))?;

    tracing::info!("Callback server listening on http://{addr}{path}");

    let (mut socket, _) = listener
        .accept()
        .await
        .map_err(|e| Error::OAuth(format!("Failed to accept connection: {e}")))?;

    let mut buffer = vec![0u8; 4096];
    let n = socket
        .read(&mut buffer)
        .await
        .map_err(|e| Error::OAuth(format!("Failed to read request: {e}")))?;

    let request = String::from_utf8_lossy(&buffer[..n]);
    let result = parse_callback_request(&request, &path, expected_state);

    let (status, body) = match &result {
        Ok(_) => ("200 OK", SUCCESS_HTML),
        Err(_) => ("400 Bad Request", ERROR_HTML),
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );

    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;

    result
}

/// Extract and validate the callback parameters from a raw HTTP request.
fn parse_callback_request(
    request: &str,
    expected_path: &str,
    expected_state: &str,
) -> Result<CallbackParams> {
    let first_line = request
        .lines()
        .next()
        .ok_or_else(|| Error::OAuth("Empty request".to_string()))?;

    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(Error::OAuth("Invalid request format".to_string()));
    }

    let url = Url::parse(&format!("http://localhost{}", parts[1]))
        .map_err(|e| Error::OAuth(format!("Failed to parse callback URL: {e}")))?;

    if url.path() != expected_path {
        return Err(Error::OAuth(format!(
            "Unexpected callback path: {}",
            url.path()
        )));
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut error_description = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            "error" => error = Some(value.to_string()),
            "error_description" => error_description = Some(value.to_string()),
            _ => {}
        }
    }

    if let Some(err) = error {
        let description = error_description.unwrap_or_else(|| "Unknown error".to_string());
        return Err(Error::OAuth(format!(
            "Authorization failed: {err} - {description}"
        )));
    }

    match state.as_deref() {
        Some(s) if s == expected_state => {}
        Some(_) => return Err(Error::OAuth("State mismatch in callback".to_string())),
        None => return Err(Error::OAuth("Missing state parameter".to_string())),
    }

    let code = code.ok_or_else(|| Error::OAuth("Missing authorization code".to_string()))?;

    Ok(CallbackParams { code, state })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback_success() {
        let request = "GET /?code=abc123&state=xyz789 HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let result = parse_callback_request(request, "/", "xyz789").unwrap();

        assert_eq!(result.code, "abc123");
        assert_eq!(result.state.as_deref(), Some("xyz789"));
    }

    #[test]
    fn test_parse_callback_error_param() {
        let request = "GET /?error=access_denied&error_description=User+denied&state=s HTTP/1.1\r\n\r\n";
        let err = parse_callback_request(request, "/", "s").unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[test]
    fn test_parse_callback_state_mismatch() {
        let request = "GET /?code=abc&state=wrong HTTP/1.1\r\n\r\n";
        let err = parse_callback_request(request, "/", "expected").unwrap_err();
        assert!(err.to_string().contains("State mismatch"));
    }

    #[test]
    fn test_parse_callback_missing_state() {
        let request = "GET /?code=abc HTTP/1.1\r\n\r\n";
        let err = parse_callback_request(request, "/", "expected").unwrap_err();
        assert!(err.to_string().contains("Missing state"));
    }

    #[test]
    fn test_parse_callback_missing_code() {
        let request = "GET /?state=s HTTP/1.1\r\n\r\n";
        let err = parse_callback_request(request, "/", "s").unwrap_err();
        assert!(err.to_string().contains("authorization code"));
    }

    #[test]
    fn test_parse_callback_wrong_path() {
        let request = "GET /elsewhere?code=abc&state=s HTTP/1.1\r\n\r\n";
        let err = parse_callback_request(request, "/", "s").unwrap_err();
        assert!(err.to_string().contains("Unexpected callback path"));
    }

    #[test]
    fn test_callback_endpoint_default_uri() {
        let (addr, path) = callback_endpoint("http://localhost:8501/").unwrap();
        assert_eq!(addr, "localhost:8501");
        assert_eq!(path, "/");
    }

    #[test]
    fn test_callback_endpoint_custom_path() {
        let (addr, path) = callback_endpoint("http://127.0.0.1:9000/oauth/done").unwrap();
        assert_eq!(addr, "127.0.0.1:9000");
        assert_eq!(path, "/oauth/done");
    }
}
