//! Response helpers shared by the REST clients.

/// Return the response unchanged when its status is 2xx, otherwise the
/// status code and raw body text for the caller's error type.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, (u16, String)> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err((status.as_u16(), body));
    }
    Ok(response)
}

/// Join a base URL and a path without doubling the slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
