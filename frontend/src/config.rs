use web_sys::window;

pub fn get_api_base_url() -> String {
    // Check if we're running in production (catcafe.dev) or locally
    if let Some(window) = window() {
        if let Ok(location) = window.location().host() {
            if location.contains("catcafe.dev") {
                // Return empty string for relative URLs when on the production domain
                return "".to_string();
            }

            // Use the current hostname and port so the app works from other machines too
            let protocol = window.location().protocol().unwrap_or_else(|_| "http:".to_string());
            return format!("{}//{}", protocol, location);
        }
    }

    // Default to 127.0.0.1 for development
    "http://127.0.0.1:3000".to_string()
}

pub fn get_api_url(path: &str) -> String {
    format!("{}{}", get_api_base_url(), path)
}

/// WebSocket URL for `path`, matching the page's http/https scheme.
pub fn get_ws_url(path: &str) -> String {
    let api_base = get_api_base_url();
    if api_base.is_empty() {
        if let Some(window) = window() {
            let location = window.location();
            let protocol = location.protocol().unwrap_or_default();
            let host = location.host().unwrap_or_default();
            let ws_protocol = if protocol.starts_with("https") { "wss" } else { "ws" };
            return format!("{}://{}{}", ws_protocol, host, path);
        }
        return format!("ws://127.0.0.1:3000{}", path);
    }

    let ws_base = api_base
        .replace("http://", "ws://")
        .replace("https://", "wss://");
    format!("{}{}", ws_base, path)
}
