/// Parse and normalize a listen address.
///
/// Accepts `host:port`, `[v6]:port` and the short form `:port`, which
/// listens on all interfaces.
///
/// # Errors
///
/// Returns an error message if the port is missing or not a number.
pub fn parse_listen(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Listen address cannot be empty".to_string());
    }

    let Some((host, port)) = s.rsplit_once(':') else {
        return Err(format!("Listen address must include a port: '{}'", s));
    };
    if port.parse::<u16>().is_err() {
        return Err(format!("Invalid port in listen address: '{}'", s));
    }

    if host.is_empty() {
        Ok(format!("0.0.0.0:{}", port))
    } else {
        Ok(s.to_string())
    }
}

/// Parse a URL prefix, normalizing it to `""` or `/segment[/segment...]`.
pub fn parse_base_path(s: &str) -> Result<String, String> {
    if s.contains(['?', '#', '{', '}', '*', ' ']) {
        return Err(format!("Base path may only contain URL path segments: '{}'", s));
    }
    if s.split('/').any(|segment| segment == "..") {
        return Err(format!("Base path cannot contain '..': '{}'", s));
    }
    Ok(crate::context::normalize_base_path(s))
}
