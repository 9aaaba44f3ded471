//! The `[PATH] [ADDRESS]` positionals.

use std::path::Path;

/// Splits `<host>[:<port>]`, `:<port>` or `<port>`.
///
/// Returns `None` for malformed addresses.
///
/// ```
/// use cli::address::split_address;
///
/// assert_eq!(split_address("8080"), Some((None, Some(8080))));
/// assert_eq!(split_address("0.0.0.0:80"), Some((Some("0.0.0.0".into()), Some(80))));
/// assert_eq!(split_address("localhost:http"), None);
/// ```
pub fn split_address(address: &str) -> Option<(Option<String>, Option<u16>)> {
    let address = address.trim();
    if address.is_empty() {
        return None;
    }

    match address.split_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().ok()?;
            let host = if host.is_empty() {
                None
            } else {
                Some(valid_host(host)?)
            };
            Some((host, Some(port)))
        }
        None if address.bytes().all(|b| b.is_ascii_digit()) => {
            Some((None, Some(address.parse::<u16>().ok()?)))
        }
        None => Some((Some(valid_host(address)?), None)),
    }
}

fn valid_host(host: &str) -> Option<String> {
    host.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
        .then(|| host.to_string())
}

/// Tells the path from the address when a single positional is given.
///
/// A lone positional that carries a port and does not exist on disk is the
/// address.
pub fn resolve(path: Option<String>, address: Option<String>) -> (Option<String>, Option<String>) {
    let Some(candidate) = path else {
        return (None, address);
    };

    if address.is_some() {
        return (Some(candidate), address);
    }

    let has_port = matches!(split_address(&candidate), Some((_, Some(_))));
    if has_port && !Path::new(&candidate).exists() {
        (None, Some(candidate))
    } else {
        (Some(candidate), None)
    }
}
