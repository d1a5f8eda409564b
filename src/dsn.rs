//! DSN parsing and connect-descriptor construction.
//!
//! A generic DSN names a database in the vendor-neutral
//! `scheme://host:port/service;key=value` form. The native layer instead
//! wants a structured descriptor string. [`DsnParams`] sits between the
//! two: [`DsnParams::parse`] destructures the DSN, [`DsnParams::to_descriptor`]
//! renders the native form.
//!
//! Parsing is deliberately lenient: a missing port falls back to the
//! default, a malformed `key=value` fragment is skipped, an unrecognized
//! parameter key is discarded. Only an unsupported scheme or a missing
//! authority marker rejects the DSN as a whole.

use std::collections::HashMap;
use std::fs;

use tracing::debug;

/// Default Oracle listener port.
pub const DEFAULT_PORT: u16 = 1521;

/// Default hostname when the DSN names none.
pub const DEFAULT_HOSTNAME: &str = "localhost";

/// Marker separating the service name from an embedded SID.
const SID_MARKER: &str = "/SID/";

/// Alias chains longer than this are treated as unresolvable.
const MAX_ALIAS_DEPTH: u8 = 8;

/// Alias and URI resolution consulted by [`DsnParams::parse`].
///
/// A bare DSN with no scheme is looked up as a configured alias; a `uri:`
/// DSN is fetched from the referenced location and reparsed. The lookup is
/// injected rather than read from process-wide configuration so tests can
/// substitute a fake.
pub trait DsnLookup {
    /// Resolve a configured alias to a full DSN string.
    fn resolve_alias(&self, name: &str) -> Option<String>;

    /// Read DSN content from a referenced location.
    fn fetch_uri(&self, location: &str) -> Option<String>;
}

/// Lookup that resolves nothing.
///
/// With this lookup only literal `oci:` DSNs parse.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl DsnLookup for NoLookup {
    fn resolve_alias(&self, _name: &str) -> Option<String> {
        None
    }

    fn fetch_uri(&self, _location: &str) -> Option<String> {
        None
    }
}

/// Registry-backed lookup: aliases from an in-memory table, URIs from the
/// local filesystem (`file://` prefix optional).
#[derive(Debug, Clone, Default)]
pub struct DsnRegistry {
    aliases: HashMap<String, String>,
}

impl DsnRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an alias for a full DSN string.
    pub fn register(&mut self, name: impl Into<String>, dsn: impl Into<String>) {
        self.aliases.insert(name.into(), dsn.into());
    }
}

impl DsnLookup for DsnRegistry {
    fn resolve_alias(&self, name: &str) -> Option<String> {
        self.aliases.get(name).cloned()
    }

    fn fetch_uri(&self, location: &str) -> Option<String> {
        let path = location.strip_prefix("file://").unwrap_or(location);
        fs::read_to_string(path)
            .ok()
            .map(|content| content.trim().to_string())
    }
}

/// Structured connection parameters destructured from a DSN.
///
/// Constructed once per parse and consumed by [`to_descriptor`](Self::to_descriptor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsnParams {
    /// Database host.
    pub hostname: String,
    /// Listener port, always positive after parsing.
    pub port: u16,
    /// Service name.
    pub dbname: String,
    /// System identifier, when the service segment embeds one.
    pub sid: Option<String>,
    /// Whitelisted extra parameters, e.g. `charset`.
    pub extra: HashMap<String, String>,
}

impl DsnParams {
    /// Parse a generic DSN into structured connection parameters.
    ///
    /// `whitelist` names the extra parameter keys to keep; everything else
    /// in the parameter list is discarded. Returns `None` when the string
    /// cannot be parsed as a supported form.
    ///
    /// Supported forms:
    /// - `oci://host:port/service;key=value;...` where `service` may embed
    ///   a SID as `base/SID/value`
    /// - `uri:location`, fetched through `lookup` and reparsed
    /// - a bare alias name, resolved through `lookup` and reparsed
    pub fn parse(dsn: &str, whitelist: &[&str], lookup: &dyn DsnLookup) -> Option<Self> {
        Self::parse_at(dsn, whitelist, lookup, 0)
    }

    fn parse_at(dsn: &str, whitelist: &[&str], lookup: &dyn DsnLookup, depth: u8) -> Option<Self> {
        // Caps alias/uri chains so a cyclic configuration cannot recurse
        // forever.
        if depth >= MAX_ALIAS_DEPTH {
            return None;
        }
        let Some((scheme, remainder)) = dsn.split_once(':') else {
            debug!(alias = dsn, "resolving DSN alias");
            let resolved = lookup.resolve_alias(dsn)?;
            if resolved.is_empty() {
                return None;
            }
            return Self::parse_at(&resolved, whitelist, lookup, depth + 1);
        };
        match scheme {
            "uri" => {
                debug!(location = remainder, "fetching DSN by reference");
                let content = lookup.fetch_uri(remainder)?;
                let content = content.trim();
                if content.is_empty() {
                    return None;
                }
                Self::parse_at(content, whitelist, lookup, depth + 1)
            }
            "oci" => Self::parse_oci(remainder, whitelist),
            _ => None,
        }
    }

    fn parse_oci(remainder: &str, whitelist: &[&str]) -> Option<Self> {
        let remainder = remainder.strip_prefix("//")?;

        let (hostname, port, rest) = match remainder.split_once('/') {
            Some((authority, rest)) => {
                let (host, port) = match authority.split_once(':') {
                    Some((host, port)) => (host, parse_port(port)),
                    None => (authority, DEFAULT_PORT),
                };
                let host = if host.is_empty() {
                    DEFAULT_HOSTNAME
                } else {
                    host
                };
                (host.to_string(), port, rest)
            }
            None => (DEFAULT_HOSTNAME.to_string(), DEFAULT_PORT, remainder),
        };

        let (service, param_list) = match rest.split_once(';') {
            Some((service, params)) => (service, params),
            None => (rest, ""),
        };

        let mut extra = HashMap::new();
        for pair in param_list.split(';') {
            // Fragments without `=` are skipped, best effort.
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            if whitelist.contains(&key) {
                extra.insert(key.to_string(), value.to_string());
            }
        }

        let (dbname, sid) = match service.split_once(SID_MARKER) {
            Some((base, sid)) => (base.to_string(), Some(sid.to_string())),
            None => (service.to_string(), None),
        };

        Some(DsnParams {
            hostname,
            port,
            dbname,
            sid,
            extra,
        })
    }

    /// Render the structured connect descriptor the native layer expects.
    ///
    /// The SID clause is emitted only when a SID was parsed; the service
    /// name is always present.
    pub fn to_descriptor(&self) -> String {
        let mut connect_data = String::new();
        if let Some(sid) = &self.sid {
            connect_data.push_str(&format!("(SID={})", sid));
        }
        connect_data.push_str(&format!("(SERVICE_NAME={})", self.dbname));
        format!(
            "(DESCRIPTION=(ADDRESS_LIST=(ADDRESS=(PROTOCOL=TCP)(HOST={})(PORT={})))(CONNECT_DATA={}))",
            self.hostname, self.port, connect_data
        )
    }

    /// The whitelisted `charset` parameter, when present.
    pub fn charset(&self) -> Option<&str> {
        self.extra.get("charset").map(String::as_str)
    }
}

/// Coerce a port fragment, falling back to the default when it is absent,
/// non-numeric, or zero.
fn parse_port(port: &str) -> u16 {
    port.parse::<u16>()
        .ok()
        .filter(|&port| port != 0)
        .unwrap_or(DEFAULT_PORT)
}
