//! Host-to-server matching for `{server}.mcp.{domain}` subdomains.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::schema::{ProxyConfig, ServerConfig};

/// Fixed label between the server name and the base domain.
pub const MCP_LABEL: &str = "mcp";

/// Anything that can answer "is this a configured server?".
pub trait ServerDirectory {
    fn contains_server(&self, name: &str) -> bool;
}

impl ServerDirectory for HashMap<String, ServerConfig> {
    fn contains_server(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

impl ServerDirectory for HashSet<String> {
    fn contains_server(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl ServerDirectory for BTreeSet<String> {
    fn contains_server(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl ServerDirectory for [&str] {
    fn contains_server(&self, name: &str) -> bool {
        self.contains(&name)
    }
}

impl ServerDirectory for ProxyConfig {
    fn contains_server(&self, name: &str) -> bool {
        self.servers.contains_server(name)
    }
}

/// Extract the server name from `host` if it is `{server}.mcp.{domain}[:port]`
/// and `{server}` is known to `servers`.
pub fn validate_subdomain<D>(domain: &str, host: &str, servers: &D) -> Option<String>
where
    D: ServerDirectory + ?Sized,
{
    let suffix = expected_suffix(domain);
    extract_server(host, &suffix)
        .filter(|name| servers.contains_server(name))
        .map(str::to_string)
}

fn expected_suffix(domain: &str) -> String {
    format!(".{}.{}", MCP_LABEL, domain)
}

fn extract_server<'h>(host: &'h str, suffix: &str) -> Option<&'h str> {
    let host = match host.find(':') {
        Some(idx) => &host[..idx],
        None => host,
    };
    if host.len() <= suffix.len() {
        return None;
    }
    host.strip_suffix(suffix)
}

/// Precomputed validator for one domain and server set.
#[derive(Debug, Clone)]
pub struct SubdomainValidator {
    suffix: String,
    servers: HashSet<String>,
}

impl SubdomainValidator {
    pub fn new<I, S>(domain: &str, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffix: expected_suffix(domain),
            servers: servers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(&config.domain, config.servers.keys().cloned())
    }

    /// The suffix a host must end with, e.g. `.mcp.example.com`.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Return the configured server named by `host`, if any.
    pub fn validate<'h>(&self, host: &'h str) -> Option<&'h str> {
        let name = extract_server(host, &self.suffix)?;
        if self.servers.contains_server(name) {
            tracing::trace!(host, server = name, "Subdomain matched");
            Some(name)
        } else {
            tracing::debug!(host, "Host does not name a configured server");
            None
        }
    }
}
