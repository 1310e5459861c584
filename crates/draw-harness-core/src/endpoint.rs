//! Deployment context and draw-endpoint selection.
//!
//! The front end is served from one of three places, and the draw API base
//! URL follows from where:
//!
//! | Context | Example host | Base URL |
//! |---------|--------------|----------|
//! | Managed hosting | `picker.onrender.com` | fixed hosted URL |
//! | Loopback | `localhost:8080` | fixed local URL |
//! | LAN | `192.168.1.20:8080` | `http://{hostname}:{port}` |
//!
//! When no host is known at all, [`EndpointConfig::resolve`] returns `None`.
//! Callers treat that as "no network acquisition possible", not as an error.

use serde::Deserialize;

pub const DEFAULT_HOSTED_SUFFIX: &str = "onrender.com";
pub const DEFAULT_HOSTED_BASE_URL: &str = "https://lottery-system88.onrender.com";
pub const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:5060";
pub const DEFAULT_API_PORT: u16 = 5060;

/// The host the front end is being served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    /// Host including any port (`example.com:8080`).
    pub host: String,
    /// Host name without the port (`example.com`).
    pub hostname: String,
}

impl HostContext {
    /// Split a `host[:port]` string. Returns `None` for an empty host.
    ///
    /// IPv6 literals keep their brackets in `hostname` (`[::1]:8080` gives
    /// `[::1]`) so the name can be dropped straight into a URL. A bare IPv6
    /// address is bracketed.
    pub fn parse(host: &str) -> Option<Self> {
        let host = host.trim();
        if host.is_empty() {
            return None;
        }
        let hostname = if host.starts_with('[') {
            let end = host.find(']')?;
            let rest = &host[end + 1..];
            let port_ok = rest.is_empty()
                || rest
                    .strip_prefix(':')
                    .is_some_and(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
            if !port_ok || end == 1 {
                return None;
            }
            host[..=end].to_string()
        } else {
            match host.rsplit_once(':') {
                Some((name, port))
                    if !port.is_empty()
                        && port.chars().all(|c| c.is_ascii_digit())
                        && !name.contains(':') =>
                {
                    name.to_string()
                }
                _ if host.matches(':').count() > 1 => format!("[{}]", host),
                _ => host.to_string(),
            }
        };
        if hostname.is_empty() {
            return None;
        }
        Some(Self {
            host: host.to_string(),
            hostname,
        })
    }

    pub fn is_loopback(&self) -> bool {
        matches!(self.hostname.as_str(), "localhost" | "127.0.0.1" | "[::1]")
    }
}

/// Client platform, as far as the network default is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    /// iPad / iPhone / iPod. Network refresh is off unless the user enables it.
    Ios,
    #[default]
    Other,
}

impl Platform {
    pub fn from_user_agent(user_agent: &str) -> Self {
        if ["iPad", "iPhone", "iPod"]
            .iter()
            .any(|device| user_agent.contains(device))
        {
            Platform::Ios
        } else {
            Platform::Other
        }
    }

    /// Network-enabled default when the user never chose.
    pub fn default_network_enabled(&self) -> bool {
        !matches!(self, Platform::Ios)
    }
}

/// Everything the pipeline needs to know about where it runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Environment {
    pub host: Option<HostContext>,
    pub platform: Platform,
    /// Set when the host is a managed hosting deployment; forces network
    /// refresh and bypasses cache reads.
    pub managed_hosting: bool,
}

impl Environment {
    pub fn detect(host: Option<&str>, user_agent: Option<&str>, hosted_suffix: &str) -> Self {
        let host = host.and_then(HostContext::parse);
        let managed_hosting = host
            .as_ref()
            .is_some_and(|h| !hosted_suffix.is_empty() && h.host.contains(hosted_suffix));
        Self {
            host,
            platform: user_agent.map(Platform::from_user_agent).unwrap_or_default(),
            managed_hosting,
        }
    }

    /// Network-enabled value to use when nothing is persisted.
    pub fn default_network_enabled(&self) -> bool {
        self.managed_hosting || self.platform.default_network_enabled()
    }
}

/// Base URLs for each deployment context.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    #[serde(default = "default_hosted_suffix")]
    pub hosted_suffix: String,
    #[serde(default = "default_hosted_base_url")]
    pub hosted_base_url: String,
    #[serde(default = "default_local_base_url")]
    pub local_base_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_hosted_suffix() -> String {
    DEFAULT_HOSTED_SUFFIX.to_string()
}
fn default_hosted_base_url() -> String {
    DEFAULT_HOSTED_BASE_URL.to_string()
}
fn default_local_base_url() -> String {
    DEFAULT_LOCAL_BASE_URL.to_string()
}
fn default_port() -> u16 {
    DEFAULT_API_PORT
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            hosted_suffix: default_hosted_suffix(),
            hosted_base_url: default_hosted_base_url(),
            local_base_url: default_local_base_url(),
            port: default_port(),
        }
    }
}

impl EndpointConfig {
    /// Resolve the draw API base URL (no trailing slash) for `host`.
    pub fn resolve(&self, host: Option<&HostContext>) -> Option<String> {
        let host = host?;
        let base = if !self.hosted_suffix.is_empty() && host.host.contains(&self.hosted_suffix) {
            self.hosted_base_url.clone()
        } else if host.is_loopback() {
            self.local_base_url.clone()
        } else {
            format!("http://{}:{}", host.hostname, self.port)
        };
        Some(base.trim_end_matches('/').to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(host: &str) -> Option<String> {
        EndpointConfig::default().resolve(HostContext::parse(host).as_ref())
    }

    #[test]
    fn test_hosted_context_uses_fixed_url() {
        assert_eq!(
            resolve("lottery-picker.onrender.com").as_deref(),
            Some("https://lottery-system88.onrender.com")
        );
    }

    #[test]
    fn test_loopback_uses_local_url() {
        assert_eq!(resolve("localhost:8080").as_deref(), Some("http://localhost:5060"));
        assert_eq!(resolve("127.0.0.1").as_deref(), Some("http://localhost:5060"));
        assert_eq!(resolve("[::1]:8080").as_deref(), Some("http://localhost:5060"));
        assert_eq!(resolve("[::1]").as_deref(), Some("http://localhost:5060"));
        assert_eq!(resolve("::1").as_deref(), Some("http://localhost:5060"));
    }

    #[test]
    fn test_lan_host_keeps_hostname() {
        assert_eq!(
            resolve("192.168.1.20:8080").as_deref(),
            Some("http://192.168.1.20:5060")
        );
        assert_eq!(resolve("picker.lan").as_deref(), Some("http://picker.lan:5060"));
        assert_eq!(
            resolve("[fe80::1]:8080").as_deref(),
            Some("http://[fe80::1]:5060")
        );
        assert_eq!(resolve("fd00::20").as_deref(), Some("http://[fd00::20]:5060"));
    }

    #[test]
    fn test_parse_ipv6_hosts() {
        let ctx = HostContext::parse("[::1]:8080").unwrap();
        assert_eq!(ctx.host, "[::1]:8080");
        assert_eq!(ctx.hostname, "[::1]");
        assert!(ctx.is_loopback());

        assert_eq!(HostContext::parse("[]:8080"), None);
        assert_eq!(HostContext::parse("[::1]x"), None);
        assert_eq!(HostContext::parse("[::1"), None);
    }

    #[test]
    fn test_unknown_context_resolves_to_none() {
        assert_eq!(EndpointConfig::default().resolve(None), None);
        assert_eq!(resolve(""), None);
        assert_eq!(resolve(":8080"), None);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let cfg = EndpointConfig {
            local_base_url: "http://127.0.0.1:9000/".to_string(),
            ..EndpointConfig::default()
        };
        assert_eq!(
            cfg.resolve(HostContext::parse("localhost").as_ref()).as_deref(),
            Some("http://127.0.0.1:9000")
        );
    }

    #[test]
    fn test_platform_detection() {
        let ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)";
        assert_eq!(Platform::from_user_agent(ua), Platform::Ios);
        assert!(!Platform::Ios.default_network_enabled());
        assert_eq!(
            Platform::from_user_agent("Mozilla/5.0 (X11; Linux x86_64)"),
            Platform::Other
        );
    }

    #[test]
    fn test_environment_detect() {
        let env = Environment::detect(Some("app.onrender.com"), Some("iPad"), DEFAULT_HOSTED_SUFFIX);
        assert!(env.managed_hosting);
        assert_eq!(env.platform, Platform::Ios);
        // Managed hosting overrides the iOS default.
        assert!(env.default_network_enabled());

        let env = Environment::detect(Some("localhost:3000"), None, DEFAULT_HOSTED_SUFFIX);
        assert!(!env.managed_hosting);
        assert_eq!(env.host.unwrap().hostname, "localhost");

        let env = Environment::detect(None, Some("iPod touch"), DEFAULT_HOSTED_SUFFIX);
        assert!(env.host.is_none());
        assert!(!env.default_network_enabled());
    }
}
