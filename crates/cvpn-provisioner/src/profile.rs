//! Client connection profile rendering.

use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Transport protocol of the tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// TCP transport.
    Tcp,
    /// UDP transport.
    Udp,
}

impl Protocol {
    /// Returns the protocol keyword used in profiles.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            other => Err(format!("unsupported protocol '{other}' (expected tcp or udp)")),
        }
    }
}

/// Transport settings of a client profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileConfig {
    /// Address range handed to clients. Not rendered into the profile.
    pub client_cidr: String,
    /// Port the endpoint listens on.
    pub server_port: u16,
    /// Tunnel transport.
    pub protocol: Protocol,
    /// When false, all client traffic is routed through the tunnel.
    pub split_tunnel: bool,
}

/// Directive added for full-tunnel profiles.
pub const FULL_TUNNEL_DIRECTIVE: &str = "redirect-gateway def1";

/// Renders a client profile.
///
/// The PEM blocks are embedded verbatim inside `<ca>`, `<cert>` and `<key>`
/// tags.
#[must_use]
pub fn assemble(
    dns: &str,
    config: &ProfileConfig,
    ca_certificate: &str,
    client_certificate: &str,
    client_private_key: &str,
) -> String {
    let mut profile = String::with_capacity(
        256 + ca_certificate.len() + client_certificate.len() + client_private_key.len(),
    );

    // Writing into a String cannot fail.
    let _ = write!(
        profile,
        "client\n\
         dev tun\n\
         proto {protocol}\n\
         remote {dns} {port}\n\
         resolv-retry infinite\n\
         nobind\n\
         persist-key\n\
         persist-tun\n\
         remote-cert-tls server\n\
         cipher AES-256-GCM\n\
         verb 3",
        protocol = config.protocol,
        port = config.server_port,
    );

    if !config.split_tunnel {
        profile.push('\n');
        profile.push_str(FULL_TUNNEL_DIRECTIVE);
    }

    for (tag, pem) in [
        ("ca", ca_certificate),
        ("cert", client_certificate),
        ("key", client_private_key),
    ] {
        let _ = write!(profile, "\n\n<{tag}>\n{pem}\n</{tag}>");
    }

    profile
}
