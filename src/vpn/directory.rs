//! Server Directory
//!
//! Static catalog of selectable VPN endpoints. The catalog is defined once at
//! compile time and shared read-only by the controller and the selection view,
//! so no locking is involved.

use serde::Serialize;
use thiserror::Error;

/// Ping below this is shown as a good connection (ms)
const PING_GOOD_MS: u32 = 50;
/// Ping below this is shown as fair (ms)
const PING_FAIR_MS: u32 = 100;
/// Load below this is shown as low (%)
const LOAD_LOW_PERCENT: u8 = 30;
/// Load below this is shown as medium (%)
const LOAD_MEDIUM_PERCENT: u8 = 70;

/// Immutable catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub id: &'static str,
    pub name: &'static str,
    pub country: &'static str,
    /// Display glyph (regional indicator pair)
    pub flag: &'static str,
    /// Short location code, e.g. "NYC"
    pub location: &'static str,
    /// Static round-trip estimate in milliseconds
    pub ping: u32,
    /// Static load percentage (0-100)
    pub load: u8,
}

/// Display band for a server's ping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PingQuality {
    Good,
    Fair,
    Poor,
}

/// Display band for a server's load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadLevel {
    Low,
    Medium,
    High,
}

impl Server {
    pub fn ping_quality(&self) -> PingQuality {
        if self.ping < PING_GOOD_MS {
            PingQuality::Good
        } else if self.ping < PING_FAIR_MS {
            PingQuality::Fair
        } else {
            PingQuality::Poor
        }
    }

    pub fn load_level(&self) -> LoadLevel {
        if self.load < LOAD_LOW_PERCENT {
            LoadLevel::Low
        } else if self.load < LOAD_MEDIUM_PERCENT {
            LoadLevel::Medium
        } else {
            LoadLevel::High
        }
    }

    /// "New York, United States"
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }
}

/// Built-in endpoint catalog, in display order
pub static BUILTIN_SERVERS: [Server; 8] = [
    Server {
        id: "1",
        name: "New York",
        country: "United States",
        flag: "🇺🇸",
        location: "NYC",
        ping: 25,
        load: 45,
    },
    Server {
        id: "2",
        name: "London",
        country: "United Kingdom",
        flag: "🇬🇧",
        location: "LON",
        ping: 42,
        load: 32,
    },
    Server {
        id: "3",
        name: "Tokyo",
        country: "Japan",
        flag: "🇯🇵",
        location: "TYO",
        ping: 78,
        load: 28,
    },
    Server {
        id: "4",
        name: "Frankfurt",
        country: "Germany",
        flag: "🇩🇪",
        location: "FRA",
        ping: 35,
        load: 56,
    },
    Server {
        id: "5",
        name: "Sydney",
        country: "Australia",
        flag: "🇦🇺",
        location: "SYD",
        ping: 165,
        load: 23,
    },
    Server {
        id: "6",
        name: "Toronto",
        country: "Canada",
        flag: "🇨🇦",
        location: "TOR",
        ping: 38,
        load: 67,
    },
    Server {
        id: "7",
        name: "Singapore",
        country: "Singapore",
        flag: "🇸🇬",
        location: "SIN",
        ping: 95,
        load: 34,
    },
    Server {
        id: "8",
        name: "Mumbai",
        country: "India",
        flag: "🇮🇳",
        location: "BOM",
        ping: 120,
        load: 41,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("Server not found: {0}")]
    NotFound(String),
}

/// Read-only view over a static server catalog
#[derive(Debug, Clone, Copy)]
pub struct ServerDirectory {
    servers: &'static [Server],
}

impl ServerDirectory {
    /// Directory over the built-in catalog
    pub fn builtin() -> Self {
        Self {
            servers: &BUILTIN_SERVERS,
        }
    }

    /// Directory over a caller-supplied catalog.
    ///
    /// Returns `None` for an empty catalog, since a session always needs a
    /// default selection.
    pub fn from_static(servers: &'static [Server]) -> Option<Self> {
        if servers.is_empty() {
            None
        } else {
            Some(Self { servers })
        }
    }

    /// All servers in catalog order
    pub fn list(&self) -> &'static [Server] {
        self.servers
    }

    /// Look up a server by id
    pub fn get(&self, id: &str) -> Result<&'static Server, DirectoryError> {
        self.servers
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))
    }

    /// The catalog's first entry, used as the initial selection
    pub fn default_server(&self) -> &'static Server {
        &self.servers[0]
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }
}

impl Default for ServerDirectory {
    fn default() -> Self {
        Self::builtin()
    }
}
