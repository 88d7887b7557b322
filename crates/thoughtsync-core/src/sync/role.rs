use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// User-agent markers of handheld devices. Any match makes the device a
/// consumer.
const MOBILE_MARKERS: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

/// Device role. Consumers only read the remote snapshot; producers only edit
/// the local cache and publish it by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Consumer,
    Producer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Consumer => "consumer",
            Role::Producer => "producer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "consumer" | "mobile" => Ok(Role::Consumer),
            "producer" | "desktop" => Ok(Role::Producer),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Environment signals the role is derived from.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSignals {
    pub user_agent: Option<String>,
    /// Explicit role from configuration; wins over the user agent.
    pub role_override: Option<Role>,
}

impl EnvironmentSignals {
    pub fn is_mobile_user_agent(&self) -> bool {
        self.user_agent
            .as_deref()
            .map(|ua| {
                let ua = ua.to_lowercase();
                MOBILE_MARKERS.iter().any(|marker| ua.contains(marker))
            })
            .unwrap_or(false)
    }
}

/// Classify the device. Without a mobile user agent or an override the device
/// is a producer.
pub fn determine_role(signals: &EnvironmentSignals) -> Role {
    if let Some(role) = signals.role_override {
        return role;
    }
    if signals.is_mobile_user_agent() {
        Role::Consumer
    } else {
        Role::Producer
    }
}
