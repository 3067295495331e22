// ABOUTME: Configuration for gateways, coordinator, fan-out and device commands.
// ABOUTME: Loaded from TOML with per-section defaults and passed explicitly.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::membership::{AntennaId, Group};

/// Top-level configuration.
///
/// Every section has defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtaConfig {
    pub gateway: GatewayConfig,
    pub membership: MembershipConfig,
    pub coordinator: CoordinatorConfig,
    pub fanout: FanOutConfig,
    pub devices: DeviceCommands,
    pub array: ArrayConfig,
}

/// How gateway commands are routed to hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Program used to reach remote hosts.
    pub ssh_program: String,
    /// `user@host` for commands with no explicit route. Unset means local.
    pub default_host: Option<String>,
    /// Command name to `user@host`.
    pub hosts: HashMap<String, String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            default_host: None,
            hosts: HashMap::new(),
        }
    }
}

impl GatewayConfig {
    /// The host a command should run on, or `None` to run it locally.
    pub fn route(&self, command: &str) -> Option<&str> {
        self.hosts
            .get(command)
            .or(self.default_host.as_ref())
            .map(String::as_str)
    }
}

/// Commands and group names used to reach the group membership service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipConfig {
    pub list_command: String,
    pub move_command: String,
    pub idle_group: Group,
    pub reserved_group: Group,
    pub listing_format: ListingFormat,
}

/// Shape of the list command's output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListingFormat {
    /// One `<group> <ant> <ant> ...` line per group. A group with no line
    /// has no members.
    #[default]
    Prefixed,
    /// Only the queried group's members, whitespace separated.
    Bare,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            list_command: "antlist".to_string(),
            move_command: "antreserve".to_string(),
            idle_group: Group::none(),
            reserved_group: Group::bfa(),
            listing_format: ListingFormat::Prefixed,
        }
    }
}

/// What the coordinator does after issuing a compensating move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompensationPolicy {
    /// Issue the compensating move and do not check it.
    #[default]
    BestEffort,
    /// Re-list the source group afterwards and report antennas that did not
    /// make it back.
    Verified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub park_command: String,
    pub compensation: CompensationPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            park_command: "park.csh".to_string(),
            compensation: CompensationPolicy::BestEffort,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanOutConfig {
    /// Largest batch accepted. One worker is spawned per task.
    pub max_batch_size: usize,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self { max_batch_size: 64 }
    }
}

/// Command names for device control operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceCommands {
    pub atten_command: String,
    pub rf_switch_command: String,
    pub lna_command: String,
    pub pam_query_command: String,
}

impl Default for DeviceCommands {
    fn default() -> Self {
        Self {
            atten_command: "atten".to_string(),
            rf_switch_command: "rfswitch".to_string(),
            lna_command: "atalna".to_string(),
            pam_query_command: "atagetpams".to_string(),
        }
    }
}

/// Static description of the array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrayConfig {
    /// Every antenna in the array. Seeds the idle group of dry runs.
    pub antennas: Vec<AntennaId>,
}

impl AtaConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: AtaConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let commands = [
            ("gateway.ssh_program", &self.gateway.ssh_program),
            ("membership.list_command", &self.membership.list_command),
            ("membership.move_command", &self.membership.move_command),
            ("coordinator.park_command", &self.coordinator.park_command),
            ("devices.atten_command", &self.devices.atten_command),
            ("devices.rf_switch_command", &self.devices.rf_switch_command),
            ("devices.lna_command", &self.devices.lna_command),
            ("devices.pam_query_command", &self.devices.pam_query_command),
        ];
        for (field, value) in commands {
            if value.trim().is_empty() {
                return Err(invalid(field, "command cannot be empty"));
            }
        }

        if self.membership.idle_group.as_str().trim().is_empty() {
            return Err(invalid("membership.idle_group", "group cannot be empty"));
        }
        if self.membership.reserved_group.as_str().trim().is_empty() {
            return Err(invalid("membership.reserved_group", "group cannot be empty"));
        }
        if self.membership.idle_group == self.membership.reserved_group {
            return Err(invalid(
                "membership.reserved_group",
                "must differ from membership.idle_group",
            ));
        }

        if self.fanout.max_batch_size == 0 {
            return Err(invalid("fanout.max_batch_size", "must be at least 1"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
