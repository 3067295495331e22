// ABOUTME: Value types for device control - LNA state and PAM readings.
// ABOUTME: Parses the text answers of the LNA and PAM query daemons.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::DeviceError;

/// Attenuator range accepted by the RF switch attenuators, in dB.
pub const ATTENUATION_MIN_DB: f64 = 0.0;
pub const ATTENUATION_MAX_DB: f64 = 31.75;

static PAM_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ant(?P<ant>\S+?)\s+on\s+(?P<x>[\d.]+)\s+on\s+(?P<y>[\d.]+)")
        .expect("PAM line pattern is valid")
});

/// Power state of a low-noise amplifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LnaState {
    On,
    Off,
}

impl LnaState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LnaState::On => "on",
            LnaState::Off => "off",
        }
    }
}

impl std::fmt::Display for LnaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LnaState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(LnaState::On),
            "off" => Ok(LnaState::Off),
            other => Err(format!("unknown LNA state '{}'", other)),
        }
    }
}

/// PAM attenuator readings keyed `<ant>x` and `<ant>y`.
pub type PamReadings = BTreeMap<String, f64>;

/// Parse `atagetpams -q` output: one `ant<id> on <x> on <y>` line per antenna.
pub(crate) fn parse_pams(command: &str, stdout: &str) -> Result<PamReadings, DeviceError> {
    let mut readings = PamReadings::new();
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        let caps = PAM_LINE.captures(line).ok_or_else(|| DeviceError::Parse {
            command: command.to_string(),
            reason: format!("unexpected line '{}'", line.trim()),
        })?;
        let ant = &caps["ant"];
        for pol in ["x", "y"] {
            let value: f64 = caps[pol].parse().map_err(|_| DeviceError::Parse {
                command: command.to_string(),
                reason: format!("bad {} value '{}' for ant{}", pol, &caps[pol], ant),
            })?;
            readings.insert(format!("{}{}", ant, pol), value);
        }
    }
    Ok(readings)
}
