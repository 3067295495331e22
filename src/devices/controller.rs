// ABOUTME: DeviceController - thin wrappers over attenuator, switch, LNA and PAM daemons.
// ABOUTME: Single-call operations plus fan-out batches for independent device groups.

use std::sync::Arc;

use crate::config::{AtaConfig, DeviceCommands};
use crate::error::DeviceError;
use crate::fanout::{FanOutBatch, FanOutExecutor, FanOutReport};
use crate::gateway::Gateway;
use crate::membership::AntennaId;

use super::types::{
    ATTENUATION_MAX_DB, ATTENUATION_MIN_DB, LnaState, PamReadings, parse_pams,
};

/// One attenuator request: antenna-polarisations and their values in dB.
#[derive(Debug, Clone, PartialEq)]
pub struct AttenuationRequest {
    pub antpols: Vec<String>,
    pub dbs: Vec<f64>,
}

impl AttenuationRequest {
    pub fn new<S: Into<String>>(antpols: impl IntoIterator<Item = S>, dbs: Vec<f64>) -> Self {
        Self {
            antpols: antpols.into_iter().map(Into::into).collect(),
            dbs,
        }
    }
}

/// Drives the per-antenna device daemons through a [`Gateway`].
///
/// Every operation is one gateway call unless noted. Nothing here checks
/// reservations; callers reserve antennas first.
#[derive(Clone)]
pub struct DeviceController {
    gateway: Arc<dyn Gateway>,
    commands: DeviceCommands,
    park_command: String,
    executor: FanOutExecutor,
}

impl DeviceController {
    pub fn new(gateway: Arc<dyn Gateway>, config: &AtaConfig) -> Self {
        Self {
            gateway,
            commands: config.devices.clone(),
            park_command: config.coordinator.park_command.clone(),
            executor: FanOutExecutor::new(&config.fanout),
        }
    }

    /// Share `executor` with other components.
    pub fn with_executor(mut self, executor: FanOutExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Set RF switch attenuators. `antpols[i]` gets `dbs[i]`.
    pub async fn set_attenuation(
        &self,
        antpols: &[String],
        dbs: &[f64],
    ) -> Result<String, DeviceError> {
        validate_attenuation(antpols, dbs)?;

        let db_list = dbs.iter().map(f64::to_string).collect::<Vec<_>>().join(",");
        let antpol_list = antpols.join(",");
        tracing::info!(dbs = %db_list, antpols = %antpol_list, "setting attenuators");

        let output = self
            .gateway
            .invoke(&self.commands.atten_command, &[db_list, antpol_list])
            .await?;
        let stdout = output.stdout_text();
        for line in stdout.lines() {
            tracing::info!("{}", line);
        }
        Ok(stdout)
    }

    /// Route `antennas` through the RF switch.
    pub async fn set_rf_switch(&self, antennas: &[AntennaId]) -> Result<(), DeviceError> {
        non_empty(antennas)?;
        let list = AntennaId::join(antennas);
        tracing::info!(antennas = %list, "setting rf switch");

        let output = self
            .gateway
            .invoke(&self.commands.rf_switch_command, &[list])
            .await?;
        for line in output.stdout_text().lines() {
            tracing::info!("{}", line);
        }
        Ok(())
    }

    /// Switch the LNAs of `antennas` on or off.
    pub async fn set_lna(&self, antennas: &[AntennaId], state: LnaState) -> Result<(), DeviceError> {
        non_empty(antennas)?;
        let list = AntennaId::join(antennas);
        tracing::info!(antennas = %list, %state, "setting LNAs");

        self.gateway
            .invoke(&self.commands.lna_command, &[state.to_string(), list])
            .await?;
        Ok(())
    }

    /// Query LNA state, one call per antenna, all at once.
    ///
    /// Failures stay in their antenna's slot.
    pub async fn lna_states(
        &self,
        antennas: &[AntennaId],
    ) -> Result<FanOutReport<LnaState>, DeviceError> {
        let batch = FanOutBatch::for_targets(antennas.iter().cloned(), |ant| {
            let gateway = self.gateway.clone();
            let command = self.commands.lna_command.clone();
            async move {
                let output = gateway
                    .invoke(&command, &["status".to_string(), ant.to_string()])
                    .await?;
                let state = output
                    .stdout_text()
                    .parse::<LnaState>()
                    .map_err(anyhow::Error::msg)?;
                anyhow::Ok(state)
            }
        });
        Ok(self.executor.collect_all(batch).await?)
    }

    /// Read PAM attenuator values for `antennas`.
    pub async fn get_pams(&self, antennas: &[AntennaId]) -> Result<PamReadings, DeviceError> {
        non_empty(antennas)?;
        let list = AntennaId::join(antennas);
        tracing::info!(antennas = %list, "getting pams");

        let command = &self.commands.pam_query_command;
        let output = self
            .gateway
            .invoke(command, &["-q".to_string(), list])
            .await?;
        parse_pams(command, &output.stdout_text())
    }

    /// Park one antenna.
    pub async fn park(&self, antenna: &AntennaId) -> Result<(), DeviceError> {
        let output = self
            .gateway
            .invoke(&self.park_command, &[antenna.to_string()])
            .await?;
        let stdout = output.stdout_text();
        if !stdout.trim().is_empty() {
            tracing::info!(antenna = %antenna, "{}", stdout.trim_end());
        }
        Ok(())
    }

    /// Set several independent attenuator groups concurrently.
    ///
    /// Every request is validated before anything is sent. Waits for all
    /// groups, then fails with the first error in submission order.
    pub async fn set_attenuation_batch(
        &self,
        requests: Vec<AttenuationRequest>,
    ) -> Result<Vec<(String, String)>, DeviceError> {
        for request in &requests {
            validate_attenuation(&request.antpols, &request.dbs)?;
        }

        let mut batch = FanOutBatch::new();
        for request in requests {
            let this = self.clone();
            batch.push(request.antpols.join(","), async move {
                anyhow::Ok(this.set_attenuation(&request.antpols, &request.dbs).await?)
            });
        }
        Ok(self.executor.fail_fast(batch).await?)
    }

    /// Set several independent RF switch groups concurrently.
    pub async fn set_rf_switch_batch(&self, groups: Vec<Vec<AntennaId>>) -> Result<(), DeviceError> {
        for group in &groups {
            non_empty(group)?;
        }

        let mut batch = FanOutBatch::new();
        for group in groups {
            let this = self.clone();
            batch.push(AntennaId::join(&group), async move {
                this.set_rf_switch(&group).await?;
                anyhow::Ok(())
            });
        }
        self.executor.fail_fast(batch).await?;
        Ok(())
    }
}

fn non_empty<T>(targets: &[T]) -> Result<(), DeviceError> {
    if targets.is_empty() {
        Err(DeviceError::EmptyTargets)
    } else {
        Ok(())
    }
}

fn validate_attenuation(antpols: &[String], dbs: &[f64]) -> Result<(), DeviceError> {
    non_empty(antpols)?;
    if antpols.len() != dbs.len() {
        return Err(DeviceError::LengthMismatch {
            targets: antpols.len(),
            values: dbs.len(),
        });
    }
    for (antpol, &db) in antpols.iter().zip(dbs) {
        if !(ATTENUATION_MIN_DB..=ATTENUATION_MAX_DB).contains(&db) {
            return Err(DeviceError::AttenuationOutOfRange {
                target: antpol.clone(),
                value: db,
                min: ATTENUATION_MIN_DB,
                max: ATTENUATION_MAX_DB,
            });
        }
    }
    Ok(())
}
