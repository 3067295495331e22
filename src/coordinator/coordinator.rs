// ABOUTME: Antenna resource coordinator - exclusive group-based reservation.
// ABOUTME: Moves antennas with a verify-move-verify protocol and compensation.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::config::{AtaConfig, CompensationPolicy};
use crate::devices::DeviceController;
use crate::error::{ConflictStage, ReservationConflict, ReservationError, TaskError};
use crate::fanout::{FanOutBatch, FanOutExecutor};
use crate::gateway::Gateway;
use crate::membership::{AntennaId, Group, GroupRegistry};

/// Outcome of a successful release.
#[derive(Debug, Default)]
pub struct ReleaseReport {
    /// Antennas moved back to the idle group.
    pub released: Vec<AntennaId>,
    /// Antennas whose park command succeeded.
    pub parked: Vec<AntennaId>,
    /// Park commands that failed. Logged, never retried.
    pub park_failures: Vec<TaskError>,
}

/// Coordinates exclusive access to antennas through group membership.
///
/// The membership service has no multi-antenna transaction, so every move
/// is a saga: check the source group, issue one move for the whole set,
/// check the destination group, and on a mismatch issue one compensating
/// move back.
///
/// # Concurrency
///
/// The coordinator holds no locks and never waits. Callers must not race
/// the same antenna from two concurrent reservations; that is an operating
/// rule of the array, not something enforced here.
///
/// # Compensation
///
/// With [`CompensationPolicy::BestEffort`] the compensating move is not
/// checked. If it fails, the registry may be left with antennas in the
/// destination group and the coordinator cannot tell.
pub struct AntennaCoordinator {
    registry: GroupRegistry,
    devices: DeviceController,
    executor: FanOutExecutor,
    idle_group: Group,
    reserved_group: Group,
    compensation: CompensationPolicy,
}

impl AntennaCoordinator {
    pub fn new(gateway: Arc<dyn Gateway>, config: &AtaConfig) -> Self {
        Self {
            registry: GroupRegistry::new(gateway.clone(), &config.membership),
            devices: DeviceController::new(gateway, config),
            executor: FanOutExecutor::new(&config.fanout),
            idle_group: config.membership.idle_group.clone(),
            reserved_group: config.membership.reserved_group.clone(),
            compensation: config.coordinator.compensation,
        }
    }

    /// Use `executor` for park commands instead of a private one.
    pub fn with_executor(mut self, executor: FanOutExecutor) -> Self {
        self.devices = self.devices.with_executor(executor.clone());
        self.executor = executor;
        self
    }

    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    /// Move `antennas` from the idle group into the reserved group.
    pub async fn reserve(&self, antennas: &[AntennaId]) -> Result<(), ReservationError> {
        self.move_antennas(antennas, &self.idle_group, &self.reserved_group)
            .await
    }

    /// Move `antennas` back to the idle group, then optionally park them.
    ///
    /// Parking happens only after the move succeeded: one command per
    /// antenna, run concurrently. Park failures are logged and reported but
    /// do not fail the release.
    pub async fn release(
        &self,
        antennas: &[AntennaId],
        park: bool,
    ) -> Result<ReleaseReport, ReservationError> {
        self.move_antennas(antennas, &self.reserved_group, &self.idle_group)
            .await?;

        let released = unique(antennas);
        let mut report = ReleaseReport {
            released: released.clone(),
            ..ReleaseReport::default()
        };
        if park {
            self.park(released, &mut report).await;
        }
        Ok(report)
    }

    /// Reserve `antennas`, run `body`, and release them whatever `body`
    /// returned.
    ///
    /// A release failure is returned only when `body` succeeded; otherwise
    /// it is logged and the body's error wins.
    pub async fn with_reservation<F, Fut, T, E>(
        &self,
        antennas: &[AntennaId],
        park: bool,
        body: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ReservationError> + std::fmt::Display,
    {
        self.reserve(antennas).await?;

        let result = body().await;
        let released = self.release(antennas, park).await;

        match (result, released) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(release_err)) => Err(release_err.into()),
            (Err(body_err), Ok(_)) => Err(body_err),
            (Err(body_err), Err(release_err)) => {
                tracing::error!(
                    error = %release_err,
                    cause = %body_err,
                    "release after failed reservation body also failed"
                );
                Err(body_err)
            }
        }
    }

    /// Move `antennas` between two groups.
    ///
    /// Succeeds only if every antenna was in `from` before the move and is
    /// in `to` after it. Fails with [`ReservationError::Conflict`] naming the
    /// offending antennas otherwise. Transport errors are never retried.
    pub async fn move_antennas(
        &self,
        antennas: &[AntennaId],
        from: &Group,
        to: &Group,
    ) -> Result<(), ReservationError> {
        let requested = unique(antennas);
        if requested.is_empty() {
            return Err(ReservationError::EmptyRequest);
        }

        let span = tracing::info_span!(
            "antenna_move",
            call_id = %Uuid::new_v4(),
            from = %from,
            to = %to,
            antennas = %AntennaId::join(&requested),
        );
        self.run_move(&requested, from, to).instrument(span).await
    }

    async fn run_move(
        &self,
        requested: &[AntennaId],
        from: &Group,
        to: &Group,
    ) -> Result<(), ReservationError> {
        let source = self.registry.list(from).await?;
        let missing = missing_from(requested, &source);
        if !missing.is_empty() {
            let conflict = ReservationConflict {
                antennas: missing,
                expected_group: from.clone(),
                stage: ConflictStage::PreFlight,
            };
            tracing::warn!(%conflict, "refusing to move antennas");
            return Err(ReservationError::Conflict(conflict));
        }

        tracing::info!("moving antennas");
        self.registry.move_antennas(from, to, requested).await?;

        let destination = self.registry.list(to).await?;
        let missing = missing_from(requested, &destination);
        if missing.is_empty() {
            tracing::info!("antennas moved");
            return Ok(());
        }

        let conflict = ReservationConflict {
            antennas: missing,
            expected_group: to.clone(),
            stage: ConflictStage::PostMove,
        };
        tracing::warn!(%conflict, "move did not take effect, compensating");
        self.compensate(requested, from, to, conflict).await
    }

    /// Issue one move of the full set back to `from`, then fail with
    /// `conflict`.
    async fn compensate(
        &self,
        requested: &[AntennaId],
        from: &Group,
        to: &Group,
        conflict: ReservationConflict,
    ) -> Result<(), ReservationError> {
        if let Err(e) = self.registry.move_antennas(to, from, requested).await {
            tracing::error!(error = %e, "compensating move failed; registry may be inconsistent");
        }

        if self.compensation == CompensationPolicy::BestEffort {
            return Err(ReservationError::Conflict(conflict));
        }

        let stranded = match self.registry.list(from).await {
            Ok(source) => missing_from(requested, &source),
            Err(e) => {
                tracing::error!(error = %e, "could not verify compensating move");
                requested.to_vec()
            }
        };
        if stranded.is_empty() {
            return Err(ReservationError::Conflict(conflict));
        }

        tracing::error!(
            stranded = %AntennaId::join(&stranded),
            "antennas did not return to their source group"
        );
        Err(ReservationError::CompensationUnverified { conflict, stranded })
    }

    async fn park(&self, antennas: Vec<AntennaId>, report: &mut ReleaseReport) {
        tracing::info!(antennas = %AntennaId::join(&antennas), "parking antennas");

        let batch = FanOutBatch::for_targets(antennas.clone(), |ant| {
            let devices = self.devices.clone();
            async move {
                devices.park(&ant).await?;
                anyhow::Ok(ant)
            }
        });

        match self.executor.collect_all(batch).await {
            Ok(outcomes) => {
                for outcome in outcomes {
                    match outcome.result {
                        Ok(ant) => report.parked.push(ant),
                        Err(e) => {
                            tracing::warn!(error = %e, "park failed");
                            report.park_failures.push(e);
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "park batch rejected");
                let reason = e.to_string();
                report.park_failures.extend(antennas.into_iter().map(|ant| TaskError {
                    target: ant.to_string(),
                    source: anyhow::anyhow!("{}", reason),
                }));
            }
        }
    }
}

/// `antennas` without repeats, first occurrence kept.
fn unique(antennas: &[AntennaId]) -> Vec<AntennaId> {
    let mut seen = HashSet::new();
    antennas
        .iter()
        .filter(|a| seen.insert(*a))
        .cloned()
        .collect()
}

/// Requested antennas absent from `members`, in request order.
fn missing_from(requested: &[AntennaId], members: &[AntennaId]) -> Vec<AntennaId> {
    let members: HashSet<&AntennaId> = members.iter().collect();
    requested
        .iter()
        .filter(|a| !members.contains(a))
        .cloned()
        .collect()
}
