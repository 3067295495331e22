// ABOUTME: Integration tests verifying modules work together.
// ABOUTME: Full observation flows against the simulated array, no external daemons.

use std::sync::Arc;

use ata_control::prelude::*;

fn ants(list: &[&str]) -> Vec<AntennaId> {
    list.iter().map(|s| AntennaId::new(*s)).collect()
}

fn array_config() -> AtaConfig {
    AtaConfig::from_toml_str(
        r#"
        [coordinator]
        park_command = "park.csh"

        [fanout]
        max_batch_size = 8

        [array]
        antennas = ["1a", "1c", "2h", "4j", "5e"]
        "#,
    )
    .unwrap()
}

#[tokio::test]
async fn test_observation_flow() {
    let config = array_config();
    let sim = Arc::new(SimulatedArray::idle(
        &config.membership,
        config.array.antennas.clone(),
    ));
    sim.respond_with("atagetpams", |_| {
        CommandOutput::ok("ant1a on 10.0 on 10.5\nant1c on 9.5 on 11.0\n")
    })
    .await;

    let executor = FanOutExecutor::new(&config.fanout);
    let coordinator =
        AntennaCoordinator::new(sim.clone(), &config).with_executor(executor.clone());
    let devices = DeviceController::new(sim.clone(), &config).with_executor(executor.clone());

    let observing = ants(&["1a", "1c"]);
    coordinator.reserve(&observing).await.unwrap();
    assert_eq!(sim.members(&Group::bfa()).await, observing);

    devices.set_rf_switch(&observing).await.unwrap();
    devices.set_lna(&observing, LnaState::On).await.unwrap();
    let pams = devices.get_pams(&observing).await.unwrap();
    assert_eq!(pams.len(), 4);

    devices
        .set_attenuation_batch(vec![
            AttenuationRequest::new(["1ax", "1ay"], vec![pams["1ax"], pams["1ay"]]),
            AttenuationRequest::new(["1cx", "1cy"], vec![pams["1cx"], pams["1cy"]]),
        ])
        .await
        .unwrap();

    let report = coordinator.release(&observing, true).await.unwrap();
    assert_eq!(report.parked, observing);
    assert!(report.park_failures.is_empty());

    assert_eq!(sim.members(&Group::none()).await.len(), 5);
    assert!(sim.members(&Group::bfa()).await.is_empty());
    assert_eq!(sim.calls_to("atten").await.len(), 2);
    assert_eq!(sim.calls_to("park.csh").await.len(), 2);
    // Two batches of two tasks each: attenuators and parking.
    assert_eq!(executor.spawned_workers(), 4);
}

#[tokio::test]
async fn test_conflicting_sessions_do_not_steal_antennas() {
    let config = array_config();
    let sim = Arc::new(SimulatedArray::idle(
        &config.membership,
        config.array.antennas.clone(),
    ));
    let coordinator = AntennaCoordinator::new(sim.clone(), &config);

    coordinator.reserve(&ants(&["1a", "2h"])).await.unwrap();

    let err = coordinator
        .reserve(&ants(&["2h", "4j"]))
        .await
        .unwrap_err();
    let conflict = err.conflict().unwrap();
    assert_eq!(conflict.antennas, ants(&["2h"]));
    assert_eq!(conflict.stage, ConflictStage::PreFlight);

    // "4j" was never touched by the refused request.
    assert_eq!(sim.groups_of(&AntennaId::new("4j")).await, vec![Group::none()]);
    assert_eq!(sim.members(&Group::bfa()).await, ants(&["1a", "2h"]));
}

#[tokio::test]
async fn test_with_reservation_around_failing_device_work() {
    let config = array_config();
    let sim = Arc::new(SimulatedArray::idle(
        &config.membership,
        config.array.antennas.clone(),
    ));
    sim.inject("rfswitch", 0, Fault::Reject("rfswitch: switch offline\n".to_string()))
        .await;
    let coordinator = AntennaCoordinator::new(sim.clone(), &config);
    let devices = DeviceController::new(sim.clone(), &config);

    let observing = ants(&["5e"]);
    let result: Result<(), AtaError> = coordinator
        .with_reservation(&observing, false, || async {
            devices.set_rf_switch(&observing).await?;
            Ok::<(), AtaError>(())
        })
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, AtaError::Device(DeviceError::Transport(_))));
    assert!(err.to_string().contains("switch offline"));
    assert_eq!(sim.groups_of(&AntennaId::new("5e")).await, vec![Group::none()]);
}

#[tokio::test]
async fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ata.toml");
    std::fs::write(
        &path,
        r#"
        [gateway]
        default_host = "obs@tumulus"

        [gateway.hosts]
        rfswitch = "sonata@rfswitch"
        atten = "sonata@rfswitch"

        [coordinator]
        compensation = "verified"
        "#,
    )
    .unwrap();

    let config = AtaConfig::from_file(&path).unwrap();
    assert_eq!(config.gateway.route("atten"), Some("sonata@rfswitch"));
    assert_eq!(config.gateway.route("park.csh"), Some("obs@tumulus"));
    assert_eq!(config.coordinator.compensation, CompensationPolicy::Verified);
    assert_eq!(config.membership.reserved_group, Group::bfa());
}
