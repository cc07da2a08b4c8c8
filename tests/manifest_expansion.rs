//! Manifest loading tests.
//!
//! Writes a manifest to a tempdir, loads it through the public API and checks
//! the sidecars it expands to. Each test uses its own tempdir.

use std::fs;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use sidecar_harness::config::{DEFAULT_HOME_ROOT, SidecarManifest};
use sidecar_harness::error::ConfigError;
use sidecar_harness::sidecar::{SidecarProcesses, SidecarScope};
use sidecar_harness::testing::stub_deps;

const MANIFEST: &str = r#"
chain_id = "osmosis-1"
test_name = "TestPriceFeeder/ibc_v8"
validators = 2
network = "interchain-net"

[[sidecars]]
process_name = "price-feeder"
image = { repository = "ghcr.io/strangelove-ventures/price-feeder", version = "v0.3.0", uid_gid = "1025:1025" }
ports = ["7171", "9091/udp"]
start_cmd = ["price-feeder", "start", "--home", "/var/sidecar-processes/price-feeder"]
pre_start = true
validator_process = true

[sidecars.env]
PRICE_FEEDER_LOG = "info"

[[sidecars]]
process_name = "relayer-metrics"
image = { repository = "acme/metrics", version = "1.2" }
home_dir = "/data/metrics"
"#;

#[test]
fn manifest_expands_to_named_sidecars() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sidecars.toml");
    fs::write(&path, MANIFEST).unwrap();

    let manifest = SidecarManifest::load(&path).unwrap();
    let (deps, ..) = stub_deps();
    let processes = SidecarProcesses::from_configs(
        &manifest.owner(),
        &manifest.sidecars,
        manifest.validators,
        manifest.network_id(),
        DEFAULT_HOME_ROOT,
        &deps,
    )
    .unwrap();

    let names: Vec<&str> = processes.iter().map(|p| p.name()).collect();
    assert_eq!(
        names,
        vec![
            "osmosis-1-price-feeder-val-0-testpricefeeder-ibc-v8",
            "osmosis-1-price-feeder-val-1-testpricefeeder-ibc-v8",
            "osmosis-1-relayer-metrics-0-testpricefeeder-ibc-v8",
        ]
    );

    let feeder = processes.find("osmosis-1-price-feeder-val-1-testpricefeeder-ibc-v8").unwrap();
    assert_eq!(feeder.scope(), SidecarScope::Validator { index: 1 });
    assert_eq!(feeder.network_id(), "interchain-net");
    assert_eq!(feeder.home_dir(), "/var/sidecar-processes/price-feeder");
    assert_eq!(feeder.ports().collect::<Vec<_>>(), vec!["7171/tcp", "9091/udp"]);
    assert_eq!(feeder.image().owner_ids(), Some((1025, 1025)));

    let metrics = processes.find("relayer-metrics").unwrap();
    assert!(!metrics.pre_start());
    assert_eq!(
        metrics.bind(),
        vec!["osmosis-1-relayer-metrics-0-testpricefeeder-ibc-v8:/data/metrics".to_string()]
    );
}

#[test]
fn manifest_without_sidecars_is_empty() {
    let manifest =
        SidecarManifest::from_toml_str("chain_id = \"gaia-1\"\ntest_name = \"TestNoSidecars\"")
            .unwrap();
    let (deps, ..) = stub_deps();

    let processes = SidecarProcesses::from_configs(
        &manifest.owner(),
        &manifest.sidecars,
        manifest.validators,
        manifest.network_id(),
        DEFAULT_HOME_ROOT,
        &deps,
    )
    .unwrap();
    assert!(processes.is_empty());
}

#[test]
fn invalid_process_name_is_rejected_at_construction() {
    let raw = r#"
chain_id = "gaia-1"
test_name = "TestBadName"

[[sidecars]]
process_name = "price feeder"
image = { repository = "acme/feed" }
"#;
    let manifest = SidecarManifest::from_toml_str(raw).unwrap();
    let (deps, ..) = stub_deps();

    let err = SidecarProcesses::from_configs(
        &manifest.owner(),
        &manifest.sidecars,
        0,
        "",
        DEFAULT_HOME_ROOT,
        &deps,
    )
    .unwrap_err();
    assert!(err.to_string().contains("price feeder"), "got: {err}");
}

#[test]
fn mistyped_fields_fail_to_parse() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "chain_id = \"gaia-1\"\n[[sidecars]]\nprocess_name = 3\n").unwrap();

    let err = SidecarManifest::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("broken.toml"));
}
