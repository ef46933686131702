//! Behavioural tests for snapshot acquisition.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use planetkeeper_core::{Invocation, PreconditionError, RecordingRunner, Snapshot, ToolPaths};
use planetkeeper_data::acquire::{
    AcquisitionError, AcquisitionReport, AcquisitionStrategy, Acquirer, DEFAULT_PLANET_URL,
    ObjectQuery,
};
use planetkeeper_data::test_support::MemoryObjectStore;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

/// Scenario state shared across steps.
struct AcquireWorld {
    _dir: TempDir,
    target: Snapshot,
    store: RefCell<MemoryObjectStore>,
    invocations: RefCell<Vec<Invocation>>,
    result: RefCell<Option<Result<AcquisitionReport, AcquisitionError>>>,
}

impl AcquireWorld {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        Self {
            _dir: dir,
            target: Snapshot::new(root.join("planet.osm.pbf")),
            store: RefCell::new(MemoryObjectStore::new()),
            invocations: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn acquire(&self, strategy: &AcquisitionStrategy) {
        let runner = RecordingRunner::new();
        let tools = ToolPaths::default();
        let outcome = {
            let store = self.store.borrow();
            Acquirer::new(&runner, &tools)
                .with_object_store(&*store)
                .acquire(strategy, &self.target)
        };
        *self.invocations.borrow_mut() = runner.into_invocations();
        *self.result.borrow_mut() = Some(outcome);
    }

    fn report(&self) -> AcquisitionReport {
        let borrowed = self.result.borrow();
        match borrowed.as_ref().expect("acquisition attempted") {
            Ok(report) => report.clone(),
            Err(err) => panic!("acquisition failed: {err}"),
        }
    }
}

#[fixture]
fn world() -> AcquireWorld {
    AcquireWorld::new()
}

#[given("no snapshot exists at the target path")]
fn target_absent(#[from(world)] world: &AcquireWorld) {
    assert!(!world.target.path().exists());
}

#[given("a snapshot already exists at the target path")]
fn target_present(#[from(world)] world: &AcquireWorld) {
    fs::write(world.target.path(), b"older snapshot").expect("write snapshot");
}

#[given("a bucket holding snapshots from January and February 2022")]
fn bucket_with_snapshots(#[from(world)] world: &AcquireWorld) {
    world.store.replace(
        MemoryObjectStore::new()
            .with_object("osm-pds", "planet-220101.osm.pbf", b"january".to_vec())
            .with_object("osm-pds", "planet-220201.osm.pbf", b"february".to_vec()),
    );
}

#[when("I acquire the snapshot from the default URL")]
fn acquire_from_url(#[from(world)] world: &AcquireWorld) {
    world.acquire(&AcquisitionStrategy::default());
}

#[when("I acquire the snapshot from the bucket")]
fn acquire_from_bucket(#[from(world)] world: &AcquireWorld) {
    world.acquire(&AcquisitionStrategy::ObjectStore(ObjectQuery::default()));
}

#[then("curl downloads the default URL to the target path")]
fn curl_downloads(#[from(world)] world: &AcquireWorld) {
    let report = world.report();
    assert_eq!(report.origin, DEFAULT_PLANET_URL);
    let invocations = world.invocations.borrow();
    let argv: Vec<Vec<&str>> = invocations.iter().map(Invocation::argv).collect();
    assert_eq!(
        argv,
        [vec![
            "curl",
            "-L",
            "-o",
            world.target.path().as_str(),
            DEFAULT_PLANET_URL,
        ]]
    );
}

#[then("the February snapshot is written to the target path")]
fn february_written(#[from(world)] world: &AcquireWorld) {
    let report = world.report();
    assert_eq!(report.origin, "osm-pds/planet-220201.osm.pbf");
    assert_eq!(report.target, world.target.path());
    assert_eq!(
        fs::read(world.target.path()).expect("snapshot written"),
        b"february"
    );
}

#[then("acquisition fails because the target exists")]
fn fails_on_existing_target(#[from(world)] world: &AcquireWorld) {
    let borrowed = world.result.borrow();
    match borrowed.as_ref().expect("acquisition attempted") {
        Err(AcquisitionError::Precondition(PreconditionError::AlreadyExists { path })) => {
            assert_eq!(path, world.target.path());
        }
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
}

#[then("nothing was transferred")]
fn nothing_transferred(#[from(world)] world: &AcquireWorld) {
    assert!(world.invocations.borrow().is_empty());
    assert!(world.store.borrow().downloads().is_empty());
    assert_eq!(
        fs::read(world.target.path()).expect("snapshot intact"),
        b"older snapshot"
    );
}

#[test]
fn scenario_indices_follow_feature_order() {
    let feature =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/features/acquire_snapshot.feature");
    let contents = fs::read_to_string(&feature).unwrap_or_else(|err| {
        panic!("failed to read feature file {feature:?}: {err}");
    });
    let titles: Vec<&str> = contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Scenario: "))
        .collect();
    assert_eq!(
        titles,
        [
            "downloading from a URL",
            "picking the newest object in a bucket",
            "refusing to overwrite an existing snapshot",
        ]
    );
}

#[scenario(path = "tests/features/acquire_snapshot.feature", index = 0)]
fn downloading_from_url(#[from(world)] world: AcquireWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/acquire_snapshot.feature", index = 1)]
fn picking_newest_object(#[from(world)] world: AcquireWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/acquire_snapshot.feature", index = 2)]
fn refusing_to_overwrite(#[from(world)] world: AcquireWorld) {
    let _ = world;
}
