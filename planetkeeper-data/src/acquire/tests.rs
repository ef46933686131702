//! Unit tests for the acquisition strategies.

use planetkeeper_core::{Invocation, PreconditionError, RecordingRunner, Snapshot, ToolPaths};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::test_support::MemoryObjectStore;

struct Target {
    _dir: TempDir,
    root: Utf8PathBuf,
    snapshot: Snapshot,
}

#[fixture]
fn target() -> Target {
    let dir = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
    let snapshot = Snapshot::new(root.join("planet.osm.pbf"));
    Target {
        _dir: dir,
        root,
        snapshot,
    }
}

fn planets() -> MemoryObjectStore {
    MemoryObjectStore::new()
        .with_object("osm-pds", "planet-220101.osm.pbf", b"january".to_vec())
        .with_object("osm-pds", "planet-220201.osm.pbf", b"february".to_vec())
        .with_object("osm-pds", "planet-220201.osm.pbf.md5", b"checksum".to_vec())
}

#[rstest]
fn direct_fetch_runs_curl(target: Target) {
    let runner = RecordingRunner::new();
    let tools = ToolPaths::default();
    let report = Acquirer::new(&runner, &tools)
        .acquire(&AcquisitionStrategy::default(), &target.snapshot)
        .expect("download recorded");
    assert_eq!(report.origin, DEFAULT_PLANET_URL);

    let invocations = runner.into_invocations();
    let path = target.snapshot.path().to_string();
    assert_eq!(
        invocations.first().map(Invocation::argv),
        Some(vec!["curl", "-L", "-o", path.as_str(), DEFAULT_PLANET_URL])
    );
}

#[rstest]
fn direct_fetch_surfaces_transfer_failure(target: Target) {
    let runner = RecordingRunner::new().fail_on("curl");
    let tools = ToolPaths::default();
    let err = Acquirer::new(&runner, &tools)
        .acquire(
            &AcquisitionStrategy::Direct {
                url: "https://example.org/planet.osm.pbf".to_owned(),
            },
            &target.snapshot,
        )
        .expect_err("curl fails");
    assert!(matches!(err, AcquisitionError::Transfer { url, .. } if url == "https://example.org/planet.osm.pbf"));
}

#[rstest]
#[case::direct(AcquisitionStrategy::default())]
#[case::object_store(AcquisitionStrategy::ObjectStore(ObjectQuery::default()))]
fn existing_target_is_never_overwritten(target: Target, #[case] strategy: AcquisitionStrategy) {
    std::fs::write(target.snapshot.path(), b"existing").expect("occupy target");
    let runner = RecordingRunner::new();
    let tools = ToolPaths::default();
    let store = planets();
    let err = Acquirer::new(&runner, &tools)
        .with_object_store(&store)
        .acquire(&strategy, &target.snapshot)
        .expect_err("target exists");

    assert!(matches!(
        err,
        AcquisitionError::Precondition(PreconditionError::AlreadyExists { .. })
    ));
    assert!(runner.invocations().is_empty());
    assert!(store.downloads().is_empty());
    assert_eq!(
        std::fs::read(target.snapshot.path()).expect("target intact"),
        b"existing"
    );
}

#[rstest]
fn object_store_downloads_latest_match(target: Target) {
    let runner = RecordingRunner::new();
    let tools = ToolPaths::default();
    let store = planets();
    let report = Acquirer::new(&runner, &tools)
        .with_object_store(&store)
        .acquire(
            &AcquisitionStrategy::ObjectStore(ObjectQuery::default()),
            &target.snapshot,
        )
        .expect("download");

    assert_eq!(report.origin, "osm-pds/planet-220201.osm.pbf");
    assert_eq!(store.downloads(), ["osm-pds/planet-220201.osm.pbf"]);
    assert_eq!(
        std::fs::read(target.snapshot.path()).expect("downloaded"),
        b"february"
    );
    assert!(runner.invocations().is_empty());
}

#[rstest]
fn object_store_without_match_reports_it(target: Target) {
    let runner = RecordingRunner::new();
    let tools = ToolPaths::default();
    let store = planets();
    let query = ObjectQuery {
        prefix: "planet/".to_owned(),
        ..ObjectQuery::default()
    };
    let err = Acquirer::new(&runner, &tools)
        .with_object_store(&store)
        .acquire(&AcquisitionStrategy::ObjectStore(query), &target.snapshot)
        .expect_err("nothing under prefix");
    assert!(matches!(err, AcquisitionError::NoMatchingObject { .. }));
    assert!(!target.snapshot.path().exists());
}

#[rstest]
fn object_store_requires_a_client(target: Target) {
    let runner = RecordingRunner::new();
    let tools = ToolPaths::default();
    let err = Acquirer::new(&runner, &tools)
        .acquire(
            &AcquisitionStrategy::ObjectStore(ObjectQuery::default()),
            &target.snapshot,
        )
        .expect_err("no client");
    assert!(matches!(err, AcquisitionError::MissingCredentials { bucket } if bucket == "osm-pds"));
}

#[rstest]
fn local_mirror_serves_bucket_subdirectories(target: Target) {
    let mirror = target.root.join("mirror");
    let bucket = mirror.join("osm-pds/planet");
    std::fs::create_dir_all(&bucket).expect("bucket dir");
    std::fs::write(bucket.join("planet-220101.osm.pbf"), b"january").expect("object");
    std::fs::write(bucket.join("planet-220201.osm.pbf"), b"february").expect("object");

    let runner = RecordingRunner::new();
    let tools = ToolPaths::default();
    let store = LocalMirrorStore::new(mirror);
    let report = Acquirer::new(&runner, &tools)
        .with_object_store(&store)
        .acquire(
            &AcquisitionStrategy::ObjectStore(ObjectQuery {
                prefix: "planet/".to_owned(),
                ..ObjectQuery::default()
            }),
            &target.snapshot,
        )
        .expect("mirror download");
    assert_eq!(report.origin, "osm-pds/planet/planet-220201.osm.pbf");
    assert_eq!(
        std::fs::read(target.snapshot.path()).expect("copied"),
        b"february"
    );
}
