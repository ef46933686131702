//! Scratch workspaces and test doubles shared by the CLI tests.

use camino::{Utf8Path, Utf8PathBuf};
use planetkeeper_data::replication::SequenceLookup;
use planetkeeper_data::test_support::StubLookup;
use tempfile::TempDir;

use crate::CliError;
use crate::update::LookupBuilder;

pub(super) const STATE: &str =
    "#Sat Jan 01 00:00:00 UTC 2022\nsequenceNumber=4800000\ntimestamp=2022-01-01T00\\:00\\:00Z\n";

pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn snapshot(&self) -> Utf8PathBuf {
        self.root.join("planet.osm.pbf")
    }

    pub(super) fn write_snapshot(&self) -> Utf8PathBuf {
        let path = self.snapshot();
        write_utf8(&path, b"pbf");
        path
    }
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent directory");
    }
    std::fs::write(path, contents).expect("write file");
}

/// Hands out [`StubLookup`]s answering with [`STATE`].
pub(super) struct StubLookupBuilder;

impl LookupBuilder for StubLookupBuilder {
    fn build(&self, _base_url: &str) -> Result<Box<dyn SequenceLookup>, CliError> {
        Ok(Box::new(StubLookup::returning(STATE)))
    }
}
