//! Shared filesystem helpers built on `cap-std` and `camino`.
//!
//! Snapshot files, workdir artefacts and extraction outputs are all addressed
//! by caller-supplied paths, so every helper here resolves an ambient
//! directory for the parent and then operates relative to it.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs::OpenOptions, fs_utf8};
use std::io::{self, Write};
use std::path::Component;

/// What currently occupies a filesystem path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Nothing exists at the path.
    Missing,
    /// A regular file.
    File,
    /// A directory.
    Directory,
    /// Something else (socket, device, dangling link target, ...).
    Other,
}

impl PathKind {
    /// Whether anything at all exists at the path.
    #[must_use]
    pub const fn exists(self) -> bool {
        !matches!(self, Self::Missing)
    }
}

fn open_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Resolve an ambient directory for the given path and return the directory with the file name.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Classify whatever exists at `path`.
///
/// A missing parent directory, or a parent that is a regular file, is
/// reported as [`PathKind::Missing`] rather than an error.
///
/// Paths without a final file name, such as `.`, `..` or `/`, can only
/// name directories and are classified by opening them directly.
pub fn path_kind(path: &Utf8Path) -> io::Result<PathKind> {
    if path.file_name().is_none() {
        return match fs_utf8::Dir::open_ambient_dir(path, ambient_authority()) {
            Ok(_) => Ok(PathKind::Directory),
            Err(err) if is_absent(&err) => Ok(PathKind::Missing),
            Err(err) => Err(err),
        };
    }
    let (dir, name) = match open_dir_and_file(path) {
        Ok(found) => found,
        Err(err) if is_absent(&err) => return Ok(PathKind::Missing),
        Err(err) => return Err(err),
    };
    match dir.metadata(name.as_str()) {
        Ok(meta) if meta.is_file() => Ok(PathKind::File),
        Ok(meta) if meta.is_dir() => Ok(PathKind::Directory),
        Ok(_) => Ok(PathKind::Other),
        Err(err) if is_absent(&err) => Ok(PathKind::Missing),
        Err(err) => Err(err),
    }
}

// A path below a regular file cannot exist.
fn is_absent(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// Ensure the parent directory for `path` exists, handling absolute paths safely for cap-std.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    create_dir_all(parent)
}

/// Create `path` and any missing ancestors.
///
/// Directories that already exist (including ones created concurrently by
/// another process) are not an error.
pub fn create_dir_all(path: &Utf8Path) -> io::Result<()> {
    if path.as_str().is_empty() || path == Utf8Path::new("/") {
        return Ok(());
    }

    let (base_dir, relative) = base_dir_and_relative(path)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

/// Write `contents` to a file that must not already exist.
///
/// Fails with [`io::ErrorKind::AlreadyExists`] when `path` is occupied.
pub fn write_new_file(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let (dir, name) = open_dir_and_file(path)?;
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    let mut file = dir.open_with(name.as_str(), &options)?;
    file.write_all(contents)?;
    file.flush()
}

/// Write `contents` to `path`, replacing any existing file.
pub fn write_file(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.write(name.as_str(), contents)
}

/// Copy `source` into a new file at `target`, returning the bytes copied.
///
/// Fails with [`io::ErrorKind::AlreadyExists`] when `target` is occupied.
pub fn copy_to_new_file(source: &Utf8Path, target: &Utf8Path) -> io::Result<u64> {
    let mut reader = open_utf8_file(source)?;
    let (dir, name) = open_dir_and_file(target)?;
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    let mut writer = dir.open_with(name.as_str(), &options)?;
    let copied = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    Ok(copied)
}

/// List every regular file below `root` as `/`-separated relative paths.
///
/// A missing `root` yields an empty list.
pub fn list_files(root: &Utf8Path) -> io::Result<Vec<String>> {
    let dir = match fs_utf8::Dir::open_ambient_dir(root, ambient_authority()) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };
    let mut files = Vec::new();
    collect_files(&dir, "", &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(dir: &fs_utf8::Dir, prefix: &str, files: &mut Vec<String>) -> io::Result<()> {
    for item in dir.entries()? {
        let entry = item?;
        let name = entry.file_name()?;
        let relative = format!("{prefix}{name}");
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            let child = entry.open_dir()?;
            collect_files(&child, &format!("{relative}/"), files)?;
        } else if file_type.is_file() {
            files.push(relative);
        }
    }
    Ok(())
}

/// Delete the file at `path`, returning whether anything was removed.
pub fn remove_file_if_exists(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = match open_dir_and_file(path) {
        Ok(found) => found,
        Err(err) if is_absent(&err) => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.remove_file(name.as_str()) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Read a UTF-8 text file in full.
pub fn read_to_string(path: &Utf8Path) -> io::Result<String> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.read_to_string(name.as_str())
}

/// Split an absolute or relative parent path into an ambient base directory and a relative suffix.
pub fn base_dir_and_relative(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_parent = parent.as_std_path();

    let (base, relative) = match std_parent.components().next() {
        // Windows absolute path with a drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;

            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_parent.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from parent path"))?
                .to_path_buf();
            (base, relative)
        }
        // Unix-style absolute path.
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        // Relative path: resolve from the current directory.
        _ => (Utf8PathBuf::from("."), std_parent.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative = Utf8PathBuf::from_path_buf(relative)
        .map_err(|_| io::Error::other("non-UTF-8 parent path"))?;

    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn scratch() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        (dir, root)
    }

    #[rstest]
    fn classifies_paths(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let file = root.join("planet.osm.pbf");
        std::fs::write(&file, b"pbf").expect("write file");

        assert_eq!(path_kind(&file).expect("file kind"), PathKind::File);
        assert_eq!(path_kind(&root).expect("dir kind"), PathKind::Directory);
        assert_eq!(
            path_kind(&root.join("absent")).expect("missing kind"),
            PathKind::Missing
        );
        assert_eq!(
            path_kind(&root.join("absent/nested")).expect("missing parent kind"),
            PathKind::Missing
        );
    }

    #[rstest]
    #[case::current(".")]
    #[case::root("/")]
    fn classifies_paths_without_file_name(#[case] path: &str) {
        assert_eq!(
            path_kind(Utf8Path::new(path)).expect("directory kind"),
            PathKind::Directory
        );
    }

    #[rstest]
    fn classifies_parent_references(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        create_dir_all(&root.join("nested")).expect("nested dir");
        assert_eq!(
            path_kind(&root.join("nested/..")).expect("parent kind"),
            PathKind::Directory
        );
        assert_eq!(
            path_kind(&root.join("absent/..")).expect("missing parent kind"),
            PathKind::Missing
        );
    }

    #[rstest]
    fn remove_file_if_exists_reports_removal(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let target = root.join("changeset.osm.gz");
        std::fs::write(&target, b"diff").expect("write file");
        assert!(remove_file_if_exists(&target).expect("first removal"));
        assert!(!target.exists());
        assert!(!remove_file_if_exists(&target).expect("second removal"));
        assert!(!remove_file_if_exists(&root.join("absent/changeset.osm.gz")).expect("missing dir"));
    }

    #[rstest]
    fn write_new_file_refuses_existing(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let target = root.join("state.txt");
        write_new_file(&target, b"sequenceNumber=1\n").expect("first write");
        let err = write_new_file(&target, b"sequenceNumber=2\n").expect_err("second write");
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(
            read_to_string(&target).expect("read back"),
            "sequenceNumber=1\n"
        );
    }

    #[rstest]
    fn write_file_replaces_existing(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let target = root.join("configuration.txt");
        write_file(&target, b"# template\n").expect("first write");
        write_file(&target, b"maxInterval=0\n").expect("second write");
        assert_eq!(read_to_string(&target).expect("read back"), "maxInterval=0\n");
    }

    #[rstest]
    fn create_dir_all_tolerates_existing(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let nested = root.join("a/b/c");
        create_dir_all(&nested).expect("first create");
        create_dir_all(&nested).expect("second create");
        assert!(nested.is_dir());
    }

    #[rstest]
    fn copy_to_new_file_refuses_existing(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let source = root.join("source.pbf");
        let target = root.join("target.pbf");
        std::fs::write(&source, b"planet").expect("write source");
        assert_eq!(copy_to_new_file(&source, &target).expect("copy"), 6);
        let err = copy_to_new_file(&source, &target).expect_err("target exists");
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[rstest]
    fn list_files_walks_nested_directories(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        create_dir_all(&root.join("planet/pbf")).expect("nested dirs");
        std::fs::write(root.join("planet/pbf/planet-220101.osm.pbf"), b"").expect("write");
        std::fs::write(root.join("readme.txt"), b"").expect("write");
        assert_eq!(
            list_files(&root).expect("list"),
            ["planet/pbf/planet-220101.osm.pbf", "readme.txt"]
        );
        assert!(list_files(&root.join("absent")).expect("missing root").is_empty());
    }

    #[rstest]
    fn ensure_parent_dir_creates_ancestors(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let target = root.join("downloads/planet.osm.pbf");
        ensure_parent_dir(&target).expect("parent created");
        assert!(root.join("downloads").is_dir());
    }
}
