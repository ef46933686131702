//! One converter run per region.

use camino::Utf8Path;
use planetkeeper_core::{Bounds, Invocation, RegionName, Snapshot};

/// Build the `osmconvert` invocation for one rectangle.
pub(super) fn invocation(
    osmconvert: Invocation,
    snapshot: &Snapshot,
    name: &RegionName,
    bounds: &Bounds,
    output_dir: &Utf8Path,
) -> Invocation {
    osmconvert.args([
        snapshot.path().to_string(),
        format!(
            "-b={},{},{},{}",
            bounds.left, bounds.bottom, bounds.right, bounds.top
        ),
        format!("-o={}", output_dir.join(name.output_file_name())),
    ])
}
