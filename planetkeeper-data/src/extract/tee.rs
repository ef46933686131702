//! Single-pass extraction: the snapshot is read once and fanned out to
//! every region through `osmosis --tee`.

use camino::Utf8Path;
use planetkeeper_core::{Bounds, Invocation, RegionName};

use super::ExtractRequest;

/// Build the one `osmosis` invocation covering every rectangle.
pub(super) fn invocation(
    osmosis: Invocation,
    request: &ExtractRequest<'_>,
    rectangles: &[(&RegionName, &Bounds)],
) -> Invocation {
    let head = osmosis.args([
        "--read-pbf-fast".to_owned(),
        request.snapshot.path().to_string(),
        format!("workers={}", request.workers),
        "--tee".to_owned(),
        rectangles.len().to_string(),
    ]);
    rectangles.iter().fold(head, |acc, (name, bounds)| {
        acc.args(branch(name, bounds, request.output_dir))
    })
}

fn branch(name: &RegionName, bounds: &Bounds, output_dir: &Utf8Path) -> [String; 7] {
    [
        "--bounding-box".to_owned(),
        format!("left={:.5}", bounds.left),
        format!("bottom={:.5}", bounds.bottom),
        format!("right={:.5}", bounds.right),
        format!("top={:.5}", bounds.top),
        "--write-pbf".to_owned(),
        output_dir.join(name.output_file_name()).into_string(),
    ]
}
