//! Manifest-driven extraction through `osmium extract`.
//!
//! The manifest lists one entry per region and lives in a scoped temporary
//! file, removed when the guard drops whether or not the tool succeeded.

use std::io::Write;

use camino::Utf8Path;
use geo::{LineString, Polygon};
use planetkeeper_core::{Bounds, GeometrySource, RegionName, RegionSet};
use serde::Serialize;
use tempfile::NamedTempFile;

use super::ExtractionError;

/// Top-level manifest document.
#[derive(Debug, Serialize)]
pub(super) struct Manifest<'a> {
    directory: &'a str,
    extracts: Vec<ManifestEntry>,
}

#[derive(Debug, Serialize)]
struct ManifestEntry {
    output: String,
    output_format: &'static str,
    #[serde(flatten)]
    shape: Shape,
}

type Ring = Vec<[f64; 2]>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Shape {
    Bbox {
        left: f64,
        right: f64,
        top: f64,
        bottom: f64,
    },
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Shape {
    fn from_bounds(bounds: Bounds) -> Self {
        Self::Bbox {
            left: bounds.left,
            right: bounds.right,
            top: bounds.top,
            bottom: bounds.bottom,
        }
    }
}

impl<'a> Manifest<'a> {
    /// Build the manifest for `regions`, writing into `output_dir`.
    pub(super) fn build(
        regions: &RegionSet,
        output_dir: &'a Utf8Path,
    ) -> Result<Self, ExtractionError> {
        let extracts = regions
            .iter()
            .map(|(name, geometry)| entry(name, geometry))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            directory: output_dir.as_str(),
            extracts,
        })
    }

    /// Persist the manifest to a temporary file that is deleted on drop.
    pub(super) fn write_temporary(&self) -> Result<NamedTempFile, ExtractionError> {
        let mut file = tempfile::Builder::new()
            .prefix("planetkeeper-extract-")
            .suffix(".json")
            .tempfile()
            .map_err(|source| ExtractionError::WriteManifest { source })?;
        serde_json::to_writer(&mut file, self)
            .map_err(|source| ExtractionError::EncodeManifest { source })?;
        file.flush()
            .map_err(|source| ExtractionError::WriteManifest { source })?;
        Ok(file)
    }
}

fn entry(name: &RegionName, geometry: &GeometrySource) -> Result<ManifestEntry, ExtractionError> {
    let shape = match geometry {
        GeometrySource::Rectangle(bounds) => {
            planetkeeper_core::validate_bbox(bounds).map_err(|source| {
                ExtractionError::InvalidRegion {
                    region: name.clone(),
                    source,
                }
            })?;
            Shape::from_bounds(*bounds)
        }
        GeometrySource::Line(_) => {
            let envelope = geometry
                .envelope()
                .map_err(|source| ExtractionError::InvalidRegion {
                    region: name.clone(),
                    source,
                })?;
            Shape::from_bounds(envelope)
        }
        GeometrySource::Polygon(polygon) => Shape::Polygon(polygon_rings(polygon)),
        GeometrySource::MultiPolygon(polygons) => {
            Shape::MultiPolygon(polygons.iter().map(polygon_rings).collect())
        }
    };
    Ok(ManifestEntry {
        output: name.output_file_name(),
        output_format: "pbf",
        shape,
    })
}

fn polygon_rings(polygon: &Polygon<f64>) -> Vec<Ring> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(ring)
        .collect()
}

fn ring(line: &LineString<f64>) -> Ring {
    line.coords().map(|coord| [coord.x, coord.y]).collect()
}
