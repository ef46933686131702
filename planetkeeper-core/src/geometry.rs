//! Extraction-region geometries.
//!
//! A [`GeometrySource`] is the closed set of shapes an extraction can be
//! bounded by. Rectangles are described by [`Bounds`] and must pass
//! [`validate_bbox`] before they reach an external tool; the remaining kinds
//! reuse the `geo` types so callers can compute envelopes without bespoke
//! arithmetic.

use std::fmt;

use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon, Rect};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

const MIN_LONGITUDE: f64 = -180.0;
const MAX_LONGITUDE: f64 = 180.0;
const MIN_LATITUDE: f64 = -90.0;
const MAX_LATITUDE: f64 = 90.0;

/// Errors raised while validating or decoding region geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The rectangle is inverted, degenerate, or outside the valid range.
    #[error("invalid bounding box ({left}, {bottom}, {right}, {top}): {reason}")]
    InvalidBoundingBox {
        /// Western edge.
        left: f64,
        /// Southern edge.
        bottom: f64,
        /// Eastern edge.
        right: f64,
        /// Northern edge.
        top: f64,
        /// Which constraint was violated.
        reason: &'static str,
    },
    /// The geometry object named a kind this crate does not support.
    #[error("unknown geometry type {kind:?}")]
    UnknownKind {
        /// The `type` member found in the input.
        kind: String,
    },
    /// The geometry object did not carry a `type` member.
    #[error("geometry object is missing a \"type\" member")]
    MissingType,
    /// The coordinates could not be decoded for the declared kind.
    #[error("malformed {kind} coordinates: {source}")]
    MalformedCoordinates {
        /// Declared geometry kind.
        kind: GeometryKind,
        /// Decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// A position held fewer than two ordinates.
    #[error("{kind} position must have at least two ordinates")]
    ShortPosition {
        /// Declared geometry kind.
        kind: GeometryKind,
    },
    /// The geometry carried no coordinates.
    #[error("{kind} geometry has no coordinates")]
    Empty {
        /// Declared geometry kind.
        kind: GeometryKind,
    },
    /// The input was neither a geometry object nor a `left,bottom,right,top` tuple.
    #[error("could not parse geometry {input:?}: {source}")]
    Parse {
        /// The raw input text.
        input: String,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The input was a JSON value that cannot describe a geometry.
    #[error("expected a geometry object or a four-element array")]
    UnsupportedValue,
}

/// Discriminant of a [`GeometrySource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// Axis-aligned rectangle.
    Rectangle,
    /// Single polygon with optional holes.
    Polygon,
    /// Several polygons.
    MultiPolygon,
    /// Line string reduced to its bounding envelope.
    Line,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rectangle => "rectangle",
            Self::Polygon => "polygon",
            Self::MultiPolygon => "multipolygon",
            Self::Line => "line",
        })
    }
}

/// Rectangle edges in WGS84 degrees.
///
/// # Examples
/// ```
/// use planetkeeper_core::{Bounds, validate_bbox};
///
/// let bounds = Bounds::new(-0.5, 51.2, 0.3, 51.7);
/// assert!(validate_bbox(&bounds).is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Western edge (minimum longitude).
    pub left: f64,
    /// Southern edge (minimum latitude).
    pub bottom: f64,
    /// Eastern edge (maximum longitude).
    pub right: f64,
    /// Northern edge (maximum latitude).
    pub top: f64,
}

impl Bounds {
    /// Construct bounds without validating them.
    #[must_use]
    pub const fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Construct bounds from a `[left, bottom, right, top]` tuple, validating them.
    pub fn checked(edges: [f64; 4]) -> Result<Self, GeometryError> {
        let [left, bottom, right, top] = edges;
        let bounds = Self::new(left, bottom, right, top);
        validate_bbox(&bounds)?;
        Ok(bounds)
    }

    /// Convert to a `geo` rectangle.
    #[must_use]
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.left,
                y: self.bottom,
            },
            Coord {
                x: self.right,
                y: self.top,
            },
        )
    }

    fn from_rect(rect: Rect<f64>) -> Self {
        let min = rect.min();
        let max = rect.max();
        Self::new(min.x, min.y, max.x, max.y)
    }
}

/// Check that `bounds` describe a non-empty rectangle inside the WGS84 range.
pub fn validate_bbox(bounds: &Bounds) -> Result<(), GeometryError> {
    let Bounds {
        left,
        bottom,
        right,
        top,
    } = *bounds;
    let reject = |reason| GeometryError::InvalidBoundingBox {
        left,
        bottom,
        right,
        top,
        reason,
    };
    if [left, bottom, right, top].iter().any(|edge| !edge.is_finite()) {
        return Err(reject("coordinates must be finite"));
    }
    if !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&left)
        || !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&right)
    {
        return Err(reject("longitude outside [-180, 180]"));
    }
    if !(MIN_LATITUDE..=MAX_LATITUDE).contains(&bottom)
        || !(MIN_LATITUDE..=MAX_LATITUDE).contains(&top)
    {
        return Err(reject("latitude outside [-90, 90]"));
    }
    if left >= right {
        return Err(reject("left must be less than right"));
    }
    if bottom >= top {
        return Err(reject("bottom must be less than top"));
    }
    Ok(())
}

/// The shape bounding one extraction region.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometrySource {
    /// Axis-aligned rectangle.
    Rectangle(Bounds),
    /// Polygon with exterior ring and optional holes.
    Polygon(Polygon<f64>),
    /// Collection of polygons.
    MultiPolygon(MultiPolygon<f64>),
    /// Line string; extractions use its bounding envelope.
    Line(LineString<f64>),
}

impl GeometrySource {
    /// The kind of this geometry.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        match self {
            Self::Rectangle(_) => GeometryKind::Rectangle,
            Self::Polygon(_) => GeometryKind::Polygon,
            Self::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Self::Line(_) => GeometryKind::Line,
        }
    }

    /// The rectangle, when this geometry is one.
    #[must_use]
    pub const fn as_rectangle(&self) -> Option<&Bounds> {
        match self {
            Self::Rectangle(bounds) => Some(bounds),
            _ => None,
        }
    }

    /// Smallest rectangle enclosing the geometry.
    pub fn envelope(&self) -> Result<Bounds, GeometryError> {
        let rect = match self {
            Self::Rectangle(bounds) => return Ok(*bounds),
            Self::Polygon(polygon) => polygon.bounding_rect(),
            Self::MultiPolygon(polygons) => polygons.bounding_rect(),
            Self::Line(line) => line.bounding_rect(),
        };
        rect.map(Bounds::from_rect)
            .ok_or(GeometryError::Empty { kind: self.kind() })
    }

    /// Parse a command-line geometry.
    ///
    /// Accepts either a `left,bottom,right,top` shorthand or a JSON value
    /// understood by [`GeometrySource::from_json`].
    ///
    /// # Examples
    /// ```
    /// use planetkeeper_core::{GeometryKind, GeometrySource};
    ///
    /// let rect = GeometrySource::parse("-0.5,51.2,0.3,51.7")?;
    /// assert_eq!(rect.kind(), GeometryKind::Rectangle);
    ///
    /// let line = GeometrySource::parse(
    ///     r#"{"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 2.0]]}"#,
    /// )?;
    /// assert_eq!(line.kind(), GeometryKind::Line);
    /// # Ok::<(), planetkeeper_core::GeometryError>(())
    /// ```
    pub fn parse(input: &str) -> Result<Self, GeometryError> {
        let trimmed = input.trim();
        if !trimmed.starts_with(['{', '[']) {
            let wrapped = format!("[{trimmed}]");
            let edges: [f64; 4] =
                serde_json::from_str(&wrapped).map_err(|source| GeometryError::Parse {
                    input: input.to_owned(),
                    source,
                })?;
            return Bounds::checked(edges).map(Self::Rectangle);
        }
        let value: Value = serde_json::from_str(trimmed).map_err(|source| GeometryError::Parse {
            input: input.to_owned(),
            source,
        })?;
        Self::from_json(&value)
    }

    /// Decode a GeoJSON geometry, a GeoJSON feature, or a
    /// `[left, bottom, right, top]` array.
    ///
    /// Supported geometry types are `Polygon`, `MultiPolygon` and
    /// `LineString`; anything else is [`GeometryError::UnknownKind`].
    pub fn from_json(value: &Value) -> Result<Self, GeometryError> {
        match value {
            Value::Array(_) => {
                let edges: [f64; 4] = serde_json::from_value(value.clone()).map_err(|source| {
                    GeometryError::MalformedCoordinates {
                        kind: GeometryKind::Rectangle,
                        source,
                    }
                })?;
                Bounds::checked(edges).map(Self::Rectangle)
            }
            Value::Object(object) => {
                let kind = object
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or(GeometryError::MissingType)?;
                if kind == "Feature" {
                    let geometry = object.get("geometry").ok_or(GeometryError::MissingType)?;
                    return Self::from_json(geometry);
                }
                let coordinates = object.get("coordinates").cloned().unwrap_or(Value::Null);
                match kind {
                    "Polygon" => decode_polygon(coordinates).map(Self::Polygon),
                    "MultiPolygon" => decode_multipolygon(coordinates).map(Self::MultiPolygon),
                    "LineString" => decode_line(coordinates).map(Self::Line),
                    other => Err(GeometryError::UnknownKind {
                        kind: other.to_owned(),
                    }),
                }
            }
            _ => Err(GeometryError::UnsupportedValue),
        }
    }
}

type RawRing = Vec<Vec<f64>>;

fn decode<T>(kind: GeometryKind, coordinates: Value) -> Result<T, GeometryError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(coordinates)
        .map_err(|source| GeometryError::MalformedCoordinates { kind, source })
}

fn position(kind: GeometryKind, raw: &[f64]) -> Result<Coord<f64>, GeometryError> {
    match raw {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(GeometryError::ShortPosition { kind }),
    }
}

fn ring(kind: GeometryKind, raw: &[Vec<f64>]) -> Result<LineString<f64>, GeometryError> {
    if raw.is_empty() {
        return Err(GeometryError::Empty { kind });
    }
    raw.iter()
        .map(|pos| position(kind, pos))
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn polygon(kind: GeometryKind, rings: &[RawRing]) -> Result<Polygon<f64>, GeometryError> {
    let Some((exterior, interiors)) = rings.split_first() else {
        return Err(GeometryError::Empty { kind });
    };
    let holes = interiors
        .iter()
        .map(|raw| ring(kind, raw))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(ring(kind, exterior)?, holes))
}

fn decode_polygon(coordinates: Value) -> Result<Polygon<f64>, GeometryError> {
    let rings: Vec<RawRing> = decode(GeometryKind::Polygon, coordinates)?;
    polygon(GeometryKind::Polygon, &rings)
}

fn decode_multipolygon(coordinates: Value) -> Result<MultiPolygon<f64>, GeometryError> {
    let kind = GeometryKind::MultiPolygon;
    let members: Vec<Vec<RawRing>> = decode(kind, coordinates)?;
    if members.is_empty() {
        return Err(GeometryError::Empty { kind });
    }
    members
        .iter()
        .map(|rings| polygon(kind, rings))
        .collect::<Result<Vec<_>, _>>()
        .map(MultiPolygon::new)
}

fn decode_line(coordinates: Value) -> Result<LineString<f64>, GeometryError> {
    let raw: RawRing = decode(GeometryKind::Line, coordinates)?;
    ring(GeometryKind::Line, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::inverted_longitude([1.0, 0.0, 0.0, 1.0])]
    #[case::inverted_latitude([0.0, 1.0, 1.0, 0.0])]
    #[case::degenerate([0.0, 0.0, 0.0, 1.0])]
    #[case::longitude_range([-181.0, 0.0, 0.0, 1.0])]
    #[case::latitude_range([0.0, 0.0, 1.0, 90.5])]
    #[case::not_finite([0.0, f64::NAN, 1.0, 1.0])]
    fn rejects_invalid_bounds(#[case] edges: [f64; 4]) {
        let err = Bounds::checked(edges).expect_err("bounds should be rejected");
        assert!(matches!(err, GeometryError::InvalidBoundingBox { .. }));
    }

    #[rstest]
    fn accepts_full_extent() {
        let bounds = Bounds::checked([-180.0, -90.0, 180.0, 90.0]).expect("valid extent");
        assert_eq!(bounds.to_rect().min(), Coord { x: -180.0, y: -90.0 });
    }

    #[rstest]
    fn parses_rectangle_shorthand() {
        let geometry = GeometrySource::parse(" -122.5, 37.7, -122.3, 37.8 ").expect("shorthand");
        assert_eq!(
            geometry.as_rectangle(),
            Some(&Bounds::new(-122.5, 37.7, -122.3, 37.8))
        );
    }

    #[rstest]
    fn parses_polygon_with_hole() {
        let value = json!({
            "type": "Polygon",
            "coordinates": [
                [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]],
                [[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 1.0]]
            ]
        });
        let geometry = GeometrySource::from_json(&value).expect("polygon");
        let GeometrySource::Polygon(polygon) = &geometry else {
            panic!("expected polygon, got {geometry:?}");
        };
        assert_eq!(polygon.interiors().len(), 1);
        assert_eq!(
            geometry.envelope().expect("envelope"),
            Bounds::new(0.0, 0.0, 4.0, 4.0)
        );
    }

    #[rstest]
    fn unwraps_features() {
        let value = json!({
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "MultiPolygon",
                "coordinates": [[[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]]
            }
        });
        let geometry = GeometrySource::from_json(&value).expect("feature");
        assert_eq!(geometry.kind(), GeometryKind::MultiPolygon);
    }

    #[rstest]
    fn line_envelope_spans_all_points() {
        let value = json!({
            "type": "LineString",
            "coordinates": [[-1.0, 5.0, 12.0], [3.0, -2.0], [0.5, 0.5]]
        });
        let geometry = GeometrySource::from_json(&value).expect("line");
        assert_eq!(
            geometry.envelope().expect("envelope"),
            Bounds::new(-1.0, -2.0, 3.0, 5.0)
        );
    }

    #[rstest]
    #[case::point(json!({"type": "Point", "coordinates": [0.0, 0.0]}), "Point")]
    #[case::collection(json!({"type": "GeometryCollection", "geometries": []}), "GeometryCollection")]
    fn rejects_unknown_kinds(#[case] value: Value, #[case] expected: &str) {
        let err = GeometrySource::from_json(&value).expect_err("unknown kind");
        match err {
            GeometryError::UnknownKind { kind } => assert_eq!(kind, expected),
            other => panic!("expected UnknownKind, got {other:?}"),
        }
    }

    #[rstest]
    #[case::missing_type(json!({"coordinates": []}))]
    #[case::empty_polygon(json!({"type": "Polygon", "coordinates": []}))]
    #[case::short_position(json!({"type": "LineString", "coordinates": [[1.0]]}))]
    #[case::scalar(json!(42))]
    fn rejects_malformed_geometry(#[case] value: Value) {
        assert!(GeometrySource::from_json(&value).is_err());
    }
}
