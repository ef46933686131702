//! Named extraction regions.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::geometry::{GeometryError, GeometrySource};

/// Errors raised while assembling a [`RegionSet`].
#[derive(Debug, Error)]
pub enum RegionError {
    /// The region name cannot be used as an output file stem.
    #[error("invalid region name {name:?}: names must be non-empty and free of path separators")]
    InvalidName {
        /// Offending name.
        name: String,
    },
    /// Two regions share a name.
    #[error("region {name:?} is defined more than once")]
    Duplicate {
        /// Repeated name.
        name: String,
    },
    /// A `NAME=GEOMETRY` assignment lacked the separator.
    #[error("expected NAME=GEOMETRY, found {input:?}")]
    MalformedAssignment {
        /// The raw assignment.
        input: String,
    },
    /// A regions document was not a JSON object.
    #[error("regions document must be a JSON object keyed by region name")]
    NotAnObject,
    /// The geometry for a region was rejected.
    #[error("region {name:?}: {source}")]
    Geometry {
        /// Region whose geometry failed.
        name: String,
        /// Validation failure.
        #[source]
        source: GeometryError,
    },
}

/// A region name, usable verbatim as an output file stem.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionName(String);

impl RegionName {
    /// Validate and wrap a region name.
    ///
    /// # Examples
    /// ```
    /// use planetkeeper_core::RegionName;
    ///
    /// assert!(RegionName::new("london").is_ok());
    /// assert!(RegionName::new("../etc").is_err());
    /// ```
    pub fn new(value: impl Into<String>) -> Result<Self, RegionError> {
        let name = value.into();
        let rejected = name.trim().is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
            || name.chars().any(char::is_control);
        if rejected {
            return Err(RegionError::InvalidName { name });
        }
        Ok(Self(name))
    }

    /// File name of the PBF extract written for this region.
    #[must_use]
    pub fn output_file_name(&self) -> String {
        format!("{}.osm.pbf", self.0)
    }
}

impl AsRef<str> for RegionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mapping of region names to geometries.
///
/// Iteration is ordered by name so repeated runs emit identical commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionSet {
    regions: BTreeMap<RegionName, GeometrySource>,
}

impl RegionSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region, rejecting duplicate names.
    pub fn insert(&mut self, name: RegionName, geometry: GeometrySource) -> Result<(), RegionError> {
        if self.regions.contains_key(&name) {
            return Err(RegionError::Duplicate { name: name.0 });
        }
        self.regions.insert(name, geometry);
        Ok(())
    }

    /// Builder-style variant of [`RegionSet::insert`].
    pub fn with_region(
        mut self,
        name: &str,
        geometry: GeometrySource,
    ) -> Result<Self, RegionError> {
        self.insert(RegionName::new(name)?, geometry)?;
        Ok(self)
    }

    /// Parse and add a `NAME=GEOMETRY` assignment.
    ///
    /// # Examples
    /// ```
    /// use planetkeeper_core::RegionSet;
    ///
    /// let mut regions = RegionSet::new();
    /// regions.insert_assignment("soho=-0.14,51.51,-0.13,51.52")?;
    /// assert_eq!(regions.len(), 1);
    /// # Ok::<(), planetkeeper_core::RegionError>(())
    /// ```
    pub fn insert_assignment(&mut self, assignment: &str) -> Result<(), RegionError> {
        let (raw_name, raw_geometry) =
            assignment
                .split_once('=')
                .ok_or_else(|| RegionError::MalformedAssignment {
                    input: assignment.to_owned(),
                })?;
        let name = RegionName::new(raw_name.trim())?;
        let geometry =
            GeometrySource::parse(raw_geometry).map_err(|source| RegionError::Geometry {
                name: name.0.clone(),
                source,
            })?;
        self.insert(name, geometry)
    }

    /// Add every region from a JSON object keyed by region name.
    pub fn extend_from_json(&mut self, document: &Value) -> Result<(), RegionError> {
        let Value::Object(entries) = document else {
            return Err(RegionError::NotAnObject);
        };
        for (raw_name, value) in entries {
            let name = RegionName::new(raw_name.as_str())?;
            let geometry =
                GeometrySource::from_json(value).map_err(|source| RegionError::Geometry {
                    name: raw_name.clone(),
                    source,
                })?;
            self.insert(name, geometry)?;
        }
        Ok(())
    }

    /// Number of regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the set holds no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Iterate regions ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&RegionName, &GeometrySource)> {
        self.regions.iter()
    }
}
