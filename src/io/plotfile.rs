//! Reading of AMReX plotfile data.

pub mod header;
pub mod native;

use crate::geometry::Axis;
use lazy_static::lazy_static;
use regex::Regex;
use std::{
    collections::HashMap,
    fmt, fs, io,
    path::{Path, PathBuf},
};

/// Floating-point precision assumed for plotfile field data.
#[allow(non_camel_case_types)]
pub type fdt = f64;

/// Floating-point precision assumed for parameter values.
#[allow(non_camel_case_types)]
pub type fpa = f64;

/// Name suffix identifying a snapshot directory, up to the iteration digits.
pub const PLOTFILE_SUFFIX: &str = "plt";

/// Coordinate system of a plotfile grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinateSystem {
    Cartesian,
    Cylindrical,
    Spherical,
}

impl CoordinateSystem {
    /// Interprets the numeric coordinate system tag used in plotfile headers.
    pub fn from_tag(tag: i64) -> io::Result<Self> {
        match tag {
            0 => Ok(Self::Cartesian),
            1 => Ok(Self::Cylindrical),
            2 => Ok(Self::Spherical),
            invalid => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid coordinate system tag {} in plotfile header", invalid),
            )),
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Cartesian => "cartesian",
                Self::Cylindrical => "cylindrical",
                Self::Spherical => "spherical",
            }
        )
    }
}

/// Geometry classification of a field, ordered by information richness.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldGeometry {
    Cartesian1D,
    Cartesian2D,
    ThetaMode,
    Cartesian3D,
}

impl FieldGeometry {
    /// Returns the geometry for a Cartesian grid with the given number of
    /// spatial dimensions.
    pub fn for_cartesian_dim(n_dims: usize) -> io::Result<Self> {
        match n_dims {
            1 => Ok(Self::Cartesian1D),
            2 => Ok(Self::Cartesian2D),
            3 => Ok(Self::Cartesian3D),
            invalid => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!(
                    "Unsupported number of spatial dimensions {} in plotfile (must be 1, 2 or 3)",
                    invalid
                ),
            )),
        }
    }

    /// Returns the geometry tag string used in field metadata.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Cartesian1D => "1dcartesian",
            Self::Cartesian2D => "2dcartesian",
            Self::ThetaMode => "thetaMode",
            Self::Cartesian3D => "3dcartesian",
        }
    }

    /// Ranks the geometry by the amount of spatial information it carries.
    pub fn richness(&self) -> u32 {
        match self {
            Self::Cartesian1D => 0,
            Self::Cartesian2D => 1,
            Self::ThetaMode => 2,
            Self::Cartesian3D => 3,
        }
    }

    /// Returns the ordered axis labels of the geometry, or `None` for
    /// non-Cartesian geometries.
    pub fn axis_labels(&self) -> Option<&'static [Axis]> {
        match self {
            Self::Cartesian1D => Axis::labels_for_dim(1),
            Self::Cartesian2D => Axis::labels_for_dim(2),
            Self::Cartesian3D => Axis::labels_for_dim(3),
            Self::ThetaMode => None,
        }
    }
}

impl fmt::Display for FieldGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Whether a field holds one scalar quantity or the components of a vector
/// quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Scalar,
    Vector,
}

/// Metadata describing one available field of a snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldMetadata {
    pub geometry: FieldGeometry,
    pub field_type: FieldType,
    pub axis_labels: Vec<Axis>,
    pub avail_components: Vec<String>,
    pub avail_circ_modes: Vec<String>,
}

/// Global parameters extracted from one snapshot.
///
/// Species and record components are always absent for plotfile backends,
/// which do not support particle data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlotfileParams {
    pub avail_fields: Option<Vec<String>>,
    pub fields_metadata: HashMap<String, FieldMetadata>,
    pub avail_species: Option<Vec<String>>,
    pub avail_record_components: Option<Vec<String>>,
}

lazy_static! {
    static ref PLOTFILE_DIR_NAME_REGEX: Regex =
        Regex::new(&format!("{}([0-9]+)$", PLOTFILE_SUFFIX)).unwrap();
}

/// Extracts the iteration number from a snapshot directory name, if the
/// name ends with the plotfile suffix followed by one or more digits.
pub fn extract_iteration_from_dir_name(dir_name: &str) -> Option<u64> {
    PLOTFILE_DIR_NAME_REGEX
        .captures(dir_name)
        .map(|caps| caps[1].parse::<u64>().unwrap())
}

/// Scans the given directory for snapshot directories and returns the
/// sorted iteration numbers together with a map from iteration number to
/// absolute snapshot path.
///
/// Only directories whose name ends with `plt` followed by one or more
/// digits are accepted. When two entries share an iteration number the
/// lexicographically last path wins. Zero matches produce an empty result
/// rather than an error.
pub fn list_plotfiles<P: AsRef<Path>>(
    dir_path: P,
) -> io::Result<(Vec<u64>, HashMap<u64, PathBuf>)> {
    let dir_path = dir_path.as_ref();

    let mut snapshot_paths: Vec<PathBuf> = fs::read_dir(dir_path)?
        .collect::<io::Result<Vec<_>>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    snapshot_paths.sort();

    let mut iteration_to_file = HashMap::new();
    for path in snapshot_paths {
        let dir_name = match path.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => continue,
        };
        if let Some(iteration) = extract_iteration_from_dir_name(&dir_name) {
            iteration_to_file.insert(iteration, path.canonicalize().unwrap_or(path));
        }
    }

    let mut iterations: Vec<u64> = iteration_to_file.keys().copied().collect();
    iterations.sort_unstable();

    Ok((iterations, iteration_to_file))
}
