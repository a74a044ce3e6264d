//! Backend-agnostic access to plotfile data.

use crate::{
    field::FieldMetaInformation,
    geometry::{format_alternatives, Axis},
    grid::{GridRanges, GridSizes},
    io::{
        plotfile::{fdt, fpa, native::NativeBackend, FieldMetadata, PlotfileParams},
        Verbosity,
    },
};
use ndarray::prelude::*;
use std::{
    collections::HashMap,
    fmt, io,
    path::{Path, PathBuf},
};

/// Capabilities every concrete plotfile reader implementation provides.
///
/// All per-snapshot operations take the path of the snapshot; resolving an
/// iteration number to a path is the concern of the [`DataReader`] facade.
pub trait PlotfileBackend {
    /// Returns the name under which the backend is registered.
    fn name(&self) -> &'static str;

    /// Scans the given directory for snapshots and returns the sorted
    /// iteration numbers and the iteration to path map.
    fn list_files(&self, dir_path: &Path) -> io::Result<(Vec<u64>, HashMap<u64, PathBuf>)>;

    /// Extracts the time and, unless only a lightweight read is requested,
    /// the global parameters of the given snapshot.
    fn read_params(
        &self,
        file_path: &Path,
        extract_parameters: bool,
    ) -> io::Result<(fpa, Option<PlotfileParams>)>;

    /// Extracts a field from the given snapshot as a dense array and its
    /// grid metadata, optionally sliced across the given axes.
    #[allow(clippy::too_many_arguments)]
    fn read_field_cartesian(
        &self,
        file_path: &Path,
        iteration: u64,
        field: &str,
        coord: Option<&str>,
        axis_labels: &[Axis],
        slice_relative_position: &[f64],
        slice_across: &[Axis],
    ) -> io::Result<(ArrayD<fdt>, FieldMetaInformation)>;

    /// Derives the per-axis cell counts and physical ranges of the most
    /// information-rich available field of the given snapshot.
    fn read_grid_parameters(
        &self,
        file_path: &Path,
        avail_fields: &[String],
        fields_metadata: &HashMap<String, FieldMetadata>,
    ) -> io::Result<(GridSizes, GridRanges)>;
}

/// Entry of the backend registry: an availability probe paired with a
/// factory for the backend it describes.
pub struct BackendRegistration {
    pub name: &'static str,
    pub is_available: fn() -> bool,
    pub create: fn(Verbosity) -> Box<dyn PlotfileBackend>,
}

fn native_is_available() -> bool {
    true
}

fn create_native(verbosity: Verbosity) -> Box<dyn PlotfileBackend> {
    Box::new(NativeBackend::new(verbosity))
}

/// Registry of the plotfile reader implementations this crate can provide,
/// queried once when constructing a [`DataReader`].
pub const BACKEND_REGISTRY: &[BackendRegistration] = &[BackendRegistration {
    name: "native",
    is_available: native_is_available,
    create: create_native,
}];

/// Returns the names of the backends available in this build.
pub fn available_backends() -> Vec<&'static str> {
    BACKEND_REGISTRY
        .iter()
        .filter(|registration| (registration.is_available)())
        .map(|registration| registration.name)
        .collect()
}

/// Facade hiding which concrete plotfile reader implementation is active.
///
/// Holds the iteration to path map built during scanning and resolves
/// iteration numbers for all per-snapshot operations.
pub struct DataReader {
    backend: Box<dyn PlotfileBackend>,
    iteration_to_file: HashMap<u64, PathBuf>,
}

impl fmt::Debug for DataReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataReader")
            .field("iteration_to_file", &self.iteration_to_file)
            .finish_non_exhaustive()
    }
}

impl DataReader {
    /// Creates a data reader using the backend with the given name, or the
    /// first available backend when no name is given.
    pub fn new(backend_name: Option<&str>, verbosity: Verbosity) -> io::Result<Self> {
        let available: Vec<&BackendRegistration> = BACKEND_REGISTRY
            .iter()
            .filter(|registration| (registration.is_available)())
            .collect();

        if available.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!(
                    "No plotfile backend is available\nThe attempted backends are:\n{}",
                    format_alternatives(BACKEND_REGISTRY.iter().map(|r| r.name))
                ),
            ));
        }

        let registration = match backend_name {
            Some(name) => available
                .iter()
                .find(|registration| registration.name == name)
                .copied()
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::Unsupported,
                        format!(
                            "Invalid backend requested: {}\nThe available backends are:\n{}",
                            name,
                            format_alternatives(available.iter().map(|r| r.name))
                        ),
                    )
                })?,
            None => available[0],
        };

        Ok(Self {
            backend: (registration.create)(verbosity),
            iteration_to_file: HashMap::new(),
        })
    }

    /// Returns the name of the active backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Scans the given directory and returns the sorted iterations of the
    /// snapshots it holds, storing the iteration to path correspondence for
    /// the per-iteration operations.
    pub fn list_iterations<P: AsRef<Path>>(&mut self, dir_path: P) -> io::Result<Vec<u64>> {
        let dir_path = dir_path.as_ref();
        let (iterations, iteration_to_file) = self.backend.list_files(dir_path)?;
        if iterations.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "Found no valid plotfiles in directory {}\n\
                     Please check that this is the path to the plotfiles\n\
                     Valid snapshots are directories with names ending in plt \
                     followed by one or more digits",
                    dir_path.to_string_lossy()
                ),
            ));
        }
        self.iteration_to_file = iteration_to_file;
        Ok(iterations)
    }

    /// Extracts the time and, unless only a lightweight read is requested,
    /// the global parameters of the snapshot with the given iteration.
    pub fn read_params(
        &self,
        iteration: u64,
        extract_parameters: bool,
    ) -> io::Result<(fpa, Option<PlotfileParams>)> {
        self.backend
            .read_params(self.file_for_iteration(iteration)?, extract_parameters)
    }

    /// Extracts a field from the snapshot with the given iteration as a
    /// dense array and its grid metadata.
    #[allow(clippy::too_many_arguments)]
    pub fn read_field_cartesian(
        &self,
        iteration: u64,
        field: &str,
        coord: Option<&str>,
        axis_labels: &[Axis],
        slice_relative_position: &[f64],
        slice_across: &[Axis],
    ) -> io::Result<(ArrayD<fdt>, FieldMetaInformation)> {
        self.backend.read_field_cartesian(
            self.file_for_iteration(iteration)?,
            iteration,
            field,
            coord,
            axis_labels,
            slice_relative_position,
            slice_across,
        )
    }

    /// Derives the grid sizes and physical ranges of the snapshot with the
    /// given iteration.
    pub fn read_grid_parameters(
        &self,
        iteration: u64,
        avail_fields: &[String],
        fields_metadata: &HashMap<String, FieldMetadata>,
    ) -> io::Result<(GridSizes, GridRanges)> {
        self.backend.read_grid_parameters(
            self.file_for_iteration(iteration)?,
            avail_fields,
            fields_metadata,
        )
    }

    fn file_for_iteration(&self, iteration: u64) -> io::Result<&Path> {
        self.iteration_to_file
            .get(&iteration)
            .map(|path| path.as_path())
            .ok_or_else(|| {
                let mut iterations: Vec<u64> = self.iteration_to_file.keys().copied().collect();
                iterations.sort_unstable();
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!(
                        "The requested iteration {} is not available\n\
                         The available iterations are:\n{}",
                        iteration,
                        format_alternatives(iterations)
                    ),
                )
            })
    }
}
