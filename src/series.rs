//! Exploration of plotfile time series.

use crate::{
    backend::DataReader,
    field::FieldMetaInformation,
    geometry::{format_alternatives, Axis},
    grid::{fgr, GridRanges, GridSizes},
    io::{
        plotfile::{fdt, fpa, FieldMetadata, FieldType, PlotfileParams},
        Verbosity,
    },
};
use ndarray::prelude::*;
use std::{collections::HashMap, fmt, io, path::Path};

/// Valid component names of a Cartesian vector field.
const VECTOR_COORDS: [&str; 3] = ["x", "y", "z"];

/// Returns a standardized slicing request: either `None` (no slicing) or
/// equally long lists of slicing axes and relative positions.
///
/// Missing relative positions default to the domain midpoint. A length
/// mismatch between the two lists is an argument error.
pub fn sanitize_slicing(
    slice_across: Option<&[Axis]>,
    slice_relative_position: Option<&[f64]>,
) -> io::Result<Option<(Vec<Axis>, Vec<f64>)>> {
    let axes = match slice_across {
        None => return Ok(None),
        Some([]) => return Ok(None),
        Some(axes) => axes.to_vec(),
    };
    let positions = match slice_relative_position {
        None => vec![0.0; axes.len()],
        Some(positions) => positions.to_vec(),
    };
    if positions.len() != axes.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "The slice_relative_position argument is erroneous: it should have \
             the same number of elements as slice_across",
        ));
    }
    Ok(Some((axes, positions)))
}

/// Stacks per-iteration result arrays into one array with a new leading
/// iteration axis, or returns `None` when the shapes are incompatible.
pub fn try_stack_series(results: &[ArrayD<fdt>]) -> Option<ArrayD<fdt>> {
    let first_shape = results.first()?.shape();
    if results.iter().any(|array| array.shape() != first_shape) {
        return None;
    }
    let views: Vec<_> = results.iter().map(|array| array.view()).collect();
    ndarray::stack(ndarray::Axis(0), &views).ok()
}

/// Adjusts a tentative histogram bin count so that the bin spacing is an
/// integer multiple (or integer divisor) of the grid spacing over the given
/// range, and returns the new count with the correspondingly adjusted range.
pub fn fit_bins_to_grid(
    hist_size: usize,
    grid_size: usize,
    grid_range: [fgr; 2],
) -> (usize, [fgr; 2]) {
    let mut hist_range = grid_range;

    let tentative_spacing = (hist_range[1] - hist_range[0]) / hist_size as fgr;
    let grid_spacing = (grid_range[1] - grid_range[0]) / grid_size as fgr;

    let hist_spacing = if tentative_spacing >= grid_spacing {
        (tentative_spacing / grid_spacing).trunc() * grid_spacing
    } else {
        grid_spacing / (grid_spacing / tentative_spacing).trunc()
    };

    let hist_size = ((hist_range[1] - hist_range[0]) / hist_spacing).trunc() as usize;
    hist_range[1] = hist_range[0] + hist_size as fgr * hist_spacing;

    (hist_size, hist_range)
}

fn nearest_time_index(times: &[fpa], time: fpa) -> usize {
    times
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (*a - time)
                .abs()
                .partial_cmp(&(*b - time).abs())
                .expect("Snapshot times must not be NaN")
        })
        .map(|(idx, _)| idx)
        .expect("Cannot search an empty sequence of times")
}

/// A scanned plotfile time series with one persistent selection cursor.
///
/// Scanning happens once at construction; the times and global parameters
/// of the snapshots are cached, while field data is re-read on every query.
/// The selection cursor is process-local mutable state without any
/// thread-safety guarantees.
pub struct PlotfileSeries {
    data_reader: DataReader,
    iterations: Vec<u64>,
    times: Vec<fpa>,
    avail_fields: Option<Vec<String>>,
    fields_metadata: HashMap<String, FieldMetadata>,
    tmin: fpa,
    tmax: fpa,
    current_idx: usize,
    verbosity: Verbosity,
}

impl fmt::Debug for PlotfileSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlotfileSeries")
            .field("iterations", &self.iterations)
            .field("times", &self.times)
            .field("avail_fields", &self.avail_fields)
            .field("fields_metadata", &self.fields_metadata)
            .field("tmin", &self.tmin)
            .field("tmax", &self.tmax)
            .field("current_idx", &self.current_idx)
            .field("verbosity", &self.verbosity)
            .finish_non_exhaustive()
    }
}

impl PlotfileSeries {
    /// Scans the given directory and initializes a time series from the
    /// snapshots it holds.
    ///
    /// With `check_all_files` the parameters of every snapshot are compared
    /// against the first one, and divergences are reported as warnings
    /// without aborting the scan. The backend defaults to the first
    /// available one.
    pub fn new<P: AsRef<Path>>(
        dir_path: P,
        check_all_files: bool,
        backend_name: Option<&str>,
        verbosity: Verbosity,
    ) -> io::Result<Self> {
        let mut data_reader = DataReader::new(backend_name, verbosity)?;
        let iterations = data_reader.list_iterations(dir_path)?;

        let (first_time, first_params) = data_reader.read_params(iterations[0], true)?;
        let first_params: PlotfileParams =
            first_params.expect("Full parameter reads always return parameters");

        let mut times = vec![0.0; iterations.len()];
        times[0] = first_time;

        let progress_bar = verbosity.create_progress_bar(iterations.len() - 1);
        for (idx, &iteration) in iterations.iter().enumerate().skip(1) {
            let (time, params) = data_reader.read_params(iteration, check_all_files)?;
            times[idx] = time;
            if check_all_files && params.as_ref() != Some(&first_params) {
                eprintln!(
                    "Warning: File {} has different plotfile parameters than \
                     the rest of the time series",
                    iteration
                );
            }
            progress_bar.inc(1);
        }
        progress_bar.finish_and_clear();

        let tmin = times.iter().cloned().fold(fpa::INFINITY, fpa::min);
        let tmax = times.iter().cloned().fold(fpa::NEG_INFINITY, fpa::max);

        Ok(Self {
            data_reader,
            iterations,
            times,
            avail_fields: first_params.avail_fields,
            fields_metadata: first_params.fields_metadata,
            tmin,
            tmax,
            current_idx: 0,
            verbosity,
        })
    }

    /// Returns the sorted iteration numbers of the series.
    pub fn iterations(&self) -> &[u64] {
        &self.iterations
    }

    /// Returns the simulation times of the snapshots, ordered by iteration.
    pub fn times(&self) -> &[fpa] {
        &self.times
    }

    /// Returns the earliest time in the series.
    pub fn tmin(&self) -> fpa {
        self.tmin
    }

    /// Returns the latest time in the series.
    pub fn tmax(&self) -> fpa {
        self.tmax
    }

    /// Returns the names of the available fields, or `None` when the series
    /// holds no field data.
    pub fn avail_fields(&self) -> Option<&[String]> {
        self.avail_fields.as_deref()
    }

    /// Returns the metadata of the available fields.
    pub fn fields_metadata(&self) -> &HashMap<String, FieldMetadata> {
        &self.fields_metadata
    }

    /// Returns the currently selected iteration.
    pub fn current_iteration(&self) -> u64 {
        self.iterations[self.current_idx]
    }

    /// Returns the time of the currently selected snapshot.
    pub fn current_time(&self) -> fpa {
        self.times[self.current_idx]
    }

    /// Moves the selection cursor to the snapshot with the given time or
    /// iteration and returns the selected index.
    ///
    /// Exactly one of the two must be given. Times outside the covered
    /// interval clamp to the first or last snapshot; times inside select
    /// the snapshot with the nearest stored time. Iterations must match
    /// exactly.
    pub fn select(&mut self, time: Option<fpa>, iteration: Option<u64>) -> io::Result<usize> {
        match (time, iteration) {
            (Some(_), Some(_)) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Please pass either a time or an iteration, but not both",
            )),
            (None, None) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Please pass either a time or an iteration",
            )),
            (Some(time), None) => {
                self.current_idx = if time < self.tmin {
                    0
                } else if time > self.tmax {
                    self.times.len() - 1
                } else {
                    nearest_time_index(&self.times, time)
                };
                Ok(self.current_idx)
            }
            (None, Some(iteration)) => {
                match self.iterations.iter().position(|&it| it == iteration) {
                    Some(idx) => {
                        self.current_idx = idx;
                        Ok(idx)
                    }
                    None => Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!(
                            "The requested iteration {} is not available\n\
                             The available iterations are:\n{}",
                            iteration,
                            format_alternatives(&self.iterations)
                        ),
                    )),
                }
            }
        }
    }

    /// Extracts a field at the snapshot selected by the given time or
    /// iteration, optionally sliced across the given axes.
    ///
    /// Moves the selection cursor like [`select`](Self::select). For vector
    /// fields `coord` picks the component; it is ignored for scalar fields.
    #[allow(clippy::too_many_arguments)]
    pub fn get_field(
        &mut self,
        field: &str,
        coord: Option<&str>,
        time: Option<fpa>,
        iteration: Option<u64>,
        slice_across: Option<&[Axis]>,
        slice_relative_position: Option<&[f64]>,
    ) -> io::Result<(ArrayD<fdt>, FieldMetaInformation)> {
        let avail_fields = self.avail_fields.as_deref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "No field data in this time series",
            )
        })?;
        if !avail_fields.iter().any(|name| name == field) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "The field argument is missing or erroneous\n\
                     The available fields are:\n{}\n\
                     Please set the field argument accordingly",
                    format_alternatives(avail_fields)
                ),
            ));
        }
        let metadata = self.fields_metadata[field].clone();

        let slicing = sanitize_slicing(slice_across, slice_relative_position)?;
        if let Some((axes, _)) = &slicing {
            for axis in axes {
                if !metadata.axis_labels.contains(axis) {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!(
                            "The slice_across argument is erroneous: contains {}\n\
                             The available axes are:\n{}",
                            axis,
                            format_alternatives(&metadata.axis_labels)
                        ),
                    ));
                }
            }
        }

        let coord = match metadata.field_type {
            FieldType::Scalar => None,
            FieldType::Vector => match coord {
                Some(coord) if VECTOR_COORDS.contains(&coord) => Some(coord),
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!(
                            "The field {} is a vector field, but the coord argument \
                             is missing or erroneous\nThe available coordinates are:\n{}\n\
                             Please set the coord argument accordingly",
                            field,
                            format_alternatives(VECTOR_COORDS)
                        ),
                    ))
                }
            },
        };

        self.select(time, iteration)?;
        let iteration = self.current_iteration();

        let (slice_across, slice_relative_position) = match &slicing {
            Some((axes, positions)) => (axes.as_slice(), positions.as_slice()),
            None => (&[][..], &[][..]),
        };
        self.data_reader.read_field_cartesian(
            iteration,
            field,
            coord,
            &metadata.axis_labels,
            slice_relative_position,
            slice_across,
        )
    }

    /// Derives the per-axis grid sizes and physical ranges at the snapshot
    /// selected by the given time or iteration.
    pub fn get_grid_parameters(
        &mut self,
        time: Option<fpa>,
        iteration: Option<u64>,
    ) -> io::Result<(GridSizes, GridRanges)> {
        let avail_fields = self
            .avail_fields
            .clone()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    "No field data in this time series",
                )
            })?;
        self.select(time, iteration)?;
        self.data_reader.read_grid_parameters(
            self.current_iteration(),
            &avail_fields,
            &self.fields_metadata,
        )
    }

    /// Calls the given method once for every iteration of the series in
    /// ascending order and collects the results.
    ///
    /// The output buffer is sized up front; pair with
    /// [`try_stack_series`] to combine per-iteration arrays.
    pub fn iterate<T, F>(&mut self, mut called_method: F) -> io::Result<Vec<T>>
    where
        F: FnMut(&mut Self, u64) -> io::Result<T>,
    {
        let iterations = self.iterations.clone();
        let mut results = Vec::with_capacity(iterations.len());

        let progress_bar = self.verbosity.create_progress_bar(iterations.len());
        for iteration in iterations {
            results.push(called_method(self, iteration)?);
            progress_bar.inc(1);
        }
        progress_bar.finish_and_clear();

        Ok(results)
    }
}
