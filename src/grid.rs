//! Physical grid extents derived from plotfile metadata.

use crate::{geometry::Axis, io::plotfile::FieldMetadata};
use std::collections::HashMap;

/// Floating-point precision used for grid coordinates.
#[allow(non_camel_case_types)]
pub type fgr = f64;

/// Number of grid cells along each labelled axis.
pub type GridSizes = HashMap<Axis, usize>;

/// Physical `[min, max]` extent of the grid along each labelled axis.
pub type GridRanges = HashMap<Axis, [fgr; 2]>;

/// Computes the per-axis cell counts and physical coordinate ranges of a
/// grid from its cell sizes, spacings and lower corner.
///
/// The upper bound of each range is `offset + size * spacing`.
pub fn grid_parameters(
    axis_labels: &[Axis],
    sizes: &[usize],
    grid_spacing: &[fgr],
    grid_offset: &[fgr],
) -> (GridSizes, GridRanges) {
    let mut grid_sizes = GridSizes::new();
    let mut grid_ranges = GridRanges::new();

    for (idx, &axis) in axis_labels.iter().enumerate() {
        grid_sizes.insert(axis, sizes[idx]);
        grid_ranges.insert(
            axis,
            [
                grid_offset[idx],
                grid_offset[idx] + (sizes[idx] as fgr) * grid_spacing[idx],
            ],
        );
    }

    (grid_sizes, grid_ranges)
}

/// Selects the available field with the most information-rich geometry,
/// ranked 1D < 2D < azimuthal-mode < 3D.
///
/// Downstream histogramming benefits from the highest-dimensional available
/// reference grid. Returns `None` when no fields are available.
pub fn select_reference_field<'a>(
    avail_fields: &'a [String],
    fields_metadata: &HashMap<String, FieldMetadata>,
) -> Option<&'a str> {
    avail_fields
        .iter()
        .filter_map(|field| {
            fields_metadata
                .get(field)
                .map(|metadata| (field, metadata.geometry.richness()))
        })
        .max_by_key(|&(_, richness)| richness)
        .map(|(field, _)| field.as_str())
}
