//! Reassembly of box-decomposed grid data into dense arrays.

use ndarray::{prelude::*, SliceInfoElem};
use num;
use std::io;

/// Axis-aligned box of grid cells given by inclusive lower and upper index
/// bounds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridBox {
    small_end: Vec<i64>,
    big_end: Vec<i64>,
}

impl GridBox {
    /// Creates a new box from inclusive lower and upper index bounds.
    pub fn new(small_end: Vec<i64>, big_end: Vec<i64>) -> Self {
        assert_eq!(
            small_end.len(),
            big_end.len(),
            "Lower and upper box bounds must have the same number of dimensions"
        );
        assert!(
            small_end
                .iter()
                .zip(big_end.iter())
                .all(|(&small, &big)| big >= small),
            "Upper box bounds must not be smaller than lower box bounds"
        );
        Self { small_end, big_end }
    }

    /// Returns the number of dimensions of the box.
    pub fn ndim(&self) -> usize {
        self.small_end.len()
    }

    /// Returns the inclusive lower index bounds of the box.
    pub fn small_end(&self) -> &[i64] {
        &self.small_end
    }

    /// Returns the inclusive upper index bounds of the box.
    pub fn big_end(&self) -> &[i64] {
        &self.big_end
    }

    /// Returns the number of cells along each dimension of the box.
    pub fn shape(&self) -> Vec<usize> {
        self.small_end
            .iter()
            .zip(self.big_end.iter())
            .map(|(&small, &big)| (big - small + 1) as usize)
            .collect()
    }

    /// Whether the given absolute cell index lies within the box along the
    /// given axis.
    pub fn contains_index(&self, axis: usize, index: i64) -> bool {
        self.small_end[axis] <= index && index <= self.big_end[axis]
    }
}

/// One sub-box of a decomposed grid together with its box-local payload.
///
/// The payload dimensions match the box shape, optionally followed by a
/// trailing component axis, and may carry singleton spatial axes when the
/// source represents a lower-dimensional problem in a higher-rank layout.
#[derive(Clone, Debug)]
pub struct BoxData<F> {
    pub bounds: GridBox,
    pub values: ArrayD<F>,
}

/// A request to fix the cell index along one axis of the problem domain.
///
/// The cell index is relative to the lower corner of the domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlicePlane {
    pub axis: usize,
    pub cell_index: usize,
}

/// Converts a relative slicing position in `[-1, 1]` to a cell index along
/// an axis with the given number of cells.
///
/// The index is truncated toward zero and clamped to `[0, n_cells - 1]`, so
/// the result never steps outside the array.
pub fn slice_cell_index(relative_position: f64, n_cells: usize) -> usize {
    assert_ne!(n_cells, 0, "Cannot slice along an axis with zero cells");
    let cell_index = (0.5 * (relative_position + 1.0) * n_cells as f64).trunc() as i64;
    cell_index.max(0).min(n_cells as i64 - 1) as usize
}

/// Whether a sub-box contains the fixed cell index of every given slice
/// plane, i.e. whether it contributes any data to the sliced array.
pub fn box_intersects_slices(domain: &GridBox, bounds: &GridBox, slices: &[SlicePlane]) -> bool {
    slices.iter().all(|slice| {
        bounds.contains_index(
            slice.axis,
            domain.small_end()[slice.axis] + slice.cell_index as i64,
        )
    })
}

/// Gathers the sub-boxes of a decomposed grid into one dense array covering
/// the full problem domain.
///
/// When `n_components` is given the payloads carry all field components and
/// the dense array gains a trailing component axis; otherwise each payload
/// holds a single extracted component.
pub fn assemble_dense<F: num::Float>(
    domain: &GridBox,
    boxes: Vec<BoxData<F>>,
    n_components: Option<usize>,
) -> io::Result<ArrayD<F>> {
    let n_dims = check_dimensionality(domain)?;

    let mut dense_shape = domain.shape();
    if let Some(n_components) = n_components {
        dense_shape.push(n_components);
    }
    let mut dense = ArrayD::zeros(IxDyn(&dense_shape));

    for box_data in boxes {
        let bounds = box_data.bounds.clone();
        let payload = normalized_payload(box_data, n_dims, n_components)?;

        let mut dense_slices = Vec::with_capacity(payload.ndim());
        for axis in 0..n_dims {
            dense_slices.push(domain_range(domain, &bounds, axis)?);
        }
        if n_components.is_some() {
            dense_slices.push(full_range());
        }
        dense
            .slice_mut(dense_slices.as_slice())
            .assign(&payload);
    }

    Ok(dense)
}

/// Gathers only the parts of the sub-boxes selected by the given slice
/// planes, producing the reduced-dimension array directly.
///
/// Boxes that do not intersect every slice plane are skipped, so the full
/// dense array is never materialized. The result is identical to assembling
/// densely and slicing afterwards.
pub fn assemble_sliced<F: num::Float>(
    domain: &GridBox,
    boxes: Vec<BoxData<F>>,
    n_components: Option<usize>,
    slices: &[SlicePlane],
) -> io::Result<ArrayD<F>> {
    let n_dims = check_dimensionality(domain)?;
    let domain_shape = domain.shape();

    let mut sliced_shape: Vec<usize> = (0..n_dims)
        .filter(|axis| !slices.iter().any(|slice| slice.axis == *axis))
        .map(|axis| domain_shape[axis])
        .collect();
    if let Some(n_components) = n_components {
        sliced_shape.push(n_components);
    }
    let mut sliced = ArrayD::zeros(IxDyn(&sliced_shape));

    for box_data in boxes {
        let bounds = box_data.bounds.clone();
        if !box_intersects_slices(domain, &bounds, slices) {
            continue;
        }
        let payload = normalized_payload(box_data, n_dims, n_components)?;

        let mut payload_slices = Vec::with_capacity(payload.ndim());
        let mut sliced_slices = Vec::new();
        for axis in 0..n_dims {
            match slices.iter().find(|slice| slice.axis == axis) {
                Some(slice) => {
                    let box_local_index = domain.small_end()[axis] + slice.cell_index as i64
                        - bounds.small_end()[axis];
                    payload_slices.push(SliceInfoElem::Index(box_local_index as isize));
                }
                None => {
                    payload_slices.push(full_range());
                    sliced_slices.push(domain_range(domain, &bounds, axis)?);
                }
            }
        }
        if n_components.is_some() {
            payload_slices.push(full_range());
            sliced_slices.push(full_range());
        }
        sliced
            .slice_mut(sliced_slices.as_slice())
            .assign(&payload.slice(payload_slices.as_slice()));
    }

    Ok(sliced)
}

/// Reduces the dimensionality of a dense array by fixing the cell index
/// along each given slice plane.
///
/// Planes are applied from the deepest axis outward, so axes beyond the
/// deepest sliced axis (such as a trailing component axis) are preserved.
pub fn slice_dense<F: num::Float>(array: ArrayD<F>, slices: &[SlicePlane]) -> ArrayD<F> {
    let mut ordered = slices.to_vec();
    ordered.sort_by(|a, b| b.axis.cmp(&a.axis));
    ordered.into_iter().fold(array, |array, slice| {
        array.index_axis_move(Axis(slice.axis), slice.cell_index)
    })
}

/// Converts the element type of a dense array losslessly.
pub fn cast_dense<F, T>(array: ArrayD<F>) -> ArrayD<T>
where
    F: Copy,
    T: From<F>,
{
    array.mapv(T::from)
}

fn check_dimensionality(domain: &GridBox) -> io::Result<usize> {
    let n_dims = domain.ndim();
    if n_dims == 2 || n_dims == 3 {
        Ok(n_dims)
    } else {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!(
                "Unsupported dimension {} for box reassembly (only 2D and 3D grids are supported)",
                n_dims
            ),
        ))
    }
}

fn full_range() -> SliceInfoElem {
    SliceInfoElem::Slice {
        start: 0,
        end: None,
        step: 1,
    }
}

fn domain_range(domain: &GridBox, bounds: &GridBox, axis: usize) -> io::Result<SliceInfoElem> {
    let start = bounds.small_end()[axis] - domain.small_end()[axis];
    let end = bounds.big_end()[axis] - domain.small_end()[axis] + 1;
    if start < 0 || end > (domain.shape()[axis] as i64) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Sub-box index range [{}, {}] extends outside the problem domain along axis {}",
                bounds.small_end()[axis],
                bounds.big_end()[axis],
                axis
            ),
        ));
    }
    Ok(SliceInfoElem::Slice {
        start: start as isize,
        end: Some(end as isize),
        step: 1,
    })
}

/// Strips singleton spatial axes carried by lower-dimensional sources and
/// verifies that the payload dimensions match the box bounds.
fn normalized_payload<F: num::Float>(
    box_data: BoxData<F>,
    n_dims: usize,
    n_components: Option<usize>,
) -> io::Result<ArrayD<F>> {
    let BoxData { bounds, values } = box_data;
    let expected_ndim = n_dims + usize::from(n_components.is_some());

    let mut payload = values;
    while payload.ndim() > expected_ndim {
        if payload.shape()[n_dims] == 1 {
            payload = payload.index_axis_move(Axis(n_dims), 0);
        } else {
            break;
        }
    }

    let mut expected_shape = bounds.shape();
    if let Some(n_components) = n_components {
        expected_shape.push(n_components);
    }
    if payload.shape() != expected_shape.as_slice() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Box payload shape {:?} does not match box index bounds (expected {:?})",
                payload.shape(),
                expected_shape
            ),
        ));
    }
    Ok(payload)
}
