//! Dense field arrays and their grid metadata.

use crate::{
    geometry::Axis,
    grid::fgr,
    io::plotfile::fpa,
};
use ndarray::prelude::*;
use std::collections::HashMap;

/// Opaque attribute mapping carried along with a field for fidelity,
/// not interpreted by this crate.
pub type AttributeMap = HashMap<String, String>;

/// Metadata record describing the grid of an extracted field array.
///
/// The per-axis sequences are ordered like the dimensions of the
/// associated array and always have matching lengths, also after slicing.
#[derive(Clone, Debug)]
pub struct FieldMetaInformation {
    axes: Vec<Axis>,
    shape: Vec<usize>,
    grid_spacing: Vec<fgr>,
    global_offset: Vec<fgr>,
    grid_unit_si: fpa,
    position: Vec<fgr>,
    time: fpa,
    iteration: u64,
    component_attrs: AttributeMap,
    field_attrs: AttributeMap,
}

impl FieldMetaInformation {
    /// Creates a new metadata record for a field with the given axes,
    /// cell counts and physical grid geometry.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        axes: Vec<Axis>,
        shape: Vec<usize>,
        grid_spacing: Vec<fgr>,
        global_offset: Vec<fgr>,
        grid_unit_si: fpa,
        position: Vec<fgr>,
        time: fpa,
        iteration: u64,
        component_attrs: AttributeMap,
        field_attrs: AttributeMap,
    ) -> Self {
        assert!(
            axes.len() == shape.len()
                && axes.len() == grid_spacing.len()
                && axes.len() == global_offset.len(),
            "Number of axes, cell counts, spacings and offsets must be equal"
        );
        Self {
            axes,
            shape,
            grid_spacing,
            global_offset,
            grid_unit_si,
            position,
            time,
            iteration,
            component_attrs,
            field_attrs,
        }
    }

    /// Returns the ordered axis labels, matching the dimension order of the
    /// associated array.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Returns the number of cells along each retained axis.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the physical cell extent along each retained axis.
    pub fn grid_spacing(&self) -> &[fgr] {
        &self.grid_spacing
    }

    /// Returns the physical coordinate of the lower grid corner along each
    /// retained axis.
    pub fn global_offset(&self) -> &[fgr] {
        &self.global_offset
    }

    /// Returns the multiplier converting stored spacings and offsets to SI
    /// units (1.0 when the stored values are already physical).
    pub fn grid_unit_si(&self) -> fpa {
        self.grid_unit_si
    }

    /// Returns the fractional in-cell offset of the sample points along
    /// each axis.
    pub fn position(&self) -> &[fgr] {
        &self.position
    }

    /// Returns the simulation time of the snapshot in SI units.
    pub fn time(&self) -> fpa {
        self.time
    }

    /// Returns the iteration number of the snapshot.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Returns the pass-through attributes of the extracted component.
    pub fn component_attrs(&self) -> &AttributeMap {
        &self.component_attrs
    }

    /// Returns the pass-through attributes of the extracted field.
    pub fn field_attrs(&self) -> &AttributeMap {
        &self.field_attrs
    }

    /// Returns the physical coordinates of the cell sample points along the
    /// retained axis with the given positional index.
    pub fn axis_coords(&self, axis_idx: usize) -> Array1<fgr> {
        let offset = self.global_offset[axis_idx];
        let spacing = self.grid_spacing[axis_idx];
        let position = self.position.get(axis_idx).copied().unwrap_or(0.0);
        Array::from_iter(
            (0..self.shape[axis_idx]).map(|idx| offset + spacing * (idx as fgr + position)),
        )
    }

    /// Consumes the record and returns a version with the axes at the given
    /// positional indices removed from every per-axis sequence.
    ///
    /// The relative order of the remaining axes is preserved.
    pub fn sliced(self, sliced_axis_indices: &[usize]) -> Self {
        let retained = |idx: &usize| !sliced_axis_indices.contains(idx);

        let retain_in = |values: Vec<fgr>| {
            values
                .into_iter()
                .enumerate()
                .filter(|(idx, _)| retained(idx))
                .map(|(_, value)| value)
                .collect()
        };

        let axes = self
            .axes
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| retained(idx))
            .map(|(_, axis)| axis)
            .collect();
        let shape = self
            .shape
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| retained(idx))
            .map(|(_, size)| size)
            .collect();

        Self {
            axes,
            shape,
            grid_spacing: retain_in(self.grid_spacing),
            global_offset: retain_in(self.global_offset),
            grid_unit_si: self.grid_unit_si,
            position: self.position,
            time: self.time,
            iteration: self.iteration,
            component_attrs: self.component_attrs,
            field_attrs: self.field_attrs,
        }
    }
}
