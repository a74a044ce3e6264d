//! Reading of plotfile data in the native AMReX on-disk format.

use super::{
    fdt, fpa,
    header::{self, FabOnDisk, LevelHeader, PlotfileHeader},
    CoordinateSystem, FieldGeometry, FieldMetadata, FieldType, PlotfileParams,
};
use crate::{
    assembly::{self, BoxData, GridBox, SlicePlane},
    backend::PlotfileBackend,
    field::{AttributeMap, FieldMetaInformation},
    geometry::{format_alternatives, Axis},
    grid::{self, GridRanges, GridSizes},
    io::{utils, Verbosity},
};
use indicatif::ParallelProgressIterator;
use ndarray::prelude::*;
use rayon::prelude::*;
use std::{
    collections::HashMap,
    io::{self, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

/// The base refinement level, the only level read by this crate.
pub const BASE_LEVEL: usize = 0;

/// Name of the root header file of a plotfile directory.
const HEADER_FILE_NAME: &str = "Header";

/// Maximum length of the ASCII header line preceding a FAB payload.
const MAX_FAB_HEADER_LENGTH: u64 = 1024;

/// Open handle on the header data of a single plotfile snapshot.
///
/// Opening only parses the root header; the per-level headers and box
/// payloads are read on demand and every payload read uses its own file
/// handle, released before the read returns.
#[derive(Clone, Debug)]
pub struct PlotfileData {
    dir_path: PathBuf,
    header: PlotfileHeader,
}

impl PlotfileData {
    /// Opens the plotfile directory at the given path and parses its root
    /// header.
    pub fn open<P: AsRef<Path>>(dir_path: P) -> io::Result<Self> {
        let dir_path = dir_path.as_ref().to_path_buf();
        let header_text = utils::read_text_file(dir_path.join(HEADER_FILE_NAME))?;
        let header = header::parse_plotfile_header(&header_text)?;
        Ok(Self { dir_path, header })
    }

    /// Returns the parsed root header of the plotfile.
    pub fn header(&self) -> &PlotfileHeader {
        &self.header
    }

    /// Returns the simulation time of the snapshot in SI units.
    pub fn time(&self) -> fpa {
        self.header.time()
    }

    /// Returns the component index of the field with the given name, or an
    /// error enumerating the available fields.
    pub fn field_component_index(&self, field: &str) -> io::Result<usize> {
        self.header
            .field_names()
            .iter()
            .position(|name| name == field)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!(
                        "The field {} is not available\nThe available fields are:\n{}",
                        field,
                        format_alternatives(self.header.field_names())
                    ),
                )
            })
    }

    /// Reads the payloads of the sub-boxes of the given level, restricted
    /// to one component when a component index is given.
    ///
    /// Boxes that do not intersect every given slice plane are skipped
    /// without reading their payloads. The payloads of the remaining boxes
    /// are read concurrently.
    pub fn read_boxes(
        &self,
        level: usize,
        component: Option<usize>,
        slices: &[SlicePlane],
        verbosity: Verbosity,
    ) -> io::Result<Vec<BoxData<fdt>>> {
        let level_header = self.read_level_header(level)?;
        let domain = self.header.prob_domain(level);

        let entries: Vec<(&GridBox, &FabOnDisk)> = level_header
            .boxes()
            .iter()
            .zip(level_header.fabs_on_disk())
            .filter(|&(bounds, _)| assembly::box_intersects_slices(domain, bounds, slices))
            .collect();

        let progress_bar = verbosity.create_progress_bar(entries.len());
        entries
            .into_par_iter()
            .progress_with(progress_bar)
            .map(|(bounds, fab)| self.read_fab(level, bounds, fab, component))
            .collect()
    }

    fn read_level_header(&self, level: usize) -> io::Result<LevelHeader> {
        let header_path = self
            .dir_path
            .join(format!("{}_H", self.header.level_path(level)));
        let level_header = header::parse_level_header(&utils::read_text_file(&header_path)?)?;
        if level_header.n_grow() != 0 {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "Plotfiles with grow cells are not supported",
            ));
        }
        Ok(level_header)
    }

    fn level_file_dir(&self, level: usize) -> PathBuf {
        match Path::new(self.header.level_path(level)).parent() {
            Some(parent) => self.dir_path.join(parent),
            None => self.dir_path.clone(),
        }
    }

    fn read_fab(
        &self,
        level: usize,
        bounds: &GridBox,
        fab: &FabOnDisk,
        component: Option<usize>,
    ) -> io::Result<BoxData<fdt>> {
        let file_path = self.level_file_dir(level).join(&fab.file_name);
        let mut file = utils::open_file_and_map_err(&file_path)?;

        file.seek(SeekFrom::Start(fab.byte_offset))?;
        let mut chunk = Vec::new();
        let _ = file
            .by_ref()
            .take(MAX_FAB_HEADER_LENGTH)
            .read_to_end(&mut chunk)?;
        let header_length = chunk.iter().position(|&byte| byte == b'\n').ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Missing FAB header line at byte offset {} of {}",
                    fab.byte_offset,
                    file_path.to_string_lossy()
                ),
            )
        })?;
        let fab_header = header::parse_fab_header(&String::from_utf8_lossy(&chunk[..header_length]))?;

        if fab_header.bounds != *bounds {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "FAB box bounds in {} do not match the level header",
                    file_path.to_string_lossy()
                ),
            ));
        }

        let shape = bounds.shape();
        let number_of_cells: usize = shape.iter().product();
        let data_offset = fab.byte_offset + header_length as u64 + 1;

        let (value_count, byte_offset, values_shape) = match component {
            Some(component) => {
                if component >= fab_header.n_comp {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "Component index {} out of range for FAB with {} components",
                            component, fab_header.n_comp
                        ),
                    ));
                }
                (
                    number_of_cells,
                    data_offset
                        + (component * number_of_cells * fab_header.real_bytes) as u64,
                    shape.clone(),
                )
            }
            None => {
                let mut values_shape = shape.clone();
                values_shape.push(fab_header.n_comp);
                (number_of_cells * fab_header.n_comp, data_offset, values_shape)
            }
        };

        let buffer = match fab_header.real_bytes {
            8 => utils::read_f64_from_binary_file(
                &mut file,
                value_count,
                byte_offset,
                fab_header.endianness,
            )?,
            _ => utils::read_f32_from_binary_file(
                &mut file,
                value_count,
                byte_offset,
                fab_header.endianness,
            )?
            .into_iter()
            .map(fdt::from)
            .collect(),
        };

        // FAB payloads are column-major per component, with the component
        // slabs stored consecutively, i.e. Fortran order over shape + [comp].
        let values = Array::from_shape_vec(IxDyn(&values_shape).f(), buffer).unwrap();

        Ok(BoxData {
            bounds: bounds.clone(),
            values,
        })
    }
}

/// Backend reading plotfiles in the native AMReX on-disk format.
#[derive(Clone, Debug)]
pub struct NativeBackend {
    verbosity: Verbosity,
}

impl NativeBackend {
    /// Creates a native plotfile backend.
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

impl PlotfileBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn list_files(&self, dir_path: &Path) -> io::Result<(Vec<u64>, HashMap<u64, PathBuf>)> {
        super::list_plotfiles(dir_path)
    }

    fn read_params(
        &self,
        file_path: &Path,
        extract_parameters: bool,
    ) -> io::Result<(fpa, Option<PlotfileParams>)> {
        let data = PlotfileData::open(file_path)?;
        let time = data.time();

        if !extract_parameters {
            return Ok((time, None));
        }

        let header = data.header();
        if header.coord_sys() != CoordinateSystem::Cartesian {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!(
                    "Unsupported coordinate system {} in {} (only Cartesian plotfiles are supported)",
                    header.coord_sys(),
                    file_path.to_string_lossy()
                ),
            ));
        }

        let mut params = PlotfileParams::default();
        if header.n_comp() > 0 {
            let geometry = FieldGeometry::for_cartesian_dim(header.space_dim())?;
            let axis_labels = geometry
                .axis_labels()
                .expect("Cartesian geometries always carry axis labels")
                .to_vec();

            let mut fields_metadata = HashMap::new();
            for field_name in header.field_names() {
                fields_metadata.insert(
                    field_name.clone(),
                    FieldMetadata {
                        geometry,
                        field_type: FieldType::Scalar,
                        axis_labels: axis_labels.clone(),
                        avail_components: Vec::new(),
                        avail_circ_modes: Vec::new(),
                    },
                );
            }
            params.avail_fields = Some(header.field_names().to_vec());
            params.fields_metadata = fields_metadata;
        }

        Ok((time, Some(params)))
    }

    fn read_field_cartesian(
        &self,
        file_path: &Path,
        iteration: u64,
        field: &str,
        coord: Option<&str>,
        axis_labels: &[Axis],
        slice_relative_position: &[f64],
        slice_across: &[Axis],
    ) -> io::Result<(ArrayD<fdt>, FieldMetaInformation)> {
        // Native plotfile fields are scalar components, so the vector
        // component argument has no effect here.
        let _ = coord;

        if slice_across.len() != slice_relative_position.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "The slice_relative_position argument must have the same number of elements \
                 as slice_across",
            ));
        }

        let data = PlotfileData::open(file_path)?;
        let header = data.header();

        if axis_labels.len() != header.space_dim() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "The {} given axis labels do not match the {} spatial dimensions of {}",
                    axis_labels.len(),
                    header.space_dim(),
                    file_path.to_string_lossy()
                ),
            ));
        }

        let domain = header.prob_domain(BASE_LEVEL).clone();
        let domain_shape = domain.shape();
        let grid_spacing = header.cell_size(BASE_LEVEL).to_vec();
        let global_offset = header.prob_lo().to_vec();
        let position = vec![0.0; header.space_dim()];
        let time = data.time();
        let component = data.field_component_index(field)?;

        if self.verbosity.print_messages() {
            println!(
                "Reading {} from {}",
                field,
                file_path.to_string_lossy()
            );
        }

        let mut slices = Vec::with_capacity(slice_across.len());
        let mut sliced_axis_indices = Vec::with_capacity(slice_across.len());
        for (&axis, &relative_position) in slice_across.iter().zip(slice_relative_position) {
            let axis_idx = axis_labels
                .iter()
                .position(|&label| label == axis)
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!(
                            "The slice_across argument is erroneous: contains {}\n\
                             The available axes are:\n{}",
                            axis,
                            format_alternatives(axis_labels)
                        ),
                    )
                })?;
            slices.push(SlicePlane {
                axis: axis_idx,
                cell_index: assembly::slice_cell_index(relative_position, domain_shape[axis_idx]),
            });
            sliced_axis_indices.push(axis_idx);
        }

        let boxes = data.read_boxes(BASE_LEVEL, Some(component), &slices, self.verbosity)?;
        let values = if slices.is_empty() {
            assembly::assemble_dense(&domain, boxes, None)?
        } else {
            assembly::assemble_sliced(&domain, boxes, None, &slices)?
        };

        let meta = FieldMetaInformation::new(
            axis_labels.to_vec(),
            domain_shape,
            grid_spacing,
            global_offset,
            1.0,
            position,
            time,
            iteration,
            AttributeMap::new(),
            AttributeMap::new(),
        )
        .sliced(&sliced_axis_indices);

        Ok((values, meta))
    }

    fn read_grid_parameters(
        &self,
        file_path: &Path,
        avail_fields: &[String],
        fields_metadata: &HashMap<String, FieldMetadata>,
    ) -> io::Result<(GridSizes, GridRanges)> {
        let reference_field = grid::select_reference_field(avail_fields, fields_metadata)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!(
                        "No fields with grid metadata are available in {}",
                        file_path.to_string_lossy()
                    ),
                )
            })?;
        let axis_labels = &fields_metadata[reference_field].axis_labels;

        let data = PlotfileData::open(file_path)?;
        let header = data.header();
        let sizes = header.prob_domain(BASE_LEVEL).shape();

        if axis_labels.len() != sizes.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "The axis labels of field {} do not match the dimensionality of {}",
                    reference_field,
                    file_path.to_string_lossy()
                ),
            ));
        }

        Ok(grid::grid_parameters(
            axis_labels,
            &sizes,
            header.cell_size(BASE_LEVEL),
            header.prob_lo(),
        ))
    }
}
