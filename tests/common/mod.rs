//! Helpers for writing synthetic plotfiles to scan and read in tests.

use amrview::assembly::GridBox;
use byteorder::{LittleEndian, WriteBytesExt};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

/// Value of one field component at one global cell index.
pub type ValueFn<'a> = &'a dyn Fn(usize, &[i64]) -> f64;

/// Description of a synthetic plotfile snapshot.
pub struct PlotfileSpec<'a> {
    pub time: f64,
    pub prob_lo: Vec<f64>,
    pub cell_size: Vec<f64>,
    pub domain: GridBox,
    pub boxes: Vec<GridBox>,
    pub field_names: Vec<&'a str>,
    pub coord_sys: u8,
}

impl<'a> PlotfileSpec<'a> {
    /// A 2D snapshot with the domain `[0, 3] x [0, 3]` decomposed into
    /// three disjoint boxes.
    pub fn three_box_2d(time: f64, field_names: Vec<&'a str>) -> Self {
        Self {
            time,
            prob_lo: vec![0.0, -1.0],
            cell_size: vec![0.25, 0.5],
            domain: GridBox::new(vec![0, 0], vec![3, 3]),
            boxes: vec![
                GridBox::new(vec![0, 0], vec![1, 1]),
                GridBox::new(vec![2, 0], vec![3, 1]),
                GridBox::new(vec![0, 2], vec![3, 3]),
            ],
            field_names,
            coord_sys: 0,
        }
    }

    /// A 3D snapshot with a `4 x 3 x 2` domain split into two boxes along
    /// the x-axis.
    pub fn two_box_3d(time: f64, field_names: Vec<&'a str>) -> Self {
        Self {
            time,
            prob_lo: vec![0.0, 0.0, 0.0],
            cell_size: vec![0.5, 0.5, 0.5],
            domain: GridBox::new(vec![0, 0, 0], vec![3, 2, 1]),
            boxes: vec![
                GridBox::new(vec![0, 0, 0], vec![1, 2, 1]),
                GridBox::new(vec![2, 0, 0], vec![3, 2, 1]),
            ],
            field_names,
            coord_sys: 0,
        }
    }
}

/// Writes a snapshot directory in the native plotfile format.
pub fn write_plotfile(dir_path: &Path, spec: &PlotfileSpec, value_fn: ValueFn) -> PathBuf {
    let space_dim = spec.domain.ndim();
    let n_comp = spec.field_names.len();

    fs::create_dir_all(dir_path.join("Level_0")).unwrap();

    // FAB payloads, recording the byte offset of every FAB.
    let mut fab_bytes: Vec<u8> = Vec::new();
    let mut fab_offsets = Vec::with_capacity(spec.boxes.len());
    for bounds in &spec.boxes {
        fab_offsets.push(fab_bytes.len() as u64);
        write!(
            fab_bytes,
            "FAB ((8, (64 11 52 0 1 12 0 1023)),(8, (8 7 6 5 4 3 2 1))){} {}\n",
            box_token(bounds),
            n_comp
        )
        .unwrap();
        for comp in 0..n_comp {
            for cell in fortran_order_cells(bounds) {
                fab_bytes
                    .write_f64::<LittleEndian>(value_fn(comp, &cell))
                    .unwrap();
            }
        }
    }
    fs::write(dir_path.join("Level_0").join("Cell_D_00000"), &fab_bytes).unwrap();

    // Level header.
    let mut level_header = String::new();
    level_header.push_str("1\n1\n");
    level_header.push_str(&format!("{}\n0\n", n_comp));
    level_header.push_str(&format!("({} 0\n", spec.boxes.len()));
    for bounds in &spec.boxes {
        level_header.push_str(&format!("{}\n", box_token(bounds)));
    }
    level_header.push_str(")\n");
    level_header.push_str(&format!("{}\n", spec.boxes.len()));
    for offset in &fab_offsets {
        level_header.push_str(&format!("FabOnDisk: Cell_D_00000 {}\n", offset));
    }
    fs::write(dir_path.join("Level_0").join("Cell_H"), level_header).unwrap();

    // Root header.
    let mut header = String::new();
    header.push_str("HyperCLaw-V1.1\n");
    header.push_str(&format!("{}\n", n_comp));
    for name in &spec.field_names {
        header.push_str(&format!("{}\n", name));
    }
    header.push_str(&format!("{}\n", space_dim));
    header.push_str(&format!("{}\n", spec.time));
    header.push_str("0\n");
    header.push_str(&format!("{}\n", join_floats(&spec.prob_lo)));
    let prob_hi: Vec<f64> = (0..space_dim)
        .map(|axis| {
            spec.prob_lo[axis] + spec.domain.shape()[axis] as f64 * spec.cell_size[axis]
        })
        .collect();
    header.push_str(&format!("{}\n", join_floats(&prob_hi)));
    header.push('\n');
    header.push_str(&format!("{}\n", box_token(&spec.domain)));
    header.push_str("0\n");
    header.push_str(&format!("{}\n", join_floats(&spec.cell_size)));
    header.push_str(&format!("{}\n", spec.coord_sys));
    header.push_str("0\n");
    header.push_str(&format!("0 {} {}\n0\n", spec.boxes.len(), spec.time));
    for bounds in &spec.boxes {
        for axis in 0..space_dim {
            let lower = spec.prob_lo[axis] + bounds.small_end()[axis] as f64 * spec.cell_size[axis];
            let upper =
                spec.prob_lo[axis] + (bounds.big_end()[axis] + 1) as f64 * spec.cell_size[axis];
            header.push_str(&format!("{} {}\n", lower, upper));
        }
    }
    header.push_str("Level_0/Cell\n");
    fs::write(dir_path.join("Header"), header).unwrap();

    dir_path.to_path_buf()
}

fn box_token(bounds: &GridBox) -> String {
    let join = |values: &[i64]| {
        values
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(",")
    };
    let index_type = vec![0; bounds.ndim()];
    format!(
        "(({}) ({}) ({}))",
        join(bounds.small_end()),
        join(bounds.big_end()),
        join(&index_type)
    )
}

fn join_floats(values: &[f64]) -> String {
    values
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Yields the global cell indices of a box in column-major order, i.e. with
/// the first axis varying fastest.
fn fortran_order_cells(bounds: &GridBox) -> Vec<Vec<i64>> {
    let shape = bounds.shape();
    let n_cells: usize = shape.iter().product();
    let mut cells = Vec::with_capacity(n_cells);
    for mut flat_idx in 0..n_cells {
        let mut cell = Vec::with_capacity(shape.len());
        for (axis, &size) in shape.iter().enumerate() {
            cell.push(bounds.small_end()[axis] + (flat_idx % size) as i64);
            flat_idx /= size;
        }
        cells.push(cell);
    }
    cells
}
