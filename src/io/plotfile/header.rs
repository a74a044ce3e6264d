//! Parsing of the text headers describing a plotfile and its levels.

use super::{fpa, CoordinateSystem};
use crate::{assembly::GridBox, grid::fgr, io::Endianness};
use lazy_static::lazy_static;
use regex::Regex;
use std::{io, str::FromStr};

/// Contents of the root `Header` file of a plotfile.
#[derive(Clone, Debug)]
pub struct PlotfileHeader {
    version: String,
    field_names: Vec<String>,
    space_dim: usize,
    time: fpa,
    finest_level: usize,
    prob_lo: Vec<fgr>,
    prob_hi: Vec<fgr>,
    prob_domain: Vec<GridBox>,
    cell_size: Vec<Vec<fgr>>,
    coord_sys: CoordinateSystem,
    level_paths: Vec<String>,
}

impl PlotfileHeader {
    /// Returns the format version string of the plotfile.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the names of the field components stored in the plotfile.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Returns the number of field components stored in the plotfile.
    pub fn n_comp(&self) -> usize {
        self.field_names.len()
    }

    /// Returns the number of spatial dimensions of the grid.
    pub fn space_dim(&self) -> usize {
        self.space_dim
    }

    /// Returns the simulation time of the snapshot in SI units.
    pub fn time(&self) -> fpa {
        self.time
    }

    /// Returns the index of the finest refinement level.
    pub fn finest_level(&self) -> usize {
        self.finest_level
    }

    /// Returns the physical coordinates of the lower corner of the domain.
    pub fn prob_lo(&self) -> &[fgr] {
        &self.prob_lo
    }

    /// Returns the physical coordinates of the upper corner of the domain.
    pub fn prob_hi(&self) -> &[fgr] {
        &self.prob_hi
    }

    /// Returns the index bounds of the problem domain at the given level.
    pub fn prob_domain(&self, level: usize) -> &GridBox {
        &self.prob_domain[level]
    }

    /// Returns the physical cell extents at the given level.
    pub fn cell_size(&self, level: usize) -> &[fgr] {
        &self.cell_size[level]
    }

    /// Returns the coordinate system of the grid.
    pub fn coord_sys(&self) -> CoordinateSystem {
        self.coord_sys
    }

    /// Returns the path of the given level's data files, relative to the
    /// plotfile directory and excluding the `_H`/`_D` suffixes.
    pub fn level_path(&self, level: usize) -> &str {
        &self.level_paths[level]
    }
}

/// Location of one FAB within the binary data files of a level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FabOnDisk {
    pub file_name: String,
    pub byte_offset: u64,
}

/// Contents of the `_H` header file of one level's data.
#[derive(Clone, Debug)]
pub struct LevelHeader {
    n_comp: usize,
    n_grow: usize,
    boxes: Vec<GridBox>,
    fabs_on_disk: Vec<FabOnDisk>,
}

impl LevelHeader {
    /// Returns the number of field components stored per FAB.
    pub fn n_comp(&self) -> usize {
        self.n_comp
    }

    /// Returns the number of grow cells surrounding each box.
    pub fn n_grow(&self) -> usize {
        self.n_grow
    }

    /// Returns the index bounds of the sub-boxes of the level.
    pub fn boxes(&self) -> &[GridBox] {
        &self.boxes
    }

    /// Returns the on-disk locations of the FABs, in box order.
    pub fn fabs_on_disk(&self) -> &[FabOnDisk] {
        &self.fabs_on_disk
    }
}

/// Binary layout of one FAB, decoded from its ASCII header line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FabHeader {
    pub real_bytes: usize,
    pub endianness: Endianness,
    pub bounds: GridBox,
    pub n_comp: usize,
}

lazy_static! {
    static ref BOX_TOKEN_REGEX: Regex =
        Regex::new(r"\(\(([\-0-9,]+)\)\s*\(([\-0-9,]+)\)(?:\s*\(([\-0-9,]+)\))?\)").unwrap();
    static ref FAB_DESCRIPTOR_REGEX: Regex =
        Regex::new(r"^FAB \(\((\d+), \([^)]*\)\),\((\d+), \(([^)]*)\)\)\)").unwrap();
    static ref FAB_ON_DISK_REGEX: Regex = Regex::new(r"^FabOnDisk:\s+(\S+)\s+(\d+)\s*$").unwrap();
}

struct HeaderLines<'a> {
    lines: std::str::Lines<'a>,
    file_description: &'static str,
}

impl<'a> HeaderLines<'a> {
    fn new(text: &'a str, file_description: &'static str) -> Self {
        Self {
            lines: text.lines(),
            file_description,
        }
    }

    fn next_line(&mut self, description: &str) -> io::Result<&'a str> {
        self.lines.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} not found in {}", description, self.file_description),
            )
        })
    }

    fn parse_next<T>(&mut self, description: &str) -> io::Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let line = self.next_line(description)?;
        parse_value(line.trim(), self.file_description)
    }

    fn parse_next_sequence<T>(&mut self, description: &str, length: usize) -> io::Result<Vec<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let line = self.next_line(description)?;
        let values = line
            .split_whitespace()
            .map(|s| parse_value(s, self.file_description))
            .collect::<io::Result<Vec<T>>>()?;
        if values.len() != length {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Inconsistent number of values for {} in {} (expected {}, found {})",
                    description,
                    self.file_description,
                    length,
                    values.len()
                ),
            ));
        }
        Ok(values)
    }

    fn skip_line(&mut self, description: &str) -> io::Result<()> {
        self.next_line(description).map(|_| ())
    }
}

fn parse_value<T>(s: &str, file_description: &str) -> io::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    s.parse::<T>().map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed parsing string `{}` in {}: {}", s, file_description, err),
        )
    })
}

fn parse_index_tuple(s: &str, file_description: &str) -> io::Result<Vec<i64>> {
    s.split(',')
        .map(|part| parse_value(part.trim(), file_description))
        .collect()
}

/// Parses a `((lo) (hi) (type))` box token into its index bounds.
///
/// The trailing index type tuple is optional and ignored.
pub fn parse_box_token(token: &str, file_description: &str) -> io::Result<GridBox> {
    let caps = BOX_TOKEN_REGEX.captures(token).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Invalid box token `{}` in {}", token.trim(), file_description),
        )
    })?;
    let small_end = parse_index_tuple(&caps[1], file_description)?;
    let big_end = parse_index_tuple(&caps[2], file_description)?;
    if small_end.len() != big_end.len()
        || small_end
            .iter()
            .zip(big_end.iter())
            .any(|(&small, &big)| big < small)
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Inconsistent box bounds `{}` in {}", token.trim(), file_description),
        ));
    }
    Ok(GridBox::new(small_end, big_end))
}

/// Parses the content of the root `Header` file of a plotfile.
pub fn parse_plotfile_header(text: &str) -> io::Result<PlotfileHeader> {
    let file_description = "plotfile header";
    let mut lines = HeaderLines::new(text, file_description);

    let version = lines.next_line("Version string")?.trim().to_string();
    let n_comp: usize = lines.parse_next("Number of components")?;

    let mut field_names = Vec::with_capacity(n_comp);
    for _ in 0..n_comp {
        field_names.push(lines.next_line("Component name")?.trim().to_string());
    }

    let space_dim: usize = lines.parse_next("Number of spatial dimensions")?;
    let time: fpa = lines.parse_next("Time")?;
    let finest_level: usize = lines.parse_next("Finest level")?;
    let n_levels = finest_level + 1;

    let prob_lo = lines.parse_next_sequence("Lower domain corner", space_dim)?;
    let prob_hi = lines.parse_next_sequence("Upper domain corner", space_dim)?;
    lines.skip_line("Refinement ratios")?;

    let domain_line = lines.next_line("Problem domain boxes")?;
    let prob_domain = BOX_TOKEN_REGEX
        .find_iter(domain_line)
        .map(|token| parse_box_token(token.as_str(), file_description))
        .collect::<io::Result<Vec<_>>>()?;
    if prob_domain.len() != n_levels {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Inconsistent number of problem domain boxes in {} (expected {}, found {})",
                file_description,
                n_levels,
                prob_domain.len()
            ),
        ));
    }
    if prob_domain[0].ndim() != space_dim {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Problem domain dimensionality in {} does not match the declared {} spatial dimensions",
                file_description, space_dim
            ),
        ));
    }

    lines.skip_line("Level steps")?;

    let mut cell_size = Vec::with_capacity(n_levels);
    for _ in 0..n_levels {
        cell_size.push(lines.parse_next_sequence("Cell sizes", space_dim)?);
    }

    let coord_sys = CoordinateSystem::from_tag(lines.parse_next("Coordinate system tag")?)?;
    lines.skip_line("Boundary width")?;

    let mut level_paths = Vec::with_capacity(n_levels);
    for _ in 0..n_levels {
        let block_header = lines.parse_next_sequence::<fpa>("Level block header", 3)?;
        let n_boxes = block_header[1] as usize;
        lines.skip_line("Level step count")?;
        for _ in 0..n_boxes * space_dim {
            lines.skip_line("Physical box bounds")?;
        }
        level_paths.push(lines.next_line("Level data path")?.trim().to_string());
    }

    Ok(PlotfileHeader {
        version,
        field_names,
        space_dim,
        time,
        finest_level,
        prob_lo,
        prob_hi,
        prob_domain,
        cell_size,
        coord_sys,
        level_paths,
    })
}

/// Parses the content of the `_H` header file of one level's data.
pub fn parse_level_header(text: &str) -> io::Result<LevelHeader> {
    let file_description = "level header";
    let mut lines = HeaderLines::new(text, file_description);

    lines.skip_line("Version")?;
    lines.skip_line("Ordering")?;
    let n_comp: usize = lines.parse_next("Number of components")?;
    let n_grow: usize = lines.parse_next("Number of grow cells")?;

    let box_array_header = lines.next_line("Box array header")?;
    let n_boxes: usize = parse_value(
        box_array_header
            .trim()
            .trim_start_matches('(')
            .split_whitespace()
            .next()
            .unwrap_or(""),
        file_description,
    )?;

    let mut boxes = Vec::with_capacity(n_boxes);
    for _ in 0..n_boxes {
        let token = lines.next_line("Box bounds")?;
        boxes.push(parse_box_token(token, file_description)?);
    }
    lines.skip_line("Box array terminator")?;

    let n_fabs: usize = lines.parse_next("Number of FabOnDisk entries")?;
    if n_fabs != n_boxes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Inconsistent number of FabOnDisk entries in {} (expected {}, found {})",
                file_description, n_boxes, n_fabs
            ),
        ));
    }

    let mut fabs_on_disk = Vec::with_capacity(n_fabs);
    for _ in 0..n_fabs {
        let line = lines.next_line("FabOnDisk entry")?;
        let caps = FAB_ON_DISK_REGEX.captures(line.trim()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid FabOnDisk entry `{}` in {}", line.trim(), file_description),
            )
        })?;
        fabs_on_disk.push(FabOnDisk {
            file_name: caps[1].to_string(),
            byte_offset: parse_value(&caps[2], file_description)?,
        });
    }

    Ok(LevelHeader {
        n_comp,
        n_grow,
        boxes,
        fabs_on_disk,
    })
}

/// Parses the ASCII header line of one FAB.
///
/// The byte order of the payload is decoded from the ordinal list of the
/// second descriptor tuple (ascending ordinals denote big endian).
pub fn parse_fab_header(line: &str) -> io::Result<FabHeader> {
    let file_description = "FAB header";
    let caps = FAB_DESCRIPTOR_REGEX.captures(line).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Invalid FAB descriptor in `{}`", line.trim()),
        )
    })?;

    let real_bytes: usize = parse_value(&caps[2], file_description)?;
    if real_bytes != 4 && real_bytes != 8 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Unsupported FAB real size of {} bytes", real_bytes),
        ));
    }

    let endianness = match caps[3].split_whitespace().next() {
        Some("1") => Endianness::Big,
        Some(_) => Endianness::Little,
        None => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Missing byte order in FAB descriptor `{}`", line.trim()),
            ))
        }
    };

    let remainder = &line[caps.get(0).unwrap().end()..];
    let bounds_token = BOX_TOKEN_REGEX.find(remainder).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Missing box bounds in FAB header `{}`", line.trim()),
        )
    })?;
    let bounds = parse_box_token(bounds_token.as_str(), file_description)?;

    let n_comp: usize = parse_value(
        remainder[bounds_token.end()..].trim(),
        file_description,
    )?;

    Ok(FabHeader {
        real_bytes,
        endianness,
        bounds,
        n_comp,
    })
}

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_abs_diff_eq;

    const HEADER_TEXT: &str = "\
HyperCLaw-V1.1
2
density
pressure
2
0.0015
0
0 -1
1 1

((0,0) (3,3) (0,0))
120
0.25 0.5
0
0
0 2 0.0015
120
0 1
-1 1
0 1
-1 1
Level_0/Cell
";

    const LEVEL_HEADER_TEXT: &str = "\
1
1
2
0
(3 0
((0,0) (1,1) (0,0))
((2,0) (3,1) (0,0))
((0,2) (3,3) (0,0))
)
3
FabOnDisk: Cell_D_00000 0
FabOnDisk: Cell_D_00000 212
FabOnDisk: Cell_D_00001 0

3,2
0.0,0.0
1.0,1.0
2.0,2.0
3,2
0.0,0.0
1.0,1.0
2.0,2.0
";

    #[test]
    fn plotfile_header_parsing_works() {
        let header = parse_plotfile_header(HEADER_TEXT).unwrap();
        assert_eq!(header.version(), "HyperCLaw-V1.1");
        assert_eq!(header.field_names(), &["density", "pressure"]);
        assert_eq!(header.n_comp(), 2);
        assert_eq!(header.space_dim(), 2);
        assert_abs_diff_eq!(header.time(), 0.0015);
        assert_eq!(header.finest_level(), 0);
        assert_abs_diff_eq!(header.prob_lo()[1], -1.0);
        assert_abs_diff_eq!(header.prob_hi()[0], 1.0);
        assert_eq!(header.prob_domain(0), &GridBox::new(vec![0, 0], vec![3, 3]));
        assert_abs_diff_eq!(header.cell_size(0)[1], 0.5);
        assert_eq!(header.coord_sys(), CoordinateSystem::Cartesian);
        assert_eq!(header.level_path(0), "Level_0/Cell");
    }

    #[test]
    fn non_cartesian_coordinate_systems_are_recognized() {
        let text = HEADER_TEXT.replace("0.25 0.5\n0\n0\n", "0.25 0.5\n1\n0\n");
        let header = parse_plotfile_header(&text).unwrap();
        assert_eq!(header.coord_sys(), CoordinateSystem::Cylindrical);
    }

    #[test]
    fn level_header_parsing_works() {
        let header = parse_level_header(LEVEL_HEADER_TEXT).unwrap();
        assert_eq!(header.n_comp(), 2);
        assert_eq!(header.n_grow(), 0);
        assert_eq!(header.boxes().len(), 3);
        assert_eq!(
            header.boxes()[1],
            GridBox::new(vec![2, 0], vec![3, 1])
        );
        assert_eq!(
            header.fabs_on_disk()[1],
            FabOnDisk {
                file_name: "Cell_D_00000".to_string(),
                byte_offset: 212,
            }
        );
    }

    #[test]
    fn fab_header_parsing_works() {
        let little_f64 = "FAB ((8, (64 11 52 0 1 12 0 1023)),(8, (8 7 6 5 4 3 2 1)))((0,0) (1,1) (0,0)) 2";
        let header = parse_fab_header(little_f64).unwrap();
        assert_eq!(header.real_bytes, 8);
        assert_eq!(header.endianness, Endianness::Little);
        assert_eq!(header.bounds, GridBox::new(vec![0, 0], vec![1, 1]));
        assert_eq!(header.n_comp, 2);

        let big_f32 = "FAB ((4, (32 8 23 0 1 9 0 127)),(4, (1 2 3 4)))((0,0,0) (7,7,7) (0,0,0)) 1";
        let header = parse_fab_header(big_f32).unwrap();
        assert_eq!(header.real_bytes, 4);
        assert_eq!(header.endianness, Endianness::Big);
        assert_eq!(header.n_comp, 1);
    }

    #[test]
    fn malformed_headers_fail_with_context() {
        let err = parse_plotfile_header("HyperCLaw-V1.1\nnot-a-number\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("plotfile header"));
    }
}
