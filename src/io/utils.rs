//! Utilities for input/output.

use super::Endianness;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::{
    fs,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};

/// Opens the file at the given path, appending the path to the error
/// message if the operation fails.
pub fn open_file_and_map_err<P: AsRef<Path>>(file_path: P) -> io::Result<fs::File> {
    let file_path = file_path.as_ref();
    fs::File::open(file_path).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("Could not open {}: {}", file_path.to_string_lossy(), err),
        )
    })
}

/// Reads and returns the content of the specified text file.
pub fn read_text_file<P: AsRef<Path>>(file_path: P) -> io::Result<String> {
    let file = open_file_and_map_err(file_path)?;
    let mut text = String::new();
    let _ = io::BufReader::new(file).read_to_string(&mut text)?;
    Ok(text)
}

/// Reads the specified number of 64-bit floats from the given byte offset
/// of an open binary file.
pub fn read_f64_from_binary_file(
    file: &mut fs::File,
    number_of_values: usize,
    byte_offset: u64,
    endianness: Endianness,
) -> io::Result<Vec<f64>> {
    file.seek(SeekFrom::Start(byte_offset))?;
    let mut buffer = vec![0.0; number_of_values];
    match endianness {
        Endianness::Little => file.read_f64_into::<LittleEndian>(&mut buffer)?,
        Endianness::Big => file.read_f64_into::<BigEndian>(&mut buffer)?,
    };
    Ok(buffer)
}

/// Reads the specified number of 32-bit floats from the given byte offset
/// of an open binary file.
pub fn read_f32_from_binary_file(
    file: &mut fs::File,
    number_of_values: usize,
    byte_offset: u64,
    endianness: Endianness,
) -> io::Result<Vec<f32>> {
    file.seek(SeekFrom::Start(byte_offset))?;
    let mut buffer = vec![0.0; number_of_values];
    match endianness {
        Endianness::Little => file.read_f32_into::<LittleEndian>(&mut buffer)?,
        Endianness::Big => file.read_f32_into::<BigEndian>(&mut buffer)?,
    };
    Ok(buffer)
}
