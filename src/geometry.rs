//! Geometric utility objects.

use std::{fmt, io, str::FromStr};

/// Denotes the x-, y- or z-axis of a Cartesian grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    /// Creates an array for iterating over the x-, y- and z-axes.
    pub fn slice() -> [Self; 3] {
        [Self::X, Self::Y, Self::Z]
    }

    /// Returns the ordered axis labels of a Cartesian grid with the given
    /// number of spatial dimensions.
    pub fn labels_for_dim(n_dims: usize) -> Option<&'static [Self]> {
        match n_dims {
            1 => Some(&[Self::X]),
            2 => Some(&[Self::X, Self::Y]),
            3 => Some(&[Self::X, Self::Y, Self::Z]),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::X => "x",
                Self::Y => "y",
                Self::Z => "z",
            }
        )
    }
}

impl FromStr for Axis {
    type Err = io::Error;

    fn from_str(label: &str) -> io::Result<Self> {
        match label {
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            "z" => Ok(Self::Z),
            invalid => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid axis label {} (valid labels are: x, y, z)", invalid),
            )),
        }
    }
}

/// Joins the given items into the newline-and-dash separated list format
/// used when enumerating valid alternatives in error messages.
pub fn format_alternatives<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    items
        .into_iter()
        .map(|item| format!(" - {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}
