//! File input/output.

pub mod plotfile;
pub mod utils;

use indicatif::{ProgressBar, ProgressStyle};
use lazy_static::lazy_static;

/// Little- or big-endian byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

lazy_static! {
    static ref DEFAULT_PROGRESS_STYLE: ProgressStyle =
        ProgressStyle::with_template("Progress: {bar:40}  {percent}% | ETA: {eta}")
            .expect("Progress bar template must be valid");
}

/// Whether and how to report progress while reading.
#[derive(Clone, Copy, Debug)]
pub enum Verbosity {
    Quiet,
    Messages,
    Progress,
}

impl Verbosity {
    /// Whether non-critical status messages should be printed.
    pub fn print_messages(&self) -> bool {
        matches!(self, Self::Messages | Self::Progress)
    }

    /// Creates a progress bar for a task with the given number of steps.
    ///
    /// The bar is hidden unless progress reporting is requested.
    pub fn create_progress_bar(&self, n_steps: usize) -> ProgressBar {
        match self {
            Self::Progress => {
                let progress_bar = ProgressBar::new(n_steps as u64);
                progress_bar.set_style(DEFAULT_PROGRESS_STYLE.clone());
                progress_bar
            }
            _ => ProgressBar::hidden(),
        }
    }
}
