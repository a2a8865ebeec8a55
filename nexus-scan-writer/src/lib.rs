//! Assembles NeXus scan files: the groups of every device taking part in a scan,
//! the NXdata groups tying signals to scan axes, and the start, end and duration
//! of the scan.
//!
//! A [NexusScanFile] is created from a [ScanModel], builds its in-memory tree, and
//! persists it through a [NexusFileInterface], usually a [NexusHdf5File].
mod builder;
pub mod description;
pub mod device;
pub mod error;
pub mod file;
pub mod model;
pub mod nexus;
mod scan_file;
pub mod template;
#[cfg(test)]
mod test_utils;
pub mod tree;
pub mod validation;

pub use builder::{
    Clock, DefaultDataGroupSelector, FirstDataGroupSelector, ScanTimestamps, SystemClock,
    format_timestamp,
};
pub use error::{NexusScanError, NexusScanResult};
pub use file::{FileOptions, NexusFileInterface, NexusHdf5File};
pub use model::ScanModel;
pub use scan_file::NexusScanFile;
