//! Defines the [NexusFileInterface] trait which allows the [NexusScanFile] lifecycle
//! controller to persist the assembled tree via dependency injection.
//!
//! Both the [NexusHdf5File] struct and the [NexusMemoryFile] mock struct implement this,
//! which allows scan files to be tested with or without actual hdf5 file interactions.
//!
//! [NexusScanFile]: crate::NexusScanFile
mod hdf5_file;
pub(crate) mod hdf5_handlers;
#[cfg(test)]
mod memory_file;

pub use hdf5_file::NexusHdf5File;
pub use hdf5_handlers::{NexusHDF5Error, NexusHDF5Result};
#[cfg(test)]
pub(crate) use memory_file::NexusMemoryFile;

use crate::tree::{NexusTree, NexusValue, PendingField};
use std::path::Path;

/// How the underlying file should be instantiated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileOptions {
    /// Write the tree to disk off the calling thread.
    pub async_write: bool,
    /// Write the file in the latest format and switch it to single-writer
    /// multiple-reader mode once the tree is written, so that readers can open it
    /// while the scan runs.
    pub use_swmr: bool,
}

/// Implementation should persist a [NexusTree] and allow its pending fields to be
/// written once the scan ends.
pub trait NexusFileInterface: Sized {
    /// Creates a new NeXus file at `file_path` containing `tree`.
    /// Lazy fields become unpopulated datasets of the reserved type and shape.
    /// # Parameters
    /// - file_path: path at which to create the file.
    /// - tree: the fully assembled tree.
    /// - options: asynchronous instantiation and SWMR settings.
    fn create(file_path: &Path, tree: &NexusTree, options: &FileOptions) -> NexusHDF5Result<Self>;

    /// Opens the created file for writing, in SWMR write mode if asked. With
    /// asynchronous instantiation this blocks until the file has been created.
    fn open_to_write(&mut self) -> NexusHDF5Result<()>;

    /// Writes the value of a field reserved when the tree was built.
    fn commit(&mut self, field: &PendingField, value: &NexusValue) -> NexusHDF5Result<()>;

    /// Flushes pending writes to disk.
    fn flush(&self) -> NexusHDF5Result<()>;

    /// Takes ownership and closes the file.
    fn close(self) -> NexusHDF5Result<()>;
}
