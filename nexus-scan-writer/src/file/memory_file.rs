use super::{
    FileOptions, NexusFileInterface,
    hdf5_handlers::{ConvertResult, NexusHDF5Error, NexusHDF5Result},
};
use crate::tree::{NexusTree, NexusValue, PendingField};
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    path::{Path, PathBuf},
};

thread_local! {
    // Tests run on their own threads, so closed files never leak between tests.
    static CLOSED_FILES: RefCell<HashMap<PathBuf, NexusTree>> = RefCell::new(HashMap::new());
}

/// Keeps the tree in memory and records what would have been written to disk.
pub(crate) struct NexusMemoryFile {
    path: PathBuf,
    tree: NexusTree,
    options: FileOptions,
    open: bool,
    flushes: Cell<usize>,
}

impl NexusMemoryFile {
    /// Returns the tree of the file most recently closed at `path` on this thread.
    pub(crate) fn closed(path: &Path) -> Option<NexusTree> {
        CLOSED_FILES.with(|files| files.borrow().get(path).cloned())
    }

    pub(crate) fn tree(&self) -> &NexusTree {
        &self.tree
    }

    pub(crate) fn options(&self) -> &FileOptions {
        &self.options
    }

    pub(crate) fn flushes(&self) -> usize {
        self.flushes.get()
    }
}

impl NexusFileInterface for NexusMemoryFile {
    fn create(file_path: &Path, tree: &NexusTree, options: &FileOptions) -> NexusHDF5Result<Self> {
        Ok(Self {
            path: file_path.to_owned(),
            tree: tree.clone(),
            options: *options,
            open: false,
            flushes: Cell::new(0),
        })
    }

    fn open_to_write(&mut self) -> NexusHDF5Result<()> {
        self.open = true;
        Ok(())
    }

    fn commit(&mut self, field: &PendingField, value: &NexusValue) -> NexusHDF5Result<()> {
        if !self.open {
            return Err(NexusHDF5Error::file_not_open()).err_path(field.path());
        }
        self.tree
            .commit(field, value.clone())
            .err_path(field.path())
    }

    fn flush(&self) -> NexusHDF5Result<()> {
        if !self.open {
            return Err(NexusHDF5Error::file_not_open());
        }
        self.flushes.set(self.flushes.get() + 1);
        Ok(())
    }

    fn close(self) -> NexusHDF5Result<()> {
        CLOSED_FILES.with(|files| files.borrow_mut().insert(self.path, self.tree));
        Ok(())
    }
}
