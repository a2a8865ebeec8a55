use super::{
    FileOptions, NexusFileInterface,
    hdf5_handlers::{
        ConvertResult, DatasetExt, GroupExt, HasAttributesExt, NexusHDF5Error, NexusHDF5Result,
    },
};
use crate::{
    nexus::labels,
    tree::{FieldData, NexusGroupNode, NexusNode, NexusTree, NexusValue, PendingField, join_path},
};
use hdf5::{File, FileBuilder, Group};
use hdf5_sys::h5f::H5Fstart_swmr_write;
use std::{
    mem,
    path::{Path, PathBuf},
    thread::{self, JoinHandle},
};
use tracing::{debug, info};

const HDF5_VERSION: &str = "HDF5_version";

/// A hard link waiting for its target to be written.
struct DeferredLink {
    parent: String,
    name: String,
    target: String,
}

enum FileState {
    /// The tree is being written on a background thread.
    Instantiating(JoinHandle<NexusHDF5Result<()>>),
    /// The tree has been written and the file closed.
    Created,
    Open(File),
}

/// Persists a [NexusTree] as an hdf5 file.
pub struct NexusHdf5File {
    path: PathBuf,
    options: FileOptions,
    state: FileState,
}

fn file_builder(options: &FileOptions) -> FileBuilder {
    let mut builder = File::with_options();
    if options.use_swmr {
        builder.with_fapl(|fapl| fapl.libver_latest());
    }
    builder
}

/// Switches an open file to single-writer multiple-reader mode. From then on datasets
/// can be written, but no object or attribute can be added.
fn start_swmr_write(file: &File) -> NexusHDF5Result<()> {
    // SAFETY: the id is that of an open file, and the call holds the library lock.
    let status = hdf5::sync::sync(|| unsafe { H5Fstart_swmr_write(file.id()) });
    if status < 0 {
        return Err(NexusHDF5Error::swmr_write()).err_group(file);
    }
    debug!("SWMR write started on {}", file.filename());
    Ok(())
}

/// Opens the written file, in SWMR write mode if asked.
fn reopen(path: &Path, options: &FileOptions) -> NexusHDF5Result<File> {
    let file = file_builder(options).open_rw(path)?;
    if options.use_swmr {
        start_swmr_write(&file)?;
    }
    Ok(file)
}

fn write_group(
    group: &Group,
    path: &str,
    node: &NexusGroupNode,
    links: &mut Vec<DeferredLink>,
) -> NexusHDF5Result<()> {
    for (name, value) in node.attributes().iter() {
        if name != labels::NX_CLASS {
            group.add_value_attribute(name, value)?;
        }
    }
    for (name, child) in node.children() {
        match child {
            NexusNode::Group(child) => {
                let subgroup = group.add_new_group(name, child.nx_class())?;
                write_group(&subgroup, &join_path(path, name), child, links)?;
            }
            NexusNode::Field(field) => {
                let dataset = match field.data() {
                    FieldData::Constant(value) => group.create_constant_dataset(name, value)?,
                    FieldData::Lazy(lazy) => group.create_lazy_dataset(name, lazy)?,
                };
                for (attr, value) in field.attributes().iter() {
                    dataset.add_value_attribute(attr, value)?;
                }
            }
            NexusNode::Link(target) => links.push(DeferredLink {
                parent: path.to_owned(),
                name: name.to_owned(),
                target: target.clone(),
            }),
        }
    }
    Ok(())
}

/// Writes every node of the tree, then every link once all targets exist.
#[tracing::instrument(skip_all, level = "debug", err(level = "warn"))]
fn write_tree(file: &File, tree: &NexusTree) -> NexusHDF5Result<()> {
    file.add_constant_string_attribute(
        HDF5_VERSION,
        &format!(
            "{0}.{1}.{2}",
            hdf5::HDF5_VERSION.major,
            hdf5::HDF5_VERSION.minor,
            hdf5::HDF5_VERSION.micro
        ),
    )?;

    let mut links = Vec::new();
    write_group(file, "/", tree.root(), &mut links)?;

    for link in links {
        file.get_group(&link.parent)?
            .add_hard_link(&link.name, &link.target)?;
    }
    debug!("Tree written to {}", file.filename());
    Ok(())
}

impl NexusFileInterface for NexusHdf5File {
    #[tracing::instrument(skip_all, level = "debug", fields(path = %file_path.display()), err(level = "warn"))]
    fn create(file_path: &Path, tree: &NexusTree, options: &FileOptions) -> NexusHDF5Result<Self> {
        let path = file_path.to_owned();
        let state = if options.async_write {
            let tree = tree.clone();
            let options = *options;
            let path = path.clone();
            FileState::Instantiating(thread::spawn(move || {
                let file = file_builder(&options).create(&path)?;
                write_tree(&file, &tree)?;
                Ok(file.close()?)
            }))
        } else {
            let file = file_builder(options).create(&path)?;
            write_tree(&file, tree)?;
            if options.use_swmr {
                start_swmr_write(&file)?;
            }
            FileState::Open(file)
        };
        info!("Created NeXus file {}", path.display());
        Ok(Self {
            path,
            options: *options,
            state,
        })
    }

    fn open_to_write(&mut self) -> NexusHDF5Result<()> {
        match mem::replace(&mut self.state, FileState::Created) {
            FileState::Instantiating(handle) => {
                handle
                    .join()
                    .map_err(|_| NexusHDF5Error::async_creation_panicked())??;
                self.state = FileState::Open(reopen(&self.path, &self.options)?);
            }
            FileState::Created => {
                self.state = FileState::Open(reopen(&self.path, &self.options)?);
            }
            open @ FileState::Open(_) => self.state = open,
        }
        Ok(())
    }

    fn commit(&mut self, field: &PendingField, value: &NexusValue) -> NexusHDF5Result<()> {
        match &self.state {
            FileState::Open(file) => file
                .dataset(field.path())
                .err_path(field.path())?
                .set_value(value),
            _ => Err(NexusHDF5Error::file_not_open()).err_path(field.path()),
        }
    }

    fn flush(&self) -> NexusHDF5Result<()> {
        match &self.state {
            FileState::Open(file) => file.flush().err_group(file),
            _ => Err(NexusHDF5Error::file_not_open()),
        }
    }

    fn close(self) -> NexusHDF5Result<()> {
        match self.state {
            FileState::Open(file) => Ok(file.close()?),
            FileState::Instantiating(handle) => handle
                .join()
                .map_err(|_| NexusHDF5Error::async_creation_panicked())?,
            FileState::Created => Ok(()),
        }
    }
}
