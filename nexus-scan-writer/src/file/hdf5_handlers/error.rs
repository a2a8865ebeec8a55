use crate::tree::NexusTreeError;
use hdf5::{Attribute, Dataset, Group};
use std::error::Error;
use thiserror::Error;

pub type NexusHDF5Result<T> = Result<T, NexusHDF5Error>;

const NO_HDF5_PATH_SET: &str = "[No HDF5 Path Set]";

#[derive(Debug, Error)]
pub enum NexusHDF5Error {
    #[error("HDF5 Error: {error} at {0}", hdf5_path.as_deref().unwrap_or(NO_HDF5_PATH_SET))]
    HDF5 {
        error: hdf5::Error,
        hdf5_path: Option<String>,
    },
    #[error("HDF5String Error: {error} at {0}", hdf5_path.as_deref().unwrap_or(NO_HDF5_PATH_SET))]
    HDF5String {
        error: hdf5::types::StringError,
        hdf5_path: Option<String>,
    },
    #[error("NeXus Tree Error: {error} at {0}", hdf5_path.as_deref().unwrap_or(NO_HDF5_PATH_SET))]
    Tree {
        error: NexusTreeError,
        hdf5_path: Option<String>,
    },
    #[error("IO Error {error} at {0}", hdf5_path.as_deref().unwrap_or(NO_HDF5_PATH_SET))]
    IO {
        error: std::io::Error,
        hdf5_path: Option<String>,
    },
    #[error("File Not Open For Writing at {0}", hdf5_path.as_deref().unwrap_or(NO_HDF5_PATH_SET))]
    FileNotOpen { hdf5_path: Option<String> },
    #[error("Background File Creation Panicked at {0}", hdf5_path.as_deref().unwrap_or(NO_HDF5_PATH_SET))]
    AsyncCreationPanicked { hdf5_path: Option<String> },
    #[error("Cannot Start SWMR Write at {0}", hdf5_path.as_deref().unwrap_or(NO_HDF5_PATH_SET))]
    SwmrWrite { hdf5_path: Option<String> },
}

impl NexusHDF5Error {
    pub(crate) fn with_hdf5_path(self, path: String) -> Self {
        match self {
            Self::HDF5 {
                error,
                hdf5_path: None,
            } => Self::HDF5 {
                error,
                hdf5_path: Some(path),
            },
            Self::HDF5String {
                error,
                hdf5_path: None,
            } => Self::HDF5String {
                error,
                hdf5_path: Some(path),
            },
            Self::Tree {
                error,
                hdf5_path: None,
            } => Self::Tree {
                error,
                hdf5_path: Some(path),
            },
            Self::IO {
                error,
                hdf5_path: None,
            } => Self::IO {
                error,
                hdf5_path: Some(path),
            },
            Self::FileNotOpen { hdf5_path: None } => Self::FileNotOpen {
                hdf5_path: Some(path),
            },
            Self::AsyncCreationPanicked { hdf5_path: None } => Self::AsyncCreationPanicked {
                hdf5_path: Some(path),
            },
            Self::SwmrWrite { hdf5_path: None } => Self::SwmrWrite {
                hdf5_path: Some(path),
            },
            other => other,
        }
    }

    pub(crate) fn file_not_open() -> Self {
        Self::FileNotOpen { hdf5_path: None }
    }

    pub(crate) fn async_creation_panicked() -> Self {
        Self::AsyncCreationPanicked { hdf5_path: None }
    }

    pub(crate) fn swmr_write() -> Self {
        Self::SwmrWrite { hdf5_path: None }
    }
}

impl From<hdf5::Error> for NexusHDF5Error {
    fn from(error: hdf5::Error) -> Self {
        NexusHDF5Error::HDF5 {
            error,
            hdf5_path: None,
        }
    }
}

impl From<hdf5::types::StringError> for NexusHDF5Error {
    fn from(error: hdf5::types::StringError) -> Self {
        NexusHDF5Error::HDF5String {
            error,
            hdf5_path: None,
        }
    }
}

impl From<NexusTreeError> for NexusHDF5Error {
    fn from(error: NexusTreeError) -> Self {
        NexusHDF5Error::Tree {
            error,
            hdf5_path: None,
        }
    }
}

impl From<std::io::Error> for NexusHDF5Error {
    fn from(error: std::io::Error) -> Self {
        NexusHDF5Error::IO {
            error,
            hdf5_path: None,
        }
    }
}

/// Used to allow errors which can be converted to NexusHDF5Errors to be
/// appended with hdf5 paths
pub(crate) trait ConvertResult<T, E>
where
    E: Error + Into<NexusHDF5Error>,
{
    fn err_group(self, group: &Group) -> NexusHDF5Result<T>;
    fn err_dataset(self, dataset: &Dataset) -> NexusHDF5Result<T>;
    fn err_attribute(self, attribute: &Attribute) -> NexusHDF5Result<T>;
    fn err_path(self, path: &str) -> NexusHDF5Result<T>;
}

impl<T, E> ConvertResult<T, E> for Result<T, E>
where
    E: Error + Into<NexusHDF5Error>,
{
    fn err_group(self, group: &Group) -> NexusHDF5Result<T> {
        self.map_err(|e| e.into().with_hdf5_path(group.name()))
    }

    fn err_dataset(self, dataset: &Dataset) -> NexusHDF5Result<T> {
        self.map_err(|e| e.into().with_hdf5_path(dataset.name()))
    }

    fn err_attribute(self, attribute: &Attribute) -> NexusHDF5Result<T> {
        self.map_err(|e| e.into().with_hdf5_path(attribute.name()))
    }

    fn err_path(self, path: &str) -> NexusHDF5Result<T> {
        self.map_err(|e| e.into().with_hdf5_path(path.to_owned()))
    }
}
