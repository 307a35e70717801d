use hdf5::{Dataset, Group, types::TypeDescriptor};
use std::error::Error;
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

const NO_HDF5_PATH_SET: &str = "[No HDF5 Path Set]";

/// Errors raised by a storage backend. Every variant can carry the path of the
/// node at which it occured, which is filled in by [ConvertResult].
#[derive(Debug, Error)]
pub enum StorageError {
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
    #[error("Invalid HDF5 Type {error} at {0}", hdf5_path.as_deref().unwrap_or(NO_HDF5_PATH_SET))]
    InvalidHDF5Type {
        error: TypeDescriptor,
        hdf5_path: Option<String>,
    },
    #[error("Array Shape Error: {error} at {0}", hdf5_path.as_deref().unwrap_or(NO_HDF5_PATH_SET))]
    Shape {
        error: ndarray::ShapeError,
        hdf5_path: Option<String>,
    },
    #[error("Cannot Replace Attribute '{name}' of shape {existing:?} with shape {replacement:?} at {0}", hdf5_path.as_deref().unwrap_or(NO_HDF5_PATH_SET))]
    AttributeReplacement {
        name: String,
        existing: Vec<usize>,
        replacement: Vec<usize>,
        hdf5_path: Option<String>,
    },
    #[error("Cannot Link {target} From Another File at {0}", hdf5_path.as_deref().unwrap_or(NO_HDF5_PATH_SET))]
    CrossFileLink {
        target: String,
        hdf5_path: Option<String>,
    },
    #[error("Cannot Link {target} Beneath Itself at {0}", hdf5_path.as_deref().unwrap_or(NO_HDF5_PATH_SET))]
    LinkCycle {
        target: String,
        hdf5_path: Option<String>,
    },
    #[error("Invalid Member Name '{name}' at {0}", hdf5_path.as_deref().unwrap_or(NO_HDF5_PATH_SET))]
    InvalidName {
        name: String,
        hdf5_path: Option<String>,
    },
    #[error("Member '{name}' Already Exists at {0}", hdf5_path.as_deref().unwrap_or(NO_HDF5_PATH_SET))]
    NameExists {
        name: String,
        hdf5_path: Option<String>,
    },
    #[error("Node Is Not a Dataset at {0}", hdf5_path.as_deref().unwrap_or(NO_HDF5_PATH_SET))]
    NotADataset { hdf5_path: Option<String> },
}

impl StorageError {
    fn with_hdf5_path(mut self, path: String) -> Self {
        match &mut self {
            Self::HDF5 { hdf5_path, .. }
            | Self::HDF5String { hdf5_path, .. }
            | Self::InvalidHDF5Type { hdf5_path, .. }
            | Self::Shape { hdf5_path, .. }
            | Self::AttributeReplacement { hdf5_path, .. }
            | Self::CrossFileLink { hdf5_path, .. }
            | Self::LinkCycle { hdf5_path, .. }
            | Self::InvalidName { hdf5_path, .. }
            | Self::NameExists { hdf5_path, .. }
            | Self::NotADataset { hdf5_path } => {
                if hdf5_path.is_none() {
                    *hdf5_path = Some(path);
                }
            }
        }
        self
    }

    pub(crate) fn invalid_hdf5_type(error: TypeDescriptor) -> Self {
        Self::InvalidHDF5Type {
            error,
            hdf5_path: None,
        }
    }

    pub(crate) fn attribute_replacement(
        name: &str,
        existing: Vec<usize>,
        replacement: Vec<usize>,
    ) -> Self {
        Self::AttributeReplacement {
            name: name.to_owned(),
            existing,
            replacement,
            hdf5_path: None,
        }
    }

    pub(crate) fn cross_file_link(target: String) -> Self {
        Self::CrossFileLink {
            target,
            hdf5_path: None,
        }
    }

    pub(crate) fn link_cycle(target: String) -> Self {
        Self::LinkCycle {
            target,
            hdf5_path: None,
        }
    }

    pub(crate) fn invalid_name(name: &str) -> Self {
        Self::InvalidName {
            name: name.to_owned(),
            hdf5_path: None,
        }
    }

    pub(crate) fn name_exists(name: &str) -> Self {
        Self::NameExists {
            name: name.to_owned(),
            hdf5_path: None,
        }
    }

    pub(crate) fn not_a_dataset() -> Self {
        Self::NotADataset { hdf5_path: None }
    }
}

impl From<hdf5::Error> for StorageError {
    fn from(error: hdf5::Error) -> Self {
        StorageError::HDF5 {
            error,
            hdf5_path: None,
        }
    }
}

impl From<hdf5::types::StringError> for StorageError {
    fn from(error: hdf5::types::StringError) -> Self {
        StorageError::HDF5String {
            error,
            hdf5_path: None,
        }
    }
}

impl From<ndarray::ShapeError> for StorageError {
    fn from(error: ndarray::ShapeError) -> Self {
        StorageError::Shape {
            error,
            hdf5_path: None,
        }
    }
}

/// Used to allow errors which can be converted to [StorageError]s to be
/// appended with the path of the node they occured at.
pub(crate) trait ConvertResult<T, E>: Sized
where
    E: Error + Into<StorageError>,
{
    fn err_path(self, path: &str) -> StorageResult<T>;

    fn err_group(self, group: &Group) -> StorageResult<T> {
        self.err_path(&group.name())
    }

    fn err_dataset(self, dataset: &Dataset) -> StorageResult<T> {
        self.err_path(&dataset.name())
    }
}

impl<T, E> ConvertResult<T, E> for Result<T, E>
where
    E: Error + Into<StorageError>,
{
    fn err_path(self, path: &str) -> StorageResult<T> {
        self.map_err(|e| e.into().with_hdf5_path(path.to_owned()))
    }
}
