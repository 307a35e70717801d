//! Defines the storage contract schema-bound accessors work against, and the
//! backends implementing it: an in-memory tree and HDF5 files.
mod error;
mod hdf5_node;
pub mod memory;

use crate::value::NexusValue;
pub(crate) use error::ConvertResult;
pub use error::{StorageError, StorageResult};
#[cfg(test)]
pub(crate) use hdf5_node::OneTempFile;

pub const NX_CLASS: &str = "NX_class";
pub const UNITS: &str = "units";

/// Implemented by nodes which carry named attributes, that is groups and fields.
pub trait HasAttributes {
    /// Implementation should return the value of the named attribute, or `None` if it is not set.
    /// # Error Modes
    /// Implementations should propagate backend errors with the node's path set.
    fn read_attribute(&self, name: &str) -> StorageResult<Option<NexusValue>>;

    /// Implementation should create the named attribute, or replace its value if it exists.
    /// # Error Modes
    /// Implementations should propagate backend errors with the node's path set.
    fn write_attribute(&self, name: &str, value: &NexusValue) -> StorageResult<()>;

    fn attribute_names(&self) -> StorageResult<Vec<String>>;

    /// Returns the first element of the named attribute, if it is text.
    fn read_string_attribute(&self, name: &str) -> StorageResult<Option<String>> {
        Ok(self
            .read_attribute(name)?
            .and_then(|value| value.first_text().map(ToOwned::to_owned)))
    }

    fn write_string_attribute(&self, name: &str, value: &str) -> StorageResult<()> {
        self.write_attribute(name, &NexusValue::from(value))
    }

    fn with_string_attribute(self, name: &str, value: &str) -> StorageResult<Self>
    where
        Self: Sized,
    {
        self.write_string_attribute(name, value)?;
        Ok(self)
    }
}

/// A dataset holding one [NexusValue].
pub trait FieldNode: HasAttributes + Clone {
    /// The name of the field within its group.
    fn node_name(&self) -> String;

    /// The absolute path of the field.
    fn node_path(&self) -> String;

    fn read_value(&self) -> StorageResult<NexusValue>;
}

/// A group holding fields and subgroups, each under a unique name.
pub trait GroupNode: HasAttributes + Clone {
    type Field: FieldNode;

    /// The name of the group within its parent.
    fn node_name(&self) -> String;

    /// The absolute path of the group.
    fn node_path(&self) -> String;

    /// Implementation should return the named field, or `None` if no field has that name.
    fn get_field(&self, name: &str) -> StorageResult<Option<Self::Field>>;

    /// The names of the fields in this group, in storage order.
    fn field_names(&self) -> StorageResult<Vec<String>>;

    /// Implementation should write `value` as the named field, replacing any member
    /// of that name, and return the new field.
    fn write_field(&self, name: &str, value: &NexusValue) -> StorageResult<Self::Field>;

    /// Implementation should return the named subgroup, or `None` if no subgroup has that name.
    fn get_group(&self, name: &str) -> StorageResult<Option<Self>>;

    /// The names of the subgroups in this group, in storage order.
    fn group_names(&self) -> StorageResult<Vec<String>>;

    /// Implementation should create an empty subgroup.
    /// # Error Modes
    /// Implementations should fail if a member of that name exists.
    fn add_group(&self, name: &str) -> StorageResult<Self>;

    /// Implementation should attach an existing group under `name`, replacing any
    /// member of that name. The group stays reachable from wherever it already was.
    fn link_group(&self, name: &str, group: &Self) -> StorageResult<()>;

    /// Implementation should remove the named member, returning whether it existed.
    fn remove_member(&self, name: &str) -> StorageResult<bool>;

    /// Implementation should report whether `other` is the same stored group as this
    /// one, however either handle was reached.
    fn is_same_node(&self, other: &Self) -> StorageResult<bool>;

    fn has_member(&self, name: &str) -> StorageResult<bool> {
        Ok(self.get_field(name)?.is_some() || self.get_group(name)?.is_some())
    }

    fn nx_class(&self) -> StorageResult<Option<String>> {
        self.read_string_attribute(NX_CLASS)
    }

    fn set_nx_class(&self, class: &str) -> StorageResult<()> {
        self.write_string_attribute(NX_CLASS, class)
    }

    /// Creates a subgroup with its `NX_class` attribute set.
    fn add_new_group(&self, name: &str, class: &str) -> StorageResult<Self> {
        self.add_group(name)?.with_string_attribute(NX_CLASS, class)
    }
}
