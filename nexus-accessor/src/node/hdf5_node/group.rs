use super::codec;
use crate::{
    node::{ConvertResult, GroupNode, HasAttributes, StorageError, StorageResult},
    value::NexusValue,
};
use hdf5::{Dataset, Group};
use tracing::debug;

/// Appended to a field name while its replacement is being written.
const STAGING_SUFFIX: &str = "__replacement";

impl HasAttributes for Group {
    #[tracing::instrument(skip_all, level = "trace", fields(group = %self.name()), err(level = "warn"))]
    fn read_attribute(&self, name: &str) -> StorageResult<Option<NexusValue>> {
        codec::read_attribute(self, name).err_group(self)
    }

    #[tracing::instrument(skip_all, level = "trace", fields(group = %self.name()), err(level = "warn"))]
    fn write_attribute(&self, name: &str, value: &NexusValue) -> StorageResult<()> {
        codec::write_attribute(self, name, value).err_group(self)
    }

    fn attribute_names(&self) -> StorageResult<Vec<String>> {
        self.attr_names().err_group(self)
    }
}

/// Returns the path `name` would have as a member of `group`.
fn member_path(group: &Group, name: &str) -> String {
    let path = group.name();
    if path.ends_with('/') {
        format!("{path}{name}")
    } else {
        format!("{path}/{name}")
    }
}

/// Returns the member names of `group` for which `is_kind` opens successfully.
fn names_of_kind<T>(
    group: &Group,
    is_kind: impl Fn(&Group, &str) -> hdf5::Result<T>,
) -> StorageResult<Vec<String>> {
    Ok(group
        .member_names()
        .err_group(group)?
        .into_iter()
        .filter(|name| is_kind(group, name).is_ok())
        .collect())
}

impl GroupNode for Group {
    type Field = Dataset;

    fn node_name(&self) -> String {
        codec::base_name(&self.name())
    }

    fn node_path(&self) -> String {
        self.name()
    }

    fn get_field(&self, name: &str) -> StorageResult<Option<Dataset>> {
        if !self.link_exists(name) {
            return Ok(None);
        }
        Ok(self.dataset(name).ok())
    }

    fn field_names(&self) -> StorageResult<Vec<String>> {
        names_of_kind(self, Group::dataset)
    }

    /// Creates the named dataset from `value`. An existing member of that name is only
    /// replaced once the new dataset has been created beside it, so a failed write leaves it in place.
    /// # Error Modes
    /// - Propagates errors from [codec::create_dataset()].
    #[tracing::instrument(skip_all, level = "trace", fields(group = %self.name(), name = name), err(level = "warn"))]
    fn write_field(&self, name: &str, value: &NexusValue) -> StorageResult<Dataset> {
        if !self.link_exists(name) {
            return codec::create_dataset(self, name, value).err_group(self);
        }
        let staging = (0_usize..)
            .map(|index| format!("{name}{STAGING_SUFFIX}{index}"))
            .find(|staging| !self.link_exists(staging))
            .unwrap_or_default();
        if let Err(error) = codec::create_dataset(self, &staging, value) {
            if self.link_exists(&staging) {
                self.unlink(&staging).err_group(self)?;
            }
            return Err(error).err_group(self);
        }

        debug!("Replacing member {name}");
        self.unlink(name).err_group(self)?;
        self.relink(&staging, name).err_group(self)?;
        self.dataset(name).err_group(self)
    }

    fn get_group(&self, name: &str) -> StorageResult<Option<Group>> {
        if !self.link_exists(name) {
            return Ok(None);
        }
        Ok(self.group(name).ok())
    }

    fn group_names(&self) -> StorageResult<Vec<String>> {
        names_of_kind(self, Group::group)
    }

    fn add_group(&self, name: &str) -> StorageResult<Group> {
        if self.link_exists(name) {
            return Err(StorageError::name_exists(name)).err_group(self);
        }
        self.create_group(name).err_group(self)
    }

    /// Creates a hard link to `group` named `name`.
    /// # Error Modes
    /// - Fails with [StorageError::CrossFileLink] if `group` belongs to another file.
    /// - Fails with [StorageError::LinkCycle] if this group is `group` or lies beneath it.
    #[tracing::instrument(skip_all, level = "trace", fields(group = %self.name(), name = name), err(level = "warn"))]
    fn link_group(&self, name: &str, group: &Group) -> StorageResult<()> {
        let target = group.name();
        if group.filename() != self.filename() {
            return Err(StorageError::cross_file_link(target)).err_group(self);
        }
        if target == member_path(self, name) {
            return Ok(());
        }
        let own = self.name();
        if target == "/" || own == target || own.starts_with(&format!("{target}/")) {
            return Err(StorageError::link_cycle(target)).err_group(self);
        }
        if self.link_exists(name) {
            debug!("Replacing member {name}");
            self.unlink(name).err_group(self)?;
        }
        self.link_hard(&target, name).err_group(self)
    }

    fn remove_member(&self, name: &str) -> StorageResult<bool> {
        if !self.link_exists(name) {
            return Ok(false);
        }
        self.unlink(name).err_group(self)?;
        Ok(true)
    }

    /// Groups are the same object when they share a file and an object token.
    fn is_same_node(&self, other: &Group) -> StorageResult<bool> {
        let own = self.loc_info().err_group(self)?;
        let others = other.loc_info().err_group(other)?;
        Ok(own.fileno == others.fileno && own.token == others.token)
    }
}
