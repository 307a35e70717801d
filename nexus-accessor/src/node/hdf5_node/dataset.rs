use super::codec;
use crate::{
    node::{ConvertResult, FieldNode, HasAttributes, StorageResult},
    value::NexusValue,
};
use hdf5::Dataset;

impl HasAttributes for Dataset {
    #[tracing::instrument(skip_all, level = "trace", fields(dataset = %self.name()), err(level = "warn"))]
    fn read_attribute(&self, name: &str) -> StorageResult<Option<NexusValue>> {
        codec::read_attribute(self, name).err_dataset(self)
    }

    #[tracing::instrument(skip_all, level = "trace", fields(dataset = %self.name()), err(level = "warn"))]
    fn write_attribute(&self, name: &str, value: &NexusValue) -> StorageResult<()> {
        codec::write_attribute(self, name, value).err_dataset(self)
    }

    fn attribute_names(&self) -> StorageResult<Vec<String>> {
        self.attr_names().err_dataset(self)
    }
}

impl FieldNode for Dataset {
    fn node_name(&self) -> String {
        codec::base_name(&self.name())
    }

    fn node_path(&self) -> String {
        self.name()
    }

    #[tracing::instrument(skip_all, level = "trace", fields(dataset = %self.name()), err(level = "warn"))]
    fn read_value(&self) -> StorageResult<NexusValue> {
        codec::read_container(self).err_dataset(self)
    }
}
