//! Converts between [NexusValue]s and the hdf5 types they are stored as.
//! Text and date-times are stored as variable length unicode strings.
use crate::{
    node::{StorageError, StorageResult},
    value::{NexusDateTime, NexusValue, format_datetime},
};
use hdf5::{
    Container, Dataset, Group, Location,
    types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode},
};
use ndarray::ArrayD;

/// Fixed length strings are read through a buffer of this many bytes and truncated beyond it.
const FIXED_STRING_CAPACITY: usize = 1024;

fn to_var_len_unicode<'a>(
    array: &ArrayD<impl Sized>,
    texts: impl Iterator<Item = std::borrow::Cow<'a, str>>,
) -> StorageResult<ArrayD<VarLenUnicode>> {
    let values = texts
        .map(|text| text.parse::<VarLenUnicode>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ArrayD::from_shape_vec(array.raw_dim(), values)?)
}

fn text_array(array: &ArrayD<String>) -> StorageResult<ArrayD<VarLenUnicode>> {
    to_var_len_unicode(array, array.iter().map(|text| text.as_str().into()))
}

fn datetime_array(array: &ArrayD<NexusDateTime>) -> StorageResult<ArrayD<VarLenUnicode>> {
    to_var_len_unicode(
        array,
        array.iter().map(|datetime| format_datetime(datetime).into()),
    )
}

/// Reads a dataset or attribute, dispatching on its stored type.
/// Integers and floats are widened to 64 bits.
pub(super) fn read_container(container: &Container) -> StorageResult<NexusValue> {
    let descriptor = container.dtype()?.to_descriptor()?;
    Ok(match descriptor {
        TypeDescriptor::Integer(_) => NexusValue::Int(container.read_dyn::<i64>()?),
        TypeDescriptor::Unsigned(_) => NexusValue::UInt(container.read_dyn::<u64>()?),
        TypeDescriptor::Float(_) => NexusValue::Float(container.read_dyn::<f64>()?),
        TypeDescriptor::Boolean => NexusValue::Bool(container.read_dyn::<bool>()?),
        TypeDescriptor::VarLenUnicode => NexusValue::Text(
            container
                .read_dyn::<VarLenUnicode>()?
                .map(|text| text.as_str().to_owned()),
        ),
        TypeDescriptor::VarLenAscii => NexusValue::Text(
            container
                .read_dyn::<VarLenAscii>()?
                .map(|text| text.as_str().to_owned()),
        ),
        TypeDescriptor::FixedAscii(_) => NexusValue::Text(
            container
                .read_dyn::<FixedAscii<FIXED_STRING_CAPACITY>>()?
                .map(|text| text.as_str().to_owned()),
        ),
        TypeDescriptor::FixedUnicode(_) => NexusValue::Text(
            container
                .read_dyn::<FixedUnicode<FIXED_STRING_CAPACITY>>()?
                .map(|text| text.as_str().to_owned()),
        ),
        other => return Err(StorageError::invalid_hdf5_type(other)),
    })
}

/// Overwrites the contents of an existing container of the same shape.
fn overwrite_container(container: &Container, value: &NexusValue) -> StorageResult<()> {
    match value {
        NexusValue::Float(array) => container.write(array.view())?,
        NexusValue::Int(array) => container.write(array.view())?,
        NexusValue::UInt(array) => container.write(array.view())?,
        NexusValue::Bool(array) => container.write(array.view())?,
        NexusValue::Text(array) => container.write(text_array(array)?.view())?,
        NexusValue::DateTime(array) => container.write(datetime_array(array)?.view())?,
    }
    Ok(())
}

pub(super) fn create_dataset(group: &Group, name: &str, value: &NexusValue) -> StorageResult<Dataset> {
    let builder = group.new_dataset_builder();
    let dataset = match value {
        NexusValue::Float(array) => builder.with_data(array.view()).create(name)?,
        NexusValue::Int(array) => builder.with_data(array.view()).create(name)?,
        NexusValue::UInt(array) => builder.with_data(array.view()).create(name)?,
        NexusValue::Bool(array) => builder.with_data(array.view()).create(name)?,
        NexusValue::Text(array) => {
            let texts = text_array(array)?;
            builder.with_data(texts.view()).create(name)?
        }
        NexusValue::DateTime(array) => {
            let texts = datetime_array(array)?;
            builder.with_data(texts.view()).create(name)?
        }
    };
    Ok(dataset)
}

fn create_attribute(location: &Location, name: &str, value: &NexusValue) -> StorageResult<()> {
    let builder = location.new_attr_builder();
    match value {
        NexusValue::Float(array) => builder.with_data(array.view()).create(name)?,
        NexusValue::Int(array) => builder.with_data(array.view()).create(name)?,
        NexusValue::UInt(array) => builder.with_data(array.view()).create(name)?,
        NexusValue::Bool(array) => builder.with_data(array.view()).create(name)?,
        NexusValue::Text(array) => {
            let texts = text_array(array)?;
            builder.with_data(texts.view()).create(name)?
        }
        NexusValue::DateTime(array) => {
            let texts = datetime_array(array)?;
            builder.with_data(texts.view()).create(name)?
        }
    };
    Ok(())
}

fn has_attribute(location: &Location, name: &str) -> StorageResult<bool> {
    Ok(location.attr_names()?.iter().any(|existing| existing == name))
}

pub(super) fn read_attribute(location: &Location, name: &str) -> StorageResult<Option<NexusValue>> {
    if !has_attribute(location, name)? {
        return Ok(None);
    }
    let attribute = location.attr(name)?;
    read_container(&attribute).map(Some)
}

/// Existing attributes are overwritten in place, so their shape cannot change.
pub(super) fn write_attribute(location: &Location, name: &str, value: &NexusValue) -> StorageResult<()> {
    if !has_attribute(location, name)? {
        return create_attribute(location, name, value);
    }
    let existing = location.attr(name)?;
    if existing.shape() != value.shape() {
        return Err(StorageError::attribute_replacement(
            name,
            existing.shape(),
            value.shape().to_vec(),
        ));
    }
    overwrite_container(&existing, value)
}

/// The last component of an hdf5 path.
pub(super) fn base_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or_default().to_owned()
}
