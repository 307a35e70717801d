//! The schema model: what each NeXus base class declares, how it is read from
//! NXDL, and the registry accessors resolve classes through.
mod classes;
mod descriptor;
mod nxdl;
mod registry;
mod types;
mod units;

pub use classes::{
    CollimatorType, ModeratorType, NexusClass, SourceProbe, SourceType, TransformationType,
};
pub use descriptor::{
    AttributeDescriptor, ChildDescriptor, Dim, Dimensions, Enumeration, FieldDescriptor,
    GroupSchema, Occurrence,
};
pub use nxdl::{NxdlError, parse_nxdl};
pub use registry::SchemaRegistry;
pub use types::NexusType;
pub use units::NexusUnitCategory;
