//! Typed access to NeXus groups, driven by NXDL base class definitions.
//!
//! A [SchemaRegistry] holds the [GroupSchema] of every known class. Binding a
//! storage group through it yields a [SchemaBoundNode], whose field and child
//! operations are checked against that schema before anything is read or written.
//!
//! Storage is abstracted by the [GroupNode] and [FieldNode] traits, implemented
//! for [hdf5::Group] and [hdf5::Dataset], and for the in-memory [MemoryGroup].
pub mod accessor;
pub mod error;
pub mod node;
pub mod schema;
pub mod settings;
pub mod value;

pub use accessor::{SchemaBoundNode, TransformationAxis, Violation, ViolationKind};
pub use error::{NexusAccessorError, NexusAccessorResult};
pub use node::{
    FieldNode, GroupNode, HasAttributes, StorageError, StorageResult,
    memory::{MemoryField, MemoryGroup},
};
pub use schema::{GroupSchema, NexusClass, SchemaRegistry};
pub use settings::{AccessorSettings, CollisionPolicy, DeprecationPolicy};
pub use value::{NexusDateTime, NexusScalar, NexusValue};
