//! Reading and writing the axes of `NXtransformations` groups, which position
//! components by a chain of translations and rotations.
use super::SchemaBoundNode;
use crate::{
    error::{NexusAccessorError, NexusAccessorResult},
    node::{FieldNode, GroupNode, HasAttributes, UNITS},
    schema::{NexusClass, TransformationType},
    value::{FromNexusScalar, NexusValue},
};
use std::str::FromStr;

mod labels {
    pub(super) const TRANSFORMATION_TYPE: &str = "transformation_type";
    pub(super) const VECTOR: &str = "vector";
    pub(super) const OFFSET: &str = "offset";
    pub(super) const OFFSET_UNITS: &str = "offset_units";
    pub(super) const DEPENDS_ON: &str = "depends_on";
}

/// How one axis moves its component, as stored in the attributes of the axis field.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformationAxis {
    pub transformation_type: TransformationType,
    /// The direction of translation, or the axis of rotation.
    pub vector: [f64; 3],
    /// Applied before the transformation itself.
    pub offset: Option<[f64; 3]>,
    pub offset_units: Option<String>,
    /// The path of the next transformation in the chain, or `.` at its end.
    pub depends_on: Option<String>,
    pub units: Option<String>,
}

impl TransformationAxis {
    pub fn translation(vector: [f64; 3], units: &str) -> Self {
        Self::new(TransformationType::Translation, vector, units)
    }

    pub fn rotation(vector: [f64; 3], units: &str) -> Self {
        Self::new(TransformationType::Rotation, vector, units)
    }

    fn new(transformation_type: TransformationType, vector: [f64; 3], units: &str) -> Self {
        Self {
            transformation_type,
            vector,
            offset: None,
            offset_units: None,
            depends_on: None,
            units: Some(units.to_owned()),
        }
    }

    pub fn with_offset(self, offset: [f64; 3], units: &str) -> Self {
        Self {
            offset: Some(offset),
            offset_units: Some(units.to_owned()),
            ..self
        }
    }

    pub fn depending_on(self, path: &str) -> Self {
        Self {
            depends_on: Some(path.to_owned()),
            ..self
        }
    }

    /// The attributes describing this axis, in the order they are written.
    fn attributes(&self) -> Vec<(&'static str, NexusValue)> {
        let mut attributes = vec![
            (
                labels::TRANSFORMATION_TYPE,
                NexusValue::from(self.transformation_type.as_ref()),
            ),
            (labels::VECTOR, NexusValue::from(self.vector)),
        ];
        if let Some(offset) = self.offset {
            attributes.push((labels::OFFSET, NexusValue::from(offset)));
        }
        if let Some(offset_units) = &self.offset_units {
            attributes.push((labels::OFFSET_UNITS, NexusValue::from(offset_units.as_str())));
        }
        if let Some(depends_on) = &self.depends_on {
            attributes.push((labels::DEPENDS_ON, NexusValue::from(depends_on.as_str())));
        }
        if let Some(units) = &self.units {
            attributes.push((UNITS, NexusValue::from(units.as_str())));
        }
        attributes
    }
}

impl<G: GroupNode> SchemaBoundNode<G> {
    fn require_transformations(&self) -> NexusAccessorResult<()> {
        let expected = NexusClass::Transformations.as_ref();
        if self.class() != expected {
            return Err(NexusAccessorError::ClassMismatch {
                expected: expected.to_owned(),
                found: Some(self.schema.class.clone()),
                path: self.path(),
            });
        }
        Ok(())
    }

    /// Writes the axis field `name` holding `values`, the distances or angles of
    /// each step, together with the attributes describing the axis.
    ///
    /// # Error Modes
    /// - Fails with [NexusAccessorError::ClassMismatch] unless bound to `NXtransformations`.
    /// - Fails as [Self::set_field] and [Self::set_field_attribute] do, before anything is written.
    #[tracing::instrument(skip_all, level = "trace", fields(path = %self.path(), axis = name), err(level = "warn"))]
    pub fn set_transformation(
        &self,
        name: &str,
        values: impl Into<NexusValue>,
        axis: &TransformationAxis,
    ) -> NexusAccessorResult<G::Field> {
        self.require_transformations()?;
        let values = values.into();
        let descriptor = self.field_descriptor(name)?;
        self.check_value(
            name,
            descriptor.nexus_type,
            descriptor.enumeration.as_ref(),
            &values,
        )?;
        let attributes = axis.attributes();
        for (attribute, value) in &attributes {
            if let Some(declared) = descriptor.attribute(attribute) {
                self.check_value(
                    &format!("{name}@{attribute}"),
                    declared.nexus_type,
                    declared.enumeration.as_ref(),
                    value,
                )?;
            }
        }

        let field = self.node.write_field(name, &values)?;
        for (attribute, value) in &attributes {
            field.write_attribute(attribute, value)?;
        }
        Ok(field)
    }

    /// Reads the axis field `name` and the attributes describing it.
    ///
    /// # Error Modes
    /// - Fails with [NexusAccessorError::ClassMismatch] unless bound to `NXtransformations`.
    /// - Fails with [NexusAccessorError::MissingField] if the field, or its
    ///   `transformation_type` or `vector` attribute, is not stored.
    /// - Fails with [NexusAccessorError::Cardinality] if a vector does not have three elements.
    pub fn get_transformation(&self, name: &str) -> NexusAccessorResult<(NexusValue, TransformationAxis)> {
        self.require_transformations()?;
        let values = self.get_field(name)?;
        let field = self
            .node
            .get_field(name)?
            .ok_or_else(|| self.missing_field(name))?;

        let literal = field
            .read_string_attribute(labels::TRANSFORMATION_TYPE)?
            .ok_or_else(|| self.missing_field(&format!("{name}@{}", labels::TRANSFORMATION_TYPE)))?;
        let transformation_type = TransformationType::from_str(&literal).map_err(|_| {
            NexusAccessorError::EnumViolation {
                class: self.schema.class.clone(),
                field: format!("{name}@{}", labels::TRANSFORMATION_TYPE),
                value: literal.clone(),
                allowed: vec![
                    TransformationType::Translation.to_string(),
                    TransformationType::Rotation.to_string(),
                ],
                path: field.node_path(),
            }
        })?;
        let vector = self
            .read_vector(name, &field, labels::VECTOR)?
            .ok_or_else(|| self.missing_field(&format!("{name}@{}", labels::VECTOR)))?;

        let axis = TransformationAxis {
            transformation_type,
            vector,
            offset: self.read_vector(name, &field, labels::OFFSET)?,
            offset_units: field.read_string_attribute(labels::OFFSET_UNITS)?,
            depends_on: field.read_string_attribute(labels::DEPENDS_ON)?,
            units: field.read_string_attribute(UNITS)?,
        };
        Ok((values, axis))
    }

    fn read_vector(
        &self,
        name: &str,
        field: &G::Field,
        attribute: &str,
    ) -> NexusAccessorResult<Option<[f64; 3]>> {
        let item = format!("{name}@{attribute}");
        let Some(value) = field.read_attribute(attribute)? else {
            return Ok(None);
        };
        let components = value
            .to_scalars()
            .into_iter()
            .map(|scalar| {
                let actual = scalar.element_type();
                f64::from_scalar(scalar)
                    .ok_or_else(|| self.type_mismatch(&item, f64::ELEMENT_TYPE, actual))
            })
            .collect::<NexusAccessorResult<Vec<_>>>()?;
        <[f64; 3]>::try_from(components)
            .map(Some)
            .map_err(|components| NexusAccessorError::Cardinality {
                class: self.schema.class.clone(),
                field: item,
                found: components.len(),
                path: field.node_path(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{accessor::tests::registry, node::memory::MemoryGroup};

    #[test]
    fn axis_is_read_back() {
        let root = MemoryGroup::new_root();
        let transformations = registry()
            .create(&root, "transformations", NexusClass::Transformations)
            .unwrap();
        let axis = TransformationAxis::rotation([0.0, 1.0, 0.0], "deg")
            .with_offset([0.0, 0.0, 0.5], "m")
            .depending_on("/entry/instrument/moderator/transformations/z");
        transformations
            .set_transformation("phi", vec![0.0, 45.0, 90.0], &axis)
            .unwrap();

        let (values, read) = transformations.get_transformation("phi").unwrap();
        assert_eq!(values, NexusValue::from(vec![0.0, 45.0, 90.0]));
        assert_eq!(read, axis);
    }

    #[test]
    fn minimal_axis_is_read_back() {
        let root = MemoryGroup::new_root();
        let transformations = registry()
            .create(&root, "transformations", NexusClass::Transformations)
            .unwrap();
        let axis = TransformationAxis::translation([0.0, 0.0, 1.0], "m");
        transformations.set_transformation("z", 2.5, &axis).unwrap();

        let (values, read) = transformations.get_transformation("z").unwrap();
        assert_eq!(values, NexusValue::from(2.5));
        assert_eq!(read.transformation_type, TransformationType::Translation);
        assert_eq!(read.offset, None);
        assert_eq!(read.depends_on, None);
        assert_eq!(read.units.as_deref(), Some("m"));
    }

    #[test]
    fn only_transformations_have_axes() {
        let root = MemoryGroup::new_root();
        let moderator = registry()
            .create(&root, "moderator", NexusClass::Moderator)
            .unwrap();
        let axis = TransformationAxis::translation([0.0, 0.0, 1.0], "m");
        assert!(matches!(
            moderator.set_transformation("temperature", 1.0, &axis),
            Err(NexusAccessorError::ClassMismatch { .. })
        ));
    }

    #[test]
    fn malformed_vectors_are_reported() {
        let root = MemoryGroup::new_root();
        let transformations = registry()
            .create(&root, "transformations", NexusClass::Transformations)
            .unwrap();
        let field = transformations.set_field_scalar("x", 1.0).unwrap();
        assert!(matches!(
            transformations.get_transformation("x"),
            Err(NexusAccessorError::MissingField { .. })
        ));

        field
            .write_string_attribute(labels::TRANSFORMATION_TYPE, "translation")
            .unwrap();
        field
            .write_attribute(labels::VECTOR, &NexusValue::from([1.0, 0.0]))
            .unwrap();
        assert!(matches!(
            transformations.get_transformation("x"),
            Err(NexusAccessorError::Cardinality { found: 2, .. })
        ));
    }

    #[test]
    fn failed_checks_write_nothing() {
        let root = MemoryGroup::new_root();
        let transformations = registry()
            .create(&root, "transformations", NexusClass::Transformations)
            .unwrap();
        let axis = TransformationAxis::translation([0.0, 0.0, 1.0], "m");
        assert!(matches!(
            transformations.set_transformation("x", "far", &axis),
            Err(NexusAccessorError::TypeMismatch { .. })
        ));
        assert!(transformations.node().field_names().unwrap().is_empty());
    }
}
