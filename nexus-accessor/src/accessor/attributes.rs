use super::SchemaBoundNode;
use crate::{
    error::{NexusAccessorError, NexusAccessorResult},
    node::{GroupNode, HasAttributes, NX_CLASS, UNITS},
    value::NexusValue,
};

impl<G: GroupNode> SchemaBoundNode<G> {
    /// Returns the stored field `field`, which must be declared.
    fn stored_field(&self, field: &str) -> NexusAccessorResult<G::Field> {
        self.field_descriptor(field)?;
        self.node
            .get_field(field)?
            .ok_or_else(|| self.missing_field(field))
    }

    /// Returns an attribute of a stored field, or `None` if it is not set.
    ///
    /// # Error Modes
    /// - Fails with [NexusAccessorError::MissingField] if the field is not stored.
    pub fn get_field_attribute(&self, field: &str, attribute: &str) -> NexusAccessorResult<Option<NexusValue>> {
        Ok(self.stored_field(field)?.read_attribute(attribute)?)
    }

    /// Sets an attribute of a stored field. Attributes the schema declares for the
    /// field are checked against their type and enumeration, others are written as given.
    ///
    /// # Error Modes
    /// - Fails with [NexusAccessorError::MissingField] if the field is not stored.
    /// - Fails with [NexusAccessorError::TypeMismatch] or [NexusAccessorError::EnumViolation]
    ///   if a declared attribute does not accept `value`.
    #[tracing::instrument(skip_all, level = "trace", fields(class = %self.schema.class, field = field, attribute = attribute), err(level = "warn"))]
    pub fn set_field_attribute(
        &self,
        field: &str,
        attribute: &str,
        value: impl Into<NexusValue>,
    ) -> NexusAccessorResult<()> {
        let value = value.into();
        let descriptor = self.field_descriptor(field)?;
        if let Some(declared) = descriptor.attribute(attribute) {
            let item = format!("{field}@{attribute}");
            self.deprecation(&format!("attribute '{item}'"), declared.deprecated.as_deref())?;
            self.check_value(
                &item,
                declared.nexus_type,
                declared.enumeration.as_ref(),
                &value,
            )?;
        }
        Ok(self.stored_field(field)?.write_attribute(attribute, &value)?)
    }

    /// The `units` attribute of a stored field.
    pub fn get_field_units(&self, field: &str) -> NexusAccessorResult<Option<String>> {
        Ok(self.stored_field(field)?.read_string_attribute(UNITS)?)
    }

    pub fn set_field_units(&self, field: &str, units: &str) -> NexusAccessorResult<()> {
        self.set_field_attribute(field, UNITS, units)
    }

    /// Returns an attribute of the group itself, or `None` if it is not set.
    pub fn get_attribute(&self, name: &str) -> NexusAccessorResult<Option<NexusValue>> {
        Ok(self.node.read_attribute(name)?)
    }

    /// Sets an attribute of the group itself, checked against the schema when declared.
    ///
    /// # Error Modes
    /// - Fails with [NexusAccessorError::ClassMismatch] if `NX_class` would name another class.
    /// - Fails with [NexusAccessorError::TypeMismatch] or [NexusAccessorError::EnumViolation]
    ///   if a declared attribute does not accept `value`.
    pub fn set_attribute(&self, name: &str, value: impl Into<NexusValue>) -> NexusAccessorResult<()> {
        let value = value.into();
        if name == NX_CLASS && value.first_text() != Some(self.class()) {
            return Err(NexusAccessorError::ClassMismatch {
                expected: self.schema.class.clone(),
                found: value.first().map(|scalar| scalar.to_string()),
                path: self.path(),
            });
        }
        if let Some(declared) = self.schema.attribute(name) {
            let item = format!("@{name}");
            self.deprecation(&format!("attribute '{item}'"), declared.deprecated.as_deref())?;
            self.check_value(
                &item,
                declared.nexus_type,
                declared.enumeration.as_ref(),
                &value,
            )?;
        }
        Ok(self.node.write_attribute(name, &value)?)
    }
}
