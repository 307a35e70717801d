//! The schema-bound accessor. A [SchemaBoundNode] pairs a storage group with the
//! resolved schema of its class, and checks every field and child operation
//! against that schema before touching storage.
//!
//! Failures are local to the field or child being accessed. Every check runs
//! before anything is written, so a failed set leaves storage as it was and the
//! accessor remains usable.
mod attributes;
mod children;
mod transformations;
mod validate;

use crate::{
    error::{NexusAccessorError, NexusAccessorResult},
    node::{FieldNode, GroupNode},
    schema::{Enumeration, FieldDescriptor, GroupSchema, NexusType, SchemaRegistry},
    settings::DeprecationPolicy,
    value::{FromNexusScalar, NexusScalar, NexusValue},
};
use std::{
    collections::BTreeMap,
    fmt::{Debug, Formatter},
    str::FromStr,
    sync::Arc,
};
use tracing::{debug, warn};

pub use transformations::TransformationAxis;
pub use validate::{Violation, ViolationKind};

/// Applies the deprecation policy to an access of a deprecated item.
/// Items without a deprecation message pass unconditionally.
pub(crate) fn check_deprecation(
    policy: DeprecationPolicy,
    class: &str,
    item: &str,
    message: Option<&str>,
    path: &str,
) -> NexusAccessorResult<()> {
    let Some(message) = message else {
        return Ok(());
    };
    match policy {
        DeprecationPolicy::Allow => Ok(()),
        DeprecationPolicy::Warn => {
            warn!("Deprecated {item} of {class} accessed at {path}: {message}");
            Ok(())
        }
        DeprecationPolicy::Deny => Err(NexusAccessorError::Deprecated {
            class: class.to_owned(),
            item: item.to_owned(),
            message: message.to_owned(),
            path: path.to_owned(),
        }),
    }
}

/// A storage group bound to the schema of its NeXus class.
///
/// Accessors are obtained from a [SchemaRegistry], through
/// [SchemaRegistry::bind], [SchemaRegistry::create] or [SchemaRegistry::open],
/// or from the child operations of another accessor.
#[derive(Clone)]
pub struct SchemaBoundNode<G: GroupNode> {
    node: G,
    schema: Arc<GroupSchema>,
    registry: Arc<SchemaRegistry>,
}

impl<G: GroupNode> Debug for SchemaBoundNode<G> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaBoundNode")
            .field("class", &self.schema.class)
            .field("path", &self.node.node_path())
            .finish()
    }
}

/// Accessors are equal when they are bound to the same class over the same node.
impl<G: GroupNode + PartialEq> PartialEq for SchemaBoundNode<G> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.schema.class == other.schema.class
    }
}

impl<G: GroupNode> SchemaBoundNode<G> {
    /// Binds `node` to the schema of `class`.
    ///
    /// # Error Modes
    /// - Fails with [NexusAccessorError::UnknownClass] if `class` is not registered.
    /// - Fails with [NexusAccessorError::ClassMismatch] if the stored `NX_class` names another class.
    /// - Fails with [NexusAccessorError::Deprecated] if the class is deprecated and the policy denies it.
    pub(crate) fn bind(
        node: G,
        class: &str,
        registry: Arc<SchemaRegistry>,
    ) -> NexusAccessorResult<Self> {
        let schema = registry.get(class)?;
        match node.nx_class()? {
            Some(stored) if stored != schema.class => {
                return Err(NexusAccessorError::ClassMismatch {
                    expected: schema.class.clone(),
                    found: Some(stored),
                    path: node.node_path(),
                });
            }
            Some(_) => {}
            None => debug!(
                "Binding {} at {} which has no NX_class attribute",
                schema.class,
                node.node_path()
            ),
        }
        check_deprecation(
            registry.settings().deprecation_policy,
            &schema.class,
            "class",
            schema.deprecated.as_deref(),
            &node.node_path(),
        )?;
        Ok(Self::from_parts(node, schema, registry))
    }

    /// Pairs a node with an already resolved schema, without checking either.
    pub(crate) fn from_parts(node: G, schema: Arc<GroupSchema>, registry: Arc<SchemaRegistry>) -> Self {
        Self {
            node,
            schema,
            registry,
        }
    }

    pub fn node(&self) -> &G {
        &self.node
    }

    pub fn into_node(self) -> G {
        self.node
    }

    pub fn schema(&self) -> &GroupSchema {
        &self.schema
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// The NeXus class this node is bound to.
    pub fn class(&self) -> &str {
        &self.schema.class
    }

    pub fn name(&self) -> String {
        self.node.node_name()
    }

    pub fn path(&self) -> String {
        self.node.node_path()
    }

    fn deprecation(&self, item: &str, message: Option<&str>) -> NexusAccessorResult<()> {
        check_deprecation(
            self.registry.settings().deprecation_policy,
            &self.schema.class,
            item,
            message,
            &self.node.node_path(),
        )
    }

    /// Returns the descriptor governing `name`, applying the deprecation policy.
    fn field_descriptor(&self, name: &str) -> NexusAccessorResult<&FieldDescriptor> {
        let descriptor = self
            .schema
            .field(name)
            .ok_or_else(|| NexusAccessorError::UnknownField {
                class: self.schema.class.clone(),
                field: name.to_owned(),
                path: self.path(),
            })?;
        self.deprecation(&format!("field '{name}'"), descriptor.deprecated.as_deref())?;
        Ok(descriptor)
    }

    fn missing_field(&self, field: &str) -> NexusAccessorError {
        NexusAccessorError::MissingField {
            class: self.schema.class.clone(),
            field: field.to_owned(),
            path: self.path(),
        }
    }

    fn type_mismatch(&self, field: &str, expected: impl ToString, actual: impl ToString) -> NexusAccessorError {
        NexusAccessorError::TypeMismatch {
            class: self.schema.class.clone(),
            field: field.to_owned(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            path: self.path(),
        }
    }

    fn enum_violation(&self, field: &str, value: String, enumeration: &Enumeration) -> NexusAccessorError {
        NexusAccessorError::EnumViolation {
            class: self.schema.class.clone(),
            field: field.to_owned(),
            value,
            allowed: enumeration.items.clone(),
            path: self.path(),
        }
    }

    /// Checks `value` against a declared type and enumeration. `item` names it in errors.
    fn check_value(
        &self,
        item: &str,
        nexus_type: NexusType,
        enumeration: Option<&Enumeration>,
        value: &NexusValue,
    ) -> NexusAccessorResult<()> {
        if !nexus_type.accepts(value) {
            return Err(self.type_mismatch(item, nexus_type, value.element_type()));
        }
        if let Some(enumeration) = enumeration {
            if let Some(literal) = value
                .to_scalars()
                .iter()
                .map(ToString::to_string)
                .find(|literal| !enumeration.admits(literal))
            {
                return Err(self.enum_violation(item, literal, enumeration));
            }
        }
        Ok(())
    }

    /// Extracts the only element of `value`.
    fn single_element(&self, field: &str, value: &NexusValue) -> NexusAccessorResult<NexusScalar> {
        let cardinality = || NexusAccessorError::Cardinality {
            class: self.schema.class.clone(),
            field: field.to_owned(),
            found: value.len(),
            path: self.path(),
        };
        if value.len() != 1 {
            return Err(cardinality());
        }
        value.first().ok_or_else(cardinality)
    }

    /// Returns the stored value of a field, or its declared default.
    /// Text stored in date-time fields is returned as date-times when it parses.
    ///
    /// # Error Modes
    /// - Fails with [NexusAccessorError::UnknownField] if the schema declares no such field.
    pub fn try_get_field(&self, name: &str) -> NexusAccessorResult<Option<NexusValue>> {
        let descriptor = self.field_descriptor(name)?;
        match self.node.get_field(name)? {
            Some(field) => {
                let value = field.read_value()?;
                Ok(Some(if descriptor.nexus_type.is_datetime() {
                    value.conform_datetime()
                } else {
                    value
                }))
            }
            None => Ok(descriptor.default.clone()),
        }
    }

    /// As [Self::try_get_field], failing with [NexusAccessorError::MissingField]
    /// when the field is neither stored nor has a default.
    pub fn get_field(&self, name: &str) -> NexusAccessorResult<NexusValue> {
        self.try_get_field(name)?
            .ok_or_else(|| self.missing_field(name))
    }

    /// Writes a field, replacing any stored value, and returns the backing field
    /// so attributes can be attached to it.
    ///
    /// # Error Modes
    /// - Fails with [NexusAccessorError::UnknownField] if the schema declares no such field.
    /// - Fails with [NexusAccessorError::TypeMismatch] if the declared type does not accept `value`.
    /// - Fails with [NexusAccessorError::EnumViolation] if an element is not a declared literal
    ///   of a closed enumeration.
    #[tracing::instrument(skip_all, level = "trace", fields(class = %self.schema.class, field = name), err(level = "warn"))]
    pub fn set_field(&self, name: &str, value: impl Into<NexusValue>) -> NexusAccessorResult<G::Field> {
        let value = value.into();
        let descriptor = self.field_descriptor(name)?;
        self.check_value(
            name,
            descriptor.nexus_type,
            descriptor.enumeration.as_ref(),
            &value,
        )?;
        Ok(self.node.write_field(name, &value)?)
    }

    /// Reads a field holding exactly one element as `T`.
    ///
    /// # Error Modes
    /// - Fails with [NexusAccessorError::Cardinality] unless the field has exactly one element.
    /// - Fails with [NexusAccessorError::TypeMismatch] if the element does not convert to `T`.
    pub fn get_field_scalar<T: FromNexusScalar>(&self, name: &str) -> NexusAccessorResult<T> {
        let value = self.get_field(name)?;
        let scalar = self.single_element(name, &value)?;
        let actual = scalar.element_type();
        T::from_scalar(scalar).ok_or_else(|| self.type_mismatch(name, T::ELEMENT_TYPE, actual))
    }

    /// Writes a single element as a zero-dimensional value.
    pub fn set_field_scalar(
        &self,
        name: &str,
        scalar: impl Into<NexusScalar>,
    ) -> NexusAccessorResult<G::Field> {
        self.set_field(name, NexusValue::scalar(scalar))
    }

    /// Reads an enumerated field, which must hold one of its declared literals.
    ///
    /// # Error Modes
    /// - Fails with [NexusAccessorError::TypeMismatch] if the field declares no enumeration.
    /// - Fails with [NexusAccessorError::Cardinality] unless the field has exactly one element.
    /// - Fails with [NexusAccessorError::EnumViolation] if the stored literal is not declared.
    pub fn get_enum_field(&self, name: &str) -> NexusAccessorResult<String> {
        let descriptor = self.field_descriptor(name)?;
        let enumeration = descriptor
            .enumeration
            .as_ref()
            .ok_or_else(|| self.type_mismatch(name, "enumeration", descriptor.nexus_type))?;
        let value = self.get_field(name)?;
        let literal = self.single_element(name, &value)?.to_string();
        if !enumeration.admits(&literal) {
            return Err(self.enum_violation(name, literal, enumeration));
        }
        Ok(literal)
    }

    /// Reads an enumerated field as a typed literal, such as a [crate::schema::ModeratorType].
    /// Literals of open enumerations which `E` does not know fail with [NexusAccessorError::EnumViolation].
    pub fn get_enum_field_as<E: FromStr>(&self, name: &str) -> NexusAccessorResult<E> {
        let literal = self.get_enum_field(name)?;
        E::from_str(&literal).map_err(|_| {
            let enumeration = self
                .schema
                .field(name)
                .and_then(|descriptor| descriptor.enumeration.clone())
                .unwrap_or_default();
            self.enum_violation(name, literal.clone(), &enumeration)
        })
    }

    /// Returns every stored field governed by the descriptor `template`, keyed by stored name.
    /// For placeholders such as `AXISNAME` these are all the fields no other descriptor claims.
    pub fn get_all_fields(&self, template: &str) -> NexusAccessorResult<BTreeMap<String, NexusValue>> {
        let descriptor = self.field_descriptor(template)?;
        let mut fields = BTreeMap::new();
        for name in self.node.field_names()? {
            let governed = self
                .schema
                .field(&name)
                .is_some_and(|governing| governing.name == descriptor.name);
            if !governed {
                continue;
            }
            if let Some(field) = self.node.get_field(&name)? {
                let value = field.read_value()?;
                let value = if descriptor.nexus_type.is_datetime() {
                    value.conform_datetime()
                } else {
                    value
                };
                fields.insert(name, value);
            }
        }
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        node::{OneTempFile, memory::MemoryGroup},
        schema::{ModeratorType, NexusClass},
        settings::AccessorSettings,
        value::NexusDateTime,
    };
    use assert_approx_eq::assert_approx_eq;
    use chrono::{TimeZone, Utc};
    use ndarray::array;

    pub(super) fn registry() -> Arc<SchemaRegistry> {
        Arc::new(SchemaRegistry::with_builtin_classes().unwrap())
    }

    pub(super) fn registry_with(settings: AccessorSettings) -> Arc<SchemaRegistry> {
        Arc::new(
            SchemaRegistry::with_builtin_classes()
                .unwrap()
                .with_settings(settings),
        )
    }

    fn moderator() -> SchemaBoundNode<MemoryGroup> {
        registry()
            .create(&MemoryGroup::new_root(), "moderator", NexusClass::Moderator)
            .unwrap()
    }

    #[test]
    fn moderator_temperature_and_type() {
        let moderator = moderator();
        moderator.set_field_scalar("temperature", 300.0).unwrap();
        assert_approx_eq!(moderator.get_field_scalar::<f64>("temperature").unwrap(), 300.0);

        moderator.set_field_scalar("type", "Liquid H2").unwrap();
        assert_eq!(moderator.get_enum_field("type").unwrap(), "Liquid H2");
        assert_eq!(
            moderator.get_enum_field_as::<ModeratorType>("type").unwrap(),
            ModeratorType::LiquidHydrogen
        );

        let result = moderator.set_field_scalar("type", "Plasma");
        assert!(matches!(
            result,
            Err(NexusAccessorError::EnumViolation { ref value, .. }) if value == "Plasma"
        ));
        assert_eq!(moderator.get_enum_field("type").unwrap(), "Liquid H2");
    }

    #[test]
    fn field_value_is_returned_unchanged() {
        let moderator = moderator();
        let values = NexusValue::from(array![[1.0, 2.0], [3.0, 4.0]].into_dyn());
        moderator.set_field("temperature", values.clone()).unwrap();
        assert_eq!(moderator.get_field("temperature").unwrap(), values);
    }

    #[test]
    fn scalar_of_two_elements_is_a_cardinality_error() {
        let moderator = moderator();
        moderator.set_field("temperature", vec![290.0, 310.0]).unwrap();
        assert!(matches!(
            moderator.get_field_scalar::<f64>("temperature"),
            Err(NexusAccessorError::Cardinality { found: 2, .. })
        ));
    }

    #[test]
    fn single_element_array_is_a_scalar() {
        let moderator = moderator();
        moderator.set_field("temperature", vec![20.0]).unwrap();
        assert_approx_eq!(moderator.get_field_scalar::<f64>("temperature").unwrap(), 20.0);
    }

    #[test]
    fn wrong_type_is_rejected_before_writing() {
        let moderator = moderator();
        let result = moderator.set_field_scalar("temperature", "hot");
        assert!(matches!(
            result,
            Err(NexusAccessorError::TypeMismatch { ref expected, ref actual, .. })
                if expected == "NX_FLOAT" && actual == "Text"
        ));
        assert!(moderator.node().get_field("temperature").unwrap().is_none());
    }

    #[test]
    fn absent_fields() {
        let moderator = moderator();
        assert!(matches!(
            moderator.get_field("temperature"),
            Err(NexusAccessorError::MissingField { .. })
        ));
        assert_eq!(moderator.try_get_field("temperature").unwrap(), None);
        assert!(matches!(
            moderator.get_field("colour"),
            Err(NexusAccessorError::UnknownField { .. })
        ));
    }

    #[test]
    fn defaults_are_returned_for_absent_fields() {
        let moderator = moderator();
        assert_eq!(
            moderator.get_field_scalar::<String>("depends_on").unwrap(),
            "."
        );
        moderator.set_field_scalar("depends_on", "transformations/z").unwrap();
        assert_eq!(
            moderator.get_field_scalar::<String>("depends_on").unwrap(),
            "transformations/z"
        );
    }

    #[test]
    fn scalar_conversion_failure_is_a_type_mismatch() {
        let moderator = moderator();
        moderator.set_field_scalar("temperature", 4.5).unwrap();
        assert!(matches!(
            moderator.get_field_scalar::<bool>("temperature"),
            Err(NexusAccessorError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn enum_access_on_plain_field_is_a_type_mismatch() {
        let moderator = moderator();
        moderator.set_field_scalar("temperature", 4.5).unwrap();
        assert!(matches!(
            moderator.get_enum_field("temperature"),
            Err(NexusAccessorError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn stored_undeclared_literal_is_reported_on_read() {
        let moderator = moderator();
        moderator
            .node()
            .write_field("type", &NexusValue::from("Plasma"))
            .unwrap();
        assert!(matches!(
            moderator.get_enum_field("type"),
            Err(NexusAccessorError::EnumViolation { .. })
        ));
    }

    #[test]
    fn date_time_text_is_conformed() {
        let root = MemoryGroup::new_root();
        let entry = registry().create(&root, "entry", NexusClass::Entry).unwrap();
        let start = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();

        entry
            .node()
            .write_field("start_time", &NexusValue::from("2025-03-14T09:26:53+0000"))
            .unwrap();
        assert_eq!(
            entry.get_field_scalar::<NexusDateTime>("start_time").unwrap(),
            start
        );
        assert_eq!(entry.get_field("start_time").unwrap(), NexusValue::from(start));

        assert!(entry.set_field_scalar("end_time", "later").is_err());
        entry.set_field_scalar("end_time", start).unwrap();
    }

    #[test]
    fn placeholder_fields_are_collected() {
        let root = MemoryGroup::new_root();
        let transformations = registry()
            .create(&root, "transformations", NexusClass::Transformations)
            .unwrap();
        assert!(transformations.get_all_fields("AXISNAME").unwrap().is_empty());

        transformations.set_field_scalar("x", 1.0).unwrap();
        transformations.set_field_scalar("phi", 90.0).unwrap();
        let fields = transformations.get_all_fields("AXISNAME").unwrap();
        assert_eq!(
            fields.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["phi", "x"]
        );
    }

    #[test]
    fn binding_checks_stored_class() {
        let root = MemoryGroup::new_root();
        let group = root.add_new_group("source", "NXsource").unwrap();
        assert!(matches!(
            registry().bind(group.clone(), NexusClass::Moderator),
            Err(NexusAccessorError::ClassMismatch { found: Some(ref found), .. }) if found == "NXsource"
        ));
        assert_eq!(registry().bind(group, "NXsource").unwrap().class(), "NXsource");

        let plain = root.add_group("plain").unwrap();
        assert_eq!(
            registry().bind(plain, NexusClass::Slit).unwrap().path(),
            "/plain"
        );
    }

    #[test]
    fn moderator_in_file() {
        let file = OneTempFile::new("moderator_in_file");
        let moderator = registry()
            .create(&file.root(), "moderator", NexusClass::Moderator)
            .unwrap();
        moderator.set_field_scalar("temperature", 300.0).unwrap();
        moderator.set_field_units("temperature", "K").unwrap();
        assert_approx_eq!(moderator.get_field_scalar::<f64>("temperature").unwrap(), 300.0);
        assert_eq!(
            moderator.get_field_units("temperature").unwrap().as_deref(),
            Some("K")
        );

        moderator.set_field_scalar("type", "Liquid H2").unwrap();
        assert!(matches!(
            moderator.set_field_scalar("type", "Plasma"),
            Err(NexusAccessorError::EnumViolation { .. })
        ));
        assert_eq!(
            moderator.get_enum_field_as::<ModeratorType>("type").unwrap(),
            ModeratorType::LiquidHydrogen
        );
        assert!(matches!(
            moderator.set_field_scalar("temperature", "hot"),
            Err(NexusAccessorError::TypeMismatch { .. })
        ));
        assert_approx_eq!(moderator.get_field_scalar::<f64>("temperature").unwrap(), 300.0);

        let reopened = registry().open(&file.root(), "moderator").unwrap();
        assert_eq!(reopened.class(), "NXmoderator");
        assert_eq!(reopened.get_enum_field("type").unwrap(), "Liquid H2");
    }

    #[test]
    fn date_times_in_file() {
        let file = OneTempFile::new("date_times_in_file");
        let entry = registry().create(&file.root(), "entry", NexusClass::Entry).unwrap();
        let start = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();

        entry.set_field_scalar("start_time", start).unwrap();
        assert_eq!(
            entry.get_field_scalar::<NexusDateTime>("start_time").unwrap(),
            start
        );
        assert_eq!(entry.get_field("start_time").unwrap(), NexusValue::from(start));
    }

    #[test]
    fn failed_set_in_file_keeps_stored_value() {
        let file = OneTempFile::new("failed_set_in_file_keeps_stored_value");
        let entry = registry().create(&file.root(), "entry", NexusClass::Entry).unwrap();
        entry.set_field_scalar("title", "Run 1").unwrap();

        assert!(entry.set_field_scalar("title", "bad\0title").is_err());
        assert_eq!(entry.get_field_scalar::<String>("title").unwrap(), "Run 1");
        assert_eq!(entry.node().field_names().unwrap(), vec!["title".to_owned()]);

        entry.set_field_scalar("title", "Run 2").unwrap();
        assert_eq!(entry.get_field_scalar::<String>("title").unwrap(), "Run 2");
    }
}
