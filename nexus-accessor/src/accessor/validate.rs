//! Checks stored groups against their schema without failing on the first problem.
use super::SchemaBoundNode;
use crate::{
    error::NexusAccessorResult,
    node::{FieldNode, GroupNode, StorageResult, UNITS},
    schema::{Enumeration, FieldDescriptor, NexusType, SchemaRegistry},
    value::NexusValue,
};
use serde::Serialize;
use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};
use tracing::debug;

/// The kinds of problem [SchemaBoundNode::validate] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    MissingRequiredField,
    MissingRequiredChild,
    TypeMismatch,
    EnumViolation,
    DimensionMismatch,
    MissingUnits,
    UnknownField,
    UnreadableField,
    Deprecated,
    ClassMismatch,
    TooManyChildren,
}

/// One problem found in a stored group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub class: String,
    /// The path of the group the problem was found in.
    pub path: String,
    /// The field, attribute or child concerned.
    pub item: String,
    pub message: String,
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} '{}' of {}: {}",
            self.path, self.kind, self.item, self.class, self.message
        )
    }
}

/// Collects the violations found in one group.
struct Report<'a> {
    class: &'a str,
    path: String,
    violations: Vec<Violation>,
}

impl Report<'_> {
    fn add(&mut self, kind: ViolationKind, item: &str, message: impl Into<String>) {
        self.violations.push(Violation {
            kind,
            class: self.class.to_owned(),
            path: self.path.clone(),
            item: item.to_owned(),
            message: message.into(),
        });
    }

    /// Reports type and enumeration problems of a value declared as `nexus_type`.
    fn check_value(
        &mut self,
        item: &str,
        nexus_type: NexusType,
        enumeration: Option<&Enumeration>,
        value: &NexusValue,
    ) {
        if !nexus_type.accepts(value) {
            self.add(
                ViolationKind::TypeMismatch,
                item,
                format!("expected {nexus_type}, found {}", value.element_type()),
            );
            return;
        }
        if let Some(enumeration) = enumeration {
            for literal in value.to_scalars().iter().map(ToString::to_string) {
                if !enumeration.admits(&literal) {
                    self.add(
                        ViolationKind::EnumViolation,
                        item,
                        format!("'{literal}' is not one of [{}]", enumeration.items.join(", ")),
                    );
                    return;
                }
            }
        }
    }
}

impl<G: GroupNode> SchemaBoundNode<G> {
    /// Checks the stored group against its schema, returning every problem found.
    /// Only failures of the storage backend itself are returned as errors.
    #[tracing::instrument(skip_all, level = "debug", fields(class = %self.schema.class, path = %self.path()), err(level = "warn"))]
    pub fn validate(&self) -> NexusAccessorResult<Vec<Violation>> {
        let mut report = Report {
            class: &self.schema.class,
            path: self.path(),
            violations: Vec::new(),
        };
        if let Some(message) = &self.schema.deprecated {
            report.add(ViolationKind::Deprecated, &self.schema.class, message.as_str());
        }
        self.validate_fields(&mut report)?;
        self.validate_children(&mut report)?;
        Ok(report.violations)
    }

    fn validate_fields(&self, report: &mut Report<'_>) -> NexusAccessorResult<()> {
        let stored = self.node.field_names()?;
        for descriptor in &self.schema.fields {
            if descriptor.flexible_name || !descriptor.occurrence.is_required() {
                continue;
            }
            if descriptor.default.is_none() && !stored.contains(&descriptor.name) {
                report.add(ViolationKind::MissingRequiredField, &descriptor.name, "not stored");
            }
        }

        for name in &stored {
            let Some(descriptor) = self.schema.field(name) else {
                report.add(ViolationKind::UnknownField, name, "not declared");
                continue;
            };
            if let Some(message) = &descriptor.deprecated {
                report.add(ViolationKind::Deprecated, name, message.as_str());
            }
            if let Some(field) = self.node.get_field(name)? {
                validate_field(report, name, descriptor, &field)?;
            }
        }
        Ok(())
    }

    fn validate_children(&self, report: &mut Report<'_>) -> NexusAccessorResult<()> {
        let mut stored = Vec::new();
        for name in self.node.group_names()? {
            if let Some(group) = self.node.get_group(&name)? {
                stored.push((name, group.nx_class()?));
            }
        }

        for descriptor in &self.schema.children {
            let class = Some(descriptor.class.as_str());
            let present = match &descriptor.name {
                Some(name) => stored
                    .iter()
                    .any(|(stored_name, stored_class)| stored_name == name && stored_class.as_deref() == class),
                None => stored
                    .iter()
                    .any(|(_, stored_class)| stored_class.as_deref() == class),
            };
            let item = descriptor.name.clone().unwrap_or_else(|| descriptor.class.clone());
            if !present && descriptor.occurrence.is_required() {
                report.add(
                    ViolationKind::MissingRequiredChild,
                    &item,
                    format!("no {} stored", descriptor.class),
                );
            }
            if let Some(max) = descriptor.max_occurs {
                let count = stored
                    .iter()
                    .filter(|(name, stored_class)| {
                        stored_class
                            .as_deref()
                            .and_then(|stored_class| self.schema.child_named(stored_class, name))
                            .is_some_and(|declared| std::ptr::eq(declared, descriptor))
                    })
                    .count();
                if count > max {
                    report.add(
                        ViolationKind::TooManyChildren,
                        &item,
                        format!("{count} {} stored, at most {max} allowed", descriptor.class),
                    );
                }
            }
        }

        for (name, stored_class) in &stored {
            let declared = self
                .schema
                .children
                .iter()
                .find(|child| child.name.as_deref() == Some(name.as_str()));
            if let (Some(declared), Some(stored_class)) = (declared, stored_class) {
                if declared.class != *stored_class {
                    report.add(
                        ViolationKind::ClassMismatch,
                        name,
                        format!("expected {}, found {stored_class}", declared.class),
                    );
                }
            }
            let Some(stored_class) = stored_class else {
                continue;
            };
            if let Some(message) = self
                .schema
                .child_named(stored_class, name)
                .and_then(|child| child.deprecated.as_ref())
            {
                report.add(ViolationKind::Deprecated, name, message.as_str());
            }
        }
        Ok(())
    }

    /// Validates this group and every group below it whose class is registered.
    /// Groups with no `NX_class`, or an unregistered one, are not reported on but are
    /// searched for registered groups further down. Each stored group is validated once,
    /// however many links lead to it.
    pub fn validate_tree(&self) -> NexusAccessorResult<Vec<Violation>> {
        let mut walk = TreeWalk::new();
        walk.first_visit(&self.node)?;
        walk.violations.extend(self.validate()?);
        walk.validate_below(&self.registry, &self.node)?;
        Ok(walk.violations)
    }
}

impl SchemaRegistry {
    /// Validates every group of a registered class below `root`, which is not itself validated.
    /// See [SchemaBoundNode::validate_tree].
    #[tracing::instrument(skip_all, level = "debug", fields(path = %root.node_path()), err(level = "warn"))]
    pub fn validate_below<G: GroupNode>(
        self: &Arc<Self>,
        root: &G,
    ) -> NexusAccessorResult<Vec<Violation>> {
        let mut walk = TreeWalk::new();
        walk.first_visit(root)?;
        walk.validate_below(self, root)?;
        Ok(walk.violations)
    }
}

/// The groups reached so far while validating a tree, and what was found in them.
struct TreeWalk<G> {
    visited: Vec<G>,
    violations: Vec<Violation>,
}

impl<G: GroupNode> TreeWalk<G> {
    fn new() -> Self {
        Self {
            visited: Vec::new(),
            violations: Vec::new(),
        }
    }

    /// Records `group` as visited, returning `false` if it already was.
    fn first_visit(&mut self, group: &G) -> StorageResult<bool> {
        for visited in &self.visited {
            if visited.is_same_node(group)? {
                return Ok(false);
            }
        }
        self.visited.push(group.clone());
        Ok(true)
    }

    fn validate_below(&mut self, registry: &Arc<SchemaRegistry>, group: &G) -> NexusAccessorResult<()> {
        for name in group.group_names()? {
            let Some(child) = group.get_group(&name)? else {
                continue;
            };
            if !self.first_visit(&child)? {
                debug!("Already visited {}", child.node_path());
                continue;
            }
            match child.nx_class()? {
                Some(class) if registry.contains(&class) => {
                    let bound = SchemaBoundNode::from_parts(
                        child.clone(),
                        registry.get(&class)?,
                        Arc::clone(registry),
                    );
                    self.violations.extend(bound.validate()?);
                }
                class => debug!(
                    "Searching below {} of unknown class {}",
                    child.node_path(),
                    class.as_deref().unwrap_or("<none>")
                ),
            }
            self.validate_below(registry, &child)?;
        }
        Ok(())
    }
}

fn validate_field<F: FieldNode>(
    report: &mut Report<'_>,
    name: &str,
    descriptor: &FieldDescriptor,
    field: &F,
) -> NexusAccessorResult<()> {
    let value = match field.read_value() {
        Ok(value) if descriptor.nexus_type.is_datetime() => value.conform_datetime(),
        Ok(value) => value,
        Err(error) => {
            report.add(ViolationKind::UnreadableField, name, error.to_string());
            return Ok(());
        }
    };
    report.check_value(
        name,
        descriptor.nexus_type,
        descriptor.enumeration.as_ref(),
        &value,
    );
    if let Some(dimensions) = &descriptor.dimensions {
        if !dimensions.admits(value.shape()) {
            report.add(
                ViolationKind::DimensionMismatch,
                name,
                format!("shape {:?} does not match the declared dimensions", value.shape()),
            );
        }
    }
    if descriptor.units.is_some_and(|units| units.requires_units())
        && field.read_attribute(UNITS)?.is_none()
    {
        report.add(
            ViolationKind::MissingUnits,
            name,
            format!(
                "expected units of {}",
                descriptor.units.map(|units| units.to_string()).unwrap_or_default()
            ),
        );
    }
    for attribute in &descriptor.attributes {
        if let Some(value) = field.read_attribute(&attribute.name)? {
            report.check_value(
                &format!("{name}@{}", attribute.name),
                attribute.nexus_type,
                attribute.enumeration.as_ref(),
                &value,
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accessor::tests::registry,
        node::{OneTempFile, memory::MemoryGroup},
        schema::{NexusClass, SchemaRegistry},
    };
    use std::str::FromStr;

    fn kinds(violations: &[Violation]) -> Vec<ViolationKind> {
        violations.iter().map(|violation| violation.kind).collect()
    }

    #[test]
    fn well_formed_group_has_no_violations() {
        let root = MemoryGroup::new_root();
        let moderator = registry().create(&root, "moderator", NexusClass::Moderator).unwrap();
        moderator.set_field_scalar("temperature", 20.0).unwrap();
        moderator.set_field_units("temperature", "K").unwrap();
        moderator.set_field_scalar("type", "H20").unwrap();
        assert_eq!(moderator.validate().unwrap(), Vec::new());
    }

    #[test]
    fn stored_problems_are_reported() {
        let root = MemoryGroup::new_root();
        let moderator = registry().create(&root, "moderator", NexusClass::Moderator).unwrap();
        let node = moderator.node();
        node.write_field("temperature", &NexusValue::from("cold")).unwrap();
        node.write_field("type", &NexusValue::from("Plasma")).unwrap();
        node.write_field("colour", &NexusValue::from("blue")).unwrap();

        let violations = moderator.validate().unwrap();
        assert_eq!(
            kinds(&violations),
            vec![
                ViolationKind::TypeMismatch,
                ViolationKind::MissingUnits,
                ViolationKind::EnumViolation,
                ViolationKind::UnknownField
            ]
        );
        assert_eq!(violations[2].item, "type");
        assert_eq!(violations[2].path, "/moderator");
    }

    #[test]
    fn missing_units_are_reported() {
        let root = MemoryGroup::new_root();
        let moderator = registry().create(&root, "moderator", NexusClass::Moderator).unwrap();
        moderator.set_field_scalar("temperature", 20.0).unwrap();
        assert_eq!(
            kinds(&moderator.validate().unwrap()),
            vec![ViolationKind::MissingUnits]
        );
    }

    #[test]
    fn required_items_and_dimensions() {
        let mut registry = SchemaRegistry::with_builtin_classes().unwrap();
        registry
            .load_nxdl(
                r#"<definition name="NXbeamline">
                    <field name="length" type="NX_FLOAT" required="true"/>
                    <field name="corners" type="NX_FLOAT">
                        <dimensions rank="2"><dim index="1" value="4"/><dim index="2" value="3"/></dimensions>
                    </field>
                    <group type="NXslit" minOccurs="1"/>
                </definition>"#,
            )
            .unwrap();
        let registry = Arc::new(registry);
        let root = MemoryGroup::new_root();
        let beamline = registry.create(&root, "beamline", "NXbeamline").unwrap();
        beamline.set_field("corners", vec![0.0, 1.0, 2.0]).unwrap();

        assert_eq!(
            kinds(&beamline.validate().unwrap()),
            vec![
                ViolationKind::MissingRequiredField,
                ViolationKind::DimensionMismatch,
                ViolationKind::MissingRequiredChild
            ]
        );
    }

    #[test]
    fn deprecated_items_are_reported() {
        let root = MemoryGroup::new_root();
        let moderator = registry().create(&root, "moderator", NexusClass::Moderator).unwrap();
        moderator.create_child(NexusClass::Geometry, "geometry").unwrap();

        let violations = moderator.validate_tree().unwrap();
        assert_eq!(
            kinds(&violations),
            vec![ViolationKind::Deprecated, ViolationKind::Deprecated]
        );
        assert_eq!(violations[0].path, "/moderator");
        assert_eq!(violations[1].path, "/moderator/geometry");
    }

    #[test]
    fn tree_validation_descends_into_registered_classes() {
        let root = MemoryGroup::new_root();
        let registry = registry();
        let entry = registry.create(&root, "entry", NexusClass::Entry).unwrap();
        let instrument = entry.create_child(NexusClass::Instrument, "instrument").unwrap();
        let source = instrument.create_child(NexusClass::Source, "source").unwrap();
        source.node().write_field("probe", &NexusValue::from("sound")).unwrap();
        instrument.node().add_new_group("custom", "NXcustom").unwrap();

        let violations = entry.validate_tree().unwrap();
        assert_eq!(kinds(&violations), vec![ViolationKind::EnumViolation]);
        assert_eq!(violations[0].path, "/entry/instrument/source");
        assert_eq!(
            violations[0].to_string(),
            "/entry/instrument/source: enum_violation 'probe' of NXsource: 'sound' is not one of \
             [neutron, photon, x-ray, muon, electron, ultraviolet, visible light, positron, proton]"
        );
    }

    #[test]
    fn classes_below_unknown_groups_are_validated() {
        let root = MemoryGroup::new_root();
        let registry = registry();
        let entry = registry.create(&root, "entry", NexusClass::Entry).unwrap();
        let custom = entry.node().add_new_group("custom", "NXcustom").unwrap();
        let plain = custom.add_group("plain").unwrap();
        let source = registry.create(&plain, "source", NexusClass::Source).unwrap();
        source.node().write_field("probe", &NexusValue::from("sound")).unwrap();

        let violations = entry.validate_tree().unwrap();
        assert_eq!(kinds(&violations), vec![ViolationKind::EnumViolation]);
        assert_eq!(violations[0].path, "/entry/custom/plain/source");

        assert_eq!(registry.validate_below(&root).unwrap(), violations);
    }

    #[test]
    fn shared_group_is_validated_once() {
        let root = MemoryGroup::new_root();
        let registry = registry();
        let entry = registry.create(&root, "entry", NexusClass::Entry).unwrap();
        let instrument = entry.create_child(NexusClass::Instrument, "instrument").unwrap();
        let source = instrument.create_child(NexusClass::Source, "source").unwrap();
        source.node().write_field("probe", &NexusValue::from("sound")).unwrap();
        let custom = entry.node().add_new_group("custom", "NXcustom").unwrap();
        custom.link_group("source", source.node()).unwrap();

        let violations = entry.validate_tree().unwrap();
        assert_eq!(kinds(&violations), vec![ViolationKind::EnumViolation]);
    }

    #[test]
    fn excess_children_are_reported() {
        let mut registry = SchemaRegistry::with_builtin_classes().unwrap();
        registry
            .load_nxdl(
                r#"<definition name="NXbeamline">
                    <group type="NXslit" maxOccurs="1"/>
                    <group type="NXsource" name="source" maxOccurs="1"/>
                </definition>"#,
            )
            .unwrap();
        let registry = Arc::new(registry);
        let root = MemoryGroup::new_root();
        let beamline = registry.create(&root, "beamline", "NXbeamline").unwrap();
        beamline.node().add_new_group("entrance", "NXslit").unwrap();
        beamline.node().add_new_group("source", "NXsource").unwrap();
        assert_eq!(beamline.validate().unwrap(), Vec::new());

        beamline.node().add_new_group("exit", "NXslit").unwrap();
        let violations = beamline.validate().unwrap();
        assert_eq!(kinds(&violations), vec![ViolationKind::TooManyChildren]);
        assert_eq!(violations[0].item, "NXslit");
        assert_eq!(violations[0].message, "2 NXslit stored, at most 1 allowed");
    }

    #[test]
    fn linked_cycle_in_file_is_validated_once() {
        let file = OneTempFile::new("linked_cycle_in_file_is_validated_once");
        let registry = registry();
        let entry = registry.create(&file.root(), "entry", NexusClass::Entry).unwrap();
        let instrument = entry.create_child(NexusClass::Instrument, "instrument").unwrap();
        let source = instrument.create_child(NexusClass::Source, "source").unwrap();
        source.node().write_field("probe", &NexusValue::from("sound")).unwrap();
        instrument.node().link_hard("/entry", "loop").unwrap();
        instrument.node().link_hard("/entry/instrument/source", "alias").unwrap();

        let violations = entry.validate_tree().unwrap();
        assert_eq!(kinds(&violations), vec![ViolationKind::EnumViolation]);

        let violations = registry.validate_below(&file.root()).unwrap();
        assert_eq!(kinds(&violations), vec![ViolationKind::EnumViolation]);
    }

    #[test]
    fn kinds_parse_from_snake_case() {
        assert_eq!(
            ViolationKind::from_str("missing_units").unwrap(),
            ViolationKind::MissingUnits
        );
    }
}
