//! The descriptor tables a [GroupSchema] is built from.
use super::{NexusType, NexusUnitCategory};
use crate::value::NexusValue;
use serde::Serialize;

/// How often an item is expected to appear in its group.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, strum::Display, Serialize)]
pub enum Occurrence {
    Required,
    Recommended,
    #[default]
    Optional,
}

impl Occurrence {
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }
}

/// One axis of a declared shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Dim {
    Fixed(usize),
    /// A symbolic length, which only constrains the rank.
    Symbol(String),
}

static SINGLE_ELEMENT_SHAPE: [usize; 1] = [1];

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub rank: Option<usize>,
    pub dims: Vec<Dim>,
}

impl Dimensions {
    /// Whether a stored shape satisfies this declaration.
    /// Zero-dimensional values satisfy rank one declarations of length one or unknown length.
    pub fn admits(&self, shape: &[usize]) -> bool {
        let shape = if shape.is_empty() && self.expected_rank() == Some(1) {
            &SINGLE_ELEMENT_SHAPE[..]
        } else {
            shape
        };
        if self.expected_rank().is_some_and(|rank| rank != shape.len()) {
            return false;
        }
        self.dims.iter().zip(shape).all(|(dim, length)| match dim {
            Dim::Fixed(expected) => expected == length,
            Dim::Symbol(_) => true,
        })
    }

    fn expected_rank(&self) -> Option<usize> {
        self.rank
            .or_else(|| (!self.dims.is_empty()).then_some(self.dims.len()))
    }
}

/// The literals a field or attribute may take.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Enumeration {
    pub items: Vec<String>,
    /// Open enumerations list suggestions rather than restrictions.
    pub open: bool,
}

impl Enumeration {
    pub fn closed<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            open: false,
        }
    }

    pub fn admits(&self, literal: &str) -> bool {
        self.open || self.items.iter().any(|item| item == literal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeDescriptor {
    pub name: String,
    pub nexus_type: NexusType,
    pub enumeration: Option<Enumeration>,
    pub occurrence: Occurrence,
    pub deprecated: Option<String>,
}

impl AttributeDescriptor {
    pub fn new(name: &str, nexus_type: NexusType) -> Self {
        Self {
            name: name.to_owned(),
            nexus_type,
            enumeration: None,
            occurrence: Occurrence::default(),
            deprecated: None,
        }
    }

    pub fn with_enumeration(self, enumeration: Enumeration) -> Self {
        Self {
            enumeration: Some(enumeration),
            ..self
        }
    }
}

/// Describes one field a group may hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Set for upper case placeholders such as `AXISNAME`, which match any stored name.
    pub flexible_name: bool,
    pub nexus_type: NexusType,
    pub units: Option<NexusUnitCategory>,
    pub dimensions: Option<Dimensions>,
    pub enumeration: Option<Enumeration>,
    pub occurrence: Occurrence,
    pub deprecated: Option<String>,
    #[serde(skip)]
    pub default: Option<NexusValue>,
    pub attributes: Vec<AttributeDescriptor>,
}

impl FieldDescriptor {
    pub fn new(name: &str, nexus_type: NexusType) -> Self {
        Self {
            name: name.to_owned(),
            flexible_name: is_placeholder_name(name),
            nexus_type,
            units: None,
            dimensions: None,
            enumeration: None,
            occurrence: Occurrence::default(),
            deprecated: None,
            default: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_units(self, units: NexusUnitCategory) -> Self {
        Self {
            units: Some(units),
            ..self
        }
    }

    pub fn with_dimensions(self, dimensions: Dimensions) -> Self {
        Self {
            dimensions: Some(dimensions),
            ..self
        }
    }

    pub fn with_enumeration(self, enumeration: Enumeration) -> Self {
        Self {
            enumeration: Some(enumeration),
            ..self
        }
    }

    pub fn with_occurrence(self, occurrence: Occurrence) -> Self {
        Self { occurrence, ..self }
    }

    pub fn with_default(self, default: NexusValue) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }

    pub fn with_attribute(mut self, attribute: AttributeDescriptor) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn deprecated(self, message: &str) -> Self {
        Self {
            deprecated: Some(message.to_owned()),
            ..self
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }
}

/// NXDL writes names that users choose as upper case placeholders.
pub(crate) fn is_placeholder_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase()) && !name.chars().any(|c| c.is_ascii_lowercase())
}

/// Describes one kind of subgroup a group may hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildDescriptor {
    pub class: String,
    pub name: Option<String>,
    pub occurrence: Occurrence,
    /// `None` when unbounded.
    pub max_occurs: Option<usize>,
    pub deprecated: Option<String>,
}

impl ChildDescriptor {
    pub fn new(class: &str) -> Self {
        Self {
            class: class.to_owned(),
            name: None,
            occurrence: Occurrence::default(),
            max_occurs: None,
            deprecated: None,
        }
    }

    pub fn named(self, name: &str) -> Self {
        Self {
            name: Some(name.to_owned()),
            ..self
        }
    }

    pub fn with_occurrence(self, occurrence: Occurrence) -> Self {
        Self { occurrence, ..self }
    }

    /// The declared name, or the class name without its `NX` prefix.
    pub fn default_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| default_child_name(&self.class))
    }
}

fn default_child_name(class: &str) -> String {
    class.strip_prefix("NX").unwrap_or(class).to_owned()
}

/// Everything an NXDL definition declares about one group class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSchema {
    pub class: String,
    pub extends: Option<String>,
    pub deprecated: Option<String>,
    pub symbols: Vec<String>,
    pub fields: Vec<FieldDescriptor>,
    pub children: Vec<ChildDescriptor>,
    pub attributes: Vec<AttributeDescriptor>,
}

impl GroupSchema {
    pub fn new(class: &str) -> Self {
        Self {
            class: class.to_owned(),
            extends: None,
            deprecated: None,
            symbols: Vec::new(),
            fields: Vec::new(),
            children: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_child(mut self, child: ChildDescriptor) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeDescriptor) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Finds the descriptor governing a stored field name.
    /// Exact names win over placeholders, the first placeholder matches anything else.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.exact_field(name)
            .or_else(|| self.fields.iter().find(|field| field.flexible_name))
    }

    /// Finds a field declared under exactly this name, placeholders included.
    pub fn exact_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub(crate) fn exact_field_mut(&mut self, name: &str) -> Option<&mut FieldDescriptor> {
        self.fields.iter_mut().find(|field| field.name == name)
    }

    /// Finds the first child declaration of a class.
    pub fn child(&self, class: &str) -> Option<&ChildDescriptor> {
        self.children.iter().find(|child| child.class == class)
    }

    /// Finds the declaration of a class under a name, falling back to an unnamed declaration.
    pub fn child_named(&self, class: &str, name: &str) -> Option<&ChildDescriptor> {
        let mut declarations = self.children.iter().filter(|child| child.class == class);
        declarations
            .clone()
            .find(|child| child.name.as_deref() == Some(name))
            .or_else(|| declarations.find(|child| child.name.is_none()))
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    /// Adds the declarations of `parent` which this schema does not redeclare.
    pub(crate) fn inherit_from(&mut self, parent: &GroupSchema) {
        for field in &parent.fields {
            if self.exact_field(&field.name).is_none() {
                self.fields.push(field.clone());
            }
        }
        for child in &parent.children {
            if !self
                .children
                .iter()
                .any(|own| own.class == child.class && own.name == child.name)
            {
                self.children.push(child.clone());
            }
        }
        for attribute in &parent.attributes {
            if self.attribute(&attribute.name).is_none() {
                self.attributes.push(attribute.clone());
            }
        }
        for symbol in &parent.symbols {
            if !self.symbols.contains(symbol) {
                self.symbols.push(symbol.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transformations() -> GroupSchema {
        GroupSchema::new("NXtransformations")
            .with_field(FieldDescriptor::new("AXISNAME", NexusType::Number))
            .with_field(FieldDescriptor::new("depends_on", NexusType::Char))
    }

    #[test]
    fn placeholder_names() {
        assert!(is_placeholder_name("AXISNAME"));
        assert!(is_placeholder_name("DATA"));
        assert!(!is_placeholder_name("depends_on"));
        assert!(!is_placeholder_name("AXISNAME_end"));
    }

    #[test]
    fn exact_names_take_precedence() {
        let schema = transformations();
        assert_eq!(schema.field("depends_on").unwrap().name, "depends_on");
        assert_eq!(schema.field("phi").unwrap().name, "AXISNAME");
    }

    #[test]
    fn no_placeholder_means_unknown() {
        let schema = GroupSchema::new("NXslit")
            .with_field(FieldDescriptor::new("x_gap", NexusType::Number));
        assert!(schema.field("y_gap").is_none());
    }

    #[test]
    fn default_child_names_drop_prefix() {
        assert_eq!(ChildDescriptor::new("NXoff_geometry").default_name(), "off_geometry");
        assert_eq!(
            ChildDescriptor::new("NXlog").named("temperature_log").default_name(),
            "temperature_log"
        );
    }

    #[test]
    fn named_child_falls_back_to_unnamed() {
        let schema = GroupSchema::new("NXmoderator")
            .with_child(ChildDescriptor::new("NXlog").named("temperature_log"))
            .with_child(ChildDescriptor::new("NXlog"));
        assert_eq!(
            schema.child_named("NXlog", "temperature_log").unwrap().name.as_deref(),
            Some("temperature_log")
        );
        assert_eq!(schema.child_named("NXlog", "other").unwrap().name, None);
        assert!(schema.child_named("NXdata", "other").is_none());
    }

    #[test]
    fn dimensions_admit_shapes() {
        let vector = Dimensions {
            rank: Some(1),
            dims: vec![Dim::Fixed(3)],
        };
        assert!(vector.admits(&[3]));
        assert!(!vector.admits(&[4]));
        assert!(!vector.admits(&[3, 1]));

        let vertices = Dimensions {
            rank: Some(2),
            dims: vec![Dim::Symbol("i".to_owned()), Dim::Fixed(3)],
        };
        assert!(vertices.admits(&[8, 3]));
        assert!(!vertices.admits(&[8, 2]));

        let series = Dimensions {
            rank: Some(1),
            dims: vec![Dim::Symbol("n".to_owned())],
        };
        assert!(series.admits(&[]));
    }

    #[test]
    fn inheritance_keeps_overrides() {
        let parent = GroupSchema::new("NXcomponent")
            .with_field(FieldDescriptor::new("depends_on", NexusType::Char))
            .with_field(FieldDescriptor::new("distance", NexusType::Float));
        let mut child = GroupSchema::new("NXslit")
            .with_field(FieldDescriptor::new("distance", NexusType::Number));
        child.inherit_from(&parent);
        assert_eq!(child.fields.len(), 2);
        assert_eq!(child.field("distance").unwrap().nexus_type, NexusType::Number);
        assert!(child.field("depends_on").is_some());
    }

    #[test]
    fn open_enumeration_admits_anything() {
        let mut enumeration = Enumeration::closed(["in", "out"]);
        assert!(!enumeration.admits("moving"));
        enumeration.open = true;
        assert!(enumeration.admits("moving"));
    }
}
