use super::{GroupSchema, NexusClass, parse_nxdl};
use crate::{
    accessor::{SchemaBoundNode, check_deprecation},
    error::{NexusAccessorError, NexusAccessorResult},
    node::GroupNode,
    settings::AccessorSettings,
    value::NexusValue,
};
use std::{collections::HashMap, path::Path, sync::Arc};
use strum::IntoEnumIterator;
use tracing::{debug, info};

const DEPENDS_ON: &str = "depends_on";

/// Resolves class names to their schemas and binds storage nodes to them.
///
/// Accessors hold the registry they were bound through, so it is shared behind an [Arc]
/// once populated.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    classes: HashMap<String, Arc<GroupSchema>>,
    settings: AccessorSettings,
}

impl SchemaRegistry {
    pub fn new(settings: AccessorSettings) -> Self {
        Self {
            classes: HashMap::new(),
            settings,
        }
    }

    /// Creates a registry holding every [NexusClass], with default settings.
    pub fn with_builtin_classes() -> NexusAccessorResult<Self> {
        let mut registry = Self::default();
        registry.load_builtin_classes()?;
        Ok(registry)
    }

    pub fn with_settings(self, settings: AccessorSettings) -> Self {
        Self { settings, ..self }
    }

    pub fn settings(&self) -> &AccessorSettings {
        &self.settings
    }

    /// Parses the embedded definitions. Components positioned by a `depends_on`
    /// field default it to `"."`, the origin of the coordinate system.
    #[tracing::instrument(skip_all, level = "debug", err(level = "warn"))]
    pub fn load_builtin_classes(&mut self) -> NexusAccessorResult<()> {
        for class in NexusClass::iter() {
            let mut schema = parse_nxdl(class.nxdl())?;
            if let Some(depends_on) = schema.exact_field_mut(DEPENDS_ON) {
                depends_on.default = Some(NexusValue::from("."));
            }
            self.register(schema);
        }
        Ok(())
    }

    /// Parses an NXDL document and registers it, replacing any definition of the same class.
    pub fn load_nxdl(&mut self, xml: &str) -> NexusAccessorResult<Arc<GroupSchema>> {
        Ok(self.register(parse_nxdl(xml)?))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(path = %path.display()), err(level = "warn"))]
    pub fn load_nxdl_file(&mut self, path: &Path) -> NexusAccessorResult<Arc<GroupSchema>> {
        let xml = std::fs::read_to_string(path)?;
        let schema = parse_nxdl(&xml).map_err(|error| NexusAccessorError::NxdlFile {
            path: path.to_owned(),
            error,
        })?;
        Ok(self.register(schema))
    }

    /// Loads every `*.nxdl.xml` file in `dir`, returning how many were loaded.
    #[tracing::instrument(skip_all, level = "debug", fields(dir = %dir.display()), err(level = "warn"))]
    pub fn load_nxdl_dir(&mut self, dir: &Path) -> NexusAccessorResult<usize> {
        let pattern = dir
            .join("*.nxdl.xml")
            .to_str()
            .map(ToOwned::to_owned)
            .ok_or_else(|| NexusAccessorError::CannotConvertPath(dir.to_owned()))?;

        let mut loaded = 0;
        for path in glob::glob(&pattern)? {
            self.load_nxdl_file(&path?)?;
            loaded += 1;
        }
        info!("Loaded {loaded} NXDL definitions from {}", dir.display());
        Ok(loaded)
    }

    /// Adds a schema, replacing any definition of the same class.
    pub fn register(&mut self, schema: GroupSchema) -> Arc<GroupSchema> {
        let schema = Arc::new(schema);
        if self
            .classes
            .insert(schema.class.clone(), Arc::clone(&schema))
            .is_some()
        {
            debug!("Replaced definition of {}", schema.class);
        }
        schema
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    /// Returns the schema of `class` with the declarations of every registered ancestor merged in.
    /// Ancestors which are not registered, such as `NXobject`, end the chain.
    pub fn get(&self, class: &str) -> NexusAccessorResult<Arc<GroupSchema>> {
        let schema = self
            .classes
            .get(class)
            .ok_or_else(|| NexusAccessorError::UnknownClass(class.to_owned()))?;

        let mut parent = schema.extends.as_deref().and_then(|parent| self.classes.get(parent));
        if parent.is_none() {
            return Ok(Arc::clone(schema));
        }

        let mut resolved = GroupSchema::clone(schema);
        let mut visited = vec![schema.class.as_str()];
        while let Some(ancestor) = parent {
            if visited.contains(&ancestor.class.as_str()) {
                return Err(NexusAccessorError::CyclicInheritance(class.to_owned()));
            }
            visited.push(&ancestor.class);
            resolved.inherit_from(ancestor);
            parent = ancestor
                .extends
                .as_deref()
                .and_then(|parent| self.classes.get(parent));
        }
        Ok(Arc::new(resolved))
    }

    /// The registered class names, sorted.
    pub fn classes(&self) -> Vec<&str> {
        let mut classes = self.classes.keys().map(String::as_str).collect::<Vec<_>>();
        classes.sort_unstable();
        classes
    }

    /// Sets the value returned for `field` of `class` when it is not stored.
    pub fn set_field_default(
        &mut self,
        class: &str,
        field: &str,
        value: impl Into<NexusValue>,
    ) -> NexusAccessorResult<()> {
        let schema = self
            .classes
            .get_mut(class)
            .ok_or_else(|| NexusAccessorError::UnknownClass(class.to_owned()))?;
        let descriptor = Arc::make_mut(schema).exact_field_mut(field).ok_or_else(|| {
            NexusAccessorError::UnknownSchemaField {
                class: class.to_owned(),
                field: field.to_owned(),
            }
        })?;
        descriptor.default = Some(value.into());
        Ok(())
    }

    /// Binds an existing group to `class`.
    pub fn bind<G: GroupNode>(
        self: &Arc<Self>,
        node: G,
        class: impl AsRef<str>,
    ) -> NexusAccessorResult<SchemaBoundNode<G>> {
        SchemaBoundNode::bind(node, class.as_ref(), Arc::clone(self))
    }

    /// Creates a group of `class` under `parent` and binds it.
    /// Any existing member of that name is replaced, once the class is known to be usable.
    pub fn create<G: GroupNode>(
        self: &Arc<Self>,
        parent: &G,
        name: &str,
        class: impl AsRef<str>,
    ) -> NexusAccessorResult<SchemaBoundNode<G>> {
        let class = class.as_ref();
        let schema = self.get(class)?;
        check_deprecation(
            self.settings.deprecation_policy,
            &schema.class,
            "class",
            schema.deprecated.as_deref(),
            &parent.node_path(),
        )?;
        parent.remove_member(name)?;
        let node = parent.add_new_group(name, &schema.class)?;
        Ok(SchemaBoundNode::from_parts(node, schema, Arc::clone(self)))
    }

    /// Opens the group `name` under `parent`, bound to the class its `NX_class` attribute names.
    pub fn open<G: GroupNode>(
        self: &Arc<Self>,
        parent: &G,
        name: &str,
    ) -> NexusAccessorResult<SchemaBoundNode<G>> {
        let node = parent
            .get_group(name)?
            .ok_or_else(|| NexusAccessorError::MissingChild {
                class: parent.nx_class().ok().flatten().unwrap_or_default(),
                child_class: "NXobject".to_owned(),
                name: Some(name.to_owned()),
                path: parent.node_path(),
            })?;
        self.bind_stored_class(node)
    }

    /// Binds a group to the class its `NX_class` attribute names.
    pub fn bind_stored_class<G: GroupNode>(
        self: &Arc<Self>,
        node: G,
    ) -> NexusAccessorResult<SchemaBoundNode<G>> {
        match node.nx_class()? {
            Some(class) => SchemaBoundNode::bind(node, &class, Arc::clone(self)),
            None => Err(NexusAccessorError::ClassMismatch {
                expected: "NX_class".to_owned(),
                found: None,
                path: node.node_path(),
            }),
        }
    }
}
