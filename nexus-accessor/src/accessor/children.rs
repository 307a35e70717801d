use super::SchemaBoundNode;
use crate::{
    error::{NexusAccessorError, NexusAccessorResult},
    node::GroupNode,
    schema::ChildDescriptor,
    settings::CollisionPolicy,
};
use std::{collections::BTreeMap, sync::Arc};
use tracing::debug;

impl<G: GroupNode> SchemaBoundNode<G> {
    /// Returns the declaration of `class` children, preferring one declared under `name`.
    fn child_descriptor(&self, class: &str, name: Option<&str>) -> NexusAccessorResult<&ChildDescriptor> {
        let descriptor = name
            .and_then(|name| self.schema.child_named(class, name))
            .or_else(|| self.schema.child(class))
            .ok_or_else(|| NexusAccessorError::UndeclaredChild {
                class: self.schema.class.clone(),
                child_class: class.to_owned(),
                path: self.path(),
            })?;
        self.deprecation(&format!("child {class}"), descriptor.deprecated.as_deref())?;
        Ok(descriptor)
    }

    fn missing_child(&self, class: &str, name: Option<&str>) -> NexusAccessorError {
        NexusAccessorError::MissingChild {
            class: self.schema.class.clone(),
            child_class: class.to_owned(),
            name: name.map(ToOwned::to_owned),
            path: self.path(),
        }
    }

    /// The stored subgroups whose `NX_class` is `class`, in storage order.
    fn stored_children(&self, class: &str) -> NexusAccessorResult<Vec<(String, G)>> {
        let mut children = Vec::new();
        for name in self.node.group_names()? {
            if let Some(group) = self.node.get_group(&name)? {
                if group.nx_class()?.as_deref() == Some(class) {
                    children.push((name, group));
                }
            }
        }
        Ok(children)
    }

    fn bind_child(&self, node: G, class: &str) -> NexusAccessorResult<Self> {
        Self::bind(node, class, Arc::clone(&self.registry))
    }

    /// Applies the collision policy to inserting a child under `name`.
    fn check_collision(&self, class: &str, name: &str) -> NexusAccessorResult<()> {
        if !self.node.has_member(name)? {
            return Ok(());
        }
        match self.registry.settings().collision_policy {
            CollisionPolicy::Overwrite => {
                debug!("Replacing member '{name}' of {} at {}", self.schema.class, self.path());
                Ok(())
            }
            CollisionPolicy::Reject => Err(NexusAccessorError::DuplicateName {
                class: self.schema.class.clone(),
                child_class: class.to_owned(),
                name: name.to_owned(),
                path: self.path(),
            }),
        }
    }

    /// Fails if storing children of `class` under `incoming` names would exceed a declared `maxOccurs`.
    /// A stored child under an incoming name is replaced, so it is only counted once.
    fn check_capacity(&self, class: &str, incoming: &[&str]) -> NexusAccessorResult<()> {
        let stored = self.stored_children(class)?;
        for descriptor in self.schema.children.iter().filter(|child| child.class == class) {
            let Some(max) = descriptor.max_occurs else {
                continue;
            };
            let declared_by = |name: &&str| {
                self.schema
                    .child_named(class, name)
                    .is_some_and(|declared| std::ptr::eq(declared, descriptor))
            };
            let mut names = stored
                .iter()
                .map(|(name, _)| name.as_str())
                .chain(incoming.iter().copied())
                .filter(declared_by)
                .collect::<Vec<_>>();
            names.sort_unstable();
            names.dedup();
            if names.len() > max {
                return Err(NexusAccessorError::TooManyChildren {
                    class: self.schema.class.clone(),
                    child_class: class.to_owned(),
                    max,
                    path: self.path(),
                });
            }
        }
        Ok(())
    }

    /// Links `child` under `name` and stamps its `NX_class` if it has none.
    fn link_child(&self, name: &str, child: &Self) -> NexusAccessorResult<()> {
        self.node.link_group(name, &child.node)?;
        if child.node.nx_class()?.is_none() {
            child.node.set_nx_class(child.class())?;
        }
        Ok(())
    }

    /// Returns the child of `class`. When several are stored, the one under the
    /// declared or default name is preferred, and otherwise the first in storage order.
    ///
    /// # Error Modes
    /// - Fails with [NexusAccessorError::UndeclaredChild] if the schema declares no such child.
    /// - Fails with [NexusAccessorError::MissingChild] if none is stored and the child is required.
    pub fn get_child(&self, class: impl AsRef<str>) -> NexusAccessorResult<Option<Self>> {
        let class = class.as_ref();
        let descriptor = self.child_descriptor(class, None)?;
        let preferred = descriptor.default_name();
        let children = self.stored_children(class)?;
        let index = children
            .iter()
            .position(|(name, _)| *name == preferred)
            .unwrap_or_default();
        match children.into_iter().nth(index) {
            Some((_, node)) => Ok(Some(self.bind_child(node, class)?)),
            None if descriptor.occurrence.is_required() => Err(self.missing_child(class, None)),
            None => Ok(None),
        }
    }

    /// Returns the child stored under `name`.
    ///
    /// # Error Modes
    /// - Fails with [NexusAccessorError::MissingChild] if no group is stored under `name`.
    /// - Fails with [NexusAccessorError::ClassMismatch] if the stored group has another class.
    pub fn get_child_named(&self, class: impl AsRef<str>, name: &str) -> NexusAccessorResult<Self> {
        let class = class.as_ref();
        self.child_descriptor(class, Some(name))?;
        let node = self
            .node
            .get_group(name)?
            .ok_or_else(|| self.missing_child(class, Some(name)))?;
        self.bind_child(node, class)
    }

    /// Returns every child of `class` keyed by name, which is empty when none are stored.
    pub fn get_all_children(
        &self,
        class: impl AsRef<str>,
    ) -> NexusAccessorResult<BTreeMap<String, Self>> {
        let class = class.as_ref();
        self.child_descriptor(class, None)?;
        self.stored_children(class)?
            .into_iter()
            .map(|(name, node)| Ok((name, self.bind_child(node, class)?)))
            .collect()
    }

    /// Inserts `child` under its declared name, or the name of its class without the `NX` prefix.
    pub fn set_child(&self, child: &Self) -> NexusAccessorResult<()> {
        let name = self.child_descriptor(child.class(), None)?.default_name();
        self.set_child_named(&name, child)
    }

    /// Inserts `child` under `name`. The child stays reachable from where it already was.
    ///
    /// # Error Modes
    /// - Fails with [NexusAccessorError::UndeclaredChild] if the schema does not declare the child's class.
    /// - Fails with [NexusAccessorError::DuplicateName] if `name` is in use and collisions are rejected.
    /// - Fails with [NexusAccessorError::TooManyChildren] if the declaration's `maxOccurs` is already reached.
    #[tracing::instrument(skip_all, level = "trace", fields(class = %self.schema.class, name = name), err(level = "warn"))]
    pub fn set_child_named(&self, name: &str, child: &Self) -> NexusAccessorResult<()> {
        self.child_descriptor(child.class(), Some(name))?;
        self.check_collision(child.class(), name)?;
        self.check_capacity(child.class(), &[name])?;
        self.link_child(name, child)
    }

    /// Inserts every child under its key. All entries are checked before any is inserted.
    ///
    /// # Error Modes
    /// - Fails with [NexusAccessorError::ClassMismatch] if a child is not of `class`.
    /// - Fails with [NexusAccessorError::DuplicateName] if a key is in use, or repeated,
    ///   and collisions are rejected.
    #[tracing::instrument(skip_all, level = "trace", fields(class = %self.schema.class, child_class = class.as_ref()), err(level = "warn"))]
    pub fn set_all_children<S: Into<String>>(
        &self,
        class: impl AsRef<str>,
        children: impl IntoIterator<Item = (S, Self)>,
    ) -> NexusAccessorResult<()> {
        let class = class.as_ref();
        let children = children
            .into_iter()
            .map(|(name, child)| (name.into(), child))
            .collect::<Vec<(String, Self)>>();

        let reject = self.registry.settings().collision_policy == CollisionPolicy::Reject;
        for (index, (name, child)) in children.iter().enumerate() {
            if child.class() != class {
                return Err(NexusAccessorError::ClassMismatch {
                    expected: class.to_owned(),
                    found: Some(child.class().to_owned()),
                    path: child.path(),
                });
            }
            self.child_descriptor(class, Some(name))?;
            self.check_collision(class, name)?;
            if reject && children.iter().take(index).any(|(earlier, _)| earlier == name) {
                return Err(NexusAccessorError::DuplicateName {
                    class: self.schema.class.clone(),
                    child_class: class.to_owned(),
                    name: name.clone(),
                    path: self.path(),
                });
            }
        }
        let names = children.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();
        self.check_capacity(class, &names)?;

        for (name, child) in &children {
            self.link_child(name, child)?;
        }
        Ok(())
    }

    /// Creates an empty child of `class` under `name` and returns it bound.
    pub fn create_child(&self, class: impl AsRef<str>, name: &str) -> NexusAccessorResult<Self> {
        let class = class.as_ref();
        self.child_descriptor(class, Some(name))?;
        self.check_collision(class, name)?;
        self.check_capacity(class, &[name])?;
        self.registry.create(&self.node, name, class)
    }

    /// Removes the child group stored under `name`, returning whether there was one.
    pub fn remove_child(&self, name: &str) -> NexusAccessorResult<bool> {
        if self.node.get_group(name)?.is_none() {
            return Ok(false);
        }
        Ok(self.node.remove_member(name)?)
    }
}
