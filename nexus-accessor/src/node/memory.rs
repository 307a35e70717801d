//! An in-memory node tree implementing the storage contract, used where no
//! file is wanted such as tests and building structures before writing them out.
//!
//! Nodes are shared through [Rc], so a group linked under several parents is
//! one node reachable by several names. Handles compare equal when they refer
//! to the same node.
use super::{
    ConvertResult, FieldNode, GroupNode, HasAttributes, StorageError, StorageResult,
};
use crate::value::NexusValue;
use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

type NodeRef = Rc<RefCell<MemoryNode>>;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Dataset(NexusValue),
    Attribute(NexusValue),
}

#[derive(Debug)]
pub struct MemoryNode {
    /// The name the node was last created or linked under.
    name: String,
    kind: NodeKind,
    /// Only used to compute paths.
    parent: Weak<RefCell<MemoryNode>>,
    attributes: Vec<NodeRef>,
    /// Link names and nodes, in insertion order.
    members: Vec<(String, NodeRef)>,
}

impl MemoryNode {
    fn new_ref(name: &str, kind: NodeKind, parent: Weak<RefCell<MemoryNode>>) -> NodeRef {
        Rc::new(RefCell::new(Self {
            name: name.to_owned(),
            kind,
            parent,
            attributes: Vec::new(),
            members: Vec::new(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }
}

fn path_of(node: &NodeRef) -> String {
    let mut segments = Vec::new();
    let mut current = Some(Rc::clone(node));
    while let Some(node) = current {
        let node = node.borrow();
        if !node.name.is_empty() {
            segments.push(node.name.clone());
        }
        current = node.parent.upgrade();
    }
    segments.reverse();
    format!("/{}", segments.join("/"))
}

fn check_name(name: &str) -> StorageResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        Err(StorageError::invalid_name(name))
    } else {
        Ok(())
    }
}

fn read_attribute_of(node: &NodeRef, name: &str) -> Option<NexusValue> {
    node.borrow().attributes.iter().find_map(|attribute| {
        let attribute = attribute.borrow();
        match &attribute.kind {
            NodeKind::Attribute(value) if attribute.name == name => Some(value.clone()),
            _ => None,
        }
    })
}

fn write_attribute_of(node: &NodeRef, name: &str, value: &NexusValue) -> StorageResult<()> {
    check_name(name).err_path(&path_of(node))?;
    let existing = node
        .borrow()
        .attributes
        .iter()
        .find(|attribute| attribute.borrow().name == name)
        .cloned();
    match existing {
        Some(attribute) => attribute.borrow_mut().kind = NodeKind::Attribute(value.clone()),
        None => {
            let attribute =
                MemoryNode::new_ref(name, NodeKind::Attribute(value.clone()), Rc::downgrade(node));
            node.borrow_mut().attributes.push(attribute);
        }
    }
    Ok(())
}

fn attribute_names_of(node: &NodeRef) -> Vec<String> {
    node.borrow()
        .attributes
        .iter()
        .map(|attribute| attribute.borrow().name.clone())
        .collect()
}

/// A group in an in-memory tree.
#[derive(Debug, Clone)]
pub struct MemoryGroup(NodeRef);

impl PartialEq for MemoryGroup {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MemoryGroup {}

impl MemoryGroup {
    /// Creates the root of a new tree, whose path is `/`.
    pub fn new_root() -> Self {
        Self(MemoryNode::new_ref("", NodeKind::Group, Weak::new()))
    }

    /// Creates a group belonging to no tree, to be attached later with [GroupNode::link_group].
    pub fn detached(name: &str) -> Self {
        Self(MemoryNode::new_ref(name, NodeKind::Group, Weak::new()))
    }

    /// Creates a detached group with its `NX_class` attribute set.
    pub fn detached_with_class(name: &str, class: &str) -> StorageResult<Self> {
        Self::detached(name).with_string_attribute(super::NX_CLASS, class)
    }

    fn member(&self, name: &str) -> Option<NodeRef> {
        self.0
            .borrow()
            .members
            .iter()
            .find(|(link, _)| link == name)
            .map(|(_, node)| Rc::clone(node))
    }

    fn member_names(&self, is_wanted: impl Fn(&NodeKind) -> bool) -> Vec<String> {
        self.0
            .borrow()
            .members
            .iter()
            .filter(|(_, node)| is_wanted(&node.borrow().kind))
            .map(|(link, _)| link.clone())
            .collect()
    }

    fn is_self_or_ancestor(&self, node: &NodeRef) -> bool {
        let mut current = Some(Rc::clone(&self.0));
        while let Some(ancestor) = current {
            if Rc::ptr_eq(&ancestor, node) {
                return true;
            }
            current = ancestor.borrow().parent.upgrade();
        }
        false
    }

    fn push_member(&self, name: &str, node: NodeRef) {
        self.0.borrow_mut().members.push((name.to_owned(), node));
    }
}

impl HasAttributes for MemoryGroup {
    fn read_attribute(&self, name: &str) -> StorageResult<Option<NexusValue>> {
        Ok(read_attribute_of(&self.0, name))
    }

    fn write_attribute(&self, name: &str, value: &NexusValue) -> StorageResult<()> {
        write_attribute_of(&self.0, name, value)
    }

    fn attribute_names(&self) -> StorageResult<Vec<String>> {
        Ok(attribute_names_of(&self.0))
    }
}

impl GroupNode for MemoryGroup {
    type Field = MemoryField;

    fn node_name(&self) -> String {
        self.0.borrow().name.clone()
    }

    fn node_path(&self) -> String {
        path_of(&self.0)
    }

    fn get_field(&self, name: &str) -> StorageResult<Option<MemoryField>> {
        Ok(self
            .member(name)
            .filter(|node| matches!(node.borrow().kind, NodeKind::Dataset(_)))
            .map(MemoryField))
    }

    fn field_names(&self) -> StorageResult<Vec<String>> {
        Ok(self.member_names(|kind| matches!(kind, NodeKind::Dataset(_))))
    }

    fn write_field(&self, name: &str, value: &NexusValue) -> StorageResult<MemoryField> {
        check_name(name).err_path(&self.node_path())?;
        self.remove_member(name)?;
        let node = MemoryNode::new_ref(
            name,
            NodeKind::Dataset(value.clone()),
            Rc::downgrade(&self.0),
        );
        self.push_member(name, Rc::clone(&node));
        Ok(MemoryField(node))
    }

    fn get_group(&self, name: &str) -> StorageResult<Option<Self>> {
        Ok(self
            .member(name)
            .filter(|node| matches!(node.borrow().kind, NodeKind::Group))
            .map(Self))
    }

    fn group_names(&self) -> StorageResult<Vec<String>> {
        Ok(self.member_names(|kind| matches!(kind, NodeKind::Group)))
    }

    fn add_group(&self, name: &str) -> StorageResult<Self> {
        check_name(name).err_path(&self.node_path())?;
        if self.member(name).is_some() {
            return Err(StorageError::name_exists(name)).err_path(&self.node_path());
        }
        let node = MemoryNode::new_ref(name, NodeKind::Group, Rc::downgrade(&self.0));
        self.push_member(name, Rc::clone(&node));
        Ok(Self(node))
    }

    fn link_group(&self, name: &str, group: &Self) -> StorageResult<()> {
        check_name(name).err_path(&self.node_path())?;
        if self.is_self_or_ancestor(&group.0) {
            return Err(StorageError::link_cycle(group.node_path())).err_path(&self.node_path());
        }
        self.remove_member(name)?;
        {
            let mut node = group.0.borrow_mut();
            node.name = name.to_owned();
            node.parent = Rc::downgrade(&self.0);
        }
        self.push_member(name, Rc::clone(&group.0));
        Ok(())
    }

    fn remove_member(&self, name: &str) -> StorageResult<bool> {
        let Some(node) = self.member(name) else {
            return Ok(false);
        };
        self.0.borrow_mut().members.retain(|(link, _)| link != name);
        let mut node = node.borrow_mut();
        if node.parent.upgrade().is_some_and(|parent| Rc::ptr_eq(&parent, &self.0)) {
            node.parent = Weak::new();
        }
        Ok(true)
    }

    fn is_same_node(&self, other: &Self) -> StorageResult<bool> {
        Ok(self == other)
    }
}

/// A dataset in an in-memory tree.
#[derive(Debug, Clone)]
pub struct MemoryField(NodeRef);

impl PartialEq for MemoryField {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MemoryField {}

impl HasAttributes for MemoryField {
    fn read_attribute(&self, name: &str) -> StorageResult<Option<NexusValue>> {
        Ok(read_attribute_of(&self.0, name))
    }

    fn write_attribute(&self, name: &str, value: &NexusValue) -> StorageResult<()> {
        write_attribute_of(&self.0, name, value)
    }

    fn attribute_names(&self) -> StorageResult<Vec<String>> {
        Ok(attribute_names_of(&self.0))
    }
}

impl FieldNode for MemoryField {
    fn node_name(&self) -> String {
        self.0.borrow().name.clone()
    }

    fn node_path(&self) -> String {
        path_of(&self.0)
    }

    fn read_value(&self) -> StorageResult<NexusValue> {
        match &self.0.borrow().kind {
            NodeKind::Dataset(value) => Ok(value.clone()),
            _ => Err(StorageError::not_a_dataset()).err_path(&path_of(&self.0)),
        }
    }
}
