use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::money::{Currency, IncompatibleCurrency, Money};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EstimateId(pub u32);

impl fmt::Display for EstimateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an estimate's amount affects the ending balance. A node with
/// children is treated as a category for every calculation, regardless of
/// its declared kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateType {
    Income,
    Expense,
    Transfer,
    Category,
}

impl fmt::Display for EstimateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimateType::Income => write!(f, "Income"),
            EstimateType::Expense => write!(f, "Expense"),
            EstimateType::Transfer => write!(f, "Transfer"),
            EstimateType::Category => write!(f, "Category"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateDefinition {
    pub name: String,
    pub description: String,
    pub kind: EstimateType,
    pub amount: Money,
    pub due_date: Option<NaiveDate>,
    /// All expected activity against this estimate has occurred; only
    /// actual figures are considered from here on.
    pub finished: bool,
}

impl EstimateDefinition {
    pub fn new(name: &str, kind: EstimateType, amount: Money) -> Self {
        EstimateDefinition {
            name: name.to_string(),
            description: String::new(),
            kind,
            amount,
            due_date: None,
            finished: false,
        }
    }
}

/// Which fields actually changed during a whole-definition replace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionChanges {
    pub name: bool,
    pub description: bool,
    pub kind: bool,
    pub amount: bool,
    pub due_date: bool,
    pub finished: bool,
}

impl DefinitionChanges {
    pub fn any(self) -> bool {
        self.name
            || self.description
            || self.kind
            || self.amount
            || self.due_date
            || self.finished
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EstimateError {
    #[error("unknown estimate: {0}")]
    Unknown(EstimateId),
    #[error("the root estimate cannot be removed")]
    CannotRemoveRoot,
    #[error("the root estimate cannot be moved")]
    CannotMoveRoot,
    #[error("moving estimate {estimate} under {new_parent} would create a cycle")]
    WouldCreateCycle {
        estimate: EstimateId,
        new_parent: EstimateId,
    },
    #[error(transparent)]
    Currency(#[from] IncompatibleCurrency),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Node {
    definition: EstimateDefinition,
    parent: Option<EstimateId>,
    children: Vec<EstimateId>,
}

/// Tree of estimates stored as an arena of nodes keyed by ID. Parent and
/// child links are ID references, child order is significant and preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateTree {
    nodes: HashMap<EstimateId, Node>,
    root: EstimateId,
    next_id: u32,
}

impl EstimateTree {
    pub fn new(root_name: &str, currency: Currency) -> Self {
        let root = EstimateId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                definition: EstimateDefinition::new(
                    root_name,
                    EstimateType::Category,
                    Money::zero(currency),
                ),
                parent: None,
                children: Vec::new(),
            },
        );
        EstimateTree {
            nodes,
            root,
            next_id: 1,
        }
    }

    pub fn root(&self) -> EstimateId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: EstimateId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn definition(&self, id: EstimateId) -> Option<&EstimateDefinition> {
        self.nodes.get(&id).map(|node| &node.definition)
    }

    pub fn parent(&self, id: EstimateId) -> Option<EstimateId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: EstimateId) -> &[EstimateId] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// True when the node has children; such a node is a category for
    /// aggregation purposes whatever its declared kind says.
    pub fn is_category(&self, id: EstimateId) -> bool {
        !self.children(id).is_empty()
    }

    /// Appends a new estimate under the given parent.
    pub fn add_child(
        &mut self,
        parent: EstimateId,
        definition: EstimateDefinition,
    ) -> Result<EstimateId, EstimateError> {
        self.insert_child(parent, usize::MAX, definition)
    }

    /// Inserts a new estimate under the given parent at the given child
    /// index (clamped to the end).
    pub fn insert_child(
        &mut self,
        parent: EstimateId,
        index: usize,
        definition: EstimateDefinition,
    ) -> Result<EstimateId, EstimateError> {
        if !self.nodes.contains_key(&parent) {
            return Err(EstimateError::Unknown(parent));
        }

        let id = EstimateId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                definition,
                parent: Some(parent),
                children: Vec::new(),
            },
        );

        let parent_node = self.nodes.get_mut(&parent).expect("parent checked above");
        if parent_node.children.is_empty() {
            // The parent just became a category; its own amount, due date,
            // and finished state no longer carry meaning.
            let currency = parent_node.definition.amount.currency();
            parent_node.definition.amount = Money::zero(currency);
            parent_node.definition.due_date = None;
            parent_node.definition.finished = false;
        }
        let index = index.min(parent_node.children.len());
        parent_node.children.insert(index, id);

        Ok(id)
    }

    /// Detaches the estimate and its whole subtree, returning every removed
    /// ID so the caller can invalidate rules that reference them.
    pub fn remove(&mut self, id: EstimateId) -> Result<Vec<EstimateId>, EstimateError> {
        if id == self.root {
            return Err(EstimateError::CannotRemoveRoot);
        }
        let parent = self
            .nodes
            .get(&id)
            .ok_or(EstimateError::Unknown(id))?
            .parent;

        let removed = self.subtree(id);
        for removed_id in &removed {
            self.nodes.remove(removed_id);
        }
        if let Some(parent) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|child| *child != id);
            }
        }
        Ok(removed)
    }

    /// Moves an estimate under a new parent at the given child index.
    /// Refuses to move the root or to move a node under its own subtree.
    pub fn move_to(
        &mut self,
        id: EstimateId,
        new_parent: EstimateId,
        index: usize,
    ) -> Result<(), EstimateError> {
        if id == self.root {
            return Err(EstimateError::CannotMoveRoot);
        }
        if !self.nodes.contains_key(&id) {
            return Err(EstimateError::Unknown(id));
        }
        if !self.nodes.contains_key(&new_parent) {
            return Err(EstimateError::Unknown(new_parent));
        }

        // Walking up from the target parent must never reach the moved node.
        let mut ancestor = Some(new_parent);
        while let Some(current) = ancestor {
            if current == id {
                return Err(EstimateError::WouldCreateCycle {
                    estimate: id,
                    new_parent,
                });
            }
            ancestor = self.parent(current);
        }

        let old_parent = self.nodes.get(&id).and_then(|node| node.parent);
        if let Some(old_parent) = old_parent {
            if let Some(node) = self.nodes.get_mut(&old_parent) {
                node.children.retain(|child| *child != id);
            }
        }

        let parent_node = self
            .nodes
            .get_mut(&new_parent)
            .expect("new parent checked above");
        if parent_node.children.is_empty() {
            let currency = parent_node.definition.amount.currency();
            parent_node.definition.amount = Money::zero(currency);
            parent_node.definition.due_date = None;
            parent_node.definition.finished = false;
        }
        let index = index.min(parent_node.children.len());
        parent_node.children.insert(index, id);

        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(new_parent);
        }
        Ok(())
    }

    /// Swaps in a whole new definition, reporting exactly which fields
    /// changed. A category node keeps its zero amount; the incoming amount
    /// is ignored for it.
    pub fn replace_definition(
        &mut self,
        id: EstimateId,
        mut definition: EstimateDefinition,
    ) -> Result<DefinitionChanges, EstimateError> {
        let is_category = self.is_category(id);
        let node = self.nodes.get_mut(&id).ok_or(EstimateError::Unknown(id))?;
        if is_category {
            definition.amount = node.definition.amount;
            definition.due_date = None;
            definition.finished = false;
        }

        let old = &node.definition;
        let changes = DefinitionChanges {
            name: old.name != definition.name,
            description: old.description != definition.description,
            kind: old.kind != definition.kind,
            amount: old.amount != definition.amount,
            due_date: old.due_date != definition.due_date,
            finished: old.finished != definition.finished,
        };
        if changes.any() {
            node.definition = definition;
        }
        Ok(changes)
    }

    /// IDs of the node and all of its descendants, in pre-order.
    pub fn subtree(&self, id: EstimateId) -> Vec<EstimateId> {
        if !self.nodes.contains_key(&id) {
            return Vec::new();
        }
        let mut ids = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            ids.push(current);
            let children = self.children(current);
            for child in children.iter().rev() {
                stack.push(*child);
            }
        }
        ids
    }

    /// Deterministic pre-order traversal over every node: a node is visited
    /// before its children, children in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (EstimateId, &EstimateDefinition)> + '_ {
        self.subtree(self.root)
            .into_iter()
            .filter_map(|id| self.definition(id).map(|definition| (id, definition)))
    }

    /// Sum of the estimated amounts of all leaves under the given node, or
    /// the node's own amount if it is a leaf.
    pub fn total_estimated(&self, id: EstimateId) -> Result<Money, EstimateError> {
        let definition = self.definition(id).ok_or(EstimateError::Unknown(id))?;
        if !self.is_category(id) {
            return Ok(definition.amount);
        }
        let currency = definition.amount.currency();
        let leaves = self
            .subtree(id)
            .into_iter()
            .filter(|node_id| !self.is_category(*node_id))
            .filter_map(|node_id| self.definition(node_id).map(|leaf| leaf.amount));
        Ok(Money::sum(currency, leaves)?)
    }
}
