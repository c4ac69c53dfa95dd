//! Organisation node model shared by every hierarchy entity type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity types that make up the organisation structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Company,
    Zone,
    Branch,
    Department,
    SubDepartment,
    Designation,
    EmployeeLevel,
}

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Company,
        NodeKind::Zone,
        NodeKind::Branch,
        NodeKind::Department,
        NodeKind::SubDepartment,
        NodeKind::Designation,
        NodeKind::EmployeeLevel,
    ];

    /// Kinds rendered by the organisation tree, top-down.
    pub const ORG_CHAIN: [NodeKind; 5] = [
        NodeKind::Company,
        NodeKind::Branch,
        NodeKind::Department,
        NodeKind::SubDepartment,
        NodeKind::Designation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Zone => "zone",
            Self::Branch => "branch",
            Self::Department => "department",
            Self::SubDepartment => "sub_department",
            Self::Designation => "designation",
            Self::EmployeeLevel => "employee_level",
        }
    }

    /// Human readable name used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Zone => "zone",
            Self::Branch => "branch",
            Self::Department => "department",
            Self::SubDepartment => "sub-department",
            Self::Designation => "designation",
            Self::EmployeeLevel => "employee level",
        }
    }

    /// URL segment under `/api`.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Company => "companies",
            Self::Zone => "zones",
            Self::Branch => "branches",
            Self::Department => "departments",
            Self::SubDepartment => "sub-departments",
            Self::Designation => "designations",
            Self::EmployeeLevel => "employee-levels",
        }
    }

    pub fn from_path_segment(segment: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.path_segment() == segment)
    }

    /// Backing table in PostgreSQL.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Company => "companies",
            Self::Zone => "zones",
            Self::Branch => "branches",
            Self::Department => "departments",
            Self::SubDepartment => "sub_departments",
            Self::Designation => "designations",
            Self::EmployeeLevel => "employee_levels",
        }
    }

    /// Kind a node's `parent_id` points at, if this kind has a parent at all.
    pub fn parent_kind(&self) -> Option<NodeKind> {
        match self {
            Self::Company | Self::Zone => None,
            Self::Branch => Some(Self::Company),
            Self::Department => Some(Self::Branch),
            Self::SubDepartment => Some(Self::Department),
            Self::Designation => Some(Self::SubDepartment),
            Self::EmployeeLevel => Some(Self::EmployeeLevel),
        }
    }

    /// Kinds whose rows hold a foreign id into this kind.
    pub fn child_kinds(&self) -> &'static [NodeKind] {
        match self {
            Self::Company => &[Self::Branch],
            Self::Zone => &[],
            Self::Branch => &[Self::Department],
            Self::Department => &[Self::SubDepartment],
            Self::SubDepartment => &[Self::Designation],
            Self::Designation => &[],
            Self::EmployeeLevel => &[Self::EmployeeLevel],
        }
    }

    pub fn is_self_referencing(&self) -> bool {
        self.parent_kind() == Some(*self)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle flag carried by every node. Does not affect ordering or deletion.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Active,
    Inactive,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Sibling scope: all nodes of one kind under the same parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scope {
    pub kind: NodeKind,
    pub parent_id: Option<Uuid>,
}

impl Scope {
    pub fn new(kind: NodeKind, parent_id: Option<Uuid>) -> Self {
        Self { kind, parent_id }
    }
}

/// A named entity in the organisation hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: Uuid,
    pub kind: NodeKind,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub order_index: i32,
    pub status: NodeStatus,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Node {
    /// Create a new active node.
    pub fn new(kind: NodeKind, name: String, parent_id: Option<Uuid>, order_index: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            name,
            parent_id,
            order_index,
            status: NodeStatus::Active,
            created_utc: now,
            updated_utc: now,
        }
    }

    pub fn scope(&self) -> Scope {
        Scope::new(self.kind, self.parent_id)
    }

    /// Bump the modification timestamp.
    pub fn touch(&mut self) {
        self.updated_utc = Utc::now();
    }
}
