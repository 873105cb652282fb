use std::collections::HashSet;

/// The fixed capability set consulted by the edit/delete workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    AddPage,
    AddRevision,
    ChangePage,
    ChangeRevision,
    DeletePage,
    DeleteRevision,
}

pub const ALL_PERMISSIONS: &[Permission] = &[
    Permission::AddPage,
    Permission::AddRevision,
    Permission::ChangePage,
    Permission::ChangeRevision,
    Permission::DeletePage,
    Permission::DeleteRevision,
];

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddPage => "add_wikipage",
            Self::AddRevision => "add_revision",
            Self::ChangePage => "change_wikipage",
            Self::ChangeRevision => "change_revision",
            Self::DeletePage => "delete_wikipage",
            Self::DeleteRevision => "delete_revision",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "add_wikipage" => Some(Self::AddPage),
            "add_revision" => Some(Self::AddRevision),
            "change_wikipage" => Some(Self::ChangePage),
            "change_revision" => Some(Self::ChangeRevision),
            "delete_wikipage" => Some(Self::DeletePage),
            "delete_revision" => Some(Self::DeleteRevision),
            _ => None,
        }
    }
}

/// Capability lookup for the caller of a workflow operation. Implementations
/// live at the application boundary (session store, auth backend, CLI
/// flags); the workflow only ever asks `has`.
pub trait PermissionChecker {
    fn has(&self, permission: Permission) -> bool;

    fn has_all(&self, permissions: &[Permission]) -> bool {
        permissions.iter().all(|permission| self.has(*permission))
    }
}

/// In-memory checker used by the CLI and by tests.
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    granted: HashSet<Permission>,
}

impl PermissionSet {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            granted: ALL_PERMISSIONS.iter().copied().collect(),
        }
    }

    pub fn grant(mut self, permission: Permission) -> Self {
        self.granted.insert(permission);
        self
    }
}

impl PermissionChecker for PermissionSet {
    fn has(&self, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }
}

/// Identity of the caller, stamped into new revisions. `username` empty
/// means anonymous; `address` is the origin address string when known.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub username: Option<String>,
    pub address: Option<String>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn named(username: &str, address: Option<&str>) -> Self {
        Self {
            username: Some(username.to_string()),
            address: address.map(str::to_string),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("anonymous")
    }
}
