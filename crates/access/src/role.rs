//! Role enumeration.

use std::fmt;

/// The closed set of principal roles.
///
/// The profile table stores a free-form string; anything unrecognized (or a
/// missing profile row) maps to [`Role::Unknown`], which carries no
/// privileges. `Admin` bypasses tenant-membership checks everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Owner-admin; bypasses membership checks.
    Admin,
    /// Internal staff.
    Staff,
    /// Internal sales.
    Sales,
    /// External partner with internal-grade action access.
    Partner,
    /// A tenant's own client login.
    Client,
    /// No profile row, or an unrecognized role string.
    Unknown,
}

impl Role {
    /// Parse the stored role string. Never fails; unrecognized values
    /// become `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            "user" | "staff" => Role::Staff,
            "sales" => Role::Sales,
            "partner" => Role::Partner,
            "client" => Role::Client,
            _ => Role::Unknown,
        }
    }

    /// Whether this role counts as internal for action endpoints.
    pub fn is_internal(self) -> bool {
        matches!(self, Role::Admin | Role::Staff | Role::Sales | Role::Partner)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Sales => "sales",
            Role::Partner => "partner",
            Role::Client => "client",
            Role::Unknown => "unknown",
        };
        f.write_str(s)
    }
}
