//! Ownership and free-content visibility rules.
//!
//! # Responsibility
//! - Decide read/write/delete eligibility of a principal for one resource.
//! - Provide the bulk-read filter, both as a predicate and as SQL.
//!
//! # Invariants
//! - Read: admin, owner, or `is_free`.
//! - Write (and delete): admin or owner. `is_free` never grants write.
//! - These functions are pure; they never touch storage.

use crate::model::principal::Principal;
use rusqlite::types::Value;

/// Ownership facts the policy needs from any stored entity.
pub trait Ownable {
    fn owner_id(&self) -> &str;
    fn is_free(&self) -> bool;
}

/// Returns whether `principal` may read `resource`.
pub fn can_read(principal: &Principal, resource: &impl Ownable) -> bool {
    principal.is_admin() || resource.owner_id() == principal.id || resource.is_free()
}

/// Returns whether `principal` may modify `resource`.
pub fn can_write(principal: &Principal, resource: &impl Ownable) -> bool {
    principal.is_admin() || resource.owner_id() == principal.id
}

/// Returns whether `principal` may delete `resource`. Same rule as write.
pub fn can_delete(principal: &Principal, resource: &impl Ownable) -> bool {
    can_write(principal, resource)
}

/// Bulk-read restriction for one principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFilter<'a> {
    /// Admin: every row.
    Unrestricted,
    /// Everyone else: own rows plus free rows.
    OwnedOrFree { owner_id: &'a str },
}

impl ListFilter<'_> {
    pub fn matches(&self, resource: &impl Ownable) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::OwnedOrFree { owner_id } => {
                resource.owner_id() == *owner_id || resource.is_free()
            }
        }
    }

    /// Renders the filter as a SQL predicate with positional `?` binds.
    ///
    /// `alias` prefixes column names (pass `""` for unaliased tables).
    pub fn to_sql(&self, alias: &str) -> (String, Vec<Value>) {
        match self {
            Self::Unrestricted => ("1 = 1".to_string(), Vec::new()),
            Self::OwnedOrFree { owner_id } => (
                format!("({alias}owner_id = ? OR {alias}is_free = 1)"),
                vec![Value::Text((*owner_id).to_string())],
            ),
        }
    }
}

/// Returns the bulk-read filter for `principal`.
pub fn list_filter(principal: &Principal) -> ListFilter<'_> {
    if principal.is_admin() {
        ListFilter::Unrestricted
    } else {
        ListFilter::OwnedOrFree {
            owner_id: principal.id.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{can_delete, can_read, can_write, list_filter, ListFilter, Ownable};
    use crate::model::principal::{Principal, Role};

    struct Row {
        owner: &'static str,
        free: bool,
    }

    impl Ownable for Row {
        fn owner_id(&self) -> &str {
            self.owner
        }

        fn is_free(&self) -> bool {
            self.free
        }
    }

    const ROWS: [Row; 4] = [
        Row {
            owner: "u1",
            free: false,
        },
        Row {
            owner: "u1",
            free: true,
        },
        Row {
            owner: "u2",
            free: false,
        },
        Row {
            owner: "u2",
            free: true,
        },
    ];

    #[test]
    fn read_is_admin_or_owner_or_free_for_every_role() {
        for role in Role::ALL {
            let principal = Principal::new("u1", role);
            for row in &ROWS {
                let expected = role == Role::Admin || row.owner == "u1" || row.free;
                assert_eq!(
                    can_read(&principal, row),
                    expected,
                    "role={role} owner={} free={}",
                    row.owner,
                    row.free
                );
            }
        }
    }

    #[test]
    fn free_flag_never_grants_write_to_non_owners() {
        for role in Role::ALL.into_iter().filter(|role| *role != Role::Admin) {
            let principal = Principal::new("u1", role);
            let foreign_free = &ROWS[3];
            assert!(!can_write(&principal, foreign_free));
            assert!(!can_delete(&principal, foreign_free));
        }
    }

    #[test]
    fn owner_and_admin_can_write() {
        let owner = Principal::new("u2", Role::Free);
        let admin = Principal::new("root", Role::Admin);
        for row in ROWS.iter().filter(|row| row.owner == "u2") {
            assert!(can_write(&owner, row));
        }
        for row in &ROWS {
            assert!(can_write(&admin, row));
            assert!(can_delete(&admin, row));
        }
    }

    #[test]
    fn list_filter_agrees_with_can_read() {
        for role in Role::ALL {
            let principal = Principal::new("u1", role);
            let filter = list_filter(&principal);
            for row in &ROWS {
                assert_eq!(filter.matches(row), can_read(&principal, row));
            }
        }
    }

    #[test]
    fn list_filter_sql_binds_owner_only_when_restricted() {
        let admin = Principal::new("root", Role::Admin);
        assert_eq!(list_filter(&admin), ListFilter::Unrestricted);
        let (clause, binds) = list_filter(&admin).to_sql("");
        assert_eq!(clause, "1 = 1");
        assert!(binds.is_empty());

        let builder = Principal::new("u7", Role::WorldBuilder);
        let (clause, binds) = list_filter(&builder).to_sql("c.");
        assert_eq!(clause, "(c.owner_id = ? OR c.is_free = 1)");
        assert_eq!(binds.len(), 1);
    }
}
