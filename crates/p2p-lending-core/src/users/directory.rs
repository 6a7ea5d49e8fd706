//! Participants of the platform and their role tags.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{IdSequence, UserId};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Borrower,
    Lender,
    FieldValidator,
    FieldOfficer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Borrower => "borrower",
            Role::Lender => "lender",
            Role::FieldValidator => "field validator",
            Role::FieldOfficer => "field officer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// Read-mostly registry of users keyed by ID.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: RwLock<BTreeMap<UserId, User>>,
    ids: IdSequence,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory with one participant per role plus a second lender,
    /// issued IDs 1 through 5 in that order.
    pub fn seeded() -> Self {
        let directory = Self::new();
        directory.register("Ayu Lestari", Role::Borrower);
        directory.register("Bima Santoso", Role::Lender);
        directory.register("Citra Wulandari", Role::Lender);
        directory.register("Dewi Anggraini", Role::FieldValidator);
        directory.register("Eko Prasetyo", Role::FieldOfficer);
        directory
    }

    /// Rebuild a directory from stored users, resuming IDs after `last_issued`.
    pub fn restore(users: Vec<User>, last_issued: UserId) -> Self {
        let ids = IdSequence::starting_after(last_issued);
        let map: BTreeMap<UserId, User> = users
            .into_iter()
            .map(|u| {
                ids.observe(u.id);
                (u.id, u)
            })
            .collect();
        Self {
            users: RwLock::new(map),
            ids,
        }
    }

    pub fn next_user_id(&self) -> UserId {
        self.ids.next_id()
    }

    pub fn last_issued_id(&self) -> UserId {
        self.ids.last_issued()
    }

    /// Seed a new user under a freshly issued ID.
    pub fn register(&self, name: &str, role: Role) -> User {
        let user = User {
            id: self.next_user_id(),
            name: name.to_string(),
            role,
        };
        self.users.write().insert(user.id, user.clone());
        user
    }

    pub fn get_all(&self) -> Vec<User> {
        self.users.read().values().cloned().collect()
    }

    /// `None` when no user carries this ID; callers decide what that means.
    pub fn get_by_id(&self, id: UserId) -> Option<User> {
        self.users.read().get(&id).cloned()
    }
}
