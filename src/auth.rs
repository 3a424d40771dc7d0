//! Identity and authorization collaborators.
//!
//! The core never stores credentials or role assignments. The host
//! authenticates the caller and asserts identity, roles, capabilities and
//! the paid-registration flag; here they are opaque predicates on an
//! [`Actor`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    AssignReviewers,
    ManageWorkflow,
}

impl Capability {
    pub fn parse(s: &str) -> Option<Capability> {
        match s {
            "assign_reviewers" => Some(Capability::AssignReviewers),
            "manage_workflow" => Some(Capability::ManageWorkflow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Editor,
    Reviewer,
    EnfruteEditor,
    EnfruteReviewer,
    SencoEditor,
    SencoReviewer,
    Author,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "editor" => Some(Role::Editor),
            "reviewer" => Some(Role::Reviewer),
            "enfrute_editor" => Some(Role::EnfruteEditor),
            "enfrute_reviewer" => Some(Role::EnfruteReviewer),
            "senco_editor" => Some(Role::SencoEditor),
            "senco_reviewer" => Some(Role::SencoReviewer),
            "author" => Some(Role::Author),
            _ => None,
        }
    }

    /// Roles that may be assigned as reviewer of a submission.
    pub fn reviewer_eligible(roles: &HashSet<Role>) -> bool {
        roles.iter().any(|role| {
            matches!(
                role,
                Role::Admin
                    | Role::Editor
                    | Role::Reviewer
                    | Role::EnfruteReviewer
                    | Role::SencoReviewer
            )
        })
    }
}

/// The authenticated caller of a workflow operation.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: UserId,
    pub roles: HashSet<Role>,
    pub capabilities: HashSet<Capability>,
    /// Host-supplied flag: the actor holds a paid event registration.
    pub paid_registration: bool,
}

impl Actor {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            roles: HashSet::new(),
            capabilities: HashSet::new(),
            paid_registration: false,
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}
