//! Aggregate output of one debate run.

use serde::{Deserialize, Serialize};

use super::parser::Sections;
use super::roles::Role;

/// Headline and full body produced by one role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleOutput {
    pub headline: String,
    pub full_body: String,
}

impl From<Sections> for RoleOutput {
    fn from(sections: Sections) -> Self {
        Self {
            headline: sections.headline,
            full_body: sections.full_body,
        }
    }
}

/// The material plus all three role outputs.
///
/// Built empty at run start and filled in by the orchestrator as each phase
/// completes. Only returned once the run has succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateResult {
    pub material: String,
    pub pro: RoleOutput,
    pub con: RoleOutput,
    pub judge: RoleOutput,
    /// Where the report was written, if persistence ran and succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
}

impl DebateResult {
    pub fn new(material: impl Into<String>) -> Self {
        Self {
            material: material.into(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, role: Role, output: RoleOutput) {
        *self.slot_mut(role) = output;
    }

    pub fn output(&self, role: Role) -> &RoleOutput {
        match role {
            Role::Pro => &self.pro,
            Role::Con => &self.con,
            Role::Judge => &self.judge,
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut RoleOutput {
        match role {
            Role::Pro => &mut self.pro,
            Role::Con => &mut self.con,
            Role::Judge => &mut self.judge,
        }
    }
}
