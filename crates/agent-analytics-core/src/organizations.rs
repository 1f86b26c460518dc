use serde::{Deserialize, Serialize};

use crate::agents::Agent;
use crate::elements::{Element, Record};
use crate::entity::{Entity, EntityKind};
use crate::error::ModelResult;
use crate::iunits::Relation;
use crate::values::{FieldValue, Fields};

/// A role within an organization
///
/// Sources typically hold the organization id; destinations link the role
/// to the units filling it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    #[serde(flatten)]
    pub relation: Relation,

    /// Instructions a unit holding this role should follow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<String>>,
}

impl Role {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            relation: Relation::new(Element::of_kind(id, EntityKind::Role)),
            instructions: None,
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instructions
            .get_or_insert_with(Vec::new)
            .push(instruction.into());
        self
    }
}

impl Record for Role {
    const KIND: EntityKind = EntityKind::Role;

    fn element(&self) -> &Element {
        &self.relation.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.relation.element
    }

    fn fields(&self) -> Fields {
        let mut fields = self.relation.fields();
        fields.push(("instructions", FieldValue::from(self.instructions.as_ref())));
        fields
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::Role(role) => Some(role),
            _ => None,
        }
    }
}

/// An agent composed of roles; the only entity that owns others
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(flatten)]
    pub agent: Agent,

    #[serde(default)]
    pub roles: Vec<Role>,
}

impl Organization {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            agent: Agent::with_base(Element::of_kind(id, EntityKind::Organization)),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    /// Identifiers of the owned roles, in order
    pub fn role_ids(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.relation.element.id.clone()).collect()
    }
}

impl Record for Organization {
    const KIND: EntityKind = EntityKind::Organization;

    fn element(&self) -> &Element {
        &self.agent.iunit.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.agent.iunit.element
    }

    fn fields(&self) -> Fields {
        let mut fields = self.agent.agent_fields();
        fields.push(("roles", FieldValue::dump_list(&self.roles)));
        fields
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::Organization(org) => Some(org),
            _ => None,
        }
    }

    fn validate(&self) -> ModelResult<()> {
        self.element().validate()?;
        self.roles.iter().try_for_each(|role| role.validate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;

    #[test]
    fn test_role_ids_follow_role_order() {
        let org = Organization::new("o1")
            .with_role(Role::new("r1"))
            .with_role(Role::new("r2"));
        assert_eq!(org.role_ids(), vec!["r1".to_string(), "r2".to_string()]);
    }

    #[test]
    fn test_invalid_role_invalidates_organization() {
        let org = Organization::new("o1").with_role(Role::new(""));
        assert_eq!(org.validate(), Err(ModelError::MissingField("id")));
    }

    #[test]
    fn test_organization_roundtrip() {
        let org = Organization::new("o1")
            .with_name("support")
            .with_role(Role::new("r1").with_instruction("be polite"));
        let json = serde_json::to_string(&org).unwrap();
        let parsed: Organization = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, org);
    }
}
