use serde::{Deserialize, Serialize};

use crate::elements::{Element, Record};
use crate::entity::{Entity, EntityKind};
use crate::iunits::IUnit;
use crate::values::{FieldValue, Fields};

/// An autonomous unit able to use resources, tools and skills
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(flatten)]
    pub iunit: IUnit,

    #[serde(default)]
    pub resource_ids: Vec<String>,

    #[serde(default)]
    pub tool_ids: Vec<String>,

    /// Identifiers of the runnable skills the agent possesses
    #[serde(default)]
    pub skill_ids: Vec<String>,
}

impl Agent {
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_base(Element::of_kind(id, EntityKind::Agent))
    }

    pub(crate) fn with_base(element: Element) -> Self {
        Self {
            iunit: IUnit::new(element),
            resource_ids: Vec::new(),
            tool_ids: Vec::new(),
            skill_ids: Vec::new(),
        }
    }

    pub fn with_tool(mut self, tool_id: impl Into<String>) -> Self {
        self.tool_ids.push(tool_id.into());
        self
    }

    pub fn with_skill(mut self, skill_id: impl Into<String>) -> Self {
        self.skill_ids.push(skill_id.into());
        self
    }

    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_ids.push(resource_id.into());
        self
    }

    pub(crate) fn agent_fields(&self) -> Fields {
        let mut fields = self.iunit.fields();
        fields.extend([
            ("resource_ids", FieldValue::from(&self.resource_ids)),
            ("tool_ids", FieldValue::from(&self.tool_ids)),
            ("skill_ids", FieldValue::from(&self.skill_ids)),
        ]);
        fields
    }
}

impl Record for Agent {
    const KIND: EntityKind = EntityKind::Agent;

    fn element(&self) -> &Element {
        &self.iunit.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.iunit.element
    }

    fn fields(&self) -> Fields {
        self.agent_fields()
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::Agent(agent) => Some(agent),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_defaults() {
        let agent = Agent::new("a1").with_name("planner").with_tool("search");
        assert_eq!(agent.element().element_type, "Agent");
        assert_eq!(agent.display_name(), "planner");
        assert_eq!(agent.tool_ids, vec!["search".to_string()]);
        assert!(agent.validate().is_ok());
    }

    #[test]
    fn test_agent_deserializes_with_missing_lists() {
        let agent: Agent = serde_json::from_str(r#"{"id": "a1", "type": "Agent"}"#).unwrap();
        assert!(agent.skill_ids.is_empty());
        assert_eq!(agent.iunit.is_generated, None);
    }
}
