//! Root element of the taxonomy
//!
//! Every entity embeds an [`Element`] carrying identity, the type
//! discriminator, display metadata and an open attribute bag. The
//! [`Record`] trait gives uniform access to that base plus the explicit
//! per-type field registry.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::entity::{Entity, EntityKind};
use crate::error::{ModelError, ModelResult};
use crate::values::{AttributeValue, FieldValue, Fields};

/// Classification label of an element
///
/// Known labels serialize as their upper-case name; anything else is kept
/// verbatim as a free-text tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tag {
    General,
    Validation,
    Routing,
    Managing,
    Decomposition,
    Llm,
    Tools,
    Coding,
    Summarization,
    Retrieval,
    Prompting,
    Content,
    Conversational,
    Qna,
    Classification,
    Translation,
    Imaging,
    Audio,
    Video,
    Custom(String),
}

impl Tag {
    /// Label of this tag
    pub fn as_str(&self) -> &str {
        match self {
            Tag::General => "GENERAL",
            Tag::Validation => "VALIDATION",
            Tag::Routing => "ROUTING",
            Tag::Managing => "MANAGING",
            Tag::Decomposition => "DECOMPOSITION",
            Tag::Llm => "LLM",
            Tag::Tools => "TOOLS",
            Tag::Coding => "CODING",
            Tag::Summarization => "SUMMARIZATION",
            Tag::Retrieval => "RETRIEVAL",
            Tag::Prompting => "PROMPTING",
            Tag::Content => "CONTENT",
            Tag::Conversational => "CONVERSATIONAL",
            Tag::Qna => "QNA",
            Tag::Classification => "CLASSIFICATION",
            Tag::Translation => "TRANSLATION",
            Tag::Imaging => "IMAGING",
            Tag::Audio => "AUDIO",
            Tag::Video => "VIDEO",
            Tag::Custom(label) => label,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Tag {
    fn from(label: String) -> Self {
        match label.as_str() {
            "GENERAL" => Tag::General,
            "VALIDATION" => Tag::Validation,
            "ROUTING" => Tag::Routing,
            "MANAGING" => Tag::Managing,
            "DECOMPOSITION" => Tag::Decomposition,
            "LLM" => Tag::Llm,
            "TOOLS" => Tag::Tools,
            "CODING" => Tag::Coding,
            "SUMMARIZATION" => Tag::Summarization,
            "RETRIEVAL" => Tag::Retrieval,
            "PROMPTING" => Tag::Prompting,
            "CONTENT" => Tag::Content,
            "CONVERSATIONAL" => Tag::Conversational,
            "QNA" => Tag::Qna,
            "CLASSIFICATION" => Tag::Classification,
            "TRANSLATION" => Tag::Translation,
            "IMAGING" => Tag::Imaging,
            "AUDIO" => Tag::Audio,
            "VIDEO" => Tag::Video,
            _ => Tag::Custom(label),
        }
    }
}

impl From<&str> for Tag {
    fn from(label: &str) -> Self {
        Tag::from(label.to_string())
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        match tag {
            Tag::Custom(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Tag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Tag::from(s))
    }
}

/// Base data shared by every entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Caller-assigned unique identifier
    pub id: String,

    /// Type discriminator
    #[serde(rename = "type")]
    pub element_type: String,

    /// Identifier of the owning element (reference only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Natural-language description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Classification tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,

    /// Open element-specific attributes
    #[serde(default)]
    pub attributes: HashMap<String, AttributeValue>,
}

impl Element {
    /// Create an element with an identifier and type discriminator
    pub fn new(id: impl Into<String>, element_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            element_type: element_type.into(),
            owner_id: None,
            name: None,
            description: None,
            tags: None,
            attributes: HashMap::new(),
        }
    }

    /// Create the base element of a known entity kind
    pub fn of_kind(id: impl Into<String>, kind: EntityKind) -> Self {
        Self::new(id, kind.as_str())
    }

    /// Name if set, otherwise the identifier
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Check the identity fields
    pub fn validate(&self) -> ModelResult<()> {
        if self.id.trim().is_empty() {
            return Err(ModelError::MissingField("id"));
        }
        if self.element_type.trim().is_empty() {
            return Err(ModelError::MissingField("type"));
        }
        Ok(())
    }

    /// Field registry of the base element
    pub fn fields(&self) -> Fields {
        let tags = self
            .tags
            .as_ref()
            .map(|tags| FieldValue::List(tags.iter().map(FieldValue::label).collect()))
            .unwrap_or(FieldValue::Null);
        let attributes: BTreeMap<String, FieldValue> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), FieldValue::from(v)))
            .collect();

        vec![
            ("id", FieldValue::from(&self.id)),
            ("type", FieldValue::from(&self.element_type)),
            ("owner_id", FieldValue::from(self.owner_id.as_ref())),
            ("name", FieldValue::from(self.name.as_ref())),
            ("description", FieldValue::from(self.description.as_ref())),
            ("tags", tags),
            ("attributes", FieldValue::Map(attributes)),
        ]
    }
}

/// Uniform access to an entity's base element and field registry
///
/// The builder-style `with_*` methods set base fields on any entity.
pub trait Record {
    /// Entity kind of the implementing type
    const KIND: EntityKind;

    /// Base element
    fn element(&self) -> &Element;

    /// Mutable base element
    fn element_mut(&mut self) -> &mut Element;

    /// Every field of the entity, base fields included, in declaration order
    fn fields(&self) -> Fields;

    /// Borrow this type out of a type-erased entity
    fn from_entity(entity: &Entity) -> Option<&Self>;

    /// Check the entity; types with extra constraints extend this
    fn validate(&self) -> ModelResult<()> {
        self.element().validate()
    }

    /// Name if set, otherwise the identifier
    fn display_name(&self) -> &str {
        self.element().display_name()
    }

    fn id(&self) -> &str {
        &self.element().id
    }

    fn with_name(mut self, name: impl Into<String>) -> Self
    where
        Self: Sized,
    {
        self.element_mut().name = Some(name.into());
        self
    }

    fn with_description(mut self, description: impl Into<String>) -> Self
    where
        Self: Sized,
    {
        self.element_mut().description = Some(description.into());
        self
    }

    fn with_owner(mut self, owner_id: impl Into<String>) -> Self
    where
        Self: Sized,
    {
        self.element_mut().owner_id = Some(owner_id.into());
        self
    }

    fn with_tag(mut self, tag: impl Into<Tag>) -> Self
    where
        Self: Sized,
    {
        self.element_mut()
            .tags
            .get_or_insert_with(Vec::new)
            .push(tag.into());
        self
    }

    fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self
    where
        Self: Sized,
    {
        self.element_mut().attributes.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip_known_and_custom() {
        let tags: Vec<Tag> = serde_json::from_str(r#"["LLM", "my-team"]"#).unwrap();
        assert_eq!(tags, vec![Tag::Llm, Tag::Custom("my-team".to_string())]);

        let json = serde_json::to_string(&tags).unwrap();
        assert_eq!(json, r#"["LLM","my-team"]"#);
    }

    #[test]
    fn test_element_serializes_type_discriminator() {
        let element = Element::new("e1", "Agent");
        let json = serde_json::to_value(&element).unwrap();
        assert_eq!(json["type"], "Agent");
        assert!(json.get("owner_id").is_none());
    }

    #[test]
    fn test_element_validate() {
        assert!(Element::new("e1", "Agent").validate().is_ok());
        assert_eq!(
            Element::new("  ", "Agent").validate(),
            Err(ModelError::MissingField("id"))
        );
        assert_eq!(
            Element::new("e1", "").validate(),
            Err(ModelError::MissingField("type"))
        );
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let mut element = Element::new("e1", "Agent");
        assert_eq!(element.display_name(), "e1");
        element.name = Some("planner".to_string());
        assert_eq!(element.display_name(), "planner");
    }

    #[test]
    fn test_base_fields_registry() {
        let element = Element::new("e1", "Agent");
        let names: Vec<&str> = element.fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            names,
            vec!["id", "type", "owner_id", "name", "description", "tags", "attributes"]
        );
    }
}
