use serde::{Deserialize, Serialize};

use crate::elements::{Element, Record};
use crate::entity::{Entity, EntityKind};
use crate::error::{ModelError, ModelResult};
use crate::values::{FieldValue, Fields};

/// A logical service emitting telemetry
///
/// The name lives in the base element and is required. Deserialization also
/// accepts the `service.*` semantic-convention keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ServiceRepr")]
pub struct Service {
    #[serde(flatten)]
    pub element: Element,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Deployment environment (e.g. production, staging)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

#[derive(Deserialize)]
struct ServiceRepr {
    #[serde(flatten)]
    element: Element,
    #[serde(default, rename = "service.name")]
    service_name: Option<String>,
    #[serde(default, alias = "service.namespace")]
    namespace: Option<String>,
    #[serde(default, alias = "service.instance.id")]
    instance_id: Option<String>,
    #[serde(default, alias = "service.version")]
    version: Option<String>,
    #[serde(default, alias = "service.environment")]
    environment: Option<String>,
}

impl TryFrom<ServiceRepr> for Service {
    type Error = ModelError;

    fn try_from(repr: ServiceRepr) -> Result<Self, Self::Error> {
        let mut element = repr.element;
        if element.name.is_none() {
            element.name = repr.service_name;
        }
        if element.name.is_none() {
            return Err(ModelError::MissingField("name"));
        }
        Ok(Self {
            element,
            namespace: repr.namespace,
            instance_id: repr.instance_id,
            version: repr.version,
            environment: repr.environment,
        })
    }
}

impl Service {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut element = Element::of_kind(id, EntityKind::Service);
        element.name = Some(name.into());
        Self {
            element,
            namespace: None,
            instance_id: None,
            version: None,
            environment: None,
        }
    }

    /// Logical service name
    pub fn service_name(&self) -> &str {
        self.element.display_name()
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }
}

impl Record for Service {
    const KIND: EntityKind = EntityKind::Service;

    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn fields(&self) -> Fields {
        let mut fields = self.element.fields();
        fields.extend([
            ("namespace", FieldValue::from(self.namespace.as_ref())),
            ("instance_id", FieldValue::from(self.instance_id.as_ref())),
            ("version", FieldValue::from(self.version.as_ref())),
            ("environment", FieldValue::from(self.environment.as_ref())),
        ]);
        fields
    }

    fn from_entity(entity: &Entity) -> Option<&Self> {
        match entity {
            Entity::Service(service) => Some(service),
            _ => None,
        }
    }

    fn validate(&self) -> ModelResult<()> {
        self.element.validate()?;
        match self.element.name.as_deref() {
            Some(name) if !name.trim().is_empty() => Ok(()),
            _ => Err(ModelError::MissingField("name")),
        }
    }
}
