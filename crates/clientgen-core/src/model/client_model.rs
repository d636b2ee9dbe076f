use std::collections::BTreeSet;
use std::sync::Arc;

use crate::codemodel::{Mutability, SchemaUsage};

use super::types::IType;

/// A resolved object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientModel {
    pub name: String,
    pub package: String,
    pub description: String,
    pub model_type: IType,
    pub parent_model_name: Option<String>,
    pub derived_models: Vec<Arc<ClientModel>>,
    pub is_polymorphic: bool,
    /// Discriminator property of this model, first in `properties` when present.
    pub polymorphic_discriminator: Option<ClientModelProperty>,
    /// Discriminators of ancestors that use a different discriminator name, root first.
    pub parent_polymorphic_discriminators: Vec<ClientModelProperty>,
    pub serialized_name: String,
    pub properties: Vec<ClientModelProperty>,
    pub property_references: Vec<ClientModelPropertyReference>,
    pub usages: BTreeSet<SchemaUsage>,
    pub xml_name: Option<String>,
    pub xml_namespace: Option<String>,
    pub serialization_formats: Vec<String>,
    pub has_additional_properties: bool,
    pub strongly_typed_header: bool,
    pub cross_language_definition_id: Option<String>,
}

impl ClientModel {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }

    pub fn property_by_serialized_name(&self, serialized_name: &str) -> Option<&ClientModelProperty> {
        self.properties
            .iter()
            .find(|p| p.serialized_name == serialized_name)
    }

    pub fn is_polymorphic_parent(&self) -> bool {
        self.is_polymorphic && !self.derived_models.is_empty()
    }
}

/// One property of a resolved model.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientModelProperty {
    pub name: String,
    pub serialized_name: String,
    pub description: String,
    pub wire_type: IType,
    pub client_type: IType,
    pub required: bool,
    pub required_for_create: bool,
    pub read_only: bool,
    pub default_value: Option<String>,
    pub is_constant: bool,
    pub client_flatten: bool,
    pub additional_properties: bool,
    pub polymorphic_discriminator: bool,
    pub needs_flatten: bool,
    pub xml: Option<XmlPropertyInfo>,
    pub mutabilities: Vec<Mutability>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlPropertyInfo {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub attribute: bool,
    pub wrapped: bool,
    pub text: bool,
    pub list_element_name: Option<String>,
}

/// Exposes a property of a client-flattened inner model as if it were declared on the outer model.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientModelPropertyReference {
    /// Name on the outer model, disambiguated against existing names.
    pub name: String,
    /// The client-flatten property of the outer model holding the inner model.
    pub target_property: ClientModelProperty,
    /// The inner model's property being exposed.
    pub referenced_property: ClientModelProperty,
    pub target_model_type: IType,
}

/// Exception class thrown for an error response model.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientException {
    pub name: String,
    pub package: String,
    pub error_type: IType,
    pub parent_type: IType,
}

/// Named response class carrying typed headers and a body.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientResponse {
    pub name: String,
    pub package: String,
    pub description: String,
    pub headers_type: IType,
    pub body_type: IType,
}

/// Materialized union of member types; only built when union materialization is enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionModel {
    pub name: String,
    pub package: String,
    pub description: String,
    pub members: Vec<IType>,
}
