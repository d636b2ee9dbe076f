use std::fmt;
use std::sync::Arc;

use crate::codemodel::ParameterLocation;

use super::client_model::ClientModelProperty;
use super::proxy::ProxyMethod;
use super::types::IType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientMethodType {
    SimpleSync,
    SimpleAsync,
    SimpleSyncRestResponse,
    SimpleAsyncRestResponse,
    PagingSync,
    PagingAsync,
    PagingSyncSinglePage,
    PagingAsyncSinglePage,
    LongRunningSync,
    LongRunningAsync,
    LongRunningBeginSync,
    LongRunningBeginAsync,
}

impl ClientMethodType {
    pub fn is_sync(self) -> bool {
        matches!(
            self,
            ClientMethodType::SimpleSync
                | ClientMethodType::SimpleSyncRestResponse
                | ClientMethodType::PagingSync
                | ClientMethodType::PagingSyncSinglePage
                | ClientMethodType::LongRunningSync
                | ClientMethodType::LongRunningBeginSync
        )
    }
}

impl fmt::Display for ClientMethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Visibility of a client method; `NotGenerate` methods are dropped from the final list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    PackagePrivate,
    Private,
    NotGenerate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnValue {
    pub description: Option<String>,
    pub return_type: IType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientMethodParameter {
    pub name: String,
    pub description: String,
    pub raw_type: IType,
    pub wire_type: IType,
    pub client_type: IType,
    pub location: ParameterLocation,
    pub required: bool,
    pub is_constant: bool,
    pub default_value: Option<String>,
    pub from_client: bool,
    pub is_final: bool,
    /// API versions that introduced this parameter.
    pub added_in_versions: Vec<String>,
}

impl ClientMethodParameter {
    pub fn context() -> Self {
        Self::synthesized(
            "context",
            "The context to associate with this operation.",
            IType::context(),
        )
    }

    pub fn request_options() -> Self {
        Self::synthesized(
            "requestOptions",
            "The options to configure the HTTP request before HTTP client sends it.",
            IType::request_options(),
        )
    }

    /// A required constructor parameter of a service client.
    pub fn constructor(name: &str, description: &str, t: IType, default_value: Option<&str>) -> Self {
        Self {
            required: true,
            from_client: true,
            default_value: default_value.map(str::to_string),
            ..Self::synthesized(name, description, t)
        }
    }

    fn synthesized(name: &str, description: &str, t: IType) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            raw_type: t.clone(),
            wire_type: t.clone(),
            client_type: t,
            location: ParameterLocation::None,
            required: false,
            is_constant: false,
            default_value: None,
            from_client: false,
            is_final: false,
            added_in_versions: Vec::new(),
        }
    }
}

/// How one wire parameter is assembled from method-level parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTransformation {
    pub out_parameter: ClientMethodParameter,
    pub mappings: Vec<ParameterMapping>,
}

impl ParameterTransformation {
    /// A flattened parameter whose model has only read-only properties.
    pub fn has_no_mappings(&self) -> bool {
        self.mappings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterMapping {
    pub input_parameter: ClientMethodParameter,
    /// Property of a grouping input parameter this value is read from.
    pub input_parameter_property: Option<ClientModelProperty>,
    /// Property of the output parameter's model this value is written to.
    pub output_parameter_property: Option<ClientModelProperty>,
    pub output_parameter_property_name: Option<String>,
}

/// A property on a model, addressed from the model holding it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPropertySegment {
    pub model_name: String,
    pub property: ClientModelProperty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodPageDetails {
    pub item_property: ModelPropertySegment,
    pub next_link_property: Option<ModelPropertySegment>,
    /// Single-page method that fetches the following pages.
    pub next_method: Option<Arc<ClientMethod>>,
    /// Result type of the polling phase for pageable long-running operations.
    pub lro_intermediate_type: Option<IType>,
    pub max_page_size_parameter: Option<ClientMethodParameter>,
    pub next_link_reinjected_parameters: Vec<String>,
}

impl MethodPageDetails {
    pub fn item_name(&self) -> &str {
        &self.item_property.property.name
    }

    pub fn next_link_name(&self) -> Option<&str> {
        self.next_link_property
            .as_ref()
            .map(|s| s.property.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodPollingDetails {
    pub polling_strategy: String,
    pub sync_polling_strategy: String,
    pub intermediate_type: IType,
    pub final_type: IType,
    pub poll_interval_seconds: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImplementationDetails {
    pub comment: Option<String>,
    /// Generated on the implementation client only.
    pub implementation_only: bool,
}

/// A resolved user-facing method overload.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientMethod {
    pub name: String,
    pub description: String,
    pub method_type: ClientMethodType,
    pub return_value: ReturnValue,
    pub parameters: Vec<ClientMethodParameter>,
    pub only_required_parameters: bool,
    pub proxy_method: Arc<ProxyMethod>,
    pub required_nullable_parameter_expressions: Vec<String>,
    pub is_grouped_parameter_required: bool,
    /// `this` or `this.client`, depending on where the method lives.
    pub client_reference: String,
    pub parameter_transformations: Vec<ParameterTransformation>,
    pub page_details: Option<MethodPageDetails>,
    pub polling_details: Option<MethodPollingDetails>,
    pub visibility: Visibility,
    pub visibility_in_wrapper_client: Visibility,
    pub has_with_context_overload: bool,
    pub implementation_details: Option<ImplementationDetails>,
    pub cross_language_definition_id: Option<String>,
}

impl ClientMethod {
    /// Parameters actually present in this overload.
    pub fn method_parameters(&self) -> Vec<&ClientMethodParameter> {
        self.parameters
            .iter()
            .filter(|p| !self.only_required_parameters || p.required)
            .collect()
    }

    pub fn has_parameter_of_type(&self, t: &IType) -> bool {
        self.method_parameters().iter().any(|p| p.client_type == *t)
    }
}
