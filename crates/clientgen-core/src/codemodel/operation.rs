use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of an operation: its group index and its index within the group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationKey {
    pub group: usize,
    pub index: usize,
}

/// Stable identity of a request within its operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestKey {
    pub operation: OperationKey,
    pub index: usize,
    /// The request belongs to the operation's convenience API rather than its protocol requests.
    pub convenience: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OperationGroup {
    /// Empty for operations that sit directly on the service client.
    pub name: String,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Operation {
    #[serde(skip)]
    pub key: OperationKey,
    #[serde(skip)]
    pub group_name: String,
    pub name: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub api_versions: Vec<String>,
    pub requests: Vec<Request>,
    pub responses: Vec<Response>,
    pub exceptions: Vec<Response>,
    pub extensions: Extensions,
    pub convenience_api: Option<ConvenienceApi>,
    pub internal_api: bool,
    pub generate_protocol_api: Option<bool>,
    pub lro_metadata: Option<LongRunningMetadata>,
    pub special_headers: Vec<String>,
    pub cross_language_definition_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Extensions {
    pub long_running: bool,
    pub pageable: Option<Pageable>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pageable {
    pub item_name: String,
    pub next_link_name: Option<String>,
    /// Name of the operation in the same group that fetches the next page.
    pub next_operation: Option<String>,
    #[serde(skip)]
    pub next_operation_key: Option<OperationKey>,
    /// Serialized names of query parameters re-injected into the next-link request.
    pub next_link_reinjected_parameters: Vec<String>,
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            item_name: "value".to_string(),
            next_link_name: None,
            next_operation: None,
            next_operation_key: None,
            next_link_reinjected_parameters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConvenienceApi {
    pub name: String,
    pub requests: Vec<Request>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LongRunningMetadata {
    pub poll_result_type: String,
    pub final_result_type: Option<String>,
    pub polling_strategy: Option<String>,
    pub final_result_property_serialized_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Request {
    #[serde(skip)]
    pub key: RequestKey,
    pub parameters: Vec<Parameter>,
    /// Names of the parameters that appear in the method signature.
    /// Defaults to every method-implemented, non-constant, non-flattened, ungrouped parameter.
    pub signature_parameters: Vec<String>,
    pub http: HttpRequest,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub uri: String,
    pub media_types: Vec<String>,
    pub known_media_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Get,
    Put,
    Post,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    /// Verbs that accept repeatable-request headers.
    pub fn supports_repeatability(self) -> bool {
        matches!(
            self,
            HttpMethod::Put | HttpMethod::Patch | HttpMethod::Delete | HttpMethod::Post
        )
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
    Uri,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImplementationLocation {
    Client,
    #[default]
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SerializationStyle {
    Simple,
    Form,
    SpaceDelimited,
    PipeDelimited,
    TabDelimited,
    Binary,
    Json,
    Xml,
}

pub const API_VERSION_ORIGIN: &str = "modelerfour:synthesized/api-version";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Parameter {
    pub name: String,
    pub serialized_name: Option<String>,
    pub schema: String,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub location: ParameterLocation,
    pub implementation: ImplementationLocation,
    pub required: bool,
    pub nullable: bool,
    pub flattened: bool,
    /// Name of the grouping parameter this parameter is packaged into.
    pub grouped_by: Option<String>,
    /// Name of the body parameter this parameter was spread from.
    pub original_parameter: Option<String>,
    /// Name of the property of the original parameter's model this parameter writes to.
    pub target_property: Option<String>,
    pub style: Option<SerializationStyle>,
    pub explode: bool,
    pub skip_url_encoding: bool,
    pub origin: Option<String>,
    pub header_collection_prefix: Option<String>,
    pub added_in_versions: Vec<String>,
    pub client_default_value: Option<String>,
}

impl Parameter {
    pub fn serialized_name(&self) -> &str {
        self.serialized_name.as_deref().unwrap_or(&self.name)
    }

    /// Whether the parameter travels over HTTP at all.
    pub fn has_http(&self) -> bool {
        self.location != ParameterLocation::None
    }

    pub fn is_api_version(&self) -> bool {
        self.origin.as_deref() == Some(API_VERSION_ORIGIN)
    }

    pub fn is_client(&self) -> bool {
        self.implementation == ImplementationLocation::Client
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Response {
    pub schema: Option<String>,
    pub status_codes: Vec<String>,
    pub media_types: Vec<String>,
    pub headers: Vec<ResponseHeader>,
    pub binary: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResponseHeader {
    pub header: String,
    pub schema: Option<String>,
    pub description: Option<String>,
}

impl Operation {
    pub fn is_pageable(&self) -> bool {
        self.extensions.pageable.is_some()
    }

    pub fn is_long_running(&self) -> bool {
        self.extensions.long_running
    }

    /// HTTP verb of the first request.
    pub fn http_method(&self) -> HttpMethod {
        self.requests
            .first()
            .map(|r| r.http.method)
            .unwrap_or_default()
    }

    /// Operation id, defaulting to `{group}_{name}` for grouped operations.
    pub fn operation_id(&self) -> String {
        match &self.operation_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ if self.group_name.is_empty() => self.name.clone(),
            _ => format!("{}_{}", self.group_name, self.name),
        }
    }

    /// Distinct request media types across every request of the operation.
    pub fn content_type_count(&self) -> usize {
        let mut seen: Vec<&str> = Vec::new();
        for media_type in self.requests.iter().flat_map(|r| r.http.media_types.iter()) {
            if !seen.contains(&media_type.as_str()) {
                seen.push(media_type);
            }
        }
        seen.len()
    }

    /// All responses followed by all exceptions.
    pub fn all_responses(&self) -> impl Iterator<Item = &Response> {
        self.responses.iter().chain(self.exceptions.iter())
    }
}

impl Request {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn is_signature_parameter(&self, parameter: &Parameter) -> bool {
        self.signature_parameters.iter().any(|n| *n == parameter.name)
    }
}
