use indexmap::IndexMap;

use crate::codemodel::{HttpMethod, ParameterLocation};

use super::types::{GenericType, IType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionFormat {
    Csv,
    Ssv,
    Tsv,
    Pipes,
    Multi,
}

/// A parameter of a wire-level call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyMethodParameter {
    pub name: String,
    pub request_parameter_name: String,
    pub description: String,
    pub raw_type: IType,
    pub wire_type: IType,
    pub client_type: IType,
    pub location: ParameterLocation,
    pub required: bool,
    pub nullable: bool,
    pub is_constant: bool,
    pub default_value: Option<String>,
    pub from_client: bool,
    /// Expression that reads the value inside the generated client.
    pub parameter_reference: String,
    pub collection_format: Option<CollectionFormat>,
    pub explode: bool,
    pub already_encoded: bool,
    pub header_collection_prefix: Option<String>,
    pub origin: Option<String>,
}

pub const REPEATABILITY_REQUEST_ID_HEADER: &str = "repeatability-request-id";
pub const REPEATABILITY_FIRST_SENT_HEADER: &str = "repeatability-first-sent";

impl ProxyMethodParameter {
    pub fn context() -> Self {
        Self::synthesized(
            "context",
            "The context to associate with this operation.",
            IType::context(),
            ParameterLocation::None,
        )
    }

    pub fn request_options() -> Self {
        Self::synthesized(
            "requestOptions",
            "The options to configure the HTTP request before HTTP client sends it.",
            IType::request_options(),
            ParameterLocation::None,
        )
    }

    /// Content type header of an optional-body request with a single media type.
    pub fn content_type(media_type: &str) -> Self {
        Self {
            request_parameter_name: "Content-Type".to_string(),
            default_value: Some(media_type.to_string()),
            already_encoded: false,
            ..Self::synthesized("contentType", "The content type", IType::string(), ParameterLocation::Header)
        }
    }

    pub fn repeatability_request_id() -> Self {
        Self {
            request_parameter_name: REPEATABILITY_REQUEST_ID_HEADER.to_string(),
            parameter_reference: "CoreUtils.randomUuid().toString()".to_string(),
            ..Self::synthesized(
                "repeatabilityRequestId",
                "Repeatability request ID header",
                IType::string(),
                ParameterLocation::Header,
            )
        }
    }

    pub fn repeatability_first_sent() -> Self {
        Self {
            request_parameter_name: REPEATABILITY_FIRST_SENT_HEADER.to_string(),
            parameter_reference: "DateTimeRfc1123.toRfc1123String(OffsetDateTime.now())".to_string(),
            ..Self::synthesized(
                "repeatabilityFirstSent",
                "Repeatability first sent header as HTTP-date",
                IType::date_time_rfc1123(),
                ParameterLocation::Header,
            )
        }
    }

    fn synthesized(name: &str, description: &str, t: IType, location: ParameterLocation) -> Self {
        Self {
            name: name.to_string(),
            request_parameter_name: name.to_string(),
            description: description.to_string(),
            raw_type: t.clone(),
            wire_type: t.clone(),
            client_type: t.client_type(),
            location,
            required: false,
            nullable: false,
            is_constant: false,
            default_value: None,
            from_client: false,
            parameter_reference: name.to_string(),
            collection_format: None,
            explode: false,
            already_encoded: true,
            header_collection_prefix: None,
            origin: None,
        }
    }
}

/// A resolved wire-call signature for one request of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyMethod {
    pub name: String,
    /// Name before the `Sync` suffix of synchronous variants.
    pub base_name: String,
    pub operation_id: String,
    pub description: String,
    pub http_method: HttpMethod,
    pub base_url: String,
    pub url_path: String,
    pub request_content_type: String,
    pub response_content_types: Vec<String>,
    pub expected_status_codes: Vec<u16>,
    pub return_type: IType,
    pub response_body_type: Option<IType>,
    pub raw_response_body_type: Option<IType>,
    pub return_value_wire_type: Option<IType>,
    pub unexpected_response_exception_type: IType,
    /// Exception types thrown for specific unexpected status codes.
    pub unexpected_response_exception_types: IndexMap<IType, Vec<u16>>,
    /// Parameters the call exposes to client methods.
    pub parameters: Vec<ProxyMethodParameter>,
    /// Every parameter the wire call carries.
    pub all_parameters: Vec<ProxyMethodParameter>,
    pub special_header_parameter_names: Vec<String>,
    pub is_sync: bool,
    pub custom_header_ignored: bool,
}

impl ProxyMethod {
    /// Synchronous counterpart: same wire shape, unwrapped async return type.
    pub fn to_sync(&self) -> ProxyMethod {
        ProxyMethod {
            name: format!("{}Sync", self.name),
            base_name: self.name.clone(),
            return_type: sync_return_type(&self.return_type),
            is_sync: true,
            ..self.clone()
        }
    }

    pub fn uses_flux_byte_buffer(&self) -> bool {
        self.parameters
            .iter()
            .any(|p| p.client_type.is_flux_byte_buffer())
    }

    pub fn uses_binary_data(&self) -> bool {
        self.parameters.iter().any(|p| p.client_type.is_binary_data())
    }

    /// Response body type as the service declares it, before any protocol-mode substitution.
    pub fn declared_response_body_type(&self) -> Option<&IType> {
        self.raw_response_body_type
            .as_ref()
            .or(self.response_body_type.as_ref())
    }
}

fn sync_return_type(async_type: &IType) -> IType {
    let unwrapped = match async_type {
        IType::Generic(g) if g.name == "Mono" => g
            .type_arguments
            .first()
            .cloned()
            .unwrap_or_else(IType::void),
        other => other.clone(),
    };
    match &unwrapped {
        IType::Generic(g)
            if g.name == "Response"
                && g.type_arguments.first().is_some_and(IType::is_flux_byte_buffer) =>
        {
            GenericType::response(IType::binary_data())
        }
        IType::Generic(g)
            if g.name == "ResponseBase"
                && g.type_arguments.get(1).is_some_and(IType::is_flux_byte_buffer) =>
        {
            GenericType::rest_response(g.type_arguments[0].clone(), IType::binary_data())
        }
        t if t.is_flux_byte_buffer() => IType::binary_data(),
        _ => unwrapped.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_unwraps_mono_and_streams() {
        let t = GenericType::mono(GenericType::response(GenericType::flux_byte_buffer()));
        assert_eq!(sync_return_type(&t).to_string(), "Response<BinaryData>");
        let t = GenericType::mono(GenericType::response(IType::void()));
        assert_eq!(sync_return_type(&t).to_string(), "Response<Void>");
    }
}
