use crate::codemodel::{Operation, Parameter, ParameterLocation, Request, SchemaKind};
use crate::error::MapError;
use crate::model::{ProxyMethodParameter, REPEATABILITY_REQUEST_ID_HEADER};

use super::Mappers;
use super::proxy_parameter::map_proxy_parameter;

const JSON_PATCH_CONTENT_TYPE: &str = "application/json-patch+json";

/// Parameters of one wire call, as exposed to client methods and as carried on the wire.
#[derive(Debug, Default)]
pub struct ProxyParameters {
    pub parameters: Vec<ProxyMethodParameter>,
    pub all_parameters: Vec<ProxyMethodParameter>,
    pub special_header_parameter_names: Vec<String>,
}

/// Collect the proxy parameters of a request.
///
/// Data-plane calls only surface required, constant, client and api-version parameters;
/// everything else travels through `RequestOptions`.
pub fn process(
    mappers: &Mappers,
    operation: &Operation,
    request: &Request,
    content_type: &str,
) -> Result<ProxyParameters, MapError> {
    let settings = mappers.settings();
    let data_plane = settings.is_data_plane();
    let on_service_client = operation.group_name.is_empty();
    let mut result = ProxyParameters::default();

    if data_plane
        && operation.content_type_count() == 1
        && !has_content_type_header(request)
        && !has_required_body(request)
    {
        result
            .all_parameters
            .push(ProxyMethodParameter::content_type(content_type));
    }

    let is_json_patch = content_type.starts_with(JSON_PATCH_CONTENT_TYPE);
    for parameter in request.parameters.iter().filter(|p| p.has_http()) {
        let proxy_parameter = map_proxy_parameter(mappers, parameter, on_service_client, is_json_patch)?;
        let exposed = !data_plane
            || parameter.required
            || proxy_parameter.is_constant
            || proxy_parameter.from_client
            || is_api_version_parameter(mappers, parameter)?;
        if exposed {
            result.parameters.push(proxy_parameter.clone());
        }
        result.all_parameters.push(proxy_parameter);
    }

    if supports_repeatability(operation) {
        let special = [
            ProxyMethodParameter::repeatability_request_id(),
            ProxyMethodParameter::repeatability_first_sent(),
        ];
        result.special_header_parameter_names = special
            .iter()
            .map(|p| p.request_parameter_name.clone())
            .collect();
        if !data_plane {
            result.parameters.extend(special.iter().cloned());
        }
        result.all_parameters.extend(special);
    }

    if data_plane {
        result.all_parameters.push(ProxyMethodParameter::request_options());
        result.parameters.push(ProxyMethodParameter::request_options());
    }
    if settings.is_branded() {
        result.all_parameters.push(ProxyMethodParameter::context());
        result.parameters.push(ProxyMethodParameter::context());
    }
    Ok(result)
}

fn has_content_type_header(request: &Request) -> bool {
    request.parameters.iter().any(|p| {
        p.location == ParameterLocation::Header && p.serialized_name().eq_ignore_ascii_case("content-type")
    })
}

fn has_required_body(request: &Request) -> bool {
    request
        .parameters
        .iter()
        .find(|p| p.location == ParameterLocation::Body)
        .is_some_and(|p| p.required)
}

/// An api-version parameter that carries a value of its own.
fn is_api_version_parameter(mappers: &Mappers, parameter: &Parameter) -> Result<bool, MapError> {
    if !parameter.is_api_version() {
        return Ok(false);
    }
    let has_value = parameter.client_default_value.is_some()
        || matches!(&mappers.schema(&parameter.schema)?.kind, SchemaKind::Constant(c) if !c.value.is_null());
    Ok(has_value)
}

/// Operations declaring the repeatable-request header on a verb that accepts it.
pub fn supports_repeatability(operation: &Operation) -> bool {
    !operation.requests.is_empty()
        && operation.http_method().supports_repeatability()
        && operation
            .special_headers
            .iter()
            .any(|h| h.eq_ignore_ascii_case(REPEATABILITY_REQUEST_ID_HEADER))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::codemodel;
    use crate::config::{Flavor, Settings};

    const MODEL: &str = r#"
schemas:
  string: { type: string }
  int: { type: integer }
  widget:
    type: object
    name: Widget
    properties:
      - { name: id, schema: string }
operation_groups:
  - name: widgets
    operations:
      - name: create
        special_headers: [Repeatability-Request-ID]
        requests:
          - http: { method: put, path: "/widgets/{id}", media_types: [application/json] }
            parameters:
              - { name: endpoint, schema: string, location: uri, implementation: client, required: true }
              - { name: id, schema: string, location: path, required: true }
              - { name: top, schema: int, location: query }
              - { name: body, schema: widget, location: body }
        responses:
          - { schema: widget, status_codes: ["200"] }
"#;

    fn mappers(flavor: Flavor) -> Mappers {
        let model = codemodel::from_yaml(MODEL).expect("should load");
        let settings = Settings {
            flavor,
            ..Settings::default()
        };
        Mappers::new(Arc::new(model), Arc::new(settings))
    }

    fn names(parameters: &[ProxyMethodParameter]) -> Vec<&str> {
        parameters.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn vanilla_exposes_every_parameter() {
        let mappers = mappers(Flavor::Vanilla);
        let operation = mappers.code_model().operations().next().unwrap();
        let result = process(&mappers, operation, &operation.requests[0], "application/json").unwrap();
        assert_eq!(
            names(&result.parameters),
            vec![
                "endpoint",
                "id",
                "top",
                "body",
                "repeatabilityRequestId",
                "repeatabilityFirstSent",
                "context"
            ]
        );
        assert_eq!(
            result.special_header_parameter_names,
            vec!["repeatability-request-id", "repeatability-first-sent"]
        );
    }

    #[test]
    fn data_plane_hides_optional_parameters() {
        let mappers = mappers(Flavor::DataPlane);
        let operation = mappers.code_model().operations().next().unwrap();
        let result = process(&mappers, operation, &operation.requests[0], "application/json").unwrap();
        assert_eq!(
            names(&result.parameters),
            vec!["endpoint", "id", "requestOptions", "context"]
        );
        assert_eq!(
            names(&result.all_parameters),
            vec![
                "contentType",
                "endpoint",
                "id",
                "top",
                "body",
                "repeatabilityRequestId",
                "repeatabilityFirstSent",
                "requestOptions",
                "context"
            ]
        );
    }
}
