use std::collections::BTreeSet;
use std::sync::Arc;

use log::debug;

use crate::codemodel::{HttpMethod, Operation, OperationKey, Property, Schema, SchemaKind, SchemaUsage};
use crate::config::Settings;
use crate::error::MapError;
use crate::model::{ClassType, ClientModel, ClientResponse, GenericType, IType};
use crate::naming;

use super::Mappers;
use super::cache::Memo;
use super::proxy_parameter::xml_wrapper_type;
use super::util::lowest_common_parent;

/// Whether the operation is a HEAD request answering existence through a 404 status.
pub fn is_head_as_boolean(operation: &Operation) -> bool {
    operation.requests.iter().any(|r| r.http.method == HttpMethod::Head)
        && operation
            .responses
            .iter()
            .any(|r| r.status_codes.iter().any(|c| c.trim_matches('\'') == "404"))
}

fn contains_binary_response(operation: &Operation) -> bool {
    operation.responses.iter().any(|r| r.binary)
}

/// The schema every success response body is or derives from.
///
/// Unrelated response schemas have no shared schema; the caller sees them as `Object`.
pub fn response_body_schema<'a>(
    mappers: &'a Mappers,
    operation: &Operation,
) -> Result<ResponseBodySchema<'a>, MapError> {
    let mut ids: Vec<&str> = Vec::new();
    for response in &operation.responses {
        if let Some(id) = response.schema.as_deref() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    match ids.as_slice() {
        [] => Ok(ResponseBodySchema::None),
        [id] => Ok(ResponseBodySchema::Schema(mappers.schema(id)?)),
        _ => {
            let schemas = ids
                .iter()
                .map(|id| mappers.schema(id))
                .collect::<Result<Vec<_>, _>>()?;
            match lowest_common_parent(mappers, &schemas)? {
                Some(schema) => Ok(ResponseBodySchema::Schema(schema)),
                None => Ok(ResponseBodySchema::Unrelated),
            }
        }
    }
}

pub enum ResponseBodySchema<'a> {
    None,
    Schema(&'a Schema),
    Unrelated,
}

/// The declared response body type of an operation.
///
/// Binary bodies are `BinaryData`, or `InputStream` when requested outside data-plane clients.
/// A HEAD-as-boolean operation answers `boolean`, and an operation without a body answers `void`.
pub fn operation_response_type(mappers: &Mappers, operation: &Operation) -> Result<IType, MapError> {
    let settings = mappers.settings();
    let binary = || {
        if settings.is_data_plane() || !settings.input_stream_for_binary {
            IType::binary_data()
        } else {
            IType::input_stream()
        }
    };
    let t = match response_body_schema(mappers, operation)? {
        ResponseBodySchema::None if is_head_as_boolean(operation) => IType::boolean(),
        ResponseBodySchema::None if contains_binary_response(operation) => binary(),
        ResponseBodySchema::None => IType::void(),
        ResponseBodySchema::Unrelated => IType::object(),
        ResponseBodySchema::Schema(schema) => {
            let wrapped = schema.info.xml.as_ref().is_some_and(|x| x.wrapped);
            if wrapped && matches!(schema.kind, SchemaKind::Array(_)) {
                xml_wrapper_type(mappers, &schema.id)?
            } else {
                let t = mappers.map_type(schema)?;
                if t.is_flux_byte_buffer() { binary() } else { t }
            }
        }
    };
    Ok(t)
}

/// Protocol-method form of a response type: everything but `void` and HEAD-as-boolean becomes `BinaryData`.
pub fn remove_model_from_response(t: &IType, operation: &Operation) -> IType {
    if t.as_nullable().is_void() || is_head_as_boolean(operation) {
        t.clone()
    } else {
        IType::binary_data()
    }
}

/// Whether responses declare typed headers that the return type should surface.
///
/// Pollers do not expose full responses, so long-running operations of fluent and data-plane
/// clients never surface headers.
pub fn response_contains_header_schemas(operation: &Operation, settings: &Settings) -> bool {
    let has_headers = operation
        .responses
        .iter()
        .flat_map(|r| r.headers.iter())
        .any(|h| h.schema.is_some());
    let lro_without_headers =
        operation.is_long_running() && (settings.is_fluent() || settings.is_data_plane());
    has_headers && !lro_without_headers
}

fn operation_type_prefix(operation: &Operation) -> String {
    format!(
        "{}{}",
        naming::plural(&naming::to_pascal(&operation.group_name)),
        naming::to_pascal(&operation.name)
    )
}

/// Synthesizes the strongly typed header models of operations, once per operation.
#[derive(Default)]
pub struct ResponseHeadersMapper {
    cache: Memo<OperationKey, Option<Arc<ClientModel>>>,
}

impl ResponseHeadersMapper {
    pub fn map(&self, mappers: &Mappers, operation: &Operation) -> Result<Option<Arc<ClientModel>>, MapError> {
        if !response_contains_header_schemas(operation, mappers.settings()) {
            return Ok(None);
        }
        self.cache.get_or_try_insert_with(operation.key, || {
            let name = format!("{}Headers", operation_type_prefix(operation));
            let package = mappers.settings().model_package(&name, false);

            let mut properties = Vec::new();
            let mut seen: Vec<&str> = Vec::new();
            for header in operation.responses.iter().flat_map(|r| r.headers.iter()) {
                let Some(schema) = &header.schema else {
                    continue;
                };
                if seen.contains(&header.header.as_str()) {
                    continue;
                }
                seen.push(&header.header);
                let property = Property {
                    name: header.header.clone(),
                    serialized_name: Some(header.header.clone()),
                    schema: schema.clone(),
                    description: header.description.clone(),
                    ..Property::default()
                };
                properties.push(mappers.map_model_property(&property, false)?);
            }

            debug!("synthesized header model '{}' for operation '{}'", name, operation.name);
            Ok(Some(Arc::new(ClientModel {
                description: format!("The {name} model."),
                model_type: ClassType::generated(package.clone(), name.clone()).into_type(),
                serialized_name: name.clone(),
                name,
                package,
                parent_model_name: None,
                derived_models: Vec::new(),
                is_polymorphic: false,
                polymorphic_discriminator: None,
                parent_polymorphic_discriminators: Vec::new(),
                properties,
                property_references: Vec::new(),
                usages: BTreeSet::from([SchemaUsage::Output]),
                xml_name: None,
                xml_namespace: None,
                serialization_formats: Vec::new(),
                has_additional_properties: false,
                strongly_typed_header: true,
                cross_language_definition_id: None,
            })))
        })
    }
}

/// Named response class of an operation, renamed when it collides with a model.
pub fn client_response_class_type(mappers: &Mappers, operation: &Operation) -> IType {
    let settings = mappers.settings();
    let mut name = format!("{}Response", operation_type_prefix(operation));
    let package = if settings.is_custom_type(&name) {
        settings.custom_types_package()
    } else {
        settings.models_package()
    };
    let collides = mappers.code_model().schemas.values().any(|s| {
        s.as_object().is_some()
            && naming::to_pascal(s.name()).eq_ignore_ascii_case(&name)
            && settings.model_package(&naming::to_pascal(s.name()), s.has_usage(SchemaUsage::Internal))
                == package
    });
    if collides {
        name.push_str("Response");
    }
    ClassType::generated(package, name).into_type()
}

/// Response class carrying typed headers and body, when named response types are in use.
pub fn client_response(mappers: &Mappers, operation: &Operation) -> Result<Option<ClientResponse>, MapError> {
    let settings = mappers.settings();
    if settings.generic_response_types || settings.disable_typed_headers_methods {
        return Ok(None);
    }
    let Some(headers) = mappers.map_response_headers(operation)? else {
        return Ok(None);
    };
    let class = client_response_class_type(mappers, operation);
    let Some(class) = class.as_generated_class() else {
        return Ok(None);
    };
    Ok(Some(ClientResponse {
        name: class.name.clone(),
        package: class.package.clone(),
        description: format!("Contains all response data for the {} operation.", operation.name),
        headers_type: headers.model_type.clone(),
        body_type: operation_response_type(mappers, operation)?,
    }))
}

fn is_next_page_operation(operation: &Operation) -> bool {
    operation
        .extensions
        .pageable
        .as_ref()
        .and_then(|p| p.next_operation_key)
        .is_some_and(|key| key == operation.key)
}

fn is_byte_stream(t: &IType) -> bool {
    t.is_input_stream() || t.is_flux_byte_buffer()
}

/// Async return type of the wire call behind an operation.
pub fn create_async_response(
    mappers: &Mappers,
    operation: &Operation,
    body_type: &IType,
    is_protocol_method: bool,
    ignore_typed_headers: bool,
) -> Result<IType, MapError> {
    let settings = mappers.settings();
    let response_of = |t: &IType| GenericType::response(t.clone());

    if is_protocol_method {
        return Ok(GenericType::mono(response_of(body_type)));
    }

    if settings.is_fluent() && operation.is_long_running() && !is_next_page_operation(operation) {
        return Ok(GenericType::mono(GenericType::response(GenericType::flux_byte_buffer())));
    }

    if response_contains_header_schemas(operation, settings) {
        if !settings.generic_response_types {
            return Ok(GenericType::mono(client_response_class_type(mappers, operation)));
        }
        if ignore_typed_headers || settings.disable_typed_headers_methods {
            return Ok(if is_byte_stream(body_type) {
                GenericType::mono(IType::stream_response())
            } else {
                GenericType::mono(response_of(body_type))
            });
        }
        if let Some(headers) = mappers.map_response_headers(operation)? {
            let body = if body_type.is_input_stream() {
                GenericType::flux_byte_buffer()
            } else {
                body_type.clone()
            };
            return Ok(GenericType::mono(GenericType::rest_response(
                headers.model_type.clone(),
                body,
            )));
        }
    }

    if body_type.is_input_stream() {
        return Ok(GenericType::mono(IType::stream_response()));
    }
    if body_type.is_binary_data()
        && settings.input_stream_for_binary
        && !settings.is_data_plane()
        && !settings.is_sync_stack_enabled()
    {
        return Ok(GenericType::mono(IType::stream_response()));
    }
    Ok(GenericType::mono(response_of(body_type)))
}

/// Return type of a synchronous with-response client method.
pub fn create_sync_response(
    mappers: &Mappers,
    operation: &Operation,
    sync_return_type: &IType,
    is_protocol_method: bool,
    ignore_typed_headers: bool,
) -> Result<IType, MapError> {
    let settings = mappers.settings();
    if !is_protocol_method && response_contains_header_schemas(operation, settings) {
        if !settings.generic_response_types {
            return Ok(client_response_class_type(mappers, operation));
        }
        if !ignore_typed_headers && !settings.disable_typed_headers_methods {
            if let Some(headers) = mappers.map_response_headers(operation)? {
                return Ok(GenericType::rest_response(
                    headers.model_type.clone(),
                    sync_return_type.clone(),
                ));
            }
        }
    }
    Ok(GenericType::response(sync_return_type.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codemodel;
    use crate::config::Flavor;

    const MODEL: &str = r#"
name: Widgets
schemas:
  string: { type: string }
  widget:
    type: object
    name: Widget
    properties:
      - { name: id, schema: string }
  gadget:
    type: object
    name: Gadget
    properties:
      - { name: id, schema: string }
operation_groups:
  - name: widget
    operations:
      - name: get
        requests:
          - http: { method: get, path: "/widgets/{id}" }
        responses:
          - schema: widget
            status_codes: ["200"]
            headers:
              - { header: x-ms-request-id, schema: string }
      - name: exists
        requests:
          - http: { method: head, path: "/widgets/{id}" }
        responses:
          - { status_codes: ["200", "404"] }
      - name: download
        requests:
          - http: { method: get, path: "/widgets/{id}/content" }
        responses:
          - { status_codes: ["200"], binary: true }
      - name: either
        requests:
          - http: { method: get, path: /either }
        responses:
          - { schema: widget, status_codes: ["200"] }
          - { schema: gadget, status_codes: ["201"] }
"#;

    fn mappers(settings: Settings) -> Mappers {
        let model = codemodel::from_yaml(MODEL).expect("should load");
        Mappers::new(Arc::new(model), Arc::new(settings))
    }

    fn operation<'a>(mappers: &'a Mappers, name: &str) -> &'a Operation {
        mappers
            .code_model()
            .operations()
            .find(|o| o.name == name)
            .expect("operation should exist")
    }

    #[test]
    fn body_types_by_response_shape() {
        let mappers = mappers(Settings::default());
        let t = operation_response_type(&mappers, operation(&mappers, "exists")).unwrap();
        assert_eq!(t, IType::boolean());
        let t = operation_response_type(&mappers, operation(&mappers, "download")).unwrap();
        assert!(t.is_binary_data());
        let t = operation_response_type(&mappers, operation(&mappers, "either")).unwrap();
        assert_eq!(t, IType::object());
    }

    #[test]
    fn named_response_types_by_default() {
        let mappers = mappers(Settings::default());
        let get = operation(&mappers, "get");
        let body = operation_response_type(&mappers, get).unwrap();
        let t = create_async_response(&mappers, get, &body, false, false).unwrap();
        insta::assert_snapshot!(t.to_string(), @"Mono<WidgetsGetResponse>");
        let response = client_response(&mappers, get).unwrap().expect("should have a response class");
        assert_eq!(response.headers_type.to_string(), "WidgetsGetHeaders");
    }

    #[test]
    fn generic_response_types_carry_headers() {
        let mappers = mappers(Settings {
            generic_response_types: true,
            ..Settings::default()
        });
        let get = operation(&mappers, "get");
        let body = operation_response_type(&mappers, get).unwrap();
        let t = create_async_response(&mappers, get, &body, false, false).unwrap();
        insta::assert_snapshot!(t.to_string(), @"Mono<ResponseBase<WidgetsGetHeaders, Widget>>");
        let t = create_async_response(&mappers, get, &body, false, true).unwrap();
        insta::assert_snapshot!(t.to_string(), @"Mono<Response<Widget>>");
        let headers = mappers.map_response_headers(get).unwrap().expect("should have headers");
        assert_eq!(headers.properties[0].name, "xMsRequestId");
        assert!(headers.strongly_typed_header);
    }

    #[test]
    fn protocol_responses_drop_models() {
        let mappers = mappers(Settings {
            flavor: Flavor::DataPlane,
            ..Settings::default()
        });
        let get = operation(&mappers, "get");
        let body = operation_response_type(&mappers, get).unwrap();
        let body = remove_model_from_response(&body, get);
        assert!(body.is_binary_data());
        let t = create_async_response(&mappers, get, &body, true, false).unwrap();
        insta::assert_snapshot!(t.to_string(), @"Mono<Response<BinaryData>>");

        let exists = operation(&mappers, "exists");
        let body = operation_response_type(&mappers, exists).unwrap();
        assert_eq!(remove_model_from_response(&body, exists), IType::boolean());
    }
}
