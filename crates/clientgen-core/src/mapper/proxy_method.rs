use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, warn};

use crate::codemodel::{Operation, OperationKey, Request};
use crate::config::SyncMethods;
use crate::error::MapError;
use crate::model::{ClassType, IType, PrimitiveType, ProxyMethod, ProxyMethodParameter};
use crate::naming;

use super::cache::Memo;
use super::exception::exception_class_type;
use super::proxy_parameters::{self, ProxyParameters};
use super::response_type::{create_async_response, operation_response_type, remove_model_from_response};
use super::util::merge_summary_description;
use super::{Mappers, ProxyMethods};

const APPLICATION_JSON: &str = "application/json";
const APPLICATION_JSON_ERROR_WEIGHT: &str = "application/json;q=0.9";

/// Maps operations to the wire-call signatures behind their client methods.
#[derive(Default)]
pub struct ProxyMethodMapper {
    cache: Memo<OperationKey, Arc<ProxyMethods>>,
}

impl ProxyMethodMapper {
    pub fn map(&self, mappers: &Mappers, operation: &Operation) -> Result<Arc<ProxyMethods>, MapError> {
        self.cache
            .get_or_try_insert_with(operation.key, || map_operation(mappers, operation).map(Arc::new))
    }
}

fn map_operation(mappers: &Mappers, operation: &Operation) -> Result<ProxyMethods, MapError> {
    let settings = mappers.settings();
    let data_plane = settings.is_data_plane();

    let expected_status_codes = expected_status_codes(operation);
    let body_type = operation_response_type(mappers, operation)?;
    let (response_body_type, raw_response_body_type) = if data_plane && settings.is_branded() {
        (remove_model_from_response(&body_type, operation), Some(body_type))
    } else {
        (body_type, None)
    };
    let return_value_wire_type = return_value_wire_type(&response_body_type);
    let return_type = create_async_response(mappers, operation, &response_body_type, data_plane, false)?;
    let (unexpected_response_exception_type, unexpected_response_exception_types) =
        exception_types(mappers, operation, &expected_status_codes)?;

    let base = ProxyMethod {
        name: operation.name.clone(),
        base_name: operation.name.clone(),
        operation_id: operation.operation_id(),
        description: merge_summary_description(operation.summary.as_deref(), operation.description.as_deref())
            .unwrap_or_default(),
        http_method: operation.http_method(),
        base_url: String::new(),
        url_path: String::new(),
        request_content_type: APPLICATION_JSON.to_string(),
        response_content_types: response_content_types(operation),
        expected_status_codes,
        return_type,
        response_body_type: Some(response_body_type),
        raw_response_body_type,
        return_value_wire_type,
        unexpected_response_exception_type,
        unexpected_response_exception_types,
        parameters: Vec::new(),
        all_parameters: Vec::new(),
        special_header_parameter_names: Vec::new(),
        is_sync: false,
        custom_header_ignored: false,
    };

    let mut names = UniqueNames::new(&operation.name);
    let mut result = ProxyMethods::new();
    for request in &operation.requests {
        let content_type = request_content_type(request);
        let ProxyParameters {
            parameters,
            all_parameters,
            special_header_parameter_names,
        } = proxy_parameters::process(mappers, operation, request, &content_type)?;

        let method = ProxyMethod {
            name: names.unique_name(&parameters, &content_type),
            base_url: request.http.uri.clone(),
            url_path: request.http.path.clone(),
            http_method: request.http.method,
            request_content_type: content_type,
            parameters,
            all_parameters,
            special_header_parameter_names,
            ..base.clone()
        };
        debug!(
            "mapped proxy method '{}' for operation '{}'",
            method.name,
            operation.operation_id()
        );
        result.insert(request.key, variants(mappers, operation, method)?);
    }
    Ok(result)
}

/// Status codes of the success responses, sorted.
fn expected_status_codes(operation: &Operation) -> Vec<u16> {
    let mut codes: Vec<u16> = operation
        .responses
        .iter()
        .flat_map(|r| r.status_codes.iter())
        .filter_map(|c| c.replace('\'', "").parse().ok())
        .collect();
    codes.sort_unstable();
    codes
}

fn return_value_wire_type(body_type: &IType) -> Option<IType> {
    let options = [
        IType::base64_url(),
        IType::date_time_rfc1123(),
        IType::Primitive(PrimitiveType::DurationLong),
        IType::Primitive(PrimitiveType::DurationDouble),
        IType::Primitive(PrimitiveType::UnixTimeLong),
        PrimitiveType::DurationLong.boxed(),
        PrimitiveType::DurationDouble.boxed(),
        PrimitiveType::UnixTimeLong.boxed(),
    ];
    options.into_iter().find(|t| body_type.contains(t))
}

fn response_content_types(operation: &Operation) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for media_type in operation.responses.iter().flat_map(|r| r.media_types.iter()) {
        if !types.contains(media_type) {
            types.push(media_type.clone());
        }
    }
    if !types.iter().any(|t| t == APPLICATION_JSON) {
        types.push(APPLICATION_JSON_ERROR_WEIGHT.to_string());
    }
    types
}

/// The single declared media type, else the known media type, else JSON.
fn request_content_type(request: &Request) -> String {
    match request.http.media_types.as_slice() {
        [single] => single.clone(),
        _ => request
            .http
            .known_media_type
            .clone()
            .unwrap_or_else(|| APPLICATION_JSON.to_string()),
    }
}

fn exception_type_of(mappers: &Mappers, schema_id: &str) -> Result<IType, MapError> {
    let schema = mappers.schema(schema_id)?;
    Ok(match mappers.map_exception(schema)? {
        Some(exception) => exception_class_type(&exception),
        None => IType::http_response_exception(),
    })
}

/// The default exception type and the exception types of specific unexpected status codes.
///
/// Settings overrides win over declared error responses, and expected status codes never map
/// to an exception.
fn exception_types(
    mappers: &Mappers,
    operation: &Operation,
    expected_status_codes: &[u16],
) -> Result<(IType, IndexMap<IType, Vec<u16>>), MapError> {
    let settings = mappers.settings();
    let mut default_type: Option<IType> = None;
    let mut by_status: BTreeMap<u16, IType> = BTreeMap::new();

    if settings.is_data_plane() && settings.is_branded() {
        default_type = Some(IType::http_response_exception());
    } else {
        for exception in &operation.exceptions {
            let mut codes: Vec<u16> = Vec::new();
            let mut is_default = exception.status_codes.is_empty();
            for code in &exception.status_codes {
                match code.replace('\'', "").parse() {
                    Ok(code) => codes.push(code),
                    Err(_) => is_default = true,
                }
            }
            if !codes.is_empty() {
                let t = match &exception.schema {
                    Some(id) => exception_type_of(mappers, id)?,
                    None => IType::http_response_exception(),
                };
                for code in codes {
                    by_status.entry(code).or_insert_with(|| t.clone());
                }
            }
            if is_default && default_type.is_none() {
                if let Some(id) = &exception.schema {
                    default_type = Some(exception_type_of(mappers, id)?);
                }
            }
        }
        if default_type.is_none() && settings.is_branded() {
            if let Some(id) = operation.exceptions.first().and_then(|e| e.schema.as_ref()) {
                default_type = Some(exception_type_of(mappers, id)?);
            }
        }
    }

    if let Some(name) = &settings.http_exception_type_for_default {
        default_type = Some(ClassType::from_full_name(name).into_type());
    }
    for (code, name) in &settings.http_status_code_to_exception_type {
        by_status.insert(*code, ClassType::from_full_name(name).into_type());
    }
    for code in expected_status_codes {
        by_status.remove(code);
    }

    let mut grouped: IndexMap<IType, Vec<u16>> = IndexMap::new();
    for (code, t) in by_status {
        grouped.entry(t).or_default().push(code);
    }
    Ok((
        default_type.unwrap_or_else(IType::http_response_exception),
        grouped,
    ))
}

/// Hands out proxy method names unique within one operation.
struct UniqueNames {
    base: String,
    taken: Vec<(String, Vec<IType>)>,
}

impl UniqueNames {
    fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            taken: Vec::new(),
        }
    }

    /// Requests with the same wire signature get the content type, then a counter, appended.
    fn unique_name(&mut self, parameters: &[ProxyMethodParameter], content_type: &str) -> String {
        let signature: Vec<IType> = parameters.iter().map(|p| p.wire_type.clone()).collect();
        let clashes = |taken: &[(String, Vec<IType>)], name: &str| {
            taken.iter().any(|(n, s)| n == name && *s == signature)
        };

        let mut name = self.base.clone();
        if clashes(&self.taken, &name) {
            let suffix = naming::to_pascal(
                &content_type
                    .chars()
                    .map(|c| if c.is_alphanumeric() { c } else { '_' })
                    .collect::<String>(),
            );
            name = format!("{}{}", self.base, suffix);
            let mut counter = 1;
            while clashes(&self.taken, &name) {
                name = format!("{}{}{}", self.base, suffix, counter);
                counter += 1;
            }
            warn!(
                "proxy method '{}' has a conflicting signature, renamed to '{}'",
                self.base, name
            );
        }
        self.taken.push((name.clone(), signature));
        name
    }
}

/// The base method plus its header-less, `BinaryData` and synchronous variants.
fn variants(
    mappers: &Mappers,
    operation: &Operation,
    base: ProxyMethod,
) -> Result<Vec<Arc<ProxyMethod>>, MapError> {
    let settings = mappers.settings();
    let mut methods = Vec::new();

    let no_custom_headers = no_custom_headers_variant(mappers, operation, &base)?;
    let binary_data = binary_data_variant(&base);
    methods.push(base);
    methods.extend(no_custom_headers);
    if let Some(binary_data) = binary_data {
        let no_custom_headers = no_custom_headers_variant(mappers, operation, &binary_data)?;
        methods.push(binary_data);
        methods.extend(no_custom_headers);
    }

    let async_count = methods.len();
    if settings.is_sync_stack_enabled() {
        let sync: Vec<ProxyMethod> = methods
            .iter()
            .filter(|m| !m.uses_flux_byte_buffer())
            .map(ProxyMethod::to_sync)
            .collect();
        methods.extend(sync);
    }
    if settings.sync_methods == SyncMethods::SyncOnly {
        methods.drain(..async_count);
    }
    Ok(methods.into_iter().map(Arc::new).collect())
}

fn no_custom_headers_variant(
    mappers: &Mappers,
    operation: &Operation,
    method: &ProxyMethod,
) -> Result<Option<ProxyMethod>, MapError> {
    let settings = mappers.settings();
    if settings.disable_typed_headers_methods || !settings.no_custom_headers {
        return Ok(None);
    }
    let returns_typed_headers = method
        .return_type
        .type_arguments()
        .first()
        .is_some_and(|t| t.is_generic("ResponseBase"));
    if !returns_typed_headers {
        return Ok(None);
    }
    let body_type = method.response_body_type.clone().unwrap_or_else(IType::void);
    Ok(Some(ProxyMethod {
        name: format!("{}NoCustomHeaders", method.name),
        return_type: create_async_response(mappers, operation, &body_type, settings.is_data_plane(), true)?,
        custom_header_ignored: true,
        ..method.clone()
    }))
}

/// Overload taking `BinaryData` in place of a `Flux<ByteBuffer>` body.
fn binary_data_variant(method: &ProxyMethod) -> Option<ProxyMethod> {
    let index = method
        .parameters
        .iter()
        .position(|p| p.client_type.is_flux_byte_buffer())?;
    let mut parameters = method.parameters.clone();
    let binary = IType::binary_data();
    parameters[index] = ProxyMethodParameter {
        raw_type: binary.clone(),
        wire_type: binary.clone(),
        client_type: binary,
        ..parameters[index].clone()
    };
    Some(ProxyMethod {
        parameters,
        ..method.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codemodel::{self, HttpRequest};
    use crate::config::{Flavor, Settings};

    const MODEL: &str = r#"
schemas:
  string: { type: string }
  stream: { type: binary }
  error:
    type: object
    name: ServiceError
    usage: [exception]
    properties:
      - { name: code, schema: string }
  widget:
    type: object
    name: Widget
    properties:
      - { name: id, schema: string }
operation_groups:
  - name: widgets
    operations:
      - name: get
        summary: Get a widget.
        requests:
          - http: { method: get, path: "/widgets/{id}", uri: "{endpoint}" }
            parameters:
              - { name: id, schema: string, location: path, required: true }
        responses:
          - { schema: widget, status_codes: ["200"], media_types: [application/json] }
        exceptions:
          - { schema: error, status_codes: ["404"] }
          - { schema: error, status_codes: ["default"] }
      - name: upload
        requests:
          - http: { method: put, path: "/widgets/{id}/content", media_types: [application/octet-stream] }
            parameters:
              - { name: content, schema: stream, location: body, required: true }
          - http: { method: put, path: "/widgets/{id}/content", media_types: [text/plain] }
            parameters:
              - { name: content, schema: stream, location: body, required: true }
        responses:
          - { status_codes: ["204"] }
      - name: delete
        requests:
          - http: { method: delete, path: "/widgets/{id}" }
            parameters:
              - { name: id, schema: string, location: path, required: true }
        responses:
          - { status_codes: ["204"] }
        exceptions:
          - { schema: error, status_codes: ["404", "default"] }
      - name: send
        requests:
          - http: { method: post, path: /widgets, media_types: [application/json] }
            parameters:
              - { name: message, schema: string, location: body, required: true }
          - http: { method: post, path: /widgets, media_types: [text/plain] }
            parameters:
              - { name: message, schema: string, location: body, required: true }
        responses:
          - schema: widget
            status_codes: ["200"]
            headers:
              - { header: x-ms-request-id, schema: string }
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
    fn base_method_fields() {
        let mappers = mappers(Settings::default());
        let get = operation(&mappers, "get");
        let methods = mappers.map_proxy_methods(get).unwrap();
        let method = &methods[&get.requests[0].key][0];
        assert_eq!(method.name, "get");
        assert_eq!(method.operation_id, "widgets_get");
        assert_eq!(method.description, "Get a widget.");
        assert_eq!(method.base_url, "{endpoint}");
        assert_eq!(method.expected_status_codes, vec![200]);
        assert_eq!(method.response_content_types, vec!["application/json"]);
        insta::assert_snapshot!(method.return_type.to_string(), @"Mono<Response<Widget>>");
        assert_eq!(method.unexpected_response_exception_type.to_string(), "ServiceErrorException");
        let (t, codes) = method
            .unexpected_response_exception_types
            .first()
            .expect("should map 404");
        assert_eq!(t.to_string(), "ServiceErrorException");
        assert_eq!(codes, &vec![404]);

        let again = mappers.map_proxy_methods(get).unwrap();
        assert!(Arc::ptr_eq(&methods, &again));
    }

    #[test]
    fn settings_override_exception_types() {
        let mut settings = Settings {
            http_exception_type_for_default: Some("com.azure.core.exception.HttpResponseException".to_string()),
            ..Settings::default()
        };
        settings
            .http_status_code_to_exception_type
            .insert(404, "com.azure.core.exception.ResourceNotFoundException".to_string());
        let mappers = mappers(settings);
        let get = operation(&mappers, "get");
        let methods = mappers.map_proxy_methods(get).unwrap();
        let method = &methods[&get.requests[0].key][0];
        assert_eq!(method.unexpected_response_exception_type.to_string(), "HttpResponseException");
        let (t, _) = method.unexpected_response_exception_types.first().unwrap();
        assert_eq!(t.to_string(), "ResourceNotFoundException");
    }

    #[test]
    fn data_plane_uses_generic_exceptions_and_binary_bodies() {
        let mappers = mappers(Settings {
            flavor: Flavor::DataPlane,
            ..Settings::default()
        });
        let get = operation(&mappers, "get");
        let methods = mappers.map_proxy_methods(get).unwrap();
        let method = &methods[&get.requests[0].key][0];
        assert_eq!(method.unexpected_response_exception_type, IType::http_response_exception());
        assert!(method.unexpected_response_exception_types.is_empty());
        assert!(method.response_body_type.as_ref().is_some_and(IType::is_binary_data));
        assert_eq!(method.declared_response_body_type().map(ToString::to_string).as_deref(), Some("Widget"));
        assert_eq!(
            method.parameters.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["id", "requestOptions", "context"]
        );
    }

    #[test]
    fn byte_streams_get_binary_data_and_sync_variants() {
        let mappers = mappers(Settings {
            enable_sync_stack: true,
            ..Settings::default()
        });
        let upload = operation(&mappers, "upload");
        let methods = mappers.map_proxy_methods(upload).unwrap();

        let first: Vec<&str> = methods[&upload.requests[0].key].iter().map(|m| m.name.as_str()).collect();
        assert_eq!(first, vec!["upload", "upload", "uploadSync"]);
        let sync = &methods[&upload.requests[0].key][2];
        assert!(sync.is_sync);
        assert!(sync.uses_binary_data());

        let second: Vec<&str> = methods[&upload.requests[1].key].iter().map(|m| m.name.as_str()).collect();
        assert_eq!(second, vec!["uploadTextPlain", "uploadTextPlain", "uploadTextPlainSync"]);
        assert_eq!(methods[&upload.requests[1].key][0].request_content_type, "text/plain");
    }

    #[test]
    fn unique_names_append_content_type() {
        let mut names = UniqueNames::new("put");
        assert_eq!(names.unique_name(&[], "application/json"), "put");
        assert_eq!(names.unique_name(&[], "application/json"), "putApplicationJson");
        assert_eq!(names.unique_name(&[], "application/json"), "putApplicationJson1");
        assert_eq!(names.unique_name(&[ProxyMethodParameter::context()], "application/json"), "put");
    }

    #[test]
    fn numeric_codes_map_specifically_next_to_default() {
        let mappers = mappers(Settings::default());
        let delete = operation(&mappers, "delete");
        let methods = mappers.map_proxy_methods(delete).unwrap();
        let method = &methods[&delete.requests[0].key][0];
        assert_eq!(method.unexpected_response_exception_type.to_string(), "ServiceErrorException");
        let (t, codes) = method
            .unexpected_response_exception_types
            .first()
            .expect("should map 404");
        assert_eq!(t.to_string(), "ServiceErrorException");
        assert_eq!(codes, &vec![404]);
    }

    #[test]
    fn header_less_variants_follow_the_unique_name() {
        let mappers = mappers(Settings {
            generic_response_types: true,
            no_custom_headers: true,
            ..Settings::default()
        });
        let send = operation(&mappers, "send");
        let methods = mappers.map_proxy_methods(send).unwrap();

        let names = |index: usize| -> Vec<String> {
            methods[&send.requests[index].key]
                .iter()
                .filter(|m| m.custom_header_ignored)
                .map(|m| m.name.clone())
                .collect()
        };
        assert_eq!(names(0), vec!["sendNoCustomHeaders"]);
        assert_eq!(names(1), vec!["sendTextPlainNoCustomHeaders"]);
        let header_less = methods[&send.requests[1].key]
            .iter()
            .find(|m| m.custom_header_ignored)
            .expect("should have a header-less variant");
        assert_eq!(header_less.request_content_type, "text/plain");
        insta::assert_snapshot!(header_less.return_type.to_string(), @"Mono<Response<Widget>>");
    }

    fn request(media_types: &[&str], known_media_type: Option<&str>) -> Request {
        Request {
            http: HttpRequest {
                media_types: media_types.iter().map(ToString::to_string).collect(),
                known_media_type: known_media_type.map(ToString::to_string),
                ..HttpRequest::default()
            },
            ..Request::default()
        }
    }

    #[test]
    fn content_type_falls_back_to_known_media_type_then_json() {
        assert_eq!(request_content_type(&request(&["text/plain"], None)), "text/plain");
        assert_eq!(
            request_content_type(&request(&["application/json", "application/xml"], None)),
            "application/json"
        );
        assert_eq!(request_content_type(&request(&[], None)), "application/json");
        assert_eq!(
            request_content_type(&request(&["application/xml", "text/xml"], Some("text/plain"))),
            "text/plain"
        );
    }
}
