use crate::codemodel::{HttpMethod, Operation};
use crate::error::MapError;
use crate::model::{ClientMethodType, GenericType, IType, MethodPollingDetails, ReturnValue};

use super::Mappers;
use super::paging::page_item_type;
use super::response_type::{
    create_async_response, create_sync_response, operation_response_type, remove_model_from_response,
};
use super::util::merge_summary_description;

/// The return types of every client method derived from one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodReturnTypes {
    pub async_rest_response: IType,
    pub async_return: IType,
    pub sync_return: IType,
    pub sync_return_with_response: IType,
}

impl MethodReturnTypes {
    pub fn resolve(
        mappers: &Mappers,
        operation: &Operation,
        is_protocol_method: bool,
        custom_header_ignored: bool,
    ) -> Result<Self, MapError> {
        let settings = mappers.settings();
        if operation.is_pageable() {
            let element = if is_protocol_method && settings.is_branded() {
                IType::binary_data()
            } else {
                page_item_type(mappers, operation)?
            };
            return Ok(Self {
                async_rest_response: GenericType::mono(GenericType::paged_response(element.clone())),
                async_return: GenericType::paged_flux(element.clone()),
                sync_return: GenericType::paged_iterable(element.clone()),
                sync_return_with_response: GenericType::paged_response(element),
            });
        }

        let mut body_type = operation_response_type(mappers, operation)?;
        if is_protocol_method && settings.is_branded() {
            body_type = remove_model_from_response(&body_type, operation);
        }
        let async_rest_response =
            create_async_response(mappers, operation, &body_type, is_protocol_method, custom_header_ignored)?
                .client_type();

        let (async_return, sync_return) = if body_type.is_input_stream() {
            (GenericType::flux_byte_buffer(), IType::input_stream())
        } else {
            let client_type = body_type.client_type();
            (GenericType::mono(client_type.clone()), client_type)
        };
        let sync_return_with_response =
            create_sync_response(mappers, operation, &sync_return, is_protocol_method, custom_header_ignored)?;
        Ok(Self {
            async_rest_response,
            async_return,
            sync_return,
            sync_return_with_response,
        })
    }

    /// Return value of a non-polling method type.
    pub fn return_value(
        &self,
        mappers: &Mappers,
        operation: &Operation,
        method_type: ClientMethodType,
    ) -> Result<ReturnValue, MapError> {
        use ClientMethodType::*;
        let return_type = match method_type {
            PagingSyncSinglePage | SimpleSyncRestResponse => &self.sync_return_with_response,
            PagingAsyncSinglePage | SimpleAsyncRestResponse => &self.async_rest_response,
            PagingSync | SimpleSync | LongRunningSync => &self.sync_return,
            PagingAsync | SimpleAsync | LongRunningAsync => &self.async_return,
            LongRunningBeginSync | LongRunningBeginAsync => {
                return Err(MapError::UnsupportedReturnValue(method_type.to_string()));
            }
        };
        return_value(mappers, operation, return_type.clone(), &self.sync_return)
    }

    /// Return value of a begin method, which hands out a poller.
    pub fn begin_return_value(
        &self,
        mappers: &Mappers,
        operation: &Operation,
        method_type: ClientMethodType,
        polling_details: &MethodPollingDetails,
    ) -> Result<ReturnValue, MapError> {
        let poller = match method_type {
            ClientMethodType::LongRunningBeginSync => GenericType::sync_poller,
            ClientMethodType::LongRunningBeginAsync => GenericType::poller_flux,
            other => return Err(MapError::UnsupportedReturnValue(other.to_string())),
        };
        if mappers.settings().is_fluent() {
            let result = self.sync_return.as_nullable();
            let return_type = poller(GenericType::poll_result(result.clone()), result);
            return return_value(mappers, operation, return_type, &self.sync_return);
        }
        let return_type = poller(
            polling_details.intermediate_type.clone(),
            polling_details.final_type.clone(),
        );
        return_value(mappers, operation, return_type, &polling_details.final_type)
    }
}

pub fn return_value(
    mappers: &Mappers,
    operation: &Operation,
    return_type: IType,
    base_type: &IType,
) -> Result<ReturnValue, MapError> {
    Ok(ReturnValue {
        description: return_type_description(mappers, operation, &return_type, base_type)?,
        return_type,
    })
}

/// Doc text of a return value; `None` for `void`.
///
/// The text comes from an operation description starting with "get", then the first response
/// schema, then HEAD-as-boolean, and is then phrased for the container type.
pub fn return_type_description(
    mappers: &Mappers,
    operation: &Operation,
    return_type: &IType,
    base_type: &IType,
) -> Result<Option<String>, MapError> {
    if *return_type == IType::void() {
        return Ok(None);
    }

    let mut description = merge_summary_description(operation.summary.as_deref(), operation.description.as_deref())
        .filter(|d| {
            let lower = d.to_lowercase();
            lower.starts_with("get ") || lower.starts_with("gets ")
        })
        .and_then(|d| d.split_once(' ').map(|(_, rest)| format_description(rest)));

    if description.is_none() {
        if let Some(id) = operation.responses.first().and_then(|r| r.schema.as_deref()) {
            let info = &mappers.schema(id)?.info;
            description = info
                .summary
                .as_deref()
                .filter(|s| !s.is_empty())
                .or(info.description.as_deref().filter(|d| !d.is_empty()))
                .map(format_description);
        }
    }

    if description.is_none() && *base_type == IType::boolean() && operation.http_method() == HttpMethod::Head {
        description = Some("whether resource exists".to_string());
    }

    Ok(Some(
        assemble(description.as_deref(), return_type, base_type).unwrap_or_else(|| "the response".to_string()),
    ))
}

/// First sentence, without a trailing period, starting lowercase.
fn format_description(text: &str) -> String {
    let text = text.trim();
    let sentence = match text.find(". ") {
        Some(end) => &text[..end],
        None => text.strip_suffix('.').unwrap_or(text),
    };
    let mut chars = sentence.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => first.to_lowercase().chain(chars).collect(),
        _ => sentence.to_string(),
    }
}

fn is_response(t: &IType) -> bool {
    t.is_generic("Response") || t.is_generic("ResponseBase")
}

/// Phrase a description for the container type it is returned in.
fn assemble(description: Option<&str>, return_type: &IType, base_type: &IType) -> Option<String> {
    let IType::Generic(generic) = return_type else {
        return description.map(str::to_string);
    };
    let assembled = match generic.name.as_str() {
        "Mono" => {
            let inner = generic.type_arguments.first();
            match inner {
                Some(t) if is_response(t) || t.is_generic("PagedResponse") => {
                    let inner = assemble(description, t, base_type)?;
                    format!("{inner} on successful completion of {{@link Mono}}")
                }
                _ => match description {
                    Some(d) => format!("{d} on successful completion of {{@link Mono}}"),
                    None if base_type.is_void() => {
                        "A {@link Mono} that completes when a successful response is received".to_string()
                    }
                    None => "the response body on successful completion of {@link Mono}".to_string(),
                },
            }
        }
        _ if is_response(return_type) => match description {
            Some(d) => format!("{d} along with {{@link Response}}"),
            None if base_type.is_void() => "the {@link Response}".to_string(),
            None => "the response body along with {@link Response}".to_string(),
        },
        "PagedResponse" => format!(
            "{} along with {{@link PagedResponse}}",
            description.unwrap_or("the response body")
        ),
        name @ ("PagedFlux" | "PagedIterable") => match description {
            Some(d) => format!("{d} as paginated response with {{@link {name}}}"),
            None => format!("the paginated response with {{@link {name}}}"),
        },
        name @ ("PollerFlux" | "SyncPoller") => format!(
            "the {{@link {name}}} for polling of {}",
            description.unwrap_or("long-running operation")
        ),
        _ => return description.map(str::to_string),
    };
    Some(assembled)
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
  widget:
    type: object
    name: Widget
    description: The widget resource. It has an id.
    properties:
      - { name: id, schema: string }
operation_groups:
  - name: widgets
    operations:
      - name: get
        description: Gets a widget by id.
        requests:
          - http: { method: get, path: "/widgets/{id}" }
        responses:
          - { schema: widget, status_codes: ["200"] }
      - name: read
        requests:
          - http: { method: get, path: "/widgets/{id}/read" }
        responses:
          - { schema: widget, status_codes: ["200"] }
      - name: exists
        requests:
          - http: { method: head, path: "/widgets/{id}" }
        responses:
          - { status_codes: ["200"] }
          - { status_codes: ["404"] }
      - name: delete
        requests:
          - http: { method: delete, path: "/widgets/{id}" }
        responses:
          - { status_codes: ["204"] }
"#;

    fn mappers(flavor: Flavor) -> Mappers {
        let model = codemodel::from_yaml(MODEL).expect("should load");
        let settings = Settings {
            flavor,
            ..Settings::default()
        };
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
    fn simple_return_types() {
        let mappers = mappers(Flavor::Vanilla);
        let types = MethodReturnTypes::resolve(&mappers, operation(&mappers, "get"), false, false).unwrap();
        assert_eq!(types.async_rest_response.to_string(), "Mono<Response<Widget>>");
        assert_eq!(types.async_return.to_string(), "Mono<Widget>");
        assert_eq!(types.sync_return.to_string(), "Widget");
        assert_eq!(types.sync_return_with_response.to_string(), "Response<Widget>");

        let types = MethodReturnTypes::resolve(&mappers, operation(&mappers, "delete"), false, false).unwrap();
        assert_eq!(types.async_return.to_string(), "Mono<Void>");
        assert!(types.sync_return.is_void());
    }

    #[test]
    fn protocol_methods_return_binary_data() {
        let mappers = mappers(Flavor::DataPlane);
        let types = MethodReturnTypes::resolve(&mappers, operation(&mappers, "get"), true, false).unwrap();
        assert_eq!(types.sync_return_with_response.to_string(), "Response<BinaryData>");
    }

    #[test]
    fn descriptions_follow_the_container() {
        let mappers = mappers(Flavor::Vanilla);
        let get = operation(&mappers, "get");
        let types = MethodReturnTypes::resolve(&mappers, get, false, false).unwrap();

        let value = types.return_value(&mappers, get, ClientMethodType::SimpleAsync).unwrap();
        assert_eq!(
            value.description.as_deref(),
            Some("a widget by id on successful completion of {@link Mono}")
        );
        let value = types
            .return_value(&mappers, get, ClientMethodType::SimpleAsyncRestResponse)
            .unwrap();
        assert_eq!(
            value.description.as_deref(),
            Some("a widget by id along with {@link Response} on successful completion of {@link Mono}")
        );

        let read = operation(&mappers, "read");
        let value = types.return_value(&mappers, read, ClientMethodType::SimpleSync).unwrap();
        assert_eq!(value.description.as_deref(), Some("the widget resource"));
    }

    #[test]
    fn descriptions_without_text() {
        let mappers = mappers(Flavor::Vanilla);
        let exists = operation(&mappers, "exists");
        let description =
            return_type_description(&mappers, exists, &GenericType::response(IType::boolean()), &IType::boolean())
                .unwrap();
        assert_eq!(description.as_deref(), Some("whether resource exists along with {@link Response}"));

        let delete = operation(&mappers, "delete");
        let mono = return_type_description(&mappers, delete, &GenericType::mono(IType::void()), &IType::void());
        assert_eq!(
            mono.unwrap().as_deref(),
            Some("A {@link Mono} that completes when a successful response is received")
        );
        let response =
            return_type_description(&mappers, delete, &GenericType::response(IType::void()), &IType::void());
        assert_eq!(response.unwrap().as_deref(), Some("the {@link Response}"));
        assert_eq!(
            return_type_description(&mappers, delete, &IType::void(), &IType::void()).unwrap(),
            None
        );
        assert_eq!(
            assemble(None, &GenericType::paged_iterable(IType::string()), &IType::string()).as_deref(),
            Some("the paginated response with {@link PagedIterable}")
        );
        assert_eq!(
            assemble(Some("a job"), &GenericType::sync_poller(IType::string(), IType::string()), &IType::string())
                .as_deref(),
            Some("the {@link SyncPoller} for polling of a job")
        );
    }

    #[test]
    fn first_sentence_lowercased() {
        assert_eq!(format_description("The widget. It has an id."), "the widget");
        assert_eq!(format_description("Widget list."), "widget list");
        assert_eq!(format_description("ETag value"), "eTag value");
    }
}
