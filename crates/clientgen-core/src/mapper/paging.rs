use std::sync::Arc;

use crate::codemodel::{Operation, OperationKey, Parameter, ParameterLocation, Schema};
use crate::error::MapError;
use crate::model::{
    ClientMethod, ClientMethodParameter, ClientMethodType, IType, MethodPageDetails, ModelPropertySegment,
};

use super::Mappers;
use super::response_type::operation_response_type;
use super::util::lowest_common_parent;

const MAX_PAGE_SIZE_SERIALIZED_NAME: &str = "maxpagesize";
const MAX_PAGE_SIZE_NAME: &str = "maxPageSize";

/// A query parameter carrying the page size, which page iterators set themselves.
pub fn is_max_page_size_parameter(parameter: &Parameter) -> bool {
    parameter.location == ParameterLocation::Query && parameter.serialized_name() == MAX_PAGE_SIZE_SERIALIZED_NAME
}

/// The model every page response is or derives from.
pub fn page_response_schema<'a>(mappers: &'a Mappers, operation: &Operation) -> Result<&'a Schema, MapError> {
    let mut schemas: Vec<&Schema> = Vec::new();
    for id in operation.responses.iter().filter_map(|r| r.schema.as_deref()) {
        let schema = mappers.schema(id)?;
        if !schemas.iter().any(|s| s.id == schema.id) {
            schemas.push(schema);
        }
    }
    match lowest_common_parent(mappers, &schemas)? {
        Some(schema) if schema.as_object().is_some() => Ok(schema),
        _ => Err(MapError::NoCommonParent(
            schemas.iter().map(|s| s.name().to_string()).collect(),
        )),
    }
}

/// Element type of the page items list of a pageable operation.
pub fn page_item_type(mappers: &Mappers, operation: &Operation) -> Result<IType, MapError> {
    let item_name = operation
        .extensions
        .pageable
        .as_ref()
        .map(|p| p.item_name.as_str())
        .unwrap_or_default();
    let schema = page_response_schema(mappers, operation)?;
    let segment = property_segment(mappers, schema, item_name)?.ok_or_else(|| MapError::PageItemNotFound {
        item: item_name.to_string(),
        model: schema.name().to_string(),
    })?;
    segment
        .property
        .wire_type
        .list_element()
        .cloned()
        .ok_or_else(|| MapError::InvalidSchema {
            id: schema.id.clone(),
            reason: format!("page items property '{item_name}' is not a list"),
        })
}

/// The property with a serialized name, looked up on the schema and then on its ancestors.
fn property_segment(
    mappers: &Mappers,
    schema: &Schema,
    serialized_name: &str,
) -> Result<Option<ModelPropertySegment>, MapError> {
    let Some(object) = schema.as_object() else {
        return Ok(None);
    };
    let mut lineage = vec![schema];
    for id in &object.all_parents {
        lineage.push(mappers.schema(id)?);
    }
    for owner in lineage {
        let Some(property) = owner
            .as_object()
            .and_then(|o| o.properties.iter().find(|p| p.serialized_name() == serialized_name))
        else {
            continue;
        };
        return Ok(Some(ModelPropertySegment {
            model_name: mappers.map_type(owner)?.to_string(),
            property: mappers.map_model_property(property, false)?,
        }));
    }
    Ok(None)
}

/// Paging facts shared by every client method of a pageable operation.
#[derive(Debug)]
pub struct PagingMetadata {
    operation_key: OperationKey,
    next_operation_key: Option<OperationKey>,
    item_property: ModelPropertySegment,
    next_link_property: Option<ModelPropertySegment>,
    lro_intermediate_type: Option<IType>,
    next_methods: Arc<Vec<ClientMethod>>,
    max_page_size_parameter: Option<ClientMethodParameter>,
    next_link_reinjected_parameters: Vec<String>,
}

impl PagingMetadata {
    /// `None` for operations that are not pageable.
    ///
    /// `parameters` pairs each request parameter with the client parameter it became.
    pub fn create(
        mappers: &Mappers,
        operation: &Operation,
        parameters: &[(&Parameter, &ClientMethodParameter)],
    ) -> Result<Option<Self>, MapError> {
        let Some(pageable) = &operation.extensions.pageable else {
            return Ok(None);
        };
        let schema = page_response_schema(mappers, operation)?;
        let item_property = property_segment(mappers, schema, &pageable.item_name)?.ok_or_else(|| {
            MapError::PageItemNotFound {
                item: pageable.item_name.clone(),
                model: schema.name().to_string(),
            }
        })?;
        let next_link_property = match &pageable.next_link_name {
            Some(name) => Some(property_segment(mappers, schema, name)?.ok_or_else(|| {
                MapError::NextLinkNotFound {
                    next_link: name.clone(),
                    model: schema.name().to_string(),
                }
            })?),
            None => None,
        };

        let next_operation_key = pageable.next_operation_key;
        let is_next_method = next_operation_key == Some(operation.key);
        let lro_intermediate_type = if operation.is_long_running() && !is_next_method {
            Some(operation_response_type(mappers, operation)?)
        } else {
            None
        };
        let next_methods = match next_operation_key {
            Some(key) if !is_next_method => mappers.map_client_methods(mappers.operation(key)?)?,
            _ => Arc::new(Vec::new()),
        };

        let max_page_size_parameter = parameters
            .iter()
            .find(|(parameter, client_parameter)| {
                is_max_page_size_parameter(parameter)
                    || (parameter.location == ParameterLocation::Query && client_parameter.name == MAX_PAGE_SIZE_NAME)
            })
            .map(|(_, client_parameter)| (*client_parameter).clone());

        Ok(Some(Self {
            operation_key: operation.key,
            next_operation_key,
            item_property,
            next_link_property,
            lro_intermediate_type,
            next_methods,
            max_page_size_parameter,
            next_link_reinjected_parameters: pageable.next_link_reinjected_parameters.clone(),
        }))
    }

    /// The operation fetches the following pages of itself.
    pub fn is_method_for_next_page(&self) -> bool {
        self.next_operation_key == Some(self.operation_key)
    }

    pub fn page_details(&self, is_sync: bool) -> MethodPageDetails {
        let next_method = self.next_methods_of_type(is_sync).next().cloned();
        self.details(next_method)
    }

    /// Page details whose next method also takes the context parameter; `None` without one.
    pub fn page_details_with_context(
        &self,
        is_sync: bool,
        context: &ClientMethodParameter,
    ) -> Option<MethodPageDetails> {
        if self.next_methods.is_empty() {
            return None;
        }
        let next_method = self
            .next_methods_of_type(is_sync)
            .find(|m| m.has_parameter_of_type(&context.wire_type))?
            .clone();
        Some(self.details(Some(next_method)))
    }

    fn next_methods_of_type(&self, is_sync: bool) -> impl Iterator<Item = &ClientMethod> {
        let method_type = if is_sync {
            ClientMethodType::PagingSyncSinglePage
        } else {
            ClientMethodType::PagingAsyncSinglePage
        };
        self.next_methods
            .iter()
            .filter(move |m| m.method_type == method_type)
    }

    fn details(&self, next_method: Option<ClientMethod>) -> MethodPageDetails {
        MethodPageDetails {
            item_property: self.item_property.clone(),
            next_link_property: self.next_link_property.clone(),
            next_method: next_method.map(Arc::new),
            lro_intermediate_type: self.lro_intermediate_type.clone(),
            max_page_size_parameter: self.max_page_size_parameter.clone(),
            next_link_reinjected_parameters: self.next_link_reinjected_parameters.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codemodel;
    use crate::config::Settings;

    const MODEL: &str = r#"
schemas:
  string: { type: string }
  widget:
    type: object
    name: Widget
    properties:
      - { name: id, schema: string }
  widgets: { type: array, element_type: widget }
  page:
    type: object
    name: PageBase
    properties:
      - { name: value, schema: widgets }
      - { name: nextLink, schema: string }
  widgetPage:
    type: object
    name: WidgetPage
    parents: [page]
  gadgetPage:
    type: object
    name: GadgetPage
    parents: [page]
  error:
    type: object
    name: Error
    properties:
      - { name: code, schema: string }
operation_groups:
  - name: widgets
    operations:
      - name: list
        extensions:
          pageable: { item_name: value, next_link_name: nextLink }
        requests:
          - http: { method: get, path: /widgets }
        responses:
          - { schema: widgetPage, status_codes: ["200"] }
          - { schema: gadgetPage, status_codes: ["206"] }
      - name: listItems
        extensions:
          pageable: { item_name: items }
        requests:
          - http: { method: get, path: /items }
        responses:
          - { schema: page, status_codes: ["200"] }
      - name: listMixed
        extensions:
          pageable: {}
        requests:
          - http: { method: get, path: /mixed }
        responses:
          - { schema: page, status_codes: ["200"] }
          - { schema: error, status_codes: ["206"] }
"#;

    fn mappers() -> Mappers {
        let model = codemodel::from_yaml(MODEL).expect("should load");
        Mappers::new(Arc::new(model), Arc::new(Settings::default()))
    }

    fn operation<'a>(mappers: &'a Mappers, name: &str) -> &'a Operation {
        mappers
            .code_model()
            .operations()
            .find(|o| o.name == name)
            .expect("operation should exist")
    }

    #[test]
    fn item_and_next_link_resolve_on_common_parent() {
        let mappers = mappers();
        let list = operation(&mappers, "list");
        let metadata = PagingMetadata::create(&mappers, list, &[])
            .unwrap()
            .expect("should be pageable");
        let details = metadata.page_details(true);
        assert_eq!(details.item_property.model_name, "PageBase");
        assert_eq!(details.item_name(), "value");
        assert_eq!(details.next_link_name(), Some("nextLink"));
        assert!(details.next_method.is_none());
        assert_eq!(page_item_type(&mappers, list).unwrap().to_string(), "Widget");
    }

    #[test]
    fn missing_item_property_is_fatal() {
        let mappers = mappers();
        let err = PagingMetadata::create(&mappers, operation(&mappers, "listItems"), &[]).unwrap_err();
        assert!(matches!(err, MapError::PageItemNotFound { ref item, ref model } if item == "items" && model == "PageBase"));
    }

    #[test]
    fn unrelated_responses_have_no_common_parent() {
        let mappers = mappers();
        let list_mixed = operation(&mappers, "listMixed");
        let err = page_response_schema(&mappers, list_mixed).unwrap_err();
        assert!(matches!(err, MapError::NoCommonParent(ref names) if *names == ["PageBase", "Error"]));
        assert_eq!(err.to_string(), "no common parent found for client models [PageBase, Error]");

        let err = PagingMetadata::create(&mappers, list_mixed, &[]).unwrap_err();
        assert!(matches!(err, MapError::NoCommonParent(_)));
    }
}
