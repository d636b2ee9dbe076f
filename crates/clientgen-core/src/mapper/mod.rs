pub mod cache;
pub mod choice;
pub mod client;
pub mod client_method;
pub mod client_parameter;
pub mod collection;
pub mod constant;
pub mod exception;
pub mod method_group;
pub mod model;
pub mod model_property;
pub mod object;
pub mod paging;
pub mod polling;
pub mod primitive;
pub mod proxy_method;
pub mod proxy_parameter;
pub mod proxy_parameters;
pub mod response_type;
pub mod return_description;
pub mod service_client;
pub mod transformation;
pub mod union;
pub mod util;

use std::sync::Arc;

use indexmap::IndexMap;

use crate::codemodel::{CodeModel, Operation, OperationKey, RequestKey, Schema, SchemaKind};
use crate::config::Settings;
use crate::error::MapError;
use crate::model::{
    ClientException, ClientMethod, ClientModel, ClientModelProperty, IType, MethodGroupClient,
    ProxyMethod,
};

use choice::ChoiceMapper;
use client_method::ClientMethodMapper;
use collection::CollectionMapper;
use constant::ConstantMapper;
use exception::ExceptionMapper;
use method_group::MethodGroupMapper;
use model::ModelMapper;
use object::ObjectMapper;
use primitive::PrimitiveMapper;
use proxy_method::ProxyMethodMapper;
use response_type::ResponseHeadersMapper;
use union::UnionMapper;

/// Maps one schema kind to its resolved type.
///
/// Implementations memoize per schema id, so every lookup of the same schema yields
/// the same shared type.
pub trait TypeMapper: Send + Sync {
    fn map(&self, mappers: &Mappers, schema: &Schema) -> Result<IType, MapError>;
}

/// Proxy methods of an operation, grouped by the request they were derived from.
pub type ProxyMethods = IndexMap<RequestKey, Vec<Arc<ProxyMethod>>>;

/// The mapper registry for one generation run.
///
/// Every cache lives here, so two registries never share resolved entities.
pub struct Mappers {
    settings: Arc<Settings>,
    code_model: Arc<CodeModel>,
    primitives: Box<dyn TypeMapper>,
    choices: Box<dyn TypeMapper>,
    collections: Box<dyn TypeMapper>,
    constants: Box<dyn TypeMapper>,
    objects: Box<dyn TypeMapper>,
    unions: Box<dyn TypeMapper>,
    models: ModelMapper,
    exceptions: ExceptionMapper,
    response_headers: ResponseHeadersMapper,
    proxy_methods: ProxyMethodMapper,
    client_methods: ClientMethodMapper,
    method_groups: MethodGroupMapper,
}

/// Builds a registry, optionally replacing per-kind type mapping strategies.
pub struct MappersBuilder {
    settings: Arc<Settings>,
    code_model: Arc<CodeModel>,
    objects: Option<Box<dyn TypeMapper>>,
    unions: Option<Box<dyn TypeMapper>>,
    primitives: Option<Box<dyn TypeMapper>>,
}

impl MappersBuilder {
    pub fn new(code_model: Arc<CodeModel>, settings: Arc<Settings>) -> Self {
        Self {
            settings,
            code_model,
            objects: None,
            unions: None,
            primitives: None,
        }
    }

    pub fn object_mapper(mut self, mapper: Box<dyn TypeMapper>) -> Self {
        self.objects = Some(mapper);
        self
    }

    pub fn union_mapper(mut self, mapper: Box<dyn TypeMapper>) -> Self {
        self.unions = Some(mapper);
        self
    }

    pub fn primitive_mapper(mut self, mapper: Box<dyn TypeMapper>) -> Self {
        self.primitives = Some(mapper);
        self
    }

    pub fn build(self) -> Mappers {
        Mappers {
            settings: self.settings,
            code_model: self.code_model,
            primitives: self
                .primitives
                .unwrap_or_else(|| Box::new(PrimitiveMapper::default())),
            choices: Box::new(ChoiceMapper::default()),
            collections: Box::new(CollectionMapper::default()),
            constants: Box::new(ConstantMapper::default()),
            objects: self
                .objects
                .unwrap_or_else(|| Box::new(ObjectMapper::default())),
            unions: self
                .unions
                .unwrap_or_else(|| Box::new(UnionMapper::default())),
            models: ModelMapper::default(),
            exceptions: ExceptionMapper::default(),
            response_headers: ResponseHeadersMapper::default(),
            proxy_methods: ProxyMethodMapper::default(),
            client_methods: ClientMethodMapper::default(),
            method_groups: MethodGroupMapper::default(),
        }
    }
}

impl Mappers {
    pub fn new(code_model: Arc<CodeModel>, settings: Arc<Settings>) -> Self {
        MappersBuilder::new(code_model, settings).build()
    }

    pub fn builder(code_model: Arc<CodeModel>, settings: Arc<Settings>) -> MappersBuilder {
        MappersBuilder::new(code_model, settings)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn code_model(&self) -> &CodeModel {
        &self.code_model
    }

    pub fn schema(&self, id: &str) -> Result<&Schema, MapError> {
        self.code_model
            .schema(id)
            .ok_or_else(|| MapError::MissingSchema(id.to_string()))
    }

    pub fn operation(&self, key: OperationKey) -> Result<&Operation, MapError> {
        self.code_model
            .operation(key)
            .ok_or_else(|| MapError::MissingOperation(format!("{}/{}", key.group, key.index)))
    }

    /// Resolve a schema to its type, dispatching on the schema kind.
    pub fn map_type(&self, schema: &Schema) -> Result<IType, MapError> {
        let mapper = match &schema.kind {
            SchemaKind::Choice(_) | SchemaKind::SealedChoice(_) => &self.choices,
            SchemaKind::Array(_) | SchemaKind::Dictionary(_) => &self.collections,
            SchemaKind::Constant(_) => &self.constants,
            SchemaKind::Object(_) | SchemaKind::Group(_) => &self.objects,
            SchemaKind::Or(_) => &self.unions,
            SchemaKind::Unsupported(tag) => return Err(MapError::UnsupportedKind(tag.clone())),
            _ => &self.primitives,
        };
        mapper.map(self, schema)
    }

    pub fn map_type_id(&self, id: &str) -> Result<IType, MapError> {
        self.map_type(self.schema(id)?)
    }

    /// Resolve an object schema to its client model; `None` for plain objects and
    /// externally supplied models.
    pub fn map_model(&self, schema: &Schema) -> Result<Option<Arc<ClientModel>>, MapError> {
        self.models.map(self, schema)
    }

    pub fn map_model_property(
        &self,
        property: &crate::codemodel::Property,
        as_merge_patch: bool,
    ) -> Result<ClientModelProperty, MapError> {
        model_property::map_property(self, property, as_merge_patch)
    }

    pub fn map_exception(&self, schema: &Schema) -> Result<Option<Arc<ClientException>>, MapError> {
        self.exceptions.map(self, schema)
    }

    /// Strongly typed header model of an operation, when its responses declare headers.
    pub fn map_response_headers(&self, operation: &Operation) -> Result<Option<Arc<ClientModel>>, MapError> {
        self.response_headers.map(self, operation)
    }

    pub fn map_proxy_methods(&self, operation: &Operation) -> Result<Arc<ProxyMethods>, MapError> {
        self.proxy_methods.map(self, operation)
    }

    /// Client methods of an operation, in protocol mode for data-plane clients.
    pub fn map_client_methods(&self, operation: &Operation) -> Result<Arc<Vec<ClientMethod>>, MapError> {
        self.client_methods
            .map(self, operation, self.settings.is_data_plane())
    }

    pub fn map_client_methods_with(
        &self,
        operation: &Operation,
        is_protocol_method: bool,
    ) -> Result<Arc<Vec<ClientMethod>>, MapError> {
        self.client_methods.map(self, operation, is_protocol_method)
    }

    pub fn map_method_group(&self, group_index: usize) -> Result<Arc<MethodGroupClient>, MapError> {
        self.method_groups.map(self, group_index)
    }

    /// Resolve the whole code model.
    pub fn map_client(&self) -> Result<crate::model::Client, MapError> {
        client::map_client(self)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::codemodel;

    const MODEL: &str = r#"
schemas:
  string: { type: string }
  colors: { type: flag, name: Colors }
  widget:
    type: object
    name: Widget
    properties:
      - { name: id, schema: string }
      - { name: name, schema: string }
"#;

    fn mappers() -> Mappers {
        let model = codemodel::from_yaml(MODEL).expect("should load");
        Mappers::new(Arc::new(model), Arc::new(Settings::default()))
    }

    #[test]
    fn unknown_schema_kinds_are_rejected() {
        let mappers = mappers();
        let err = mappers.map_type_id("colors").unwrap_err();
        assert!(matches!(err, MapError::UnsupportedKind(ref tag) if tag == "flag"));
    }

    #[test]
    fn concurrent_model_and_type_lookups_agree() {
        let mappers = mappers();
        let results = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let mappers = &mappers;
                    scope.spawn(move || {
                        let widget = mappers.schema("widget").unwrap();
                        let model = mappers.map_model(widget).unwrap().expect("should be a model");
                        let t = mappers.map_type(widget).unwrap();
                        (model, t)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });

        let (first_model, first_type) = &results[0];
        assert_eq!(first_model.name, "Widget");
        assert_eq!(first_type.to_string(), "Widget");
        for (model, t) in &results {
            assert!(Arc::ptr_eq(model, first_model));
            assert_eq!(t, first_type);
        }
        let again = mappers.map_model(mappers.schema("widget").unwrap()).unwrap().unwrap();
        assert!(Arc::ptr_eq(&again, first_model));
    }
}
