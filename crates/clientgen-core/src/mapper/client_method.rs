use std::sync::Arc;

use log::debug;

use crate::codemodel::{Operation, OperationKey, Parameter, ParameterLocation, Request};
use crate::config::{Settings, SyncMethods};
use crate::error::MapError;
use crate::model::{
    ClientMethod, ClientMethodParameter, ClientMethodType, ImplementationDetails, IType, MethodPollingDetails,
    ParameterTransformation, ProxyMethod, ReturnValue, Visibility,
};
use crate::naming;

use super::Mappers;
use super::cache::Memo;
use super::client_parameter::map_client_parameter;
use super::paging::{PagingMetadata, is_max_page_size_parameter};
use super::polling::PollingMetadata;
use super::proxy_parameter::map_proxy_parameter;
use super::return_description::MethodReturnTypes;
use super::transformation::TransformationProcessor;
use super::util::merge_summary_description;

/// Maps operations to the overloads exposed on clients.
///
/// Results are cached per operation and per protocol mode, since data-plane clients map
/// every operation twice: once for protocol methods and once for convenience methods.
#[derive(Default)]
pub struct ClientMethodMapper {
    cache: Memo<(OperationKey, bool), Arc<Vec<ClientMethod>>>,
}

impl ClientMethodMapper {
    pub fn map(
        &self,
        mappers: &Mappers,
        operation: &Operation,
        is_protocol_method: bool,
    ) -> Result<Arc<Vec<ClientMethod>>, MapError> {
        self.cache
            .get_or_try_insert_with((operation.key, is_protocol_method), || {
                map_operation(mappers, operation, is_protocol_method).map(Arc::new)
            })
    }
}

fn map_operation(
    mappers: &Mappers,
    operation: &Operation,
    is_protocol_method: bool,
) -> Result<Vec<ClientMethod>, MapError> {
    let settings = mappers.settings();
    let proxy_methods = mappers.map_proxy_methods(operation)?;

    let description = merge_summary_description(operation.summary.as_deref(), operation.description.as_deref())
        .unwrap_or_else(|| format!("The {} operation.", operation.name));
    let client_reference = if operation.group_name.is_empty() {
        "this"
    } else {
        "this.client"
    };
    let visibility_in_wrapper_client =
        if operation.internal_api || (is_protocol_method && operation.generate_protocol_api == Some(false)) {
            Visibility::PackagePrivate
        } else {
            Visibility::Public
        };

    let convenience_requests = operation
        .convenience_api
        .as_ref()
        .filter(|api| !is_protocol_method && !api.requests.is_empty())
        .map(|api| api.requests.as_slice());
    let requests = convenience_requests.unwrap_or(&operation.requests);

    let mut overloads = Overloads::new(settings, is_protocol_method);
    for request in requests {
        // Convenience requests reuse the proxy methods of the first protocol request.
        let proxies = if convenience_requests.is_some() {
            proxy_methods.values().next()
        } else {
            proxy_methods.get(&request.key)
        };
        let Some(proxies) = proxies else {
            continue;
        };

        for proxy in proxies {
            let signature = MethodSignature::build(mappers, operation, request, proxy, is_protocol_method)?;
            let return_types =
                MethodReturnTypes::resolve(mappers, operation, is_protocol_method, proxy.custom_header_ignored)?;
            let names = MethodNames::resolve(operation, proxy, is_protocol_method);

            let base = ClientMethod {
                name: String::new(),
                description: description.clone(),
                method_type: ClientMethodType::SimpleAsync,
                return_value: ReturnValue {
                    description: None,
                    return_type: IType::void(),
                },
                parameters: signature.parameters.clone(),
                only_required_parameters: false,
                proxy_method: Arc::clone(proxy),
                required_nullable_parameter_expressions: signature.required_nullable_expressions.clone(),
                is_grouped_parameter_required: false,
                client_reference: client_reference.to_string(),
                parameter_transformations: signature.transformations.clone(),
                page_details: None,
                polling_details: None,
                visibility: Visibility::Public,
                visibility_in_wrapper_client,
                has_with_context_overload: false,
                implementation_details: None,
                cross_language_definition_id: operation.cross_language_definition_id.clone(),
            };
            let context = MethodContext {
                mappers,
                operation,
                proxy,
                return_types: &return_types,
                names: &names,
                only_required_overload: settings.required_parameter_client_methods
                    && signature.has_optional_parameters(),
            };

            if operation.is_pageable() {
                let pairs: Vec<(&Parameter, &ClientMethodParameter)> =
                    signature.mapped.iter().map(|(p, c)| (*p, c)).collect();
                let Some(paging) = PagingMetadata::create(mappers, operation, &pairs)? else {
                    continue;
                };
                if proxy.is_sync {
                    overloads.paging(&context, &base, &paging, true)?;
                } else {
                    overloads.paging(&context, &base, &paging, false)?;
                    if settings.is_generate_sync_methods() && !settings.is_sync_stack_enabled() {
                        overloads.paging(&context, &base, &paging, true)?;
                    }
                }
            } else if operation.is_long_running()
                && (settings.is_fluent() || settings.polling_for("default").is_some())
                && !return_types.sync_return.is_input_stream()
            {
                // Polling runs on the asynchronous stack only.
                if proxy.is_sync {
                    continue;
                }
                overloads.long_running(&context, &base)?;
            } else if proxy.is_sync {
                overloads.simple(&context, &base, true)?;
            } else {
                if settings.sync_methods != SyncMethods::SyncOnly {
                    overloads.simple(&context, &base, false)?;
                }
                if settings.is_generate_sync_methods() && !settings.is_sync_stack_enabled() {
                    overloads.simple(&context, &base, true)?;
                }
            }
        }
    }

    let methods = overloads.finish();
    debug!(
        "mapped {} client methods for operation '{}' (protocol: {})",
        methods.len(),
        operation.operation_id(),
        is_protocol_method
    );
    Ok(methods)
}

/// Parameters of every overload of one proxy method.
struct MethodSignature<'a> {
    /// Each mapped request parameter with the client parameter it became.
    mapped: Vec<(&'a Parameter, ClientMethodParameter)>,
    parameters: Vec<ClientMethodParameter>,
    required_nullable_expressions: Vec<String>,
    transformations: Vec<ParameterTransformation>,
}

impl<'a> MethodSignature<'a> {
    fn build(
        mappers: &'a Mappers,
        operation: &Operation,
        request: &'a Request,
        proxy: &ProxyMethod,
        is_protocol_method: bool,
    ) -> Result<Self, MapError> {
        let settings = mappers.settings();
        let drop_page_size = operation.is_pageable() && settings.enable_page_size;
        let on_service_client = operation.group_name.is_empty();

        let mut mapped = Vec::new();
        let mut parameters = Vec::new();
        let mut required_nullable_expressions = Vec::new();
        let mut processor = TransformationProcessor::new(mappers, request, is_protocol_method);

        for parameter in request
            .parameters
            .iter()
            .filter(|p| is_method_parameter(p, is_protocol_method))
        {
            let mut client_parameter = map_client_parameter(mappers, parameter, is_protocol_method)?;
            if proxy.uses_binary_data() && client_parameter.client_type.is_flux_byte_buffer() {
                let binary = IType::binary_data();
                client_parameter.raw_type = binary.clone();
                client_parameter.wire_type = binary.clone();
                client_parameter.client_type = binary;
            }

            let in_signature = request.is_signature_parameter(parameter)
                && !(drop_page_size && is_max_page_size_parameter(parameter));
            if in_signature {
                parameters.push(client_parameter.clone());
            }

            if !mappers.schema(&parameter.schema)?.is_constant() && parameter.grouped_by.is_none() {
                let (required, client_type, expression) = if parameter.is_client() {
                    let proxy_parameter = map_proxy_parameter(mappers, parameter, on_service_client, false)?;
                    (
                        proxy_parameter.required,
                        proxy_parameter.client_type,
                        proxy_parameter.parameter_reference,
                    )
                } else {
                    (
                        client_parameter.required,
                        client_parameter.client_type.clone(),
                        client_parameter.name.clone(),
                    )
                };
                if required && !client_type.is_primitive() {
                    required_nullable_expressions.push(expression);
                }
            }

            processor.add_parameter(parameter, &client_parameter)?;
            mapped.push((parameter, client_parameter));
        }

        Ok(Self {
            mapped,
            parameters,
            required_nullable_expressions,
            transformations: processor.process()?,
        })
    }

    fn has_optional_parameters(&self) -> bool {
        self.parameters.iter().any(|p| !p.required && !p.is_constant)
    }
}

/// Protocol methods take the required wire parameters only; the rest travel in request options.
fn is_method_parameter(parameter: &Parameter, is_protocol_method: bool) -> bool {
    if is_protocol_method {
        parameter.required
            && matches!(
                parameter.location,
                ParameterLocation::Path | ParameterLocation::Body | ParameterLocation::Header | ParameterLocation::Query
            )
    } else {
        !parameter.flattened
    }
}

/// Method names derived from a proxy method, or from the convenience API name.
struct MethodNames {
    name: String,
    base_name: String,
}

impl MethodNames {
    fn resolve(operation: &Operation, proxy: &ProxyMethod, is_protocol_method: bool) -> Self {
        match &operation.convenience_api {
            Some(api) if !is_protocol_method && !api.name.is_empty() => Self {
                name: api.name.clone(),
                base_name: api.name.clone(),
            },
            _ => Self {
                name: proxy.name.clone(),
                base_name: proxy.base_name.clone(),
            },
        }
    }

    fn method(&self) -> String {
        self.base_name.clone()
    }

    fn simple_async(&self) -> String {
        format!("{}Async", self.name)
    }

    fn simple_async_rest_response(&self) -> String {
        format!("{}WithResponseAsync", self.name)
    }

    fn simple_rest_response(&self) -> String {
        format!("{}WithResponse", self.base_name)
    }

    fn paging_async_single_page(&self) -> String {
        format!("{}SinglePageAsync", self.name)
    }

    fn paging_single_page(&self) -> String {
        format!("{}SinglePage", self.base_name)
    }

    fn lro_begin_async(&self) -> String {
        format!("begin{}Async", naming::to_pascal(&self.name))
    }

    fn lro_begin(&self) -> String {
        format!("begin{}", naming::to_pascal(&self.base_name))
    }

    fn lro_model_begin_async(&self) -> String {
        format!("begin{}WithModelAsync", naming::to_pascal(&self.name))
    }

    fn lro_model_begin(&self) -> String {
        format!("begin{}WithModel", naming::to_pascal(&self.base_name))
    }
}

/// Facts shared by every overload of one proxy method.
struct MethodContext<'a> {
    mappers: &'a Mappers,
    operation: &'a Operation,
    proxy: &'a ProxyMethod,
    return_types: &'a MethodReturnTypes,
    names: &'a MethodNames,
    only_required_overload: bool,
}

impl MethodContext<'_> {
    fn return_value(&self, method_type: ClientMethodType) -> Result<ReturnValue, MapError> {
        self.return_types
            .return_value(self.mappers, self.operation, method_type)
    }
}

/// Accumulates the overloads of an operation.
struct Overloads<'a> {
    settings: &'a Settings,
    is_protocol_method: bool,
    context_parameter: ClientMethodParameter,
    methods: Vec<ClientMethod>,
}

impl<'a> Overloads<'a> {
    fn new(settings: &'a Settings, is_protocol_method: bool) -> Self {
        Self {
            settings,
            is_protocol_method,
            context_parameter: if is_protocol_method {
                ClientMethodParameter::request_options()
            } else {
                ClientMethodParameter::context()
            },
            methods: Vec::new(),
        }
    }

    fn visibility(&self, method_type: ClientMethodType, has_context: bool) -> Visibility {
        method_visibility(self.settings, method_type, has_context, self.is_protocol_method)
    }

    fn push(&mut self, method: ClientMethod) {
        self.methods.push(method);
    }

    /// The overload taking the trailing context (or request options) parameter.
    fn push_with_context(&mut self, method: &ClientMethod, visibility: Visibility) {
        let mut parameters = method.parameters.clone();
        if self.settings.is_branded() || self.context_parameter.client_type == IType::request_options() {
            parameters.push(self.context_parameter.clone());
        }
        self.methods.push(ClientMethod {
            parameters,
            only_required_parameters: false,
            has_with_context_overload: false,
            visibility,
            ..method.clone()
        });
    }

    /// Overloads for the parameter sets of earlier service versions.
    fn push_versioning_overloads(&mut self, method: &ClientMethod) {
        if self.is_protocol_method || !self.settings.is_data_plane() {
            return;
        }
        for parameters in overloaded_signatures(&method.parameters) {
            self.methods.push(ClientMethod {
                parameters,
                ..method.clone()
            });
        }
    }

    fn push_required_only(&mut self, context: &MethodContext<'_>, method: &ClientMethod) {
        if context.only_required_overload {
            self.methods.push(ClientMethod {
                only_required_parameters: true,
                visibility: self.visibility(method.method_type, false),
                ..method.clone()
            });
        }
    }

    fn simple(&mut self, context: &MethodContext<'_>, base: &ClientMethod, is_sync: bool) -> Result<(), MapError> {
        let (rest_type, plain_type) = if is_sync {
            (ClientMethodType::SimpleSyncRestResponse, ClientMethodType::SimpleSync)
        } else {
            (ClientMethodType::SimpleAsyncRestResponse, ClientMethodType::SimpleAsync)
        };
        let rest_context_visibility = self.visibility(rest_type, true);
        let rest = ClientMethod {
            name: if is_sync {
                context.names.simple_rest_response()
            } else {
                context.names.simple_async_rest_response()
            },
            method_type: rest_type,
            return_value: context.return_value(rest_type)?,
            visibility: self.visibility(rest_type, false),
            has_with_context_overload: rest_context_visibility != Visibility::NotGenerate,
            ..base.clone()
        };
        // The context-less response overload only survives visibility rules on some flavors.
        self.push(rest.clone());
        self.push_with_context(&rest, rest_context_visibility);

        if context.proxy.custom_header_ignored {
            return Ok(());
        }
        let plain = ClientMethod {
            name: if is_sync {
                context.names.method()
            } else {
                context.names.simple_async()
            },
            method_type: plain_type,
            return_value: context.return_value(plain_type)?,
            visibility: self.visibility(plain_type, false),
            has_with_context_overload: false,
            ..base.clone()
        };
        self.push(plain.clone());
        self.push_versioning_overloads(&plain);
        self.push_required_only(context, &plain);
        let visibility = self.visibility(plain_type, true);
        self.push_with_context(&plain, visibility);
        Ok(())
    }

    fn paging(
        &mut self,
        context: &MethodContext<'_>,
        base: &ClientMethod,
        paging: &PagingMetadata,
        is_sync: bool,
    ) -> Result<(), MapError> {
        let (single_page_type, page_type) = if is_sync {
            (ClientMethodType::PagingSyncSinglePage, ClientMethodType::PagingSync)
        } else {
            (ClientMethodType::PagingAsyncSinglePage, ClientMethodType::PagingAsync)
        };
        let generate = self.settings.sync_methods != SyncMethods::None;
        let details = paging.page_details(is_sync);

        // Single-page methods only come in the full overload and are not meant for users.
        let single_page = ClientMethod {
            name: if is_sync {
                context.names.paging_single_page()
            } else {
                context.names.paging_async_single_page()
            },
            method_type: single_page_type,
            return_value: context.return_value(single_page_type)?,
            page_details: Some(details.clone()),
            visibility: self.visibility(single_page_type, false),
            ..base.clone()
        };
        if generate {
            self.push(single_page.clone());
        }
        let visibility = self.visibility(single_page_type, true);
        self.push_with_context(&single_page, visibility);

        if paging.is_method_for_next_page() {
            return Ok(());
        }

        let page = ClientMethod {
            name: if is_sync {
                context.names.method()
            } else {
                context.names.simple_async()
            },
            method_type: page_type,
            return_value: context.return_value(page_type)?,
            visibility: self.visibility(page_type, false),
            ..single_page
        };
        if generate {
            self.push(page.clone());
            self.push_versioning_overloads(&page);
        }
        self.push_required_only(context, &page);

        let details_with_context = paging
            .page_details_with_context(is_sync, &self.context_parameter)
            .unwrap_or(details);
        let page_with_context = ClientMethod {
            page_details: Some(details_with_context),
            ..page
        };
        let visibility = self.visibility(page_type, true);
        self.push_with_context(&page_with_context, visibility);
        Ok(())
    }

    fn long_running(&mut self, context: &MethodContext<'_>, base: &ClientMethod) -> Result<(), MapError> {
        use ClientMethodType::{SimpleAsyncRestResponse, SimpleSyncRestResponse};

        let (async_visibility, async_context_visibility, sync_visibility, sync_context_visibility) =
            if self.settings.is_data_plane() {
                (
                    Visibility::NotGenerate,
                    Visibility::Private,
                    Visibility::NotGenerate,
                    Visibility::Private,
                )
            } else {
                (
                    self.visibility(SimpleAsyncRestResponse, false),
                    self.visibility(SimpleAsyncRestResponse, true),
                    self.visibility(SimpleSyncRestResponse, false),
                    self.visibility(SimpleSyncRestResponse, true),
                )
            };

        let rest = ClientMethod {
            name: context.names.simple_async_rest_response(),
            method_type: SimpleAsyncRestResponse,
            return_value: context.return_value(SimpleAsyncRestResponse)?,
            visibility: async_visibility,
            has_with_context_overload: async_context_visibility != Visibility::NotGenerate,
            ..base.clone()
        };
        self.push(rest.clone());
        self.push_with_context(&rest, async_context_visibility);

        if self.settings.is_sync_stack_enabled() && !context.proxy.uses_flux_byte_buffer() {
            let sync_rest = ClientMethod {
                name: context.names.simple_rest_response(),
                method_type: SimpleSyncRestResponse,
                return_value: context.return_value(SimpleSyncRestResponse)?,
                visibility: sync_visibility,
                proxy_method: Arc::new(context.proxy.to_sync()),
                ..base.clone()
            };
            self.push(sync_rest.clone());
            self.push_with_context(&sync_rest, sync_context_visibility);
        }

        let Some(polling) = PollingMetadata::create(
            context.mappers,
            context.operation,
            context.proxy,
            &context.return_types.sync_return,
        )?
        else {
            return Ok(());
        };

        if self.is_protocol_method && !polling.has_binary_data_result_types() {
            // Protocol methods poll with BinaryData; the typed pollers stay on the implementation.
            self.begin_methods(
                context,
                base,
                &context.names.lro_begin_async(),
                &context.names.lro_begin(),
                &polling.binary_data_details(),
            )?;
            let implementation_only = ClientMethod {
                implementation_details: Some(ImplementationDetails {
                    implementation_only: true,
                    ..base.implementation_details.clone().unwrap_or_default()
                }),
                ..base.clone()
            };
            self.begin_methods(
                context,
                &implementation_only,
                &context.names.lro_model_begin_async(),
                &context.names.lro_model_begin(),
                &polling.details(),
            )
        } else {
            self.begin_methods(
                context,
                base,
                &context.names.lro_begin_async(),
                &context.names.lro_begin(),
                &polling.details(),
            )
        }
    }

    fn begin_methods(
        &mut self,
        context: &MethodContext<'_>,
        base: &ClientMethod,
        async_name: &str,
        sync_name: &str,
        polling_details: &MethodPollingDetails,
    ) -> Result<(), MapError> {
        let mut variants = Vec::new();
        if self.settings.is_generate_async_methods() {
            variants.push((ClientMethodType::LongRunningBeginAsync, async_name));
        }
        if !context.proxy.uses_flux_byte_buffer()
            && (self.settings.is_generate_sync_methods() || self.settings.is_sync_stack_enabled())
        {
            variants.push((ClientMethodType::LongRunningBeginSync, sync_name));
        }

        for (method_type, name) in variants {
            let method = ClientMethod {
                name: name.to_string(),
                method_type,
                return_value: context.return_types.begin_return_value(
                    context.mappers,
                    context.operation,
                    method_type,
                    polling_details,
                )?,
                polling_details: Some(polling_details.clone()),
                visibility: self.visibility(method_type, false),
                ..base.clone()
            };
            self.push(method.clone());
            self.push_versioning_overloads(&method);
            self.push_required_only(context, &method);
            let visibility = self.visibility(method_type, true);
            self.push_with_context(&method, visibility);
        }
        Ok(())
    }

    fn finish(self) -> Vec<ClientMethod> {
        let mut methods: Vec<ClientMethod> = Vec::with_capacity(self.methods.len());
        for method in self.methods {
            if method.visibility != Visibility::NotGenerate && !methods.contains(&method) {
                methods.push(method);
            }
        }
        methods
    }
}

/// Visibility of one overload.
pub fn method_visibility(
    settings: &Settings,
    method_type: ClientMethodType,
    has_context: bool,
    is_protocol_method: bool,
) -> Visibility {
    use ClientMethodType::*;

    if settings.is_data_plane() {
        if is_protocol_method {
            // Only response-returning methods; context travels in the request options.
            if matches!(method_type, SimpleAsync | SimpleSync)
                || !has_context
                || (method_type == PagingSyncSinglePage && !settings.is_sync_stack_enabled())
            {
                return Visibility::NotGenerate;
            }
            if method_type == PagingAsyncSinglePage || method_type == PagingSyncSinglePage {
                return Visibility::Private;
            }
            return Visibility::Public;
        }
        return match method_type {
            SimpleAsync | SimpleSync | PagingAsync | PagingSync | LongRunningBeginAsync | LongRunningBeginSync
                if !has_context =>
            {
                Visibility::Public
            }
            _ => Visibility::NotGenerate,
        };
    }

    match method_type {
        SimpleSyncRestResponse if !has_context => Visibility::NotGenerate,
        SimpleSync if has_context => Visibility::NotGenerate,
        _ => Visibility::Public,
    }
}

/// Parameter lists of earlier service versions.
///
/// Each version keeps the parameters present since the beginning plus those added in that
/// version. Lists equal to the full list, to the required-only list or to an earlier entry
/// are skipped.
pub fn overloaded_signatures(parameters: &[ClientMethodParameter]) -> Vec<Vec<ClientMethodParameter>> {
    if parameters.iter().all(|p| p.added_in_versions.is_empty()) {
        return Vec::new();
    }
    let names = |list: &[ClientMethodParameter]| list.iter().map(|p| p.name.clone()).collect::<Vec<_>>();
    let all = names(parameters);
    let required: Vec<String> = parameters
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name.clone())
        .collect();

    let mut versions: Vec<Option<&str>> = vec![None];
    for version in parameters.iter().flat_map(|p| p.added_in_versions.iter()) {
        if !versions.contains(&Some(version.as_str())) {
            versions.push(Some(version.as_str()));
        }
    }

    let mut signatures: Vec<Vec<ClientMethodParameter>> = Vec::new();
    for version in versions {
        let overloaded: Vec<ClientMethodParameter> = parameters
            .iter()
            .filter(|p| {
                p.added_in_versions.is_empty()
                    || version.is_some_and(|v| p.added_in_versions.iter().any(|added| added == v))
            })
            .cloned()
            .collect();
        let overloaded_names = names(&overloaded);
        if overloaded_names != all
            && overloaded_names != required
            && !signatures.iter().any(|s| names(s) == overloaded_names)
        {
            signatures.push(overloaded);
        }
    }
    signatures
}
