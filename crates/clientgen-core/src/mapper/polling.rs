use crate::codemodel::{HttpMethod, Operation};
use crate::config::{PollingSettings, Settings};
use crate::error::MapError;
use crate::model::{ClassType, IType, MethodPollingDetails, ProxyMethod};

use super::Mappers;

/// Strategy instantiation for a strategy class named by long-running metadata.
fn strategy_expression(class_name: &str, final_result_argument: Option<&str>) -> String {
    let options = "new PollingStrategyOptions({httpPipeline}).setEndpoint({endpoint}).setContext({context}).setServiceVersion(this.getServiceVersion().getVersion())";
    match final_result_argument {
        Some(argument) => format!("new {class_name}<>({options}, {argument})"),
        None => format!("new {class_name}<>({options})"),
    }
}

/// Polling facts of a long-running operation.
#[derive(Debug, Clone, PartialEq)]
pub struct PollingMetadata {
    polling_strategy: String,
    sync_polling_strategy: String,
    poll_result_type: IType,
    final_result_type: IType,
    poll_interval_seconds: u32,
    http_method: HttpMethod,
}

impl PollingMetadata {
    /// `None` when no polling settings apply to the operation. Fluent clients always poll.
    pub fn create(
        mappers: &Mappers,
        operation: &Operation,
        proxy_method: &ProxyMethod,
        sync_return_type: &IType,
    ) -> Result<Option<Self>, MapError> {
        let settings = mappers.settings();
        let fluent_default;
        let polling = match settings.polling_for(&proxy_method.operation_id) {
            Some(polling) => polling,
            None if settings.is_fluent() => {
                fluent_default = PollingSettings::default();
                &fluent_default
            }
            None => return Ok(None),
        };
        let http_method = operation.http_method();

        let metadata = match (&operation.lro_metadata, &operation.convenience_api) {
            (Some(lro), Some(_)) => lro,
            _ => {
                if settings.is_fluent() {
                    return Ok(Some(Self::new(
                        polling,
                        sync_return_type.as_nullable(),
                        sync_return_type.as_nullable(),
                        http_method,
                    )));
                }
                let poll_result_type = non_void(match &polling.poll_result_type {
                    Some(name) => type_from_model_name(settings, name),
                    None => sync_return_type.as_nullable(),
                });
                let final_result_type = if http_method == HttpMethod::Delete {
                    IType::void()
                } else {
                    non_void(match &polling.final_result_type {
                        Some(name) => type_from_model_name(settings, name),
                        None => sync_return_type.as_nullable(),
                    })
                };
                return Ok(Some(Self::new(
                    polling,
                    poll_result_type,
                    final_result_type,
                    http_method,
                )));
            }
        };

        if metadata.poll_result_type.is_empty() {
            return Err(MapError::MissingPollResultType(operation.operation_id()));
        }
        let poll_result_type = match &polling.poll_result_type {
            Some(name) => type_from_model_name(settings, name),
            None => mappers.map_type_id(&metadata.poll_result_type)?,
        };
        let final_result_type = match (&polling.final_result_type, &metadata.final_result_type) {
            (Some(name), _) => type_from_model_name(settings, name),
            (None, Some(id)) => mappers.map_type_id(id)?,
            (None, None) => IType::void(),
        };

        let mut result = Self::new(polling, poll_result_type, final_result_type, http_method);
        if let Some(strategy) = &metadata.polling_strategy {
            let package = settings.implementation_package();
            let argument = metadata
                .final_result_property_serialized_name
                .as_deref()
                .map(|name| IType::string().default_value_expression(name));
            result.polling_strategy = strategy_expression(&format!("{package}.{strategy}"), argument.as_deref());
            result.sync_polling_strategy =
                strategy_expression(&format!("{package}.Sync{strategy}"), argument.as_deref());
        }
        Ok(Some(result))
    }

    fn new(
        polling: &PollingSettings,
        poll_result_type: IType,
        final_result_type: IType,
        http_method: HttpMethod,
    ) -> Self {
        Self {
            polling_strategy: polling.strategy.clone(),
            sync_polling_strategy: polling.sync_strategy.clone(),
            poll_result_type,
            final_result_type,
            poll_interval_seconds: polling.poll_interval,
            http_method,
        }
    }

    pub fn details(&self) -> MethodPollingDetails {
        MethodPollingDetails {
            polling_strategy: self.polling_strategy.clone(),
            sync_polling_strategy: self.sync_polling_strategy.clone(),
            intermediate_type: self.poll_result_type.clone(),
            final_type: self.final_result_type.clone(),
            poll_interval_seconds: self.poll_interval_seconds,
        }
    }

    /// Both result types are already `BinaryData` (or a void final result).
    pub fn has_binary_data_result_types(&self) -> bool {
        self.poll_result_type.is_binary_data()
            && (self.final_result_type.is_binary_data() || self.final_result_type.is_void())
    }

    /// Details of the protocol methods, which poll and finish with `BinaryData`.
    pub fn binary_data_details(&self) -> MethodPollingDetails {
        MethodPollingDetails {
            intermediate_type: IType::binary_data(),
            final_type: if self.http_method == HttpMethod::Delete {
                IType::void()
            } else {
                IType::binary_data()
            },
            ..self.details()
        }
    }
}

/// Pollers never produce a null value, so a void result polls as `BinaryData`.
fn non_void(t: IType) -> IType {
    if t.is_void() { IType::binary_data() } else { t }
}

/// A class from a model name, qualified with the base package when it has none.
fn type_from_model_name(settings: &Settings, name: &str) -> IType {
    match name.rsplit_once('.') {
        Some((package, class)) => ClassType::new(package, class),
        None => ClassType::new(settings.package.clone(), name),
    }
    .into_type()
}
