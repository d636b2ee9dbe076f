use std::sync::Arc;

use log::debug;

use crate::codemodel::OperationGroup;
use crate::error::MapError;
use crate::model::{ClientMethod, MethodGroupClient, Proxy};
use crate::naming;

use super::Mappers;
use super::cache::Memo;
use super::service_client;
use super::util::is_plain_object_schema;

/// Maps named operation groups to the method group clients hanging off the service client.
#[derive(Default)]
pub struct MethodGroupMapper {
    cache: Memo<usize, Arc<MethodGroupClient>>,
}

impl MethodGroupMapper {
    pub fn map(&self, mappers: &Mappers, group_index: usize) -> Result<Arc<MethodGroupClient>, MapError> {
        self.cache.get_or_try_insert_with(group_index, || {
            let group = mappers
                .code_model()
                .operation_groups
                .get(group_index)
                .ok_or_else(|| MapError::MissingOperation(format!("group {group_index}")))?;
            map_group(mappers, group_index, group).map(Arc::new)
        })
    }
}

/// Interface names of every named group, in declaration order.
///
/// A plural group name that is already taken by a model or an earlier group gets an
/// `Operations` suffix.
pub fn interface_names(mappers: &Mappers) -> Vec<Option<String>> {
    let model_names: Vec<String> = mappers
        .code_model()
        .schemas
        .values()
        .filter(|s| s.as_object().is_some() && !is_plain_object_schema(s))
        .map(|s| naming::to_pascal(s.name()))
        .collect();

    let mut taken: Vec<String> = Vec::new();
    mappers
        .code_model()
        .operation_groups
        .iter()
        .map(|group| {
            if group.name.is_empty() {
                return None;
            }
            let mut name = naming::plural(&naming::to_pascal(&group.name));
            if model_names.contains(&name) || taken.contains(&name) {
                name.push_str("Operations");
            }
            taken.push(name.clone());
            Some(name)
        })
        .collect()
}

fn map_group(mappers: &Mappers, group_index: usize, group: &OperationGroup) -> Result<MethodGroupClient, MapError> {
    let settings = mappers.settings();
    let mut interface_name = interface_names(mappers)
        .into_iter()
        .nth(group_index)
        .flatten()
        .ok_or_else(|| MapError::MissingOperation(format!("unnamed group {group_index}")))?;

    let class_name = if settings.is_fluent() {
        if settings.generate_client_as_impl {
            format!("{interface_name}ClientImpl")
        } else {
            format!("{interface_name}Client")
        }
    } else if settings.generate_client_as_impl {
        format!("{interface_name}Impl")
    } else {
        interface_name.clone()
    };

    let proxy = Proxy {
        name: format!("{}Service", naming::to_pascal(&naming::plural(&group.name))),
        client_type_name: format!("{}{}", naming::to_pascal(&mappers.code_model().name), interface_name),
        base_url: group
            .operations
            .first()
            .and_then(|o| o.requests.first())
            .map(|r| r.http.uri.clone())
            .unwrap_or_default(),
        methods: {
            let mut methods = Vec::new();
            for operation in &group.operations {
                let proxies = mappers.map_proxy_methods(operation)?;
                methods.extend(proxies.values().flatten().cloned());
            }
            methods
        },
    };

    let variable_name = naming::to_camel(&interface_name);
    if settings.is_fluent() && settings.generate_client_interfaces {
        interface_name.push_str("Client");
    }
    let variable_type = if settings.generate_client_interfaces {
        interface_name.clone()
    } else {
        class_name.clone()
    };
    let supported_interfaces = if settings.generate_client_interfaces {
        vec![interface_name.clone()]
    } else {
        Vec::new()
    };

    let package = if settings.is_fluent() {
        if settings.generate_client_as_impl {
            settings.implementation_package()
        } else {
            settings.package_for(&settings.fluent_subpackage)
        }
    } else if settings.is_custom_type(&class_name) {
        settings.custom_types_package()
    } else if settings.generate_client_as_impl {
        settings.implementation_package()
    } else {
        settings.package.clone()
    };

    let client_methods = group_client_methods(mappers, group)?;
    let properties = if settings.generate_client_as_impl {
        service_client::service_version_property(mappers).into_iter().collect()
    } else {
        Vec::new()
    };

    debug!(
        "mapped method group '{}' to {} with {} client methods",
        group.name,
        class_name,
        client_methods.len()
    );
    Ok(MethodGroupClient {
        package,
        interface_name,
        class_name,
        variable_name,
        variable_type,
        proxy,
        service_client_name: service_client::implementation_class_name(mappers),
        client_methods,
        supported_interfaces,
        properties,
    })
}

/// Client methods of every operation in a group.
///
/// Data-plane clients carry protocol methods first, then the convenience methods of
/// operations that declare a convenience API.
pub fn group_client_methods(mappers: &Mappers, group: &OperationGroup) -> Result<Vec<ClientMethod>, MapError> {
    let mut methods = Vec::new();
    for operation in &group.operations {
        methods.extend(mappers.map_client_methods(operation)?.iter().cloned());
    }
    if mappers.settings().is_data_plane() {
        for operation in group.operations.iter().filter(|o| o.convenience_api.is_some()) {
            methods.extend(mappers.map_client_methods_with(operation, false)?.iter().cloned());
        }
    }
    Ok(methods)
}
