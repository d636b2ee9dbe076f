use std::sync::Arc;

use indexmap::IndexMap;
use log::info;

use crate::codemodel::{SchemaKind, SchemaUsage};
use crate::error::MapError;
use crate::model::{
    Client, ClientException, ClientModel, ClientResponse, EnumType, GraalVmConfig, IType, PackageInfo, ServiceClient,
    UnionModel,
};
use crate::naming;

use super::Mappers;
use super::response_type::client_response;
use super::service_client::map_service_client;
use super::union::union_members;

fn enums(mappers: &Mappers) -> Result<Vec<Arc<EnumType>>, MapError> {
    let mut enums: Vec<Arc<EnumType>> = Vec::new();
    for schema in mappers.code_model().schemas.values() {
        if !matches!(schema.kind, SchemaKind::Choice(_) | SchemaKind::SealedChoice(_)) {
            continue;
        }
        if let IType::Enum(e) = mappers.map_type(schema)? {
            if !enums.iter().any(|existing| existing.name == e.name) {
                enums.push(e);
            }
        }
    }
    Ok(enums)
}

fn exceptions(mappers: &Mappers) -> Result<Vec<Arc<ClientException>>, MapError> {
    let mut seen: Vec<&str> = Vec::new();
    let mut exceptions: Vec<Arc<ClientException>> = Vec::new();
    for id in mappers
        .code_model()
        .operations()
        .flat_map(|o| o.exceptions.iter())
        .filter_map(|r| r.schema.as_deref())
    {
        if seen.contains(&id) {
            continue;
        }
        seen.push(id);
        if let Some(exception) = mappers.map_exception(mappers.schema(id)?)? {
            if !exceptions.contains(&exception) {
                exceptions.push(exception);
            }
        }
    }
    Ok(exceptions)
}

/// Object models in schema order, then the synthesized header models.
fn models(mappers: &Mappers) -> Result<Vec<Arc<ClientModel>>, MapError> {
    let mut models: Vec<Arc<ClientModel>> = Vec::new();
    let mut push = |model: Arc<ClientModel>| {
        if !models.iter().any(|m| m.full_name() == model.full_name()) {
            models.push(model);
        }
    };
    for schema in mappers.code_model().schemas.values() {
        if matches!(schema.kind, SchemaKind::Object(_) | SchemaKind::Group(_)) {
            if let Some(model) = mappers.map_model(schema)? {
                push(model);
            }
        }
    }
    for operation in mappers.code_model().operations() {
        if let Some(model) = mappers.map_response_headers(operation)? {
            push(model);
        }
    }
    Ok(models)
}

fn union_models(mappers: &Mappers) -> Result<Vec<UnionModel>, MapError> {
    if !mappers.settings().polymorphic_unions {
        return Ok(Vec::new());
    }
    let mut unions: Vec<UnionModel> = Vec::new();
    for schema in mappers.code_model().schemas.values() {
        if !matches!(schema.kind, SchemaKind::Or(_)) {
            continue;
        }
        let union_type = mappers.map_type(schema)?;
        let Some(class) = union_type.as_generated_class() else {
            continue;
        };
        if unions.iter().any(|u| u.name == class.name && u.package == class.package) {
            continue;
        }
        unions.push(UnionModel {
            name: class.name.clone(),
            package: class.package.clone(),
            description: schema
                .info
                .description
                .clone()
                .unwrap_or_else(|| format!("The {} model.", class.name)),
            members: union_members(mappers, schema)?,
        });
    }
    Ok(unions)
}

fn response_models(mappers: &Mappers) -> Result<Vec<ClientResponse>, MapError> {
    let mut responses: Vec<ClientResponse> = Vec::new();
    for operation in mappers.code_model().operations() {
        if let Some(response) = client_response(mappers, operation)? {
            if !responses.iter().any(|r| r.name == response.name && r.package == response.package) {
                responses.push(response);
            }
        }
    }
    Ok(responses)
}

/// Package documentation for every package the client populates.
fn package_infos(
    mappers: &Mappers,
    client_name: &str,
    client_description: &str,
    models_packages: &[&str],
) -> Vec<PackageInfo> {
    let settings = mappers.settings();
    let mut infos: IndexMap<String, String> = IndexMap::new();
    let mut add = |package: String, what: &str| {
        infos
            .entry(package)
            .or_insert_with(|| format!("Package containing the {what} for {client_name}.\n{client_description}"));
    };

    let has_implementation_subpackage = !settings.implementation_subpackage.is_empty();
    if settings.generate_client_interfaces
        || !settings.generate_client_as_impl
        || !has_implementation_subpackage
        || settings.is_fluent()
        || settings.is_data_plane()
    {
        add(settings.package.clone(), "classes");
    }
    if settings.is_fluent() {
        if !settings.fluent_subpackage.is_empty() {
            add(settings.package_for(&settings.fluent_subpackage), "service clients");
            add(
                settings.package_for(&format!("{}.{}", settings.fluent_subpackage, settings.models_subpackage)),
                "inner data models",
            );
        }
    } else if settings.generate_client_as_impl && has_implementation_subpackage {
        add(settings.implementation_package(), "implementations");
    }
    for package in models_packages {
        add((*package).to_string(), "data models");
    }
    if !settings.custom_types.is_empty() && !settings.custom_types_subpackage.is_empty() {
        add(settings.custom_types_package(), "data models");
    }

    infos
        .into_iter()
        .map(|(package, description)| PackageInfo { package, description })
        .collect()
}

/// Classes serialized by reflection and the service interfaces proxied at runtime.
fn graal_vm_config(
    service_client: Option<&ServiceClient>,
    exceptions: &[Arc<ClientException>],
    models: &[Arc<ClientModel>],
    enums: &[Arc<EnumType>],
) -> GraalVmConfig {
    let mut reflection_classes: Vec<String> = models.iter().map(|m| m.full_name()).collect();
    reflection_classes.extend(exceptions.iter().map(|e| format!("{}.{}", e.package, e.name)));
    reflection_classes.extend(enums.iter().map(|e| format!("{}.{}", e.package, e.name)));

    let mut proxy_interfaces = Vec::new();
    if let Some(client) = service_client {
        if let Some(proxy) = &client.proxy {
            if client.method_groups.iter().all(|g| g.proxy.name != proxy.name) {
                proxy_interfaces.push(format!("{}.{}${}", client.package, client.class_name, proxy.name));
            }
        }
        for group in &client.method_groups {
            proxy_interfaces.push(format!("{}.{}${}", group.package, group.class_name, group.proxy.name));
        }
    }
    GraalVmConfig {
        reflection_classes,
        proxy_interfaces,
    }
}

/// Resolve the whole code model into the client object graph.
pub fn map_client(mappers: &Mappers) -> Result<Client, MapError> {
    let code_model = mappers.code_model();
    let client_name = naming::to_pascal(&code_model.name);
    let client_description = code_model.description.clone().unwrap_or_default();

    let enums = enums(mappers)?;
    let exceptions = exceptions(mappers)?;
    let models = models(mappers)?;
    let union_models = union_models(mappers)?;
    let response_models = response_models(mappers)?;
    let service_client = if code_model.operations().next().is_some() {
        Some(map_service_client(mappers)?)
    } else {
        None
    };

    let mut models_packages: Vec<&str> = Vec::new();
    let packages = models
        .iter()
        .filter(|m| !m.usages.contains(&SchemaUsage::External))
        .map(|m| m.package.as_str())
        .chain(enums.iter().map(|e| e.package.as_str()))
        .chain(response_models.iter().map(|r| r.package.as_str()));
    for package in packages {
        if !models_packages.contains(&package) {
            models_packages.push(package);
        }
    }
    let package_infos = package_infos(mappers, &client_name, &client_description, &models_packages);
    let graal_vm_config = graal_vm_config(service_client.as_ref(), &exceptions, &models, &enums);

    info!(
        "mapped client '{}': {} models, {} enums, {} exceptions, {} method groups",
        client_name,
        models.len(),
        enums.len(),
        exceptions.len(),
        service_client.as_ref().map_or(0, |c| c.method_groups.len())
    );
    Ok(Client {
        client_name,
        client_description,
        enums,
        exceptions,
        models,
        union_models,
        response_models,
        service_client,
        package_infos,
        graal_vm_config,
    })
}
