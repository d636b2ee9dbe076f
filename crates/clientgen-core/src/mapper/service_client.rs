use log::{debug, warn};

use crate::codemodel::{Parameter, ParameterLocation, SchemaKind, SecurityScheme};
use crate::config::CredentialType;
use crate::error::MapError;
use crate::model::{
    ClassType, ClientMethodParameter, Constructor, CredentialKind, IType, Proxy, SecurityInfo, ServiceClient,
    ServiceClientProperty, ServiceVersion,
};
use crate::naming;

use super::Mappers;
use super::method_group::group_client_methods;
use super::proxy_parameter::remove_model_from_parameter;
use super::util::merge_summary_description;

const USER_IMPERSONATION_SCOPE: &str = "user_impersonation";
const DEFAULT_API_VERSION_NAME: &str = "api-version";

/// Interface name of the service client. Data-plane clients always end in `Client`.
pub fn interface_name(mappers: &Mappers) -> String {
    let mut name = naming::to_pascal(&mappers.code_model().name);
    if name.is_empty() {
        name = "ServiceClient".to_string();
    }
    if mappers.settings().is_data_plane() && !name.ends_with("Client") {
        name.push_str("Client");
    }
    name
}

pub fn implementation_class_name(mappers: &Mappers) -> String {
    let interface_name = interface_name(mappers);
    if mappers.settings().generate_client_as_impl {
        format!("{interface_name}Impl")
    } else {
        interface_name
    }
}

/// `FooClient` versions as `FooServiceVersion`; `FooService` as `FooServiceVersion` too.
pub fn service_version_class_name(interface_name: &str) -> String {
    let service_name = interface_name.strip_suffix("Client").unwrap_or(interface_name);
    if service_name.ends_with("Service") {
        format!("{service_name}Version")
    } else {
        format!("{service_name}ServiceVersion")
    }
}

fn package(mappers: &Mappers, class_name: &str) -> String {
    let settings = mappers.settings();
    if settings.is_custom_type(class_name) {
        return settings.custom_types_package();
    }
    if settings.is_fluent() {
        return if settings.generate_client_interfaces {
            settings.implementation_package()
        } else {
            settings.package_for(&settings.fluent_subpackage)
        };
    }
    if settings.generate_client_as_impl {
        settings.implementation_package()
    } else {
        settings.package.clone()
    }
}

/// Distinct client-implemented parameters, global ones first.
fn client_parameters(mappers: &Mappers) -> Vec<&Parameter> {
    let code_model = mappers.code_model();
    let mut parameters: Vec<&Parameter> = Vec::new();
    let all = code_model.global_parameters.iter().chain(
        code_model
            .operations()
            .flat_map(|o| o.requests.iter())
            .flat_map(|r| r.parameters.iter()),
    );
    for parameter in all.filter(|p| p.is_client()) {
        if !parameters.contains(&parameter) {
            parameters.push(parameter);
        }
    }
    parameters
}

/// The `serviceVersion` property replacing api-version parameters of data-plane clients.
pub fn service_version_property(mappers: &Mappers) -> Option<ServiceClientProperty> {
    let settings = mappers.settings();
    if !settings.is_data_plane() {
        return None;
    }
    let class_name = service_version_class_name(&interface_name(mappers));
    let request_parameter_name = client_parameters(mappers)
        .into_iter()
        .find(|p| p.is_api_version())
        .map_or(DEFAULT_API_VERSION_NAME, |p| p.serialized_name())
        .to_string();
    Some(ServiceClientProperty {
        name: "serviceVersion".to_string(),
        description: "Service version".to_string(),
        property_type: ClassType::new(settings.package.clone(), class_name.clone()).into_type(),
        read_only: false,
        required: false,
        default_value: Some(format!("{class_name}.getLatest()")),
        request_parameter_name: Some(request_parameter_name),
    })
}

fn client_properties(mappers: &Mappers) -> Result<Vec<ServiceClientProperty>, MapError> {
    let settings = mappers.settings();
    let mut properties: Vec<ServiceClientProperty> = Vec::new();
    for parameter in client_parameters(mappers) {
        if settings.is_data_plane() && parameter.is_api_version() {
            continue;
        }
        let name = naming::property_name(&parameter.name);
        let description = merge_summary_description(parameter.summary.as_deref(), parameter.description.as_deref())
            .unwrap_or_else(|| format!("The {name} parameter."));

        let schema = mappers.schema(&parameter.schema)?;
        let mut property_type = mappers.map_type(schema)?;
        if settings.is_data_plane() {
            property_type = remove_model_from_parameter(ParameterLocation::Uri, &property_type);
        }
        if parameter.nullable {
            property_type = property_type.as_nullable();
        }
        if property_type == IType::token_credential() {
            continue;
        }

        let constant_value = match &schema.kind {
            SchemaKind::Constant(constant) => Some(constant.value_string()),
            _ => None,
        };
        let default_value = parameter
            .client_default_value
            .clone()
            .or_else(|| constant_value.clone())
            .map(|v| property_type.default_value_expression(&v));

        let property = ServiceClientProperty {
            name,
            description,
            read_only: settings.is_fluent() && constant_value.is_some(),
            required: parameter.required,
            default_value,
            request_parameter_name: Some(parameter.serialized_name().to_string()),
            property_type,
        };
        if !properties.contains(&property) {
            properties.push(property);
        }
    }

    properties.extend(service_version_property(mappers));
    properties.push(runtime_property(
        "httpPipeline",
        "The HTTP pipeline to send requests through.",
        IType::http_pipeline(),
    ));
    if settings.is_branded() {
        properties.push(runtime_property(
            "serializerAdapter",
            "The serializer to serialize an object into a string.",
            IType::serializer_adapter(),
        ));
    }
    if settings.is_fluent() {
        properties.push(runtime_property(
            "defaultPollInterval",
            "The default poll interval for long-running operation.",
            IType::duration(),
        ));
    }
    Ok(properties)
}

fn runtime_property(name: &str, description: &str, property_type: IType) -> ServiceClientProperty {
    ServiceClientProperty {
        name: name.to_string(),
        description: description.to_string(),
        property_type,
        read_only: true,
        required: false,
        default_value: None,
        request_parameter_name: None,
    }
}

fn quote_scope(scope: &str) -> String {
    if scope.starts_with('"') {
        scope.to_string()
    } else {
        format!("\"{scope}\"")
    }
}

/// Credentials from the code model, replaced wholesale by configured credential types.
fn security_info(mappers: &Mappers) -> SecurityInfo {
    let settings = mappers.settings();
    let key_kind = if settings.is_branded() {
        CredentialKind::AzureKeyCredential
    } else {
        CredentialKind::KeyCredential
    };

    let mut info = SecurityInfo::default();
    let security = &mappers.code_model().security;
    if security.authentication_required {
        for scheme in &security.schemes {
            match scheme {
                SecurityScheme::Oauth2 { scopes }
                    if scopes.len() == 1 && scopes[0] == USER_IMPERSONATION_SCOPE => {}
                SecurityScheme::Oauth2 { scopes } => {
                    push_unique(&mut info.credential_types, CredentialKind::TokenCredential);
                    info.scopes.clear();
                    for scope in scopes.iter().filter(|s| *s != USER_IMPERSONATION_SCOPE) {
                        let quoted = quote_scope(scope);
                        if !info.scopes.contains(&quoted) {
                            info.scopes.push(quoted);
                        }
                    }
                }
                SecurityScheme::Key { name, prefix } => {
                    push_unique(&mut info.credential_types, key_kind);
                    info.header_name = Some(name.clone());
                    info.header_value_prefix = prefix.clone();
                }
            }
        }
    }

    let configured = &settings.credential_types;
    if !configured.is_empty() && !configured.contains(&CredentialType::None) {
        info = SecurityInfo::default();
        if configured.contains(&CredentialType::TokenCredential) {
            info.credential_types.push(CredentialKind::TokenCredential);
            info.scopes = settings.credential_scopes.iter().map(|s| quote_scope(s)).collect();
        }
        if configured.contains(&CredentialType::AzureKeyCredential) {
            info.credential_types.push(CredentialKind::AzureKeyCredential);
            info.header_name = settings.key_credential_header_name.clone();
        }
        if configured.contains(&CredentialType::KeyCredential) {
            info.credential_types.push(CredentialKind::KeyCredential);
            info.header_name = settings.key_credential_header_name.clone();
        }
    }
    info
}

fn push_unique(kinds: &mut Vec<CredentialKind>, kind: CredentialKind) {
    if !kinds.contains(&kind) {
        kinds.push(kind);
    }
}

/// Scheme and authority of a URL template, without any path.
fn url_host(base_url: &str) -> &str {
    let trimmed = base_url.trim_end_matches('/');
    let authority_start = trimmed.find("://").map_or(0, |i| i + 3);
    match trimmed[authority_start..].find('/') {
        Some(i) => &trimmed[..authority_start + i],
        None => trimmed,
    }
}

/// Scope expression for token credentials when the service declares no scopes:
/// the host of the base URL with `/.default`, host parameters formatted in.
fn default_credential_scopes(mappers: &Mappers, base_url: &str) -> String {
    let parameters = client_parameters(mappers);
    let mut host = url_host(base_url).to_string();
    let mut arguments: Vec<String> = Vec::new();

    let mut search_from = 0;
    while let Some(start) = host[search_from..].find('{').map(|i| i + search_from) {
        let Some(end) = host[start..].find('}').map(|i| i + start) else {
            break;
        };
        let serialized_name = &host[start + 1..end];
        match parameters.iter().find(|p| p.serialized_name() == serialized_name) {
            Some(parameter) => {
                arguments.push(naming::parameter_name(&parameter.name));
                host.replace_range(start..=end, "%s");
                search_from = start + 2;
            }
            None => search_from = end + 1,
        }
    }

    if arguments.is_empty() {
        format!("\"{host}/.default\"")
    } else {
        format!("String.format(\"{host}/.default\", {})", arguments.join(", "))
    }
}

fn constructors(mappers: &Mappers) -> Vec<Constructor> {
    let settings = mappers.settings();
    let http_pipeline = ClientMethodParameter::constructor(
        "httpPipeline",
        "The HTTP pipeline to send requests through",
        IType::http_pipeline(),
        None,
    );
    if !settings.is_branded() {
        return vec![Constructor {
            parameters: vec![http_pipeline],
        }];
    }
    let serializer_adapter = ClientMethodParameter::constructor(
        "serializerAdapter",
        "The serializer to serialize an object into a string",
        IType::serializer_adapter(),
        None,
    );
    if settings.is_fluent() {
        let default_poll_interval = ClientMethodParameter::constructor(
            "defaultPollInterval",
            "The default poll interval for long-running operation",
            IType::duration(),
            Some("Duration.ofSeconds(30)"),
        );
        let environment = ClientMethodParameter::constructor(
            "environment",
            "The Azure environment",
            IType::azure_environment(),
            Some("AzureEnvironment.AZURE"),
        );
        return vec![Constructor {
            parameters: vec![http_pipeline, serializer_adapter, default_poll_interval, environment],
        }];
    }
    vec![
        Constructor { parameters: Vec::new() },
        Constructor {
            parameters: vec![http_pipeline.clone()],
        },
        Constructor {
            parameters: vec![http_pipeline, serializer_adapter],
        },
    ]
}

/// Resolve the service client: its own operations, its method groups, properties,
/// credentials and constructors.
pub fn map_service_client(mappers: &Mappers) -> Result<ServiceClient, MapError> {
    let settings = mappers.settings();
    let code_model = mappers.code_model();
    if settings.generate_send_request_method {
        warn!("generate_send_request_method is ignored: send-request methods are not mapped");
    }

    let interface_name = interface_name(mappers);
    let class_name = implementation_class_name(mappers);

    let ungrouped: Vec<_> = code_model
        .operation_groups
        .iter()
        .filter(|g| g.name.is_empty())
        .collect();
    let mut proxy = None;
    let mut client_methods = Vec::new();
    if let Some(first) = ungrouped.iter().flat_map(|g| g.operations.iter()).next() {
        let mut methods = Vec::new();
        for operation in ungrouped.iter().flat_map(|g| g.operations.iter()) {
            methods.extend(mappers.map_proxy_methods(operation)?.values().flatten().cloned());
        }
        proxy = Some(Proxy {
            name: format!("{interface_name}Service"),
            client_type_name: interface_name.clone(),
            base_url: first.requests.first().map(|r| r.http.uri.clone()).unwrap_or_default(),
            methods,
        });
        for group in &ungrouped {
            client_methods.extend(group_client_methods(mappers, group)?);
        }
    }

    let mut method_groups = Vec::new();
    for (index, group) in code_model.operation_groups.iter().enumerate() {
        if !group.name.is_empty() {
            method_groups.push(mappers.map_method_group(index)?.as_ref().clone());
        }
    }
    if proxy.is_none() {
        proxy = method_groups.first().map(|g| g.proxy.clone());
    }

    let base_url = code_model
        .operation_groups
        .first()
        .and_then(|g| g.operations.first())
        .and_then(|o| o.requests.first())
        .map(|r| r.http.uri.clone())
        .unwrap_or_default();

    let security_info = security_info(mappers);
    let default_credential_scopes = if security_info
        .credential_types
        .contains(&CredentialKind::TokenCredential)
    {
        if security_info.scopes.is_empty() {
            let proxy_base_url = proxy.as_ref().map_or(base_url.as_str(), |p| p.base_url.as_str());
            Some(default_credential_scopes(mappers, proxy_base_url))
        } else {
            Some("DEFAULT_SCOPES".to_string())
        }
    } else {
        None
    };

    let service_version = settings.is_data_plane().then(|| ServiceVersion {
        class_name: service_version_class_name(&interface_name),
        versions: code_model.api_versions.clone(),
    });

    debug!(
        "mapped service client '{}' with {} method groups",
        class_name,
        method_groups.len()
    );
    Ok(ServiceClient {
        package: package(mappers, &class_name),
        description: code_model
            .description
            .clone()
            .unwrap_or_else(|| format!("Initializes a new instance of the {class_name} type.")),
        interface_name,
        class_name,
        base_url,
        proxy,
        method_groups,
        client_methods,
        properties: client_properties(mappers)?,
        constructors: constructors(mappers),
        security_info,
        default_credential_scopes,
        service_version,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::codemodel;
    use crate::config::{Flavor, Settings};

    const MODEL: &str = r#"
name: contoso
description: The Contoso service.
api_versions: ["2024-01-01", "2024-06-01"]
schemas:
  string: { type: string }
  uri: { type: uri }
  version: { type: constant, value_type: string, value: "2024-06-01" }
global_parameters:
  - { name: endpoint, schema: uri, location: uri, implementation: client, required: true, description: Service host. }
  - name: apiVersion
    serialized_name: api-version
    schema: version
    location: query
    implementation: client
    required: true
    origin: "modelerfour:synthesized/api-version"
security:
  authentication_required: true
  schemes:
    - { type: oauth2, scopes: [user_impersonation] }
    - { type: key, name: x-api-key, prefix: Bearer }
operation_groups:
  - name: ""
    operations:
      - name: ping
        requests:
          - http: { method: get, path: /ping, uri: "https://{endpoint}/api" }
        responses:
          - { status_codes: ["204"] }
  - name: widgets
    operations:
      - name: get
        requests:
          - http: { method: get, path: "/widgets/{id}", uri: "https://{endpoint}/api" }
            parameters:
              - { name: id, schema: string, location: path, required: true }
        responses:
          - { schema: string, status_codes: ["200"] }
"#;

    fn mappers(settings: Settings) -> Mappers {
        let model = codemodel::from_yaml(MODEL).expect("should load");
        Mappers::new(Arc::new(model), Arc::new(settings))
    }

    #[test]
    fn names_per_flavor() {
        assert_eq!(service_version_class_name("ContosoClient"), "ContosoServiceVersion");
        assert_eq!(service_version_class_name("ContosoService"), "ContosoServiceVersion");
        assert_eq!(service_version_class_name("Contoso"), "ContosoServiceVersion");

        let data_plane = mappers(Settings {
            flavor: Flavor::DataPlane,
            generate_client_as_impl: true,
            ..Settings::default()
        });
        assert_eq!(interface_name(&data_plane), "ContosoClient");
        assert_eq!(implementation_class_name(&data_plane), "ContosoClientImpl");
        assert_eq!(interface_name(&mappers(Settings::default())), "Contoso");
    }

    #[test]
    fn vanilla_client_carries_operations_and_groups() {
        let mappers = mappers(Settings::default());
        let client = map_service_client(&mappers).unwrap();
        assert_eq!(client.package, "com.example");
        assert_eq!(client.description, "The Contoso service.");
        assert_eq!(client.base_url, "https://{endpoint}/api");

        let proxy = client.proxy.as_ref().expect("should have a proxy");
        assert_eq!(proxy.name, "ContosoService");
        assert_eq!(proxy.client_type_name, "Contoso");
        assert!(client.client_methods.iter().any(|m| m.name == "ping"));
        assert_eq!(client.method_groups.len(), 1);
        assert_eq!(client.method_groups[0].interface_name, "Widgets");

        let properties: Vec<&str> = client.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(properties, vec!["endpoint", "apiVersion", "httpPipeline", "serializerAdapter"]);
        assert_eq!(client.properties[0].description, "Service host.");
        assert_eq!(client.properties[1].default_value.as_deref(), Some("\"2024-06-01\""));
        assert!(!client.properties[1].read_only);
        assert_eq!(client.constructors.len(), 3);
        assert!(client.service_version.is_none());
    }

    #[test]
    fn data_plane_replaces_api_version_with_service_version() {
        let mappers = mappers(Settings {
            flavor: Flavor::DataPlane,
            ..Settings::default()
        });
        let client = map_service_client(&mappers).unwrap();
        let properties: Vec<&str> = client.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            properties,
            vec!["endpoint", "serviceVersion", "httpPipeline", "serializerAdapter"]
        );
        let service_version = &client.properties[1];
        assert_eq!(service_version.property_type.to_string(), "ContosoServiceVersion");
        assert_eq!(service_version.default_value.as_deref(), Some("ContosoServiceVersion.getLatest()"));
        assert_eq!(service_version.request_parameter_name.as_deref(), Some("api-version"));

        let version = client.service_version.expect("should have a service version");
        assert_eq!(version.class_name, "ContosoServiceVersion");
        assert_eq!(version.versions, vec!["2024-01-01".to_string(), "2024-06-01".to_string()]);
    }

    #[test]
    fn user_impersonation_scheme_is_ignored() {
        let mappers = mappers(Settings::default());
        let client = map_service_client(&mappers).unwrap();
        let security = &client.security_info;
        assert_eq!(security.credential_types, vec![CredentialKind::AzureKeyCredential]);
        assert_eq!(security.header_name.as_deref(), Some("x-api-key"));
        assert_eq!(security.header_value_prefix.as_deref(), Some("Bearer"));
        assert!(client.default_credential_scopes.is_none());
    }

    #[test]
    fn token_credentials_default_to_the_host_scope() {
        let mappers = mappers(Settings {
            credential_types: vec![CredentialType::TokenCredential],
            ..Settings::default()
        });
        let client = map_service_client(&mappers).unwrap();
        assert_eq!(client.security_info.credential_types, vec![CredentialKind::TokenCredential]);
        assert_eq!(
            client.default_credential_scopes.as_deref(),
            Some("String.format(\"https://%s/.default\", endpoint)")
        );

        let scoped = map_service_client(&mappers_with_scopes()).unwrap();
        assert_eq!(scoped.security_info.scopes, vec!["\"https://contoso.com/.default\"".to_string()]);
        assert_eq!(scoped.default_credential_scopes.as_deref(), Some("DEFAULT_SCOPES"));
    }

    fn mappers_with_scopes() -> Mappers {
        mappers(Settings {
            credential_types: vec![CredentialType::TokenCredential],
            credential_scopes: vec!["https://contoso.com/.default".to_string()],
            ..Settings::default()
        })
    }

    #[test]
    fn hosts_drop_paths() {
        assert_eq!(url_host("https://{endpoint}/api/v1/"), "https://{endpoint}");
        assert_eq!(url_host("{endpoint}/openai"), "{endpoint}");
        assert_eq!(url_host("https://contoso.com"), "https://contoso.com");
    }

    #[test]
    fn fluent_clients_poll_and_name_their_environment() {
        let mappers = mappers(Settings {
            flavor: Flavor::Fluent,
            ..Settings::default()
        });
        let client = map_service_client(&mappers).unwrap();
        assert_eq!(client.package, "com.example.fluent");
        let last = client.properties.last().expect("should have properties");
        assert_eq!(last.name, "defaultPollInterval");
        assert!(client.properties[1].read_only);

        let constructor: Vec<&str> = client.constructors[0]
            .parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(
            constructor,
            vec!["httpPipeline", "serializerAdapter", "defaultPollInterval", "environment"]
        );
    }

    #[test]
    fn unbranded_clients_take_a_pipeline() {
        let mappers = mappers(Settings {
            branded: false,
            ..Settings::default()
        });
        let client = map_service_client(&mappers).unwrap();
        assert_eq!(client.constructors.len(), 1);
        assert_eq!(client.constructors[0].parameters[0].name, "httpPipeline");
        assert_eq!(client.security_info.credential_types, vec![CredentialKind::KeyCredential]);
        assert!(!client.properties.iter().any(|p| p.name == "serializerAdapter"));
    }
}
