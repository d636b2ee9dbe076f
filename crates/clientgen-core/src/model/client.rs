use std::sync::Arc;

use super::client_method::{ClientMethod, ClientMethodParameter};
use super::client_model::{ClientException, ClientModel, ClientResponse, UnionModel};
use super::proxy::ProxyMethod;
use super::types::{EnumType, IType};

/// The service interface whose methods perform wire calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Proxy {
    pub name: String,
    pub client_type_name: String,
    pub base_url: String,
    pub methods: Vec<Arc<ProxyMethod>>,
}

/// Client methods of one operation group.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodGroupClient {
    pub package: String,
    pub interface_name: String,
    pub class_name: String,
    pub variable_name: String,
    /// Type the service client holds the group as: the interface when interfaces are generated.
    pub variable_type: String,
    pub proxy: Proxy,
    pub service_client_name: String,
    pub client_methods: Vec<ClientMethod>,
    pub supported_interfaces: Vec<String>,
    /// Service client properties the implementation class needs directly.
    pub properties: Vec<ServiceClientProperty>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceClientProperty {
    pub name: String,
    pub description: String,
    pub property_type: IType,
    pub read_only: bool,
    pub required: bool,
    pub default_value: Option<String>,
    pub request_parameter_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constructor {
    pub parameters: Vec<ClientMethodParameter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    TokenCredential,
    AzureKeyCredential,
    KeyCredential,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityInfo {
    pub credential_types: Vec<CredentialKind>,
    /// Quoted scope literals.
    pub scopes: Vec<String>,
    pub header_name: Option<String>,
    pub header_value_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceVersion {
    pub class_name: String,
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceClient {
    pub package: String,
    pub interface_name: String,
    pub class_name: String,
    pub description: String,
    pub base_url: String,
    pub proxy: Option<Proxy>,
    pub method_groups: Vec<MethodGroupClient>,
    pub client_methods: Vec<ClientMethod>,
    pub properties: Vec<ServiceClientProperty>,
    pub constructors: Vec<Constructor>,
    pub security_info: SecurityInfo,
    pub default_credential_scopes: Option<String>,
    pub service_version: Option<ServiceVersion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub package: String,
    pub description: String,
}

/// Types and interfaces that need native-image registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraalVmConfig {
    pub reflection_classes: Vec<String>,
    pub proxy_interfaces: Vec<String>,
}

/// The fully resolved client object graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub client_name: String,
    pub client_description: String,
    pub enums: Vec<Arc<EnumType>>,
    pub exceptions: Vec<Arc<ClientException>>,
    pub models: Vec<Arc<ClientModel>>,
    pub union_models: Vec<UnionModel>,
    pub response_models: Vec<ClientResponse>,
    /// Absent when the code model declares no operations.
    pub service_client: Option<ServiceClient>,
    pub package_infos: Vec<PackageInfo>,
    pub graal_vm_config: GraalVmConfig,
}
