use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

/// Generation settings consumed read-only by every mapper.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub package: String,
    pub models_subpackage: String,
    pub implementation_subpackage: String,
    pub fluent_subpackage: String,
    pub custom_types_subpackage: String,
    pub custom_types: Vec<String>,
    pub flavor: Flavor,
    pub branded: bool,
    pub sync_methods: SyncMethods,
    pub required_parameter_client_methods: bool,
    pub generate_client_as_impl: bool,
    pub generate_client_interfaces: bool,
    pub generic_response_types: bool,
    pub disable_typed_headers_methods: bool,
    pub no_custom_headers: bool,
    pub input_stream_for_binary: bool,
    pub stream_style_serialization: bool,
    pub enable_sync_stack: bool,
    pub enable_page_size: bool,
    pub generate_send_request_method: bool,
    pub required_fields_as_ctor_args: bool,
    pub polymorphic_unions: bool,
    pub http_exception_type_for_default: Option<String>,
    pub http_status_code_to_exception_type: IndexMap<u16, String>,
    /// Polling settings keyed by operation id, or `default` for every long-running operation.
    pub polling: IndexMap<String, PollingSettings>,
    pub credential_types: Vec<CredentialType>,
    pub credential_scopes: Vec<String>,
    pub key_credential_header_name: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            package: "com.example".to_string(),
            models_subpackage: "models".to_string(),
            implementation_subpackage: "implementation".to_string(),
            fluent_subpackage: "fluent".to_string(),
            custom_types_subpackage: String::new(),
            custom_types: Vec::new(),
            flavor: Flavor::Vanilla,
            branded: true,
            sync_methods: SyncMethods::Essential,
            required_parameter_client_methods: false,
            generate_client_as_impl: false,
            generate_client_interfaces: false,
            generic_response_types: false,
            disable_typed_headers_methods: false,
            no_custom_headers: false,
            input_stream_for_binary: false,
            stream_style_serialization: true,
            enable_sync_stack: false,
            enable_page_size: false,
            generate_send_request_method: false,
            required_fields_as_ctor_args: false,
            polymorphic_unions: false,
            http_exception_type_for_default: None,
            http_status_code_to_exception_type: IndexMap::new(),
            polling: IndexMap::new(),
            credential_types: Vec::new(),
            credential_scopes: Vec::new(),
            key_credential_header_name: None,
        }
    }
}

/// The generation mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    #[default]
    Vanilla,
    Fluent,
    /// Protocol-method clients with minimal, change-resilient signatures.
    DataPlane,
}

/// Which synchronous client methods to generate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMethods {
    All,
    #[default]
    Essential,
    SyncOnly,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    TokenCredential,
    AzureKeyCredential,
    KeyCredential,
    None,
}

/// Polling configuration for long-running operations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub strategy: String,
    pub sync_strategy: String,
    pub poll_result_type: Option<String>,
    pub final_result_type: Option<String>,
    pub poll_interval: u32,
}

pub const DEFAULT_POLLING_STRATEGY: &str =
    "new DefaultPollingStrategy<>({httpPipeline}, {endpoint}, null, {context})";
pub const DEFAULT_SYNC_POLLING_STRATEGY: &str =
    "new SyncDefaultPollingStrategy<>({httpPipeline}, {endpoint}, null, {context})";

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            strategy: DEFAULT_POLLING_STRATEGY.to_string(),
            sync_strategy: DEFAULT_SYNC_POLLING_STRATEGY.to_string(),
            poll_result_type: None,
            final_result_type: None,
            poll_interval: 1,
        }
    }
}

impl Settings {
    pub fn is_data_plane(&self) -> bool {
        self.flavor == Flavor::DataPlane
    }

    pub fn is_fluent(&self) -> bool {
        self.flavor == Flavor::Fluent
    }

    pub fn is_vanilla(&self) -> bool {
        self.flavor == Flavor::Vanilla
    }

    pub fn is_branded(&self) -> bool {
        self.branded
    }

    pub fn is_sync_stack_enabled(&self) -> bool {
        self.enable_sync_stack
    }

    pub fn is_generate_sync_methods(&self) -> bool {
        matches!(
            self.sync_methods,
            SyncMethods::All | SyncMethods::Essential | SyncMethods::SyncOnly
        )
    }

    pub fn is_generate_async_methods(&self) -> bool {
        self.sync_methods != SyncMethods::SyncOnly
    }

    pub fn is_custom_type(&self, name: &str) -> bool {
        self.custom_types.iter().any(|t| t == name)
    }

    /// Full package name of a subpackage; an empty subpackage yields the base package.
    pub fn package_for(&self, subpackage: &str) -> String {
        if subpackage.is_empty() {
            self.package.clone()
        } else {
            format!("{}.{}", self.package, subpackage)
        }
    }

    pub fn models_package(&self) -> String {
        self.package_for(&self.models_subpackage)
    }

    pub fn implementation_package(&self) -> String {
        self.package_for(&self.implementation_subpackage)
    }

    pub fn custom_types_package(&self) -> String {
        self.package_for(&self.custom_types_subpackage)
    }

    /// Package of a model class, honoring custom types and internal models of data-plane clients.
    pub fn model_package(&self, name: &str, internal: bool) -> String {
        if self.is_custom_type(name) {
            self.custom_types_package()
        } else if self.is_data_plane() && internal {
            self.package_for(&format!(
                "{}.{}",
                self.implementation_subpackage, self.models_subpackage
            ))
        } else {
            self.models_package()
        }
    }

    /// Polling settings for an operation, falling back to the `default` entry.
    pub fn polling_for(&self, operation_id: &str) -> Option<&PollingSettings> {
        self.polling
            .get(operation_id)
            .or_else(|| self.polling.get("default"))
    }
}

/// Default settings file name.
pub const SETTINGS_FILE_NAME: &str = "clientgen.yaml";

/// Load settings from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_settings(path: &Path) -> Result<Option<Settings>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read settings {}: {}", path.display(), e))?;
    let settings: Settings = serde_yaml_ng::from_str(&content)
        .map_err(|e| format!("failed to parse settings {}: {}", path.display(), e))?;
    Ok(Some(settings))
}

/// Generate the default settings file content.
pub fn default_settings_content() -> &'static str {
    r#"# clientgen settings
package: com.example
models_subpackage: models
implementation_subpackage: implementation
flavor: vanilla          # vanilla | fluent | data_plane
branded: true
sync_methods: essential  # all | essential | sync_only | none

required_parameter_client_methods: false
generic_response_types: false
no_custom_headers: false
input_stream_for_binary: false
enable_sync_stack: false
enable_page_size: false

# http_exception_type_for_default: com.example.models.ServiceErrorException
http_status_code_to_exception_type: {}
  # 404: com.azure.core.exception.ResourceNotFoundException

polling: {}
  # default:
  #   poll_interval: 1
"#
}
