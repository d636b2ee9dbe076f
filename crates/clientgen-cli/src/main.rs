use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use log::debug;

use clientgen_core::codemodel::{self, CodeModel};
use clientgen_core::config::{self, SETTINGS_FILE_NAME, Settings};
use clientgen_core::mapper::Mappers;
use clientgen_core::model::{Client, ClientMethod, MethodGroupClient};

#[derive(Parser)]
#[command(name = "clientgen", about = "Client-library code-model mapper", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map a code model and print a summary of the resolved client
    Map {
        /// Path to the code model (YAML or JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Path to the settings file; defaults to clientgen.yaml in the current directory
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: OutputFormat,
    },

    /// Load and link a code model without mapping it
    Validate {
        /// Path to the code model
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Write a default settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Map {
            input,
            settings,
            format,
        } => cmd_map(&input, settings.as_deref(), format),

        Commands::Validate { input } => cmd_validate(&input),

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "clientgen", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn load_code_model(path: &Path) -> Result<CodeModel> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("yaml");

    let model = match ext {
        "json" => codemodel::from_json(&content),
        _ => codemodel::from_yaml(&content),
    }
    .with_context(|| format!("failed to load code model {}", path.display()))?;
    Ok(model)
}

/// Settings from an explicit path, or from the default file when present.
fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => config::load_settings(path)
            .map_err(|e| anyhow::anyhow!(e))?
            .with_context(|| format!("settings file {} does not exist", path.display())),
        None => Ok(config::load_settings(Path::new(SETTINGS_FILE_NAME))
            .map_err(|e| anyhow::anyhow!(e))?
            .unwrap_or_default()),
    }
}

fn cmd_map(input: &Path, settings: Option<&Path>, format: OutputFormat) -> Result<()> {
    let code_model = load_code_model(input)?;
    let settings = load_settings(settings)?;
    debug!("mapping {} with {:?} flavor", code_model.name, settings.flavor);
    let mappers = Mappers::new(Arc::new(code_model), Arc::new(settings));
    let client = mappers
        .map_client()
        .with_context(|| format!("failed to map {}", input.display()))?;

    let summary = build_summary(&client);
    match format {
        OutputFormat::Yaml => {
            let yaml = serde_yaml_ng::to_string(&summary)?;
            print!("{}", yaml);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&summary)?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn method_summary(method: &ClientMethod) -> serde_json::Value {
    serde_json::json!({
        "name": method.name,
        "type": method.method_type.to_string(),
        "visibility": format!("{:?}", method.visibility),
        "returns": method.return_value.return_type.to_string(),
        "parameters": method
            .parameters
            .iter()
            .map(|p| format!("{} {}", p.client_type, p.name))
            .collect::<Vec<_>>(),
    })
}

fn group_summary(group: &MethodGroupClient) -> serde_json::Value {
    serde_json::json!({
        "interface": group.interface_name,
        "class": format!("{}.{}", group.package, group.class_name),
        "proxy": group.proxy.name,
        "methods": group.client_methods.iter().map(method_summary).collect::<Vec<_>>(),
    })
}

fn build_summary(client: &Client) -> serde_json::Value {
    let models: Vec<serde_json::Value> = client
        .models
        .iter()
        .map(|m| {
            serde_json::json!({
                "name": m.full_name(),
                "parent": m.parent_model_name,
                "properties": m
                    .properties
                    .iter()
                    .map(|p| format!("{} {}", p.client_type, p.name))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    let service_client = client.service_client.as_ref().map(|s| {
        serde_json::json!({
            "interface": s.interface_name,
            "class": format!("{}.{}", s.package, s.class_name),
            "properties": s.properties.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            "methods": s.client_methods.iter().map(method_summary).collect::<Vec<_>>(),
            "method_groups": s.method_groups.iter().map(group_summary).collect::<Vec<_>>(),
        })
    });

    serde_json::json!({
        "client": client.client_name,
        "enums": client.enums.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
        "exceptions": client.exceptions.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
        "models": models,
        "responses": client.response_models.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        "service_client": service_client,
    })
}

fn cmd_validate(input: &Path) -> Result<()> {
    let model = load_code_model(input)?;

    eprintln!("Valid code model: {}", model.name);
    eprintln!("  Schemas: {}", model.schemas.len());
    eprintln!("  Operation groups: {}", model.operation_groups.len());
    eprintln!("  Operations: {}", model.operations().count());

    eprintln!("Validation successful.");
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let settings_path = PathBuf::from(SETTINGS_FILE_NAME);

    if settings_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            settings_path.display()
        );
    }

    fs::write(&settings_path, config::default_settings_content())?;
    eprintln!("Created {}", settings_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"
name: pets
schemas:
  string: { type: string }
  pet:
    type: object
    name: Pet
    properties:
      - { name: name, schema: string, required: true }
operation_groups:
  - name: pets
    operations:
      - name: get
        requests:
          - http: { method: get, path: "/pets/{name}", uri: "{endpoint}" }
            parameters:
              - { name: name, schema: string, location: path, required: true }
        responses:
          - { schema: pet, status_codes: ["200"] }
"#;

    #[test]
    fn summary_lists_models_and_groups() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pets.yaml");
        fs::write(&path, MODEL).unwrap();

        let code_model = load_code_model(&path).unwrap();
        let mappers = Mappers::new(Arc::new(code_model), Arc::new(Settings::default()));
        let summary = build_summary(&mappers.map_client().unwrap());

        assert_eq!(summary["client"], "Pets");
        assert_eq!(summary["models"][0]["name"], "com.example.models.Pet");
        let group = &summary["service_client"]["method_groups"][0];
        assert_eq!(group["interface"], "Pets");
        assert_eq!(group["proxy"], "PetsService");
    }

    #[test]
    fn explicit_settings_must_exist() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_settings(Some(&tmp.path().join("missing.yaml"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn settings_file_is_loaded() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "package: com.contoso\nflavor: data_plane\n").unwrap();
        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.package, "com.contoso");
        assert!(settings.is_data_plane());
    }

    #[test]
    fn malformed_code_model_names_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_code_model(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
