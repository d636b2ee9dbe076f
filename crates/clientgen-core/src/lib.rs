pub mod codemodel;
pub mod config;
pub mod error;
pub mod mapper;
pub mod model;
pub mod naming;

use std::sync::Arc;

use codemodel::CodeModel;
use config::Settings;
use error::MapError;
use mapper::Mappers;
use model::Client;

/// Map a linked code model with a fresh registry.
pub fn map_client(code_model: CodeModel, settings: Settings) -> Result<Client, MapError> {
    Mappers::new(Arc::new(code_model), Arc::new(settings)).map_client()
}
