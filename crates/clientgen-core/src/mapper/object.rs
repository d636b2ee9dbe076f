use log::debug;

use crate::codemodel::{Schema, SchemaUsage};
use crate::error::MapError;
use crate::model::{ClassType, IType};
use crate::naming;

use super::cache::Memo;
use super::util::is_plain_object;
use super::{Mappers, TypeMapper};

/// Maps object and parameter-group schemas to their model class.
///
/// Objects with nothing to generate degrade to `Object`.
#[derive(Default)]
pub struct ObjectMapper {
    cache: Memo<String, IType>,
}

impl TypeMapper for ObjectMapper {
    fn map(&self, mappers: &Mappers, schema: &Schema) -> Result<IType, MapError> {
        let Some(object) = schema.as_object() else {
            return Err(MapError::InvalidSchema {
                id: schema.id.clone(),
                reason: "not an object schema".to_string(),
            });
        };
        self.cache.get_or_try_insert_with(schema.id.clone(), || {
            if is_plain_object(object) || schema.name().is_empty() {
                return Ok(IType::object());
            }
            let name = naming::to_pascal(schema.name());
            let package = mappers
                .settings()
                .model_package(&name, schema.has_usage(SchemaUsage::Internal));
            let t = ClassType::generated(package, name).into_type();
            debug!("mapped object schema '{}' to {}", schema.id, t);
            Ok(t)
        })
    }
}
