use crate::codemodel::{Schema, SchemaKind};
use crate::error::MapError;
use crate::model::IType;

use super::cache::Memo;
use super::{Mappers, TypeMapper};

/// A constant has the type of its value.
#[derive(Default)]
pub struct ConstantMapper {
    cache: Memo<String, IType>,
}

impl TypeMapper for ConstantMapper {
    fn map(&self, mappers: &Mappers, schema: &Schema) -> Result<IType, MapError> {
        let SchemaKind::Constant(constant) = &schema.kind else {
            return Err(MapError::InvalidSchema {
                id: schema.id.clone(),
                reason: "not a constant schema".to_string(),
            });
        };
        self.cache.get_or_try_insert_with(schema.id.clone(), || {
            mappers.map_type_id(&constant.value_type)
        })
    }
}
