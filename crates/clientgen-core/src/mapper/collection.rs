use crate::codemodel::{Schema, SchemaKind};
use crate::error::MapError;
use crate::model::{GenericType, IType};

use super::cache::Memo;
use super::{Mappers, TypeMapper};

/// Maps arrays to `List<E>` and dictionaries to `Map<String, E>`.
#[derive(Default)]
pub struct CollectionMapper {
    cache: Memo<String, IType>,
}

impl TypeMapper for CollectionMapper {
    fn map(&self, mappers: &Mappers, schema: &Schema) -> Result<IType, MapError> {
        self.cache.get_or_try_insert_with(schema.id.clone(), || {
            match &schema.kind {
                SchemaKind::Array(a) => Ok(GenericType::list(mappers.map_type_id(&a.element_type)?)),
                SchemaKind::Dictionary(d) => {
                    Ok(GenericType::map(mappers.map_type_id(&d.element_type)?))
                }
                _ => Err(MapError::InvalidSchema {
                    id: schema.id.clone(),
                    reason: "not a collection schema".to_string(),
                }),
            }
        })
    }
}
