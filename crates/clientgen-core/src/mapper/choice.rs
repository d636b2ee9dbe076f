use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::codemodel::{ChoiceSchema, Schema, SchemaKind, SchemaUsage};
use crate::error::MapError;
use crate::model::{EnumType, EnumValue, IType};
use crate::naming;

use super::cache::Memo;
use super::{Mappers, TypeMapper};

/// Maps open (`choice`) and closed (`sealed-choice`) enumerations.
#[derive(Default)]
pub struct ChoiceMapper {
    cache: Memo<String, IType>,
}

impl TypeMapper for ChoiceMapper {
    fn map(&self, mappers: &Mappers, schema: &Schema) -> Result<IType, MapError> {
        let (choice, expandable) = match &schema.kind {
            SchemaKind::Choice(c) => (c, true),
            SchemaKind::SealedChoice(c) => (c, false),
            _ => {
                return Err(MapError::InvalidSchema {
                    id: schema.id.clone(),
                    reason: "not a choice schema".to_string(),
                });
            }
        };
        self.cache.get_or_try_insert_with(schema.id.clone(), || {
            enum_type(mappers, schema, choice, expandable)
        })
    }
}

fn enum_type(
    mappers: &Mappers,
    schema: &Schema,
    choice: &ChoiceSchema,
    expandable: bool,
) -> Result<IType, MapError> {
    let name = naming::to_pascal(schema.name());
    // Anonymous enums fall back to their underlying string values.
    if name.is_empty() || name.eq_ignore_ascii_case("enum") {
        return Ok(IType::string());
    }

    let settings = mappers.settings();
    let package = settings.model_package(&name, schema.has_usage(SchemaUsage::Internal));
    let description = schema
        .info
        .description
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!("Defines values for {name}."));

    let mut seen: HashMap<String, usize> = HashMap::new();
    let values = choice
        .choices
        .iter()
        .map(|c| {
            let value = c.value_string();
            let base = naming::enum_member_name(c.name.as_deref().unwrap_or(&value));
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            let member = if *count == 1 {
                base
            } else {
                format!("{base}_{count}")
            };
            EnumValue {
                name: member,
                value,
                description: c.description.clone(),
            }
        })
        .collect();

    let element_type = mappers.map_type_id(&choice.choice_type)?;
    let t = IType::Enum(Arc::new(EnumType {
        package,
        name,
        description,
        expandable,
        values,
        element_type,
        cross_language_definition_id: schema.info.cross_language_definition_id.clone(),
    }));
    debug!("mapped choice schema '{}' to {}", schema.id, t);
    Ok(t)
}
