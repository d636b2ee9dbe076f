use log::debug;

use crate::codemodel::{Schema, SchemaKind, SchemaUsage};
use crate::error::MapError;
use crate::model::{ClassType, IType};
use crate::naming;

use super::cache::Memo;
use super::{Mappers, TypeMapper};

/// Maps `or` schemas.
///
/// Unions collapse to `BinaryData`. With `polymorphic_unions` enabled a named union class is
/// produced instead, and the client mapper materializes its members as a `UnionModel`.
#[derive(Default)]
pub struct UnionMapper {
    cache: Memo<String, IType>,
}

impl TypeMapper for UnionMapper {
    fn map(&self, mappers: &Mappers, schema: &Schema) -> Result<IType, MapError> {
        if !matches!(schema.kind, SchemaKind::Or(_)) {
            return Err(MapError::InvalidSchema {
                id: schema.id.clone(),
                reason: "not a union schema".to_string(),
            });
        }
        self.cache.get_or_try_insert_with(schema.id.clone(), || {
            let settings = mappers.settings();
            if !settings.polymorphic_unions || schema.name().is_empty() {
                return Ok(IType::binary_data());
            }
            let name = naming::to_pascal(schema.name());
            let package = settings.model_package(&name, schema.has_usage(SchemaUsage::Internal));
            let t = ClassType::generated(package, name).into_type();
            debug!("mapped union schema '{}' to {}", schema.id, t);
            Ok(t)
        })
    }
}

/// Member types of a union schema, in declaration order.
pub fn union_members(mappers: &Mappers, schema: &Schema) -> Result<Vec<IType>, MapError> {
    match &schema.kind {
        SchemaKind::Or(or) => or.any_of.iter().map(|id| mappers.map_type_id(id)).collect(),
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::codemodel;
    use crate::config::Settings;

    const MODEL: &str = r#"
schemas:
  string: { type: string }
  int: { type: integer }
  either: { type: or, name: StringOrInt, any_of: [string, int] }
"#;

    #[test]
    fn unions_collapse_by_default() {
        let model = codemodel::from_yaml(MODEL).expect("should load");
        let mappers = Mappers::new(Arc::new(model), Arc::new(Settings::default()));
        assert!(mappers.map_type_id("either").unwrap().is_binary_data());
    }

    #[test]
    fn polymorphic_unions_are_named() {
        let model = codemodel::from_yaml(MODEL).expect("should load");
        let settings = Settings {
            polymorphic_unions: true,
            ..Settings::default()
        };
        let mappers = Mappers::new(Arc::new(model), Arc::new(settings));
        let t = mappers.map_type_id("either").unwrap();
        assert_eq!(t.to_string(), "StringOrInt");
        let schema = mappers.schema("either").unwrap();
        let members = union_members(&mappers, schema).unwrap();
        assert_eq!(members.len(), 2);
        assert!(members[0].is_string());
    }

    #[test]
    fn injected_strategy_replaces_union_mapping() {
        struct AlwaysObject;
        impl TypeMapper for AlwaysObject {
            fn map(&self, _mappers: &Mappers, _schema: &Schema) -> Result<IType, MapError> {
                Ok(IType::object())
            }
        }
        let model = codemodel::from_yaml(MODEL).expect("should load");
        let mappers = Mappers::builder(Arc::new(model), Arc::new(Settings::default()))
            .union_mapper(Box::new(AlwaysObject))
            .build();
        assert_eq!(mappers.map_type_id("either").unwrap(), IType::object());
    }
}
