use crate::codemodel::{Property, SchemaKind};
use crate::error::MapError;
use crate::model::{ClientModelProperty, XmlPropertyInfo};
use crate::naming;

use super::Mappers;
use super::util::{is_plain_object_schema, merge_summary_description};

pub const ADDITIONAL_PROPERTIES: &str = "additionalProperties";

/// Map one object-schema property.
///
/// With `mutable_as_optional` (JSON merge-patch models), writable properties become optional
/// and remember their original requiredness in `required_for_create`.
pub fn map_property(
    mappers: &Mappers,
    property: &Property,
    mutable_as_optional: bool,
) -> Result<ClientModelProperty, MapError> {
    let schema = mappers.schema(&property.schema)?;

    let mut name = naming::property_name(&property.name);
    let mut required = property.required;
    let required_for_create = property.required;
    if mutable_as_optional && !property.read_only && !property.is_discriminator {
        required = false;
    }

    let description = merge_summary_description(
        property.summary.as_deref(),
        property.description.as_deref(),
    )
    .unwrap_or_else(|| format!("The {} property.", property.serialized_name()));

    let client_flatten =
        property.client_flatten && schema.as_object().is_some() && !is_plain_object_schema(schema);
    if client_flatten {
        name = format!("inner{}", naming::to_pascal(&name));
    }

    let serialized_name = if property.flattened_names.is_empty() {
        property.serialized_name().to_string()
    } else {
        property
            .flattened_names
            .iter()
            .map(|n| n.replace('.', "\\\\."))
            .collect::<Vec<_>>()
            .join(".")
    };
    let additional_properties = serialized_name.is_empty() && property.name == ADDITIONAL_PROPERTIES;

    let mut wire_type = mappers.map_type(schema)?;
    if property.nullable || !property.required {
        wire_type = wire_type.as_nullable();
    }
    let client_type = wire_type.client_type();

    let mut is_constant = false;
    let mut default_value = None;
    if let SchemaKind::Constant(constant) = &schema.kind {
        is_constant = true;
        if !constant.value.is_null() {
            default_value = Some(client_type.default_value_expression(&constant.value_string()));
        }
    }
    if let Some(value) = &property.client_default_value {
        if wire_type.accepts_default_value() {
            default_value = Some(wire_type.default_value_expression(value));
        }
    }

    let mut xml = schema.info.xml.as_ref().map(|x| XmlPropertyInfo {
        name: Some(x.name.clone().unwrap_or_else(|| serialized_name.clone())),
        namespace: x.namespace.clone(),
        prefix: x.prefix.clone(),
        attribute: x.attribute,
        wrapped: x.wrapped,
        text: x.text,
        list_element_name: None,
    });
    if let SchemaKind::Array(array) = &schema.kind {
        let element = mappers.schema(&array.element_type)?;
        let element_name = element
            .info
            .xml
            .as_ref()
            .and_then(|x| x.name.clone())
            .unwrap_or_else(|| element.name().to_string());
        if schema.is_xml() || element.info.xml.is_some() || xml.is_some() {
            xml.get_or_insert_with(|| XmlPropertyInfo {
                name: Some(serialized_name.clone()),
                ..XmlPropertyInfo::default()
            })
            .list_element_name = Some(element_name);
        }
    }

    Ok(ClientModelProperty {
        name,
        serialized_name,
        description,
        wire_type,
        client_type,
        required,
        required_for_create,
        read_only: property.read_only,
        default_value,
        is_constant,
        client_flatten,
        additional_properties,
        polymorphic_discriminator: property.is_discriminator,
        needs_flatten: !property.flattened_names.is_empty(),
        xml,
        mutabilities: property.mutability.clone(),
    })
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
  kind: { type: constant, value_type: string, value: widget }
  inner:
    type: object
    name: Inner
    properties:
      - { name: size, schema: int }
  names: { type: array, element_type: string }
"#;

    fn mappers() -> Mappers {
        let model = codemodel::from_yaml(MODEL).expect("should load");
        Mappers::new(Arc::new(model), Arc::new(Settings::default()))
    }

    fn property(yaml: &str) -> Property {
        serde_yaml_ng::from_str(yaml).expect("should parse property")
    }

    #[test]
    fn optional_primitives_are_boxed() {
        let mappers = mappers();
        let p = map_property(&mappers, &property("{ name: count, schema: int }"), false).unwrap();
        assert_eq!(p.wire_type.to_string(), "Integer");
        assert_eq!(p.description, "The count property.");
        let p = map_property(&mappers, &property("{ name: count, schema: int, required: true }"), false)
            .unwrap();
        assert_eq!(p.wire_type.to_string(), "int");
    }

    #[test]
    fn flattened_names_are_escaped() {
        let mappers = mappers();
        let p = map_property(
            &mappers,
            &property("{ name: tier, schema: string, flattened_names: [properties, sku.tier] }"),
            false,
        )
        .unwrap();
        assert_eq!(p.serialized_name, "properties.sku\\\\.tier");
        assert!(p.needs_flatten);
    }

    #[test]
    fn client_flatten_renames() {
        let mappers = mappers();
        let p = map_property(
            &mappers,
            &property("{ name: properties, schema: inner, client_flatten: true }"),
            false,
        )
        .unwrap();
        assert_eq!(p.name, "innerProperties");
        assert!(p.client_flatten);
    }

    #[test]
    fn constants_carry_their_value() {
        let mappers = mappers();
        let p = map_property(&mappers, &property("{ name: kind, schema: kind, required: true }"), false)
            .unwrap();
        assert!(p.is_constant);
        assert_eq!(p.default_value.as_deref(), Some("\"widget\""));
    }

    #[test]
    fn merge_patch_makes_mutable_properties_optional() {
        let mappers = mappers();
        let p = map_property(&mappers, &property("{ name: name, schema: string, required: true }"), true)
            .unwrap();
        assert!(!p.required);
        assert!(p.required_for_create);
        let p = map_property(
            &mappers,
            &property("{ name: id, schema: string, required: true, read_only: true }"),
            true,
        )
        .unwrap();
        assert!(p.required);
    }

    #[test]
    fn additional_properties_marker() {
        let mappers = mappers();
        let p = map_property(
            &mappers,
            &property("{ name: additionalProperties, serialized_name: '', schema: string }"),
            false,
        )
        .unwrap();
        assert!(p.additional_properties);
    }

    #[test]
    fn client_default_values() {
        let mappers = mappers();
        let p = map_property(
            &mappers,
            &property("{ name: size, schema: int, client_default_value: '5' }"),
            false,
        )
        .unwrap();
        assert_eq!(p.default_value.as_deref(), Some("5"));
    }
}
