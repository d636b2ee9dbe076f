use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use log::debug;

use crate::codemodel::{ObjectSchema, Property, Schema, SchemaKind, SchemaUsage};
use crate::error::MapError;
use crate::model::{ClientModel, ClientModelProperty, ClientModelPropertyReference};
use crate::naming;

use super::Mappers;
use super::cache::Memo;
use super::model_property::ADDITIONAL_PROPERTIES;
use super::util::{is_plain_object, merge_summary_description};

/// Resolves object schemas into client models, at most once per schema.
#[derive(Default)]
pub struct ModelMapper {
    cache: Memo<String, Option<Arc<ClientModel>>>,
}

impl ModelMapper {
    /// `None` for plain objects and for external models outside data-plane clients.
    pub fn map(&self, mappers: &Mappers, schema: &Schema) -> Result<Option<Arc<ClientModel>>, MapError> {
        let Some(object) = schema.as_object() else {
            return Ok(None);
        };
        if is_plain_object(object) {
            return Ok(None);
        }
        if schema.has_usage(SchemaUsage::External) && !mappers.settings().is_data_plane() {
            return Ok(None);
        }
        self.cache.get_or_try_insert_with(schema.id.clone(), || {
            let model = build_model(mappers, schema, object)?;
            debug!("mapped model '{}' from schema '{}'", model.name, schema.id);
            Ok(Some(Arc::new(model)))
        })
    }
}

fn build_model(mappers: &Mappers, schema: &Schema, object: &ObjectSchema) -> Result<ClientModel, MapError> {
    let settings = mappers.settings();
    let model_type = mappers.map_type(schema)?;
    let Some(class) = model_type.as_generated_class() else {
        return Err(MapError::MissingModel(schema.id.clone()));
    };
    let name = class.name.clone();
    let package = class.package.clone();

    let mut usages: BTreeSet<SchemaUsage> = schema.info.usage.iter().copied().collect();
    if usages.contains(&SchemaUsage::JsonMergePatch) && !usages.contains(&SchemaUsage::Input) {
        usages.remove(&SchemaUsage::JsonMergePatch);
    }

    let is_polymorphic = is_polymorphic(object);
    let has_additional_properties = dictionary_parent(mappers, object)?.is_some();
    let (parent, flattened_parents) = parent_schemas(mappers, object)?;
    let parent_model_name = match parent {
        Some(p) => Some(mappers.map_type(p)?.to_string()),
        None => None,
    };

    let description = merge_summary_description(
        schema.info.summary.as_deref(),
        schema.info.description.as_deref(),
    )
    .unwrap_or_else(|| format!("The {name} model."));
    let serialized_name = model_serialized_name(schema, object);

    let mut derived_models = Vec::new();
    for child_id in &object.children {
        let child = mappers.schema(child_id)?;
        if child.as_object().is_none() {
            return Err(MapError::NonObjectChild {
                parent: schema.id.clone(),
                child: child_id.clone(),
            });
        }
        if let Some(model) = mappers.map_model(child)? {
            derived_models.push(model);
        }
    }

    let (xml_name, xml_namespace) = if schema.is_xml() {
        match &schema.info.xml {
            Some(xml) => (
                Some(
                    xml.name
                        .clone()
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| schema.name().to_string()),
                ),
                xml.namespace.clone(),
            ),
            None => (Some(schema.name().to_string()), None),
        }
    } else {
        (None, None)
    };

    let composite = composite_properties(mappers, object, &flattened_parents)?;

    let mut properties: Vec<ClientModelProperty> = Vec::new();
    let mut polymorphic_discriminator = None;
    let mut discriminator_name = None;
    if is_polymorphic {
        let property = discriminator_model_property(mappers, schema, object)?;
        discriminator_name = Some(property.serialized_name.clone());
        properties.push(property.clone());
        polymorphic_discriminator = Some(property);
    }

    let mutable_as_optional =
        usages.contains(&SchemaUsage::JsonMergePatch) && settings.stream_style_serialization;
    let mut property_references: Vec<ClientModelPropertyReference> = Vec::new();
    for property in &composite {
        let mut model_property = mappers.map_model_property(property, mutable_as_optional)?;
        if discriminator_name.as_deref() == Some(model_property.serialized_name.as_str()) {
            // Declared both as discriminator and as a property: requiredness is handled on the discriminator.
            continue;
        }
        if has_additional_properties && model_property.name == ADDITIONAL_PROPERTIES {
            model_property.name = format!("{ADDITIONAL_PROPERTIES}Property");
        }
        if model_property.client_flatten {
            let references = flattened_references(
                mappers,
                object,
                property,
                &model_property,
                &property_references,
            )?;
            property_references.extend(references);
        }
        properties.push(model_property);
    }

    if let Some(dictionary) = dictionary_parent(mappers, object)? {
        let description = dictionary
            .info
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "Additional properties".to_string());
        let additional = Property {
            name: ADDITIONAL_PROPERTIES.to_string(),
            serialized_name: Some(String::new()),
            schema: dictionary.id.clone(),
            description: Some(description),
            ..Property::default()
        };
        properties.push(mappers.map_model_property(&additional, false)?);
    }

    Ok(ClientModel {
        name,
        package,
        description,
        model_type,
        parent_model_name,
        derived_models,
        is_polymorphic,
        polymorphic_discriminator,
        parent_polymorphic_discriminators: parent_polymorphic_discriminators(mappers, schema)?,
        serialized_name,
        properties,
        property_references,
        usages,
        xml_name,
        xml_namespace,
        serialization_formats: schema.info.serialization_formats.clone(),
        has_additional_properties,
        strongly_typed_header: false,
        cross_language_definition_id: schema.info.cross_language_definition_id.clone(),
    })
}

fn is_polymorphic(object: &ObjectSchema) -> bool {
    object.discriminator.is_some() || object.discriminator_value.is_some()
}

fn model_serialized_name(schema: &Schema, object: &ObjectSchema) -> String {
    object
        .discriminator_value
        .clone()
        .unwrap_or_else(|| schema.name().to_string())
}

fn dictionary_parent<'a>(mappers: &'a Mappers, object: &ObjectSchema) -> Result<Option<&'a Schema>, MapError> {
    for id in &object.parents {
        let parent = mappers.schema(id)?;
        if matches!(parent.kind, SchemaKind::Dictionary(_)) {
            return Ok(Some(parent));
        }
    }
    Ok(None)
}

/// Split the immediate object parents into the one kept as superclass and the ones flattened in.
///
/// A model with a discriminator value keeps the first parent carrying discriminator information;
/// otherwise (or when none does) the first object parent is kept.
pub fn parent_schemas<'a>(
    mappers: &'a Mappers,
    object: &ObjectSchema,
) -> Result<(Option<&'a Schema>, Vec<&'a Schema>), MapError> {
    let mut parents: Vec<&Schema> = Vec::new();
    for id in &object.parents {
        let parent = mappers.schema(id)?;
        if parent.as_object().is_some() {
            parents.push(parent);
        }
    }

    if object.discriminator_value.is_some() {
        let position = parents
            .iter()
            .position(|p| p.as_object().is_some_and(is_polymorphic));
        if let Some(position) = position {
            let kept = parents.remove(position);
            return Ok((Some(kept), parents));
        }
    }

    if parents.is_empty() {
        return Ok((None, parents));
    }
    let kept = parents.remove(0);
    Ok((Some(kept), parents))
}

/// Own non-discriminator properties followed by those of flattened parents and their ancestors.
fn composite_properties<'a>(
    mappers: &'a Mappers,
    object: &'a ObjectSchema,
    flattened_parents: &[&'a Schema],
) -> Result<Vec<&'a Property>, MapError> {
    let mut properties: Vec<&Property> = object
        .properties
        .iter()
        .filter(|p| !p.is_discriminator)
        .collect();
    for parent in flattened_parents {
        let Some(parent_object) = parent.as_object() else {
            continue;
        };
        properties.extend(parent_object.properties.iter().filter(|p| !p.is_discriminator));
        for ancestor in &parent_object.all_parents {
            if let Some(ancestor) = mappers.schema(ancestor)?.as_object() {
                properties.extend(ancestor.properties.iter().filter(|p| !p.is_discriminator));
            }
        }
    }
    Ok(properties)
}

/// The discriminator property of a schema: its own, else the nearest ancestor's.
pub fn discriminator_property<'a>(mappers: &'a Mappers, schema: &'a Schema) -> Result<&'a Property, MapError> {
    let Some(object) = schema.as_object() else {
        return Err(MapError::DiscriminatorNotFound(schema.name().to_string()));
    };
    if let Some(discriminator) = &object.discriminator {
        return Ok(&discriminator.property);
    }
    for id in &object.all_parents {
        if let Some(discriminator) = mappers.schema(id)?.as_object().and_then(|o| o.discriminator.as_ref()) {
            return Ok(&discriminator.property);
        }
    }
    Err(MapError::DiscriminatorNotFound(schema.name().to_string()))
}

fn discriminator_serialized_name(mappers: &Mappers, schema: &Schema, object: &ObjectSchema) -> Result<String, MapError> {
    let name = discriminator_property(mappers, schema)?.serialized_name().to_string();
    let (_, flattened) = parent_schemas(mappers, object)?;
    let needs_flatten = composite_properties(mappers, object, &flattened)?
        .iter()
        .any(|p| !p.flattened_names.is_empty());
    Ok(if needs_flatten {
        name.replace('.', "\\\\.")
    } else {
        name
    })
}

/// The discriminator as a read-only property defaulting to the model's discriminator value.
fn discriminator_model_property(
    mappers: &Mappers,
    schema: &Schema,
    object: &ObjectSchema,
) -> Result<ClientModelProperty, MapError> {
    let serialized_name = discriminator_serialized_name(mappers, schema, object)?;
    let mut property = mappers.map_model_property(discriminator_property(mappers, schema)?, false)?;
    property.default_value = object
        .discriminator_value
        .as_deref()
        .map(|v| property.client_type.default_value_expression(v));
    property.serialized_name = serialized_name;
    property.read_only = true;
    property.polymorphic_discriminator = true;
    property.required = discriminator_required(mappers, object, &property.serialized_name)?;
    Ok(property)
}

/// A discriminator is required when a regular property of the same name is; an immediate
/// parent sharing the discriminator overrides the model's own declaration.
fn discriminator_required(
    mappers: &Mappers,
    object: &ObjectSchema,
    discriminator_name: &str,
) -> Result<bool, MapError> {
    for id in &object.parents {
        let parent = mappers.schema(id)?;
        let Some(parent_object) = parent.as_object() else {
            continue;
        };
        if !is_polymorphic(parent_object)
            || discriminator_serialized_name(mappers, parent, parent_object)? != discriminator_name
        {
            continue;
        }
        if let Some(required) = same_named_property_required(mappers, parent_object, discriminator_name)? {
            return Ok(required);
        }
    }
    Ok(same_named_property_required(mappers, object, discriminator_name)?.unwrap_or(false))
}

fn same_named_property_required(
    mappers: &Mappers,
    object: &ObjectSchema,
    serialized_name: &str,
) -> Result<Option<bool>, MapError> {
    let (_, flattened) = parent_schemas(mappers, object)?;
    Ok(composite_properties(mappers, object, &flattened)?
        .iter()
        .find(|p| p.serialized_name() == serialized_name)
        .map(|p| p.required))
}

/// Discriminators of ancestors whose discriminator name differs from their child's, root first.
fn parent_polymorphic_discriminators(
    mappers: &Mappers,
    schema: &Schema,
) -> Result<Vec<ClientModelProperty>, MapError> {
    let Some(object) = schema.as_object() else {
        return Ok(Vec::new());
    };
    let own_name = if is_polymorphic(object) {
        Some(discriminator_serialized_name(mappers, schema, object)?)
    } else {
        None
    };
    let serialized_name = model_serialized_name(schema, object);

    let mut result = Vec::new();
    for id in &object.parents {
        let parent = mappers.schema(id)?;
        let Some(parent_object) = parent.as_object() else {
            continue;
        };
        if !is_polymorphic(parent_object) {
            continue;
        }
        for inherited in parent_polymorphic_discriminators(mappers, parent)? {
            if !result.contains(&inherited) {
                result.push(inherited);
            }
        }
        let mut discriminator = discriminator_model_property(mappers, parent, parent_object)?;
        if own_name.as_deref() != Some(discriminator.serialized_name.as_str()) {
            discriminator.default_value = Some(
                discriminator
                    .client_type
                    .default_value_expression(&serialized_name),
            );
            result.push(discriminator);
        }
    }
    Ok(result)
}

/// Expose the properties of a client-flattened inner model on the outer model.
///
/// Names colliding with the outer model's properties become
/// `{name}{Pascal(flattenedProperty)}{Pascal(name)}`.
fn flattened_references(
    mappers: &Mappers,
    object: &ObjectSchema,
    property: &Property,
    model_property: &ClientModelProperty,
    existing: &[ClientModelPropertyReference],
) -> Result<Vec<ClientModelPropertyReference>, MapError> {
    let target_schema = mappers.schema(&property.schema)?;
    let Some(target_object) = target_schema.as_object() else {
        return Ok(Vec::new());
    };
    let Some(target_model) = mappers.map_model(target_schema)? else {
        return Ok(Vec::new());
    };
    let original_name = naming::property_name(&property.name);

    let mut taken: HashSet<String> = object
        .properties
        .iter()
        .filter(|p| !p.client_flatten)
        .map(|p| naming::property_name(&p.name))
        .collect();
    for id in &object.all_parents {
        let ancestor = mappers.schema(id)?;
        match &ancestor.kind {
            SchemaKind::Dictionary(_) => {
                taken.insert(ADDITIONAL_PROPERTIES.to_string());
            }
            _ => {
                if let Some(ancestor) = ancestor.as_object() {
                    taken.extend(
                        ancestor
                            .properties
                            .iter()
                            .filter(|p| !p.client_flatten)
                            .map(|p| naming::property_name(&p.name)),
                    );
                }
            }
        }
    }
    taken.extend(existing.iter().map(|r| r.name.clone()));

    let disambiguate = |name: &str| -> String {
        if taken.contains(name) {
            format!(
                "{name}{}{}",
                naming::to_pascal(&original_name),
                naming::to_pascal(name)
            )
        } else {
            name.to_string()
        }
    };

    let mut referenced: Vec<ClientModelProperty> = target_model
        .properties
        .iter()
        .filter(|p| !p.client_flatten && !p.additional_properties)
        .cloned()
        .collect();
    referenced.extend(
        target_model
            .property_references
            .iter()
            .map(|r| r.referenced_property.clone()),
    );
    let (target_parent, _) = parent_schemas(mappers, target_object)?;
    if let Some(target_parent) = target_parent {
        let lineage = std::iter::once(target_parent.id.as_str()).chain(
            target_parent
                .as_object()
                .map(|o| o.all_parents.iter().map(String::as_str).collect::<Vec<_>>())
                .unwrap_or_default(),
        );
        for id in lineage {
            let Some(ancestor) = mappers.schema(id)?.as_object() else {
                continue;
            };
            for p in ancestor
                .properties
                .iter()
                .filter(|p| !p.is_discriminator && !p.client_flatten)
            {
                referenced.push(mappers.map_model_property(p, false)?);
            }
        }
    }

    let mut names: HashSet<String> = HashSet::new();
    let mut references = Vec::new();
    for referenced_property in referenced {
        let name = disambiguate(&referenced_property.name);
        if names.insert(name.clone()) {
            references.push(ClientModelPropertyReference {
                name,
                target_property: model_property.clone(),
                referenced_property,
                target_model_type: target_model.model_type.clone(),
            });
        }
    }
    Ok(references)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codemodel;
    use crate::config::Settings;

    const HIERARCHY: &str = r#"
schemas:
  string: { type: string }
  int: { type: integer }
  shape:
    type: object
    name: Shape
    discriminator:
      property: { name: kind, schema: string, is_discriminator: true }
    properties:
      - { name: kind, schema: string, required: true }
      - { name: name, schema: string }
  polygon:
    type: object
    name: Polygon
    discriminator_value: polygon
    discriminator:
      property: { name: sides_kind, serialized_name: sidesKind, schema: string, is_discriminator: true }
    parents: [shape]
    properties:
      - { name: sides, schema: int, required: true }
  triangle:
    type: object
    name: Triangle
    discriminator_value: triangle
    parents: [polygon, tagged]
  tagged:
    type: object
    name: Tagged
    properties:
      - { name: tag, schema: string }
  bag:
    type: object
    name: Bag
    parents: [extras]
    properties:
      - { name: additionalProperties, schema: string }
  extras: { type: dictionary, element_type: string }
"#;

    fn mappers() -> Mappers {
        let model = codemodel::from_yaml(HIERARCHY).expect("should load");
        Mappers::new(Arc::new(model), Arc::new(Settings::default()))
    }

    fn model(mappers: &Mappers, id: &str) -> Arc<ClientModel> {
        let schema = mappers.schema(id).expect("should have schema");
        mappers
            .map_model(schema)
            .expect("should map")
            .expect("should be a model")
    }

    #[test]
    fn discriminator_comes_first_and_takes_requiredness_from_property() {
        let mappers = mappers();
        let shape = model(&mappers, "shape");
        let first = &shape.properties[0];
        assert!(first.polymorphic_discriminator);
        assert!(first.read_only);
        assert!(first.required);
        assert_eq!(first.serialized_name, "kind");
        assert_eq!(shape.properties.iter().filter(|p| p.serialized_name == "kind").count(), 1);
        assert_eq!(shape.derived_models.len(), 1);
        assert_eq!(shape.serialized_name, "Shape");
    }

    #[test]
    fn multi_level_discriminators_are_root_first() {
        let mappers = mappers();
        let triangle = model(&mappers, "triangle");
        assert_eq!(triangle.parent_model_name.as_deref(), Some("Polygon"));
        let discriminator = triangle
            .polymorphic_discriminator
            .as_ref()
            .expect("should have discriminator");
        assert_eq!(discriminator.serialized_name, "sidesKind");
        assert_eq!(discriminator.default_value.as_deref(), Some("\"triangle\""));

        let parents: Vec<&str> = triangle
            .parent_polymorphic_discriminators
            .iter()
            .map(|p| p.serialized_name.as_str())
            .collect();
        assert_eq!(parents, vec!["kind"]);
        // The root discriminator carries the value of the root's direct child.
        assert_eq!(
            triangle.parent_polymorphic_discriminators[0].default_value.as_deref(),
            Some("\"polygon\"")
        );
    }

    #[test]
    fn secondary_parents_are_flattened() {
        let mappers = mappers();
        let triangle = model(&mappers, "triangle");
        assert!(triangle.properties.iter().any(|p| p.name == "tag"));
        assert!(!triangle.properties.iter().any(|p| p.name == "sides"));
    }

    #[test]
    fn dictionary_parent_adds_additional_properties() {
        let mappers = mappers();
        let bag = model(&mappers, "bag");
        assert!(bag.has_additional_properties);
        assert!(bag.parent_model_name.is_none());
        let names: Vec<&str> = bag.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["additionalPropertiesProperty", "additionalProperties"]);
        let additional = bag.properties.last().expect("should have additional properties");
        assert!(additional.additional_properties);
        assert_eq!(additional.description, "Additional properties");
    }

    #[test]
    fn models_are_shared() {
        let mappers = mappers();
        let a = model(&mappers, "polygon");
        let b = model(&mappers, "polygon");
        assert!(Arc::ptr_eq(&a, &b));
        let shape = model(&mappers, "shape");
        assert!(Arc::ptr_eq(&shape.derived_models[0], &a));
    }

    #[test]
    fn children_must_be_objects() {
        let mut code_model = codemodel::from_yaml(HIERARCHY).expect("should load");
        code_model
            .schemas
            .get_mut("shape")
            .and_then(Schema::as_object_mut)
            .expect("shape should be an object")
            .children
            .insert(0, "string".to_string());
        let mappers = Mappers::new(Arc::new(code_model), Arc::new(Settings::default()));
        let shape = mappers.schema("shape").unwrap();
        let err = mappers.map_model(shape).unwrap_err();
        assert!(matches!(
            err,
            MapError::NonObjectChild { ref parent, ref child } if parent == "shape" && child == "string"
        ));
    }
}
