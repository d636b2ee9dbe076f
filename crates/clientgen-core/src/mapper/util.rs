use crate::codemodel::{ObjectSchema, Parameter, ParameterLocation, Schema};
use crate::error::MapError;
use crate::model::IType;

use super::Mappers;

/// Merge a summary and a description into one doc string.
///
/// Identical texts collapse into one; otherwise the summary comes first, separated by a blank line.
pub fn merge_summary_description(summary: Option<&str>, description: Option<&str>) -> Option<String> {
    let summary = summary.filter(|s| !s.trim().is_empty());
    let description = description.filter(|s| !s.trim().is_empty());
    match (summary, description) {
        (Some(s), Some(d)) if s == d => Some(d.to_string()),
        (Some(s), Some(d)) => Some(format!("{s}\n\n{d}")),
        (Some(s), None) => Some(s.to_string()),
        (None, Some(d)) => Some(d.to_string()),
        (None, None) => None,
    }
}

/// Doc text of a method parameter.
///
/// Protocol methods list the allowed values of enum-typed non-body parameters.
pub fn parameter_description(
    mappers: &Mappers,
    parameter: &Parameter,
    name: &str,
    is_protocol_method: bool,
) -> Result<String, MapError> {
    let mut description =
        merge_summary_description(parameter.summary.as_deref(), parameter.description.as_deref())
            .unwrap_or_else(|| format!("The {name} parameter"));
    if is_protocol_method && parameter.location != ParameterLocation::Body {
        if let IType::Enum(e) = mappers.map_type_id(&parameter.schema)? {
            description.push_str(if description.ends_with('.') {
                " Allowed values: "
            } else {
                ". Allowed values: "
            });
            let values: Vec<String> = e
                .values
                .iter()
                .map(|v| {
                    if e.element_type.is_string() {
                        format!("\"{}\"", v.value)
                    } else {
                        v.value.clone()
                    }
                })
                .collect();
            description.push_str(&values.join(", "));
            description.push('.');
        }
    }
    Ok(description)
}

/// An object schema with nothing to generate: no properties and no hierarchy.
pub fn is_plain_object(object: &ObjectSchema) -> bool {
    object.properties.is_empty()
        && object.discriminator.is_none()
        && object.discriminator_value.is_none()
        && object.parents.is_empty()
        && object.children.is_empty()
}

pub fn is_plain_object_schema(schema: &Schema) -> bool {
    schema.as_object().is_some_and(is_plain_object)
}

/// The lowest object schema that every given schema is or derives from.
///
/// A single schema is its own common parent. Returns `None` when the schemas share no ancestor
/// or any of them is not an object.
pub fn lowest_common_parent<'a>(
    mappers: &'a Mappers,
    schemas: &[&'a Schema],
) -> Result<Option<&'a Schema>, MapError> {
    let Some((first, rest)) = schemas.split_first() else {
        return Ok(None);
    };
    let Some(first_object) = first.as_object() else {
        return Ok(None);
    };
    let mut candidates: Vec<&str> = std::iter::once(first.id.as_str())
        .chain(first_object.all_parents.iter().map(String::as_str))
        .collect();
    for schema in rest {
        let Some(object) = schema.as_object() else {
            return Ok(None);
        };
        let lineage: Vec<&str> = std::iter::once(schema.id.as_str())
            .chain(object.all_parents.iter().map(String::as_str))
            .collect();
        candidates.retain(|c| lineage.contains(c));
    }
    match candidates.first() {
        Some(id) => mappers.schema(id).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_doc_strings() {
        assert_eq!(merge_summary_description(Some("a"), Some("a")).as_deref(), Some("a"));
        assert_eq!(
            merge_summary_description(Some("Get it."), Some("Gets the widget.")).as_deref(),
            Some("Get it.\n\nGets the widget.")
        );
        assert_eq!(merge_summary_description(Some(" "), Some("d")).as_deref(), Some("d"));
        assert_eq!(merge_summary_description(None, None), None);
    }

    #[test]
    fn plain_objects() {
        assert!(is_plain_object(&ObjectSchema::default()));
        let with_parent = ObjectSchema {
            parents: vec!["base".to_string()],
            ..ObjectSchema::default()
        };
        assert!(!is_plain_object(&with_parent));
    }
}
