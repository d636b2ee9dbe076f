use crate::codemodel::{Parameter, SchemaKind};
use crate::error::MapError;
use crate::model::ClientMethodParameter;
use crate::naming;

use super::Mappers;
use super::proxy_parameter::remove_model_from_parameter;
use super::util::parameter_description;

/// Map a request parameter to its client-method representation.
pub fn map_client_parameter(
    mappers: &Mappers,
    parameter: &Parameter,
    is_protocol_method: bool,
) -> Result<ClientMethodParameter, MapError> {
    let schema = mappers.schema(&parameter.schema)?;
    let name = naming::parameter_name(&parameter.name);

    let raw_type = mappers.map_type(schema)?;
    let wire_type = if parameter.nullable || !parameter.required {
        raw_type.as_nullable()
    } else {
        raw_type.clone()
    };
    let mut client_type = wire_type.client_type();
    if is_protocol_method {
        client_type = remove_model_from_parameter(parameter.location, &client_type);
    }

    let mut is_constant = false;
    let mut default_value = None;
    if let SchemaKind::Constant(constant) = &schema.kind {
        is_constant = true;
        if !constant.value.is_null() {
            default_value = Some(client_type.default_value_expression(&constant.value_string()));
        }
    } else if let Some(value) = &parameter.client_default_value {
        if client_type.accepts_default_value() {
            default_value = Some(client_type.default_value_expression(value));
        }
    }

    Ok(ClientMethodParameter {
        description: parameter_description(mappers, parameter, &name, is_protocol_method)?,
        name,
        raw_type,
        wire_type,
        client_type,
        location: parameter.location,
        required: parameter.required,
        is_constant,
        default_value,
        from_client: parameter.is_client(),
        is_final: false,
        added_in_versions: parameter.added_in_versions.clone(),
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
  int: { type: integer }
  widget:
    type: object
    name: Widget
    properties:
      - { name: id, schema: int }
  version: { type: constant, value_type: int, value: 3 }
"#;

    fn mappers() -> Mappers {
        let model = codemodel::from_yaml(MODEL).expect("should load");
        Mappers::new(Arc::new(model), Arc::new(Settings::default()))
    }

    fn parameter(yaml: &str) -> Parameter {
        serde_yaml_ng::from_str(yaml).expect("should parse parameter")
    }

    #[test]
    fn optional_parameters_are_boxed() {
        let mappers = mappers();
        let p = map_client_parameter(&mappers, &parameter("{ name: top, schema: int, location: query }"), false)
            .unwrap();
        assert_eq!(p.client_type.to_string(), "Integer");
        assert_eq!(p.raw_type.to_string(), "int");
        assert!(!p.required);
    }

    #[test]
    fn protocol_bodies_are_binary() {
        let mappers = mappers();
        let body = parameter("{ name: body, schema: widget, location: body, required: true }");
        let convenience = map_client_parameter(&mappers, &body, false).unwrap();
        assert_eq!(convenience.client_type.to_string(), "Widget");
        let protocol = map_client_parameter(&mappers, &body, true).unwrap();
        assert!(protocol.client_type.is_binary_data());
    }

    #[test]
    fn constants_and_client_defaults() {
        let mappers = mappers();
        let p = map_client_parameter(
            &mappers,
            &parameter("{ name: version, schema: version, location: query, required: true }"),
            false,
        )
        .unwrap();
        assert!(p.is_constant);
        assert_eq!(p.default_value.as_deref(), Some("3"));

        let p = map_client_parameter(
            &mappers,
            &parameter("{ name: top, schema: int, location: query, client_default_value: '10' }"),
            false,
        )
        .unwrap();
        assert_eq!(p.default_value.as_deref(), Some("10"));
    }
}
