use crate::codemodel::{Parameter, Property, Request, Schema};
use crate::error::MapError;
use crate::model::{ClientMethodParameter, ClientModelProperty, ParameterMapping, ParameterTransformation};

use super::Mappers;
use super::client_parameter::map_client_parameter;

/// Collects how grouped and spread method parameters assemble the wire parameters of a request.
pub struct TransformationProcessor<'a> {
    mappers: &'a Mappers,
    request: &'a Request,
    is_protocol_method: bool,
    parameters: Vec<(&'a Parameter, ClientMethodParameter)>,
}

impl<'a> TransformationProcessor<'a> {
    pub fn new(mappers: &'a Mappers, request: &'a Request, is_protocol_method: bool) -> Self {
        Self {
            mappers,
            request,
            is_protocol_method,
            parameters: Vec::new(),
        }
    }

    /// Track a parameter packaged into a group or spread from an original body.
    pub fn add_parameter(
        &mut self,
        parameter: &'a Parameter,
        client_parameter: &ClientMethodParameter,
    ) -> Result<(), MapError> {
        if self.is_protocol_method || self.mappers.schema(&parameter.schema)?.is_constant() {
            return Ok(());
        }
        if parameter.grouped_by.is_none() && parameter.original_parameter.is_none() {
            return Ok(());
        }
        self.parameters.push((parameter, client_parameter.clone()));
        Ok(())
    }

    /// One transformation per wire parameter; flattened bodies nobody writes to get an empty one.
    pub fn process(self) -> Result<Vec<ParameterTransformation>, MapError> {
        let mut transformations: Vec<ParameterTransformation> = Vec::new();

        for (parameter, client_parameter) in &self.parameters {
            let (input_parameter, input_parameter_property) = self.input_mapping(parameter, client_parameter)?;
            let (out_parameter, output_parameter_property) = self.output_mapping(parameter, client_parameter)?;
            let mapping = ParameterMapping {
                input_parameter,
                input_parameter_property,
                output_parameter_property_name: output_parameter_property.as_ref().map(|p| p.name.clone()),
                output_parameter_property,
            };
            match transformations
                .iter_mut()
                .find(|t| t.out_parameter.name == out_parameter.name)
            {
                Some(transformation) => transformation.mappings.push(mapping),
                None => transformations.push(ParameterTransformation {
                    out_parameter,
                    mappings: vec![mapping],
                }),
            }
        }

        let written: Vec<&str> = self
            .parameters
            .iter()
            .filter_map(|(p, _)| p.original_parameter.as_deref())
            .collect();
        for parameter in self
            .request
            .parameters
            .iter()
            .filter(|p| p.flattened && p.has_http() && !written.contains(&p.name.as_str()))
        {
            transformations.push(ParameterTransformation {
                out_parameter: map_client_parameter(self.mappers, parameter, false)?,
                mappings: Vec::new(),
            });
        }
        Ok(transformations)
    }

    fn request_parameter(&self, name: &str) -> Result<&'a Parameter, MapError> {
        self.request
            .parameter(name)
            .ok_or_else(|| MapError::MissingParameter(name.to_string()))
    }

    /// The method argument a value is read from, and the group property holding it.
    fn input_mapping(
        &self,
        parameter: &Parameter,
        client_parameter: &ClientMethodParameter,
    ) -> Result<(ClientMethodParameter, Option<ClientModelProperty>), MapError> {
        let Some(group_name) = &parameter.grouped_by else {
            return Ok((client_parameter.clone(), None));
        };
        let group = self.request_parameter(group_name)?;
        let input_parameter = map_client_parameter(self.mappers, group, self.is_protocol_method)?;
        let schema = self.mappers.schema(&group.schema)?;
        let model = self
            .mappers
            .map_model(schema)?
            .ok_or_else(|| MapError::MissingModel(schema.id.clone()))?;
        // Reserved names escape differently on parameters and properties.
        let property = model
            .properties
            .iter()
            .find(|p| p.name == client_parameter.name)
            .or_else(|| model.property_by_serialized_name(parameter.serialized_name()))
            .cloned()
            .ok_or_else(|| MapError::PropertyNotFound {
                property: parameter.name.clone(),
                model: model.name.clone(),
            })?;
        Ok((input_parameter, Some(property)))
    }

    /// The wire parameter a value ends up in, and the property of its model written to.
    fn output_mapping(
        &self,
        parameter: &Parameter,
        client_parameter: &ClientMethodParameter,
    ) -> Result<(ClientMethodParameter, Option<ClientModelProperty>), MapError> {
        let Some(original_name) = &parameter.original_parameter else {
            return Ok((client_parameter.clone(), None));
        };
        let original = self.request_parameter(original_name)?;
        let out_parameter = map_client_parameter(self.mappers, original, false)?;
        let property = match &parameter.target_property {
            Some(name) => {
                let schema = self.mappers.schema(&original.schema)?;
                let property = target_property(self.mappers, schema, name)?.ok_or_else(|| {
                    MapError::PropertyNotFound {
                        property: name.clone(),
                        model: schema.name().to_string(),
                    }
                })?;
                Some(self.mappers.map_model_property(property, false)?)
            }
            None => None,
        };
        Ok((out_parameter, property))
    }
}

/// A property by name, or by serialized name, on a schema or its ancestors.
fn target_property<'m>(
    mappers: &'m Mappers,
    schema: &'m Schema,
    name: &str,
) -> Result<Option<&'m Property>, MapError> {
    let Some(object) = schema.as_object() else {
        return Ok(None);
    };
    let mut lineage = vec![object];
    for id in &object.all_parents {
        if let Some(parent) = mappers.schema(id)?.as_object() {
            lineage.push(parent);
        }
    }
    let found = lineage
        .iter()
        .find_map(|o| o.properties.iter().find(|p| p.name == name))
        .or_else(|| {
            lineage
                .iter()
                .find_map(|o| o.properties.iter().find(|p| p.serialized_name() == name))
        });
    Ok(found)
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
  user:
    type: object
    name: User
    properties:
      - { name: name, schema: string, required: true }
      - { name: age, schema: int }
  options:
    type: group
    name: UserOptions
    properties:
      - { name: userId, serialized_name: userid, schema: string }
      - { name: zipcode, schema: string }
  readonly:
    type: object
    name: Snapshot
    properties:
      - { name: id, schema: string, read_only: true }
operation_groups:
  - name: users
    operations:
      - name: add
        requests:
          - http: { method: post, path: /users }
            parameters:
              - { name: body, schema: user, location: body, required: true, flattened: true }
              - { name: name, schema: string, required: true, original_parameter: body, target_property: name }
              - { name: age, schema: int, original_parameter: body, target_property: age }
      - name: find
        requests:
          - http: { method: get, path: /users }
            parameters:
              - { name: options, schema: options }
              - { name: userId, serialized_name: userid, schema: string, location: query, grouped_by: options }
              - { name: zipcode, schema: string, location: query, grouped_by: options }
      - name: snapshot
        requests:
          - http: { method: put, path: /snapshot }
            parameters:
              - { name: snapshot, schema: readonly, location: body, flattened: true }
"#;

    fn mappers() -> Mappers {
        let model = codemodel::from_yaml(MODEL).expect("should load");
        Mappers::new(Arc::new(model), Arc::new(Settings::default()))
    }

    fn transformations(mappers: &Mappers, name: &str) -> Vec<ParameterTransformation> {
        let operation = mappers
            .code_model()
            .operations()
            .find(|o| o.name == name)
            .expect("operation should exist");
        let request = &operation.requests[0];
        let mut processor = TransformationProcessor::new(mappers, request, false);
        for parameter in &request.parameters {
            let client_parameter = map_client_parameter(mappers, parameter, false).unwrap();
            processor.add_parameter(parameter, &client_parameter).unwrap();
        }
        processor.process().unwrap()
    }

    #[test]
    fn spread_parameters_write_into_the_original_body() {
        let mappers = mappers();
        let transformations = transformations(&mappers, "add");
        assert_eq!(transformations.len(), 1);
        let body = &transformations[0];
        assert_eq!(body.out_parameter.name, "body");
        let targets: Vec<(&str, Option<&str>)> = body
            .mappings
            .iter()
            .map(|m| (m.input_parameter.name.as_str(), m.output_parameter_property_name.as_deref()))
            .collect();
        assert_eq!(targets, vec![("name", Some("name")), ("age", Some("age"))]);
    }

    #[test]
    fn grouped_parameters_read_from_the_group() {
        let mappers = mappers();
        let transformations = transformations(&mappers, "find");
        let names: Vec<&str> = transformations.iter().map(|t| t.out_parameter.name.as_str()).collect();
        assert_eq!(names, vec!["userId", "zipcode"]);
        let mapping = &transformations[0].mappings[0];
        assert_eq!(mapping.input_parameter.name, "options");
        assert_eq!(
            mapping.input_parameter_property.as_ref().map(|p| p.serialized_name.as_str()),
            Some("userid")
        );
    }

    #[test]
    fn read_only_flattened_body_has_no_mappings() {
        let mappers = mappers();
        let transformations = transformations(&mappers, "snapshot");
        assert_eq!(transformations.len(), 1);
        assert!(transformations[0].has_no_mappings());
    }
}
