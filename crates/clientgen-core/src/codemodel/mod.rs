pub mod operation;
pub mod schema;

pub use operation::*;
pub use schema::*;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::CodeModelError;

/// The normalized service description every mapper reads from.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CodeModel {
    pub name: String,
    pub description: Option<String>,
    /// Host template of the service, e.g. `{endpoint}`.
    pub host: Option<String>,
    pub api_versions: Vec<String>,
    pub schemas: IndexMap<String, Schema>,
    pub global_parameters: Vec<Parameter>,
    pub operation_groups: Vec<OperationGroup>,
    pub security: Security,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Security {
    pub authentication_required: bool,
    pub schemes: Vec<SecurityScheme>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SecurityScheme {
    Oauth2 {
        #[serde(default)]
        scopes: Vec<String>,
    },
    Key {
        name: String,
        #[serde(default)]
        prefix: Option<String>,
    },
}

/// Parse a code model from YAML and link it.
pub fn from_yaml(input: &str) -> Result<CodeModel, CodeModelError> {
    let mut model: CodeModel = serde_yaml_ng::from_str(input)?;
    model.link()?;
    Ok(model)
}

/// Parse a code model from JSON and link it.
pub fn from_json(input: &str) -> Result<CodeModel, CodeModelError> {
    let mut model: CodeModel = serde_json::from_str(input)?;
    model.link()?;
    Ok(model)
}

impl CodeModel {
    pub fn schema(&self, id: &str) -> Option<&Schema> {
        self.schemas.get(id)
    }

    pub fn operation(&self, key: OperationKey) -> Option<&Operation> {
        self.operation_groups
            .get(key.group)
            .and_then(|g| g.operations.get(key.index))
    }

    pub fn request(&self, key: RequestKey) -> Option<&Request> {
        let operation = self.operation(key.operation)?;
        if key.convenience {
            operation
                .convenience_api
                .as_ref()
                .and_then(|c| c.requests.get(key.index))
        } else {
            operation.requests.get(key.index)
        }
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operation_groups.iter().flat_map(|g| g.operations.iter())
    }

    /// Assign identities and derived relations, and reject dangling references.
    pub fn link(&mut self) -> Result<(), CodeModelError> {
        for (id, schema) in self.schemas.iter_mut() {
            schema.id = id.clone();
        }
        self.check_schema_references()?;
        self.link_hierarchy();
        self.link_operations()
    }

    fn require_schema(&self, id: &str, referenced_by: &str) -> Result<(), CodeModelError> {
        if self.schemas.contains_key(id) {
            Ok(())
        } else {
            Err(CodeModelError::DanglingSchema {
                id: id.to_string(),
                referenced_by: referenced_by.to_string(),
            })
        }
    }

    fn check_schema_references(&self) -> Result<(), CodeModelError> {
        for schema in self.schemas.values() {
            for reference in schema.references() {
                self.require_schema(reference, &format!("schema '{}'", schema.id))?;
            }
        }
        for parameter in &self.global_parameters {
            self.require_schema(&parameter.schema, &format!("parameter '{}'", parameter.name))?;
        }
        for operation in self.operations() {
            let owner = format!("operation '{}'", operation.name);
            let requests = operation.requests.iter().chain(
                operation
                    .convenience_api
                    .iter()
                    .flat_map(|c| c.requests.iter()),
            );
            for parameter in requests.flat_map(|r| r.parameters.iter()) {
                self.require_schema(&parameter.schema, &owner)?;
            }
            for response in operation.all_responses() {
                if let Some(schema) = &response.schema {
                    self.require_schema(schema, &owner)?;
                }
                for header in &response.headers {
                    if let Some(schema) = &header.schema {
                        self.require_schema(schema, &owner)?;
                    }
                }
            }
            if let Some(lro) = &operation.lro_metadata {
                self.require_schema(&lro.poll_result_type, &owner)?;
                if let Some(final_type) = &lro.final_result_type {
                    self.require_schema(final_type, &owner)?;
                }
            }
        }
        Ok(())
    }

    fn link_hierarchy(&mut self) {
        let immediate: IndexMap<String, Vec<String>> = self
            .schemas
            .iter()
            .filter_map(|(id, s)| s.as_object().map(|o| (id.clone(), o.parents.clone())))
            .collect();

        for (id, parents) in &immediate {
            // Breadth-first so nearer ancestors come first.
            let mut all: Vec<String> = Vec::new();
            let mut queue: Vec<String> = parents.clone();
            while !queue.is_empty() {
                let current = queue.remove(0);
                if all.contains(&current) || current == *id {
                    continue;
                }
                if let Some(grand) = immediate.get(&current) {
                    queue.extend(grand.iter().cloned());
                }
                all.push(current);
            }
            if let Some(object) = self.schemas.get_mut(id).and_then(Schema::as_object_mut) {
                object.all_parents = all;
            }
        }

        for (id, parents) in &immediate {
            for parent in parents {
                if let Some(object) = self.schemas.get_mut(parent).and_then(Schema::as_object_mut) {
                    object.children.push(id.clone());
                }
            }
        }
    }

    fn link_operations(&mut self) -> Result<(), CodeModelError> {
        for (group_index, group) in self.operation_groups.iter_mut().enumerate() {
            let names: Vec<String> = group.operations.iter().map(|o| o.name.clone()).collect();
            for (index, operation) in group.operations.iter_mut().enumerate() {
                let key = OperationKey {
                    group: group_index,
                    index,
                };
                operation.key = key;
                operation.group_name = group.name.clone();

                for (i, request) in operation.requests.iter_mut().enumerate() {
                    link_request(request, key, i, false, &self.schemas)?;
                }
                if let Some(convenience) = operation.convenience_api.as_mut() {
                    for (i, request) in convenience.requests.iter_mut().enumerate() {
                        link_request(request, key, i, true, &self.schemas)?;
                    }
                }

                if let Some(pageable) = operation.extensions.pageable.as_mut() {
                    if let Some(next) = &pageable.next_operation {
                        let position = names.iter().position(|n| n == next).ok_or_else(|| {
                            CodeModelError::DanglingOperation {
                                name: next.clone(),
                                operation: operation.name.clone(),
                            }
                        })?;
                        pageable.next_operation_key = Some(OperationKey {
                            group: group_index,
                            index: position,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn link_request(
    request: &mut Request,
    operation: OperationKey,
    index: usize,
    convenience: bool,
    schemas: &IndexMap<String, Schema>,
) -> Result<(), CodeModelError> {
    request.key = RequestKey {
        operation,
        index,
        convenience,
    };

    let names: Vec<String> = request.parameters.iter().map(|p| p.name.clone()).collect();
    for parameter in &request.parameters {
        for reference in [&parameter.grouped_by, &parameter.original_parameter]
            .into_iter()
            .flatten()
        {
            if !names.contains(reference) {
                return Err(CodeModelError::DanglingParameter {
                    name: reference.clone(),
                    referenced_by: format!("parameter '{}'", parameter.name),
                });
            }
        }
    }

    if request.signature_parameters.is_empty() {
        request.signature_parameters = request
            .parameters
            .iter()
            .filter(|p| {
                !p.is_client()
                    && !p.flattened
                    && p.grouped_by.is_none()
                    && !schemas.get(&p.schema).is_some_and(Schema::is_constant)
            })
            .map(|p| p.name.clone())
            .collect();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PETS: &str = r#"
name: PetStore
schemas:
  string: { type: string }
  pet:
    type: object
    name: Pet
    discriminator:
      property: { name: kind, schema: string, required: true, is_discriminator: true }
    properties:
      - { name: name, schema: string }
  dog:
    type: object
    name: Dog
    discriminator_value: dog
    parents: [pet]
  puppy:
    type: object
    name: Puppy
    discriminator_value: puppy
    parents: [dog]
operation_groups:
  - name: Pets
    operations:
      - name: list
        requests:
          - http: { method: get, path: /pets, uri: "{endpoint}" }
            parameters:
              - { name: filter, schema: string, location: query }
        responses:
          - { schema: pet, status_codes: ["200"] }
"#;

    #[test]
    fn link_computes_hierarchy() {
        let model = from_yaml(PETS).unwrap();
        let puppy = model.schema("puppy").and_then(Schema::as_object).unwrap();
        assert_eq!(puppy.all_parents, vec!["dog".to_string(), "pet".to_string()]);
        let pet = model.schema("pet").and_then(Schema::as_object).unwrap();
        assert_eq!(pet.children, vec!["dog".to_string()]);
    }

    #[test]
    fn link_assigns_keys_and_signatures() {
        let model = from_yaml(PETS).unwrap();
        let operation = model.operations().next().expect("should have an operation");
        assert_eq!(operation.group_name, "Pets");
        assert_eq!(operation.operation_id(), "Pets_list");
        let request = &operation.requests[0];
        assert_eq!(request.key.operation, operation.key);
        assert_eq!(request.signature_parameters, vec!["filter".to_string()]);
    }

    #[test]
    fn dangling_schema_is_rejected() {
        let yaml = r#"
schemas:
  list: { type: array, element_type: missing }
"#;
        match from_yaml(yaml) {
            Err(CodeModelError::DanglingSchema { id, .. }) => assert_eq!(id, "missing"),
            other => panic!("expected dangling schema error, got {other:?}"),
        }
    }
}
