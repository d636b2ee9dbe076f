use std::sync::Arc;

use log::debug;

use crate::codemodel::{Schema, SchemaUsage};
use crate::error::MapError;
use crate::model::{ClassType, ClientException, IType};

use super::Mappers;
use super::cache::Memo;

/// Maps error-response object schemas to the exception classes thrown for them.
#[derive(Default)]
pub struct ExceptionMapper {
    cache: Memo<String, Option<Arc<ClientException>>>,
}

impl ExceptionMapper {
    /// `None` when the schema does not resolve to a generated model class.
    pub fn map(&self, mappers: &Mappers, schema: &Schema) -> Result<Option<Arc<ClientException>>, MapError> {
        if schema.as_object().is_none() {
            return Ok(None);
        }
        self.cache.get_or_try_insert_with(schema.id.clone(), || {
            let error_type = mappers.map_type(schema)?;
            let Some(class) = error_type.as_generated_class() else {
                return Ok(None);
            };
            let name = exception_name(&class.name);
            let package = mappers
                .settings()
                .model_package(&name, schema.has_usage(SchemaUsage::Internal));
            debug!("mapped exception '{}' for schema '{}'", name, schema.id);
            Ok(Some(Arc::new(ClientException {
                name,
                package,
                error_type: error_type.clone(),
                parent_type: IType::http_response_exception(),
            })))
        })
    }
}

pub fn exception_name(error_name: &str) -> String {
    format!("{error_name}Exception")
}

/// Class type of the exception thrown for an error model class.
pub fn exception_class_type(exception: &ClientException) -> IType {
    ClassType::generated(exception.package.clone(), exception.name.clone()).into_type()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codemodel;
    use crate::config::Settings;

    const MODEL: &str = r#"
schemas:
  string: { type: string }
  error:
    type: object
    name: ServiceError
    usage: [exception, output]
    properties:
      - { name: code, schema: string }
  empty: { type: object, name: Nothing }
"#;

    #[test]
    fn error_models_get_exception_classes() {
        let model = codemodel::from_yaml(MODEL).expect("should load");
        let mappers = Mappers::new(Arc::new(model), Arc::new(Settings::default()));
        let schema = mappers.schema("error").unwrap();
        let exception = mappers.map_exception(schema).unwrap().expect("should map");
        assert_eq!(exception.name, "ServiceErrorException");
        assert_eq!(exception.package, "com.example.models");
        assert_eq!(exception.error_type.to_string(), "ServiceError");

        let again = mappers.map_exception(schema).unwrap().expect("should map");
        assert!(Arc::ptr_eq(&exception, &again));
    }

    #[test]
    fn plain_objects_have_no_exception() {
        let model = codemodel::from_yaml(MODEL).expect("should load");
        let mappers = Mappers::new(Arc::new(model), Arc::new(Settings::default()));
        let schema = mappers.schema("empty").unwrap();
        assert!(mappers.map_exception(schema).unwrap().is_none());
    }
}
