use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodeModelError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema '{id}' referenced by {referenced_by} is not defined")]
    DanglingSchema { id: String, referenced_by: String },

    #[error("parameter '{name}' referenced by {referenced_by} is not defined")]
    DanglingParameter { name: String, referenced_by: String },

    #[error("next operation '{name}' of operation '{operation}' is not defined")]
    DanglingOperation { name: String, operation: String },
}

/// Fatal errors raised while mapping a linked code model.
///
/// None of these are recoverable: a mapping run that hits one must be abandoned.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("unsupported schema kind: {0}")]
    UnsupportedKind(String),

    #[error("schema '{0}' is not defined")]
    MissingSchema(String),

    #[error("operation '{0}' is not defined")]
    MissingOperation(String),

    #[error("parameter '{0}' is not defined on the request")]
    MissingParameter(String),

    #[error("child schema '{child}' of '{parent}' is not an object schema")]
    NonObjectChild { parent: String, child: String },

    #[error("discriminator not found in type {0} and its parents")]
    DiscriminatorNotFound(String),

    #[error("no common parent found for client models [{}]", .0.join(", "))]
    NoCommonParent(Vec<String>),

    #[error("page items property of serialized name '{item}' is not found in model '{model}'")]
    PageItemNotFound { item: String, model: String },

    #[error("next link property of serialized name '{next_link}' is not found in model '{model}'")]
    NextLinkNotFound { next_link: String, model: String },

    #[error("property '{property}' is not found in model '{model}'")]
    PropertyNotFound { property: String, model: String },

    #[error("schema '{0}' did not resolve to a client model")]
    MissingModel(String),

    #[error("long-running operation '{0}' declares no poll result type")]
    MissingPollResultType(String),

    #[error("return value for {0} method type is not supported")]
    UnsupportedReturnValue(String),

    #[error("invalid schema '{id}': {reason}")]
    InvalidSchema { id: String, reason: String },
}
