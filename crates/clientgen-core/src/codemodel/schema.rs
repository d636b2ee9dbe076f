use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a schema is used across the code model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaUsage {
    Input,
    Output,
    Exception,
    Public,
    Internal,
    Paged,
    JsonMergePatch,
    ConvenienceApi,
    External,
}

/// XML serialization metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlInfo {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub attribute: bool,
    pub wrapped: bool,
    pub text: bool,
}

/// Metadata shared by every schema kind.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchemaInfo {
    pub name: String,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub namespace: Option<String>,
    pub usage: Vec<SchemaUsage>,
    pub serialization_formats: Vec<String>,
    pub xml: Option<XmlInfo>,
    pub cross_language_definition_id: Option<String>,
}

/// One node of the code model's schema arena. Identity is the arena id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawSchema")]
pub struct Schema {
    pub id: String,
    pub info: SchemaInfo,
    pub kind: SchemaKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Boolean,
    Integer(IntegerSchema),
    Number(NumberSchema),
    String,
    Char,
    Date,
    Time,
    DateTime(FormatSchema),
    UnixTime,
    Duration(FormatSchema),
    Uuid,
    Uri,
    ByteArray(FormatSchema),
    Credential,
    ArmId,
    Choice(ChoiceSchema),
    SealedChoice(ChoiceSchema),
    Constant(ConstantSchema),
    Array(ArraySchema),
    Dictionary(DictionarySchema),
    Object(ObjectSchema),
    Group(ObjectSchema),
    Binary,
    Any,
    AnyObject,
    Or(OrSchema),
    /// A kind tag the loader accepted but no mapper understands.
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IntegerSchema {
    pub precision: u32,
    pub encode: Option<String>,
}

impl Default for IntegerSchema {
    fn default() -> Self {
        Self {
            precision: 32,
            encode: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NumberSchema {
    pub precision: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormatSchema {
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChoiceSchema {
    pub choice_type: String,
    pub choices: Vec<ChoiceValue>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChoiceValue {
    pub value: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ChoiceValue {
    /// The value as written on the wire, without JSON quoting.
    pub fn value_string(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConstantSchema {
    pub value_type: String,
    pub value: Value,
}

impl ConstantSchema {
    pub fn value_string(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArraySchema {
    pub element_type: String,
    #[serde(default)]
    pub nullable_items: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DictionarySchema {
    pub element_type: String,
    #[serde(default)]
    pub nullable_items: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ObjectSchema {
    pub properties: Vec<Property>,
    /// Immediate parents, in declaration order.
    pub parents: Vec<String>,
    pub discriminator: Option<Discriminator>,
    pub discriminator_value: Option<String>,
    /// Every ancestor, nearest first. Computed at link time.
    #[serde(skip)]
    pub all_parents: Vec<String>,
    /// Immediate children. Computed at link time.
    #[serde(skip)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Discriminator {
    pub property: Property,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
    Create,
    Read,
    Update,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Property {
    pub name: String,
    /// Wire name; defaults to `name` when absent.
    pub serialized_name: Option<String>,
    pub schema: String,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub required: bool,
    pub read_only: bool,
    pub nullable: bool,
    pub is_discriminator: bool,
    pub flattened_names: Vec<String>,
    pub client_flatten: bool,
    pub client_default_value: Option<String>,
    pub mutability: Vec<Mutability>,
}

impl Property {
    pub fn serialized_name(&self) -> &str {
        self.serialized_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrSchema {
    pub any_of: Vec<String>,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn has_usage(&self, usage: SchemaUsage) -> bool {
        self.info.usage.contains(&usage)
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match &self.kind {
            SchemaKind::Object(o) | SchemaKind::Group(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectSchema> {
        match &mut self.kind {
            SchemaKind::Object(o) | SchemaKind::Group(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, SchemaKind::Constant(_))
    }

    pub fn is_xml(&self) -> bool {
        self.info.serialization_formats.iter().any(|f| f == "xml")
    }

    /// The kind tag as written in the document.
    pub fn kind_name(&self) -> &str {
        match &self.kind {
            SchemaKind::Boolean => "boolean",
            SchemaKind::Integer(_) => "integer",
            SchemaKind::Number(_) => "number",
            SchemaKind::String => "string",
            SchemaKind::Char => "char",
            SchemaKind::Date => "date",
            SchemaKind::Time => "time",
            SchemaKind::DateTime(_) => "date-time",
            SchemaKind::UnixTime => "unix-time",
            SchemaKind::Duration(_) => "duration",
            SchemaKind::Uuid => "uuid",
            SchemaKind::Uri => "uri",
            SchemaKind::ByteArray(_) => "byte-array",
            SchemaKind::Credential => "credential",
            SchemaKind::ArmId => "arm-id",
            SchemaKind::Choice(_) => "choice",
            SchemaKind::SealedChoice(_) => "sealed-choice",
            SchemaKind::Constant(_) => "constant",
            SchemaKind::Array(_) => "array",
            SchemaKind::Dictionary(_) => "dictionary",
            SchemaKind::Object(_) => "object",
            SchemaKind::Group(_) => "group",
            SchemaKind::Binary => "binary",
            SchemaKind::Any => "any",
            SchemaKind::AnyObject => "any-object",
            SchemaKind::Or(_) => "or",
            SchemaKind::Unsupported(tag) => tag,
        }
    }

    /// Schema ids this schema references directly.
    pub fn references(&self) -> Vec<&str> {
        match &self.kind {
            SchemaKind::Choice(c) | SchemaKind::SealedChoice(c) => vec![c.choice_type.as_str()],
            SchemaKind::Constant(c) => vec![c.value_type.as_str()],
            SchemaKind::Array(a) => vec![a.element_type.as_str()],
            SchemaKind::Dictionary(d) => vec![d.element_type.as_str()],
            SchemaKind::Object(o) | SchemaKind::Group(o) => o
                .parents
                .iter()
                .map(String::as_str)
                .chain(o.properties.iter().map(|p| p.schema.as_str()))
                .chain(o.discriminator.iter().map(|d| d.property.schema.as_str()))
                .collect(),
            SchemaKind::Or(or) => or.any_of.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// Wire shape of a schema before its kind tag is interpreted.
#[derive(Deserialize)]
struct RawSchema {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

fn details<T: serde::de::DeserializeOwned>(fields: &Map<String, Value>) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(fields.clone()))
}

impl TryFrom<RawSchema> for Schema {
    type Error = serde_json::Error;

    fn try_from(raw: RawSchema) -> Result<Self, Self::Error> {
        let fields = &raw.fields;
        let info: SchemaInfo = details(fields)?;
        let kind = match raw.kind.as_str() {
            "boolean" => SchemaKind::Boolean,
            "integer" => SchemaKind::Integer(details(fields)?),
            "number" => SchemaKind::Number(details(fields)?),
            "string" => SchemaKind::String,
            "char" => SchemaKind::Char,
            "date" => SchemaKind::Date,
            "time" => SchemaKind::Time,
            "date-time" => SchemaKind::DateTime(details(fields)?),
            "unix-time" => SchemaKind::UnixTime,
            "duration" => SchemaKind::Duration(details(fields)?),
            "uuid" => SchemaKind::Uuid,
            "uri" => SchemaKind::Uri,
            "byte-array" => SchemaKind::ByteArray(details(fields)?),
            "credential" => SchemaKind::Credential,
            "arm-id" => SchemaKind::ArmId,
            "choice" => SchemaKind::Choice(details(fields)?),
            "sealed-choice" => SchemaKind::SealedChoice(details(fields)?),
            "constant" => SchemaKind::Constant(details(fields)?),
            "array" => SchemaKind::Array(details(fields)?),
            "dictionary" => SchemaKind::Dictionary(details(fields)?),
            "object" => SchemaKind::Object(details(fields)?),
            "group" => SchemaKind::Group(details(fields)?),
            "binary" => SchemaKind::Binary,
            "any" => SchemaKind::Any,
            "any-object" => SchemaKind::AnyObject,
            "or" => SchemaKind::Or(details(fields)?),
            other => SchemaKind::Unsupported(other.to_string()),
        };
        Ok(Schema {
            id: String::new(),
            info,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kind_specific_fields() {
        let yaml = r#"
type: integer
name: count
precision: 64
encode: string
"#;
        let schema: Schema = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(schema.name(), "count");
        match schema.kind {
            SchemaKind::Integer(i) => {
                assert_eq!(i.precision, 64);
                assert_eq!(i.encode.as_deref(), Some("string"));
            }
            _ => panic!("expected integer schema"),
        }
    }

    #[test]
    fn unknown_kind_is_kept_with_its_tag() {
        let schema: Schema = serde_yaml_ng::from_str("type: flag\nname: Colors\n").unwrap();
        assert_eq!(schema.kind, SchemaKind::Unsupported("flag".to_string()));
        assert_eq!(schema.kind_name(), "flag");
    }

    #[test]
    fn object_references_parents_and_properties() {
        let yaml = r#"
type: object
name: Dog
parents: [pet]
properties:
  - name: bark
    schema: string
"#;
        let schema: Schema = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(schema.references(), vec!["pet", "string"]);
    }
}
