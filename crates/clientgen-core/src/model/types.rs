use std::fmt;
use std::sync::Arc;

/// A resolved client-side type.
///
/// Equality is structural; mappers hand out shared `Arc`s so repeated lookups of the
/// same schema also compare pointer-equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IType {
    Primitive(PrimitiveType),
    Class(Arc<ClassType>),
    Generic(Arc<GenericType>),
    Enum(Arc<EnumType>),
    ByteArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Void,
    Boolean,
    Byte,
    Int,
    Long,
    Float,
    Double,
    Char,
    IntAsString,
    LongAsString,
    DurationLong,
    DurationDouble,
    UnixTimeLong,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassType {
    pub package: String,
    pub name: String,
    /// Declared by the code model rather than a runtime library.
    pub generated: bool,
    /// Type exposed to callers when it differs from the wire type.
    pub client_type: Option<IType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericType {
    pub package: String,
    pub name: String,
    pub type_arguments: Vec<IType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    pub package: String,
    pub name: String,
    pub description: String,
    /// Open enums accept values outside the declared set.
    pub expandable: bool,
    pub values: Vec<EnumValue>,
    pub element_type: IType,
    pub cross_language_definition_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub name: String,
    pub value: String,
    pub description: Option<String>,
}

const LANG: &str = "java.lang";
const TIME: &str = "java.time";
const CORE_UTIL: &str = "com.azure.core.util";
const CORE_HTTP: &str = "com.azure.core.http";
const CORE_REST: &str = "com.azure.core.http.rest";
const REACTOR: &str = "reactor.core.publisher";
const POLLING: &str = "com.azure.core.util.polling";

impl ClassType {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
            generated: false,
            client_type: None,
        }
    }

    /// A class declared by the code model.
    pub fn generated(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            generated: true,
            ..Self::new(package, name)
        }
    }

    /// Class named by a fully qualified name such as `com.example.models.ErrorException`.
    pub fn from_full_name(full_name: &str) -> Self {
        match full_name.rsplit_once('.') {
            Some((package, name)) => Self::new(package, name),
            None => Self::new("", full_name),
        }
    }

    pub fn full_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }

    pub fn into_type(self) -> IType {
        IType::Class(Arc::new(self))
    }
}

fn builtin(package: &str, name: &str) -> IType {
    ClassType::new(package, name).into_type()
}

impl GenericType {
    /// Primitive arguments are boxed.
    pub fn new(package: &str, name: &str, type_arguments: Vec<IType>) -> IType {
        IType::Generic(Arc::new(GenericType {
            package: package.to_string(),
            name: name.to_string(),
            type_arguments: type_arguments.iter().map(IType::as_nullable).collect(),
        }))
    }

    pub fn mono(t: IType) -> IType {
        Self::new(REACTOR, "Mono", vec![t])
    }

    pub fn flux(t: IType) -> IType {
        Self::new(REACTOR, "Flux", vec![t])
    }

    pub fn response(t: IType) -> IType {
        Self::new(CORE_REST, "Response", vec![t])
    }

    /// Response carrying strongly typed headers.
    pub fn rest_response(headers: IType, body: IType) -> IType {
        Self::new(CORE_REST, "ResponseBase", vec![headers, body])
    }

    pub fn paged_flux(t: IType) -> IType {
        Self::new(CORE_REST, "PagedFlux", vec![t])
    }

    pub fn paged_iterable(t: IType) -> IType {
        Self::new(CORE_REST, "PagedIterable", vec![t])
    }

    pub fn paged_response(t: IType) -> IType {
        Self::new(CORE_REST, "PagedResponse", vec![t])
    }

    pub fn poller_flux(poll: IType, result: IType) -> IType {
        Self::new(POLLING, "PollerFlux", vec![poll, result])
    }

    pub fn sync_poller(poll: IType, result: IType) -> IType {
        Self::new(POLLING, "SyncPoller", vec![poll, result])
    }

    pub fn poll_result(t: IType) -> IType {
        Self::new("com.azure.core.management.polling", "PollResult", vec![t])
    }

    pub fn list(t: IType) -> IType {
        Self::new("java.util", "List", vec![t])
    }

    pub fn map(value: IType) -> IType {
        Self::new("java.util", "Map", vec![IType::string(), value])
    }

    /// `Flux<ByteBuffer>`, the raw byte-stream type.
    pub fn flux_byte_buffer() -> IType {
        Self::flux(builtin("java.nio", "ByteBuffer"))
    }
}

impl IType {
    pub fn void() -> IType {
        IType::Primitive(PrimitiveType::Void)
    }

    pub fn boolean() -> IType {
        IType::Primitive(PrimitiveType::Boolean)
    }

    pub fn string() -> IType {
        builtin(LANG, "String")
    }

    pub fn object() -> IType {
        builtin(LANG, "Object")
    }

    pub fn big_decimal() -> IType {
        builtin("java.math", "BigDecimal")
    }

    pub fn local_date() -> IType {
        builtin(TIME, "LocalDate")
    }

    pub fn offset_date_time() -> IType {
        builtin(TIME, "OffsetDateTime")
    }

    pub fn duration() -> IType {
        builtin(TIME, "Duration")
    }

    pub fn uuid() -> IType {
        builtin("java.util", "UUID")
    }

    pub fn input_stream() -> IType {
        builtin("java.io", "InputStream")
    }

    pub fn binary_data() -> IType {
        builtin(CORE_UTIL, "BinaryData")
    }

    pub fn context() -> IType {
        builtin(CORE_UTIL, "Context")
    }

    pub fn request_options() -> IType {
        builtin(CORE_HTTP, "RequestOptions")
    }

    pub fn stream_response() -> IType {
        builtin(CORE_REST, "StreamResponse")
    }

    pub fn http_response_exception() -> IType {
        builtin("com.azure.core.exception", "HttpResponseException")
    }

    pub fn json_patch_document() -> IType {
        builtin("com.azure.json", "JsonPatchDocument")
    }

    pub fn http_pipeline() -> IType {
        builtin(CORE_HTTP, "HttpPipeline")
    }

    pub fn serializer_adapter() -> IType {
        builtin("com.azure.core.util.serializer", "SerializerAdapter")
    }

    pub fn azure_environment() -> IType {
        builtin("com.azure.core.management", "AzureEnvironment")
    }

    pub fn token_credential() -> IType {
        builtin("com.azure.core.credential", "TokenCredential")
    }

    /// Base64url-encoded bytes; callers see `byte[]`.
    pub fn base64_url() -> IType {
        ClassType {
            client_type: Some(IType::ByteArray),
            ..ClassType::new(CORE_UTIL, "Base64Url")
        }
        .into_type()
    }

    /// RFC 1123 timestamp; callers see `OffsetDateTime`.
    pub fn date_time_rfc1123() -> IType {
        ClassType {
            client_type: Some(IType::offset_date_time()),
            ..ClassType::new(CORE_UTIL, "DateTimeRfc1123")
        }
        .into_type()
    }

    /// The boxed form of a primitive; every other type is already nullable.
    pub fn as_nullable(&self) -> IType {
        match self {
            IType::Primitive(p) => p.boxed(),
            other => other.clone(),
        }
    }

    /// The type callers of the generated client see.
    pub fn client_type(&self) -> IType {
        match self {
            IType::Primitive(p) => p.client_type(),
            IType::Class(c) => c.client_type.clone().unwrap_or_else(|| self.clone()),
            IType::Generic(g) => {
                let arguments: Vec<IType> = g.type_arguments.iter().map(IType::client_type).collect();
                if arguments == g.type_arguments {
                    self.clone()
                } else {
                    GenericType::new(&g.package, &g.name, arguments)
                }
            }
            IType::Enum(_) | IType::ByteArray => self.clone(),
        }
    }

    pub fn is_void(&self) -> bool {
        match self {
            IType::Primitive(PrimitiveType::Void) => true,
            IType::Class(c) => c.package == LANG && c.name == "Void",
            _ => false,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, IType::Primitive(_))
    }

    pub fn is_boolean(&self) -> bool {
        match self {
            IType::Primitive(PrimitiveType::Boolean) => true,
            IType::Class(c) => c.package == LANG && c.name == "Boolean",
            _ => false,
        }
    }

    pub fn is_class(&self, package: &str, name: &str) -> bool {
        matches!(self, IType::Class(c) if c.package == package && c.name == name)
    }

    pub fn is_generic(&self, name: &str) -> bool {
        matches!(self, IType::Generic(g) if g.name == name)
    }

    pub fn is_string(&self) -> bool {
        self.is_class(LANG, "String")
    }

    pub fn is_binary_data(&self) -> bool {
        *self == IType::binary_data()
    }

    pub fn is_input_stream(&self) -> bool {
        *self == IType::input_stream()
    }

    pub fn is_flux_byte_buffer(&self) -> bool {
        *self == GenericType::flux_byte_buffer()
    }

    /// Boxed primitives, `String`, and enums accept literal default values.
    pub fn accepts_default_value(&self) -> bool {
        match self {
            IType::Primitive(_) | IType::Enum(_) => true,
            IType::Class(c) => c.package == LANG,
            _ => false,
        }
    }

    /// Generated model class, if this is one.
    pub fn as_generated_class(&self) -> Option<&ClassType> {
        match self {
            IType::Class(c) if c.generated => Some(c),
            _ => None,
        }
    }

    pub fn type_arguments(&self) -> &[IType] {
        match self {
            IType::Generic(g) => &g.type_arguments,
            _ => &[],
        }
    }

    /// Element type of a `List`.
    pub fn list_element(&self) -> Option<&IType> {
        match self {
            IType::Generic(g) if g.name == "List" => g.type_arguments.first(),
            _ => None,
        }
    }

    /// Whether `other` is this type or nested anywhere in its type arguments.
    pub fn contains(&self, other: &IType) -> bool {
        self == other || self.type_arguments().iter().any(|t| t.contains(other))
    }

    /// Source expression for a literal default value of this type.
    pub fn default_value_expression(&self, value: &str) -> String {
        match self {
            IType::Primitive(p) => p.default_value_expression(value),
            IType::Enum(e) => match e.values.iter().find(|v| v.value == value) {
                Some(member) => format!("{}.{}", e.name, member.name),
                None if e.expandable => format!("{}.fromString({})", e.name, quote(value)),
                None => format!("{}.fromValue({})", e.name, quote(value)),
            },
            IType::Class(c) if c.package == LANG => match c.name.as_str() {
                "String" => quote(value),
                "Boolean" => PrimitiveType::Boolean.default_value_expression(value),
                "Integer" => PrimitiveType::Int.default_value_expression(value),
                "Long" => PrimitiveType::Long.default_value_expression(value),
                "Float" => PrimitiveType::Float.default_value_expression(value),
                "Double" => PrimitiveType::Double.default_value_expression(value),
                "Character" => PrimitiveType::Char.default_value_expression(value),
                _ => value.to_string(),
            },
            IType::Class(c) => match c.name.as_str() {
                "OffsetDateTime" | "LocalDate" | "Duration" => {
                    format!("{}.parse({})", c.name, quote(value))
                }
                "UUID" => format!("UUID.fromString({})", quote(value)),
                "BigDecimal" | "DateTimeRfc1123" => format!("new {}({})", c.name, quote(value)),
                _ => value.to_string(),
            },
            IType::ByteArray => format!("{}.getBytes()", quote(value)),
            IType::Generic(_) => value.to_string(),
        }
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

impl PrimitiveType {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Void => "void",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Int | PrimitiveType::IntAsString => "int",
            PrimitiveType::Long
            | PrimitiveType::LongAsString
            | PrimitiveType::DurationLong
            | PrimitiveType::UnixTimeLong => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double | PrimitiveType::DurationDouble => "double",
            PrimitiveType::Char => "char",
        }
    }

    /// The boxed class of this primitive.
    pub fn boxed(self) -> IType {
        let name = match self {
            PrimitiveType::Void => "Void",
            PrimitiveType::Boolean => "Boolean",
            PrimitiveType::Byte => "Byte",
            PrimitiveType::Int => "Integer",
            PrimitiveType::Long => "Long",
            PrimitiveType::Float => "Float",
            PrimitiveType::Double => "Double",
            PrimitiveType::Char => "Character",
            PrimitiveType::IntAsString | PrimitiveType::LongAsString => "String",
            PrimitiveType::DurationLong => "Long",
            PrimitiveType::DurationDouble => "Double",
            PrimitiveType::UnixTimeLong => "Long",
        };
        let client_type = match self {
            PrimitiveType::IntAsString
            | PrimitiveType::LongAsString
            | PrimitiveType::DurationLong
            | PrimitiveType::DurationDouble
            | PrimitiveType::UnixTimeLong => Some(self.client_type().as_nullable()),
            _ => None,
        };
        ClassType {
            client_type,
            ..ClassType::new(LANG, name)
        }
        .into_type()
    }

    pub fn client_type(self) -> IType {
        match self {
            PrimitiveType::IntAsString => IType::Primitive(PrimitiveType::Int),
            PrimitiveType::LongAsString => IType::Primitive(PrimitiveType::Long),
            PrimitiveType::DurationLong | PrimitiveType::DurationDouble => IType::duration(),
            PrimitiveType::UnixTimeLong => IType::offset_date_time(),
            other => IType::Primitive(other),
        }
    }

    pub fn default_value_expression(self, value: &str) -> String {
        match self {
            PrimitiveType::Boolean => value.to_lowercase(),
            PrimitiveType::Long | PrimitiveType::LongAsString => format!("{value}L"),
            PrimitiveType::Float => format!("{value}f"),
            PrimitiveType::Double if !value.contains('.') => format!("{value}.0"),
            PrimitiveType::Char => format!("'{value}'"),
            PrimitiveType::Void => "null".to_string(),
            _ => value.to_string(),
        }
    }
}

impl fmt::Display for IType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IType::Primitive(p) => f.write_str(p.name()),
            IType::Class(c) => f.write_str(&c.name),
            IType::Enum(e) => f.write_str(&e.name),
            IType::ByteArray => f.write_str("byte[]"),
            IType::Generic(g) => {
                write!(f, "{}<", g.name)?;
                for (i, argument) in g.type_arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                f.write_str(">")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_arguments_are_boxed() {
        let t = GenericType::mono(GenericType::response(IType::void()));
        insta::assert_snapshot!(t.to_string(), @"Mono<Response<Void>>");
        assert!(t.type_arguments()[0].type_arguments()[0].is_void());
    }

    #[test]
    fn client_types_unwrap_wire_types() {
        let list = GenericType::list(IType::base64_url());
        insta::assert_snapshot!(list.client_type().to_string(), @"List<byte[]>");
        assert_eq!(
            IType::Primitive(PrimitiveType::UnixTimeLong).client_type(),
            IType::offset_date_time()
        );
        assert_eq!(IType::date_time_rfc1123().client_type(), IType::offset_date_time());
    }

    #[test]
    fn contains_searches_type_arguments() {
        let t = GenericType::mono(GenericType::response(IType::base64_url()));
        assert!(t.contains(&IType::base64_url()));
        assert!(!t.contains(&IType::date_time_rfc1123()));
    }

    #[test]
    fn default_values() {
        assert_eq!(IType::string().default_value_expression("a\"b"), "\"a\\\"b\"");
        assert_eq!(
            IType::Primitive(PrimitiveType::Long).default_value_expression("5"),
            "5L"
        );
        assert_eq!(
            IType::Primitive(PrimitiveType::Double).default_value_expression("1"),
            "1.0"
        );
        let color = IType::Enum(Arc::new(EnumType {
            package: "com.example.models".to_string(),
            name: "Color".to_string(),
            description: String::new(),
            expandable: true,
            values: vec![EnumValue {
                name: "RED".to_string(),
                value: "red".to_string(),
                description: None,
            }],
            element_type: IType::string(),
            cross_language_definition_id: None,
        }));
        assert_eq!(color.default_value_expression("red"), "Color.RED");
        assert_eq!(color.default_value_expression("blue"), "Color.fromString(\"blue\")");
    }
}
