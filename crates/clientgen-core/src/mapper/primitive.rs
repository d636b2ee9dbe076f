use log::debug;

use crate::codemodel::{Schema, SchemaKind};
use crate::error::MapError;
use crate::model::{GenericType, IType, PrimitiveType};

use super::cache::Memo;
use super::{Mappers, TypeMapper};

/// Maps scalar schemas, plus `binary`, `any` and the string-like `credential` and `arm-id`.
#[derive(Default)]
pub struct PrimitiveMapper {
    cache: Memo<String, IType>,
}

impl TypeMapper for PrimitiveMapper {
    fn map(&self, _mappers: &Mappers, schema: &Schema) -> Result<IType, MapError> {
        self.cache
            .get_or_try_insert_with(schema.id.clone(), || primitive_type(schema))
    }
}

fn format_is(format: &Option<String>, expected: &str) -> bool {
    format.as_deref() == Some(expected)
}

/// Resolve a scalar schema without caching.
pub fn primitive_type(schema: &Schema) -> Result<IType, MapError> {
    let t = match &schema.kind {
        SchemaKind::Boolean => IType::boolean(),
        SchemaKind::Integer(i) => {
            let as_string = i.encode.as_deref() == Some("string");
            let p = match (i.precision, as_string) {
                (64, true) => PrimitiveType::LongAsString,
                (64, false) => PrimitiveType::Long,
                (_, true) => PrimitiveType::IntAsString,
                (_, false) => PrimitiveType::Int,
            };
            IType::Primitive(p)
        }
        SchemaKind::Number(n) => match n.precision {
            64 => IType::Primitive(PrimitiveType::Double),
            32 => IType::Primitive(PrimitiveType::Float),
            _ => IType::big_decimal(),
        },
        SchemaKind::String | SchemaKind::Time | SchemaKind::Uri => IType::string(),
        SchemaKind::Credential | SchemaKind::ArmId => IType::string(),
        SchemaKind::Char => IType::Primitive(PrimitiveType::Char),
        SchemaKind::Date => IType::local_date(),
        SchemaKind::DateTime(f) if format_is(&f.format, "date-time-rfc1123") => {
            IType::date_time_rfc1123()
        }
        SchemaKind::DateTime(_) => IType::offset_date_time(),
        SchemaKind::UnixTime => IType::Primitive(PrimitiveType::UnixTimeLong),
        SchemaKind::Duration(f) if format_is(&f.format, "seconds-integer") => {
            IType::Primitive(PrimitiveType::DurationLong)
        }
        SchemaKind::Duration(f) if format_is(&f.format, "seconds-number") => {
            IType::Primitive(PrimitiveType::DurationDouble)
        }
        SchemaKind::Duration(_) => IType::duration(),
        SchemaKind::Uuid => IType::uuid(),
        SchemaKind::ByteArray(f) if format_is(&f.format, "base64url") => IType::base64_url(),
        SchemaKind::ByteArray(_) => IType::ByteArray,
        SchemaKind::Binary => GenericType::flux_byte_buffer(),
        SchemaKind::Any | SchemaKind::AnyObject => IType::object(),
        _ => {
            return Err(MapError::InvalidSchema {
                id: schema.id.clone(),
                reason: format!("'{}' is not a primitive schema", schema.kind_name()),
            });
        }
    };
    debug!("mapped primitive schema '{}' to {}", schema.id, t);
    Ok(t)
}
