use crate::codemodel::{Parameter, ParameterLocation, SchemaKind, SerializationStyle};
use crate::error::MapError;
use crate::model::{ClassType, CollectionFormat, GenericType, IType, ProxyMethodParameter};
use crate::naming;

use super::Mappers;
use super::util::parameter_description;

/// Map a request parameter to its wire-call representation.
///
/// `on_service_client` selects how client-bound values are read: `this.getX()` on the service
/// client itself, `this.client.getX()` from a method group.
pub fn map_proxy_parameter(
    mappers: &Mappers,
    parameter: &Parameter,
    on_service_client: bool,
    is_json_patch: bool,
) -> Result<ProxyMethodParameter, MapError> {
    let settings = mappers.settings();
    let data_plane = settings.is_data_plane();
    let schema = mappers.schema(&parameter.schema)?;
    let name = naming::parameter_name(&parameter.name);
    let location = parameter.location;
    let is_body = location == ParameterLocation::Body;

    let mut raw_type = mappers.map_type(schema)?;
    if is_json_patch {
        if let SchemaKind::Array(array) = &schema.kind {
            let element = mappers.schema(&array.element_type)?;
            if matches!(element.kind, SchemaKind::Any | SchemaKind::AnyObject) {
                raw_type = IType::json_patch_document();
            }
        }
    }
    if parameter.nullable || !parameter.required {
        raw_type = raw_type.as_nullable();
    }

    let mut client_type = raw_type.client_type();
    if data_plane {
        client_type = remove_model_from_parameter(location, &client_type);
    }

    let wire_type = if is_body && raw_type.list_element().is_some() && schema.is_xml() {
        xml_wrapper_type(mappers, &parameter.schema)?
    } else if raw_type == IType::ByteArray {
        if !is_body {
            IType::string()
        } else if data_plane {
            remove_model_from_parameter(location, &raw_type)
        } else {
            raw_type.clone()
        }
    } else if raw_type.list_element().is_some() && !is_body {
        if parameter.explode {
            GenericType::list(IType::string())
        } else {
            IType::string()
        }
    } else if data_plane {
        remove_model_from_parameter(location, &raw_type)
    } else {
        raw_type.clone()
    };

    let (is_constant, default_value) = match &schema.kind {
        SchemaKind::Constant(constant) => (
            true,
            (!constant.value.is_null()).then(|| constant.value_string()),
        ),
        _ => (false, None),
    };

    let parameter_reference = if parameter.is_client() {
        client_property_reference(parameter, &client_type, on_service_client, data_plane)
    } else {
        name.clone()
    };

    let collection_format = match parameter.style {
        Some(SerializationStyle::SpaceDelimited) => Some(CollectionFormat::Ssv),
        Some(SerializationStyle::PipeDelimited) => Some(CollectionFormat::Pipes),
        Some(SerializationStyle::TabDelimited) => Some(CollectionFormat::Tsv),
        Some(_) => Some(CollectionFormat::Csv),
        None if client_type.list_element().is_some() && wire_type.is_string() => Some(CollectionFormat::Csv),
        None => None,
    };

    Ok(ProxyMethodParameter {
        description: parameter_description(mappers, parameter, &name, data_plane)?,
        request_parameter_name: parameter.serialized_name().to_string(),
        name,
        raw_type,
        wire_type,
        client_type,
        location,
        required: parameter.required,
        nullable: parameter.nullable,
        is_constant,
        default_value,
        from_client: parameter.is_client(),
        parameter_reference,
        collection_format,
        explode: parameter.explode,
        already_encoded: parameter.skip_url_encoding,
        header_collection_prefix: parameter.header_collection_prefix.clone(),
        origin: parameter.origin.clone(),
    })
}

/// Protocol-method form of a parameter type: bodies travel as `BinaryData`, enums as strings.
pub fn remove_model_from_parameter(location: ParameterLocation, t: &IType) -> IType {
    if location == ParameterLocation::Body {
        return IType::binary_data();
    }
    match t {
        IType::Enum(_) => IType::string(),
        _ if matches!(t.list_element(), Some(IType::Enum(_))) => GenericType::list(IType::string()),
        _ => t.clone(),
    }
}

fn client_property_reference(
    parameter: &Parameter,
    client_type: &IType,
    on_service_client: bool,
    data_plane: bool,
) -> String {
    let caller = if on_service_client { "this" } else { "this.client" };
    if data_plane && parameter.is_api_version() {
        return format!("{caller}.getServiceVersion().getVersion()");
    }
    let property = naming::to_camel(&naming::remove_invalid_chars(&parameter.name));
    let getter = naming::getter_name(&property, client_type.is_boolean());
    format!("{caller}.{getter}()")
}

/// Implementation class wrapping an XML list body.
pub fn xml_wrapper_type(mappers: &Mappers, schema_id: &str) -> Result<IType, MapError> {
    let settings = mappers.settings();
    let schema = mappers.schema(schema_id)?;
    let element_name = match &schema.kind {
        SchemaKind::Array(array) => mappers.schema(&array.element_type)?.name().to_string(),
        _ => schema.name().to_string(),
    };
    let name = naming::to_pascal(&format!("{element_name}Wrapper"));
    let package = if settings.is_custom_type(&name) {
        settings.custom_types_package()
    } else {
        settings.package_for(&format!("{}.models", settings.implementation_subpackage))
    };
    Ok(ClassType::new(package, name).into_type())
}
