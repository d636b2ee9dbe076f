use clientgen_core::codemodel::{self, HttpMethod, ParameterLocation};
use clientgen_core::config::Settings;
use clientgen_core::model::{ClientMethodType, IType};

const INTS_ONLY: &str = include_str!("fixtures/ints_only.yaml");

fn client() -> clientgen_core::model::Client {
    let model = codemodel::from_yaml(INTS_ONLY).expect("should load fixture");
    clientgen_core::map_client(model, Settings::default()).expect("should map")
}

#[test]
fn enum_keeps_integer_values() {
    let client = client();
    assert_eq!(client.enums.len(), 1);
    let prop = &client.enums[0];
    assert_eq!(prop.name, "IntsOnlyProp");
    assert!(!prop.expandable);
    assert_eq!(prop.element_type.to_string(), "int");
    let values: Vec<&str> = prop.values.iter().map(|v| v.value.as_str()).collect();
    assert_eq!(values, vec!["1", "2", "3"]);
}

#[test]
fn model_property_uses_the_enum() {
    let client = client();
    let model = client
        .models
        .iter()
        .find(|m| m.name == "IntsOnlyModel")
        .expect("should have model");
    assert_eq!(model.package, "com.example.models");
    let prop = &model.properties[0];
    assert_eq!(prop.serialized_name, "prop");
    let IType::Enum(e) = &prop.client_type else {
        panic!("expected enum property, got {}", prop.client_type);
    };
    assert_eq!(e.element_type.to_string(), "int");
}

#[test]
fn group_is_pluralized() {
    let client = client();
    let service = client.service_client.expect("should have service client");
    assert_eq!(service.method_groups.len(), 1);
    let group = &service.method_groups[0];
    assert_eq!(group.interface_name, "IntsOnlies");
    assert_eq!(group.proxy.name, "IntsOnliesService");
    assert_eq!(group.proxy.base_url, "{endpoint}");
}

#[test]
fn get_returns_the_model() {
    let client = client();
    let service = client.service_client.expect("should have service client");
    let methods = &service.method_groups[0].client_methods;

    let get_async = methods
        .iter()
        .find(|m| m.name == "getAsync" && m.method_type == ClientMethodType::SimpleAsync)
        .expect("should have getAsync");
    assert_eq!(get_async.return_value.return_type.to_string(), "Mono<IntsOnlyModel>");

    let get = methods
        .iter()
        .find(|m| m.name == "get" && m.method_type == ClientMethodType::SimpleSync)
        .expect("should have get");
    assert_eq!(get.return_value.return_type.to_string(), "IntsOnlyModel");
}

#[test]
fn put_accepts_the_model_as_json_body() {
    let client = client();
    let service = client.service_client.expect("should have service client");
    let group = &service.method_groups[0];

    let proxy = group
        .proxy
        .methods
        .iter()
        .find(|m| m.name == "put")
        .expect("should have put proxy method");
    assert_eq!(proxy.http_method, HttpMethod::Post);
    assert_eq!(proxy.request_content_type, "application/json");
    assert_eq!(proxy.expected_status_codes, vec![204]);
    let body = proxy
        .parameters
        .iter()
        .find(|p| p.location == ParameterLocation::Body)
        .expect("should have body parameter");
    assert_eq!(body.client_type.to_string(), "IntsOnlyModel");

    for name in ["putAsync", "put"] {
        let method = group
            .client_methods
            .iter()
            .find(|m| m.name == name)
            .unwrap_or_else(|| panic!("should have {name}"));
        let input = method
            .parameters
            .iter()
            .find(|p| p.name == "input")
            .expect("should take the model");
        assert!(input.required);
        assert_eq!(input.client_type.to_string(), "IntsOnlyModel");
    }
}
