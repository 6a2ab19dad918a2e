//! End-to-end round trips through JSON and RON, exercising the
//! discriminator protocol against a declared shape hierarchy.

use polytag::derive::Contract;
use polytag::{
    AccessStrategy, BridgeConfig, Contract as _, ContractDeserializer, ContractRegistry,
    ContractSerializer, Poly,
};
use serde::de::DeserializeSeed;

#[derive(Contract, Debug, Default, PartialEq)]
#[contract(default)]
pub struct Shape;

#[derive(Contract, Debug, Default, PartialEq)]
#[contract(extends = Shape, default)]
pub struct Circle {
    pub radius: f64,
}

#[derive(Contract, Debug, Default, PartialEq)]
#[contract(extends = Shape, default)]
pub struct Square {
    pub side: f64,
}

/// Registered and serializable, but never declared a subtype of `Shape`.
#[derive(Contract, Debug, Default, PartialEq)]
#[contract(default)]
pub struct EvilType {
    pub x: i32,
}

fn registry() -> ContractRegistry {
    let mut registry = ContractRegistry::new();
    registry.register::<Shape>();
    registry.register::<Circle>();
    registry.register::<Square>();
    registry.register::<EvilType>();
    registry
}

fn read_as_shape(
    registry: &ContractRegistry,
    json: &str,
) -> Result<Box<dyn polytag::Contracted>, serde_json::Error> {
    let mut deserializer = serde_json::Deserializer::from_str(json);
    ContractDeserializer::new::<Shape>(registry).deserialize(&mut deserializer)
}

#[test]
fn subtype_through_base_carries_discriminator() {
    let registry = registry();
    let circle = Circle { radius: 2.5 };

    let json = serde_json::to_string(&ContractSerializer::of(
        &circle,
        Shape::contract_type(),
        &registry,
    ))
    .unwrap();

    assert_eq!(json, r#"{"$type":"roundtrip::Circle","radius":2.5}"#);
}

#[test]
fn exact_type_has_no_discriminator() {
    let registry = registry();
    let circle = Circle { radius: 2.5 };

    let json = serde_json::to_string(&ContractSerializer::new(&circle, &registry)).unwrap();

    assert_eq!(json, r#"{"radius":2.5}"#);
}

#[test]
fn polymorphic_roundtrip_restores_the_exact_subtype() {
    let registry = registry();

    for (value, json) in [
        (
            Box::new(Circle { radius: 2.5 }) as Box<dyn polytag::Contracted>,
            r#"{"$type":"roundtrip::Circle","radius":2.5}"#,
        ),
        (
            Box::new(Square { side: 4.0 }),
            r#"{"$type":"roundtrip::Square","side":4.0}"#,
        ),
    ] {
        let written = serde_json::to_string(&ContractSerializer::of(
            value.as_ref(),
            Shape::contract_type(),
            &registry,
        ))
        .unwrap();
        assert_eq!(written, json);

        let back = read_as_shape(&registry, &written).unwrap();
        assert_eq!(back.ty().id(), value.ty().id());
    }

    let circle = read_as_shape(&registry, r#"{"$type":"roundtrip::Circle","radius":2.5}"#)
        .unwrap()
        .take::<Circle>()
        .unwrap();
    assert_eq!(circle, Circle { radius: 2.5 });
}

#[test]
fn discriminator_injection_is_rejected() {
    let registry = registry();

    let err = read_as_shape(&registry, r#"{"$type":"roundtrip::EvilType","x":1}"#).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("not a declared subtype"), "{msg}");
    assert!(msg.contains("roundtrip::EvilType"), "{msg}");
}

#[test]
fn self_naming_discriminator_is_rejected() {
    let registry = registry();

    let err = read_as_shape(&registry, r#"{"$type":"roundtrip::Shape"}"#).unwrap_err();
    assert!(err.to_string().contains("not a declared subtype"));
}

#[test]
fn unresolvable_discriminator_is_rejected() {
    let registry = registry();

    let err = read_as_shape(&registry, r#"{"$type":"no::Such","x":1}"#).unwrap_err();
    assert!(err.to_string().contains("unknown type tag"));
}

#[test]
fn undeclared_type_cannot_serialize() {
    let mut registry = ContractRegistry::new();
    registry.register::<Shape>();

    let circle = Circle { radius: 1.0 };
    let err = serde_json::to_string(&ContractSerializer::of(
        &circle,
        Shape::contract_type(),
        &registry,
    ))
    .unwrap_err();
    assert!(err.to_string().contains("must be declared serializable"));
}

#[test]
fn undeclared_type_cannot_deserialize() {
    let registry = ContractRegistry::new();

    let mut deserializer = serde_json::Deserializer::from_str(r#"{"x":1}"#);
    let err = ContractDeserializer::new::<EvilType>(&registry)
        .deserialize(&mut deserializer)
        .unwrap_err();
    assert!(err.to_string().contains("must be declared serializable"));
}

#[test]
fn unknown_properties_are_skipped() {
    let registry = registry();

    let mut deserializer =
        serde_json::Deserializer::from_str(r#"{"radius":2.5,"color":"red","layers":[1,2,3]}"#);
    let circle = ContractDeserializer::new::<Circle>(&registry)
        .deserialize(&mut deserializer)
        .unwrap()
        .take::<Circle>()
        .unwrap();
    assert_eq!(circle, Circle { radius: 2.5 });
}

#[test]
fn late_discriminator_is_an_ordinary_unknown_property() {
    let registry = registry();

    // The reserved key only dispatches as the first property.
    let value = read_as_shape(&registry, r#"{"radius":1.0,"$type":"roundtrip::Square"}"#).unwrap();
    assert!(value.as_ref().is::<Shape>());
}

#[test]
fn empty_object_constructs_the_declared_type() {
    let registry = registry();

    let mut deserializer = serde_json::Deserializer::from_str("{}");
    let circle = ContractDeserializer::new::<Circle>(&registry)
        .deserialize(&mut deserializer)
        .unwrap()
        .take::<Circle>()
        .unwrap();
    assert_eq!(circle, Circle::default());
}

#[test]
fn non_object_input_is_an_unexpected_token() {
    let registry = registry();

    let mut deserializer = serde_json::Deserializer::from_str("[1,2]");
    assert!(
        ContractDeserializer::new::<Circle>(&registry)
            .deserialize(&mut deserializer)
            .is_err()
    );
}

#[test]
fn poly_handle_roundtrips_through_the_global_host() {
    let shape: Poly<Shape> = Poly::new(Circle { radius: 2.5 });
    let json = serde_json::to_string(&shape).unwrap();
    assert_eq!(json, r#"{"$type":"roundtrip::Circle","radius":2.5}"#);

    let back: Poly<Shape> = serde_json::from_str(&json).unwrap();
    assert!(back.is::<Circle>());
    assert_eq!(back.downcast_ref::<Circle>(), Some(&Circle { radius: 2.5 }));

    // Exactly declared: no discriminator on the wire.
    let circle: Poly<Circle> = Poly::new(Circle { radius: 2.5 });
    assert_eq!(
        serde_json::to_string(&circle).unwrap(),
        r#"{"radius":2.5}"#
    );
}

#[test]
fn poly_handle_nests_inside_plain_serde_types() {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Drawing {
        name: String,
        primary: Poly<Shape>,
    }

    let drawing = Drawing {
        name: "sketch".to_owned(),
        primary: Poly::new(Square { side: 4.0 }),
    };
    let json = serde_json::to_string(&drawing).unwrap();
    assert_eq!(
        json,
        r#"{"name":"sketch","primary":{"$type":"roundtrip::Square","side":4.0}}"#
    );

    let back: Drawing = serde_json::from_str(&json).unwrap();
    assert_eq!(back.primary.downcast_ref::<Square>(), Some(&Square { side: 4.0 }));
}

#[test]
fn dynamic_strategy_produces_identical_wire_output() {
    let mut registry = ContractRegistry::with_config(
        BridgeConfig::new().access_strategy(AccessStrategy::Dynamic),
    );
    registry.register::<Shape>();
    registry.register::<Circle>();

    let circle = Circle { radius: 2.5 };
    let json = serde_json::to_string(&ContractSerializer::of(
        &circle,
        Shape::contract_type(),
        &registry,
    ))
    .unwrap();
    assert_eq!(json, r#"{"$type":"roundtrip::Circle","radius":2.5}"#);

    let back = read_as_shape(&registry, &json).unwrap().take::<Circle>().unwrap();
    assert_eq!(back, circle);
}

#[test]
fn ron_host_format_roundtrips() {
    let registry = registry();
    let circle = Circle { radius: 2.5 };

    let written = ron::to_string(&ContractSerializer::of(
        &circle,
        Shape::contract_type(),
        &registry,
    ))
    .unwrap();

    let mut deserializer = ron::Deserializer::from_str(&written).unwrap();
    let back = ContractDeserializer::new::<Shape>(&registry)
        .deserialize(&mut deserializer)
        .unwrap()
        .take::<Circle>()
        .unwrap();
    assert_eq!(back, circle);
}
