//! Contract-model behavior: shadowing, accessor edge cases, naming,
//! custom member codecs, abstract hierarchies, and collection shapes.

use std::time::Duration;

use polytag::derive::Contract;
use polytag::{
    BridgeConfig, Contract as _, ContractDeserializer, ContractRegistry, ContractSerializer,
    TagFormat,
};
use serde::de::DeserializeSeed;

fn to_json(value: &ContractSerializer<'_>) -> String {
    serde_json::to_string(value).unwrap()
}

fn from_json<B: polytag::Contract>(
    registry: &ContractRegistry,
    json: &str,
) -> Box<dyn polytag::Contracted> {
    let mut deserializer = serde_json::Deserializer::from_str(json);
    ContractDeserializer::new::<B>(registry)
        .deserialize(&mut deserializer)
        .unwrap()
}

// -----------------------------------------------------------------------------
// Shadowing and inherited members

#[derive(Contract, Debug, Default, PartialEq)]
#[contract(default)]
pub struct Node {
    pub id: i32,
    pub label: String,
}

/// Re-declares `id` at a wider type and drops `label`.
#[derive(Contract, Debug, Default, PartialEq)]
#[contract(extends = Node, default)]
pub struct WideNode {
    pub id: i64,
    pub weight: f64,
}

fn node_registry() -> ContractRegistry {
    let mut registry = ContractRegistry::new();
    registry.register::<Node>();
    registry.register::<WideNode>();
    registry
}

#[test]
fn shadowed_member_reflects_the_derived_declaration() {
    let registry = node_registry();
    let resolved = registry
        .resolved_contract(core::any::TypeId::of::<WideNode>())
        .unwrap();

    let ids: Vec<_> = resolved
        .members()
        .iter()
        .filter(|m| m.declared_name() == "id")
        .collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(ids[0].ty(), core::any::TypeId::of::<i64>());

    // The ancestor-declared `label` is still part of the member list, but
    // has no storage on `WideNode`.
    let label = resolved.member_for("label").unwrap();
    assert!(!label.accessor().is_readable());
    assert!(!label.accessor().is_settable());
}

#[test]
fn inherited_member_without_storage_is_skipped_both_ways() {
    let registry = node_registry();
    let node = WideNode { id: 9, weight: 1.5 };

    let json = to_json(&ContractSerializer::new(&node, &registry));
    assert_eq!(json, r#"{"id":9,"weight":1.5}"#);

    let back = from_json::<WideNode>(&registry, r#"{"id":9,"weight":1.5,"label":"ignored"}"#)
        .take::<WideNode>()
        .unwrap();
    assert_eq!(back, node);
}

// -----------------------------------------------------------------------------
// Read-only / write-only members

#[derive(Contract, Debug, Default, PartialEq)]
#[contract(default)]
pub struct Document {
    #[contract(readonly)]
    pub id: u64,
    #[contract(writeonly)]
    pub secret: String,
    pub body: String,
}

#[test]
fn readonly_members_are_written_but_never_assigned() {
    let mut registry = ContractRegistry::new();
    registry.register::<Document>();

    let doc = Document {
        id: 7,
        secret: "s".to_owned(),
        body: "text".to_owned(),
    };
    // `secret` is write-only: absent from output.
    let json = to_json(&ContractSerializer::new(&doc, &registry));
    assert_eq!(json, r#"{"id":7,"body":"text"}"#);

    // `id` is read-only: the incoming value is parsed and discarded.
    let back = from_json::<Document>(&registry, r#"{"id":99,"secret":"w","body":"text"}"#)
        .take::<Document>()
        .unwrap();
    assert_eq!(back.id, 0);
    assert_eq!(back.secret, "w");
    assert_eq!(back.body, "text");
}

// -----------------------------------------------------------------------------
// Naming

#[derive(Contract, Debug, Default, PartialEq)]
#[contract(default)]
pub struct Account {
    pub user_name: String,
    #[contract(rename = "Account-Id")]
    pub id: u64,
}

#[test]
fn camel_case_policy_and_case_insensitive_read() {
    let mut registry = ContractRegistry::new();
    registry.register::<Account>();

    let account = Account {
        user_name: "ada".to_owned(),
        id: 3,
    };
    let json = to_json(&ContractSerializer::new(&account, &registry));
    assert_eq!(json, r#"{"userName":"ada","Account-Id":3}"#);

    // Matching is case-insensitive, and explicit renames bypass the policy.
    let back = from_json::<Account>(&registry, r#"{"USERNAME":"ada","account-id":3}"#)
        .take::<Account>()
        .unwrap();
    assert_eq!(back, account);
}

// -----------------------------------------------------------------------------
// Custom member codec

mod secs {
    use std::time::Duration;

    pub fn serialize<S: serde::Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(serde::Deserialize::deserialize(
            deserializer,
        )?))
    }
}

#[derive(Contract, Debug, Default, PartialEq)]
#[contract(default)]
pub struct Job {
    #[contract(with = "secs")]
    pub timeout: Duration,
}

#[test]
fn custom_member_codec_applies_on_both_sides() {
    let mut registry = ContractRegistry::new();
    registry.register::<Job>();

    let job = Job {
        timeout: Duration::from_secs(30),
    };
    let json = to_json(&ContractSerializer::new(&job, &registry));
    assert_eq!(json, r#"{"timeout":30}"#);

    let back = from_json::<Job>(&registry, &json).take::<Job>().unwrap();
    assert_eq!(back, job);

    let resolved = registry
        .resolved_contract(core::any::TypeId::of::<Job>())
        .unwrap();
    assert!(resolved.member_for("timeout").unwrap().has_custom_codec());
}

// -----------------------------------------------------------------------------
// Enum members

#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub enum Color {
    #[default]
    Red,
    Green,
}

#[derive(Contract, Debug, Default, PartialEq)]
#[contract(default)]
pub struct Pixel {
    pub color: Color,
}

#[test]
fn enum_members_serialize_as_variant_names() {
    let mut registry = ContractRegistry::new();
    registry.register::<Pixel>();

    let pixel = Pixel { color: Color::Green };
    let json = to_json(&ContractSerializer::new(&pixel, &registry));
    assert_eq!(json, r#"{"color":"Green"}"#);

    let back = from_json::<Pixel>(&registry, &json).take::<Pixel>().unwrap();
    assert_eq!(back, pixel);
}

// -----------------------------------------------------------------------------
// Required members

#[derive(Contract, Debug, Default, PartialEq)]
#[contract(default)]
pub struct Envelope {
    #[contract(required)]
    pub kind: String,
    pub note: String,
}

#[test]
fn omitted_required_member_is_rejected() {
    let mut registry = ContractRegistry::new();
    registry.register::<Envelope>();

    let back = from_json::<Envelope>(&registry, r#"{"kind":"a"}"#)
        .take::<Envelope>()
        .unwrap();
    assert_eq!(back.kind, "a");

    let mut deserializer = serde_json::Deserializer::from_str(r#"{"note":"n"}"#);
    let err = ContractDeserializer::new::<Envelope>(&registry)
        .deserialize(&mut deserializer)
        .unwrap_err();
    assert!(err.to_string().contains("missing required member `kind`"));
}

// -----------------------------------------------------------------------------
// Abstract hierarchy

#[derive(Contract, Debug, Default, PartialEq)]
#[contract(default)]
pub struct Figure;

#[derive(Contract, Debug, Default, PartialEq)]
#[contract(extends = Figure, abstract_type)]
pub struct Conic;

#[derive(Contract, Debug, Default, PartialEq)]
#[contract(extends = Conic, default)]
pub struct Oval {
    pub eccentricity: f64,
}

fn figure_registry() -> ContractRegistry {
    let mut registry = ContractRegistry::new();
    registry.register::<Figure>();
    registry.register::<Conic>();
    registry.register::<Oval>();
    registry
}

#[test]
fn abstract_types_are_traversed_but_excluded() {
    let registry = figure_registry();
    let subtypes = registry.subtypes(core::any::TypeId::of::<Figure>());

    assert!(subtypes.contains(&core::any::TypeId::of::<Oval>()));
    assert!(!subtypes.contains(&core::any::TypeId::of::<Conic>()));
}

#[test]
fn abstract_discriminator_is_rejected_and_concrete_accepted() {
    let registry = figure_registry();

    let mut deserializer = serde_json::Deserializer::from_str(
        r#"{"$type":"contract_model::Conic"}"#,
    );
    let err = ContractDeserializer::new::<Figure>(&registry)
        .deserialize(&mut deserializer)
        .unwrap_err();
    assert!(err.to_string().contains("not a declared subtype"));

    let oval = from_json::<Figure>(
        &registry,
        r#"{"$type":"contract_model::Oval","eccentricity":0.5}"#,
    )
    .take::<Oval>()
    .unwrap();
    assert_eq!(oval, Oval { eccentricity: 0.5 });
}

#[test]
fn polymorphism_descriptor_lists_concrete_variants_only() {
    let registry = figure_registry();
    let resolved = registry
        .resolved_contract(core::any::TypeId::of::<Figure>())
        .unwrap();

    let poly = resolved.poly().unwrap();
    assert_eq!(poly.discriminator, "$type");
    assert_eq!(poly.variants.len(), 1);
    assert_eq!(poly.variants[0].tag, "contract_model::Oval");

    // A leaf type has no polymorphism options at all.
    let leaf = registry
        .resolved_contract(core::any::TypeId::of::<Oval>())
        .unwrap();
    assert!(leaf.poly().is_none());
}

// -----------------------------------------------------------------------------
// Collection shapes

#[derive(Contract, serde::Serialize, serde::Deserialize, Debug, Default, PartialEq)]
#[contract(collection)]
pub struct Tags {
    pub values: Vec<String>,
}

#[derive(Contract, Debug, Default, PartialEq)]
#[contract(collection, ignore_list, default)]
pub struct Bag {
    pub items: Vec<f64>,
}

#[test]
fn collection_contract_defers_to_native_serde() {
    let mut registry = ContractRegistry::new();
    registry.register::<Tags>();

    let tags = Tags {
        values: vec!["a".to_owned(), "b".to_owned()],
    };
    let json = to_json(&ContractSerializer::new(&tags, &registry));
    assert_eq!(json, r#"{"values":["a","b"]}"#);

    let back = from_json::<Tags>(&registry, &json).take::<Tags>().unwrap();
    assert_eq!(back, tags);
}

#[test]
fn ignore_list_forces_the_object_path() {
    let mut registry = ContractRegistry::new();
    registry.register::<Bag>();

    assert!(matches!(
        registry.resolve(core::any::TypeId::of::<Bag>()).unwrap(),
        polytag::TypeResolution::Object(_),
    ));

    let bag = Bag {
        items: vec![1.0, 2.0],
    };
    let json = to_json(&ContractSerializer::new(&bag, &registry));
    assert_eq!(json, r#"{"items":[1.0,2.0]}"#);

    let back = from_json::<Bag>(&registry, &json).take::<Bag>().unwrap();
    assert_eq!(back, bag);
}

// -----------------------------------------------------------------------------
// Compact tag format

#[test]
fn short_tags_roundtrip_through_the_name_index() {
    let mut registry =
        ContractRegistry::with_config(BridgeConfig::new().tag_format(TagFormat::Short));
    registry.register::<Figure>();
    registry.register::<Conic>();
    registry.register::<Oval>();

    let oval = Oval { eccentricity: 0.5 };
    let json = serde_json::to_string(&ContractSerializer::of(
        &oval,
        Figure::contract_type(),
        &registry,
    ))
    .unwrap();
    assert_eq!(json, r#"{"$type":"Oval","eccentricity":0.5}"#);

    let back = from_json::<Figure>(&registry, &json).take::<Oval>().unwrap();
    assert_eq!(back, oval);
}
