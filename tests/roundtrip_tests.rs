//! Encode, write, reopen and decode whole graphs.

use std::sync::Once;

use rbxbin::chunks::SharedString;
use rbxbin::{
    Container, DecodeOptions, EncodeOptions, ErrorKind, Graph, Inspector, Property, PropertyValue,
    Rbx, Referent, decode, decode_with, encode, encode_with,
};
use tempfile::NamedTempFile;

static INIT: Once = Once::new();

/// Routes `tracing` output through the test harness; `RUST_LOG` picks the level.
fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn r(v: u128) -> Referent {
    Referent::new(v)
}

fn set(graph: &mut Graph, referent: u128, name: &str, value: PropertyValue) {
    let property = Property::from_value(&value).unwrap();
    graph.set_property(r(referent), name, property).unwrap();
}

/// A small place: two services, a model with parts, every value type.
fn sample_place() -> Graph {
    let mut g = Graph::new();
    g.insert(r(1), "Workspace", Some(Referent::ROOT)).unwrap();
    g.set_service(r(1), true).unwrap();
    g.insert(r(2), "Lighting", Some(Referent::ROOT)).unwrap();
    g.set_service(r(2), true).unwrap();
    g.insert(r(3), "Model", Some(r(1))).unwrap();
    for part in 4..=8 {
        g.insert(r(part), "Part", Some(r(3))).unwrap();
        set(&mut g, part, "Name", PropertyValue::String(format!("Part{part}").into_bytes()));
        set(&mut g, part, "Anchored", PropertyValue::Bool(part % 2 == 0));
        set(&mut g, part, "Transparency", PropertyValue::Float32(part as f32 * -0.25));
        set(&mut g, part, "Size", PropertyValue::Vector3([4.0, 1.0, part as f32]));
        set(&mut g, part, "Color", PropertyValue::Color3uint8([part as u8, 128, 255]));
        set(&mut g, part, "Material", PropertyValue::Enum(256 + part as u32));
        set(&mut g, part, "Tag", PropertyValue::Int64(-(part as i64) << 40));
        set(&mut g, part, "Target", PropertyValue::Referent((part != 4).then(|| r(part - 1))));
        set(&mut g, part, "Mesh", PropertyValue::SharedString(0));
    }
    set(&mut g, 3, "PrimaryPart", PropertyValue::Referent(Some(r(4))));
    set(&mut g, 2, "Brightness", PropertyValue::Float64(2.5));
    set(&mut g, 2, "Ambient", PropertyValue::Color3([0.5, 0.25, 0.0]));
    g.set_shared_strings(vec![SharedString::new([0xA5; 16], b"mesh data".to_vec())]);
    g
}

fn shape(graph: &Graph) -> Vec<(Referent, String, Option<Referent>)> {
    graph
        .descendants(graph.root())
        .map(|i| {
            (
                i.referent(),
                i.class_name().to_owned(),
                graph.parent(i).map(|p| p.referent()),
            )
        })
        .collect()
}

#[test]
fn encoded_graph_decodes_identically() {
    init_logging();
    let original = sample_place();
    let decoded = decode(&encode(&original).unwrap()).unwrap();

    assert_eq!(decoded.len(), original.len());
    assert_eq!(shape(&decoded), shape(&original));

    for instance in original.instances() {
        let copy = decoded.get_instance(instance.referent()).unwrap();
        assert_eq!(copy.is_service(), instance.is_service());
        for (name, property) in instance.properties() {
            assert_eq!(
                decoded.property_value(copy, name).unwrap(),
                property.value().unwrap(),
                "{}.{name}",
                instance.class_name()
            );
        }
    }
    assert_eq!(decoded.shared_strings(), original.shared_strings());
    assert!(decoded.warnings().is_empty());
}

#[test]
fn re_encoding_a_decoded_file_is_stable() {
    init_logging();
    let first = encode(&sample_place()).unwrap();
    let second = encode(&decode(&first).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn options_do_not_change_the_graph() {
    init_logging();
    let graph = sample_place();
    let plain = encode_with(&graph, &EncodeOptions::default().with_compress(false).with_parallel(false)).unwrap();
    let packed = encode_with(&graph, &EncodeOptions::default()).unwrap();
    assert!(packed.len() <= plain.len());

    let sequential = DecodeOptions::default().with_parallel(false);
    let a = decode_with(&plain, &sequential).unwrap();
    let b = decode_with(&packed, &DecodeOptions::default()).unwrap();
    assert_eq!(shape(&a), shape(&b));
}

#[test]
fn container_round_trip_keeps_payloads() {
    let bytes = encode(&sample_place()).unwrap();
    let container = Container::parse(&bytes).unwrap();
    assert!(container.is_terminated());

    let rewritten = container.to_bytes(&EncodeOptions::default()).unwrap();
    let again = Container::parse(&rewritten).unwrap();
    assert_eq!(again.chunks().len(), container.chunks().len());
    for (a, b) in container.chunks().iter().zip(again.chunks()) {
        assert_eq!(a.tag(), b.tag());
        assert_eq!(a.payload(), b.payload());
    }
}

#[test]
fn save_and_open_through_a_file() {
    init_logging();
    let graph = sample_place();
    let file = NamedTempFile::new().unwrap();

    Rbx::save(file.path(), &graph).unwrap();
    let reopened = Rbx::open(file.path()).unwrap();
    assert_eq!(shape(&reopened), shape(&graph));

    let report = Inspector::inspect_file(file.path()).unwrap();
    assert_eq!(report.instance_count, graph.len() as i32);
    assert_eq!(report.chunks.first().unwrap().tag, "SSTR");
}

#[test]
fn opening_a_short_file_is_truncated() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"<roblox!").unwrap();
    assert_eq!(Rbx::open(file.path()).unwrap_err().kind(), ErrorKind::Truncated);
}

#[test]
fn opening_a_missing_file_is_io() {
    let dir = tempfile::tempdir().unwrap();
    let err = Rbx::open(dir.path().join("nope.rbxl")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn wide_referents_cannot_be_written() {
    let mut graph = Graph::new();
    graph
        .insert(Referent::from_hex("00000000300000e00f00000000000001").unwrap(), "Folder", Some(Referent::ROOT))
        .unwrap();
    assert_eq!(encode(&graph).unwrap_err().kind(), ErrorKind::Unrepresentable);
}
