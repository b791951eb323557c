//! The modules in this crate are real `polyglotc` output. These tests hold
//! them to the plan interpreter byte for byte.

use std::sync::Arc;

use polyglot::compiler::{compile_schema_to_rust, RustOptions};
use polyglot::{compile_json, CompiledSchema, Decode, Encode, ImportTable, Value};
use polyglot_example::{geo, shapes};

const GEO: &str = include_str!("../schema/geo.json");
const SHAPES: &str = include_str!("../schema/shapes.json");

fn compile_schemas() -> (Arc<CompiledSchema>, CompiledSchema) {
    let mut table = ImportTable::new();
    let geo = table.publish(compile_json(GEO, &table).unwrap()).unwrap();
    let shapes = compile_json(SHAPES, &table).unwrap();
    (geo, shapes)
}

fn sample() -> shapes::Shape {
    shapes::Shape {
        kind:    shapes::Kind::Branch,
        name:    Some("square".to_string()),
        origin:  geo::Point { x: -1, y: 2 },
        path:    vec![geo::Point { x: 3, y: 4 }, geo::Point::default()],
        unit:    geo::Unit::Foot,
        weights: [(2, 0.5), (1, -1.0)].into_iter().collect(),
        labels:  [(-3, "neg".to_string())].into_iter().collect(),
        tags:    vec!["a".to_string(), "bc".to_string()],
        ids:     vec![u64::MAX, 0],
        blob:    vec![0xde, 0xad],
        legacy:  9,
        parent:  Some(Box::new(shapes::Shape { kind: shapes::Kind::Unrecognized(7), ..shapes::Shape::default() })),
        result:  shapes::Result {
            final_: true,
            try_:   false,
            box_:   true,
            type_:  "t".to_string(),
            gen_:   300,
            match_: -5,
            self_:  1.5,
        },
        option:  Some(Box::new(shapes::Option {
            value: None,
            items: vec![shapes::Option::default()],
            text:  Some(Box::new(shapes::String { value: "s".to_string() })),
        })),
    }
}

fn sample_value() -> Value {
    let point = |x: i32, y: i32| Value::object("Point", [("x", Value::I32(x)), ("y", Value::I32(y))]);
    Value::object(
        "Shape",
        [
            ("kind", Value::Enum(1)),
            ("name", Value::String("square".into())),
            ("origin", point(-1, 2)),
            ("path", Value::Array(vec![point(3, 4), Value::Object("Point".into(), Default::default())])),
            ("unit", Value::Enum(1)),
            ("weights", Value::Map(vec![(Value::U32(1), Value::F64(-1.0)), (Value::U32(2), Value::F64(0.5))])),
            ("labels", Value::Map(vec![(Value::I64(-3), Value::String("neg".into()))])),
            ("tags", Value::Array(vec![Value::String("a".into()), Value::String("bc".into())])),
            ("ids", Value::Array(vec![Value::U64(u64::MAX), Value::U64(0)])),
            ("blob", Value::Bytes(vec![0xde, 0xad])),
            ("legacy", Value::I32(9)),
            ("parent", Value::object("Shape", [("kind", Value::Enum(7))])),
            (
                "result",
                Value::object(
                    "Result",
                    [
                        ("final", Value::Bool(true)),
                        ("try", Value::Bool(false)),
                        ("box", Value::Bool(true)),
                        ("type", Value::String("t".into())),
                        ("gen", Value::U64(300)),
                        ("match", Value::I32(-5)),
                        ("self", Value::F32(1.5)),
                    ],
                ),
            ),
            (
                "option",
                Value::object(
                    "Option",
                    [
                        ("items", Value::Array(vec![Value::Object("Option".into(), Default::default())])),
                        ("text", Value::object("String", [("value", Value::String("s".into()))])),
                    ],
                ),
            ),
        ],
    )
}

#[test]
fn built_modules_are_current_emitter_output() {
    let (geo, shapes) = compile_schemas();
    let options = RustOptions::default();
    assert_eq!(compile_schema_to_rust(&geo, &options).unwrap(), include_str!(concat!(env!("OUT_DIR"), "/geo.rs")));
    assert_eq!(
        compile_schema_to_rust(&shapes, &options).unwrap(),
        include_str!(concat!(env!("OUT_DIR"), "/shapes.rs"))
    );
}

#[test]
fn generated_code_matches_the_interpreter() {
    let (_geo, compiled) = compile_schemas();
    let typed = sample().encode();
    assert_eq!(sample_value().encode_named(&compiled).unwrap(), typed);

    // The deprecated field is written but neither reader keeps it.
    let cleared = shapes::Shape { legacy: 0, ..sample() };
    assert_eq!(shapes::Shape::decode(&typed).unwrap(), cleared);

    let decoded = Value::decode_named(&compiled, "Shape", &typed).unwrap();
    assert_eq!(decoded.get("legacy"), None);
    assert_eq!(decoded.encode_named(&compiled).unwrap(), cleared.encode());
}

#[test]
fn generated_decode_tolerates_short_and_long_input() {
    assert_eq!(shapes::Shape::decode(&[]).unwrap(), shapes::Shape::default());
    assert_eq!(
        shapes::Shape::decode(&[1]).unwrap(),
        shapes::Shape { kind: shapes::Kind::Branch, ..shapes::Shape::default() }
    );

    let mut bytes = sample().encode();
    bytes.extend_from_slice(&[0xff, 0xff]);
    assert_eq!(shapes::Shape::decode(&bytes).unwrap(), shapes::Shape { legacy: 0, ..sample() });
}

#[test]
fn reserved_and_std_names_round_trip() {
    let vec = shapes::Vec {
        items: vec![1, 2, 300],
        boxes: vec![shapes::Box { inner: Some(Box::new(shapes::Box { inner: None, flag: true })), flag: false }],
    };
    assert_eq!(shapes::Vec::decode(&vec.encode()).unwrap(), vec);

    let default = shapes::Default { kind: shapes::Kind::Branch };
    assert_eq!(shapes::Default::decode(&default.encode()).unwrap(), default);
    assert_eq!(shapes::Default::default().kind, shapes::Kind::Leaf);

    assert!(shapes::Empty::default().encode().is_empty());
    assert_eq!(shapes::Empty::decode(&[7]).unwrap(), shapes::Empty::default());
}

struct PathLength;

impl shapes::Shapes for PathLength {
    fn measure(&self, request: shapes::Shape) -> shapes::Result {
        shapes::Result { gen_: request.path.len() as u64, ..shapes::Result::default() }
    }
}

#[test]
fn services_become_traits() {
    use shapes::Shapes;

    let result = PathLength.measure(sample());
    assert_eq!(result.gen_, 2);
    assert!(!result.final_);
}
