//! The façade: JSON IR in, compiled plans and dynamic values out.

use polyglot::{compile_json, plans_to_json, CompileError, ImportTable, Value};

const NODE_IR: &str = r#"{
    "name": "tree.proto",
    "enums": [{ "name": "Kind", "values": [{ "name": "LEAF", "value": 0 }, { "name": "BRANCH", "value": 1 }] }],
    "messages": [{
        "name": "Node",
        "fields": [
            { "name": "kind", "number": 1, "type": { "named": "Kind" } },
            { "name": "label", "number": 2, "type": { "optional": { "scalar": "string" } } },
            { "name": "children", "number": 3, "type": { "repeated": { "named": "Node" } } },
            { "name": "weights", "number": 4, "type": { "map": { "key": { "scalar": "uint32" }, "value": { "scalar": "double" } } } }
        ]
    }]
}"#;

#[test]
fn compiles_json_documents() {
    let compiled = compile_json(NODE_IR, &ImportTable::new()).unwrap();
    let leaf = Value::object("Node", [("kind", Value::Enum(0)), ("label", Value::String("x".into()))]);
    // kind, present label, empty children frame, zero weights
    assert_eq!(leaf.encode_named(&compiled).unwrap(), [0, 1, 1, b'x', 0, 0]);

    let err = compile_json("{ \"name\": 3 }", &ImportTable::new()).unwrap_err();
    assert!(matches!(err, CompileError::Json(_)), "got {:?}", err);
}

#[test]
fn plans_print_as_json() {
    let compiled = compile_json(NODE_IR, &ImportTable::new()).unwrap();
    let json = plans_to_json(&compiled).unwrap();
    assert!(json.contains("\"name\": \"Node\""));
    assert!(json.contains("\"length\": \"bytes\""));
}
