// example/src/main.rs

use polyglot::{Decode, Encode, WireError};
use polyglot_example::{geo, shapes};

fn main() -> Result<(), WireError> {
    let shape = shapes::Shape {
        kind: shapes::Kind::Branch,
        name: Some("triangle".to_string()),
        path: vec![geo::Point { x: 0, y: 0 }, geo::Point { x: 4, y: 0 }, geo::Point { x: 0, y: 3 }],
        unit: geo::Unit::Foot,
        ..shapes::Shape::default()
    };

    let bytes = shape.encode();
    println!("encoded {} bytes: {:?}", bytes.len(), bytes);

    let decoded = shapes::Shape::decode(&bytes)?;
    println!("name    = {:?}", decoded.name);
    println!("unit    = {:?}", decoded.unit);
    for (i, point) in decoded.path.iter().enumerate() {
        println!("  path[{}] = ({}, {})", i, point.x, point.y);
    }
    Ok(())
}
