//! Modules generated from `schema/*.json` by `build.rs`. Each one sits at the
//! crate root under its package name, which is where generated `use` lines
//! expect imported schemas to live.

pub mod geo {
    include!(concat!(env!("OUT_DIR"), "/geo.rs"));
}

pub mod shapes {
    include!(concat!(env!("OUT_DIR"), "/shapes.rs"));
}
