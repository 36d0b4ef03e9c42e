#[macro_export]
macro_rules! include_res {
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

/// DDL for the tables this service reads and writes.
pub const SCHEMA: &str = include_res!(str, "/schema.sql");
