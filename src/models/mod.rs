//! Domain models for firewall configuration objects

pub mod objects;

pub use objects::{Address, AddressGroup, ConfigObject, ObjectKind, ObjectsFile, MAX_NAME_LEN};
