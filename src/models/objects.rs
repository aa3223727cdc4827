//! Address object and address group models
//!
//! These models carry the caller-supplied object definitions through the
//! engine. Validation covers what the engine requires before submission:
//! a usable name and exactly one value shape per object.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Maximum length of an object name accepted by the management plane
pub const MAX_NAME_LEN: usize = 63;

/// The closed set of object collections the engine manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    /// Address objects (ip-netmask, fqdn or ip-range)
    Address,
    /// Static or dynamic address groups
    AddressGroup,
}

impl ObjectKind {
    /// Collection path segment on the management API
    pub fn collection(self) -> &'static str {
        match self {
            ObjectKind::Address => "addresses",
            ObjectKind::AddressGroup => "address-groups",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKind::Address => write!(f, "address"),
            ObjectKind::AddressGroup => write!(f, "address-group"),
        }
    }
}

/// An address object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Object name
    pub name: String,

    /// IP address or network in CIDR notation
    #[serde(default, alias = "ip-netmask", skip_serializing_if = "Option::is_none")]
    pub ip_netmask: Option<String>,

    /// Fully qualified domain name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,

    /// IP range in `start-end` form
    #[serde(default, alias = "ip-range", skip_serializing_if = "Option::is_none")]
    pub ip_range: Option<String>,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tags attached to the object
    #[serde(default, alias = "tag", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Address {
    /// Create an address with only a name set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the ip-netmask value
    pub fn with_ip_netmask(mut self, value: impl Into<String>) -> Self {
        self.ip_netmask = Some(value.into());
        self
    }

    /// Set the fqdn value
    pub fn with_fqdn(mut self, value: impl Into<String>) -> Self {
        self.fqdn = Some(value.into());
        self
    }

    /// Set the ip-range value
    pub fn with_ip_range(mut self, value: impl Into<String>) -> Self {
        self.ip_range = Some(value.into());
        self
    }

    /// The address type label and value, as the management plane names them
    pub fn value(&self) -> Option<(&'static str, &str)> {
        if let Some(v) = &self.ip_netmask {
            Some(("ip-netmask", v))
        } else if let Some(v) = &self.fqdn {
            Some(("fqdn", v))
        } else if let Some(v) = &self.ip_range {
            Some(("ip-range", v))
        } else {
            None
        }
    }

    /// Check the object is well-formed enough to submit
    pub fn validate(&self) -> Result<(), EngineError> {
        validate_name(&self.name)?;

        let provided = [
            self.ip_netmask.is_some(),
            self.fqdn.is_some(),
            self.ip_range.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        if provided == 0 {
            return Err(EngineError::InvalidObject(format!(
                "address '{}': one of ip_netmask, fqdn or ip_range must be provided",
                self.name
            )));
        }
        if provided > 1 {
            return Err(EngineError::InvalidObject(format!(
                "address '{}': only one of ip_netmask, fqdn or ip_range may be provided",
                self.name
            )));
        }

        if let Some(value) = &self.ip_netmask {
            validate_ip_netmask(&self.name, value)?;
        }
        if let Some(value) = &self.ip_range {
            validate_ip_range(&self.name, value)?;
        }

        Ok(())
    }
}

/// An address group, either static (member list) or dynamic (filter)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressGroup {
    /// Group name
    pub name: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Member object names for a static group
    #[serde(default, alias = "static", skip_serializing_if = "Option::is_none")]
    pub static_members: Option<Vec<String>>,

    /// Match filter expression for a dynamic group
    #[serde(default, alias = "dynamic", skip_serializing_if = "Option::is_none")]
    pub dynamic_filter: Option<String>,

    /// Tags attached to the group
    #[serde(default, alias = "tag", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl AddressGroup {
    /// Create a group with only a name set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the static member list
    pub fn with_static_members(mut self, members: Vec<String>) -> Self {
        self.static_members = Some(members);
        self
    }

    /// Set the dynamic filter expression
    pub fn with_dynamic_filter(mut self, filter: impl Into<String>) -> Self {
        self.dynamic_filter = Some(filter.into());
        self
    }

    /// Check the group is well-formed enough to submit
    pub fn validate(&self) -> Result<(), EngineError> {
        validate_name(&self.name)?;

        match (&self.static_members, &self.dynamic_filter) {
            (Some(_), Some(_)) => Err(EngineError::InvalidObject(format!(
                "group '{}': cannot be both static and dynamic",
                self.name
            ))),
            (None, None) => Err(EngineError::InvalidObject(format!(
                "group '{}': either static_members or dynamic_filter must be provided",
                self.name
            ))),
            (Some(members), None) if members.is_empty() => {
                Err(EngineError::InvalidObject(format!(
                    "group '{}': static member list is empty",
                    self.name
                )))
            }
            _ => Ok(()),
        }
    }
}

/// A unit of work accepted by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigObject {
    /// An address object
    Address(Address),
    /// An address group
    Group(AddressGroup),
}

impl ConfigObject {
    /// Object name
    pub fn name(&self) -> &str {
        match self {
            ConfigObject::Address(addr) => &addr.name,
            ConfigObject::Group(group) => &group.name,
        }
    }

    /// Which collection this object belongs to
    pub fn kind(&self) -> ObjectKind {
        match self {
            ConfigObject::Address(_) => ObjectKind::Address,
            ConfigObject::Group(_) => ObjectKind::AddressGroup,
        }
    }

    /// Validate the wrapped object
    pub fn validate(&self) -> Result<(), EngineError> {
        match self {
            ConfigObject::Address(addr) => addr.validate(),
            ConfigObject::Group(group) => group.validate(),
        }
    }
}

impl From<Address> for ConfigObject {
    fn from(addr: Address) -> Self {
        ConfigObject::Address(addr)
    }
}

impl From<AddressGroup> for ConfigObject {
    fn from(group: AddressGroup) -> Self {
        ConfigObject::Group(group)
    }
}

/// Bulk-load document: a YAML file carrying addresses and groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ObjectsFile {
    /// Address objects to load
    #[serde(default)]
    pub addresses: Vec<Address>,

    /// Address groups to load
    #[serde(default)]
    pub address_groups: Vec<AddressGroup>,
}

impl ObjectsFile {
    /// Parse a bulk-load document from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Validate every object, reporting the first failure with its position
    pub fn validate(&self) -> Result<(), EngineError> {
        for (idx, addr) in self.addresses.iter().enumerate() {
            addr.validate().map_err(|e| {
                EngineError::InvalidObject(format!("addresses[{}]: {}", idx, e))
            })?;
        }
        for (idx, group) in self.address_groups.iter().enumerate() {
            group.validate().map_err(|e| {
                EngineError::InvalidObject(format!("address_groups[{}]: {}", idx, e))
            })?;
        }
        Ok(())
    }

    /// True when the document carries no objects at all
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty() && self.address_groups.is_empty()
    }
}

fn validate_name(name: &str) -> Result<(), EngineError> {
    if name.is_empty() {
        return Err(EngineError::InvalidObject(
            "name must be a non-empty string".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::InvalidObject(format!(
            "name '{}' exceeds {} characters",
            name, MAX_NAME_LEN
        )));
    }
    Ok(())
}

fn validate_ip_netmask(name: &str, value: &str) -> Result<(), EngineError> {
    let invalid = || {
        EngineError::InvalidObject(format!(
            "address '{}': invalid IP address or network: {}",
            name, value
        ))
    };

    match value.split_once('/') {
        None => {
            value.parse::<IpAddr>().map_err(|_| invalid())?;
        }
        Some((host, prefix)) => {
            let addr = host.parse::<IpAddr>().map_err(|_| invalid())?;
            let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
            let max_prefix = if addr.is_ipv4() { 32 } else { 128 };
            if prefix > max_prefix {
                return Err(invalid());
            }
        }
    }
    Ok(())
}

fn validate_ip_range(name: &str, value: &str) -> Result<(), EngineError> {
    let invalid = || {
        EngineError::InvalidObject(format!(
            "address '{}': invalid IP range: {} (expected start-end)",
            name, value
        ))
    };

    let (start, end) = value.split_once('-').ok_or_else(invalid)?;
    start.trim().parse::<IpAddr>().map_err(|_| invalid())?;
    end.trim().parse::<IpAddr>().map_err(|_| invalid())?;
    Ok(())
}
