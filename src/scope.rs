//! Configuration scope resolution
//!
//! Objects live either under the shared root of the management plane or
//! under a named device group. Resolution is local bookkeeping: a named
//! group is registered with the resolver the first time it is referenced
//! and the same handle is returned for every later reference. Whether the
//! group exists remotely is the device's concern, surfaced by the first
//! remote call that uses it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A named device group registered within a session
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceGroup {
    /// Group name as given by the caller
    pub name: String,
}

/// The configuration namespace a remote operation targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The shared/global root
    Shared,
    /// A named device group
    Group(Arc<DeviceGroup>),
}

impl Scope {
    /// Scope name as the management plane expects it
    pub fn name(&self) -> &str {
        match self {
            Scope::Shared => "shared",
            Scope::Group(group) => &group.name,
        }
    }

    /// True for the shared root
    pub fn is_shared(&self) -> bool {
        matches!(self, Scope::Shared)
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Maps scope names to handles, registering device groups on first use
#[derive(Debug, Default)]
pub struct ScopeResolver {
    groups: Mutex<HashMap<String, Arc<DeviceGroup>>>,
}

impl ScopeResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a scope name to a handle
    ///
    /// `"shared"` and `"-shared"` (any case) resolve to the shared root.
    /// Any other name resolves to a device-group handle, registered exactly
    /// once; repeated calls with the same name return a handle to the same
    /// registered group.
    pub fn resolve(&self, name: &str) -> Scope {
        if name.eq_ignore_ascii_case("shared") || name.eq_ignore_ascii_case("-shared") {
            return Scope::Shared;
        }

        let mut groups = self.groups.lock().expect("scope registry poisoned");
        let group = groups
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(DeviceGroup {
                    name: name.to_string(),
                })
            })
            .clone();
        Scope::Group(group)
    }

    /// Number of device groups registered so far
    pub fn registered_count(&self) -> usize {
        self.groups.lock().expect("scope registry poisoned").len()
    }
}
