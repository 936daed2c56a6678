//! Device directory: maps a device identifier to its display identity.
//!
//! The registry only consumes the [`DeviceDirectory`] trait. [`StaticDirectory`]
//! is an in-memory implementation filled by the caller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Display identity of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Device identifier, as it appears in telemetry.
    pub id: String,
    /// Human-readable name, exported as `friendly_name`.
    pub display_name: String,
    /// Group the device belongs to.
    pub group: String,
    /// Sensor name to alias table.
    #[serde(default)]
    pub sensor_aliases: HashMap<String, String>,
}

impl DeviceEntry {
    /// Creates an entry without sensor aliases.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            group: group.into(),
            sensor_aliases: HashMap::new(),
        }
    }

    /// Entry used when the directory does not know a device: the identifier
    /// stands in for its own name and group.
    #[must_use]
    pub fn synthesized(id: &str) -> Self {
        Self::new(id, id, id)
    }

    /// Adds a sensor alias and returns self for chaining.
    #[must_use]
    pub fn with_sensor_alias(mut self, sensor: impl Into<String>, alias: impl Into<String>) -> Self {
        self.sensor_aliases.insert(sensor.into(), alias.into());
        self
    }

    /// Returns the alias configured for a sensor, if any.
    #[must_use]
    pub fn sensor_alias(&self, sensor: &str) -> Option<&str> {
        self.sensor_aliases.get(sensor).map(String::as_str)
    }
}

/// Lookup of device identities.
pub trait DeviceDirectory: Send + Sync {
    /// Returns the entry for a device, or `None` if unknown.
    fn lookup(&self, device_id: &str) -> Option<DeviceEntry>;

    /// Resolves a device, synthesizing an entry on a miss.
    ///
    /// The flag reports whether the device was found.
    fn resolve(&self, device_id: &str) -> (DeviceEntry, bool) {
        match self.lookup(device_id) {
            Some(entry) => (entry, true),
            None => (DeviceEntry::synthesized(device_id), false),
        }
    }
}

/// In-memory device directory.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    devices: HashMap<String, DeviceEntry>,
}

impl StaticDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a device and returns self for chaining.
    #[must_use]
    pub fn with_device(mut self, entry: DeviceEntry) -> Self {
        self.insert(entry);
        self
    }

    /// Adds or replaces a device. Returns the previous entry for the same id.
    pub fn insert(&mut self, entry: DeviceEntry) -> Option<DeviceEntry> {
        self.devices.insert(entry.id.clone(), entry)
    }

    /// Number of known devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl FromIterator<DeviceEntry> for StaticDirectory {
    fn from_iter<I: IntoIterator<Item = DeviceEntry>>(iter: I) -> Self {
        Self {
            devices: iter
                .into_iter()
                .map(|entry| (entry.id.clone(), entry))
                .collect(),
        }
    }
}

impl DeviceDirectory for StaticDirectory {
    fn lookup(&self, device_id: &str) -> Option<DeviceEntry> {
        self.devices.get(device_id).cloned()
    }
}
