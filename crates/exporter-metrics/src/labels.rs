//! Label pipeline.
//!
//! Every series carries the device identity labels in [`RESTRICTED_LABELS`].
//! Registration fixes the ordered label names of a metric; each update then
//! resolves a complete [`LabelMap`] and projects it onto those names. The
//! storage is positional, so [`project_to_vector`] is the only place values
//! are lined up with names.

use crate::directory::DeviceDirectory;
use crate::types::LabelMap;

/// Label names reserved for device identity, present on every series.
pub const RESTRICTED_LABELS: [&str; 3] = ["device", "group", "friendly_name"];

/// Prefix applied to requested label names that collide with a restricted name.
pub const MODULE_PREFIX: &str = "module_";

/// Label carrying a sensor's name.
pub const SENSOR_NAME: &str = "sensor_name";

/// Label carrying a sensor's alias, added whenever [`SENSOR_NAME`] is requested.
pub const SENSOR_ALIAS: &str = "sensor_alias";

/// Labels implied by another requested label: `(trigger, implied)`.
pub const DYNAMIC_LABELS: [(&str, &str); 1] = [(SENSOR_NAME, SENSOR_ALIAS)];

fn is_restricted(name: &str) -> bool {
    RESTRICTED_LABELS.contains(&name)
}

fn renamed(name: &str) -> String {
    if is_restricted(name) {
        format!("{MODULE_PREFIX}{name}")
    } else {
        name.to_string()
    }
}

/// Computes the canonical ordered label names for a registration.
///
/// Order: requested names (restricted ones renamed to `module_<name>`,
/// duplicates dropped, first occurrence wins), then [`RESTRICTED_LABELS`],
/// then any [`DYNAMIC_LABELS`] triggered by the requested names.
#[must_use]
pub fn register_label_names<S: AsRef<str>>(requested: &[S]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(requested.len() + RESTRICTED_LABELS.len() + 1);

    for name in requested {
        let name = renamed(name.as_ref());
        if !names.contains(&name) {
            names.push(name);
        }
    }

    names.extend(RESTRICTED_LABELS.iter().map(ToString::to_string));

    for (trigger, implied) in DYNAMIC_LABELS {
        if names.iter().any(|n| n == trigger) && !names.iter().any(|n| n == implied) {
            names.push(implied.to_string());
        }
    }

    names
}

/// Resolves the complete label map for an update.
///
/// Raw labels are copied (restricted names moved under `module_<name>`),
/// then the device identity labels are set from the directory, falling back
/// to a synthesized entry when the device is unknown. When a `sensor_name`
/// is present, `sensor_alias` is set to the device's alias for that sensor,
/// or to the sensor name itself when no alias is configured.
///
/// A raw label literally named `module_<name>` takes precedence over a raw
/// restricted `<name>` moved onto the same column.
pub fn resolve_label_values(
    directory: &dyn DeviceDirectory,
    device_id: &str,
    raw: &LabelMap,
) -> LabelMap {
    let (entry, found) = directory.resolve(device_id);
    if !found {
        tracing::debug!(device = %device_id, "device not in directory, using synthesized identity");
    }

    let mut labels: LabelMap = raw
        .iter()
        .filter(|(name, _)| !is_restricted(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    for (name, value) in raw.iter().filter(|(name, _)| is_restricted(name)) {
        labels
            .entry(renamed(name))
            .or_insert_with(|| value.clone());
    }

    labels.insert("device".to_string(), entry.id.clone());
    labels.insert("group".to_string(), entry.group.clone());
    labels.insert("friendly_name".to_string(), entry.display_name.clone());

    if let Some(sensor) = raw.get(SENSOR_NAME) {
        let alias = entry.sensor_alias(sensor).unwrap_or(sensor);
        labels.insert(SENSOR_ALIAS.to_string(), alias.to_string());
    }

    labels
}

/// Projects a label map onto ordered names. Absent names become `""`.
#[must_use]
pub fn project_to_vector<S: AsRef<str>>(names: &[S], labels: &LabelMap) -> Vec<String> {
    names
        .iter()
        .map(|name| labels.get(name.as_ref()).cloned().unwrap_or_default())
        .collect()
}
