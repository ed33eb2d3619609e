//! Device: a physical thing addressed by the `device_id` topic segment.

use serde::{Deserialize, Serialize};

/// Catalog record for a device and the sensor/actuator models it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sensors: Vec<String>,
    #[serde(default)]
    pub actuators: Vec<String>,
}

impl Device {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sensors: Vec::new(),
            actuators: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_sensor(mut self, model: impl Into<String>) -> Self {
        self.sensors.push(model.into());
        self
    }

    #[must_use]
    pub fn with_actuator(mut self, model: impl Into<String>) -> Self {
        self.actuators.push(model.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_models_when_deserializing() {
        let device: Device = serde_json::from_str(r#"{"id":"dev1","name":"Door"}"#).unwrap();
        assert_eq!(device, Device::new("dev1", "Door"));
    }

    #[test]
    fn should_collect_sensors_and_actuators() {
        let device = Device::new("dev1", "Door")
            .with_sensor("dht22")
            .with_actuator("buzzer");
        assert_eq!(device.sensors, vec!["dht22"]);
        assert_eq!(device.actuators, vec!["buzzer"]);
    }
}
