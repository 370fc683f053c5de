use log::debug;
use sysinfo::{System, SystemExt};

use crate::config::DeviceConfig;
use crate::models::DeviceInfo;

/// Host values used where the configuration leaves a device field unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostProbe {
    pub hostname: Option<String>,
    pub system_name: Option<String>,
    pub os_version: Option<String>,
}

impl HostProbe {
    pub fn detect() -> Self {
        let system = System::new();
        let hostname = hostname::get()
            .ok()
            .map(|h| h.to_string_lossy().to_string())
            .or_else(|| system.host_name());

        let probe = Self {
            hostname,
            system_name: system.name(),
            os_version: system.os_version().or_else(|| system.long_os_version()),
        };
        debug!("Host probe: {:?}", probe);
        probe
    }
}

/// Merge configured device fields with probed host values.
///
/// `sdk_level` fills `sdk_version` when the configuration does not set it, so
/// the reported level matches the one consent was evaluated against.
pub fn resolve_device_info(config: &DeviceConfig, probe: &HostProbe, sdk_level: u32) -> DeviceInfo {
    let pick = |configured: &Option<String>, probed: &Option<String>| {
        configured
            .clone()
            .filter(|v| !v.is_empty())
            .or_else(|| probed.clone())
            .unwrap_or_default()
    };

    DeviceInfo {
        model: pick(&config.model, &probe.hostname),
        manufacturer: pick(&config.manufacturer, &probe.system_name),
        android_version: pick(&config.android_version, &probe.os_version),
        sdk_version: config.sdk_version.unwrap_or(sdk_level),
    }
}

/// Device metadata for this run, probing the host for anything not configured
pub fn device_info(config: &DeviceConfig, sdk_level: u32) -> DeviceInfo {
    resolve_device_info(config, &HostProbe::detect(), sdk_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe() -> HostProbe {
        HostProbe {
            hostname: Some("backup-host".into()),
            system_name: Some("Linux".into()),
            os_version: Some("6.1".into()),
        }
    }

    #[test]
    fn test_configured_values_win() {
        let config = DeviceConfig {
            model: Some("Pixel 8".into()),
            manufacturer: Some("Google".into()),
            android_version: Some("14".into()),
            sdk_version: Some(34),
        };
        let info = resolve_device_info(&config, &probe(), 30);
        assert_eq!(info.model, "Pixel 8");
        assert_eq!(info.manufacturer, "Google");
        assert_eq!(info.android_version, "14");
        assert_eq!(info.sdk_version, 34);
    }

    #[test]
    fn test_missing_values_are_probed() {
        let config = DeviceConfig {
            model: Some(String::new()),
            ..Default::default()
        };
        let info = resolve_device_info(&config, &probe(), 33);
        assert_eq!(info.model, "backup-host");
        assert_eq!(info.manufacturer, "Linux");
        assert_eq!(info.android_version, "6.1");
        assert_eq!(info.sdk_version, 33);
    }

    #[test]
    fn test_empty_probe_gives_empty_strings() {
        let info = resolve_device_info(&DeviceConfig::default(), &HostProbe::default(), 34);
        assert_eq!(info.model, "");
        assert_eq!(info.manufacturer, "");
    }
}
