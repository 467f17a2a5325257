// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Host state transitions that trigger a flush.
//!
//! The property watch itself is done by the bus client embedding the service;
//! it reports every change of a watched property and this table decides
//! whether the new value is worth persisting the collected logs for.

/// A watched D-Bus property and the values requesting a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTrigger {
    pub interface: &'static str,
    pub property: &'static str,
    pub values: &'static [&'static str],
}

pub const HOST_INTERFACE: &str = "xyz.openbmc_project.State.Host";
pub const OS_STATUS_INTERFACE: &str = "xyz.openbmc_project.State.OperatingSystem.Status";

pub const TRIGGERS: &[StateTrigger] = &[
    // host is turning on, save what was collected during the previous run
    StateTrigger {
        interface: HOST_INTERFACE,
        property: "RequestedHostTransition",
        values: &["xyz.openbmc_project.State.Host.Transition.On"],
    },
    StateTrigger {
        interface: OS_STATUS_INTERFACE,
        property: "OperatingSystemState",
        values: &[
            "xyz.openbmc_project.State.OperatingSystem.Status.OSStatus.BootComplete",
            "xyz.openbmc_project.State.OperatingSystem.Status.OSStatus.Inactive",
            // legacy values
            "Inactive",
            "Standby",
        ],
    },
];

/// True if the property change should flush the buffer.
#[must_use]
pub fn requires_flush(interface: &str, property: &str, value: &str) -> bool {
    TRIGGERS.iter().any(|trigger| {
        trigger.interface == interface
            && trigger.property == property
            && trigger.values.contains(&value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_requires_flush() {
        assert!(requires_flush(
            HOST_INTERFACE,
            "RequestedHostTransition",
            "xyz.openbmc_project.State.Host.Transition.On"
        ));
        assert!(!requires_flush(
            HOST_INTERFACE,
            "RequestedHostTransition",
            "xyz.openbmc_project.State.Host.Transition.Off"
        ));
    }

    #[test]
    fn test_os_states() {
        for value in [
            "xyz.openbmc_project.State.OperatingSystem.Status.OSStatus.BootComplete",
            "xyz.openbmc_project.State.OperatingSystem.Status.OSStatus.Inactive",
            "Inactive",
            "Standby",
        ] {
            assert!(requires_flush(
                OS_STATUS_INTERFACE,
                "OperatingSystemState",
                value
            ));
        }
        assert!(!requires_flush(
            OS_STATUS_INTERFACE,
            "OperatingSystemState",
            "xyz.openbmc_project.State.OperatingSystem.Status.OSStatus.Standby"
        ));
    }

    #[test]
    fn test_property_must_match_interface() {
        assert!(!requires_flush(
            HOST_INTERFACE,
            "OperatingSystemState",
            "Inactive"
        ));
        assert!(!requires_flush(
            OS_STATUS_INTERFACE,
            "RequestedHostTransition",
            "xyz.openbmc_project.State.Host.Transition.On"
        ));
    }
}
