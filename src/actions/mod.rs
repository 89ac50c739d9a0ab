// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Privileged driver actions
//!
//! Unbinding a device from its driver, asking the bus to re-probe it, and
//! unloading or reloading a kernel module. Commands run through the
//! configured escalation program (`pkexec` by default) unless the process is
//! already root.
//!
//! Actions are one-shot: a failure is reported once and never retried, and
//! no refresh is triggered. The resulting kernel state change reaches the
//! inventory through the hot-plug watcher or the next manual scan.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::InventoryConfig;
use crate::error::InventoryError;
use crate::exec::CommandRunner;

/// pkexec: authentication dialog dismissed
const EXIT_DISMISSED: i32 = 126;
/// pkexec: not authorized
const EXIT_NOT_AUTHORIZED: i32 = 127;

const MAX_IDENTIFIER_LEN: usize = 128;

/// Action failure
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Invalid {field}: {value:?}")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("Authorization declined")]
    Declined,

    #[error("{program} failed with status {status:?}: {stderr}")]
    Failed {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error(transparent)]
    Exec(#[from] InventoryError),
}

/// Kind of privileged action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Detach the device from its driver
    Unbind,
    /// Ask the bus to probe drivers for the device again
    Rebind,
    /// Remove the driver's module
    UnloadModule,
    /// Remove and load the driver's module
    ReloadModule,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionKind::Unbind => "unbind",
            ActionKind::Rebind => "rebind",
            ActionKind::UnloadModule => "unload",
            ActionKind::ReloadModule => "reload",
        })
    }
}

impl FromStr for ActionKind {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unbind" => Ok(ActionKind::Unbind),
            "rebind" | "probe" => Ok(ActionKind::Rebind),
            "unload" => Ok(ActionKind::UnloadModule),
            "reload" => Ok(ActionKind::ReloadModule),
            other => Err(InventoryError::InvalidArgument(format!(
                "unknown action '{}'",
                other
            ))),
        }
    }
}

/// One action on one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Bus the device lives on (`pci`, `usb`, ...)
    pub subsystem: String,
    /// Driver (and module) name
    pub driver: String,
    /// Bus-local device ID (`0000:00:1f.6`, `1-2:1.0`)
    pub device: String,
    pub kind: ActionKind,
}

/// A concrete command line, before escalation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl ActionRequest {
    pub fn new(
        kind: ActionKind,
        subsystem: impl Into<String>,
        driver: impl Into<String>,
        device: impl Into<String>,
    ) -> Self {
        Self {
            subsystem: subsystem.into(),
            driver: driver.into(),
            device: device.into(),
            kind,
        }
    }

    /// Reject anything that could escape the intended sysfs file or be
    /// read as an option by the tools.
    pub fn validate(&self) -> Result<(), ActionError> {
        check("subsystem", &self.subsystem, |c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'
        })?;
        check("driver", &self.driver, |c| {
            c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
        })?;
        if matches!(self.kind, ActionKind::Unbind | ActionKind::Rebind) {
            check("device", &self.device, |c| {
                c.is_ascii_alphanumeric() || matches!(c, ':' | '.' | '_' | '-')
            })?;
        }
        Ok(())
    }

    /// Commands implementing this request, run in order.
    pub fn plan(&self, sysfs_root: &std::path::Path) -> Vec<PlannedCommand> {
        let bus = sysfs_root.join("bus").join(&self.subsystem);
        let tee = |target: PathBuf| PlannedCommand {
            program: "tee".into(),
            args: vec![target.to_string_lossy().into_owned()],
            stdin: Some(self.device.clone()),
        };
        let modprobe = |args: &[&str]| PlannedCommand {
            program: "modprobe".into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            stdin: None,
        };
        match self.kind {
            ActionKind::Unbind => vec![tee(bus.join("drivers").join(&self.driver).join("unbind"))],
            ActionKind::Rebind => vec![tee(bus.join("drivers_probe"))],
            ActionKind::UnloadModule => vec![modprobe(&["-r", &self.driver])],
            ActionKind::ReloadModule => vec![
                modprobe(&["-r", &self.driver]),
                modprobe(&[&self.driver]),
            ],
        }
    }
}

fn check(field: &'static str, value: &str, allowed: impl Fn(char) -> bool) -> Result<(), ActionError> {
    let valid = !value.is_empty()
        && value.len() <= MAX_IDENTIFIER_LEN
        && !value.starts_with(['-', '.'])
        && value.chars().all(allowed);
    if valid {
        Ok(())
    } else {
        Err(ActionError::InvalidIdentifier {
            field,
            value: value.to_string(),
        })
    }
}

/// Executes [`ActionRequest`]s
pub struct ActionRunner {
    runner: Arc<dyn CommandRunner>,
    escalation: String,
    timeout: Duration,
    sysfs_root: PathBuf,
    is_root: bool,
}

impl ActionRunner {
    pub fn new(config: &InventoryConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            escalation: config.actions.escalation.clone(),
            timeout: Duration::from_millis(config.actions.timeout_ms),
            sysfs_root: config.sysfs_root.clone(),
            is_root: nix::unistd::Uid::effective().is_root(),
        }
    }

    /// Override root detection.
    pub fn with_root(mut self, is_root: bool) -> Self {
        self.is_root = is_root;
        self
    }

    /// Validate and run. Stops at the first failing command.
    pub fn run(&self, request: &ActionRequest) -> Result<(), ActionError> {
        request.validate()?;
        for command in request.plan(&self.sysfs_root) {
            self.execute(&command)?;
        }
        log::info!(
            "{} {} ({}/{}) succeeded",
            request.kind,
            request.device,
            request.subsystem,
            request.driver
        );
        Ok(())
    }

    fn execute(&self, command: &PlannedCommand) -> Result<(), ActionError> {
        let args: Vec<&str> = command.args.iter().map(String::as_str).collect();
        let (program, argv): (&str, Vec<&str>) = if self.is_root {
            (command.program.as_str(), args)
        } else {
            let mut argv = vec![command.program.as_str()];
            argv.extend(args);
            (self.escalation.as_str(), argv)
        };

        log::info!("Running {} {}", program, argv.join(" "));
        let output = self.runner.run(
            program,
            &argv,
            command.stdin.as_deref().map(str::as_bytes),
            self.timeout,
        )?;

        match output.status {
            Some(0) => Ok(()),
            Some(EXIT_DISMISSED) | Some(EXIT_NOT_AUTHORIZED) if !self.is_root => {
                log::warn!("{} declined by user", command.program);
                Err(ActionError::Declined)
            }
            status => Err(ActionError::Failed {
                program: command.program.clone(),
                status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{CommandOutput, ScriptedRunner};
    use std::path::Path;

    fn config() -> InventoryConfig {
        InventoryConfig::default()
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("unbind".parse::<ActionKind>().unwrap(), ActionKind::Unbind);
        assert_eq!("reload".parse::<ActionKind>().unwrap(), ActionKind::ReloadModule);
        assert!("format-disk".parse::<ActionKind>().is_err());
        assert_eq!(ActionKind::UnloadModule.to_string(), "unload");
    }

    #[test]
    fn test_validation_rejects_traversal_and_options() {
        let ok = ActionRequest::new(ActionKind::Unbind, "pci", "e1000e", "0000:00:1f.6");
        assert!(ok.validate().is_ok());

        for (subsystem, driver, device) in [
            ("pci", "../../kernel", "0000:00:1f.6"),
            ("pci", "e1000e", "../x"),
            ("pci/../..", "e1000e", "0000:00:1f.6"),
            ("pci", "-r", "0000:00:1f.6"),
            ("pci", "e1000e", ""),
            ("pci", "e1000e", "0000:00:1f.6\nmore"),
        ] {
            let req = ActionRequest::new(ActionKind::Unbind, subsystem, driver, device);
            assert!(
                matches!(req.validate(), Err(ActionError::InvalidIdentifier { .. })),
                "{subsystem} {driver} {device}"
            );
        }
    }

    #[test]
    fn test_plan() {
        let root = Path::new("/sys");
        let unbind = ActionRequest::new(ActionKind::Unbind, "pci", "e1000e", "0000:00:1f.6").plan(root);
        assert_eq!(unbind.len(), 1);
        assert_eq!(unbind[0].program, "tee");
        assert_eq!(unbind[0].args, vec!["/sys/bus/pci/drivers/e1000e/unbind"]);
        assert_eq!(unbind[0].stdin.as_deref(), Some("0000:00:1f.6"));

        let rebind = ActionRequest::new(ActionKind::Rebind, "usb", "usbhid", "1-2:1.0").plan(root);
        assert_eq!(rebind[0].args, vec!["/sys/bus/usb/drivers_probe"]);

        let reload = ActionRequest::new(ActionKind::ReloadModule, "pci", "e1000e", "x").plan(root);
        assert_eq!(reload.len(), 2);
        assert_eq!(reload[0].args, vec!["-r", "e1000e"]);
        assert_eq!(reload[1].args, vec!["e1000e"]);
    }

    #[test]
    fn test_runs_through_escalation() {
        let runner = Arc::new(ScriptedRunner::new().with(
            "pkexec",
            &["tee", "/sys/bus/pci/drivers/e1000e/unbind"],
            CommandOutput::ok("0000:00:1f.6"),
        ));
        let actions = ActionRunner::new(&config(), runner.clone()).with_root(false);
        let req = ActionRequest::new(ActionKind::Unbind, "pci", "e1000e", "0000:00:1f.6");
        actions.run(&req).unwrap();
        assert_eq!(runner.calls(), vec!["pkexec tee /sys/bus/pci/drivers/e1000e/unbind"]);
    }

    #[test]
    fn test_root_skips_escalation() {
        let runner = Arc::new(ScriptedRunner::new().with(
            "modprobe",
            &["-r", "btusb"],
            CommandOutput::ok(""),
        ));
        let actions = ActionRunner::new(&config(), runner.clone()).with_root(true);
        let req = ActionRequest::new(ActionKind::UnloadModule, "usb", "btusb", "1-3:1.0");
        actions.run(&req).unwrap();
        assert_eq!(runner.calls(), vec!["modprobe -r btusb"]);
    }

    #[test]
    fn test_declined_and_failed() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .with("pkexec", &["modprobe", "-r", "nvidia"], CommandOutput::failed(126))
                .with("pkexec", &["modprobe", "-r", "e1000e"], CommandOutput::failed(1)),
        );
        let actions = ActionRunner::new(&config(), runner.clone()).with_root(false);

        let declined = actions.run(&ActionRequest::new(ActionKind::ReloadModule, "pci", "nvidia", "x"));
        assert!(matches!(declined, Err(ActionError::Declined)));
        // The reload stopped after the declined unload.
        assert_eq!(runner.calls().len(), 1);

        let failed = actions.run(&ActionRequest::new(ActionKind::UnloadModule, "pci", "e1000e", "x"));
        assert!(matches!(failed, Err(ActionError::Failed { status: Some(1), .. })));
    }

    #[test]
    fn test_missing_escalation_tool() {
        let actions = ActionRunner::new(&config(), Arc::new(ScriptedRunner::new())).with_root(false);
        let err = actions
            .run(&ActionRequest::new(ActionKind::Rebind, "pci", "e1000e", "0000:00:1f.6"))
            .unwrap_err();
        assert!(matches!(err, ActionError::Exec(InventoryError::ToolUnavailable(_))));
    }
}
