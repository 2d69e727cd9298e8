// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Host facing boot management
//!
//! Everything here is optional desktop integration: failures are logged at
//! warning level and reported as `None`/`false`, never as errors, so the host
//! can simply hide the feature.

use exec::{CommandRunner, SystemRunner};

use crate::{bootloader::Bootloader, BootMenu, Configuration, Error};

/// Fail-soft entry point over the detected bootloader
///
/// Holds no state besides the configuration: every call re-reads the
/// filesystem or spawns its own process, so calls may be issued concurrently.
#[derive(Debug)]
pub struct Manager<'a, R = SystemRunner> {
    config: &'a Configuration,
    runner: R,
}

impl<'a> Manager<'a> {
    /// Manager running real commands on the host
    pub fn new(config: &'a Configuration) -> Self {
        Self::with_runner(config, SystemRunner)
    }
}

impl<'a, R: CommandRunner> Manager<'a, R> {
    pub fn with_runner(config: &'a Configuration, runner: R) -> Self {
        Self { config, runner }
    }

    /// The underlying bootloader, for callers that want the failure reasons
    pub fn bootloader(&self) -> Bootloader<'_> {
        Bootloader::new(self.config, &self.runner)
    }

    /// Whether a GRUB config exists at all
    pub fn is_usable(&self) -> bool {
        self.bootloader().is_usable()
    }

    /// Current boot menu, `None` when it cannot be produced
    pub fn boot_options(&self) -> Option<BootMenu> {
        soften(self.bootloader().boot_menu().map_err(Error::from))
    }

    /// Boot `id` on the next boot only
    pub fn set_next_boot(&self, id: &str) -> bool {
        soften(self.bootloader().set_next_boot(id).map_err(Error::from)).is_some()
    }

    pub fn can_quick_reboot(&self) -> bool {
        self.bootloader().can_quick_reboot()
    }

    pub fn enable_quick_reboot(&self) -> bool {
        soften(self.bootloader().enable_quick_reboot().map_err(Error::from)).is_some()
    }

    pub fn disable_quick_reboot(&self) -> bool {
        soften(self.bootloader().disable_quick_reboot().map_err(Error::from)).is_some()
    }

    pub fn quick_reboot_enabled(&self) -> bool {
        soften(self.bootloader().quick_reboot_enabled().map_err(Error::from)).unwrap_or(false)
    }
}

/// Log and discard the failure
fn soften<T>(result: Result<T, Error>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("{e}");
            None
        }
    }
}
