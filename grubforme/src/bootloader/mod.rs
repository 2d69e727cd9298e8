// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Bootloader APIs

use std::path::PathBuf;

use exec::CommandRunner;
use snafu::Snafu;

use crate::{BootMenu, Configuration};

pub mod grub;

/// Bootloader errors
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("no bootloader config found, tried {candidates:?}"))]
    ConfigNotFound { candidates: Vec<PathBuf> },

    #[snafu(display("failed to read {path:?}: {source}"))]
    ConfigRead { path: PathBuf, source: std::io::Error },

    #[snafu(display("no boot entries found in {path:?}"))]
    NoEntries { path: PathBuf },

    #[snafu(display("missing bootloader file: {path:?}"))]
    MissingFile { path: PathBuf },

    #[snafu(display("cannot quote path for the shell: {path:?}"))]
    InvalidPath { path: PathBuf },

    #[snafu(context(false), display("command: {source}"))]
    Command { source: exec::Error },

    #[snafu(display("{program} exited with status {code}: {stderr}"))]
    CommandFailed { program: String, code: i32, stderr: String },

    #[snafu(display("unsupported usage: {operation} requires a native root"))]
    Unsupported { operation: &'static str },
}

#[derive(Debug)]
pub enum Bootloader<'a> {
    /// GRUB is the only family handled
    Grub(Box<grub::Loader<'a>>),
}

impl<'a> Bootloader<'a> {
    /// Construct the bootloader manager for this configuration
    pub fn new(config: &'a Configuration, runner: &'a dyn CommandRunner) -> Self {
        Bootloader::Grub(Box::new(grub::Loader::new(config, runner)))
    }

    /// Located bootloader config, if any
    pub fn config_path(&self) -> Option<PathBuf> {
        match &self {
            Bootloader::Grub(g) => g.locate_config(),
        }
    }

    /// Whether a bootloader config can be found at all
    pub fn is_usable(&self) -> bool {
        self.config_path().is_some()
    }

    /// Read the boot menu fresh from disk
    pub fn boot_menu(&self) -> Result<BootMenu, Error> {
        match &self {
            Bootloader::Grub(g) => g.boot_menu(),
        }
    }

    /// Boot `id` on the next boot only
    pub fn set_next_boot(&self, id: &str) -> Result<(), Error> {
        match &self {
            Bootloader::Grub(g) => g.set_next_boot(id),
        }
    }

    /// Whether the quick reboot helper mechanism exists for this loader
    pub fn can_quick_reboot(&self) -> bool {
        match &self {
            Bootloader::Grub(_) => true,
        }
    }

    pub fn enable_quick_reboot(&self) -> Result<(), Error> {
        match &self {
            Bootloader::Grub(g) => g.quick_reboot().enable(),
        }
    }

    pub fn disable_quick_reboot(&self) -> Result<(), Error> {
        match &self {
            Bootloader::Grub(g) => g.quick_reboot().disable(),
        }
    }

    pub fn quick_reboot_enabled(&self) -> Result<bool, Error> {
        match &self {
            Bootloader::Grub(g) => g.quick_reboot().is_enabled(),
        }
    }
}
