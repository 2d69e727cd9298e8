// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! GRUB management and interfaces

use std::{borrow::Cow, fmt, path::PathBuf};

use exec::{Command, CommandRunner, Output};
use fs_err as fs;
use snafu::{OptionExt as _, ResultExt as _};

use crate::{
    bootloader::{CommandFailedSnafu, ConfigNotFoundSnafu, ConfigReadSnafu, NoEntriesSnafu},
    BootMenu, Configuration, Root,
};

pub mod config;
use config::ParsedConfig;
mod quick_reboot;

pub use quick_reboot::{QuickReboot, HELPER_SCRIPT};

/// Known `grub.cfg` locations relative to the root, in lookup order
pub const CONFIG_CANDIDATES: [&str; 2] = ["boot/grub/grub.cfg", "boot/grub2/grub.cfg"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// GRUB specific bootloader behaviours
pub struct Loader<'a> {
    config: &'a Configuration,
    runner: &'a dyn CommandRunner,
}

impl fmt::Debug for Loader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader").field("config", &self.config).finish_non_exhaustive()
    }
}

impl<'a> Loader<'a> {
    /// Construct a new GRUB loader manager
    pub(super) fn new(config: &'a Configuration, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    fn candidates(&self) -> Vec<PathBuf> {
        CONFIG_CANDIDATES
            .iter()
            .map(|c| self.config.root.path().join(c))
            .collect()
    }

    /// First existing `grub.cfg`, absence is a normal answer
    pub fn locate_config(&self) -> Option<PathBuf> {
        let found = self.candidates().into_iter().find(|p| p.exists());
        log::trace!("grub config: {found:?}");
        found
    }

    /// Locate, read and parse `grub.cfg` into a menu
    pub(super) fn boot_menu(&self) -> Result<BootMenu, super::Error> {
        let path = self.locate_config().context(ConfigNotFoundSnafu {
            candidates: self.candidates(),
        })?;

        let mut raw = fs::read(&path).context(ConfigReadSnafu { path: &path })?;
        if raw.starts_with(UTF8_BOM) {
            raw.drain(..UTF8_BOM.len());
        }
        let text = String::from_utf8_lossy(&raw);
        if matches!(text, Cow::Owned(_)) {
            log::warn!("{} is not valid UTF-8, invalid bytes replaced", path.display());
        }

        let parsed = config::parse(&text);
        for entry in parsed.entries.values() {
            log::info!("{} = {}", entry.title(), entry.id());
        }

        let default = resolve_default(&parsed).context(NoEntriesSnafu { path: &path })?;

        BootMenu::new(parsed.entries, default).context(NoEntriesSnafu { path })
    }

    /// Ask `grub-reboot` to boot `id` once
    pub(super) fn set_next_boot(&self, id: &str) -> Result<(), super::Error> {
        self.ensure_native("set next boot")?;
        let tools = &self.config.tools;
        let output = self.run(Command::new(&tools.elevate).arg(&tools.grub_reboot).arg(id))?;
        log::info!(
            "Set boot option to {id}: {}\n{}\n{}",
            output.code,
            output.stdout,
            output.stderr
        );
        check(&tools.grub_reboot, output).map(drop)
    }

    pub(super) fn quick_reboot(&self) -> QuickReboot<'_> {
        QuickReboot::new(self)
    }

    /// Spawn with the configured deadline
    fn run(&self, command: Command) -> Result<Output, super::Error> {
        let command = command.timeout(self.config.timeout);
        log::debug!("running {command}");
        Ok(self.runner.run(&command)?)
    }

    /// Privileged changes are refused against image roots
    fn ensure_native(&self, operation: &'static str) -> Result<(), super::Error> {
        match self.config.root {
            Root::Native(_) => Ok(()),
            Root::Image(_) => Err(super::Error::Unsupported { operation }),
        }
    }
}

/// Non-zero exits become [`super::Error::CommandFailed`]
fn check(program: &str, output: Output) -> Result<Output, super::Error> {
    if output.success() {
        Ok(output)
    } else {
        CommandFailedSnafu {
            program,
            code: output.code,
            stderr: output.stderr.trim(),
        }
        .fail()
    }
}

/// Pick the default entry title
///
/// A declared title wins when it names an entry. Otherwise a numeric value
/// selects by GRUB menu position (submenus included) when that position is a
/// listed entry, and anything else falls back to the first entry.
fn resolve_default(parsed: &ParsedConfig) -> Option<String> {
    let (first, _) = parsed.entries.first()?;

    let Some(declared) = parsed.declared_default.as_deref() else {
        return Some(first.clone());
    };
    if parsed.entries.contains_key(declared) {
        return Some(declared.to_owned());
    }
    if let Some(title) = declared.parse::<usize>().ok().and_then(|i| parsed.title_at(i)) {
        log::debug!("default index {declared} resolves to {title}");
        return Some(title.to_owned());
    }

    log::warn!("default entry {declared:?} is not in the menu, using {first:?}");
    Some(first.clone())
}
