// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{path::PathBuf, time::Duration};

use clap::{ArgAction, Parser, Subcommand};
use grubforme::{bootloader::Bootloader, Configuration, Manager, Root, Tools};
use log::LevelFilter;
use thiserror::Error;

/// Inspect GRUB boot entries and choose the next boot
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Root filesystem holding boot/grub
    #[arg(short, long, global = true, default_value = "/")]
    root: PathBuf,

    /// Treat the root as an image, inspection only
    #[arg(long, global = true)]
    image: bool,

    /// Directory containing the bundled 42_custom_reboot helper
    #[arg(long, global = true, default_value = "/usr/share/grubforme")]
    extension_path: PathBuf,

    /// Seconds to wait on each command, 0 waits forever
    #[arg(long, global = true, default_value_t = grubforme::DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Override the grub-reboot program (e.g. grub2-reboot)
    #[arg(long, global = true)]
    grub_reboot: Option<String>,

    /// Override the config regeneration program
    #[arg(long, global = true)]
    update_grub: Option<String>,

    /// Increase log verbosity
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Status of boot configuration
    Status,

    /// List boot entries, the default is marked with `*`
    List {
        /// Print the menu as JSON
        #[arg(long)]
        json: bool,
    },

    /// Boot the given entry on the next boot only
    Next {
        /// Entry title as listed
        title: String,

        /// Skip checking the title against the menu
        #[arg(long)]
        force: bool,
    },

    /// Manage the quick reboot helper
    QuickReboot {
        #[command(subcommand)]
        action: QuickRebootAction,
    },
}

#[derive(Debug, Subcommand)]
enum QuickRebootAction {
    /// Install the helper and regenerate grub.cfg
    Enable,
    /// Remove the helper and regenerate grub.cfg
    Disable,
    /// Report whether the helper is installed
    Status,
}

#[derive(Debug, Error)]
enum Error {
    #[error("bootloader: {0}")]
    Bootloader(#[from] grubforme::bootloader::Error),

    #[error("no entry titled {0:?} in the boot menu")]
    UnknownEntry(String),
}

impl Cli {
    fn configuration(&self) -> Configuration {
        let mut tools = Tools::default();
        if let Some(grub_reboot) = &self.grub_reboot {
            tools.grub_reboot = grub_reboot.clone();
        }
        if let Some(update_grub) = &self.update_grub {
            tools.update_grub = update_grub.clone();
        }

        Configuration {
            root: if self.image {
                Root::Image(self.root.clone())
            } else {
                Root::Native(self.root.clone())
            },
            extension_path: self.extension_path.clone(),
            tools,
            timeout: (self.timeout > 0).then(|| Duration::from_secs(self.timeout)),
        }
    }

    fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    pretty_env_logger::formatted_builder()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    let config = cli.configuration();
    let manager = Manager::new(&config);
    let bootloader = manager.bootloader();

    match cli.command {
        Commands::Status => status(&bootloader)?,
        Commands::List { json } => list(&bootloader, json)?,
        Commands::Next { title, force } => next(&bootloader, &title, force)?,
        Commands::QuickReboot { action } => quick_reboot(&bootloader, action)?,
    }

    Ok(())
}

fn status(bootloader: &Bootloader<'_>) -> Result<(), Error> {
    let Some(path) = bootloader.config_path() else {
        println!("Config         : none");
        return Ok(());
    };
    println!("Config         : {}", path.display());

    let menu = bootloader.boot_menu()?;
    println!("Entries        : {}", menu.len());
    println!("Default        : {}", menu.default_id());
    if bootloader.can_quick_reboot() {
        let state = if bootloader.quick_reboot_enabled()? {
            "enabled"
        } else {
            "disabled"
        };
        println!("Quick reboot   : {state}");
    }

    Ok(())
}

fn list(bootloader: &Bootloader<'_>, json: bool) -> color_eyre::Result<()> {
    let menu = bootloader.boot_menu().map_err(Error::from)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&menu)?);
        return Ok(());
    }

    for entry in menu.entries() {
        let marker = if entry.id() == menu.default_id() { '*' } else { ' ' };
        println!("{marker} {}", entry.title());
    }

    Ok(())
}

fn next(bootloader: &Bootloader<'_>, title: &str, force: bool) -> Result<(), Error> {
    if !force && !bootloader.boot_menu()?.contains(title) {
        return Err(Error::UnknownEntry(title.to_owned()));
    }

    bootloader.set_next_boot(title)?;
    println!("Next boot      : {title}");

    Ok(())
}

fn quick_reboot(bootloader: &Bootloader<'_>, action: QuickRebootAction) -> Result<(), Error> {
    match action {
        QuickRebootAction::Enable => {
            bootloader.enable_quick_reboot()?;
            println!("Quick reboot   : enabled");
        }
        QuickRebootAction::Disable => {
            bootloader.disable_quick_reboot()?;
            println!("Quick reboot   : disabled");
        }
        QuickRebootAction::Status => {
            let state = if bootloader.quick_reboot_enabled()? {
                "enabled"
            } else {
                "disabled"
            };
            println!("Quick reboot   : {state}");
        }
    }

    Ok(())
}
