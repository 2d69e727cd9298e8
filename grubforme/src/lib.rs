// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{path::PathBuf, time::Duration};

use snafu::Snafu;

pub mod bootloader;

mod entry;
pub use entry::{BootEntry, BootMenu};

mod manager;
pub use manager::Manager;

/// Re-export the process execution APIs
pub use exec;

/// Core error type for grubforme
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(context(false), display("bootloader: {source}"))]
    Bootloader { source: bootloader::Error },
}

/// Default upper bound for any spawned command
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Core configuration for boot management
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Root of all operations
    pub root: Root,

    /// Where the bundled helper script (`42_custom_reboot`) is installed
    pub extension_path: PathBuf,

    /// Programs used to build every command line
    pub tools: Tools,

    /// Deadline applied to each spawned command, `None` waits forever
    pub timeout: Option<Duration>,
}

impl Configuration {
    /// Native configuration for `/` using the stock tool paths
    pub fn new(extension_path: impl Into<PathBuf>) -> Self {
        Self {
            root: Root::Native("/".into()),
            extension_path: extension_path.into(),
            tools: Tools::default(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

/// Wrap a root into a strong type to avoid confusion
#[derive(Debug, Clone)]
pub enum Root {
    /// Native installation
    Native(PathBuf),

    /// Mounted image, only ever inspected
    Image(PathBuf),
}

impl Root {
    /// When we don't need the type of the root..
    pub fn path(&self) -> &PathBuf {
        match self {
            Root::Native(p) => p,
            Root::Image(p) => p,
        }
    }
}

/// Absolute program paths. The defaults reproduce the argv historically
/// issued against GRUB hosts and must stay stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    /// Elevation helper
    pub elevate: String,
    pub shell: String,
    /// Sets the entry used for the next boot only
    pub grub_reboot: String,
    /// Regenerates grub.cfg from `/etc/grub.d`
    pub update_grub: String,
    pub copy: String,
    pub chmod: String,
    pub remove: String,
    pub cat: String,
    /// GRUB drop-in script directory
    pub drop_in_dir: PathBuf,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            elevate: "/usr/bin/pkexec".into(),
            shell: "sh".into(),
            grub_reboot: "/usr/sbin/grub-reboot".into(),
            update_grub: "/usr/sbin/update-grub".into(),
            copy: "/usr/bin/cp".into(),
            chmod: "/usr/bin/chmod".into(),
            remove: "/usr/bin/rm".into(),
            cat: "/usr/bin/cat".into(),
            drop_in_dir: "/etc/grub.d".into(),
        }
    }
}
