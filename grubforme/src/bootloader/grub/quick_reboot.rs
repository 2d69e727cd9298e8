// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Quick reboot helper script lifecycle
//!
//! The helper is a GRUB drop-in that skips the menu timeout when a one-shot
//! `next_entry` is set. Installing or removing it needs root and a grub.cfg
//! regeneration, so each change is a single elevated `sh -c` pipeline and the
//! user only sees one authentication prompt.

use std::path::{Path, PathBuf};

use exec::Command;
use snafu::{ensure, OptionExt as _};

use super::{check, Loader};
use crate::{
    bootloader::{Error, InvalidPathSnafu, MissingFileSnafu},
    Root,
};

/// File name of the helper, both bundled and installed
pub const HELPER_SCRIPT: &str = "42_custom_reboot";

#[derive(Debug)]
pub struct QuickReboot<'a> {
    loader: &'a Loader<'a>,
}

impl<'a> QuickReboot<'a> {
    pub(super) fn new(loader: &'a Loader<'a>) -> Self {
        Self { loader }
    }

    /// Where the helper lives once installed
    pub fn installed_path(&self) -> PathBuf {
        self.loader.config.tools.drop_in_dir.join(HELPER_SCRIPT)
    }

    /// The copy shipped alongside the extension
    pub fn bundled_path(&self) -> PathBuf {
        self.loader.config.extension_path.join(HELPER_SCRIPT)
    }

    /// Install the helper, make it executable and regenerate grub.cfg
    pub fn enable(&self) -> Result<(), Error> {
        self.loader.ensure_native("enable quick reboot")?;

        let bundled = self.bundled_path();
        ensure!(bundled.exists(), MissingFileSnafu { path: bundled });

        let tools = &self.loader.config.tools;
        let source = quote(&bundled)?;
        let dest = quote(&self.installed_path())?;
        let script = format!(
            "{copy} {source} {dest} && {chmod} 755 {dest} && {update}",
            copy = tools.copy,
            chmod = tools.chmod,
            update = tools.update_grub,
        );

        self.elevated_shell(script)?;
        log::info!("installed {dest}");
        Ok(())
    }

    /// Remove the helper and regenerate grub.cfg
    pub fn disable(&self) -> Result<(), Error> {
        self.loader.ensure_native("disable quick reboot")?;

        let tools = &self.loader.config.tools;
        let dest = quote(&self.installed_path())?;
        let script = format!("{remove} {dest} && {update}", remove = tools.remove, update = tools.update_grub);

        self.elevated_shell(script)?;
        log::info!("removed {dest}");
        Ok(())
    }

    /// Whether the helper is installed. A failed read means "not installed".
    pub fn is_enabled(&self) -> Result<bool, Error> {
        let installed = self.installed_path();

        let found = match &self.loader.config.root {
            Root::Native(_) => {
                let path = installed.to_str().context(InvalidPathSnafu { path: &installed })?;
                let output = self.loader.run(Command::new(&self.loader.config.tools.cat).arg(path))?;
                output.success()
            }
            Root::Image(root) => root.join(installed.strip_prefix("/").unwrap_or(installed.as_path())).exists(),
        };

        if found {
            log::info!("{} found", installed.display());
        } else {
            log::warn!("{} not found", installed.display());
        }
        Ok(found)
    }

    fn elevated_shell(&self, script: String) -> Result<(), Error> {
        let tools = &self.loader.config.tools;
        let output = self
            .loader
            .run(Command::new(&tools.elevate).arg(&tools.shell).arg("-c").arg(script))?;
        log::debug!("{}: {}\n{}\n{}", tools.shell, output.code, output.stdout, output.stderr);
        check(&tools.shell, output).map(drop)
    }
}

/// Quote a path for use inside an `sh -c` string
fn quote(path: &Path) -> Result<String, Error> {
    path.to_str()
        .and_then(|s| shlex::try_quote(s).ok())
        .map(|q| q.into_owned())
        .context(InvalidPathSnafu { path })
}

#[cfg(test)]
mod tests {
    use std::{path::Path, sync::Mutex};

    use exec::{Command, CommandRunner, Output};
    use fs_err as fs;

    use super::{quote, HELPER_SCRIPT};
    use crate::{
        bootloader::{grub::Loader, Error},
        Configuration, Root,
    };

    /// Records argv and answers with a fixed exit code
    struct Recorder {
        code: i32,
        seen: Mutex<Vec<Vec<String>>>,
    }

    impl Recorder {
        fn new(code: i32) -> Self {
            Self {
                code,
                seen: Mutex::new(vec![]),
            }
        }
    }

    impl CommandRunner for Recorder {
        fn run(&self, command: &Command) -> Result<Output, exec::Error> {
            self.seen
                .lock()
                .unwrap()
                .push(command.argv().into_iter().map(String::from).collect());
            Ok(Output::new(self.code, "", ""))
        }
    }

    /// Launching anything fails, as if pkexec were missing
    struct Broken;

    impl CommandRunner for Broken {
        fn run(&self, command: &Command) -> Result<Output, exec::Error> {
            Err(exec::Error::Spawn {
                program: command.program().to_owned(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    fn bundled_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(HELPER_SCRIPT), "#!/bin/sh\n").unwrap();
        dir
    }

    #[test]
    fn enable_argv() {
        let ext = bundled_dir();
        let config = Configuration::new(ext.path());
        let runner = Recorder::new(0);
        Loader::new(&config, &runner).quick_reboot().enable().unwrap();

        let bundled = quote(&ext.path().join(HELPER_SCRIPT)).unwrap();
        let seen = runner.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![vec![
                "/usr/bin/pkexec".to_owned(),
                "sh".to_owned(),
                "-c".to_owned(),
                format!(
                    "/usr/bin/cp {bundled} /etc/grub.d/42_custom_reboot && /usr/bin/chmod 755 /etc/grub.d/42_custom_reboot && /usr/sbin/update-grub"
                ),
            ]]
        );
    }

    #[test]
    fn disable_argv() {
        let config = Configuration::new("/usr/share/grubforme");
        let runner = Recorder::new(0);
        Loader::new(&config, &runner).quick_reboot().disable().unwrap();

        let seen = runner.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![vec![
                "/usr/bin/pkexec",
                "sh",
                "-c",
                "/usr/bin/rm /etc/grub.d/42_custom_reboot && /usr/sbin/update-grub"
            ]]
        );
    }

    #[test]
    fn detect_argv_and_status() {
        let config = Configuration::new("/usr/share/grubforme");

        let present = Recorder::new(0);
        assert!(Loader::new(&config, &present).quick_reboot().is_enabled().unwrap());
        assert_eq!(
            *present.seen.lock().unwrap(),
            vec![vec!["/usr/bin/cat", "/etc/grub.d/42_custom_reboot"]]
        );

        let absent = Recorder::new(1);
        assert!(!Loader::new(&config, &absent).quick_reboot().is_enabled().unwrap());
    }

    #[test]
    fn detect_rejects_non_utf8_path() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt as _};

        let mut config = Configuration::new("/usr/share/grubforme");
        config.tools.drop_in_dir = OsStr::from_bytes(b"/etc/gr\xffub.d").into();

        let runner = Recorder::new(0);
        let err = Loader::new(&config, &runner).quick_reboot().is_enabled().unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
        assert!(runner.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn enable_requires_bundled_script() {
        let ext = tempfile::tempdir().unwrap();
        let config = Configuration::new(ext.path());
        let runner = Recorder::new(0);
        let err = Loader::new(&config, &runner).quick_reboot().enable().unwrap_err();
        assert!(matches!(err, Error::MissingFile { .. }));
        assert!(runner.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn failures_surface_as_errors() {
        let ext = bundled_dir();
        let config = Configuration::new(ext.path());

        let denied = Recorder::new(127);
        let loader = Loader::new(&config, &denied);
        assert!(matches!(loader.quick_reboot().enable(), Err(Error::CommandFailed { code: 127, .. })));
        assert!(matches!(loader.quick_reboot().disable(), Err(Error::CommandFailed { code: 127, .. })));

        let broken = Broken;
        let loader = Loader::new(&config, &broken);
        assert!(matches!(loader.quick_reboot().enable(), Err(Error::Command { .. })));
        assert!(matches!(loader.quick_reboot().is_enabled(), Err(Error::Command { .. })));
    }

    #[test]
    fn image_root_detection_reads_the_tree() {
        let root = tempfile::tempdir().unwrap();
        let config = Configuration {
            root: Root::Image(root.path().into()),
            ..Configuration::new("/usr/share/grubforme")
        };
        let runner = Recorder::new(0);
        let loader = Loader::new(&config, &runner);

        assert!(!loader.quick_reboot().is_enabled().unwrap());
        fs::create_dir_all(root.path().join("etc/grub.d")).unwrap();
        fs::write(root.path().join("etc/grub.d").join(HELPER_SCRIPT), "").unwrap();
        assert!(loader.quick_reboot().is_enabled().unwrap());

        assert!(matches!(loader.quick_reboot().enable(), Err(Error::Unsupported { .. })));
        assert!(runner.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn paths_with_spaces_are_quoted() {
        assert_eq!(quote(Path::new("/etc/grub.d/42_custom_reboot")).unwrap(), "/etc/grub.d/42_custom_reboot");
        let quoted = quote(Path::new("/home/me/my extensions/42_custom_reboot")).unwrap();
        assert_ne!(quoted, "/home/me/my extensions/42_custom_reboot");
        assert_eq!(
            shlex::split(&quoted).unwrap(),
            vec!["/home/me/my extensions/42_custom_reboot"]
        );
    }
}
