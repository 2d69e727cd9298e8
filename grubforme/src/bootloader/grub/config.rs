// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! `grub.cfg` parsing
//!
//! Only three line shapes matter here: top level `menuentry 'Title'`
//! declarations, top level `submenu` openers (they take a slot in GRUB's
//! numbering) and `set default="..."` assignments. Everything else is
//! ignored.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::BootEntry;

/// `menuentry` at the start of a line, title runs until the first quote
static MENU_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^menuentry ['"]([^'"]+)"#).expect("static regex"));

/// Top level submenu, never listed but counted by numeric defaults
static SUBMENU: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^submenu ['"]"#).expect("static regex"));

/// Character class kept as is so existing configs resolve identically
static SET_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"set default="([A-Za-z\- ()/0-9]*)""#).expect("static regex"));

/// Result of scanning a config, before any default resolution
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedConfig {
    /// Keyed by title, in first-declaration order
    pub entries: IndexMap<String, BootEntry>,

    /// Top level menu positions as GRUB numbers them, `None` for a submenu
    pub slots: Vec<Option<String>>,

    /// Value of the last `set default="..."`, if any
    pub declared_default: Option<String>,
}

impl ParsedConfig {
    /// Entry title at GRUB menu position `index`, `None` for submenus or out of range
    pub fn title_at(&self, index: usize) -> Option<&str> {
        self.slots.get(index)?.as_deref()
    }
}

/// Scan config text for menu entries and the declared default
pub fn parse(text: &str) -> ParsedConfig {
    let mut parsed = ParsedConfig::default();

    for line in text.lines() {
        if let Some(title) = MENU_ENTRY.captures(line).and_then(|c| c.get(1)) {
            let title = title.as_str();
            // Re-declaration replaces the value in place
            parsed.entries.insert(title.to_owned(), BootEntry::new(title));
            parsed.slots.push(Some(title.to_owned()));
        } else if SUBMENU.is_match(line) {
            parsed.slots.push(None);
        }
        if let Some(value) = SET_DEFAULT.captures(line).and_then(|c| c.get(1)) {
            parsed.declared_default = Some(value.as_str().to_owned());
        }
    }

    parsed
}
