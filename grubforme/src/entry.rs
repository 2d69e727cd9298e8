// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use indexmap::IndexMap;
use serde::Serialize;

/// A single `menuentry` of the boot menu
///
/// The title doubles as the identifier handed back to the bootloader when
/// selecting the next boot, there is no separate ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BootEntry {
    title: String,
}

impl BootEntry {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }

    /// Display label
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Identifier accepted by `grub-reboot`
    pub fn id(&self) -> &str {
        &self.title
    }
}

/// Boot entries in discovery order plus the entry booted by default
///
/// A menu is never empty and its default is always one of its entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootMenu {
    entries: IndexMap<String, BootEntry>,
    default: String,
}

impl BootMenu {
    /// `None` if `default` does not name one of `entries`
    pub(crate) fn new(entries: IndexMap<String, BootEntry>, default: String) -> Option<Self> {
        entries.contains_key(&default).then_some(Self { entries, default })
    }

    /// All entries, in the order they were declared
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &BootEntry> {
        self.entries.values()
    }

    pub fn get(&self, id: &str) -> Option<&BootEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn default_id(&self) -> &str {
        &self.default
    }

    pub fn default_entry(&self) -> &BootEntry {
        // Construction guarantees the key exists
        &self.entries[self.default.as_str()]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::{BootEntry, BootMenu};

    fn entries(titles: &[&str]) -> IndexMap<String, BootEntry> {
        titles.iter().map(|t| (t.to_string(), BootEntry::new(*t))).collect()
    }

    #[test]
    fn default_must_be_present() {
        assert!(BootMenu::new(entries(&["Ubuntu"]), "Windows".into()).is_none());
        assert!(BootMenu::new(entries(&[]), String::new()).is_none());

        let menu = BootMenu::new(entries(&["Ubuntu", "Windows"]), "Windows".into()).unwrap();
        assert_eq!(menu.default_entry().title(), "Windows");
        assert_eq!(menu.len(), 2);
    }

    #[test]
    fn entries_keep_declaration_order() {
        let menu = BootMenu::new(entries(&["b", "a", "c"]), "a".into()).unwrap();
        let titles = menu.entries().map(BootEntry::title).collect::<Vec<_>>();
        assert_eq!(titles, vec!["b", "a", "c"]);
    }

    #[test]
    fn serializes_as_title_mapping() {
        let menu = BootMenu::new(entries(&["Ubuntu", "Windows"]), "Ubuntu".into()).unwrap();
        let json = serde_json::to_string(&menu).unwrap();
        assert_eq!(
            json,
            r#"{"entries":{"Ubuntu":"Ubuntu","Windows":"Windows"},"default":"Ubuntu"}"#
        );
    }
}
