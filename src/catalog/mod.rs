//! Image catalog and selection resolver.
//!
//! The catalog is loaded once at startup and never changes afterwards. It
//! comes in two layouts:
//! - `weekly`: option key -> weekday -> ordered image references
//! - `grouped`: single-key image map plus named rotation groups

pub mod builtin;

use crate::config::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Keys that select a top-level option in the weekly layout
pub const OPTION_KEYS: [&str; 3] = ["1", "2", "3"];

/// Keys that select a day by position in the weekly layout (4 -> 1st day)
pub const DAY_KEYS: [&str; 6] = ["4", "5", "6", "7", "8", "9"];

/// Key that always quits the display and cannot be bound by a catalog
pub const QUIT_KEY: char = 'q';

/// Reference to an image asset: a path relative to the asset root, or an
/// http(s) URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Remote references are fetched over HTTP instead of read from disk
    pub fn is_remote(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Catalog validation errors
#[derive(Error, Debug, PartialEq)]
pub enum CatalogError {
    #[error("Catalog has no {0}")]
    Empty(&'static str),

    #[error("Option key '{0}' must be one of 1, 2 or 3")]
    InvalidOptionKey(String),

    #[error("Duplicate option key '{0}'")]
    DuplicateOption(String),

    #[error("Option '{option}' has {count} days, at most 6 can be selected")]
    TooManyDays { option: String, count: usize },

    #[error("Option '{option}' lists {day} more than once")]
    DuplicateDay { option: String, day: String },

    #[error("Key '{0}' must be a single character")]
    InvalidKey(String),

    #[error("Key '{0}' is reserved for quitting")]
    ReservedKey(String),

    #[error("Key '{0}' is bound more than once")]
    KeyCollision(String),

    #[error("Duplicate group name '{0}'")]
    DuplicateGroup(String),

    #[error("Group '{group}' references unknown image key '{key}'")]
    UnknownMember { group: String, key: String },

    #[error("Default {kind} '{name}' does not exist")]
    UnknownDefault { kind: &'static str, name: String },
}

/// One weekday's ordered image sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySet {
    pub day: Weekday,
    pub images: Vec<ImageRef>,
}

/// A top-level option with its day sets, in catalog order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSet {
    pub key: String,
    pub days: Vec<DaySet>,
}

impl OptionSet {
    pub fn day(&self, day: Weekday) -> Option<&DaySet> {
        self.days.iter().find(|set| set.day == day)
    }

    /// Day at a zero-based position in catalog order
    pub fn day_at(&self, position: usize) -> Option<&DaySet> {
        self.days.get(position)
    }
}

fn default_option() -> String {
    OPTION_KEYS[0].to_string()
}

/// Option -> day -> images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyCatalog {
    pub options: Vec<OptionSet>,
    #[serde(default = "default_option")]
    pub default_option: String,
}

impl WeeklyCatalog {
    pub fn option(&self, key: &str) -> Option<&OptionSet> {
        self.options.iter().find(|o| o.key == key)
    }

    /// Resolve the day to show when `option` is selected.
    ///
    /// Today's weekday if the option has it, otherwise the option's first
    /// day in catalog order. `None` only for an unknown option.
    pub fn resolve_day(&self, option: &str, today: Weekday) -> Option<Weekday> {
        let set = self.option(option)?;
        if set.day(today).is_some() {
            return Some(today);
        }
        set.days.first().map(|d| d.day)
    }

    /// Images for an option/day pair, empty if either is missing
    pub fn images(&self, option: &str, day: Weekday) -> &[ImageRef] {
        self.option(option)
            .and_then(|o| o.day(day))
            .map(|d| d.images.as_slice())
            .unwrap_or(&[])
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.options.is_empty() {
            return Err(CatalogError::Empty("options"));
        }

        let mut seen = HashSet::new();
        for option in &self.options {
            if !OPTION_KEYS.contains(&option.key.as_str()) {
                return Err(CatalogError::InvalidOptionKey(option.key.clone()));
            }
            if !seen.insert(option.key.as_str()) {
                return Err(CatalogError::DuplicateOption(option.key.clone()));
            }
            if option.days.is_empty() {
                return Err(CatalogError::Empty("days"));
            }
            if option.days.len() > DAY_KEYS.len() {
                return Err(CatalogError::TooManyDays {
                    option: option.key.clone(),
                    count: option.days.len(),
                });
            }

            let mut days = HashSet::new();
            for set in &option.days {
                if !days.insert(set.day) {
                    return Err(CatalogError::DuplicateDay {
                        option: option.key.clone(),
                        day: set.day.display_name().to_string(),
                    });
                }
            }
        }

        if self.option(&self.default_option).is_none() {
            return Err(CatalogError::UnknownDefault {
                kind: "option",
                name: self.default_option.clone(),
            });
        }

        Ok(())
    }
}

/// A named rotation sequence of image keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationGroup {
    pub name: String,
    /// Key that starts rotating through this group
    pub key: String,
    pub members: Vec<String>,
}

/// Flat key -> image map with named rotation groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedCatalog {
    pub images: BTreeMap<String, ImageRef>,
    pub groups: Vec<RotationGroup>,
    pub default_group: String,
}

impl GroupedCatalog {
    pub fn image(&self, key: &str) -> Option<&ImageRef> {
        self.images.get(key)
    }

    pub fn group(&self, name: &str) -> Option<&RotationGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Group a fixed-image key belongs to
    pub fn resolve_group(&self, key: &str) -> Option<&RotationGroup> {
        if !self.images.contains_key(key) {
            return None;
        }
        self.groups.iter().find(|g| g.members.iter().any(|m| m == key))
    }

    /// Image references of a group, in rotation order
    pub fn group_images(&self, name: &str) -> Vec<ImageRef> {
        self.group(name)
            .map(|g| {
                g.members
                    .iter()
                    .filter_map(|key| self.images.get(key).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.images.is_empty() {
            return Err(CatalogError::Empty("images"));
        }
        if self.groups.is_empty() {
            return Err(CatalogError::Empty("groups"));
        }

        let mut keys = HashSet::new();
        for key in self.images.keys() {
            check_key(key)?;
            keys.insert(key.as_str());
        }

        let mut names = HashSet::new();
        for group in &self.groups {
            if !names.insert(group.name.as_str()) {
                return Err(CatalogError::DuplicateGroup(group.name.clone()));
            }
            check_key(&group.key)?;
            if !keys.insert(group.key.as_str()) {
                return Err(CatalogError::KeyCollision(group.key.clone()));
            }
            if let Some(missing) = group.members.iter().find(|m| !self.images.contains_key(*m)) {
                return Err(CatalogError::UnknownMember {
                    group: group.name.clone(),
                    key: missing.clone(),
                });
            }
        }

        if self.group(&self.default_group).is_none() {
            return Err(CatalogError::UnknownDefault {
                kind: "group",
                name: self.default_group.clone(),
            });
        }

        Ok(())
    }
}

/// Grouped layout keys are single characters other than the quit key
fn check_key(key: &str) -> Result<(), CatalogError> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(QUIT_KEY), None) => Err(CatalogError::ReservedKey(key.to_string())),
        (Some(_), None) => Ok(()),
        _ => Err(CatalogError::InvalidKey(key.to_string())),
    }
}

/// Static image catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "lowercase")]
pub enum Catalog {
    Weekly(WeeklyCatalog),
    Grouped(GroupedCatalog),
}

impl Catalog {
    pub fn layout_name(&self) -> &'static str {
        match self {
            Catalog::Weekly(_) => "weekly",
            Catalog::Grouped(_) => "grouped",
        }
    }

    /// Every image reference in catalog order, without duplicates
    pub fn all_references(&self) -> Vec<ImageRef> {
        let mut seen = HashSet::new();
        let mut refs = Vec::new();

        let mut push = |r: &ImageRef| {
            if seen.insert(r.clone()) {
                refs.push(r.clone());
            }
        };

        match self {
            Catalog::Weekly(weekly) => {
                for option in &weekly.options {
                    for set in &option.days {
                        set.images.iter().for_each(&mut push);
                    }
                }
            }
            Catalog::Grouped(grouped) => {
                grouped.images.values().for_each(&mut push);
            }
        }

        refs
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        match self {
            Catalog::Weekly(weekly) => weekly.validate(),
            Catalog::Grouped(grouped) => grouped.validate(),
        }
    }
}
