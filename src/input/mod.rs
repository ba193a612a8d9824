//! Keyboard and remote-control input.
//!
//! Keys are identified by DOM-style names ("1", "ArrowRight", ...), which is
//! what IR remote bridges emit. The dispatcher maps them to engine commands
//! through a table built once from the catalog.

pub mod keys;

pub use keys::spawn_reader;

use crate::catalog::{Catalog, DAY_KEYS, OPTION_KEYS};
use crate::engine::{Command, Direction};
use std::collections::HashMap;

/// Raw input forwarded by the key reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    Key(String),
    Quit,
}

/// Directional keys, including legacy single-word names
const STEP_KEYS: [(&str, Direction); 4] = [
    ("ArrowRight", Direction::Next),
    ("Right", Direction::Next),
    ("ArrowLeft", Direction::Prev),
    ("Left", Direction::Prev),
];

/// Static key -> command table
pub struct Dispatcher {
    table: HashMap<String, Command>,
}

impl Dispatcher {
    pub fn new(catalog: &Catalog) -> Self {
        let mut table = HashMap::new();

        match catalog {
            Catalog::Weekly(_) => {
                for key in OPTION_KEYS {
                    table.insert(key.to_string(), Command::SelectOption(key.to_string()));
                }
                for (position, key) in DAY_KEYS.iter().enumerate() {
                    table.insert(key.to_string(), Command::SelectDay(position));
                }
            }
            Catalog::Grouped(grouped) => {
                for key in grouped.images.keys() {
                    table.insert(key.clone(), Command::ShowImage(key.clone()));
                }
                for group in &grouped.groups {
                    table.insert(group.key.clone(), Command::RotateGroup(group.name.clone()));
                }
            }
        }

        for (key, direction) in STEP_KEYS {
            table.insert(key.to_string(), Command::Step(direction));
        }

        tracing::debug!("Input table has {} keys", table.len());
        Self { table }
    }

    /// Command bound to `key`, `None` for keys the display ignores
    pub fn dispatch(&self, key: &str) -> Option<Command> {
        self.table.get(key).cloned()
    }
}
