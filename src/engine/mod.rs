//! Selection and rotation engine.
//!
//! Owns the [`SelectionState`] and is the only thing that mutates it. Every
//! transition yields at most one [`Frame`] for the display surface; `None`
//! means nothing visible changed and the command was ignored.

pub mod state;

pub use state::{ActiveGroup, Direction, SelectionState};

use crate::catalog::{Catalog, CatalogError, ImageRef};
use crate::config::Weekday;
use std::sync::Arc;

/// Commands the input dispatcher can issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Weekly layout: choose a top-level option
    SelectOption(String),
    /// Weekly layout: choose a day of the active option by position
    SelectDay(usize),
    /// Grouped layout: pin a single image
    ShowImage(String),
    /// Grouped layout: rotate through a named group
    RotateGroup(String),
    /// Manual step, pauses auto-advance
    Step(Direction),
}

/// What the display surface should draw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub image: ImageRef,
    /// Changes whenever the entry transition should replay
    pub generation: u64,
}

/// What the auto-advance timer should be doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerDemand {
    Disarmed,
    Armed { group: ActiveGroup, epoch: u64 },
}

/// Overlay shown in the corner of the display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub title: String,
    pub subtitle: String,
    pub auto_advancing: bool,
    /// 1-based position and group length
    pub position: (usize, usize),
}

pub struct Engine {
    catalog: Arc<Catalog>,
    today: Weekday,
    placeholder_base: String,
    state: SelectionState,
}

impl Engine {
    /// Create the engine at the catalog's default selection.
    ///
    /// `today` is read once by the caller; the weekly layout starts on that
    /// day when the default option has it.
    pub fn new(
        catalog: Arc<Catalog>,
        today: Weekday,
        placeholder_base: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        catalog.validate()?;

        let state = match catalog.as_ref() {
            Catalog::Weekly(weekly) => {
                let option = weekly.default_option.clone();
                let day = weekly.resolve_day(&option, today).ok_or_else(|| {
                    CatalogError::UnknownDefault {
                        kind: "option",
                        name: option.clone(),
                    }
                })?;
                let images = weekly.images(&option, day).to_vec();
                tracing::info!("Starting on option {} ({})", option, day.display_name());
                SelectionState::new(ActiveGroup::Day { option, day }, images)
            }
            Catalog::Grouped(grouped) => {
                let name = grouped.default_group.clone();
                let images = grouped.group_images(&name);
                tracing::info!("Starting on group {}", name);
                SelectionState::new(ActiveGroup::Named(name), images)
            }
        };

        Ok(Self {
            catalog,
            today,
            placeholder_base: placeholder_base.into(),
            state,
        })
    }

    #[cfg(test)]
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Frame for the current state, if any image is known yet
    pub fn frame(&self) -> Option<Frame> {
        self.state.current.as_ref().map(|image| Frame {
            image: image.clone(),
            generation: self.state.generation,
        })
    }

    /// Apply a command. Commands that reference nothing in the catalog are
    /// ignored without touching the state.
    pub fn apply(&mut self, command: Command) -> Option<Frame> {
        let changed = match command {
            Command::SelectOption(option) => self.select_option(&option),
            Command::SelectDay(position) => self.select_day(position),
            Command::ShowImage(key) => self.show_image(&key),
            Command::RotateGroup(name) => self.rotate_group(&name),
            Command::Step(direction) => self.step(direction),
        };

        if changed { self.frame() } else { None }
    }

    /// Timer tick: advance one image while auto-advancing
    pub fn tick(&mut self) -> Option<Frame> {
        if !self.state.auto_advancing || self.state.images.len() <= 1 {
            return None;
        }
        self.state.step(Direction::Next);
        tracing::debug!(
            "Auto-advance to {}/{}",
            self.state.index + 1,
            self.state.images.len()
        );
        self.frame()
    }

    /// The surface could not load `reference`.
    ///
    /// Swaps in a placeholder without touching the index or generation, so
    /// the next tick or step carries on from where rotation was. Reports for
    /// anything but the displayed image, or for the placeholder itself, are
    /// dropped.
    pub fn asset_failed(&mut self, reference: &ImageRef) -> Option<Frame> {
        if self.state.current.as_ref() != Some(reference) || self.is_placeholder(reference) {
            return None;
        }

        tracing::error!("Error loading image: {}", reference);
        self.state.current = Some(self.placeholder());
        self.frame()
    }

    pub fn timer_demand(&self) -> TimerDemand {
        if self.state.auto_advancing && self.state.images.len() > 1 {
            TimerDemand::Armed {
                group: self.state.group.clone(),
                epoch: self.state.epoch,
            }
        } else {
            TimerDemand::Disarmed
        }
    }

    pub fn status(&self) -> Status {
        let (title, subtitle) = match &self.state.group {
            ActiveGroup::Day { option, day } => {
                (format!("Option {}", option), day.display_name().to_string())
            }
            ActiveGroup::Named(name) => ("Group".to_string(), name.clone()),
        };
        let len = self.state.images.len();
        Status {
            title,
            subtitle,
            auto_advancing: self.state.auto_advancing,
            position: (if len == 0 { 0 } else { self.state.index + 1 }, len),
        }
    }

    fn select_option(&mut self, option: &str) -> bool {
        let Catalog::Weekly(weekly) = self.catalog.as_ref() else {
            return false;
        };
        let Some(day) = weekly.resolve_day(option, self.today) else {
            return false;
        };

        let images = weekly.images(option, day).to_vec();
        self.state.enter(
            ActiveGroup::Day {
                option: option.to_string(),
                day,
            },
            images,
            0,
            true,
        );
        tracing::info!("Option {} selected, starting on {}", option, day.display_name());
        true
    }

    fn select_day(&mut self, position: usize) -> bool {
        let Catalog::Weekly(weekly) = self.catalog.as_ref() else {
            return false;
        };
        let ActiveGroup::Day { option, .. } = &self.state.group else {
            return false;
        };
        let Some(set) = weekly.option(option).and_then(|o| o.day_at(position)) else {
            return false;
        };

        let group = ActiveGroup::Day {
            option: option.clone(),
            day: set.day,
        };
        self.state.enter(group, set.images.clone(), 0, true);
        tracing::info!("Switched to day {}", set.day.display_name());
        true
    }

    fn show_image(&mut self, key: &str) -> bool {
        let Catalog::Grouped(grouped) = self.catalog.as_ref() else {
            return false;
        };
        let Some(image) = grouped.image(key) else {
            return false;
        };

        match grouped.resolve_group(key) {
            Some(group) => {
                let images = grouped.group_images(&group.name);
                let index = images.iter().position(|i| i == image).unwrap_or(0);
                self.state
                    .enter(ActiveGroup::Named(group.name.clone()), images, index, false);
            }
            None => {
                // Image outside every group: pin it, keep the group
                self.state.auto_advancing = false;
                self.state.generation += 1;
            }
        }

        self.state.current = Some(image.clone());
        tracing::info!("Showing image {} ({})", key, image);
        true
    }

    fn rotate_group(&mut self, name: &str) -> bool {
        let Catalog::Grouped(grouped) = self.catalog.as_ref() else {
            return false;
        };
        if grouped.group(name).is_none() {
            return false;
        }

        let target = ActiveGroup::Named(name.to_string());
        if self.state.auto_advancing && self.state.group == target {
            return false;
        }

        self.state.enter(target, grouped.group_images(name), 0, true);
        tracing::info!("Rotating group {}", name);
        true
    }

    fn step(&mut self, direction: Direction) -> bool {
        if self.state.images.is_empty() {
            return false;
        }

        if matches!(self.catalog.as_ref(), Catalog::Grouped(_)) {
            self.state.reconcile_index();
        }

        self.state.auto_advancing = false;
        self.state.step(direction);
        tracing::debug!(
            "Manual {:?} to {}/{}",
            direction,
            self.state.index + 1,
            self.state.images.len()
        );
        true
    }

    fn placeholder(&self) -> ImageRef {
        let text = match &self.state.group {
            ActiveGroup::Day { option, day } => {
                format!("Error+{}+{}", option, day.display_name())
            }
            ActiveGroup::Named(_) => "Error".to_string(),
        };
        ImageRef::new(format!("{}?text={}", self.placeholder_base, text))
    }

    /// Only the exact substitute counts; catalog images may live under the
    /// same base URL
    fn is_placeholder(&self, reference: &ImageRef) -> bool {
        *reference == self.placeholder()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DaySet, OptionSet, WeeklyCatalog, builtin};
    use proptest::prelude::*;

    const PLACEHOLDER: &str = "https://placehold.co/1920x1080/FF0000/ffffff";

    fn weekly_engine(today: Weekday) -> Engine {
        Engine::new(Arc::new(builtin::weekly()), today, PLACEHOLDER).unwrap()
    }

    fn grouped_engine() -> Engine {
        Engine::new(Arc::new(builtin::grouped()), Weekday::Monday, PLACEHOLDER).unwrap()
    }

    /// Single option with one day of `x`, `y`, `z`
    fn xyz_engine() -> Engine {
        let catalog = Catalog::Weekly(WeeklyCatalog {
            options: vec![OptionSet {
                key: "1".into(),
                days: vec![DaySet {
                    day: Weekday::Monday,
                    images: vec!["x".into(), "y".into(), "z".into()],
                }],
            }],
            default_option: "1".into(),
        });
        Engine::new(Arc::new(catalog), Weekday::Monday, PLACEHOLDER).unwrap()
    }

    fn current(engine: &Engine) -> &str {
        engine.state().current().map(ImageRef::as_str).unwrap_or("")
    }

    #[test]
    fn test_starts_on_today() {
        let engine = weekly_engine(Weekday::Wednesday);
        assert_eq!(
            engine.state().group(),
            &ActiveGroup::Day {
                option: "1".into(),
                day: Weekday::Wednesday
            }
        );
        assert_eq!(current(&engine), "../mmi.jpg");
        assert!(engine.state().is_auto_advancing());
    }

    #[test]
    fn test_sunday_falls_back_to_first_day() {
        let mut engine = weekly_engine(Weekday::Sunday);
        assert_eq!(current(&engine), "../ml.jpg");

        engine.apply(Command::SelectOption("2".into())).unwrap();
        assert_eq!(
            engine.state().group(),
            &ActiveGroup::Day {
                option: "2".into(),
                day: Weekday::Monday
            }
        );
    }

    #[test]
    fn test_select_option_resets_and_resumes() {
        let mut engine = weekly_engine(Weekday::Tuesday);
        engine.apply(Command::SelectOption("2".into())).unwrap();
        engine.apply(Command::Step(Direction::Next)).unwrap();
        assert!(!engine.state().is_auto_advancing());

        let frame = engine.apply(Command::SelectOption("3".into())).unwrap();
        assert_eq!(engine.state().index(), 0);
        assert!(engine.state().is_auto_advancing());
        assert_eq!(frame.image.as_str(), "../f4.jpg");
        assert_eq!(frame.generation, engine.state().generation());
    }

    #[test]
    fn test_select_day_by_position() {
        let mut engine = weekly_engine(Weekday::Monday);
        engine.apply(Command::SelectOption("2".into())).unwrap();

        // Key 6 -> third day
        engine.apply(Command::SelectDay(2)).unwrap();
        assert_eq!(
            engine.state().group(),
            &ActiveGroup::Day {
                option: "2".into(),
                day: Weekday::Wednesday
            }
        );
        engine.apply(Command::Step(Direction::Next)).unwrap();
        engine.apply(Command::Step(Direction::Next)).unwrap();
        assert_eq!(current(&engine), "../fvmi.jpg");
    }

    #[test]
    fn test_select_day_out_of_range_ignored() {
        let mut engine = xyz_engine();
        let before = engine.state().clone();
        assert!(engine.apply(Command::SelectDay(1)).is_none());
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_unknown_option_ignored() {
        let mut engine = xyz_engine();
        let before = engine.state().clone();
        assert!(engine.apply(Command::SelectOption("3".into())).is_none());
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_ticks_visit_in_order() {
        let mut engine = xyz_engine();
        let visited: Vec<usize> = (0..3)
            .map(|_| {
                engine.tick().unwrap();
                engine.state().index()
            })
            .collect();
        assert_eq!(visited, vec![1, 2, 0]);
    }

    #[test]
    fn test_prev_wraps_from_first() {
        let mut engine = xyz_engine();
        engine.apply(Command::Step(Direction::Prev)).unwrap();
        assert_eq!(engine.state().index(), 2);
        engine.apply(Command::Step(Direction::Prev)).unwrap();
        assert_eq!(engine.state().index(), 1);
    }

    #[test]
    fn test_next_wraps_from_last() {
        let mut engine = xyz_engine();
        engine.apply(Command::Step(Direction::Prev)).unwrap();
        engine.apply(Command::Step(Direction::Next)).unwrap();
        assert_eq!(engine.state().index(), 0);
    }

    #[test]
    fn test_manual_step_pauses_ticks() {
        let mut engine = xyz_engine();
        engine.apply(Command::Step(Direction::Next)).unwrap();
        assert!(engine.tick().is_none());
        assert_eq!(engine.timer_demand(), TimerDemand::Disarmed);
    }

    #[test]
    fn test_single_image_group_never_ticks() {
        let mut engine = weekly_engine(Weekday::Friday);
        assert_eq!(engine.state().images().len(), 1);
        assert!(engine.tick().is_none());
        assert_eq!(engine.timer_demand(), TimerDemand::Disarmed);

        let generation = engine.state().generation();
        engine.apply(Command::Step(Direction::Next)).unwrap();
        assert_eq!(engine.state().index(), 0);
        assert_eq!(engine.state().generation(), generation + 1);
    }

    #[test]
    fn test_empty_day_is_safe() {
        let catalog = Catalog::Weekly(WeeklyCatalog {
            options: vec![OptionSet {
                key: "1".into(),
                days: vec![
                    DaySet { day: Weekday::Monday, images: vec!["a".into()] },
                    DaySet { day: Weekday::Tuesday, images: Vec::new() },
                ],
            }],
            default_option: "1".into(),
        });
        let mut engine = Engine::new(Arc::new(catalog), Weekday::Monday, PLACEHOLDER).unwrap();

        engine.apply(Command::SelectDay(1)).unwrap();
        assert_eq!(current(&engine), "a");
        assert!(engine.tick().is_none());
        assert!(engine.apply(Command::Step(Direction::Next)).is_none());
        assert_eq!(engine.status().position, (0, 0));
    }

    #[test]
    fn test_load_failure_keeps_index() {
        let mut engine = xyz_engine();
        engine.tick().unwrap();
        let generation = engine.state().generation();

        let frame = engine.asset_failed(&"y".into()).unwrap();
        assert_eq!(
            frame.image.as_str(),
            "https://placehold.co/1920x1080/FF0000/ffffff?text=Error+1+Monday"
        );
        assert_eq!(frame.generation, generation);
        assert_eq!(engine.state().index(), 1);

        engine.tick().unwrap();
        assert_eq!(engine.state().index(), 2);
        assert_eq!(current(&engine), "z");
    }

    #[test]
    fn test_stale_or_placeholder_failure_ignored() {
        let mut engine = xyz_engine();
        assert!(engine.asset_failed(&"z".into()).is_none());

        let frame = engine.asset_failed(&"x".into()).unwrap();
        let before = engine.state().clone();
        assert!(engine.asset_failed(&frame.image).is_none());
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_failure_of_image_under_placeholder_base() {
        let promo = format!("{PLACEHOLDER}?text=Promo");
        let catalog = Catalog::Weekly(WeeklyCatalog {
            options: vec![OptionSet {
                key: "1".into(),
                days: vec![DaySet {
                    day: Weekday::Monday,
                    images: vec![ImageRef::new(promo.as_str())],
                }],
            }],
            default_option: "1".into(),
        });
        let mut engine = Engine::new(Arc::new(catalog), Weekday::Monday, PLACEHOLDER).unwrap();

        let frame = engine.asset_failed(&ImageRef::new(promo.as_str())).unwrap();
        assert_eq!(
            frame.image.as_str(),
            format!("{PLACEHOLDER}?text=Error+1+Monday")
        );
        assert!(engine.asset_failed(&frame.image).is_none());
    }

    #[test]
    fn test_grouped_starts_on_default_group() {
        let engine = grouped_engine();
        assert_eq!(engine.state().group(), &ActiveGroup::Named("morning".into()));
        assert_eq!(current(&engine), "../morning-1.jpg");
    }

    #[test]
    fn test_show_image_pins_and_syncs_index() {
        let mut engine = grouped_engine();
        let frame = engine.apply(Command::ShowImage("4".into())).unwrap();

        assert_eq!(frame.image.as_str(), "../night.jpg");
        assert_eq!(engine.state().group(), &ActiveGroup::Named("day-night".into()));
        assert_eq!(engine.state().index(), 1);
        assert!(!engine.state().is_auto_advancing());
        assert!(engine.tick().is_none());
    }

    #[test]
    fn test_step_after_show_image_continues_from_it() {
        let mut engine = grouped_engine();
        engine.apply(Command::ShowImage("3".into())).unwrap();
        engine.apply(Command::Step(Direction::Next)).unwrap();
        assert_eq!(current(&engine), "../night.jpg");
        engine.apply(Command::Step(Direction::Next)).unwrap();
        assert_eq!(current(&engine), "../day.jpg");
    }

    #[test]
    fn test_step_reconciles_stale_index() {
        let mut engine = grouped_engine();
        // Displayed image disagrees with the index
        engine.state.current = Some("../morning-2.jpg".into());
        engine.apply(Command::Step(Direction::Prev)).unwrap();
        assert_eq!(engine.state().index(), 0);
        assert_eq!(current(&engine), "../morning-1.jpg");
    }

    #[test]
    fn test_rotate_same_group_is_noop() {
        let mut engine = grouped_engine();
        let before = engine.state().clone();
        assert!(engine.apply(Command::RotateGroup("morning".into())).is_none());
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_rotate_group_after_pause_restarts() {
        let mut engine = grouped_engine();
        engine.apply(Command::ShowImage("2".into())).unwrap();

        let frame = engine.apply(Command::RotateGroup("morning".into())).unwrap();
        assert_eq!(frame.image.as_str(), "../morning-1.jpg");
        assert_eq!(engine.state().index(), 0);
        assert!(engine.state().is_auto_advancing());
    }

    #[test]
    fn test_grouped_failure_uses_generic_placeholder() {
        let mut engine = grouped_engine();
        let frame = engine.asset_failed(&"../morning-1.jpg".into()).unwrap();
        assert_eq!(frame.image.as_str(), format!("{PLACEHOLDER}?text=Error"));
    }

    #[test]
    fn test_layout_mismatched_commands_ignored() {
        let mut weekly = weekly_engine(Weekday::Monday);
        assert!(weekly.apply(Command::ShowImage("1".into())).is_none());
        assert!(weekly.apply(Command::RotateGroup("morning".into())).is_none());

        let mut grouped = grouped_engine();
        assert!(grouped.apply(Command::SelectOption("1".into())).is_none());
        assert!(grouped.apply(Command::SelectDay(0)).is_none());
    }

    #[test]
    fn test_timer_demand_tracks_selection() {
        let mut engine = weekly_engine(Weekday::Monday);
        assert_eq!(engine.timer_demand(), TimerDemand::Disarmed);

        engine.apply(Command::SelectOption("2".into())).unwrap();
        let first = engine.timer_demand();
        assert!(matches!(first, TimerDemand::Armed { .. }));

        engine.tick().unwrap();
        assert_eq!(engine.timer_demand(), first);

        engine.apply(Command::SelectDay(0)).unwrap();
        assert_ne!(engine.timer_demand(), first);
    }

    #[test]
    fn test_status_overlay() {
        let mut engine = weekly_engine(Weekday::Thursday);
        engine.apply(Command::SelectOption("2".into())).unwrap();
        engine.tick().unwrap();
        assert_eq!(
            engine.status(),
            Status {
                title: "Option 2".into(),
                subtitle: "Thursday".into(),
                auto_advancing: true,
                position: (2, 5),
            }
        );
    }

    fn command_strategy() -> impl Strategy<Value = Option<Command>> {
        prop_oneof![
            (1u8..=4).prop_map(|k| Some(Command::SelectOption(k.to_string()))),
            (0usize..8).prop_map(|p| Some(Command::SelectDay(p))),
            (1u8..=7).prop_map(|k| Some(Command::ShowImage(k.to_string()))),
            prop_oneof![Just("morning"), Just("day-night"), Just("evening")]
                .prop_map(|n| Some(Command::RotateGroup(n.to_string()))),
            Just(Some(Command::Step(Direction::Next))),
            Just(Some(Command::Step(Direction::Prev))),
            Just(None),
        ]
    }

    proptest! {
        #[test]
        fn prop_index_stays_in_bounds(
            grouped in any::<bool>(),
            commands in prop::collection::vec(command_strategy(), 0..64),
        ) {
            let mut engine = if grouped { grouped_engine() } else { weekly_engine(Weekday::Sunday) };
            for command in commands {
                match command {
                    Some(command) => { engine.apply(command); }
                    None => { engine.tick(); }
                }
                let state = engine.state();
                if !state.images().is_empty() {
                    prop_assert!(state.index() < state.images().len());
                    prop_assert!(state.current().is_some());
                }
            }
        }
    }
}
