//! Built-in catalogs used when no configuration file is available.

use super::{Catalog, DaySet, GroupedCatalog, ImageRef, OptionSet, RotationGroup, WeeklyCatalog};
use crate::config::Weekday;
use std::collections::BTreeMap;

const WORKDAYS: [Weekday; 6] = [
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
    Weekday::Saturday,
];

/// Daily feature slide shown in the middle of the rotation, per workday
const FEATURE_SLIDES: [&str; 6] = [
    "../f6.jpg",
    "../fvm.jpg",
    "../fvmi.jpg",
    "../fvj.jpg",
    "../fvv.jpg",
    "../fvs.jpg",
];

fn rotation_day(day: Weekday, feature: &str) -> DaySet {
    DaySet {
        day,
        images: ["../f4.jpg", "../f5.jpg", feature, "../f7.jpg", "../f8.jpg"]
            .into_iter()
            .map(ImageRef::from)
            .collect(),
    }
}

/// Three options over Monday..Saturday; Sunday falls back to Monday.
///
/// Option 1 shows a single menu board per day, options 2 and 3 rotate five
/// slides with a day-specific feature in the middle.
pub fn weekly() -> Catalog {
    let menus = ["../ml.jpg", "../mm.jpg", "../mmi.jpg", "../mj.jpg", "../mv.jpg", "../ms.jpg"];

    let option_1 = OptionSet {
        key: "1".to_string(),
        days: WORKDAYS
            .iter()
            .zip(menus)
            .map(|(day, menu)| DaySet {
                day: *day,
                images: vec![ImageRef::from(menu)],
            })
            .collect(),
    };

    let rotating = |key: &str| OptionSet {
        key: key.to_string(),
        days: WORKDAYS
            .iter()
            .zip(FEATURE_SLIDES)
            .map(|(day, feature)| rotation_day(*day, feature))
            .collect(),
    };

    Catalog::Weekly(WeeklyCatalog {
        options: vec![option_1, rotating("2"), rotating("3")],
        default_option: "1".to_string(),
    })
}

/// Four fixed images split across a morning and a day/night rotation
pub fn grouped() -> Catalog {
    let images: BTreeMap<String, ImageRef> = [
        ("1", "../morning-1.jpg"),
        ("2", "../morning-2.jpg"),
        ("3", "../day.jpg"),
        ("4", "../night.jpg"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), ImageRef::from(v)))
    .collect();

    Catalog::Grouped(GroupedCatalog {
        images,
        groups: vec![
            RotationGroup {
                name: "morning".to_string(),
                key: "5".to_string(),
                members: vec!["1".to_string(), "2".to_string()],
            },
            RotationGroup {
                name: "day-night".to_string(),
                key: "6".to_string(),
                members: vec!["3".to_string(), "4".to_string()],
            },
        ],
        default_group: "morning".to_string(),
    })
}
