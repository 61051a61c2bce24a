//! Translates numeric bearings to 8-point compass labels and formats the
//! distance/bearing strings shown next to the needle.

use serde::Deserialize;

/// Display language for labels and status strings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// German, the language the compass ships with.
    #[default]
    De,
    En,
}

/// Represents an 8-point compass rose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    N,  // north
    NE, // northeast
    E,  // east
    SE, // southeast
    S,  // south
    SW, // southwest
    W,  // west
    NW, // northwest
}

const ROSE: [Direction; 8] = [
    Direction::N,
    Direction::NE,
    Direction::E,
    Direction::SE,
    Direction::S,
    Direction::SW,
    Direction::W,
    Direction::NW,
];

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.abbreviation(Locale::En))
    }
}

impl Direction {
    /// German uses O (Ost) for east.
    pub fn abbreviation(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Direction::N, _) => "N",
            (Direction::NE, Locale::De) => "NO",
            (Direction::NE, Locale::En) => "NE",
            (Direction::E, Locale::De) => "O",
            (Direction::E, Locale::En) => "E",
            (Direction::SE, Locale::De) => "SO",
            (Direction::SE, Locale::En) => "SE",
            (Direction::S, _) => "S",
            (Direction::SW, _) => "SW",
            (Direction::W, _) => "W",
            (Direction::NW, _) => "NW",
        }
    }
}

/// Converts a bearing to an 8-point compass direction.
///
/// Each direction covers 45 degrees centred on its axis. A bearing exactly on
/// a sector boundary rounds up to the next direction clockwise.
pub fn compass_label(degrees: f64) -> Direction {
    let sector = (degrees / 45.0 + 0.5).floor() as i64;
    ROSE[sector.rem_euclid(8) as usize]
}

/// Whole meters below one kilometer, otherwise kilometers with one decimal.
/// Halves round away from zero in both cases.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{} m", (km * 1000.0).round() as i64)
    } else {
        format!("{:.1} km", (km * 10.0).round() / 10.0)
    }
}

/// Rounded bearing followed by its compass label, e.g. "141° SO".
pub fn format_bearing(degrees: f64, locale: Locale) -> String {
    format!(
        "{}° {}",
        degrees.round() as i64,
        compass_label(degrees).abbreviation(locale)
    )
}
