//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use ledgerview_protocol::{Collection, Record};
use rand::seq::SliceRandom;
use rand::Rng;

const PLAYERS: &[&str] = &[
    "LeBron James",
    "Zion Williamson",
    "Ja Morant",
    "Jayson Tatum",
    "Nikola Jokic",
    "Luka Doncic",
];

const TEAMS: &[&str] = &[
    "Los Angeles Lakers",
    "New Orleans Pelicans",
    "Memphis Grizzlies",
    "Boston Celtics",
    "Denver Nuggets",
    "Dallas Mavericks",
];

/// Generate one record with random player, team and serial fields.
pub fn random_record(id: u64, rng: &mut impl Rng) -> Record {
    Record::new(id)
        .with_field("serialNumber", rng.gen_range(1u64..60_000))
        .with_field("play.FullName", *PLAYERS.choose(rng).unwrap_or(&"Unknown"))
        .with_field("play.TeamAtMoment", *TEAMS.choose(rng).unwrap_or(&"Unknown"))
        .with_field("price", rng.gen_range(1.0f64..10_000.0))
}

/// Generate `count` records with ids `0..count`.
pub fn generate_records(count: u64) -> Vec<Record> {
    let mut rng = rand::thread_rng();
    (0..count).map(|id| random_record(id, &mut rng)).collect()
}

/// Generate a collection of `count` records.
pub fn generate_collection(count: u64) -> Collection {
    Collection::from_records(generate_records(count))
}
