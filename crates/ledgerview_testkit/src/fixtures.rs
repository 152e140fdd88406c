//! Test fixtures: moment records and JSON collection files.
//!
//! Fixture records look like the ledger's moment listings: an integer
//! `id`, a set name, a serial number and a nested `play` object holding
//! the player and team. Everything is derived from the id so fixtures are
//! deterministic across runs.

use ledgerview_protocol::{Collection, Record, ID_FIELD};
use serde_json::{json, Value};
use std::io::Write;
use tempfile::NamedTempFile;

/// Player and team pairs cycled through by [`moment`].
pub const PLAYERS: &[(&str, &str)] = &[
    ("LeBron James", "Los Angeles Lakers"),
    ("Zion Williamson", "New Orleans Pelicans"),
    ("Ja Morant", "Memphis Grizzlies"),
    ("Jayson Tatum", "Boston Celtics"),
    ("Nikola Jokic", "Denver Nuggets"),
    ("Luka Doncic", "Dallas Mavericks"),
    ("Trae Young", "Atlanta Hawks"),
];

/// Set names cycled through by [`moment`].
pub const SETS: &[&str] = &["Base Set", "Metallic Gold LE", "Rising Stars", "Cool Cats"];

/// A moment as JSON.
pub fn moment_json(id: u64) -> Value {
    let (player, team) = PLAYERS[(id as usize) % PLAYERS.len()];
    json!({
        "id": id,
        "setName": SETS[(id as usize / PLAYERS.len()) % SETS.len()],
        "serialNumber": 1000 + (id * 37) % 1000,
        "play": {
            "FullName": player,
            "TeamAtMoment": team,
        },
    })
}

/// A JSON array of `n` moments with ids `0..n`.
pub fn moments_json(n: u64) -> Value {
    Value::Array((0..n).map(moment_json).collect())
}

/// A moment record with id `id`.
pub fn moment(id: u64) -> Record {
    let (player, team) = PLAYERS[(id as usize) % PLAYERS.len()];
    Record::new(id)
        .with_field(ID_FIELD, id)
        .with_field("setName", SETS[(id as usize / PLAYERS.len()) % SETS.len()])
        .with_field("serialNumber", 1000 + (id * 37) % 1000)
        .with_field("play.FullName", player)
        .with_field("play.TeamAtMoment", team)
}

/// `n` moment records with ids `0..n`.
pub fn moments(n: u64) -> Vec<Record> {
    (0..n).map(moment).collect()
}

/// `n` moments with ids `start..start + n`.
pub fn moments_from(start: u64, n: u64) -> Vec<Record> {
    (start..start + n).map(moment).collect()
}

/// A collection of `n` moments.
pub fn moment_collection(n: u64) -> Collection {
    Collection::from_records(moments(n))
}

/// Records carrying only an identifier, as returned by id-only listings.
pub fn id_records(ids: impl IntoIterator<Item = u64>) -> Vec<Record> {
    ids.into_iter().map(Record::new).collect()
}

/// Writes `value` to a temporary `.json` file.
///
/// The file is removed when the returned handle is dropped.
pub fn json_file(value: &Value) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("Failed to create temp file");
    serde_json::to_writer_pretty(&mut file, value).expect("Failed to write fixture JSON");
    file.flush().expect("Failed to flush fixture file");
    file
}
