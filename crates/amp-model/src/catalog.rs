//! Songs that ship with the game.

/// Song identifiers present in an unmodified game.
pub const BASE_SONGS: [&str; 35] = [
    "allthetime",
    "assault_on",
    "astrosight",
    "breakforme",
    "concept",
    "crazy_ride",
    "credits",
    "crystal",
    "dalatecht",
    "decode_me",
    "digitalparalysis",
    "donot",
    "dreamer",
    "energize",
    "entomophobia",
    "forcequit",
    "humanlove",
    "impossible",
    "iseeyou",
    "lights",
    "magpie",
    "muze",
    "necrodancer",
    "perfectbrain",
    "phantoms",
    "recession",
    "redgiant",
    "supraspatial",
    "synthesized2014",
    "tut0",
    "tut1",
    "tutc",
    "unfinished",
    "wayfarer",
    "wetware",
];

/// Tutorial and credits songs. They are never offered as add candidates.
pub const SPECIAL_SONGS: [&str; 4] = ["credits", "tut0", "tut1", "tutc"];

/// Whether `id` names a song that ships with the game (case-insensitive).
#[must_use]
pub fn is_base_song(id: &str) -> bool {
    BASE_SONGS.iter().any(|song| song.eq_ignore_ascii_case(id))
}

/// Whether `id` names a tutorial or credits song (case-insensitive).
#[must_use]
pub fn is_special_song(id: &str) -> bool {
    SPECIAL_SONGS.iter().any(|song| song.eq_ignore_ascii_case(id))
}
