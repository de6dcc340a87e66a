/// Game types added by "load default game types", with their vote emoji
pub const DEFAULT_GAME_TYPES: &[(&str, &str)] = &[
    ("Hide and Seek", "\u{1F3C5}"),       // :medal:
    ("Michael Myers", "\u{1F52A}"),       // :knife:
    ("Normal VS", "\u{1F396}"),           // :military_medal:
    ("Tactical Realism VS", "\u{1F3C6}"), // :trophy:
    ("Strat Roulette VS", "\u{1F3B0}"),   // :slot_machine:
    ("Clan VS Clan", "\u{1F93C}"),        // :people_wrestling:
];

/// Accepted layouts for dates typed without an offset
pub const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Longest event title accepted while drafting
pub const MAX_TITLE_LEN: usize = 200;

/// Longest event description accepted while drafting
pub const MAX_DESCRIPTION_LEN: usize = 1000;
