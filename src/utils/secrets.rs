use rand::seq::SliceRandom;
use uuid::Uuid;

/// Length of every paste identifier handed out by [`new_paste_id`].
pub const PASTE_ID_LEN: usize = 12;

/// Word list used for memorable passwords and invite codes.
pub const WORDS: &[&str] = &[
    "apple", "banana", "cherry", "dragon", "eagle", "falcon", "grape", "harbor", "island",
    "jungle", "kite", "lemon", "mango", "north", "ocean", "panda", "quartz", "river", "storm",
    "tiger", "unity", "violet", "whale", "xray", "yoga", "zebra", "anchor", "breeze", "castle",
    "dawn", "ember", "forest", "glacier", "hollow", "ivory", "jasper", "karma", "lunar", "marble",
    "nova", "orbit", "peak", "quest", "rain", "solar", "thunder", "ultra", "valley", "willow",
    "xenon", "yarn", "zenith", "azure", "blaze", "coral", "delta", "echo", "flame", "gold",
    "haven", "iron", "jade", "keen", "lotus", "meadow", "night", "olive", "pine", "quill", "rose",
    "sage", "thorn", "umbra", "vine", "wave", "xerox", "yield", "zephyr", "atlas", "bolt",
    "crest", "dusk", "edge", "frost", "glow", "haze", "ink", "jewel",
];

/// Generates a short, URL-safe paste identifier.
///
/// The first 12 hex digits of a random v4 UUID (48 bits). Uniqueness is not
/// checked here; the `pastes.id` primary key rejects a collision on insert.
pub fn new_paste_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(PASTE_ID_LEN);
    id
}

/// Generates a human-typeable `word-word` secret, e.g. `ember-quartz`.
///
/// Both words are drawn independently from [`WORDS`], so repeats are possible.
pub fn new_memorable_password() -> String {
    let mut rng = rand::thread_rng();
    let first = WORDS.choose(&mut rng).copied().unwrap_or("apple");
    let second = WORDS.choose(&mut rng).copied().unwrap_or("banana");
    format!("{}-{}", first, second)
}
