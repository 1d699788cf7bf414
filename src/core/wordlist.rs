//! Word selection for short build names
//!
//! Maps an arbitrary seed string onto a fixed vocabulary so that two builds
//! can be told apart at a glance. The mapping is SHA-256 of the seed, the
//! first eight digest bytes read as a big-endian `u64`, reduced modulo the
//! vocabulary length. Changing either the hash or the vocabulary renames
//! every past build.

use sha2::{Digest, Sha256};

/// Fixed vocabulary. Any edit, including appending, remaps existing names.
pub const WORDS: [&str; 256] = [
    "acacia", "acorn", "adder", "agate", "alder", "alpaca", "amber", "anchor",
    "anvil", "apple", "apricot", "arbor", "arrow", "aspen", "aster", "atlas",
    "aurora", "autumn", "badger", "bamboo", "banjo", "barley", "basil", "bay",
    "beacon", "bear", "beaver", "beetle", "birch", "bison", "blossom", "bluebell",
    "bobcat", "bramble", "breeze", "brook", "buffalo", "bugle", "cactus", "camel",
    "canary", "canyon", "cardinal", "caribou", "cedar", "cheetah", "cherry", "cinder",
    "citrus", "clover", "cobalt", "cobra", "comet", "condor", "copper", "coral",
    "cosmos", "cougar", "coyote", "crane", "cricket", "crocus", "crystal", "cypress",
    "dahlia", "daisy", "dawn", "delta", "desert", "dingo", "dolphin", "dove",
    "dragon", "drift", "dune", "eagle", "echo", "eclipse", "egret", "elder",
    "elm", "ember", "emerald", "ermine", "falcon", "fennel", "fern", "ferret",
    "festival", "fig", "finch", "fjord", "flint", "forest", "fossil", "fox",
    "galaxy", "garnet", "gazelle", "gecko", "geyser", "ginger", "glacier", "gopher",
    "granite", "grove", "gull", "harbor", "hawk", "hazel", "heather", "heron",
    "hickory", "horizon", "hornet", "husky", "ibis", "iceberg", "iris", "island",
    "ivory", "jackal", "jade", "jaguar", "jasmine", "jasper", "juniper", "kestrel",
    "kiwi", "koala", "lagoon", "lantern", "lark", "laurel", "lemon", "lemur",
    "lilac", "lily", "linden", "lion", "lobster", "lotus", "lynx", "magnet",
    "magpie", "mango", "maple", "marble", "marigold", "marlin", "marsh", "meadow",
    "meteor", "mink", "mint", "mirage", "moose", "moss", "moth", "nebula",
    "nectar", "newt", "nimbus", "nutmeg", "oak", "oasis", "ocelot", "olive",
    "onyx", "opal", "orbit", "orchid", "osprey", "otter", "owl", "panda",
    "panther", "papaya", "parrot", "pebble", "pelican", "penguin", "pepper", "pine",
    "planet", "plum", "poppy", "prairie", "puffin", "quail", "quartz", "quasar",
    "quill", "rabbit", "raccoon", "radish", "rain", "raven", "reef", "ridge",
    "river", "robin", "ruby", "sable", "saffron", "sage", "salmon", "sapphire",
    "season", "sequoia", "shadow", "shark", "sierra", "silver", "spark", "sparrow",
    "spruce", "squirrel", "starling", "stone", "storm", "summit", "sun", "swan",
    "tango", "tapir", "thistle", "thunder", "tiger", "timber", "topaz", "toucan",
    "trout", "tulip", "tundra", "turtle", "umber", "valley", "velvet", "violet",
    "viper", "walnut", "walrus", "willet", "willow", "wind", "winter", "wolf",
    "wren", "yak", "yarrow", "yew", "zebra", "zenith", "zephyr", "zinnia",
];

/// Select the vocabulary word for a seed
pub fn select_word(seed: &str) -> &'static str {
    WORDS[word_index(seed)]
}

/// Index into [`WORDS`] for a seed
pub fn word_index(seed: &str) -> usize {
    let digest = Sha256::digest(seed.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let value = u64::from_be_bytes(prefix);
    // WORDS.len() fits in u64 and the remainder fits back in usize
    (value % WORDS.len() as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_vocabulary_is_unique_and_non_empty() {
        let unique: HashSet<&str> = WORDS.iter().copied().collect();
        assert_eq!(unique.len(), WORDS.len());
        assert!(WORDS.iter().all(|w| !w.is_empty()));
        assert!(WORDS
            .iter()
            .all(|w| w.chars().all(|c| c.is_ascii_lowercase())));
    }

    #[test]
    fn test_select_word_known_seeds() {
        // SHA-256("") = e3b0c442 98fc1c14 ..., low byte of the first u64 is 0x14
        assert_eq!(word_index(""), 0x14);
        assert_eq!(select_word(""), WORDS[0x14]);
        // SHA-256("hello world") = b94d27b9 934d3e08 ...
        assert_eq!(word_index("hello world"), 0x08);
    }

    #[test]
    fn test_select_word_is_stable() {
        let seed = "{project-name}-240307-140509-abc1234-{shortname}+{platform}+{configuration}+main42";
        assert_eq!(select_word(seed), select_word(seed));
    }

    #[test]
    fn test_select_word_spreads_over_vocabulary() {
        let hits: HashSet<usize> = (0..4096).map(|i| word_index(&format!("build-{i}"))).collect();
        // 4096 seeds over 256 buckets should touch nearly all of them
        assert!(hits.len() > 240, "only {} buckets hit", hits.len());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(crate::config::defaults::MIN_PROPTEST_ITERATIONS))]

        #[test]
        fn prop_select_word_is_total(seed in ".*") {
            let word = select_word(&seed);
            prop_assert!(!word.is_empty());
            prop_assert!(WORDS.contains(&word));
        }
    }
}
