//! Display-name generator for anonymous players.

use rand::Rng;
use rand::seq::SliceRandom;

const ADJECTIVES: [&str; 8] = [
    "Crazy", "Happy", "Silent", "Brave", "Wild", "Lazy", "Fast", "Sneaky",
];

const NOUNS: [&str; 8] = [
    "Tiger", "Panda", "Wizard", "Ninja", "Pirate", "Robot", "Dragon", "Ghost",
];

/// Generates a display name like `BraveWizard417`.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("Quiet");
    let noun = NOUNS.choose(rng).copied().unwrap_or("Player");
    let number = rng.gen_range(0..1000);
    format!("{adjective}{noun}{number}")
}
