//! Card types and the eight-deck shoe.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::error::ShoeError;

/// Card suit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suit {
    /// Hearts.
    Hearts,
    /// Diamonds.
    Diamonds,
    /// Clubs.
    Clubs,
    /// Spades.
    Spades,
}

const SUITS: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

/// A playing card.
///
/// `rank` is 1 (ace) through 13 (king); face value is derived separately
/// since an ace can count as 1 or 11 depending on the rest of the hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    /// The suit of the card.
    pub suit: Suit,
    /// The rank of the card (1 = Ace, 11 = Jack, 12 = Queen, 13 = King).
    pub rank: u8,
}

impl Card {
    /// Creates a new card.
    ///
    /// Note: This function does not validate the rank. Values outside 1..=13
    /// are accepted but may yield non-standard results when evaluating a hand.
    #[must_use]
    pub const fn new(suit: Suit, rank: u8) -> Self {
        Self { suit, rank }
    }

    /// Whether this card is an ace.
    #[must_use]
    pub const fn is_ace(&self) -> bool {
        self.rank == 1
    }

    /// Base face value: 2..9 face, 10/J/Q/K -> 10, ace -> 1 (soft promotion
    /// happens at the hand level, never here).
    #[must_use]
    pub const fn base_value(&self) -> u8 {
        match self.rank {
            1 => 1,
            2..=9 => self.rank,
            _ => 10,
        }
    }
}

/// Number of cards per deck.
pub const DECK_SIZE: usize = 52;

/// Number of decks mixed into the shoe (§3: "8×52 = 416 cards").
pub const SHOE_DECKS: usize = 8;

/// Total cards in a freshly built shoe.
pub const SHOE_SIZE: usize = DECK_SIZE * SHOE_DECKS;

/// The ordered card source a hand is dealt from.
///
/// Created at the start of each hand and destroyed when the hand ends;
/// `dealt` advances monotonically and a dealt card is never returned.
#[derive(Debug, Clone)]
pub struct Shoe {
    cards: Vec<Card>,
    dealt: usize,
}

impl Shoe {
    /// Builds a fresh, shuffled eight-deck shoe using the given RNG.
    #[must_use]
    pub fn new(rng: &mut ChaCha8Rng) -> Self {
        let mut cards = Vec::with_capacity(SHOE_SIZE);
        for _ in 0..SHOE_DECKS {
            for &suit in &SUITS {
                for rank in 1..=13u8 {
                    cards.push(Card::new(suit, rank));
                }
            }
        }
        cards.shuffle(rng);
        Self { cards, dealt: 0 }
    }

    /// Number of cards already dealt from this shoe.
    #[must_use]
    pub const fn dealt(&self) -> usize {
        self.dealt
    }

    /// Number of cards remaining in the shoe.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len() - self.dealt
    }

    /// Deals `n` cards, advancing the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`ShoeError::Exhausted`] if fewer than `n` cards remain; the
    /// cursor is left unchanged on failure.
    pub fn deal(&mut self, n: usize) -> Result<Vec<Card>, ShoeError> {
        if self.remaining() < n {
            return Err(ShoeError::Exhausted {
                requested: n,
                remaining: self.remaining(),
            });
        }
        let dealt = self.cards[self.dealt..self.dealt + n].to_vec();
        self.dealt += n;
        Ok(dealt)
    }
}
