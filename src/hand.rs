//! Hand evaluation (§3 "Hand", §4.2 "Hand evaluation").
//!
//! Evaluation is pure over the card sequence — it never depends on whether
//! actions have been issued (§4.2 invariant), so every accessor here is a
//! plain function of `&[Card]`/`&SubHand`, never mutable state.

use crate::card::Card;
use crate::ids::UserId;

/// Derived point totals for one sub-hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CPoint {
    /// Final value after optional ace promotion.
    pub point: u8,
    /// Hard total (all aces count as 1).
    pub min_point: u8,
    /// Soft total when promotable and not busted, else equal to `min_point`.
    pub max_point: u8,
}

/// A sub-hand's evaluated category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandType {
    /// No cards dealt yet.
    Unspecified,
    /// Neither blackjack, 21, nor busted.
    Normal,
    /// Two-card 21 on the first hand, before any split.
    Blackjack,
    /// 21 reached any other way (after a split, or by drawing up to 21).
    TwentyOne,
    /// Point exceeds 21.
    Busted,
}

impl HandType {
    /// Ranking position used by [`compare`] once `Busted` has been handled
    /// as a special case; order matches §3's listed type set.
    const fn ordinal(self) -> u8 {
        match self {
            Self::Unspecified => 0,
            Self::Normal => 1,
            Self::Blackjack => 2,
            Self::TwentyOne => 3,
            Self::Busted => 4,
        }
    }
}

/// Which sub-hand an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandPosition {
    /// The original hand.
    First,
    /// The hand created by a split (only exists after `Hand::split`).
    Second,
}

/// Computes hard/soft totals for a raw card sequence.
#[must_use]
pub fn evaluate_cards(cards: &[Card]) -> CPoint {
    if cards.is_empty() {
        return CPoint {
            point: 0,
            min_point: 0,
            max_point: 0,
        };
    }
    let mut hard: u16 = 0;
    let mut has_ace = false;
    for card in cards {
        hard += u16::from(card.base_value());
        has_ace |= card.is_ace();
    }
    let soft = if has_ace && hard <= 11 { hard + 10 } else { hard };
    CPoint {
        point: soft as u8,
        min_point: hard as u8,
        max_point: soft as u8,
    }
}

/// One sub-hand's cards plus whether the player has stood on it.
#[derive(Debug, Clone, Default)]
pub struct SubHand {
    cards: Vec<Card>,
    /// Set once the player stands, doubles, busts, or reaches 21/blackjack.
    pub stay: bool,
}

impl SubHand {
    /// An empty, active sub-hand.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cards: Vec::new(),
            stay: false,
        }
    }

    /// A sub-hand seeded with a single card (used when splitting).
    #[must_use]
    pub fn from_card(card: Card) -> Self {
        Self {
            cards: vec![card],
            stay: false,
        }
    }

    /// The cards dealt to this sub-hand so far.
    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Appends a card.
    pub fn add_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Current point totals.
    #[must_use]
    pub fn cp(&self) -> CPoint {
        evaluate_cards(&self.cards)
    }
}

/// A player's (or the dealer's) hand: an original sub-hand plus an
/// optional second sub-hand created by a split.
#[derive(Debug, Clone)]
pub struct Hand {
    /// Owning user id, or [`UserId::dealer`] for the dealer's hand.
    pub owner: UserId,
    /// The original sub-hand.
    pub first: SubHand,
    /// Populated only after a split.
    pub second: Option<SubHand>,
}

impl Hand {
    /// A fresh, empty hand for `owner`.
    #[must_use]
    pub fn new(owner: UserId) -> Self {
        Self {
            owner,
            first: SubHand::new(),
            second: None,
        }
    }

    fn sub(&self, pos: HandPosition) -> Option<&SubHand> {
        match pos {
            HandPosition::First => Some(&self.first),
            HandPosition::Second => self.second.as_ref(),
        }
    }

    /// Mutable access to a sub-hand; `Second` is created lazily only by
    /// [`Hand::split`], never here.
    pub fn sub_mut(&mut self, pos: HandPosition) -> Option<&mut SubHand> {
        match pos {
            HandPosition::First => Some(&mut self.first),
            HandPosition::Second => self.second.as_mut(),
        }
    }

    /// `eval(position)` from §4.2: totals, the UI ace-text hint, and the
    /// hand's type.
    #[must_use]
    pub fn eval(&self, pos: HandPosition) -> (CPoint, &'static str, HandType) {
        let Some(sub) = self.sub(pos) else {
            return (
                CPoint {
                    point: 0,
                    min_point: 0,
                    max_point: 0,
                },
                "",
                HandType::Unspecified,
            );
        };
        let cp = sub.cp();
        if sub.cards().is_empty() {
            return (cp, "", HandType::Unspecified);
        }
        let is_blackjack = matches!(pos, HandPosition::First)
            && self.second.is_none()
            && sub.cards().len() == 2
            && cp.point == 21;
        let hand_type = if cp.point > 21 {
            HandType::Busted
        } else if cp.point == 21 {
            if is_blackjack {
                HandType::Blackjack
            } else {
                HandType::TwentyOne
            }
        } else {
            HandType::Normal
        };
        let ace_text = if matches!(hand_type, HandType::Blackjack) {
            ""
        } else if cp.max_point != cp.min_point && cp.point == cp.max_point {
            "soft"
        } else {
            "hard"
        };
        (cp, ace_text, hand_type)
    }

    /// §3: `PlayerCanDraw` — not stayed and point below 21.
    #[must_use]
    pub fn can_draw(&self, pos: HandPosition) -> bool {
        let Some(sub) = self.sub(pos) else {
            return false;
        };
        !sub.stay && sub.cp().point < 21
    }

    /// §3: `PlayerCanSplit` — no second hand yet, exactly two cards, and
    /// the two cards share a value (10/J/Q/K are mutually splittable).
    #[must_use]
    pub fn can_split(&self) -> bool {
        self.second.is_none()
            && self.first.cards().len() == 2
            && self.first.cards()[0].base_value() == self.first.cards()[1].base_value()
    }

    /// §3: `DealerMustDraw` — first hand only, point below 17. Soft 17
    /// (point = 17 after ace promotion) therefore stands, not draws: the
    /// rule is purely `point < 17` regardless of softness (see DESIGN.md).
    #[must_use]
    pub fn dealer_must_draw(&self) -> bool {
        self.first.cp().point < 17
    }

    /// §3: `DealerPotentialBlackjack` — first up-card is an ace.
    #[must_use]
    pub fn dealer_potential_blackjack(&self) -> bool {
        self.first.cards().first().is_some_and(Card::is_ace)
    }

    /// Splits the hand: moves the second original card into a new second
    /// sub-hand. Caller (the game engine) deals one card into each
    /// afterward. Panics if [`Hand::can_split`] was not checked first.
    pub fn split(&mut self) {
        debug_assert!(self.can_split(), "split() called on a non-splittable hand");
        let second_card = self.first.cards.pop().expect("two cards present");
        self.second = Some(SubHand::from_card(second_card));
    }

    /// §8 "Round-trip": comparing each player hand to a dealer hand.
    ///
    /// `BUSTED` always loses; otherwise ranks lexicographically by
    /// `(type-ordinal, point)`. Returns `(first_result, second_result)`
    /// where each result is `-1` (lose), `0` (push/no-bet), or `1` (win).
    /// A sub-hand that was never played (`Unspecified`) contributes `0`.
    #[must_use]
    pub fn compare(&self, dealer: &Hand) -> (i8, i8) {
        let (dealer_cp, _, dealer_type) = dealer.eval(HandPosition::First);
        let rank = |pos: HandPosition| -> i8 {
            let (cp, _, hand_type) = self.eval(pos);
            if matches!(hand_type, HandType::Unspecified) {
                return 0;
            }
            if matches!(hand_type, HandType::Busted) {
                return -1;
            }
            match hand_type.ordinal().cmp(&dealer_type.ordinal()) {
                std::cmp::Ordering::Greater => 1,
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => match cp.point.cmp(&dealer_cp.point) {
                    std::cmp::Ordering::Greater => 1,
                    std::cmp::Ordering::Less => -1,
                    std::cmp::Ordering::Equal => 0,
                },
            }
        };
        (rank(HandPosition::First), rank(HandPosition::Second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Suit;

    fn card(suit: Suit, rank: u8) -> Card {
        Card::new(suit, rank)
    }

    #[test]
    fn natural_blackjack_on_first_two_cards() {
        let mut hand = Hand::new(UserId::from("u1"));
        hand.first.add_card(card(Suit::Spades, 1));
        hand.first.add_card(card(Suit::Hearts, 13));
        let (cp, text, ty) = hand.eval(HandPosition::First);
        assert_eq!(cp.point, 21);
        assert_eq!(text, "");
        assert!(matches!(ty, HandType::Blackjack));
    }

    #[test]
    fn twenty_one_after_split_is_not_blackjack() {
        let mut hand = Hand::new(UserId::from("u1"));
        hand.first.add_card(card(Suit::Spades, 8));
        hand.first.add_card(card(Suit::Hearts, 8));
        assert!(hand.can_split());
        hand.split();
        hand.first.add_card(card(Suit::Clubs, 1));
        hand.second.as_mut().unwrap().add_card(card(Suit::Diamonds, 1));
        let (cp, _, ty) = hand.eval(HandPosition::First);
        assert_eq!(cp.point, 19);
        assert!(matches!(ty, HandType::Normal));

        // Drive the first sub-hand to a post-split 21 to confirm TwentyOne,
        // not Blackjack.
        let mut hand2 = Hand::new(UserId::from("u2"));
        hand2.first.add_card(card(Suit::Spades, 10));
        hand2.first.add_card(card(Suit::Hearts, 10));
        hand2.split();
        hand2.first.add_card(card(Suit::Clubs, 1));
        let (cp2, _, ty2) = hand2.eval(HandPosition::First);
        assert_eq!(cp2.point, 21);
        assert!(matches!(ty2, HandType::TwentyOne));
    }

    #[test]
    fn busted_always_loses_regardless_of_dealer_type() {
        let mut player = Hand::new(UserId::from("u1"));
        player.first.add_card(card(Suit::Spades, 10));
        player.first.add_card(card(Suit::Hearts, 10));
        player.first.add_card(card(Suit::Clubs, 5));
        let mut dealer = Hand::new(UserId::dealer());
        dealer.first.add_card(card(Suit::Spades, 10));
        dealer.first.add_card(card(Suit::Hearts, 9));
        let (r1, _) = player.compare(&dealer);
        assert_eq!(r1, -1);
    }

    #[test]
    fn two_blackjacks_push() {
        let mut player = Hand::new(UserId::from("u1"));
        player.first.add_card(card(Suit::Spades, 1));
        player.first.add_card(card(Suit::Hearts, 11));
        let mut dealer = Hand::new(UserId::dealer());
        dealer.first.add_card(card(Suit::Clubs, 1));
        dealer.first.add_card(card(Suit::Diamonds, 12));
        let (r1, _) = player.compare(&dealer);
        assert_eq!(r1, 0);
    }

    #[test]
    fn soft_17_reports_soft_ace_text_and_dealer_must_not_draw() {
        let mut dealer = Hand::new(UserId::dealer());
        dealer.first.add_card(card(Suit::Spades, 1));
        dealer.first.add_card(card(Suit::Hearts, 6));
        let (cp, text, _) = dealer.eval(HandPosition::First);
        assert_eq!(cp.point, 17);
        assert_eq!(text, "soft");
        assert!(!dealer.dealer_must_draw());
    }

    #[test]
    fn evaluation_is_order_independent() {
        let cards_a = [card(Suit::Spades, 1), card(Suit::Hearts, 9), card(Suit::Clubs, 2)];
        let cards_b = [card(Suit::Clubs, 2), card(Suit::Spades, 1), card(Suit::Hearts, 9)];
        assert_eq!(evaluate_cards(&cards_a), evaluate_cards(&cards_b));
    }
}
