//! End-to-end integration tests for a single match instance: full tick-driven
//! hand life-cycles, presence lifecycle edge cases, and the settlement
//! invariants that only show up once the state machine, turn scheduler and
//! game engine are wired together.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use blackjack_table_core::card::{Card, Suit};
use blackjack_table_core::clock::TestClock;
use blackjack_table_core::config::MatchConfig;
use blackjack_table_core::hand::HandPosition;
use blackjack_table_core::host::{MatchEvent, MatchHost, Opcode, WalletError};
use blackjack_table_core::ids::UserId;
use blackjack_table_core::match_handler::{Match, MatchParams};
use blackjack_table_core::match_state::MatchState;
use blackjack_table_core::messages::{ActionCode, BetCode, BetRequest, DeclareCardsRequest, InboundMessage};
use blackjack_table_core::presence::Presence;
use blackjack_table_core::processor;
use blackjack_table_core::rng::MatchRng;
use blackjack_table_core::state_machine::GamePhase;
use blackjack_table_core::wallet::WalletUpdate;

/// A host double that records every broadcast and keeps wallet balances in
/// a plain in-memory map, mirroring the processor module's own test harness.
struct FakeHost {
    balances: RefCell<HashMap<UserId, i64>>,
    broadcasts: RefCell<Vec<(Opcode, Vec<u8>)>>,
    kicked: RefCell<Vec<UserId>>,
}

impl FakeHost {
    fn new() -> Self {
        Self {
            balances: RefCell::new(HashMap::new()),
            broadcasts: RefCell::new(Vec::new()),
            kicked: RefCell::new(Vec::new()),
        }
    }

    fn set_balance(&self, user_id: &UserId, amount: i64) {
        self.balances.borrow_mut().insert(user_id.clone(), amount);
    }

    fn balance(&self, user_id: &UserId) -> i64 {
        self.balances.borrow().get(user_id).copied().unwrap_or(0)
    }

    fn count(&self, opcode: Opcode) -> usize {
        self.broadcasts.borrow().iter().filter(|(op, _)| *op == opcode).count()
    }
}

impl MatchHost for FakeHost {
    fn broadcast(&mut self, opcode: Opcode, payload: &[u8], _to: Option<&[UserId]>, _from: Option<&UserId>, _reliable: bool) {
        self.broadcasts.borrow_mut().push((opcode, payload.to_vec()));
    }
    fn match_label_update(&mut self, _label_json: &[u8]) {}
    fn match_kick(&mut self, users: &[UserId]) {
        self.kicked.borrow_mut().extend(users.iter().cloned());
    }
    fn wallets_update(&mut self, updates: &[WalletUpdate<'_>], _atomic: bool) -> Result<(), WalletError> {
        let mut balances = self.balances.borrow_mut();
        for update in updates {
            *balances.entry(update.user_id.clone()).or_insert(0) += update.delta;
        }
        Ok(())
    }
    fn read_wallets(&self, users: &[UserId]) -> Vec<(UserId, i64)> {
        let balances = self.balances.borrow();
        users.iter().map(|u| (u.clone(), balances.get(u).copied().unwrap_or(0))).collect()
    }
    fn emit_event(&mut self, _event: MatchEvent) {}
}

fn user(n: &str) -> UserId {
    UserId::from(n)
}

/// Turns on `tracing` output for the duration of a single test via a scoped
/// default subscriber, mirroring how the pack wires `tracing_subscriber` into
/// its own tests rather than installing a global logger for the whole suite.
fn init_tracing() -> tracing::subscriber::DefaultGuard {
    use tracing_subscriber::util::SubscriberInitExt;
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish()
        .set_default()
}

fn quick_config() -> MatchConfig {
    MatchConfig {
        tick_rate: 2,
        idle_duration: Duration::from_millis(1),
        matching_duration: Duration::from_millis(1),
        preparing_duration: Duration::from_millis(5),
        play_duration: Duration::from_secs(30),
        reward_duration: Duration::from_millis(1),
        insurance_phase_duration: Duration::from_millis(1),
        playing_phase_duration: Duration::from_millis(1),
        shoe_decks: 8,
        max_seats: 5,
        min_presences: 1,
        idle_kick_threshold: 2,
        auto_leave_chip_floor: 0,
        bet_unit: 100,
    }
}

/// Drives one full tick cycle: a human joins, bets, plays every hand by
/// standing, and the table returns to `Matching` ready for the next one.
/// Exercises §8 scenario 2 (a complete hand with no errors raised anywhere
/// along the way) without pinning down the exact cards dealt.
#[test]
fn full_hand_lifecycle_returns_to_matching_and_conserves_chips() {
    let _tracing = init_tracing();
    let config = quick_config();
    let clock = TestClock::new();
    let (mut table, tick_rate, label) = Match::init(
        MatchParams {
            match_id: "t1".into(),
            name: "Test Table".into(),
            password: None,
            num_bot: 0,
        },
        config,
        MatchRng::from_seed(42),
        &clock,
    );
    assert_eq!(tick_rate, 2);
    assert!(label.open);
    assert_eq!(table.phase(), GamePhase::Idle);

    let mut host = FakeHost::new();
    host.set_balance(&user("u1"), 10_000);
    table.join(vec![Presence::human(user("u1"), "U1".into(), 0, "s1".into())], &mut host);

    let mut clock = TestClock::new();
    let mut bet_sent = false;
    let mut reached_play = false;
    let mut reached_matching_again = false;
    for _ in 0..400 {
        let mut inbound = Vec::new();
        if table.phase() == GamePhase::Preparing && !bet_sent {
            inbound.push((user("u1"), InboundMessage::Bet(BetRequest { code: BetCode::Normal, amount: 100 })));
            bet_sent = true;
        }
        if table.phase() == GamePhase::Play {
            reached_play = true;
            if table.state().current_turn() == Some(&user("u1")) && table.state().is_allow_action() {
                inbound.push((
                    user("u1"),
                    InboundMessage::DeclareCards(DeclareCardsRequest {
                        code: ActionCode::Stay,
                        accept_insurance: false,
                    }),
                ));
            }
        }
        clock.advance(Duration::from_millis(2));
        table.loop_tick(&clock, &mut host, inbound).expect("match never reaches Finish here");
        if reached_play && table.phase() == GamePhase::Matching {
            reached_matching_again = true;
            break;
        }
    }

    assert!(bet_sent, "bet should have been placed during Preparing");
    assert!(reached_play, "match should have entered Play");
    assert!(reached_matching_again, "match should cycle back to Matching after Reward");
    assert!(host.count(Opcode::UpdateFinish) >= 1);
    assert!(host.count(Opcode::UpdateDeal) >= 4, "dealer and player cards should have been announced");
    // A 100-chip bet was debited, then some amount credited back; the
    // balance never goes negative or above what a single-hand swing allows.
    let balance = host.balance(&user("u1"));
    assert!((9_700..=10_300).contains(&balance), "balance {balance} outside plausible single-hand range");
}

/// §8 scenario 5: a table seated only with bots never leaves `Preparing`
/// for `Play`, since `human_count` stays zero.
#[test]
fn bot_only_table_never_enters_play() {
    let config = quick_config();
    let clock = TestClock::new();
    let (mut table, _, _) = Match::init(
        MatchParams {
            match_id: "t2".into(),
            name: "Bot Table".into(),
            password: None,
            num_bot: 2,
        },
        config,
        MatchRng::from_seed(7),
        &clock,
    );

    let mut host = FakeHost::new();
    table.join(
        vec![
            Presence::bot(user("bot1"), "Bot1".into()),
            Presence::bot(user("bot2"), "Bot2".into()),
        ],
        &mut host,
    );

    let mut clock = TestClock::new();
    for _ in 0..20 {
        clock.advance(Duration::from_millis(2));
        table.loop_tick(&clock, &mut host, Vec::new()).unwrap();
        assert_ne!(table.phase(), GamePhase::Play, "a bot-only table must never deal a hand");
    }
}

/// §8 scenario 4: a seat that never places a bet for `idle_kick_threshold`
/// consecutive hands is auto-removed at the next `Preparing` entry.
#[test]
fn idle_presence_is_kicked_after_threshold_hands() {
    let config = MatchConfig::default().with_idle_kick_threshold(2);
    let mut state = MatchState::new();
    let idle_user = Presence::human(user("idle"), "Idle".into(), 0, "s".into());
    state.presences.insert(idle_user.clone());
    state.no_interact.increment(&idle_user.user_id);
    state.no_interact.increment(&idle_user.user_id);

    let mut host = FakeHost::new();
    processor::process_apply_presences_leave(&mut state, &config, &mut host);

    assert!(!state.presences.contains(&user("idle")));
    assert_eq!(host.count(Opcode::KickOffTheTable), 1);
    assert_eq!(*host.kicked.borrow(), vec![user("idle")]);
}

/// A presence that keeps betting every hand never accumulates a no-interact
/// streak, so it survives the idle-kick sweep indefinitely.
#[test]
fn presence_that_keeps_betting_is_never_kicked() {
    let config = MatchConfig::default().with_idle_kick_threshold(2);
    let mut state = MatchState::new();
    let active = Presence::human(user("active"), "Active".into(), 0, "s".into());
    state.presences.insert(active.clone());
    state.no_interact.increment(&active.user_id);
    state.add_bet(&active.user_id, 100); // resets the counter, as a real bet does

    let mut host = FakeHost::new();
    processor::process_apply_presences_leave(&mut state, &config, &mut host);

    assert!(state.presences.contains(&user("active")));
    assert_eq!(host.count(Opcode::KickOffTheTable), 0);
}

/// §8 scenario 3: split a pair of 8s, double the first sub-hand, stand on
/// the second, and check the settlement nets out to the expected delta —
/// exercised directly against `MatchState`/`GameEngine` with hand-picked
/// cards rather than a shuffled shoe, since the scenario requires an exact
/// sequence of draws.
#[test]
fn split_then_double_settles_each_sub_hand_independently() {
    let mut state = MatchState::new();
    state.presences.insert(Presence::human(user("u1"), "U1".into(), 0, "s".into()));
    state.add_bet(&user("u1"), 100);
    state.setup_match_presence();

    let hand = state.player_hand_mut(&user("u1"));
    hand.first.add_card(Card::new(Suit::Spades, 8));
    hand.first.add_card(Card::new(Suit::Hearts, 8));

    let balance = 10_000;
    let (can_split, _) = state.is_can_split_hand(&user("u1"), balance);
    assert!(can_split);
    let split_added = state.split_hand(&user("u1")).unwrap();
    assert_eq!(split_added, 100);

    // One card into each sub-hand, as the processor does around a split.
    state.add_cards(&user("u1"), HandPosition::First, &[Card::new(Suit::Clubs, 10)]);
    state.add_cards(&user("u1"), HandPosition::Second, &[Card::new(Suit::Diamonds, 9)]);

    // First sub-hand is 8+10=18; double down, drawing a 3 -> 21.
    assert!(state.is_can_double_down(&user("u1"), balance, HandPosition::First));
    let double_added = state.double_down_bet(&user("u1"), HandPosition::First).unwrap();
    assert_eq!(double_added, 100, "double_down_bet returns only the newly staked increment");
    state.add_cards(&user("u1"), HandPosition::First, &[Card::new(Suit::Spades, 3)]);

    // Second sub-hand is 8+9=17, player stands.
    assert_eq!(state.player_hand(&user("u1")).unwrap().first.cp().point, 21);
    assert_eq!(
        state.player_hand(&user("u1")).unwrap().second.as_ref().unwrap().cp().point,
        17
    );

    // Dealer draws to a hard 20.
    state.dealer_hand_mut().first.add_card(Card::new(Suit::Clubs, 10));
    state.dealer_hand_mut().first.add_card(Card::new(Suit::Hearts, 4));
    state.dealer_hand_mut().first.add_card(Card::new(Suit::Diamonds, 6));

    let results = state.finish();
    assert_eq!(results.len(), 1);
    let (uid, result, _report) = &results[0];
    assert_eq!(uid, &user("u1"));
    // First sub-hand: 21 beats 20, stake 200 doubled, 1:1, VIP 0 fee 7% of
    // 200 profit = 14, credited = 200 + 200 - 14 = 386.
    assert_eq!(result.first_credit, 386);
    // Second sub-hand: 17 loses to 20, credits nothing.
    assert_eq!(result.second_credit, Some(0));
    let net = result.total_credit() - 300; // 300 total staked across both legs
    assert_eq!(net, 86);
}

/// §8 scenario 6: when the shoe cannot satisfy the opening deal, the engine
/// reports the failure rather than dealing a partial hand, and
/// `process_new_game` marks the hand ended immediately so the state machine
/// can route through to settlement/teardown instead of hanging in `Play`.
#[test]
fn new_game_with_an_exhausted_shoe_ends_the_hand_without_dealing() {
    use blackjack_table_core::game_engine::GameEngine;
    use blackjack_table_core::turn_scheduler::TurnBaseEngine;

    let mut state = MatchState::new();
    state.presences.insert(Presence::human(user("u1"), "U1".into(), 0, "s".into()));
    state.add_bet(&user("u1"), 100);
    state.setup_match_presence();

    let config = MatchConfig::default();
    let mut rng = MatchRng::from_seed(5);
    let mut engine = GameEngine::new_game(&mut state, &config, &mut rng);
    // Drain the shoe down to one card so the opening deal cannot complete.
    engine.deal(blackjack_table_core::card::SHOE_SIZE - 1).unwrap();

    let mut turn_engine = TurnBaseEngine::new();
    let clock = TestClock::new();
    let mut host = FakeHost::new();
    processor::process_new_game(&mut state, &mut engine, &mut turn_engine, &config, &clock, &mut host);

    assert!(state.is_game_ended());
    assert!(state.player_hand(&user("u1")).is_none());
}

/// A seat leaving mid-hand is queued rather than removed immediately, and
/// is only actually dropped once `process_match_kick` runs at the next
/// matching/reward boundary.
#[test]
fn leaving_mid_hand_is_deferred_to_the_next_boundary() {
    let mut state = MatchState::new();
    let presence = Presence::human(user("u1"), "U1".into(), 0, "s".into());
    state.presences.insert(presence.clone());
    state.playing_presences.insert(presence);

    let mut host = FakeHost::new();
    processor::process_leave(&mut state, &mut host, &[user("u1")], true);
    assert!(state.presences.contains(&user("u1")), "still seated mid-hand");
    assert!(state.leave_presences.contains(&user("u1")));

    processor::process_match_kick(&mut state, &mut host);
    assert!(!state.presences.contains(&user("u1")), "removed once the boundary is reached");
    assert_eq!(host.count(Opcode::KickOffTheTable), 1);
}
