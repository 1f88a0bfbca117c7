//! Kuhn Poker as an explicit game tree.
//!
//! Kuhn Poker is a simplified poker game used to validate CFR implementations
//! because it has a known, mathematically proven Nash equilibrium.
//!
//! ## Game Rules
//!
//! - 3 cards: Jack (0), Queen (1), King (2)
//! - 2 players, each antes 1 chip
//! - Each player receives 1 card
//! - X acts first: Pass or Bet (1 chip)
//! - Y responds based on X's action
//! - Higher card wins at showdown
//!
//! ## Game Tree
//!
//! ```text
//! X (first to act)
//! ├── Pass
//! │   └── Y
//! │       ├── Pass → Showdown (pot = 2)
//! │       └── Bet
//! │           └── X
//! │               ├── Pass → Y wins (pot = 3)
//! │               └── Bet → Showdown (pot = 4)
//! └── Bet
//!     └── Y
//!         ├── Pass → X wins (pot = 3)
//!         └── Bet → Showdown (pot = 4)
//! ```
//!
//! Information-set keys are `"<card>:<history>"`, e.g. `"1:pb"` is X holding
//! the Queen after pass-bet.
//!
//! ## Known Nash Equilibrium
//!
//! X's strategy is a one-parameter family (bet the Jack with any α ∈ [0, 1/3],
//! the King with 3α); Y's strategy is unique:
//!
//! - **Y facing Bet with Jack**: Always Fold
//! - **Y facing Bet with Queen**: Call with probability 1/3
//! - **Y facing Bet with King**: Always Call
//! - **Y facing Pass with Jack**: Bet with probability 1/3
//! - **Y facing Pass with Queen**: Always Pass
//! - **Y facing Pass with King**: Always Bet
//!
//! **Expected Value**: X EV = -1/18 ≈ -0.0556

use std::fmt;

use crate::cfr::error::Result;
use crate::cfr::game::{Game, Reference};
use crate::cfr::tree::{Node, Player, Tree};

/// Actions in Kuhn Poker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KuhnAction {
    /// Pass (check if no bet, fold if facing bet)
    Pass,
    /// Bet (or call if facing bet)
    Bet,
}

impl KuhnAction {
    /// Both actions, in edge order.
    pub const ALL: [KuhnAction; 2] = [KuhnAction::Pass, KuhnAction::Bet];

    /// Character used in history strings.
    pub fn symbol(self) -> char {
        match self {
            KuhnAction::Pass => 'p',
            KuhnAction::Bet => 'b',
        }
    }

    /// Edge label.
    pub fn label(self) -> &'static str {
        match self {
            KuhnAction::Pass => "pass",
            KuhnAction::Bet => "bet",
        }
    }
}

impl fmt::Display for KuhnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KuhnAction::Pass => write!(f, "Pass"),
            KuhnAction::Bet => write!(f, "Bet"),
        }
    }
}

/// A dealt hand plus the betting so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KuhnState {
    /// cards[0] is X's card, cards[1] is Y's card
    pub cards: [u8; 2],
    /// Action history as string (e.g., "pb" = pass then bet)
    pub history: String,
}

impl KuhnState {
    /// Fresh deal with no actions.
    pub fn deal(x_card: u8, y_card: u8) -> Self {
        Self {
            cards: [x_card, y_card],
            history: String::new(),
        }
    }

    /// Terminal histories:
    /// "pp" (showdown), "pbp" (X folds), "pbb" (call), "bp" (Y folds), "bb" (call).
    pub fn is_terminal(&self) -> bool {
        matches!(self.history.as_str(), "pp" | "pbp" | "pbb" | "bp" | "bb")
    }

    /// Player to act, `None` at a terminal history.
    pub fn current_player(&self) -> Option<Player> {
        match self.history.as_str() {
            "" | "pb" => Some(Player::X),
            "p" | "b" => Some(Player::Y),
            _ => None,
        }
    }

    /// State after `action`.
    pub fn apply(&self, action: KuhnAction) -> Self {
        let mut next = self.clone();
        next.history.push(action.symbol());
        next
    }

    /// X's payoff at a terminal history.
    pub fn payoff_x(&self) -> f64 {
        let x_wins = self.cards[0] > self.cards[1];
        let showdown = |stake: f64| if x_wins { stake } else { -stake };

        match self.history.as_str() {
            "pp" => showdown(1.0),
            "bp" => 1.0,
            "pbp" => -1.0,
            "bb" | "pbb" => showdown(2.0),
            _ => 0.0,
        }
    }

    /// Information-set key of the player to act.
    pub fn info_key(&self) -> String {
        let card = match self.current_player() {
            Some(Player::Y) => self.cards[1],
            _ => self.cards[0],
        };
        format!("{}:{}", card, self.history)
    }
}

impl fmt::Display for KuhnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X:{} Y:{} History:{}",
            KuhnPoker::card_name(self.cards[0]),
            KuhnPoker::card_name(self.cards[1]),
            self.history
        )
    }
}

/// Kuhn Poker game.
#[derive(Debug, Clone, Copy, Default)]
pub struct KuhnPoker;

impl KuhnPoker {
    /// Create a new Kuhn Poker game.
    pub fn new() -> Self {
        Self
    }

    /// Get card name for display.
    pub fn card_name(card: u8) -> &'static str {
        match card {
            0 => "Jack",
            1 => "Queen",
            2 => "King",
            _ => "Unknown",
        }
    }

    fn build_node(state: &KuhnState) -> Node {
        match state.current_player() {
            None => Node::terminal(state.payoff_x()),
            Some(player) => Node::decision(
                player,
                state.info_key(),
                KuhnAction::ALL
                    .iter()
                    .map(|&action| (action.label(), Self::build_node(&state.apply(action)))),
            ),
        }
    }
}

impl Game for KuhnPoker {
    fn name(&self) -> String {
        "kuhn poker".to_string()
    }

    fn build_tree(&self) -> Result<Tree> {
        let mut deals = Vec::with_capacity(6);
        for x_card in 0..3u8 {
            for y_card in (0..3u8).filter(|&c| c != x_card) {
                let label = format!("{}/{}", Self::card_name(x_card), Self::card_name(y_card));
                deals.push((label, 1.0 / 6.0, Self::build_node(&KuhnState::deal(x_card, y_card))));
            }
        }
        Ok(Tree::new(Node::chance(deals)))
    }

    /// Y's unique strategy, the parts of X's strategy shared by the whole
    /// equilibrium family, and the game value.
    fn reference(&self) -> Option<Reference> {
        Some(
            Reference::new()
                .with_strategy("1:", [1.0, 0.0])
                .with_strategy("0:pb", [1.0, 0.0])
                .with_strategy("2:pb", [0.0, 1.0])
                .with_strategy("0:b", [1.0, 0.0])
                .with_strategy("1:b", [2.0 / 3.0, 1.0 / 3.0])
                .with_strategy("2:b", [0.0, 1.0])
                .with_strategy("0:p", [2.0 / 3.0, 1.0 / 3.0])
                .with_strategy("1:p", [1.0, 0.0])
                .with_strategy("2:p", [0.0, 1.0])
                .with_value(-1.0 / 18.0),
        )
    }
}
