//! Extensive-form game tree model.
//!
//! A game is an owned tree of [`Node`]s: chance nodes with labelled outcome
//! probabilities, decision nodes for player X or Y, and terminal nodes holding
//! X's payoff (the game is zero-sum, so Y receives the negation).
//!
//! Decision nodes do not own strategy state. They carry an information-set
//! key, and every node with the same key maps onto the same registry entry.
//! Giving the second mover of a simultaneous game one decision node per
//! first-mover action, all under a single key, is how simultaneous play is
//! modelled.
//!
//! ```text
//! chance ── start (p=1)
//!   └── Y [Y:choice]
//!       ├── none  ── X [X:choice] ── none / penny ── terminal
//!       └── penny ── X [X:choice] ── none / penny ── terminal
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cfr::error::{Result, SolverError};

/// Deepest tree accepted by [`Tree::validate`].
pub const MAX_DEPTH: usize = 512;

/// Default tolerance on `|Σp − 1|` at chance nodes.
pub const DEFAULT_CHANCE_TOLERANCE: f64 = 1e-9;

/// The two players of a zero-sum game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Player {
    /// Reference player; terminal payoffs are stored from X's point of view.
    X,
    /// The opponent.
    Y,
}

impl Player {
    /// Both players, in traversal order.
    pub const BOTH: [Player; 2] = [Player::X, Player::Y];

    /// Index into per-player arrays.
    pub fn index(self) -> usize {
        match self {
            Player::X => 0,
            Player::Y => 1,
        }
    }

    /// The other player.
    pub fn opponent(self) -> Self {
        match self {
            Player::X => Player::Y,
            Player::Y => Player::X,
        }
    }

    /// Multiplier turning an X payoff into this player's payoff.
    pub fn sign(self) -> f64 {
        match self {
            Player::X => 1.0,
            Player::Y => -1.0,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::X => write!(f, "X"),
            Player::Y => write!(f, "Y"),
        }
    }
}

/// A labelled action leaving a decision node.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Action label, unique within the node.
    pub action: String,
    /// Subtree reached by taking the action.
    pub child: Node,
}

/// A labelled, weighted outcome of a chance node.
#[derive(Debug, Clone, PartialEq)]
pub struct ChanceOutcome {
    /// Outcome label (e.g. `"Y hand = nuts"`).
    pub label: String,
    /// Probability of the outcome.
    pub probability: f64,
    /// Subtree reached on this outcome.
    pub child: Node,
}

/// Variant tag of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Nature moves.
    Chance,
    /// A player moves.
    Decision,
    /// The game is over.
    Terminal,
}

/// A node of an extensive-form game tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Nature samples one of the outcomes.
    Chance {
        /// Outcomes with probabilities summing to 1.
        outcomes: Vec<ChanceOutcome>,
    },
    /// `player` picks one of the edges without seeing anything beyond `info_key`.
    Decision {
        /// Acting player.
        player: Player,
        /// Information-set key shared by indistinguishable nodes.
        info_key: String,
        /// Legal actions in a fixed order.
        edges: Vec<Edge>,
    },
    /// End of play.
    Terminal {
        /// Payoff to X; Y receives `-payoff`.
        payoff: f64,
    },
}

impl Node {
    /// Terminal node paying `payoff` to X.
    pub fn terminal(payoff: f64) -> Self {
        Node::Terminal { payoff }
    }

    /// Decision node for `player` bound to information set `info_key`.
    pub fn decision<K, A, I>(player: Player, info_key: K, edges: I) -> Self
    where
        K: Into<String>,
        A: Into<String>,
        I: IntoIterator<Item = (A, Node)>,
    {
        Node::Decision {
            player,
            info_key: info_key.into(),
            edges: edges
                .into_iter()
                .map(|(action, child)| Edge {
                    action: action.into(),
                    child,
                })
                .collect(),
        }
    }

    /// Chance node from `(label, probability, child)` triples.
    pub fn chance<L, I>(outcomes: I) -> Self
    where
        L: Into<String>,
        I: IntoIterator<Item = (L, f64, Node)>,
    {
        Node::Chance {
            outcomes: outcomes
                .into_iter()
                .map(|(label, probability, child)| ChanceOutcome {
                    label: label.into(),
                    probability,
                    child,
                })
                .collect(),
        }
    }

    /// The variant tag.
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Chance { .. } => NodeKind::Chance,
            Node::Decision { .. } => NodeKind::Decision,
            Node::Terminal { .. } => NodeKind::Terminal,
        }
    }

    /// True for terminal nodes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Node::Terminal { .. })
    }

    /// Acting player at a decision node.
    pub fn player(&self) -> Option<Player> {
        match self {
            Node::Decision { player, .. } => Some(*player),
            _ => None,
        }
    }

    /// Information-set key at a decision node.
    pub fn info_key(&self) -> Option<&str> {
        match self {
            Node::Decision { info_key, .. } => Some(info_key),
            _ => None,
        }
    }

    /// X's payoff at a terminal node.
    pub fn payoff(&self) -> Option<f64> {
        match self {
            Node::Terminal { payoff } => Some(*payoff),
            _ => None,
        }
    }

    /// Action labels (decision) or outcome labels (chance), in order.
    pub fn labels(&self) -> Vec<&str> {
        match self {
            Node::Chance { outcomes } => outcomes.iter().map(|o| o.label.as_str()).collect(),
            Node::Decision { edges, .. } => edges.iter().map(|e| e.action.as_str()).collect(),
            Node::Terminal { .. } => Vec::new(),
        }
    }

    /// Child reached through the action or outcome labelled `label`.
    pub fn child(&self, label: &str) -> Option<&Node> {
        match self {
            Node::Chance { outcomes } => outcomes
                .iter()
                .find(|o| o.label == label)
                .map(|o| &o.child),
            Node::Decision { edges, .. } => {
                edges.iter().find(|e| e.action == label).map(|e| &e.child)
            }
            Node::Terminal { .. } => None,
        }
    }

    /// All children, in order.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Chance { outcomes } => outcomes.iter().map(|o| &o.child).collect(),
            Node::Decision { edges, .. } => edges.iter().map(|e| &e.child).collect(),
            Node::Terminal { .. } => Vec::new(),
        }
    }
}

/// Static description of one information set as it appears in a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoSetSpec {
    /// Player who owns the set.
    pub player: Player,
    /// Action labels shared by every node of the set.
    pub actions: Vec<String>,
    /// Number of decision nodes aliased onto the set.
    pub nodes: usize,
}

/// A complete game: root node plus optional information-set descriptions.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    root: Node,
    descriptions: BTreeMap<String, String>,
}

impl Tree {
    /// Wrap a root node.
    pub fn new(root: Node) -> Self {
        Self {
            root,
            descriptions: BTreeMap::new(),
        }
    }

    /// Attach a human-readable description to an information set.
    pub fn with_description(mut self, info_key: impl Into<String>, text: impl Into<String>) -> Self {
        self.descriptions.insert(info_key.into(), text.into());
        self
    }

    /// The root node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Description of an information set, if one was attached.
    pub fn description(&self, info_key: &str) -> Option<&str> {
        self.descriptions.get(info_key).map(String::as_str)
    }

    /// Check every structural rule the solver relies on.
    ///
    /// # Errors
    /// - [`SolverError::MalformedTree`] for empty action or outcome sets,
    ///   duplicate labels, non-finite payoffs, invalid chance probabilities,
    ///   a key shared by both players, or a tree deeper than [`MAX_DEPTH`].
    /// - [`SolverError::InconsistentActionSpace`] when one key is used with
    ///   different action counts.
    pub fn validate(&self, chance_tolerance: f64) -> Result<()> {
        self.walk(chance_tolerance).map(|_| ())
    }

    /// Map every information-set key to its owner, actions and node count.
    ///
    /// Chance probabilities are not required to sum to one here; everything
    /// else is checked as in [`Tree::validate`].
    pub fn info_sets(&self) -> Result<BTreeMap<String, InfoSetSpec>> {
        self.walk(f64::INFINITY)
    }

    fn walk(&self, chance_tolerance: f64) -> Result<BTreeMap<String, InfoSetSpec>> {
        let mut specs = BTreeMap::new();
        check_node(&self.root, 0, chance_tolerance, &mut specs)?;
        Ok(specs)
    }

    /// Number of edges on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        fn depth_of(node: &Node) -> usize {
            node.children()
                .into_iter()
                .map(|c| 1 + depth_of(c))
                .max()
                .unwrap_or(0)
        }
        depth_of(&self.root)
    }

    /// Total number of nodes.
    pub fn num_nodes(&self) -> usize {
        fn count(node: &Node) -> usize {
            1 + node.children().into_iter().map(count).sum::<usize>()
        }
        count(&self.root)
    }

    /// Indented, human-readable rendering of the whole tree.
    pub fn dump(&self) -> String {
        self.to_string()
    }
}

fn check_node(
    node: &Node,
    depth: usize,
    chance_tolerance: f64,
    specs: &mut BTreeMap<String, InfoSetSpec>,
) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(SolverError::malformed(format!(
            "tree is deeper than {} levels (cycle in the builder?)",
            MAX_DEPTH
        )));
    }

    match node {
        Node::Terminal { payoff } => {
            if !payoff.is_finite() {
                return Err(SolverError::malformed(format!(
                    "terminal payoff {} is not finite",
                    payoff
                )));
            }
            Ok(())
        }
        Node::Chance { outcomes } => {
            if outcomes.is_empty() {
                return Err(SolverError::malformed("chance node has no outcomes"));
            }
            let mut total = 0.0;
            for outcome in outcomes {
                if !outcome.probability.is_finite() || outcome.probability < 0.0 {
                    return Err(SolverError::malformed(format!(
                        "chance outcome '{}' has invalid probability {}",
                        outcome.label, outcome.probability
                    )));
                }
                total += outcome.probability;
            }
            if (total - 1.0).abs() > chance_tolerance {
                return Err(SolverError::malformed(format!(
                    "chance probabilities sum to {}, expected 1",
                    total
                )));
            }
            for outcome in outcomes {
                check_node(&outcome.child, depth + 1, chance_tolerance, specs)?;
            }
            Ok(())
        }
        Node::Decision {
            player,
            info_key,
            edges,
        } => {
            if edges.is_empty() {
                return Err(SolverError::malformed(format!(
                    "decision node '{}' has no legal actions",
                    info_key
                )));
            }
            for (i, edge) in edges.iter().enumerate() {
                if edges[..i].iter().any(|e| e.action == edge.action) {
                    return Err(SolverError::malformed(format!(
                        "decision node '{}' repeats action '{}'",
                        info_key, edge.action
                    )));
                }
            }

            match specs.get_mut(info_key) {
                Some(spec) => {
                    if spec.player != *player {
                        return Err(SolverError::malformed(format!(
                            "information set '{}' is used by both players",
                            info_key
                        )));
                    }
                    if spec.actions.len() != edges.len() {
                        return Err(SolverError::InconsistentActionSpace {
                            key: info_key.clone(),
                            expected: spec.actions.len(),
                            found: edges.len(),
                        });
                    }
                    if spec.actions.iter().zip(edges).any(|(a, e)| *a != e.action) {
                        return Err(SolverError::malformed(format!(
                            "information set '{}' has differing action labels",
                            info_key
                        )));
                    }
                    spec.nodes += 1;
                }
                None => {
                    specs.insert(
                        info_key.clone(),
                        InfoSetSpec {
                            player: *player,
                            actions: edges.iter().map(|e| e.action.clone()).collect(),
                            nodes: 1,
                        },
                    );
                }
            }

            for edge in edges {
                check_node(&edge.child, depth + 1, chance_tolerance, specs)?;
            }
            Ok(())
        }
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &Node, depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    match node {
        Node::Terminal { payoff } => writeln!(f, "{}terminal payoff={:.3}", indent, payoff),
        Node::Chance { outcomes } => {
            writeln!(f, "{}chance", indent)?;
            for outcome in outcomes {
                writeln!(f, "{}  --{} (p={:.3})", indent, outcome.label, outcome.probability)?;
                write_node(f, &outcome.child, depth + 2)?;
            }
            Ok(())
        }
        Node::Decision {
            player,
            info_key,
            edges,
        } => {
            writeln!(f, "{}{} info={}", indent, player, info_key)?;
            for edge in edges {
                writeln!(f, "{}  --{}", indent, edge.action)?;
                write_node(f, &edge.child, depth + 2)?;
            }
            Ok(())
        }
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, &self.root, 0)
    }
}
