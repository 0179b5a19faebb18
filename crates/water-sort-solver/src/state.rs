//! Puzzle snapshots and the pour transition between them.

use std::collections::BTreeMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::color::{Color, TOTAL_COLORS};
use crate::container::{Container, LAYERS};
use crate::error::DealError;

/// Fewest containers a puzzle may have
pub const MIN_CONTAINERS: usize = 3;
/// Most containers a puzzle may have (15 colors + 2 spare bottles)
pub const MAX_CONTAINERS: usize = TOTAL_COLORS + 2;

/// Containers left empty by a random deal
pub const SPARE_CONTAINERS: usize = 2;

const HASH_SEED: u64 = 1_125_899_906_842_597;
const HASH_MULTIPLIER: u64 = 31;

/// The pour that produced a state, as 1-based container indices.
///
/// `from == 0` marks the initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Action {
    pub from: u8,
    pub to: u8,
}

impl Action {
    pub const NONE: Action = Action { from: 0, to: 0 };

    pub fn new(from: u8, to: u8) -> Self {
        Self { from, to }
    }

    pub fn is_none(&self) -> bool {
        self.from == 0
    }
}

/// A pour observed by replaying an action against the parent state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    /// 1-based source container
    pub from: u8,
    /// 1-based destination container
    pub to: u8,
    pub color: Color,
    /// Units of liquid moved
    pub amount: usize,
}

/// A hand-made starting position as read from JSON.
///
/// Each bottle lists its layers top first; `null` is an empty layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub bottles: Vec<[Option<Color>; LAYERS]>,
}

impl Deal {
    pub fn from_json(json: &str) -> Result<Self, DealError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, DealError> {
        let json = fs::read_to_string(path).map_err(|source| DealError::DealRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// One configuration of the puzzle plus the action that reached it.
///
/// Equality and hashing look at container contents only, so two states
/// reached by different pours compare equal.
#[derive(Debug, Clone)]
pub struct PuzzleState {
    containers: SmallVec<[Container; MAX_CONTAINERS]>,
    action: Action,
}

impl PuzzleState {
    /// Build an initial state from explicit containers
    pub fn from_containers(containers: Vec<Container>) -> Result<Self, DealError> {
        check_count(containers.len())?;
        Ok(Self {
            containers: SmallVec::from_vec(containers),
            action: Action::NONE,
        })
    }

    /// Build an initial state from a hand-made deal
    pub fn from_deal(deal: &Deal) -> Result<Self, DealError> {
        let containers = deal
            .bottles
            .iter()
            .map(|layers| Container::from_layers(*layers))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_containers(containers)
    }

    /// Deal a random puzzle of `count` containers.
    ///
    /// `count - 2` distinct colors are chosen and their four units each are
    /// scattered over the first `count - 2` containers; the last two stay
    /// empty. Every container that receives liquid ends up full.
    pub fn random<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Result<Self, DealError> {
        check_count(count)?;

        let filled = count - SPARE_CONTAINERS;
        let colors: Vec<Color> = index::sample(rng, TOTAL_COLORS, filled)
            .into_iter()
            .map(|i| Color::ALL[i])
            .collect();
        let mut units_left = vec![LAYERS; colors.len()];

        let mut containers: SmallVec<[Container; MAX_CONTAINERS]> =
            SmallVec::from_elem(Container::empty(), count);
        for container in containers.iter_mut().take(filled) {
            for layer in 0..LAYERS {
                let pick = loop {
                    let j = rng.random_range(0..colors.len());
                    if units_left[j] > 0 {
                        break j;
                    }
                };
                container.set_layer(layer, Some(colors[pick]));
                units_left[pick] -= 1;
            }
        }

        Ok(Self {
            containers,
            action: Action::NONE,
        })
    }

    /// The containers as a deal that rebuilds this configuration
    pub fn to_deal(&self) -> Deal {
        Deal {
            bottles: self.containers.iter().map(Container::layers).collect(),
        }
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Polynomial hash over the packed bytes of every container
    pub fn hash_value(&self) -> u64 {
        self.containers
            .iter()
            .flat_map(|c| c.bytes())
            .fold(HASH_SEED, |hash, byte| {
                hash.wrapping_mul(HASH_MULTIPLIER)
                    .wrapping_add(u64::from(byte))
            })
    }

    /// True when every container is empty or full of one color
    pub fn is_victorious(&self) -> bool {
        self.containers.iter().all(Container::is_complete)
    }

    /// Every state one worthwhile pour away, in (from, to) ascending order.
    ///
    /// `children` is cleared first. Each child records its action; the
    /// parent link is attached by whoever stores the child.
    pub fn expand(&self, children: &mut Vec<PuzzleState>) {
        children.clear();

        let n = self.containers.len();
        for i in 0..n {
            for j in 0..n {
                if i == j || !self.containers[i].should_pour_to(&self.containers[j]) {
                    continue;
                }
                let mut child = self.clone();
                pour_between(&mut child.containers, i, j);
                child.action = Action::new((i + 1) as u8, (j + 1) as u8);
                children.push(child);
            }
        }
    }

    /// Replay this state's action against `parent` to recover what was poured.
    ///
    /// Returns `None` for the initial state, or if the action does not apply
    /// to `parent`.
    pub fn describe_action(&self, parent: &PuzzleState) -> Option<Move> {
        if self.action.is_none() {
            return None;
        }
        let from = usize::from(self.action.from) - 1;
        let to = usize::from(self.action.to) - 1;
        if from >= parent.len() || to >= parent.len() || from == to {
            return None;
        }

        let mut replay = parent.containers.clone();
        let (_, before) = replay[from].top_with_layer();
        let color = pour_between(&mut replay, from, to)?;
        let (_, after) = replay[from].top_with_layer();

        Some(Move {
            from: self.action.from,
            to: self.action.to,
            color,
            amount: after - before,
        })
    }

    /// Units of each color across all containers
    pub fn color_census(&self) -> BTreeMap<Color, usize> {
        let mut census = BTreeMap::new();
        for layer in self.containers.iter().flat_map(Container::layers).flatten() {
            *census.entry(layer).or_insert(0) += 1;
        }
        census
    }
}

impl PartialEq for PuzzleState {
    fn eq(&self, other: &Self) -> bool {
        self.containers == other.containers
    }
}

impl Eq for PuzzleState {}

impl Hash for PuzzleState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_value().hash(state);
    }
}

fn check_count(count: usize) -> Result<(), DealError> {
    if (MIN_CONTAINERS..=MAX_CONTAINERS).contains(&count) {
        Ok(())
    } else {
        Err(DealError::ContainerCount {
            count,
            min: MIN_CONTAINERS,
            max: MAX_CONTAINERS,
        })
    }
}

/// Pour from `containers[from]` into `containers[to]` (`from != to`)
fn pour_between(containers: &mut [Container], from: usize, to: usize) -> Option<Color> {
    if from < to {
        let (head, tail) = containers.split_at_mut(to);
        head[from].pour(&mut tail[0])
    } else {
        let (head, tail) = containers.split_at_mut(from);
        tail[0].pour(&mut head[to])
    }
}
