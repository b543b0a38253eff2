// Move selection for AI seats. Easy plays uniformly at random; Medium and Hard
// run a fixed-depth negamax with alpha-beta pruning over positions supplied by
// the rules oracle. Hard can additionally narrow the root move list through a
// pluggable move classifier.

use std::sync::Arc;

use itertools::Itertools;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::force::Force;
use crate::oracle::{GameResult, RulesOracle};


pub const MATE_SCORE: i32 = 1_000_000;

// If the classifier returns fewer root candidates than this, the rest of the
// legal moves are appended so a bad classifier cannot blind the search.
pub const MIN_RANKED_CANDIDATES: usize = 5;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn search_depth(self) -> Option<u32> {
        match self {
            Difficulty::Easy => None,
            Difficulty::Medium => Some(2),
            Difficulty::Hard => Some(3),
        }
    }

    // Advertised to the human opponent; AI games never touch real ratings.
    pub fn nominal_rating(self) -> i32 {
        match self {
            Difficulty::Easy => 1000,
            Difficulty::Medium => 1500,
            Difficulty::Hard => 2000,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

pub trait PositionEvaluator {
    // Static score of `position` from the point of view of `side`, in
    // centipawn-like units. Larger is better for `side`.
    fn evaluate(&self, position: &str, side: Force) -> i32;
}

pub trait MoveClassifier {
    // Best-first ordering of root moves. May return a subset or include moves
    // that are not legal; the engine filters and backfills.
    fn rank_moves(&self, position: &str, legal_moves: &[String]) -> Vec<String>;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum EngineError {
    #[error("no legal moves in this position")]
    NoLegalMoves,
}

pub struct AiEngine {
    oracle: Arc<dyn RulesOracle + Send + Sync>,
    evaluator: Arc<dyn PositionEvaluator + Send + Sync>,
    classifier: Option<Arc<dyn MoveClassifier + Send + Sync>>,
}

impl AiEngine {
    pub fn new(
        oracle: Arc<dyn RulesOracle + Send + Sync>,
        evaluator: Arc<dyn PositionEvaluator + Send + Sync>,
    ) -> Self {
        AiEngine { oracle, evaluator, classifier: None }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn MoveClassifier + Send + Sync>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn select_move(
        &self,
        position: &str,
        difficulty: Difficulty,
        rng: &mut impl Rng,
    ) -> Result<String, EngineError> {
        let legal_moves = self.oracle.legal_moves(position);
        if legal_moves.is_empty() {
            return Err(EngineError::NoLegalMoves);
        }
        let Some(depth) = difficulty.search_depth() else {
            return Ok(random_move(&legal_moves, rng));
        };
        let candidates = if difficulty == Difficulty::Hard {
            self.root_candidates(position, &legal_moves)
        } else {
            legal_moves.clone()
        };
        match self.search_root(position, &candidates, depth) {
            Ok(Some(mv)) => Ok(mv),
            Ok(None) => Ok(random_move(&legal_moves, rng)),
            Err(err) => {
                log::warn!("AI search failed in position {position:?}: {err}");
                Ok(random_move(&legal_moves, rng))
            }
        }
    }

    fn root_candidates(&self, position: &str, legal_moves: &[String]) -> Vec<String> {
        let Some(classifier) = &self.classifier else {
            return legal_moves.to_vec();
        };
        let ranked: Vec<String> = classifier
            .rank_moves(position, legal_moves)
            .into_iter()
            .filter(|mv| legal_moves.contains(mv))
            .collect();
        if ranked.len() >= MIN_RANKED_CANDIDATES {
            ranked
        } else {
            ranked.into_iter().chain(legal_moves.iter().cloned()).unique().collect()
        }
    }

    fn search_root(
        &self,
        position: &str,
        candidates: &[String],
        depth: u32,
    ) -> Result<Option<String>, crate::oracle::OracleError> {
        let side = self.oracle.side_to_move(position)?;
        let mut best: Option<(String, i32)> = None;
        let mut alpha = -MATE_SCORE;
        for mv in candidates {
            let outcome = self.oracle.apply_move(position, mv)?;
            let score = if outcome.game_over {
                terminal_score(outcome.result, side)
            } else {
                -self.negamax(&outcome.position, side.opponent(), depth - 1, -MATE_SCORE, -alpha)?
            };
            if best.as_ref().is_none_or(|(_, best_score)| score > *best_score) {
                best = Some((mv.clone(), score));
                alpha = alpha.max(score);
            }
        }
        Ok(best.map(|(mv, _)| mv))
    }

    fn negamax(
        &self,
        position: &str,
        side: Force,
        depth: u32,
        mut alpha: i32,
        beta: i32,
    ) -> Result<i32, crate::oracle::OracleError> {
        if depth == 0 {
            return Ok(self.evaluator.evaluate(position, side));
        }
        let moves = self.oracle.legal_moves(position);
        if moves.is_empty() {
            return Ok(self.evaluator.evaluate(position, side));
        }
        let mut best = -MATE_SCORE;
        for mv in &moves {
            let outcome = self.oracle.apply_move(position, mv)?;
            let score = if outcome.game_over {
                terminal_score(outcome.result, side)
            } else {
                -self.negamax(&outcome.position, side.opponent(), depth - 1, -beta, -alpha)?
            };
            best = best.max(score);
            alpha = alpha.max(score);
            if alpha >= beta {
                break;
            }
        }
        Ok(best)
    }
}

fn terminal_score(result: GameResult, side: Force) -> i32 {
    match result.winner() {
        Some(winner) if winner == side => MATE_SCORE,
        Some(_) => -MATE_SCORE,
        None => 0,
    }
}

fn random_move(legal_moves: &[String], rng: &mut impl Rng) -> String {
    // Caller guarantees the list is non-empty.
    legal_moves.choose(rng).cloned().unwrap()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::test_util::{NullEvaluator, ScriptedClassifier, ToyOracle};

    fn engine(oracle: ToyOracle) -> AiEngine {
        AiEngine::new(Arc::new(oracle), Arc::new(NullEvaluator))
    }

    #[test]
    fn easy_picks_a_legal_move() {
        let oracle = ToyOracle::new(21, 3);
        let mut rng = StdRng::seed_from_u64(7);
        let mv = engine(oracle.clone())
            .select_move(&oracle.start(), Difficulty::Easy, &mut rng)
            .unwrap();
        assert!(oracle.legal_moves(&oracle.start()).contains(&mv));
    }

    #[test]
    fn medium_takes_the_immediate_win() {
        // Race to 21 with steps 1..=3: from 18 the winning step is exactly 3.
        let oracle = ToyOracle::new(21, 3);
        let mut rng = StdRng::seed_from_u64(7);
        let mv = engine(oracle.clone()).select_move("18:w", Difficulty::Medium, &mut rng).unwrap();
        assert_eq!(mv, "3");
    }

    #[test]
    fn hard_finds_the_forced_win() {
        // From 14 the only winning step is 3: it leaves 17, from which every
        // reply hands the mover a step to 21 next turn.
        let oracle = ToyOracle::new(21, 3);
        let mut rng = StdRng::seed_from_u64(7);
        let mv = engine(oracle.clone()).select_move("14:w", Difficulty::Hard, &mut rng).unwrap();
        assert_eq!(mv, "3");
    }

    #[test]
    fn sparse_classifier_cannot_hide_the_winning_move() {
        // 30 legal steps from 10; the classifier only ranks steps that cannot
        // reach 40, but backfilling restores the immediate win "30".
        let oracle = ToyOracle::new(40, 30);
        let classifier = ScriptedClassifier::new(vec![
            "1".to_owned(),
            "2".to_owned(),
            "3".to_owned(),
        ]);
        let engine = engine(oracle.clone()).with_classifier(Arc::new(classifier));
        let mut rng = StdRng::seed_from_u64(7);
        let mv = engine.select_move("10:w", Difficulty::Hard, &mut rng).unwrap();
        assert_eq!(mv, "30");
    }

    #[test]
    fn no_legal_moves_is_an_error() {
        // step_limit 0 leaves no legal steps anywhere.
        let oracle = ToyOracle::new(21, 0);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(
            engine(oracle).select_move("5:w", Difficulty::Medium, &mut rng),
            Err(EngineError::NoLegalMoves)
        );
    }
}
