use skillratings::elo::{elo, EloConfig, EloRating};
use skillratings::Outcomes;

use crate::oracle::GameResult;


pub const INITIAL_RATING: i32 = 1500;

// New (white, black) ratings after a rated game. Standard Elo with K=32;
// fractional results are rounded to the nearest integer. `Ongoing` leaves both
// ratings untouched.
pub fn updated_ratings(white: i32, black: i32, result: GameResult) -> (i32, i32) {
    let outcome = match result {
        GameResult::WhiteWin => Outcomes::WIN,
        GameResult::BlackWin => Outcomes::LOSS,
        GameResult::Draw => Outcomes::DRAW,
        GameResult::Ongoing => return (white, black),
    };
    let white_rating = EloRating { rating: white as f64 };
    let black_rating = EloRating { rating: black as f64 };
    let (new_white, new_black) = elo(&white_rating, &black_rating, &outcome, &EloConfig::new());
    (new_white.rating.round() as i32, new_black.rating.round() as i32)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn equal_ratings_win() {
        assert_eq!(updated_ratings(1500, 1500, GameResult::WhiteWin), (1516, 1484));
        assert_eq!(updated_ratings(1500, 1500, GameResult::BlackWin), (1484, 1516));
    }

    #[test]
    fn equal_ratings_draw_changes_nothing() {
        assert_eq!(updated_ratings(1500, 1500, GameResult::Draw), (1500, 1500));
    }

    #[test]
    fn draw_moves_unequal_ratings_together() {
        assert_eq!(updated_ratings(1600, 1400, GameResult::Draw), (1592, 1408));
    }

    #[test]
    fn ongoing_is_a_no_op() {
        assert_eq!(updated_ratings(1700, 1350, GameResult::Ongoing), (1700, 1350));
    }
}
