// Rules oracle backed by the `chess` crate. Positions are FEN strings, moves
// are coordinate notation ("e2e4", "a7a8q").

use std::str::FromStr;

use arena_chess::engine::{MoveClassifier, PositionEvaluator};
use arena_chess::force::Force;
use arena_chess::oracle::{GameResult, MoveOutcome, OracleError, RulesOracle};
use chess::{Board, BoardStatus, ChessMove, Color, File, MoveGen, Piece, Rank, Square};


fn force_of(color: Color) -> Force {
    match color {
        Color::White => Force::White,
        Color::Black => Force::Black,
    }
}

fn color_of(force: Force) -> Color {
    match force {
        Force::White => Color::White,
        Force::Black => Color::Black,
    }
}

fn parse_square(s: &str) -> Option<Square> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let file = (bytes[0] as char).to_ascii_lowercase();
    let rank = bytes[1] as char;
    if !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
        return None;
    }
    let file = File::from_index(file as usize - 'a' as usize);
    let rank = Rank::from_index(rank as usize - '1' as usize);
    Some(Square::make_square(rank, file))
}

fn parse_move(mv: &str) -> Option<ChessMove> {
    if !mv.is_ascii() || mv.len() < 4 || mv.len() > 5 {
        return None;
    }
    let source = parse_square(&mv[0..2])?;
    let dest = parse_square(&mv[2..4])?;
    let promotion = match mv.as_bytes().get(4) {
        None => None,
        Some(b'q') => Some(Piece::Queen),
        Some(b'r') => Some(Piece::Rook),
        Some(b'b') => Some(Piece::Bishop),
        Some(b'n') => Some(Piece::Knight),
        Some(_) => return None,
    };
    Some(ChessMove::new(source, dest, promotion))
}

fn format_move(mv: ChessMove) -> String {
    let promotion = match mv.get_promotion() {
        None => "",
        Some(Piece::Queen) => "q",
        Some(Piece::Rook) => "r",
        Some(Piece::Bishop) => "b",
        Some(Piece::Knight) => "n",
        Some(_) => "",
    };
    format!("{}{}{}", mv.get_source(), mv.get_dest(), promotion)
}

fn piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 100,
        Piece::Knight => 320,
        Piece::Bishop => 330,
        Piece::Rook => 500,
        Piece::Queen => 900,
        Piece::King => 0,
    }
}

// Bare kings, or king versus king and one minor piece.
fn insufficient_material(board: &Board) -> bool {
    let mut total = 0;
    let mut minors = 0;
    for square in chess::ALL_SQUARES {
        match board.piece_on(square) {
            None => {}
            Some(Piece::Knight) | Some(Piece::Bishop) => {
                total += 1;
                minors += 1;
            }
            Some(_) => total += 1,
        }
    }
    total == 2 || (total == 3 && minors == 1)
}

pub struct ChessOracle;

impl ChessOracle {
    pub fn new() -> Self {
        ChessOracle
    }

    fn board(&self, position: &str) -> Result<Board, OracleError> {
        Board::from_str(position).map_err(|err| OracleError::BadPosition(err.to_string()))
    }
}

impl RulesOracle for ChessOracle {
    fn starting_position(&self) -> String {
        Board::default().to_string()
    }

    fn side_to_move(&self, position: &str) -> Result<Force, OracleError> {
        Ok(force_of(self.board(position)?.side_to_move()))
    }

    fn legal_moves(&self, position: &str) -> Vec<String> {
        let Ok(board) = self.board(position) else {
            return vec![];
        };
        MoveGen::new_legal(&board).map(format_move).collect()
    }

    fn apply_move(&self, position: &str, mv: &str) -> Result<MoveOutcome, OracleError> {
        let board = self.board(position)?;
        let chess_move = parse_move(mv).ok_or_else(|| OracleError::IllegalMove {
            reason: format!("cannot parse move {mv:?}"),
        })?;
        if !board.legal(chess_move) {
            return Err(OracleError::IllegalMove {
                reason: format!("move {mv:?} is not legal in this position"),
            });
        }
        let mover = force_of(board.side_to_move());
        let next = board.make_move_new(chess_move);
        let result = match next.status() {
            BoardStatus::Checkmate => GameResult::victory(mover),
            BoardStatus::Stalemate => GameResult::Draw,
            BoardStatus::Ongoing => {
                if insufficient_material(&next) {
                    GameResult::Draw
                } else {
                    GameResult::Ongoing
                }
            }
        };
        Ok(MoveOutcome {
            position: next.to_string(),
            in_check: next.checkers().popcnt() > 0,
            game_over: result != GameResult::Ongoing,
            result,
        })
    }
}

// Plain material count, side-relative.
pub struct MaterialEvaluator;

impl PositionEvaluator for MaterialEvaluator {
    fn evaluate(&self, position: &str, side: Force) -> i32 {
        let Ok(board) = Board::from_str(position) else {
            return 0;
        };
        let my_color = color_of(side);
        let mut score = 0;
        for square in chess::ALL_SQUARES {
            if let Some(piece) = board.piece_on(square) {
                if board.color_on(square) == Some(my_color) {
                    score += piece_value(piece);
                } else {
                    score -= piece_value(piece);
                }
            }
        }
        score
    }
}

// Best-first ordering of tactical moves: captures by captured value, checks get
// a small bonus. Quiet moves are left for the engine to backfill.
pub struct TacticalRanker;

impl MoveClassifier for TacticalRanker {
    fn rank_moves(&self, position: &str, legal_moves: &[String]) -> Vec<String> {
        let Ok(board) = Board::from_str(position) else {
            return legal_moves.to_vec();
        };
        let mut scored: Vec<(i32, String)> = legal_moves
            .iter()
            .filter_map(|mv_str| {
                let mv = parse_move(mv_str)?;
                if !board.legal(mv) {
                    return None;
                }
                let mut score = 0;
                if let Some(captured) = board.piece_on(mv.get_dest()) {
                    score += piece_value(captured);
                }
                if board.make_move_new(mv).checkers().popcnt() > 0 {
                    score += 50;
                }
                if score > 0 {
                    Some((score, mv_str.clone()))
                } else {
                    None
                }
            })
            .collect();
        scored.sort_by_key(|(score, _)| std::cmp::Reverse(*score));
        scored.into_iter().map(|(_, mv)| mv).collect()
    }
}
