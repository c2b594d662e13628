use serde::{Deserialize, Serialize};

pub const BOARD_SIZE: usize = 8;

const PIECE_LETTERS: &str = "KQRBNPkqrbnp";

/// An empty square or a single piece letter.
fn is_square(square: &str) -> bool {
    let mut chars = square.chars();
    match (chars.next(), chars.next()) {
        (None, _) => true,
        (Some(c), None) => PIECE_LETTERS.contains(c),
        _ => false,
    }
}

/// Client-declared board: row 0 is rank 8, column 0 is file a.
/// Empty squares are `""`, white pieces upper case, black pieces lower case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board(pub Vec<Vec<String>>);

impl Board {
    pub fn initial() -> Self {
        let back_rank = ["r", "n", "b", "q", "k", "b", "n", "r"];
        let mut rows = Vec::with_capacity(BOARD_SIZE);
        rows.push(back_rank.iter().map(|p| p.to_string()).collect());
        rows.push(vec!["p".to_string(); BOARD_SIZE]);
        for _ in 0..4 {
            rows.push(vec![String::new(); BOARD_SIZE]);
        }
        rows.push(vec!["P".to_string(); BOARD_SIZE]);
        rows.push(back_rank.iter().map(|p| p.to_uppercase()).collect());
        Board(rows)
    }

    /// 8x8 with every square either empty or a single piece letter, so the
    /// board survives a round trip through its FEN placement.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == BOARD_SIZE
            && self
                .0
                .iter()
                .all(|row| row.len() == BOARD_SIZE && row.iter().all(|sq| is_square(sq)))
    }

    /// Piece placement field of a FEN string.
    pub fn placement(&self) -> String {
        let mut fen = String::new();
        for (r, row) in self.0.iter().enumerate() {
            let mut empty = 0;
            for square in row {
                if square.is_empty() {
                    empty += 1;
                } else {
                    if empty > 0 {
                        fen.push_str(&empty.to_string());
                        empty = 0;
                    }
                    fen.push_str(square);
                }
            }
            if empty > 0 {
                fen.push_str(&empty.to_string());
            }
            if r + 1 < self.0.len() {
                fen.push('/');
            }
        }
        fen
    }

    /// Full position string. Castling rights and move counters are not
    /// tracked, so they are always reported as `KQkq - 0 1`.
    pub fn to_fen(&self, white_to_move: bool) -> String {
        format!(
            "{} {} KQkq - 0 1",
            self.placement(),
            if white_to_move { "w" } else { "b" }
        )
    }

    /// Rebuilds a board from the placement field of a FEN string.
    pub fn from_fen(fen: &str) -> Option<Self> {
        let placement = fen.split_whitespace().next()?;
        let mut rows = Vec::with_capacity(BOARD_SIZE);
        for rank in placement.split('/') {
            let mut row = Vec::with_capacity(BOARD_SIZE);
            for c in rank.chars() {
                if let Some(n) = c.to_digit(10) {
                    row.extend(std::iter::repeat(String::new()).take(n as usize));
                } else if c.is_ascii_alphabetic() {
                    row.push(c.to_string());
                } else {
                    return None;
                }
            }
            rows.push(row);
        }
        let board = Board(rows);
        board.is_well_formed().then_some(board)
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_PLACEMENT: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

    #[test]
    fn test_initial_board_fen() {
        let board = Board::initial();
        assert!(board.is_well_formed());
        assert_eq!(
            board.to_fen(true),
            format!("{} w KQkq - 0 1", START_PLACEMENT)
        );
        assert!(board.to_fen(false).contains(" b "));
    }

    #[test]
    fn test_fen_after_pawn_push() {
        let mut board = Board::initial();
        board.0[6][4] = String::new();
        board.0[4][4] = "P".to_string();
        assert_eq!(
            board.placement(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR"
        );
    }

    #[test]
    fn test_from_fen_restores_board() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
        let board = Board::from_fen(fen).unwrap();
        assert_eq!(board.0[4][4], "P");
        assert_eq!(board.0[6][4], "");
        assert_eq!(board.to_fen(false), fen);
    }

    #[test]
    fn test_from_fen_rejects_garbage() {
        assert!(Board::from_fen("").is_none());
        assert!(Board::from_fen("8/8/8").is_none());
        assert!(Board::from_fen("rnbqkbnr/ppp?pppp/8/8/8/8/PPPPPPPP/RNBQKBNR").is_none());
    }

    #[test]
    fn test_malformed_board_detected() {
        let board = Board(vec![vec![String::new(); 8]; 7]);
        assert!(!board.is_well_formed());
    }

    #[test]
    fn test_unknown_squares_are_malformed() {
        for square in ["wP", "x", "?", " "] {
            let mut board = Board::initial();
            board.0[4][4] = square.to_string();
            assert!(!board.is_well_formed(), "{square:?} accepted");
        }
    }

    #[test]
    fn test_well_formed_board_survives_fen() {
        let mut board = Board::initial();
        board.0[7][6] = String::new();
        board.0[5][5] = "N".to_string();
        assert_eq!(Board::from_fen(&board.to_fen(false)), Some(board));
    }
}
