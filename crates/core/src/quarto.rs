//! Quarto rules
//!
//! Sixteen pieces, each a combination of four binary attributes
//! (light/dark, small/large, round/square, solid/hollow). On every ply the
//! active player places the piece handed to them and hands the opponent the
//! next one. Handing over [`Piece::QUARTO`] claims a quarto; handing over
//! [`Piece::NONE`] once all pieces are spent ends the game in a draw.

use crate::error::{Error, Result};
use crate::game::{Game, Move, Seat};

pub const BOARD_LENGTH: usize = 4;
pub const BOARD_SIZE: usize = BOARD_LENGTH * BOARD_LENGTH;

const ATTRIBUTE_MASK: u8 = 0b1111;
const ROW_SEPARATOR: &str = "----+----+----+----";
const COLUMN_GAP: &str = "    ";

/// A Quarto piece, or one of the two pseudo-pieces used as signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Piece(u8);

impl Piece {
    /// Handed over to claim that the board holds a quarto
    pub const QUARTO: Piece = Piece(16);
    /// Handed over when no pieces remain
    pub const NONE: Piece = Piece(17);

    const COUNT: u8 = 18;

    pub fn from_wire(value: u8) -> Option<Self> {
        (value < Self::COUNT).then_some(Piece(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Whether this piece can be placed on the board
    pub fn is_physical(self) -> bool {
        self.0 < BOARD_SIZE as u8
    }

    fn attributes(self) -> u8 {
        self.0 & ATTRIBUTE_MASK
    }

    /// Four-letter label, e.g. `DLSH` for a dark large square hollow piece
    pub fn label(self) -> String {
        match self {
            Piece::QUARTO => "QUARTO".to_string(),
            Piece::NONE => "NONE".to_string(),
            Piece(bits) => [
                if bits & 0b0001 != 0 { 'D' } else { 'L' },
                if bits & 0b0010 != 0 { 'L' } else { 'S' },
                if bits & 0b0100 != 0 { 'S' } else { 'R' },
                if bits & 0b1000 != 0 { 'H' } else { 'S' },
            ]
            .iter()
            .collect(),
        }
    }
}

/// Bit set over all eighteen piece values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct PieceSet(u32);

impl PieceSet {
    fn physical() -> Self {
        PieceSet((1 << BOARD_SIZE) - 1)
    }

    fn contains(self, piece: Piece) -> bool {
        self.0 & (1 << piece.0) != 0
    }

    fn insert(&mut self, piece: Piece) {
        self.0 |= 1 << piece.0;
    }

    fn remove(&mut self, piece: Piece) {
        self.0 &= !(1 << piece.0);
    }

    fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn iter(self) -> impl Iterator<Item = Piece> {
        (0..Piece::COUNT)
            .map(Piece)
            .filter(move |p| self.contains(*p))
    }
}

/// A game of Quarto between two seats
#[derive(Debug, Clone)]
pub struct QuartoGame {
    board: [Option<Piece>; BOARD_SIZE],
    available: PieceSet,
    in_hand: Option<Piece>,
    ply: u32,
    active: Seat,
    quarto_on_board: bool,
    quarto_called: bool,
}

impl Default for QuartoGame {
    fn default() -> Self {
        Self::new()
    }
}

impl QuartoGame {
    pub fn new() -> Self {
        Self {
            board: [None; BOARD_SIZE],
            available: PieceSet::physical(),
            in_hand: None,
            ply: 1,
            active: Seat::First,
            quarto_on_board: false,
            quarto_called: false,
        }
    }

    /// Piece occupying a board field
    pub fn field(&self, index: usize) -> Option<Piece> {
        self.board.get(index).copied().flatten()
    }

    /// Piece the active player must place this ply
    pub fn in_hand(&self) -> Option<Piece> {
        self.in_hand
    }

    fn give(&mut self, piece: Piece) {
        self.ply += 1;
        self.active = self.active.other();
        self.in_hand = Some(piece);
        self.available.remove(piece);

        if self.ply == 2 {
            self.available.insert(Piece::QUARTO);
        } else if piece == Piece::QUARTO {
            self.quarto_called = true;
        } else if self.ply == BOARD_SIZE as u32 + 1 {
            self.available.insert(Piece::NONE);
        } else if piece == Piece::NONE {
            self.available.remove(Piece::QUARTO);
        }
    }

    fn record_lines_through(&mut self, index: usize) {
        if self.quarto_on_board {
            return;
        }

        let row = index / BOARD_LENGTH;
        let col = index % BOARD_LENGTH;

        let mut lines: Vec<[usize; BOARD_LENGTH]> = vec![
            std::array::from_fn(|i| row * BOARD_LENGTH + i),
            std::array::from_fn(|i| i * BOARD_LENGTH + col),
        ];
        if row == col {
            lines.push(std::array::from_fn(|i| i * (BOARD_LENGTH + 1)));
        }
        if row + col == BOARD_LENGTH - 1 {
            lines.push(std::array::from_fn(|i| (i + 1) * (BOARD_LENGTH - 1)));
        }

        self.quarto_on_board = lines.iter().any(|line| {
            let pieces: Option<Vec<Piece>> = line.iter().map(|&i| self.board[i]).collect();
            pieces.is_some_and(|pieces| shares_attribute(&pieces))
        });
    }
}

/// Whether every piece in a full line agrees on at least one attribute
fn shares_attribute(pieces: &[Piece]) -> bool {
    let all_set = pieces
        .iter()
        .fold(ATTRIBUTE_MASK, |acc, p| acc & p.attributes());
    let any_set = pieces.iter().fold(0, |acc, p| acc | p.attributes());
    all_set != 0 || any_set != ATTRIBUTE_MASK
}

impl Game for QuartoGame {
    fn is_legal(&self, mv: &Move) -> bool {
        if self.is_terminal() {
            return false;
        }
        let Some(piece) = Piece::from_wire(mv.piece()) else {
            return false;
        };
        if !self.available.contains(piece) {
            return false;
        }

        match *mv {
            Move::Give { .. } => self.ply == 1,
            Move::Place { index, .. } => {
                let index = index as usize;
                self.ply > 1
                    && index < BOARD_SIZE
                    && self.board[index].is_none()
                    && self.in_hand.is_some_and(Piece::is_physical)
            }
        }
    }

    fn apply_move(&mut self, mv: Move) -> Result<()> {
        if !self.is_legal(&mv) {
            return Err(Error::IllegalMove(format!("{:?} on ply {}", mv, self.ply)));
        }

        if let Move::Place { index, .. } = mv {
            let index = index as usize;
            self.board[index] = self.in_hand;
            self.record_lines_through(index);
        }
        self.give(Piece(mv.piece()));
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        self.quarto_called || self.available.is_empty()
    }

    fn winner(&self) -> Option<Seat> {
        if !self.quarto_called {
            return None;
        }
        // The claimant handed over QUARTO, so the turn already passed on
        let claimant = self.active.other();
        if self.quarto_on_board {
            Some(claimant)
        } else {
            Some(self.active)
        }
    }

    fn active_participant(&self) -> Seat {
        self.active
    }

    fn legal_moves(&self) -> Vec<Move> {
        if self.is_terminal() {
            return Vec::new();
        }

        if self.ply == 1 {
            return self
                .available
                .iter()
                .map(|p| Move::Give { piece: p.value() })
                .collect();
        }

        (0..BOARD_SIZE)
            .filter(|&i| self.board[i].is_none())
            .flat_map(|index| {
                self.available.iter().map(move |p| Move::Place {
                    index: index as u8,
                    piece: p.value(),
                })
            })
            .collect()
    }

    fn describe_board(&self) -> String {
        let mut display = String::new();
        for row in 0..BOARD_LENGTH {
            let cells: Vec<String> = (0..BOARD_LENGTH)
                .map(|col| {
                    self.board[row * BOARD_LENGTH + col]
                        .map(Piece::label)
                        .unwrap_or_else(|| COLUMN_GAP.to_string())
                })
                .collect();
            let legend: Vec<String> = (0..BOARD_LENGTH)
                .map(|col| format!(" {:02} ", row * BOARD_LENGTH + col))
                .collect();

            display.push_str(&cells.join("|"));
            display.push_str(COLUMN_GAP);
            display.push_str(&legend.join("|"));
            if row < BOARD_LENGTH - 1 {
                display.push('\n');
                display.push_str(ROW_SEPARATOR);
                display.push_str(COLUMN_GAP);
                display.push_str(ROW_SEPARATOR);
                display.push('\n');
            }
        }
        display
    }

    fn ply(&self) -> u32 {
        self.ply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(game: &mut QuartoGame, index: u8, piece: u8) {
        game.apply_move(Move::Place { index, piece }).unwrap();
    }

    #[test]
    fn test_opening_gives_a_piece() {
        let mut game = QuartoGame::new();
        assert!(game.is_legal(&Move::Give { piece: 3 }));
        assert!(!game.is_legal(&Move::Place { index: 0, piece: 3 }));
        assert!(!game.is_legal(&Move::Give { piece: Piece::QUARTO.value() }));
        assert_eq!(game.legal_moves().len(), BOARD_SIZE);

        game.apply_move(Move::Give { piece: 3 }).unwrap();
        assert_eq!(game.ply(), 2);
        assert_eq!(game.active_participant(), Seat::Second);
        assert_eq!(game.in_hand(), Some(Piece(3)));
        // QUARTO is now available, piece 3 is not
        assert!(game.is_legal(&Move::Place { index: 0, piece: 16 }));
        assert!(!game.is_legal(&Move::Place { index: 0, piece: 3 }));
    }

    #[test]
    fn test_cannot_place_on_occupied_field() {
        let mut game = QuartoGame::new();
        game.apply_move(Move::Give { piece: 0 }).unwrap();
        place(&mut game, 5, 1);
        assert_eq!(game.field(5), Some(Piece(0)));
        assert!(!game.is_legal(&Move::Place { index: 5, piece: 2 }));
        assert!(!game.is_legal(&Move::Place { index: 16, piece: 2 }));
        assert!(game.apply_move(Move::Place { index: 5, piece: 2 }).is_err());
    }

    #[test]
    fn test_claimed_quarto_wins() {
        let mut game = QuartoGame::new();
        game.apply_move(Move::Give { piece: 0 }).unwrap();
        place(&mut game, 0, 1);
        place(&mut game, 1, 2);
        place(&mut game, 2, 3);
        assert_eq!(game.active_participant(), Seat::First);
        // Row 0 is now 0000, 0001, 0010, 0011: all solid and round
        place(&mut game, 3, Piece::QUARTO.value());

        assert!(game.is_terminal());
        assert_eq!(game.winner(), Some(Seat::First));
        assert!(game.legal_moves().is_empty());
    }

    #[test]
    fn test_false_claim_loses() {
        let mut game = QuartoGame::new();
        game.apply_move(Move::Give { piece: 0 }).unwrap();
        place(&mut game, 0, Piece::QUARTO.value());

        assert!(game.is_terminal());
        assert_eq!(game.winner(), Some(Seat::First));
    }

    #[test]
    fn test_exhausted_pieces_draw() {
        let mut game = QuartoGame::new();
        game.apply_move(Move::Give { piece: 0 }).unwrap();
        for index in 0..15u8 {
            place(&mut game, index, index + 1);
        }
        assert_eq!(game.ply(), 17);
        assert!(game.is_legal(&Move::Place { index: 15, piece: Piece::NONE.value() }));
        assert!(game.is_legal(&Move::Place { index: 15, piece: Piece::QUARTO.value() }));

        place(&mut game, 15, Piece::NONE.value());
        assert!(game.is_terminal());
        assert_eq!(game.winner(), None);
    }

    #[test]
    fn test_shares_attribute() {
        let common = [Piece(0), Piece(1), Piece(2), Piece(3)];
        assert!(shares_attribute(&common));

        let disjoint = [Piece(0b0000), Piece(0b1111), Piece(0b0011), Piece(0b1100)];
        assert!(!shares_attribute(&disjoint));
    }

    #[test]
    fn test_piece_labels() {
        assert_eq!(Piece(0).label(), "LSRS");
        assert_eq!(Piece(15).label(), "DLSH");
        assert_eq!(Piece::QUARTO.label(), "QUARTO");
        assert!(Piece::from_wire(18).is_none());
    }

    #[test]
    fn test_describe_board() {
        let mut game = QuartoGame::new();
        game.apply_move(Move::Give { piece: 15 }).unwrap();
        place(&mut game, 0, 1);

        let board = game.describe_board();
        assert!(board.starts_with("DLSH|    |    |    "));
        assert!(board.contains(" 15 "));
        assert_eq!(board.lines().count(), 7);
    }
}
