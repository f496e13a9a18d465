//! Session instance and per-session turn state machine

use crate::board::{Board, COLS};
use crate::error::{GameServerError, Result};
use crate::types::{
    CellPos, Disc, PlayerId, Seat, SeatOccupant, SessionId, SessionOutcome, SessionStatus, WinKind,
};
use crate::utils::{current_timestamp, elapsed_secs};
use chrono::{DateTime, Utc};

/// What an accepted move did to the session
#[derive(Debug, Clone, PartialEq)]
pub enum MoveProgress {
    /// Game continues; this seat holds the turn now
    NextTurn(Seat),
    /// The mover completed a winning run
    Won(SessionOutcome),
    /// The board filled without a win
    Draw(SessionOutcome),
}

/// Result of applying one accepted move
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub row: usize,
    pub column: usize,
    pub disc: Disc,
    pub progress: MoveProgress,
}

impl MoveOutcome {
    /// The terminal outcome, when this move ended the game
    pub fn ended(&self) -> Option<&SessionOutcome> {
        match &self.progress {
            MoveProgress::Won(outcome) | MoveProgress::Draw(outcome) => Some(outcome),
            MoveProgress::NextTurn(_) => None,
        }
    }
}

/// One in-progress or completed match between two seats. Seat one is
/// always human and always moves first; seat two is a human or the bot.
/// Owned exclusively by the registry from creation to termination.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    seat_one: PlayerId,
    seat_two: SeatOccupant,
    board: Board,
    turn: Seat,
    status: SessionStatus,
    created_at: DateTime<Utc>,
    outcome: Option<SessionOutcome>,
}

impl Session {
    /// Create an Active session between two humans. The longer-waiting
    /// player takes seat one and moves first.
    pub fn new_human_pair(id: SessionId, seat_one: PlayerId, seat_two: PlayerId) -> Self {
        Self::new(id, seat_one, SeatOccupant::Human(seat_two))
    }

    /// Create an Active session against the bot; the human moves first
    pub fn new_vs_bot(id: SessionId, seat_one: PlayerId) -> Self {
        Self::new(id, seat_one, SeatOccupant::Bot)
    }

    fn new(id: SessionId, seat_one: PlayerId, seat_two: SeatOccupant) -> Self {
        // Both matchmaking paths fill seat two synchronously, so the
        // Waiting state collapses to Active at creation time.
        Self {
            id,
            seat_one,
            seat_two,
            board: Board::new(),
            turn: Seat::One,
            status: SessionStatus::Active,
            created_at: current_timestamp(),
            outcome: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn turn(&self) -> Seat {
        self.turn
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    pub fn seat_one(&self) -> &PlayerId {
        &self.seat_one
    }

    pub fn seat_two(&self) -> &SeatOccupant {
        &self.seat_two
    }

    pub fn vs_bot(&self) -> bool {
        self.seat_two.is_bot()
    }

    /// Occupant of a seat
    pub fn occupant(&self, seat: Seat) -> SeatOccupant {
        match seat {
            Seat::One => SeatOccupant::Human(self.seat_one.clone()),
            Seat::Two => self.seat_two.clone(),
        }
    }

    /// Occupant currently holding the turn
    pub fn current_occupant(&self) -> SeatOccupant {
        self.occupant(self.turn)
    }

    /// Seat held by a human player, if they occupy one
    pub fn seat_of(&self, player: &PlayerId) -> Option<Seat> {
        if &self.seat_one == player {
            Some(Seat::One)
        } else if self.seat_two.player_id() == Some(player) {
            Some(Seat::Two)
        } else {
            None
        }
    }

    /// Human participants of the session
    pub fn human_players(&self) -> Vec<PlayerId> {
        let mut players = vec![self.seat_one.clone()];
        if let SeatOccupant::Human(id) = &self.seat_two {
            players.push(id.clone());
        }
        players
    }

    /// Validate and apply one move for the given seat. Rejections leave
    /// the session untouched.
    pub fn apply_move(&mut self, mover: Seat, column: usize) -> Result<MoveOutcome> {
        if !self.is_active() {
            return Err(GameServerError::SessionNotActive {
                session_id: self.id.to_string(),
            }
            .into());
        }
        if mover != self.turn {
            return Err(GameServerError::NotYourTurn.into());
        }
        if column >= COLS {
            return Err(GameServerError::InvalidColumn { column }.into());
        }
        let row = self
            .board
            .drop_row(column)
            .ok_or(GameServerError::ColumnFull { column })?;

        let disc = mover.disc();
        self.board.place(row, column, disc);

        let progress = if let Some(win) = self.board.detect_win(row, column, disc) {
            let outcome = self.finish(Some(self.occupant(mover)), win.kind, win.cells);
            MoveProgress::Won(outcome)
        } else if self.board.is_full() {
            let outcome = self.finish(None, WinKind::Draw, Vec::new());
            MoveProgress::Draw(outcome)
        } else {
            self.turn = mover.other();
            MoveProgress::NextTurn(self.turn)
        };

        Ok(MoveOutcome {
            row,
            column,
            disc,
            progress,
        })
    }

    /// Forfeit the session on behalf of the seat that left; the other
    /// seat's occupant is declared winner.
    pub fn forfeit(&mut self, leaver: Seat) -> SessionOutcome {
        let winner = self.occupant(leaver.other());
        let outcome = SessionOutcome {
            winner: Some(winner),
            win_kind: WinKind::Forfeit,
            winning_cells: Vec::new(),
            duration_secs: elapsed_secs(self.created_at),
        };
        self.status = SessionStatus::Forfeited;
        self.outcome = Some(outcome.clone());
        outcome
    }

    fn finish(
        &mut self,
        winner: Option<SeatOccupant>,
        win_kind: WinKind,
        winning_cells: Vec<CellPos>,
    ) -> SessionOutcome {
        let outcome = SessionOutcome {
            winner,
            win_kind,
            winning_cells,
            duration_secs: elapsed_secs(self.created_at),
        };
        self.status = SessionStatus::Completed;
        self.outcome = Some(outcome.clone());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generate_session_id;

    fn human_session() -> Session {
        Session::new_human_pair(
            generate_session_id(),
            "alice".to_string(),
            "bob".to_string(),
        )
    }

    #[test]
    fn test_new_session_is_active_with_seat_one_to_move() {
        let session = human_session();
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.turn(), Seat::One);
        assert_eq!(session.seat_of(&"alice".to_string()), Some(Seat::One));
        assert_eq!(session.seat_of(&"bob".to_string()), Some(Seat::Two));
        assert_eq!(session.seat_of(&"carol".to_string()), None);
    }

    #[test]
    fn test_turn_alternates_after_accepted_moves() {
        let mut session = human_session();

        let outcome = session.apply_move(Seat::One, 0).unwrap();
        assert_eq!(outcome.disc, Disc::Red);
        assert_eq!(outcome.progress, MoveProgress::NextTurn(Seat::Two));
        assert_eq!(session.turn(), Seat::Two);

        let outcome = session.apply_move(Seat::Two, 1).unwrap();
        assert_eq!(outcome.disc, Disc::Yellow);
        assert_eq!(outcome.progress, MoveProgress::NextTurn(Seat::One));
        assert_eq!(session.turn(), Seat::One);
    }

    #[test]
    fn test_out_of_turn_move_rejected_without_mutation() {
        let mut session = human_session();
        let board_before = session.board().clone();

        let err = session.apply_move(Seat::Two, 0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GameServerError>(),
            Some(GameServerError::NotYourTurn)
        ));
        assert_eq!(session.board(), &board_before);
        assert_eq!(session.turn(), Seat::One);
    }

    #[test]
    fn test_out_of_range_column_rejected() {
        let mut session = human_session();
        let err = session.apply_move(Seat::One, COLS).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GameServerError>(),
            Some(GameServerError::InvalidColumn { column: 7 })
        ));
    }

    #[test]
    fn test_full_column_rejected() {
        let mut session = human_session();
        // Fill column 0 with alternating moves
        for _ in 0..3 {
            session.apply_move(Seat::One, 0).unwrap();
            session.apply_move(Seat::Two, 0).unwrap();
        }
        let board_before = session.board().clone();

        let err = session.apply_move(Seat::One, 0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GameServerError>(),
            Some(GameServerError::ColumnFull { column: 0 })
        ));
        assert_eq!(session.board(), &board_before);
    }

    #[test]
    fn test_vertical_win_completes_session() {
        let mut session = human_session();
        // Red stacks column 3; yellow plays elsewhere
        for yellow_col in [0, 1, 2] {
            session.apply_move(Seat::One, 3).unwrap();
            session.apply_move(Seat::Two, yellow_col).unwrap();
        }
        let outcome = session.apply_move(Seat::One, 3).unwrap();

        let end = match outcome.progress {
            MoveProgress::Won(end) => end,
            other => panic!("expected win, got {:?}", other),
        };
        assert_eq!(end.winner, Some(SeatOccupant::Human("alice".to_string())));
        assert_eq!(end.win_kind, WinKind::Vertical);
        assert_eq!(end.winning_cells.len(), 4);
        assert_eq!(session.status(), SessionStatus::Completed);

        // No further moves accepted
        assert!(session.apply_move(Seat::Two, 0).is_err());
    }

    #[test]
    fn test_draw_on_full_board() {
        let mut session = human_session();
        // Drawn position: alternating columns with rows 2 and 5 shifted,
        // so no axis ever reaches a run of four. The top-right cell is
        // left open for the final move.
        let rows = [
            "RYRYRY.", // final Red lands at (0, 6)
            "RYRYRYR",
            "YRYRYRY",
            "RYRYRYR",
            "RYRYRYR",
            "YRYRYRY",
        ];
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                match ch {
                    'R' => session.board_mut().place(row, col, Disc::Red),
                    'Y' => session.board_mut().place(row, col, Disc::Yellow),
                    _ => {}
                }
            }
        }

        let outcome = session.apply_move(Seat::One, 6).unwrap();
        let end = match outcome.progress {
            MoveProgress::Draw(end) => end,
            other => panic!("expected draw, got {:?}", other),
        };
        assert_eq!(end.winner, None);
        assert_eq!(end.win_kind, WinKind::Draw);
        assert!(end.winning_cells.is_empty());
        assert_eq!(session.status(), SessionStatus::Completed);
        assert!(session.board().is_full());
    }

    #[test]
    fn test_forfeit_declares_other_seat_winner() {
        let mut session = Session::new_vs_bot(generate_session_id(), "alice".to_string());
        let outcome = session.forfeit(Seat::One);

        assert_eq!(outcome.winner, Some(SeatOccupant::Bot));
        assert_eq!(outcome.win_kind, WinKind::Forfeit);
        assert_eq!(session.status(), SessionStatus::Forfeited);
        assert!(session.apply_move(Seat::One, 0).is_err());
    }

    #[test]
    fn test_bot_session_identities() {
        let session = Session::new_vs_bot(generate_session_id(), "alice".to_string());
        assert!(session.vs_bot());
        assert_eq!(session.occupant(Seat::Two), SeatOccupant::Bot);
        assert_eq!(session.human_players(), vec!["alice".to_string()]);
        assert_eq!(session.current_occupant(), SeatOccupant::Human("alice".to_string()));
    }
}
