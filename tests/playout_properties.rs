//! Property tests over random games.

use pawn_duel_lib::chess::{
    is_attacked, BoardState, Move, MoveApplier, MoveGenerator, Termination, TerminationClassifier,
};
use proptest::prelude::*;
use shakmaty::{fen::Fen, uci::UciMove, CastlingMode, Chess, Position};

fn start_position() -> impl Strategy<Value = BoardState> {
    prop::sample::select(vec![
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    ])
    .prop_map(|fen| BoardState::from_fen(fen).unwrap())
}

fn choices() -> impl Strategy<Value = Vec<u16>> {
    prop::collection::vec(any::<u16>(), 0..80)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn legal_moves_never_expose_the_king(start in start_position(), picks in choices()) {
        let mut board = start;
        for pick in picks {
            let moves = MoveGenerator::legal_moves(&board, None);
            if moves.is_empty() {
                break;
            }
            let mover = board.turn();
            for mv in &moves {
                let (next, _) = MoveApplier::successor(&board, mv);
                let king = next.placement().king_square(mover).unwrap();
                prop_assert!(
                    !is_attacked(next.placement(), king, mover.opposite()),
                    "{} leaves the king attacked in {}", mv, board.to_fen()
                );
            }
            board = MoveApplier::successor(&board, &moves[pick as usize % moves.len()]).0;
        }
    }

    #[test]
    fn revert_restores_the_previous_placement(start in start_position(), picks in choices()) {
        let mut board = start;
        for pick in picks {
            let moves = MoveGenerator::legal_moves(&board, None);
            if moves.is_empty() {
                break;
            }
            let (next, record) = MoveApplier::apply(&board, &moves[pick as usize % moves.len()]);
            prop_assert_eq!(record.revert(next.placement()), *board.placement());
            prop_assert_eq!(next.history().len(), board.history().len() + 1);
            board = next;
        }
    }

    #[test]
    fn playouts_agree_with_shakmaty(start in start_position(), picks in choices()) {
        let fen: Fen = start.to_fen().parse().unwrap();
        let mut pos: Chess = fen.into_position(CastlingMode::Standard).unwrap();
        let mut board = start;

        for pick in picks {
            let mut ours: Vec<String> = MoveGenerator::legal_moves(&board, None).iter().map(|m| m.to_uci()).collect();
            let mut theirs: Vec<String> =
                pos.legal_moves().iter().map(|m| m.to_uci(CastlingMode::Standard).to_string()).collect();
            ours.sort();
            theirs.sort();
            prop_assert_eq!(&ours, &theirs, "move lists differ at {}", board.to_fen());
            prop_assert_eq!(MoveGenerator::is_check(&board), pos.is_check());

            match TerminationClassifier::classify(&board) {
                Termination::Checkmate { .. } => prop_assert!(pos.is_checkmate()),
                Termination::Stalemate => prop_assert!(pos.is_stalemate()),
                _ => prop_assert!(!pos.legal_moves().is_empty()),
            }
            if ours.is_empty() {
                break;
            }

            let choice = &ours[pick as usize % ours.len()];
            let mv: Move = choice.parse().unwrap();
            board = MoveApplier::successor(&board, &mv).0;
            let uci = UciMove::from_ascii(choice.as_bytes()).unwrap();
            let m = uci.to_move(&pos).unwrap();
            pos.play_unchecked(&m);
        }
    }
}
