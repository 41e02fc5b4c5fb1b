fn main() {
    if let Err(e) = pawn_duel_lib::run() {
        log::error!("Chess server failed: {}", e);
        eprintln!("pawn-duel: {}", e);
        std::process::exit(1);
    }
}
