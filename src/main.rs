use bento_board;

fn main() -> Result<(), eframe::Error> {
    // Set up logging for development
    env_logger::init();

    bento_board::run_app()
}
