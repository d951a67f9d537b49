use clientela_core::config::LoadOptions;
use clientela_db::open_store;
use tokio::io::{stdin, stdout, BufReader};

use crate::commands::{run_blocking, CommandResult};
use crate::view::{Terminal, ViewController};

/// Interactive session. Prints nothing on a clean exit so the terminal
/// transcript is the only output.
pub fn run(options: LoadOptions) -> CommandResult {
    run_blocking("ui", options, |config| async move {
        let store = match open_store(&config.store).await {
            Ok(store) => store,
            Err(error) => {
                return CommandResult::failure("ui", "store_open", error.to_string(), 4);
            }
        };

        let mut controller = ViewController::new(store);
        let mut terminal = Terminal::new(BufReader::new(stdin()), stdout());
        match terminal.run(&mut controller).await {
            Ok(()) => CommandResult { exit_code: 0, output: String::new() },
            Err(error) => CommandResult::failure(
                "ui",
                "terminal_io",
                format!("terminal session failed: {error}"),
                3,
            ),
        }
    })
}
