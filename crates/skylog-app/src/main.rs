use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use anyhow::Result;
use skylog_app::app_services::AppServices;
use skylog_app::console::{Console, Flow};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    // Initialize core
    skylog_core::init()?;

    // Create and initialize application
    let mut app = skylog_core::App::new()?;
    app.initialize()?;

    let services = AppServices::init(app.config())?;
    tracing::info!("Skylog application started");

    let mut console = Console::new(
        services.runtime(),
        services.geocoder(),
        services.provider(),
        services.store(),
        app.config().export.directory.clone(),
    );

    println!("Skylog - weather lookup and saved forecasts");
    println!("Type 'help' for commands.");
    prompt()?;

    let input = spawn_stdin_reader();
    let mut out = Vec::new();

    loop {
        console.poll(&mut out);
        let mut show_prompt = !out.is_empty();

        match input.recv_timeout(POLL_INTERVAL) {
            Ok(line) => {
                if console.handle_line(&line, &mut out) == Flow::Quit {
                    break;
                }
                show_prompt = true;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        for line in out.drain(..) {
            println!("{}", line);
        }
        if show_prompt {
            prompt()?;
        }
    }

    // Graceful shutdown
    services.shutdown();
    app.shutdown()?;

    Ok(())
}

fn prompt() -> Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()?;
    Ok(())
}

/// Read stdin on its own thread so lookup results render while the user types.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to read input: {}", e);
                    break;
                }
            }
        }
    });
    rx
}
