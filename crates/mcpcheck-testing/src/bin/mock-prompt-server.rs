//! Line-oriented MCP prompt server used by the mcpcheck integration tests.
//!
//! Behaviour is selected with `MOCK_SERVER_MODE`; see
//! [`mcpcheck_testing::mock::MockMode`].

use mcpcheck_testing::mock::{MockMode, MockPromptServer};
use std::process::ExitCode;
use tokio::io::BufReader;

fn main() -> ExitCode {
    let mode = match MockMode::from_env() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("mock-prompt-server: {e}");
            return ExitCode::FAILURE;
        }
    };
    if mode == MockMode::Exit {
        return ExitCode::SUCCESS;
    }

    // Blocked before the runtime starts so every worker thread inherits it.
    #[cfg(unix)]
    if mode == MockMode::IgnoreTerm {
        use nix::sys::signal::{SigSet, Signal};

        let mut set = SigSet::empty();
        set.add(Signal::SIGTERM);
        if let Err(e) = set.thread_block() {
            eprintln!("mock-prompt-server: failed to block SIGTERM: {e}");
            return ExitCode::FAILURE;
        }
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("mock-prompt-server: {e}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("mock-prompt-server: serving in {mode} mode");
    let server = MockPromptServer::new(mode);
    let served = runtime.block_on(
        server.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout()),
    );
    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mock-prompt-server: {e}");
            ExitCode::FAILURE
        }
    }
}
