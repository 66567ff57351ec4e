use std::io::{BufRead, IsTerminal, Write};
use std::sync::Arc;

use log::info;

/// The page-level side effects a dialer response can trigger.
pub trait Browser: Send + Sync {
    /// Leave the current page for `url`.
    fn navigate(&self, url: &str);

    /// Show `message` and block until the user dismisses it.
    fn alert(&self, message: &str);
}

impl<B: Browser + ?Sized> Browser for Arc<B> {
    fn navigate(&self, url: &str) {
        (**self).navigate(url)
    }

    fn alert(&self, message: &str) {
        (**self).alert(message)
    }
}

/// Terminal stand-in for a browser window.
///
/// Navigation is printed to stdout. Alerts go to stderr and, when stdin is a
/// terminal, wait for Enter.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBrowser;

impl Browser for TerminalBrowser {
    fn navigate(&self, url: &str) {
        info!("Server redirected to {}", url);
        println!("Open {} to continue", url);
    }

    fn alert(&self, message: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{}", message);

        let stdin = std::io::stdin();
        if stdin.is_terminal() {
            let _ = write!(stderr, "Press Enter to dismiss ");
            let _ = stderr.flush();
            let mut line = String::new();
            let _ = stdin.lock().read_line(&mut line);
        }
    }
}
