use std::io::Write;

use modeldock_core::state::InstallPhase;
use modeldock_core::state::InstallTracker;
use modeldock_ollama::PullEvent;
use modeldock_ollama::PullProgressReporter;
use uuid::Uuid;

/// Console reporter for pull/create streams. Status phases print one line
/// each; download progress redraws in place.
pub struct ConsoleReporter {
    tracker: InstallTracker,
    op: Uuid,
    last_status: Option<String>,
    redrawing: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        let mut tracker = InstallTracker::new();
        let op = tracker.begin();
        Self {
            tracker,
            op,
            last_status: None,
            redrawing: false,
        }
    }

    pub fn phase(&self) -> Option<&InstallPhase> {
        self.tracker.phase(self.op)
    }

    fn end_redraw(&mut self) {
        if self.redrawing {
            println!();
            self.redrawing = false;
        }
    }
}

impl PullProgressReporter for ConsoleReporter {
    fn on_event(&mut self, event: &PullEvent) -> std::io::Result<()> {
        match event {
            PullEvent::Progress(progress) => {
                self.tracker.update(self.op, progress);
                if let Some(pct) = progress.percentage() {
                    print!("\r{}: {pct:>3.0}%", progress.status);
                    std::io::stdout().flush()?;
                    self.redrawing = true;
                } else if self.last_status.as_deref() != Some(progress.status.as_str()) {
                    self.end_redraw();
                    println!("{}", progress.status);
                    self.last_status = Some(progress.status.clone());
                }
            }
            PullEvent::Success => {
                self.tracker.complete(self.op);
                self.end_redraw();
            }
            PullEvent::Error(message) => {
                // The failure itself is surfaced by the operation's error
                // path; here we only settle the phase and the console line.
                self.tracker.fail(self.op, message.clone());
                self.end_redraw();
            }
        }
        Ok(())
    }
}
