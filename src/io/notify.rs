use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};

use crate::ops::reminder::{Job, Notifier, Permission, Schedule};

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// One sleeping thread per scheduled job.
#[derive(Default)]
pub struct ThreadSchedule {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until every scheduled job has run.
    pub fn wait(&self) {
        let handles: Vec<JoinHandle<()>> = match self.handles.lock() {
            Ok(mut guard) => guard.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };
        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!("reminder thread panicked");
            }
        }
    }
}

impl Schedule for ThreadSchedule {
    fn schedule(&self, at: DateTime<Utc>, job: Job) {
        let handle = std::thread::spawn(move || {
            // Already past: run immediately
            if let Ok(delay) = (at - Utc::now()).to_std() {
                std::thread::sleep(delay);
            }
            job();
        });
        match self.handles.lock() {
            Ok(mut guard) => guard.push(handle),
            Err(poisoned) => poisoned.into_inner().push(handle),
        }
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Prints notifications to a terminal stream, ringing the bell first.
///
/// Its permission starts from config. A request from `prompt` grants it,
/// `denied` stays denied.
pub struct TerminalNotifier<W: Write + Send> {
    out: Mutex<W>,
    permission: Mutex<Permission>,
    granted_on_request: AtomicBool,
}

impl TerminalNotifier<std::io::Stdout> {
    pub fn stdout(permission: Permission) -> Self {
        TerminalNotifier::new(std::io::stdout(), permission)
    }
}

impl<W: Write + Send> TerminalNotifier<W> {
    pub fn new(out: W, permission: Permission) -> Self {
        TerminalNotifier {
            out: Mutex::new(out),
            permission: Mutex::new(permission),
            granted_on_request: AtomicBool::new(false),
        }
    }

    /// True once a request has turned `prompt` into `granted`
    pub fn granted_on_request(&self) -> bool {
        self.granted_on_request.load(Ordering::SeqCst)
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> Notifier for TerminalNotifier<W> {
    fn permission(&self) -> Permission {
        self.permission.lock().map(|p| *p).unwrap_or(Permission::Denied)
    }

    fn request_permission(&self) {
        if let Ok(mut permission) = self.permission.lock()
            && *permission == Permission::Prompt
        {
            *permission = Permission::Granted;
            self.granted_on_request.store(true, Ordering::SeqCst);
            tracing::info!("notification permission granted");
        }
    }

    fn fire(&self, title: &str, body: &str) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        let result = writeln!(out, "\x07{}: {}", title, body).and_then(|()| out.flush());
        match result {
            Ok(()) => tracing::info!(title, "reminder fired"),
            Err(e) => tracing::warn!(error = %e, "could not show reminder"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[test]
    fn prompt_is_granted_on_request() {
        let notifier = TerminalNotifier::new(Vec::new(), Permission::Prompt);
        assert_eq!(notifier.permission(), Permission::Prompt);
        notifier.request_permission();
        assert_eq!(notifier.permission(), Permission::Granted);
        assert!(notifier.granted_on_request());
    }

    #[test]
    fn denied_stays_denied() {
        let notifier = TerminalNotifier::new(Vec::new(), Permission::Denied);
        notifier.request_permission();
        assert_eq!(notifier.permission(), Permission::Denied);
        assert!(!notifier.granted_on_request());
    }

    #[test]
    fn fire_rings_and_prints() {
        let notifier = TerminalNotifier::new(Vec::new(), Permission::Granted);
        notifier.fire("Task Due", "Water plants is due now!");
        let out = String::from_utf8(notifier.into_inner()).unwrap();
        assert_eq!(out, "\x07Task Due: Water plants is due now!\n");
    }

    #[test]
    fn thread_schedule_runs_jobs_after_their_time() {
        let schedule = ThreadSchedule::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        for offset_ms in [30, -1000] {
            let ran = Arc::clone(&ran);
            schedule.schedule(
                Utc::now() + chrono::Duration::milliseconds(offset_ms),
                Box::new(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }
        schedule.wait();
        assert_eq!(ran.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() >= std::time::Duration::from_millis(20));

        // Already joined
        schedule.wait();
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }
}
