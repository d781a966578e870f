//! Routing `tracing` events into the running group.
//!
//! `Spinner::layer` turns every event into a line under the group that is
//! currently open. `WARN` and `ERROR` events escalate it.

use std::thread::sleep;
use std::time::Duration;

use spin_tally::*;
use tracing_subscriber::prelude::*;

fn main() -> Result<(), SpinnerError> {
    let spinner = Spinner::new();
    tracing_subscriber::registry().with(spinner.layer()).init();

    tracing::info!("starting sync");

    spinner.group("Syncing", |group| {
        for (file, changed) in [("a.txt", true), ("b.txt", false), ("c.txt", true)] {
            sleep(Duration::from_millis(400));
            tracing::info!(changed, "checked {file}");
        }
        group.child("Merging", |_| {
            sleep(Duration::from_millis(400));
            tracing::warn!(file = "c.txt", "conflict resolved automatically");
            Ok::<_, SpinnerError>(())
        })
    })?;

    Ok(())
}
