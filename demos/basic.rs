//! A single group with a few lines and a warning.
//!
//! The header animates while the closure runs and settles on the state icon
//! once it returns. A warning line escalates the whole group.

use std::thread::sleep;
use std::time::Duration;

use spin_tally::*;

fn main() -> Result<(), SpinnerError> {
    let spinner = Spinner::new();

    spinner.group("Loading configuration", |group| {
        for file in ["base.toml", "local.toml", "secrets.toml"] {
            sleep(Duration::from_millis(400));
            group.write(&format!("read {file}"))?;
        }
        sleep(Duration::from_millis(400));
        group.warning(Some("secrets.toml is world readable"))
    })?;

    spinner.group("Connecting", |group| {
        sleep(Duration::from_millis(800));
        group.write_state("connected to db:5432", SpinnerState::Ok)
    })?;

    Ok(())
}
