//! Sibling groups driven from several threads at once.
//!
//! Every job gets its own child group. Lines from different jobs interleave
//! at the bottom while each header keeps animating in place.

use std::thread::{scope, sleep};
use std::time::Duration;

use spin_tally::*;

fn main() -> Result<(), SpinnerError> {
    let spinner = Spinner::new();

    spinner.group("Downloading", |group| {
        scope(|s| {
            let jobs: Vec<_> = [("index", 3), ("crates", 6), ("docs", 4), ("assets", 2)]
                .into_iter()
                .map(|(job, size)| {
                    let group = group.clone();
                    s.spawn(move || {
                        group.child(job, |child| {
                            for chunk in 1..=size {
                                sleep(Duration::from_millis(150 * (job.len() as u64 % 3 + 1)));
                                child.write(&format!("{job}: chunk {chunk}/{size}"))?;
                            }
                            if job == "docs" {
                                child.warning(Some("2 pages missing"))?;
                            }
                            Ok::<_, SpinnerError>(())
                        })
                    })
                })
                .collect();
            jobs.into_iter()
                .try_for_each(|job| job.join().expect("job thread panicked"))
        })
    })?;

    Ok(())
}
