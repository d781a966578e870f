//! Nested groups, error propagation and resuming with `reenter`.
//!
//! A failing child marks every header above it, and the error still reaches
//! `main`. Afterwards `reenter` picks the tree up where it stopped.

use std::thread::sleep;
use std::time::Duration;

use spin_tally::*;

#[derive(Debug, thiserror::Error)]
enum DeployError {
    #[error("health check failed on {0}")]
    Unhealthy(&'static str),
    #[error(transparent)]
    Spinner(#[from] SpinnerError),
}

fn step(node: &SpinnerNode, text: &str) -> Result<(), SpinnerError> {
    sleep(Duration::from_millis(300));
    node.write(text)
}

fn main() {
    let options = SpinnerOptions::default()
        .separate(true)
        .line(LineOptions::default().label(true));
    let spinner = Spinner::with_options(options).unwrap();

    let result: Result<(), DeployError> = spinner.group("Deploy", |deploy| {
        deploy.child("Build", |build| {
            step(build, "compiling")?;
            step(build, "linking")
        })?;
        deploy.child("Rollout", |rollout| {
            for host in ["eu-1", "eu-2", "us-1"] {
                rollout.child(host, |node| {
                    step(node, "uploading")?;
                    if host == "us-1" {
                        return Err(DeployError::Unhealthy(host));
                    }
                    step(node, "healthy")?;
                    Ok(())
                })?;
            }
            Ok(())
        })
    });

    if let Err(error) = &result {
        spinner
            .reenter("Rollback", |node| {
                step(node, &format!("reverting after: {error}"))?;
                step(node, "restored previous release")
            })
            .unwrap();
    }
}
