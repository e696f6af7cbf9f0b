//! Simulated login test: rigging failure path when the backend is absent.

use kiln_probe::{CriticalFailure, Probe};
use std::io::Stdout;

fn body(probe: &mut Probe<Stdout>) -> Result<(), CriticalFailure> {
    let auth_available = std::env::var_os("AUTH_BACKEND_DOWN").is_none();

    {
        let mut rigging = probe.block("rigging");
        rigging.feature("user_auth", "initialize");
        if !auth_available {
            rigging.fail("auth_backend", "auth backend not reachable")?;
        }
    }

    {
        let mut stimulation = probe.block("stimulation");
        stimulation.measure("login_latency_ms", 42.0, "ms");
    }

    let mut verdict = probe.block("verdict");
    verdict.assert_that("session_created", true);
    verdict.assert_that("user_login_flow", true);
    Ok(())
}

fn main() {
    let mut probe = Probe::stdout();
    let _ = body(&mut probe);
    std::process::exit(probe.exit_code());
}
