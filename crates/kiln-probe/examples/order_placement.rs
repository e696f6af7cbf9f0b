//! Simulated order placement test: steps subdividing a stimulation block.

use kiln_probe::{CriticalFailure, Probe};
use std::io::Stdout;

fn body(probe: &mut Probe<Stdout>) -> Result<(), CriticalFailure> {
    {
        let mut rigging = probe.block("rigging");
        rigging.feature("order_service", "initialize");
        rigging.feature("payment_gateway", "connect");
        rigging.feature("inventory_service", "connect");
    }

    {
        let mut stimulation = probe.block("stimulation");
        let mut create = stimulation.step("create_order");
        create.measure("order_total", 129.97, "USD");
        create.measure("items_count", 3.0, "items");

        {
            let mut validate = create.step("validate_inventory");
            validate.measure("stock_check_ms", 15.0, "ms");
            validate.assert_critical("all_items_in_stock", true)?;
        }
        {
            let mut payment = create.step("process_payment");
            payment.measure("charge_amount", 129.97, "USD");
            payment.assert_critical("payment_authorized", true)?;
        }
        let mut confirm = create.step("send_confirmation");
        confirm.measure("email_latency_ms", 50.0, "ms");
        confirm.assert_that("confirmation_sent", true);
    }

    {
        let mut checkpoint = probe.block("checkpoint");
        checkpoint.assert_that("order_created", true);
        checkpoint.assert_that("payment_processed", true);
        checkpoint.assert_that("inventory_decremented", true);
    }

    let mut verdict = probe.block("verdict");
    verdict.assert_that("order_steps_flow", true);
    Ok(())
}

fn main() {
    let mut probe = Probe::stdout();
    let _ = body(&mut probe);
    std::process::exit(probe.exit_code());
}
