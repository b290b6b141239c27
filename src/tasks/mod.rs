//! Timers that run alongside a form session.
//!
//! The resend countdown is the only one: it decrements once per second until
//! another code may be requested. It is cosmetic apart from gating resends.

use std::time::Duration;

use crate::services::LeadForm;
use crate::store::KeyValueStore;
use crate::utils::Clock;

/// Ticks the form's resend countdown once per second until it reaches zero.
pub async fn wait_out_cooldown<S: KeyValueStore, C: Clock>(form: &mut LeadForm<S, C>) {
    if form.cooldown_remaining() == 0 {
        return;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    // the first tick completes immediately
    interval.tick().await;
    while form.cooldown_remaining() > 0 {
        log::debug!("Resend available in {}s", form.cooldown_remaining());
        interval.tick().await;
        form.tick();
    }
}
