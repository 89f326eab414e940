//! Rendering of fetched OTPs.

use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{Table, presets::NOTHING};
use grabotp_core::ParsedOtp;
use tracing::debug;

/// Print OTPs as a pretty JSON array.
pub fn print_json(otps: &[ParsedOtp]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(otps)?);
    Ok(())
}

/// Print OTPs as a borderless `from | age | code` table.
pub fn print_table(otps: &[ParsedOtp]) {
    if otps.is_empty() {
        println!("No OTPs found.");
        return;
    }
    println!("{}", render_table(otps, Utc::now()));
}

/// Copy the most recent code to the clipboard. Best-effort: a missing or
/// unusable clipboard is ignored.
pub fn copy_latest(otps: &[ParsedOtp]) {
    let Some(code) = latest_code(otps) else {
        return;
    };

    match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(code)) {
        Ok(()) => debug!("Copied the latest code to the clipboard"),
        Err(e) => debug!("Clipboard unavailable: {e}"),
    }
}

/// OTPs arrive newest first.
fn latest_code(otps: &[ParsedOtp]) -> Option<&str> {
    otps.first().map(|otp| otp.otp.as_str())
}

fn render_table(otps: &[ParsedOtp], now: DateTime<Utc>) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);

    for otp in otps {
        let age = time_ago(otp.timestamp, now);
        table.add_row([otp.from.as_str(), age.as_str(), otp.otp.as_str()]);
    }
    table
}

/// Human-readable age: whole seconds under a minute, rounded minutes after.
fn time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let millis = (now - timestamp).num_milliseconds().max(0);

    let seconds = (millis + 500) / 1000;
    if seconds < 60 {
        return format!("{seconds}s ago");
    }

    let minutes = (millis + 30_000) / 60_000;
    format!("{minutes}m ago")
}
