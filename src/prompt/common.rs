use chrono::Local;

/// Utility function to get the current date in a human-readable format
pub fn current_date() -> String {
    let today = Local::now();
    format!(
        "{} {}, {}",
        today.format("%B"),
        today.format("%-d"),
        today.format("%Y")
    )
}
