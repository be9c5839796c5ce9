//! Terminal output helpers for consistent CLI formatting

use glsync_engine::SyncReport;

/// Check if color output is enabled
fn use_color() -> bool {
    std::env::var("NO_COLOR").is_err()
}

/// Print a success message (green checkmark)
pub fn print_success(message: &str) {
    if use_color() {
        println!("\x1b[32m✓\x1b[0m {}", message);
    } else {
        println!("OK: {}", message);
    }
}

/// Print a failure line (red cross)
pub fn print_failure(message: &str) {
    if use_color() {
        println!("\x1b[31m✗\x1b[0m {}", message);
    } else {
        println!("FAILED: {}", message);
    }
}

/// Print a warning message (yellow)
pub fn print_warning(message: &str) {
    if use_color() {
        eprintln!("\x1b[33mWarning:\x1b[0m {}", message);
    } else {
        eprintln!("Warning: {}", message);
    }
}

/// Print a key-value pair with consistent formatting
pub fn print_key_value(key: &str, value: &str) {
    if use_color() {
        println!("  \x1b[1m{}:\x1b[0m {}", key, value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Print a list of next steps
pub fn print_next_steps(steps: &[String]) {
    println!("\nNext steps:");
    for (i, step) in steps.iter().enumerate() {
        println!("  {}. {}", i + 1, step);
    }
}

/// Human-readable run report.
pub fn print_report(report: &SyncReport) {
    println!("{}", report);

    for group in &report.groups_created {
        print_key_value("created group", group);
    }
    for user in &report.users_created {
        let note = if user.email_adjusted {
            " (email adjusted)"
        } else {
            ""
        };
        print_key_value(
            "created user",
            &format!("{} <{}>{}", user.username, user.email, note),
        );
    }
    for change in &report.members_added {
        print_key_value("added", &format!("{} to {}", change.member, change.group));
    }
    for change in &report.members_removed {
        print_key_value(
            "removed",
            &format!("{} from {}", change.member, change.group),
        );
    }
    for action in &report.planned_actions {
        print_key_value("planned", &format!("{:?}", action));
    }

    for failure in &report.groups_failed {
        print_failure(&format!("group {}: {}", failure.group, failure.reason));
    }
    for failure in &report.users_failed {
        print_failure(&format!(
            "user {} in {}: {}",
            failure.member, failure.group, failure.reason
        ));
    }
    for failure in &report.members_failed {
        print_failure(&format!(
            "member {} in {}: {}",
            failure.member, failure.group, failure.reason
        ));
    }

    if report.has_failures() {
        print_warning("run completed with failures");
    } else if !report.has_changes() {
        print_success("everything already in sync");
    } else {
        print_success("sync complete");
    }
}
