use std::{env, env::VarError};

/// The server takes no arguments. Passing any prints the help text and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Secrets are deliberately left off this list
    const DISPLAY_ENVS: [&str; 15] = [
        "RUST_LOG",
        "FG_HOST",
        "FG_PORT",
        "FG_DATABASE_URL",
        "FG_PAYSTACK_BASE_URL",
        "FG_FLUTTERWAVE_BASE_URL",
        "FG_GATEWAY_TIMEOUT_SECS",
        "FG_PLATFORM_FEE_RATE",
        "FG_DEFAULT_COMMISSION_RATE",
        "FG_WEBHOOK_SIGNATURE_CHECKS",
        "FG_TEST_MODE",
        "FG_PENDING_SWEEP_INTERVAL_SECS",
        "FG_PENDING_SWEEP_AGE_MINS",
        "FG_USE_X_FORWARDED_FOR",
        "FG_USE_FORWARDED",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
