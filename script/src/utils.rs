use colored::*;
use tracing_subscriber::EnvFilter;

pub fn print_banner() {
    println!("{}", r#"
    ____                 __           __
   / __ \_________  ____/ /_  _______/ /_
  / /_/ / ___/ __ \/ __  / / / / ___/ __/
 / ____/ /  / /_/ / /_/ / /_/ / /__/ /_
/_/   /_/   \____/\__,_/\__,_/\___/\__/
    "#.cyan().bold());
    println!("{}", "Product Passport zk-Prover".bright_blue().italic());
    println!("{}", "=============================================".bright_black());
    println!();
}

pub fn print_step(msg: &str) {
    println!("{} {}", "➜".cyan().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✔".green().bold(), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", "!".yellow().bold(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✖".red().bold(), msg);
}

pub fn print_info(key: &str, value: &str) {
    println!("  {}: {}", key.bright_black(), value.yellow());
}

pub fn print_divider() {
    println!("{}", "---------------------------------------------".bright_black());
}

/// Installs a fmt subscriber filtered by `RUST_LOG`, defaulting to `info`.
pub fn setup_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
