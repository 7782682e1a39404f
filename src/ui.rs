//! Terminal output helpers

use colored::*;
use terminal_size::{terminal_size, Height, Width};

/// Banner shown when entering interactive chat.
pub fn print_header(model: &str, provider: &str, user: Option<&str>) {
    let (width, _) = terminal_size().unwrap_or((Width(80), Height(24)));
    let width = width.0 as usize;

    let line = "─".repeat(width);
    println!("{}", line.black().bold());

    let name = "Amity".magenta().bold();
    let version = format!("v{}", env!("CARGO_PKG_VERSION")).black().bold();
    println!("  {} {}", name, version);

    let info = format!("  {}  •  {}", model, provider).cyan();
    println!("{}", info);

    match user {
        Some(user) => println!("  signed in as {}", user.green()),
        None => println!("  {}", "not signed in".yellow()),
    }

    println!("{}", line.black().bold());
}

pub fn print_step(msg: &str) {
    println!("  {} {}", "•".green(), msg);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "!".yellow().bold(), msg.yellow());
}

pub fn print_error(msg: &str) {
    println!("  {} {}", "✗".red().bold(), msg.red());
}
