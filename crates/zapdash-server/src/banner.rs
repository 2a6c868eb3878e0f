use owo_colors::OwoColorize;

pub fn print_banner() {
    println!();
    println!("  {} {}", "⚡".yellow(), "zapdash".green().bold());
    println!("  {}", "painel de conversas WhatsApp".dimmed());
    println!("  {}", format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
    println!();
}
