// src/cli/widgets.rs — `widgets` and `config` commands

use crate::infra::config::Config;
use crate::infra::paths;
use crate::widgets::WidgetKind;

pub fn list_widgets(config: &Config) -> anyhow::Result<()> {
    println!("  {:<16} {:<8} {:<9} ENDPOINT", "WIDGET", "ENABLED", "INTERVAL");
    for kind in WidgetKind::ALL {
        println!(
            "  {:<16} {:<8} {:<9} {}",
            kind.slug(),
            if config.widget_enabled(kind) { "yes" } else { "no" },
            format!("{}s", config.interval_for(kind).as_secs_f64()),
            kind.endpoint()
        );
    }
    if !config.polling.enabled {
        println!();
        println!("  Auto-refresh is off ([polling] enabled = false).");
    }
    Ok(())
}

/// Print the effective config as TOML, with the token masked.
pub fn show_config(config: &Config) -> anyhow::Result<()> {
    let path = paths::config_file_path();
    if path.exists() {
        eprintln!("# {}", path.display());
    } else {
        eprintln!("# {} (not found, using defaults)", path.display());
    }
    print!("{}", render_config(config)?);
    Ok(())
}

fn render_config(config: &Config) -> anyhow::Result<String> {
    let mut shown = config.clone();
    shown.api.token = config.token().map(|t| mask_token(&t));
    Ok(toml::to_string_pretty(&shown)?)
}

fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 8 {
        "****".into()
    } else {
        format!("{visible}****")
    }
}
