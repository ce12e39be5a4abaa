//! Web server command.

use console::style;

use crate::config::Settings;

/// Start the web server.
pub async fn cmd_serve(settings: &Settings, bind: &str, no_migrate: bool) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(bind)?;

    settings.ensure_directories()?;

    if !no_migrate {
        // Run database migrations first
        println!("{} Running database migrations...", style("→").cyan());
        match crate::repository::migrations::run_migrations(&settings.database_url()).await {
            Ok(()) => {
                println!("  {} Database ready", style("✓").green());
            }
            Err(e) => {
                eprintln!("  {} Migration failed: {}", style("✗").red(), e);
                return Err(anyhow::anyhow!("Database migration failed: {}", e));
            }
        }
    }

    println!(
        "{} Starting Redline server at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "3030" -> 127.0.0.1:3030
/// - Just a host: "0.0.0.0" -> 0.0.0.0:3030
/// - Host and port: "0.0.0.0:3030" -> 0.0.0.0:3030
fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    // Try parsing as just a port number
    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }

    // Try parsing as host:port
    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return Ok((host.to_string(), port));
        }
    }

    // Must be just a host, use default port
    Ok((bind.to_string(), 3030))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_address_forms() {
        assert_eq!(
            parse_bind_address("3030").unwrap(),
            ("127.0.0.1".to_string(), 3030)
        );
        assert_eq!(
            parse_bind_address("0.0.0.0").unwrap(),
            ("0.0.0.0".to_string(), 3030)
        );
        assert_eq!(
            parse_bind_address("0.0.0.0:8080").unwrap(),
            ("0.0.0.0".to_string(), 8080)
        );
    }
}
