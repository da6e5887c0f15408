use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use rhtmx_client_router::{join_paths, MatchResult, RouteMatcher, RouteNode, RouterConfig};

#[derive(Parser)]
#[command(name = "rhtmx-routes")]
#[command(version, about = "Inspect an RHTMX client route config", long_about = None)]
struct Cli {
    /// Route config file (.toml or .json)
    config: PathBuf,

    /// Paths to resolve against the route tree
    paths: Vec<String>,

    /// Print the full root-to-leaf match chain for each path
    #[arg(short, long)]
    chain: bool,

    /// Print the resolved route tree
    #[arg(short, long)]
    tree: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = RouterConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load route config: {:?}", cli.config))?;

    let matcher = RouteMatcher::new();
    matcher
        .prepare(&config.routes)
        .context("Route config contains an invalid template")?;

    println!(
        "{} {} ({} mode{})",
        "✓".green(),
        cli.config.display().to_string().bold(),
        config.mode,
        config
            .base
            .as_deref()
            .map(|base| format!(", base {}", base))
            .unwrap_or_default()
    );

    if cli.tree || cli.paths.is_empty() {
        println!();
        print_tree(&config.routes, "", 0);
    }

    for path in &cli.paths {
        println!();
        if cli.chain {
            let chain = matcher.find_matching_routes(&config.routes, path, "")?;
            if chain.is_empty() {
                print_miss(path);
            }
            for (depth, found) in chain.iter().enumerate() {
                print_match(path, found, depth);
            }
        } else {
            match matcher.match_route(&config.routes, path, "")? {
                Some(found) => print_match(path, &found, 0),
                None => print_miss(path),
            }
        }
    }

    Ok(())
}

fn print_tree(routes: &[RouteNode], prefix: &str, depth: usize) {
    for node in routes {
        let full = join_paths(prefix, &node.path);
        let mut line = format!("{}{}", "  ".repeat(depth), full.cyan());

        if let Some(component) = &node.component {
            line.push_str(&format!(" → {}", component.as_str().yellow()));
        }
        if let Some(redirect) = &node.redirect {
            line.push_str(&format!(" ↪ {}", redirect.magenta()));
        }
        if !node.meta.is_empty() {
            let meta = serde_json::Value::Object(node.meta.clone()).to_string();
            line.push_str(&format!(" {}", meta.dimmed()));
        }
        println!("{}", line);

        print_tree(&node.children, &full, depth + 1);
    }
}

fn print_match(path: &str, found: &MatchResult<'_>, depth: usize) {
    let indent = "  ".repeat(depth);
    let component = found
        .route
        .component
        .as_ref()
        .map(|c| c.as_str().to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut params: Vec<String> = found
        .params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();
    params.sort();

    println!(
        "{}{} {} {} {}",
        indent,
        path.bold(),
        "→".green(),
        found.path.cyan(),
        component.yellow()
    );
    if !params.is_empty() {
        println!("{}  params: {}", indent, params.join(", "));
    }
    if let Some(target) = found.route.redirect_target(&found.params) {
        println!("{}  redirects to {}", indent, target.magenta());
    }
}

fn print_miss(path: &str) {
    println!("{} {} {}", path.bold(), "✗".red(), "no matching route".red());
}
