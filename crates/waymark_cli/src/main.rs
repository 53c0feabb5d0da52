//! Waymark CLI
//!
//! Inspect page fixtures and simulate anchor navigation against them.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use waymark_core::{AnchorRegistry, Document, MemoryDocument, NavEvent, Viewport, Window};
use waymark_nav::location::deep_link_candidates;
use waymark_nav::{FrameDriver, NavigationController};

mod fixture;

use fixture::PageFixture;

/// Upper bound on simulated time for a single command
const SIMULATION_LIMIT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "waymark")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "In-page anchor navigation toolkit", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the anchors and the menu a page would get
    Inspect {
        /// Page fixture (TOML)
        page: PathBuf,
    },

    /// Print the resolved configuration as JSON
    Config {
        /// Page fixture (TOML)
        page: PathBuf,
    },

    /// Scroll to an anchor and print every animation frame
    Navigate {
        /// Page fixture (TOML)
        page: PathBuf,

        /// Anchor id
        id: String,

        /// Simulated frame rate
        #[arg(long, default_value = "60")]
        fps: u32,
    },

    /// Simulate page load, including deep links in the fixture URL
    Load {
        /// Page fixture (TOML)
        page: PathBuf,

        /// Simulated frame rate
        #[arg(long, default_value = "60")]
        fps: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Inspect { page } => cmd_inspect(&page),
        Commands::Config { page } => cmd_config(&page),
        Commands::Navigate { page, id, fps } => cmd_navigate(&page, &id, fps),
        Commands::Load { page, fps } => cmd_load(&page, fps),
    }
}

fn cmd_inspect(page: &Path) -> Result<()> {
    let fixture = PageFixture::load(page)?;
    let config = fixture.configuration();
    let mut doc = fixture.build()?;

    let registry = AnchorRegistry::new(config.anchor_selector.clone());
    if let Err(err) = registry.validate(&doc) {
        warn!("{}", err);
    }

    let mut nav = NavigationController::install(&mut doc, config, Duration::ZERO)
        .ok_or_else(|| anyhow::anyhow!("navigation already installed for this page"))?;

    println!("Anchors ({})", nav.anchors().len());
    println!("==========");
    for anchor in nav.anchors() {
        let top = doc
            .bounding_rect(anchor.element)
            .map(|r| format!("{:.0}", r.top))
            .unwrap_or_else(|| "-".into());
        let offset = anchor
            .effective_override()
            .map(|px| format!("{px}px"))
            .unwrap_or_else(|| "-".into());
        println!(
            "  #{:<20} {:<24} top={:<6} offset={:<6} {}",
            anchor.id,
            anchor.display_name,
            top,
            offset,
            if anchor.visible_in_menu { "menu" } else { "hidden" }
        );
    }

    println!();
    println!("Menu");
    println!("====");
    if nav.menu_entries().is_empty() {
        println!("  (no menu container or no visible anchors)");
    }
    for entry in nav.menu_entries() {
        let label = doc.attribute(entry.link, "aria-label").unwrap_or_default();
        let href = doc.attribute(entry.link, "href").unwrap_or_default();
        let active = if nav.active_id() == Some(entry.anchor_id.as_str()) {
            " (active)"
        } else {
            ""
        };
        println!("  {:<24} {}{}", href, label, active);
    }

    nav.teardown();
    Ok(())
}

fn cmd_config(page: &Path) -> Result<()> {
    let fixture = PageFixture::load(page)?;
    let config = fixture.configuration();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_navigate(page: &Path, id: &str, fps: u32) -> Result<()> {
    let fixture = PageFixture::load(page)?;
    let mut doc = fixture.build()?;
    let initial_url = doc.location();
    let mut driver = FrameDriver::with_fps(fps);
    let mut nav = NavigationController::install(&mut doc, fixture.configuration(), driver.now())
        .ok_or_else(|| anyhow::anyhow!("navigation already installed for this page"))?;

    // Let a deep link in the fixture URL land first so it cannot supersede us
    if let Some(landed) = run_deep_link(&mut nav, &mut doc, &mut driver, &initial_url) {
        info!("Page loaded at #{}", landed);
    }

    let start = driver.now();
    if !nav.scroll_to(&mut doc, id, start) {
        let known: Vec<_> = nav.anchors().iter().map(|a| a.id.as_str()).collect();
        anyhow::bail!("Unknown anchor '{}'. Known anchors: {:?}", id, known);
    }

    info!("Navigating to #{} at {} fps", id, fps);
    println!("{:>9}  {:>9}  active", "t (ms)", "scroll_y");
    print_frame(&driver, start, &doc, nav.active_id());
    while nav.needs_frame() && driver.now() - start < SIMULATION_LIMIT {
        driver.step(&mut nav, &mut doc);
        print_frame(&driver, start, &doc, nav.active_id());
    }

    println!();
    print_summary(&nav, &mut doc)?;
    nav.teardown();
    Ok(())
}

fn cmd_load(page: &Path, fps: u32) -> Result<()> {
    let fixture = PageFixture::load(page)?;
    let mut doc = fixture.build()?;
    let initial_url = doc.location();
    let mut driver = FrameDriver::with_fps(fps);

    let mut nav = NavigationController::install(&mut doc, fixture.configuration(), driver.now())
        .ok_or_else(|| anyhow::anyhow!("navigation already installed for this page"))?;

    let requested = deep_link_candidates(&initial_url, nav.config().allow_query);
    match run_deep_link(&mut nav, &mut doc, &mut driver, &initial_url) {
        Some(id) => info!("Deep link to #{} landed after {:?}", id, driver.now()),
        None if requested.is_empty() => info!("No deep link in {}", initial_url),
        None => warn!("Deep link names no known anchor: {:?}", requested),
    }

    println!("URL before: {}", initial_url);
    print_summary(&nav, &mut doc)?;
    nav.teardown();
    Ok(())
}

/// Step until the deep link named by `url` (if any) has landed
fn run_deep_link(
    nav: &mut NavigationController,
    doc: &mut MemoryDocument,
    driver: &mut FrameDriver,
    url: &url::Url,
) -> Option<String> {
    let target = deep_link_candidates(url, nav.config().allow_query)
        .into_iter()
        .find(|id| nav.anchors().iter().any(|a| &a.id == id))?;

    // Auto-hide alone would keep timers pending, so wait for the event instead
    while !has_navigated(doc) && driver.now() < SIMULATION_LIMIT {
        driver.step(nav, doc);
    }
    Some(target)
}

fn has_navigated(doc: &MemoryDocument) -> bool {
    doc.events()
        .iter()
        .any(|e| matches!(e, NavEvent::Navigated { .. }))
}

fn print_frame(driver: &FrameDriver, start: Duration, doc: &MemoryDocument, active: Option<&str>) {
    let t = (driver.now() - start).as_secs_f64() * 1000.0;
    println!("{:>9.1}  {:>9.1}  {}", t, doc.scroll_y(), active.unwrap_or("-"));
}

fn print_summary(nav: &NavigationController, doc: &mut MemoryDocument) -> Result<()> {
    println!("URL:       {}", doc.location());
    println!("scroll_y:  {:.1}", doc.scroll_y());
    println!("active:    {}", nav.active_id().unwrap_or("-"));
    println!("Events:");
    for event in doc.take_events() {
        println!("  {:<28} {}", event.name(), serde_json::to_string(&event)?);
    }
    Ok(())
}
