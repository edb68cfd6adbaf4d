use clap::Parser;
use icon_fallback::dom::Document;
use icon_fallback::loader::{settle_document, DiskOracle, SettleLimits};
use icon_fallback::runtime::RuntimeToggles;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

/// Resolve the icon fallback chains in an HTML document and report, as JSON,
/// the source every icon converges on.
#[derive(Parser, Debug)]
#[command(name = "settle_icons", version, about)]
struct Args {
  /// HTML file to resolve
  input: PathBuf,

  /// Directory the site is served from; site-absolute sources are checked
  /// for existence beneath it
  #[arg(long)]
  web_root: PathBuf,

  /// Treat http(s) sources as loadable instead of failing them
  #[arg(long)]
  assume_remote: bool,

  /// Base URL used to resolve relative sources before checking them
  #[arg(long)]
  base_url: Option<String>,

  /// Output compact JSON instead of pretty-printing.
  #[arg(long)]
  compact: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
  let args = Args::parse();

  let html = fs::read_to_string(&args.input)?;
  let mut doc = Document::parse_html(&html)?;
  doc.set_base_url(args.base_url.clone());

  let oracle = DiskOracle::new(&args.web_root).with_assume_remote(args.assume_remote);
  let limits = SettleLimits::from_toggles(&RuntimeToggles::from_env());
  let report = settle_document(&mut doc, &oracle, limits);

  if report.limited {
    eprintln!(
      "settle_icons: stopped after {} load events (raise ICONFALL_SETTLE_MAX_EVENTS)",
      report.load_events
    );
  }

  if args.compact {
    println!("{}", serde_json::to_string(&report)?);
  } else {
    println!("{}", serde_json::to_string_pretty(&report)?);
  }

  Ok(())
}
