use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stockroom::config::Config;
use stockroom::db::{Database, StoreError};
use stockroom::inventory::{Item, NewItem};
use stockroom::remote::HttpGateway;
use stockroom::session::{Applied, Session};
use stockroom::shell::{HttpNetwork, Interception, ShellCache, ShellRequest, ShellStorage};
use stockroom::store::SqliteItemStore;
use stockroom::sync::{Peer, ReconcileOutcome, Route};

#[derive(Parser, Debug)]
#[command(name = "stockroom")]
#[command(about = "Offline-first inventory and billing")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/stockroom/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Never contact the server
  #[arg(long)]
  offline: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  #[command(flatten)]
  Items(ItemCommand),
  /// Application shell cache
  Shell {
    #[command(subcommand)]
    command: ShellCommand,
  },
}

#[derive(Subcommand, Debug)]
enum ItemCommand {
  /// List stored items
  List,
  /// Add an item
  Add {
    #[arg(long)]
    name: String,
    #[arg(long)]
    price: f64,
    /// Weight in kg
    #[arg(long)]
    weight: Option<f64>,
    /// Expiry date (YYYY-MM-DD)
    #[arg(long)]
    expiry: Option<NaiveDate>,
    #[arg(long, default_value_t = 0)]
    qty: u32,
  },
  /// Change fields of an existing item
  Edit(EditArgs),
  /// Delete an item
  Remove { id: i64 },
  /// Add a sample item
  Sample,
  /// Bill items by id; repeat an id to add more than one
  Bill {
    #[arg(required = true)]
    ids: Vec<i64>,
  },
  /// Total quantity and stock value
  Report,
}

#[derive(ClapArgs, Debug)]
struct EditArgs {
  id: i64,
  #[arg(long)]
  name: Option<String>,
  #[arg(long)]
  price: Option<f64>,
  #[arg(long, conflicts_with = "clear_weight")]
  weight: Option<f64>,
  /// Remove the stored weight
  #[arg(long)]
  clear_weight: bool,
  #[arg(long, conflicts_with = "clear_expiry")]
  expiry: Option<NaiveDate>,
  /// Remove the stored expiry date
  #[arg(long)]
  clear_expiry: bool,
  #[arg(long)]
  qty: Option<u32>,
}

impl EditArgs {
  /// Overlay the given fields on `current`; anything not given is kept.
  fn apply(self, current: Item) -> Item {
    Item {
      id: current.id,
      name: self.name.map(|n| n.trim().to_string()).unwrap_or(current.name),
      weight: if self.clear_weight {
        None
      } else {
        self.weight.or(current.weight)
      },
      price: self.price.unwrap_or(current.price),
      expiry: if self.clear_expiry {
        None
      } else {
        self.expiry.or(current.expiry)
      },
      qty: self.qty.unwrap_or(current.qty),
    }
  }
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
  /// Fetch the asset manifest into the current cache and activate it
  Install,
  /// Request a path through the cache
  Fetch { path: String },
  /// List cache generations
  Caches,
}

/// Initialize the tracing subscriber, logging to a file so command output
/// stays clean. Use RUST_LOG to control the level (e.g., RUST_LOG=debug).
fn init_tracing(log_dir: &Path) -> WorkerGuard {
  let appender = tracing_appender::rolling::never(log_dir, "stockroom.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .with(filter)
    .init();

  guard
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let db_path = config.database_path()?;
  let log_dir = db_path
    .parent()
    .map(Path::to_path_buf)
    .unwrap_or_else(|| PathBuf::from("."));
  std::fs::create_dir_all(&log_dir)?;
  let _guard = init_tracing(&log_dir);
  info!(db = %db_path.display(), "stockroom starting");

  let db = Database::open(&db_path)?;
  let result = match args.command {
    Command::Shell { command } => run_shell(&config, db.clone(), command).await,
    Command::Items(command) => run_items(&config, db.clone(), args.offline, command).await,
  };

  let closed = db.close();
  finish(result, closed)
}

/// The command's own error wins over a failure to close the database.
fn finish(result: Result<()>, closed: Result<(), StoreError>) -> Result<()> {
  result?;
  closed?;
  Ok(())
}

async fn run_items(
  config: &Config,
  db: Database,
  offline: bool,
  command: ItemCommand,
) -> Result<()> {
  let peer = match (&config.remote, offline) {
    (Some(remote), false) => Peer::new(HttpGateway::new(&remote.url, remote.timeout())?),
    _ => Peer::local_only(),
  };

  let store = SqliteItemStore::new(db);
  let (mut session, outcome) = Session::start(store, peer, config.billing.tax_rate).await?;
  match outcome {
    ReconcileOutcome::Offline => {}
    ReconcileOutcome::Replaced { count } => eprintln!("Synced {} items from server", count),
    ReconcileOutcome::Aborted(e) => eprintln!("Sync skipped: {}", e),
  }

  match command {
    ItemCommand::List => print_items(&session.items().await?),
    ItemCommand::Add {
      name,
      price,
      weight,
      expiry,
      qty,
    } => {
      let draft = NewItem {
        name: name.trim().to_string(),
        weight,
        price,
        expiry,
        qty,
      };
      report_write(session.create(draft).await?);
    }
    ItemCommand::Edit(edit) => {
      let current = session.item(edit.id).await?;
      report_write(session.update(edit.apply(current)).await?);
    }
    ItemCommand::Remove { id } => report_write(session.delete(id).await?),
    ItemCommand::Sample => report_write(session.add_sample().await?),
    ItemCommand::Bill { ids } => {
      for id in ids {
        session.add_to_cart(id).await?;
      }
      for line in session.cart().lines() {
        println!(
          "{:<24} {:>4} x {:>10.2} = {:>10.2}",
          line.name,
          line.qty,
          line.price,
          line.total()
        );
      }
      let totals = session.totals();
      println!("{:<24} {:>31.2}", "Subtotal", totals.subtotal);
      println!("{:<24} {:>31.2}", "Tax", totals.tax);
      println!("{:<24} {:>31.2}", "Total", totals.grand_total);
    }
    ItemCommand::Report => {
      let report = session.report().await?;
      println!("Total quantity: {}", report.total_qty);
      println!("Total value:    {:.2}", report.total_value);
    }
  }

  Ok(())
}

fn report_write<T>(applied: Applied<T>) {
  match &applied.route {
    Route::Remote => eprintln!("Saved to server"),
    Route::LocalFallback(e) => eprintln!("Server failed ({}); saved locally", e),
    Route::LocalOnly => eprintln!("Saved locally"),
  }
  print_items(&applied.items);
}

fn print_items(items: &[Item]) {
  if items.is_empty() {
    println!("No items");
    return;
  }
  println!(
    "{:>6}  {:<24} {:>8} {:>10} {:>6}  {}",
    "ID", "NAME", "WEIGHT", "PRICE", "QTY", "EXPIRY"
  );
  for item in items {
    let weight = item.weight.map(|w| format!("{} kg", w)).unwrap_or_default();
    let expiry = item.expiry.map(|d| d.to_string()).unwrap_or_default();
    println!(
      "{:>6}  {:<24} {:>8} {:>10.2} {:>6}  {}",
      item.id, item.name, weight, item.price, item.qty, expiry
    );
  }
}

async fn run_shell(config: &Config, db: Database, command: ShellCommand) -> Result<()> {
  let mut cache = ShellCache::new(
    config.shell.manifest.clone(),
    config.shell.origin_url()?,
    ShellStorage::new(db),
    HttpNetwork::new(),
  );

  match command {
    ShellCommand::Install => {
      let count = cache.install().await?;
      let evicted = cache.activate().await?;
      println!("Cached {} assets in {}", count, cache.cache_name());
      for name in evicted {
        println!("Evicted {}", name);
      }
    }
    ShellCommand::Fetch { path } => {
      if !cache.resume().await? {
        return Err(eyre!(
          "Shell cache {} is not installed; run `stockroom shell install`",
          cache.cache_name()
        ));
      }
      let request = ShellRequest::get(cache.resolve(&path)?);
      match cache.handle(&request).await? {
        Interception::Respond { response, source } => {
          eprintln!("{} ({:?})", response.status, source);
          println!("{}", String::from_utf8_lossy(&response.body));
        }
        Interception::Passthrough => eprintln!("{} is not handled by the shell cache", request.url),
      }
    }
    ShellCommand::Caches => {
      for generation in cache.storage().generations().await? {
        let marker = if generation.name == cache.cache_name() { "*" } else { " " };
        println!(
          "{} {:<24} {:>4} entries  {}",
          marker, generation.name, generation.entries, generation.created_at
        );
      }
    }
  }

  Ok(())
}
