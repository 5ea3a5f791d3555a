use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use itertools::Itertools;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use tokenboard_rs::config::{AppConfig, Cli};
use tokenboard_rs::engine::store::{SharedStore, TokenStore};
use tokenboard_rs::engine::types::{Chain, FilterConfig, SortConfig, SortDirection, SortKey, TokenCategory};
use tokenboard_rs::engine::view::{self, PriceDirection, TableView};
use tokenboard_rs::format::{format_number, format_percentage, format_price, short_address};
use tokenboard_rs::market_data::adapters::mock::MockTokenApi;
use tokenboard_rs::market_data::emitter::UpdateEmitter;
use tokenboard_rs::market_data::router::{Coordinator, SelectOutcome};
use tokenboard_rs::telemetry;

fn print_tabs(active: TokenCategory) {
    let tabs = TokenCategory::ALL
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if *c == active {
                format!("[{}] *{}*", i + 1, c.label())
            } else {
                format!("[{}] {}", i + 1, c.label())
            }
        })
        .join("  ");
    println!("{}", tabs);
    println!("{}", active.description());
}

fn sort_marker(view: &TableView<'_>, key: SortKey) -> &'static str {
    match view.sort {
        Some(SortConfig { key: k, direction }) if k == key => match direction {
            SortDirection::Asc => " ^",
            SortDirection::Desc => " v",
        },
        _ => "",
    }
}

// Render the current projection as a plain table
fn print_board(store: &SharedStore) {
    let store = store.read();
    let view = view::project(&store);

    println!();
    print_tabs(view.category);
    println!("{}", "-".repeat(96));

    if let Some(err) = view.error {
        println!("Error: {}", err);
    }
    if view.loading {
        println!("Loading {}...", view.category.label());
        return;
    }
    if view.rows.is_empty() {
        println!("No tokens found");
        return;
    }

    let extra_header = match view.category {
        TokenCategory::FinalStretch => format!("Bonding{}", sort_marker(&view, SortKey::BondingProgress)),
        TokenCategory::Migrated => "Migration".to_string(),
        TokenCategory::NewPairs => String::new(),
    };
    println!(
        "{:<14} {:>12} {:>10} {:>12} {:>12} {:>16} {:>10}",
        format!("Token{}", sort_marker(&view, SortKey::Symbol)),
        format!("Price{}", sort_marker(&view, SortKey::Price)),
        format!("24h %{}", sort_marker(&view, SortKey::PriceChange24h)),
        format!("MCap{}", sort_marker(&view, SortKey::MarketCap)),
        format!("Volume{}", sort_marker(&view, SortKey::Volume24h)),
        extra_header,
        format!("Holders{}", sort_marker(&view, SortKey::Holders)),
    );

    for token in &view.rows {
        let arrow = match PriceDirection::of(token) {
            PriceDirection::Up => "+",
            PriceDirection::Down => "-",
            PriceDirection::Flat => " ",
        };
        let extra = match view.category {
            TokenCategory::FinalStretch => token
                .bonding_progress()
                .map(|p| format!("{:.1}%", p))
                .unwrap_or_default(),
            TokenCategory::Migrated => token
                .migration_date()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            TokenCategory::NewPairs => String::new(),
        };
        println!(
            "{:<14} {:>11}{} {:>10} {:>12} {:>12} {:>16} {:>10}",
            token.symbol,
            format_price(token.price()),
            arrow,
            format_percentage(token.price_change_24h()),
            format_number(token.market_cap),
            format_number(token.volume_24h),
            extra,
            format_number(token.holders as f64),
        );
    }
    println!(
        "Showing {} of {} tokens · {} · {}",
        view.rows.len(),
        view.total,
        view.sort.map(|s| s.to_string()).unwrap_or_else(|| "unsorted".into()),
        describe_filter(store.filter_config()),
    );
}

fn describe_filter(filter: &FilterConfig) -> String {
    if filter.is_empty() {
        return "no filter".to_string();
    }
    let mut parts = Vec::new();
    if let Some(min) = filter.min_market_cap {
        parts.push(format!("mcap >= {}", format_number(min)));
    }
    if let Some(max) = filter.max_market_cap {
        parts.push(format!("mcap <= {}", format_number(max)));
    }
    if let Some(min) = filter.min_volume {
        parts.push(format!("volume >= {}", format_number(min)));
    }
    if let Some(min) = filter.min_liquidity {
        parts.push(format!("liquidity >= {}", format_number(min)));
    }
    if let Some(chains) = &filter.chains {
        parts.push(format!("chains {}", chains.iter().join(",")));
    }
    parts.join(", ")
}

fn export_csv(store: &SharedStore, path: &Path) -> anyhow::Result<usize> {
    let store = store.read();
    let view = view::project(&store);
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "id", "symbol", "name", "price", "previousPrice", "priceChange24h", "marketCap",
        "volume24h", "liquidity", "holders", "chain", "contractAddress", "bondingProgress",
        "migrationDate",
    ])?;
    for t in &view.rows {
        writer.write_record([
            t.id.clone(),
            t.symbol.clone(),
            t.name.clone(),
            t.price().to_string(),
            t.previous_price().to_string(),
            t.price_change_24h().to_string(),
            t.market_cap.to_string(),
            t.volume_24h.to_string(),
            t.liquidity.to_string(),
            t.holders.to_string(),
            t.chain.to_string(),
            t.contract_address.clone(),
            t.bonding_progress().map(|p| p.to_string()).unwrap_or_default(),
            t.migration_date().map(|d| d.to_rfc3339()).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(view.rows.len())
}

fn print_token(store: &SharedStore, needle: &str) {
    let store = store.read();
    let found = store
        .items()
        .iter()
        .find(|t| t.id == needle || t.symbol.eq_ignore_ascii_case(needle));
    let Some(token) = found else {
        println!("No token '{}' in the current tab", needle);
        return;
    };
    println!("{} ({}) on {}", token.name, token.symbol, token.chain);
    println!("  id:        {}", token.id);
    println!("  contract:  {}", short_address(&token.contract_address));
    println!(
        "  price:     {} (prev {}, {})",
        format_price(token.price()),
        format_price(token.previous_price()),
        format_percentage(token.price_change_24h())
    );
    println!("  liquidity: {}", format_number(token.liquidity));
    println!("  created:   {}", token.created_at.format("%Y-%m-%d %H:%M UTC"));
    if let Some(progress) = token.bonding_progress() {
        println!("  bonding:   {:.1}%", progress);
    }
    if let (Some(status), Some(date)) = (token.migration_status(), token.migration_date()) {
        println!("  migrated:  {:?} on {}", status, date.format("%Y-%m-%d"));
    }
}

fn print_outcome(category: TokenCategory, outcome: SelectOutcome) {
    match outcome {
        SelectOutcome::Fetched { count } => println!("Loaded {} {} tokens", count, category.label()),
        SelectOutcome::Cached { count } => println!("Showing {} cached {} tokens", count, category.label()),
        SelectOutcome::Superseded => println!("{} load superseded", category.label()),
        SelectOutcome::Failed => println!("Failed to load {}", category.label()),
    }
}

fn print_help() {
    println!("Available commands:");
    println!("  1, new                  - New Pairs tab");
    println!("  2, final                - Final Stretch tab");
    println!("  3, migrated             - Migrated tab");
    println!("  sort <key>              - Sort by column (same key toggles direction)");
    println!("  filter chain <SOL,ETH>  - Only show the given chains");
    println!("  filter mcap <min> [max] - Market cap bounds");
    println!("  filter volume <min>     - Minimum 24h volume");
    println!("  filter liquidity <min>  - Minimum liquidity");
    println!("  filter clear            - Remove all filters");
    println!("  top, show               - Render the board");
    println!("  watch <secs>            - Re-render every second");
    println!("  info <symbol|id>        - Token details");
    println!("  tick                    - Emit one price update now");
    println!("  refresh                 - Refetch the current tab");
    println!("  json                    - Dump the current view as JSON");
    println!("  csv <path>              - Export the current view as CSV");
    println!("  quit, q                 - Exit");
    println!("Sort keys: {}", SortKey::ALL.iter().join(", "));
}

fn apply_filter_command(store: &SharedStore, args: &[&str]) -> anyhow::Result<()> {
    let mut filter = store.read().filter_config().clone();
    match args {
        ["clear"] => filter = FilterConfig::default(),
        ["chain", list] => {
            let chains = list.split(',').map(str::parse::<Chain>).collect::<Result<Vec<_>, _>>()?;
            filter.chains = Some(chains);
        }
        ["mcap", min] => filter.min_market_cap = Some(min.parse()?),
        ["mcap", min, max] => {
            filter.min_market_cap = Some(min.parse()?);
            filter.max_market_cap = Some(max.parse()?);
        }
        ["volume", min] => filter.min_volume = Some(min.parse()?),
        ["liquidity", min] => filter.min_liquidity = Some(min.parse()?),
        _ => anyhow::bail!("usage: filter clear | chain <list> | mcap <min> [max] | volume <min> | liquidity <min>"),
    }
    store.write().set_filter_config(filter);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli(&cli);

    telemetry::init_tracing(&config.log_filter);
    telemetry::init_metrics()?;
    tracing::info!(?config, "Starting tokenboard");

    let (api, emitter) = match config.seed {
        Some(seed) => (
            MockTokenApi::with_seed(config.api.clone(), seed),
            UpdateEmitter::with_seed(config.emitter.clone(), seed.wrapping_add(1)),
        ),
        None => (MockTokenApi::new(config.api.clone()), UpdateEmitter::new(config.emitter.clone())),
    };

    let store = TokenStore::shared();
    store.write().set_sort_config(Some(SortConfig::default()));
    let coordinator = Coordinator::new(Arc::new(api), Arc::clone(&store), emitter, config.stale_time());

    let outcome = coordinator.select_category(config.initial_category).await;
    print_outcome(config.initial_category, outcome);
    print_board(&store);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    // CLI loop
    loop {
        stdout.write_all(b"\ntokenboard> ").await?;
        stdout.flush().await?;

        let Some(input) = lines.next_line().await? else { break };
        let command = input.trim().to_string();
        let parts: Vec<&str> = command.split_whitespace().collect();

        match parts.as_slice() {
            [] => continue,
            ["help" | "h"] => print_help(),
            ["1" | "new"] | ["2" | "final"] | ["3" | "migrated"] => {
                let category = match parts[0] {
                    "1" | "new" => TokenCategory::NewPairs,
                    "2" | "final" => TokenCategory::FinalStretch,
                    _ => TokenCategory::Migrated,
                };
                let outcome = coordinator.select_category(category).await;
                print_outcome(category, outcome);
                print_board(&store);
            }
            ["tab", name] => match name.parse::<TokenCategory>() {
                Ok(category) => {
                    let outcome = coordinator.select_category(category).await;
                    print_outcome(category, outcome);
                    print_board(&store);
                }
                Err(e) => println!("{}", e),
            },
            ["sort", key] => match key.parse::<SortKey>() {
                Ok(key) => {
                    let sort = coordinator.handle_sort(key);
                    println!("Sorted by {}", sort);
                    print_board(&store);
                }
                Err(e) => println!("{}", e),
            },
            ["filter", args @ ..] => match apply_filter_command(&store, args) {
                Ok(()) => print_board(&store),
                Err(e) => println!("{}", e),
            },
            ["top" | "show"] => print_board(&store),
            ["info", needle] => print_token(&store, needle),
            ["watch", secs] => match secs.parse::<u64>() {
                Ok(secs) => {
                    let mut interval = tokio::time::interval(Duration::from_secs(1));
                    for _ in 0..secs {
                        interval.tick().await;
                        print_board(&store);
                    }
                }
                Err(_) => println!("Invalid number of seconds"),
            },
            ["tick"] => match coordinator.emitter().tick() {
                Some(update) => println!("Tick {} -> {}", update.token_id, format_price(update.price)),
                None => println!("No active tokens to tick"),
            },
            ["refresh"] => {
                let category = store.read().selected_category();
                let outcome = coordinator.refresh().await;
                print_outcome(category, outcome);
                print_board(&store);
            }
            ["json"] => {
                let json = {
                    let store = store.read();
                    serde_json::to_string_pretty(&view::project(&store))?
                };
                println!("{}", json);
            }
            ["csv", path] => match export_csv(&store, Path::new(path)) {
                Ok(count) => println!("Wrote {} rows to {}", count, path),
                Err(e) => println!("Export failed: {}", e),
            },
            ["quit" | "q" | "exit"] => {
                println!("Goodbye!");
                break;
            }
            _ => println!("Unknown command. Type 'help' for available commands."),
        }
    }

    coordinator.shutdown();
    Ok(())
}
