use restaurant_dashboard::catalog::{CardKey, ClickResult, Grid};
use restaurant_dashboard::clicks::TokioTimer;
use restaurant_dashboard::dashboard::{DashboardSection, FeedbackOutcome};
use restaurant_dashboard::ui::{TerminalSurface, render_catalog, render_dashboard};
use restaurant_dashboard::{CatalogController, Config, DashboardController, HttpBackend};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const HELP: &str = "\
commands:
  names                      list known restaurants
  search <name>              load a restaurant dashboard
  open <url or ?query>       open a dashboard link, e.g. ?restaurant=OR2K
  review <text>              set the feedback review text
  rate <1-5|none>            set the feedback rating
  submit                     submit feedback for the shown restaurant
  go <similar|foryou> <n>    open a card from the dashboard lists
  catalog                    load every catalog grid
  location <name>            load one location grid
  similar <name>             load the similar grid
  click <grid> <n>           click a catalog card (grid: all, top, similar, loc:<name>)
  dblclick <grid> <n>        double-click a catalog card
  images                     probe card images now
  help | quit";

struct App {
    config: Config,
    dashboard: DashboardController<HttpBackend, TerminalSurface>,
    catalog: CatalogController<HttpBackend, TokioTimer>,
}

impl App {
    /// Runs one command. Returns false when the session should end.
    async fn handle(&mut self, line: &str) -> bool {
        let line = line.trim();
        let (command, rest) = line
            .split_once(char::is_whitespace)
            .map(|(command, rest)| (command, rest.trim()))
            .unwrap_or((line, ""));

        match command {
            "" => {}
            "quit" | "exit" => return false,
            "help" => println!("{HELP}"),
            "names" => {
                self.dashboard.load("").await;
                for name in self.dashboard.view().await.restaurant_names {
                    println!("{name}");
                }
            }
            "search" => {
                self.dashboard.search(rest).await;
                self.show_dashboard().await;
            }
            "open" => self.navigate(rest).await,
            "review" => self.dashboard.set_review(rest).await,
            "rate" => match parse_rating(rest) {
                Ok(rating) => self.dashboard.set_rating(rating).await,
                Err(message) => println!("{message}"),
            },
            "submit" => {
                if let FeedbackOutcome::Rejected(message) = self.dashboard.submit_feedback().await {
                    info!("feedback not sent: {message}");
                }
                self.show_dashboard().await;
            }
            "go" => self.open_dashboard_card(rest).await,
            "catalog" => {
                let locations = self.config.locations.clone();
                self.catalog.load_page(&locations).await;
                self.show_catalog().await;
            }
            "location" => {
                self.catalog.load_location(rest).await;
                self.show_catalog().await;
            }
            "similar" => {
                self.catalog.load_similar(rest).await;
                self.show_catalog().await;
            }
            "click" => self.click(rest, 1).await,
            "dblclick" => self.click(rest, 2).await,
            "images" => {
                let fixed = self.dashboard.resolve_images().await + self.catalog.resolve_images().await;
                println!("{fixed} image(s) fell back to the default");
            }
            other => println!("unknown command {other:?}, try help"),
        }
        true
    }

    async fn click(&mut self, args: &str, times: usize) {
        let key = match parse_card_key(args) {
            Ok(key) => key,
            Err(message) => {
                println!("{message}");
                return;
            }
        };
        for _ in 0..times {
            match self.catalog.click(key.clone()) {
                ClickResult::Pending(_) => {}
                ClickResult::Navigate(target) => {
                    self.navigate(&target).await;
                    return;
                }
                ClickResult::Ignored => {
                    println!("no card {} in {}", key.index, key.grid);
                    return;
                }
            }
        }
    }

    async fn open_dashboard_card(&mut self, args: &str) {
        let Some((section, index)) = args.rsplit_once(char::is_whitespace) else {
            println!("usage: go <similar|foryou> <n>");
            return;
        };
        let section = match section.trim() {
            "similar" => DashboardSection::Similar,
            "foryou" => DashboardSection::ForYou,
            other => {
                println!("unknown list {other:?}");
                return;
            }
        };
        let Ok(index) = index.parse() else {
            println!("invalid card number {index:?}");
            return;
        };
        match self.dashboard.open_card(section, index).await {
            Some(target) => self.navigate(&target).await,
            None => println!("no card {index} in that list"),
        }
    }

    async fn navigate(&mut self, target: &str) {
        println!("-> {target}");
        self.dashboard.load(target).await;
        self.show_dashboard().await;
    }

    async fn show_dashboard(&self) {
        if self.config.probe_images {
            self.dashboard.resolve_images().await;
        }
        let view = self.dashboard.view().await;
        let text = self
            .dashboard
            .with_charts(|charts| render_dashboard(&view, charts.surface()))
            .await;
        print!("{text}");
    }

    async fn show_catalog(&mut self) {
        if self.config.probe_images {
            self.catalog.resolve_images().await;
        }
        print!("{}", render_catalog(self.catalog.view()));
    }
}

fn parse_rating(raw: &str) -> Result<Option<u8>, String> {
    match raw {
        "" | "none" => Ok(None),
        raw => match raw.parse::<u8>() {
            Ok(rating) if (1..=5).contains(&rating) => Ok(Some(rating)),
            _ => Err(format!("rating must be 1-5 or none, got {raw:?}")),
        },
    }
}

fn parse_card_key(raw: &str) -> Result<CardKey, String> {
    let (grid, index) = raw
        .rsplit_once(char::is_whitespace)
        .ok_or_else(|| "usage: click <grid> <n>".to_string())?;
    let grid: Grid = grid.parse().map_err(|err| format!("{err}"))?;
    let index = index
        .parse()
        .map_err(|_| format!("invalid card number {index:?}"))?;
    Ok(CardKey::new(grid, index))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let backend = HttpBackend::new(&config.api_url, config.request_timeout)?;
    let (timer, mut fired) = TokioTimer::new();

    let mut app = App {
        dashboard: DashboardController::new(backend.clone(), TerminalSurface::new()),
        catalog: CatalogController::new(backend, timer, config.click_delay),
        config,
    };
    info!(api = %app.config.api_url, "dashboard ready, type help for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !app.handle(&line).await {
                    break;
                }
            }
            Some(handle) = fired.recv() => {
                app.catalog.timer_mut().acknowledge(handle);
                if app.catalog.on_timer(handle).await.is_some() {
                    app.show_catalog().await;
                }
            }
            result = &mut shutdown => {
                if let Err(err) = result {
                    warn!("failed to listen for ctrl-c: {err}");
                }
                break;
            }
        }
    }

    info!("bye");
    Ok(())
}
