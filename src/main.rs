use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use monitora_vagas::config::{
    ENV_API_URL, ENV_USE_PRODUCTION_API, DEFAULT_GUESTS, DEFAULT_WEEKENDS,
};
use monitora_vagas::criteria::parse_iso_date;
use monitora_vagas::holiday::{self, HolidayNotice};
use monitora_vagas::{
    AppConfig, BuscaVagasClient, GuestCount, HotelListCache, SearchSession, SessionError,
    VacancyApi,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "monitora-vagas")]
#[command(about = "Search hotel vacancies through the busca_vagas API")]
#[command(version)]
struct Cli {
    /// API base URL (overrides the environment default)
    #[arg(long, global = true, env = ENV_API_URL)]
    api_url: Option<String>,

    /// Use the production API regardless of environment
    #[arg(long, global = true, env = ENV_USE_PRODUCTION_API)]
    production: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List hotels (cached for 24h)
    Hotels {
        /// Ignore the local cache
        #[arg(long)]
        refresh: bool,

        /// Scrape the upstream site instead of the API list
        #[arg(long)]
        scrape: bool,
    },

    /// Check API health
    Health,

    /// Search vacancies for a date range
    Search {
        /// Hotel id, "-1" for all hotels
        #[arg(long, default_value = "-1")]
        hotel: String,

        /// Check-in date (YYYY-MM-DD)
        #[arg(long)]
        checkin: String,

        /// Check-out date (YYYY-MM-DD)
        #[arg(long)]
        checkout: String,

        /// Guests; hides rooms that cannot fit them
        #[arg(long, default_value_t = DEFAULT_GUESTS)]
        guests: u32,

        /// Ask the API to skip booking rule validation
        #[arg(long)]
        no_booking_rules: bool,

        /// Results page to print
        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// Search the next N weekends
    Weekends {
        #[arg(long, default_value_t = DEFAULT_WEEKENDS)]
        count: u32,
    },

    /// Check a date range against the holiday packages
    Package {
        #[arg(long)]
        checkin: String,

        #[arg(long)]
        checkout: String,
    },

    /// Show or clear the local caches
    Cache {
        #[arg(long)]
        clear: bool,
    },
}

fn hotel_cache_path() -> std::path::PathBuf {
    std::env::temp_dir().join("monitora-vagas-hotels.json")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let env_config = AppConfig::from_env().context("invalid environment configuration")?;
    let config = AppConfig::resolve(env_config.environment, cli.api_url.as_deref(), cli.production)
        .context("invalid API configuration")?;
    info!(environment = ?config.environment, api = %config.api_base_url, "configuration loaded");

    let hotel_cache = HotelListCache::persistent(config.cache.hotel_list_ttl, hotel_cache_path());
    let client = Arc::new(
        BuscaVagasClient::new(config)
            .context("failed to create API client")?
            .with_hotel_cache(hotel_cache),
    );

    match cli.command {
        Command::Hotels { refresh, scrape } => {
            let hotels = if scrape {
                client.scrape_hotels().await?
            } else {
                client.get_hotels(refresh).await?
            };
            for hotel in &hotels {
                println!("{:>12}  {}", hotel.hotel_id, hotel.name);
            }
        }

        Command::Health => {
            let health = client.check_health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }

        Command::Search {
            hotel,
            checkin,
            checkout,
            guests,
            no_booking_rules,
            page,
        } => {
            let mut session = SearchSession::new(Arc::clone(&client));
            if let Err(e) = session.load_hotels(false).await {
                info!(error = %e, "hotel list unavailable, using raw ids");
            }
            session.select_hotel(&hotel)?;
            session.set_check_in(Some(parse_iso_date(&checkin)?))?;
            let notice = session.set_check_out(Some(parse_iso_date(&checkout)?))?;
            print_notice(notice);
            session.set_apply_booking_rules(!no_booking_rules)?;

            match session.submit().await {
                Ok(_) | Err(SessionError::Search(_)) => {}
                Err(e) => return Err(e.into()),
            }

            // The guest filter only moves one step at a time
            let target = GuestCount::new(guests);
            while session.criteria().guests < target {
                session.increment_guests();
            }
            while session.criteria().guests > target {
                session.decrement_guests();
            }

            let Some(view) = session.results() else {
                bail!("search produced no results");
            };
            println!("{}", view.summary.line());
            if let Some(banner) = &view.banner {
                println!("{} {} - {}", banner.icon, banner.title, banner.description);
            }
            if let Some(stats) = session.filter_stats() {
                if let Some(counter) = stats.counter_text() {
                    println!("{}", counter);
                }
                if let Some(message) = stats.no_results_message() {
                    println!("{}", message);
                }
            }

            if let Some(page) = session.page(page) {
                if view.cards().is_empty() {
                    println!("{}", view.to_plain_text());
                }
                for card in &page.cards {
                    println!("\n🏨 {} ({})", card.hotel_name, card.badge());
                    for (i, vacancy) in card.visible_vacancies().enumerate() {
                        println!("  {}. {}", i + 1, vacancy.text);
                    }
                }
                if page.total_pages > 1 {
                    println!("\nPágina {} de {}", page.number, page.total_pages);
                }
            }
        }

        Command::Weekends { count } => {
            let data = client.search_weekends(count).await?;
            for weekend in &data.weekend_results {
                let status = if weekend.vacancies.has_availability {
                    "✅ com vagas"
                } else {
                    "sem vagas"
                };
                println!("Fim de semana {}: {} - {}", weekend.weekend_number, weekend.dates, status);
                for (hotel, entries) in weekend.vacancies.result.grouped_vacancies() {
                    println!("  🏨 {} ({})", hotel, entries.len());
                }
            }
            println!(
                "{} de {} fins de semana com vagas",
                data.weekends_with_vacancies(),
                data.weekend_results.len()
            );
        }

        Command::Package { checkin, checkout } => {
            let notice = holiday::evaluate(parse_iso_date(&checkin)?, parse_iso_date(&checkout)?);
            if notice == HolidayNotice::None {
                println!("Fora dos períodos de pacote");
            } else {
                print_notice(&notice);
            }
        }

        Command::Cache { clear } => {
            if clear {
                client.clear_cache();
            }
            println!("{}", serde_json::to_string_pretty(&client.cache_stats())?);
        }
    }

    let stats = client.stats();
    info!(
        sent = stats.requests_sent,
        succeeded = stats.requests_succeeded,
        failed = stats.requests_failed,
        retried = stats.requests_retried,
        timeouts = stats.requests_timeout,
        cache_hits = stats.cache_hits,
        avg_ms = stats.average_response_time_ms,
        "request stats"
    );

    Ok(())
}

fn print_notice(notice: &HolidayNotice) {
    if let Some(message) = notice.message() {
        println!("{}", message);
    }
}
