use std::io::{self, Write};

use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand};
use log::warn;
use serde::Serialize;
use serde_json::Value;

use bonusdrive::client::{BonusdriveClient, Credentials};
use bonusdrive::config::{self, AppConfig};
use bonusdrive::errors::BonusdriveError;
use bonusdrive::print::{print_badge, print_score_entry, print_separator, print_trip};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Print raw JSON payloads instead of formatted output
    #[arg(short, long, global = true)]
    raw: bool,

    /// Resolve trip start and end coordinates to place names
    #[arg(short, long, global = true)]
    geo_lookup: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the most recent trip
    LastTrip,
    /// List the most recent trips
    Trips {
        #[arg(short, long, default_value_t = 8)]
        amount: usize,
    },
    /// List daily badges
    BadgesDaily {
        #[arg(short, long)]
        start_date: Option<NaiveDate>,

        #[arg(short, long)]
        end_date: Option<NaiveDate>,
    },
    /// List monthly badges
    BadgesMonthly {
        #[arg(short, long)]
        start_date: Option<NaiveDate>,

        #[arg(short, long)]
        end_date: Option<NaiveDate>,
    },
    /// List per-day driving scores
    Scores {
        #[arg(short, long)]
        start_date: Option<NaiveDate>,

        #[arg(short, long)]
        end_date: Option<NaiveDate>,
    },
    /// Show the fully expanded record of one trip
    Details {
        #[arg(short, long)]
        trip_id: Option<String>,
    },
}

fn run(args: &Args) -> Result<(), BonusdriveError> {
    let mut app_config = AppConfig::from_local_file().unwrap_or_default();
    app_config.apply_env_overrides();

    // Credentials are only needed when no ticket-granting ticket survives
    // from an earlier run, or when the service stops accepting it.
    let credentials = match config::credentials_from_env() {
        Some(credentials) => Some(credentials),
        None if app_config.tgt.is_none() => Some(prompt_credentials()),
        None => None,
    };

    let mut client = BonusdriveClient::new(
        &app_config.base_url,
        credentials,
        app_config.tgt.clone(),
        app_config.photon_url.as_deref(),
    )?;
    client.authenticate()?;

    let ticket = client
        .session()
        .ticket_granting_ticket()
        .map(str::to_string);
    if ticket != app_config.tgt {
        app_config.tgt = ticket;
        if let Err(error) = app_config.save() {
            warn!("Could not save config file: {error}");
        }
    }

    match &args.command {
        Commands::LastTrip => last_trip(&mut client, args),
        Commands::Trips { amount } => trips(&mut client, args, *amount),
        Commands::BadgesDaily {
            start_date,
            end_date,
        } => badges(&mut client, args, "daily", *start_date, *end_date),
        Commands::BadgesMonthly {
            start_date,
            end_date,
        } => badges(&mut client, args, "monthly", *start_date, *end_date),
        Commands::Scores {
            start_date,
            end_date,
        } => scores(&mut client, args, *start_date, *end_date),
        Commands::Details { trip_id } => details(&mut client, args, trip_id.as_deref()),
    }
}

fn last_trip(client: &mut BonusdriveClient, args: &Args) -> Result<(), BonusdriveError> {
    if args.raw {
        let payload = if args.geo_lookup {
            client.trip_details_raw(None)?
        } else {
            let mut envelope = client
                .list_trips_raw(1, 0)?
                .into_iter()
                .next()
                .ok_or(BonusdriveError::NoTrips)?;
            let trip = envelope.get_mut("trip").map(Value::take);
            trip.unwrap_or(envelope)
        };
        print_json(&payload);
        return Ok(());
    }
    let trip = if args.geo_lookup {
        client.trip_details(None)?
    } else {
        client
            .list_trips(1, 0)?
            .into_iter()
            .next()
            .ok_or(BonusdriveError::NoTrips)?
    };
    print_trip(&trip);
    Ok(())
}

fn trips(
    client: &mut BonusdriveClient,
    args: &Args,
    amount: usize,
) -> Result<(), BonusdriveError> {
    if args.raw {
        let trips = client.list_trips_raw(amount, 0)?;
        if args.geo_lookup {
            for envelope in &trips {
                let Some(trip_id) = envelope.pointer("/trip/tripId").and_then(Value::as_str)
                else {
                    continue;
                };
                let details = client.trip_details_raw(Some(trip_id))?;
                print_json(&details);
                print_separator();
            }
        } else {
            print_json(&trips);
        }
        return Ok(());
    }
    for trip in client.list_trips(amount, 0)? {
        let trip = if args.geo_lookup {
            client.trip_details(Some(&trip.trip_id))?
        } else {
            trip
        };
        print_trip(&trip);
        print_separator();
    }
    Ok(())
}

fn badges(
    client: &mut BonusdriveClient,
    args: &Args,
    period: &str,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<(), BonusdriveError> {
    let (start_date, end_date) = resolve_date_range(start_date, end_date);
    if args.raw {
        let badges = client.list_badges_raw(period, &start_date, &end_date)?;
        print_json(&badges);
        return Ok(());
    }
    for badge in client.list_badges(period, &start_date, &end_date)? {
        print_badge(&badge);
        print_separator();
    }
    Ok(())
}

fn scores(
    client: &mut BonusdriveClient,
    args: &Args,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<(), BonusdriveError> {
    let (start_date, end_date) = resolve_date_range(start_date, end_date);
    if args.raw {
        let entries = client.list_scores_raw(&start_date, &end_date)?;
        print_json(&entries);
        return Ok(());
    }
    for entry in client.list_scores(&start_date, &end_date)? {
        print_score_entry(&entry);
    }
    Ok(())
}

fn details(
    client: &mut BonusdriveClient,
    args: &Args,
    trip_id: Option<&str>,
) -> Result<(), BonusdriveError> {
    if args.raw {
        let payload = client.trip_details_raw(trip_id)?;
        print_json(&payload);
        return Ok(());
    }
    let trip = client.trip_details(trip_id)?;
    print_trip(&trip);
    Ok(())
}

fn resolve_date_range(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> (String, String) {
    let today = Local::now().date_naive();
    let start = start_date.unwrap_or_else(|| today - Duration::days(30));
    let end = end_date.unwrap_or(today);
    (
        start.format("%Y-%m-%d").to_string(),
        end.format("%Y-%m-%d").to_string(),
    )
}

fn print_json(payload: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).expect("Could not serialize payload")
    );
}

fn prompt_credentials() -> Credentials {
    let email = prompt("Enter your email: ");
    let password = prompt("Enter your password: ");
    Credentials { email, password }
}

fn prompt(message: &str) -> String {
    print!("{message}");
    io::stdout().flush().expect("Could not flush stdout");
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .expect("Could not read from stdin");
    line.trim().to_string()
}

fn main() {
    let args = Args::parse();

    let mut log_builder = colog::default_builder();
    if args.verbose {
        log_builder.filter_level(log::LevelFilter::Debug);
    }
    log_builder.init();

    if let Err(error) = run(&args) {
        eprintln!("{error}");
        std::process::exit(1);
    }
}
