//! cachewire CLI Client
//!
//! Command-line interface for talking to a cache server.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use cachewire::{Client, ClientConfig, Value};

/// cachewire CLI
#[derive(Parser, Debug)]
#[command(name = "cachewire-cli")]
#[command(about = "CLI for memcached-compatible cache servers")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(long, default_value = "11211")]
    port: String,

    /// Connect timeout in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key to a value
    Set {
        /// The key to set
        key: String,

        /// The value to store
        value: String,

        /// Expiration in seconds (0 = never)
        #[arg(long, default_value_t = 0)]
        expiration: u32,

        /// CAS token from an earlier get (0 = unconditional)
        #[arg(long, default_value_t = 0)]
        cas: u64,
    },

    /// Store a value only if the key does not exist
    Add {
        /// The key to add
        key: String,

        /// The value to store
        value: String,

        /// Expiration in seconds (0 = never)
        #[arg(long, default_value_t = 0)]
        expiration: u32,
    },

    /// Store a value only if the key already exists
    Replace {
        /// The key to replace
        key: String,

        /// The value to store
        value: String,

        /// Expiration in seconds (0 = never)
        #[arg(long, default_value_t = 0)]
        expiration: u32,

        /// CAS token from an earlier get (0 = unconditional)
        #[arg(long, default_value_t = 0)]
        cas: u64,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,

        /// CAS token from an earlier get (0 = unconditional)
        #[arg(long, default_value_t = 0)]
        cas: u64,
    },

    /// Increment a counter
    Incr {
        /// The counter key
        key: String,

        /// Amount to add
        #[arg(long, default_value_t = 1)]
        delta: u64,

        /// Starting value when the key is absent
        #[arg(long, default_value_t = 0)]
        initial: u64,

        /// Expiration in seconds (0 = never)
        #[arg(long, default_value_t = 0)]
        expiration: u32,
    },

    /// Decrement a counter (stops at zero)
    Decr {
        /// The counter key
        key: String,

        /// Amount to subtract
        #[arg(long, default_value_t = 1)]
        delta: u64,

        /// Starting value when the key is absent
        #[arg(long, default_value_t = 0)]
        initial: u64,

        /// Expiration in seconds (0 = never)
        #[arg(long, default_value_t = 0)]
        expiration: u32,
    },

    /// Invalidate every key on the server
    Flush {
        /// Seconds until the flush takes effect
        #[arg(long, default_value_t = 0)]
        delay: u32,
    },

    /// Show server statistics
    Stats {
        /// Optional statistics group (e.g. "items")
        key: Option<String>,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> cachewire::Result<()> {
    let config = ClientConfig::builder()
        .host(args.host)
        .port(args.port)
        .timeout_ms(args.timeout_ms)
        .build();
    let mut client = Client::open(config)?;

    match args.command {
        Commands::Get { key } => match client.get(key.as_bytes())? {
            Some((value, cas)) => println!("{} (cas {})", render(&value), cas),
            None => println!("(not found)"),
        },

        Commands::Set {
            key,
            value,
            expiration,
            cas,
        } => {
            let value = parse_value(&value);
            match client.set(key.as_bytes(), Some(&value), expiration, cas)? {
                Some(cas) => println!("stored (cas {})", cas),
                None => println!("(not stored)"),
            }
        }

        Commands::Add {
            key,
            value,
            expiration,
        } => {
            let value = parse_value(&value);
            match client.add(key.as_bytes(), &value, expiration, 0)? {
                Some(cas) => println!("stored (cas {})", cas),
                None => println!("(not stored)"),
            }
        }

        Commands::Replace {
            key,
            value,
            expiration,
            cas,
        } => {
            let value = parse_value(&value);
            match client.replace(key.as_bytes(), &value, expiration, cas)? {
                Some(cas) => println!("stored (cas {})", cas),
                None => println!("(not stored)"),
            }
        }

        Commands::Del { key, cas } => match client.set(key.as_bytes(), None, 0, cas)? {
            Some(_) => println!("deleted"),
            None => println!("(not found)"),
        },

        Commands::Incr {
            key,
            delta,
            initial,
            expiration,
        } => match client.increment(key.as_bytes(), delta, initial, expiration)? {
            Some(count) => println!("{}", count),
            None => println!("(not a counter)"),
        },

        Commands::Decr {
            key,
            delta,
            initial,
            expiration,
        } => match client.decrement(key.as_bytes(), delta, initial, expiration)? {
            Some(count) => println!("{}", count),
            None => println!("(not a counter)"),
        },

        Commands::Flush { delay } => {
            client.flush(delay)?;
            println!("flushed");
        }

        Commands::Stats { key } => {
            let stats = client.stats(key.as_deref().map(str::as_bytes))?;
            let mut names: Vec<_> = stats.keys().collect();
            names.sort();
            for name in names {
                println!("{}: {}", name, stats[name]);
            }
        }
    }

    client.close();
    Ok(())
}

/// Interpret a command-line value: an integer, float or boolean when
/// it parses as one, a string otherwise.
fn parse_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Int(n);
    }
    if let Ok(x) = raw.parse::<f64>() {
        return Value::Float(x);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::from(raw),
    }
}

/// Print scalars bare; tables fall back to their identity form.
fn render(value: &Value) -> String {
    match value {
        Value::Str(s) => String::from_utf8_lossy(s).into_owned(),
        Value::Int(n) => n.to_string(),
        Value::Float(x) => x.to_string(),
        Value::Bool(b) => b.to_string(),
        other => format!("{:?}", other),
    }
}
