//! Bazaar CLI - shop, check out and run a seller dashboard from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (the session is saved to BAZAAR_STATE_PATH)
//! bz login -e buyer@example.com -p secret1
//!
//! # Browse and fill the cart
//! bz products list --search lamp --sort price-asc
//! bz cart add 66f1c0ffee --quantity 2
//!
//! # Place the order
//! bz checkout --name "Rumi Ahmed" --phone +8801712345678 --address "12 Lake Rd" --city Dhaka
//!
//! # Seller tools
//! bz orders shop
//! bz orders status 66f1d00d shipped
//! bz dashboard
//! ```
//!
//! # Environment Variables
//!
//! See [`bazaar_client::ClientConfig`]. `RUST_LOG` controls log verbosity.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bazaar_client::ClientConfig;

mod commands;

use commands::{
    CartAction, ChatAction, CliError, Context, CouponAction, OrdersAction, ProductsAction,
    WishlistAction,
};

#[derive(Parser)]
#[command(name = "bz")]
#[command(author, version, about = "Bazaar storefront and seller CLI")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Sign out and forget the saved session
    Logout,
    /// Create an account
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        /// Register as a seller with this shop name
        #[arg(long, requires = "phone")]
        shop: Option<String>,
        /// Seller contact phone
        #[arg(long)]
        phone: Option<String>,
    },
    /// Show the signed-in user
    Whoami,
    /// Browse the catalogue
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for everything in the cart
    Checkout(commands::CheckoutArgs),
    /// Track orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Manage and apply coupons
    Coupons {
        #[command(subcommand)]
        action: CouponAction,
    },
    /// Talk to buyers and sellers
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },
    /// Seller dashboard numbers
    Dashboard,
}

/// Initialize Sentry error tracking and return the guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bz=warn,bazaar_client=warn".into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .with(sentry_tracing::layer().event_filter(sentry_event_filter))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(sentry_tracing::layer().event_filter(sentry_event_filter))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(cli.json_logs);
            commands::render::failure(&e.to_string());
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber.
    let _sentry_guard = init_sentry(&config);
    init_tracing(cli.json_logs);

    if let Err(e) = run(cli.command, &config).await {
        if e.is_unexpected() {
            tracing::error!(error = %e, "Command failed");
        }
        commands::render::failure(&e.user_message());
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &ClientConfig) -> Result<(), CliError> {
    let mut ctx = Context::open(config).await?;

    match command {
        Commands::Login { email, password } => commands::auth::login(&mut ctx, email, password).await,
        Commands::Logout => commands::auth::logout(&mut ctx).await,
        Commands::Register {
            name,
            email,
            password,
            shop,
            phone,
        } => commands::auth::register(&mut ctx, name, email, password, shop, phone).await,
        Commands::Whoami => commands::auth::whoami(&mut ctx).await,
        Commands::Products { action } => commands::catalog::run(&mut ctx, action).await,
        Commands::Cart { action } => commands::cart::run(&mut ctx, action).await,
        Commands::Checkout(args) => commands::cart::checkout(&mut ctx, args).await,
        Commands::Orders { action } => commands::orders::run(&mut ctx, action).await,
        Commands::Wishlist { action } => commands::wishlist::run(&mut ctx, action).await,
        Commands::Coupons { action } => commands::coupons::run(&mut ctx, action).await,
        Commands::Chat { action } => commands::chat::run(&mut ctx, action).await,
        Commands::Dashboard => commands::orders::dashboard(&mut ctx).await,
    }
}
