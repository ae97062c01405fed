//! Bazaar CLI
//!
//! Command-line client for the marketplace:
//! - Browse products and vendors
//! - Manage the cart and place orders
//! - Book vendor time slots
//! - Sign in, chat with vendors

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bazaar::api::dto::{AddToCartRequest, VendorQuery};
use bazaar::api::Rejection;
use bazaar::auth::{FederatedIdentity, LoginForm, OtpFlow, Session, SessionStore, SignupForm};
use bazaar::booking::{remember_vendor, BookingDraft, SelectedVendor, SlotGrid};
use bazaar::cart::Cart;
use bazaar::catalog::{product_listing, rating_summary, Listing, ProductFilter, SortOrder, VendorFilter};
use bazaar::chat::{inbox, ChatSession, DeliveryStatus, LiveChannel, SeenEntries};
use bazaar::checkout::{build_order, place_order, CheckoutForm, SubmitLatch};
use bazaar::geo::{Coordinates, GeocodingClient};
use bazaar::models::{Address, PaymentMethod, ReviewTarget};
use bazaar::storage::{RecentlyViewed, SqliteStore, TypedStore, ViewedFlags};
use bazaar::validation::summarize;
use bazaar::{generate_default_config, Config, MarketplaceClient};

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Marketplace client: shop, book services, chat with vendors")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/bazaar/config.toml or ./config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend API URL (overrides config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search products
    Products {
        /// Free-text search
        #[arg(short, long)]
        query: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long)]
        max_price: Option<f64>,
        /// Hide out-of-stock products
        #[arg(long)]
        in_stock: bool,
        /// relevance, price_asc, price_desc, rating
        #[arg(long, default_value = "relevance")]
        sort: String,
    },

    /// Show a product and its reviews
    Product { id: String },

    /// List vendors
    Vendors {
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long)]
        city: Option<String>,
    },

    /// Show a vendor's time slots for a date (YYYY-MM-DD)
    Slots { vendor: String, date: NaiveDate },

    /// Book a vendor time slot
    Book {
        vendor: String,
        date: NaiveDate,
        /// Slot start, HH:MM
        time: String,
        #[arg(long)]
        service: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },

    /// Place an order for everything in the cart
    Checkout(CheckoutArgs),

    /// Sign in
    Login {
        #[command(subcommand)]
        method: LoginMethod,
    },

    /// Create an account (requires an emailed code)
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        phone: Option<String>,
        /// Code from `bazaar login otp-request`
        #[arg(long)]
        otp: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List conversations
    Inbox,

    /// Open a conversation
    Chat {
        /// The other participant's id
        counterpart: String,
        /// Send a message
        #[arg(short, long)]
        send: Option<String>,
        /// Keep printing new messages until Ctrl-C
        #[arg(short, long)]
        listen: bool,
    },

    /// Recently viewed products
    Recent,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum CartAction {
    Show,
    Add {
        product: String,
        #[arg(short, long, default_value = "1")]
        quantity: u32,
    },
    Remove { item: String },
}

#[derive(Subcommand)]
pub enum LoginMethod {
    /// Email a one-time code
    OtpRequest { email: String },
    /// Check a one-time code
    OtpVerify { email: String, code: String },
    /// Email and password
    Password {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Google ID token obtained from a Google sign-in
    Google {
        #[arg(long)]
        credential: String,
    },
}

#[derive(Args)]
pub struct CheckoutArgs {
    /// Use a saved address by id
    #[arg(long)]
    saved: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    line1: Option<String>,
    #[arg(long)]
    line2: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    postal_code: Option<String>,
    #[arg(long)]
    country: Option<String>,
    /// Fill empty address fields from coordinates, "LAT,LON"
    #[arg(long)]
    locate: Option<String>,
    /// cash_on_delivery, card, wallet
    #[arg(long, default_value = "cash_on_delivery")]
    payment: String,
}

struct App {
    config: Config,
    store: TypedStore<SqliteStore>,
    format: String,
}

impl App {
    fn sessions(&self) -> SessionStore<'_, SqliteStore> {
        SessionStore::with_ttl(&self.store, self.config.storage.session_ttl())
    }

    fn session(&self) -> Result<Option<Session>> {
        Ok(self.sessions().current()?)
    }

    fn require_session(&self) -> Result<Session> {
        self.session()?
            .context("Not signed in. Run `bazaar login` first")
    }

    fn client(&self) -> Result<MarketplaceClient> {
        let client = MarketplaceClient::new(self.config.client_config())?;
        Ok(match self.session()? {
            Some(session) => client.with_token(session.token),
            None => client,
        })
    }

    fn json(&self) -> bool {
        self.format == "json"
    }
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("bazaar={}", config.logging.level)),
    );

    // Logs go to stderr so command output stays clean
    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let config = generate_default_config();
        match output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, &config)?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", config),
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    init_logging(&config);

    let db_path = config.storage_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create data directory {:?}", parent))?;
    }
    let store = TypedStore::new(SqliteStore::open(&db_path)?);
    let purged = store.purge_expired()?;
    if purged > 0 {
        tracing::debug!(purged, "Dropped expired entries");
    }

    let app = App {
        config,
        store,
        format: cli.format,
    };

    match cli.command {
        Commands::Products {
            query,
            category,
            max_price,
            in_stock,
            sort,
        } => {
            let sort = SortOrder::parse(&sort)
                .with_context(|| format!("Unknown sort order: {}", sort))?;
            let filter = ProductFilter {
                query: query.unwrap_or_default(),
                category,
                max_price,
                in_stock_only: in_stock,
                sort,
                ..Default::default()
            };
            let products = app.client()?.products(&filter.to_query()).await?;

            match product_listing(&products, &filter) {
                Listing::Empty => println!("No products match your search."),
                Listing::Grid(items) if app.json() => {
                    println!("{}", serde_json::to_string_pretty(&items)?)
                }
                Listing::Grid(items) => {
                    println!("{:<12} {:<32} {:>10} {:>6} {}", "ID", "Name", "Price", "Stock", "Category");
                    println!("{}", "-".repeat(76));
                    for p in items {
                        println!(
                            "{:<12} {:<32} {:>10.2} {:>6} {}",
                            p.id, p.name, p.price, p.stock, p.category
                        );
                    }
                }
            }
        }

        Commands::Product { id } => {
            let client = app.client()?;
            let target = ReviewTarget::Product(id.clone());
            let (product, reviews) = tokio::join!(client.product(&id), client.reviews(&target));
            let product = product?;
            let reviews = reviews.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Could not load reviews");
                Vec::new()
            });

            let flags = ViewedFlags::with_ttl(&app.store, app.config.storage.viewed_flag_ttl());
            if flags.first_view(&product.id)? {
                if let Err(e) = client.record_product_view(&product.id).await {
                    tracing::warn!(error = %e, "Could not record view");
                }
            }
            RecentlyViewed::with_limits(
                &app.store,
                app.config.storage.recently_viewed_max,
                app.config.storage.recently_viewed_age(),
            )
            .record(&product)?;

            if app.json() {
                println!("{}", serde_json::to_string_pretty(&product)?);
                return Ok(());
            }

            println!("{}  ({})", product.name, product.id);
            println!("Price: {:.2}", product.price);
            println!(
                "Stock: {}",
                if product.in_stock() {
                    product.stock.to_string()
                } else {
                    "out of stock".to_string()
                }
            );
            if !product.description.is_empty() {
                println!();
                println!("{}", product.description);
            }

            let summary = rating_summary(&reviews);
            println!();
            match summary.average {
                Some(avg) => println!("Reviews: {} (average {:.1})", summary.count, avg),
                None => println!("No reviews yet."),
            }
            for review in reviews.iter().take(5) {
                println!("  {}/5 {}: {}", review.rating, review.author_name, review.comment);
            }
        }

        Commands::Vendors { category, city } => {
            let query = VendorQuery {
                category: category.clone(),
                city: city.clone(),
            };
            let vendors = app.client()?.vendors(&query).await?;
            let filter = VendorFilter {
                category,
                city,
                ..Default::default()
            };

            match filter.apply(&vendors) {
                Listing::Empty => println!("No vendors found."),
                Listing::Grid(items) if app.json() => {
                    println!("{}", serde_json::to_string_pretty(&items)?)
                }
                Listing::Grid(items) => {
                    println!("{:<12} {:<28} {:<16} {}", "ID", "Name", "Category", "City");
                    println!("{}", "-".repeat(70));
                    for v in items {
                        println!("{:<12} {:<28} {:<16} {}", v.id, v.name, v.category, v.city);
                    }
                }
            }
        }

        Commands::Slots { vendor, date } => {
            let booked = app.client()?.booked_slots(&vendor, date).await?;
            let grid = SlotGrid::with_local_clock(date, &app.config.booking.slot_times, &booked)?;

            print_slots(&grid, &vendor);
        }

        Commands::Book {
            vendor,
            date,
            time,
            service,
            notes,
        } => {
            let session = app.require_session()?;
            let client = app.client()?;

            let (vendor_record, booked) =
                tokio::join!(client.vendor(&vendor), client.booked_slots(&vendor, date));
            let vendor_record = vendor_record?;
            remember_vendor(&app.store, &SelectedVendor::from(&vendor_record))?;

            let mut grid = SlotGrid::with_local_clock(date, &app.config.booking.slot_times, &booked?)?;
            grid.select(&time)?;

            let draft = BookingDraft {
                service_id: service,
                notes,
                ..BookingDraft::for_vendor(&vendor_record.id)
            };
            let request = draft.to_request(session.user_id(), &grid)?;

            match client.create_booking(&request).await {
                Ok(booking) => println!(
                    "Booked {} on {} at {} ({})",
                    vendor_record.name, booking.date, booking.time, booking.id
                ),
                Err(e) => {
                    if e.rejection() == Some(&Rejection::SlotAlreadyBooked) {
                        grid.apply_failure(&e);
                        print_slots(&grid, &vendor_record.name);
                    }
                    bail!("{}", e);
                }
            }
        }

        Commands::Cart { action } => {
            let session = app.require_session()?;
            let client = app.client()?;

            match action {
                CartAction::Show => {
                    let cart = Cart::from_items(client.cart(session.user_id()).await?);
                    print_cart(&cart, &app.config);
                }
                CartAction::Add { product, quantity } => {
                    let product = client.product(&product).await?;
                    let item = client
                        .add_to_cart(&AddToCartRequest {
                            user_id: session.user_id().to_string(),
                            product_id: product.id.clone(),
                            vendor_id: product.vendor_id.clone(),
                            quantity,
                        })
                        .await?;
                    println!("Added {} x {} ({})", item.quantity, item.name, item.id);
                }
                CartAction::Remove { item } => {
                    client.remove_cart_item(&item).await?;
                    println!("Removed {}", item);
                }
            }
        }

        Commands::Checkout(args) => {
            let session = app.require_session()?;
            let client = app.client()?;

            let (items, saved) = tokio::join!(
                client.cart(session.user_id()),
                client.saved_addresses(session.user_id())
            );
            let cart = Cart::from_items(items?);

            let mut form = CheckoutForm {
                payment_method: Some(
                    PaymentMethod::parse(&args.payment)
                        .with_context(|| format!("Unknown payment method: {}", args.payment))?,
                ),
                ..Default::default()
            };
            if let Some(id) = &args.saved {
                let saved = saved?;
                let address = saved
                    .iter()
                    .find(|a| &a.id == id)
                    .with_context(|| format!("No saved address {}", id))?;
                form.use_saved_address(address);
            }
            apply_address_args(&mut form.address, &args);

            if let Some(at) = &args.locate {
                let coordinates = parse_coordinates(at)?;
                let geocoder = GeocodingClient::new(app.config.geocoding_config())?;
                match geocoder.reverse(coordinates).await {
                    Ok(patch) => {
                        let filled = patch.apply_to(&mut form.address);
                        tracing::info!(filled, "Address auto-filled from location");
                    }
                    Err(e) => tracing::warn!(error = %e, "Location lookup failed"),
                }
            }

            let policy = app.config.checkout.fee_policy();
            let request = build_order(session.user_id(), &cart, &form, &policy)?;
            let mut latch = SubmitLatch::new();
            let order = place_order(&client, &mut latch, &request).await?;

            println!("Order {} placed", order.id);
            println!("  Subtotal:     {:>10.2}", order.subtotal);
            println!("  Delivery fee: {:>10.2}", order.delivery_fee);
            println!("  Total:        {:>10.2}", order.total);
        }

        Commands::Login { method } => {
            let client = app.client()?;
            match method {
                LoginMethod::OtpRequest { email } => {
                    let mut flow = OtpFlow::new();
                    flow.set_email(email);
                    let ticket = flow.begin_request()?;
                    let result = client.request_otp(&ticket.email).await;
                    flow.finish_request(&ticket, result.is_ok());
                    result?;
                    println!("Code sent to {}", ticket.email);
                }
                LoginMethod::OtpVerify { email, code } => {
                    verify_otp(&client, &email, &code).await?;
                    println!("{} verified. Finish with `bazaar signup --otp {}`", email, code);
                }
                LoginMethod::Password { email, password } => {
                    let request = LoginForm { email, password }
                        .to_request()
                        .map_err(|errors| anyhow::anyhow!(summarize(&errors)))?;
                    let auth = client.login(&request.email, &request.password).await?;
                    let session = Session::from(auth);
                    app.sessions().login(&session)?;
                    println!("Signed in as {} <{}>", session.user.name, session.user.email);
                }
                LoginMethod::Google { credential } => {
                    let identity = FederatedIdentity::decode(&credential)?;
                    let request = identity.login_request(&credential)?;
                    let session = Session::from(client.federated_login(&request).await?);
                    app.sessions().login(&session)?;
                    println!("Signed in as {} <{}>", session.user.name, session.user.email);
                }
            }
        }

        Commands::Signup {
            name,
            email,
            password,
            phone,
            otp,
        } => {
            let form = SignupForm {
                name,
                email: email.clone(),
                confirm_password: password.clone(),
                password,
                phone: phone.unwrap_or_default(),
            };
            let request = form
                .to_request()
                .map_err(|errors| anyhow::anyhow!(summarize(&errors)))?;

            let client = app.client()?;
            verify_otp(&client, &email, &otp).await?;

            let session = Session::from(client.signup(&request).await?);
            app.sessions().login(&session)?;
            println!("Welcome, {}", session.user.name);
        }

        Commands::Logout => {
            app.sessions().logout()?;
            println!("Signed out");
        }

        Commands::Whoami => match app.session()? {
            Some(session) => {
                println!("{} <{}>", session.user.name, session.user.email);
                println!("  id:   {}", session.user.id);
                println!("  role: {:?}", session.user.role);
                println!("  since {}", session.signed_in_at.format("%Y-%m-%d %H:%M UTC"));
            }
            None => println!("Not signed in"),
        },

        Commands::Inbox => {
            let session = app.require_session()?;
            let conversations = inbox(&app.client()?, session.user_id()).await?;

            if conversations.is_empty() {
                println!("No conversations yet.");
            }
            for c in conversations {
                println!(
                    "{:<12} with {:<12} {}  {}",
                    c.id,
                    c.counterpart_of(session.user_id()),
                    c.updated_at.format("%Y-%m-%d %H:%M"),
                    c.last_message.as_deref().unwrap_or_default()
                );
            }
        }

        Commands::Chat {
            counterpart,
            send,
            listen,
        } => {
            let session = app.require_session()?;
            let live = LiveChannel::connect(&app.config.api.ws_url).await?;
            let chat = ChatSession::open(
                Arc::new(app.client()?),
                Arc::new(live),
                &session.user,
                &counterpart,
            )
            .await?;

            let mut seen = SeenEntries::new();
            for entry in seen.unseen(&chat.snapshot().await) {
                print_entry(entry, session.user_id());
            }

            if let Some(text) = send {
                if let Err(e) = chat.send(&text).await {
                    eprintln!("Not sent: {}", e);
                }
                // Live arrivals may have landed around our own message
                for entry in seen.unseen(&chat.snapshot().await) {
                    print_entry(entry, session.user_id());
                }
            }

            if listen {
                let mut tick = tokio::time::interval(std::time::Duration::from_millis(500));
                loop {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => break,
                        _ = tick.tick() => {
                            for entry in seen.unseen(&chat.snapshot().await) {
                                print_entry(entry, session.user_id());
                            }
                        }
                    }
                }
            }
        }

        Commands::Recent => {
            let recent = RecentlyViewed::with_limits(
                &app.store,
                app.config.storage.recently_viewed_max,
                app.config.storage.recently_viewed_age(),
            )
            .list()?;

            if recent.is_empty() {
                println!("Nothing viewed recently.");
            }
            for entry in recent {
                println!(
                    "{:<12} {:<32} {:>10.2}  {}",
                    entry.product_id,
                    entry.name,
                    entry.price,
                    entry.viewed_at.format("%Y-%m-%d %H:%M")
                );
            }
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Verify a code sent by an earlier `login otp-request`
async fn verify_otp(client: &MarketplaceClient, email: &str, code: &str) -> Result<()> {
    let mut flow = OtpFlow::new();
    flow.set_email(email);

    // Sent in a previous process; resume at the code step
    let sent = flow.begin_request()?;
    flow.finish_request(&sent, true);

    flow.set_code(code);
    let ticket = flow.begin_verify()?;
    let result = client
        .verify_otp(&ticket.email, ticket.code.as_deref().unwrap_or_default())
        .await;
    flow.finish_verify(&ticket, result.is_ok());
    result?;

    if !flow.can_submit() {
        bail!("Email is not verified");
    }
    Ok(())
}

fn apply_address_args(address: &mut Address, args: &CheckoutArgs) {
    let set = |slot: &mut String, value: &Option<String>| {
        if let Some(v) = value {
            *slot = v.clone();
        }
    };
    set(&mut address.full_name, &args.name);
    set(&mut address.phone, &args.phone);
    set(&mut address.line1, &args.line1);
    set(&mut address.city, &args.city);
    set(&mut address.postal_code, &args.postal_code);
    set(&mut address.country, &args.country);
    if args.line2.is_some() {
        address.line2 = args.line2.clone();
    }
    if args.state.is_some() {
        address.state = args.state.clone();
    }
}

fn parse_coordinates(s: &str) -> Result<Coordinates> {
    let (lat, lon) = s
        .split_once(',')
        .with_context(|| format!("Expected LAT,LON, got {}", s))?;
    Ok(Coordinates {
        latitude: lat.trim().parse().context("Invalid latitude")?,
        longitude: lon.trim().parse().context("Invalid longitude")?,
    })
}

fn print_cart(cart: &Cart, config: &Config) {
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    println!("{:<12} {:<32} {:>5} {:>10}", "Item", "Name", "Qty", "Total");
    println!("{}", "-".repeat(62));
    for item in cart.items() {
        println!(
            "{:<12} {:<32} {:>5} {:>10.2}",
            item.id,
            item.name,
            item.quantity,
            item.line_total()
        );
    }

    let policy = config.checkout.fee_policy();
    let totals = cart.totals(&policy);
    println!();
    println!("Subtotal:     {:>10.2}", totals.subtotal);
    println!("Delivery fee: {:>10.2}", totals.delivery_fee);
    println!("Total:        {:>10.2}", totals.total);
    if let Some(remaining) = policy.remaining_for_free_delivery(totals.subtotal) {
        println!("Add {:.2} more for free delivery", remaining);
    }
}

fn print_slots(grid: &SlotGrid, vendor: &str) {
    println!("Slots for {} on {}", vendor, grid.date());
    for (time, state) in grid.slots() {
        println!("  {}  {}", time, state.label());
    }
}

fn print_entry(entry: &bazaar::chat::ChatEntry, me: &str) {
    let who = if entry.message.sender_id == me {
        "me"
    } else {
        entry.message.sender_id.as_str()
    };
    let mark = match entry.status {
        DeliveryStatus::Pending => " (sending)",
        DeliveryStatus::Failed => " (failed)",
        DeliveryStatus::Sent | DeliveryStatus::Received => "",
    };
    println!(
        "[{}] {}: {}{}",
        entry.message.sent_at.format("%H:%M"),
        who,
        entry.message.text,
        mark
    );
}
