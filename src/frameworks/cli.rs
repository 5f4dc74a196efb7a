use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use crate::domain::entities::{
    Cart, Credentials, Product, ProductInput, ProductPage, ProductQuery, Registration,
    SortDirection,
};
use crate::domain::errors::{ActionError, ApiError};
use crate::domain::ports::KeyValueStorage;
use crate::frameworks::config::{ClientConfig, ConfigError};
use crate::interface_adapters::{ApiClient, AppState, FileStorage};
use crate::use_cases::{Route, RouteDecision};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error("{from} is not available here; go to {to}")]
    Redirected { from: String, to: String },
    #[error("session is still loading")]
    NotReady,
}

#[derive(Debug, Parser)]
#[command(name = "storefront")]
#[command(version, about = "Command-line client for the storefront backend")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create a new account (does not sign in)
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Admin product management
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Debug, Subcommand)]
enum ProductsAction {
    /// List one page of products
    List {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = 12)]
        size: u32,
        #[arg(long, default_value = "id")]
        sort_by: String,
        #[arg(long)]
        desc: bool,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Show a single product
    Show { id: i64 },
    /// List product categories
    Categories,
    /// Show the landing-page selection
    Featured,
}

#[derive(Debug, Subcommand)]
enum CartAction {
    /// Show the cart with its totals
    Show,
    /// Add a product
    Add {
        product_id: i64,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a product already in the cart
    Update { product_id: i64, quantity: u32 },
    /// Remove a product
    Remove { product_id: i64 },
    /// Empty the cart
    Clear,
    /// Ask the backend for the cart total
    Total,
}

#[derive(Debug, Args)]
struct ProductFields {
    #[arg(long)]
    name: String,
    #[arg(long)]
    price: Decimal,
    #[arg(long)]
    stock: u32,
    #[arg(long)]
    category: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    image_url: Option<String>,
}

impl From<ProductFields> for ProductInput {
    fn from(fields: ProductFields) -> Self {
        ProductInput {
            name: fields.name,
            description: fields.description,
            price: fields.price,
            stock_quantity: fields.stock,
            image_url: fields.image_url,
            category: fields.category,
        }
    }
}

#[derive(Debug, Subcommand)]
enum AdminAction {
    /// Create a product
    Create {
        #[command(flatten)]
        fields: ProductFields,
    },
    /// Replace a product's fields
    Update {
        id: i64,
        #[command(flatten)]
        fields: ProductFields,
    },
    /// Delete a product
    Delete { id: i64 },
}

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run() -> Result<(), CliError> {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    let config = ClientConfig::load()?;
    tracing::debug!(api_base_url = %config.api_base_url, session_file = %config.session_file.display(), "client configured.");

    let api = ApiClient::new(&config.api_base_url, config.request_timeout)?;
    let state = AppState::new(api, FileStorage::new(&config.session_file));
    state.auth.initialize();

    execute(&state, cli.command).await
}

// Gates a command behind the same decision a guarded view would get.
fn require<S: KeyValueStorage>(state: &AppState<S>, route: Route) -> Result<(), CliError> {
    match state.route(route) {
        RouteDecision::Render => Ok(()),
        RouteDecision::Redirect(target) => Err(CliError::Redirected {
            from: route.path(),
            to: target.path(),
        }),
        RouteDecision::Loading => Err(CliError::NotReady),
    }
}

async fn execute<S: KeyValueStorage>(state: &AppState<S>, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { username, password } => {
            require(state, Route::Login)?;
            state
                .auth
                .login(&Credentials { username, password })
                .await?;
        }
        Command::Register {
            username,
            email,
            password,
            first_name,
            last_name,
        } => {
            require(state, Route::Register)?;
            let registration = Registration {
                username,
                email,
                password,
                first_name,
                last_name,
            };
            state.auth.register(&registration).await?;
        }
        Command::Logout => state.auth.logout(),
        Command::Whoami => {
            require(state, Route::Profile)?;
            if let Some(session) = state.auth.session() {
                let user = &session.user;
                println!(
                    "{} (id {}, role {:?})",
                    user.username.as_deref().unwrap_or(&user.first_name),
                    user.id,
                    user.role
                );
            }
        }
        Command::Products { action } => products(state, action).await?,
        Command::Cart { action } => cart(state, action).await?,
        Command::Admin { action } => admin(state, action).await?,
    }
    Ok(())
}

async fn products<S: KeyValueStorage>(
    state: &AppState<S>,
    action: ProductsAction,
) -> Result<(), CliError> {
    match action {
        ProductsAction::List {
            page,
            size,
            sort_by,
            desc,
            name,
            category,
        } => {
            require(state, Route::Products)?;
            let query = ProductQuery {
                page,
                size,
                sort_by,
                sort_dir: if desc {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                },
                name,
                category,
            };
            let listing = state.catalog.browse(&query).await?;
            print_page(&listing);
        }
        ProductsAction::Show { id } => {
            require(state, Route::ProductDetail(id))?;
            let product = state.catalog.product(id).await?;
            print_product(&product);
            if let Some(description) = &product.description {
                println!("    {description}");
            }
        }
        ProductsAction::Categories => {
            require(state, Route::Products)?;
            for category in state.catalog.categories().await? {
                println!("{category}");
            }
        }
        ProductsAction::Featured => {
            require(state, Route::Home)?;
            for product in state.catalog.featured().await? {
                print_product(&product);
            }
        }
    }
    Ok(())
}

async fn cart<S: KeyValueStorage>(state: &AppState<S>, action: CartAction) -> Result<(), CliError> {
    require(state, Route::Cart)?;
    let cart = &state.cart;
    match action {
        CartAction::Show => {
            cart.fetch_cart().await?;
            print_cart(cart.cart().as_ref());
            println!(
                "{} item(s), total {}",
                cart.cart_item_count(),
                cart.cart_total().round_dp(2)
            );
        }
        CartAction::Add {
            product_id,
            quantity,
        } => {
            cart.add_to_cart(product_id, quantity).await?;
            println!("{} item(s) in cart", cart.cart_item_count());
        }
        CartAction::Update {
            product_id,
            quantity,
        } => {
            cart.update_quantity(product_id, quantity).await?;
            print_cart(cart.cart().as_ref());
        }
        CartAction::Remove { product_id } => {
            cart.remove_from_cart(product_id).await?;
            print_cart(cart.cart().as_ref());
        }
        CartAction::Clear => cart.clear_cart().await?,
        CartAction::Total => {
            println!("{}", cart.server_total().await?.round_dp(2));
        }
    }
    Ok(())
}

async fn admin<S: KeyValueStorage>(state: &AppState<S>, action: AdminAction) -> Result<(), CliError> {
    require(state, Route::Admin)?;
    match action {
        AdminAction::Create { fields } => {
            let product = state.catalog.create_product(&fields.into()).await?;
            print_product(&product);
        }
        AdminAction::Update { id, fields } => {
            let product = state.catalog.update_product(id, &fields.into()).await?;
            print_product(&product);
        }
        AdminAction::Delete { id } => state.catalog.delete_product(id).await?,
    }
    Ok(())
}

fn print_product(product: &Product) {
    println!(
        "#{:<5} {:<40} {:>10} {:<16} stock {}",
        product.id,
        product.name,
        product.price.round_dp(2),
        product.category,
        product.stock_quantity
    );
}

fn print_page(page: &ProductPage) {
    for product in &page.content {
        print_product(product);
    }
    println!(
        "page {}/{} ({} products)",
        page.number + 1,
        page.total_pages.max(1),
        page.total_elements
    );
}

fn print_cart(cart: Option<&Cart>) {
    let Some(cart) = cart.filter(|cart| !cart.items.is_empty()) else {
        println!("cart is empty");
        return;
    };
    for item in &cart.items {
        println!(
            "#{:<5} {:<40} x{:<3} {:>10}",
            item.product.id,
            item.product.name,
            item.quantity,
            item.line_total().round_dp(2)
        );
    }
}
