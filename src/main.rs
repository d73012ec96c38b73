//! Payment Orchestrator server binary.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use payment_orchestrator::adapters::cost::HttpCostResolver;
use payment_orchestrator::adapters::govpay::{GovPayAdapter, GovPayConfig, GovPayWebhookVerifier};
use payment_orchestrator::adapters::http::{payment_routes, PaymentHandlers};
use payment_orchestrator::adapters::paypal::{PayPalAdapter, PayPalConfig};
use payment_orchestrator::adapters::postgres::PostgresPaymentSessionRepository;
use payment_orchestrator::adapters::RedisEventPublisher;
use payment_orchestrator::application::{
    AuthorizationPolicy, AuthorizationRoles, ProviderRegistry, SessionSettings,
};
use payment_orchestrator::config::{AppConfig, DatabaseConfig};
use payment_orchestrator::domain::payment::ExpiryPolicy;
use payment_orchestrator::ports::AllowList;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.server.log_level, config.is_production());

    // Infrastructure
    let pool = connect_database(&config.database).await?;
    let redis = redis::Client::open(config.redis.url.as_str())?
        .get_multiplexed_async_connection()
        .await?;

    let repository = Arc::new(PostgresPaymentSessionRepository::new(pool));
    let event_publisher = Arc::new(
        RedisEventPublisher::new(redis, config.redis.channel_prefix.clone())
            .with_timeout(config.redis.timeout()),
    );
    let cost_resolver = Arc::new(HttpCostResolver::new(config.session.outbound_timeout()));

    // Providers
    let timeout = config.session.outbound_timeout();
    let mut providers = ProviderRegistry::new();
    if let Some(govpay) = &config.govpay {
        let adapter = GovPayAdapter::new(
            GovPayConfig::new(govpay.api_key.clone(), &config.session.api_base_url)
                .with_base_url(&govpay.api_url)
                .with_timeout(timeout),
        );
        providers = providers.with_provider(Arc::new(adapter));
    }
    if let Some(paypal) = &config.paypal {
        let mut paypal_config = PayPalConfig::new(
            paypal.client_id.clone(),
            paypal.client_secret.clone(),
            &config.session.api_base_url,
        )
        .with_base_url(&paypal.api_url)
        .with_currency(&paypal.currency)
        .with_timeout(timeout);
        if let Some(brand_name) = &paypal.brand_name {
            paypal_config = paypal_config.with_brand_name(brand_name);
        }
        providers = providers.with_provider(Arc::new(PayPalAdapter::new(paypal_config)));
    }
    tracing::info!(methods = ?providers.methods(), "payment providers registered");

    // Application
    let policy = AuthorizationPolicy::new(AuthorizationRoles {
        lookup_admin: config.authorization.lookup_admin_role.clone(),
        internal_app: config.authorization.internal_app_role.clone(),
        bulk_refund: config.authorization.bulk_refund_role.clone(),
    });
    let settings = SessionSettings::new(
        AllowList::new(config.session.allowed_cost_domains_list()),
        ExpiryPolicy::from_minutes(config.session.expiry_minutes),
        &config.session.api_base_url,
    );

    let mut handlers = PaymentHandlers::from_ports(
        repository,
        cost_resolver,
        providers,
        event_publisher,
        policy.clone(),
        settings,
    );
    if let Some(secret) = config.govpay.as_ref().and_then(|g| g.webhook_secret.clone()) {
        handlers = handlers.with_webhook_verifier(GovPayWebhookVerifier::from_secret(secret));
    }

    let app = payment_routes(handlers, policy).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TimeoutLayer::new(config.server.request_timeout())),
    );

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "payment orchestrator listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(filter: &str, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.pretty().try_init()
    };
}

async fn connect_database(config: &DatabaseConfig) -> Result<PgPool, BoxError> {
    let options = PgConnectOptions::from_str(&config.url)?
        .options([("statement_timeout", config.statement_timeout_setting())]);

    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(Some(config.idle_timeout()))
        .connect_with(options)
        .await?;

    if config.run_migrations {
        sqlx::migrate::Migrator::new(Path::new("./migrations"))
            .await?
            .run(&pool)
            .await?;
        tracing::info!("database migrations applied");
    }

    Ok(pool)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
