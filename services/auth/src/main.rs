use anyhow::Result;
use std::net::SocketAddr;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod catalog;
mod error;
mod jwt;
mod lockout;
mod middleware;
mod models;
mod rbac;
mod repositories;
mod routes;
mod schema;
mod seed;
mod session;
mod throttle;
mod validation;

use common::cache::{RedisConfig, RedisPool};
use common::database;

use crate::jwt::{JwtConfig, JwtService};
use crate::lockout::LockoutPolicy;
use crate::repositories::{LoginLogRepository, RbacRepository, UserRepository};
use crate::session::SessionManager;
use crate::throttle::{LoginThrottle, ThrottleConfig};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub redis_pool: RedisPool,
    pub jwt: JwtService,
    pub sessions: SessionManager,
    pub users: UserRepository,
    pub rbac: RbacRepository,
    pub audit: LoginLogRepository,
    pub throttle: LoginThrottle,
    pub lockout: LockoutPolicy,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting authentication service");

    let db_config = database::DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if !database::health_check(&pool).await? {
        anyhow::bail!("failed to connect to database");
    }
    info!("Database connection successful");

    schema::ensure_schema(&pool).await?;
    seed::seed_catalog(&pool).await?;
    seed::verify_catalog(&pool).await?;

    let jwt_config = JwtConfig::from_env()?;
    let jwt = JwtService::new(jwt_config)?;

    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    let users = UserRepository::new(pool.clone());
    let rbac = RbacRepository::new(pool.clone());
    let audit = LoginLogRepository::new(pool.clone());
    let sessions = SessionManager::new(redis_pool.clone(), jwt.clone());

    seed::seed_admin_user(&users, &rbac).await?;

    let app_state = AppState {
        db_pool: pool,
        redis_pool,
        jwt,
        sessions,
        users,
        rbac,
        audit,
        throttle: LoginThrottle::new(ThrottleConfig::default()),
        lockout: LockoutPolicy::from_env(),
    };

    info!("Authentication service initialized successfully");

    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Authentication service listening on 0.0.0.0:3000");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
