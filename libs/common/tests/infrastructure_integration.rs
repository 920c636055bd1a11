//! Integration tests for the infrastructure components
//!
//! These verify that PostgreSQL and Redis are reachable with the configured
//! environment. They are ignored by default so the suite stays hermetic; run
//! them with `cargo test -- --ignored` against a local stack.

use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool},
};
use sqlx::Row;

#[tokio::test]
#[ignore = "requires local PostgreSQL and Redis"]
async fn test_infrastructure_integration() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    let row = sqlx::query("SELECT 1 as result").fetch_one(&pool).await?;
    let result: i32 = row.get("result");
    assert_eq!(result, 1, "PostgreSQL simple query test failed");

    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    assert!(
        redis_pool.health_check().await?,
        "Redis health check failed"
    );

    redis_pool
        .set("integration_test_key", "integration_test_value", Some(10))
        .await?;
    assert_eq!(
        redis_pool.get("integration_test_key").await?,
        Some("integration_test_value".to_string())
    );

    redis_pool.delete("integration_test_key").await?;
    assert_eq!(redis_pool.get("integration_test_key").await?, None);

    Ok(())
}
