use packaging_store_api::routes::health::HealthData;

mod support;

#[test]
fn health_data_reports_database_state() {
    let up = HealthData::new(true);
    assert_eq!(up.status, "ok");
    assert_eq!(up.database, "up");

    let down = HealthData::new(false);
    assert_eq!(down.status, "ok");
    assert_eq!(down.database, "down");
}

#[tokio::test]
async fn health_check_returns_ok() -> anyhow::Result<()> {
    use axum::extract::State;
    use packaging_store_api::routes::health::health_check;

    let Some(db) = support::init_test_db().await? else {
        return Ok(());
    };

    let response = health_check(State(db.state.clone())).await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert_eq!(data.database, "up");
    Ok(())
}
