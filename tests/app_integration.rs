use btcwatch::core::config::{AppConfig, CoinGeckoProviderConfig};
use btcwatch::core::price::DayNumber;
use btcwatch::core::retry::RetryPolicy;
use btcwatch::sync::{Clock, HistoricalState, SyncCoordinator, SyncSettings};
use chrono::Utc;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod test_utils {
    use super::*;

    pub const TODAY: DayNumber = DayNumber::new(20_230);

    pub struct FixedClock(pub DayNumber);

    impl Clock for FixedClock {
        fn today(&self) -> DayNumber {
            self.0
        }
    }

    pub fn system_today() -> DayNumber {
        DayNumber::from_datetime(Utc::now())
    }

    pub fn midnight_millis(day: DayNumber) -> i64 {
        day.midnight().timestamp_millis()
    }

    pub async fn mount_spot(server: &MockServer, price: f64) {
        let body = format!(r#"{{"bitcoin": {{"eur": {price}, "last_updated_at": 1747872000}}}}"#);
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    pub fn series_body(points: &[(i64, f64)]) -> String {
        let prices: Vec<String> = points
            .iter()
            .map(|(ts, price)| format!("[{ts}, {price}]"))
            .collect();
        format!(r#"{{"prices": [{}]}}"#, prices.join(", "))
    }

    pub fn fast_settings() -> SyncSettings {
        SyncSettings {
            window_size_days: 14,
            retry_policy: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(50),
            },
        }
    }

    pub fn coordinator(server: &MockServer) -> SyncCoordinator {
        let config = CoinGeckoProviderConfig {
            base_url: server.uri(),
            api_key: None,
        };
        let provider = btcwatch::providers::CoinGeckoProvider::new(&config, "eur").unwrap();
        SyncCoordinator::with_clock(
            Arc::new(provider),
            fast_settings(),
            Arc::new(FixedClock(TODAY)),
        )
    }
}

#[test_log::test(tokio::test)]
async fn test_refresh_against_mock_api() {
    let today = test_utils::TODAY;
    let server = MockServer::start().await;
    test_utils::mount_spot(&server, 95_000.0).await;
    Mock::given(method("GET"))
        .and(path("/coins/bitcoin/market_chart"))
        .and(query_param("days", "14"))
        .respond_with(ResponseTemplate::new(200).set_body_string(test_utils::series_body(&[
            (test_utils::midnight_millis(today.minus_days(2)), 93_000.0),
            (test_utils::midnight_millis(today.minus_days(1)), 94_000.0),
            (test_utils::midnight_millis(today), 95_000.0),
            (test_utils::midnight_millis(today) + 3_600_000, 95_500.0),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = test_utils::coordinator(&server);
    coordinator.refresh_all().await.unwrap();
    // Same day again: history comes from the window, spot is fetched again.
    coordinator.refresh_all().await.unwrap();

    let current = coordinator.current_price();
    info!(?current, "Current price state");
    assert_eq!(current.value().map(|q| q.price), Some(95_000.0));

    let HistoricalState::Ready(prices) = coordinator.historical_prices() else {
        panic!("History should be loaded");
    };
    let days: Vec<_> = prices.iter().map(|d| d.day()).collect();
    assert_eq!(days, vec![today, today.minus_days(1), today.minus_days(2)]);
    assert_eq!(prices[0].price("eur"), Some(95_000.0));

    let spot_requests = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/simple/price")
        .count();
    assert_eq!(spot_requests, 2);
}

#[test_log::test(tokio::test)]
async fn test_transient_server_error_is_retried() {
    let today = test_utils::TODAY;
    let server = MockServer::start().await;
    test_utils::mount_spot(&server, 1.0).await;
    Mock::given(method("GET"))
        .and(path("/coins/bitcoin/market_chart"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/coins/bitcoin/market_chart"))
        .respond_with(ResponseTemplate::new(200).set_body_string(test_utils::series_body(&[(
            test_utils::midnight_millis(today),
            2.0,
        )])))
        .mount(&server)
        .await;

    let coordinator = test_utils::coordinator(&server);
    coordinator.refresh_all().await.unwrap();

    let history = coordinator.historical_prices();
    assert_eq!(history.value().map(Vec::len), Some(1));
}

#[test_log::test(tokio::test)]
async fn test_sections_fail_independently() {
    let today = test_utils::TODAY;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(401).set_body_string("missing key"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/coins/bitcoin/market_chart"))
        .respond_with(ResponseTemplate::new(200).set_body_string(test_utils::series_body(&[(
            test_utils::midnight_millis(today),
            2.0,
        )])))
        .mount(&server)
        .await;

    let coordinator = test_utils::coordinator(&server);
    coordinator.refresh_all().await.unwrap();

    let message = coordinator.current_price().error_message().unwrap().to_string();
    assert!(message.contains("401"), "{message}");
    assert!(coordinator.historical_prices().value().is_some());
}

#[test_log::test(tokio::test)]
async fn test_show_command_with_mock() {
    let today = test_utils::system_today();
    let server = MockServer::start().await;
    test_utils::mount_spot(&server, 95_000.0).await;
    Mock::given(method("GET"))
        .and(path("/coins/bitcoin/market_chart"))
        .respond_with(ResponseTemplate::new(200).set_body_string(test_utils::series_body(&[(
            test_utils::midnight_millis(today),
            95_000.0,
        )])))
        .mount(&server)
        .await;

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_path = config_file.path();
    let config_content = format!(
        r#"
        currency: "eur"
        retry:
          max_attempts: 2
          base_delay_seconds: 0.01
          max_delay_seconds: 0.02
        providers:
          coingecko:
            base_url: {}
    "#,
        server.uri()
    );
    fs::write(config_path, &config_content).expect("Failed to write config file");

    let loaded = AppConfig::load_from_path(config_path).unwrap();
    assert_eq!(loaded.window_size_days, 14);

    let result = btcwatch::run_command(
        btcwatch::AppCommand::Show,
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Show command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_day_command_with_mock() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins/bitcoin/history"))
        .and(query_param("date", "21-05-2025"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"market_data": {"current_price": {"usd": 106000.0, "eur": 94000.0}}}"#,
        ))
        .mount(&server)
        .await;

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    fs::write(
        config_file.path(),
        format!("providers:\n  coingecko:\n    base_url: {}\n", server.uri()),
    )
    .expect("Failed to write config file");

    let date = chrono::NaiveDate::from_ymd_opt(2025, 5, 21).unwrap();
    let result = btcwatch::run_command(
        btcwatch::AppCommand::Day(date),
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Day command failed with: {:?}", result.err());
}
