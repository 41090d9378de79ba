//! Client against a live proxy-server whose upstreams are mocked

use country_client::cli::{self, Cli, Command};
use country_client::render::render_country;
use country_client::storage::MemoryStore;
use country_client::{ClientConfig, CountryManager};
use proxy_server::{build_state, config::Config, create_router};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn upstream_countries() -> Value {
    json!([
        {
            "name": { "common": "Turkey", "official": "Republic of Türkiye" },
            "cca3": "TUR",
            "capital": ["Ankara"],
            "capitalInfo": { "latlng": [39.93, 32.87] },
            "population": 84339067,
            "currencies": { "TRY": { "name": "Turkish lira", "symbol": "₺" } },
            "languages": { "tur": "Turkish" },
            "borders": ["ARM", "GEO"]
        },
        {
            "name": { "common": "armenia", "official": "Republic of Armenia" },
            "cca3": "ARM",
            "capital": ["Yerevan"]
        },
        {
            "name": { "common": "Georgia", "official": "Georgia" },
            "cca3": "GEO",
            "capital": ["Tbilisi"]
        }
    ])
}

/// Starts the proxy on an ephemeral port and returns its base URL
async fn spawn_proxy(upstream: &MockServer) -> String {
    let uri = upstream.uri();
    let vars: HashMap<&str, String> = HashMap::from([
        ("REST_COUNTRIES_URL", uri.clone()),
        ("OPEN_WEATHER_URL", format!("{}/data/2.5/weather", uri)),
        ("WEATHER_API_KEY", "weather-key".to_string()),
        ("RETRY_ATTEMPTS", "1".to_string()),
    ]);
    let config = Config::from_source(|key| vars.get(key).cloned());
    let app = create_router(
        build_state(&config).expect("Failed to build state"),
        &config.allowed_origins,
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Proxy stopped");
    });

    format!("http://{}", addr)
}

async fn mock_upstream() -> MockServer {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(upstream_countries()))
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("appid", "weather-key"))
        .and(query_param("lat", "39.93"))
        .and(query_param("lon", "32.87"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Ankara",
            "main": { "temp": 18.2, "humidity": 52 },
            "weather": [{ "description": "parçalı bulutlu", "icon": "03d" }]
        })))
        .mount(&upstream)
        .await;
    upstream
}

#[tokio::test]
async fn test_turkey_through_proxy() {
    let upstream = mock_upstream().await;
    let proxy_url = spawn_proxy(&upstream).await;

    let config = ClientConfig {
        proxy_url,
        ..ClientConfig::with_base(&upstream.uri())
    };
    let manager = CountryManager::new(config, Arc::new(MemoryStore::new())).unwrap();

    assert!(manager.initialize().await);

    let countries = manager.countries();
    let names: Vec<&str> = countries
        .iter()
        .filter_map(|c| c.common_name())
        .collect();
    assert_eq!(names, vec!["armenia", "Georgia", "Turkey"]);

    let turkey = manager.get_country("Turkey").await.unwrap();
    assert_eq!(turkey.cca3(), Some("TUR"));
    assert!(render_country(&turkey).contains("Ankara"));

    let neighbors = manager.get_neighbor_countries(&turkey.borders()).await;
    assert_eq!(neighbors.len(), 2);
}

#[tokio::test]
async fn test_search_command_prints_card_and_capital_weather() {
    let upstream = mock_upstream().await;
    let proxy_url = spawn_proxy(&upstream).await;

    let cli = Cli {
        proxy_url: Some(proxy_url),
        cache_dir: None,
        no_cache: true,
        verbose: false,
        command: Command::Search {
            name: "turkey".to_string(),
        },
    };

    let output = cli::run(&cli).await.unwrap();

    assert!(output.contains("Turkey (Republic of Türkiye)"));
    assert!(output.contains("84.34 million"));
    assert!(output.contains("Turkish lira (TRY)"));
    assert!(output.contains("Weather in Ankara"));
    assert!(output.contains("18.2°C, parçalı bulutlu"));
}
