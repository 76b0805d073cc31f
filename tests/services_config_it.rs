#![cfg(feature = "reqwest")]

// std
use std::{
	env, fs, process,
	time::{SystemTime, UNIX_EPOCH},
};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use retoken::{
	_preludet::*,
	client::{ServiceName, Services},
	config::ServicesConfig,
	error::ConfigError,
	navigate::Navigator,
	store::{CredentialStore, MemoryStore},
};

fn temp_config_path() -> std::path::PathBuf {
	let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_nanos());

	env::temp_dir().join(format!("retoken_services_{}_{nanos}.json", process::id()))
}

#[tokio::test]
async fn services_load_from_file_and_route_by_name() {
	let default_server = MockServer::start_async().await;
	let admin_server = MockServer::start_async().await;
	let default_mock = default_server
		.mock_async(|when, then| {
			when.method(GET).path("/goods").query_param("id", "7").header("authorization", "t");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "code": 0, "data": { "id": 7 } }));
		})
		.await;
	let admin_mock = admin_server
		.mock_async(|when, then| {
			when.method(DELETE).path("/admin/users/3").header("authorization", "Bearer t");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "code": 200, "data": true }));
		})
		.await;
	let path = temp_config_path();
	let document = json!({
		"default": { "base_url": default_server.base_url(), "request_timeout_ms": 2000 },
		"admin": { "base_url": admin_server.url("/admin"), "auth_scheme": "Bearer" },
	});

	fs::write(&path, document.to_string()).expect("Failed to write services config fixture.");

	let config = ServicesConfig::from_json_file(&path).expect("Services config should load.");

	fs::remove_file(&path).unwrap_or_else(|e| {
		panic!("Failed to remove temporary services config {}: {e}", path.display())
	});

	assert_eq!(config.default.timeout(), Some(Duration::from_secs(2)));

	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::with_entries([("token", "t")]));
	let navigator: Arc<dyn Navigator> = Arc::new(RecordingNavigator::default());

	Services::from_config(config.clone(), Arc::clone(&store), Arc::clone(&navigator))
		.expect("Reqwest-backed services should build from the loaded config.");

	let services = Services::with_transport(
		config.default,
		config.admin,
		Arc::new(test_reqwest_transport()),
		store,
		navigator,
	)
	.expect("Services should build.");
	let goods: Value = services
		.client("default".parse().expect("Service name should parse."))
		.get("/goods", &json!({ "id": 7 }))
		.await
		.expect("Default call should succeed.");
	let deleted: bool = services
		.client(ServiceName::Admin)
		.delete("/users/3", &())
		.await
		.expect("Admin call should succeed.");

	assert_eq!(goods, json!({ "id": 7 }));
	assert!(deleted);

	default_mock.assert_async().await;
	admin_mock.assert_async().await;
}

#[test]
fn invalid_documents_are_rejected_with_context() {
	let err = ServicesConfig::from_json_str(
		r#"{
			"default": { "base_url": "ftp://files.example.com" },
			"admin": { "base_url": "https://admin.example.com" }
		}"#,
	)
	.expect_err("Non-HTTP base URLs should be rejected.");

	assert!(matches!(err, ConfigError::UnsupportedScheme { .. }));

	let err = ServicesConfig::from_json_str(
		r#"{
			"default": { "base_url": "https://api.example.com" },
			"admin": {
				"base_url": "https://admin.example.com",
				"envelope": { "success_codes": [0], "expiry_codes": [0] }
			}
		}"#,
	)
	.expect_err("Overlapping codes should be rejected.");

	assert_eq!(err, ConfigError::OverlappingCodes { code: 0 });

	let err = ServicesConfig::from_json_str(r#"{ "default": {} }"#)
		.expect_err("Missing base URL should be rejected.");

	assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == "default"));
}
