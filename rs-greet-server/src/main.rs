use std::env;
use std::io;
use std::sync::Mutex;

use actix_web::{get, put, web, App, HttpResponse, HttpServer, Responder};
use chrono::Local;
use log::{error, info, warn};
use serde::Deserialize;

use rs_greet_core::config::Config;
use rs_greet_core::registry::MarkOutcome;
use rs_greet_core::rotation::Rotation;
use rs_greet_core::timing::ScheduleBoard;
use rs_greet_core::{generate_greeting_text, GreetError};

/// Environment variable holding the configuration file path
const CONFIG_ENV: &str = "RS_GREET_CONFIG";

/// Query parameters of the `/v1/checkout` endpoint
#[derive(Deserialize)]
struct KindQuery {
	kind: Option<String>,
}

/// Query parameters of the `/v1/commit` and `/v1/release` endpoints
#[derive(Deserialize)]
struct LeaseQuery {
	kind: Option<String>,
	uid: Option<u64>,
}

/// Query parameters of the `/v1/next_run` endpoint
#[derive(Deserialize)]
struct NextRunQuery {
	window: Option<String>,
	advance: Option<bool>,
}

struct SharedData {
	config: Config,
	rotation: Rotation,
	board: ScheduleBoard,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
	value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Maps a library error to an HTTP response.
///
/// - Unknown or empty catalogs and unknown windows: 404
/// - Outstanding or mismatched checkouts: 409
/// - Invalid parameters: 400
/// - Anything else (exhausted register, I/O): 500
fn error_response(e: &GreetError) -> HttpResponse {
	match e {
		GreetError::EmptyCatalog(_)
		| GreetError::UnknownKind(_)
		| GreetError::UnknownEntry { .. }
		| GreetError::UnknownWindow(_) => HttpResponse::NotFound().body(e.to_string()),
		GreetError::Busy(_) | GreetError::LeaseMismatch { .. } => HttpResponse::Conflict().body(e.to_string()),
		GreetError::InvalidSkew(_)
		| GreetError::InvalidRange { .. }
		| GreetError::InvalidTime(_)
		| GreetError::InvalidWindow { .. } => HttpResponse::BadRequest().body(e.to_string()),
		_ => {
			error!("{e}");
			HttpResponse::InternalServerError().body(e.to_string())
		}
	}
}

#[get("/v1/health")]
async fn get_health() -> impl Responder {
	HttpResponse::Ok().body("Alive")
}

/// HTTP GET endpoint `/v1/greeting`
///
/// Returns a freshly generated morning greeting (sentence and emoji).
#[get("/v1/greeting")]
async fn get_greeting() -> impl Responder {
	HttpResponse::Ok().body(generate_greeting_text())
}

/// HTTP GET endpoint `/v1/checkout`
///
/// Picks an unused entry of `kind` and returns it as JSON. The entry must
/// then be committed once delivered, or released.
/// A checkout never committed nor released is taken over by the next one
/// after `lease_timeout_secs`.
#[get("/v1/checkout")]
async fn get_checkout(data: web::Data<Mutex<SharedData>>, query: web::Query<KindQuery>) -> impl Responder {
	let kind = match non_empty(&query.kind) {
		Some(k) => k,
		None => return HttpResponse::BadRequest().body("Missing or empty kind"),
	};

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Rotation lock failed"),
	};

	match shared_data.rotation.checkout(kind) {
		Ok(lease) => HttpResponse::Ok().json(lease),
		Err(e) => error_response(&e),
	}
}

/// HTTP PUT endpoint `/v1/commit`
///
/// Marks the checked out entry as used and saves the register.
#[put("/v1/commit")]
async fn put_commit(data: web::Data<Mutex<SharedData>>, query: web::Query<LeaseQuery>) -> impl Responder {
	let (kind, uid) = match (non_empty(&query.kind), query.uid) {
		(Some(k), Some(u)) => (k, u),
		_ => return HttpResponse::BadRequest().body("Missing kind or uid"),
	};

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Rotation lock failed"),
	};

	match shared_data.rotation.commit(kind, uid) {
		Ok(MarkOutcome::Added) => HttpResponse::Ok().body("Marked as used"),
		Ok(MarkOutcome::AlreadyUsed) => HttpResponse::Ok().body("Already marked as used"),
		Ok(MarkOutcome::CycleReset) => HttpResponse::Ok().body("Marked as used, catalog starts over"),
		Err(e) => error_response(&e),
	}
}

/// HTTP PUT endpoint `/v1/release`
///
/// Gives a checked out entry back without marking it (failed or test send).
#[put("/v1/release")]
async fn put_release(data: web::Data<Mutex<SharedData>>, query: web::Query<LeaseQuery>) -> impl Responder {
	let (kind, uid) = match (non_empty(&query.kind), query.uid) {
		(Some(k), Some(u)) => (k, u),
		_ => return HttpResponse::BadRequest().body("Missing kind or uid"),
	};

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Rotation lock failed"),
	};

	match shared_data.rotation.release(kind, uid) {
		Ok(()) => HttpResponse::Ok().body("Released"),
		Err(e) => error_response(&e),
	}
}

#[get("/v1/stats")]
async fn get_stats(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Rotation lock failed"),
	};
	HttpResponse::Ok().body(shared_data.rotation.summary())
}

/// HTTP GET endpoint `/v1/next_run`
///
/// Returns the planned run of a window, planning it first if needed.
/// With `advance=true` the window is planned again on the day after the
/// current plan.
#[get("/v1/next_run")]
async fn get_next_run(data: web::Data<Mutex<SharedData>>, query: web::Query<NextRunQuery>) -> impl Responder {
	let name = match non_empty(&query.window) {
		Some(w) => w,
		None => return HttpResponse::BadRequest().body("Missing or empty window"),
	};
	let advance = query.advance.unwrap_or(false);

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Board lock failed"),
	};

	let window = match shared_data.config.window(name) {
		Ok(w) => *w,
		Err(e) => return error_response(&e),
	};

	let current = shared_data.board.next(name);
	let planned = match (current, advance) {
		(Some(at), false) => Ok(at),
		(Some(at), true) => shared_data.board.plan(name, &window, at, false),
		(None, _) => shared_data.board.plan(name, &window, Local::now().naive_local(), true),
	};

	match planned {
		Ok(at) => HttpResponse::Ok().body(at.format("%Y-%m-%d %H:%M:%S").to_string()),
		Err(e) => error_response(&e),
	}
}

/// Main entry point for the server.
///
/// Loads the configuration, the catalogs and the usage register, plans
/// every configured window, then starts the Actix-web HTTP server.
///
/// # Notes
/// - The configuration path comes from `RS_GREET_CONFIG` (default
///   `config.yaml`); a missing file means default settings.
/// - `RUST_LOG` controls the log level.
#[actix_web::main]
async fn main() -> io::Result<()> {
	env_logger::init();

	let config_path = env::var(CONFIG_ENV).unwrap_or_else(|_| String::from("config.yaml"));
	let config = Config::load_or_default(&config_path).map_err(io::Error::other)?;
	let rotation = Rotation::open(&config).map_err(io::Error::other)?;
	info!("{}", rotation.summary());

	let mut board = ScheduleBoard::new();
	let now = Local::now().naive_local();
	for (name, window) in &config.windows {
		if let Err(e) = board.plan(name, window, now, true) {
			warn!("Could not plan '{name}': {e}");
		}
	}

	let bind = (config.server.host.clone(), config.server.port);
	let shared_data = SharedData { config, rotation, board };
	let shared_data = web::Data::new(Mutex::new(shared_data));

	info!("Listening on {}:{}", bind.0, bind.1);
	HttpServer::new(move || {
		App::new()
			.app_data(shared_data.clone())
			.service(get_health)
			.service(get_greeting)
			.service(get_checkout)
			.service(put_commit)
			.service(put_release)
			.service(get_stats)
			.service(get_next_run)
	})
		.bind(bind)?
		.run()
		.await
}
