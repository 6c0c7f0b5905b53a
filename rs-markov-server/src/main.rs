use std::path::PathBuf;
use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::{get, put, web, App, HttpResponse, HttpServer, Responder};

use serde::Deserialize;
use rs_markov_core::io::{corpus_path, data_dir, list_corpora, read_corpus};
use rs_markov_core::model::markov::MarkovModel;
use rs_markov_core::model::options::{GenerateOptions, MarkovOptions, Seed};
use rs_markov_core::MarkovError;

/// Server configuration, read from the environment
struct Config {
	addr: String,
	data_dir: PathBuf,
	order: usize,
}

impl Config {
	/// - `MARKOV_ADDR` (default `127.0.0.1:5000`)
	/// - `MARKOV_DATA_DIR` (default `./data`)
	/// - `MARKOV_ORDER` (default `3`)
	fn from_env() -> Result<Self, String> {
		let addr = std::env::var("MARKOV_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".to_owned());
		let data_dir = data_dir(&std::env::var("MARKOV_DATA_DIR").unwrap_or_else(|_| "./data".to_owned()));
		let order = match std::env::var("MARKOV_ORDER") {
			Ok(value) => value.parse::<usize>().map_err(|_| format!("MARKOV_ORDER must be an integer, got {value}"))?,
			Err(_) => 3,
		};
		Ok(Self { addr, data_dir, order })
	}
}

/// Query parameters of the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	count: Option<usize>,
	min_length: Option<usize>,
	max_length: Option<usize>,
	temperature: Option<f64>,
	allow_duplicates: Option<bool>,
	seed: Option<String>,
	rng_seed: Option<u64>,
}

impl GenerateParams {
	fn options(&self) -> GenerateOptions {
		let defaults = GenerateOptions::default();
		GenerateOptions {
			min_length: self.min_length.unwrap_or(defaults.min_length),
			max_length: self.max_length.unwrap_or(defaults.max_length),
			temperature: self.temperature,
			allow_duplicates: self.allow_duplicates.unwrap_or(false),
			seed: self.seed.as_deref().filter(|s| !s.trim().is_empty()).map(Seed::from),
			rng_seed: self.rng_seed,
		}
	}
}

#[derive(Deserialize)]
struct ProbabilityParams {
	path: String,
	temperature: Option<f64>,
}

#[derive(Deserialize)]
struct CompletionParams {
	pre: String,
	post: Option<String>,
}

#[derive(Deserialize)]
struct ModelQuery {
	names: Option<String>,
	n: Option<usize>,
	max_length_match: Option<usize>,
}

struct SharedData {
	model: MarkovModel,
	model_names: Vec<String>,
	config: Config,
}

/// Maps a model error to a response.
///
/// Configuration errors are the caller's fault, exhaustion means the
/// constraints could not be met with the loaded text.
fn error_response(error: MarkovError) -> HttpResponse {
	log::warn!("request failed: {error}");
	match error {
		e if e.is_exhaustion() => HttpResponse::UnprocessableEntity().body(e.to_string()),
		e @ (MarkovError::Io(_) | MarkovError::Json(_) | MarkovError::Postcard(_)) => {
			HttpResponse::InternalServerError().body(e.to_string())
		}
		e => HttpResponse::BadRequest().body(e.to_string()),
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Returns one sentence as plain text, or a JSON list when `count > 1`.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<Mutex<SharedData>>, query: web::Query<GenerateParams>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	let options = query.options();
	match query.count.unwrap_or(1) {
		1 => match shared_data.model.generate(&options) {
			Ok(sentence) => HttpResponse::Ok().body(sentence),
			Err(e) => error_response(e),
		},
		count => match shared_data.model.generate_many(count, &options) {
			Ok(sentences) => HttpResponse::Ok().json(sentences),
			Err(e) => error_response(e),
		},
	}
}

#[get("/v1/probabilities")]
async fn get_probabilities(data: web::Data<Mutex<SharedData>>, query: web::Query<ProbabilityParams>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	let path = shared_data.model.tokenizer().tokenize(&query.path);
	match shared_data.model.probabilities(&path, query.temperature) {
		Ok(probabilities) => HttpResponse::Ok().json(probabilities),
		Err(e) => error_response(e),
	}
}

#[get("/v1/completions")]
async fn get_completions(data: web::Data<Mutex<SharedData>>, query: web::Query<CompletionParams>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	let tokenizer = shared_data.model.tokenizer();
	let pre = tokenizer.tokenize(&query.pre);
	let post = query.post.as_deref().map(|post| tokenizer.tokenize(post));
	match shared_data.model.completions(&pre, post.as_deref()) {
		Ok(tokens) => HttpResponse::Ok().json(tokens),
		Err(e) => error_response(e),
	}
}

#[get("/v1/size")]
async fn get_size(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	match data.lock() {
		Ok(shared_data) => HttpResponse::Ok().body(shared_data.model.size().to_string()),
		Err(_) => HttpResponse::InternalServerError().body("Model lock failed"),
	}
}

/// Dumps the loaded model as JSON
#[get("/v1/export")]
async fn get_export(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	match shared_data.model.to_json() {
		Ok(json) => HttpResponse::Ok().content_type("application/json").body(json),
		Err(e) => error_response(e),
	}
}

#[get("/v1/models")]
async fn get_models(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	match list_corpora(&shared_data.config.data_dir) {
		Ok(names) => HttpResponse::Ok().body(names.join("\n")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list models"),
	}
}

#[get("/v1/loaded_models")]
async fn get_loaded_models(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	HttpResponse::Ok().body(shared_data.model_names.join("\n"))
}

/// HTTP PUT endpoint `/v1/load_models`
///
/// Trains a fresh model on the given comma separated corpus names.
#[put("/v1/load_models")]
async fn put_model(data: web::Data<Mutex<SharedData>>, query: web::Query<ModelQuery>) -> impl Responder {
	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	let query_names = match &query.names {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty model name"),
	};

	let model_names: Vec<&str> = query_names
		.split(',')
		.map(|s| s.trim())
		.filter(|s| !s.is_empty())
		.collect();

	let options = MarkovOptions {
		max_length_match: query.max_length_match,
		..Default::default()
	};
	let n = query.n.unwrap_or(shared_data.config.order);
	let mut model = match MarkovModel::with_options(n, options) {
		Ok(m) => m,
		Err(e) => return error_response(e),
	};

	for name in &model_names {
		let path = corpus_path(&shared_data.config.data_dir, name);
		let sentences = match read_corpus(&path, model.tokenizer()) {
			Ok(sentences) => sentences,
			Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to load model: {e}")),
		};
		model.add_sentences(&sentences, 1);
	}

	log::info!("loaded {:?} (n = {}, {} tokens)", model_names, n, model.size());
	shared_data.model = model;
	shared_data.model_names = model_names.iter().map(|s| s.to_string()).collect();

	HttpResponse::Ok().body("Models loaded successfully")
}

/// Main entry point for the server.
///
/// Starts with an empty model, wrapped in a `Mutex`; corpora are loaded
/// through `/v1/load_models`.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let config = Config::from_env().map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
	let addr = config.addr.clone();
	let model = MarkovModel::new(config.order)
		.map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

	log::info!("serving {} on {}", config.data_dir.display(), addr);
	let shared_data = SharedData {
		model,
		model_names: Vec::new(),
		config,
	};
	let shared_model = web::Data::new(Mutex::new(shared_data));

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_model.clone())
			.service(get_generated)
			.service(get_probabilities)
			.service(get_completions)
			.service(get_size)
			.service(get_export)
			.service(get_models)
			.service(put_model)
			.service(get_loaded_models)
	})
		.bind(addr)?
		.run()
		.await
}
