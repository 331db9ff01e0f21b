use std::path::Path;
use std::sync::{Arc, RwLock};

use actix_cors::Cors;
use actix_web::{get, middleware, put, web, App, HttpResponse, HttpServer, Responder};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use rs_spell_core::io::{list_files, Tokenizer};
use rs_spell_core::{CorrectionResult, CorrectorConfig, ModelConfig, NoisyChannelCorrector, SpellModel};

const DATA_FOLDER: &str = "./data";
const DEFAULT_MODEL: &str = "english";
const DEFAULT_GENERATE_LENGTH: usize = 20;
const MAX_GENERATE_LENGTH: usize = 200;

/// Query parameters of the `/v1/correct` endpoint
#[derive(Deserialize)]
struct CorrectParams {
	text: String,
	max_edit_distance: Option<usize>,
	tolerance: Option<f64>,
	top_k: Option<usize>,
	check_real_words: Option<bool>,
}

#[derive(Deserialize)]
struct TextQuery {
	text: String,
}

#[derive(Deserialize)]
struct GenerateParams {
	seed: Option<String>,
	length: Option<usize>,
}

#[derive(Deserialize)]
struct ModelQuery {
	name: Option<String>,
}

#[derive(Serialize)]
struct CorrectResponse {
	corrected: Vec<String>,
	sentences: Vec<Vec<CorrectionResult>>,
}

/// The loaded model; requests take a clone of the `Arc` and release the lock.
struct SharedData {
	model: RwLock<Option<Arc<SpellModel>>>,
}

impl SharedData {
	fn model(&self) -> Result<Arc<SpellModel>, HttpResponse> {
		match self.model.read() {
			Ok(guard) => guard.clone().ok_or_else(|| HttpResponse::Conflict().body("No model loaded")),
			Err(_) => Err(HttpResponse::InternalServerError().body("Model lock failed")),
		}
	}
}

impl CorrectParams {
	/// Builds the corrector configuration, defaults for missing values.
	fn config(&self) -> Result<CorrectorConfig, String> {
		let mut config = CorrectorConfig::default();
		if let Some(max_edit_distance) = self.max_edit_distance {
			config.set_max_edit_distance(max_edit_distance).map_err(|e| e.to_string())?;
		}
		if let Some(tolerance) = self.tolerance {
			config.set_tolerance(tolerance).map_err(|e| e.to_string())?;
		}
		if let Some(top_k) = self.top_k {
			config.set_top_k(top_k).map_err(|e| e.to_string())?;
		}
		if let Some(check_real_words) = self.check_real_words {
			config.check_real_words = check_real_words;
		}
		Ok(config)
	}
}

/// One tokenized sentence per non-empty line of `text`.
fn sentences(text: &str) -> Result<Vec<Vec<String>>, HttpResponse> {
	let tokenizer = Tokenizer::new().map_err(|e| HttpResponse::InternalServerError().body(e.to_string()))?;
	Ok(text
		.lines()
		.map(|line| tokenizer.tokenize(line))
		.filter(|sentence| !sentence.is_empty())
		.collect())
}

/// HTTP GET endpoint `/v1/correct`
///
/// Corrects every line of `text` as a sentence and returns, as JSON, the
/// corrected sentences along with the per-word decisions.
#[get("/v1/correct")]
async fn get_corrected(data: web::Data<SharedData>, query: web::Query<CorrectParams>) -> impl Responder {
	let config = match query.config() {
		Ok(c) => c,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};
	let model = match data.model() {
		Ok(m) => m,
		Err(response) => return response,
	};
	let sentences = match sentences(&query.text) {
		Ok(s) => s,
		Err(response) => return response,
	};

	let result = web::block(move || {
		let corrector = NoisyChannelCorrector::new(&model, config)?;
		corrector.correct_sentences(&sentences)
	})
	.await;
	match result {
		Ok(Ok(sentences)) => {
			let corrected = sentences
				.iter()
				.map(|results| results.iter().map(|r| r.final_word.as_str()).collect::<Vec<_>>().join(" "))
				.collect();
			HttpResponse::Ok().json(CorrectResponse { corrected, sentences })
		}
		Ok(Err(e)) => HttpResponse::BadRequest().body(e.to_string()),
		Err(_) => HttpResponse::InternalServerError().body("Correction was interrupted"),
	}
}

/// HTTP GET endpoint `/v1/score`
///
/// Returns the natural-log likelihood of every line of `text`, one per line.
#[get("/v1/score")]
async fn get_score(data: web::Data<SharedData>, query: web::Query<TextQuery>) -> impl Responder {
	let model = match data.model() {
		Ok(m) => m,
		Err(response) => return response,
	};
	let sentences = match sentences(&query.text) {
		Ok(s) => s,
		Err(response) => return response,
	};

	let corrector = match NoisyChannelCorrector::new(&model, CorrectorConfig::default()) {
		Ok(c) => c,
		Err(e) => return HttpResponse::InternalServerError().body(e.to_string()),
	};
	let mut scores = Vec::with_capacity(sentences.len());
	for sentence in &sentences {
		match corrector.score_sentence(sentence) {
			Ok(score) => scores.push(score.to_string()),
			Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
		}
	}
	HttpResponse::Ok().body(scores.join("\n"))
}

/// Requested sentence length, capped at `MAX_GENERATE_LENGTH` words.
fn generate_length(requested: Option<usize>) -> usize {
	requested.unwrap_or(DEFAULT_GENERATE_LENGTH).min(MAX_GENERATE_LENGTH)
}

/// HTTP GET endpoint `/v1/generate`
///
/// Samples a sentence from the language model, continuing `seed` if given.
/// At most `MAX_GENERATE_LENGTH` words are produced.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<SharedData>, query: web::Query<GenerateParams>) -> impl Responder {
	let model = match data.model() {
		Ok(m) => m,
		Err(response) => return response,
	};
	let seed: Vec<String> = match &query.seed {
		Some(s) => match sentences(s) {
			Ok(lines) => lines.into_iter().flatten().collect(),
			Err(response) => return response,
		},
		None => Vec::new(),
	};
	let length = generate_length(query.length);

	let generated = model.language_model().generate(&seed, length, &mut rand::rng());
	HttpResponse::Ok().body(generated.join(" "))
}

#[get("/v1/models")]
async fn get_models() -> impl Responder {
	match list_files(DATA_FOLDER, "dat") {
		Ok(files) => HttpResponse::Ok().body(files.join("\n").replace(".dat", "")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list models"),
	}
}

#[get("/v1/loaded_model")]
async fn get_loaded_model(data: web::Data<SharedData>) -> impl Responder {
	match data.model() {
		Ok(model) => HttpResponse::Ok().body(model.name().to_owned()),
		Err(response) => response,
	}
}

/// HTTP PUT endpoint `/v1/load_model`
///
/// Loads (or trains then caches) `./data/<name>.dat` and makes it the
/// model used by every following request.
#[put("/v1/load_model")]
async fn put_model(data: web::Data<SharedData>, query: web::Query<ModelQuery>) -> impl Responder {
	let name = match &query.name {
		Some(s) if !s.trim().is_empty() => s.trim().to_owned(),
		_ => return HttpResponse::BadRequest().body("Missing or empty model name"),
	};
	if name.contains(['/', '\\']) || name.starts_with('.') {
		return HttpResponse::BadRequest().body("Invalid model name");
	}

	let model_path = Path::new(DATA_FOLDER).join(format!("{name}.dat"));
	let model = match web::block(move || SpellModel::new(model_path, &ModelConfig::default())).await {
		Ok(Ok(m)) => m,
		Ok(Err(e)) => return HttpResponse::InternalServerError().body(format!("Failed to load model: {e}")),
		Err(_) => return HttpResponse::InternalServerError().body("Model loading was interrupted"),
	};

	match data.model.write() {
		Ok(mut guard) => *guard = Some(Arc::new(model)),
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	}
	info!("model {name} loaded");
	HttpResponse::Ok().body("Model loaded successfully")
}

/// Main entry point for the server.
///
/// Loads the default model when present and starts an Actix-web HTTP server.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - Set `RUST_LOG=info` (or `debug` for per-word decisions) to see logs.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let default_path = Path::new(DATA_FOLDER).join(format!("{DEFAULT_MODEL}.dat"));
	let model = if default_path.exists() {
		match SpellModel::new(&default_path, &ModelConfig::default()) {
			Ok(m) => Some(Arc::new(m)),
			Err(e) => {
				warn!("failed to load {}: {e}", default_path.display());
				None
			}
		}
	} else {
		None
	};
	let shared_data = web::Data::new(SharedData { model: RwLock::new(model) });

	info!("listening on 127.0.0.1:5000");
	HttpServer::new(move || {
		App::new()
			.wrap(middleware::Logger::default())
			.wrap(Cors::permissive())
			.app_data(shared_data.clone())
			.service(get_corrected)
			.service(get_score)
			.service(get_generated)
			.service(get_models)
			.service(get_loaded_model)
			.service(put_model)
	})
		.bind(("127.0.0.1", 5000))?
		.run()
		.await
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_generate_length() {
		assert_eq!(generate_length(None), DEFAULT_GENERATE_LENGTH);
		assert_eq!(generate_length(Some(5)), 5);
		assert_eq!(generate_length(Some(MAX_GENERATE_LENGTH)), MAX_GENERATE_LENGTH);
		assert_eq!(generate_length(Some(usize::MAX)), MAX_GENERATE_LENGTH);
	}
}
