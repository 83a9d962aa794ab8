pub mod pages;

use crate::application::{ModelHandle, PredictionInput, PredictionUseCase, TrainingUseCase};
use crate::application::use_cases::sample_dataset::SAMPLE_CSV;
use crate::domain::error::AppError;
use crate::domain::feature_row::FieldValue;
use crate::domain::schema::SchemaPreset;
use crate::infrastructure::bootstrap::AppContext;
use actix_cors::Cors;
use actix_multipart::form::tempfile::TempFile;
use actix_multipart::form::{MultipartForm, MultipartFormConfig};
use actix_web::http::{header, StatusCode};
use actix_web::{dev::Server, get, post, web, App, HttpRequest, HttpResponse, HttpServer, Responder};
use chrono::Local;
use pages::Flash;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub training: Arc<TrainingUseCase>,
    pub prediction: Arc<PredictionUseCase>,
    pub models: Arc<ModelHandle>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

impl HttpState {
    pub fn from_context(ctx: &AppContext) -> Self {
        Self {
            training: ctx.training.clone(),
            prediction: ctx.prediction.clone(),
            models: ctx.models.clone(),
            logs: ctx.logs.clone(),
        }
    }
}

#[derive(Deserialize)]
struct FlashQuery {
    msg: Option<String>,
    err: Option<String>,
}

#[derive(MultipartForm)]
struct UploadForm {
    file: TempFile,
}

#[derive(Serialize)]
struct PredictionResponse {
    predicted_price: f64,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Serialize)]
struct SchemaInfo {
    preset: SchemaPreset,
    categorical: Vec<String>,
    numeric: Vec<String>,
    target: String,
}

#[derive(Serialize)]
struct ModelInfo {
    trained: bool,
    schema: SchemaInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    vocabulary_sizes: Option<BTreeMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    intercept: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trained_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    training_rows: Option<usize>,
}

pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::Schema { .. } | AppError::Parse(_) => StatusCode::BAD_REQUEST,
        AppError::Training { .. } | AppError::Feature(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::ModelNotFound { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AppError::ArtifactIo(_)
        | AppError::SchemaMismatch { .. }
        | AppError::Config(_)
        | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json_error(err: &AppError) -> HttpResponse {
    HttpResponse::build(status_for(err)).json(ErrorBody {
        error: err.kind(),
        message: err.to_string(),
    })
}

fn redirect_with_flash(key: &str, message: &str) -> HttpResponse {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(key, message)
        .finish();
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, format!("/?{}", query)))
        .finish()
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().content_type("text/plain").body("OK")
}

#[get("/")]
async fn index(data: web::Data<HttpState>, query: web::Query<FlashQuery>) -> impl Responder {
    let flash = match (&query.err, &query.msg) {
        (Some(err), _) => Some(Flash::Error(err.clone())),
        (None, Some(msg)) => Some(Flash::Info(msg.clone())),
        (None, None) => None,
    };
    let model = data.models.current();
    let html = pages::index_page(data.prediction.schema(), model.as_deref(), flash.as_ref());
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html)
}

#[post("/upload")]
async fn upload(data: web::Data<HttpState>, MultipartForm(form): MultipartForm<UploadForm>) -> impl Responder {
    let file_name = form.file.file_name.clone();
    add_log(
        &data.logs,
        "INFO",
        "Upload",
        &format!(
            "Received {} ({} bytes)",
            file_name.as_deref().unwrap_or("unnamed upload"),
            form.file.size
        ),
    );

    let training = data.training.clone();
    let result = web::block(move || {
        let bytes = std::fs::read(form.file.file.path())
            .map_err(|e| AppError::Internal(format!("Failed to read upload: {}", e)))?;
        training.train_upload(file_name.as_deref(), &bytes)
    })
    .await;

    match result {
        Ok(Ok(report)) => {
            add_log(&data.logs, "INFO", "Training", &report.summary());
            redirect_with_flash("msg", &report.summary())
        }
        Ok(Err(e)) => {
            add_log(&data.logs, "ERROR", "Training", &e.to_string());
            redirect_with_flash("err", &e.to_string())
        }
        Err(e) => {
            add_log(
                &data.logs,
                "ERROR",
                "Training",
                &format!("Training task failed: {}", e),
            );
            redirect_with_flash("err", "Training task failed")
        }
    }
}

#[post("/predict")]
async fn predict_form(data: web::Data<HttpState>, form: web::Form<HashMap<String, String>>) -> impl Responder {
    let input: PredictionInput = form
        .iter()
        .map(|(key, value)| {
            let value = value.trim();
            let value = (!value.is_empty()).then(|| FieldValue::Text(value.to_string()));
            (key.clone(), value)
        })
        .collect();

    match data.prediction.predict(&input) {
        Ok(prediction) => {
            let schema = data.prediction.schema();
            let shown: Vec<(String, String)> = schema
                .feature_names()
                .into_iter()
                .map(|field| {
                    let value = form.get(&field).cloned().unwrap_or_default();
                    (field, value)
                })
                .collect();
            HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(pages::result_page(&shown, prediction.price))
        }
        Err(e) => {
            add_log(&data.logs, "WARN", "Predict", &e.to_string());
            HttpResponse::build(status_for(&e))
                .content_type("text/html; charset=utf-8")
                .body(pages::error_page(&e.to_string()))
        }
    }
}

#[post("/predict")]
async fn api_predict(data: web::Data<HttpState>, body: web::Json<PredictionInput>) -> impl Responder {
    match data.prediction.predict(&body) {
        Ok(prediction) => HttpResponse::Ok().json(PredictionResponse {
            predicted_price: pages::round_price(prediction.price),
        }),
        Err(e) => {
            add_log(&data.logs, "WARN", "HttpApi", &e.to_string());
            json_error(&e)
        }
    }
}

#[get("/model")]
async fn model_info(data: web::Data<HttpState>) -> impl Responder {
    let schema = data.prediction.schema();
    let mut info = ModelInfo {
        trained: false,
        schema: SchemaInfo {
            preset: schema.preset,
            categorical: schema.categorical.clone(),
            numeric: schema.numeric.clone(),
            target: schema.target.clone(),
        },
        vocabulary_sizes: None,
        intercept: None,
        trained_at: None,
        training_rows: None,
    };

    match data.prediction.model() {
        Ok(trained) => {
            info.trained = true;
            info.vocabulary_sizes = Some(
                trained
                    .model
                    .encoder()
                    .vocabularies()
                    .iter()
                    .map(|v| (v.field.clone(), v.len()))
                    .collect(),
            );
            info.intercept = Some(trained.model.intercept());
            info.trained_at = Some(trained.manifest.trained_at.to_rfc3339());
            info.training_rows = Some(trained.manifest.training_rows);
            HttpResponse::Ok().json(info)
        }
        Err(AppError::ModelNotFound { .. }) => HttpResponse::Ok().json(info),
        Err(e) => json_error(&e),
    }
}

#[get("/sample.csv")]
async fn sample_csv() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"sample.csv\"",
        ))
        .body(SAMPLE_CSV)
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data.logs.lock().unwrap_or_else(PoisonError::into_inner);
    HttpResponse::Ok().json(&*logs)
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| {
        let parse = AppError::Parse(err.to_string());
        actix_web::error::InternalError::from_response(err, json_error(&parse)).into()
    })
}

fn multipart_config(max_upload_bytes: usize) -> MultipartFormConfig {
    MultipartFormConfig::default()
        .total_limit(max_upload_bytes)
        .memory_limit(max_upload_bytes)
        .error_handler(|err, _req: &HttpRequest| {
            let message = format!("Upload rejected: {}", err);
            actix_web::error::InternalError::from_response(err, redirect_with_flash("err", &message))
                .into()
        })
}

/// Routes shared by the server and the handler tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(index)
        .service(upload)
        .service(predict_form)
        .service(sample_csv)
        .service(
            web::scope("/api")
                .wrap(Cors::permissive())
                .service(api_predict)
                .service(model_info)
                .service(get_logs),
        );
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    match level {
        "ERROR" => tracing::error!(source, "{}", message),
        "WARN" => tracing::warn!(source, "{}", message),
        _ => tracing::info!(source, "{}", message),
    }

    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap_or_else(PoisonError::into_inner);
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

pub fn start_server(ctx: &AppContext) -> std::io::Result<Server> {
    let state = web::Data::new(HttpState::from_context(ctx));
    let max_upload_bytes = ctx.config.server.max_upload_bytes;
    let host = ctx.config.server.host.clone();
    let port = ctx.config.server.port;

    add_log(
        &ctx.logs,
        "INFO",
        "HttpApi",
        &format!("Listening on http://{}:{}", host, port),
    );

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(json_config())
            .app_data(multipart_config(max_upload_bytes))
            .configure(routes)
    })
    .bind((host.as_str(), port))?
    .run();

    Ok(server)
}
