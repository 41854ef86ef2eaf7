use crate::io_struct::{ChatReqInput, LeadReqInput};
use crate::relay_state::{LeadOutcome, RelayConfig, RelayState, extract_reply, truncate_chars};
use actix_web::{HttpRequest, HttpResponse, HttpServer, get, post, web};
use serde_json::json;
use std::io::Write;

/// Raw upstream text longer than this is cut before being echoed back in
/// a `groq_failed` body.
const ERROR_BODY_LIMIT: usize = 500;

#[get("/health")]
pub async fn health(_req: HttpRequest, _: web::Data<RelayState>) -> HttpResponse {
    HttpResponse::Ok().body("Ok")
}

/// Single-message chat relay: parse, check the credential, one upstream
/// call, reshape. Every response body here is part of the contract.
#[post("/api/groq-proxy")]
pub async fn groq_proxy(body: web::Bytes, state: web::Data<RelayState>) -> HttpResponse {
    let input: ChatReqInput = match serde_json::from_slice(&body) {
        Ok(input) => input,
        Err(_) => {
            return HttpResponse::BadRequest().json(json!({"error": "invalid json"}));
        }
    };

    let Some(key) = state.config.api_key.as_deref() else {
        return HttpResponse::InternalServerError().json(json!({"error": "GROQ_API_KEY not set"}));
    };

    let payload = state.chat_payload(input.message);
    let resp = match state.complete(key, &payload).await {
        Ok(resp) => resp,
        Err(e) if e.is_timeout() => {
            log::error!("upstream timed out: {}", e);
            return HttpResponse::GatewayTimeout().json(json!({"error": "groq_timeout"}));
        }
        Err(e) => {
            log::error!("upstream unreachable: {}", e);
            return HttpResponse::BadGateway().json(json!({"error": "groq_unreachable"}));
        }
    };

    // The status is deliberately not checked: an upstream error body is
    // valid JSON without choices and surfaces as groq_failed below.
    let raw = match resp.text().await {
        Ok(raw) => raw,
        Err(e) if e.is_timeout() => {
            log::error!("upstream body timed out: {}", e);
            return HttpResponse::GatewayTimeout().json(json!({"error": "groq_timeout"}));
        }
        Err(e) => {
            log::error!("upstream body unreadable: {}", e);
            return HttpResponse::BadGateway().json(json!({"error": "groq_unreachable"}));
        }
    };

    match extract_reply(&raw) {
        Some(reply) => HttpResponse::Ok()
            .content_type("application/json; charset=utf-8")
            .body(json!({"reply": reply}).to_string()),
        None => HttpResponse::InternalServerError().json(json!({
            "error": "groq_failed",
            "body": truncate_chars(&raw, ERROR_BODY_LIMIT),
        })),
    }
}

/// Lead classification with model fallback. An unparseable body counts as
/// an empty one, so the missing-field error covers it too.
#[post("/api/groq-proxy-leads")]
pub async fn groq_proxy_leads(body: web::Bytes, state: web::Data<RelayState>) -> HttpResponse {
    let text = serde_json::from_slice::<LeadReqInput>(&body)
        .ok()
        .and_then(|input| input.text)
        .unwrap_or_default();
    if text.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({"error": "Field \"text\" is required"}));
    }

    let Some(key) = state.config.api_key.as_deref() else {
        return HttpResponse::InternalServerError().json(json!({"error": "GROQ_API_KEY not set"}));
    };

    match state.classify_lead(key, &text).await {
        LeadOutcome::Verdict { model, verdict } => HttpResponse::Ok().json(json!({
            "ok": true,
            "model": model,
            "is_lead": verdict.is_lead,
            "summary": verdict.summary,
            "reason": verdict.reason,
        })),
        LeadOutcome::Raw { model, content } => HttpResponse::Ok().json(json!({
            "ok": true,
            "model": model,
            "raw": content,
            "is_lead": false,
            "summary": "LLM response not in JSON format",
            "reason": "Failed to parse JSON from model response",
        })),
        LeadOutcome::Exhausted => HttpResponse::ServiceUnavailable().json(json!({
            "ok": false,
            "error": "All Groq models failed or hit rate limits",
        })),
    }
}

pub async fn startup(config: RelayConfig, state: RelayState) -> std::io::Result<()> {
    let app_state = web::Data::new(state);

    println!("Starting server at {}:{}", config.host, config.port);

    // default level is info
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, log::LevelFilter::Info)
        .init();

    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .service(health)
            .service(groq_proxy)
            .service(groq_proxy_leads)
    })
    .bind((config.host, config.port))?
    .run()
    .await?;

    std::io::Result::Ok(())
}
