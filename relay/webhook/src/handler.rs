use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::web::{self, Data};
use actix_web::{error, http, HttpRequest, HttpResponse, Responder, Scope};
use futures_util::TryStreamExt;
use hookrelay_mapper_common::Mapper;
use hookrelay_mapper_structure::EventMapper;
use hookrelay_sink_common::Sink;
use log::*;
use thiserror::Error;

use crate::dispatch::{DispatchGate, DispatchOutcome};

const PAYLOAD_FIELD: &str = "payload";

/// Read-only per-process state handed to the request handlers: the mapper and
/// the dispatch gate, built once at startup and cloned per worker, never
/// mutated afterwards.
pub struct RelayContext<S: Sink> {
    pub mapper: EventMapper,
    pub gate: DispatchGate<S>,
}

impl<S: Sink> Clone for RelayContext<S> {
    fn clone(&self) -> Self {
        RelayContext { mapper: self.mapper.clone(), gate: self.gate.clone() }
    }
}

pub fn create_app<S: Sink + 'static>(context: RelayContext<S>) -> Scope {
    web::scope("").app_data(Data::new(context)).service(
        web::resource("/")
            .route(web::get().to(liveness))
            .route(web::post().to(handle::<S>)),
    )
}

async fn liveness() -> impl Responder {
    format!("{} is up and running!", env!("CARGO_PKG_NAME"))
}

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("The request body cannot be read: {message}")]
    BodyReadError { message: String },
    #[error("The payload cannot be processed: {message}")]
    PayloadParseError { message: String },
}

impl error::ResponseError for HandlerError {
    fn error_response(&self) -> HttpResponse {
        match self {
            HandlerError::BodyReadError { .. } => HttpResponse::new(http::StatusCode::BAD_REQUEST),
            HandlerError::PayloadParseError { .. } => {
                HttpResponse::new(http::StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

async fn handle<S: Sink + 'static>(
    req: HttpRequest,
    body: Multipart,
    context: Data<RelayContext<S>>,
) -> Result<String, HandlerError> {
    debug!("Received webhook call. user-agent: {:?}", req.headers().get(header::USER_AGENT));

    let raw_payload = read_payload_field(body).await?;

    let record = match &raw_payload {
        Some(payload) => context.mapper.to_record(payload.as_str()).map_err(|err| {
            error!("Cannot process the received payload. Err: {}", err);
            HandlerError::PayloadParseError { message: err.to_string() }
        })?,
        None => context.mapper.record(None),
    };

    debug!("event.name: {:?}", record.name());
    debug!("event.user: {:?}", record.user());
    debug!("event.data: {:?}", record.data());

    match context.gate.dispatch(record) {
        DispatchOutcome::Forwarded => Ok("forwarded".to_owned()),
        DispatchOutcome::Skipped => Ok("skipped".to_owned()),
    }
}

/// Extracts the `payload` form field from the multipart body. A body without
/// that field yields None, which the mapper degrades to the empty record.
/// Every field is drained so the next one can be polled.
async fn read_payload_field(mut body: Multipart) -> Result<Option<String>, HandlerError> {
    let mut payload = None;
    while let Some(mut field) = body.try_next().await.map_err(body_read_error)? {
        let wanted = payload.is_none() && field.name() == PAYLOAD_FIELD;
        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(body_read_error)? {
            if wanted {
                bytes.extend_from_slice(&chunk);
            }
        }
        if wanted {
            let text = String::from_utf8(bytes).map_err(|err| HandlerError::BodyReadError {
                message: format!("The payload field is not valid utf-8. Err: {:?}", err),
            })?;
            payload = Some(text);
        }
    }
    Ok(payload)
}

fn body_read_error(err: actix_multipart::MultipartError) -> HandlerError {
    HandlerError::BodyReadError { message: err.to_string() }
}
