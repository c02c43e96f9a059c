//! The user-facing JSON web server. Accepts a person photo and a clothing
//! photo, prepares both, and asks the prediction provider for the composite.

use super::protocol::{HealthResponse, TryOnResponse};
use super::{AppState, WebError, MISSING_IMAGES, NO_FILES_SELECTED};
use crate::constants::SERVICE_NAME;
use crate::normalize::{normalize, NormalizeError, NormalizedImage};
use actix_multipart::{Multipart, MultipartError};
use actix_web::http::header::ContentType;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use anyhow::anyhow;
use futures_util::StreamExt as _;
use std::collections::HashMap;
use tracing::{error, info, warn};

type Result<T> = std::result::Result<T, WebError>;

const PERSON_FIELD: &str = "person_image";
const CLOTHING_FIELD: &str = "clothing_image";

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// A file part of the multipart form
struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// Register every route on an actix `App`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index).service(health).service(virtual_tryon);
}

#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(INDEX_HTML)
}

#[get("/health")]
pub async fn health() -> impl Responder {
    web::Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
    })
}

#[post("/virtual-tryon")]
pub async fn virtual_tryon(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    // Built by hand so a non-multipart body reaches `read_uploads` instead of
    // being rejected by the extractor
    let payload = Multipart::new(req.headers(), payload);
    match try_on(payload, &state).await {
        Ok(response) => Ok(web::Json(response)),
        Err(err) => {
            error!("error in virtual try-on: {err}");
            Err(err)
        }
    }
}

async fn try_on(payload: Multipart, state: &AppState) -> Result<TryOnResponse> {
    let mut uploads = read_uploads(payload).await?;

    let person = uploads.remove(PERSON_FIELD);
    let clothing = uploads.remove(CLOTHING_FIELD);
    let (person, clothing) = match (person, clothing) {
        (Some(person), Some(clothing)) => (person, clothing),
        _ => return Err(WebError::Validation(MISSING_IMAGES)),
    };
    if person.filename.is_empty() || clothing.filename.is_empty() {
        return Err(WebError::Validation(NO_FILES_SELECTED));
    }

    let (person, clothing) = normalize_pair(person, clothing).await?;

    let token = state.tokens.access_token().await.map_err(|err| {
        warn!("error getting access token: {err}");
        WebError::Auth
    })?;

    info!(
        "requesting try-on from {} (person {}x{}, clothing {}x{})",
        state.predictor.endpoint(),
        person.width(),
        person.height(),
        clothing.width(),
        clothing.height()
    );
    let image = state.predictor.predict(&person, &clothing, &token).await?;

    Ok(TryOnResponse::from_base64(&image))
}

/// Normalize both uploads on the blocking pool
async fn normalize_pair(
    person: Upload,
    clothing: Upload,
) -> Result<(NormalizedImage, NormalizedImage)> {
    let normalized = web::block(move || {
        let person = normalize(&person.bytes);
        let clothing = normalize(&clothing.bytes);
        Ok::<_, NormalizeError>((person?, clothing?))
    })
    .await
    .map_err(|err| anyhow!("image worker failed: {err}"))?;

    normalized.map_err(|err| {
        warn!("error processing image: {err}");
        WebError::ImageProcessing
    })
}

/// What to do with a form that stops parsing part way through
enum Malformed {
    /// Keep the parts read so far
    Stop,
    /// The whole body is unusable
    Discard,
}

fn malformed(err: &MultipartError) -> Option<Malformed> {
    match err {
        MultipartError::NoContentType
        | MultipartError::ParseContentType
        | MultipartError::Boundary
        | MultipartError::NoContentDisposition
        | MultipartError::Nested => Some(Malformed::Stop),
        MultipartError::Incomplete | MultipartError::Parse(_) => Some(Malformed::Discard),
        _ => None,
    }
}

/// Collect the file parts of the form by field name. Parts without a
/// `filename` are plain form values and are skipped, and only the first part
/// of a given name is kept. A body that is not multipart, or is cut short,
/// yields no uploads; payload I/O errors are propagated.
async fn read_uploads(mut payload: Multipart) -> Result<HashMap<String, Upload>> {
    let mut uploads = HashMap::new();

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(field) => field,
            Err(err) => match malformed(&err) {
                Some(Malformed::Stop) => break,
                Some(Malformed::Discard) => return Ok(HashMap::new()),
                None => return Err(err.into()),
            },
        };

        let disposition = field.content_disposition();
        let name = disposition.get_name().map(str::to_owned);
        let filename = disposition.get_filename().map(str::to_owned);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            match chunk {
                Ok(chunk) => bytes.extend_from_slice(&chunk),
                Err(err) if malformed(&err).is_some() => {
                    warn!("discarding malformed form: {err}");
                    return Ok(HashMap::new());
                }
                Err(err) => return Err(err.into()),
            }
        }

        if let (Some(name), Some(filename)) = (name, filename) {
            uploads.entry(name).or_insert(Upload { filename, bytes });
        }
    }

    Ok(uploads)
}
