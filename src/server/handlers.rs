use std::path::PathBuf;

use actix_web::{
    error::{InternalError, JsonPayloadError},
    web, HttpRequest, HttpResponse, Responder,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{classify_error_code, Result, WebUiError, ERROR_CODE_INVALID_INPUT},
    picker::FolderPicker,
    vault::{
        gocryptfs::FsEncryptionDriver,
        types::{InfoForm, InitForm, MountForm, Outcome, UnmountForm},
        VaultManager,
    },
};

const INDEX_HTML: &str = include_str!("assets/index.html");

/// JSON envelope returned by every `/api/*` route.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiResponse {
    /// `true` when the operation succeeded.
    pub ok: bool,
    /// Command output or success message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stable error code for failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Master key printed by `gocryptfs -init`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_key: Option<String>,
    /// Folder chosen by the picker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ApiResponse {
    fn from_outcome(outcome: Outcome) -> Self {
        Self {
            ok: true,
            output: Some(outcome.output),
            master_key: outcome.master_key,
            ..Self::default()
        }
    }

    fn from_path(path: PathBuf) -> Self {
        Self {
            ok: true,
            path: Some(path.to_string_lossy().into_owned()),
            ..Self::default()
        }
    }

    fn from_error(error: &WebUiError) -> Self {
        Self {
            ok: false,
            error: Some(error.to_string()),
            code: Some(classify_error_code(error).to_owned()),
            output: error.output().map(str::to_owned),
            ..Self::default()
        }
    }
}

type SharedManager<D, P> = web::Data<VaultManager<D, P>>;

pub(super) async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

pub(super) async fn favicon() -> impl Responder {
    HttpResponse::NoContent().finish()
}

pub(super) async fn init_handler<D, P>(
    manager: SharedManager<D, P>,
    form: web::Json<InitForm>,
) -> HttpResponse
where
    D: FsEncryptionDriver + 'static,
    P: FolderPicker + 'static,
{
    let form = form.into_inner();
    respond("init", run_blocking(manager, move |manager| manager.init(form)).await)
}

pub(super) async fn mount_handler<D, P>(
    manager: SharedManager<D, P>,
    form: web::Json<MountForm>,
) -> HttpResponse
where
    D: FsEncryptionDriver + 'static,
    P: FolderPicker + 'static,
{
    let form = form.into_inner();
    respond("mount", run_blocking(manager, move |manager| manager.mount(form)).await)
}

pub(super) async fn info_handler<D, P>(
    manager: SharedManager<D, P>,
    form: web::Json<InfoForm>,
) -> HttpResponse
where
    D: FsEncryptionDriver + 'static,
    P: FolderPicker + 'static,
{
    let form = form.into_inner();
    respond("info", run_blocking(manager, move |manager| manager.info(form)).await)
}

pub(super) async fn unmount_handler<D, P>(
    manager: SharedManager<D, P>,
    form: web::Json<UnmountForm>,
) -> HttpResponse
where
    D: FsEncryptionDriver + 'static,
    P: FolderPicker + 'static,
{
    let form = form.into_inner();
    respond(
        "unmount",
        run_blocking(manager, move |manager| manager.unmount(form)).await,
    )
}

pub(super) async fn pick_handler<D, P>(manager: SharedManager<D, P>) -> HttpResponse
where
    D: FsEncryptionDriver + 'static,
    P: FolderPicker + 'static,
{
    match run_blocking(manager, |manager| manager.pick_folder()).await {
        Ok(path) => HttpResponse::Ok().json(ApiResponse::from_path(path)),
        Err(error) => failure("pick", &error),
    }
}

/// Turns body deserialization failures into a 400 with the API envelope.
pub(super) fn json_error_handler(error: JsonPayloadError, _request: &HttpRequest) -> actix_web::Error {
    let message = format!("Invalid request body: {error}");
    debug!("{message}");
    let body = ApiResponse {
        ok: false,
        error: Some(message),
        code: Some(ERROR_CODE_INVALID_INPUT.to_owned()),
        ..ApiResponse::default()
    };
    InternalError::from_response(error, HttpResponse::BadRequest().json(body)).into()
}

async fn run_blocking<D, P, F, R>(manager: SharedManager<D, P>, operation: F) -> Result<R>
where
    D: FsEncryptionDriver + 'static,
    P: FolderPicker + 'static,
    F: FnOnce(&VaultManager<D, P>) -> Result<R> + Send + 'static,
    R: Send + 'static,
{
    web::block(move || operation(manager.get_ref()))
        .await
        .map_err(|error| WebUiError::Internal(format!("blocking task failed: {error}")))?
}

fn respond(operation: &str, result: Result<Outcome>) -> HttpResponse {
    match result {
        Ok(outcome) => HttpResponse::Ok().json(ApiResponse::from_outcome(outcome)),
        Err(error) => failure(operation, &error),
    }
}

fn failure(operation: &str, error: &WebUiError) -> HttpResponse {
    let code = classify_error_code(error);
    warn!(operation, code, "{error}");
    HttpResponse::Ok().json(ApiResponse::from_error(error))
}
