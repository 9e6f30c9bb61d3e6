use anyhow::Result;
use bytes::Buf;
use clap::Parser;
use csv_renamer::{RenameError, RenamedFile, Renamer, RenamerConfig, StrategyKind, Upload};
use futures_util::TryStreamExt;
use serde::Serialize;
use std::{convert::Infallible, path::PathBuf, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use warp::{
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    multipart::{FormData, Part},
    reject::Rejection,
    reply::{Reply, Response},
    Filter,
};

const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>CSV File Renamer</title></head>
<body>
<h1>CSV File Renamer</h1>
<p>Upload a CSV file and download it renamed after its test set and date range.</p>
<form action="/rename" method="post" enctype="multipart/form-data">
  <input type="file" name="file" accept=".csv" required>
  <select name="strategy">
    <option value="scan">scan labels</option>
    <option value="fixed">fixed rows</option>
  </select>
  <button type="submit">Rename</button>
</form>
</body>
</html>
"#;

#[derive(Parser, Debug)]
#[command(name = "csv-renamer", about = "Serve the CSV renaming form over HTTP")]
struct Args {
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// YAML file overriding the built-in lookup tables and date formats.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Strategy used when a request does not name one.
    #[arg(long)]
    strategy: Option<StrategyKind>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    details: Option<String>,
}

async fn health_check() -> Result<Response, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "csv-renamer"
    }))
    .into_response())
}

fn error_reply(status: StatusCode, error: &str, details: Option<String>) -> Response {
    warp::reply::with_status(
        warp::reply::json(&ErrorResponse {
            error: error.to_string(),
            details,
        }),
        status,
    )
    .into_response()
}

/// Header-safe rendition of the derived name: printable ASCII only, no quotes.
fn header_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}

fn download_reply(renamed: RenamedFile) -> Response {
    let header_name = header_file_name(&renamed.file_name);
    let reply = warp::reply::with_header(renamed.content, CONTENT_TYPE, "text/csv");
    let reply = warp::reply::with_header(
        reply,
        CONTENT_DISPOSITION,
        format!("attachment; filename=\"{header_name}\""),
    );
    warp::reply::with_header(reply, "x-renamed-file", header_name).into_response()
}

async fn read_part(part: Part) -> Result<Vec<u8>, warp::Error> {
    part.stream()
        .try_fold(Vec::new(), |mut acc, buf| async move {
            acc.extend_from_slice(buf.chunk());
            Ok::<_, warp::Error>(acc)
        })
        .await
}

async fn rename_upload(form: FormData, renamer: Arc<Renamer>) -> Result<Response, Rejection> {
    let parts: Vec<Part> = match form.try_collect().await {
        Ok(parts) => parts,
        Err(e) => {
            warn!("bad multipart body: {}", e);
            return Ok(error_reply(
                StatusCode::BAD_REQUEST,
                "Malformed upload",
                Some(e.to_string()),
            ));
        }
    };

    let mut upload: Option<Upload> = None;
    let mut strategy = renamer.default_kind();
    for part in parts {
        let name = part.name().to_string();
        let file_name = part.filename().map(str::to_string);
        let data = match read_part(part).await {
            Ok(data) => data,
            Err(e) => {
                return Ok(error_reply(
                    StatusCode::BAD_REQUEST,
                    "Malformed upload",
                    Some(e.to_string()),
                ))
            }
        };
        match name.as_str() {
            "file" => upload = Some(Upload::new(file_name, data)),
            "strategy" => match String::from_utf8_lossy(&data).parse::<StrategyKind>() {
                Ok(kind) => strategy = kind,
                Err(e) => return Ok(error_reply(StatusCode::BAD_REQUEST, "Bad strategy", Some(e))),
            },
            other => warn!(field = other, "ignoring unknown form field"),
        }
    }

    let Some(upload) = upload else {
        return Ok(error_reply(
            StatusCode::BAD_REQUEST,
            "No file uploaded",
            Some("expected a multipart field named `file`".to_string()),
        ));
    };

    info!(file = ?upload.file_name, %strategy, "rename request");
    // CSV parsing and writing are synchronous.
    let result = tokio::task::spawn_blocking(move || renamer.rename_with(&upload, strategy)).await;

    Ok(match result {
        Ok(Ok(renamed)) => download_reply(renamed),
        Ok(Err(e)) => {
            warn!("rename failed: {}", e);
            let status = match &e {
                RenameError::Load(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            error_reply(status, "Could not rename file", Some(e.to_string()))
        }
        Err(e) => error_reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Rename task failed",
            Some(e.to_string()),
        ),
    })
}

fn with_renamer(
    renamer: Arc<Renamer>,
) -> impl Filter<Extract = (Arc<Renamer>,), Error = Infallible> + Clone {
    warp::any().map(move || renamer.clone())
}

fn routes(
    renamer: Arc<Renamer>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::html(INDEX_HTML).into_response());

    let health = warp::path("health")
        .and(warp::get())
        .and_then(health_check);

    let rename = warp::path("rename")
        .and(warp::post())
        .and(warp::multipart::form().max_length(MAX_UPLOAD_BYTES))
        .and(with_renamer(renamer))
        .and_then(rename_upload);

    index.or(health).unify().or(rename).unify()
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();
    let mut config = RenamerConfig::load_or_default(args.config.as_deref())?;
    if let Some(kind) = args.strategy {
        config.strategy = kind;
    }
    let renamer = Arc::new(Renamer::new(&config));

    info!("Server starting on port {}", args.port);
    info!("Upload form: http://localhost:{}/", args.port);
    info!("Default strategy: {}", config.strategy);

    warp::serve(routes(renamer)).run(([0, 0, 0, 0], args.port)).await;

    Ok(())
}
