use crate::{
    context::RequestContext,
    error::{ApiError, ApiResult, Envelope},
    state::AppState,
};
use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use futures_util::{future, SinkExt, StreamExt};
use serde_json::Value;
use tracing::{info_span, warn, Instrument};
use vm_cluster::{ConsoleStream, Document, WatchStream};
use vm_orchestrator::{run_console_session, VmRequest};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/1.0/virtual-machines", get(list_vms).post(create_vm))
        // Static segment wins over `{name}`, so a VM named `watch` is only reachable
        // through the list endpoint.
        .route("/1.0/virtual-machines/watch", get(watch_vms))
        .route(
            "/1.0/virtual-machines/{name}",
            get(get_vm).put(update_vm).delete(delete_vm),
        )
        .route("/1.0/virtual-machines/{name}/vnc", get(vm_console))
}

async fn list_vms(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> ApiResult<Envelope<Vec<Document>>> {
    let vms = state.controller.find_all(&ctx.scope, ctx.state).await?;
    Ok(Envelope::ok(vms))
}

async fn create_vm(
    ctx: RequestContext,
    State(state): State<AppState>,
    body: Result<Json<VmRequest>, JsonRejection>,
) -> ApiResult<Envelope<Document>> {
    let Json(request) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let created = state.controller.create(&ctx.scope, &request).await?;
    Ok(Envelope::ok(created))
}

async fn get_vm(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Envelope<Document>> {
    let vm = state.controller.find(&ctx.scope, &name, ctx.state).await?;
    Ok(Envelope::ok(vm))
}

async fn update_vm(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Envelope<Document>> {
    let vm = state.controller.patch(&ctx.scope, &name).await?;
    Ok(Envelope::ok(vm))
}

async fn delete_vm(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Envelope<Value>> {
    state.controller.delete(&ctx.scope, &name).await?;
    Ok(Envelope::ok_empty())
}

fn require_upgrade(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> ApiResult<WebSocketUpgrade> {
    ws.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// Attach to the VM's console. The upgrade request is checked first; the console is
/// then opened before answering it, so cluster failures still come back in the
/// envelope.
async fn vm_console(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(name): Path<String>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> ApiResult<Response> {
    let ws = require_upgrade(ws)?;
    let console = state.controller.console(&ctx.scope, &name).await?;

    let span = info_span!(
        "console",
        request_id = %ctx.request_id,
        project = %ctx.project,
        name = %name,
    );
    let chunk_size = state.console_chunk_size;

    Ok(ws
        .on_upgrade(move |socket| relay_console(socket, console, chunk_size).instrument(span))
        .into_response())
}

async fn relay_console(socket: WebSocket, console: ConsoleStream, chunk_size: usize) {
    let (sender, receiver) = socket.split();

    // Binary and text frames carry console input; a close frame ends it.
    let client_rx = receiver
        .take_while(|frame| future::ready(!matches!(frame, Ok(Message::Close(_)))))
        .filter_map(|frame| {
            future::ready(match frame {
                Ok(Message::Binary(data)) => Some(Ok(data)),
                Ok(Message::Text(text)) => Some(Ok(Bytes::copy_from_slice(text.as_str().as_bytes()))),
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            })
        });
    let client_tx =
        sender.with(|chunk: Bytes| future::ready(Ok::<_, axum::Error>(Message::Binary(chunk))));

    run_console_session(Box::pin(client_rx), Box::pin(client_tx), console, chunk_size).await;
}

async fn watch_vms(
    ctx: RequestContext,
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> ApiResult<Response> {
    let ws = require_upgrade(ws)?;
    let events = state.controller.watch(&ctx.scope, ctx.state).await?;

    let span = info_span!("watch", request_id = %ctx.request_id, project = %ctx.project);
    Ok(ws
        .on_upgrade(move |socket| stream_events(socket, events).instrument(span))
        .into_response())
}

/// Forward watch events as JSON text frames until either side ends. Dropping the
/// event stream stops the watch.
async fn stream_events(socket: WebSocket, mut events: WatchStream) {
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(err) => {
                    warn!(error = %err, "watch stream failed");
                    break;
                }
            };
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    warn!(error = %err, "could not encode watch event");
                    break;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            if matches!(msg, Ok(Message::Close(_)) | Err(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}
