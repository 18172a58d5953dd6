//! RPC Method Handlers
//!
//! Each method is one engine verb. A missing queue is reported as NOT_FOUND.

use crate::error::to_rpc_error;
use crate::types::{
    CreateRequest, FinishResponse, NextResponse, QueueRequest, QueueView, StartRequest,
    StartResponse, ToggleRequest, ToggleResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use roster_core::application::{Lookup, QueueEngine};
use std::borrow::Cow;
use std::time::Duration;
use tracing::debug;

type RpcResult<T> = Result<T, ErrorObjectOwned>;

/// RPC Handler with injected engine
pub struct RpcHandler {
    engine: QueueEngine,
}

impl RpcHandler {
    pub fn new(engine: QueueEngine) -> Self {
        Self { engine }
    }

    /// Engine honouring the caller's deadline, if any
    fn engine(&self, timeout_ms: Option<u64>) -> Cow<'_, QueueEngine> {
        match timeout_ms {
            Some(ms) => Cow::Owned(self.engine.with_timeout(Duration::from_millis(ms))),
            None => Cow::Borrowed(&self.engine),
        }
    }

    /// queue.create.v1
    pub async fn create(&self, params: CreateRequest) -> RpcResult<QueueView> {
        let queue = self
            .engine(params.timeout_ms)
            .create(&params.queue_id, &params.description)
            .await
            .map_err(to_rpc_error)?;
        Ok(QueueView::from(&queue))
    }

    /// queue.toggle.v1
    pub async fn toggle(&self, params: ToggleRequest) -> RpcResult<ToggleResponse> {
        let participant = params.participant();
        let change = self
            .engine(params.timeout_ms)
            .toggle(&params.queue_id, &participant)
            .await
            .map_err(to_rpc_error)?;
        let change = found(change, &params.queue_id)?;

        Ok(ToggleResponse {
            outcome: change.outcome,
            queue: QueueView::from(&change.queue),
        })
    }

    /// queue.get.v1
    pub async fn get(&self, params: QueueRequest) -> RpcResult<QueueView> {
        let queue = self
            .engine(params.timeout_ms)
            .snapshot(&params.queue_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(QueueView::from(&found(queue, &params.queue_id)?))
    }

    /// queue.start.v1
    pub async fn start(&self, params: StartRequest) -> RpcResult<StartResponse> {
        let report = self
            .engine(params.timeout_ms)
            .start(&params.queue_id, params.shuffle)
            .await
            .map_err(to_rpc_error)?;
        let report = found(report, &params.queue_id)?;

        Ok(StartResponse {
            outcome: report.outcome,
            queue: QueueView::from(&report.queue),
        })
    }

    /// queue.next.v1
    pub async fn next(&self, params: QueueRequest) -> RpcResult<NextResponse> {
        let step = self
            .engine(params.timeout_ms)
            .next(&params.queue_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(NextResponse::from(&found(step, &params.queue_id)?))
    }

    /// queue.menu.v1
    pub async fn menu(&self, params: QueueRequest) -> RpcResult<QueueView> {
        let queue = self
            .engine(params.timeout_ms)
            .go_to_menu(&params.queue_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(QueueView::from(&found(queue, &params.queue_id)?))
    }

    /// queue.finish.v1
    pub async fn finish(&self, params: QueueRequest) -> RpcResult<FinishResponse> {
        let finished = self
            .engine(params.timeout_ms)
            .finish(&params.queue_id)
            .await
            .map_err(to_rpc_error)?;
        found(finished, &params.queue_id)?;

        Ok(FinishResponse {
            queue_id: params.queue_id,
            finished: true,
        })
    }
}

fn found<T>(lookup: Lookup<T>, queue_id: &str) -> RpcResult<T> {
    lookup.into_result(queue_id).map_err(|e| {
        debug!(queue_id = %queue_id, "Queue not available");
        to_rpc_error(e)
    })
}
