// Request dispatch: maps protocol requests onto pick pool operations.

use chrono::Utc;
use pickpool_core::import::import_picks_csv;
use pickpool_core::{EventLog, PickPool, PoolResult};
use serde_json::json;
use tracing::{debug, warn};

use crate::protocol::{Request, Response};

/// Execute one request against the pool. Failures become `ok: false`
/// responses; nothing here panics on bad input.
pub fn handle_request<L: EventLog>(pool: &PickPool<L>, request: Request) -> Response {
    let op = request.op();
    debug!("Handling {} request", op);
    match dispatch(pool, request) {
        Ok(response) => response,
        Err(e) => {
            warn!("{} failed: {}", op, e);
            Response::failure(e.to_string())
        }
    }
}

/// Parse and execute one line of client input.
pub fn handle_line<L: EventLog>(pool: &PickPool<L>, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => handle_request(pool, request),
        Err(e) => {
            warn!("Rejected malformed request: {}", e);
            Response::failure(format!("invalid request: {e}"))
        }
    }
}

fn dispatch<L: EventLog>(pool: &PickPool<L>, request: Request) -> PoolResult<Response> {
    let now = Utc::now();
    let response = match request {
        Request::SubmitPick(req) => {
            let stored = pool.submit_pick(
                &req.week,
                &req.picker,
                &req.game_key,
                req.fields,
                req.timestamp.unwrap_or(now),
            )?;
            Response::success(&stored)
        }
        Request::SetCleared(req) => {
            let status = pool.set_cleared(
                &req.week,
                &req.picker,
                req.cleared,
                req.timestamp.unwrap_or(now),
            )?;
            Response::success(&json!({ "status": status }))
        }
        Request::UpsertSpread(req) => {
            let status = pool.upsert_spread(req.update, req.timestamp.unwrap_or(now))?;
            Response::success(&json!({ "status": status }))
        }
        Request::UpsertResult(req) => {
            let graded = pool.upsert_result(req.update, req.timestamp.unwrap_or(now))?;
            Response::success(&json!({ "graded": graded }))
        }
        Request::GetCurrentPicks { week, picker } => {
            Response::success(&pool.get_current_picks(&week, &picker)?)
        }
        Request::GetAllCurrentPicks => Response::success(&pool.get_all_current_picks()?),
        Request::GetSpreads { week } => Response::success(&pool.get_spreads(&week)?),
        Request::GetResults { week } => Response::success(&pool.get_results(&week)?),
        Request::GetAllResults => Response::success(&pool.get_all_results()?),
        Request::Standings { week } => Response::success(&pool.standings(&week)?),
        Request::RegradeWeek { week } => {
            let graded = pool.regrade_week(&week)?;
            Response::success(&json!({ "graded": graded }))
        }
        Request::ImportPicksCsv { csv } => {
            Response::success(&import_picks_csv(pool, csv.as_bytes())?)
        }
    };
    Ok(response)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
