use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use feeflow_burner::Record;
use feeflow_collector::CollectorStatus;
use feeflow_hooks::{Cooldown, Hook, HookInput};
use feeflow_types::{Amount, CoinId, Epoch, EpochFlags, FeeflowError};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

type ApiError = (StatusCode, Json<serde_json::Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn error(status: StatusCode, message: impl ToString) -> ApiError {
    (status, Json(serde_json::json!({"error": message.to_string()})))
}

fn engine_error(err: FeeflowError) -> ApiError {
    let status = match err {
        FeeflowError::BadTime | FeeflowError::WrongEpoch { .. } => StatusCode::CONFLICT,
        FeeflowError::Overflow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    error(status, err)
}

fn poisoned() -> ApiError {
    tracing::warn!("Collector lock poisoned");
    error(StatusCode::INTERNAL_SERVER_ERROR, "collector unavailable")
}

/// Epoch name (`collect`) or raw flag bits (`2`, `6`)
fn parse_flags(raw: &str) -> Option<EpochFlags> {
    Epoch::from_str(raw)
        .map(EpochFlags::from)
        .or_else(|| raw.parse::<u8>().ok().map(EpochFlags::from_bits))
}

/// Optional `?ts=` override of the wall clock
#[derive(Debug, Default, Deserialize)]
pub struct At {
    pub ts: Option<u64>,
}

impl At {
    fn ts(&self) -> u64 {
        self.ts
            .unwrap_or_else(|| chrono::Utc::now().timestamp().max(0) as u64)
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub collector: CollectorStatus,
    pub uptime_seconds: u64,
}

#[derive(Serialize)]
pub struct EpochResponse {
    pub ts: u64,
    pub epoch: Epoch,
    pub week: u64,
    pub start: u64,
    pub end: u64,
}

#[derive(Serialize)]
pub struct FrameResponse {
    pub epoch: Epoch,
    pub start: u64,
    pub end: u64,
}

#[derive(Serialize)]
pub struct FeeResponse {
    pub epoch: Epoch,
    pub ts: u64,
    pub fee: u128,
    pub max_fee: u128,
}

#[derive(Serialize)]
pub struct HookEntry {
    pub id: usize,
    #[serde(flatten)]
    pub hook: Hook,
    /// Live state, not the configured one
    pub cooldown: Cooldown,
}

#[derive(Serialize)]
pub struct HooksResponse {
    pub version: u64,
    pub buffer_amount: Amount,
    pub duty_counter: u64,
    pub hooks: Vec<HookEntry>,
}

#[derive(Deserialize)]
pub struct CompensationRequest {
    pub inputs: Vec<HookInput>,
    /// Reject batches missing a mandatory hook, as a duty run would
    #[serde(default)]
    pub require_mandatory: bool,
}

#[derive(Serialize)]
pub struct CompensationResponse {
    pub ts: u64,
    pub compensation: Amount,
}

#[derive(Serialize)]
pub struct PriceResponse {
    pub coin: CoinId,
    pub ts: u64,
    /// Target per unit of coin, scaled by 10^18
    pub price: u128,
    pub can_exchange: bool,
}

#[derive(Serialize)]
pub struct RecordResponse {
    pub coin: CoinId,
    pub stored: Record,
    /// The record as the auction at `ts` sees it
    pub current: Record,
    pub reference_rate: Option<u128>,
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_status(State(state): State<AppState>, Query(at): Query<At>) -> ApiResult<StatusResponse> {
    let collector = state.lock().ok_or_else(poisoned)?;
    Ok(Json(StatusResponse {
        collector: collector.status(at.ts()),
        uptime_seconds: state.uptime_seconds(),
    }))
}

/// Current epoch and its bounds
pub async fn get_epoch(State(state): State<AppState>, Query(at): Query<At>) -> ApiResult<EpochResponse> {
    let collector = state.lock().ok_or_else(poisoned)?;
    let ts = at.ts();
    let epoch = collector.epoch(ts);
    let (start, end) = collector.clock().frame(epoch, ts);
    Ok(Json(EpochResponse {
        ts,
        epoch,
        week: collector.clock().week_number(ts),
        start,
        end,
    }))
}

pub async fn get_epoch_frame(
    State(state): State<AppState>,
    Path(flag): Path<String>,
    Query(at): Query<At>,
) -> ApiResult<FrameResponse> {
    let flags = parse_flags(&flag).ok_or_else(|| error(StatusCode::BAD_REQUEST, "Bad Epoch"))?;
    let collector = state.lock().ok_or_else(poisoned)?;
    let epoch = flags.single().map_err(engine_error)?;
    let (start, end) = collector
        .clock()
        .epoch_time_frame(epoch, at.ts())
        .map_err(engine_error)?;
    Ok(Json(FrameResponse { epoch, start, end }))
}

pub async fn get_fee(
    State(state): State<AppState>,
    Path(flag): Path<String>,
    Query(at): Query<At>,
) -> ApiResult<FeeResponse> {
    let flags = parse_flags(&flag).ok_or_else(|| error(StatusCode::BAD_REQUEST, "Bad Epoch"))?;
    let epoch = flags.single().map_err(engine_error)?;
    let collector = state.lock().ok_or_else(poisoned)?;
    let ts = at.ts();
    let fee = collector
        .fee(epoch, ts)
        .map_err(|err| error(StatusCode::BAD_REQUEST, err))?;
    let max_fee = collector
        .max_fee(epoch)
        .map_err(|err| error(StatusCode::BAD_REQUEST, err))?;
    Ok(Json(FeeResponse {
        epoch,
        ts,
        fee,
        max_fee,
    }))
}

/// Active hook list with live cooldowns
pub async fn list_hooks(State(state): State<AppState>) -> ApiResult<HooksResponse> {
    let collector = state.lock().ok_or_else(poisoned)?;
    let hooker = collector.hooker();
    let hooks = hooker
        .hooks()
        .iter()
        .enumerate()
        .map(|(id, hook)| {
            Ok(HookEntry {
                id,
                hook: hook.clone(),
                cooldown: hooker.registry().cooldown(id)?,
            })
        })
        .collect::<Result<Vec<_>, FeeflowError>>()
        .map_err(engine_error)?;

    Ok(Json(HooksResponse {
        version: hooker.registry().version(),
        buffer_amount: hooker.buffer_amount().map_err(engine_error)?,
        duty_counter: hooker.duty_counter(),
        hooks,
    }))
}

/// What a batch would pay right now, without running it
pub async fn calc_compensation(
    State(state): State<AppState>,
    Query(at): Query<At>,
    Json(req): Json<CompensationRequest>,
) -> ApiResult<CompensationResponse> {
    let collector = state.lock().ok_or_else(poisoned)?;
    let ts = at.ts();
    let compensation = collector
        .hooker()
        .calc_compensation(&req.inputs, req.require_mandatory, ts)
        .map_err(engine_error)?;
    tracing::debug!("Compensation for {} inputs at {}: {}", req.inputs.len(), ts, compensation);
    Ok(Json(CompensationResponse { ts, compensation }))
}

pub async fn get_price(
    State(state): State<AppState>,
    Path(coin): Path<String>,
    Query(at): Query<At>,
) -> ApiResult<PriceResponse> {
    let collector = state.lock().ok_or_else(poisoned)?;
    let coin = CoinId::new(coin);
    let ts = at.ts();
    let price = collector.burner().price(&coin, ts).map_err(engine_error)?;
    let can_exchange = collector.can_exchange(std::slice::from_ref(&coin), ts);
    Ok(Json(PriceResponse {
        coin,
        ts,
        price,
        can_exchange,
    }))
}

pub async fn get_record(
    State(state): State<AppState>,
    Path(coin): Path<String>,
    Query(at): Query<At>,
) -> ApiResult<RecordResponse> {
    let collector = state.lock().ok_or_else(poisoned)?;
    let coin = CoinId::new(coin);
    let burner = collector.burner();
    let stored = burner.record(&coin);
    let week = collector.clock().week_number(at.ts());
    let current = stored
        .rolled(week, burner.params().smoothing_factor)
        .map_err(engine_error)?;
    Ok(Json(RecordResponse {
        coin,
        stored,
        current,
        reference_rate: current.rate().map_err(engine_error)?,
    }))
}
