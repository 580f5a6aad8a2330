//! Phone one-time-code flow
//!
//! Shared by registration and phone change. The flow moves from
//! [`Step::Input`] to [`Step::Verify`] once a code has been sent, and ends
//! when a code is accepted. Resends are refused locally while the cooldown
//! window is open; a server-side rate limit re-synchronizes the window
//! instead of failing the flow.
//!
//! State is never held across a network call. One request runs at a time;
//! a call made while another is pending fails with [`FlowError::Busy`].
//! Each call records the flow epoch it started in, and a completion arriving
//! after `back` or `close` returns [`FlowError::Superseded`] without touching
//! the state.

pub mod cooldown;

use crate::config::AuthConfig;
use cooldown::{Clock, CooldownTicker, CooldownWindow, SystemClock};
use logistics_http::{ClientError, ErrorInfo, SmsClient};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::{OnceCell, watch};
use tracing::{debug, info};

pub use cooldown::ManualClock;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    #[default]
    Input,
    Verify,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Verify => f.write_str("verify"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("Operation requires the {expected} step, flow is at {actual}")]
    InvalidStep { expected: Step, actual: Step },

    #[error("{0}")]
    Rejected(ErrorInfo),

    #[error("Flow changed while the request was in flight")]
    Superseded,

    #[error("Another request for this flow is still in flight")]
    Busy,
}

impl FlowError {
    /// Server rejection details, if any
    pub fn info(&self) -> Option<&ErrorInfo> {
        match self {
            Self::Rejected(info) => Some(info),
            _ => None,
        }
    }
}

/// Failure of an action gated behind a verified phone
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error(transparent)]
    Verification(#[from] FlowError),

    #[error(transparent)]
    Action(#[from] ClientError),
}

impl CompletionError {
    /// Normalized details for display, when there are any
    pub fn info(&self) -> Option<ErrorInfo> {
        match self {
            Self::Verification(error) => error.info().cloned(),
            Self::Action(error) => Some(ErrorInfo::from(error)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendOutcome {
    /// A new code was sent and the cooldown restarted
    Sent,
    /// Refused locally; no request was made
    CoolingDown(u64),
    /// The server rate-limited the resend; the cooldown now follows its hint
    Resynced(u64),
}

/// A phone number whose code the server accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPhone {
    pub phone: String,
    pub code: String,
}

/// Point-in-time copy of the flow for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSnapshot {
    pub phone: String,
    pub step: Step,
    pub code: String,
    pub seconds_left: u64,
    pub last_error: Option<ErrorInfo>,
}

#[derive(Default)]
struct FlowState {
    phone: String,
    step: Step,
    code: String,
    cooldown: Option<CooldownWindow>,
    last_error: Option<ErrorInfo>,
    epoch: u64,
    in_flight: Option<u64>,
    closed: bool,
    ticker: Option<CooldownTicker>,
}

impl FlowState {
    fn require(&self, expected: Step) -> Result<(), FlowError> {
        if self.closed {
            return Err(FlowError::Superseded);
        }
        if self.step != expected {
            return Err(FlowError::InvalidStep {
                expected,
                actual: self.step,
            });
        }
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), FlowError> {
        if self.in_flight.is_some() {
            return Err(FlowError::Busy);
        }
        Ok(())
    }

    fn begin(&mut self) -> Result<u64, FlowError> {
        self.ensure_idle()?;
        self.epoch += 1;
        self.last_error = None;
        self.in_flight = Some(self.epoch);
        Ok(self.epoch)
    }

    fn finish(&mut self, epoch: u64) {
        if self.in_flight == Some(epoch) {
            self.in_flight = None;
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        !self.closed && self.epoch == epoch
    }

    fn reset(&mut self) {
        self.epoch += 1;
        self.in_flight = None;
        self.step = Step::Input;
        self.code.clear();
        self.cooldown = None;
        self.last_error = None;
        self.ticker = None;
    }
}

/// Controller for one phone verification flow
pub struct PhoneVerification {
    sms: SmsClient,
    clock: Arc<dyn Clock>,
    cooldown_secs: OnceCell<u64>,
    state: Mutex<FlowState>,
    seconds_left: Arc<watch::Sender<u64>>,
}

impl PhoneVerification {
    pub fn new(sms: SmsClient, clock: Arc<dyn Clock>) -> Self {
        let (seconds_left, _) = watch::channel(0);
        Self {
            sms,
            clock,
            cooldown_secs: OnceCell::new(),
            state: Mutex::new(FlowState::default()),
            seconds_left: Arc::new(seconds_left),
        }
    }

    pub fn with_system_clock(sms: SmsClient) -> Self {
        Self::new(sms, Arc::new(SystemClock))
    }

    /// Ask the server to text a code to `phone`
    pub async fn send_code(&self, phone: &str) -> Result<(), FlowError> {
        let phone = phone.trim().to_string();
        let epoch = {
            let mut state = self.lock();
            state.require(Step::Input)?;
            let epoch = state.begin()?;
            state.phone.clone_from(&phone);
            epoch
        };
        let _pending = InFlight { flow: self, epoch };

        let cooldown = self.cooldown_seconds().await;
        let result = self.sms.send_code(&phone).await;

        let mut state = self.lock();
        if !state.is_current(epoch) {
            return Err(FlowError::Superseded);
        }
        match result {
            Ok(()) => {
                info!("Verification code sent");
                state.step = Step::Verify;
                self.start_cooldown(&mut state, cooldown);
                Ok(())
            }
            Err(error) => Err(self.reject(&mut state, &error, cooldown)),
        }
    }

    /// Request another code for the phone being verified
    pub async fn resend(&self) -> Result<ResendOutcome, FlowError> {
        let (phone, epoch) = {
            let mut state = self.lock();
            state.require(Step::Verify)?;
            state.ensure_idle()?;
            let left = self.left_in(&state);
            if left > 0 {
                debug!(seconds_left = left, "Resend refused locally");
                return Ok(ResendOutcome::CoolingDown(left));
            }
            let epoch = state.begin()?;
            (state.phone.clone(), epoch)
        };
        let _pending = InFlight { flow: self, epoch };

        let cooldown = self.cooldown_seconds().await;
        let result = self.sms.resend_code(&phone).await;

        let mut state = self.lock();
        if !state.is_current(epoch) {
            return Err(FlowError::Superseded);
        }
        match result {
            Ok(()) => {
                info!("Verification code resent");
                self.start_cooldown(&mut state, cooldown);
                Ok(ResendOutcome::Sent)
            }
            Err(error) => {
                let rejection = self.reject(&mut state, &error, cooldown);
                if is_rate_limited(&error) {
                    Ok(ResendOutcome::Resynced(self.left_in(&state)))
                } else {
                    Err(rejection)
                }
            }
        }
    }

    /// Check `code`; on success the flow ends and the verified pair is returned
    pub async fn verify_code(&self, code: &str) -> Result<VerifiedPhone, FlowError> {
        let code = code.trim().to_string();
        let (phone, epoch) = {
            let mut state = self.lock();
            state.require(Step::Verify)?;
            let epoch = state.begin()?;
            state.code.clone_from(&code);
            (state.phone.clone(), epoch)
        };
        let _pending = InFlight { flow: self, epoch };

        let result = self.sms.verify_code(&phone, &code).await;

        let mut state = self.lock();
        if !state.is_current(epoch) {
            return Err(FlowError::Superseded);
        }
        match result {
            Ok(()) => {
                info!("Phone verified");
                state.reset();
                state.phone.clear();
                self.seconds_left.send_replace(0);
                Ok(VerifiedPhone { phone, code })
            }
            Err(error) => {
                let info = ErrorInfo::from(&error);
                state.last_error = Some(info.clone());
                Err(FlowError::Rejected(info))
            }
        }
    }

    /// Return to phone entry. A send already in flight is not cancelled, its
    /// completion is ignored.
    pub fn back(&self) {
        let mut state = self.lock();
        state.reset();
        self.seconds_left.send_replace(0);
    }

    /// Stop the flow for good; later completions are ignored
    pub fn close(&self) {
        let mut state = self.lock();
        state.reset();
        state.closed = true;
        self.seconds_left.send_replace(0);
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        let state = self.lock();
        FlowSnapshot {
            phone: state.phone.clone(),
            step: state.step,
            code: state.code.clone(),
            seconds_left: self.left_in(&state),
            last_error: state.last_error.clone(),
        }
    }

    pub fn step(&self) -> Step {
        self.lock().step
    }

    pub fn seconds_left(&self) -> u64 {
        self.left_in(&self.lock())
    }

    /// Display feed updated by the cooldown ticker
    pub fn subscribe_seconds_left(&self) -> watch::Receiver<u64> {
        self.seconds_left.subscribe()
    }

    /// Whether the cooldown ticker task is alive
    pub fn is_ticking(&self) -> bool {
        self.lock()
            .ticker
            .as_ref()
            .is_some_and(CooldownTicker::is_running)
    }

    /// Resend cooldown advertised by the server, fetched once
    pub async fn cooldown_seconds(&self) -> u64 {
        *self
            .cooldown_secs
            .get_or_init(|| async {
                match self.sms.config().await {
                    Ok(config) => config
                        .cooldown_seconds()
                        .unwrap_or(AuthConfig::DEFAULT_RESEND_COOLDOWN_SECS),
                    Err(error) => {
                        debug!("SMS config unavailable, using default cooldown: {error}");
                        AuthConfig::DEFAULT_RESEND_COOLDOWN_SECS
                    }
                }
            })
            .await
    }

    fn reject(&self, state: &mut FlowState, error: &ClientError, cooldown: u64) -> FlowError {
        if is_rate_limited(error) {
            let hint = error.api().and_then(logistics_http::ApiError::retry_after_hint);
            // A hint of zero or none restarts the configured cooldown
            // rather than leaving the current window alone.
            let seconds = hint.unwrap_or(cooldown);
            info!(seconds, "Rate limited, resynchronizing cooldown");
            self.start_cooldown(state, seconds);
        }
        let info = ErrorInfo::from(error);
        state.last_error = Some(info.clone());
        FlowError::Rejected(info)
    }

    fn start_cooldown(&self, state: &mut FlowState, seconds: u64) {
        let window = CooldownWindow::starting_at(self.clock.now(), seconds);
        state.cooldown = Some(window);
        self.seconds_left.send_replace(window.seconds_left(self.clock.now()));
        // Replacing the ticker aborts the previous one.
        state.ticker = CooldownTicker::start(window, self.clock.clone(), self.seconds_left.clone());
    }

    fn left_in(&self, state: &FlowState) -> u64 {
        state
            .cooldown
            .map_or(0, |window| window.seconds_left(self.clock.now()))
    }

    fn lock(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the flow idle again when its request completes or is dropped
struct InFlight<'a> {
    flow: &'a PhoneVerification,
    epoch: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flow.lock().finish(self.epoch);
    }
}

fn is_rate_limited(error: &ClientError) -> bool {
    error.api().is_some_and(logistics_http::ApiError::is_rate_limited)
}
