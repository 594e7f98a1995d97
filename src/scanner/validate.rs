use crate::catalog::EventCatalog;
use crate::error::ValidationFailure;
use crate::models::{SYSTEM_TAG, TicketPayload};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{debug, info};

/// Optional checks on top of the base rules. All off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Recompute the signature from the ids and require a match
    pub verify_signature: bool,
    /// Reject payloads issued longer ago than this, or with no timestamp
    pub max_age: Option<Duration>,
    /// Accept each code id once per validator
    pub single_use: bool,
}

/// Decides whether a decoded payload is an admissible ticket
#[derive(Debug)]
pub struct Validator<C> {
    catalog: C,
    policy: ValidationPolicy,
    redeemed: Mutex<HashSet<String>>,
}

impl<C: EventCatalog> Validator<C> {
    pub fn new(catalog: C) -> Self {
        Self::with_policy(catalog, ValidationPolicy::default())
    }

    pub fn with_policy(catalog: C, policy: ValidationPolicy) -> Self {
        Self {
            catalog,
            policy,
            redeemed: Mutex::new(HashSet::new()),
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn validate(&self, payload: &TicketPayload) -> Result<(), ValidationFailure> {
        self.validate_at(payload, Utc::now())
    }

    /// Validate as of `now`. A single-use ticket is marked redeemed only when
    /// every other check passes.
    pub fn validate_at(&self, payload: &TicketPayload, now: DateTime<Utc>) -> Result<(), ValidationFailure> {
        if payload.system != SYSTEM_TAG {
            return Err(ValidationFailure::WrongSystem(payload.system.clone()));
        }
        for (name, value) in [
            ("ticketId", &payload.ticket_id),
            ("eventId", &payload.event_id),
            ("qrCode", &payload.qr_code),
        ] {
            if value.is_empty() {
                return Err(ValidationFailure::MissingField(name));
            }
        }
        if payload.quantity < 1 {
            return Err(ValidationFailure::InvalidQuantity);
        }
        if self.catalog.event_by_id(&payload.event_id).is_none() {
            return Err(ValidationFailure::UnknownEvent(payload.event_id.clone()));
        }

        if self.policy.verify_signature && payload.signature != payload.expected_signature() {
            return Err(ValidationFailure::SignatureMismatch);
        }
        if let Some(max_age) = self.policy.max_age {
            let fresh = payload.timestamp.is_some_and(|issued| now - issued <= max_age);
            if !fresh {
                return Err(ValidationFailure::Stale);
            }
        }
        if self.policy.single_use {
            // A poisoned set still holds valid entries
            let mut redeemed = self.redeemed.lock().unwrap_or_else(|e| e.into_inner());
            if !redeemed.insert(payload.qr_code.clone()) {
                return Err(ValidationFailure::AlreadyRedeemed(payload.qr_code.clone()));
            }
            info!(qr_code = %payload.qr_code, "ticket redeemed");
        }

        debug!(ticket_id = %payload.ticket_id, event_id = %payload.event_id, "ticket valid");
        Ok(())
    }
}
