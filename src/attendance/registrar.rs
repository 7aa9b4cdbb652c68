//! Attendance submission.
//!
//! [`Registrar::submit`] runs the check-in pipeline in a fixed order and stops at
//! the first failing check:
//!
//! 1. a wallet address is present (when wallets are required)
//! 2. a location fix was acquired and lies inside the geofence
//! 3. a subject was selected
//! 4. a daily key was entered
//! 5. the daily key matches the current one
//!
//! Only then is an [`AttendanceRecord`] built and prepended to the collection.
//!
//! The remembered wallet address tracks the live [`WalletSession`]: an account
//! switch replaces it and a locked or disconnected wallet clears it.

use super::daily_key::DailyKeyIssuer;
use super::geolocation::GeolocationAcquirer;
use super::proximity::{Geofence, ProximityCheck};
use super::record_store::LocalStore;
use super::wallet_session::WalletSession;
use crate::domain::{
    subject_label, AttendanceRecord, GeoPoint, MetricsPtr, PositionSource, PositionSourcePtr,
    ReportedFix,
};
use crate::error::AttendanceError;
use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A check-in attempt as sent by the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    // ---
    #[serde(default)]
    pub subject: String,

    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub wallet_address: Option<String>,

    #[serde(default)]
    pub location: Option<ReportedFix>,
}

/// What a successful check-in returns to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub record: AttendanceRecord,
    pub subject_label: String,
    pub message: String,
}

/// Result of a stand-alone location verification.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedLocation {
    #[serde(flatten)]
    pub point: GeoPoint,
    #[serde(flatten)]
    pub check: ProximityCheck,
}

/// Registrar behavior switches.
#[derive(Debug, Clone)]
pub struct RegistrarOptions {
    /// Reject submissions without a wallet address.
    pub require_wallet: bool,
    /// Pause before completing a submission. Zero disables it.
    pub submit_delay: Duration,
}

/// The collaborators a [`Registrar`] is assembled from.
pub struct RegistrarParts {
    pub geofence: Geofence,
    pub acquirer: GeolocationAcquirer,
    pub fallback_source: Option<PositionSourcePtr>,
    pub keys: Arc<DailyKeyIssuer>,
    pub records: Arc<LocalStore<Vec<AttendanceRecord>>>,
    pub last_wallet: Arc<LocalStore<Option<String>>>,
    pub wallet: Arc<WalletSession>,
    pub metrics: MetricsPtr,
    pub options: RegistrarOptions,
}

pub struct Registrar {
    // ---
    geofence: Geofence,
    acquirer: GeolocationAcquirer,
    fallback_source: Option<PositionSourcePtr>,
    keys: Arc<DailyKeyIssuer>,
    records: Arc<LocalStore<Vec<AttendanceRecord>>>,
    last_wallet: Arc<LocalStore<Option<String>>>,
    wallet: Arc<WalletSession>,
    metrics: MetricsPtr,
    options: RegistrarOptions,
    wallet_follower: JoinHandle<()>,
}

impl Registrar {
    // ---
    /// Must be called inside a Tokio runtime; it spawns the wallet follower.
    pub fn new(parts: RegistrarParts) -> Self {
        // ---
        let wallet_follower = follow_wallet(&parts.wallet, parts.last_wallet.clone());
        Self {
            geofence: parts.geofence,
            acquirer: parts.acquirer,
            fallback_source: parts.fallback_source,
            keys: parts.keys,
            records: parts.records,
            last_wallet: parts.last_wallet,
            wallet: parts.wallet,
            metrics: parts.metrics,
            options: parts.options,
            wallet_follower,
        }
    }

    pub fn geofence(&self) -> &Geofence {
        &self.geofence
    }

    pub fn keys(&self) -> &DailyKeyIssuer {
        &self.keys
    }

    pub fn wallet(&self) -> &WalletSession {
        &self.wallet
    }

    /// Runs every check and, if all pass, records the check-in.
    #[tracing::instrument(skip(self, submission), fields(subject = %submission.subject))]
    pub async fn submit(&self, submission: Submission) -> Result<Receipt, AttendanceError> {
        // ---
        match self.try_submit(submission).await {
            Ok(receipt) => {
                self.metrics.record_attendance_registered();
                tracing::info!("{}", receipt.message);
                Ok(receipt)
            }
            Err(e) => {
                self.metrics.record_attendance_rejected(e.code());
                tracing::warn!("Attendance rejected ({}): {}", e.code(), e);
                Err(e)
            }
        }
    }

    async fn try_submit(&self, submission: Submission) -> Result<Receipt, AttendanceError> {
        // ---
        let wallet_address = self.resolve_wallet(submission.wallet_address).await;
        if self.options.require_wallet && wallet_address.is_none() {
            return Err(AttendanceError::WalletNotFound);
        }

        let verified = self
            .verify_location(wallet_address.as_deref(), submission.location.as_ref())
            .await?;

        if submission.subject.is_empty() {
            return Err(AttendanceError::SubjectMissing);
        }

        let key = self.keys.current(today()).await;
        key.validate(&submission.key)?;

        if !self.options.submit_delay.is_zero() {
            tokio::time::sleep(self.options.submit_delay).await;
        }

        let record = AttendanceRecord::new(
            Utc::now(),
            submission.subject,
            Some(submission.key),
            wallet_address,
            Some(verified.point),
        );
        self.records
            .update(|records| records.insert(0, record.clone()))
            .await;

        let label = subject_label(&record.subject).to_string();
        let message = format!(
            "Attendance for {} at {} marked successfully.",
            label,
            record.display_time()
        );

        Ok(Receipt {
            record,
            subject_label: label,
            message,
        })
    }

    /// Acquires a fix and checks it against the geofence.
    ///
    /// The client-reported fix wins; without one the server-side fallback source
    /// is used, and without that the location is missing. Callers without a
    /// wallet address each get their own in-flight slot.
    pub async fn verify_location(
        &self,
        requester: Option<&str>,
        reported: Option<&ReportedFix>,
    ) -> Result<VerifiedLocation, AttendanceError> {
        // ---
        let requester = match requester.filter(|a| !a.is_empty()) {
            Some(address) => address.to_string(),
            None => format!("anonymous-{}", Uuid::new_v4()),
        };
        let source: &dyn PositionSource = match (reported, &self.fallback_source) {
            (Some(fix), _) => fix as &dyn PositionSource,
            (None, Some(fallback)) => fallback.as_ref(),
            (None, None) => return Err(AttendanceError::LocationMissing),
        };

        let point = self.acquirer.acquire(&requester, source).await?;
        let check = self.geofence.verify(point)?;

        Ok(VerifiedLocation { point, check })
    }

    /// All records, newest first.
    pub async fn records(&self) -> Vec<AttendanceRecord> {
        self.records.get().await
    }

    /// Fails once either store has fallen back to memory-only operation.
    pub fn check_storage(&self) -> Result<(), AttendanceError> {
        // ---
        let degraded = if self.records.is_degraded() {
            self.records.key()
        } else if self.last_wallet.is_degraded() {
            self.last_wallet.key()
        } else {
            return Ok(());
        };
        Err(AttendanceError::StorageError(format!(
            "\"{degraded}\" is no longer persisted"
        )))
    }

    /// Removes one record. Records are otherwise never touched after creation.
    pub async fn delete_record(&self, id: Uuid) -> Result<(), AttendanceError> {
        // ---
        let removed = self
            .records
            .update(|records| {
                let before = records.len();
                records.retain(|r| r.id != id);
                before != records.len()
            })
            .await;

        if removed {
            tracing::info!("Deleted attendance record {}", id);
            Ok(())
        } else {
            Err(AttendanceError::RecordNotFound(id.to_string()))
        }
    }

    /// Connects the wallet and remembers the address for later check-ins.
    pub async fn connect_wallet(&self) -> Result<String, AttendanceError> {
        // ---
        let account = self.wallet.connect().await?;
        self.last_wallet.set(Some(account.clone())).await;
        Ok(account)
    }

    /// Ends the wallet session and forgets the remembered address.
    pub async fn disconnect_wallet(&self) {
        // ---
        self.wallet.disconnect().await;
        self.last_wallet.set(None).await;
    }

    /// Request field first, then the last connected address, then the live session.
    async fn resolve_wallet(&self, requested: Option<String>) -> Option<String> {
        // ---
        if let Some(address) = requested.filter(|a| !a.is_empty()) {
            return Some(address);
        }
        if let Some(address) = self.last_wallet.get().await {
            return Some(address);
        }
        self.wallet.account().await
    }
}

impl Drop for Registrar {
    fn drop(&mut self) {
        self.wallet_follower.abort();
    }
}

/// Mirrors every account change of `wallet` into `last_wallet`.
fn follow_wallet(
    wallet: &WalletSession,
    last_wallet: Arc<LocalStore<Option<String>>>,
) -> JoinHandle<()> {
    // ---
    let mut accounts = wallet.watch_account();
    tokio::spawn(async move {
        while accounts.changed().await.is_ok() {
            let account = accounts.borrow_and_update().clone();
            match &account {
                Some(address) => tracing::debug!("Remembering wallet {}", address),
                None => tracing::debug!("Wallet session ended; forgetting remembered address"),
            }
            last_wallet.set(account).await;
        }
    })
}

/// Today's date on the local clock; the daily key follows the local calendar.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
