//! Flat-file backend. The whole store is one JSON document that is read and
//! written wholesale on every operation.
//!
//! Writes land in a sibling `.tmp` file that is renamed over the document, so
//! a crash mid-write leaves the previous version intact. An async mutex
//! serializes read-modify-write cycles within the process; the record change
//! and its stats delta reach disk in the same write.

use crate::{
    core::{
        CloseOutcome, VerificationOutcome,
        stats::{StatsDelta, recount_snapshot},
    },
    errors::{Error, Result},
    models::{Snapshot, Stats, Ticket, TicketDetails, TicketStatus, Verification, Vouch},
    store::RecordBackend,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::{fs, sync::Mutex};
use tracing::{debug, info, instrument, warn};

/// Record store over a single JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

fn newest_first<T, F>(records: &mut [T], created_at: F)
where
    F: Fn(&T) -> DateTime<Utc>,
{
    records.sort_by_key(|record| std::cmp::Reverse(created_at(record)));
}

impl FileStore {
    /// Opens the document at `path`, creating its directory if needed.
    ///
    /// An existing document is parsed up front so a corrupt file is reported at
    /// startup rather than on the first interaction. A missing one is created
    /// lazily by the first write.
    #[instrument]
    pub async fn open(path: impl Into<PathBuf> + std::fmt::Debug) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let store = Self {
            path,
            write_lock: Mutex::new(()),
        };
        let snapshot = store.load().await?;
        info!(
            tickets = snapshot.tickets.len(),
            vouches = snapshot.vouches.len(),
            verifications = snapshot.verifications.len(),
            "Opened flat-file store"
        );
        Ok(store)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Reads the document; a missing file is an empty store.
    pub async fn load(&self) -> Result<Snapshot> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => serde_json::from_str(&contents).map_err(Error::from),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Snapshot::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let temp = self.temp_path();
        fs::write(&temp, serde_json::to_vec_pretty(snapshot)?).await?;
        fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    /// Loads, applies `change`, and writes the result back if `change` succeeds.
    async fn mutate<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut Snapshot, DateTime<Utc>) -> Result<T> + Send,
        T: Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.load().await?;
        let value = change(&mut snapshot, Utc::now())?;
        self.save(&snapshot).await?;
        Ok(value)
    }
}

#[async_trait]
impl RecordBackend for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn init_aggregate(&self) -> Result<Stats> {
        let _guard = self.write_lock.lock().await;
        if fs::try_exists(&self.path).await? {
            return Ok(self.load().await?.stats);
        }

        let snapshot = Snapshot {
            stats: Stats::zeroed(Utc::now()),
            ..Snapshot::default()
        };
        self.save(&snapshot).await?;
        info!(path = %self.path.display(), "Created flat-file store");
        Ok(snapshot.stats)
    }

    async fn create_ticket(&self, ticket: &Ticket) -> Result<Ticket> {
        ticket.validate()?;
        self.mutate(|snapshot, now| {
            if snapshot.tickets.iter().any(|t| t.id == ticket.id) {
                return Err(Error::DuplicateTicket { id: ticket.id });
            }
            snapshot.tickets.push(ticket.clone());
            StatsDelta::for_new_ticket(ticket.status).apply_to(&mut snapshot.stats, now);
            Ok(ticket.clone())
        })
        .await
    }

    async fn update_ticket_details(
        &self,
        ticket_id: i64,
        details: Option<TicketDetails>,
    ) -> Result<Option<Ticket>> {
        self.mutate(|snapshot, now| {
            let Some(ticket) = snapshot.tickets.iter_mut().find(|t| t.id == ticket_id) else {
                debug!(ticket_id, "No ticket to update");
                return Ok(None);
            };
            ticket.details = details;
            ticket.updated_at = Some(now);
            Ok(Some(ticket.clone()))
        })
        .await
    }

    async fn get_ticket_by_id(&self, ticket_id: i64) -> Result<Option<Ticket>> {
        let snapshot = self.load().await?;
        Ok(snapshot.tickets.into_iter().find(|t| t.id == ticket_id))
    }

    async fn get_ticket_by_channel_id(&self, channel_id: &str) -> Result<Option<Ticket>> {
        let snapshot = self.load().await?;
        Ok(snapshot
            .tickets
            .into_iter()
            .filter(|t| t.channel_id == channel_id)
            .max_by_key(|t| t.created_at))
    }

    async fn close_ticket(&self, ticket_id: i64) -> Result<CloseOutcome> {
        self.mutate(|snapshot, now| {
            let Some(ticket) = snapshot.tickets.iter_mut().find(|t| t.id == ticket_id) else {
                return Ok(CloseOutcome::NotFound);
            };
            if !ticket.is_open() {
                return Ok(CloseOutcome::AlreadyClosed);
            }
            ticket.status = TicketStatus::Closed;
            ticket.closed_at = Some(now);
            StatsDelta::TICKET_CLOSED.apply_to(&mut snapshot.stats, now);
            Ok(CloseOutcome::Closed)
        })
        .await
    }

    async fn create_vouch(&self, vouch: &Vouch) -> Result<Vouch> {
        vouch.validate()?;
        self.mutate(|snapshot, now| {
            if snapshot.vouches.iter().any(|v| v.id == vouch.id) {
                return Err(Error::DuplicateVouch { id: vouch.id });
            }
            snapshot.vouches.push(vouch.clone());
            StatsDelta::VOUCH_ADDED.apply_to(&mut snapshot.stats, now);
            Ok(vouch.clone())
        })
        .await
    }

    async fn create_verification(
        &self,
        user_id: &str,
        username: &str,
    ) -> Result<VerificationOutcome> {
        self.mutate(|snapshot, now| {
            if snapshot.verifications.iter().any(|v| v.user_id == user_id) {
                return Ok(VerificationOutcome::AlreadyVerified);
            }
            let record = Verification {
                user_id: user_id.to_string(),
                username: username.to_string(),
                verified_at: now,
            };
            snapshot.verifications.push(record.clone());
            StatsDelta::USER_VERIFIED.apply_to(&mut snapshot.stats, now);
            Ok(VerificationOutcome::Created(record))
        })
        .await
    }

    async fn get_verification(&self, user_id: &str) -> Result<Option<Verification>> {
        let snapshot = self.load().await?;
        Ok(snapshot
            .verifications
            .into_iter()
            .find(|v| v.user_id == user_id))
    }

    async fn get_stats(&self) -> Result<Stats> {
        self.init_aggregate().await
    }

    async fn list_all_tickets(&self) -> Result<Vec<Ticket>> {
        let mut tickets = self.load().await?.tickets;
        newest_first(&mut tickets, |t| t.created_at);
        Ok(tickets)
    }

    async fn list_active_tickets(&self) -> Result<Vec<Ticket>> {
        let mut tickets = self.list_all_tickets().await?;
        tickets.retain(Ticket::is_open);
        Ok(tickets)
    }

    async fn list_all_vouches(&self) -> Result<Vec<Vouch>> {
        let mut vouches = self.load().await?.vouches;
        newest_first(&mut vouches, |v| v.created_at);
        Ok(vouches)
    }

    async fn list_vouches_for_user(&self, user_id: &str) -> Result<Vec<Vouch>> {
        let mut vouches = self.list_all_vouches().await?;
        vouches.retain(|v| v.to_user_id == user_id);
        Ok(vouches)
    }

    async fn count_vouches_for_user(&self, user_id: &str) -> Result<u64> {
        let snapshot = self.load().await?;
        let count = snapshot
            .vouches
            .iter()
            .filter(|v| v.to_user_id == user_id)
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn reconcile_stats(&self) -> Result<Stats> {
        self.mutate(|snapshot, now| {
            let fresh = recount_snapshot(snapshot, now);
            if !snapshot.stats.same_counts(&fresh) {
                warn!(
                    previous = ?snapshot.stats,
                    ?fresh,
                    "Stats aggregate had drifted from the records"
                );
            }
            snapshot.stats = fresh.clone();
            Ok(fresh)
        })
        .await
    }

    async fn read_snapshot(&self) -> Result<Snapshot> {
        self.load().await
    }
}
