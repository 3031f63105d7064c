//! Consultation desk - the lifecycle service.

use std::sync::Arc;
use std::time::Duration;

use leaddesk_core::{
    Actor, AuditAction, AuditEvent, Consultation, ConsultationFilter, ConsultationId,
    ConsultationStats, ConsultationStatus, Error, Result, Time,
};
use leaddesk_dispatch::{DispatchOutcome, EmailDispatcher};
use leaddesk_storage::Storage;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::validate::validate;

// Bound on each external email call; expiry counts as a dispatch failure.
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(15);

/// A consultation submission, before validation.
#[derive(Debug, Clone)]
pub struct NewConsultation {
    /// Contact name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: Option<String>,
    /// Company name
    pub company: Option<String>,
    /// Industry sector
    pub industry: Option<String>,
    /// Requested project type
    pub project_type: String,
    /// Budget band
    pub budget: String,
    /// Desired timeline
    pub timeline: Option<String>,
    /// Free-text project description
    pub project_details: String,
    /// Additional notes
    pub additional_notes: Option<String>,
    /// Names of attached files
    pub uploaded_files: Vec<String>,
}

/// The consultation lifecycle service.
///
/// Every read-modify-write sequence holds the storage lock end to end, so
/// interleaved calls cannot lose updates. Email dispatch runs after the lock
/// is released.
pub struct ConsultationDesk<S: Storage> {
    storage: Arc<Mutex<S>>,
    dispatcher: Arc<dyn EmailDispatcher>,
}

impl<S: Storage> Clone for ConsultationDesk<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<S: Storage + 'static> ConsultationDesk<S> {
    /// Create a desk over the given store and dispatcher.
    pub fn new(storage: Arc<Mutex<S>>, dispatcher: Arc<dyn EmailDispatcher>) -> Self {
        Self {
            storage,
            dispatcher,
        }
    }

    /// Validate and persist a submission, then trigger email dispatch in the
    /// background. Dispatch failures never fail this call; the record is
    /// already durable.
    pub async fn submit(&self, input: NewConsultation) -> Result<Consultation> {
        validate(&input)?;

        let now = chrono::Utc::now();
        let consultation = Consultation {
            id: ConsultationId::new(),
            name: input.name,
            email: input.email.trim().to_string(),
            phone: input.phone,
            company: input.company,
            industry: input.industry,
            project_type: input.project_type,
            budget: input.budget,
            timeline: input.timeline,
            project_details: input.project_details,
            additional_notes: input.additional_notes,
            uploaded_files: input.uploaded_files,
            submitted_at: now,
            status: ConsultationStatus::Pending,
            notes: None,
            follow_up: None,
            last_updated: now,
            email_sent: None,
            admin_notified: None,
            project_id: None,
        };

        {
            let mut storage = self.storage.lock().await;
            storage.save_consultation(&consultation).await?;
            storage
                .save_audit_event(
                    &AuditEvent::new(Actor::public(), AuditAction::ConsultationSubmitted)
                        .target(consultation.id),
                )
                .await?;
        }

        info!(consultation = %consultation.id, "consultation submitted");

        let desk = self.clone();
        let id = consultation.id;
        tokio::spawn(async move {
            desk.dispatch_notifications(id).await;
        });

        Ok(consultation)
    }

    /// Run the email dispatch for a saved consultation and record both
    /// outcomes on it. Normally spawned by [`submit`]; public so callers and
    /// tests can run it to completion. Sends whose outcome is already
    /// recorded on the record are skipped, so driving this after `submit`
    /// never repeats an email.
    ///
    /// [`submit`]: ConsultationDesk::submit
    pub async fn dispatch_notifications(&self, id: ConsultationId) {
        let consultation = {
            let storage = self.storage.lock().await;
            match storage.load_consultation(id).await {
                Ok(Some(c)) => c,
                Ok(None) => {
                    warn!(consultation = %id, "dispatch skipped: record vanished");
                    return;
                }
                Err(e) => {
                    warn!(consultation = %id, error = %e, "dispatch skipped: load failed");
                    return;
                }
            }
        };

        let mut email_sent = consultation.email_sent;
        let mut admin_notified = consultation.admin_notified;

        if email_sent.is_none() {
            let confirmation = self
                .bounded(self.dispatcher.send_confirmation(&consultation))
                .await;
            if let Some(err) = confirmation.error.as_deref() {
                warn!(consultation = %id, error = err, "confirmation email failed");
            }
            email_sent = Some(confirmation.success);
        }
        if admin_notified.is_none() {
            let notification = self
                .bounded(self.dispatcher.send_admin_notification(&consultation))
                .await;
            if let Some(err) = notification.error.as_deref() {
                warn!(consultation = %id, error = err, "admin notification failed");
            }
            admin_notified = Some(notification.success);
        }

        // Both outcomes were already settled; nothing to record.
        if email_sent == consultation.email_sent && admin_notified == consultation.admin_notified {
            return;
        }

        let mut storage = self.storage.lock().await;
        // Reload: the record may have moved on while the emails were in flight.
        let mut current = match storage.load_consultation(id).await {
            Ok(Some(c)) => c,
            _ => return,
        };
        current.email_sent = current.email_sent.or(email_sent);
        current.admin_notified = current.admin_notified.or(admin_notified);
        current.last_updated = chrono::Utc::now();
        if let Err(e) = storage.save_consultation(&current).await {
            warn!(consultation = %id, error = %e, "failed to record dispatch outcome");
        }
    }

    async fn bounded(
        &self,
        send: impl std::future::Future<Output = DispatchOutcome>,
    ) -> DispatchOutcome {
        match tokio::time::timeout(DISPATCH_TIMEOUT, send).await {
            Ok(outcome) => outcome,
            Err(_) => DispatchOutcome::failed(format!(
                "dispatch timed out after {}s",
                DISPATCH_TIMEOUT.as_secs()
            )),
        }
    }

    /// Load a consultation.
    pub async fn get(&self, id: ConsultationId) -> Result<Consultation> {
        self.storage
            .lock()
            .await
            .load_consultation(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("consultation {id}")))
    }

    /// Move a consultation along the state machine. Disallowed edges fail
    /// with `InvalidTransition` and leave the record unchanged.
    pub async fn transition(
        &self,
        actor: Actor,
        id: ConsultationId,
        new_status: ConsultationStatus,
    ) -> Result<Consultation> {
        let mut storage = self.storage.lock().await;
        let mut consultation = storage
            .load_consultation(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("consultation {id}")))?;

        // Converted is reachable only through project conversion.
        if new_status == ConsultationStatus::Converted
            || !consultation.status.can_transition(new_status)
        {
            return Err(Error::InvalidTransition {
                from: consultation.status.to_string(),
                to: new_status.to_string(),
            });
        }

        let previous = consultation.status;
        consultation.status = new_status;
        consultation.last_updated = chrono::Utc::now();
        storage.save_consultation(&consultation).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(actor, AuditAction::ConsultationTransitioned)
                    .target(id)
                    .metadata(serde_json::json!({
                        "from": previous.as_str(),
                        "to": new_status.as_str(),
                    })),
            )
            .await?;
        Ok(consultation)
    }

    /// Update internal notes and the follow-up date.
    pub async fn update_notes(
        &self,
        actor: Actor,
        id: ConsultationId,
        notes: Option<String>,
        follow_up: Option<Time>,
    ) -> Result<Consultation> {
        let mut storage = self.storage.lock().await;
        let mut consultation = storage
            .load_consultation(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("consultation {id}")))?;

        consultation.notes = notes;
        consultation.follow_up = follow_up;
        consultation.last_updated = chrono::Utc::now();
        storage.save_consultation(&consultation).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(actor, AuditAction::ConsultationAnnotated).target(id),
            )
            .await?;
        Ok(consultation)
    }

    /// Case-insensitive substring search over name, email, company and
    /// phone, in submission order.
    pub async fn search(&self, query: &str) -> Result<Vec<Consultation>> {
        let needle = query.to_lowercase();
        let all = self.storage.lock().await.list_consultations().await?;
        Ok(all
            .into_iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle)
                    || c.email.to_lowercase().contains(&needle)
                    || c.company
                        .as_deref()
                        .map(|v| v.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                    || c.phone
                        .as_deref()
                        .map(|v| v.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            })
            .collect())
    }

    /// Pure filter by status and/or submission window, in submission order.
    pub async fn filter(&self, filter: &ConsultationFilter) -> Result<Vec<Consultation>> {
        let all = self.storage.lock().await.list_consultations().await?;
        Ok(all
            .into_iter()
            .filter(|c| {
                if let Some(status) = filter.status {
                    if c.status != status {
                        return false;
                    }
                }
                if let Some((from, to)) = filter.submitted_between {
                    if c.submitted_at < from || c.submitted_at > to {
                        return false;
                    }
                }
                true
            })
            .collect())
    }

    /// Aggregate counts, recomputed in one pass over the full list.
    pub async fn stats(&self) -> Result<ConsultationStats> {
        let all = self.storage.lock().await.list_consultations().await?;
        let now = chrono::Utc::now();
        let week_ago = now - chrono::Duration::days(7);
        let month_ago = now - chrono::Duration::days(30);

        let mut stats = ConsultationStats::default();
        for c in &all {
            stats.total += 1;
            match c.status {
                ConsultationStatus::Pending => stats.pending += 1,
                ConsultationStatus::Contacted => stats.contacted += 1,
                ConsultationStatus::Completed => stats.completed += 1,
                ConsultationStatus::Converted => stats.converted += 1,
                ConsultationStatus::Cancelled => stats.cancelled += 1,
            }
            if c.submitted_at >= week_ago {
                stats.last_7_days += 1;
            }
            if c.submitted_at >= month_ago {
                stats.last_30_days += 1;
            }
            *stats
                .by_project_type
                .entry(c.project_type.clone())
                .or_insert(0) += 1;
            *stats.by_budget.entry(c.budget.clone()).or_insert(0) += 1;
        }
        Ok(stats)
    }

    /// Permanently delete a consultation. Projects that already reference it
    /// keep their historical client data.
    pub async fn delete(&self, actor: Actor, id: ConsultationId) -> Result<()> {
        let mut storage = self.storage.lock().await;
        storage.delete_consultation(id).await?;
        storage
            .save_audit_event(&AuditEvent::new(actor, AuditAction::ConsultationDeleted).target(id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use async_trait::async_trait;
    use leaddesk_dispatch::NullDispatcher;
    use leaddesk_storage::MemoryStorage;

    #[derive(Default)]
    struct CountingDispatcher {
        confirmations: AtomicUsize,
        notifications: AtomicUsize,
    }

    #[async_trait]
    impl EmailDispatcher for CountingDispatcher {
        async fn send_confirmation(&self, _consultation: &Consultation) -> DispatchOutcome {
            self.confirmations.fetch_add(1, Ordering::SeqCst);
            DispatchOutcome::ok()
        }

        async fn send_admin_notification(&self, _consultation: &Consultation) -> DispatchOutcome {
            self.notifications.fetch_add(1, Ordering::SeqCst);
            DispatchOutcome::ok()
        }
    }

    fn desk_with(dispatcher: Arc<dyn EmailDispatcher>) -> ConsultationDesk<MemoryStorage> {
        ConsultationDesk::new(Arc::new(Mutex::new(MemoryStorage::new())), dispatcher)
    }

    fn desk() -> ConsultationDesk<MemoryStorage> {
        desk_with(Arc::new(NullDispatcher::succeeding()))
    }

    fn submission() -> NewConsultation {
        NewConsultation {
            name: "Jane Doe".into(),
            email: "jane@x.com".into(),
            phone: Some("+44 20 7946 0000".into()),
            company: Some("Doe Ltd".into()),
            industry: Some("Retail".into()),
            project_type: "AI Chatbot".into(),
            budget: "£5,000-£15,000".into(),
            timeline: Some("3 months".into()),
            project_details: "A support chatbot that answers storefront questions.".into(),
            additional_notes: None,
            uploaded_files: vec!["brief.pdf".into()],
        }
    }

    #[tokio::test]
    async fn submit_creates_a_pending_record() {
        let desk = desk();
        let c = desk.submit(submission()).await.unwrap();
        assert_eq!(c.status, ConsultationStatus::Pending);
        assert_eq!(c.name, "Jane Doe");
        assert!(c.project_id.is_none());

        let stored = desk.get(c.id).await.unwrap();
        assert_eq!(stored.email, "jane@x.com");
    }

    #[tokio::test]
    async fn submit_rejects_invalid_input_without_persisting() {
        let desk = desk();
        let mut bad = submission();
        bad.email = "not-an-email".into();
        assert!(matches!(
            desk.submit(bad).await,
            Err(Error::Validation { field: "email", .. })
        ));
        assert_eq!(desk.stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn dispatch_outcome_is_recorded_on_success() {
        let desk = desk();
        let c = desk.submit(submission()).await.unwrap();
        desk.dispatch_notifications(c.id).await;

        let stored = desk.get(c.id).await.unwrap();
        assert_eq!(stored.email_sent, Some(true));
        assert_eq!(stored.admin_notified, Some(true));
    }

    #[tokio::test]
    async fn driving_dispatch_after_submit_sends_each_email_once() {
        let dispatcher = Arc::new(CountingDispatcher::default());
        let desk = desk_with(dispatcher.clone());

        let c = desk.submit(submission()).await.unwrap();
        // Drive dispatch to completion, then again: the second run (and the
        // task submit spawned, whenever it lands) must skip settled sends.
        desk.dispatch_notifications(c.id).await;
        desk.dispatch_notifications(c.id).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(dispatcher.confirmations.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.notifications.load(Ordering::SeqCst), 1);
        let stored = desk.get(c.id).await.unwrap();
        assert_eq!(stored.email_sent, Some(true));
        assert_eq!(stored.admin_notified, Some(true));
    }

    #[tokio::test]
    async fn dispatch_failure_is_recorded_but_record_survives() {
        let desk = desk_with(Arc::new(NullDispatcher::failing()));
        let c = desk.submit(submission()).await.unwrap();
        desk.dispatch_notifications(c.id).await;

        let stored = desk.get(c.id).await.unwrap();
        assert_eq!(stored.email_sent, Some(false));
        assert_eq!(stored.admin_notified, Some(false));
        assert_eq!(stored.status, ConsultationStatus::Pending);
    }

    #[tokio::test]
    async fn transition_walks_the_happy_path() {
        let desk = desk();
        let c = desk.submit(submission()).await.unwrap();

        let c = desk
            .transition(Actor::system(), c.id, ConsultationStatus::Contacted)
            .await
            .unwrap();
        assert_eq!(c.status, ConsultationStatus::Contacted);

        let c = desk
            .transition(Actor::system(), c.id, ConsultationStatus::Completed)
            .await
            .unwrap();
        assert_eq!(c.status, ConsultationStatus::Completed);
    }

    #[tokio::test]
    async fn disallowed_transition_leaves_record_unchanged() {
        let desk = desk();
        let c = desk.submit(submission()).await.unwrap();
        desk.transition(Actor::system(), c.id, ConsultationStatus::Contacted)
            .await
            .unwrap();
        desk.transition(Actor::system(), c.id, ConsultationStatus::Completed)
            .await
            .unwrap();

        let err = desk
            .transition(Actor::system(), c.id, ConsultationStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        let stored = desk.get(c.id).await.unwrap();
        assert_eq!(stored.status, ConsultationStatus::Completed);
    }

    #[tokio::test]
    async fn transition_cannot_reach_converted_directly() {
        let desk = desk();
        let c = desk.submit(submission()).await.unwrap();
        desk.transition(Actor::system(), c.id, ConsultationStatus::Contacted)
            .await
            .unwrap();
        desk.transition(Actor::system(), c.id, ConsultationStatus::Completed)
            .await
            .unwrap();

        let err = desk
            .transition(Actor::system(), c.id, ConsultationStatus::Converted)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn contacted_can_be_cancelled() {
        let desk = desk();
        let c = desk.submit(submission()).await.unwrap();
        desk.transition(Actor::system(), c.id, ConsultationStatus::Contacted)
            .await
            .unwrap();
        let c = desk
            .transition(Actor::system(), c.id, ConsultationStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(c.status, ConsultationStatus::Cancelled);
    }

    #[tokio::test]
    async fn search_matches_across_contact_fields() {
        let desk = desk();
        desk.submit(submission()).await.unwrap();
        let mut other = submission();
        other.name = "Bob Smith".into();
        other.email = "bob@acme.io".into();
        other.company = Some("Acme".into());
        desk.submit(other).await.unwrap();

        assert_eq!(desk.search("JANE").await.unwrap().len(), 1);
        assert_eq!(desk.search("acme").await.unwrap().len(), 1);
        assert_eq!(desk.search("7946").await.unwrap().len(), 2);
        assert!(desk.search("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn filter_by_status() {
        let desk = desk();
        let a = desk.submit(submission()).await.unwrap();
        desk.submit(submission()).await.unwrap();
        desk.transition(Actor::system(), a.id, ConsultationStatus::Contacted)
            .await
            .unwrap();

        let pending = desk
            .filter(&ConsultationFilter {
                status: Some(ConsultationStatus::Pending),
                submitted_between: None,
            })
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn stats_are_recomputed_per_call() {
        let desk = desk();
        desk.submit(submission()).await.unwrap();
        let first = desk.stats().await.unwrap();
        assert_eq!(first.total, 1);
        assert_eq!(first.pending, 1);
        assert_eq!(first.last_7_days, 1);
        assert_eq!(first.by_project_type.get("AI Chatbot"), Some(&1));

        desk.submit(submission()).await.unwrap();
        let second = desk.stats().await.unwrap();
        assert_eq!(second.total, 2);
        assert_eq!(second.by_budget.get("£5,000-£15,000"), Some(&2));
    }

    #[tokio::test]
    async fn delete_missing_id_is_not_found() {
        let desk = desk();
        let err = desk
            .delete(Actor::system(), ConsultationId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn update_notes_sets_follow_up() {
        let desk = desk();
        let c = desk.submit(submission()).await.unwrap();
        let follow_up = chrono::Utc::now() + chrono::Duration::days(3);
        let updated = desk
            .update_notes(
                Actor::system(),
                c.id,
                Some("call scheduled".into()),
                Some(follow_up),
            )
            .await
            .unwrap();
        assert_eq!(updated.notes.as_deref(), Some("call scheduled"));
        assert_eq!(updated.follow_up, Some(follow_up));
    }
}
