//! In-memory store and scripted AI for worker tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::store::IcebreakerStore;
use crate::domains::jobs::{GenerationProgress, GenerationStatus, ScrapeJob};
use crate::domains::leads::{Lead, LeadStatus};
use crate::domains::organization::IcebreakerContext;
use crate::kernel::BaseAI;

pub struct InMemoryStore {
    state: Mutex<State>,
}

struct State {
    jobs: HashMap<Uuid, ScrapeJob>,
    leads: Vec<Lead>,
    contexts: HashMap<Uuid, IcebreakerContext>,
    progress_log: Vec<GenerationProgress>,
}

impl InMemoryStore {
    /// Store seeded with one job in status queued. Returns (store, job id,
    /// organization id).
    pub fn with_job() -> (Arc<Self>, Uuid, Uuid) {
        let job_id = Uuid::new_v4();
        let organization_id = Uuid::new_v4();
        let job = ScrapeJob {
            id: job_id,
            organization_id,
            name: "test job".to_string(),
            icebreaker_generation_status: GenerationStatus::Queued.as_str().to_string(),
            icebreaker_generation_progress: serde_json::json!({
                "completed": 0, "failed": 0, "total": 0
            }),
            icebreaker_generation_started_at: None,
            icebreaker_generation_completed_at: None,
            created_at: Utc::now(),
        };

        let store = Arc::new(Self {
            state: Mutex::new(State {
                jobs: HashMap::from([(job_id, job)]),
                leads: Vec::new(),
                contexts: HashMap::new(),
                progress_log: Vec::new(),
            }),
        });

        (store, job_id, organization_id)
    }

    pub fn push_lead(
        &self,
        job_id: Uuid,
        organization_id: Uuid,
        first_name: &str,
        company: &str,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().leads.push(Lead {
            id,
            scrape_job_id: job_id,
            organization_id,
            first_name: first_name.to_string(),
            last_name: "Doe".to_string(),
            company: company.to_string(),
            title: "Head of Ops".to_string(),
            raw_data: serde_json::json!({}),
            icebreaker_status: LeadStatus::Pending.as_str().to_string(),
            icebreaker: None,
            icebreaker_generated_at: None,
            created_at: Utc::now(),
        });
        id
    }

    pub fn push_leads(&self, job_id: Uuid, organization_id: Uuid, count: usize) -> Vec<Uuid> {
        (0..count)
            .map(|i| self.push_lead(job_id, organization_id, &format!("Lead{}", i), "Acme Inc"))
            .collect()
    }

    pub fn set_context(&self, context: IcebreakerContext) {
        self.state
            .lock()
            .unwrap()
            .contexts
            .insert(context.organization_id, context);
    }

    pub fn job(&self, job_id: Uuid) -> ScrapeJob {
        self.state.lock().unwrap().jobs[&job_id].clone()
    }

    pub fn lead(&self, lead_id: Uuid) -> Lead {
        self.state
            .lock()
            .unwrap()
            .leads
            .iter()
            .find(|l| l.id == lead_id)
            .cloned()
            .expect("lead exists")
    }

    pub fn lead_statuses(&self, job_id: Uuid) -> HashMap<Uuid, String> {
        self.state
            .lock()
            .unwrap()
            .leads
            .iter()
            .filter(|l| l.scrape_job_id == job_id)
            .map(|l| (l.id, l.icebreaker_status.clone()))
            .collect()
    }

    pub fn progress_log(&self) -> Vec<GenerationProgress> {
        self.state.lock().unwrap().progress_log.clone()
    }

    fn counts(state: &State, job_id: Uuid) -> GenerationProgress {
        let mut progress = GenerationProgress::default();
        for lead in state.leads.iter().filter(|l| l.scrape_job_id == job_id) {
            progress.total += 1;
            match lead.status() {
                Some(LeadStatus::Completed) => progress.completed += 1,
                Some(LeadStatus::Failed) => progress.failed += 1,
                _ => {}
            }
        }
        progress
    }
}

#[async_trait]
impl IcebreakerStore for InMemoryStore {
    async fn find_job(&self, job_id: Uuid) -> Result<Option<ScrapeJob>> {
        Ok(self.state.lock().unwrap().jobs.get(&job_id).cloned())
    }

    async fn begin_job(&self, job_id: Uuid) -> Result<Option<ScrapeJob>> {
        let mut state = self.state.lock().unwrap();
        let Some(job) = state.jobs.get_mut(&job_id) else {
            return Ok(None);
        };
        if !matches!(
            job.generation_status(),
            Some(GenerationStatus::Queued | GenerationStatus::Running)
        ) {
            return Ok(None);
        }
        job.icebreaker_generation_status = GenerationStatus::Running.as_str().to_string();
        job.icebreaker_generation_started_at
            .get_or_insert_with(Utc::now);
        Ok(Some(job.clone()))
    }

    async fn context_for_org(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<IcebreakerContext>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .contexts
            .get(&organization_id)
            .cloned())
    }

    async fn fetch_pending(&self, job_id: Uuid, limit: i64) -> Result<Vec<Lead>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .leads
            .iter()
            .filter(|l| l.scrape_job_id == job_id && l.status() == Some(LeadStatus::Pending))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn claim_pending(&self, lead_ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let mut state = self.state.lock().unwrap();
        let mut claimed = Vec::new();
        for lead in state
            .leads
            .iter_mut()
            .filter(|l| lead_ids.contains(&l.id) && l.status() == Some(LeadStatus::Pending))
        {
            lead.icebreaker_status = LeadStatus::Generating.as_str().to_string();
            claimed.push(lead.id);
        }
        Ok(claimed)
    }

    async fn complete_lead(&self, lead_id: Uuid, icebreaker: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let lead = state
            .leads
            .iter_mut()
            .find(|l| l.id == lead_id)
            .ok_or_else(|| anyhow!("unknown lead"))?;
        lead.icebreaker_status = LeadStatus::Completed.as_str().to_string();
        lead.icebreaker = Some(icebreaker.to_string());
        lead.icebreaker_generated_at = Some(Utc::now());
        Ok(())
    }

    async fn fail_lead(&self, lead_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let lead = state
            .leads
            .iter_mut()
            .find(|l| l.id == lead_id)
            .ok_or_else(|| anyhow!("unknown lead"))?;
        lead.icebreaker_status = LeadStatus::Failed.as_str().to_string();
        Ok(())
    }

    async fn progress_counts(&self, job_id: Uuid) -> Result<GenerationProgress> {
        let state = self.state.lock().unwrap();
        Ok(Self::counts(&state, job_id))
    }

    async fn write_progress(&self, job_id: Uuid, progress: &GenerationProgress) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(job) = state.jobs.get_mut(&job_id) {
            job.icebreaker_generation_progress = serde_json::to_value(progress)?;
        }
        state.progress_log.push(*progress);
        Ok(())
    }

    async fn count_unfinished(&self, job_id: Uuid) -> Result<i64> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .leads
            .iter()
            .filter(|l| {
                l.scrape_job_id == job_id
                    && matches!(
                        l.status(),
                        Some(LeadStatus::Pending | LeadStatus::Generating)
                    )
            })
            .count() as i64)
    }

    async fn finish_job(&self, job_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(job) = state.jobs.get_mut(&job_id) {
            job.icebreaker_generation_status = GenerationStatus::Completed.as_str().to_string();
            job.icebreaker_generation_completed_at
                .get_or_insert_with(Utc::now);
        }
        Ok(())
    }

    async fn requeue_job(&self, job_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(job) = state.jobs.get_mut(&job_id) {
            job.icebreaker_generation_status = GenerationStatus::Queued.as_str().to_string();
        }
        Ok(())
    }
}

/// Scripted completion client. Records every user prompt, optionally
/// sleeps to widen race windows, and fails for prompts containing any
/// configured marker.
pub struct MockAi {
    response: String,
    fail_markers: Vec<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockAi {
    pub fn new() -> Self {
        Self {
            response: r#"{"icebreaker": "Hey there, impressive run."}"#.to_string(),
            fail_markers: Vec::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Fail any call whose user prompt contains the marker.
    pub fn failing_when(mut self, marker: &str) -> Self {
        self.fail_markers.push(marker.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// User prompts in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseAI for MockAi {
    async fn complete_chat(&self, _system: &str, user: &str) -> Result<String> {
        self.calls.lock().unwrap().push(user.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_markers.iter().any(|m| user.contains(m)) {
            return Err(anyhow!("completion API unavailable"));
        }
        Ok(self.response.clone())
    }
}
