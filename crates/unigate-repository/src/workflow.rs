//! Operations that span more than one entity type

use serde::Deserialize;
use serde_json::Value;
use unigate_core::Document;

use crate::repository::EntityRepository;
use crate::{RepositoryError, RepositoryResult};

/// Applicant-supplied part of a job application
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationSubmission {
    pub applicant_name: String,
    pub applicant_email: String,
    pub applicant_phone: String,
    pub resume_url: Option<String>,
    pub cover_letter_notes: Option<String>,
}

/// Submits applications against existing jobs.
///
/// The job is only read. Nothing is written unless the job exists at the
/// given id and location.
#[derive(Debug, Clone)]
pub struct ApplicationWorkflow {
    jobs: EntityRepository,
    applications: EntityRepository,
}

impl ApplicationWorkflow {
    pub fn new(jobs: EntityRepository, applications: EntityRepository) -> Self {
        Self { jobs, applications }
    }

    pub async fn submit(
        &self,
        job_id: &str,
        job_location: Option<&str>,
        submission: ApplicationSubmission,
    ) -> RepositoryResult<Document> {
        let job_location = job_location
            .filter(|l| !l.trim().is_empty() && !job_id.trim().is_empty())
            .ok_or_else(|| RepositoryError::MissingPartitionKey {
                entity: "Job".to_string(),
                field: "jobLocation".to_string(),
            })?;

        let mut application = Document::new();
        application.insert("jobId", job_id);
        application.insert("applicantName", submission.applicant_name);
        application.insert("applicantEmail", submission.applicant_email);
        application.insert("applicantPhone", submission.applicant_phone);
        if let Some(resume_url) = submission.resume_url {
            application.insert("resumeUrl", resume_url);
        }
        if let Some(notes) = submission.cover_letter_notes {
            application.insert("coverLetterNotes", notes);
        }
        self.applications.schema().validate(&application)?;

        let job = self.jobs.get_by_id(job_id, Some(job_location)).await?;
        if !job.has_value("contactEmail") {
            return Err(RepositoryError::validation("Job poster contact email missing"));
        }

        let copied = |field: &str| job.get(field).cloned().unwrap_or(Value::Null);
        application.insert("jobTitle", copied("title"));
        application.insert("companyName", copied("companyName"));
        application.insert("jobPosterEmail", copied("contactEmail"));

        let created = self.applications.create(application).await?;
        tracing::info!(
            "Application {} submitted for job {}",
            created.id().unwrap_or_default(),
            job_id
        );
        Ok(created)
    }
}

/// Records per-user data in the housing property container
#[derive(Debug, Clone)]
pub struct UserDataWorkflow {
    properties: EntityRepository,
}

impl UserDataWorkflow {
    pub fn new(properties: EntityRepository) -> Self {
        Self { properties }
    }

    /// Upsert `data` under a fresh `<email>-<millis>` id.
    ///
    /// Fields in `data` win over the generated `id` and `email`.
    pub async fn record(&self, email: &str, data: Document) -> RepositoryResult<Document> {
        if email.trim().is_empty() {
            return Err(RepositoryError::validation(
                "Email is required to manage user-specific data",
            ));
        }

        let mut document = Document::new();
        document.insert("email", email);
        if let Some(id) = self.properties.schema().generated_id(&document) {
            document.set_id(id);
        }
        document.merge(&data);

        self.properties.upsert(document).await
    }
}
