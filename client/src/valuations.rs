//! Typed operations on the valuation backend.
//!
//! Every operation validates its parameters before touching the network,
//! unwraps the response envelope, and — for mutations — invalidates the
//! matching cache entries so stale listings aren't served afterwards.

use reqwest::Method;

use payloads::{
    Identity, Session, ValuationId, ValuationStatus,
    requests::{
        self, FEEDBACK_MAX_LEN, ManagerSubmit, RequestRework, SubmitAction,
        validate_required_text,
    },
    responses,
};

use crate::{ApiClient, CachePolicy, ClientError};

/// Cache-key fragment shared by every valuation read.
const CACHE_PATTERN: &str = "valuations";

fn require_valid_identity(identity: &Identity) -> Result<(), ClientError> {
    let validation = identity.validation();
    match validation.error_message() {
        None => Ok(()),
        Some(message) => Err(ClientError::Validation(message.to_string())),
    }
}

fn status_query(status: Option<ValuationStatus>) -> Vec<(String, String)> {
    status
        .map(|status| {
            vec![("status".to_string(), status.as_str().to_string())]
        })
        .unwrap_or_default()
}

fn require_feedback(feedback: &str) -> Result<(), ClientError> {
    use payloads::requests::RequiredTextValidation;

    match validate_required_text(feedback, FEEDBACK_MAX_LEN) {
        RequiredTextValidation::Valid => Ok(()),
        RequiredTextValidation::Empty => {
            Err(ClientError::Validation("Feedback is required".to_string()))
        }
        RequiredTextValidation::TooLong => {
            Err(ClientError::Validation("Feedback is too long".to_string()))
        }
    }
}

/// Methods on the backend API.
impl ApiClient {
    /// Authenticate and store the returned session credentials. Starts a
    /// new session episode, so a later expiry notifies again.
    pub async fn login(
        &self,
        credentials: &requests::LoginCredentials,
    ) -> Result<Session, ClientError> {
        let session: Session =
            self.post_unauthenticated("auth/login", credentials).await?;
        self.save_session(&session);
        self.rearm_unauthorized_notice();
        Ok(session)
    }

    /// Forget the stored session and drop any cached responses scoped to
    /// it.
    pub fn logout(&self) {
        self.clear_session();
        self.clear_cache();
    }

    pub async fn get_valuation(
        &self,
        id: &ValuationId,
        identity: &Identity,
    ) -> Result<responses::Valuation, ClientError> {
        require_valid_identity(identity)?;
        self.get_envelope(
            &format!("valuations/{id}"),
            Vec::new(),
            CachePolicy::default(),
        )
        .await
    }

    /// Fetch a record, serving a fresh cached copy when one exists.
    pub async fn get_valuation_cached(
        &self,
        id: &ValuationId,
        identity: &Identity,
    ) -> Result<responses::Valuation, ClientError> {
        require_valid_identity(identity)?;
        self.get_envelope(
            &format!("valuations/{id}"),
            Vec::new(),
            CachePolicy::CacheFirst,
        )
        .await
    }

    pub async fn list_valuations(
        &self,
        identity: &Identity,
        status: Option<ValuationStatus>,
    ) -> Result<Vec<responses::ValuationSummary>, ClientError> {
        require_valid_identity(identity)?;
        self.get_envelope(
            "valuations",
            status_query(status),
            CachePolicy::default(),
        )
        .await
    }

    /// List valuations, serving a fresh cached listing when one exists.
    pub async fn list_valuations_cached(
        &self,
        identity: &Identity,
        status: Option<ValuationStatus>,
    ) -> Result<Vec<responses::ValuationSummary>, ClientError> {
        require_valid_identity(identity)?;
        self.get_envelope(
            "valuations",
            status_query(status),
            CachePolicy::CacheFirst,
        )
        .await
    }

    pub async fn create_valuation(
        &self,
        details: &requests::CreateValuation,
        identity: &Identity,
    ) -> Result<responses::Valuation, ClientError> {
        require_valid_identity(identity)?;
        let valuation = self
            .request_envelope(Method::POST, "valuations", details)
            .await?;
        self.invalidate_cache(CACHE_PATTERN);
        Ok(valuation)
    }

    pub async fn update_valuation(
        &self,
        id: &ValuationId,
        details: &requests::UpdateValuation,
        identity: &Identity,
    ) -> Result<responses::Valuation, ClientError> {
        require_valid_identity(identity)?;
        let valuation = self
            .request_envelope(
                Method::PUT,
                &format!("valuations/{id}"),
                details,
            )
            .await?;
        self.invalidate_cache(CACHE_PATTERN);
        Ok(valuation)
    }

    pub async fn delete_valuation(
        &self,
        id: &ValuationId,
        identity: &Identity,
    ) -> Result<(), ClientError> {
        require_valid_identity(identity)?;
        self.delete_envelope(&format!("valuations/{id}")).await?;
        self.invalidate_cache(CACHE_PATTERN);
        Ok(())
    }

    /// Manager verdict on a submitted valuation. Rejection requires
    /// feedback for the valuer; approval feedback is optional.
    pub async fn manager_submit(
        &self,
        id: &ValuationId,
        action: SubmitAction,
        feedback: Option<&str>,
        identity: &Identity,
    ) -> Result<responses::Valuation, ClientError> {
        require_valid_identity(identity)?;
        if action == SubmitAction::Rejected {
            require_feedback(feedback.unwrap_or_default())?;
        }
        let body = ManagerSubmit {
            action,
            feedback: feedback.map(str::to_string),
            username: identity.username.clone(),
            user_role: identity.role,
            client_id: identity.client_id.clone(),
        };
        let valuation = self
            .request_envelope(
                Method::POST,
                &format!("valuations/{id}/manager-submit"),
                &body,
            )
            .await?;
        self.invalidate_cache(CACHE_PATTERN);
        Ok(valuation)
    }

    /// Send an approved-or-rework-bound valuation back to the valuer with
    /// instructions.
    pub async fn request_rework(
        &self,
        id: &ValuationId,
        feedback: &str,
        identity: &Identity,
    ) -> Result<responses::Valuation, ClientError> {
        require_valid_identity(identity)?;
        require_feedback(feedback)?;
        let body = RequestRework {
            feedback: feedback.to_string(),
            username: identity.username.clone(),
            user_role: identity.role,
            client_id: identity.client_id.clone(),
        };
        let valuation = self
            .request_envelope(
                Method::POST,
                &format!("valuations/{id}/request-rework"),
                &body,
            )
            .await?;
        self.invalidate_cache(CACHE_PATTERN);
        Ok(valuation)
    }
}
