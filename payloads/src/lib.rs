use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod requests;
pub mod responses;

/// Largest accepted image payload, in bytes.
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;
/// Largest accepted document payload, in bytes.
pub const MAX_DOCUMENT_SIZE: usize = 10 * 1024 * 1024;

#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct ValuationId(pub Uuid);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed valuation id: {0}")]
pub struct ParseIdError(pub String);

impl std::str::FromStr for ValuationId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ParseIdError(s.to_string()))
    }
}

/// Lifecycle of a valuation record. Owned by the backend; the client only
/// transports it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ValuationStatus {
    Pending,
    OnProgress,
    Rejected,
    Rework,
    Approved,
}

impl ValuationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::OnProgress => "on-progress",
            Self::Rejected => "rejected",
            Self::Rework => "rework",
            Self::Approved => "approved",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Valuer,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valuer => "valuer",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }
}

/// The stored login credential pair plus the identity fields the backend
/// expects on every scoped request.
///
/// Persisted as a single JSON record; mutated only by login and refresh,
/// deleted on unrecoverable auth failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub refresh_token: String,
    pub username: String,
    pub role: Role,
    pub client_id: String,
}

impl Session {
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            role: self.role,
            client_id: self.client_id.clone(),
        }
    }
}

/// Who a request is acting as. The backend requires these fields for
/// authorization scoping on reads and in the bodies of workflow actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub username: String,
    pub role: Role,
    pub client_id: String,
}

/// Validation result for an [`Identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityValidation {
    Valid,
    MissingUsername,
    MissingClientId,
}

impl IdentityValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            Self::Valid => None,
            Self::MissingUsername => Some("Username is required"),
            Self::MissingClientId => Some("Client id is required"),
        }
    }
}

impl Identity {
    pub fn validation(&self) -> IdentityValidation {
        if self.username.trim().is_empty() {
            return IdentityValidation::MissingUsername;
        }
        if self.client_id.trim().is_empty() {
            return IdentityValidation::MissingClientId;
        }
        IdentityValidation::Valid
    }
}

/// The `{success, message, data}` wrapper convention used by all resource
/// endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// A `success: false` body (or a success body missing its payload),
/// normalized to a single human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EnvelopeError {
    pub message: String,
}

impl<T> Envelope<T> {
    /// Unwrap the payload, normalizing failures to [`EnvelopeError`].
    pub fn into_result(self) -> Result<T, EnvelopeError> {
        if !self.success {
            return Err(EnvelopeError {
                message: self
                    .message
                    .unwrap_or_else(|| "Request failed".to_string()),
            });
        }
        self.data.ok_or(EnvelopeError {
            message: "Response is missing data".to_string(),
        })
    }

    /// Check success for operations that return no payload.
    pub fn into_empty_result(self) -> Result<(), EnvelopeError> {
        if self.success {
            Ok(())
        } else {
            Err(EnvelopeError {
                message: self
                    .message
                    .unwrap_or_else(|| "Request failed".to_string()),
            })
        }
    }
}

/// Server-side metadata for an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Images attached to one named area of the property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaImages {
    pub area: String,
    pub images: Vec<UploadedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub applicant_name: String,
    pub bank_name: String,
    pub branch_name: String,
    pub loan_account_number: Option<String>,
    pub inspection_date: Option<jiff::civil::Date>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructionInfo {
    pub structure_type: String,
    pub floors: u32,
    pub age_years: u32,
    pub condition: String,
    pub occupancy: Option<String>,
}

/// One measured area of the property (a room, a floor, a plot segment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaMeasurement {
    pub name: String,
    pub length_m: Decimal,
    pub width_m: Decimal,
}

impl AreaMeasurement {
    pub fn area_sqm(&self) -> Decimal {
        self.length_m * self.width_m
    }
}

/// The market-value computation: land and building each valued as
/// area × rate, summed into the total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketValue {
    pub land_area_sqm: Decimal,
    pub land_rate_per_sqm: Decimal,
    pub land_value: Decimal,
    pub building_area_sqm: Decimal,
    pub building_rate_per_sqm: Decimal,
    pub building_value: Decimal,
    pub total_value: Decimal,
}

impl MarketValue {
    pub fn compute(
        land_area_sqm: Decimal,
        land_rate_per_sqm: Decimal,
        building_area_sqm: Decimal,
        building_rate_per_sqm: Decimal,
    ) -> Self {
        let land_value = land_area_sqm * land_rate_per_sqm;
        let building_value = building_area_sqm * building_rate_per_sqm;
        Self {
            land_area_sqm,
            land_rate_per_sqm,
            land_value,
            building_area_sqm,
            building_rate_per_sqm,
            building_value,
            total_value: land_value + building_value,
        }
    }
}
