use crate::{
    AreaImages, AreaMeasurement, ClientInfo, ConstructionInfo, LocationInfo,
    MarketValue, Role, UploadedFile, ValuationStatus,
};
use serde::{Deserialize, Serialize};

pub const TEXT_FIELD_MAX_LEN: usize = 255;
pub const FEEDBACK_MAX_LEN: usize = 2000;
pub const PINCODE_LEN: usize = 6;

/// Validation result for required free-text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredTextValidation {
    Valid,
    Empty,
    TooLong,
}

impl RequiredTextValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            Self::Valid => None,
            Self::Empty => Some("This field is required"),
            Self::TooLong => Some("This field is too long"),
        }
    }
}

pub fn validate_required_text(
    text: &str,
    max_len: usize,
) -> RequiredTextValidation {
    if text.trim().is_empty() {
        return RequiredTextValidation::Empty;
    }
    if text.len() > max_len {
        return RequiredTextValidation::TooLong;
    }
    RequiredTextValidation::Valid
}

/// Validation result for postal pincodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PincodeValidation {
    Valid,
    WrongLength,
    NotNumeric,
}

impl PincodeValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            Self::Valid => None,
            Self::WrongLength => Some("Pincode must be 6 digits"),
            Self::NotNumeric => Some("Pincode can only contain digits"),
        }
    }
}

/// Validate a postal pincode: exactly 6 ASCII digits.
pub fn validate_pincode(pincode: &str) -> PincodeValidation {
    if pincode.len() != PINCODE_LEN {
        return PincodeValidation::WrongLength;
    }
    if !pincode.chars().all(|c| c.is_ascii_digit()) {
        return PincodeValidation::NotNumeric;
    }
    PincodeValidation::Valid
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateValuation {
    pub client_info: ClientInfo,
    pub location: LocationInfo,
    pub construction: ConstructionInfo,
    pub areas: Vec<AreaMeasurement>,
    pub market_value: MarketValue,
}

/// Full-record update, including asset metadata gathered from uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuation {
    pub status: ValuationStatus,
    pub client_info: ClientInfo,
    pub location: LocationInfo,
    pub construction: ConstructionInfo,
    pub areas: Vec<AreaMeasurement>,
    pub market_value: MarketValue,
    pub property_images: Vec<UploadedFile>,
    pub location_images: Vec<UploadedFile>,
    pub area_images: Vec<AreaImages>,
    pub documents: Vec<UploadedFile>,
}

/// The manager's verdict on a submitted valuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitAction {
    Approved,
    Rejected,
}

impl SubmitAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSubmit {
    pub action: SubmitAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub username: String,
    pub user_role: Role,
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRework {
    pub feedback: String,
    pub username: String,
    pub user_role: Role,
    pub client_id: String,
}
