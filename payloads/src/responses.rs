use crate::{
    AreaImages, AreaMeasurement, ClientInfo, ConstructionInfo, LocationInfo,
    MarketValue, UploadedFile, ValuationId, ValuationStatus,
};
use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A full valuation record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Valuation {
    pub id: ValuationId,
    pub status: ValuationStatus,
    pub client_info: ClientInfo,
    pub location: LocationInfo,
    pub construction: ConstructionInfo,
    pub areas: Vec<AreaMeasurement>,
    pub market_value: MarketValue,
    #[serde(default)]
    pub property_images: Vec<UploadedFile>,
    #[serde(default)]
    pub location_images: Vec<UploadedFile>,
    #[serde(default)]
    pub area_images: Vec<AreaImages>,
    #[serde(default)]
    pub documents: Vec<UploadedFile>,
    /// Manager feedback from the most recent reject/rework, if any.
    #[serde(default)]
    pub feedback: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One row of the valuation listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationSummary {
    pub id: ValuationId,
    pub applicant_name: String,
    pub city: String,
    pub status: ValuationStatus,
    pub total_value: Decimal,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesUploadResponse {
    pub images: Vec<UploadedFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsUploadResponse {
    pub documents: Vec<UploadedFile>,
}
