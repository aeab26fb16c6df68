//! Owned state for the valuation data-entry workflow.
//!
//! The form holds the section structs plus the asset lists picked by the
//! user, validates them before any network call, and orchestrates the
//! save/submit/approve workflows through the typed services.

use std::sync::Arc;

use rust_decimal::Decimal;

use payloads::{
    AreaImages, AreaMeasurement, ClientInfo, ConstructionInfo, LocationInfo,
    MarketValue, UploadedFile, ValuationId, ValuationStatus,
    requests::{
        self, SubmitAction, TEXT_FIELD_MAX_LEN, validate_pincode,
        validate_required_text,
    },
    responses,
};

use crate::uploads::{
    Asset, AssetCategory, FileProcessor, Passthrough, upload_assets,
};
use crate::{ApiClient, ClientError};

/// A validation failure on one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// One measured area plus the images attached to it.
#[derive(Debug, Clone, Default)]
pub struct AreaSection {
    pub name: String,
    pub length_m: Decimal,
    pub width_m: Decimal,
    pub images: Vec<Asset>,
}

impl AreaSection {
    fn measurement(&self) -> AreaMeasurement {
        AreaMeasurement {
            name: self.name.clone(),
            length_m: self.length_m,
            width_m: self.width_m,
        }
    }
}

/// What a successful save produced.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub valuation: responses::Valuation,
    /// Assets that failed processing or upload and were left out of the
    /// saved record. The caller decides how to reconcile the gap.
    pub dropped_assets: usize,
}

/// The data-entry form for one valuation record.
pub struct ValuationForm {
    /// Set after the first successful save.
    pub id: Option<ValuationId>,
    pub status: ValuationStatus,
    pub client_info: ClientInfo,
    pub location: LocationInfo,
    pub construction: ConstructionInfo,
    pub areas: Vec<AreaSection>,
    pub land_area_sqm: Decimal,
    pub land_rate_per_sqm: Decimal,
    pub building_area_sqm: Decimal,
    pub building_rate_per_sqm: Decimal,
    pub property_images: Vec<Asset>,
    pub location_images: Vec<Asset>,
    pub documents: Vec<Asset>,
    processor: Arc<dyn FileProcessor>,
}

impl Default for ValuationForm {
    fn default() -> Self {
        Self {
            id: None,
            status: ValuationStatus::Pending,
            client_info: ClientInfo {
                applicant_name: String::new(),
                bank_name: String::new(),
                branch_name: String::new(),
                loan_account_number: None,
                inspection_date: None,
            },
            location: LocationInfo {
                address: String::new(),
                city: String::new(),
                state: String::new(),
                pincode: String::new(),
                latitude: None,
                longitude: None,
            },
            construction: ConstructionInfo {
                structure_type: String::new(),
                floors: 0,
                age_years: 0,
                condition: String::new(),
                occupancy: None,
            },
            areas: Vec::new(),
            land_area_sqm: Decimal::ZERO,
            land_rate_per_sqm: Decimal::ZERO,
            building_area_sqm: Decimal::ZERO,
            building_rate_per_sqm: Decimal::ZERO,
            property_images: Vec::new(),
            location_images: Vec::new(),
            documents: Vec::new(),
            processor: Arc::new(Passthrough),
        }
    }
}

impl ValuationForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an existing record for editing. Asset metadata from the
    /// record counts as already persisted, so saving again only uploads
    /// what the user adds afterwards.
    pub fn from_record(valuation: &responses::Valuation) -> Self {
        let persisted = |files: &[UploadedFile]| {
            files
                .iter()
                .map(|f| Asset::Persisted(f.clone()))
                .collect::<Vec<_>>()
        };
        Self {
            id: Some(valuation.id),
            status: valuation.status,
            client_info: valuation.client_info.clone(),
            location: valuation.location.clone(),
            construction: valuation.construction.clone(),
            areas: valuation
                .areas
                .iter()
                .map(|m| AreaSection {
                    name: m.name.clone(),
                    length_m: m.length_m,
                    width_m: m.width_m,
                    images: valuation
                        .area_images
                        .iter()
                        .find(|a| a.area == m.name)
                        .map(|a| persisted(&a.images))
                        .unwrap_or_default(),
                })
                .collect(),
            land_area_sqm: valuation.market_value.land_area_sqm,
            land_rate_per_sqm: valuation.market_value.land_rate_per_sqm,
            building_area_sqm: valuation.market_value.building_area_sqm,
            building_rate_per_sqm: valuation
                .market_value
                .building_rate_per_sqm,
            property_images: persisted(&valuation.property_images),
            location_images: persisted(&valuation.location_images),
            documents: persisted(&valuation.documents),
            processor: Arc::new(Passthrough),
        }
    }

    /// Swap the pre-upload transform, e.g. for an image compressor.
    pub fn with_processor(mut self, processor: Arc<dyn FileProcessor>) -> Self {
        self.processor = processor;
        self
    }

    /// Market value recomputed from the current area and rate fields.
    pub fn market_value(&self) -> MarketValue {
        MarketValue::compute(
            self.land_area_sqm,
            self.land_rate_per_sqm,
            self.building_area_sqm,
            self.building_rate_per_sqm,
        )
    }

    /// Check every field the backend would refuse, without touching the
    /// network.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let mut required = |field: &'static str, value: &str| {
            let validation = validate_required_text(value, TEXT_FIELD_MAX_LEN);
            if let Some(message) = validation.error_message() {
                errors.push(FieldError {
                    field,
                    message: message.to_string(),
                });
            }
        };

        required("applicantName", &self.client_info.applicant_name);
        required("bankName", &self.client_info.bank_name);
        required("branchName", &self.client_info.branch_name);
        required("address", &self.location.address);
        required("city", &self.location.city);
        required("state", &self.location.state);
        required("structureType", &self.construction.structure_type);

        if let Some(message) =
            validate_pincode(&self.location.pincode).error_message()
        {
            errors.push(FieldError {
                field: "pincode",
                message: message.to_string(),
            });
        }

        for (i, area) in self.areas.iter().enumerate() {
            if area.name.trim().is_empty() {
                errors.push(FieldError {
                    field: "areas",
                    message: format!("Area {} needs a name", i + 1),
                });
            }
            if area.length_m <= Decimal::ZERO || area.width_m <= Decimal::ZERO
            {
                errors.push(FieldError {
                    field: "areas",
                    message: format!(
                        "Area {} needs positive dimensions",
                        i + 1
                    ),
                });
            }
        }

        let positive = [
            ("landAreaSqm", self.land_area_sqm),
            ("landRatePerSqm", self.land_rate_per_sqm),
        ];
        for (field, value) in positive {
            if value <= Decimal::ZERO {
                errors.push(FieldError {
                    field,
                    message: "Must be greater than zero".to_string(),
                });
            }
        }
        let non_negative = [
            ("buildingAreaSqm", self.building_area_sqm),
            ("buildingRatePerSqm", self.building_rate_per_sqm),
        ];
        for (field, value) in non_negative {
            if value < Decimal::ZERO {
                errors.push(FieldError {
                    field,
                    message: "Must not be negative".to_string(),
                });
            }
        }

        errors
    }

    fn require_valid(&self) -> Result<(), ClientError> {
        match self.validate().first() {
            None => Ok(()),
            Some(error) => {
                Err(ClientError::Validation(error.message.clone()))
            }
        }
    }

    fn require_saved(&self) -> Result<ValuationId, ClientError> {
        self.id.ok_or_else(|| {
            ClientError::Validation(
                "The valuation has not been saved yet".to_string(),
            )
        })
    }

    fn create_body(&self) -> requests::CreateValuation {
        requests::CreateValuation {
            client_info: self.client_info.clone(),
            location: self.location.clone(),
            construction: self.construction.clone(),
            areas: self.areas.iter().map(AreaSection::measurement).collect(),
            market_value: self.market_value(),
        }
    }

    /// Validate, upload every pending asset, then create or update the
    /// record. Assets whose processing or upload failed are dropped from
    /// the saved record and counted in the outcome; the save itself still
    /// goes through.
    pub async fn save(
        &mut self,
        client: &ApiClient,
    ) -> Result<SaveOutcome, ClientError> {
        self.require_valid()?;
        let Some(session) = client.session() else {
            return Err(ClientError::Validation(
                "You are not signed in".to_string(),
            ));
        };
        let identity = session.identity();

        // a new record is created first so uploads have a record id to
        // derive their folder paths from
        let id = match self.id {
            Some(id) => id,
            None => {
                let created = client
                    .create_valuation(&self.create_body(), &identity)
                    .await?;
                self.id = Some(created.id);
                self.status = created.status;
                created.id
            }
        };

        let pending = self.pending_asset_count();
        let processor = self.processor.as_ref();
        let (property_images, location_images, documents, area_images) =
            futures::join!(
                upload_assets(
                    client,
                    &id,
                    AssetCategory::PropertyImages,
                    None,
                    &self.property_images,
                    processor,
                ),
                upload_assets(
                    client,
                    &id,
                    AssetCategory::LocationImages,
                    None,
                    &self.location_images,
                    processor,
                ),
                upload_assets(
                    client,
                    &id,
                    AssetCategory::Documents,
                    None,
                    &self.documents,
                    processor,
                ),
                futures::future::join_all(self.areas.iter().map(|area| {
                    let id = id;
                    async move {
                        let images = upload_assets(
                            client,
                            &id,
                            AssetCategory::AreaImages,
                            Some(&area.name),
                            &area.images,
                            processor,
                        )
                        .await;
                        AreaImages {
                            area: area.name.clone(),
                            images,
                        }
                    }
                })),
            );

        let uploaded = property_images.len()
            + location_images.len()
            + documents.len()
            + area_images.iter().map(|a| a.images.len()).sum::<usize>();
        let dropped_assets = self.asset_count() - uploaded;
        if dropped_assets > 0 {
            tracing::warn!(
                dropped_assets,
                pending,
                "some assets were not uploaded"
            );
        }

        let body = requests::UpdateValuation {
            status: self.status,
            client_info: self.client_info.clone(),
            location: self.location.clone(),
            construction: self.construction.clone(),
            areas: self.areas.iter().map(AreaSection::measurement).collect(),
            market_value: self.market_value(),
            property_images: property_images.clone(),
            location_images: location_images.clone(),
            area_images: area_images.clone(),
            documents: documents.clone(),
        };
        let valuation =
            client.update_valuation(&id, &body, &identity).await?;

        // every surviving asset is now persisted
        self.property_images = as_persisted(property_images);
        self.location_images = as_persisted(location_images);
        self.documents = as_persisted(documents);
        for (section, uploaded) in self.areas.iter_mut().zip(area_images) {
            section.images = as_persisted(uploaded.images);
        }
        self.status = valuation.status;

        Ok(SaveOutcome {
            valuation,
            dropped_assets,
        })
    }

    /// Save the record and hand it to a manager for review.
    pub async fn submit_for_review(
        &mut self,
        client: &ApiClient,
    ) -> Result<SaveOutcome, ClientError> {
        let previous = self.status;
        self.status = ValuationStatus::OnProgress;
        match self.save(client).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.status = previous;
                Err(err)
            }
        }
    }

    /// Manager approval. Feedback is optional.
    pub async fn approve(
        &mut self,
        client: &ApiClient,
        feedback: Option<&str>,
    ) -> Result<responses::Valuation, ClientError> {
        let id = self.require_saved()?;
        let identity = require_identity(client)?;
        let valuation = client
            .manager_submit(&id, SubmitAction::Approved, feedback, &identity)
            .await?;
        self.status = valuation.status;
        Ok(valuation)
    }

    /// Manager rejection. Feedback for the valuer is required.
    pub async fn reject(
        &mut self,
        client: &ApiClient,
        feedback: &str,
    ) -> Result<responses::Valuation, ClientError> {
        let id = self.require_saved()?;
        let identity = require_identity(client)?;
        let valuation = client
            .manager_submit(
                &id,
                SubmitAction::Rejected,
                Some(feedback),
                &identity,
            )
            .await?;
        self.status = valuation.status;
        Ok(valuation)
    }

    /// Send the record back to the valuer with instructions.
    pub async fn request_rework(
        &mut self,
        client: &ApiClient,
        feedback: &str,
    ) -> Result<responses::Valuation, ClientError> {
        let id = self.require_saved()?;
        let identity = require_identity(client)?;
        let valuation =
            client.request_rework(&id, feedback, &identity).await?;
        self.status = valuation.status;
        Ok(valuation)
    }

    fn asset_count(&self) -> usize {
        self.property_images.len()
            + self.location_images.len()
            + self.documents.len()
            + self.areas.iter().map(|a| a.images.len()).sum::<usize>()
    }

    fn pending_asset_count(&self) -> usize {
        let pending = |assets: &[Asset]| {
            assets.iter().filter(|a| a.is_pending()).count()
        };
        pending(&self.property_images)
            + pending(&self.location_images)
            + pending(&self.documents)
            + self
                .areas
                .iter()
                .map(|a| pending(&a.images))
                .sum::<usize>()
    }
}

fn require_identity(
    client: &ApiClient,
) -> Result<payloads::Identity, ClientError> {
    client
        .session()
        .map(|s| s.identity())
        .ok_or_else(|| {
            ClientError::Validation("You are not signed in".to_string())
        })
}

fn as_persisted(files: Vec<UploadedFile>) -> Vec<Asset> {
    files.into_iter().map(Asset::Persisted).collect()
}
