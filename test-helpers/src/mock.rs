//! Mock data for valuation client testing
//!
//! One consistent dataset shared by the integration tests: a standard
//! session, a filled-in valuation record, and the matching request
//! bodies. Tests that need variations clone and tweak from here.

use jiff::Timestamp;
use payloads::{
    AreaImages, AreaMeasurement, ClientInfo, ConstructionInfo, Identity,
    LocationInfo, MarketValue, Role, Session, UploadedFile, ValuationId,
    ValuationStatus, requests, responses,
};
use rust_decimal::dec;
use uuid::Uuid;

pub const ACCESS_TOKEN: &str = "T1";
pub const REFRESH_TOKEN: &str = "R1";
pub const USERNAME: &str = "asha";
pub const CLIENT_ID: &str = "bank-7";

pub fn valuation_id() -> ValuationId {
    ValuationId(Uuid::parse_str("6dba9d26-7fc6-4f26-9f1b-3e1b7a0f4a11").unwrap())
}

pub fn session() -> Session {
    Session {
        token: ACCESS_TOKEN.into(),
        refresh_token: REFRESH_TOKEN.into(),
        username: USERNAME.into(),
        role: Role::Valuer,
        client_id: CLIENT_ID.into(),
    }
}

pub fn manager_identity() -> Identity {
    Identity {
        username: "meera".into(),
        role: Role::Manager,
        client_id: CLIENT_ID.into(),
    }
}

pub fn login_credentials() -> requests::LoginCredentials {
    requests::LoginCredentials {
        username: USERNAME.into(),
        password: "a-password".into(),
    }
}

pub fn client_info() -> ClientInfo {
    ClientInfo {
        applicant_name: "Rajesh Kumar".into(),
        bank_name: "HDFC".into(),
        branch_name: "Koramangala".into(),
        loan_account_number: Some("LA-2024-00731".into()),
        inspection_date: Some("2024-12-18".parse().unwrap()),
    }
}

pub fn location_info() -> LocationInfo {
    LocationInfo {
        address: "12 Hosur Road".into(),
        city: "Bengaluru".into(),
        state: "Karnataka".into(),
        pincode: "560034".into(),
        latitude: Some(12.9352),
        longitude: Some(77.6245),
    }
}

pub fn construction_info() -> ConstructionInfo {
    ConstructionInfo {
        structure_type: "RCC framed".into(),
        floors: 2,
        age_years: 8,
        condition: "good".into(),
        occupancy: Some("self-occupied".into()),
    }
}

pub fn areas() -> Vec<AreaMeasurement> {
    vec![
        AreaMeasurement {
            name: "Living Room".into(),
            length_m: dec!(6.5),
            width_m: dec!(4.2),
        },
        AreaMeasurement {
            name: "Kitchen".into(),
            length_m: dec!(4.0),
            width_m: dec!(3.0),
        },
    ]
}

pub fn market_value() -> MarketValue {
    MarketValue::compute(dec!(120.5), dec!(1000), dec!(80), dec!(1500.50))
}

/// A full record as the backend would return it.
pub fn valuation(id: ValuationId) -> responses::Valuation {
    responses::Valuation {
        id,
        status: ValuationStatus::Pending,
        client_info: client_info(),
        location: location_info(),
        construction: construction_info(),
        areas: areas(),
        market_value: market_value(),
        property_images: vec![UploadedFile {
            url: "https://cdn.example.com/front.jpg".into(),
            name: Some("front.jpg".into()),
        }],
        location_images: vec![],
        area_images: vec![AreaImages {
            area: "Kitchen".into(),
            images: vec![],
        }],
        documents: vec![],
        feedback: None,
        created_at: fixed_timestamp(),
        updated_at: fixed_timestamp(),
    }
}

pub fn summary(id: ValuationId) -> responses::ValuationSummary {
    responses::ValuationSummary {
        id,
        applicant_name: client_info().applicant_name,
        city: location_info().city,
        status: ValuationStatus::Pending,
        total_value: market_value().total_value,
        updated_at: fixed_timestamp(),
    }
}

pub fn create_body() -> requests::CreateValuation {
    requests::CreateValuation {
        client_info: client_info(),
        location: location_info(),
        construction: construction_info(),
        areas: areas(),
        market_value: market_value(),
    }
}

pub fn update_body() -> requests::UpdateValuation {
    requests::UpdateValuation {
        status: ValuationStatus::Pending,
        client_info: client_info(),
        location: location_info(),
        construction: construction_info(),
        areas: areas(),
        market_value: market_value(),
        property_images: vec![],
        location_images: vec![],
        area_images: vec![],
        documents: vec![],
    }
}

fn fixed_timestamp() -> Timestamp {
    "2024-12-20T08:30:00Z".parse().unwrap()
}
