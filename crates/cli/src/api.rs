// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types for the hotel REST API: the response envelope, account
//! payloads, and the reservation/room/billing/report records.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Envelope wrapping every API response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub success: bool,
    pub payload: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

impl<T> ApiResponse<Option<T>> {
    /// Failed envelope with no payload.
    pub fn failure(message: impl Into<String>) -> Self {
        Self { message: message.into(), success: false, payload: None, meta: None }
    }
}

/// Pagination metadata attached to list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

/// Payload of `/auth/login` and `/auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    pub user: User,
}

/// User record as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Body of `POST /auth/refresh`.
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Payload of a successful `/auth/refresh`.
///
/// Only `access_token` is accepted for the access credential. A missing
/// `refresh_token` means the server did not rotate it.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshPayload {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Lifecycle state of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    CheckedIn,
    CheckedOut,
    /// A state this client does not know about.
    #[serde(other)]
    Other,
}

/// Card details attached to a booking. Never printed.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_card: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_card_expiry: Option<String>,
    #[serde(rename = "creditCardCVV", default, skip_serializing_if = "Option::is_none")]
    pub credit_card_cvv: Option<String>,
}

impl PaymentCard {
    pub fn new(number: &str, expiry: &str, cvv: &str) -> Self {
        Self {
            credit_card: Some(number.to_owned()),
            credit_card_expiry: Some(expiry.to_owned()),
            credit_card_cvv: Some(cvv.to_owned()),
        }
    }
}

impl fmt::Debug for PaymentCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last4 = self
            .credit_card
            .as_deref()
            .and_then(|n| n.len().checked_sub(4).and_then(|i| n.get(i..)));
        f.debug_struct("PaymentCard")
            .field("last4", &last4)
            .field("credit_card_expiry", &self.credit_card_expiry.as_ref().map(|_| "<redacted>"))
            .field("credit_card_cvv", &self.credit_card_cvv.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A guest reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    pub customer_id: String,
    pub room_id: String,
    pub check_in_date: String,
    pub check_out_date: String,
    pub status: ReservationStatus,
    pub occupants: u32,
    #[serde(flatten)]
    pub card: PaymentCard,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Operational state of a physical room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Available,
    Occupied,
    Maintenance,
    Reserved,
    #[serde(other)]
    Other,
}

/// A physical room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub number: String,
    pub room_category_id: String,
    pub status: RoomStatus,
}

/// A bookable room type and the rooms that belong to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ideal_for: String,
    pub capacity: u32,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub bed: String,
    #[serde(default)]
    pub view: String,
    pub price_tier: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub rooms: Vec<Room>,
}

/// A block booking made by a travel company. The room is assigned later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelCompanyReservation {
    pub id: String,
    pub customer_id: String,
    pub room_id: Option<String>,
    pub check_in_date: String,
    pub check_out_date: String,
    pub status: ReservationStatus,
    pub occupants: u32,
    pub number_of_rooms: u32,
    #[serde(flatten)]
    pub card: PaymentCard,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    /// The booking company. Server-side secrets in this record are dropped.
    pub customer: User,
    pub room: Option<Room>,
}

/// Body of `POST /reservations/checkin/manual` (front-desk walk-in).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualReservationRequest {
    pub email: String,
    pub room_type: String,
    pub check_in_date: String,
    pub check_out_date: String,
    pub occupants: u32,
    #[serde(flatten)]
    pub card: PaymentCard,
}

/// Body of `POST /reservations/travel-company-reservation`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelCompanyBooking {
    pub room_type: String,
    pub check_in_date: String,
    pub check_out_date: String,
    pub occupants: u32,
    pub number_of_rooms: u32,
}

/// Body of `PATCH /reservations/{id}`; unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReservationStatus>,
}

impl ReservationPatch {
    pub fn is_empty(&self) -> bool {
        self.check_in_date.is_none() && self.check_out_date.is_none() && self.status.is_none()
    }
}

/// Body of `POST /rooms`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoom {
    pub number: String,
    pub room_category_id: String,
    pub status: RoomStatus,
}

/// Body of `POST /billing`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingRequest {
    pub reservation_id: String,
    pub amount: f64,
    pub payment_method: String,
}

/// Reporting window for the manager summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Daily,
    #[default]
    Monthly,
}

impl ReportPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
        }
    }
}

/// Payload of `GET /reports/manager-summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSummary {
    pub period: String,
    pub start_date: String,
    pub end_date: String,
    pub total_reservations: u64,
    pub cancelled_count: u64,
    pub checked_in_count: u64,
    pub checked_out_count: u64,
    pub total_rooms: u64,
    #[serde(default)]
    pub room_status_counts: BTreeMap<String, u64>,
    pub total_revenue: f64,
    pub travel_company_data: TravelCompanySummary,
}

/// Travel-company slice of the manager summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelCompanySummary {
    pub total_reservations: u64,
    pub total_rooms: u64,
    pub revenue: f64,
    pub pending_amount: f64,
    #[serde(default)]
    pub status_breakdown: BTreeMap<String, u64>,
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
