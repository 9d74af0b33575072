// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed calls for the hotel data endpoints (reservations, rooms, room
//! categories, billing, reports).
//!
//! Every call goes through [`AuthClient`], so it carries the session
//! credential and recovers from an expired one like any other request.

use reqwest::Method;
use serde_json::Value;

use crate::api::{
    ApiResponse, BillingRequest, ManagerSummary, ManualReservationRequest, NewRoom, ReportPeriod,
    Reservation, ReservationPatch, ReservationStatus, Room, RoomCategory, TravelCompanyBooking,
    TravelCompanyReservation,
};
use crate::client::AuthClient;
use crate::error::ClientError;

/// Hotel API bound to an authenticated client.
#[derive(Clone)]
pub struct HotelApi {
    client: AuthClient,
}

impl HotelApi {
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    /// All reservations (staff view).
    pub async fn list_reservations(&self) -> Result<ApiResponse<Vec<Reservation>>, ClientError> {
        self.client.get_json("/reservations").await
    }

    /// Reservations owned by the signed-in customer.
    pub async fn my_reservations(&self) -> Result<ApiResponse<Vec<Reservation>>, ClientError> {
        self.client.get_json("/reservations/my").await
    }

    pub async fn travel_company_reservations(
        &self,
    ) -> Result<ApiResponse<Vec<TravelCompanyReservation>>, ClientError> {
        self.client.get_json("/reservations/travel-company").await
    }

    /// Book a walk-in guest at the front desk.
    pub async fn create_manual_reservation(
        &self,
        request: &ManualReservationRequest,
    ) -> Result<ApiResponse<Reservation>, ClientError> {
        if request.occupants == 0 {
            return Err(ClientError::InvalidRequest("occupants must be at least 1".to_owned()));
        }
        self.client.post_json("/reservations/checkin/manual", request).await
    }

    pub async fn create_travel_company_reservation(
        &self,
        booking: &TravelCompanyBooking,
    ) -> Result<ApiResponse<TravelCompanyReservation>, ClientError> {
        if booking.number_of_rooms == 0 {
            let msg = "number of rooms must be at least 1".to_owned();
            return Err(ClientError::InvalidRequest(msg));
        }
        self.client.post_json("/reservations/travel-company-reservation", booking).await
    }

    /// Change dates or status of a reservation.
    pub async fn update_reservation(
        &self,
        id: &str,
        patch: &ReservationPatch,
    ) -> Result<ApiResponse<Reservation>, ClientError> {
        if patch.is_empty() {
            return Err(ClientError::InvalidRequest("empty reservation update".to_owned()));
        }
        let path = format!("/reservations/{}", segment(id)?);
        self.client.patch_json(&path, patch).await
    }

    pub async fn cancel_reservation(
        &self,
        id: &str,
    ) -> Result<ApiResponse<Reservation>, ClientError> {
        let patch =
            ReservationPatch { status: Some(ReservationStatus::Cancelled), ..Default::default() };
        self.update_reservation(id, &patch).await
    }

    pub async fn check_in(&self, id: &str) -> Result<ApiResponse<Reservation>, ClientError> {
        let path = format!("/reservations/{}/checkin", segment(id)?);
        self.client.call_json(Method::PATCH, &path, None).await
    }

    pub async fn check_out(&self, id: &str) -> Result<ApiResponse<Reservation>, ClientError> {
        let path = format!("/reservations/{}/checkout", segment(id)?);
        self.client.call_json(Method::PATCH, &path, None).await
    }

    pub async fn delete_reservation(
        &self,
        id: &str,
    ) -> Result<ApiResponse<Option<Value>>, ClientError> {
        let path = format!("/reservations/{}", segment(id)?);
        self.client.delete_json(&path).await
    }

    pub async fn list_rooms(&self) -> Result<ApiResponse<Vec<Room>>, ClientError> {
        self.client.get_json("/rooms").await
    }

    pub async fn create_room(&self, room: &NewRoom) -> Result<ApiResponse<Room>, ClientError> {
        if room.number.trim().is_empty() {
            return Err(ClientError::InvalidRequest("room number is required".to_owned()));
        }
        segment(&room.room_category_id)?;
        self.client.post_json("/rooms", room).await
    }

    pub async fn delete_room(&self, id: &str) -> Result<ApiResponse<Option<Value>>, ClientError> {
        let path = format!("/rooms/{}", segment(id)?);
        self.client.delete_json(&path).await
    }

    pub async fn room_categories(&self) -> Result<ApiResponse<Vec<RoomCategory>>, ClientError> {
        self.client.get_json("/room-categories").await
    }

    pub async fn room_category(&self, id: &str) -> Result<ApiResponse<RoomCategory>, ClientError> {
        let path = format!("/room-categories/{}", segment(id)?);
        self.client.get_json(&path).await
    }

    /// Record a payment against a reservation.
    pub async fn bill(
        &self,
        request: &BillingRequest,
    ) -> Result<ApiResponse<Option<Value>>, ClientError> {
        if !request.amount.is_finite() || request.amount < 0.0 {
            return Err(ClientError::InvalidRequest(format!("invalid amount {}", request.amount)));
        }
        segment(&request.reservation_id)?;
        self.client.post_json("/billing", request).await
    }

    pub async fn manager_summary(
        &self,
        period: ReportPeriod,
    ) -> Result<ApiResponse<ManagerSummary>, ClientError> {
        let path = format!("/reports/manager-summary?period={}", period.as_str());
        self.client.get_json(&path).await
    }

    /// The manager summary rendered as a PDF document.
    pub async fn manager_summary_pdf(&self, period: ReportPeriod) -> Result<Vec<u8>, ClientError> {
        let path = format!("/reports/manager-summary/pdf?period={}", period.as_str());
        let resp = self.client.request(Method::GET, &path, None, None).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

/// Validate an id used as a single path segment.
fn segment(id: &str) -> Result<&str, ClientError> {
    let bad = id.is_empty()
        || id == "."
        || id == ".."
        || id.chars().any(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace());
    if bad {
        return Err(ClientError::InvalidRequest(format!("invalid id {id:?}")));
    }
    Ok(id)
}

#[cfg(test)]
#[path = "hotel_tests.rs"]
mod tests;
